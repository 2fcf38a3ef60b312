//! Progressive reveal of AI replies.
//!
//! Each animated message gets one spawned task that reveals a few grapheme
//! clusters at a time and reports progress over a channel. The event loop
//! owns the [`TypingAnimator`] and feeds every received event back through
//! [`TypingAnimator::apply`], which drops events from superseded runs.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::trace;
use unicode_segmentation::UnicodeSegmentation;

use crate::core::message::MessageId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingPace {
    pub min_chunk: usize,
    pub max_chunk: usize,
    /// Exclusive upper bound of the pause between chunks.
    pub max_delay: Duration,
}

impl Default for TypingPace {
    fn default() -> Self {
        Self {
            min_chunk: 20,
            max_chunk: 23,
            max_delay: Duration::from_millis(40),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypingEvent {
    /// The first `revealed` bytes of the message are now visible.
    Progress {
        id: MessageId,
        generation: u64,
        revealed: usize,
    },
    Finished { id: MessageId, generation: u64 },
}

struct ActiveAnimation {
    generation: u64,
    revealed: usize,
    cancel: CancellationToken,
}

pub struct TypingAnimator {
    pace: TypingPace,
    tx: mpsc::UnboundedSender<TypingEvent>,
    active: HashMap<MessageId, ActiveAnimation>,
    next_generation: u64,
}

impl TypingAnimator {
    pub fn new(pace: TypingPace) -> (Self, mpsc::UnboundedReceiver<TypingEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let animator = Self {
            pace,
            tx,
            active: HashMap::new(),
            next_generation: 0,
        };
        (animator, rx)
    }

    /// Start revealing `text` for `id`, replacing any run already going for
    /// that id. Returns the new run's generation.
    pub fn start(&mut self, id: MessageId, text: &str) -> u64 {
        self.cancel(&id);
        self.next_generation += 1;
        let generation = self.next_generation;
        let cancel = CancellationToken::new();

        self.active.insert(
            id.clone(),
            ActiveAnimation {
                generation,
                revealed: 0,
                cancel: cancel.clone(),
            },
        );

        let boundaries = grapheme_boundaries(text);
        let pace = self.pace;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            run_animation(id, generation, boundaries, pace, tx, cancel).await;
        });
        generation
    }

    pub fn cancel(&mut self, id: &MessageId) {
        if let Some(previous) = self.active.remove(id) {
            previous.cancel.cancel();
        }
    }

    /// Stop every run and return the ids that were still animating.
    pub fn cancel_all(&mut self) -> Vec<MessageId> {
        self.active
            .drain()
            .map(|(id, animation)| {
                animation.cancel.cancel();
                id
            })
            .collect()
    }

    /// Apply an event from the channel. Returns `true` when it belonged to a
    /// live run and changed what should be shown.
    pub fn apply(&mut self, event: &TypingEvent) -> bool {
        match event {
            TypingEvent::Progress {
                id,
                generation,
                revealed,
            } => match self.active.get_mut(id) {
                Some(run) if run.generation == *generation => {
                    run.revealed = *revealed;
                    true
                }
                _ => {
                    trace!(id = %id, generation, "dropping stale typing progress");
                    false
                }
            },
            TypingEvent::Finished { id, generation } => match self.active.get(id) {
                Some(run) if run.generation == *generation => {
                    self.active.remove(id);
                    true
                }
                _ => false,
            },
        }
    }

    /// Bytes of `id` visible right now, or `None` when it is not animating
    /// and should be shown in full.
    pub fn revealed(&self, id: &MessageId) -> Option<usize> {
        self.active.get(id).map(|run| run.revealed)
    }

    pub fn is_animating(&self) -> bool {
        !self.active.is_empty()
    }
}

impl Drop for TypingAnimator {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

/// Byte offsets just past each grapheme cluster.
fn grapheme_boundaries(text: &str) -> Vec<usize> {
    text.grapheme_indices(true)
        .map(|(start, grapheme)| start + grapheme.len())
        .collect()
}

/// Next reveal position: `chunk` more graphemes past `shown`, clamped.
fn advance(boundaries: &[usize], shown: usize, chunk: usize) -> usize {
    let target = shown + chunk.max(1);
    target.min(boundaries.len())
}

async fn run_animation(
    id: MessageId,
    generation: u64,
    boundaries: Vec<usize>,
    pace: TypingPace,
    tx: mpsc::UnboundedSender<TypingEvent>,
    cancel: CancellationToken,
) {
    let mut shown = 0;
    while shown < boundaries.len() {
        let chunk = random_in_range(pace.min_chunk, pace.max_chunk);
        shown = advance(&boundaries, shown, chunk);
        let revealed = boundaries[shown - 1];
        if cancel.is_cancelled() {
            return;
        }
        let progress = TypingEvent::Progress {
            id: id.clone(),
            generation,
            revealed,
        };
        if tx.send(progress).is_err() {
            return;
        }
        if shown == boundaries.len() {
            break;
        }

        let max_ms = pace.max_delay.as_millis() as usize;
        let delay = Duration::from_millis(random_in_range(0, max_ms.saturating_sub(1)) as u64);
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    if !cancel.is_cancelled() {
        let _ = tx.send(TypingEvent::Finished { id, generation });
    }
}

/// Uniform-ish value in `min..=max`. Falls back to the midpoint when the OS
/// source is unavailable.
fn random_in_range(min: usize, max: usize) -> usize {
    if max <= min {
        return min;
    }
    let span = (max - min + 1) as u64;
    let mut buf = [0u8; 8];
    match getrandom::fill(&mut buf) {
        Ok(()) => min + (u64::from_le_bytes(buf) % span) as usize,
        Err(_) => min + (span / 2) as usize,
    }
}
