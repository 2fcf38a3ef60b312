//! Main chat event loop and page state
//!
//! [`ChatView`] holds everything the chat page shows and reacts to: the
//! conversation, the input box, running typing animations and the scroll
//! position. [`run_chat`] owns one view and feeds it terminal input, backend
//! replies, animation progress and store changes, all from a single task.

mod lifecycle;
#[cfg(test)]
mod tests;

pub use lifecycle::{restore_terminal, setup_terminal, ChatTerminal};

use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::text::{Line, Span};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tui_textarea::TextArea;

use crate::api::{ApiError, AstrologyBackend};
use crate::core::birth::BirthDetails;
use crate::core::conversation::{
    request_kundli, request_reply, ChatOutcome, Conversation, PendingChat, PendingKundli,
};
use crate::core::message::MessageId;
use crate::core::session::SessionId;
use crate::core::storage::{spawn_storage_watcher, FileStorage, StorageEvent};
use crate::ui::layout::{LayoutConfig, LayoutEngine, MessageView};
use crate::ui::renderer::ui;
use crate::ui::theme::Theme;
use crate::ui::typing::{TypingAnimator, TypingEvent, TypingPace};

const MAX_FPS: u64 = 60;
const STORAGE_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub(crate) const TYPING_INDICATOR_TEXT: &str = "AI is typing...";

#[derive(Debug)]
pub enum UiEvent {
    Crossterm(Event),
}

/// A finished network call, handed back to the loop.
#[derive(Debug)]
pub enum BackendEvent {
    Chat {
        pending: PendingChat,
        outcome: ChatOutcome,
    },
    Kundli {
        pending: PendingKundli,
        result: Result<String, ApiError>,
    },
}

/// What the loop should do after a key press.
#[derive(Debug)]
pub enum KeyAction {
    Ignored,
    Redraw,
    Send(PendingChat),
    Quit,
}

pub struct ChatOptions {
    pub backend: Arc<dyn AstrologyBackend>,
    pub conversation: Conversation,
    pub theme: Theme,
    pub markdown_enabled: bool,
    pub syntax_enabled: bool,
    pub typing_enabled: bool,
    pub request_timeout: Duration,
    /// Watched for writes by other processes when present.
    pub storage: Option<Arc<FileStorage>>,
    /// Birth details to submit as soon as the page opens.
    pub kundli: Option<BirthDetails>,
}

pub struct ChatView {
    conversation: Conversation,
    theme: Theme,
    layout: LayoutEngine,
    layout_config: LayoutConfig,
    animator: TypingAnimator,
    typing_enabled: bool,
    textarea: TextArea<'static>,
    scroll_from_bottom: usize,
    page_height: usize,
    pulse_start: Instant,
}

impl ChatView {
    pub fn new(
        conversation: Conversation,
        theme: Theme,
        layout_config: LayoutConfig,
        typing_enabled: bool,
        pace: TypingPace,
    ) -> (Self, mpsc::UnboundedReceiver<TypingEvent>) {
        let (animator, typing_rx) = TypingAnimator::new(pace);
        let mut view = Self {
            conversation,
            theme,
            layout: LayoutEngine::new(),
            layout_config,
            animator,
            typing_enabled,
            textarea: TextArea::default(),
            scroll_from_bottom: 0,
            page_height: 1,
            pulse_start: Instant::now(),
        };
        view.configure_textarea();
        (view, typing_rx)
    }

    fn configure_textarea(&mut self) {
        let style = self
            .theme
            .input_text_style
            .patch(ratatui::style::Style::default().bg(self.theme.background_color));
        self.textarea.set_style(style);
        self.textarea.set_cursor_style(self.theme.input_cursor_style);
        self.textarea
            .set_cursor_line_style(self.theme.input_cursor_line_style);
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn textarea(&self) -> &TextArea<'static> {
        &self.textarea
    }

    pub fn input_text(&self) -> String {
        self.textarea.lines().join("\n")
    }

    pub fn is_loading(&self) -> bool {
        self.conversation.is_loading()
    }

    pub fn is_animating(&self) -> bool {
        self.animator.is_animating()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> KeyAction {
        if key.kind != KeyEventKind::Press {
            return KeyAction::Ignored;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyAction::Quit,
            KeyCode::Esc => {
                if self.skip_animations() {
                    KeyAction::Redraw
                } else {
                    KeyAction::Ignored
                }
            }
            KeyCode::Enter
                if key
                    .modifiers
                    .intersects(KeyModifiers::ALT | KeyModifiers::SHIFT) =>
            {
                self.textarea.insert_newline();
                KeyAction::Redraw
            }
            KeyCode::Enter => self.submit_input(),
            KeyCode::PageUp => {
                self.scroll_up(self.page_height.max(1));
                KeyAction::Redraw
            }
            KeyCode::PageDown => {
                self.scroll_down(self.page_height.max(1));
                KeyAction::Redraw
            }
            _ => {
                self.textarea.input(tui_textarea::Input::from(key));
                KeyAction::Redraw
            }
        }
    }

    pub fn handle_paste(&mut self, text: &str) {
        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        self.textarea.insert_str(normalized);
    }

    /// Hand the input to the conversation. Blank input is cleared; input typed
    /// while a reply is pending stays in the box.
    fn submit_input(&mut self) -> KeyAction {
        let text = self.input_text();
        if text.trim().is_empty() {
            self.clear_input();
            return KeyAction::Redraw;
        }
        match self.conversation.begin_send(&text) {
            Some(pending) => {
                self.clear_input();
                self.scroll_to_bottom();
                self.pulse_start = Instant::now();
                KeyAction::Send(pending)
            }
            None => KeyAction::Ignored,
        }
    }

    fn clear_input(&mut self) {
        self.textarea = TextArea::default();
        self.configure_textarea();
    }

    pub fn begin_kundli(&mut self, details: &BirthDetails) -> Option<PendingKundli> {
        let pending = self.conversation.begin_kundli(details)?;
        self.animator.cancel_all();
        self.layout.invalidate();
        self.scroll_to_bottom();
        self.pulse_start = Instant::now();
        Some(pending)
    }

    pub fn on_backend_event(&mut self, event: BackendEvent) {
        let id = match event {
            BackendEvent::Chat { pending, outcome } => {
                self.conversation.complete_send(pending, outcome)
            }
            BackendEvent::Kundli { pending, result } => {
                self.conversation.complete_kundli(pending, result)
            }
        };
        self.reveal(id);
    }

    /// Animate a freshly added reply, or show it whole when typing is off.
    fn reveal(&mut self, id: MessageId) {
        if !self.typing_enabled {
            self.conversation.mark_seen(&id);
            return;
        }
        let content = self
            .conversation
            .messages()
            .iter()
            .find(|m| m.message.id == id && m.is_new)
            .map(|m| m.message.content.clone());
        if let Some(content) = content {
            self.animator.start(id, &content);
        }
    }

    pub fn on_typing_event(&mut self, event: &TypingEvent) -> bool {
        if !self.animator.apply(event) {
            return false;
        }
        if let TypingEvent::Finished { id, .. } = event {
            self.conversation.mark_seen(id);
        }
        true
    }

    pub fn on_storage_event(&mut self, event: &StorageEvent) -> bool {
        if !self.conversation.apply_storage_event(event) {
            return false;
        }
        self.animator.cancel_all();
        self.layout.invalidate();
        self.scroll_to_bottom();
        true
    }

    /// Show every animating message in full. Returns whether any was running.
    pub fn skip_animations(&mut self) -> bool {
        let stopped = self.animator.cancel_all();
        for id in &stopped {
            self.conversation.mark_seen(id);
        }
        !stopped.is_empty()
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(lines);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_from_bottom = 0;
    }

    /// Top line to show for a pane `height` lines tall over `total` lines.
    /// Clamps the stored position so scrolling past the top is not sticky.
    pub(crate) fn scroll_offset(&mut self, total: usize, height: usize) -> usize {
        self.page_height = height;
        let max_offset = total.saturating_sub(height);
        self.scroll_from_bottom = self.scroll_from_bottom.min(max_offset);
        max_offset - self.scroll_from_bottom
    }

    /// Transcript lines for a pane `width` columns wide, with the pending
    /// reply indicator at the end.
    pub fn transcript_lines(&mut self, width: usize) -> Vec<Line<'static>> {
        self.layout_config.width = width.max(1);

        let animator = &self.animator;
        let views: Vec<MessageView<'_>> = self
            .conversation
            .messages()
            .iter()
            .map(|entry| {
                let message = &entry.message;
                let revealed = animator.revealed(&message.id);
                let text = match revealed {
                    Some(n) => message.content.get(..n).unwrap_or(&message.content),
                    None => message.content.as_str(),
                };
                MessageView {
                    id: &message.id,
                    sender: message.sender,
                    text,
                    typing: revealed.is_some(),
                }
            })
            .collect();

        let mut lines = self
            .layout
            .layout_messages(&views, &self.theme, &self.layout_config);

        if self.conversation.is_loading() {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("{} ", pulse_symbol(self.pulse_start.elapsed())),
                    self.theme.typing_indicator_style,
                ),
                Span::styled(TYPING_INDICATOR_TEXT, self.theme.typing_indicator_style),
            ]));
        }
        lines
    }
}

/// Pulse glyph for the pending-reply indicator, two cycles per second.
pub(crate) fn pulse_symbol(elapsed: Duration) -> &'static str {
    let elapsed = elapsed.as_millis() as f32 / 1000.0;
    let phase = (elapsed * 2.0) % 2.0;
    let intensity = if phase < 1.0 { phase } else { 2.0 - phase };
    if intensity < 0.33 {
        "○"
    } else if intensity < 0.66 {
        "◐"
    } else {
        "●"
    }
}

fn spawn_chat_request(
    backend: Arc<dyn AstrologyBackend>,
    pending: PendingChat,
    timeout: Duration,
    tx: mpsc::UnboundedSender<BackendEvent>,
) {
    tokio::spawn(async move {
        let outcome = request_reply(backend.as_ref(), &pending.session, &pending.query, timeout).await;
        let _ = tx.send(BackendEvent::Chat { pending, outcome });
    });
}

fn spawn_kundli_request(
    backend: Arc<dyn AstrologyBackend>,
    pending: PendingKundli,
    timeout: Duration,
    tx: mpsc::UnboundedSender<BackendEvent>,
) {
    tokio::spawn(async move {
        let result = request_kundli(
            backend.as_ref(),
            &pending.session,
            &pending.details,
            timeout,
        )
        .await;
        let _ = tx.send(BackendEvent::Kundli { pending, result });
    });
}

fn spawn_warm_up(backend: Arc<dyn AstrologyBackend>, session: SessionId) {
    tokio::spawn(async move {
        match backend.ping(&session).await {
            Ok(()) => debug!("backend warm-up ping succeeded"),
            Err(err) => debug!(error = %err, "backend warm-up ping failed"),
        }
    });
}

fn spawn_event_reader(tx: mpsc::UnboundedSender<UiEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Ok(true) = event::poll(Duration::from_millis(10)) {
                match event::read() {
                    Ok(ev) => {
                        if tx.send(UiEvent::Crossterm(ev)).is_err() {
                            break;
                        }
                    }
                    Err(_) => continue,
                }
            } else {
                tokio::task::yield_now().await;
            }
        }
    })
}

fn draw_frame(
    terminal: &mut ChatTerminal,
    view: &mut ChatView,
    request_redraw: &mut bool,
    last_draw: &mut Instant,
    frame_duration: Duration,
) -> Result<(), Box<dyn Error>> {
    if !*request_redraw || last_draw.elapsed() < frame_duration {
        return Ok(());
    }
    terminal.draw(|f| ui(f, view))?;
    *request_redraw = false;
    *last_draw = Instant::now();
    Ok(())
}

pub async fn run_chat(options: ChatOptions) -> Result<(), Box<dyn Error>> {
    let ChatOptions {
        backend,
        conversation,
        theme,
        markdown_enabled,
        syntax_enabled,
        typing_enabled,
        request_timeout,
        storage,
        kundli,
    } = options;

    let layout_config = LayoutConfig {
        markdown_enabled,
        syntax_enabled,
        ..LayoutConfig::default()
    };
    let (mut view, mut typing_rx) = ChatView::new(
        conversation,
        theme,
        layout_config,
        typing_enabled,
        TypingPace::default(),
    );
    info!(session = %view.conversation().session().id, "opening chat");

    let (backend_tx, mut backend_rx) = mpsc::unbounded_channel::<BackendEvent>();
    let (storage_tx, mut storage_rx) = mpsc::unbounded_channel::<StorageEvent>();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<UiEvent>();
    let cancel = CancellationToken::new();

    let watcher = storage.map(|storage| {
        spawn_storage_watcher(storage, STORAGE_POLL_INTERVAL, storage_tx, cancel.clone())
    });

    spawn_warm_up(backend.clone(), view.conversation().session().id.clone());
    if let Some(details) = kundli {
        if let Some(pending) = view.begin_kundli(&details) {
            spawn_kundli_request(backend.clone(), pending, request_timeout, backend_tx.clone());
        }
    }

    let mut terminal = setup_terminal()?;
    let event_reader = spawn_event_reader(event_tx);

    let frame_duration = Duration::from_millis(1000 / MAX_FPS);
    let mut last_draw = Instant::now() - frame_duration;
    let mut request_redraw = true;

    let result: Result<(), Box<dyn Error>> = 'main_loop: loop {
        if let Err(err) = draw_frame(
            &mut terminal,
            &mut view,
            &mut request_redraw,
            &mut last_draw,
            frame_duration,
        ) {
            break 'main_loop Err(err);
        }

        let mut processed = false;

        while let Ok(UiEvent::Crossterm(ev)) = event_rx.try_recv() {
            processed = true;
            match ev {
                Event::Key(key) => match view.handle_key(key) {
                    KeyAction::Quit => break 'main_loop Ok(()),
                    KeyAction::Send(pending) => {
                        spawn_chat_request(
                            backend.clone(),
                            pending,
                            request_timeout,
                            backend_tx.clone(),
                        );
                        request_redraw = true;
                    }
                    KeyAction::Redraw => request_redraw = true,
                    KeyAction::Ignored => {}
                },
                Event::Paste(text) => {
                    view.handle_paste(&text);
                    request_redraw = true;
                }
                Event::Resize(_, _) => request_redraw = true,
                _ => {}
            }
        }

        while let Ok(event) = backend_rx.try_recv() {
            processed = true;
            view.on_backend_event(event);
            request_redraw = true;
        }

        while let Ok(event) = typing_rx.try_recv() {
            processed = true;
            if view.on_typing_event(&event) {
                request_redraw = true;
            }
        }

        while let Ok(event) = storage_rx.try_recv() {
            processed = true;
            if view.on_storage_event(&event) {
                request_redraw = true;
            }
        }

        // The pulse needs a fresh frame while a reply is pending.
        if view.is_loading() {
            request_redraw = true;
        }

        if !processed {
            tokio::time::sleep(Duration::from_millis(16)).await;
        }
    };

    cancel.cancel();
    event_reader.abort();
    if let Some(watcher) = watcher {
        watcher.abort();
    }
    restore_terminal(&mut terminal)?;

    result
}
