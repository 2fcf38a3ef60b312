//! The chat transcript a view is showing, and the flows that grow it.
//!
//! A [`Conversation`] owns the displayed list for one session. Sending is
//! split into [`Conversation::begin_send`] and [`Conversation::complete_send`]
//! so an event loop can run the network call on another task and hand the
//! outcome back; [`Conversation::send`] glues the halves together for callers
//! that can simply await.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::api::{ApiError, AstrologyBackend};
use crate::core::birth::{acknowledgement, BirthDetails};
use crate::core::constants::{EMPTY_KUNDLI_REPLY, FALLBACK_CHAT_REPLY, KUNDLI_ERROR_REPLY};
use crate::core::message::{ChatMessage, MessageId, MessageIdGenerator};
use crate::core::session::{SessionContext, SessionId};
use crate::core::storage::{StorageError, StorageEvent};

/// A message plus whether it arrived during this view and should animate.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayMessage {
    pub message: ChatMessage,
    pub is_new: bool,
}

impl DisplayMessage {
    fn restored(message: ChatMessage) -> Self {
        Self {
            message,
            is_new: false,
        }
    }
}

/// A chat query accepted by [`Conversation::begin_send`] and awaiting a reply.
#[derive(Debug, Clone)]
pub struct PendingChat {
    pub session: SessionId,
    pub query: String,
}

/// Birth details accepted by [`Conversation::begin_kundli`].
#[derive(Debug, Clone)]
pub struct PendingKundli {
    pub session: SessionId,
    pub details: BirthDetails,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatOutcome {
    Reply(String),
    /// Reason is for logs only; the user sees the fallback bubble.
    Failed(String),
}

/// Race the backend call against `timeout`. Whichever finishes first decides
/// the outcome; the losing request is dropped, which aborts it.
pub async fn request_reply(
    backend: &dyn AstrologyBackend,
    session: &SessionId,
    query: &str,
    timeout: Duration,
) -> ChatOutcome {
    match tokio::time::timeout(timeout, backend.chat(session, query)).await {
        Ok(Ok(reply)) if reply.trim().is_empty() => {
            warn!(session = %session, "backend returned an empty reply");
            ChatOutcome::Failed("empty reply".to_string())
        }
        Ok(Ok(reply)) => ChatOutcome::Reply(reply),
        Ok(Err(err)) => {
            warn!(session = %session, error = %err, "chat request failed");
            ChatOutcome::Failed(err.to_string())
        }
        Err(_) => {
            warn!(session = %session, timeout_secs = timeout.as_secs(), "chat request timed out");
            ChatOutcome::Failed(format!("timed out after {}s", timeout.as_secs()))
        }
    }
}

/// Kundli counterpart of [`request_reply`].
pub async fn request_kundli(
    backend: &dyn AstrologyBackend,
    session: &SessionId,
    details: &BirthDetails,
    timeout: Duration,
) -> Result<String, ApiError> {
    match tokio::time::timeout(timeout, backend.submit_kundli(session, details)).await {
        Ok(result) => result,
        Err(_) => Err(ApiError::Status {
            status: 504,
            body: format!("timed out after {}s", timeout.as_secs()),
        }),
    }
}

pub struct Conversation {
    session: SessionContext,
    messages: Vec<DisplayMessage>,
    loading: bool,
    ids: MessageIdGenerator,
}

impl Conversation {
    /// Load the persisted transcript; restored messages never animate.
    pub fn open(session: SessionContext) -> Result<Self, StorageError> {
        let mut conversation = Self {
            session,
            messages: Vec::new(),
            loading: false,
            ids: MessageIdGenerator::new(),
        };
        conversation.reload()?;
        Ok(conversation)
    }

    pub fn reload(&mut self) -> Result<(), StorageError> {
        let restored = self.session.load_messages()?;
        debug!(session = %self.session.id, count = restored.len(), "loaded transcript");
        self.replace_all(restored);
        Ok(())
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn messages(&self) -> &[DisplayMessage] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Stop treating `id` as new, typically once its animation has finished.
    pub fn mark_seen(&mut self, id: &MessageId) {
        if let Some(entry) = self.messages.iter_mut().find(|m| &m.message.id == id) {
            entry.is_new = false;
        }
    }

    /// Accept a user query. Blank input, or input while a request is already
    /// in flight, is ignored.
    pub fn begin_send(&mut self, input: &str) -> Option<PendingChat> {
        let query = input.trim();
        if query.is_empty() || self.loading {
            return None;
        }

        let id = self.ids.next_id();
        self.messages.push(DisplayMessage {
            message: ChatMessage::user(id, query),
            is_new: false,
        });
        self.loading = true;
        self.persist();

        Some(PendingChat {
            session: self.session.id.clone(),
            query: query.to_string(),
        })
    }

    /// Record the single AI bubble that answers `pending` and return its id.
    pub fn complete_send(&mut self, pending: PendingChat, outcome: ChatOutcome) -> MessageId {
        let content = match outcome {
            ChatOutcome::Reply(reply) => reply,
            ChatOutcome::Failed(reason) => {
                debug!(session = %pending.session, %reason, "substituting fallback reply");
                FALLBACK_CHAT_REPLY.to_string()
            }
        };
        self.loading = false;
        self.push_ai(content)
    }

    /// Send `input` and wait for the answer. Returns the AI message id, or
    /// `None` when the input was not accepted.
    pub async fn send(
        &mut self,
        backend: &dyn AstrologyBackend,
        input: &str,
        timeout: Duration,
    ) -> Option<MessageId> {
        let pending = self.begin_send(input)?;
        let outcome = request_reply(backend, &pending.session, &pending.query, timeout).await;
        Some(self.complete_send(pending, outcome))
    }

    /// Start a fresh transcript holding only the acknowledgement bubble.
    pub fn begin_kundli(&mut self, details: &BirthDetails) -> Option<PendingKundli> {
        if self.loading {
            return None;
        }
        let id = self.ids.next_id();
        self.messages = vec![DisplayMessage {
            message: ChatMessage::user(id, acknowledgement(details)),
            is_new: false,
        }];
        self.loading = true;
        self.persist();
        info!(session = %self.session.id, "submitted birth details");

        Some(PendingKundli {
            session: self.session.id.clone(),
            details: details.clone(),
        })
    }

    pub fn complete_kundli(
        &mut self,
        pending: PendingKundli,
        result: Result<String, ApiError>,
    ) -> MessageId {
        let content = match result {
            Ok(text) if text.trim().is_empty() => EMPTY_KUNDLI_REPLY.to_string(),
            Ok(text) => text,
            Err(err) => {
                warn!(session = %pending.session, error = %err, "kundli request failed");
                KUNDLI_ERROR_REPLY.to_string()
            }
        };
        self.loading = false;
        self.push_ai(content)
    }

    pub async fn submit_birth_details(
        &mut self,
        backend: &dyn AstrologyBackend,
        details: &BirthDetails,
        timeout: Duration,
    ) -> Option<MessageId> {
        let pending = self.begin_kundli(details)?;
        let result = request_kundli(backend, &pending.session, &pending.details, timeout).await;
        Some(self.complete_kundli(pending, result))
    }

    /// Apply a change made to the store by someone else. Only this session's
    /// messages key is honoured; returns whether the displayed list changed.
    pub fn apply_storage_event(&mut self, event: &StorageEvent) -> bool {
        if event.key != self.session.messages_key() {
            return false;
        }

        match &event.new_value {
            Some(raw) => match serde_json::from_str::<Vec<ChatMessage>>(raw) {
                Ok(messages) => {
                    debug!(session = %self.session.id, count = messages.len(), "transcript changed externally");
                    self.replace_all(messages);
                    true
                }
                Err(err) => {
                    warn!(session = %self.session.id, error = %err, "ignoring unparsable transcript update");
                    false
                }
            },
            None => {
                debug!(session = %self.session.id, "transcript removed externally");
                self.replace_all(Vec::new());
                true
            }
        }
    }

    fn replace_all(&mut self, messages: Vec<ChatMessage>) {
        self.ids.observe(messages.iter().map(|m| &m.id));
        self.messages = messages.into_iter().map(DisplayMessage::restored).collect();
    }

    fn push_ai(&mut self, content: String) -> MessageId {
        let id = self.ids.next_id();
        self.messages.push(DisplayMessage {
            message: ChatMessage::ai(id.clone(), content),
            is_new: true,
        });
        self.persist();
        id
    }

    fn persist(&self) {
        if self.messages.is_empty() {
            return;
        }
        let plain: Vec<ChatMessage> = self.messages.iter().map(|m| m.message.clone()).collect();
        if let Err(err) = self.session.save_messages(&plain) {
            warn!(session = %self.session.id, error = %err, "failed to persist transcript");
        }
    }
}
