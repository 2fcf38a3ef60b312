//! Session identity and per-session transcript persistence.
//!
//! A session id is generated once per store and reused until the user asks
//! for a fresh one. Each session's transcript lives under its own key so that
//! several sessions can coexist in one store.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::core::constants::{SESSION_KEY, SESSION_KEY_PREFIX};
use crate::core::message::ChatMessage;
use crate::core::storage::{Storage, StorageError};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh id without touching any store.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical key for a session's message list.
pub fn messages_key_for_session(sid: &SessionId) -> String {
    format!("{SESSION_KEY_PREFIX}{sid}:messages")
}

/// Key of the older whole-session record, read only as a fallback.
pub fn legacy_key_for_session(sid: &SessionId) -> String {
    format!("{SESSION_KEY_PREFIX}{sid}")
}

#[derive(Deserialize)]
struct LegacySessionRecord {
    #[serde(default)]
    messages: Option<Vec<serde_json::Value>>,
}

impl LegacySessionRecord {
    /// Entries that no longer decode are dropped one by one.
    fn into_messages(self, sid: &SessionId) -> Vec<ChatMessage> {
        self.messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<ChatMessage>(value) {
                Ok(message) => Some(message),
                Err(err) => {
                    warn!(session = %sid, error = %err, "skipping unreadable legacy message");
                    None
                }
            })
            .collect()
    }
}

/// Decode a stored transcript. Anything unparsable is an empty transcript.
pub fn parse_messages(raw: &str) -> Vec<ChatMessage> {
    match serde_json::from_str::<Vec<ChatMessage>>(raw) {
        Ok(messages) => messages,
        Err(err) => {
            warn!(error = %err, "stored messages are malformed; starting empty");
            Vec::new()
        }
    }
}

#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn Storage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Stored session id, if one exists and is non-empty.
    pub fn current_session_id(&self) -> Result<Option<SessionId>, StorageError> {
        Ok(self
            .storage
            .get_item(SESSION_KEY)?
            .filter(|sid| !sid.trim().is_empty())
            .map(SessionId))
    }

    /// Return the stored session id, creating and persisting one on first use.
    pub fn get_or_create_session_id(&self) -> Result<SessionId, StorageError> {
        if let Some(sid) = self.current_session_id()? {
            return Ok(sid);
        }
        let sid = SessionId::generate();
        self.storage.set_item(SESSION_KEY, sid.as_str())?;
        debug!(session = %sid, "created session id");
        Ok(sid)
    }

    /// Replace the current session id with a fresh one.
    pub fn new_session_id(&self) -> Result<SessionId, StorageError> {
        let sid = SessionId::generate();
        self.storage.set_item(SESSION_KEY, sid.as_str())?;
        debug!(session = %sid, "started new session");
        Ok(sid)
    }

    pub fn save_messages(
        &self,
        sid: &SessionId,
        messages: &[ChatMessage],
    ) -> Result<(), StorageError> {
        let raw = serde_json::to_string(messages)?;
        self.storage.set_item(&messages_key_for_session(sid), &raw)
    }

    pub fn load_messages(&self, sid: &SessionId) -> Result<Vec<ChatMessage>, StorageError> {
        if let Some(raw) = self.storage.get_item(&messages_key_for_session(sid))? {
            return Ok(parse_messages(&raw));
        }

        if let Some(raw) = self.storage.get_item(&legacy_key_for_session(sid))? {
            match serde_json::from_str::<LegacySessionRecord>(&raw) {
                Ok(record) => return Ok(record.into_messages(sid)),
                Err(err) => warn!(session = %sid, error = %err, "legacy session record is malformed"),
            }
        }

        Ok(Vec::new())
    }

    pub fn clear_messages(&self, sid: &SessionId) -> Result<(), StorageError> {
        self.storage.remove_item(&messages_key_for_session(sid))?;
        self.storage.remove_item(&legacy_key_for_session(sid))
    }

    /// Every session with a transcript in the store, in key order.
    pub fn list_sessions(&self) -> Result<Vec<SessionId>, StorageError> {
        let mut sessions: Vec<SessionId> = Vec::new();
        for key in self.storage.keys()? {
            let Some(rest) = key.strip_prefix(SESSION_KEY_PREFIX) else {
                continue;
            };
            let sid = rest.strip_suffix(":messages").unwrap_or(rest);
            if sid.is_empty() || sid.contains(':') {
                continue;
            }
            if !sessions.iter().any(|known| known.as_str() == sid) {
                sessions.push(SessionId::new(sid));
            }
        }
        Ok(sessions)
    }

    /// Bind a session id to this store for explicit passing around.
    pub fn context(&self, id: SessionId) -> SessionContext {
        SessionContext {
            id,
            store: self.clone(),
        }
    }
}

/// The session a view or command works on, passed explicitly rather than
/// looked up from global state.
#[derive(Clone)]
pub struct SessionContext {
    pub id: SessionId,
    pub store: SessionStore,
}

impl SessionContext {
    /// Resolve `requested` or fall back to the store's current session.
    pub fn resolve(store: SessionStore, requested: Option<&str>) -> Result<Self, StorageError> {
        let id = match requested.map(str::trim).filter(|sid| !sid.is_empty()) {
            Some(sid) if sid.contains(':') => {
                return Err(StorageError::InvalidSessionId(sid.to_string()))
            }
            Some(sid) => SessionId::new(sid),
            None => store.get_or_create_session_id()?,
        };
        Ok(store.context(id))
    }

    pub fn messages_key(&self) -> String {
        messages_key_for_session(&self.id)
    }

    pub fn load_messages(&self) -> Result<Vec<ChatMessage>, StorageError> {
        self.store.load_messages(&self.id)
    }

    pub fn save_messages(&self, messages: &[ChatMessage]) -> Result<(), StorageError> {
        self.store.save_messages(&self.id, messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::{MessageId, Sender};
    use crate::core::storage::MemoryStorage;

    fn store() -> SessionStore {
        SessionStore::new(Arc::new(MemoryStorage::new()))
    }

    #[test]
    fn creates_exactly_one_session_id() {
        let store = store();
        assert!(store.current_session_id().unwrap().is_none());

        let first = store.get_or_create_session_id().unwrap();
        let second = store.get_or_create_session_id().unwrap();
        assert_eq!(first, second);
        assert_eq!(
            store.storage().get_item(SESSION_KEY).unwrap().as_deref(),
            Some(first.as_str())
        );
        assert_eq!(store.storage().keys().unwrap().len(), 1);
    }

    #[test]
    fn empty_stored_id_counts_as_missing() {
        let store = store();
        store.storage().set_item(SESSION_KEY, "").unwrap();
        let sid = store.get_or_create_session_id().unwrap();
        assert!(!sid.as_str().is_empty());
    }

    #[test]
    fn new_session_replaces_current() {
        let store = store();
        let first = store.get_or_create_session_id().unwrap();
        let second = store.new_session_id().unwrap();
        assert_ne!(first, second);
        assert_eq!(store.get_or_create_session_id().unwrap(), second);
    }

    #[test]
    fn messages_round_trip() {
        let store = store();
        let sid = SessionId::new("s1");
        let messages = vec![
            ChatMessage::user(MessageId::new("1"), "When is my Saturn return?"),
            ChatMessage::ai(MessageId::new("2"), "- Around **age 29**"),
        ];
        store.save_messages(&sid, &messages).unwrap();
        assert_eq!(store.load_messages(&sid).unwrap(), messages);
    }

    #[test]
    fn sessions_do_not_share_transcripts() {
        let store = store();
        let a = SessionId::new("a");
        let b = SessionId::new("b");
        store
            .save_messages(&a, &[ChatMessage::user(MessageId::new("1"), "hi")])
            .unwrap();
        assert!(store.load_messages(&b).unwrap().is_empty());
    }

    #[test]
    fn malformed_transcript_loads_empty() {
        let store = store();
        let sid = SessionId::new("s1");
        store
            .storage()
            .set_item(&messages_key_for_session(&sid), "[{\"id\":")
            .unwrap();
        assert!(store.load_messages(&sid).unwrap().is_empty());
    }

    #[test]
    fn falls_back_to_legacy_record() {
        let store = store();
        let sid = SessionId::new("old");
        store
            .storage()
            .set_item(
                &legacy_key_for_session(&sid),
                r#"{"createdAt":1,"messages":[{"id":"1","role":"user","text":"hi"},{"id":"2","role":"assistant","text":"hello"}]}"#,
            )
            .unwrap();
        let loaded = store.load_messages(&sid).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].sender, Sender::Ai);
        assert_eq!(loaded[1].content, "hello");
    }

    #[test]
    fn legacy_entries_that_fail_to_decode_are_skipped() {
        let store = store();
        let sid = SessionId::new("old");
        store
            .storage()
            .set_item(
                &legacy_key_for_session(&sid),
                r#"{"messages":[{"id":"1","role":"user","text":"hi"},{"id":"2","role":"system","text":"?"},{"id":"3","role":"assistant","text":"hello"}]}"#,
            )
            .unwrap();
        let loaded = store.load_messages(&sid).unwrap();
        let contents: Vec<_> = loaded.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["hi", "hello"]);
    }

    #[test]
    fn resolve_rejects_ids_that_cannot_be_listed() {
        let store = store();
        let err = SessionContext::resolve(store.clone(), Some("a:b")).err();
        assert!(matches!(err, Some(StorageError::InvalidSessionId(id)) if id == "a:b"));

        let ctx = SessionContext::resolve(store.clone(), Some(" chart-42 ")).unwrap();
        assert_eq!(ctx.id.as_str(), "chart-42");
        ctx.save_messages(&[ChatMessage::user(MessageId::new("1"), "x")])
            .unwrap();
        assert!(store.list_sessions().unwrap().contains(&SessionId::new("chart-42")));
    }

    #[test]
    fn lists_sessions_from_both_key_shapes() {
        let store = store();
        store.get_or_create_session_id().unwrap();
        store
            .save_messages(&SessionId::new("b"), &[ChatMessage::user(MessageId::new("1"), "x")])
            .unwrap();
        store
            .storage()
            .set_item(&legacy_key_for_session(&SessionId::new("a")), "{}")
            .unwrap();
        store
            .save_messages(&SessionId::new("a"), &[ChatMessage::user(MessageId::new("1"), "x")])
            .unwrap();

        let sessions = store.list_sessions().unwrap();
        assert_eq!(sessions, vec![SessionId::new("a"), SessionId::new("b")]);
    }

    #[test]
    fn clear_removes_canonical_and_legacy_keys() {
        let store = store();
        let sid = SessionId::new("s");
        store
            .save_messages(&sid, &[ChatMessage::user(MessageId::new("1"), "x")])
            .unwrap();
        store
            .storage()
            .set_item(&legacy_key_for_session(&sid), "{}")
            .unwrap();
        store.clear_messages(&sid).unwrap();
        assert!(store.storage().keys().unwrap().is_empty());
    }

    #[test]
    fn resolve_prefers_requested_session() {
        let store = store();
        let ctx = SessionContext::resolve(store.clone(), Some("  picked ")).unwrap();
        assert_eq!(ctx.id.as_str(), "picked");
        assert!(store.current_session_id().unwrap().is_none());

        let ctx = SessionContext::resolve(store.clone(), None).unwrap();
        assert_eq!(Some(ctx.id), store.current_session_id().unwrap());
    }
}
