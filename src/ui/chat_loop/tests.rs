use std::sync::Arc;

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::text::Line;

use super::*;
use crate::core::message::{ChatMessage, Sender};
use crate::core::session::{messages_key_for_session, SessionId, SessionStore};
use crate::core::storage::{MemoryStorage, Storage};

fn conversation(sid: &str) -> (Conversation, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let store = SessionStore::new(storage.clone());
    let conversation = Conversation::open(store.context(SessionId::new(sid))).expect("open");
    (conversation, storage)
}

fn view_with(typing: bool) -> (ChatView, mpsc::UnboundedReceiver<TypingEvent>) {
    let (conversation, _storage) = conversation("s-1");
    ChatView::new(
        conversation,
        Theme::dark_default(),
        LayoutConfig::default(),
        typing,
        TypingPace::default(),
    )
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn type_text(view: &mut ChatView, text: &str) {
    for ch in text.chars() {
        view.handle_key(key(KeyCode::Char(ch)));
    }
}

fn line_texts(lines: &[Line<'_>]) -> Vec<String> {
    lines
        .iter()
        .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
        .collect()
}

fn send(view: &mut ChatView, text: &str) -> PendingChat {
    type_text(view, text);
    match view.handle_key(key(KeyCode::Enter)) {
        KeyAction::Send(pending) => pending,
        other => panic!("expected a send, got {other:?}"),
    }
}

#[test]
fn enter_sends_and_clears_the_input() {
    let (mut view, _rx) = view_with(false);
    let pending = send(&mut view, "Which dasha am I in?");

    assert_eq!(pending.query, "Which dasha am I in?");
    assert_eq!(pending.session.as_str(), "s-1");
    assert_eq!(view.input_text(), "");
    assert!(view.is_loading());
    assert_eq!(view.conversation().messages().len(), 1);
}

#[test]
fn enter_while_waiting_keeps_the_draft() {
    let (mut view, _rx) = view_with(false);
    send(&mut view, "first");
    type_text(&mut view, "second");

    assert!(matches!(view.handle_key(key(KeyCode::Enter)), KeyAction::Ignored));
    assert_eq!(view.input_text(), "second");
    assert_eq!(view.conversation().messages().len(), 1);
}

#[test]
fn blank_enter_sends_nothing() {
    let (mut view, _rx) = view_with(false);
    type_text(&mut view, "   ");
    assert!(matches!(view.handle_key(key(KeyCode::Enter)), KeyAction::Redraw));
    assert!(view.conversation().is_empty());
    assert_eq!(view.input_text(), "");
}

#[test]
fn modified_enter_inserts_a_newline() {
    let (mut view, _rx) = view_with(false);
    type_text(&mut view, "line one");
    view.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::ALT));
    type_text(&mut view, "line two");
    view.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT));
    type_text(&mut view, "three");

    assert_eq!(view.input_text(), "line one\nline two\nthree");
}

#[test]
fn pasted_carriage_returns_become_newlines() {
    let (mut view, _rx) = view_with(false);
    view.handle_paste("a\r\nb\rc");
    assert_eq!(view.input_text(), "a\nb\nc");
}

#[test]
fn ctrl_c_quits_and_releases_are_ignored() {
    let (mut view, _rx) = view_with(false);
    assert!(matches!(
        view.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
        KeyAction::Quit
    ));

    let mut release = key(KeyCode::Char('x'));
    release.kind = KeyEventKind::Release;
    assert!(matches!(view.handle_key(release), KeyAction::Ignored));
    assert_eq!(view.input_text(), "");
}

#[test]
fn pending_reply_shows_the_typing_indicator() {
    let (mut view, _rx) = view_with(false);
    let pending = send(&mut view, "Hello");

    let texts = line_texts(&view.transcript_lines(60));
    let last = texts.last().expect("indicator line");
    assert!(last.ends_with(TYPING_INDICATOR_TEXT), "{last:?}");

    view.on_backend_event(BackendEvent::Chat {
        pending,
        outcome: ChatOutcome::Reply("Namaste".into()),
    });
    let texts = line_texts(&view.transcript_lines(60));
    assert!(!texts.iter().any(|t| t.contains(TYPING_INDICATOR_TEXT)));
    assert!(texts.iter().any(|t| t == "Namaste"));
}

#[test]
fn failed_reply_shows_one_fallback_bubble() {
    let (mut view, _rx) = view_with(false);
    let pending = send(&mut view, "Hello");
    view.on_backend_event(BackendEvent::Chat {
        pending,
        outcome: ChatOutcome::Failed("timed out after 30s".into()),
    });

    let ai: Vec<_> = view
        .conversation()
        .messages()
        .iter()
        .filter(|m| m.message.sender == Sender::Ai)
        .collect();
    assert_eq!(ai.len(), 1);
    assert_eq!(
        ai[0].message.content,
        crate::core::constants::FALLBACK_CHAT_REPLY
    );
    assert!(!ai[0].is_new);
}

#[tokio::test(start_paused = true)]
async fn new_replies_are_revealed_then_marked_seen() {
    let (mut view, mut rx) = view_with(true);
    let pending = send(&mut view, "Tell me about Rohini");
    let reply = "Rohini is ruled by the Moon. ".repeat(8);
    view.on_backend_event(BackendEvent::Chat {
        pending,
        outcome: ChatOutcome::Reply(reply.clone()),
    });
    assert!(view.is_animating());

    let mut saw_cursor = false;
    while let Some(event) = rx.recv().await {
        if !view.on_typing_event(&event) {
            continue;
        }
        let texts = line_texts(&view.transcript_lines(200));
        if texts.iter().any(|t| t.ends_with(crate::ui::layout::TYPING_CURSOR)) {
            saw_cursor = true;
        }
        if matches!(event, TypingEvent::Finished { .. }) {
            break;
        }
    }

    assert!(saw_cursor);
    assert!(!view.is_animating());
    let last = view.conversation().messages().last().expect("reply");
    assert!(!last.is_new);
    let texts = line_texts(&view.transcript_lines(200));
    assert!(!texts.iter().any(|t| t.contains(crate::ui::layout::TYPING_CURSOR)));
}

#[tokio::test(start_paused = true)]
async fn escape_skips_running_animations() {
    let (mut view, _rx) = view_with(true);
    let pending = send(&mut view, "Hello");
    view.on_backend_event(BackendEvent::Chat {
        pending,
        outcome: ChatOutcome::Reply("x".repeat(400)),
    });
    assert!(view.is_animating());

    assert!(matches!(view.handle_key(key(KeyCode::Esc)), KeyAction::Redraw));
    assert!(!view.is_animating());
    assert!(view.conversation().messages().iter().all(|m| !m.is_new));
    assert!(matches!(view.handle_key(key(KeyCode::Esc)), KeyAction::Ignored));
}

#[test]
fn storage_events_for_other_sessions_are_ignored() {
    let (mut view, _rx) = view_with(false);
    let pending = send(&mut view, "Hello");
    view.on_backend_event(BackendEvent::Chat {
        pending,
        outcome: ChatOutcome::Reply("Hi".into()),
    });

    let other = StorageEvent {
        key: messages_key_for_session(&SessionId::new("s-2")),
        new_value: Some("[]".into()),
    };
    assert!(!view.on_storage_event(&other));
    assert_eq!(view.conversation().messages().len(), 2);
}

#[test]
fn storage_events_for_this_session_replace_the_view() {
    let (mut view, _rx) = view_with(false);
    let external = vec![
        ChatMessage::user(MessageId::new("1"), "from another window"),
        ChatMessage::ai(MessageId::new("2"), "**bold** reply"),
    ];
    let event = StorageEvent {
        key: messages_key_for_session(&SessionId::new("s-1")),
        new_value: Some(serde_json::to_string(&external).expect("encode")),
    };

    assert!(view.on_storage_event(&event));
    let texts = line_texts(&view.transcript_lines(60));
    assert!(texts.iter().any(|t| t == "from another window"));
    assert!(texts.iter().any(|t| t == "bold reply"));

    let removed = StorageEvent {
        key: messages_key_for_session(&SessionId::new("s-1")),
        new_value: None,
    };
    assert!(view.on_storage_event(&removed));
    assert!(view.transcript_lines(60).is_empty());
}

#[test]
fn kundli_submission_starts_a_fresh_transcript() {
    let (conversation, storage) = conversation("s-k");
    let (mut view, _rx) = ChatView::new(
        conversation,
        Theme::dark_default(),
        LayoutConfig::default(),
        false,
        TypingPace::default(),
    );
    let pending = send(&mut view, "old question");
    view.on_backend_event(BackendEvent::Chat {
        pending,
        outcome: ChatOutcome::Reply("old answer".into()),
    });

    let details = crate::core::birth::BirthForm {
        year: "1990".into(),
        month: "1".into(),
        date: "15".into(),
        hours: "6".into(),
        minutes: "30".into(),
        seconds: "0".into(),
        latitude: "28.61".into(),
        longitude: "77.21".into(),
        ..Default::default()
    }
    .into_details()
    .expect("valid form");

    let pending = view.begin_kundli(&details).expect("accepted");
    assert!(view.is_loading());
    assert_eq!(view.conversation().messages().len(), 1);

    view.on_backend_event(BackendEvent::Kundli {
        pending,
        result: Ok("## Lagna: Capricorn".into()),
    });
    let texts = line_texts(&view.transcript_lines(80));
    assert!(texts.iter().any(|t| t == "Lagna: Capricorn"));
    assert!(!texts.iter().any(|t| t.contains("old answer")));

    let stored = storage
        .get_item(&messages_key_for_session(&SessionId::new("s-k")))
        .expect("read")
        .expect("saved");
    assert!(stored.contains("Lagna: Capricorn"));
}

#[test]
fn paging_scrolls_by_the_pane_height() {
    let (mut view, _rx) = view_with(false);
    assert_eq!(view.scroll_offset(100, 10), 90);

    view.handle_key(key(KeyCode::PageUp));
    assert_eq!(view.scroll_offset(100, 10), 80);

    view.scroll_up(1_000);
    assert_eq!(view.scroll_offset(100, 10), 0);
    view.handle_key(key(KeyCode::PageDown));
    assert_eq!(view.scroll_offset(100, 10), 10);

    view.scroll_to_bottom();
    assert_eq!(view.scroll_offset(5, 10), 0);
}

#[test]
fn pulse_cycles_through_glyphs() {
    assert_eq!(pulse_symbol(Duration::from_millis(0)), "○");
    assert_eq!(pulse_symbol(Duration::from_millis(250)), "◐");
    assert_eq!(pulse_symbol(Duration::from_millis(450)), "●");
    assert_eq!(pulse_symbol(Duration::from_millis(1000)), "○");
}
