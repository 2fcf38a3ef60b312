//! TUI-less "ask" command

use std::error::Error;
use std::time::Duration;

use crate::api::AstrologyBackend;
use crate::cli::{format_reply, terminal_width, CliContext};
use crate::core::conversation::{request_reply, ChatOutcome, Conversation};
use crate::core::message::MessageId;

pub async fn run_ask(prompt: Vec<String>, ctx: &CliContext) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        print_usage_and_exit();
    }

    let mut conversation = Conversation::open(ctx.session()?)?;
    let backend = ctx.backend();
    let Some((reply, failed)) = ask_once(
        &mut conversation,
        backend.as_ref(),
        &prompt,
        ctx.config.request_timeout(),
    )
    .await
    else {
        print_usage_and_exit();
    };

    for line in format_reply(&reply, ctx.config.markdown_enabled(), terminal_width()) {
        println!("{line}");
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

fn print_usage_and_exit() -> ! {
    eprintln!("Usage: nakshatra ask <question>");
    std::process::exit(1);
}

/// Send `prompt` and wait for the single AI bubble it produces. Returns the
/// bubble text and whether it is the fallback, or `None` for blank input.
pub(crate) async fn ask_once(
    conversation: &mut Conversation,
    backend: &dyn AstrologyBackend,
    prompt: &str,
    timeout: Duration,
) -> Option<(String, bool)> {
    let pending = conversation.begin_send(prompt)?;
    let outcome = request_reply(backend, &pending.session, &pending.query, timeout).await;
    let failed = matches!(outcome, ChatOutcome::Failed(_));

    let id = conversation.complete_send(pending, outcome);
    conversation.mark_seen(&id);
    Some((message_content(conversation, &id), failed))
}

pub(crate) fn message_content(conversation: &Conversation, id: &MessageId) -> String {
    conversation
        .messages()
        .iter()
        .find(|m| &m.message.id == id)
        .map(|m| m.message.content.clone())
        .unwrap_or_default()
}
