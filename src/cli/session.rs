//! `nakshatra session` subcommands

use std::error::Error;

use clap::Subcommand;

use crate::cli::{format_reply, terminal_width, CliContext};
use crate::core::message::Sender;

#[derive(Subcommand, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionCommands {
    /// Print the current session id, creating one if needed (default)
    #[default]
    Id,
    /// Start a new session; earlier transcripts stay in the store
    New,
    /// Print the transcript of the current session
    Show,
    /// Delete the transcript of the current session
    Clear,
    /// List every session with a stored transcript
    List,
}

pub fn run_session(command: SessionCommands, ctx: &CliContext) -> Result<(), Box<dyn Error>> {
    match command {
        SessionCommands::Id => {
            let session = ctx.session()?;
            println!("{}", session.id);
        }
        SessionCommands::New => {
            let id = ctx.store.new_session_id()?;
            println!("✅ Started session {id}");
        }
        SessionCommands::Show => {
            let session = ctx.session()?;
            let messages = session.load_messages()?;
            if messages.is_empty() {
                println!("No messages in session {}", session.id);
                return Ok(());
            }
            let width = terminal_width();
            for message in messages {
                println!("{}:", message.sender.label());
                let markdown = message.sender == Sender::Ai && ctx.config.markdown_enabled();
                for line in format_reply(&message.content, markdown, width) {
                    println!("{line}");
                }
                println!();
            }
        }
        SessionCommands::Clear => {
            let session = ctx.session()?;
            session.store.clear_messages(&session.id)?;
            println!("✅ Cleared transcript for session {}", session.id);
        }
        SessionCommands::List => {
            let current = ctx.store.current_session_id()?;
            let sessions = ctx.store.list_sessions()?;
            if sessions.is_empty() {
                println!("No stored transcripts");
            }
            for sid in sessions {
                let marker = if current.as_ref() == Some(&sid) { "*" } else { " " };
                let count = ctx.store.load_messages(&sid)?.len();
                println!("{marker} {sid} ({count} messages)");
            }
        }
    }
    Ok(())
}
