//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod ask;
pub mod kundli;
pub mod session;
pub mod settings;


use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use ratatui::crossterm::terminal;
use tracing::debug;

use crate::api::{AstrologyBackend, BackendClient};
use crate::cli::ask::run_ask;
use crate::cli::kundli::{run_kundli, KundliArgs};
use crate::cli::session::{run_session, SessionCommands};
use crate::cli::settings::{apply_set, apply_unset, describe_all, SettingRegistry};
use crate::core::config::data::{path_display, Config};
use crate::core::conversation::Conversation;
use crate::core::session::{SessionContext, SessionStore};
use crate::core::storage::{FileStorage, Storage};
use crate::proxy::{self, ProxyState};
use crate::ui::chat_loop::{run_chat, ChatOptions};
use crate::ui::markdown::{render_markdown, MarkdownRenderConfig};
use crate::ui::theme::Theme;
use crate::utils::logging::{init_tracing, LogTarget};

#[derive(Parser)]
#[command(name = "nakshatra", version)]
#[command(about = "A terminal Kundali chat client for the Nakshatra astrology backend")]
#[command(
    long_about = "Nakshatra submits your birth details to an astrology backend and lets you \
chat about the resulting Kundali in a full-screen terminal interface. Transcripts are kept \
per session in a local store, so a second window on the same session stays in sync.\n\n\
Backend URL (first match wins):\n\
  --backend-url            Command-line flag\n\
  NAKSHATRA_BACKEND_URL    Environment variable\n\
  backend_url              Config file key (see 'nakshatra set')\n\
  http://localhost:8000    Built-in default\n\n\
Controls:\n\
  Enter             Send the message\n\
  Alt/Shift+Enter   Insert a new line\n\
  PgUp/PgDn         Scroll through the conversation\n\
  Esc               Show replies that are still typing in full\n\
  Ctrl+C            Quit the application\n\n\
Logging:\n\
  RUST_LOG overrides the default level; --log writes to a file instead of stderr."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Astrology backend base URL
    #[arg(short = 'b', long, global = true, value_name = "URL")]
    pub backend_url: Option<String>,

    /// Session id to use instead of the stored one
    #[arg(short = 's', long, global = true, value_name = "ID")]
    pub session: Option<String>,

    /// Write diagnostic logs to the specified file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// Submit birth details and open the chat with your Kundali
    Kundli(KundliArgs),
    /// Ask one question without the full-screen interface
    Ask {
        /// The question to ask
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// Show or manage the stored session
    Session {
        #[command(subcommand)]
        command: Option<SessionCommands>,
    },
    /// Wake the backend and report whether it answers
    Ping,
    /// Run the HTTP proxy that forwards /api requests to the backend
    Serve {
        /// Address to listen on (e.g., 127.0.0.1:3000)
        #[arg(long, value_name = "ADDR")]
        listen: Option<String>,
    },
    /// Set configuration values, or list them when no key is given
    Set {
        /// Configuration key to set
        key: Option<String>,
        /// Value to set for the key
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

impl Commands {
    /// Commands that take over the terminal cannot log to stderr.
    fn owns_terminal(&self) -> bool {
        match self {
            Commands::Chat => true,
            Commands::Kundli(args) => !args.no_chat,
            _ => false,
        }
    }

    fn default_log_level(&self) -> &'static str {
        match self {
            Commands::Serve { .. } => "info",
            _ => "warn",
        }
    }
}

/// Shared state every command needs: configuration, the resolved backend
/// URL and the local store.
pub struct CliContext {
    pub config: Config,
    pub backend_url: String,
    pub storage: Arc<FileStorage>,
    pub store: SessionStore,
    pub requested_session: Option<String>,
}

impl CliContext {
    fn load(args: &Args) -> Result<Self, Box<dyn Error>> {
        let config = Config::load()?;
        let backend_url = config.resolve_backend_url(args.backend_url.as_deref());
        let storage = Arc::new(FileStorage::open_default()?);
        let shared: Arc<dyn Storage> = storage.clone();
        debug!(
            backend = %backend_url,
            store = %path_display(storage.path()),
            "loaded context"
        );
        Ok(Self {
            config,
            backend_url,
            storage,
            store: SessionStore::new(shared),
            requested_session: args.session.clone(),
        })
    }

    pub fn backend(&self) -> Arc<dyn AstrologyBackend> {
        Arc::new(BackendClient::new(self.backend_url.clone()))
    }

    pub fn session(&self) -> Result<SessionContext, Box<dyn Error>> {
        Ok(SessionContext::resolve(
            self.store.clone(),
            self.requested_session.as_deref(),
        )?)
    }

    pub fn theme(&self) -> Theme {
        Theme::from_name(self.config.theme.as_deref().unwrap_or("dark"))
    }

    pub fn chat_options(
        &self,
        conversation: Conversation,
        kundli: Option<crate::core::birth::BirthDetails>,
    ) -> ChatOptions {
        ChatOptions {
            backend: self.backend(),
            conversation,
            theme: self.theme(),
            markdown_enabled: self.config.markdown_enabled(),
            syntax_enabled: self.config.syntax_enabled(),
            typing_enabled: self.config.typing_animation_enabled(),
            request_timeout: self.config.request_timeout(),
            storage: Some(self.storage.clone()),
            kundli,
        }
    }
}

/// Render `text` for stdout: markdown in the monochrome theme when enabled,
/// otherwise as is.
pub(crate) fn format_reply(text: &str, markdown: bool, width: Option<usize>) -> Vec<String> {
    if !markdown {
        return text.lines().map(str::to_string).collect();
    }
    let config = MarkdownRenderConfig {
        width,
        syntax_highlighting: false,
    };
    render_markdown(text, &Theme::monochrome(), &config)
        .iter()
        .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
        .collect()
}

pub(crate) fn terminal_width() -> Option<usize> {
    terminal::size().ok().map(|(w, _)| w as usize)
}

async fn run_ping(ctx: &CliContext) -> Result<(), Box<dyn Error>> {
    let session = ctx.session()?;
    let backend = ctx.backend();
    let url = &ctx.backend_url;
    match tokio::time::timeout(ctx.config.request_timeout(), backend.ping(&session.id)).await {
        Ok(Ok(())) => {
            println!("✅ Backend at {url} is awake");
            Ok(())
        }
        Ok(Err(e)) => {
            eprintln!("❌ Backend at {url} did not answer: {e}");
            std::process::exit(1);
        }
        Err(_) => {
            eprintln!("❌ Backend at {url} timed out");
            std::process::exit(1);
        }
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let mut args = Args::parse();
    let command = args.command.take().unwrap_or(Commands::Chat);

    let target = LogTarget::for_command(args.log.as_deref(), command.owns_terminal());
    if let Err(e) = init_tracing(command.default_log_level(), target) {
        eprintln!("❌ {e}");
        std::process::exit(1);
    }

    match command {
        Commands::Set { key, value } => {
            let registry = SettingRegistry::new();
            match key {
                Some(key) => match apply_set(&registry, &key, &value) {
                    Ok(message) => println!("{message}"),
                    Err(e) => {
                        e.print();
                        std::process::exit(e.exit_code());
                    }
                },
                None => {
                    let config = Config::load()?;
                    println!("Settings ({}):", path_display(Config::active_path()));
                    for line in describe_all(&registry, &config) {
                        println!("{line}");
                    }
                }
            }
            Ok(())
        }
        Commands::Unset { key } => {
            let registry = SettingRegistry::new();
            match apply_unset(&registry, &key) {
                Ok(message) => println!("{message}"),
                Err(e) => {
                    e.print();
                    std::process::exit(e.exit_code());
                }
            }
            Ok(())
        }
        Commands::Serve { listen } => {
            let config = Config::load()?;
            let backend_url = config.resolve_backend_url(args.backend_url.as_deref());
            let listen = listen.unwrap_or_else(|| config.listen_address().to_string());
            let state = ProxyState::new(backend_url, config.request_timeout())?;
            if let Err(e) = proxy::serve(&listen, state).await {
                eprintln!("❌ Proxy failed on {listen}: {e}");
                std::process::exit(1);
            }
            Ok(())
        }
        command => {
            let ctx = match CliContext::load(&args) {
                Ok(ctx) => ctx,
                Err(e) => {
                    eprintln!("❌ {e}");
                    std::process::exit(1);
                }
            };
            match command {
                Commands::Ask { prompt } => run_ask(prompt, &ctx).await,
                Commands::Kundli(kundli_args) => run_kundli(kundli_args, &ctx).await,
                Commands::Session { command } => run_session(command.unwrap_or_default(), &ctx),
                Commands::Ping => run_ping(&ctx).await,
                _ => {
                    let conversation = Conversation::open(ctx.session()?)?;
                    run_chat(ctx.chat_options(conversation, None)).await
                }
            }
        }
    }
}
