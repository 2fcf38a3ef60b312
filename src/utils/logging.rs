//! Diagnostic logging setup.
//!
//! Everything logs through `tracing`; this module installs the subscriber
//! once per process. `RUST_LOG` overrides the per-command default level. The
//! full-screen chat page cannot share the terminal with log lines, so there
//! logs are discarded unless a file was given.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Cannot open log file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Logging was already initialised")]
    AlreadyInitialised,
}

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
    Discard,
}

impl LogTarget {
    /// Pick the target for a command: an explicit file always wins, otherwise
    /// stderr unless the command owns the terminal.
    pub fn for_command(log_file: Option<&Path>, owns_terminal: bool) -> Self {
        match log_file {
            Some(path) => LogTarget::File(path.to_path_buf()),
            None if owns_terminal => LogTarget::Discard,
            None => LogTarget::Stderr,
        }
    }
}

fn open_log_file(path: &Path) -> Result<File, LoggingError> {
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| LoggingError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggingError::Open {
            path: path.to_path_buf(),
            source,
        })
}

fn build_filter(default_level: &str) -> Result<EnvFilter, LoggingError> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(spec) if !spec.trim().is_empty() => {
            EnvFilter::try_new(spec).map_err(|err| LoggingError::Filter(err.to_string()))
        }
        _ => EnvFilter::try_new(default_level).map_err(|err| LoggingError::Filter(err.to_string())),
    }
}

/// Install the global subscriber.
pub fn init_tracing(default_level: &str, target: LogTarget) -> Result<(), LoggingError> {
    let filter = build_filter(default_level)?;
    let (writer, ansi) = match target {
        LogTarget::Stderr => (BoxMakeWriter::new(io::stderr), true),
        LogTarget::File(path) => (BoxMakeWriter::new(Mutex::new(open_log_file(&path)?)), false),
        LogTarget::Discard => (BoxMakeWriter::new(io::sink), false),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(false)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialised)
}
