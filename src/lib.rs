//! Nakshatra is a terminal chat client for a Vedic astrology (Kundali) backend.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns birth details, chat transcripts, session identity, the
//!   key/value store and configuration.
//! - [`api`] talks to the astrology backend over HTTP.
//! - [`ui`] renders the terminal interface and runs the interactive event loop
//!   that drives user input, typing animation and display updates.
//! - [`proxy`] is a small HTTP server that forwards `/api` requests to the
//!   backend for browser front ends.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod proxy;
pub mod ui;
pub mod utils;
