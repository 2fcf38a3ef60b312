//! Terminal UI layer for interactive chat sessions.
//!
//! The UI module owns rendering, layout, keyboard handling, and loop control
//! for the text user interface.
//!
//! Key submodules include:
//! - [`chat_loop`]: the main interaction loop that feeds key presses, backend
//!   replies and store changes into one [`chat_loop::ChatView`].
//! - [`renderer`] and [`layout`]: view composition and frame output.
//! - [`markdown`]: AI replies as styled lines.
//! - [`typing`]: the progressive reveal of new replies.
//! - [`theme`]: color/style policy.
//!
//! Ownership boundary: this layer presents and captures interaction state, while
//! [`crate::core`] owns the transcript, sessions and backend coordination.

pub mod chat_loop;
pub mod layout;
pub mod markdown;
pub mod renderer;
pub mod theme;
pub mod typing;
