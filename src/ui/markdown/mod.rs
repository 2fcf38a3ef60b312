//! Markdown to styled terminal lines for AI replies.
//!
//! Rendering is a single pass over pulldown-cmark events. It tolerates any
//! prefix of a document, which is what a reply looks like while it is being
//! revealed: unterminated emphasis renders as literal text and an open code
//! fence or table is drawn with whatever has arrived so far.

mod code;
mod render;
mod table;

#[cfg(test)]
mod tests;

pub use render::{render_markdown, MarkdownRenderConfig};
