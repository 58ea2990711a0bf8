//! markpane converts markdown into HTML fragments.
//!
//! The conversion engine lives in [`render`]; [`convert_to_html`] is the
//! whole public contract for embedding callers. The [`preview`] and
//! [`config`] modules back the `markpane` command line.

pub mod config;
pub mod preview;
pub mod render;

pub use render::{Heading, MarkdownEngine, Rendered, convert_to_html};
