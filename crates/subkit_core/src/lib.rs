//! Subkit Core - subtitle interchange engine
//!
//! Reads SRT, SSA/ASS, EBU STL, TTML and WebVTT into one document model,
//! transforms it (shift, fragment, merge, optimize...) and writes it back
//! out in any of those formats.

pub mod config;
pub mod logging;
pub mod subtitles;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
