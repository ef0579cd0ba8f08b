//! Subtitle writers for each supported format.
//!
//! Each writer is a pure function that takes a [`Document`] and returns the
//! encoded file: a `String` for the text formats, bytes for STL.

mod srt;
mod ssa;
mod stl;
mod ttml;
mod webvtt;

pub use srt::write_srt;
pub use ssa::write_ssa;
pub use stl::write_stl;
pub use ttml::write_ttml;
pub use webvtt::write_webvtt;

use crate::subtitles::types::{Document, SubtitleFormat};
use crate::subtitles::WriteOptions;

/// Encode a document in the specified format.
pub fn write_content(doc: &Document, format: SubtitleFormat, options: &WriteOptions) -> Vec<u8> {
    match format {
        SubtitleFormat::Srt => write_srt(doc, options).into_bytes(),
        SubtitleFormat::Ssa => write_ssa(doc, options).into_bytes(),
        SubtitleFormat::Stl => write_stl(doc, options),
        SubtitleFormat::Ttml => write_ttml(doc, options).into_bytes(),
        SubtitleFormat::WebVtt => write_webvtt(doc, options).into_bytes(),
    }
}
