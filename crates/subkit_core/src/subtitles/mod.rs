//! Subtitle document model and format codecs.
//!
//! # Architecture
//!
//! - **types**: the [`Document`] tree (items, lines, runs, regions, styles)
//! - **style**: per-format style attributes and cross-format propagation
//! - **operations**: in-place document transformations
//! - **parsers**: one pure function per format, bytes or text in, `Document` out
//! - **writers**: one pure function per format, `Document` in, text or bytes out
//!
//! # Usage
//!
//! ```ignore
//! use subkit_core::subtitles::{open, SubtitleFormat};
//!
//! let mut doc = open(std::fs::File::open("movie.srt")?, "movie.srt")?;
//! doc.add(chrono::TimeDelta::seconds(2));
//! doc.write_to(std::fs::File::create("movie.vtt")?, SubtitleFormat::WebVtt)?;
//! ```

mod color;
mod duration;
mod error;
mod escape;
mod operations;
pub mod parsers;
pub mod stl;
mod style;
pub mod teletext;
mod types;
pub mod writers;

use std::io::{Read, Write};

// Re-export core types
pub use color::{css_class_for, Color};
pub use duration::{format_duration, parse_duration, parse_duration_any};
pub use error::{ParseError, ParseResult, SubtitleError, SubtitleResult};
pub use style::{
    Justification, SrtStyle, SsaStyle, StlPosition, StlStyle, StyleAttributes, TeletextStyle,
    TtmlStyle, WebVttPosition, WebVttStyle, WebVttTag,
};
pub use types::{
    Document, Item, Language, Line, LineItem, Metadata, Region, SsaMetadata, StlMetadata, Style,
    SubtitleFormat, WebVttTimestampMap,
};

// Re-export parsers and writers
pub use parsers::{parse_content, parse_srt, parse_ssa, parse_stl, parse_ttml, parse_webvtt};
pub use writers::{write_content, write_srt, write_ssa, write_stl, write_ttml, write_webvtt};

/// Options that change how documents are read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Keep STL timecodes as written instead of subtracting the GSI
    /// start-of-programme timecode.
    pub stl_ignore_timecode_start_of_programme: bool,
}

/// Options that change how documents are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    /// Prefix SRT output with a UTF-8 byte order mark.
    pub srt_write_bom: bool,
    /// Decimal places of SSA float fields.
    pub ssa_float_precision: usize,
    /// STL frame rate when the document has none.
    pub stl_default_framerate: u32,
    /// STL country of origin when the document has none.
    pub stl_default_country: String,
    /// Spaces per TTML nesting level.
    pub ttml_indent: usize,
    /// Number WebVTT cues with their source index instead of 1, 2, 3...
    pub webvtt_write_source_index: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            srt_write_bom: true,
            ssa_float_precision: 3,
            stl_default_framerate: 25,
            stl_default_country: "FRA".to_string(),
            ttml_indent: 4,
            webvtt_write_source_index: false,
        }
    }
}

/// Read a document, choosing the codec from a file name or extension.
///
/// # Arguments
/// * `reader` - Source of the subtitle bytes.
/// * `hint` - File name or extension, such as `movie.srt` or `vtt`.
///
/// # Returns
/// * `Ok(Document)` - The parsed document.
/// * `Err(SubtitleError)` - Unknown extension, I/O failure or parse error.
pub fn open(reader: impl Read, hint: &str) -> SubtitleResult<Document> {
    open_with(reader, hint, &ReadOptions::default())
}

/// [`open`] with explicit read options.
pub fn open_with(mut reader: impl Read, hint: &str, options: &ReadOptions) -> SubtitleResult<Document> {
    let format = SubtitleFormat::from_extension(hint)
        .ok_or_else(|| SubtitleError::InvalidExtension(hint.to_string()))?;

    let mut content = Vec::new();
    reader.read_to_end(&mut content)?;

    let doc = parse_content(&content, format, options)?;
    tracing::debug!(
        format = format.extension(),
        items = doc.items.len(),
        "Parsed subtitles"
    );
    Ok(doc)
}

impl Document {
    /// Serialize in `format` with default options.
    pub fn write_to(&self, writer: impl Write, format: SubtitleFormat) -> SubtitleResult<()> {
        self.write_to_with(writer, format, &WriteOptions::default())
    }

    /// Serialize in `format`.
    ///
    /// # Returns
    /// * `Err(SubtitleError::NoSubtitlesToWrite)` - The document has no items.
    /// * `Err(SubtitleError::Io)` - The writer failed.
    pub fn write_to_with(
        &self,
        mut writer: impl Write,
        format: SubtitleFormat,
        options: &WriteOptions,
    ) -> SubtitleResult<()> {
        if self.items.is_empty() {
            return Err(SubtitleError::NoSubtitlesToWrite);
        }

        let content = write_content(self, format, options);
        writer.write_all(&content)?;
        writer.flush()?;
        Ok(())
    }
}
