//! Subtitle parsers for each supported format.
//!
//! Text parsers are pure functions over `&str`; the STL parser works on raw
//! bytes.

mod srt;
mod ssa;
mod stl;
mod ttml;
mod webvtt;

pub use srt::parse_srt;
pub use ssa::parse_ssa;
pub use stl::parse_stl;
pub use ttml::parse_ttml;
pub use webvtt::{parse_timestamp_map, parse_webvtt};

use crate::subtitles::error::{ParseError, ParseResult};
use crate::subtitles::types::{Document, SubtitleFormat};
use crate::subtitles::ReadOptions;

/// Parse raw content in the given format.
///
/// Text formats must be valid UTF-8; a leading byte order mark is ignored.
pub fn parse_content(content: &[u8], format: SubtitleFormat, options: &ReadOptions) -> ParseResult<Document> {
    match format {
        SubtitleFormat::Stl => parse_stl(content, options),
        SubtitleFormat::Srt => parse_srt(decode_text(content)?),
        SubtitleFormat::Ssa => parse_ssa(decode_text(content)?),
        SubtitleFormat::Ttml => parse_ttml(decode_text(content)?),
        SubtitleFormat::WebVtt => parse_webvtt(decode_text(content)?),
    }
}

fn decode_text(content: &[u8]) -> ParseResult<&str> {
    let text = std::str::from_utf8(content)
        .map_err(|e| ParseError::EncodingError(format!("content is not valid UTF-8: {}", e)))?;
    Ok(strip_bom(text))
}

/// Drop a leading UTF-8 byte order mark.
pub(crate) fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_utf8() {
        let err = parse_content(&[0xff, 0xfe, b'1'], SubtitleFormat::Srt, &ReadOptions::default())
            .unwrap_err();
        assert!(matches!(err, ParseError::EncodingError(_)));
    }

    #[test]
    fn strips_bom() {
        assert_eq!(strip_bom("\u{feff}WEBVTT"), "WEBVTT");
        assert_eq!(strip_bom("WEBVTT"), "WEBVTT");
    }
}
