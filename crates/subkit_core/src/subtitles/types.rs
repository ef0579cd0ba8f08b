//! Core document model.
//!
//! A [`Document`] owns its items, regions and styles. Items, line items,
//! regions and styles refer to regions and styles by ID; every ID must be a
//! key of the owning document's maps.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::NaiveDate;

use super::style::StyleAttributes;

/// Supported subtitle formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleFormat {
    /// SubRip (.srt)
    Srt,
    /// SubStation Alpha / Advanced SubStation Alpha (.ssa, .ass)
    Ssa,
    /// EBU Tech 3264 binary subtitles (.stl)
    Stl,
    /// Timed Text Markup Language (.ttml)
    Ttml,
    /// WebVTT (.vtt)
    WebVtt,
}

impl SubtitleFormat {
    /// Detect format from a file extension or a file name, case-insensitive.
    pub fn from_extension(hint: &str) -> Option<Self> {
        let ext = match hint.rsplit_once('.') {
            Some((_, ext)) => ext,
            None => hint,
        };
        match ext.to_ascii_lowercase().as_str() {
            "srt" => Some(Self::Srt),
            "ssa" | "ass" => Some(Self::Ssa),
            "stl" => Some(Self::Stl),
            "ttml" => Some(Self::Ttml),
            "vtt" => Some(Self::WebVtt),
            _ => None,
        }
    }

    /// Get the typical file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Ssa => "ssa",
            Self::Stl => "stl",
            Self::Ttml => "ttml",
            Self::WebVtt => "vtt",
        }
    }
}

/// Root aggregate: cues plus the regions and styles they refer to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// Cues, not necessarily sorted until [`Document::order`] runs.
    pub items: Vec<Item>,
    pub regions: BTreeMap<String, Region>,
    pub styles: BTreeMap<String, Style>,
    pub metadata: Option<Metadata>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn style(&self, id: &str) -> Option<&Style> {
        self.styles.get(id)
    }

    pub fn region(&self, id: &str) -> Option<&Region> {
        self.regions.get(id)
    }

    /// Inline attributes of the style an item refers to, if any.
    pub fn item_style_attributes(&self, item: &Item) -> Option<&StyleAttributes> {
        item.style
            .as_deref()
            .and_then(|id| self.style(id))
            .and_then(|s| s.inline_style.as_ref())
    }

    /// Inline attributes of a region, falling back to the region's style.
    pub fn region_attributes<'a>(&'a self, region: &'a Region) -> impl Iterator<Item = &'a StyleAttributes> {
        let parent = region
            .style
            .as_deref()
            .and_then(|id| self.style(id))
            .and_then(|s| s.inline_style.as_ref());
        region.inline_style.as_ref().into_iter().chain(parent)
    }

    /// Metadata, created on first access.
    pub fn metadata_mut(&mut self) -> &mut Metadata {
        self.metadata.get_or_insert_with(Metadata::default)
    }
}

/// One cue.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Item {
    pub start_at: Duration,
    pub end_at: Duration,
    /// Source numbering, informational only.
    pub index: i32,
    pub lines: Vec<Line>,
    /// Region ID.
    pub region: Option<String>,
    /// Style ID.
    pub style: Option<String>,
    pub inline_style: Option<StyleAttributes>,
    /// Annotations such as WebVTT `NOTE` blocks.
    pub comments: Vec<String>,
}

impl Item {
    /// Single-line cue with one unstyled run.
    pub fn with_text(start_at: Duration, end_at: Duration, text: impl Into<String>) -> Self {
        Self {
            start_at,
            end_at,
            lines: vec![Line::from_text(text)],
            ..Default::default()
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                f.write_str(" - ")?;
            }
            write!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// One visual row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Line {
    pub items: Vec<LineItem>,
    /// Speaker from a WebVTT `<v>` tag.
    pub voice_name: Option<String>,
}

impl Line {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            items: vec![LineItem {
                text: text.into(),
                ..Default::default()
            }],
            voice_name: None,
        }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(&item.text)?;
        }
        Ok(())
    }
}

/// A text run with optional formatting.
///
/// Inline style overrides the named style, which overrides the region style.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineItem {
    pub text: String,
    pub inline_style: Option<StyleAttributes>,
    /// Style ID.
    pub style: Option<String>,
    /// Karaoke reveal time from a WebVTT inline timestamp.
    pub start_at: Option<Duration>,
}

/// Named placement descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Region {
    pub id: String,
    pub inline_style: Option<StyleAttributes>,
    /// Style ID.
    pub style: Option<String>,
}

/// Named, reusable formatting. `style` points at a single parent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Style {
    pub id: String,
    pub inline_style: Option<StyleAttributes>,
    /// Parent style ID.
    pub style: Option<String>,
}

/// Source language, as far as the binary and XML formats can express it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Chinese,
    English,
    French,
    Japanese,
    Norwegian,
}

impl Language {
    const ALL: [Language; 5] = [
        Language::Chinese,
        Language::English,
        Language::French,
        Language::Japanese,
        Language::Norwegian,
    ];

    /// `xml:lang` code.
    pub fn ttml_code(&self) -> &'static str {
        match self {
            Self::Chinese => "zh",
            Self::English => "en",
            Self::French => "fr",
            Self::Japanese => "ja",
            Self::Norwegian => "no",
        }
    }

    /// EBU Tech 3264 language code (GSI bytes 14-15).
    pub fn stl_code(&self) -> &'static str {
        match self {
            Self::Chinese => "75",
            Self::English => "09",
            Self::French => "0F",
            Self::Japanese => "69",
            Self::Norwegian => "1E",
        }
    }

    pub fn from_ttml_code(code: &str) -> Option<Self> {
        let primary = code.split('-').next().unwrap_or(code).to_ascii_lowercase();
        Self::ALL.into_iter().find(|l| l.ttml_code() == primary)
    }

    pub fn from_stl_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|l| l.stl_code().eq_ignore_ascii_case(code.trim()))
    }
}

/// WebVTT `X-TIMESTAMP-MAP` header: maps a local cue time to an MPEG-TS
/// presentation timestamp (90kHz clock).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WebVttTimestampMap {
    pub local: Duration,
    pub mpegts: i64,
}

impl WebVttTimestampMap {
    /// `mpegts / 90000 s - local`, negative when local is ahead.
    pub fn offset_millis(&self) -> i64 {
        let local = i64::try_from(self.local.as_millis()).unwrap_or(i64::MAX);
        self.mpegts.saturating_mul(1000) / 90_000 - local
    }
}

/// SSA `[Script Info]` fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SsaMetadata {
    pub collisions: Option<String>,
    pub original_editing: Option<String>,
    pub original_script: Option<String>,
    pub original_timing: Option<String>,
    pub original_translation: Option<String>,
    pub play_depth: Option<i32>,
    pub play_res_x: Option<i32>,
    pub play_res_y: Option<i32>,
    pub script_type: Option<String>,
    pub script_updated_by: Option<String>,
    pub synch_point: Option<String>,
    pub timer: Option<f64>,
    pub update_details: Option<String>,
    pub wrap_style: Option<String>,
}

/// STL GSI block fields not covered by the general metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StlMetadata {
    pub country_of_origin: Option<String>,
    pub creation_date: Option<NaiveDate>,
    pub display_standard_code: Option<String>,
    pub editor_contact_details: Option<String>,
    pub editor_name: Option<String>,
    pub max_characters_per_row: Option<i32>,
    pub max_rows: Option<i32>,
    pub original_episode_title: Option<String>,
    pub publisher: Option<String>,
    pub revision_date: Option<NaiveDate>,
    pub revision_number: i32,
    pub subtitle_list_reference_code: Option<String>,
    pub timecode_start_of_programme: Duration,
    pub translated_episode_title: Option<String>,
    pub translated_program_title: Option<String>,
    pub translator_contact_details: Option<String>,
    pub translator_name: Option<String>,
}

/// Document-level descriptors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub comments: Vec<String>,
    /// Frames per second, 0 when unknown.
    pub framerate: u32,
    pub language: Option<Language>,
    pub title: Option<String>,
    pub ttml_copyright: Option<String>,
    pub ssa: SsaMetadata,
    pub stl: StlMetadata,
    pub webvtt_timestamp_map: Option<WebVttTimestampMap>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension() {
        assert_eq!(SubtitleFormat::from_extension("movie.SRT"), Some(SubtitleFormat::Srt));
        assert_eq!(SubtitleFormat::from_extension("ass"), Some(SubtitleFormat::Ssa));
        assert_eq!(SubtitleFormat::from_extension(".vtt"), Some(SubtitleFormat::WebVtt));
        assert_eq!(SubtitleFormat::from_extension("a.b.ttml"), Some(SubtitleFormat::Ttml));
        assert_eq!(SubtitleFormat::from_extension("sub.txt"), None);
    }

    #[test]
    fn item_and_line_display() {
        let mut item = Item::with_text(Duration::ZERO, Duration::from_secs(1), "first");
        item.lines[0].items.push(LineItem {
            text: "run".to_string(),
            ..Default::default()
        });
        item.lines.push(Line::from_text("second"));
        assert_eq!(item.lines[0].to_string(), "first run");
        assert_eq!(item.to_string(), "first run - second");
    }

    #[test]
    fn language_codes() {
        assert_eq!(Language::from_ttml_code("fr-FR"), Some(Language::French));
        assert_eq!(Language::from_stl_code("0f"), Some(Language::French));
        assert_eq!(Language::Norwegian.stl_code(), "1E");
        assert_eq!(Language::from_ttml_code("de"), None);
    }

    #[test]
    fn timestamp_map_offset() {
        let map = WebVttTimestampMap {
            local: Duration::from_millis(500),
            mpegts: 180_000,
        };
        assert_eq!(map.offset_millis(), 1500);
    }
}
