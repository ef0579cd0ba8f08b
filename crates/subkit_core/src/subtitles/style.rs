//! Style attributes and cross-format propagation.
//!
//! [`StyleAttributes`] holds one field cluster per format. A reader sets the
//! fields of its own cluster and calls the matching `propagate_*` method,
//! which fills in the closest equivalent in every other cluster so that a
//! writer for another format finds something it understands.
//!
//! Propagation only ever sets fields. Running it twice is a no-op.

use std::fmt;

use super::color::Color;

const TTML_FONT_WEIGHT_BOLD: &str = "bold";
const TTML_FONT_STYLE_ITALIC: &str = "italic";
const TTML_TEXT_DECORATION_UNDERLINE: &str = "underline";

/// Line height, in percent of the viewport, used to turn a TTML extent
/// into a number of WebVTT region lines.
const TTML_LINE_HEIGHT_PERCENT: i32 = 5;

/// All formatting hints, grouped by the format they come from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleAttributes {
    pub srt: SrtStyle,
    pub ssa: SsaStyle,
    pub stl: StlStyle,
    pub teletext: TeletextStyle,
    pub ttml: TtmlStyle,
    pub webvtt: WebVttStyle,
}

/// SubRip inline markup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SrtStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    /// `color` attribute of a `<font>` tag, verbatim.
    pub color: Option<String>,
    /// `{\anN}` numpad position, 1 (bottom left) to 9 (top right).
    pub position: Option<u8>,
}

/// SubStation Alpha style fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SsaStyle {
    pub alignment: Option<i32>,
    pub alpha_level: Option<f64>,
    /// Degrees.
    pub angle: Option<f64>,
    pub back_colour: Option<Color>,
    pub bold: Option<bool>,
    pub border_style: Option<i32>,
    /// Raw `{...}` override block preceding a text run.
    pub effect: Option<String>,
    pub encoding: Option<i32>,
    pub font_name: Option<String>,
    pub font_size: Option<f64>,
    pub italic: Option<bool>,
    pub layer: Option<i32>,
    pub margin_left: Option<i32>,
    pub margin_right: Option<i32>,
    pub margin_vertical: Option<i32>,
    pub marked: Option<bool>,
    pub outline: Option<f64>,
    pub outline_colour: Option<Color>,
    pub primary_colour: Option<Color>,
    /// Percent.
    pub scale_x: Option<f64>,
    /// Percent.
    pub scale_y: Option<f64>,
    pub secondary_colour: Option<Color>,
    pub shadow: Option<f64>,
    pub spacing: Option<f64>,
    pub strikeout: Option<bool>,
    pub underline: Option<bool>,
}

/// EBU STL justification code (TTI byte 14).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Justification {
    Unchanged,
    Left,
    Centered,
    Right,
}

impl Justification {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(Self::Unchanged),
            0x01 => Some(Self::Left),
            0x02 => Some(Self::Centered),
            0x03 => Some(Self::Right),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::Unchanged => 0x00,
            Self::Left => 0x01,
            Self::Centered => 0x02,
            Self::Right => 0x03,
        }
    }
}

/// Row placement of an STL subtitle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StlPosition {
    pub vertical_position: i32,
    pub max_rows: i32,
    pub rows: i32,
}

/// EBU STL styling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StlStyle {
    pub boxing: Option<bool>,
    pub italics: Option<bool>,
    pub justification: Option<Justification>,
    pub position: Option<StlPosition>,
    pub underline: Option<bool>,
}

/// Teletext row attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeletextStyle {
    pub color: Option<Color>,
    pub double_height: Option<bool>,
    pub double_size: Option<bool>,
    pub double_width: Option<bool>,
    pub spaces_after: Option<i32>,
    pub spaces_before: Option<i32>,
}

/// TTML `tts:` attributes, verbatim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TtmlStyle {
    pub background_color: Option<String>,
    pub color: Option<String>,
    pub direction: Option<String>,
    pub display: Option<String>,
    pub display_align: Option<String>,
    pub extent: Option<String>,
    pub font_family: Option<String>,
    pub font_size: Option<String>,
    pub font_style: Option<String>,
    pub font_weight: Option<String>,
    pub line_height: Option<String>,
    pub opacity: Option<String>,
    pub origin: Option<String>,
    pub overflow: Option<String>,
    pub padding: Option<String>,
    pub show_background: Option<String>,
    pub text_align: Option<String>,
    pub text_decoration: Option<String>,
    pub text_outline: Option<String>,
    pub unicode_bidi: Option<String>,
    pub visibility: Option<String>,
    pub wrap_option: Option<String>,
    pub writing_mode: Option<String>,
    pub z_index: Option<i32>,
}

/// `position` cue setting: `x%` with an optional alignment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebVttPosition {
    pub x_position: String,
    pub alignment: Option<String>,
}

impl WebVttPosition {
    /// Parse `10%` or `10%,start`. Returns `None` for an empty value.
    pub fn parse(value: &str) -> Option<Self> {
        if value.trim().is_empty() {
            return None;
        }
        let position = match value.split_once(',') {
            Some((x, alignment)) if !alignment.contains(',') => Self {
                x_position: x.trim().to_string(),
                alignment: Some(alignment.trim().to_string()).filter(|a| !a.is_empty()),
            },
            _ => Self {
                x_position: value.trim().to_string(),
                alignment: None,
            },
        };
        Some(position)
    }
}

impl fmt::Display for WebVttPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alignment {
            Some(alignment) => write!(f, "{},{}", self.x_position, alignment),
            None => f.write_str(&self.x_position),
        }
    }
}

/// An open WebVTT cue text tag such as `<c.yellow.bg_blue>` or `<lang en>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebVttTag {
    pub name: String,
    pub classes: Vec<String>,
    pub annotation: Option<String>,
}

impl WebVttTag {
    pub fn start_tag(&self) -> String {
        let mut out = format!("<{}", self.name);
        for class in &self.classes {
            out.push('.');
            out.push_str(class);
        }
        if let Some(annotation) = &self.annotation {
            out.push(' ');
            out.push_str(annotation);
        }
        out.push('>');
        out
    }

    pub fn end_tag(&self) -> String {
        format!("</{}>", self.name)
    }
}

/// WebVTT cue settings, region settings and cue text markup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebVttStyle {
    pub align: Option<String>,
    pub bold: bool,
    pub italics: bool,
    pub line: Option<String>,
    pub lines: Option<i32>,
    pub position: Option<WebVttPosition>,
    pub region_anchor: Option<String>,
    pub scroll: Option<String>,
    pub size: Option<String>,
    /// Raw CSS lines of a `STYLE` block.
    pub styles: Vec<String>,
    /// Stack of tags open around a text run, outermost first.
    pub tags: Vec<WebVttTag>,
    pub underline: bool,
    pub vertical: Option<String>,
    pub viewport_anchor: Option<String>,
    pub width: Option<String>,
}

impl StyleAttributes {
    /// True when no field of any cluster is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn set_bold(&mut self) {
        self.srt.bold = true;
        self.ssa.bold = Some(true);
        self.ttml.font_weight = Some(TTML_FONT_WEIGHT_BOLD.to_string());
        self.webvtt.bold = true;
    }

    fn set_italic(&mut self) {
        self.srt.italic = true;
        self.ssa.italic = Some(true);
        self.stl.italics = Some(true);
        self.ttml.font_style = Some(TTML_FONT_STYLE_ITALIC.to_string());
        self.webvtt.italics = true;
    }

    fn set_underline(&mut self) {
        self.srt.underline = true;
        self.ssa.underline = Some(true);
        self.stl.underline = Some(true);
        self.ttml.text_decoration = Some(TTML_TEXT_DECORATION_UNDERLINE.to_string());
        self.webvtt.underline = true;
    }

    pub fn propagate_srt(&mut self) {
        if self.srt.bold {
            self.set_bold();
        }
        if self.srt.italic {
            self.set_italic();
        }
        if self.srt.underline {
            self.set_underline();
        }
        if self.ttml.color.is_none() {
            if let Some(color) = &self.srt.color {
                self.ttml.color = Some(color.clone());
            }
        }
    }

    pub fn propagate_ssa(&mut self) {
        if self.ssa.bold == Some(true) {
            self.set_bold();
        }
        if self.ssa.italic == Some(true) {
            self.set_italic();
        }
        if self.ssa.underline == Some(true) {
            self.set_underline();
        }
    }

    pub fn propagate_stl(&mut self) {
        match self.stl.justification {
            Some(Justification::Left) => self.set_align("start"),
            Some(Justification::Centered) => self.set_align("center"),
            Some(Justification::Right) => self.set_align("end"),
            Some(Justification::Unchanged) | None => {}
        }

        if let Some(position) = self.stl.position {
            if position.max_rows > 0 {
                // Teletext rows start at 1 while WebVTT lines start at 0%
                let row = if position.max_rows == 23 && position.vertical_position > 0 {
                    position.vertical_position - 1
                } else {
                    position.vertical_position
                };
                self.webvtt.line = Some(format!("{}%", row * 100 / position.max_rows));
            }
        }

        if self.stl.italics == Some(true) {
            self.set_italic();
        }
        if self.stl.underline == Some(true) {
            self.set_underline();
        }
    }

    fn set_align(&mut self, align: &str) {
        self.webvtt.align = Some(align.to_string());
        self.ttml.text_align = Some(align.to_string());
    }

    pub fn propagate_teletext(&mut self) {
        if let Some(color) = self.teletext.color {
            self.ttml.color = Some(color.html_string());
        }
    }

    /// Maps TTML placement onto WebVTT region and cue settings following
    /// the W3C TTML to WebVTT mapping.
    pub fn propagate_ttml(&mut self) {
        if let Some(align) = &self.ttml.text_align {
            self.webvtt.align = Some(align.clone());
        }

        let vertical = self
            .ttml
            .writing_mode
            .as_deref()
            .is_some_and(|mode| mode.starts_with("tb"));

        if let Some(extent) = &self.ttml.extent {
            let dimensions: Vec<&str> = extent.split_whitespace().collect();
            if let [width, height, ..] = dimensions.as_slice() {
                self.webvtt.width = Some(width.to_string());
                if let Ok(h) = height.replace('%', "").parse::<i32>() {
                    self.webvtt.lines = Some(h / TTML_LINE_HEIGHT_PERCENT);
                }
                let size = if vertical { width } else { height };
                self.webvtt.size = Some(size.to_string());
            }
        }

        if let Some(origin) = &self.ttml.origin {
            self.webvtt.region_anchor = Some("0%,0%".to_string());
            self.webvtt.viewport_anchor = Some(origin.trim().replace(' ', ","));
            self.webvtt.scroll = Some("up".to_string());

            let coordinates: Vec<&str> = origin.split_whitespace().collect();
            if let [x, y, ..] = coordinates.as_slice() {
                let (line, position) = if vertical { (y, x) } else { (x, y) };
                self.webvtt.line = Some(line.to_string());
                self.webvtt.position = WebVttPosition::parse(position);
            }
        }

        if self.ttml.font_weight.as_deref() == Some(TTML_FONT_WEIGHT_BOLD) {
            self.set_bold();
        }
        if self.ttml.font_style.as_deref() == Some(TTML_FONT_STYLE_ITALIC) {
            self.set_italic();
        }
        if self.ttml.text_decoration.as_deref() == Some(TTML_TEXT_DECORATION_UNDERLINE) {
            self.set_underline();
        }
    }

    /// Derives bold/italics/underline from the open tag stack, then fans out.
    pub fn propagate_webvtt(&mut self) {
        for tag in &self.webvtt.tags {
            match tag.name.as_str() {
                "b" => self.webvtt.bold = true,
                "i" => self.webvtt.italics = true,
                "u" => self.webvtt.underline = true,
                _ => {}
            }
        }

        if self.ttml.color.is_none() {
            let class_color = self
                .webvtt
                .tags
                .iter()
                .filter(|tag| tag.name == "c")
                .flat_map(|tag| tag.classes.iter())
                .find_map(|class| Color::from_name(class));
            if let Some(color) = class_color {
                self.ttml.color = Some(color.html_string());
            }
        }

        if self.webvtt.bold {
            self.set_bold();
        }
        if self.webvtt.italics {
            self.set_italic();
        }
        if self.webvtt.underline {
            self.set_underline();
        }
    }
}
