//! SSA/ASS subtitle parser.
//!
//! Parses SubStation Alpha (.ssa) and Advanced SubStation Alpha (.ass) files.
//!
//! # Format Overview
//!
//! SSA files have three main sections:
//! - `[Script Info]`: Metadata (title, resolution, etc.)
//! - `[V4 Styles]` or `[V4+ Styles]`: Style definitions
//! - `[Events]`: Dialogue and comment lines
//!
//! Each data section declares its column order in a `Format:` line which
//! must come before the first record. Timing is `H:MM:SS.cc`.

use std::collections::BTreeMap;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::subtitles::color::Color;
use crate::subtitles::duration::parse_duration;
use crate::subtitles::error::{ParseError, ParseResult};
use crate::subtitles::style::StyleAttributes;
use crate::subtitles::types::{Document, Item, Line, LineItem, Metadata, Style};

/// Override blocks such as `{\pos(400,570)}`.
static EFFECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[^{]+\}").expect("valid regex"));

const EVENT_CATEGORY_DIALOGUE: &str = "Dialogue";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    ScriptInfo,
    Styles,
    Events,
    Unknown,
}

impl Section {
    fn from_header(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "script info" => Self::ScriptInfo,
            "v4 styles" | "v4+ styles" | "v4 styles+" => Self::Styles,
            "events" => Self::Events,
            _ => Self::Unknown,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::ScriptInfo => "script info",
            Self::Styles => "styles",
            Self::Events => "events",
            Self::Unknown => "unknown",
        }
    }
}

/// An event record before styles are resolved.
#[derive(Debug, Default)]
struct Event {
    line_num: usize,
    category: String,
    start: Duration,
    end: Duration,
    style: Option<String>,
    name: Option<String>,
    inline_style: StyleAttributes,
    text: String,
}

/// Parse SSA/ASS content into a Document.
///
/// # Arguments
/// * `content` - The raw SSA file content, without byte order mark.
///
/// # Returns
/// * `Ok(Document)` - Parsed subtitle data.
/// * `Err(ParseError)` - If a record comes before its `Format:` line, a field
///   does not parse or an event uses an undeclared style.
pub fn parse_ssa(content: &str) -> ParseResult<Document> {
    let mut doc = Document::new();
    let mut metadata = Metadata::default();
    let mut section: Option<Section> = None;
    let mut format: Vec<String> = Vec::new();
    let mut events: Vec<Event> = Vec::new();

    for (line_num, line) in content.lines().enumerate() {
        let line_num = line_num + 1;
        let line = line.trim();

        if line.is_empty() {
            continue;
        }

        // Section header
        if line.starts_with('[') && line.ends_with(']') {
            let current = Section::from_header(&line[1..line.len() - 1]);
            if current == Section::Unknown {
                tracing::debug!(line = line_num, section = %line, "Skipping unknown SSA section");
            }
            format.clear();
            section = Some(current);
            continue;
        }

        let Some(current) = section.filter(|s| *s != Section::Unknown) else {
            continue;
        };

        // Comments belong to the script info only
        if let Some(comment) = line.strip_prefix(';') {
            if current == Section::ScriptInfo {
                metadata.comments.push(comment.trim().to_string());
            } else {
                tracing::trace!(line = line_num, section = current.name(), "Skipping SSA comment");
            }
            continue;
        }

        let Some((header, value)) = line.split_once(':') else {
            return Err(ParseError::at_line(
                line_num,
                format!("line '{}' should contain at least one ':'", line),
            ));
        };
        let header = header.trim();
        let value = value.trim();

        match current {
            Section::ScriptInfo => parse_script_info_line(header, value, &mut metadata, line_num)?,
            Section::Styles | Section::Events if header == "Format" => {
                format = parse_format_line(value);
            }
            Section::Styles | Section::Events if format.is_empty() => {
                return Err(ParseError::MissingFormat(current.name().to_string()));
            }
            Section::Styles => {
                let style = parse_style_line(value, &format, line_num)?;
                doc.styles.insert(style.id.clone(), style);
            }
            Section::Events => events.push(parse_event_line(header, value, &format, line_num)?),
            Section::Unknown => {}
        }
    }

    // Events may reference styles declared later in the file
    for event in events {
        if event.category != EVENT_CATEGORY_DIALOGUE {
            tracing::trace!(line = event.line_num, category = %event.category, "Skipping SSA event");
            continue;
        }
        doc.items.push(event_to_item(event, &doc.styles)?);
    }

    if metadata != Metadata::default() {
        doc.metadata = Some(metadata);
    }

    Ok(doc)
}

/// Parse the value of a Format: line into lowercase field names.
fn parse_format_line(value: &str) -> Vec<String> {
    value.split(',').map(|s| s.trim().to_lowercase()).collect()
}

/// Parse a Script Info line.
fn parse_script_info_line(
    key: &str,
    value: &str,
    metadata: &mut Metadata,
    line_num: usize,
) -> ParseResult<()> {
    let ssa = &mut metadata.ssa;
    let text = || Some(value.to_string());

    match key {
        "Collisions" => ssa.collisions = text(),
        "Original Editing" => ssa.original_editing = text(),
        "Original Script" => ssa.original_script = text(),
        "Original Timing" => ssa.original_timing = text(),
        "Original Translation" => ssa.original_translation = text(),
        "ScriptType" => ssa.script_type = text(),
        "Script Updated By" => ssa.script_updated_by = text(),
        "Synch Point" => ssa.synch_point = text(),
        "Update Details" => ssa.update_details = text(),
        "WrapStyle" => ssa.wrap_style = text(),
        "Title" => metadata.title = text(),
        "PlayDepth" => ssa.play_depth = Some(parse_int(value, line_num)?),
        "PlayResX" => ssa.play_res_x = Some(parse_int(value, line_num)?),
        "PlayResY" => ssa.play_res_y = Some(parse_int(value, line_num)?),
        "Timer" => {
            let timer = value
                .replace(',', ".")
                .parse::<f64>()
                .map_err(|_| ParseError::at_line(line_num, format!("invalid timer '{}'", value)))?;
            ssa.timer = Some(timer);
        }
        _ => tracing::trace!(key = %key, "Ignoring SSA script info field"),
    }
    Ok(())
}

fn parse_int(value: &str, line_num: usize) -> ParseResult<i32> {
    value
        .trim()
        .parse()
        .map_err(|_| ParseError::at_line(line_num, format!("invalid integer '{}'", value)))
}

fn parse_float(value: &str, line_num: usize) -> ParseResult<f64> {
    value
        .trim()
        .parse()
        .map_err(|_| ParseError::at_line(line_num, format!("invalid number '{}'", value)))
}

/// Parse the value of a Style: line.
fn parse_style_line(value: &str, format: &[String], line_num: usize) -> ParseResult<Style> {
    let fields: Vec<&str> = value.split(',').collect();

    if fields.len() < format.len() {
        return Err(ParseError::invalid_style(
            line_num,
            format!("Expected {} fields, got {}", format.len(), fields.len()),
        ));
    }

    let mut id = String::new();
    let mut sa = StyleAttributes::default();
    let color = |value: &str| -> ParseResult<Option<Color>> {
        if value.is_empty() {
            return Ok(None);
        }
        Color::from_ssa_str(value).map(Some).map_err(|e| e.with_line(line_num))
    };

    for (field_name, value) in format.iter().zip(fields.iter().map(|s| s.trim())) {
        let ssa = &mut sa.ssa;
        match field_name.as_str() {
            "name" => id = value.to_string(),
            "fontname" => ssa.font_name = Some(value.to_string()),
            "fontsize" => ssa.font_size = Some(parse_float(value, line_num)?),
            "primarycolour" => ssa.primary_colour = color(value)?,
            "secondarycolour" => ssa.secondary_colour = color(value)?,
            "outlinecolour" | "tertiarycolour" => ssa.outline_colour = color(value)?,
            "backcolour" => ssa.back_colour = color(value)?,
            "bold" => ssa.bold = Some(parse_bool(value)),
            "italic" => ssa.italic = Some(parse_bool(value)),
            "underline" => ssa.underline = Some(parse_bool(value)),
            "strikeout" => ssa.strikeout = Some(parse_bool(value)),
            "scalex" => ssa.scale_x = Some(parse_float(value, line_num)?),
            "scaley" => ssa.scale_y = Some(parse_float(value, line_num)?),
            "spacing" => ssa.spacing = Some(parse_float(value, line_num)?),
            "angle" => ssa.angle = Some(parse_float(value, line_num)?),
            "alphalevel" => ssa.alpha_level = Some(parse_float(value, line_num)?),
            "outline" => ssa.outline = Some(parse_float(value, line_num)?),
            "shadow" => ssa.shadow = Some(parse_float(value, line_num)?),
            "borderstyle" => ssa.border_style = Some(parse_int(value, line_num)?),
            "alignment" => ssa.alignment = Some(parse_int(value, line_num)?),
            "marginl" => ssa.margin_left = Some(parse_int(value, line_num)?),
            "marginr" => ssa.margin_right = Some(parse_int(value, line_num)?),
            "marginv" => ssa.margin_vertical = Some(parse_int(value, line_num)?),
            "encoding" => ssa.encoding = Some(parse_int(value, line_num)?),
            _ => {}
        }
    }
    sa.propagate_ssa();

    Ok(Style {
        id,
        inline_style: Some(sa),
        style: None,
    })
}

/// SSA writes -1 for true, some tools write 1.
fn parse_bool(value: &str) -> bool {
    value == "-1" || value == "1"
}

/// Parse an event line. Only the last field may contain commas.
fn parse_event_line(category: &str, value: &str, format: &[String], line_num: usize) -> ParseResult<Event> {
    let parts: Vec<&str> = value.splitn(format.len(), ',').collect();

    if parts.len() < format.len() {
        return Err(ParseError::invalid_event(
            line_num,
            format!("Expected {} fields, got {}", format.len(), parts.len()),
        ));
    }

    let mut event = Event {
        line_num,
        category: category.to_string(),
        ..Default::default()
    };

    for (field_name, value) in format.iter().zip(parts) {
        let trimmed = value.trim();
        let ssa = &mut event.inline_style.ssa;
        match field_name.as_str() {
            "start" => {
                event.start = parse_duration(trimmed, ".", 3)
                    .map_err(|_| ParseError::invalid_time(line_num, trimmed))?;
            }
            "end" => {
                event.end = parse_duration(trimmed, ".", 3)
                    .map_err(|_| ParseError::invalid_time(line_num, trimmed))?;
            }
            "style" if !trimmed.is_empty() => event.style = Some(trimmed.to_string()),
            "name" | "actor" if !trimmed.is_empty() => event.name = Some(trimmed.to_string()),
            "effect" if !trimmed.is_empty() => ssa.effect = Some(trimmed.to_string()),
            "layer" => ssa.layer = Some(parse_event_int(trimmed, line_num)?),
            "marginl" => ssa.margin_left = Some(parse_event_int(trimmed, line_num)?),
            "marginr" => ssa.margin_right = Some(parse_event_int(trimmed, line_num)?),
            "marginv" => ssa.margin_vertical = Some(parse_event_int(trimmed, line_num)?),
            "marked" => ssa.marked = Some(trimmed == "Marked=1"),
            "text" => event.text = value.to_string(),
            _ => {}
        }
    }

    Ok(event)
}

fn parse_event_int(value: &str, line_num: usize) -> ParseResult<i32> {
    value
        .parse()
        .map_err(|_| ParseError::invalid_event(line_num, format!("invalid integer '{}'", value)))
}

/// Build an item from a dialogue event.
fn event_to_item(event: Event, styles: &BTreeMap<String, Style>) -> ParseResult<Item> {
    if let Some(style) = &event.style {
        if !styles.contains_key(style) {
            return Err(ParseError::unknown_style(style, format!("event at line {}", event.line_num)));
        }
    }

    let mut item = Item {
        start_at: event.start,
        end_at: event.end,
        style: event.style,
        inline_style: Some(event.inline_style).filter(|sa| !sa.is_empty()),
        ..Default::default()
    };

    // \N is a hard break, \n a soft one; both start a new line here
    for text in event.text.split("\\N").flat_map(|s| s.split("\\n")) {
        let mut line = parse_text(text.trim());
        if line.items.is_empty() {
            continue;
        }
        line.voice_name = event.name.clone();
        item.lines.push(line);
    }

    Ok(item)
}

/// Split a line of event text at override blocks.
///
/// Each block starts a run whose inline style carries the block verbatim.
fn parse_text(text: &str) -> Line {
    let mut line = Line::default();
    let mut effect: Option<&str> = None;
    let mut offset = 0;

    let push = |line: &mut Line, effect: Option<&str>, text: &str| {
        if effect.is_none() && text.is_empty() {
            return;
        }
        let inline_style = effect.map(|e| {
            let mut sa = StyleAttributes::default();
            sa.ssa.effect = Some(e.to_string());
            sa
        });
        line.items.push(LineItem {
            text: text.to_string(),
            inline_style,
            ..Default::default()
        });
    };

    for m in EFFECT.find_iter(text) {
        push(&mut line, effect, &text[offset..m.start()]);
        effect = Some(m.as_str());
        offset = m.end();
    }
    push(&mut line, effect, &text[offset..]);

    line
}
