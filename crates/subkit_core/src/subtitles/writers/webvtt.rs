//! WebVTT subtitle writer.
//!
//! Tags are diffed between neighbouring runs of a line: a tag shared with
//! the previous run is not reopened and a tag shared with the next run is
//! not closed.

use crate::subtitles::color::css_class_for;
use crate::subtitles::duration::format_duration;
use crate::subtitles::escape::escape_markup;
use crate::subtitles::style::{StyleAttributes, WebVttStyle, WebVttTag};
use crate::subtitles::types::{Document, Item, Line, LineItem, WebVttTimestampMap};
use crate::subtitles::WriteOptions;

const HEADER: &str = "WEBVTT";

fn format_webvtt_time(d: std::time::Duration) -> String {
    format_duration(d, ".", 3)
}

fn format_timestamp_map(map: &WebVttTimestampMap) -> String {
    format!(
        "X-TIMESTAMP-MAP=LOCAL:{},MPEGTS:{}",
        format_webvtt_time(map.local),
        map.mpegts
    )
}

/// Write a Document to WebVTT format string.
///
/// # Arguments
/// * `doc` - The document to write.
/// * `options` - Write options (cue numbering).
///
/// # Returns
/// The WebVTT file content as a string.
pub fn write_webvtt(doc: &Document, options: &WriteOptions) -> String {
    let mut output = String::from(HEADER);

    if let Some(map) = doc.metadata.as_ref().and_then(|m| m.webvtt_timestamp_map.as_ref()) {
        output.push('\n');
        output.push_str(&format_timestamp_map(map));
    }
    output.push_str("\n\n");

    // Step 1: style sheet
    let sheet: Vec<&str> = doc
        .styles
        .values()
        .filter_map(|s| s.inline_style.as_ref())
        .flat_map(|sa| sa.webvtt.styles.iter().map(String::as_str))
        .collect();
    if !sheet.is_empty() {
        output.push_str(&format!("STYLE\n{}\n\n", sheet.join("\n")));
    }

    // Step 2: regions, sorted by ID
    for region in doc.regions.values() {
        let own = region.inline_style.as_ref().map(|sa| &sa.webvtt);
        let parent = region
            .style
            .as_deref()
            .and_then(|id| doc.style(id))
            .and_then(|s| s.inline_style.as_ref())
            .map(|sa| &sa.webvtt);
        let setting = |get: fn(&WebVttStyle) -> Option<String>| {
            own.and_then(get).or_else(|| parent.and_then(get))
        };

        output.push_str(&format!("Region: id={}", region.id));
        for (key, value) in [
            ("lines", setting(|s| s.lines.map(|l| l.to_string()))),
            ("regionanchor", setting(|s| s.region_anchor.clone())),
            ("scroll", setting(|s| s.scroll.clone())),
            ("viewportanchor", setting(|s| s.viewport_anchor.clone())),
            ("width", setting(|s| s.width.clone())),
        ] {
            if let Some(value) = value {
                output.push_str(&format!(" {}={}", key, value));
            }
        }
        output.push('\n');
    }
    if !doc.regions.is_empty() {
        output.push('\n');
    }

    // Step 3: cues
    for (i, item) in doc.items.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }

        if !item.comments.is_empty() {
            output.push_str("NOTE ");
            for comment in &item.comments {
                output.push_str(comment);
                output.push('\n');
            }
            output.push('\n');
        }

        let index = if options.webvtt_write_source_index {
            item.index
        } else {
            i as i32 + 1
        };
        output.push_str(&format!("{}\n", index));
        output.push_str(&format!(
            "{} --> {}{}\n",
            format_webvtt_time(item.start_at),
            format_webvtt_time(item.end_at),
            cue_settings(doc, item)
        ));

        for line in &item.lines {
            output.push_str(&line_text(line));
            output.push('\n');
        }
    }

    output
}

/// ` key:value` cue settings, falling back to the item's style.
fn cue_settings(doc: &Document, item: &Item) -> String {
    let own = item.inline_style.as_ref().map(|sa| &sa.webvtt);
    let parent = item
        .style
        .as_deref()
        .and_then(|id| doc.style(id))
        .and_then(|s| s.inline_style.as_ref())
        .map(|sa| &sa.webvtt);
    let setting = |get: fn(&WebVttStyle) -> Option<String>| {
        own.and_then(get).or_else(|| parent.and_then(get))
    };

    [
        ("align", setting(|s| s.align.clone())),
        ("line", setting(|s| s.line.clone())),
        ("position", setting(|s| s.position.as_ref().map(|p| p.to_string()))),
        ("region", item.region.clone()),
        ("size", setting(|s| s.size.clone())),
        ("vertical", setting(|s| s.vertical.clone())),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.map(|v| format!(" {}:{}", key, v)))
    .collect()
}

/// Tags to write around a run.
///
/// Parsed tags are kept as they are. Runs from other formats get `b`, `i`
/// and `u` from their flags, and a colour class when their colour is one
/// of the caption colours.
fn run_tags(li: &LineItem) -> Vec<WebVttTag> {
    let Some(sa) = &li.inline_style else {
        return Vec::new();
    };
    let mut tags = Vec::new();

    if !sa.webvtt.tags.iter().any(|t| t.name == "c") {
        if let Some(class) = sa.ttml.color.as_deref().and_then(css_class_for) {
            tags.push(WebVttTag {
                name: "c".to_string(),
                classes: vec![class.to_string()],
                annotation: None,
            });
        }
    }

    if sa.webvtt.tags.is_empty() {
        tags.extend(flag_tags(sa));
    } else {
        tags.extend(sa.webvtt.tags.iter().cloned());
    }
    tags
}

fn flag_tags(sa: &StyleAttributes) -> impl Iterator<Item = WebVttTag> {
    [
        ("b", sa.webvtt.bold),
        ("i", sa.webvtt.italics),
        ("u", sa.webvtt.underline),
    ]
    .into_iter()
    .filter(|(_, set)| *set)
    .map(|(name, _)| WebVttTag {
        name: name.to_string(),
        ..Default::default()
    })
}

fn common_prefix(a: &[WebVttTag], b: &[WebVttTag]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

fn line_text(line: &Line) -> String {
    let mut out = String::new();
    if let Some(voice) = &line.voice_name {
        out.push_str(&format!("<v {}>", voice));
    }

    let tags: Vec<Vec<WebVttTag>> = line.items.iter().map(run_tags).collect();
    for (i, li) in line.items.iter().enumerate() {
        let current = &tags[i];
        let shared_previous = match i {
            0 => 0,
            _ => common_prefix(&tags[i - 1], current),
        };
        let shared_next = tags.get(i + 1).map_or(0, |next| common_prefix(current, next));

        if i > 0 {
            out.push(' ');
        }
        if let Some(start_at) = li.start_at {
            out.push_str(&format!("<{}>", format_webvtt_time(start_at)));
        }
        for tag in &current[shared_previous..] {
            out.push_str(&tag.start_tag());
        }
        out.push_str(&escape_markup(&li.text));
        for tag in current[shared_next..].iter().rev() {
            out.push_str(&tag.end_tag());
        }
    }
    out
}
