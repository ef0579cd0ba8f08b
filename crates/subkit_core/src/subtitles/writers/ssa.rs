//! SSA/ASS subtitle writer.
//!
//! Writes `[Script Info]`, `[V4+ Styles]` and `[Events]`. Each data section
//! gets the smallest `Format:` line that covers every value present: styles
//! always start with `Name`, events always start with `Start, End` and end
//! with `Text`.

use std::time::Duration;

use crate::subtitles::color::Color;
use crate::subtitles::duration::format_duration;
use crate::subtitles::style::{SsaStyle, StyleAttributes};
use crate::subtitles::types::{Document, Item, Line, Metadata};
use crate::subtitles::WriteOptions;

/// Style columns in the order they are written.
const STYLE_FIELDS: [&str; 23] = [
    "Fontname",
    "Fontsize",
    "PrimaryColour",
    "SecondaryColour",
    "OutlineColour",
    "BackColour",
    "Bold",
    "Italic",
    "Underline",
    "Strikeout",
    "ScaleX",
    "ScaleY",
    "Spacing",
    "Angle",
    "BorderStyle",
    "Outline",
    "Shadow",
    "Alignment",
    "MarginL",
    "MarginR",
    "MarginV",
    "AlphaLevel",
    "Encoding",
];

/// Optional event columns in the order they are written.
const EVENT_FIELDS: [&str; 8] = [
    "Marked", "Layer", "Style", "Name", "MarginL", "MarginR", "MarginV", "Effect",
];

/// Format a duration as an SSA timestamp (H:MM:SS.cc).
fn format_ssa_time(d: Duration) -> String {
    let formatted = format_duration(d, ".", 2);
    // Single digit hours when possible
    match formatted.strip_prefix('0') {
        Some(rest) if rest.find(':') == Some(1) => rest.to_string(),
        _ => formatted,
    }
}

/// Write a Document to SSA format string.
///
/// # Arguments
/// * `doc` - The document to write.
/// * `options` - Write options (float precision).
///
/// # Returns
/// The SSA file content as a string.
pub fn write_ssa(doc: &Document, options: &WriteOptions) -> String {
    let mut output = String::new();

    write_script_info(&mut output, doc.metadata.as_ref());

    if !doc.styles.is_empty() {
        output.push_str("\n[V4+ Styles]\n");

        let empty = StyleAttributes::default();
        let styles: Vec<(&str, &SsaStyle)> = doc
            .styles
            .values()
            .map(|s| (s.id.as_str(), &s.inline_style.as_ref().unwrap_or(&empty).ssa))
            .collect();

        let columns: Vec<&str> = STYLE_FIELDS
            .iter()
            .copied()
            .filter(|field| {
                styles
                    .iter()
                    .any(|(_, ssa)| style_value(ssa, field, options.ssa_float_precision).is_some())
            })
            .collect();

        output.push_str("Format: Name");
        for column in &columns {
            output.push_str(", ");
            output.push_str(column);
        }
        output.push('\n');

        // BTreeMap keeps styles sorted by name
        for (name, ssa) in &styles {
            let mut fields = vec![name.to_string()];
            fields.extend(
                columns
                    .iter()
                    .map(|c| style_value(ssa, c, options.ssa_float_precision).unwrap_or_default()),
            );
            output.push_str(&format!("Style: {}\n", fields.join(",")));
        }
    }

    output.push_str("\n[Events]\n");
    let columns: Vec<&str> = EVENT_FIELDS
        .iter()
        .copied()
        .filter(|field| doc.items.iter().any(|item| event_value(item, field).is_some()))
        .collect();

    output.push_str("Format: Start, End");
    for column in &columns {
        output.push_str(", ");
        output.push_str(column);
    }
    output.push_str(", Text\n");

    for item in &doc.items {
        let mut fields = vec![format_ssa_time(item.start_at), format_ssa_time(item.end_at)];
        fields.extend(columns.iter().map(|c| event_value(item, c).unwrap_or_default()));
        fields.push(event_text(item));
        output.push_str(&format!("Dialogue: {}\n", fields.join(",")));
    }

    output
}

fn write_script_info(output: &mut String, metadata: Option<&Metadata>) {
    output.push_str("[Script Info]\n");
    let Some(m) = metadata else {
        return;
    };

    for comment in &m.comments {
        output.push_str(&format!("; {}\n", comment));
    }

    let ssa = &m.ssa;
    let fields = [
        ("Collisions", ssa.collisions.clone()),
        ("Original Editing", ssa.original_editing.clone()),
        ("Original Script", ssa.original_script.clone()),
        ("Original Timing", ssa.original_timing.clone()),
        ("Original Translation", ssa.original_translation.clone()),
        ("PlayDepth", ssa.play_depth.map(|v| v.to_string())),
        ("PlayResX", ssa.play_res_x.map(|v| v.to_string())),
        ("PlayResY", ssa.play_res_y.map(|v| v.to_string())),
        ("ScriptType", ssa.script_type.clone()),
        ("Script Updated By", ssa.script_updated_by.clone()),
        ("Synch Point", ssa.synch_point.clone()),
        ("Timer", ssa.timer.map(|t| t.to_string().replace('.', ","))),
        ("Title", m.title.clone()),
        ("Update Details", ssa.update_details.clone()),
        ("WrapStyle", ssa.wrap_style.clone()),
    ];
    for (name, value) in fields {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            output.push_str(&format!("{}: {}\n", name, value));
        }
    }
}

fn ssa_color(color: &Option<Color>) -> Option<String> {
    color.map(|c| format!("&H{}", c.ssa_string()))
}

fn ssa_bool(value: Option<bool>) -> Option<String> {
    value.map(|b| if b { "-1" } else { "0" }.to_string())
}

fn style_value(ssa: &SsaStyle, field: &str, precision: usize) -> Option<String> {
    let float = |v: Option<f64>| v.map(|f| format!("{:.*}", precision, f));
    let int = |v: Option<i32>| v.map(|i| i.to_string());

    match field {
        "Fontname" => ssa.font_name.clone(),
        "Fontsize" => float(ssa.font_size),
        "PrimaryColour" => ssa_color(&ssa.primary_colour),
        "SecondaryColour" => ssa_color(&ssa.secondary_colour),
        "OutlineColour" => ssa_color(&ssa.outline_colour),
        "BackColour" => ssa_color(&ssa.back_colour),
        "Bold" => ssa_bool(ssa.bold),
        "Italic" => ssa_bool(ssa.italic),
        "Underline" => ssa_bool(ssa.underline),
        "Strikeout" => ssa_bool(ssa.strikeout),
        "ScaleX" => float(ssa.scale_x),
        "ScaleY" => float(ssa.scale_y),
        "Spacing" => float(ssa.spacing),
        "Angle" => float(ssa.angle),
        "BorderStyle" => int(ssa.border_style),
        "Outline" => float(ssa.outline),
        "Shadow" => float(ssa.shadow),
        "Alignment" => int(ssa.alignment),
        "MarginL" => int(ssa.margin_left),
        "MarginR" => int(ssa.margin_right),
        "MarginV" => int(ssa.margin_vertical),
        "AlphaLevel" => float(ssa.alpha_level),
        "Encoding" => int(ssa.encoding),
        _ => None,
    }
}

fn event_value(item: &Item, field: &str) -> Option<String> {
    let ssa = item.inline_style.as_ref().map(|sa| &sa.ssa);
    let int = |v: Option<i32>| v.map(|i| i.to_string());

    match field {
        "Marked" => ssa
            .and_then(|s| s.marked)
            .map(|m| format!("Marked={}", u8::from(m))),
        "Layer" => int(ssa.and_then(|s| s.layer)),
        "Style" => item.style.clone(),
        "Name" => item.lines.iter().rev().find_map(|l| l.voice_name.clone()),
        "MarginL" => int(ssa.and_then(|s| s.margin_left)),
        "MarginR" => int(ssa.and_then(|s| s.margin_right)),
        "MarginV" => int(ssa.and_then(|s| s.margin_vertical)),
        "Effect" => ssa.and_then(|s| s.effect.clone()),
        _ => None,
    }
}

fn event_text(item: &Item) -> String {
    item.lines.iter().map(line_text).collect::<Vec<_>>().join("\\N")
}

/// Override blocks are written in front of their run. Runs without one are
/// separated by a space unless the text already carries whitespace.
fn line_text(line: &Line) -> String {
    let mut out = String::new();
    for li in &line.items {
        let effect = li.inline_style.as_ref().and_then(|sa| sa.ssa.effect.as_deref());
        let needs_space = effect.is_none()
            && !out.is_empty()
            && !out.ends_with(char::is_whitespace)
            && !li.text.starts_with(char::is_whitespace);
        if needs_space {
            out.push(' ');
        }
        if let Some(effect) = effect {
            out.push_str(effect);
        }
        out.push_str(&li.text);
    }
    out
}
