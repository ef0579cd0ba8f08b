//! SRT subtitle writer.
//!
//! Writes a Document to SubRip format.
//!
//! Items are renumbered from 1; source indices are not kept. Runs of a line
//! are joined by a space and their styling becomes `<font color>`, `<b>`,
//! `<i>` and `<u>` tags, in that nesting order.

use crate::subtitles::duration::format_duration;
use crate::subtitles::escape::escape_markup;
use crate::subtitles::types::{Document, Line, LineItem};
use crate::subtitles::WriteOptions;

const BOM: char = '\u{feff}';

/// Format a duration as an SRT timestamp (HH:MM:SS,mmm).
fn format_srt_time(d: std::time::Duration) -> String {
    format_duration(d, ",", 3)
}

/// Write a Document to SRT format string.
///
/// # Arguments
/// * `doc` - The document to write.
/// * `options` - Write options (byte order mark).
///
/// # Returns
/// The SRT file content as a string.
pub fn write_srt(doc: &Document, options: &WriteOptions) -> String {
    let mut output = String::new();
    if options.srt_write_bom {
        output.push(BOM);
    }

    for (i, item) in doc.items.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }

        // Index (1-based)
        output.push_str(&format!("{}\n", i + 1));

        // Timing line
        output.push_str(&format!(
            "{} --> {}\n",
            format_srt_time(item.start_at),
            format_srt_time(item.end_at)
        ));

        let mut position = None;
        for line in &item.lines {
            output.push_str(&line_text(line, &mut position));
            output.push('\n');
        }
    }

    output
}

/// `position` is the last `{\anN}` written in the item.
fn line_text(line: &Line, position: &mut Option<u8>) -> String {
    line.items
        .iter()
        .map(|li| {
            let mut text = String::new();
            let run_position = li.inline_style.as_ref().and_then(|sa| sa.srt.position);
            if run_position.is_some() && run_position != *position {
                if let Some(n) = run_position {
                    text.push_str(&format!("{{\\an{}}}", n));
                }
                *position = run_position;
            }
            text.push_str(&line_item_text(li));
            text
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn line_item_text(li: &LineItem) -> String {
    let text = escape_markup(&li.text);
    let Some(sa) = &li.inline_style else {
        return text;
    };

    let mut out = text;
    if sa.srt.underline {
        out = format!("<u>{}</u>", out);
    }
    if sa.srt.italic {
        out = format!("<i>{}</i>", out);
    }
    if sa.srt.bold {
        out = format!("<b>{}</b>", out);
    }
    if let Some(color) = &sa.srt.color {
        out = format!("<font color=\"{}\">{}</font>", color, out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitles::parsers::parse_srt;
    use crate::subtitles::types::Item;
    use std::time::Duration;

    fn no_bom() -> WriteOptions {
        WriteOptions {
            srt_write_bom: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_write_basic_srt() {
        let mut doc = Document::new();
        doc.items.push(Item::with_text(
            Duration::from_millis(1000),
            Duration::from_millis(4000),
            "Hello, world!",
        ));
        let mut second = Item::with_text(
            Duration::from_millis(5000),
            Duration::from_millis(8000),
            "Test subtitle.",
        );
        second.index = 42;
        doc.items.push(second);

        let expected = "1\n00:00:01,000 --> 00:00:04,000\nHello, world!\n\n2\n00:00:05,000 --> 00:00:08,000\nTest subtitle.\n";
        assert_eq!(write_srt(&doc, &no_bom()), expected);

        let with_bom = write_srt(&doc, &WriteOptions::default());
        assert!(with_bom.starts_with("\u{feff}1\n"));
    }

    #[test]
    fn test_write_styled_runs() {
        let content = "1\n00:00:01,000 --> 00:00:02,000\n{\\an8}<font color=\"#ff0000\"><i>red</i></font> plain & <b><u>both</u></b>\nsecond line\n";
        let doc = parse_srt(content).unwrap();
        let output = write_srt(&doc, &no_bom());
        assert_eq!(
            output,
            "1\n00:00:01,000 --> 00:00:02,000\n{\\an8}<font color=\"#ff0000\"><i>red</i></font> plain &amp; <b><u>both</u></b>\nsecond line\n"
        );
    }

    #[test]
    fn test_write_multiline() {
        let mut doc = Document::new();
        let mut item = Item::with_text(Duration::ZERO, Duration::from_secs(1), "one");
        item.lines.push(Line::from_text("two"));
        doc.items.push(item);
        assert_eq!(
            write_srt(&doc, &no_bom()),
            "1\n00:00:00,000 --> 00:00:01,000\none\ntwo\n"
        );
    }
}
