//! SRT subtitle parser.
//!
//! Parses SubRip (.srt) subtitle files.
//!
//! # Format Overview
//!
//! SRT files consist of sequential entries:
//! ```text
//! 1
//! 00:00:01,000 --> 00:00:04,000
//! <i>Hello</i>, world!
//!
//! 2
//! 00:00:05,000 --> 00:00:08,000 X1:40 X2:600 Y1:20 Y2:50
//! {\an8}This is a test.
//! ```
//!
//! The index line is optional. Anything after the end time is ignored.
//! `<b>`, `<i>`, `<u>` and `<font color>` tags become inline styles and
//! `{\anN}` sets the position of the run it precedes.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::subtitles::duration::parse_duration_any;
use crate::subtitles::error::{ParseError, ParseResult};
use crate::subtitles::escape::unescape_markup;
use crate::subtitles::style::StyleAttributes;
use crate::subtitles::types::{Document, Item, Line, LineItem};

const TIME_BOUNDARIES_SEPARATOR: &str = "-->";

/// Separators accepted before the milliseconds.
const MILLISECOND_SEPARATORS: [&str; 3] = [",", ".", ":"];

static POSITION_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\\an([1-9])\}").expect("valid regex"));
static FONT_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)color\s*=\s*["']?([^"'\s>]+)"#).expect("valid regex"));

/// Markup state, carried across the lines of one item.
#[derive(Debug, Default)]
struct TagState {
    bold: bool,
    italic: bool,
    underline: bool,
    colors: Vec<String>,
    position: Option<u8>,
}

impl TagState {
    fn inline_style(&self) -> Option<StyleAttributes> {
        let color = self.colors.last().cloned();
        if !self.bold && !self.italic && !self.underline && color.is_none() && self.position.is_none() {
            return None;
        }
        let mut sa = StyleAttributes::default();
        sa.srt.bold = self.bold;
        sa.srt.italic = self.italic;
        sa.srt.underline = self.underline;
        sa.srt.color = color;
        sa.srt.position = self.position;
        sa.propagate_srt();
        Some(sa)
    }

    /// Apply a tag; returns false for tags SRT does not know.
    fn apply(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        let (closing, name) = match tag.strip_prefix('/') {
            Some(name) => (true, name.trim()),
            None => (false, tag),
        };
        let keyword = name
            .split(|c: char| c.is_whitespace())
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();

        match keyword.as_str() {
            "b" => self.bold = !closing,
            "i" => self.italic = !closing,
            "u" => self.underline = !closing,
            "font" if closing => {
                self.colors.pop();
            }
            "font" => {
                if let Some(caps) = FONT_COLOR.captures(name) {
                    self.colors.push(caps[1].to_string());
                }
            }
            _ => return false,
        }
        true
    }
}

/// Parse SRT content into a Document.
///
/// # Arguments
/// * `content` - The raw SRT file content, without byte order mark.
///
/// # Returns
/// * `Ok(Document)` - Parsed subtitle data.
/// * `Err(ParseError)` - If a time line is malformed.
pub fn parse_srt(content: &str) -> ParseResult<Document> {
    let mut doc = Document::new();
    let mut current: Option<Item> = None;
    let mut tags = TagState::default();
    let mut pending: Option<String> = None;

    for (line_num, line) in content.lines().enumerate() {
        let line_num = line_num + 1;
        let line = line.trim();

        // Time boundaries start a new item
        if line.contains(TIME_BOUNDARIES_SEPARATOR) {
            let (start_at, end_at) = parse_time_boundaries(line, line_num)?;
            if let Some(item) = current.take() {
                doc.items.push(item);
            }

            let mut item = Item {
                start_at,
                end_at,
                ..Default::default()
            };
            if let Some(index) = pending.take() {
                match index.parse() {
                    Ok(index) => item.index = index,
                    Err(_) => tracing::debug!(line = line_num, index = %index, "Dropping non-numeric SRT index"),
                }
            }
            current = Some(item);
            tags = TagState::default();
            continue;
        }

        // The latest text line is held back: right before a time line it
        // is that item's index, otherwise it is text.
        let held = if line.is_empty() {
            pending.take()
        } else {
            pending.replace(line.to_string())
        };
        if let Some(text) = held {
            append_text(current.as_mut(), &text, &mut tags, line_num);
        }
    }

    if let Some(text) = pending.take() {
        append_text(current.as_mut(), &text, &mut tags, 0);
    }
    if let Some(item) = current.take() {
        doc.items.push(item);
    }

    Ok(doc)
}

/// Parse `start --> end [settings]`, spaces around the arrow optional.
fn parse_time_boundaries(
    line: &str,
    line_num: usize,
) -> ParseResult<(std::time::Duration, std::time::Duration)> {
    let Some((start, rest)) = line.split_once(TIME_BOUNDARIES_SEPARATOR) else {
        return Err(ParseError::invalid_time(line_num, line));
    };
    let start = start.trim();
    let end = rest.split_whitespace().next().unwrap_or_default();

    let start_at = parse_duration_any(start, &MILLISECOND_SEPARATORS, 3)
        .map_err(|_| ParseError::invalid_time(line_num, start))?;
    let end_at = parse_duration_any(end, &MILLISECOND_SEPARATORS, 3)
        .map_err(|_| ParseError::invalid_time(line_num, end))?;
    Ok((start_at, end_at))
}

fn append_text(item: Option<&mut Item>, text: &str, tags: &mut TagState, line_num: usize) {
    let Some(item) = item else {
        tracing::debug!(line = line_num, "Dropping SRT text before the first time line");
        return;
    };
    let line = parse_text(text, tags);
    if !line.items.is_empty() {
        item.lines.push(line);
    }
}

/// Split one line of text into styled runs.
///
/// Runs are trimmed and whitespace-only runs dropped. Unknown tags are
/// removed; a `<` without a closing `>` is kept as text.
fn parse_text(text: &str, tags: &mut TagState) -> Line {
    let mut line = Line::default();
    let mut buffer = String::new();
    let mut rest = text;

    let flush = |buffer: &mut String, line: &mut Line, tags: &TagState| {
        let run = unescape_markup(buffer.trim());
        buffer.clear();
        if !run.trim().is_empty() {
            line.items.push(LineItem {
                text: run,
                inline_style: tags.inline_style(),
                ..Default::default()
            });
        }
    };

    while !rest.is_empty() {
        // Position tag
        if let Some(caps) = POSITION_TAG.captures(rest).filter(|c| c.get(0).map(|m| m.start()) == Some(0)) {
            flush(&mut buffer, &mut line, tags);
            tags.position = caps[1].parse().ok();
            rest = &rest[caps[0].len()..];
            continue;
        }

        // Markup tag
        if rest.starts_with('<') {
            if let Some(end) = rest.find('>') {
                let tag = &rest[1..end];
                flush(&mut buffer, &mut line, tags);
                if !tags.apply(tag) {
                    tracing::trace!(tag = %tag, "Ignoring unknown SRT tag");
                }
                rest = &rest[end + 1..];
                continue;
            }
        }

        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            buffer.push(c);
        }
        rest = chars.as_str();
    }
    flush(&mut buffer, &mut line, tags);

    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ms(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    fn style(item: &LineItem) -> StyleAttributes {
        item.inline_style.clone().unwrap_or_default()
    }

    #[test]
    fn parse_basic_srt() {
        let content = "1\n00:01:39,000 --> 00:01:41,040\n(deep rumbling)\n\n2\n00:02:04,080 --> 00:02:07,120\nMY MAN!\n\n3\n00:02:10,160 --> 00:02:14,080\nWHERE ARE YOU GOING?\nLet's go\n";
        let doc = parse_srt(content).unwrap();

        assert_eq!(doc.items.len(), 3);
        assert_eq!(doc.items[0].start_at, ms(99_000));
        assert_eq!(doc.items[0].end_at, ms(101_040));
        assert_eq!(doc.items[0].index, 1);
        assert_eq!(doc.items[0].lines, vec![Line::from_text("(deep rumbling)")]);
        assert_eq!(doc.items[2].index, 3);
        assert_eq!(doc.items[2].lines.len(), 2);
        assert_eq!(doc.items[2].to_string(), "WHERE ARE YOU GOING? - Let's go");
    }

    #[test]
    fn missing_indices_are_tolerated() {
        crate::logging::init_test_tracing();
        let content = "00:00:01,000 --> 00:00:02,000\nfirst\n\nNaN\n00:00:03,000 --> 00:00:04,000\nsecond\n";
        let doc = parse_srt(content).unwrap();
        assert_eq!(doc.items.len(), 2);
        assert_eq!(doc.items[0].index, 0);
        assert_eq!(doc.items[1].index, 0);
        assert_eq!(doc.items[1].to_string(), "second");
    }

    #[test]
    fn index_without_blank_separator() {
        let content = "1\n00:00:01,000 --> 00:00:02,000\nfirst\n2\n00:00:03,000 --> 00:00:04,000\nsecond\n3\n";
        let doc = parse_srt(content).unwrap();
        assert_eq!(doc.items.len(), 2);
        assert_eq!(doc.items[0].to_string(), "first");
        assert_eq!(doc.items[1].index, 2);
        assert_eq!(doc.items[1].to_string(), "second - 3");
    }

    #[test]
    fn blank_line_inside_text_keeps_the_text() {
        let content = "1\n00:00:01,000 --> 00:00:02,000\nfirst\n\nstill first\n\n2\n00:00:03,000 --> 00:00:04,000\nsecond\n";
        let doc = parse_srt(content).unwrap();
        assert_eq!(doc.items.len(), 2);
        assert_eq!(doc.items[0].to_string(), "first - still first");
        assert_eq!(doc.items[1].index, 2);
    }

    #[test]
    fn duration_variants() {
        let content = "\n\t1\n\t00:00:01.876-->00:0:03.390\n\tDuration without enclosing space\n\t\n\t2\n\t00:00:04:609-->00:0:05:985\n\tDuration without colon milliseconds";
        let doc = parse_srt(content).unwrap();
        assert_eq!(doc.items.len(), 2);
        assert_eq!(doc.items[0].start_at, ms(1_876));
        assert_eq!(doc.items[0].end_at, ms(3_390));
        assert_eq!(doc.items[0].to_string(), "Duration without enclosing space");
        assert_eq!(doc.items[1].start_at, ms(4_609));
        assert_eq!(doc.items[1].end_at, ms(5_985));
    }

    #[test]
    fn trailing_position_settings_are_ignored() {
        let doc = parse_srt("1\n00:00:01,000 --> 00:00:02,000 X1:40 X2:600\ntext\n").unwrap();
        assert_eq!(doc.items[0].end_at, ms(2_000));
    }

    #[test]
    fn invalid_time_is_an_error() {
        let err = parse_srt("1\n00:00:0a,000 --> 00:00:02,000\ntext\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidTime { line: 2, .. }));
    }

    #[test]
    fn styled_text() {
        let content = "1\n00:00:17,985 --> 00:00:20,521\n<font color=\"#00ff00\"><b>[instrumental music]</b></font>\n\n2\n00:01:01,662 --> 00:01:03,063\n<b><u>[dog barking]</u></b>\n\n3\n00:01:29,590 --> 00:01:31,992\n[automated]\n<i>'The time is 7:35.'</i>\n\n4\n00:01:32,000 --> 00:01:33,000\n<i>Test with multi line italics\nTerminated on the next line</i>\n\n5\n00:01:34,000 --> 00:01:35,000\n<i>Unterminated styles\n\n6\n00:01:36,000 --> 00:01:37,000\nDo no fall to the next item\n";
        let doc = parse_srt(content).unwrap();
        assert_eq!(doc.items.len(), 6);

        let run = &doc.items[0].lines[0].items[0];
        assert_eq!(run.text, "[instrumental music]");
        assert_eq!(style(run).srt.color.as_deref(), Some("#00ff00"));
        assert!(style(run).srt.bold);
        assert!(!style(run).srt.italic);
        assert_eq!(style(run).ttml.color.as_deref(), Some("#00ff00"));
        assert_eq!(style(run).ttml.font_weight.as_deref(), Some("bold"));

        let run = &doc.items[1].lines[0].items[0];
        assert!(style(run).srt.color.is_none());
        assert!(style(run).srt.bold);
        assert!(style(run).srt.underline);

        assert!(doc.items[2].lines[0].items[0].inline_style.is_none());
        assert!(style(&doc.items[2].lines[1].items[0]).srt.italic);

        assert!(style(&doc.items[3].lines[0].items[0]).srt.italic);
        assert!(style(&doc.items[3].lines[1].items[0]).srt.italic);
        assert!(style(&doc.items[4].lines[0].items[0]).srt.italic);
        assert!(doc.items[5].lines[0].items[0].inline_style.is_none());
    }

    #[test]
    fn mixed_runs() {
        let doc = parse_srt("1\n00:00:01,000 --> 00:00:02,000\n<i>x</i>^3 * <i>x</i> = 100\n").unwrap();
        let items = &doc.items[0].lines[0].items;
        let texts: Vec<&str> = items.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["x", "^3 *", "x", "= 100"]);
        assert!(style(&items[0]).srt.italic);
        assert!(items[1].inline_style.is_none());
        assert!(style(&items[2]).srt.italic);
    }

    #[test]
    fn position_tag_and_entities() {
        let doc = parse_srt("1\n00:00:01,000 --> 00:00:02,000\n{\\an8}Top &amp; <unknown>center</unknown>\nx < y\n").unwrap();
        let run = &doc.items[0].lines[0].items[0];
        assert_eq!(run.text, "Top &");
        assert_eq!(style(run).srt.position, Some(8));
        assert_eq!(doc.items[0].lines[0].items[1].text, "center");
        assert_eq!(doc.items[0].lines[1].items[0].text, "x < y");
    }
}
