//! WebVTT subtitle parser.
//!
//! # Format Overview
//!
//! ```text
//! WEBVTT
//! X-TIMESTAMP-MAP=LOCAL:00:00:00.000,MPEGTS:900000
//!
//! Region: id=fred width=40% lines=3 regionanchor=0%,100% viewportanchor=10%,90% scroll=up
//!
//! STYLE
//! ::cue { color: lime }
//!
//! NOTE a comment attached to the next cue
//!
//! 1
//! 00:01:39.000 --> 00:01:41.040 region:fred align:left
//! <v Narrator><i>(deep rumbling)</i>
//! ```
//!
//! Blocks are separated by blank lines. Cue text keeps a stack of open tags
//! across the lines of a cue; inline `<HH:MM:SS.mmm>` timestamps split a
//! line into separately timed runs.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use super::strip_bom;
use crate::subtitles::duration::parse_duration;
use crate::subtitles::error::{ParseError, ParseResult};
use crate::subtitles::escape::unescape_markup;
use crate::subtitles::style::{StyleAttributes, WebVttPosition, WebVttTag};
use crate::subtitles::types::{Document, Item, Line, LineItem, Region, Style, WebVttTimestampMap};

const HEADER: &str = "WEBVTT";
const TIME_BOUNDARIES_SEPARATOR: &str = "-->";
const TIMESTAMP_MAP_HEADER: &str = "X-TIMESTAMP-MAP";

/// ID of the style holding the raw `STYLE` block lines.
pub(crate) const DEFAULT_STYLE_ID: &str = "webvtt-default-style";

static INLINE_TIMESTAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d{2,}:)?\d{2}:\d{2}\.\d{3}$").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    None,
    Comment,
    Style,
    Text,
}

/// Parse an `X-TIMESTAMP-MAP=LOCAL:<time>,MPEGTS:<ticks>` header line.
///
/// Both parts are optional and may come in any order.
pub fn parse_timestamp_map(line: &str) -> ParseResult<WebVttTimestampMap> {
    let invalid = |message: String| ParseError::invalid_duration(line, message);

    let (_, value) = line
        .split_once('=')
        .ok_or_else(|| invalid("no '=' found".to_string()))?;

    let mut map = WebVttTimestampMap::default();
    for part in value.split(',') {
        let (key, value) = part
            .split_once(':')
            .ok_or_else(|| invalid(format!("part '{}' doesn't contain ':'", part.trim())))?;
        match key.trim().to_ascii_lowercase().as_str() {
            "local" => map.local = parse_duration(value.trim(), ".", 3)?,
            "mpegts" => {
                map.mpegts = value
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| invalid(format!("invalid MPEGTS '{}': {}", value.trim(), e)))?;
            }
            other => tracing::debug!(key = other, "Ignoring timestamp map field"),
        }
    }
    Ok(map)
}

/// Parse WebVTT content into a Document.
///
/// # Arguments
/// * `content` - The raw WebVTT file content.
///
/// # Returns
/// * `Ok(Document)` - Parsed subtitle data.
/// * `Err(ParseError)` - If the header is missing, a time or setting is
///   malformed or a cue refers to an undeclared region.
pub fn parse_webvtt(content: &str) -> ParseResult<Document> {
    let mut doc = Document::new();
    let mut lines = content.lines().enumerate();

    // Step 1: skip to the header
    let found_header = lines.by_ref().any(|(_, line)| {
        strip_bom(line).split_whitespace().next() == Some(HEADER)
    });
    if !found_header {
        return Err(ParseError::MissingSection(HEADER.to_string()));
    }

    // Step 2: blocks
    let mut block = Block::None;
    let mut comments: Vec<String> = Vec::new();
    let mut index: i32 = 0;
    let mut tags: Vec<WebVttTag> = Vec::new();

    for (line_num, line) in lines {
        let line_num = line_num + 1;
        let line = line.trim();

        if line == "NOTE" || line.starts_with("NOTE ") || line.starts_with("NOTE\t") {
            block = Block::Comment;
            let comment = line["NOTE".len()..].trim();
            if !comment.is_empty() {
                comments.push(comment.to_string());
            }
        } else if line.is_empty() {
            // A blank line inside a CSS rule does not end the STYLE block
            if block != Block::Style || style_sheet_closed(&doc) {
                block = Block::None;
            }
            tags.clear();
        } else if let Some(settings) = line.strip_prefix("Region:") {
            parse_region(&mut doc, settings, line_num)?;
        } else if line.starts_with("STYLE") {
            block = Block::Style;
            doc.styles
                .entry(DEFAULT_STYLE_ID.to_string())
                .or_insert_with(|| Style {
                    id: DEFAULT_STYLE_ID.to_string(),
                    inline_style: Some(StyleAttributes::default()),
                    style: None,
                });
        } else if line.contains(TIME_BOUNDARIES_SEPARATOR) {
            block = Block::Text;
            let mut item = parse_cue_timing(&doc, line, line_num)?;
            item.index = std::mem::take(&mut index);
            item.comments = std::mem::take(&mut comments);
            doc.items.push(item);
        } else if line.starts_with(TIMESTAMP_MAP_HEADER) {
            if !doc.items.is_empty() {
                return Err(ParseError::at_line(
                    line_num,
                    "found timestamp map after subtitle items",
                ));
            }
            let map = parse_timestamp_map(line)?;
            doc.metadata_mut().webvtt_timestamp_map = Some(map);
        } else {
            match block {
                Block::Comment => comments.push(line.to_string()),
                Block::Style => {
                    if let Some(sa) = doc
                        .styles
                        .get_mut(DEFAULT_STYLE_ID)
                        .and_then(|s| s.inline_style.as_mut())
                    {
                        sa.webvtt.styles.push(line.to_string());
                    }
                }
                Block::Text => {
                    let parsed = parse_text(line, &mut tags);
                    if let Some(item) = doc.items.last_mut() {
                        if !parsed.items.is_empty() {
                            item.lines.push(parsed);
                        }
                    }
                }
                // Cue identifier
                Block::None => index = line.parse().unwrap_or_default(),
            }
        }
    }

    Ok(doc)
}

fn style_sheet_closed(doc: &Document) -> bool {
    doc.styles
        .get(DEFAULT_STYLE_ID)
        .and_then(|s| s.inline_style.as_ref())
        .and_then(|sa| sa.webvtt.styles.last())
        .map_or(true, |last| last.ends_with('}'))
}

/// `Region: id=fred width=40% lines=3 ...`
fn parse_region(doc: &mut Document, settings: &str, line_num: usize) -> ParseResult<()> {
    let mut id = String::new();
    let mut sa = StyleAttributes::default();

    for part in settings.split_whitespace() {
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| ParseError::at_line(line_num, format!("invalid region setting '{}'", part)))?;
        match key {
            "id" => id = value.to_string(),
            "lines" => {
                let lines = value.parse::<i32>().map_err(|e| {
                    ParseError::at_line(line_num, format!("invalid region lines '{}': {}", value, e))
                })?;
                sa.webvtt.lines = Some(lines);
            }
            "regionanchor" => sa.webvtt.region_anchor = Some(value.to_string()),
            "scroll" => sa.webvtt.scroll = Some(value.to_string()),
            "viewportanchor" => sa.webvtt.viewport_anchor = Some(value.to_string()),
            "width" => sa.webvtt.width = Some(value.to_string()),
            _ => tracing::warn!(line = line_num, setting = key, "Unknown WebVTT region setting"),
        }
    }
    sa.propagate_webvtt();

    doc.regions.insert(
        id.clone(),
        Region {
            id,
            inline_style: Some(sa).filter(|sa| !sa.is_empty()),
            style: None,
        },
    );
    Ok(())
}

/// `<start> --> <end> [setting:value ...]`
fn parse_cue_timing(doc: &Document, line: &str, line_num: usize) -> ParseResult<Item> {
    let (left, right) = line
        .split_once(TIME_BOUNDARIES_SEPARATOR)
        .ok_or_else(|| ParseError::invalid_time(line_num, line))?;
    let mut fields = right.split_whitespace();
    let end = fields.next().unwrap_or_default();

    let start_at = parse_duration(left.trim(), ".", 3).map_err(|e| e.with_line(line_num))?;
    let end_at = parse_duration(end, ".", 3).map_err(|e| e.with_line(line_num))?;

    let mut item = Item {
        start_at,
        end_at,
        ..Default::default()
    };

    let mut sa = StyleAttributes::default();
    for setting in fields {
        let (key, value) = setting
            .split_once(':')
            .ok_or_else(|| ParseError::at_line(line_num, format!("invalid cue setting '{}'", setting)))?;
        match key {
            "align" => sa.webvtt.align = Some(value.to_string()),
            "line" => sa.webvtt.line = Some(value.to_string()),
            "position" => sa.webvtt.position = WebVttPosition::parse(value),
            "region" => {
                if doc.region(value).is_none() {
                    return Err(ParseError::unknown_region(value, format!("cue at line {}", line_num)));
                }
                item.region = Some(value.to_string());
            }
            "size" => sa.webvtt.size = Some(value.to_string()),
            "vertical" => sa.webvtt.vertical = Some(value.to_string()),
            _ => tracing::warn!(line = line_num, setting = key, "Unknown WebVTT cue setting"),
        }
    }
    sa.propagate_webvtt();
    item.inline_style = Some(sa).filter(|sa| !sa.is_empty());

    Ok(item)
}

/// Split one line of cue text into runs.
///
/// `tags` is the stack of tags still open from previous lines of the cue.
fn parse_text(text: &str, tags: &mut Vec<WebVttTag>) -> Line {
    let mut line = Line::default();
    let mut timestamp: Option<Duration> = None;
    let mut rest = text;

    loop {
        let (segment, tag) = match rest.find('<') {
            Some(open) => match rest[open..].find('>') {
                Some(close) => (&rest[..open], Some(&rest[open + 1..open + close])),
                None => (rest, None),
            },
            None => (rest, None),
        };

        push_run(&mut line, segment, tags, &mut timestamp);

        let Some(tag) = tag else { break };
        rest = &rest[segment.len() + tag.len() + 2..];

        if let Some(name) = tag.strip_prefix('/') {
            let name = tag_name(name);
            if let Some(pos) = tags.iter().rposition(|t| t.name == name) {
                tags.truncate(pos);
            }
        } else if INLINE_TIMESTAMP.is_match(tag.trim()) {
            match parse_duration(tag.trim(), ".", 3) {
                Ok(d) => timestamp = Some(d),
                Err(e) => tracing::warn!(error = %e, "Ignoring invalid WebVTT inline timestamp"),
            }
        } else if let Some(parsed) = parse_start_tag(tag) {
            if parsed.name != "v" {
                tags.push(parsed);
            } else if line.voice_name.is_none() {
                line.voice_name = parsed.annotation;
            } else {
                tracing::warn!(voice = ?parsed.annotation, text, "Ignoring extra WebVTT voice tag");
            }
        }
    }

    line
}

fn push_run(line: &mut Line, segment: &str, tags: &[WebVttTag], timestamp: &mut Option<Duration>) {
    let text = unescape_markup(segment.trim());
    if text.is_empty() {
        return;
    }

    let inline_style = if tags.is_empty() {
        None
    } else {
        let mut sa = StyleAttributes::default();
        sa.webvtt.tags = tags.to_vec();
        sa.propagate_webvtt();
        Some(sa)
    };

    line.items.push(LineItem {
        text,
        inline_style,
        style: None,
        start_at: timestamp.take(),
    });
}

fn tag_name(tag: &str) -> &str {
    tag.trim()
        .split(|c: char| c == '.' || c.is_whitespace())
        .next()
        .unwrap_or_default()
}

/// `c.yellow.bg_blue`, `lang en`, `v.loud Esme`
fn parse_start_tag(tag: &str) -> Option<WebVttTag> {
    let tag = tag.trim().trim_end_matches('/').trim_end();
    let (head, annotation) = match tag.split_once(char::is_whitespace) {
        Some((head, annotation)) => (head, Some(annotation.trim().to_string())),
        None => (tag, None),
    };

    let mut parts = head.split('.');
    let name = parts.next().filter(|n| !n.is_empty())?;

    Some(WebVttTag {
        name: name.to_string(),
        classes: parts.filter(|c| !c.is_empty()).map(str::to_string).collect(),
        annotation: annotation.filter(|a| !a.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEBVTT: &str = "\u{feff}WEBVTT - some title

Region: id=fred width=40% lines=3 regionanchor=0%,100% viewportanchor=10%,90% scroll=up
Region: id=bill width=40% lines=3 regionanchor=100%,100% viewportanchor=90%,90% scroll=up

STYLE
::cue {
  color: lime;

}

NOTE this a nice example
of a VTT

1
00:01:39.000 --> 00:01:41.040 region:bill
(deep rumbling)

NOTE This a comment inside the VTT
and this is the second line

2
00:02:04.080 --> 00:02:07.120 region:fred align:left position:10%,start size:35%
MAN:
How did we end up here?

3
00:02:12.160 --> 00:02:15.200
<v Narrator><i>This place is horrible.</i>

00:02:20.240 --> 00:02:22.280 vertical:rl
<c.yellow>Smells like <b>balls</b></c>
";

    #[test]
    fn parse_regions_and_styles() {
        let doc = parse_webvtt(WEBVTT).unwrap();

        assert_eq!(doc.regions.len(), 2);
        let fred = doc.regions["fred"].inline_style.as_ref().unwrap();
        assert_eq!(fred.webvtt.lines, Some(3));
        assert_eq!(fred.webvtt.region_anchor.as_deref(), Some("0%,100%"));
        assert_eq!(fred.webvtt.scroll.as_deref(), Some("up"));
        assert_eq!(fred.webvtt.viewport_anchor.as_deref(), Some("10%,90%"));
        assert_eq!(fred.webvtt.width.as_deref(), Some("40%"));

        let sheet = &doc.styles[DEFAULT_STYLE_ID].inline_style.as_ref().unwrap().webvtt.styles;
        assert_eq!(sheet, &vec!["::cue {", "color: lime;", "}"]);
    }

    #[test]
    fn parse_cues() {
        let doc = parse_webvtt(WEBVTT).unwrap();
        assert_eq!(doc.items.len(), 4);

        let item = &doc.items[0];
        assert_eq!(item.index, 1);
        assert_eq!(item.start_at, Duration::from_millis(99_000));
        assert_eq!(item.end_at, Duration::from_millis(101_040));
        assert_eq!(item.region.as_deref(), Some("bill"));
        assert_eq!(item.comments, vec!["this a nice example", "of a VTT"]);
        assert!(item.inline_style.is_none());

        let item = &doc.items[1];
        assert_eq!(
            item.comments,
            vec!["This a comment inside the VTT", "and this is the second line"]
        );
        assert_eq!(item.region.as_deref(), Some("fred"));
        let sa = item.inline_style.as_ref().unwrap();
        assert_eq!(sa.webvtt.align.as_deref(), Some("left"));
        assert_eq!(sa.webvtt.position.as_ref().map(|p| p.to_string()).as_deref(), Some("10%,start"));
        assert_eq!(sa.webvtt.size.as_deref(), Some("35%"));
        assert_eq!(item.to_string(), "MAN: - How did we end up here?");

        let line = &doc.items[2].lines[0];
        assert_eq!(line.voice_name.as_deref(), Some("Narrator"));
        let sa = line.items[0].inline_style.as_ref().unwrap();
        assert!(sa.webvtt.italics);
        assert_eq!(sa.ttml.font_style.as_deref(), Some("italic"));

        let item = &doc.items[3];
        assert_eq!(item.index, 0);
        let runs = &item.lines[0].items;
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].text, "Smells like");
        assert_eq!(runs[0].inline_style.as_ref().unwrap().webvtt.tags.len(), 1);
        assert_eq!(runs[0].inline_style.as_ref().unwrap().ttml.color.as_deref(), Some("#ffff00"));
        assert_eq!(runs[1].text, "balls");
        let sa = runs[1].inline_style.as_ref().unwrap();
        assert_eq!(sa.webvtt.tags.len(), 2);
        assert!(sa.webvtt.bold);
    }

    #[test]
    fn voice_tags() {
        crate::logging::init_test_tracing();
        let mut tags = Vec::new();
        let line = parse_text("<v Bob>Correct tag</v>", &mut tags);
        assert_eq!(line.voice_name.as_deref(), Some("Bob"));
        assert_eq!(line.items.len(), 1);
        assert_eq!(line.items[0].text, "Correct tag");

        let line = parse_text("<v Bob> Text without end tag", &mut tags);
        assert_eq!(line.items[0].text, "Text without end tag");

        let line = parse_text("<v Bob>Incorrect end tag</vi>", &mut tags);
        assert_eq!(line.voice_name.as_deref(), Some("Bob"));
        assert_eq!(line.items[0].text, "Incorrect end tag");

        let line = parse_text("<v.abc 中文> this is the content</v>", &mut tags);
        assert_eq!(line.voice_name.as_deref(), Some("中文"));

        let line = parse_text("<v foo bar>one <v other>two", &mut tags);
        assert_eq!(line.voice_name.as_deref(), Some("foo bar"));
        assert_eq!(line.to_string(), "one two");
        assert!(tags.is_empty());
    }

    #[test]
    fn inline_timestamps() {
        let mut tags = Vec::new();
        let line = parse_text("<00:01:01.000>With inline <00:01:02.000>timestamps", &mut tags);
        assert_eq!(line.items.len(), 2);
        assert_eq!(line.items[0].text, "With inline");
        assert_eq!(line.items[0].start_at, Some(Duration::from_secs(61)));
        assert_eq!(line.items[1].text, "timestamps");
        assert_eq!(line.items[1].start_at, Some(Duration::from_secs(62)));

        let line = parse_text("<00:01:01.000><00:01:02.000>With timestamp tags together", &mut tags);
        assert_eq!(line.items.len(), 1);
        assert_eq!(line.items[0].start_at, Some(Duration::from_secs(62)));

        let line = parse_text("With end timestamp<00:01:02.000>", &mut tags);
        assert_eq!(line.items.len(), 1);
        assert_eq!(line.items[0].start_at, None);
    }

    #[test]
    fn tags_carry_across_lines() {
        let doc = parse_webvtt("WEBVTT\n\n00:00:01.000 --> 00:00:02.000\n<i>one\ntwo</i> three\n").unwrap();
        let lines = &doc.items[0].lines;
        assert!(lines[0].items[0].inline_style.as_ref().unwrap().webvtt.italics);
        assert!(lines[1].items[0].inline_style.as_ref().unwrap().webvtt.italics);
        assert!(lines[1].items[1].inline_style.is_none());
        assert_eq!(lines[1].items[1].text, "three");
    }

    #[test]
    fn timestamp_map() {
        let cases = [
            ("X-TIMESTAMP-MAP=MPEGTS:180000, LOCAL:00:00:00.000", 2000),
            ("X-TIMESTAMP-MAP=MPEGTS:180000, LOCAL:00:00:00.500", 1500),
            ("X-TIMESTAMP-MAP=LOCAL:00:00:00.000,MPEGTS:135000", 1500),
            ("X-TIMESTAMP-MAP=LOCAL:00:00:00.000,MPEGTS:324090000", 3_601_000),
        ];
        for (line, offset) in cases {
            assert_eq!(parse_timestamp_map(line).unwrap().offset_millis(), offset, "{}", line);
        }

        for line in [
            "X-TIMESTAMP-MAP=MPEGTS:foo, LOCAL:00:00:00.000",
            "X-TIMESTAMP-MAP=MPEGTS:180000,LOCAL:bar",
            "X-TIMESTAMP-MAP=MPEGTS:180000,LOCAL",
            "X-TIMESTAMP-MAP=MPEGTS,LOCAL:00:00:00.000",
            "X-TIMESTAMP-MAP",
        ] {
            assert!(parse_timestamp_map(line).is_err(), "{}", line);
        }

        let doc = parse_webvtt(
            "WEBVTT\nX-TIMESTAMP-MAP=LOCAL:00:00:00.000,MPEGTS:900000\n\n00:00:01.000 --> 00:00:02.000\nhi\n",
        )
        .unwrap();
        let map = doc.metadata.as_ref().and_then(|m| m.webvtt_timestamp_map).unwrap();
        assert_eq!(map.offset_millis(), 10_000);
    }

    #[test]
    fn errors() {
        assert!(matches!(
            parse_webvtt("1\n00:00:01.000 --> 00:00:02.000\nhi\n").unwrap_err(),
            ParseError::MissingSection(_)
        ));

        let err = parse_webvtt("WEBVTT\n\n00:00:01.000 --> 00:00:02.000 region:nope\nhi\n").unwrap_err();
        assert!(matches!(err, ParseError::UnknownReference { kind: "Region", .. }));

        let err = parse_webvtt("WEBVTT\n\n00:00:01.000 --> 00:00:0x.000\nhi\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidTime { line: 3, .. }));

        let err = parse_webvtt("WEBVTT\n\n00:00:01.000 --> 00:00:02.000 align\nhi\n").unwrap_err();
        assert!(matches!(err, ParseError::Generic { line: 3, .. }));

        let err = parse_webvtt("WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nhi\n\nX-TIMESTAMP-MAP=MPEGTS:0\n")
            .unwrap_err();
        assert!(matches!(err, ParseError::Generic { line: 6, .. }));
    }
}
