//! TTML subtitle parser.
//!
//! Reads Timed Text Markup Language documents:
//! ```xml
//! <tt xmlns="http://www.w3.org/ns/ttml" xml:lang="fr" ttp:frameRate="25">
//!   <head>
//!     <styling><style xml:id="s1" tts:color="white"/></styling>
//!     <layout><region xml:id="r1" style="s1"/></layout>
//!   </head>
//!   <body><div>
//!     <p begin="00:01:39.000" end="00:01:41.040" region="r1">(deep rumbling)</p>
//!   </div></body>
//! </tt>
//! ```
//!
//! Input is read permissively: elements and attributes are matched on their
//! local name whatever their namespace, and prefixes used without a
//! declaration are declared on the root element before parsing.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use roxmltree::Node;

use crate::subtitles::duration::parse_duration;
use crate::subtitles::error::{ParseError, ParseResult};
use crate::subtitles::style::StyleAttributes;
use crate::subtitles::types::{Document, Item, Language, Line, LineItem, Metadata, Region, Style};

/// TTML default frame rate when the document declares none.
const DEFAULT_FRAMERATE: u32 = 30;

static DECLARED_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"xmlns:([A-Za-z_][\w.-]*)\s*=").expect("valid regex"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<>!?][^<>]*>").expect("valid regex"));
static USED_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^</?|\s)([A-Za-z_][\w.-]*):[A-Za-z_]").expect("valid regex"));

fn namespace_for(prefix: &str) -> String {
    match prefix {
        "tts" => "http://www.w3.org/ns/ttml#styling".to_string(),
        "ttp" => "http://www.w3.org/ns/ttml#parameter".to_string(),
        "ttm" => "http://www.w3.org/ns/ttml#metadata".to_string(),
        other => format!("urn:undeclared:{}", other),
    }
}

/// Declare on the root element every prefix the document uses without
/// declaring it.
fn declare_missing_namespaces(content: &str) -> Cow<'_, str> {
    let declared: BTreeSet<&str> = DECLARED_PREFIX
        .captures_iter(content)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect();
    let missing: BTreeSet<&str> = TAG
        .find_iter(content)
        .flat_map(|tag| USED_PREFIX.captures_iter(tag.as_str()))
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|p| !matches!(*p, "xml" | "xmlns") && !declared.contains(p))
        .collect();
    let Some(root) = TAG.find(content) else {
        return Cow::Borrowed(content);
    };
    if missing.is_empty() {
        return Cow::Borrowed(content);
    }

    let declarations: String = missing
        .iter()
        .map(|p| format!(" xmlns:{}=\"{}\"", p, namespace_for(p)))
        .collect();
    let insert_at = if root.as_str().ends_with("/>") {
        root.end() - 2
    } else {
        root.end() - 1
    };
    let mut patched = String::with_capacity(content.len() + declarations.len());
    patched.push_str(&content[..insert_at]);
    patched.push_str(&declarations);
    patched.push_str(&content[insert_at..]);
    Cow::Owned(patched)
}

/// Frame and tick rates used to resolve time expressions.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TimeBase {
    pub framerate: u32,
    pub tick_rate: u32,
}

impl Default for TimeBase {
    fn default() -> Self {
        Self {
            framerate: DEFAULT_FRAMERATE,
            tick_rate: 1,
        }
    }
}

/// Parse a TTML time expression.
///
/// Accepted forms:
/// - clock time `HH:MM:SS.mmm`
/// - clock time with frames `HH:MM:SS:FF`
/// - offset time `1.5h`, `2m`, `3.2s`, `400ms`
/// - frames `25f` and ticks `10000t`
pub(crate) fn parse_time_expression(value: &str, base: TimeBase) -> ParseResult<Duration> {
    let value = value.trim();
    let invalid = |message: &str| ParseError::invalid_duration(value, message);

    // Offset time
    if let Some(idx) = value.find(|c: char| c.is_ascii_alphabetic()) {
        let (number, unit) = value.split_at(idx);
        let number: f64 = number.parse().map_err(|_| invalid("invalid offset"))?;
        if !number.is_finite() || number < 0.0 {
            return Err(invalid("negative offset"));
        }
        let seconds = match unit {
            "h" => number * 3600.0,
            "m" => number * 60.0,
            "s" => number,
            "ms" => number / 1000.0,
            "f" => number / f64::from(base.framerate.max(1)),
            "t" => number / f64::from(base.tick_rate.max(1)),
            _ => return Err(invalid("unknown time unit")),
        };
        return Duration::try_from_secs_f64(seconds).map_err(|_| invalid("offset out of range"));
    }

    // Clock time with frames
    let parts: Vec<&str> = value.split(':').collect();
    if let [hours, minutes, seconds, frames] = parts.as_slice() {
        let frames: u64 = frames.parse().map_err(|_| invalid("invalid frame count"))?;
        let clock = parse_duration(&format!("{}:{}:{}", hours, minutes, seconds), ".", 3)?;
        let nanos = frames
            .checked_mul(1_000_000_000)
            .map(|n| n / u64::from(base.framerate.max(1)))
            .ok_or_else(|| invalid("frame count out of range"))?;
        return clock
            .checked_add(Duration::from_nanos(nanos))
            .ok_or_else(|| invalid("out of range"));
    }

    parse_duration(value, ".", 3)
}

fn is_element(node: &Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

fn child_elements<'a, 'input>(node: Node<'a, 'input>, name: &'a str) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(move |n| is_element(n, name))
}

/// Attribute value by local name, whatever its namespace.
fn attr<'a>(node: &Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attributes().find(|a| a.name() == name).map(|a| a.value())
}

/// `tts:` styling attributes of an element, or `None` when it has none.
fn style_attributes(node: &Node) -> Option<StyleAttributes> {
    let mut sa = StyleAttributes::default();
    let ttml = &mut sa.ttml;
    for a in node.attributes() {
        let value = Some(a.value().to_string());
        match a.name() {
            "backgroundColor" => ttml.background_color = value,
            "color" => ttml.color = value,
            "direction" => ttml.direction = value,
            "display" => ttml.display = value,
            "displayAlign" => ttml.display_align = value,
            "extent" => ttml.extent = value,
            "fontFamily" => ttml.font_family = value,
            "fontSize" => ttml.font_size = value,
            "fontStyle" => ttml.font_style = value,
            "fontWeight" => ttml.font_weight = value,
            "lineHeight" => ttml.line_height = value,
            "opacity" => ttml.opacity = value,
            "origin" => ttml.origin = value,
            "overflow" => ttml.overflow = value,
            "padding" => ttml.padding = value,
            "showBackground" => ttml.show_background = value,
            "textAlign" => ttml.text_align = value,
            "textDecoration" => ttml.text_decoration = value,
            "textOutline" => ttml.text_outline = value,
            "unicodeBidi" => ttml.unicode_bidi = value,
            "visibility" => ttml.visibility = value,
            "wrapOption" => ttml.wrap_option = value,
            "writingMode" => ttml.writing_mode = value,
            "zIndex" => ttml.z_index = a.value().trim().parse().ok(),
            _ => {}
        }
    }
    if sa.is_empty() {
        return None;
    }
    sa.propagate_ttml();
    Some(sa)
}

/// Resolve an optional style reference.
fn style_ref(
    node: &Node,
    styles: &BTreeMap<String, Style>,
    requested_by: impl FnOnce() -> String,
) -> ParseResult<Option<String>> {
    match attr(node, "style") {
        Some(id) if !styles.contains_key(id) => Err(ParseError::unknown_style(id, requested_by())),
        Some(id) => Ok(Some(id.to_string())),
        None => Ok(None),
    }
}

/// Parse TTML content into a Document.
///
/// # Arguments
/// * `content` - The raw TTML document.
///
/// # Returns
/// * `Ok(Document)` - Parsed subtitle data.
/// * `Err(ParseError)` - If the XML is malformed, a time expression is
///   invalid or a style/region reference does not resolve.
pub fn parse_ttml(content: &str) -> ParseResult<Document> {
    let content = declare_missing_namespaces(content);
    let xml = roxmltree::Document::parse(&content)?;
    let root = xml.root_element();
    if root.tag_name().name() != "tt" {
        return Err(ParseError::MissingSection("tt".to_string()));
    }

    let mut doc = Document::new();

    // Step 1: metadata
    let framerate: u32 = attr(&root, "frameRate")
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0);
    let base = TimeBase {
        framerate: if framerate > 0 { framerate } else { DEFAULT_FRAMERATE },
        tick_rate: attr(&root, "tickRate")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(if framerate > 0 { framerate } else { 1 }),
    };

    let mut metadata = Metadata {
        framerate,
        language: attr(&root, "lang").and_then(Language::from_ttml_code),
        ..Default::default()
    };

    let head = child_elements(root, "head").next();
    if let Some(m) = head.and_then(|h| child_elements(h, "metadata").next()) {
        for child in m.children().filter(|n| n.is_element()) {
            let text = child.text().map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
            match child.tag_name().name() {
                "title" => metadata.title = text,
                "copyright" => metadata.ttml_copyright = text,
                _ => {}
            }
        }
    }
    doc.metadata = Some(metadata);

    // Step 2: styles, then their parents once every ID is known
    let style_nodes: Vec<Node> = head
        .into_iter()
        .flat_map(|h| child_elements(h, "styling"))
        .flat_map(|s| child_elements(s, "style"))
        .collect();
    for node in &style_nodes {
        let id = attr(node, "id").unwrap_or_default().to_string();
        let style = Style {
            id: id.clone(),
            inline_style: style_attributes(node),
            style: None,
        };
        doc.styles.insert(id, style);
    }
    for node in &style_nodes {
        let id = attr(node, "id").unwrap_or_default();
        let parent = style_ref(node, &doc.styles, || format!("style {}", id))?;
        if let Some(style) = doc.styles.get_mut(id) {
            style.style = parent;
        }
    }

    // Step 3: regions
    for node in head
        .into_iter()
        .flat_map(|h| child_elements(h, "layout"))
        .flat_map(|l| child_elements(l, "region"))
    {
        let id = attr(&node, "id").unwrap_or_default().to_string();
        let region = Region {
            style: style_ref(&node, &doc.styles, || format!("region {}", id))?,
            inline_style: style_attributes(&node),
            id: id.clone(),
        };
        doc.regions.insert(id, region);
    }

    // Step 4: subtitles
    let body = child_elements(root, "body").next();
    for p in body
        .into_iter()
        .flat_map(|b| b.descendants())
        .filter(|n| is_element(n, "p"))
    {
        let item = parse_paragraph(&p, &doc, base)?;
        doc.items.push(item);
    }

    Ok(doc)
}

fn parse_paragraph(p: &Node, doc: &Document, base: TimeBase) -> ParseResult<Item> {
    let time = |name: &str| attr(p, name).map(|v| parse_time_expression(v, base)).transpose();
    let start_at = time("begin")?.unwrap_or_default();
    let end_at = match (time("end")?, time("dur")?) {
        (Some(end), _) => end,
        (None, Some(dur)) => start_at
            .checked_add(dur)
            .ok_or_else(|| ParseError::invalid_duration(attr(p, "dur").unwrap_or_default(), "out of range"))?,
        (None, None) => start_at,
    };
    let describe = || format!("subtitle between {:?} and {:?}", start_at, end_at);

    let region = match attr(p, "region") {
        Some(id) if doc.region(id).is_none() => return Err(ParseError::unknown_region(id, describe())),
        Some(id) => Some(id.to_string()),
        None => None,
    };

    let mut item = Item {
        start_at,
        end_at,
        region,
        style: style_ref(p, &doc.styles, describe)?,
        inline_style: style_attributes(p),
        ..Default::default()
    };

    let mut line = Line::default();
    for child in p.children() {
        if child.is_text() {
            let text = child.text().unwrap_or_default().trim();
            if !text.is_empty() {
                line.items.push(LineItem {
                    text: text.to_string(),
                    ..Default::default()
                });
            }
        } else if is_element(&child, "br") {
            item.lines.push(std::mem::take(&mut line));
        } else if child.is_element() {
            let text: String = child
                .descendants()
                .filter(|n| n.is_text())
                .filter_map(|n| n.text())
                .collect();
            line.items.push(LineItem {
                style: style_ref(&child, &doc.styles, || format!("item with text {}", text))?,
                inline_style: style_attributes(&child),
                text,
                start_at: None,
            });
        }
    }
    item.lines.push(line);

    Ok(item)
}
