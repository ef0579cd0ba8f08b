//! TTML subtitle writer.
//!
//! Output is strict where input is permissive: every styling attribute is
//! written in the `tts` namespace, and styling comes before layout.

use crate::subtitles::duration::format_duration;
use crate::subtitles::escape::escape_markup;
use crate::subtitles::style::{StyleAttributes, TtmlStyle};
use crate::subtitles::types::{Document, Item, Line};
use crate::subtitles::WriteOptions;

const NAMESPACE_TTML: &str = "http://www.w3.org/ns/ttml";
const NAMESPACE_TTML_METADATA: &str = "http://www.w3.org/ns/ttml#metadata";
const NAMESPACE_TTML_PARAMETER: &str = "http://www.w3.org/ns/ttml#parameter";
const NAMESPACE_TTML_STYLING: &str = "http://www.w3.org/ns/ttml#styling";

/// Indented line-by-line XML output.
struct XmlOutput {
    out: String,
    indent: usize,
}

impl XmlOutput {
    fn line(&mut self, depth: usize, content: &str) {
        self.out.push_str(&" ".repeat(depth * self.indent));
        self.out.push_str(content);
        self.out.push('\n');
    }
}

/// ` name="value"` pairs for the `tts:` attributes that are set.
fn style_attributes(sa: Option<&StyleAttributes>) -> String {
    let Some(sa) = sa else {
        return String::new();
    };
    let TtmlStyle {
        background_color,
        color,
        direction,
        display,
        display_align,
        extent,
        font_family,
        font_size,
        font_style,
        font_weight,
        line_height,
        opacity,
        origin,
        overflow,
        padding,
        show_background,
        text_align,
        text_decoration,
        text_outline,
        unicode_bidi,
        visibility,
        wrap_option,
        writing_mode,
        z_index,
    } = &sa.ttml;
    let z_index = z_index.map(|z| z.to_string());

    [
        ("backgroundColor", background_color),
        ("color", color),
        ("direction", direction),
        ("display", display),
        ("displayAlign", display_align),
        ("extent", extent),
        ("fontFamily", font_family),
        ("fontSize", font_size),
        ("fontStyle", font_style),
        ("fontWeight", font_weight),
        ("lineHeight", line_height),
        ("opacity", opacity),
        ("origin", origin),
        ("overflow", overflow),
        ("padding", padding),
        ("showBackground", show_background),
        ("textAlign", text_align),
        ("textDecoration", text_decoration),
        ("textOutline", text_outline),
        ("unicodeBidi", unicode_bidi),
        ("visibility", visibility),
        ("wrapOption", wrap_option),
        ("writingMode", writing_mode),
        ("zIndex", &z_index),
    ]
    .into_iter()
    .filter_map(|(name, value)| {
        value
            .as_ref()
            .map(|v| format!(" tts:{}=\"{}\"", name, escape_markup(v)))
    })
    .collect()
}

fn reference(name: &str, id: Option<&String>) -> String {
    id.map(|id| format!(" {}=\"{}\"", name, escape_markup(id)))
        .unwrap_or_default()
}

/// Write a Document to TTML format string.
///
/// # Arguments
/// * `doc` - The document to write.
/// * `options` - Write options (indentation width).
///
/// # Returns
/// The TTML document as a string.
pub fn write_ttml(doc: &Document, options: &WriteOptions) -> String {
    let mut xml = XmlOutput {
        out: String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"),
        indent: options.ttml_indent,
    };
    let metadata = doc.metadata.as_ref();

    // Step 1: root
    let mut root = format!(
        "<tt xmlns=\"{}\" xmlns:ttm=\"{}\" xmlns:ttp=\"{}\" xmlns:tts=\"{}\"",
        NAMESPACE_TTML, NAMESPACE_TTML_METADATA, NAMESPACE_TTML_PARAMETER, NAMESPACE_TTML_STYLING
    );
    if let Some(language) = metadata.and_then(|m| m.language) {
        root.push_str(&format!(" xml:lang=\"{}\"", language.ttml_code()));
    }
    if let Some(framerate) = metadata.map(|m| m.framerate).filter(|&f| f > 0) {
        root.push_str(&format!(" ttp:frameRate=\"{}\"", framerate));
    }
    root.push('>');
    xml.line(0, &root);

    // Step 2: head
    let title = metadata.and_then(|m| m.title.as_ref());
    let copyright = metadata.and_then(|m| m.ttml_copyright.as_ref());
    let has_metadata = title.is_some() || copyright.is_some();
    if has_metadata || !doc.styles.is_empty() || !doc.regions.is_empty() {
        xml.line(1, "<head>");
        if has_metadata {
            xml.line(2, "<metadata>");
            if let Some(title) = title {
                xml.line(3, &format!("<ttm:title>{}</ttm:title>", escape_markup(title)));
            }
            if let Some(copyright) = copyright {
                xml.line(3, &format!("<ttm:copyright>{}</ttm:copyright>", escape_markup(copyright)));
            }
            xml.line(2, "</metadata>");
        }
        if !doc.styles.is_empty() {
            xml.line(2, "<styling>");
            for style in doc.styles.values() {
                xml.line(
                    3,
                    &format!(
                        "<style xml:id=\"{}\"{}{}/>",
                        escape_markup(&style.id),
                        reference("style", style.style.as_ref()),
                        style_attributes(style.inline_style.as_ref())
                    ),
                );
            }
            xml.line(2, "</styling>");
        }
        if !doc.regions.is_empty() {
            xml.line(2, "<layout>");
            for region in doc.regions.values() {
                xml.line(
                    3,
                    &format!(
                        "<region xml:id=\"{}\"{}{}/>",
                        escape_markup(&region.id),
                        reference("style", region.style.as_ref()),
                        style_attributes(region.inline_style.as_ref())
                    ),
                );
            }
            xml.line(2, "</layout>");
        }
        xml.line(1, "</head>");
    }

    // Step 3: body
    xml.line(1, "<body>");
    xml.line(2, "<div>");
    for item in &doc.items {
        xml.line(3, &paragraph(item));
    }
    xml.line(2, "</div>");
    xml.line(1, "</body>");
    xml.line(0, "</tt>");

    xml.out
}

fn paragraph(item: &Item) -> String {
    let content = item.lines.iter().map(spans).collect::<Vec<_>>().join("<br/>");
    format!(
        "<p begin=\"{}\" end=\"{}\"{}{}{}>{}</p>",
        format_duration(item.start_at, ".", 3),
        format_duration(item.end_at, ".", 3),
        reference("region", item.region.as_ref()),
        reference("style", item.style.as_ref()),
        style_attributes(item.inline_style.as_ref()),
        content
    )
}

fn spans(line: &Line) -> String {
    line.items
        .iter()
        .map(|li| {
            format!(
                "<span{}{}>{}</span>",
                reference("style", li.style.as_ref()),
                style_attributes(li.inline_style.as_ref()),
                escape_markup(&li.text)
            )
        })
        .collect()
}
