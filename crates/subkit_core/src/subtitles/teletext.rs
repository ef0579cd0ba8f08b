//! Row parsing shared by the teletext and open-subtitle text fields of
//! binary formats.
//!
//! A row is a run of bytes where control codes switch colour, size or
//! format-specific styling. Every style change closes the current
//! [`LineItem`] and opens a new one that inherits the previous style.

use super::color::Color;
use super::error::{ParseError, ParseResult};
use super::style::StyleAttributes;
use super::types::{Item, Line, LineItem};

pub(crate) const TELETEXT_END_BOX: u8 = 0x0a;
pub(crate) const TELETEXT_START_BOX: u8 = 0x0b;
const TELETEXT_NORMAL_SIZE: u8 = 0x0c;
const TELETEXT_DOUBLE_HEIGHT: u8 = 0x0d;
const TELETEXT_DOUBLE_WIDTH: u8 = 0x0e;
const TELETEXT_DOUBLE_SIZE: u8 = 0x0f;

/// Alphanumeric colour codes 0x00 to 0x07, in code order.
pub const TELETEXT_COLORS: [Color; 8] = [
    Color::BLACK,
    Color::RED,
    Color::GREEN,
    Color::YELLOW,
    Color::BLUE,
    Color::MAGENTA,
    Color::CYAN,
    Color::WHITE,
];

/// Turns a single byte into text.
///
/// Decoders may be stateful: a byte can produce nothing and affect how the
/// next one decodes.
pub trait CharacterDecoder {
    fn decode(&mut self, byte: u8) -> String;
}

/// Format-specific spacing attributes found inside a row.
///
/// A fresh styler is created for every byte, so `has_been_set` tells
/// whether that byte was a spacing attribute.
pub trait Styler: Default {
    fn parse_spacing_attribute(&mut self, byte: u8);
    fn has_been_set(&self) -> bool;
    fn has_changed(&self, attributes: &StyleAttributes) -> bool;
    fn update(&self, attributes: &mut StyleAttributes);
    fn propagate(&self, attributes: &mut StyleAttributes);
}

/// Styler for rows without format-specific attributes.
#[derive(Debug, Default)]
pub struct NoStyler;

impl Styler for NoStyler {
    fn parse_spacing_attribute(&mut self, _byte: u8) {}

    fn has_been_set(&self) -> bool {
        false
    }

    fn has_changed(&self, _attributes: &StyleAttributes) -> bool {
        false
    }

    fn update(&self, _attributes: &mut StyleAttributes) {}

    fn propagate(&self, _attributes: &mut StyleAttributes) {}
}

fn styled_line_item(inline_style: StyleAttributes) -> LineItem {
    LineItem {
        inline_style: Some(inline_style),
        ..Default::default()
    }
}

/// Parse a teletext row into a new line of `item`.
///
/// Only bytes between a start box and an end box are text. Colour and size
/// codes apply anywhere in the row.
pub fn parse_teletext_row<S: Styler>(
    item: &mut Item,
    decoder: &mut dyn CharacterDecoder,
    row: &[u8],
) {
    let mut line = Line::default();
    let mut current = styled_line_item(StyleAttributes::default());
    let mut started = false;
    let mut styler = S::default();

    for &byte in row {
        styler = S::default();

        let mut color = None;
        let mut double_height = None;
        let mut double_size = None;
        let mut double_width = None;
        match byte {
            0x00..=0x07 => color = Some(TELETEXT_COLORS[usize::from(byte)]),
            TELETEXT_END_BOX => started = false,
            TELETEXT_START_BOX => started = true,
            TELETEXT_NORMAL_SIZE => {
                double_height = Some(false);
                double_size = Some(false);
                double_width = Some(false);
            }
            TELETEXT_DOUBLE_HEIGHT => double_height = Some(true),
            TELETEXT_DOUBLE_WIDTH => double_width = Some(true),
            TELETEXT_DOUBLE_SIZE => double_size = Some(true),
            _ => styler.parse_spacing_attribute(byte),
        }

        let is_style =
            color.is_some() || double_height.is_some() || double_size.is_some() || double_width.is_some();
        if is_style || styler.has_been_set() {
            let sa = current.inline_style.get_or_insert_with(StyleAttributes::default);
            let changed = (color.is_some() && color != sa.teletext.color)
                || (double_height.is_some() && double_height != sa.teletext.double_height)
                || (double_size.is_some() && double_size != sa.teletext.double_size)
                || (double_width.is_some() && double_width != sa.teletext.double_width)
                || styler.has_changed(sa);
            if !changed {
                continue;
            }

            if started {
                let inherited = sa.clone();
                let finished = std::mem::replace(&mut current, styled_line_item(inherited));
                append_teletext_line_item(&mut line, finished, &styler);
            }

            let sa = current.inline_style.get_or_insert_with(StyleAttributes::default);
            if color.is_some() {
                sa.teletext.color = color;
            }
            if double_height.is_some() {
                sa.teletext.double_height = double_height;
            }
            if double_size.is_some() {
                sa.teletext.double_size = double_size;
            }
            if double_width.is_some() {
                sa.teletext.double_width = double_width;
            }
            styler.update(sa);
        } else if started {
            current.text.push_str(&decoder.decode(byte));
        }
    }

    append_teletext_line_item(&mut line, current, &styler);

    if !line.items.is_empty() {
        item.lines.push(line);
    }
}

/// Append a run, recording how many spaces surrounded it before trimming.
pub fn append_teletext_line_item<S: Styler>(line: &mut Line, mut line_item: LineItem, styler: &S) {
    if line_item.text.trim().is_empty() {
        return;
    }

    let sa = line_item.inline_style.get_or_insert_with(StyleAttributes::default);
    let before = line_item.text.chars().take_while(|&c| c == ' ').count();
    let after = line_item.text.chars().rev().take_while(|&c| c == ' ').count();
    sa.teletext.spaces_before = Some(before as i32);
    sa.teletext.spaces_after = Some(after as i32);

    sa.propagate_teletext();
    styler.propagate(sa);

    line_item.text = line_item.text.trim().to_string();
    line.items.push(line_item);
}

fn size_code(sa: &StyleAttributes) -> u8 {
    let t = &sa.teletext;
    if t.double_size == Some(true) {
        TELETEXT_DOUBLE_SIZE
    } else if t.double_height == Some(true) {
        TELETEXT_DOUBLE_HEIGHT
    } else if t.double_width == Some(true) {
        TELETEXT_DOUBLE_WIDTH
    } else {
        TELETEXT_NORMAL_SIZE
    }
}

/// Colour and size control codes that switch a row from `from` to `to`.
///
/// Colours outside [`TELETEXT_COLORS`] are not representable and are skipped.
pub(crate) fn teletext_attributes(from: &StyleAttributes, to: &StyleAttributes) -> Vec<u8> {
    let mut out = Vec::new();
    if let Some(color) = to.teletext.color.filter(|&c| Some(c) != from.teletext.color) {
        if let Some(code) = TELETEXT_COLORS.iter().position(|&c| c == color) {
            out.push(code as u8);
        }
    }
    let size = size_code(to);
    if size != size_code(from) {
        out.push(size);
    }
    out
}

fn is_teletext_control_code(byte: u8) -> bool {
    byte <= 0x1f
}

/// Parse an open-subtitling row into a new line of `item`.
///
/// Open subtitles carry no teletext control codes; finding one is an error.
pub fn parse_open_subtitle_row<S: Styler>(
    item: &mut Item,
    decoder: &mut dyn CharacterDecoder,
    row: &[u8],
) -> ParseResult<()> {
    let mut line = Line::default();
    let mut current = styled_line_item(StyleAttributes::default());
    let mut styler = S::default();

    for &byte in row {
        styler = S::default();

        if is_teletext_control_code(byte) {
            return Err(ParseError::invalid_block(
                "TTI",
                format!("teletext control code {:#04x} in open text", byte),
            ));
        }
        styler.parse_spacing_attribute(byte);

        if styler.has_been_set() {
            let sa = current.inline_style.get_or_insert_with(StyleAttributes::default);
            if styler.has_changed(sa) {
                if !current.text.is_empty() {
                    let inherited = sa.clone();
                    let finished = std::mem::replace(&mut current, styled_line_item(inherited));
                    append_open_subtitle_line_item(&mut line, finished, &styler);
                }
                styler.update(current.inline_style.get_or_insert_with(StyleAttributes::default));
            }
        } else {
            current.text.push_str(&decoder.decode(byte));
        }
    }

    append_open_subtitle_line_item(&mut line, current, &styler);

    if !line.items.is_empty() {
        item.lines.push(line);
    }
    Ok(())
}

fn append_open_subtitle_line_item<S: Styler>(line: &mut Line, mut line_item: LineItem, styler: &S) {
    if line_item.text.trim().is_empty() {
        return;
    }

    styler.propagate(line_item.inline_style.get_or_insert_with(StyleAttributes::default));
    line_item.text = line_item.text.trim().to_string();
    line.items.push(line_item);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitles::stl::{StlCharacterHandler, StlStyler};

    fn latin() -> StlCharacterHandler {
        StlCharacterHandler::new("00").unwrap()
    }

    fn spaced(mut sa: StyleAttributes) -> StyleAttributes {
        sa.teletext.spaces_before = Some(0);
        sa.teletext.spaces_after = Some(0);
        sa
    }

    #[test]
    fn teletext_row_colours_and_sizes() {
        let mut row = b"start".to_vec();
        row.extend([0x00, 0x0b]);
        let segments: [(&[u8], u8); 11] = [
            (b"black", 0x01),
            (b"red", 0x02),
            (b"green", 0x03),
            (b"yellow", 0x04),
            (b"blue", 0x05),
            (b"magenta", 0x06),
            (b"cyan", 0x07),
            (b"white", 0x0d),
            (b"double height", 0x0e),
            (b"double width", 0x0f),
            (b"double size", 0x0c),
        ];
        for (text, code) in segments {
            row.extend_from_slice(text);
            row.push(code);
        }
        row.extend_from_slice(b"reset");
        row.push(0x0a);
        row.extend_from_slice(b"end");

        let mut item = Item::default();
        parse_teletext_row::<NoStyler>(&mut item, &mut latin(), &row);
        assert_eq!(item.lines.len(), 1);

        let items = &item.lines[0].items;
        let texts: Vec<&str> = items.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "black",
                "red",
                "green",
                "yellow",
                "blue",
                "magenta",
                "cyan",
                "white",
                "double height",
                "double width",
                "double size",
                "reset"
            ]
        );

        let mut expected = StyleAttributes::default();
        expected.teletext.color = Some(Color::GREEN);
        expected.ttml.color = Some("#008000".to_string());
        assert_eq!(items[2].inline_style, Some(spaced(expected)));

        let style = |i: usize| items[i].inline_style.clone().unwrap_or_default().teletext;
        assert_eq!(style(8).double_height, Some(true));
        assert_eq!(style(8).double_width, None);
        assert_eq!(style(9).double_height, Some(true));
        assert_eq!(style(9).double_width, Some(true));
        assert_eq!(style(10).double_size, Some(true));
        assert_eq!(style(11).double_height, Some(false));
        assert_eq!(style(11).double_width, Some(false));
        assert_eq!(style(11).double_size, Some(false));
        assert_eq!(style(11).color, Some(Color::WHITE));
        assert_eq!(
            items[11].inline_style.as_ref().and_then(|s| s.ttml.color.as_deref()),
            Some("#ffffff")
        );
    }

    #[test]
    fn append_counts_surrounding_spaces() {
        let mut line = Line::default();
        append_teletext_line_item(&mut line, LineItem::default(), &NoStyler);
        assert!(line.items.is_empty());

        append_teletext_line_item(
            &mut line,
            LineItem {
                text: " test  ".to_string(),
                ..Default::default()
            },
            &NoStyler,
        );
        assert_eq!(line.items[0].text, "test");
        let mut expected = StyleAttributes::default();
        expected.teletext.spaces_before = Some(1);
        expected.teletext.spaces_after = Some(2);
        assert_eq!(line.items[0].inline_style, Some(expected));
    }

    #[test]
    fn open_subtitle_row_splits_on_styling() {
        let mut row = b"plain ".to_vec();
        row.push(0x80);
        row.extend_from_slice(b"slanted");
        row.push(0x81);
        row.extend_from_slice(b" back");
        row.extend([0x8f, 0x8f]);

        let mut item = Item::default();
        parse_open_subtitle_row::<StlStyler>(&mut item, &mut latin(), &row).unwrap();
        let items = &item.lines[0].items;
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].text, "plain");
        assert_eq!(items[1].text, "slanted");
        assert_eq!(
            items[1].inline_style.as_ref().and_then(|s| s.stl.italics),
            Some(true)
        );
        assert_eq!(
            items[1].inline_style.as_ref().and_then(|s| s.ttml.font_style.as_deref()),
            Some("italic")
        );
        assert_eq!(items[2].text, "back");
        assert_eq!(
            items[2].inline_style.as_ref().and_then(|s| s.stl.italics),
            Some(false)
        );
    }

    #[test]
    fn open_subtitle_rejects_control_codes() {
        let mut item = Item::default();
        let err = parse_open_subtitle_row::<StlStyler>(&mut item, &mut latin(), &[b'a', 0x0d])
            .unwrap_err();
        assert!(err.to_string().contains("teletext control code"));
        assert!(item.lines.is_empty());
    }

    #[test]
    fn teletext_attributes_encode_changes_only() {
        let plain = StyleAttributes::default();
        let mut green = StyleAttributes::default();
        green.teletext.color = Some(Color::GREEN);
        green.teletext.double_height = Some(true);

        assert_eq!(teletext_attributes(&plain, &green), vec![0x02, TELETEXT_DOUBLE_HEIGHT]);
        assert!(teletext_attributes(&green, &green).is_empty());
        assert_eq!(teletext_attributes(&green, &plain), vec![TELETEXT_NORMAL_SIZE]);

        let mut orange = StyleAttributes::default();
        orange.teletext.color = Some(Color::rgb(0xff, 0xa5, 0x00));
        assert!(teletext_attributes(&plain, &orange).is_empty());
    }
}
