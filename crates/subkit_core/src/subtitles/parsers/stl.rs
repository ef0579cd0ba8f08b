//! EBU STL subtitle parser.
//!
//! An STL file is a 1024-byte GSI header followed by 128-byte TTI blocks,
//! one per subtitle. Block layout and character tables live in
//! [`crate::subtitles::stl`]; this module turns them into a [`Document`].

use crate::subtitles::error::ParseResult;
use crate::subtitles::stl::{
    GsiBlock, StlCharacterHandler, StlStyler, TtiBlock, DISPLAY_STANDARD_OPEN_SUBTITLING,
    EXTENSION_BLOCK_RESERVED_USER_DATA, GSI_BLOCK_SIZE, TEXT_FILLER, TEXT_NEWLINE, TTI_BLOCK_SIZE,
};
use crate::subtitles::style::{Justification, StlPosition, StyleAttributes};
use crate::subtitles::teletext::{parse_open_subtitle_row, parse_teletext_row};
use crate::subtitles::types::{Document, Item, Language, Metadata, StlMetadata};
use crate::subtitles::ReadOptions;

/// Parse STL content into a Document.
///
/// # Arguments
/// * `content` - The raw STL file content.
/// * `options` - Whether to keep timecodes relative to the start of programme.
///
/// # Returns
/// * `Ok(Document)` - Parsed subtitle data.
/// * `Err(ParseError)` - If a block is truncated, the character table is not
///   supported or an open subtitle contains teletext control codes.
pub fn parse_stl(content: &[u8], options: &ReadOptions) -> ParseResult<Document> {
    let gsi = GsiBlock::parse(content)?;
    let open_subtitling = gsi.display_standard_code == DISPLAY_STANDARD_OPEN_SUBTITLING;

    // Fail early on unsupported tables, even without any TTI block
    StlCharacterHandler::new(&gsi.character_code_table_number)?;

    let mut doc = Document::new();

    for (block_num, block) in content[GSI_BLOCK_SIZE..].chunks(TTI_BLOCK_SIZE).enumerate() {
        let tti = TtiBlock::parse(block, gsi.framerate)?;

        if tti.extension_block_number == EXTENSION_BLOCK_RESERVED_USER_DATA {
            tracing::debug!(block = block_num + 1, "Skipping STL user data block");
            continue;
        }

        let (start_at, end_at) = if options.stl_ignore_timecode_start_of_programme {
            (tti.timecode_in, tti.timecode_out)
        } else {
            (
                tti.timecode_in.saturating_sub(gsi.timecode_start_of_programme),
                tti.timecode_out.saturating_sub(gsi.timecode_start_of_programme),
            )
        };

        let mut item = Item {
            start_at,
            end_at,
            index: i32::from(tti.subtitle_number),
            ..Default::default()
        };

        // Step 1: rows
        let mut decoder = StlCharacterHandler::new(&gsi.character_code_table_number)?;
        for row in trim_filler(&tti.text).split(|&b| b == TEXT_NEWLINE) {
            if open_subtitling {
                parse_open_subtitle_row::<StlStyler>(&mut item, &mut decoder, row)?;
            } else {
                parse_teletext_row::<StlStyler>(&mut item, &mut decoder, row);
            }
        }

        // Step 2: placement
        let mut sa = StyleAttributes::default();
        sa.stl.justification = Justification::from_code(tti.justification_code);
        sa.stl.position = Some(StlPosition {
            vertical_position: i32::from(tti.vertical_position),
            max_rows: gsi.max_rows,
            rows: item.lines.len() as i32,
        });
        sa.propagate_stl();
        item.inline_style = Some(sa);

        doc.items.push(item);
    }

    doc.metadata = Some(metadata_from_gsi(gsi));
    Ok(doc)
}

fn trim_filler(text: &[u8]) -> &[u8] {
    let end = text
        .iter()
        .rposition(|&b| b != TEXT_FILLER)
        .map_or(0, |pos| pos + 1);
    &text[..end]
}

fn non_empty(value: String) -> Option<String> {
    Some(value).filter(|v| !v.is_empty())
}

fn metadata_from_gsi(gsi: GsiBlock) -> Metadata {
    Metadata {
        framerate: gsi.framerate,
        language: Language::from_stl_code(&gsi.language_code),
        title: non_empty(gsi.original_program_title),
        stl: StlMetadata {
            country_of_origin: non_empty(gsi.country_of_origin),
            creation_date: gsi.creation_date,
            display_standard_code: non_empty(gsi.display_standard_code),
            editor_contact_details: non_empty(gsi.editor_contact_details),
            editor_name: non_empty(gsi.editor_name),
            max_characters_per_row: Some(gsi.max_characters_per_row),
            max_rows: Some(gsi.max_rows),
            original_episode_title: non_empty(gsi.original_episode_title),
            publisher: non_empty(gsi.publisher),
            revision_date: gsi.revision_date,
            revision_number: gsi.revision_number,
            subtitle_list_reference_code: non_empty(gsi.subtitle_list_reference_code),
            timecode_start_of_programme: gsi.timecode_start_of_programme,
            translated_episode_title: non_empty(gsi.translated_episode_title),
            translated_program_title: non_empty(gsi.translated_program_title),
            translator_contact_details: non_empty(gsi.translator_contact_details),
            translator_name: non_empty(gsi.translator_name),
        },
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitles::color::Color;
    use crate::subtitles::error::ParseError;
    use crate::subtitles::stl::{
        CHARACTER_CODE_TABLE_LATIN, COMMENT_FLAG_SUBTITLE_DATA, CUMULATIVE_STATUS_NOT_CUMULATIVE,
        EXTENSION_BLOCK_NONE,
    };
    use chrono::NaiveDate;
    use std::time::Duration;

    fn tti(number: u16, start: u64, end: u64, text: &[u8]) -> TtiBlock {
        TtiBlock {
            subtitle_group_number: 0,
            subtitle_number: number,
            extension_block_number: EXTENSION_BLOCK_NONE,
            cumulative_status: CUMULATIVE_STATUS_NOT_CUMULATIVE,
            timecode_in: Duration::from_secs(start),
            timecode_out: Duration::from_secs(end),
            vertical_position: 20,
            justification_code: 0x02,
            comment_flag: COMMENT_FLAG_SUBTITLE_DATA,
            text: text.to_vec(),
        }
    }

    fn build(gsi: &GsiBlock, blocks: &[TtiBlock]) -> Vec<u8> {
        let mut out = gsi.to_bytes();
        for block in blocks {
            out.extend(block.to_bytes(gsi.framerate));
        }
        out
    }

    fn gsi() -> GsiBlock {
        GsiBlock {
            language_code: "0F".to_string(),
            original_program_title: "Program".to_string(),
            country_of_origin: "FRA".to_string(),
            creation_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            timecode_start_of_programme: Duration::from_secs(3600),
            ..Default::default()
        }
    }

    #[test]
    fn parse_teletext_blocks() {
        let first = [
            0x0d, 0x0b, 0x0b, b'H', b'e', b'l', b'l', 0xc2, b'o', 0x0a, 0x0a, TEXT_NEWLINE, TEXT_NEWLINE,
            0x0d, 0x02, 0x0b, 0x0b, b'w', b'o', b'r', b'l', b'd', 0x0a, 0x0a,
        ];
        let mut user_data = tti(2, 0, 0, b"ignored");
        user_data.extension_block_number = EXTENSION_BLOCK_RESERVED_USER_DATA;
        let content = build(
            &gsi(),
            &[
                tti(1, 3700, 3702, &first),
                user_data,
                tti(3, 3710, 3712, &[0x0b, 0x0b, 0x80, b'i', b't', 0x81, b' ', b'n', b'o', b't', 0x0a, 0x0a]),
            ],
        );

        let doc = parse_stl(&content, &ReadOptions::default()).unwrap();
        assert_eq!(doc.items.len(), 2);

        let item = &doc.items[0];
        assert_eq!(item.index, 1);
        assert_eq!(item.start_at, Duration::from_secs(100));
        assert_eq!(item.end_at, Duration::from_secs(102));
        assert_eq!(item.to_string(), "Helló - world");
        let green = item.lines[1].items[0].inline_style.as_ref().unwrap();
        assert_eq!(green.teletext.color, Some(Color::GREEN));
        assert_eq!(green.ttml.color.as_deref(), Some("#008000"));
        assert_eq!(green.teletext.double_height, Some(true));

        let placement = item.inline_style.as_ref().unwrap();
        assert_eq!(placement.stl.justification, Some(Justification::Centered));
        assert_eq!(
            placement.stl.position,
            Some(StlPosition {
                vertical_position: 20,
                max_rows: 23,
                rows: 2
            })
        );
        assert_eq!(placement.webvtt.line.as_deref(), Some("82%"));

        let runs = &doc.items[1].lines[0].items;
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].text, "it");
        assert!(runs[0].inline_style.as_ref().unwrap().webvtt.italics);
        assert_eq!(runs[1].text, "not");
        assert_eq!(runs[1].inline_style.as_ref().unwrap().teletext.spaces_before, Some(1));
        assert_eq!(runs[1].inline_style.as_ref().unwrap().stl.italics, Some(false));
    }

    #[test]
    fn metadata_from_header() {
        let content = build(&gsi(), &[tti(1, 3700, 3702, &[0x0b, 0x0b, b'x', 0x0a, 0x0a])]);
        let doc = parse_stl(&content, &ReadOptions::default()).unwrap();
        let metadata = doc.metadata.unwrap();
        assert_eq!(metadata.framerate, 25);
        assert_eq!(metadata.language, Some(Language::French));
        assert_eq!(metadata.title.as_deref(), Some("Program"));
        assert_eq!(metadata.stl.country_of_origin.as_deref(), Some("FRA"));
        assert_eq!(metadata.stl.creation_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(metadata.stl.max_rows, Some(23));
        assert_eq!(metadata.stl.timecode_start_of_programme, Duration::from_secs(3600));
        assert!(metadata.stl.publisher.is_none());
    }

    #[test]
    fn keep_absolute_timecodes() {
        let content = build(&gsi(), &[tti(1, 3700, 3702, &[0x0b, 0x0b, b'x', 0x0a, 0x0a])]);
        let options = ReadOptions {
            stl_ignore_timecode_start_of_programme: true,
        };
        let doc = parse_stl(&content, &options).unwrap();
        assert_eq!(doc.items[0].start_at, Duration::from_secs(3700));
    }

    #[test]
    fn open_subtitling_rows() {
        let gsi = GsiBlock {
            display_standard_code: DISPLAY_STANDARD_OPEN_SUBTITLING.to_string(),
            ..Default::default()
        };
        let content = build(&gsi, &[tti(1, 1, 2, b"first\x8asecond")]);
        let doc = parse_stl(&content, &ReadOptions::default()).unwrap();
        assert_eq!(doc.items[0].to_string(), "first - second");

        let content = build(&gsi, &[tti(1, 1, 2, &[0x0b, b'x'])]);
        let err = parse_stl(&content, &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, ParseError::InvalidBlock { block: "TTI", .. }));
    }

    #[test]
    fn truncated_input_fails() {
        let err = parse_stl(&[0u8; 100], &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, ParseError::InvalidBlock { block: "GSI", .. }));

        let mut content = build(&GsiBlock::default(), &[tti(1, 1, 2, b"x")]);
        content.truncate(content.len() - 10);
        let err = parse_stl(&content, &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, ParseError::InvalidBlock { block: "TTI", .. }));
    }

    #[test]
    fn unsupported_character_table_fails() {
        let gsi = GsiBlock {
            character_code_table_number: "01".to_string(),
            ..Default::default()
        };
        assert_ne!(gsi.character_code_table_number, CHARACTER_CODE_TABLE_LATIN);
        let err = parse_stl(&build(&gsi, &[]), &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, ParseError::EncodingError(_)));
    }
}
