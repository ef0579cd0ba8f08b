//! EBU STL subtitle writer.
//!
//! Writes one GSI block followed by one TTI block per item. Timecodes are
//! shifted by the start-of-programme timecode so that reading the file back
//! gives the original item times.

use std::time::Duration;

use crate::subtitles::stl::{
    encode_text, spacing_attributes, supported_framerate, GsiBlock, TtiBlock, COMMENT_FLAG_SUBTITLE_DATA,
    CUMULATIVE_STATUS_NOT_CUMULATIVE, DISPLAY_STANDARD_OPEN_SUBTITLING, EXTENSION_BLOCK_NONE,
    TEXT_NEWLINE,
};
use crate::subtitles::style::{Justification, StyleAttributes};
use crate::subtitles::teletext::{teletext_attributes, TELETEXT_END_BOX, TELETEXT_START_BOX};
use crate::subtitles::types::{Document, Item, Language, Line};
use crate::subtitles::WriteOptions;

const DEFAULT_SUBTITLE_LIST_REFERENCE_CODE: &str = "12345678";
const DEFAULT_VERTICAL_POSITION: u8 = 20;

/// Write a Document to EBU STL bytes.
///
/// # Arguments
/// * `doc` - The document to write.
/// * `options` - Fallback frame rate and country for documents without STL metadata.
///
/// # Returns
/// The GSI block followed by the TTI blocks.
pub fn write_stl(doc: &Document, options: &WriteOptions) -> Vec<u8> {
    let gsi = gsi_block(doc, options);
    let open_subtitling = gsi.display_standard_code == DISPLAY_STANDARD_OPEN_SUBTITLING;

    let mut out = gsi.to_bytes();
    for (idx, item) in doc.items.iter().enumerate() {
        let tti = tti_block(item, idx, gsi.timecode_start_of_programme, open_subtitling);
        out.extend(tti.to_bytes(gsi.framerate));
    }

    tracing::debug!(
        items = doc.items.len(),
        framerate = gsi.framerate,
        "Wrote STL document"
    );
    out
}

fn gsi_block(doc: &Document, options: &WriteOptions) -> GsiBlock {
    let mut gsi = GsiBlock {
        framerate: options.stl_default_framerate,
        language_code: Language::French.stl_code().to_string(),
        subtitle_list_reference_code: DEFAULT_SUBTITLE_LIST_REFERENCE_CODE.to_string(),
        creation_date: Some(chrono::Local::now().date_naive()),
        total_number_of_tti_blocks: doc.items.len() as i32,
        total_number_of_subtitles: doc.items.len() as i32,
        country_of_origin: options.stl_default_country.clone(),
        ..Default::default()
    };

    if let Some(metadata) = &doc.metadata {
        if metadata.framerate > 0 {
            gsi.framerate = metadata.framerate;
        }
        if let Some(language) = metadata.language {
            gsi.language_code = language.stl_code().to_string();
        }
        if let Some(title) = &metadata.title {
            gsi.original_program_title = title.clone();
        }

        let stl = &metadata.stl;
        let text = |target: &mut String, value: &Option<String>| {
            if let Some(value) = value {
                *target = value.clone();
            }
        };
        text(&mut gsi.country_of_origin, &stl.country_of_origin);
        text(&mut gsi.display_standard_code, &stl.display_standard_code);
        text(&mut gsi.editor_contact_details, &stl.editor_contact_details);
        text(&mut gsi.editor_name, &stl.editor_name);
        text(&mut gsi.original_episode_title, &stl.original_episode_title);
        text(&mut gsi.publisher, &stl.publisher);
        text(&mut gsi.subtitle_list_reference_code, &stl.subtitle_list_reference_code);
        text(&mut gsi.translated_episode_title, &stl.translated_episode_title);
        text(&mut gsi.translated_program_title, &stl.translated_program_title);
        text(&mut gsi.translator_contact_details, &stl.translator_contact_details);
        text(&mut gsi.translator_name, &stl.translator_name);

        if stl.creation_date.is_some() {
            gsi.creation_date = stl.creation_date;
        }
        gsi.revision_date = stl.revision_date;
        gsi.revision_number = stl.revision_number;
        if let Some(max) = stl.max_characters_per_row {
            gsi.max_characters_per_row = max;
        }
        if let Some(max) = stl.max_rows {
            gsi.max_rows = max;
        }
        gsi.timecode_start_of_programme = stl.timecode_start_of_programme;
    }

    // Frames are encoded at the rate the disk format code announces.
    gsi.framerate = supported_framerate(gsi.framerate);

    if let Some(first) = doc.items.first() {
        gsi.timecode_first_in_cue = first.start_at + gsi.timecode_start_of_programme;
    }
    gsi
}

fn tti_block(item: &Item, idx: usize, start_of_programme: Duration, open_subtitling: bool) -> TtiBlock {
    let stl = item.inline_style.as_ref().map(|sa| &sa.stl);
    let vertical_position = stl
        .and_then(|s| s.position)
        .and_then(|p| u8::try_from(p.vertical_position).ok())
        .unwrap_or(DEFAULT_VERTICAL_POSITION);
    let justification = stl
        .and_then(|s| s.justification)
        .unwrap_or(Justification::Centered);

    let rows: Vec<Vec<u8>> = item
        .lines
        .iter()
        .map(|line| {
            if open_subtitling {
                open_subtitle_row(line)
            } else {
                teletext_row(line)
            }
        })
        .collect();

    TtiBlock {
        subtitle_group_number: 0,
        subtitle_number: (idx + 1) as u16,
        extension_block_number: EXTENSION_BLOCK_NONE,
        cumulative_status: CUMULATIVE_STATUS_NOT_CUMULATIVE,
        timecode_in: item.start_at + start_of_programme,
        timecode_out: item.end_at + start_of_programme,
        vertical_position,
        justification_code: justification.code(),
        comment_flag: COMMENT_FLAG_SUBTITLE_DATA,
        text: rows.join(&TEXT_NEWLINE),
    }
}

/// Run text with its recorded surrounding spaces, or a single separating
/// space when the run was not read from a fixed-column format.
fn padded_text(sa: &StyleAttributes, text: &str, first: bool) -> String {
    let before = sa
        .teletext
        .spaces_before
        .unwrap_or(if first { 0 } else { 1 })
        .max(0) as usize;
    let after = sa.teletext.spaces_after.unwrap_or(0).max(0) as usize;
    format!("{}{}{}", " ".repeat(before), text, " ".repeat(after))
}

fn teletext_row(line: &Line) -> Vec<u8> {
    let mut row = vec![TELETEXT_START_BOX, TELETEXT_START_BOX];
    let mut previous = StyleAttributes::default();
    for (i, li) in line.items.iter().enumerate() {
        let sa = li.inline_style.clone().unwrap_or_default();
        row.extend(teletext_attributes(&previous, &sa));
        row.extend(spacing_attributes(&previous, &sa));
        row.extend(encode_text(&padded_text(&sa, &li.text, i == 0)));
        previous = sa;
    }
    row.extend([TELETEXT_END_BOX, TELETEXT_END_BOX]);
    row
}

fn open_subtitle_row(line: &Line) -> Vec<u8> {
    let mut row = Vec::new();
    let mut previous = StyleAttributes::default();
    for (i, li) in line.items.iter().enumerate() {
        let sa = li.inline_style.clone().unwrap_or_default();
        row.extend(spacing_attributes(&previous, &sa));
        row.extend(encode_text(&padded_text(&sa, &li.text, i == 0)));
        previous = sa;
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitles::color::Color;
    use crate::subtitles::parsers::{parse_srt, parse_stl};
    use crate::subtitles::stl::{GSI_BLOCK_SIZE, TTI_BLOCK_SIZE};
    use crate::subtitles::style::StlPosition;
    use crate::subtitles::types::{LineItem, Metadata, StlMetadata};
    use crate::subtitles::ReadOptions;
    use chrono::NaiveDate;

    fn document() -> Document {
        let mut doc =
            parse_srt("1\n00:01:39,000 --> 00:01:41,040\n(deep rumbling)\n\n2\n00:01:42,000 --> 00:01:43,000\n<i>Très</i> bien\nsecond row\n")
                .unwrap();
        doc.metadata = Some(Metadata {
            framerate: 25,
            language: Some(Language::English),
            title: Some("Title test".to_string()),
            stl: StlMetadata {
                country_of_origin: Some("GBR".to_string()),
                creation_date: NaiveDate::from_ymd_opt(2024, 3, 1),
                publisher: Some("Copyright test".to_string()),
                timecode_start_of_programme: Duration::from_secs(36_000),
                ..Default::default()
            },
            ..Default::default()
        });
        doc
    }

    #[test]
    fn test_write_block_layout() {
        let doc = document();
        let output = write_stl(&doc, &WriteOptions::default());
        assert_eq!(output.len(), GSI_BLOCK_SIZE + 2 * TTI_BLOCK_SIZE);

        let gsi = GsiBlock::parse(&output).unwrap();
        assert_eq!(gsi.framerate, 25);
        assert_eq!(&output[3..11], b"STL25.01");
        assert_eq!(gsi.language_code, "09");
        assert_eq!(gsi.original_program_title, "Title test");
        assert_eq!(gsi.country_of_origin, "GBR");
        assert_eq!(gsi.publisher, "Copyright test");
        assert_eq!(gsi.subtitle_list_reference_code, "12345678");
        assert_eq!(gsi.total_number_of_subtitles, 2);
        assert_eq!(gsi.timecode_first_in_cue, Duration::from_secs(36_099));

        let tti = TtiBlock::parse(&output[GSI_BLOCK_SIZE..], 25).unwrap();
        assert_eq!(tti.subtitle_number, 1);
        assert_eq!(tti.extension_block_number, EXTENSION_BLOCK_NONE);
        assert_eq!(tti.timecode_in, Duration::from_secs(36_099));
        assert_eq!(tti.vertical_position, DEFAULT_VERTICAL_POSITION);
        assert_eq!(tti.justification_code, Justification::Centered.code());
        assert_eq!(&tti.text[..4], &[TELETEXT_START_BOX, TELETEXT_START_BOX, b'(', b'd']);
    }

    #[test]
    fn test_write_then_read() {
        let doc = document();
        let output = write_stl(&doc, &WriteOptions::default());
        let reread = parse_stl(&output, &ReadOptions::default()).unwrap();

        assert_eq!(reread.items.len(), 2);
        assert_eq!(reread.items[0].start_at, Duration::from_secs(99));
        assert_eq!(reread.items[0].end_at, Duration::from_millis(101_040));
        assert_eq!(reread.items[0].to_string(), "(deep rumbling)");
        assert_eq!(reread.items[1].to_string(), "Très bien - second row");

        let first_run = reread.items[1].lines[0].items[0].inline_style.as_ref().unwrap();
        assert_eq!(first_run.stl.italics, Some(true));
        let second_run = reread.items[1].lines[0].items[1].inline_style.as_ref().unwrap();
        assert_eq!(second_run.stl.italics, Some(false));

        let metadata = reread.metadata.unwrap();
        assert_eq!(metadata.language, Some(Language::English));
        assert_eq!(metadata.stl.creation_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(metadata.stl.timecode_start_of_programme, Duration::from_secs(36_000));
    }

    #[test]
    fn test_write_unsupported_framerate_as_25() {
        let mut doc = document();
        if let Some(metadata) = doc.metadata.as_mut() {
            metadata.framerate = 24;
        }
        doc.items[0].end_at = Duration::from_millis(12_520);
        doc.items[0].start_at = Duration::from_millis(10_000);

        let output = write_stl(&doc, &WriteOptions::default());
        assert_eq!(&output[3..11], b"STL25.01");

        let reread = parse_stl(&output, &ReadOptions::default()).unwrap();
        assert_eq!(reread.metadata.as_ref().map(|m| m.framerate), Some(25));
        assert_eq!(reread.items[0].start_at, Duration::from_secs(10));
        assert_eq!(reread.items[0].end_at, Duration::from_millis(12_520));
    }

    #[test]
    fn test_write_teletext_colors_and_placement() {
        let mut doc = Document::new();
        let mut green = StyleAttributes::default();
        green.teletext.color = Some(Color::GREEN);
        let mut placement = StyleAttributes::default();
        placement.stl.justification = Some(Justification::Left);
        placement.stl.position = Some(StlPosition {
            vertical_position: 2,
            max_rows: 23,
            rows: 1,
        });
        doc.items.push(Item {
            start_at: Duration::from_secs(1),
            end_at: Duration::from_secs(2),
            inline_style: Some(placement),
            lines: vec![Line {
                items: vec![
                    LineItem {
                        text: "plain".to_string(),
                        ..Default::default()
                    },
                    LineItem {
                        text: "green".to_string(),
                        inline_style: Some(green),
                        ..Default::default()
                    },
                ],
                voice_name: None,
            }],
            ..Default::default()
        });

        let output = write_stl(&doc, &WriteOptions::default());
        let tti = TtiBlock::parse(&output[GSI_BLOCK_SIZE..], 25).unwrap();
        assert_eq!(tti.vertical_position, 2);
        assert_eq!(tti.justification_code, Justification::Left.code());
        assert_eq!(
            &tti.text[..16],
            &[0x0b, 0x0b, b'p', b'l', b'a', b'i', b'n', 0x02, b' ', b'g', b'r', b'e', b'e', b'n', 0x0a, 0x0a]
        );

        let reread = parse_stl(&output, &ReadOptions::default()).unwrap();
        let runs = &reread.items[0].lines[0].items;
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[1].text, "green");
        assert_eq!(
            runs[1].inline_style.as_ref().and_then(|sa| sa.teletext.color),
            Some(Color::GREEN)
        );
    }

    #[test]
    fn test_write_defaults_without_metadata() {
        let doc = Document::new();
        let options = WriteOptions {
            stl_default_framerate: 30,
            stl_default_country: "USA".to_string(),
            ..Default::default()
        };
        let output = write_stl(&doc, &options);
        assert_eq!(output.len(), GSI_BLOCK_SIZE);

        let gsi = GsiBlock::parse(&output).unwrap();
        assert_eq!(gsi.framerate, 30);
        assert_eq!(gsi.country_of_origin, "USA");
        assert_eq!(gsi.language_code, "0F");
        assert!(gsi.creation_date.is_some());
    }

    #[test]
    fn test_write_open_subtitling() {
        let mut doc = parse_srt("1\n00:00:01,000 --> 00:00:02,000\n<i>slanted</i> back\n").unwrap();
        doc.metadata = Some(Metadata {
            stl: StlMetadata {
                display_standard_code: Some(DISPLAY_STANDARD_OPEN_SUBTITLING.to_string()),
                ..Default::default()
            },
            ..Default::default()
        });

        let output = write_stl(&doc, &WriteOptions::default());
        let tti = TtiBlock::parse(&output[GSI_BLOCK_SIZE..], 25).unwrap();
        assert_eq!(&tti.text[..4], &[0x80, b's', b'l', b'a']);

        let reread = parse_stl(&output, &ReadOptions::default()).unwrap();
        assert_eq!(reread.items[0].to_string(), "slanted back");
    }
}
