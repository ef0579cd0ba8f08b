//! EBU Tech 3264 record layout.
//!
//! An STL file is one 1024-byte GSI (general subtitle information) block
//! followed by 128-byte TTI (text and timing information) blocks. Every
//! field sits at a fixed offset; nothing is delimited.
//!
//! This module holds the block codecs, frame-based timecodes, the Latin
//! character table and the STL spacing-attribute styler. Mapping to and
//! from [`Document`](super::Document) lives in the parser and writer.

use std::collections::HashMap;
use std::time::Duration;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use unicode_normalization::UnicodeNormalization;

use super::error::{ParseError, ParseResult};
use super::style::StyleAttributes;
use super::teletext::{CharacterDecoder, Styler};

pub const GSI_BLOCK_SIZE: usize = 1024;
pub const TTI_BLOCK_SIZE: usize = 128;
pub const TTI_TEXT_SIZE: usize = 112;

/// Code page 850, multilingual.
pub const CODE_PAGE_MULTILINGUAL: &str = "850";
/// Character code table 00, Latin.
pub const CHARACTER_CODE_TABLE_LATIN: &str = "00";

pub const DISPLAY_STANDARD_OPEN_SUBTITLING: &str = "0";
pub const DISPLAY_STANDARD_LEVEL1_TELETEXT: &str = "1";

pub const TIMECODE_STATUS_INTENDED_FOR_USE: &str = "1";

/// Extension block number of a block carrying user data instead of text.
pub const EXTENSION_BLOCK_RESERVED_USER_DATA: u8 = 0xfe;
/// Extension block number of a block with no extension.
pub const EXTENSION_BLOCK_NONE: u8 = 0xff;

pub const CUMULATIVE_STATUS_NOT_CUMULATIVE: u8 = 0x00;
pub const COMMENT_FLAG_SUBTITLE_DATA: u8 = 0x00;

/// Text field row separator.
pub const TEXT_NEWLINE: u8 = 0x8a;
/// Text field filler for unused bytes.
pub const TEXT_FILLER: u8 = 0x8f;

const ITALICS_ON: u8 = 0x80;
const ITALICS_OFF: u8 = 0x81;
const UNDERLINE_ON: u8 = 0x82;
const UNDERLINE_OFF: u8 = 0x83;
const BOXING_ON: u8 = 0x84;
const BOXING_OFF: u8 = 0x85;

const DATE_FORMAT: &str = "%y%m%d";

/// Frame rate encoded in the disk format code.
pub fn framerate_from_disk_format_code(code: &str) -> Option<u32> {
    match code {
        "STL25.01" => Some(25),
        "STL30.01" => Some(30),
        _ => None,
    }
}

/// Closest frame rate a disk format code can carry: 30 stays 30, anything
/// else becomes 25.
pub fn supported_framerate(framerate: u32) -> u32 {
    match framerate {
        30 => 30,
        _ => 25,
    }
}

/// Disk format code for a frame rate.
pub fn disk_format_code(framerate: u32) -> &'static str {
    match supported_framerate(framerate) {
        30 => "STL30.01",
        _ => "STL25.01",
    }
}

fn frames_to_duration(frames: u64, framerate: u32) -> Duration {
    Duration::from_nanos(frames * 1_000_000_000 / u64::from(framerate.max(1)))
}

/// Hours, minutes, seconds and the nearest frame.
fn split_timecode(d: Duration, framerate: u32) -> (u64, u64, u64, u64) {
    let framerate = u64::from(framerate.max(1));
    let mut total_secs = d.as_secs();
    let mut frames = (u64::from(d.subsec_nanos()) * framerate + 500_000_000) / 1_000_000_000;
    if frames >= framerate {
        total_secs = total_secs.saturating_add(1);
        frames -= framerate;
    }
    (total_secs / 3600, (total_secs / 60) % 60, total_secs % 60, frames)
}

/// Parse an `HHMMSSFF` timecode.
pub fn parse_timecode(input: &str, framerate: u32) -> ParseResult<Duration> {
    if input.len() != 8 || !input.is_ascii() {
        return Err(ParseError::invalid_duration(input, "expected HHMMSSFF"));
    }
    let field = |range: std::ops::Range<usize>| {
        input[range]
            .parse::<u64>()
            .map_err(|e| ParseError::invalid_duration(input, e.to_string()))
    };
    let hours = field(0..2)?;
    let minutes = field(2..4)?;
    let seconds = field(4..6)?;
    let frames = field(6..8)?;
    Ok(Duration::from_secs(hours * 3600 + minutes * 60 + seconds) + frames_to_duration(frames, framerate))
}

/// Format as `HHMMSSFF`, each component zero-padded to two digits.
pub fn format_timecode(d: Duration, framerate: u32) -> String {
    let (hours, minutes, seconds, frames) = split_timecode(d, framerate);
    format!("{:02}{:02}{:02}{:02}", hours, minutes, seconds, frames)
}

/// Parse a 4-byte binary timecode: hours, minutes, seconds, frames.
pub fn parse_timecode_bytes(bytes: [u8; 4], framerate: u32) -> Duration {
    let [hours, minutes, seconds, frames] = bytes.map(u64::from);
    Duration::from_secs(hours * 3600 + minutes * 60 + seconds) + frames_to_duration(frames, framerate)
}

pub fn format_timecode_bytes(d: Duration, framerate: u32) -> [u8; 4] {
    let (hours, minutes, seconds, frames) = split_timecode(d, framerate);
    [hours as u8, minutes as u8, seconds as u8, frames as u8]
}

/// General subtitle information block.
#[derive(Debug, Clone, PartialEq)]
pub struct GsiBlock {
    pub code_page_number: String,
    pub framerate: u32,
    pub display_standard_code: String,
    pub character_code_table_number: String,
    pub language_code: String,
    pub original_program_title: String,
    pub original_episode_title: String,
    pub translated_program_title: String,
    pub translated_episode_title: String,
    pub translator_name: String,
    pub translator_contact_details: String,
    pub subtitle_list_reference_code: String,
    pub creation_date: Option<NaiveDate>,
    pub revision_date: Option<NaiveDate>,
    pub revision_number: i32,
    pub total_number_of_tti_blocks: i32,
    pub total_number_of_subtitles: i32,
    pub total_number_of_subtitle_groups: i32,
    pub max_characters_per_row: i32,
    pub max_rows: i32,
    pub timecode_status: String,
    pub timecode_start_of_programme: Duration,
    pub timecode_first_in_cue: Duration,
    pub total_number_of_disks: i32,
    pub disk_sequence_number: i32,
    pub country_of_origin: String,
    pub publisher: String,
    pub editor_name: String,
    pub editor_contact_details: String,
    pub user_defined_area: String,
}

impl Default for GsiBlock {
    fn default() -> Self {
        Self {
            code_page_number: CODE_PAGE_MULTILINGUAL.to_string(),
            framerate: 25,
            display_standard_code: DISPLAY_STANDARD_LEVEL1_TELETEXT.to_string(),
            character_code_table_number: CHARACTER_CODE_TABLE_LATIN.to_string(),
            language_code: String::new(),
            original_program_title: String::new(),
            original_episode_title: String::new(),
            translated_program_title: String::new(),
            translated_episode_title: String::new(),
            translator_name: String::new(),
            translator_contact_details: String::new(),
            subtitle_list_reference_code: String::new(),
            creation_date: None,
            revision_date: None,
            revision_number: 0,
            total_number_of_tti_blocks: 0,
            total_number_of_subtitles: 0,
            total_number_of_subtitle_groups: 1,
            max_characters_per_row: 40,
            max_rows: 23,
            timecode_status: TIMECODE_STATUS_INTENDED_FOR_USE.to_string(),
            timecode_start_of_programme: Duration::ZERO,
            timecode_first_in_cue: Duration::ZERO,
            total_number_of_disks: 1,
            disk_sequence_number: 1,
            country_of_origin: String::new(),
            publisher: String::new(),
            editor_name: String::new(),
            editor_contact_details: String::new(),
            user_defined_area: String::new(),
        }
    }
}

fn text_field(b: &[u8]) -> String {
    String::from_utf8_lossy(b).trim().to_string()
}

fn number_field(b: &[u8], name: &str) -> ParseResult<Option<i32>> {
    let value = text_field(b);
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|e| ParseError::invalid_block("GSI", format!("{} '{}': {}", name, value, e)))
}

fn date_field(b: &[u8]) -> ParseResult<Option<NaiveDate>> {
    let value = text_field(b);
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(&value, DATE_FORMAT)
        .map(Some)
        .map_err(|e| ParseError::invalid_block("GSI", format!("date '{}': {}", value, e)))
}

fn timecode_field(b: &[u8], framerate: u32) -> ParseResult<Duration> {
    let value = text_field(b);
    if value.is_empty() {
        return Ok(Duration::ZERO);
    }
    parse_timecode(&value, framerate)
}

/// Append `value` as exactly `width` bytes, space padded.
///
/// Header fields are ASCII; other characters become `?`.
fn put_text(out: &mut Vec<u8>, value: &str, width: usize) {
    let mut bytes: Vec<u8> = value
        .chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .take(width)
        .collect();
    bytes.resize(width, b' ');
    out.extend_from_slice(&bytes);
}

/// Append `value` zero-padded to `width` digits.
fn put_number(out: &mut Vec<u8>, value: i32, width: usize) {
    let digits = format!("{:0width$}", value.max(0), width = width);
    out.extend_from_slice(&digits.as_bytes()[digits.len() - width..]);
}

impl GsiBlock {
    /// Decode the 1024-byte header.
    pub fn parse(b: &[u8]) -> ParseResult<Self> {
        if b.len() < GSI_BLOCK_SIZE {
            return Err(ParseError::invalid_block(
                "GSI",
                format!("expected {} bytes, got {}", GSI_BLOCK_SIZE, b.len()),
            ));
        }

        let disk_format_code = text_field(&b[3..11]);
        let framerate = framerate_from_disk_format_code(&disk_format_code).unwrap_or_else(|| {
            tracing::debug!(code = %disk_format_code, "Unknown STL disk format code, assuming 25fps");
            25
        });

        Ok(Self {
            code_page_number: text_field(&b[0..3]),
            framerate,
            display_standard_code: text_field(&b[11..12]),
            character_code_table_number: text_field(&b[12..14]),
            language_code: text_field(&b[14..16]),
            original_program_title: text_field(&b[16..48]),
            original_episode_title: text_field(&b[48..80]),
            translated_program_title: text_field(&b[80..112]),
            translated_episode_title: text_field(&b[112..144]),
            translator_name: text_field(&b[144..176]),
            translator_contact_details: text_field(&b[176..208]),
            subtitle_list_reference_code: text_field(&b[208..224]),
            creation_date: date_field(&b[224..230])?,
            revision_date: date_field(&b[230..236])?,
            revision_number: number_field(&b[236..238], "revision number")?.unwrap_or_default(),
            total_number_of_tti_blocks: number_field(&b[238..243], "TTI block count")?
                .unwrap_or_default(),
            total_number_of_subtitles: number_field(&b[243..248], "subtitle count")?
                .unwrap_or_default(),
            total_number_of_subtitle_groups: number_field(&b[248..251], "subtitle group count")?
                .unwrap_or_default(),
            max_characters_per_row: number_field(&b[251..253], "maximum characters per row")?
                .unwrap_or_default(),
            max_rows: number_field(&b[253..255], "maximum rows")?.unwrap_or_default(),
            timecode_status: text_field(&b[255..256]),
            timecode_start_of_programme: timecode_field(&b[256..264], framerate)?,
            timecode_first_in_cue: timecode_field(&b[264..272], framerate)?,
            total_number_of_disks: number_field(&b[272..273], "disk count")?.unwrap_or_default(),
            disk_sequence_number: number_field(&b[273..274], "disk sequence number")?
                .unwrap_or_default(),
            country_of_origin: text_field(&b[274..277]),
            publisher: text_field(&b[277..309]),
            editor_name: text_field(&b[309..341]),
            editor_contact_details: text_field(&b[341..373]),
            user_defined_area: text_field(&b[448..GSI_BLOCK_SIZE]),
        })
    }

    /// Encode as exactly 1024 bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let date = |d: Option<NaiveDate>| d.map(|d| d.format(DATE_FORMAT).to_string()).unwrap_or_default();

        let mut out = Vec::with_capacity(GSI_BLOCK_SIZE);
        put_text(&mut out, &self.code_page_number, 3);
        put_text(&mut out, disk_format_code(self.framerate), 8);
        put_text(&mut out, &self.display_standard_code, 1);
        put_text(&mut out, &self.character_code_table_number, 2);
        put_text(&mut out, &self.language_code, 2);
        put_text(&mut out, &self.original_program_title, 32);
        put_text(&mut out, &self.original_episode_title, 32);
        put_text(&mut out, &self.translated_program_title, 32);
        put_text(&mut out, &self.translated_episode_title, 32);
        put_text(&mut out, &self.translator_name, 32);
        put_text(&mut out, &self.translator_contact_details, 32);
        put_text(&mut out, &self.subtitle_list_reference_code, 16);
        put_text(&mut out, &date(self.creation_date), 6);
        put_text(&mut out, &date(self.revision_date), 6);
        put_number(&mut out, self.revision_number, 2);
        put_number(&mut out, self.total_number_of_tti_blocks, 5);
        put_number(&mut out, self.total_number_of_subtitles, 5);
        put_number(&mut out, self.total_number_of_subtitle_groups, 3);
        put_number(&mut out, self.max_characters_per_row, 2);
        put_number(&mut out, self.max_rows, 2);
        put_text(&mut out, &self.timecode_status, 1);
        put_text(&mut out, &format_timecode(self.timecode_start_of_programme, self.framerate), 8);
        put_text(&mut out, &format_timecode(self.timecode_first_in_cue, self.framerate), 8);
        put_number(&mut out, self.total_number_of_disks, 1);
        put_number(&mut out, self.disk_sequence_number, 1);
        put_text(&mut out, &self.country_of_origin, 3);
        put_text(&mut out, &self.publisher, 32);
        put_text(&mut out, &self.editor_name, 32);
        put_text(&mut out, &self.editor_contact_details, 32);
        // Spare bytes
        put_text(&mut out, "", 75);
        put_text(&mut out, &self.user_defined_area, GSI_BLOCK_SIZE - 448);
        out
    }
}

/// Text and timing information block.
#[derive(Debug, Clone, PartialEq)]
pub struct TtiBlock {
    pub subtitle_group_number: u8,
    pub subtitle_number: u16,
    pub extension_block_number: u8,
    pub cumulative_status: u8,
    pub timecode_in: Duration,
    pub timecode_out: Duration,
    pub vertical_position: u8,
    pub justification_code: u8,
    pub comment_flag: u8,
    /// Raw text field, [`TTI_TEXT_SIZE`] bytes once encoded.
    pub text: Vec<u8>,
}

impl TtiBlock {
    /// Decode one 128-byte block.
    pub fn parse(b: &[u8], framerate: u32) -> ParseResult<Self> {
        if b.len() < TTI_BLOCK_SIZE {
            return Err(ParseError::invalid_block(
                "TTI",
                format!("expected {} bytes, got {}", TTI_BLOCK_SIZE, b.len()),
            ));
        }
        Ok(Self {
            subtitle_group_number: b[0],
            subtitle_number: u16::from_le_bytes([b[1], b[2]]),
            extension_block_number: b[3],
            cumulative_status: b[4],
            timecode_in: parse_timecode_bytes([b[5], b[6], b[7], b[8]], framerate),
            timecode_out: parse_timecode_bytes([b[9], b[10], b[11], b[12]], framerate),
            vertical_position: b[13],
            justification_code: b[14],
            comment_flag: b[15],
            text: b[16..TTI_BLOCK_SIZE].to_vec(),
        })
    }

    /// Encode as exactly 128 bytes, padding the text field with filler.
    pub fn to_bytes(&self, framerate: u32) -> Vec<u8> {
        let mut out = Vec::with_capacity(TTI_BLOCK_SIZE);
        out.push(self.subtitle_group_number);
        out.extend_from_slice(&self.subtitle_number.to_le_bytes());
        out.push(self.extension_block_number);
        out.push(self.cumulative_status);
        out.extend_from_slice(&format_timecode_bytes(self.timecode_in, framerate));
        out.extend_from_slice(&format_timecode_bytes(self.timecode_out, framerate));
        out.push(self.vertical_position);
        out.push(self.justification_code);
        out.push(self.comment_flag);

        let mut text = self.text.clone();
        if text.len() > TTI_TEXT_SIZE {
            tracing::warn!(
                subtitle = self.subtitle_number,
                len = text.len(),
                "STL text field too long, truncating"
            );
        }
        text.resize(TTI_TEXT_SIZE, TEXT_FILLER);
        out.extend_from_slice(&text);
        out
    }
}

/// Byte to text mapping of character code table 00 (Latin).
///
/// 0xc1 to 0xcf are combining diacritics applied to the next character.
fn latin_character(b: u8) -> Option<&'static str> {
    let s = match b {
        0x20..=0x23 | 0x25..=0x7e => return ASCII_CHARS.get(usize::from(b - 0x20)).copied(),
        0x24 => "¤",
        0xa0 => "\u{a0}",
        0xa1 => "¡",
        0xa2 => "¢",
        0xa3 => "£",
        0xa4 => "$",
        0xa5 => "¥",
        0xa6 => "#",
        0xa7 => "§",
        0xa8 => "¤",
        0xa9 => "‘",
        0xaa => "“",
        0xab => "«",
        0xac => "←",
        0xad => "↑",
        0xae => "→",
        0xaf => "↓",
        0xb0 => "°",
        0xb1 => "±",
        0xb2 => "²",
        0xb3 => "³",
        0xb4 => "×",
        0xb5 => "µ",
        0xb6 => "¶",
        0xb7 => "·",
        0xb8 => "÷",
        0xb9 => "’",
        0xba => "”",
        0xbb => "»",
        0xbc => "¼",
        0xbd => "½",
        0xbe => "¾",
        0xbf => "¿",
        0xc1 => "\u{300}",
        0xc2 => "\u{301}",
        0xc3 => "\u{302}",
        0xc4 => "\u{303}",
        0xc5 => "\u{304}",
        0xc6 => "\u{306}",
        0xc7 => "\u{307}",
        0xc8 => "\u{308}",
        0xca => "\u{30a}",
        0xcb => "\u{327}",
        0xcd => "\u{30b}",
        0xce => "\u{328}",
        0xcf => "\u{30c}",
        0xd0 => "―",
        0xd1 => "¹",
        0xd2 => "®",
        0xd3 => "©",
        0xd4 => "™",
        0xd5 => "♪",
        0xd6 => "¬",
        0xd7 => "¦",
        0xdc => "⅛",
        0xdd => "⅜",
        0xde => "⅝",
        0xdf => "⅞",
        0xe0 => "Ω",
        0xe1 => "Æ",
        0xe2 => "Đ",
        0xe3 => "ª",
        0xe4 => "Ħ",
        0xe6 => "Ĳ",
        0xe7 => "Ŀ",
        0xe8 => "Ł",
        0xe9 => "Ø",
        0xea => "Œ",
        0xeb => "º",
        0xec => "Þ",
        0xed => "Ŧ",
        0xee => "Ŋ",
        0xef => "ŉ",
        0xf0 => "ĸ",
        0xf1 => "æ",
        0xf2 => "đ",
        0xf3 => "ð",
        0xf4 => "ħ",
        0xf5 => "ı",
        0xf6 => "ĳ",
        0xf7 => "ŀ",
        0xf8 => "ł",
        0xf9 => "ø",
        0xfa => "œ",
        0xfb => "ß",
        0xfc => "þ",
        0xfd => "ŧ",
        0xfe => "ŋ",
        0xff => "\u{ad}",
        _ => return None,
    };
    Some(s)
}

const ASCII_CHARS: [&str; 95] = [
    " ", "!", "\"", "#", "$", "%", "&", "'", "(", ")", "*", "+", ",", "-", ".", "/", "0", "1",
    "2", "3", "4", "5", "6", "7", "8", "9", ":", ";", "<", "=", ">", "?", "@", "A", "B", "C",
    "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q", "R", "S", "T", "U",
    "V", "W", "X", "Y", "Z", "[", "\\", "]", "^", "_", "`", "a", "b", "c", "d", "e", "f", "g",
    "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r", "s", "t", "u", "v", "w", "x", "y",
    "z", "{", "|", "}", "~",
];

fn is_latin_diacritic(b: u8) -> bool {
    (0xc1..=0xcf).contains(&b)
}

/// Reverse of [`latin_character`]. Where two bytes share a character the
/// lower one wins.
static LATIN_ENCODING: Lazy<HashMap<char, u8>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for b in (0x20..=0xffu8).rev() {
        if let Some(mut chars) = latin_character(b).map(str::chars) {
            if let (Some(c), None) = (chars.next(), chars.next()) {
                map.insert(c, b);
            }
        }
    }
    map
});

/// Stateful decoder for a character code table.
#[derive(Debug, Default)]
pub struct StlCharacterHandler {
    accent: Option<&'static str>,
}

impl StlCharacterHandler {
    /// Only the Latin table (`00`) is supported.
    pub fn new(character_code_table: &str) -> ParseResult<Self> {
        if character_code_table != CHARACTER_CODE_TABLE_LATIN {
            return Err(ParseError::EncodingError(format!(
                "unsupported STL character code table '{}'",
                character_code_table
            )));
        }
        Ok(Self::default())
    }
}

impl CharacterDecoder for StlCharacterHandler {
    fn decode(&mut self, byte: u8) -> String {
        let Some(value) = latin_character(byte) else {
            return String::new();
        };
        if let Some(accent) = self.accent.take() {
            return format!("{}{}", value, accent).nfc().collect();
        }
        if is_latin_diacritic(byte) {
            self.accent = Some(value);
            return String::new();
        }
        value.to_string()
    }
}

/// Encode text with the Latin table.
///
/// Text is decomposed first so accented letters become a diacritic byte
/// followed by the base letter. Unmappable characters become `?`.
pub fn encode_text(text: &str) -> Vec<u8> {
    let mut out: Vec<u8> = Vec::with_capacity(text.len());
    for c in text.nfd() {
        match LATIN_ENCODING.get(&c) {
            Some(&b) if is_latin_diacritic(b) => match out.pop() {
                Some(base) => out.extend([b, base]),
                None => out.push(b),
            },
            Some(&b) => out.push(b),
            None => out.push(b'?'),
        }
    }
    out
}

/// STL spacing attributes: italics, underline and boxing switches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StlStyler {
    pub boxing: Option<bool>,
    pub italics: Option<bool>,
    pub underline: Option<bool>,
}

impl Styler for StlStyler {
    fn parse_spacing_attribute(&mut self, byte: u8) {
        match byte {
            ITALICS_ON => self.italics = Some(true),
            ITALICS_OFF => self.italics = Some(false),
            UNDERLINE_ON => self.underline = Some(true),
            UNDERLINE_OFF => self.underline = Some(false),
            BOXING_ON => self.boxing = Some(true),
            BOXING_OFF => self.boxing = Some(false),
            _ => {}
        }
    }

    fn has_been_set(&self) -> bool {
        self.italics.is_some() || self.boxing.is_some() || self.underline.is_some()
    }

    fn has_changed(&self, attributes: &StyleAttributes) -> bool {
        self.boxing != attributes.stl.boxing
            || self.italics != attributes.stl.italics
            || self.underline != attributes.stl.underline
    }

    fn update(&self, attributes: &mut StyleAttributes) {
        if self.boxing.is_some() {
            attributes.stl.boxing = self.boxing;
        }
        if self.italics.is_some() {
            attributes.stl.italics = self.italics;
        }
        if self.underline.is_some() {
            attributes.stl.underline = self.underline;
        }
    }

    fn propagate(&self, attributes: &mut StyleAttributes) {
        attributes.propagate_stl();
    }
}

/// Spacing attribute bytes that switch from `from` to `to`.
pub(crate) fn spacing_attributes(from: &StyleAttributes, to: &StyleAttributes) -> Vec<u8> {
    let switch = |old: Option<bool>, new: Option<bool>, on: u8, off: u8| {
        match (old.unwrap_or(false), new.unwrap_or(false)) {
            (false, true) => Some(on),
            (true, false) => Some(off),
            _ => None,
        }
    };
    [
        switch(from.stl.italics, to.stl.italics, ITALICS_ON, ITALICS_OFF),
        switch(from.stl.underline, to.stl.underline, UNDERLINE_ON, UNDERLINE_OFF),
        switch(from.stl.boxing, to.stl.boxing, BOXING_ON, BOXING_OFF),
    ]
    .into_iter()
    .flatten()
    .collect()
}
