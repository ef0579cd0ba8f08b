//! Settings struct with TOML-based sections.
//!
//! Each codec gets its own table so it can be updated independently.

use serde::{Deserialize, Serialize};

use crate::logging::LogConfig;
use crate::subtitles::{ReadOptions, WriteOptions};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LogConfig,

    #[serde(default)]
    pub srt: SrtSettings,

    #[serde(default)]
    pub ssa: SsaSettings,

    #[serde(default)]
    pub stl: StlSettings,

    #[serde(default)]
    pub ttml: TtmlSettings,

    #[serde(default)]
    pub webvtt: WebVttSettings,
}

impl Settings {
    /// Options passed to the readers.
    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            stl_ignore_timecode_start_of_programme: self.stl.ignore_timecode_start_of_programme,
        }
    }

    /// Options passed to the writers.
    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            srt_write_bom: self.srt.write_bom,
            ssa_float_precision: self.ssa.float_precision,
            stl_default_framerate: self.stl.default_framerate,
            stl_default_country: self.stl.default_country.clone(),
            ttml_indent: self.ttml.indent,
            webvtt_write_source_index: self.webvtt.write_source_index,
        }
    }
}

/// SRT writer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SrtSettings {
    /// Prefix output with a UTF-8 byte order mark.
    #[serde(default = "default_true")]
    pub write_bom: bool,
}

impl Default for SrtSettings {
    fn default() -> Self {
        Self {
            write_bom: default_true(),
        }
    }
}

/// SSA/ASS writer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SsaSettings {
    /// Decimal places used for float style fields (font size, outline...).
    #[serde(default = "default_float_precision")]
    pub float_precision: usize,
}

fn default_float_precision() -> usize {
    3
}

impl Default for SsaSettings {
    fn default() -> Self {
        Self {
            float_precision: default_float_precision(),
        }
    }
}

/// EBU STL settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StlSettings {
    /// Keep raw TTI timecodes instead of subtracting the GSI
    /// start-of-programme timecode.
    #[serde(default)]
    pub ignore_timecode_start_of_programme: bool,

    /// Frame rate written when the document has none.
    #[serde(default = "default_framerate")]
    pub default_framerate: u32,

    /// Country of origin written when the document has none.
    #[serde(default = "default_country")]
    pub default_country: String,
}

fn default_framerate() -> u32 {
    25
}

fn default_country() -> String {
    "FRA".to_string()
}

impl Default for StlSettings {
    fn default() -> Self {
        Self {
            ignore_timecode_start_of_programme: false,
            default_framerate: default_framerate(),
            default_country: default_country(),
        }
    }
}

/// TTML writer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtmlSettings {
    /// Spaces per indentation level.
    #[serde(default = "default_indent")]
    pub indent: usize,
}

fn default_indent() -> usize {
    4
}

impl Default for TtmlSettings {
    fn default() -> Self {
        Self {
            indent: default_indent(),
        }
    }
}

/// WebVTT writer settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebVttSettings {
    /// Number cues with their source index instead of 1..n.
    #[serde(default)]
    pub write_source_index: bool,
}

fn default_true() -> bool {
    true
}

/// Config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Logging,
    Srt,
    Ssa,
    Stl,
    Ttml,
    Webvtt,
}

impl ConfigSection {
    /// All sections, in file order.
    pub const ALL: [ConfigSection; 6] = [
        ConfigSection::Logging,
        ConfigSection::Srt,
        ConfigSection::Ssa,
        ConfigSection::Stl,
        ConfigSection::Ttml,
        ConfigSection::Webvtt,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Logging => "logging",
            ConfigSection::Srt => "srt",
            ConfigSection::Ssa => "ssa",
            ConfigSection::Stl => "stl",
            ConfigSection::Ttml => "ttml",
            ConfigSection::Webvtt => "webvtt",
        }
    }

    /// Comment written above the table.
    pub fn description(&self) -> &'static str {
        match self {
            ConfigSection::Logging => "Logging configuration",
            ConfigSection::Srt => "SubRip output",
            ConfigSection::Ssa => "SubStation Alpha output",
            ConfigSection::Stl => "EBU STL input/output",
            ConfigSection::Ttml => "TTML output",
            ConfigSection::Webvtt => "WebVTT output",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_serializes() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        assert!(toml.contains("[logging]"));
        assert!(toml.contains("[stl]"));
        assert!(toml.contains("default_framerate = 25"));
    }

    #[test]
    fn settings_round_trip() {
        let mut settings = Settings::default();
        settings.ttml.indent = 2;
        let toml = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let minimal = "[stl]\nignore_timecode_start_of_programme = true";
        let parsed: Settings = toml::from_str(minimal).unwrap();
        assert!(parsed.stl.ignore_timecode_start_of_programme);
        assert_eq!(parsed.stl.default_country, "FRA");
        assert!(parsed.srt.write_bom);
    }

    #[test]
    fn options_reflect_settings() {
        let mut settings = Settings::default();
        settings.webvtt.write_source_index = true;
        settings.stl.ignore_timecode_start_of_programme = true;

        assert!(settings.write_options().webvtt_write_source_index);
        assert_eq!(settings.write_options().ssa_float_precision, 3);
        assert!(settings.read_options().stl_ignore_timecode_start_of_programme);
    }
}
