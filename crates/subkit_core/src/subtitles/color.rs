//! RGBA colour value shared by every format.

use std::fmt;

use super::error::{ParseError, ParseResult};

/// An RGBA colour. SSA stores alpha as transparency (0 = opaque).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub alpha: u8,
    pub blue: u8,
    pub green: u8,
    pub red: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const CYAN: Color = Color::rgb(0, 255, 255);
    pub const GRAY: Color = Color::rgb(128, 128, 128);
    pub const GREEN: Color = Color::rgb(0, 128, 0);
    pub const LIME: Color = Color::rgb(0, 255, 0);
    pub const MAGENTA: Color = Color::rgb(255, 0, 255);
    pub const MAROON: Color = Color::rgb(128, 0, 0);
    pub const NAVY: Color = Color::rgb(0, 0, 128);
    pub const OLIVE: Color = Color::rgb(128, 128, 0);
    pub const PURPLE: Color = Color::rgb(128, 0, 128);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const SILVER: Color = Color::rgb(192, 192, 192);
    pub const TEAL: Color = Color::rgb(0, 128, 128);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    /// Opaque colour from its components.
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self {
            alpha: 0,
            blue,
            green,
            red,
        }
    }

    /// Unpack an `AABBGGRR` integer.
    pub fn from_abgr(value: u32) -> Self {
        Self {
            alpha: (value >> 24) as u8,
            blue: (value >> 16) as u8,
            green: (value >> 8) as u8,
            red: value as u8,
        }
    }

    /// Pack as `AABBGGRR`.
    pub fn to_abgr(&self) -> u32 {
        u32::from(self.alpha) << 24
            | u32::from(self.blue) << 16
            | u32::from(self.green) << 8
            | u32::from(self.red)
    }

    /// Parse an SSA colour: `&HAABBGGRR` (hex, trailing `&` tolerated) or a
    /// signed decimal.
    pub fn from_ssa_str(input: &str) -> ParseResult<Self> {
        let trimmed = input.trim();
        let value = match trimmed
            .strip_prefix("&H")
            .or_else(|| trimmed.strip_prefix("&h"))
        {
            Some(hex) => i64::from_str_radix(hex.trim_end_matches('&'), 16),
            None => trimmed.parse::<i64>(),
        }
        .map_err(|_| ParseError::InvalidColor(input.to_string()))?;
        Ok(Self::from_abgr(value as u32))
    }

    /// `AABBGGRR` as eight lowercase hex digits.
    pub fn ssa_string(&self) -> String {
        format!("{:08x}", self.to_abgr())
    }

    /// `RRGGBB` as six lowercase hex digits.
    pub fn ttml_string(&self) -> String {
        format!(
            "{:06x}",
            u32::from(self.red) << 16 | u32::from(self.green) << 8 | u32::from(self.blue)
        )
    }

    /// `#RRGGBB`.
    pub fn html_string(&self) -> String {
        format!("#{}", self.ttml_string())
    }

    /// Look up one of the sixteen named web colours.
    pub fn from_name(name: &str) -> Option<Self> {
        let color = match name.to_ascii_lowercase().as_str() {
            "black" => Self::BLACK,
            "blue" => Self::BLUE,
            "cyan" => Self::CYAN,
            "gray" => Self::GRAY,
            "green" => Self::GREEN,
            "lime" => Self::LIME,
            "magenta" => Self::MAGENTA,
            "maroon" => Self::MAROON,
            "navy" => Self::NAVY,
            "olive" => Self::OLIVE,
            "purple" => Self::PURPLE,
            "red" => Self::RED,
            "silver" => Self::SILVER,
            "teal" => Self::TEAL,
            "yellow" => Self::YELLOW,
            "white" => Self::WHITE,
            _ => return None,
        };
        Some(color)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.html_string())
    }
}

/// WebVTT class name for the caption colours broadcasters use
/// (narrator, out of vision, noises, song, foreign speech).
pub fn css_class_for(rgb: &str) -> Option<&'static str> {
    match rgb.to_ascii_lowercase().as_str() {
        "#00ffff" => Some("cyan"),
        "#ffff00" => Some("yellow"),
        "#ff0000" => Some("red"),
        "#ff00ff" => Some("magenta"),
        "#00ff00" => Some("lime"),
        _ => None,
    }
}
