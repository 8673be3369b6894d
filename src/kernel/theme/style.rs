use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn from_hex(hex: u32) -> Self {
        Self::new((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Parses `#RGB`, `#RGBA`, `#RRGGBB` or `#RRGGBBAA`. Alpha is accepted and dropped.
pub fn parse_color(value: &str) -> Option<Rgb> {
    let hex = value.trim().strip_prefix('#')?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 | 4 => {
            let expand = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
            Some(Rgb::new(expand(0)?, expand(1)?, expand(2)?))
        }
        6 | 8 => Some(Rgb::new(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        )),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FontStyle(u8);

impl FontStyle {
    pub const NONE: Self = Self(0);
    pub const ITALIC: Self = Self(1);
    pub const BOLD: Self = Self(1 << 1);
    pub const UNDERLINE: Self = Self(1 << 2);
    pub const STRIKETHROUGH: Self = Self(1 << 3);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Parses a TextMate `fontStyle` value such as `"italic bold"`. Unknown words are ignored;
    /// an empty string explicitly clears the style.
    pub fn parse(value: &str) -> Self {
        value
            .split_whitespace()
            .fold(Self::NONE, |acc, word| match word {
                "italic" => acc | Self::ITALIC,
                "bold" => acc | Self::BOLD,
                "underline" => acc | Self::UNDERLINE,
                "strikethrough" => acc | Self::STRIKETHROUGH,
                _ => acc,
            })
    }
}

impl BitOr for FontStyle {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Attributes a theme rule sets; unset attributes fall back to the theme defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StyleSpec {
    pub foreground: Option<Rgb>,
    pub background: Option<Rgb>,
    pub font_style: Option<FontStyle>,
}

impl StyleSpec {
    pub fn foreground(color: Rgb) -> Self {
        Self {
            foreground: Some(color),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Style {
    pub foreground: Rgb,
    pub background: Rgb,
    pub font_style: FontStyle,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            foreground: Rgb::from_hex(0xD4D4D4),
            background: Rgb::from_hex(0x1E1E1E),
            font_style: FontStyle::NONE,
        }
    }
}

impl Style {
    pub fn apply(self, spec: &StyleSpec) -> Self {
        Self {
            foreground: spec.foreground.unwrap_or(self.foreground),
            background: spec.background.unwrap_or(self.background),
            font_style: spec.font_style.unwrap_or(self.font_style),
        }
    }
}
