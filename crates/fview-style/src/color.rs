#![forbid(unsafe_code)]

//! Color values carried by the color attributes.
//!
//! Colors have a canonical text form used by markup and serialization:
//!
//! | Form | Example |
//! |------|---------|
//! | ANSI 16 name | `red`, `bright-cyan` |
//! | 256-color index | `ansi(208)` |
//! | Truecolor | `#ff8800` |

use std::fmt;
use std::str::FromStr;

/// A 24-bit RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Ansi16Color {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
}

impl Ansi16Color {
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Black => 0,
            Self::Red => 1,
            Self::Green => 2,
            Self::Yellow => 3,
            Self::Blue => 4,
            Self::Magenta => 5,
            Self::Cyan => 6,
            Self::White => 7,
            Self::BrightBlack => 8,
            Self::BrightRed => 9,
            Self::BrightGreen => 10,
            Self::BrightYellow => 11,
            Self::BrightBlue => 12,
            Self::BrightMagenta => 13,
            Self::BrightCyan => 14,
            Self::BrightWhite => 15,
        }
    }

    #[must_use]
    pub const fn rgb(self) -> (u8, u8, u8) {
        match self {
            Self::Black => (0, 0, 0),
            Self::Red => (205, 0, 0),
            Self::Green => (0, 205, 0),
            Self::Yellow => (205, 205, 0),
            Self::Blue => (0, 0, 238),
            Self::Magenta => (205, 0, 205),
            Self::Cyan => (0, 205, 205),
            Self::White => (229, 229, 229),
            Self::BrightBlack => (127, 127, 127),
            Self::BrightRed => (255, 0, 0),
            Self::BrightGreen => (0, 255, 0),
            Self::BrightYellow => (255, 255, 0),
            Self::BrightBlue => (92, 92, 255),
            Self::BrightMagenta => (255, 0, 255),
            Self::BrightCyan => (0, 255, 255),
            Self::BrightWhite => (255, 255, 255),
        }
    }

    /// Canonical lowercase name (`"bright-red"`).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Black => "black",
            Self::Red => "red",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Blue => "blue",
            Self::Magenta => "magenta",
            Self::Cyan => "cyan",
            Self::White => "white",
            Self::BrightBlack => "bright-black",
            Self::BrightRed => "bright-red",
            Self::BrightGreen => "bright-green",
            Self::BrightYellow => "bright-yellow",
            Self::BrightBlue => "bright-blue",
            Self::BrightMagenta => "bright-magenta",
            Self::BrightCyan => "bright-cyan",
            Self::BrightWhite => "bright-white",
        }
    }

    /// Look up a color by name. Accepts `-` or `_` separators, any case.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_ascii_lowercase().replace('_', "-");
        ANSI16_PALETTE
            .into_iter()
            .find(|candidate| candidate.name() == normalized)
    }

    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        if code < 16 {
            Some(ANSI16_PALETTE[code as usize])
        } else {
            None
        }
    }
}

/// A terminal color at any fidelity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Color {
    Ansi16(Ansi16Color),
    Ansi256(u8),
    Rgb(Rgb),
}

impl Color {
    pub const BLACK: Self = Self::Ansi16(Ansi16Color::Black);
    pub const RED: Self = Self::Ansi16(Ansi16Color::Red);
    pub const GREEN: Self = Self::Ansi16(Ansi16Color::Green);
    pub const YELLOW: Self = Self::Ansi16(Ansi16Color::Yellow);
    pub const BLUE: Self = Self::Ansi16(Ansi16Color::Blue);
    pub const MAGENTA: Self = Self::Ansi16(Ansi16Color::Magenta);
    pub const CYAN: Self = Self::Ansi16(Ansi16Color::Cyan);
    pub const WHITE: Self = Self::Ansi16(Ansi16Color::White);

    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::Rgb(Rgb::new(r, g, b))
    }

    /// Approximate 24-bit value, using the xterm palette for indexed colors.
    #[must_use]
    pub const fn to_rgb(self) -> Rgb {
        match self {
            Self::Rgb(rgb) => rgb,
            Self::Ansi16(color) => {
                let (r, g, b) = color.rgb();
                Rgb::new(r, g, b)
            }
            Self::Ansi256(index) => ansi256_to_rgb(index),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ansi16(color) => f.write_str(color.name()),
            Self::Ansi256(index) => write!(f, "ansi({index})"),
            Self::Rgb(Rgb { r, g, b }) => write!(f, "#{r:02x}{g:02x}{b:02x}"),
        }
    }
}

/// Error returned when a color string is not in one of the canonical forms.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color '{value}'")]
pub struct ColorParseError {
    pub value: String,
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let invalid = || ColorParseError {
            value: s.to_string(),
        };

        if let Some(hex) = raw.strip_prefix('#') {
            if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
            return Ok(Self::rgb(channel(0)?, channel(2)?, channel(4)?));
        }

        let lower = raw.to_ascii_lowercase();
        if let Some(index) = lower
            .strip_prefix("ansi(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let index = index.trim();
            if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            return index
                .parse::<u8>()
                .map(Self::Ansi256)
                .map_err(|_| invalid());
        }

        Ansi16Color::from_name(&lower)
            .map(Self::Ansi16)
            .ok_or_else(invalid)
    }
}

impl From<Ansi16Color> for Color {
    fn from(color: Ansi16Color) -> Self {
        Self::Ansi16(color)
    }
}

impl From<Rgb> for Color {
    fn from(rgb: Rgb) -> Self {
        Self::Rgb(rgb)
    }
}

const fn ansi256_to_rgb(index: u8) -> Rgb {
    const LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];
    match index {
        0..=15 => {
            let (r, g, b) = ANSI16_PALETTE[index as usize].rgb();
            Rgb::new(r, g, b)
        }
        16..=231 => {
            let i = index - 16;
            Rgb::new(
                LEVELS[(i / 36) as usize],
                LEVELS[((i / 6) % 6) as usize],
                LEVELS[(i % 6) as usize],
            )
        }
        _ => {
            let level = 8 + (index - 232) * 10;
            Rgb::new(level, level, level)
        }
    }
}

const ANSI16_PALETTE: [Ansi16Color; 16] = [
    Ansi16Color::Black,
    Ansi16Color::Red,
    Ansi16Color::Green,
    Ansi16Color::Yellow,
    Ansi16Color::Blue,
    Ansi16Color::Magenta,
    Ansi16Color::Cyan,
    Ansi16Color::White,
    Ansi16Color::BrightBlack,
    Ansi16Color::BrightRed,
    Ansi16Color::BrightGreen,
    Ansi16Color::BrightYellow,
    Ansi16Color::BrightBlue,
    Ansi16Color::BrightMagenta,
    Ansi16Color::BrightCyan,
    Ansi16Color::BrightWhite,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_codes_are_positional() {
        for (i, color) in ANSI16_PALETTE.iter().enumerate() {
            assert_eq!(usize::from(color.code()), i);
            assert_eq!(Ansi16Color::from_code(color.code()), Some(*color));
        }
        assert_eq!(Ansi16Color::from_code(16), None);
    }

    #[test]
    fn names_resolve_with_loose_spelling() {
        assert_eq!(Ansi16Color::from_name("red"), Some(Ansi16Color::Red));
        assert_eq!(
            Ansi16Color::from_name("Bright_Cyan"),
            Some(Ansi16Color::BrightCyan)
        );
        assert_eq!(Ansi16Color::from_name("mauve"), None);
    }

    #[test]
    fn display_forms() {
        assert_eq!(Color::RED.to_string(), "red");
        assert_eq!(Color::Ansi16(Ansi16Color::BrightBlue).to_string(), "bright-blue");
        assert_eq!(Color::Ansi256(208).to_string(), "ansi(208)");
        assert_eq!(Color::rgb(255, 8, 0).to_string(), "#ff0800");
    }

    #[test]
    fn parse_forms() {
        assert_eq!("red".parse::<Color>(), Ok(Color::RED));
        assert_eq!(" #FF0800 ".parse::<Color>(), Ok(Color::rgb(255, 8, 0)));
        assert_eq!("ANSI(17)".parse::<Color>(), Ok(Color::Ansi256(17)));
    }

    #[test]
    fn parse_rejects_garbage() {
        for bad in [
            "",
            "#fff",
            "#gg0000",
            "#+f0000",
            "#ff-f00",
            "ansi(300)",
            "ansi()",
            "ansi(+5)",
            "rgb(1,2,3)",
            "#ff00é",
        ] {
            let err = bad.parse::<Color>().unwrap_err();
            assert_eq!(err.value, bad);
        }
    }

    #[test]
    fn display_parse_agree() {
        let samples = [
            Color::BLACK,
            Color::Ansi16(Ansi16Color::BrightWhite),
            Color::Ansi256(0),
            Color::Ansi256(255),
            Color::rgb(1, 2, 3),
        ];
        for color in samples {
            assert_eq!(color.to_string().parse::<Color>(), Ok(color));
        }
    }

    #[test]
    fn ansi256_cube_and_grayscale() {
        assert_eq!(Color::Ansi256(16).to_rgb(), Rgb::new(0, 0, 0));
        assert_eq!(Color::Ansi256(196).to_rgb(), Rgb::new(255, 0, 0));
        assert_eq!(Color::Ansi256(21).to_rgb(), Rgb::new(0, 0, 255));
        assert_eq!(Color::Ansi256(232).to_rgb(), Rgb::new(8, 8, 8));
        assert_eq!(Color::Ansi256(255).to_rgb(), Rgb::new(238, 238, 238));
        assert_eq!(Color::Ansi256(1).to_rgb(), Rgb::new(205, 0, 0));
    }
}
