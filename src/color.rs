//! Hex color strings as stored in config documents
//!
//! Accepts `RGB` or `RRGGBB`, optionally prefixed with a single `#`.
//! Always formats as lowercase `#rrggbb`.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl HexColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn parse(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        match digits.len() {
            3 => {
                // Shorthand: each digit is doubled, so "f80" is "ff8800"
                let channel = |i: usize| u8::from_str_radix(&digits[i..=i], 16).ok().map(|v| v * 17);
                Some(Self::new(channel(0)?, channel(1)?, channel(2)?))
            }
            6 => {
                let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
                Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
            }
            _ => None,
        }
    }

    pub fn is_valid(hex: &str) -> bool {
        Self::parse(hex).is_some()
    }

    pub fn rgb(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    pub fn to_hex_string(self) -> String {
        self.to_string()
    }
}

impl From<[u8; 3]> for HexColor {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::new(r, g, b)
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_six_digit() {
        assert_eq!(HexColor::parse("#ff8000"), Some(HexColor::new(255, 128, 0)));
        assert_eq!(HexColor::parse("FF8000"), Some(HexColor::new(255, 128, 0)));
    }

    #[test]
    fn test_parse_three_digit_shorthand() {
        assert_eq!(HexColor::parse("#f80"), Some(HexColor::new(255, 136, 0)));
        assert_eq!(HexColor::parse("000"), Some(HexColor::new(0, 0, 0)));
    }

    #[test]
    fn test_parse_rejects_other_shapes() {
        for bad in ["", "#", "##fff", "#ffff", "#ff00ff00", "red", "#gg0000", "+fff"] {
            assert!(HexColor::parse(bad).is_none(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_format_is_lowercase_long_form() {
        assert_eq!(HexColor::parse("#ABC").unwrap().to_hex_string(), "#aabbcc");
        assert_eq!(HexColor::from([1, 2, 255]).to_string(), "#0102ff");
    }
}
