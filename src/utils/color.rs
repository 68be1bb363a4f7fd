//! Hex colour parsing for canvas fill colours

use crate::error::{BgError, Result};
use image::Rgb;

/// Utility for parsing and formatting `#RRGGBB` / `#RGB` colours
pub struct ColorParser;

impl ColorParser {
    /// Parse a hex color string
    ///
    /// Supports both #RRGGBB and #RGB formats, with or without the `#` prefix.
    ///
    /// # Examples
    /// ```rust
    /// use backdrop::utils::ColorParser;
    ///
    /// let black = ColorParser::parse_hex("#000000")?;
    /// let red = ColorParser::parse_hex("f00")?;
    /// assert_eq!(red.0, [255, 0, 0]);
    /// # Ok::<(), backdrop::BgError>(())
    /// ```
    pub fn parse_hex(hex: &str) -> Result<Rgb<u8>> {
        if !Self::is_valid_hex(hex) {
            return Err(BgError::invalid_config(format!(
                "Color '{}' must be in #RRGGBB or #RGB format",
                hex
            )));
        }

        let digits = hex.trim_start_matches('#');
        let component = |range: std::ops::Range<usize>| -> Result<u8> {
            let part = digits
                .get(range)
                .ok_or_else(|| BgError::invalid_config("Truncated hex color"))?;
            u8::from_str_radix(part, 16)
                .map_err(|_| BgError::invalid_config(format!("Invalid component in hex color '{}'", hex)))
        };

        if digits.len() == 6 {
            Ok(Rgb([component(0..2)?, component(2..4)?, component(4..6)?]))
        } else {
            // #RGB expands each digit: f -> ff
            Ok(Rgb([
                component(0..1)? * 17,
                component(1..2)? * 17,
                component(2..3)? * 17,
            ]))
        }
    }

    /// Format a colour as lowercase `#rrggbb`
    #[must_use]
    pub fn to_hex(color: Rgb<u8>) -> String {
        let [r, g, b] = color.0;
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }

    /// Validate hex color format without parsing
    #[must_use]
    pub fn is_valid_hex(hex: &str) -> bool {
        let hex = hex.trim_start_matches('#');

        if hex.len() != 3 && hex.len() != 6 {
            return false;
        }

        hex.chars().all(|c| c.is_ascii_hexdigit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6_digit() {
        assert_eq!(ColorParser::parse_hex("#ffffff").unwrap().0, [255, 255, 255]);
        assert_eq!(ColorParser::parse_hex("#000000").unwrap().0, [0, 0, 0]);
        assert_eq!(ColorParser::parse_hex("#ff8000").unwrap().0, [255, 128, 0]);
    }

    #[test]
    fn test_parse_hex_3_digit() {
        assert_eq!(ColorParser::parse_hex("#fff").unwrap().0, [255, 255, 255]);
        assert_eq!(ColorParser::parse_hex("0f0").unwrap().0, [0, 255, 0]);
    }

    #[test]
    fn test_parse_hex_invalid() {
        assert!(ColorParser::parse_hex("#gggggg").is_err());
        assert!(ColorParser::parse_hex("#ff").is_err());
        assert!(ColorParser::parse_hex("#fffffff").is_err());
        assert!(ColorParser::parse_hex("#ééé").is_err());
    }

    #[test]
    fn test_to_hex() {
        assert_eq!(ColorParser::to_hex(Rgb([255, 128, 0])), "#ff8000");
        let parsed = ColorParser::parse_hex(&ColorParser::to_hex(Rgb([1, 2, 3]))).unwrap();
        assert_eq!(parsed.0, [1, 2, 3]);
    }
}
