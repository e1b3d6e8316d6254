//! Pixel dimensions in the `"<width>x<height>"` wire format.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// Width and height in pixels, both strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    /// Create a size, rejecting zero dimensions.
    pub fn new(width: u32, height: u32) -> Result<Self, Error> {
        if width == 0 || height == 0 {
            return Err(Error::config(format!(
                "size must be positive, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }
}

impl FromStr for Size {
    type Err = Error;

    /// Parse strictly `digits x digits`. No whitespace, signs or uppercase `X`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::config(format!("invalid size string: {s:?}"));

        let (w, h) = s.split_once('x').ok_or_else(invalid)?;
        if !is_digits(w) || !is_digits(h) {
            return Err(invalid());
        }

        let width = w.parse::<u32>().map_err(|_| invalid())?;
        let height = h.parse::<u32>().map_err(|_| invalid())?;
        Self::new(width, height)
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl Serialize for Size {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Size {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_parse_portrait() {
        let size: Size = "720x1280".parse().unwrap();
        assert_eq!(size.width, 720);
        assert_eq!(size.height, 1280);
        assert_eq!(size.to_string(), "720x1280");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in [
            "720", "720xABC", "x1280", "720x", "720X1280", " 720x1280", "720x1280 ", "-720x1280",
            "720x12x80", "7.5x10", "",
        ] {
            let err = bad.parse::<Size>().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Config, "input {bad:?}");
        }
    }

    #[test]
    fn test_parse_rejects_zero() {
        assert!("0x1280".parse::<Size>().is_err());
        assert!("720x0".parse::<Size>().is_err());
    }

    #[test]
    fn test_parse_rejects_overflow() {
        assert!("99999999999x10".parse::<Size>().is_err());
    }
}
