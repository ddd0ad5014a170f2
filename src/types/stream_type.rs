//! This module defines the canonical, type-safe description of a stream's
//! semantic type and element width, as seen by the routing core.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Widths a numeric stream may use. Numerics are little-endian unsigned or
/// signed integers of one of these byte widths.
pub const NUMERIC_WIDTHS: [usize; 4] = [1, 2, 4, 8];

/// The semantic type of a stream.
///
/// The element width is carried separately (see [`TypeWidth`]) so that one
/// variant covers every width of a fixed-width type.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StreamType {
    /// Opaque bytes. Element width is always 1.
    Serial,
    /// Fixed-width records of an arbitrary byte width.
    Struct,
    /// Fixed-width numbers of width 1, 2, 4 or 8.
    Numeric,
    /// Length-delimited elements: a content buffer plus one length per element.
    /// Width is reported as 0.
    String,
}

impl StreamType {
    /// Returns `true` for types whose elements all share one byte width.
    pub fn is_fixed_width(&self) -> bool {
        matches!(self, Self::Struct | Self::Numeric)
    }

    /// The only width a type can have, for types where the width is implied.
    pub fn implied_width(&self) -> Option<usize> {
        match self {
            Self::Serial => Some(1),
            Self::String => Some(0),
            Self::Struct | Self::Numeric => None,
        }
    }

    /// Checks that `width` is a legal element width for this type.
    pub fn check_width(&self, width: usize) -> Result<(), String> {
        match self {
            Self::Serial | Self::String => {
                let implied = self.implied_width().unwrap_or(width);
                if width != implied {
                    return Err(format!("{} streams must have width {}, got {}", self, implied, width));
                }
                Ok(())
            }
            Self::Numeric => {
                if !NUMERIC_WIDTHS.contains(&width) {
                    return Err(format!(
                        "Numeric width must be one of {:?}, got {}",
                        NUMERIC_WIDTHS, width
                    ));
                }
                Ok(())
            }
            Self::Struct => {
                if width == 0 {
                    return Err("Struct width must be at least 1".to_string());
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A stream type paired with its element width.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeWidth {
    pub stream_type: StreamType,
    pub width: usize,
}

impl fmt::Display for TypeWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.stream_type.is_fixed_width() {
            write!(f, "{}({})", self.stream_type, self.width)
        } else {
            write!(f, "{}", self.stream_type)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_rules_per_type() {
        assert!(StreamType::Serial.check_width(1).is_ok());
        assert!(StreamType::Serial.check_width(4).is_err());
        assert!(StreamType::String.check_width(0).is_ok());
        assert!(StreamType::String.check_width(1).is_err());
        for w in NUMERIC_WIDTHS {
            assert!(StreamType::Numeric.check_width(w).is_ok());
        }
        assert!(StreamType::Numeric.check_width(3).is_err());
        assert!(StreamType::Struct.check_width(3).is_ok());
        assert!(StreamType::Struct.check_width(0).is_err());
    }

    #[test]
    fn test_serde_names_are_snake_case() {
        let json = serde_json::to_string(&StreamType::Numeric).unwrap();
        assert_eq!(json, "\"numeric\"");
        let back: StreamType = serde_json::from_str("\"string\"").unwrap();
        assert_eq!(back, StreamType::String);
    }

    #[test]
    fn test_type_width_display() {
        let tw = TypeWidth { stream_type: StreamType::Numeric, width: 4 };
        assert_eq!(tw.to_string(), "Numeric(4)");
        let tw = TypeWidth { stream_type: StreamType::Serial, width: 1 };
        assert_eq!(tw.to_string(), "Serial");
    }
}
