//! Fixed-width rating brackets, a query-time projection of a rating column.

use std::fmt;

use serde::{Serialize, Serializer};

pub const DEFAULT_BRACKET_WIDTH: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RatingBracket {
    /// Missing or non-positive rating.
    Unknown,
    Range { lower: i64, upper: i64 },
}

impl RatingBracket {
    pub fn of(rating: Option<i32>, width: u32) -> Self {
        match rating {
            Some(r) if r > 0 => Self::from_bin(i64::from(r) / i64::from(width), width),
            _ => RatingBracket::Unknown,
        }
    }

    /// Bracket for a bin index as computed in SQL (`rating / width`).
    pub(crate) fn from_bin(bin: i64, width: u32) -> Self {
        let lower = bin * i64::from(width);
        RatingBracket::Range {
            lower,
            upper: lower + i64::from(width) - 1,
        }
    }
}

/// Bracket a rating the same way the SQL aggregation does.
pub fn rating_bracket(rating: Option<i32>, width: u32) -> RatingBracket {
    RatingBracket::of(rating, width)
}

impl fmt::Display for RatingBracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RatingBracket::Unknown => f.write_str("unknown"),
            RatingBracket::Range { lower, upper } => write!(f, "{lower}-{upper}"),
        }
    }
}

impl Serialize for RatingBracket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bracket_labels() {
        assert_eq!(RatingBracket::of(Some(800), 200).to_string(), "800-999");
        assert_eq!(RatingBracket::of(Some(999), 200).to_string(), "800-999");
        assert_eq!(RatingBracket::of(Some(1000), 200).to_string(), "1000-1199");
        assert_eq!(RatingBracket::of(Some(1450), 100).to_string(), "1400-1499");
        assert_eq!(RatingBracket::of(Some(150), 200).to_string(), "0-199");
    }

    #[test]
    fn test_unknown_bracket() {
        assert_eq!(RatingBracket::of(None, 200), RatingBracket::Unknown);
        assert_eq!(RatingBracket::of(Some(0), 200), RatingBracket::Unknown);
        assert_eq!(rating_bracket(Some(-5), 200).to_string(), "unknown");
    }

    #[test]
    fn test_wide_brackets_near_the_rating_limit() {
        let width = i32::MAX as u32 - 1;
        assert_eq!(
            RatingBracket::of(Some(i32::MAX), width),
            RatingBracket::Range {
                lower: 2_147_483_646,
                upper: 4_294_967_291,
            }
        );
        assert_eq!(RatingBracket::of(Some(1500), u32::MAX).to_string(), "0-4294967294");
    }
}
