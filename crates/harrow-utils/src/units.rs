//! Byte quantities with `K`/`M`/`G`/`T` suffixes.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitsError {
    #[error("Invalid bytes quantity '{0}'")]
    Invalid(String),

    #[error("Bytes quantity '{0}' is too large")]
    Overflow(String),
}

/// A byte count parsed from human notation (`512`, `64K`, `1.5G`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Bytes(pub u64);

impl Bytes {
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl FromStr for Bytes {
    type Err = UnitsError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(UnitsError::Invalid(raw.to_string()));
        }

        let (number, multiplier) = match text.chars().last() {
            Some(c) if c.is_ascii_alphabetic() => {
                let multiplier: u64 = match c.to_ascii_uppercase() {
                    'K' => 1 << 10,
                    'M' => 1 << 20,
                    'G' => 1 << 30,
                    'T' => 1 << 40,
                    _ => return Err(UnitsError::Invalid(raw.to_string())),
                };
                (&text[..text.len() - 1], multiplier)
            }
            _ => (text, 1),
        };

        if number.is_empty() || number.starts_with('-') || number.starts_with('+') {
            return Err(UnitsError::Invalid(raw.to_string()));
        }

        if let Ok(whole) = number.parse::<u64>() {
            return whole
                .checked_mul(multiplier)
                .map(Bytes)
                .ok_or_else(|| UnitsError::Overflow(raw.to_string()));
        }

        let fractional: f64 = number
            .parse()
            .map_err(|_| UnitsError::Invalid(raw.to_string()))?;
        let scaled = fractional * multiplier as f64;
        if !scaled.is_finite() || scaled >= u64::MAX as f64 {
            return Err(UnitsError::Overflow(raw.to_string()));
        }
        Ok(Bytes(scaled as u64))
    }
}

impl fmt::Display for Bytes {
    /// Formats the exact count so the value parses back unchanged.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_plain_and_suffixed() {
        assert_eq!("0".parse::<Bytes>().unwrap(), Bytes(0));
        assert_eq!("512".parse::<Bytes>().unwrap(), Bytes(512));
        assert_eq!("1k".parse::<Bytes>().unwrap(), Bytes(1024));
        assert_eq!("64K".parse::<Bytes>().unwrap(), Bytes(65536));
        assert_eq!("2M".parse::<Bytes>().unwrap(), Bytes(2 * 1024 * 1024));
        assert_eq!("1.5G".parse::<Bytes>().unwrap(), Bytes(1_610_612_736));
        assert_eq!("1T".parse::<Bytes>().unwrap(), Bytes(1 << 40));
    }

    #[test]
    fn test_rejects_garbage() {
        for bad in ["", "K", "12X", "-5", "abc", "1.2.3M"] {
            assert!(bad.parse::<Bytes>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_overflow() {
        assert!(matches!(
            "99999999999999999T".parse::<Bytes>(),
            Err(UnitsError::Overflow(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_display_parses_back(value in any::<u64>()) {
            let bytes = Bytes(value);
            prop_assert_eq!(bytes.to_string().parse::<Bytes>().unwrap(), bytes);
        }
    }
}
