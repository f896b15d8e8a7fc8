//! SI magnitude-suffix parsing.
//!
//! Converts shorthand such as `4.7u`, `65k`, `1.5mH` or `2M` into plain SI
//! values before they enter the pipeline. Suffixes are case-sensitive:
//! `m` is milli and `M` is mega. Trailing unit letters after the multiplier
//! (`F`, `H`, `Hz`, `V`, ...) are accepted and ignored.

use crate::error::{Error, Result};

/// Multiplier for a magnitude suffix character.
fn multiplier(c: char) -> Option<f64> {
    match c {
        'p' => Some(1e-12),
        'n' => Some(1e-9),
        'u' | 'µ' | 'μ' => Some(1e-6),
        'm' => Some(1e-3),
        'k' | 'K' => Some(1e3),
        'M' => Some(1e6),
        'G' => Some(1e9),
        _ => None,
    }
}

/// Length of the leading numeric part of `text` (sign, mantissa, exponent).
fn numeric_prefix_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut i = 0;
    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }
    while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
        i += 1;
    }
    // Exponent only counts if digits follow it
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let digits_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > digits_start {
            i = j;
        }
    }
    i
}

/// Parse a value with an optional SI magnitude suffix.
pub fn parse_value(text: &str) -> Result<f64> {
    let trimmed = text.trim();
    let split = numeric_prefix_len(trimmed);
    let (number, suffix) = trimmed.split_at(split);

    let mantissa: f64 = number.parse().map_err(|_| Error::InvalidValue {
        text: text.to_string(),
        reason: "expected a number".to_string(),
    })?;

    let mut chars = suffix.chars();
    let scale = match chars.next() {
        None => 1.0,
        Some(c) => {
            let scale = match multiplier(c) {
                Some(scale) => scale,
                None if c.is_alphabetic() => 1.0,
                None => {
                    return Err(Error::InvalidValue {
                        text: text.to_string(),
                        reason: format!("unexpected character '{}'", c),
                    });
                }
            };
            if !suffix.chars().all(char::is_alphabetic) {
                return Err(Error::InvalidValue {
                    text: text.to_string(),
                    reason: format!("unexpected suffix '{}'", suffix),
                });
            }
            scale
        }
    };

    Ok(mantissa * scale)
}

/// Serde adapter accepting either a JSON number or an SI-suffixed string.
///
/// ```ignore
/// #[serde(deserialize_with = "flyback_core::units::si::deserialize")]
/// pub freq_switch: f64,
/// ```
pub mod si {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    fn resolve<E: serde::de::Error>(raw: Raw) -> Result<f64, E> {
        match raw {
            Raw::Number(v) => Ok(v),
            Raw::Text(s) => super::parse_value(&s).map_err(E::custom),
        }
    }

    /// Deserialize a scalar.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        resolve(Raw::deserialize(deserializer)?)
    }

    /// Deserialize an optional scalar.
    pub fn deserialize_option<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<f64>, D::Error> {
        match Option::<Raw>::deserialize(deserializer)? {
            Some(raw) => resolve(raw).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-12 * b.abs().max(1.0)
    }

    #[test]
    fn test_plain_numbers() {
        assert!(approx(parse_value("42").unwrap(), 42.0));
        assert!(approx(parse_value("-1.5").unwrap(), -1.5));
        assert!(approx(parse_value("2.2e-6").unwrap(), 2.2e-6));
        assert!(approx(parse_value(" 10 ").unwrap(), 10.0));
    }

    #[test]
    fn test_suffixes() {
        assert!(approx(parse_value("4.7u").unwrap(), 4.7e-6));
        assert!(approx(parse_value("4.7µ").unwrap(), 4.7e-6));
        assert!(approx(parse_value("100n").unwrap(), 100e-9));
        assert!(approx(parse_value("33p").unwrap(), 33e-12));
        assert!(approx(parse_value("1.5m").unwrap(), 1.5e-3));
        assert!(approx(parse_value("65k").unwrap(), 65e3));
        assert!(approx(parse_value("4.7K").unwrap(), 4.7e3));
        assert!(approx(parse_value("2M").unwrap(), 2e6));
    }

    #[test]
    fn test_trailing_units() {
        assert!(approx(parse_value("1.5mH").unwrap(), 1.5e-3));
        assert!(approx(parse_value("65kHz").unwrap(), 65e3));
        assert!(approx(parse_value("10MHz").unwrap(), 10e6));
        assert!(approx(parse_value("230V").unwrap(), 230.0));
        assert!(approx(parse_value("1e3Hz").unwrap(), 1e3));
    }

    #[test]
    fn test_invalid_values() {
        assert!(parse_value("").is_err());
        assert!(parse_value("abc").is_err());
        assert!(parse_value("1k5").is_err());
        assert!(parse_value("3.3%").is_err());
    }
}
