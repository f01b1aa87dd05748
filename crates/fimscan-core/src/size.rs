//! Human-readable byte sizes ("100 MiB", "50MB", "4096").

use crate::error::ScanError;

const UNITS: &[(&str, u64)] = &[
    ("", 1),
    ("b", 1),
    ("k", 1000),
    ("kb", 1000),
    ("ki", 1 << 10),
    ("kib", 1 << 10),
    ("m", 1000 * 1000),
    ("mb", 1000 * 1000),
    ("mi", 1 << 20),
    ("mib", 1 << 20),
    ("g", 1000 * 1000 * 1000),
    ("gb", 1000 * 1000 * 1000),
    ("gi", 1 << 30),
    ("gib", 1 << 30),
    ("t", 1000 * 1000 * 1000 * 1000),
    ("tb", 1000 * 1000 * 1000 * 1000),
    ("ti", 1 << 40),
    ("tib", 1 << 40),
];

/// Parse a byte size such as `"100 MiB"`, `"1.5GB"` or `"4096"`.
///
/// SI suffixes (`KB`, `MB`, ...) are powers of 1000, IEC suffixes
/// (`KiB`, `MiB`, ...) are powers of 1024. Matching is case-insensitive.
pub fn parse_size(input: &str) -> Result<u64, ScanError> {
    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);

    let invalid = |message: &str| ScanError::InvalidSize {
        input: input.to_string(),
        message: message.to_string(),
    };

    if number.is_empty() {
        return Err(invalid("missing number"));
    }
    let value: f64 = number.parse().map_err(|_| invalid("malformed number"))?;

    let unit = unit.trim().to_ascii_lowercase();
    let multiplier = UNITS
        .iter()
        .find(|(suffix, _)| *suffix == unit)
        .map(|(_, m)| *m)
        .ok_or_else(|| invalid("unknown unit"))?;

    let bytes = value * multiplier as f64;
    if bytes > u64::MAX as f64 {
        return Err(invalid("size overflows 64 bits"));
    }
    Ok(bytes as u64)
}

/// Serde adapter for byte sizes given either as integers or strings.
pub mod serde_size {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::SizeRepr;

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(*value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        SizeRepr::deserialize(deserializer)?.into_bytes()
    }
}

/// Serde adapter for optional byte sizes.
pub mod serde_size_opt {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::SizeRepr;

    pub fn serialize<S: Serializer>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_some(v),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u64>, D::Error> {
        Option::<SizeRepr>::deserialize(deserializer)?
            .map(SizeRepr::into_bytes)
            .transpose()
    }
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum SizeRepr {
    Bytes(u64),
    Text(String),
}

impl SizeRepr {
    fn into_bytes<E: serde::de::Error>(self) -> Result<u64, E> {
        match self {
            SizeRepr::Bytes(n) => Ok(n),
            SizeRepr::Text(s) => parse_size(&s).map_err(E::custom),
        }
    }
}
