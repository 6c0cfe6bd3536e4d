//! Serde helpers for amounts returned by the indexer API.
//!
//! The API is inconsistent about numeric encoding: stakes and reward
//! amounts arrive sometimes as JSON numbers, sometimes as decimal
//! strings. Deserialize both into `f64`.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Num(f64),
    Str(String),
}

/// Deserializes an amount that may be a JSON number or a decimal string.
pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Num(n) => Ok(n),
        NumberOrString::Str(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| serde::de::Error::custom(format!("invalid amount {:?}: {}", s, e))),
    }
}

/// Same as [`deserialize`] but tolerates a missing or null field,
/// yielding `None`.
pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v: Option<NumberOrString> = Option::deserialize(deserializer)?;
    match v {
        None => Ok(None),
        Some(NumberOrString::Num(n)) => Ok(Some(n)),
        Some(NumberOrString::Str(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("invalid amount {:?}: {}", s, e))),
    }
}

/// Rounds to 2 decimal places. Applied only when formatting reports,
/// never inside calculations.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Holder {
        #[serde(deserialize_with = "super::deserialize")]
        amount: f64,
        #[serde(default, deserialize_with = "super::deserialize_opt")]
        extra: Option<f64>,
    }

    #[test]
    fn amount_from_number() {
        let h: Holder = serde_json::from_str(r#"{"amount": 12.5}"#).unwrap();
        assert_eq!(h.amount, 12.5);
        assert_eq!(h.extra, None);
    }

    #[test]
    fn amount_from_string() {
        let h: Holder = serde_json::from_str(r#"{"amount": "101.25", "extra": "0.5"}"#).unwrap();
        assert_eq!(h.amount, 101.25);
        assert_eq!(h.extra, Some(0.5));
    }

    #[test]
    fn amount_from_garbage_string_fails() {
        let res: Result<Holder, _> = serde_json::from_str(r#"{"amount": "12,5"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn round2_behaviour() {
        assert_eq!(round2(3.14159), 3.14);
        assert_eq!(round2(169.999), 170.0);
        assert_eq!(round2(-2.005), -2.0);
    }
}
