use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize, de};

use crate::error::LottoError;

pub const MIN_BALL: u8 = 1;
pub const MAX_BALL: u8 = 45;

/// Sequential identifier of a draw. Round 1 is the first draw ever held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DrawNo(u32);

impl DrawNo {
    pub fn new(value: u32) -> Result<Self, LottoError> {
        if value == 0 {
            return Err(LottoError::InvalidDrawNo(value.to_string()));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Round following `latest`, where 0 means the dataset holds nothing yet.
    pub fn after(latest: u32) -> Self {
        Self(latest.saturating_add(1))
    }
}

impl fmt::Display for DrawNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DrawNo {
    type Err = LottoError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parsed = value
            .trim()
            .parse::<u32>()
            .map_err(|_| LottoError::InvalidDrawNo(value.to_string()))?;
        Self::new(parsed).map_err(|_| LottoError::InvalidDrawNo(value.to_string()))
    }
}

/// One row of the dataset. Field order matches the CSV header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawRecord {
    #[serde(deserialize_with = "lenient_int")]
    pub year: i32,
    #[serde(rename = "drawNo", deserialize_with = "lenient_int")]
    pub draw_no: u32,
    pub date: String,
    #[serde(deserialize_with = "lenient_int")]
    pub n1: u8,
    #[serde(deserialize_with = "lenient_int")]
    pub n2: u8,
    #[serde(deserialize_with = "lenient_int")]
    pub n3: u8,
    #[serde(deserialize_with = "lenient_int")]
    pub n4: u8,
    #[serde(deserialize_with = "lenient_int")]
    pub n5: u8,
    #[serde(deserialize_with = "lenient_int")]
    pub n6: u8,
    #[serde(deserialize_with = "lenient_int")]
    pub bonus: u8,
}

impl DrawRecord {
    pub fn numbers(&self) -> [u8; 6] {
        [self.n1, self.n2, self.n3, self.n4, self.n5, self.n6]
    }
}

impl fmt::Display for DrawRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let numbers = self
            .numbers()
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "round {} ({}): {} + {}",
            self.draw_no, self.date, numbers, self.bonus
        )
    }
}

/// Parses an integer written either plainly or as an integral float (`1100.0`).
pub fn parse_int(text: &str) -> Option<i64> {
    let text = text.trim();
    text.parse::<i64>().ok().or_else(|| {
        text.parse::<f64>()
            .ok()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

fn lenient_int<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    let text = String::deserialize(deserializer)?;
    parse_int(&text)
        .and_then(|value| T::try_from(value).ok())
        .ok_or_else(|| de::Error::custom(format!("not an integer in range: {text:?}")))
}

pub fn is_valid_ball(value: i64) -> bool {
    (i64::from(MIN_BALL)..=i64::from(MAX_BALL)).contains(&value)
}

/// How the process reports "the next round is not out yet" to its scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExitPolicy {
    /// Exit 1 so the scheduler runs us again.
    #[default]
    Retry,
    /// Exit 0; nothing to do is not a failure.
    Quiet,
}

impl fmt::Display for ExitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitPolicy::Retry => write!(f, "retry"),
            ExitPolicy::Quiet => write!(f, "quiet"),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_draw_no_valid() {
        let round: DrawNo = " 1101 ".parse().unwrap();
        assert_eq!(round.get(), 1101);
        assert_eq!(round.next().get(), 1102);
    }

    #[test]
    fn parse_draw_no_rejects_zero_and_garbage() {
        assert_matches!("0".parse::<DrawNo>(), Err(LottoError::InvalidDrawNo(_)));
        assert_matches!("-3".parse::<DrawNo>(), Err(LottoError::InvalidDrawNo(_)));
        assert_matches!("abc".parse::<DrawNo>(), Err(LottoError::InvalidDrawNo(_)));
    }

    #[test]
    fn after_empty_dataset_is_round_one() {
        assert_eq!(DrawNo::after(0).get(), 1);
        assert_eq!(DrawNo::after(1100).get(), 1101);
    }

    #[test]
    fn parse_int_accepts_integral_floats() {
        assert_eq!(parse_int("1100"), Some(1100));
        assert_eq!(parse_int(" 1100.0 "), Some(1100));
        assert_eq!(parse_int("7.5"), None);
        assert_eq!(parse_int("NaN"), None);
        assert_eq!(parse_int(""), None);
    }

    #[test]
    fn ball_range() {
        assert!(is_valid_ball(1));
        assert!(is_valid_ball(45));
        assert!(!is_valid_ball(0));
        assert!(!is_valid_ball(46));
    }
}
