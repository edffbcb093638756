use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const TICKER_LEN: usize = 6;
const INDEX_CODE_LEN: usize = 4;

/// Normalized KRX short code (e.g. `005930`, `0001A0`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(String);

impl Ticker {
    /// Parse and normalize a ticker to uppercase.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyTicker);
        }

        let normalized = trimmed.to_ascii_uppercase();
        let len = normalized.chars().count();
        if len != TICKER_LEN {
            return Err(ValidationError::TickerLength {
                len,
                expected: TICKER_LEN,
            });
        }

        for (index, ch) in normalized.chars().enumerate() {
            if !ch.is_ascii_alphanumeric() {
                return Err(ValidationError::TickerInvalidChar { ch, index });
            }
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Ticker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Ticker {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Ticker {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Ticker> for String {
    fn from(value: Ticker) -> Self {
        value.0
    }
}

/// Benchmark index identifier (`1001` KOSPI, `2001` KOSDAQ).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IndexCode(String);

impl IndexCode {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.len() != INDEX_CODE_LEN || !trimmed.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(ValidationError::InvalidIndexCode {
                value: input.to_owned(),
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub(crate) fn from_static(code: &'static str) -> Self {
        Self(code.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Index family digit (`1` for KOSPI-family, `2` for KOSDAQ-family).
    pub fn family(&self) -> &str {
        &self.0[..1]
    }

    /// Index member code within the family (`001` for the composite).
    pub fn member(&self) -> &str {
        &self.0[1..]
    }
}

impl Display for IndexCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for IndexCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<IndexCode> for String {
    fn from(value: IndexCode) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes_ticker() {
        let parsed = Ticker::parse(" 0001a0 ").expect("ticker should parse");
        assert_eq!(parsed.as_str(), "0001A0");
    }

    #[test]
    fn rejects_wrong_length() {
        let err = Ticker::parse("5930").expect_err("must fail");
        assert!(matches!(err, ValidationError::TickerLength { len: 4, .. }));
    }

    #[test]
    fn rejects_invalid_chars() {
        let err = Ticker::parse("0059-0").expect_err("must fail");
        assert!(matches!(err, ValidationError::TickerInvalidChar { index: 4, .. }));
    }

    #[test]
    fn index_code_splits_family_and_member() {
        let code = IndexCode::parse("2001").expect("valid");
        assert_eq!(code.family(), "2");
        assert_eq!(code.member(), "001");
        assert!(IndexCode::parse("KOSPI").is_err());
    }
}
