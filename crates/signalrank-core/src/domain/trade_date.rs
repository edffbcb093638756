use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::{Date, Duration, Month, OffsetDateTime, UtcOffset};

use crate::ValidationError;

const KST_OFFSET_SECONDS: i32 = 9 * 60 * 60;

/// Exchange calendar date. Accepts `YYYYMMDD`, `YYYY/MM/DD` and `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TradeDate(Date);

impl TradeDate {
    pub fn from_ymd(year: i32, month: u8, day: u8) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidTradeDate {
            value: format!("{year:04}{month:02}{day:02}"),
        };
        let month = Month::try_from(month).map_err(|_| invalid())?;
        Date::from_calendar_date(year, month, day)
            .map(Self)
            .map_err(|_| invalid())
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidTradeDate {
            value: input.to_owned(),
        };

        let digits: String = input
            .trim()
            .chars()
            .filter(|ch| *ch != '/' && *ch != '-')
            .collect();
        if digits.len() != 8 || !digits.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(invalid());
        }

        let year: i32 = digits[0..4].parse().map_err(|_| invalid())?;
        let month: u8 = digits[4..6].parse().map_err(|_| invalid())?;
        let day: u8 = digits[6..8].parse().map_err(|_| invalid())?;
        Self::from_ymd(year, month, day).map_err(|_| invalid())
    }

    /// Current date on the exchange clock (KST).
    pub fn today() -> Self {
        let offset = UtcOffset::from_whole_seconds(KST_OFFSET_SECONDS).unwrap_or(UtcOffset::UTC);
        Self(OffsetDateTime::now_utc().to_offset(offset).date())
    }

    pub fn into_inner(self) -> Date {
        self.0
    }

    /// Date `days` calendar days earlier, saturating at the calendar minimum.
    pub fn minus_days(self, days: u32) -> Self {
        self.0
            .checked_sub(Duration::days(i64::from(days)))
            .map(Self)
            .unwrap_or(Self(Date::MIN))
    }

    /// `YYYYMMDD`, the form the KRX endpoints expect.
    pub fn compact(self) -> String {
        format!(
            "{:04}{:02}{:02}",
            self.0.year(),
            u8::from(self.0.month()),
            self.0.day()
        )
    }

    /// `YYYY-MM-DD`, the form used in captions and JSON.
    pub fn display(self) -> String {
        format!(
            "{:04}-{:02}-{:02}",
            self.0.year(),
            u8::from(self.0.month()),
            self.0.day()
        )
    }
}

impl From<Date> for TradeDate {
    fn from(value: Date) -> Self {
        Self(value)
    }
}

impl Display for TradeDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display())
    }
}

impl Serialize for TradeDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.display())
    }
}

impl<'de> Deserialize<'de> for TradeDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}
