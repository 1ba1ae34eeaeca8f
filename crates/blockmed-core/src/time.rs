use crate::constants::{TIMESTAMP_FIELD, TIMESTAMP_FORMAT};
use crate::error::LedgerError;
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Second-resolution wall-clock time, kept in its canonical text form
/// (`YYYY-MM-DD HH:MM:SS`, UTC) because that text is what gets hashed.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(String);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn parse(s: &str) -> Result<Self, LedgerError> {
        if s.len() >= TIMESTAMP_FIELD {
            return Err(LedgerError::InvalidTimestamp(s.to_string()));
        }
        NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
            .map_err(|_| LedgerError::InvalidTimestamp(s.to_string()))?;
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Timestamp {
    type Error = LedgerError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_nineteen_chars() {
        let ts = Timestamp::now();
        assert_eq!(ts.as_str().len(), 19);
        assert!(Timestamp::parse(ts.as_str()).is_ok());
    }

    #[test]
    fn parse_round_trips() {
        let ts = Timestamp::parse("2024-03-01 09:15:00").unwrap();
        assert_eq!(ts.to_string(), "2024-03-01 09:15:00");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Timestamp::parse("yesterday").is_err());
        assert!(Timestamp::parse("2024-13-01 09:15:00").is_err());
        assert!(Timestamp::parse("").is_err());
    }

    #[test]
    fn serde_uses_plain_string() {
        let ts = Timestamp::parse("2024-03-01 09:15:00").unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, r#""2024-03-01 09:15:00""#);
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
        assert!(serde_json::from_str::<Timestamp>(r#""not a time""#).is_err());
    }
}
