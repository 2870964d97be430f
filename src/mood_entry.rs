use chrono::{DateTime, Local, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::mood::Mood;

pub type EntryId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodEntry {
    pub id: EntryId,
    pub text: String,
    pub mood: Mood,
    #[serde(with = "iso_millis")]
    pub date: DateTime<Utc>,
}

impl MoodEntry {
    /// Builds an entry stamped at `date`, truncated to millisecond precision.
    pub fn new(id: EntryId, text: String, mood: Mood, date: DateTime<Utc>) -> Self {
        MoodEntry {
            id,
            text,
            mood,
            date: date.trunc_subsecs(3),
        }
    }

    pub fn local_date(&self) -> String {
        self.date
            .with_timezone(&Local)
            .format("%-m/%-d/%Y")
            .to_string()
    }
}

/// ISO-8601 in UTC with milliseconds, e.g. `2026-10-19T08:15:30.123Z`.
mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|date| date.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn serializes_with_original_field_names() {
        let date = Utc.with_ymd_and_hms(2026, 10, 19, 8, 15, 30).unwrap();
        let entry = MoodEntry::new(1_792_397_730_000, "walk".into(), Mood::Happy, date);

        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(
            json,
            r#"{"id":1792397730000,"text":"walk","mood":"happy","date":"2026-10-19T08:15:30.000Z"}"#
        );
    }

    #[test]
    fn accepts_dates_without_millis() {
        let json = r#"{"id":7,"text":"x","mood":"sad","date":"2024-02-01T10:00:00Z"}"#;
        let entry: MoodEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.date, Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn new_truncates_to_millis() {
        let date = Utc.timestamp_nanos(1_700_000_000_123_456_789);
        let entry = MoodEntry::new(1, "x".into(), Mood::Sad, date);
        assert_eq!(entry.date.timestamp_subsec_nanos(), 123_000_000);
    }
}
