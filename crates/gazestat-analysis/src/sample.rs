//! Gaze samples and session grouping.
//!
//! A sample's `timestamp` may be an integer number of milliseconds since the
//! Unix epoch or a date-time string. Strings are accepted as RFC 3339 or as a
//! naive `YYYY-MM-DD HH:MM:SS[.fff]` (space or `T` separated), which is read
//! as UTC.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::aoi::BoxLabel;

/// Identifies one recording session of a participant.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub timeline: String,
    pub recording: String,
}

/// One eye-tracker reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GazeSample {
    #[serde(rename = "timestamp", deserialize_with = "deserialize_timestamp")]
    pub timestamp_ms: i64,
    pub participant: String,
    #[serde(rename = "box_name")]
    pub box_label: BoxLabel,
    pub test_name: String,
    #[serde(flatten)]
    pub session: SessionKey,
}

/// Parses a date-time string into milliseconds since the Unix epoch.
///
/// ```
/// use gazestat_analysis::sample::parse_timestamp_ms;
///
/// assert_eq!(parse_timestamp_ms("1970-01-01 00:00:01.250"), Some(1250));
/// assert_eq!(parse_timestamp_ms("1970-01-01T00:00:02+00:00"), Some(2000));
/// assert_eq!(parse_timestamp_ms("yesterday"), None);
/// ```
#[must_use]
pub fn parse_timestamp_ms(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .into_iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.and_utc().timestamp_millis())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Millis(ms) => Ok(ms),
        Raw::Text(text) => parse_timestamp_ms(&text).ok_or_else(|| {
            serde::de::Error::custom(format_args!("invalid timestamp: {text:?}"))
        }),
    }
}

/// Samples of one participant, split by session.
pub type ParticipantSessions<'a> = BTreeMap<&'a SessionKey, Vec<&'a GazeSample>>;

/// Groups samples of `test_name` by participant, then by session.
///
/// Sample order within a session is preserved.
#[must_use]
pub fn group_sessions<'a>(
    samples: &'a [GazeSample],
    test_name: &str,
) -> BTreeMap<&'a str, ParticipantSessions<'a>> {
    let mut groups: BTreeMap<&str, ParticipantSessions<'_>> = BTreeMap::new();
    for sample in samples.iter().filter(|s| s.test_name == test_name) {
        groups
            .entry(sample.participant.as_str())
            .or_default()
            .entry(&sample.session)
            .or_default()
            .push(sample);
    }
    groups
}

/// Groups samples by `(test_name, participant)`, ignoring sessions.
#[must_use]
pub fn group_trials(samples: &[GazeSample]) -> BTreeMap<(&str, &str), Vec<&GazeSample>> {
    let mut groups: BTreeMap<(&str, &str), Vec<&GazeSample>> = BTreeMap::new();
    for sample in samples {
        groups
            .entry((sample.test_name.as_str(), sample.participant.as_str()))
            .or_default()
            .push(sample);
    }
    groups
}
