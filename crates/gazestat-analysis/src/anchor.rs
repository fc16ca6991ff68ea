//! Session time anchors.
//!
//! Bin 0 of a session starts at its anchor: the session's first sample time,
//! moved to a manual offset or to the onset of a spoken word, plus a constant
//! shift that accounts for saccade latency.

use serde::{Deserialize, Serialize};

/// Time span of one word in the stimulus audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordWindow {
    pub chinese_word: String,
    pub start_sec: f64,
    pub end_sec: f64,
    pub test_name: String,
    #[serde(default)]
    pub timeline: String,
}

/// Where bin 0 starts relative to the session's first sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode")]
pub enum AnchorSpec {
    /// Fixed offset from the first sample.
    #[serde(rename = "manual")]
    SessionStart {
        #[serde(default)]
        offset_ms: i64,
    },
    /// Onset of the named word; `None` anchors at the first sample.
    #[serde(rename = "word")]
    WordOnset {
        #[serde(default)]
        word: Option<String>,
    },
}

impl Default for AnchorSpec {
    fn default() -> Self {
        Self::WordOnset { word: None }
    }
}

/// Error returned by [`resolve_anchor`].
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum AnchorError {
    #[display("word {word:?} has no window in this test")]
    UnknownWord { word: String },
}

#[expect(clippy::cast_possible_truncation)]
fn sec_to_ms(sec: f64) -> i64 {
    (sec * 1000.0).round() as i64
}

/// Computes the absolute anchor of a session in milliseconds.
///
/// ```
/// use gazestat_analysis::anchor::{AnchorSpec, WordWindow, resolve_anchor};
///
/// let windows = [WordWindow {
///     chinese_word: "猫".to_owned(),
///     start_sec: 1.5,
///     end_sec: 1.9,
///     test_name: "T01".to_owned(),
///     timeline: "TL".to_owned(),
/// }];
/// let spec = AnchorSpec::WordOnset { word: Some("猫".to_owned()) };
/// assert_eq!(resolve_anchor(10_000, &spec, 200, &windows), Ok(11_700));
/// ```
pub fn resolve_anchor(
    session_base_ms: i64,
    spec: &AnchorSpec,
    shift_ms: i64,
    windows: &[WordWindow],
) -> Result<i64, AnchorError> {
    let offset = match spec {
        AnchorSpec::SessionStart { offset_ms } => *offset_ms,
        AnchorSpec::WordOnset { word: None } => 0,
        AnchorSpec::WordOnset { word: Some(word) } => windows
            .iter()
            .find(|w| w.chinese_word == *word)
            .map(|w| sec_to_ms(w.start_sec))
            .ok_or_else(|| AnchorError::UnknownWord { word: word.clone() })?,
    };
    Ok(session_base_ms.saturating_add(offset).saturating_add(shift_ms))
}
