//! AOI labels and blue/red classification sets
//!
//! Gaze samples carry a [`BoxLabel`]: one of nine named screen regions or one
//! of three sentinel categories. Test metadata lists region codes such as
//! `"S1, O1A"` per AOI field; [`resolve`] turns a selection of those fields
//! into disjoint [`ClassificationSets`].
//!
//! # Examples
//!
//! ```
//! use gazestat_analysis::{
//!     aoi::{AoiSelection, BoxLabel, RedMode, resolve},
//!     catalog::CatalogRow,
//! };
//!
//! let row = CatalogRow {
//!     correct_aois: Some("S1, o1a".to_owned()),
//!     incorrect_aois: Some("S2".to_owned()),
//!     ..CatalogRow::new("T01")
//! };
//! let selection = AoiSelection::new(vec!["correct_AOIs".to_owned()], RedMode::Auto);
//! let sets = resolve(&row, &selection).unwrap();
//!
//! assert!(sets.blue().contains(&BoxLabel::Animal1));
//! assert!(sets.blue().contains(&BoxLabel::Object1ForAnimal1));
//! assert!(sets.red().contains(&BoxLabel::Animal2));
//! ```

use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::catalog::{ALL_AOI_KEYS, CatalogRow};

/// Screen region a gaze sample landed in, or a sentinel category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BoxLabel {
    Animal1,
    Object1ForAnimal1,
    Object2ForAnimal1,
    Animal2,
    Object1ForAnimal2,
    Object2ForAnimal2,
    Animal3,
    Object1ForAnimal3,
    Object2ForAnimal3,
    /// Valid gaze outside every named region.
    Other,
    /// Tracker lost the eyes.
    Missing,
    /// Gaze outside the screen.
    OutOfScreen,
}

impl BoxLabel {
    pub const ALL: [Self; 12] = [
        Self::Animal1,
        Self::Object1ForAnimal1,
        Self::Object2ForAnimal1,
        Self::Animal2,
        Self::Object1ForAnimal2,
        Self::Object2ForAnimal2,
        Self::Animal3,
        Self::Object1ForAnimal3,
        Self::Object2ForAnimal3,
        Self::Other,
        Self::Missing,
        Self::OutOfScreen,
    ];

    /// Name used in sample data and reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Animal1 => "Animal 1",
            Self::Object1ForAnimal1 => "Object 1 for Animal 1",
            Self::Object2ForAnimal1 => "Object 2 for Animal 1",
            Self::Animal2 => "Animal 2",
            Self::Object1ForAnimal2 => "Object 1 for Animal 2",
            Self::Object2ForAnimal2 => "Object 2 for Animal 2",
            Self::Animal3 => "Animal 3",
            Self::Object1ForAnimal3 => "Object 1 for Animal 3",
            Self::Object2ForAnimal3 => "Object 2 for Animal 3",
            Self::Other => "other",
            Self::Missing => "missing",
            Self::OutOfScreen => "out_of_screen",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|label| label.name() == name)
    }

    /// Whether this is one of `other`, `missing` or `out_of_screen`.
    #[must_use]
    pub const fn is_sentinel(self) -> bool {
        matches!(self, Self::Other | Self::Missing | Self::OutOfScreen)
    }
}

impl fmt::Display for BoxLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for BoxLabel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

/// Unrecognized box names deserialize to [`BoxLabel::Other`].
impl<'de> Deserialize<'de> for BoxLabel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_name(&name).unwrap_or(Self::Other))
    }
}

/// Region codes used in the test catalog.
pub const AOI_CODES: [(&str, BoxLabel); 9] = [
    ("S1", BoxLabel::Animal1),
    ("O1A", BoxLabel::Object1ForAnimal1),
    ("O2A", BoxLabel::Object2ForAnimal1),
    ("S2", BoxLabel::Animal2),
    ("O1B", BoxLabel::Object1ForAnimal2),
    ("O2B", BoxLabel::Object2ForAnimal2),
    ("S3", BoxLabel::Animal3),
    ("O3A", BoxLabel::Object1ForAnimal3),
    ("O3B", BoxLabel::Object2ForAnimal3),
];

/// Looks up an (already uppercased) region code.
#[must_use]
pub fn code_to_box(code: &str) -> Option<BoxLabel> {
    AOI_CODES
        .iter()
        .find_map(|&(c, label)| (c == code).then_some(label))
}

fn is_code_delimiter(c: char) -> bool {
    matches!(c, ',' | '，' | '；' | '、') || c.is_whitespace()
}

/// Parses a delimited list of region codes.
///
/// Tokens are split on commas, whitespace and full-width CJK separators,
/// matched case-insensitively, and silently dropped when unknown.
///
/// ```
/// use gazestat_analysis::aoi::{BoxLabel, parse_code_list};
///
/// let labels = parse_code_list("s1，O2b ??  S3");
/// assert_eq!(
///     labels.into_iter().collect::<Vec<_>>(),
///     vec![BoxLabel::Animal1, BoxLabel::Object2ForAnimal2, BoxLabel::Animal3]
/// );
/// ```
#[must_use]
pub fn parse_code_list(s: &str) -> BTreeSet<BoxLabel> {
    s.split(is_code_delimiter)
        .filter(|token| !token.is_empty())
        .filter_map(|token| code_to_box(&token.to_uppercase()))
        .collect()
}

/// Gaze categories that can be declared invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidCategory {
    Other,
    Missing,
    OutOfScreen,
}

impl InvalidCategory {
    #[must_use]
    pub const fn label(self) -> BoxLabel {
        match self {
            Self::Other => BoxLabel::Other,
            Self::Missing => BoxLabel::Missing,
            Self::OutOfScreen => BoxLabel::OutOfScreen,
        }
    }
}

/// Disjoint blue and red label sets plus the labels treated as invalid.
///
/// Construction guarantees `blue ∩ red = ∅` (blue wins any overlap) and that
/// invalid labels belong to neither set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationSets {
    blue: BTreeSet<BoxLabel>,
    red: BTreeSet<BoxLabel>,
    invalid: BTreeSet<BoxLabel>,
}

impl ClassificationSets {
    #[must_use]
    pub fn new(
        blue: BTreeSet<BoxLabel>,
        red: BTreeSet<BoxLabel>,
        invalid: BTreeSet<BoxLabel>,
    ) -> Self {
        let blue = &blue - &invalid;
        let red = &(&red - &blue) - &invalid;
        Self { blue, red, invalid }
    }

    #[must_use]
    pub fn blue(&self) -> &BTreeSet<BoxLabel> {
        &self.blue
    }

    #[must_use]
    pub fn red(&self) -> &BTreeSet<BoxLabel> {
        &self.red
    }

    #[must_use]
    pub fn invalid(&self) -> &BTreeSet<BoxLabel> {
        &self.invalid
    }
}

/// How the red set is chosen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "keys", rename_all = "snake_case")]
pub enum RedMode {
    /// Every region named by any AOI field, minus the blue set.
    #[default]
    Auto,
    /// Regions named by these fields; fields also selected as blue are ignored.
    Custom(Vec<String>),
}

/// Caller's choice of AOI fields and invalid categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AoiSelection {
    pub blue_keys: Vec<String>,
    #[serde(default)]
    pub red_mode: RedMode,
    #[serde(default = "default_invalid")]
    pub invalid: Vec<InvalidCategory>,
}

fn default_invalid() -> Vec<InvalidCategory> {
    vec![InvalidCategory::Missing]
}

impl AoiSelection {
    /// Selection with the default invalid category (`missing`).
    #[must_use]
    pub fn new(blue_keys: Vec<String>, red_mode: RedMode) -> Self {
        Self {
            blue_keys,
            red_mode,
            invalid: default_invalid(),
        }
    }

    #[must_use]
    pub fn invalid_labels(&self) -> BTreeSet<BoxLabel> {
        self.invalid.iter().map(|c| c.label()).collect()
    }
}

/// Error returned by [`resolve`].
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ResolveError {
    #[display("at least one blue AOI key must be selected")]
    NoBlueKeys,
}

/// Resolves a catalog row and an AOI selection into classification sets.
///
/// - blue: union of the regions listed in every blue field
/// - red (auto): union over all known AOI fields, minus blue
/// - red (custom): union over the custom fields not also selected as blue,
///   minus blue
///
/// Fails only when no blue key is selected.
pub fn resolve(
    row: &CatalogRow,
    selection: &AoiSelection,
) -> Result<ClassificationSets, ResolveError> {
    if selection.blue_keys.is_empty() {
        return Err(ResolveError::NoBlueKeys);
    }
    let blue = row.boxes_for(&selection.blue_keys);
    let red = match &selection.red_mode {
        RedMode::Auto => row.boxes_for(ALL_AOI_KEYS),
        RedMode::Custom(keys) => {
            row.boxes_for(keys.iter().filter(|k| !selection.blue_keys.contains(k)))
        }
    };
    Ok(ClassificationSets::new(
        blue,
        red,
        selection.invalid_labels(),
    ))
}
