//! Test catalog rows and their AOI fields.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::aoi::{BoxLabel, parse_code_list};

/// AOI fields stored directly on a catalog row.
pub const BASE_AOI_KEYS: [&str; 6] = [
    "correct_AOIs",
    "potentially_correct_AOIs",
    "incorrect_AOIs",
    "correct_NULL",
    "potentially_correct_NULL",
    "incorrect_NULL",
];

/// AOI fields stored in the row's side table ([`CatalogRow::aoi_extra`]).
pub const EXTRA_AOI_KEYS: [&str; 19] = [
    "Mentioned character (Animal)",
    "Mentioned object",
    "Mentioned character's extra object [For Szinghai]",
    "Mentioned character's extra object [For Vzinghai]",
    "Competitor character (Animal) [Correct interpretation]",
    "Competitor object [Correct interpretation (optional)]",
    "Competitor's extra object [Potentially correct interpretation]",
    "Dangling character i (Animal) [Potentially correct interpretation]",
    "Dangling object ia (R) [Potentially correct interpretation]",
    "Dangling object ib (L) [Potentially correct interpretation]",
    "Dangling character ii (Animal) [Potentially correct interpretation]",
    "Dangling object iia (R) [Potentially correct interpretation]",
    "Dangling object iib (L) [Potentially correct interpretation]",
    "Dangling character i (Animal) [Critical incorrect interpretation]",
    "Dangling object ia (R) [Critical incorrect interpretation]",
    "Dangling object ib (L) [Critical incorrect interpretation]",
    "Dangling character ii (Animal) [Critical incorrect interpretation]",
    "Dangling object iia (R) [Critical incorrect interpretation]",
    "Dangling object iib (L) [Critical incorrect interpretation]",
];

/// Every known AOI field, base fields first.
pub const ALL_AOI_KEYS: [&str; BASE_AOI_KEYS.len() + EXTRA_AOI_KEYS.len()] =
    concat_keys(BASE_AOI_KEYS, EXTRA_AOI_KEYS);

const fn concat_keys<const A: usize, const B: usize, const N: usize>(
    a: [&'static str; A],
    b: [&'static str; B],
) -> [&'static str; N] {
    assert!(A + B == N);
    let mut out = [""; N];
    let mut i = 0;
    while i < A {
        out[i] = a[i];
        i += 1;
    }
    let mut j = 0;
    while j < B {
        out[A + j] = b[j];
        j += 1;
    }
    out
}

/// Whether `key` names a known AOI field.
#[must_use]
pub fn is_aoi_key(key: &str) -> bool {
    ALL_AOI_KEYS.contains(&key)
}

/// Metadata of one test item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogRow {
    pub test_name: String,
    pub sentence: Option<String>,
    pub group: Option<String>,
    #[serde(rename = "correct_AOIs")]
    pub correct_aois: Option<String>,
    #[serde(rename = "potentially_correct_AOIs")]
    pub potentially_correct_aois: Option<String>,
    #[serde(rename = "incorrect_AOIs")]
    pub incorrect_aois: Option<String>,
    #[serde(rename = "correct_NULL")]
    pub correct_null: Option<String>,
    #[serde(rename = "potentially_correct_NULL")]
    pub potentially_correct_null: Option<String>,
    #[serde(rename = "incorrect_NULL")]
    pub incorrect_null: Option<String>,
    pub truth_value: Option<String>,
    pub only_position: Option<String>,
    pub morpheme: Option<String>,
    pub series: Option<String>,
    pub case_no: Option<i64>,
    pub image_name: Option<String>,
    pub timeline: Option<String>,
    /// Additional AOI fields keyed by their verbose names.
    pub aoi_extra: BTreeMap<String, Option<String>>,
}

impl CatalogRow {
    /// Row with only the test name set.
    #[must_use]
    pub fn new(test_name: impl Into<String>) -> Self {
        Self {
            test_name: test_name.into(),
            ..Self::default()
        }
    }

    /// Raw code list stored under `key`.
    ///
    /// Base fields take precedence; the side table is consulted when the base
    /// field is absent or `key` is not a base field.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        let base = match key {
            "correct_AOIs" => self.correct_aois.as_deref(),
            "potentially_correct_AOIs" => self.potentially_correct_aois.as_deref(),
            "incorrect_AOIs" => self.incorrect_aois.as_deref(),
            "correct_NULL" => self.correct_null.as_deref(),
            "potentially_correct_NULL" => self.potentially_correct_null.as_deref(),
            "incorrect_NULL" => self.incorrect_null.as_deref(),
            _ => None,
        };
        base.or_else(|| self.aoi_extra.get(key).and_then(Option::as_deref))
    }

    /// Union of the regions listed under each of `keys`.
    pub fn boxes_for<I, K>(&self, keys: I) -> BTreeSet<BoxLabel>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        keys.into_iter()
            .filter_map(|key| self.field(key.as_ref()))
            .flat_map(parse_code_list)
            .collect()
    }
}

/// Optional equality filters over catalog metadata; `None` matches anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogFilter {
    pub group: Option<String>,
    pub truth_value: Option<String>,
    pub only_position: Option<String>,
    pub morpheme: Option<String>,
    pub series: Option<String>,
    pub case_no: Option<i64>,
}

impl CatalogFilter {
    #[must_use]
    pub fn matches(&self, row: &CatalogRow) -> bool {
        fn eq<T: PartialEq + ?Sized>(want: Option<&T>, have: Option<&T>) -> bool {
            want.is_none_or(|w| have == Some(w))
        }
        eq(self.group.as_deref(), row.group.as_deref())
            && eq(self.truth_value.as_deref(), row.truth_value.as_deref())
            && eq(self.only_position.as_deref(), row.only_position.as_deref())
            && eq(self.morpheme.as_deref(), row.morpheme.as_deref())
            && eq(self.series.as_deref(), row.series.as_deref())
            && eq(self.case_no.as_ref(), row.case_no.as_ref())
    }
}

/// The full test catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    rows: Vec<CatalogRow>,
}

impl Catalog {
    #[must_use]
    pub fn new(rows: Vec<CatalogRow>) -> Self {
        Self { rows }
    }

    #[must_use]
    pub fn rows(&self) -> &[CatalogRow] {
        &self.rows
    }

    #[must_use]
    pub fn find(&self, test_name: &str) -> Option<&CatalogRow> {
        self.rows.iter().find(|row| row.test_name == test_name)
    }

    pub fn filter<'a>(&'a self, filter: &'a CatalogFilter) -> impl Iterator<Item = &'a CatalogRow> {
        self.rows.iter().filter(|row| filter.matches(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_keys_is_base_then_extra() {
        assert_eq!(ALL_AOI_KEYS.len(), 25);
        assert_eq!(ALL_AOI_KEYS[..6], BASE_AOI_KEYS);
        assert_eq!(ALL_AOI_KEYS[6..], EXTRA_AOI_KEYS);
        assert_eq!(ALL_AOI_KEYS[0], "correct_AOIs");
        assert_eq!(ALL_AOI_KEYS[24], "Dangling object iib (L) [Critical incorrect interpretation]");
        assert!(is_aoi_key("incorrect_NULL"));
        assert!(!is_aoi_key("sentence"));
    }

    #[test]
    fn test_deserialize_row_with_side_table() {
        let json = r#"{
            "test_name": "T07",
            "correct_AOIs": "S1,O1A",
            "case_no": 3,
            "aoi_extra": { "Mentioned object": "O2A", "Mentioned character (Animal)": null },
            "word_windows_json": "ignored"
        }"#;
        let row: CatalogRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.test_name, "T07");
        assert_eq!(row.field("correct_AOIs"), Some("S1,O1A"));
        assert_eq!(row.field("Mentioned object"), Some("O2A"));
        assert_eq!(row.field("Mentioned character (Animal)"), None);
        assert_eq!(row.case_no, Some(3));
    }

    #[test]
    fn test_base_field_wins_over_side_table() {
        let row = CatalogRow {
            incorrect_aois: Some("S3".to_owned()),
            aoi_extra: BTreeMap::from([("incorrect_AOIs".to_owned(), Some("S2".to_owned()))]),
            ..CatalogRow::new("T")
        };
        assert_eq!(row.field("incorrect_AOIs"), Some("S3"));
        let fallback = CatalogRow {
            aoi_extra: BTreeMap::from([("incorrect_AOIs".to_owned(), Some("S2".to_owned()))]),
            ..CatalogRow::new("T")
        };
        assert_eq!(fallback.field("incorrect_AOIs"), Some("S2"));
    }

    #[test]
    fn test_boxes_for_unions_fields() {
        let row = CatalogRow {
            correct_aois: Some("S1".to_owned()),
            incorrect_aois: Some("s2 O3B".to_owned()),
            ..CatalogRow::new("T")
        };
        let boxes = row.boxes_for(["correct_AOIs", "incorrect_AOIs", "correct_NULL"]);
        assert_eq!(
            boxes,
            BTreeSet::from([BoxLabel::Animal1, BoxLabel::Animal2, BoxLabel::Object2ForAnimal3])
        );
    }

    #[test]
    fn test_catalog_find_and_filter() {
        let catalog = Catalog::new(vec![
            CatalogRow {
                truth_value: Some("T".to_owned()),
                ..CatalogRow::new("A")
            },
            CatalogRow {
                truth_value: Some("F".to_owned()),
                case_no: Some(2),
                ..CatalogRow::new("B")
            },
        ]);
        assert_eq!(catalog.find("B").map(|r| r.case_no), Some(Some(2)));
        assert!(catalog.find("C").is_none());

        let filter = CatalogFilter {
            truth_value: Some("F".to_owned()),
            ..CatalogFilter::default()
        };
        let names: Vec<&str> = catalog.filter(&filter).map(|r| r.test_name.as_str()).collect();
        assert_eq!(names, vec!["B"]);
        assert_eq!(catalog.filter(&CatalogFilter::default()).count(), 2);
    }
}
