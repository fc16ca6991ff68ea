//! Group curve pipeline.
//!
//! For every selected test and participant, each recording session is
//! anchored, binned and turned into a contrast curve; the session curves are
//! aggregated into one curve per participant and test. The participant curves
//! then feed the bootstrap band and the cluster permutation test.
//!
//! # Examples
//!
//! ```
//! use gazestat_analysis::{
//!     aoi::BoxLabel,
//!     catalog::{Catalog, CatalogRow},
//!     config::AnalysisConfig,
//!     group::{GroupAnalysisRequest, run_group_analysis},
//!     sample::{GazeSample, SessionKey},
//! };
//! use gazestat_stats::cancel::CancelToken;
//!
//! let catalog = Catalog::new(vec![CatalogRow {
//!     correct_aois: Some("S1".to_owned()),
//!     incorrect_aois: Some("S2".to_owned()),
//!     ..CatalogRow::new("T01")
//! }]);
//! let samples = (0..20)
//!     .map(|i| GazeSample {
//!         timestamp_ms: i * 50,
//!         participant: format!("P{}", i % 2),
//!         box_label: BoxLabel::Animal1,
//!         test_name: "T01".to_owned(),
//!         session: SessionKey::default(),
//!     })
//!     .collect::<Vec<_>>();
//! let config = AnalysisConfig { shift_ms: 0, num_bins: 4, seed: Some(1), ..AnalysisConfig::default() };
//! let tests = ["T01".to_owned()];
//! let request = GroupAnalysisRequest { tests: &tests, participants: None, config: &config };
//!
//! let mut rng = AnalysisConfig::rng(1);
//! let report = run_group_analysis(&request, &catalog, &samples, &[], &mut rng, &CancelToken::new()).unwrap();
//! assert_eq!(report.participants.len(), 2);
//! assert_eq!(report.curve.mean[0], 100.0);
//! ```

use gazestat_stats::{
    bootstrap::{GroupCurve, bootstrap_ci},
    cancel::{CancelToken, Cancelled},
    cluster::{ClusterSignificance, cluster_permutation},
};
use rand::Rng;
use serde::Serialize;

use crate::{
    anchor::{WordWindow, resolve_anchor},
    aoi::{self, ClassificationSets, ResolveError},
    binning::{BinParams, bin_centers_sec, build_bins},
    catalog::Catalog,
    config::AnalysisConfig,
    curve::{ParticipantCurve, SessionCurve, aggregate_sessions},
    sample::{self, GazeSample, SessionKey},
};

/// Tests, participants and settings of one group analysis.
#[derive(Debug, Clone, Copy)]
pub struct GroupAnalysisRequest<'a> {
    pub tests: &'a [String],
    /// Participants to include; `None` includes everyone with data.
    pub participants: Option<&'a [String]>,
    pub config: &'a AnalysisConfig,
}

impl GroupAnalysisRequest<'_> {
    fn includes(&self, participant: &str) -> bool {
        self.participants
            .is_none_or(|allowed| allowed.iter().any(|p| p == participant))
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum GroupError {
    #[display("test {test_name:?} is not in the catalog")]
    UnknownTest { test_name: String },
    #[display("cannot resolve AOIs of test {test_name:?}")]
    Resolve {
        test_name: String,
        source: ResolveError,
    },
    #[display("group analysis cancelled")]
    Cancelled(Cancelled),
}

/// Result of [`run_group_analysis`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupReport {
    pub curve: GroupCurve,
    pub significance: ClusterSignificance,
    pub participants: Vec<ParticipantCurve>,
}

/// Builds one aggregated curve per (test, participant).
///
/// Participants without any non-empty session are skipped.
pub fn participant_curves(
    request: &GroupAnalysisRequest<'_>,
    catalog: &Catalog,
    samples: &[GazeSample],
    words: &[WordWindow],
) -> Result<Vec<ParticipantCurve>, GroupError> {
    let config = request.config;
    let selection = config.selection();
    let mut curves = vec![];

    for test_name in request.tests {
        let row = catalog
            .find(test_name)
            .ok_or_else(|| GroupError::UnknownTest {
                test_name: test_name.clone(),
            })?;
        let sets = aoi::resolve(row, &selection).map_err(|source| GroupError::Resolve {
            test_name: test_name.clone(),
            source,
        })?;
        let windows = words
            .iter()
            .filter(|w| w.test_name == *test_name)
            .cloned()
            .collect::<Vec<_>>();

        for (participant, sessions) in sample::group_sessions(samples, test_name) {
            if !request.includes(participant) {
                continue;
            }
            let session_curves = sessions
                .iter()
                .filter_map(|(key, session)| session_curve(key, session, &sets, &windows, config))
                .collect::<Vec<_>>();
            let Some(combined) =
                aggregate_sessions(&session_curves, config.num_bins, config.aggregation)
            else {
                continue;
            };
            curves.push(ParticipantCurve {
                participant: participant.to_owned(),
                test_name: test_name.clone(),
                sessions: session_curves.len(),
                values: combined.values,
                weights: combined.weights,
            });
        }
    }

    tracing::debug!(
        tests = request.tests.len(),
        curves = curves.len(),
        "participant curves built"
    );
    Ok(curves)
}

fn session_curve(
    key: &SessionKey,
    session: &[&GazeSample],
    sets: &ClassificationSets,
    windows: &[WordWindow],
    config: &AnalysisConfig,
) -> Option<SessionCurve> {
    let base_ms = session.iter().map(|s| s.timestamp_ms).min()?;
    let anchor_ms = resolve_anchor(base_ms, &config.anchor, config.shift_ms, windows)
        .unwrap_or_else(|err| {
            tracing::warn!(
                recording = %key.recording,
                %err,
                "falling back to the session start as anchor"
            );
            base_ms.saturating_add(config.shift_ms)
        });
    let params = BinParams {
        anchor_ms,
        bin_width_ms: config.bin_width_ms,
        num_bins: config.num_bins,
    };
    let bins = build_bins(session.iter().copied(), &params, sets);
    tracing::trace!(
        timeline = %key.timeline,
        recording = %key.recording,
        samples = session.len(),
        anchor_ms,
        "session binned"
    );
    Some(SessionCurve::from_bins(&bins, config.metric))
}

/// Runs the full pipeline: participant curves, bootstrap band and cluster
/// permutation test.
///
/// With no usable participant the report has an all-zero curve, no clusters
/// and `p_value == 1.0`.
pub fn run_group_analysis<R>(
    request: &GroupAnalysisRequest<'_>,
    catalog: &Catalog,
    samples: &[GazeSample],
    words: &[WordWindow],
    rng: &mut R,
    cancel: &CancelToken,
) -> Result<GroupReport, GroupError>
where
    R: Rng + ?Sized,
{
    let config = request.config;
    cancel.check().map_err(GroupError::Cancelled)?;
    let participants = participant_curves(request, catalog, samples, words)?;
    let values = participants
        .iter()
        .map(|p| p.values.clone())
        .collect::<Vec<_>>();
    let x_sec = bin_centers_sec(config.bin_width_ms, config.num_bins);

    cancel.check().map_err(GroupError::Cancelled)?;
    let curve = bootstrap_ci(&values, &x_sec, &config.bootstrap_params(), rng);
    let significance = cluster_permutation(&values, &config.permutation_params(), rng, cancel)
        .map_err(GroupError::Cancelled)?;

    tracing::debug!(
        participants = participants.len(),
        clusters = significance.clusters.len(),
        p_value = significance.p_value,
        "group analysis finished"
    );
    Ok(GroupReport {
        curve,
        significance,
        participants,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{anchor::AnchorSpec, aoi::BoxLabel, catalog::CatalogRow, sample::tests::sample};

    fn catalog() -> Catalog {
        Catalog::new(vec![CatalogRow {
            correct_aois: Some("S1".to_owned()),
            incorrect_aois: Some("S2".to_owned()),
            ..CatalogRow::new("T01")
        }])
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig {
            bin_width_ms: 100,
            num_bins: 3,
            shift_ms: 0,
            anchor: AnchorSpec::SessionStart { offset_ms: 0 },
            n_boot: 50,
            n_perm: 20,
            ..AnalysisConfig::default()
        }
    }

    fn run(samples: &[GazeSample], config: &AnalysisConfig, participants: Option<&[String]>) -> GroupReport {
        let tests = ["T01".to_owned()];
        let request = GroupAnalysisRequest {
            tests: &tests,
            participants,
            config,
        };
        let mut rng = AnalysisConfig::rng(5);
        run_group_analysis(&request, &catalog(), samples, &[], &mut rng, &CancelToken::new()).unwrap()
    }

    #[test]
    fn test_two_participant_scenario() {
        // P1 looks at blue then red; P2 the reverse.
        let samples = vec![
            sample("P1", "R1", 1_000, BoxLabel::Animal1),
            sample("P1", "R1", 1_150, BoxLabel::Animal2),
            sample("P2", "R1", 5_000, BoxLabel::Animal2),
            sample("P2", "R1", 5_150, BoxLabel::Animal1),
        ];
        let report = run(&samples, &config(), None);
        assert_eq!(report.participants.len(), 2);
        assert_eq!(report.participants[0].values, vec![100.0, -100.0, 0.0]);
        assert_eq!(report.participants[1].values, vec![-100.0, 100.0, 0.0]);
        assert_eq!(report.participants[0].weights, vec![1, 1, 0]);
        assert_eq!(report.curve.mean, vec![0.0, 0.0, 0.0]);
        assert_eq!(report.curve.x_sec, vec![0.05, 0.15, 0.25]);
        assert!(report.significance.clusters.is_empty());
    }

    #[test]
    fn test_sessions_are_aggregated() {
        let samples = vec![
            sample("P1", "R1", 0, BoxLabel::Animal1),
            sample("P1", "R2", 10_000, BoxLabel::Animal2),
        ];
        let report = run(&samples, &config(), None);
        assert_eq!(report.participants.len(), 1);
        assert_eq!(report.participants[0].sessions, 2);
        assert_eq!(report.participants[0].values, vec![0.0, 0.0, 0.0]);
        // Bin 0 balances blue and red; the others are empty.
        assert_eq!(report.participants[0].weights, vec![2, 0, 0]);
    }

    #[test]
    fn test_participant_filter() {
        let samples = vec![
            sample("P1", "R1", 0, BoxLabel::Animal1),
            sample("P2", "R1", 0, BoxLabel::Animal1),
        ];
        let only = ["P2".to_owned()];
        let report = run(&samples, &config(), Some(only.as_slice()));
        assert_eq!(report.participants.len(), 1);
        assert_eq!(report.participants[0].participant, "P2");
    }

    #[test]
    fn test_no_participants_gives_empty_report() {
        let report = run(&[], &config(), None);
        assert!(report.participants.is_empty());
        assert_eq!(report.curve.mean, vec![0.0; 3]);
        assert!(report.significance.clusters.is_empty());
        assert_eq!(report.significance.p_value, 1.0);
    }

    #[test]
    fn test_unknown_word_falls_back_to_session_start() {
        let samples = vec![sample("P1", "R1", 0, BoxLabel::Animal1)];
        let config = AnalysisConfig {
            anchor: AnchorSpec::WordOnset {
                word: Some("猫".to_owned()),
            },
            ..config()
        };
        let report = run(&samples, &config, None);
        assert_eq!(report.participants[0].values[0], 100.0);
    }

    #[test]
    fn test_extreme_shift_leaves_bins_empty() {
        let samples = vec![sample("P1", "R1", 1_000, BoxLabel::Animal1)];
        let config = AnalysisConfig {
            shift_ms: i64::MAX,
            anchor: AnchorSpec::WordOnset {
                word: Some("鸟".to_owned()),
            },
            ..config()
        };
        let report = run(&samples, &config, None);
        assert_eq!(report.participants[0].values, vec![0.0, 0.0, 0.0]);
        assert_eq!(report.participants[0].weights, vec![0, 0, 0]);
    }

    #[test]
    fn test_unknown_test() {
        let tests = ["T99".to_owned()];
        let config = config();
        let request = GroupAnalysisRequest {
            tests: &tests,
            participants: None,
            config: &config,
        };
        let err = participant_curves(&request, &catalog(), &[], &[]).unwrap_err();
        assert!(matches!(err, GroupError::UnknownTest { .. }));
    }

    #[test]
    fn test_cancelled() {
        let tests = ["T01".to_owned()];
        let config = config();
        let request = GroupAnalysisRequest {
            tests: &tests,
            participants: None,
            config: &config,
        };
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut rng = AnalysisConfig::rng(0);
        let err = run_group_analysis(&request, &catalog(), &[], &[], &mut rng, &cancel).unwrap_err();
        assert!(matches!(err, GroupError::Cancelled(_)));
    }
}
