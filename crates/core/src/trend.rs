use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::model::{AssessmentResult, Patient, PatientId};

/// Percentage-point change between the two most recent results that counts as movement.
pub const TREND_THRESHOLD: f64 = 5.0;

/// Latest score below this share of the baseline raises an alert.
pub const ALERT_RATIO: f64 = 0.7;

/// Latest score below this share of the baseline raises a warning.
pub const WARNING_RATIO: f64 = 0.85;

//
// ─── TREND ─────────────────────────────────────────────────────────────────────
//

/// Direction of a patient's score across their last two sessions.
///
/// # Examples
///
/// ```
/// # use assess_core::trend::Trend;
/// assert_eq!(Trend::classify(&[90.0, 80.0]), Trend::Up);
/// assert_eq!(Trend::classify(&[60.0, 80.0]), Trend::Down);
/// assert_eq!(Trend::classify(&[82.0, 80.0]), Trend::Stable);
/// assert_eq!(Trend::classify(&[75.0]), Trend::New);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
    New,
}

impl Trend {
    /// Classify from percentages ordered most recent first.
    #[must_use]
    pub fn classify(percentages_latest_first: &[f64]) -> Self {
        match percentages_latest_first {
            [latest, previous, ..] => {
                let delta = latest - previous;
                if delta > TREND_THRESHOLD {
                    Trend::Up
                } else if delta < -TREND_THRESHOLD {
                    Trend::Down
                } else {
                    Trend::Stable
                }
            }
            _ => Trend::New,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Stable => "stable",
            Trend::New => "new",
        }
    }
}

//
// ─── BASELINE STATUS ───────────────────────────────────────────────────────────
//

/// Latest score measured against the patient's own baseline.
///
/// # Examples
///
/// ```
/// # use assess_core::trend::BaselineStatus;
/// assert_eq!(BaselineStatus::classify(58.0, 85.0), BaselineStatus::Alert);
/// assert_eq!(BaselineStatus::classify(70.0, 95.0), BaselineStatus::Warning);
/// assert_eq!(BaselineStatus::classify(76.0, 78.0), BaselineStatus::Normal);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaselineStatus {
    Normal,
    Warning,
    Alert,
}

impl BaselineStatus {
    /// A zero baseline leaves nothing to fall below, so it is always `Normal`.
    #[must_use]
    pub fn classify(latest: f64, baseline: f64) -> Self {
        if baseline <= 0.0 {
            return BaselineStatus::Normal;
        }
        let ratio = latest / baseline;
        if ratio < ALERT_RATIO {
            BaselineStatus::Alert
        } else if ratio < WARNING_RATIO {
            BaselineStatus::Warning
        } else {
            BaselineStatus::Normal
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BaselineStatus::Normal => "normal",
            BaselineStatus::Warning => "warning",
            BaselineStatus::Alert => "alert",
        }
    }
}

/// Whole percent the latest score sits below the baseline; 0 when at or above it.
fn below_baseline_pct(latest: f64, baseline: f64) -> f64 {
    if baseline <= 0.0 || latest >= baseline {
        return 0.0;
    }
    ((1.0 - latest / baseline) * 100.0).round()
}

//
// ─── SUMMARIES ─────────────────────────────────────────────────────────────────
//

/// Patient fields the analyzer needs alongside their results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub name: String,
    pub age: u8,
}

impl From<&Patient> for PatientProfile {
    fn from(patient: &Patient) -> Self {
        Self {
            name: patient.name.clone(),
            age: patient.age,
        }
    }
}

/// Derived per-patient view. Recomputed on every read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientTrendSummary {
    pub patient_id: PatientId,
    pub name: String,
    pub age: u8,
    /// Most recent first.
    pub assessments: Vec<AssessmentResult>,
    pub average_score: f64,
    pub latest_score: f64,
    /// Percentage of the oldest result; the patient's baseline.
    pub baseline_score: f64,
    pub trend: Trend,
    /// `None` until the patient has been assessed.
    pub status: Option<BaselineStatus>,
    pub below_baseline_pct: f64,
}

impl PatientTrendSummary {
    fn build(patient_id: PatientId, profile: &PatientProfile, mut results: Vec<AssessmentResult>) -> Self {
        results.sort_by(|a, b| {
            b.completed_at()
                .cmp(&a.completed_at())
                .then_with(|| b.id().cmp(&a.id()))
        });

        let percentages: Vec<f64> = results.iter().map(AssessmentResult::percentage).collect();
        let latest_score = percentages.first().copied().unwrap_or(0.0);
        let baseline_score = percentages.last().copied().unwrap_or(0.0);
        let average_score = if percentages.is_empty() {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let len = percentages.len() as f64;
            percentages.iter().sum::<f64>() / len
        };

        let status = (!percentages.is_empty())
            .then(|| BaselineStatus::classify(latest_score, baseline_score));

        Self {
            patient_id,
            name: profile.name.clone(),
            age: profile.age,
            trend: Trend::classify(&percentages),
            status,
            below_baseline_pct: below_baseline_pct(latest_score, baseline_score),
            assessments: results,
            average_score,
            latest_score,
            baseline_score,
        }
    }

    #[must_use]
    pub fn last_completed_at(&self) -> Option<DateTime<Utc>> {
        self.assessments.first().map(AssessmentResult::completed_at)
    }
}

/// Group results per patient and classify each trajectory.
///
/// Every patient in `patients` gets a summary, even without results. Results whose
/// patient is not in `patients` are skipped. Output is ordered by most recent
/// completion, newest first, with never-assessed patients last.
#[must_use]
pub fn analyze(
    results: &[AssessmentResult],
    patients: &HashMap<PatientId, PatientProfile>,
) -> Vec<PatientTrendSummary> {
    let mut grouped: HashMap<PatientId, Vec<AssessmentResult>> =
        patients.keys().map(|id| (*id, Vec::new())).collect();
    for result in results {
        if let Some(group) = grouped.get_mut(&result.patient_id()) {
            group.push(result.clone());
        }
    }

    let mut summaries: Vec<PatientTrendSummary> = grouped
        .into_iter()
        .filter_map(|(id, group)| {
            patients
                .get(&id)
                .map(|profile| PatientTrendSummary::build(id, profile, group))
        })
        .collect();

    summaries.sort_by(|a, b| {
        match (a.last_completed_at(), b.last_completed_at()) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
        .then_with(|| a.patient_id.cmp(&b.patient_id))
    });
    summaries
}

//
// ─── OVERVIEW ──────────────────────────────────────────────────────────────────
//

/// Headline counts across all patients.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendOverview {
    pub total_patients: usize,
    pub assessed: usize,
    pub improving: usize,
    pub declining: usize,
    pub stable: usize,
    pub new: usize,
    /// Patients whose latest score fell below 70 % of their baseline.
    pub alerts: usize,
    pub warnings: usize,
    /// Mean of latest scores over assessed patients.
    pub average_performance: f64,
}

impl TrendOverview {
    #[must_use]
    pub fn from_summaries(summaries: &[PatientTrendSummary]) -> Self {
        let mut overview = TrendOverview {
            total_patients: summaries.len(),
            ..TrendOverview::default()
        };
        let mut latest_sum = 0.0;

        for summary in summaries {
            if summary.assessments.is_empty() {
                continue;
            }
            overview.assessed += 1;
            latest_sum += summary.latest_score;
            match summary.trend {
                Trend::Up => overview.improving += 1,
                Trend::Down => overview.declining += 1,
                Trend::Stable => overview.stable += 1,
                Trend::New => overview.new += 1,
            }
            match summary.status {
                Some(BaselineStatus::Alert) => overview.alerts += 1,
                Some(BaselineStatus::Warning) => overview.warnings += 1,
                Some(BaselineStatus::Normal) | None => {}
            }
        }

        if overview.assessed > 0 {
            #[allow(clippy::cast_precision_loss)]
            let assessed = overview.assessed as f64;
            overview.average_performance = latest_sum / assessed;
        }
        overview
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AgeBand, ResultId};
    use crate::time::fixed_now;
    use chrono::Duration;

    fn result(id: u64, patient: u64, score: u32, days_ago: i64) -> AssessmentResult {
        AssessmentResult::from_persisted(
            ResultId::new(id),
            PatientId::new(patient),
            AgeBand::Adult,
            score,
            100,
            fixed_now() - Duration::days(days_ago),
        )
        .unwrap()
    }

    fn profiles(ids: &[u64]) -> HashMap<PatientId, PatientProfile> {
        ids.iter()
            .map(|id| {
                (
                    PatientId::new(*id),
                    PatientProfile {
                        name: format!("Patient {id}"),
                        age: 40,
                    },
                )
            })
            .collect()
    }

    fn trend_for(latest: u32, previous: u32) -> Trend {
        let results = vec![result(1, 1, previous, 2), result(2, 1, latest, 1)];
        analyze(&results, &profiles(&[1]))[0].trend
    }

    #[test]
    fn classification_fixtures() {
        assert_eq!(trend_for(80, 60), Trend::Up);
        assert_eq!(trend_for(60, 80), Trend::Down);
        assert_eq!(trend_for(82, 80), Trend::Stable);
        assert_eq!(trend_for(90, 80), Trend::Up);
    }

    #[test]
    fn threshold_is_exclusive() {
        assert_eq!(Trend::classify(&[85.0, 80.0]), Trend::Stable);
        assert_eq!(Trend::classify(&[75.0, 80.0]), Trend::Stable);
        assert_eq!(Trend::classify(&[85.5, 80.0]), Trend::Up);
        assert_eq!(Trend::classify(&[]), Trend::New);
    }

    #[test]
    fn only_two_most_recent_results_drive_trend() {
        // oldest 20 -> 80 -> latest 60 (descending order after sort: 60, 80, 20)
        let results = vec![result(1, 1, 20, 3), result(2, 1, 80, 2), result(3, 1, 60, 1)];
        let summary = &analyze(&results, &profiles(&[1]))[0];
        assert_eq!(summary.trend, Trend::Down);
        assert_eq!(summary.latest_score, 60.0);
        assert_eq!(summary.baseline_score, 20.0);
        assert!((summary.average_score - 160.0 / 3.0).abs() < 1e-9);
        let ids: Vec<_> = summary.assessments.iter().map(|r| r.id().value()).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn single_result_is_new_and_unassessed_patients_sort_last() {
        let results = vec![result(1, 2, 70, 5), result(2, 3, 50, 1), result(3, 3, 40, 2)];
        let summaries = analyze(&results, &profiles(&[1, 2, 3]));

        let order: Vec<_> = summaries.iter().map(|s| s.patient_id.value()).collect();
        assert_eq!(order, vec![3, 2, 1]);

        assert_eq!(summaries[1].trend, Trend::New);
        assert_eq!(summaries[1].latest_score, 70.0);

        let empty = &summaries[2];
        assert!(empty.assessments.is_empty());
        assert_eq!(empty.trend, Trend::New);
        assert_eq!(empty.latest_score, 0.0);
        assert_eq!(empty.average_score, 0.0);
    }

    #[test]
    fn results_for_unknown_patients_are_skipped() {
        let results = vec![result(1, 99, 70, 1), result(2, 1, 50, 1)];
        let summaries = analyze(&results, &profiles(&[1]));
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].assessments.len(), 1);
    }

    #[test]
    fn overview_counts_trends() {
        let results = vec![
            result(1, 1, 90, 1),
            result(2, 1, 60, 2),
            result(3, 2, 50, 1),
            result(4, 2, 80, 2),
            result(5, 3, 70, 1),
        ];
        let summaries = analyze(&results, &profiles(&[1, 2, 3, 4]));
        let overview = TrendOverview::from_summaries(&summaries);

        assert_eq!(overview.total_patients, 4);
        assert_eq!(overview.assessed, 3);
        assert_eq!(overview.improving, 1);
        assert_eq!(overview.declining, 1);
        assert_eq!(overview.new, 1);
        assert_eq!(overview.stable, 0);
        assert!((overview.average_performance - 70.0).abs() < 1e-9);
        // patient 2 fell from 80 to 50: 62.5 % of baseline
        assert_eq!(overview.alerts, 1);
        assert_eq!(overview.warnings, 0);
    }

    #[test]
    fn baseline_status_boundaries() {
        assert_eq!(BaselineStatus::classify(69.0, 100.0), BaselineStatus::Alert);
        assert_eq!(BaselineStatus::classify(70.0, 100.0), BaselineStatus::Warning);
        assert_eq!(BaselineStatus::classify(84.0, 100.0), BaselineStatus::Warning);
        assert_eq!(BaselineStatus::classify(85.0, 100.0), BaselineStatus::Normal);
        assert_eq!(BaselineStatus::classify(120.0, 100.0), BaselineStatus::Normal);
        assert_eq!(BaselineStatus::classify(0.0, 0.0), BaselineStatus::Normal);
    }

    #[test]
    fn summary_reports_drop_from_oldest_result() {
        let results = vec![result(1, 1, 85, 3), result(2, 1, 90, 2), result(3, 1, 58, 1)];
        let summaries = analyze(&results, &profiles(&[1, 2]));

        let declined = &summaries[0];
        assert_eq!(declined.baseline_score, 85.0);
        assert_eq!(declined.status, Some(BaselineStatus::Alert));
        assert_eq!(declined.below_baseline_pct, 32.0);

        let unassessed = &summaries[1];
        assert_eq!(unassessed.status, None);
        assert_eq!(unassessed.below_baseline_pct, 0.0);
    }
}
