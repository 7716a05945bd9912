//! Scorer - weighted aggregate and per-category findings
//!
//! Only contributing metrics count. Their weights are renormalized over
//! the contributing subset, so a desktop without a battery is scored on
//! what it has rather than penalized for what it lacks. Metrics are sorted
//! by kind before any floating-point accumulation, making the result
//! independent of input order.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::config::ThresholdsConfig;
use crate::metrics::{Category, MetricKind, NormalizedMetric};

/// Message of the advisory finding emitted when nothing contributed
pub const INSUFFICIENT_DATA_MESSAGE: &str =
    "Insufficient data: no metric could be read on this host";

/// Severity of a category finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FindingStatus {
    Good,
    Warning,
    Critical,
}

impl fmt::Display for FindingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FindingStatus::Good => write!(f, "Good"),
            FindingStatus::Warning => write!(f, "Warning"),
            FindingStatus::Critical => write!(f, "Critical"),
        }
    }
}

/// Verdict for one category, derived from that category's own metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFinding {
    pub category: Category,
    pub status: FindingStatus,
    pub message: String,
}

impl CategoryFinding {
    pub fn new(category: Category, status: FindingStatus, message: impl Into<String>) -> Self {
        Self {
            category,
            status,
            message: message.into(),
        }
    }

    pub fn insufficient_data() -> Self {
        Self::new(
            Category::System,
            FindingStatus::Warning,
            INSUFFICIENT_DATA_MESSAGE,
        )
    }

    pub fn is_insufficient_data(&self) -> bool {
        self.category == Category::System
            && self.status == FindingStatus::Warning
            && self.message == INSUFFICIENT_DATA_MESSAGE
    }
}

/// Result of scoring one pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreOutcome {
    /// Aggregate in [0, 100]; `None` when nothing contributed
    pub score: Option<u8>,

    /// Findings ordered by category
    pub findings: Vec<CategoryFinding>,
}

/// Combines normalized metrics into one health score
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    thresholds: ThresholdsConfig,
}

impl Scorer {
    pub fn new(thresholds: ThresholdsConfig) -> Self {
        Self { thresholds }
    }

    pub fn score(&self, metrics: &[NormalizedMetric]) -> ScoreOutcome {
        let contributing = sorted_contributing(metrics);

        if contributing.is_empty() {
            debug!("No contributing metrics, score is indeterminate");
            return ScoreOutcome {
                score: None,
                findings: vec![CategoryFinding::insufficient_data()],
            };
        }

        let score = aggregate(&contributing);

        let mut by_category: BTreeMap<Category, Vec<&NormalizedMetric>> = BTreeMap::new();
        for metric in contributing.iter().copied() {
            by_category
                .entry(metric.kind.category())
                .or_default()
                .push(metric);
        }

        let findings = by_category
            .into_iter()
            .map(|(category, metrics)| self.category_finding(category, &metrics))
            .collect();

        ScoreOutcome {
            score: Some(score),
            findings,
        }
    }

    /// Status for a single metric score
    pub fn status_for(&self, score: f64) -> FindingStatus {
        if score < self.thresholds.critical_below {
            FindingStatus::Critical
        } else if score < self.thresholds.warning_below {
            FindingStatus::Warning
        } else {
            FindingStatus::Good
        }
    }

    fn category_finding(&self, category: Category, metrics: &[&NormalizedMetric]) -> CategoryFinding {
        // Sorted by kind already; the first lowest score wins ties
        let worst = metrics
            .iter()
            .copied()
            .reduce(|worst, m| if m.score < worst.score { m } else { worst });

        let Some(worst) = worst else {
            return CategoryFinding::new(category, FindingStatus::Good, format!("{} healthy", category));
        };

        let status = self.status_for(worst.score);
        let message = match status {
            FindingStatus::Critical => format!(
                "{} is critical (score {:.2})",
                describe(worst),
                worst.score
            ),
            FindingStatus::Warning => format!(
                "{} needs attention (score {:.2})",
                describe(worst),
                worst.score
            ),
            FindingStatus::Good if metrics.len() == 1 => {
                format!("{} is within normal range", describe(worst))
            }
            FindingStatus::Good => format!(
                "All {} {} metrics within normal range (lowest: {})",
                metrics.len(),
                category,
                describe(worst)
            ),
        };

        CategoryFinding::new(category, status, message)
    }
}

/// Weights after renormalization over the contributing subset, in kind order.
/// Falls back to equal shares when every contributing weight is zero.
pub fn effective_weights(metrics: &[NormalizedMetric]) -> Vec<(MetricKind, f64)> {
    let contributing = sorted_contributing(metrics);
    let shares = shares(&contributing);
    contributing
        .iter()
        .zip(shares)
        .map(|(m, w)| (m.kind.clone(), w))
        .collect()
}

fn sorted_contributing(metrics: &[NormalizedMetric]) -> Vec<&NormalizedMetric> {
    let mut contributing: Vec<&NormalizedMetric> =
        metrics.iter().filter(|m| m.contributed).collect();
    contributing.sort_by(|a, b| compare_metrics(a, b));
    contributing
}

fn compare_metrics(a: &NormalizedMetric, b: &NormalizedMetric) -> Ordering {
    a.kind
        .cmp(&b.kind)
        .then(a.score.total_cmp(&b.score))
        .then(a.weight.total_cmp(&b.weight))
}

fn shares(sorted: &[&NormalizedMetric]) -> Vec<f64> {
    let total: f64 = sorted.iter().map(|m| m.weight).sum();
    if total > 0.0 {
        sorted.iter().map(|m| m.weight / total).collect()
    } else {
        let equal = 1.0 / sorted.len() as f64;
        vec![equal; sorted.len()]
    }
}

/// round_half_up(100 x sum(share x score)), clamped to [0, 100]
fn aggregate(sorted: &[&NormalizedMetric]) -> u8 {
    let weighted: f64 = sorted
        .iter()
        .zip(shares(sorted))
        .map(|(m, share)| share * m.score)
        .sum();
    let rounded = (100.0 * weighted + 0.5).floor();
    rounded.clamp(0.0, 100.0) as u8
}

fn describe(metric: &NormalizedMetric) -> String {
    match (&metric.kind, metric.raw) {
        (MetricKind::OsUpdateAgeDays, Some(days)) => format!("Last OS update {:.0} days ago", days),
        (kind, Some(raw)) => format!("{} at {}", kind.label(), kind.format_value(raw)),
        (kind, None) => kind.label(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn metric(kind: MetricKind, score: f64, weight: f64) -> NormalizedMetric {
        NormalizedMetric {
            kind,
            score,
            weight,
            contributed: true,
            raw: Some((1.0 - score) * 100.0),
        }
    }

    #[test]
    fn test_effective_weights_renormalize() {
        let metrics = vec![
            metric(MetricKind::CpuUsage, 0.5, 0.3),
            metric(MetricKind::RamUsage, 0.5, 0.2),
            NormalizedMetric::excluded(MetricKind::GpuUsage, 0.5, None),
        ];
        let weights = effective_weights(&metrics);
        assert_eq!(weights.len(), 2);
        assert_eq!(weights[0].0, MetricKind::CpuUsage);
        assert_abs_diff_eq!(weights[0].1, 0.6, epsilon = 1e-12);
        assert_abs_diff_eq!(weights[1].1, 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_input_is_indeterminate() {
        let outcome = Scorer::default().score(&[]);
        assert_eq!(outcome.score, None);
        assert_eq!(outcome.findings.len(), 1);
        assert!(outcome.findings[0].is_insufficient_data());
    }

    #[test]
    fn test_all_excluded_is_indeterminate() {
        let metrics = vec![
            NormalizedMetric::excluded(MetricKind::CpuUsage, 0.3, None),
            NormalizedMetric::excluded(MetricKind::BatteryLevel, 0.05, Some(40.0)),
        ];
        let outcome = Scorer::default().score(&metrics);
        assert_eq!(outcome.score, None);
        assert_eq!(outcome.findings, vec![CategoryFinding::insufficient_data()]);
    }

    #[test]
    fn test_round_half_up() {
        // 0.125 * 100 = 12.5 exactly, rounds up
        let metrics = vec![metric(MetricKind::CpuUsage, 0.125, 1.0)];
        assert_eq!(Scorer::default().score(&metrics).score, Some(13));

        let metrics = vec![metric(MetricKind::CpuUsage, 1.0, 0.3)];
        assert_eq!(Scorer::default().score(&metrics).score, Some(100));

        let metrics = vec![metric(MetricKind::CpuUsage, 0.0, 0.3)];
        assert_eq!(Scorer::default().score(&metrics).score, Some(0));
    }

    #[test]
    fn test_zero_weights_fall_back_to_equal_shares() {
        let metrics = vec![
            metric(MetricKind::CpuUsage, 1.0, 0.0),
            metric(MetricKind::RamUsage, 0.0, 0.0),
        ];
        assert_eq!(Scorer::default().score(&metrics).score, Some(50));
    }

    #[test]
    fn test_status_thresholds() {
        let scorer = Scorer::default();
        assert_eq!(scorer.status_for(0.19), FindingStatus::Critical);
        assert_eq!(scorer.status_for(0.2), FindingStatus::Warning);
        assert_eq!(scorer.status_for(0.5), FindingStatus::Warning);
        assert_eq!(scorer.status_for(0.6), FindingStatus::Good);
    }

    #[test]
    fn test_category_uses_worst_metric() {
        let metrics = vec![
            metric(MetricKind::CpuUsage, 0.9, 0.3),
            metric(MetricKind::CpuTemperature, 0.1, 0.1),
            metric(MetricKind::RamUsage, 0.8, 0.2),
        ];
        let outcome = Scorer::default().score(&metrics);
        assert_eq!(outcome.findings.len(), 2);
        assert_eq!(outcome.findings[0].category, Category::Cpu);
        assert_eq!(outcome.findings[0].status, FindingStatus::Critical);
        assert!(outcome.findings[0].message.contains("CPU temperature"));
        assert_eq!(outcome.findings[1].category, Category::Memory);
        assert_eq!(outcome.findings[1].status, FindingStatus::Good);
    }

    #[test]
    fn test_category_without_contributors_is_omitted() {
        let metrics = vec![
            metric(MetricKind::RamUsage, 0.8, 0.2),
            NormalizedMetric::excluded(MetricKind::GpuUsage, 0.05, None),
        ];
        let outcome = Scorer::default().score(&metrics);
        assert_eq!(outcome.findings.len(), 1);
        assert!(outcome.findings.iter().all(|f| f.category != Category::Gpu));
    }

    #[test]
    fn test_order_independence() {
        let metrics = vec![
            metric(MetricKind::CpuUsage, 0.37, 0.3),
            metric(MetricKind::disk("/home"), 0.11, 0.075),
            metric(MetricKind::RamUsage, 0.73, 0.2),
            metric(MetricKind::disk("/"), 0.59, 0.075),
            metric(MetricKind::OsUpdateAgeDays, 0.91, 0.1),
        ];
        let scorer = Scorer::default();
        let expected = scorer.score(&metrics);

        let mut reversed = metrics.clone();
        reversed.reverse();
        assert_eq!(scorer.score(&reversed), expected);

        let mut rotated = metrics.clone();
        rotated.rotate_left(2);
        assert_eq!(scorer.score(&rotated), expected);
    }

    #[test]
    fn test_os_update_message() {
        let metrics = vec![NormalizedMetric {
            kind: MetricKind::OsUpdateAgeDays,
            score: 0.0,
            weight: 0.1,
            contributed: true,
            raw: Some(200.0),
        }];
        let outcome = Scorer::default().score(&metrics);
        assert_eq!(outcome.findings[0].category, Category::System);
        assert_eq!(
            outcome.findings[0].message,
            "Last OS update 200 days ago is critical (score 0.00)"
        );
    }
}
