//! Health report assembly
//!
//! A `HealthReport` bundles one pass: raw readings, normalized metrics,
//! findings and the aggregate. It is assembled once, checked for internal
//! consistency, and handed unchanged to every sink. Field order is the
//! serialization order, so two report files diff line for line.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::config::ThresholdsConfig;
use crate::error::{Result, VigilError};
use crate::metrics::{Category, MetricKind, NormalizedMetric, Reading};
use crate::scorer::CategoryFinding;

/// Overall verdict derived from the aggregate score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Good,
    NeedsAttention,
    Poor,
    Indeterminate,
}

impl Verdict {
    pub fn from_score(score: Option<u8>, thresholds: &ThresholdsConfig) -> Self {
        match score {
            None => Verdict::Indeterminate,
            Some(s) if s >= thresholds.verdict_good_at => Verdict::Good,
            Some(s) if s >= thresholds.verdict_attention_at => Verdict::NeedsAttention,
            Some(_) => Verdict::Poor,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Verdict::Good => "The system is in good condition.",
            Verdict::NeedsAttention => "Some areas need attention.",
            Verdict::Poor => {
                "The system is in poor condition. Professional inspection is recommended."
            }
            Verdict::Indeterminate => "Not enough sensor data to compute a health score.",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Good => write!(f, "Good"),
            Verdict::NeedsAttention => write!(f, "Needs attention"),
            Verdict::Poor => write!(f, "Poor"),
            Verdict::Indeterminate => write!(f, "Indeterminate"),
        }
    }
}

/// A network interface seen during the pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub name: String,
    pub mac_address: Option<String>,
    pub received_bytes: u64,
    pub transmitted_bytes: u64,
}

/// Static facts about the host, supplied by the sensor source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostInfo {
    pub hostname: Option<String>,
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    pub kernel_version: Option<String>,
    pub architecture: String,
    pub cpu_brand: Option<String>,
    pub cpu_cores: usize,
    pub cpu_frequency_mhz: Option<u64>,
    pub cpu_max_frequency_mhz: Option<u64>,
    pub total_memory_bytes: u64,
    pub total_swap_bytes: u64,
    pub uptime_secs: u64,
    pub network: Vec<NetworkInterface>,
}

/// One complete monitoring pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    timestamp: DateTime<Utc>,
    generated_at: DateTime<Utc>,
    score: Option<u8>,
    verdict: Verdict,
    findings: Vec<CategoryFinding>,
    metrics: Vec<NormalizedMetric>,
    readings: Vec<Reading>,
    #[serde(default)]
    host: Option<HostInfo>,
}

impl HealthReport {
    /// When the readings were collected
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// When the report was assembled
    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn score(&self) -> Option<u8> {
        self.score
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    pub fn findings(&self) -> &[CategoryFinding] {
        &self.findings
    }

    pub fn metrics(&self) -> &[NormalizedMetric] {
        &self.metrics
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn host(&self) -> Option<&HostInfo> {
        self.host.as_ref()
    }

    pub fn contributing_count(&self) -> usize {
        self.metrics.iter().filter(|m| m.contributed).count()
    }

    pub fn finding_for(&self, category: Category) -> Option<&CategoryFinding> {
        self.findings.iter().find(|f| f.category == category)
    }

    /// Attach host facts, consuming the report
    pub fn with_host(mut self, host: Option<HostInfo>) -> Self {
        self.host = host;
        self
    }
}

/// Builds reports, checking that the parts describe a single pass
#[derive(Debug, Clone, Default)]
pub struct ReportAssembler {
    thresholds: ThresholdsConfig,
}

impl ReportAssembler {
    pub fn new(thresholds: ThresholdsConfig) -> Self {
        Self { thresholds }
    }

    pub fn assemble(
        &self,
        readings: Vec<Reading>,
        normalized: Vec<NormalizedMetric>,
        score: Option<u8>,
        findings: Vec<CategoryFinding>,
        timestamp: DateTime<Utc>,
    ) -> Result<HealthReport> {
        check_consistency(&readings, &normalized, score, &findings)?;

        let mut readings = readings;
        let mut metrics = normalized;
        let mut findings = findings;
        readings.sort_by(|a, b| a.kind.cmp(&b.kind));
        metrics.sort_by(|a, b| a.kind.cmp(&b.kind));
        findings.sort_by(|a, b| a.category.cmp(&b.category));

        Ok(HealthReport {
            timestamp,
            generated_at: Utc::now(),
            score,
            verdict: Verdict::from_score(score, &self.thresholds),
            findings,
            metrics,
            readings,
            host: None,
        })
    }
}

/// Assemble with default verdict cut-offs
pub fn assemble(
    readings: Vec<Reading>,
    normalized: Vec<NormalizedMetric>,
    score: Option<u8>,
    findings: Vec<CategoryFinding>,
    timestamp: DateTime<Utc>,
) -> Result<HealthReport> {
    ReportAssembler::default().assemble(readings, normalized, score, findings, timestamp)
}

fn inconsistent(reason: String) -> VigilError {
    VigilError::InconsistentReportState(reason)
}

fn check_consistency(
    readings: &[Reading],
    normalized: &[NormalizedMetric],
    score: Option<u8>,
    findings: &[CategoryFinding],
) -> Result<()> {
    if normalized.len() < readings.len() {
        return Err(inconsistent(format!(
            "{} readings but only {} normalized metrics",
            readings.len(),
            normalized.len()
        )));
    }

    let mut reading_counts: BTreeMap<&MetricKind, usize> = BTreeMap::new();
    for r in readings {
        *reading_counts.entry(&r.kind).or_default() += 1;
    }
    let mut metric_counts: BTreeMap<&MetricKind, usize> = BTreeMap::new();
    for m in normalized {
        *metric_counts.entry(&m.kind).or_default() += 1;
    }
    if reading_counts != metric_counts {
        let missing: Vec<String> = reading_counts
            .keys()
            .filter(|k| !metric_counts.contains_key(*k))
            .map(|k| k.to_string())
            .collect();
        let extra: Vec<String> = metric_counts
            .keys()
            .filter(|k| !reading_counts.contains_key(*k))
            .map(|k| k.to_string())
            .collect();
        return Err(inconsistent(format!(
            "readings and metrics disagree on kinds (not normalized: [{}], without reading: [{}])",
            missing.join(", "),
            extra.join(", ")
        )));
    }

    let contributed = normalized.iter().any(|m| m.contributed);
    match score {
        Some(s) if s > 100 => {
            return Err(inconsistent(format!("score {} is outside [0, 100]", s)));
        }
        Some(_) if !contributed => {
            return Err(inconsistent(
                "numeric score without any contributing metric".to_string(),
            ));
        }
        None if contributed => {
            return Err(inconsistent(
                "indeterminate score although metrics contributed".to_string(),
            ));
        }
        _ => {}
    }

    let categories: BTreeSet<Category> = normalized.iter().map(|m| m.kind.category()).collect();
    for finding in findings {
        if score.is_none() && finding.is_insufficient_data() {
            continue;
        }
        if !categories.contains(&finding.category) {
            return Err(inconsistent(format!(
                "finding for {} has no corresponding metrics",
                finding.category
            )));
        }
    }

    Ok(())
}
