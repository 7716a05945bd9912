//! Seams between the pipeline and the outside world.
//!
//! A `SensorSource` turns metric kinds into readings for one host. A
//! `ReportSink` receives finished reports. Platform adapters and output
//! formats live in `vigilctl`; the snapshot source lives here because it
//! needs nothing but serde.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::Result;
use crate::metrics::{MetricKind, Reading};
use crate::report::{HealthReport, HostInfo};

/// Supplies raw readings for one host.
///
/// `read` is called once per kind from a blocking worker thread and may
/// take its time; the collector enforces timeouts. Missing hardware is
/// reported as an unavailable reading, never as a panic.
pub trait SensorSource: Send + Sync {
    fn name(&self) -> &str;

    /// Kinds this source will attempt, one per disk volume
    fn probes(&self) -> Vec<MetricKind>;

    fn read(&self, kind: &MetricKind) -> Reading;

    fn host_info(&self) -> Option<HostInfo> {
        None
    }
}

/// Renders or persists a finished report
pub trait ReportSink {
    fn name(&self) -> &str;

    fn publish(&self, report: &HealthReport) -> anyhow::Result<()>;
}

/// Captured reading set, as written by `vigilctl readings`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub captured_at: DateTime<Utc>,
    pub source: String,
    pub readings: Vec<Reading>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<HostInfo>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotFile {
    Full(Snapshot),
    Bare(Vec<Reading>),
}

/// Replays a fixed reading set
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    name: String,
    readings: Vec<Reading>,
    host: Option<HostInfo>,
}

impl SnapshotSource {
    pub fn new(readings: Vec<Reading>) -> Self {
        Self {
            name: "snapshot".to_string(),
            readings,
            host: None,
        }
    }

    pub fn with_host(mut self, host: HostInfo) -> Self {
        self.host = Some(host);
        self
    }

    /// Accepts a full `Snapshot` document or a bare array of readings
    pub fn from_json_str(content: &str) -> Result<Self> {
        let source = match serde_json::from_str::<SnapshotFile>(content)? {
            SnapshotFile::Full(snapshot) => Self {
                name: format!("snapshot of {}", snapshot.source),
                readings: snapshot.readings,
                host: snapshot.host,
            },
            SnapshotFile::Bare(readings) => Self::new(readings),
        };
        debug!("Loaded snapshot with {} readings", source.readings.len());
        Ok(source)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}

impl SensorSource for SnapshotSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn probes(&self) -> Vec<MetricKind> {
        let kinds: BTreeSet<MetricKind> = self.readings.iter().map(|r| r.kind.clone()).collect();
        kinds.into_iter().collect()
    }

    fn read(&self, kind: &MetricKind) -> Reading {
        self.readings
            .iter()
            .find(|r| &r.kind == kind)
            .cloned()
            .unwrap_or_else(|| Reading::unavailable(kind.clone(), "not present in snapshot"))
    }

    fn host_info(&self) -> Option<HostInfo> {
        self.host.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::PowerSource;

    #[test]
    fn test_snapshot_replays_readings() {
        let source = SnapshotSource::new(vec![
            Reading::number(MetricKind::CpuUsage, 12.0),
            Reading::power(PowerSource::OnBattery),
            Reading::number(MetricKind::CpuUsage, 99.0),
        ]);

        assert_eq!(source.probes().len(), 2);
        assert_eq!(
            source.read(&MetricKind::CpuUsage).numeric_value(),
            Some(12.0)
        );
        let missing = source.read(&MetricKind::GpuUsage);
        assert!(!missing.available);
        assert!(source.host_info().is_none());
    }

    #[test]
    fn test_snapshot_accepts_bare_array() {
        let json = r#"[
            {"kind": "ram_usage", "value": 40.0, "available": true},
            {"kind": "disk_usage:/home", "value": null, "available": false, "detail": "denied"}
        ]"#;
        let source = SnapshotSource::from_json_str(json).unwrap();
        assert_eq!(source.name(), "snapshot");
        assert_eq!(source.probes()[1], MetricKind::disk("/home"));
    }

    #[test]
    fn test_snapshot_document_round_trip() {
        let snapshot = Snapshot {
            captured_at: Utc::now(),
            source: "linux".to_string(),
            readings: vec![Reading::number(MetricKind::RamUsage, 40.0)],
            host: Some(HostInfo {
                hostname: Some("bench".to_string()),
                ..HostInfo::default()
            }),
        };
        let json = serde_json::to_string_pretty(&snapshot).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readings.json");
        std::fs::write(&path, json).unwrap();

        let source = SnapshotSource::load(&path).unwrap();
        assert_eq!(source.name(), "snapshot of linux");
        assert_eq!(
            source.host_info().and_then(|h| h.hostname),
            Some("bench".to_string())
        );
    }

    #[test]
    fn test_snapshot_rejects_garbage() {
        assert!(SnapshotSource::from_json_str("{\"nope\": 1}").is_err());
    }
}
