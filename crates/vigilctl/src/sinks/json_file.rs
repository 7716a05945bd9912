//! JSON sinks: timestamped report files and stdout

use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use vigil_common::{HealthReport, ReportSink};

const FILE_PREFIX: &str = "system_health_report_";

/// `system_health_report_<YYYY-MM-DD_HH-MM-SS>.json` for the collection time
pub fn report_file_name(report: &HealthReport) -> String {
    format!(
        "{}{}.json",
        FILE_PREFIX,
        report.timestamp().format("%Y-%m-%d_%H-%M-%S")
    )
}

/// Writes each report as pretty JSON into a directory
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the report and return the file path
    pub fn write(&self, report: &HealthReport) -> anyhow::Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("cannot create report directory {}", self.dir.display()))?;

        let path = self.dir.join(report_file_name(report));
        let json = serde_json::to_string_pretty(report)?;
        fs::write(&path, json + "\n")
            .with_context(|| format!("cannot write {}", path.display()))?;
        Ok(path)
    }
}

impl ReportSink for JsonFileSink {
    fn name(&self) -> &str {
        "json-file"
    }

    fn publish(&self, report: &HealthReport) -> anyhow::Result<()> {
        let path = self.write(report)?;
        info!("Report saved to {}", path.display());
        Ok(())
    }
}

/// Prints the report as pretty JSON on stdout
pub struct JsonStdoutSink;

impl ReportSink for JsonStdoutSink {
    fn name(&self) -> &str {
        "json-stdout"
    }

    fn publish(&self, report: &HealthReport) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(report)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use vigil_common::{MetricKind, Pipeline, Reading};

    fn report() -> HealthReport {
        Pipeline::default()
            .evaluate(
                vec![Reading::number(MetricKind::RamUsage, 35.0)],
                Utc.with_ymd_and_hms(2025, 1, 9, 14, 5, 7).unwrap(),
            )
            .unwrap()
    }

    #[test]
    fn test_file_name_uses_collection_time() {
        assert_eq!(
            report_file_name(&report()),
            "system_health_report_2025-01-09_14-05-07.json"
        );
    }

    #[test]
    fn test_write_creates_directory_and_file() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(tmp.path().join("reports"));
        let report = report();

        let path = sink.write(&report).unwrap();
        assert!(path.ends_with("system_health_report_2025-01-09_14-05-07.json"));

        let content = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["score"], 65);
        assert_eq!(value["verdict"], "needs_attention");
        assert_eq!(value["readings"].as_array().unwrap().len(), 9);
    }

    #[test]
    fn test_publish_fails_on_unwritable_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        fs::write(&blocker, "x").unwrap();

        let sink = JsonFileSink::new(&blocker);
        assert!(sink.publish(&report()).is_err());
    }
}
