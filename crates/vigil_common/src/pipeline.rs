//! Collector -> Normalizer -> Scorer -> Assembler, once per invocation.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::collector::Collector;
use crate::config::VigilConfig;
use crate::error::Result;
use crate::metrics::{complete_reading_set, Reading};
use crate::normalizer::Normalizer;
use crate::report::{HealthReport, ReportAssembler};
use crate::scorer::Scorer;
use crate::source::{ReportSink, SensorSource};

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    collector: Collector,
    normalizer: Normalizer,
    scorer: Scorer,
    assembler: ReportAssembler,
}

impl Pipeline {
    pub fn new(config: &VigilConfig) -> Self {
        Self {
            collector: Collector::from_config(&config.collection),
            normalizer: Normalizer::new(config.weights.clone(), config.thresholds.clone()),
            scorer: Scorer::new(config.thresholds.clone()),
            assembler: ReportAssembler::new(config.thresholds.clone()),
        }
    }

    pub fn collector(&self) -> &Collector {
        &self.collector
    }

    /// Collect from `source` and evaluate the result
    pub async fn run(&self, source: Arc<dyn SensorSource>) -> Result<HealthReport> {
        let collection = self.collector.collect(source).await;
        let report = self.evaluate(collection.readings, collection.timestamp)?;
        Ok(report.with_host(collection.host))
    }

    /// Score an already-collected reading set. Pure apart from the
    /// assembly timestamp.
    pub fn evaluate(&self, readings: Vec<Reading>, timestamp: DateTime<Utc>) -> Result<HealthReport> {
        let readings = complete_reading_set(readings);
        let normalized = self.normalizer.normalize_all(&readings)?;
        let outcome = self.scorer.score(&normalized);

        match outcome.score {
            Some(score) => info!("Health score {} from {} readings", score, readings.len()),
            None => warn!("No metric contributed, health score is indeterminate"),
        }

        self.assembler
            .assemble(readings, normalized, outcome.score, outcome.findings, timestamp)
    }
}

/// Hand the report to every sink. A failing sink does not stop the others;
/// the first failure is returned once all have run.
pub fn publish(report: &HealthReport, sinks: &[Box<dyn ReportSink>]) -> anyhow::Result<()> {
    let mut first_error = None;
    for sink in sinks {
        match sink.publish(report) {
            Ok(()) => info!("Published report to {}", sink.name()),
            Err(e) => {
                warn!("Sink {} failed: {:#}", sink.name(), e);
                if first_error.is_none() {
                    first_error = Some(e.context(format!("sink {} failed", sink.name())));
                }
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricKind;
    use crate::report::Verdict;
    use crate::source::SnapshotSource;
    use std::sync::Mutex;

    struct RecordingSink {
        seen: Arc<Mutex<Vec<Option<u8>>>>,
        fail: bool,
    }

    impl ReportSink for RecordingSink {
        fn name(&self) -> &str {
            if self.fail {
                "broken"
            } else {
                "recording"
            }
        }

        fn publish(&self, report: &HealthReport) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("disk full");
            }
            self.seen.lock().unwrap().push(report.score());
            Ok(())
        }
    }

    #[test]
    fn test_evaluate_fills_missing_kinds() {
        let pipeline = Pipeline::default();
        let report = pipeline
            .evaluate(vec![Reading::number(MetricKind::CpuUsage, 0.0)], Utc::now())
            .unwrap();
        assert_eq!(report.readings().len(), 9);
        assert_eq!(report.metrics().len(), 9);
        assert_eq!(report.score(), Some(100));
        assert_eq!(report.verdict(), Verdict::Good);
    }

    #[tokio::test]
    async fn test_run_attaches_host() {
        let source = SnapshotSource::new(vec![Reading::number(MetricKind::RamUsage, 30.0)])
            .with_host(crate::report::HostInfo {
                hostname: Some("replay".to_string()),
                ..Default::default()
            });
        let report = Pipeline::default().run(Arc::new(source)).await.unwrap();
        assert_eq!(report.score(), Some(70));
        assert_eq!(
            report.host().and_then(|h| h.hostname.as_deref()),
            Some("replay")
        );
    }

    #[test]
    fn test_publish_reaches_every_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sinks: Vec<Box<dyn ReportSink>> = vec![
            Box::new(RecordingSink {
                seen: Arc::clone(&seen),
                fail: true,
            }),
            Box::new(RecordingSink {
                seen: Arc::clone(&seen),
                fail: false,
            }),
        ];
        let report = Pipeline::default().evaluate(vec![], Utc::now()).unwrap();

        let err = publish(&report, &sinks).unwrap_err();
        assert!(format!("{:#}", err).contains("disk full"));
        assert_eq!(seen.lock().unwrap().as_slice(), &[None]);
    }
}
