//! One collection pass over a sensor source.
//!
//! Each kind is read on the blocking pool under its own timeout, all of
//! them in parallel, and the pass as a whole has a deadline. Whatever is
//! late, panics or never answers becomes an unavailable reading. Reads
//! still running at the deadline are abandoned, not waited for.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::config::CollectionConfig;
use crate::metrics::{complete_reading_set, MetricKind, Reading};
use crate::report::HostInfo;
use crate::source::SensorSource;

/// Output of one pass
#[derive(Debug, Clone)]
pub struct Collection {
    /// When the pass started
    pub timestamp: DateTime<Utc>,
    /// Complete reading set, sorted by kind
    pub readings: Vec<Reading>,
    pub host: Option<HostInfo>,
}

impl Collection {
    pub fn unavailable_count(&self) -> usize {
        self.readings.iter().filter(|r| !r.available).count()
    }
}

#[derive(Debug, Clone)]
pub struct Collector {
    metric_timeout: Duration,
    pass_deadline: Duration,
}

impl Default for Collector {
    fn default() -> Self {
        Self::from_config(&CollectionConfig::default())
    }
}

impl Collector {
    pub fn new(metric_timeout: Duration, pass_deadline: Duration) -> Self {
        Self {
            metric_timeout,
            pass_deadline,
        }
    }

    pub fn from_config(config: &CollectionConfig) -> Self {
        Self::new(
            Duration::from_millis(config.metric_timeout_ms),
            Duration::from_millis(config.pass_deadline_ms),
        )
    }

    pub async fn collect(&self, source: Arc<dyn SensorSource>) -> Collection {
        let timestamp = Utc::now();
        let deadline = Instant::now() + self.pass_deadline;

        let kinds: BTreeSet<MetricKind> = enumerate_kinds(&source, deadline)
            .await
            .into_iter()
            .collect();
        info!("Collecting {} metrics from {}", kinds.len(), source.name());

        let mut pending: Vec<(MetricKind, JoinHandle<Reading>)> = Vec::with_capacity(kinds.len());
        for kind in kinds {
            let task = tokio::spawn(read_with_timeout(
                Arc::clone(&source),
                kind.clone(),
                self.metric_timeout,
            ));
            pending.push((kind, task));
        }

        let host_source = Arc::clone(&source);
        let host_task = tokio::task::spawn_blocking(move || host_source.host_info());

        let mut readings = Vec::with_capacity(pending.len());
        for (kind, mut task) in pending {
            let reading = match timeout_at(deadline, &mut task).await {
                Ok(Ok(reading)) => reading,
                Ok(Err(e)) => {
                    warn!("Collection task for {} failed: {}", kind, e);
                    Reading::unavailable(kind, "collection task failed")
                }
                Err(_) => {
                    task.abort();
                    warn!("Pass deadline reached before {} answered", kind);
                    Reading::unavailable(kind, "pass deadline exceeded")
                }
            };
            readings.push(reading);
        }

        let host = match timeout_at(deadline, host_task).await {
            Ok(Ok(host)) => host,
            Ok(Err(e)) => {
                warn!("Host information probe failed: {}", e);
                None
            }
            Err(_) => {
                warn!("Pass deadline reached before host information was read");
                None
            }
        };

        let readings = complete_reading_set(readings);
        let collection = Collection {
            timestamp,
            readings,
            host,
        };
        debug!(
            "Collected {} readings, {} unavailable",
            collection.readings.len(),
            collection.unavailable_count()
        );
        collection
    }
}

/// Ask the source which kinds to read without letting enumeration outlive
/// the pass. On failure every standard kind is attempted instead.
async fn enumerate_kinds(source: &Arc<dyn SensorSource>, deadline: Instant) -> Vec<MetricKind> {
    let listing = Arc::clone(source);
    let mut task = tokio::task::spawn_blocking(move || listing.probes());
    match timeout_at(deadline, &mut task).await {
        Ok(Ok(kinds)) => kinds,
        Ok(Err(e)) => {
            warn!("Kind enumeration for {} failed: {}", source.name(), e);
            MetricKind::standard_set(&[])
        }
        Err(_) => {
            task.abort();
            warn!("Pass deadline reached while {} enumerated kinds", source.name());
            MetricKind::standard_set(&[])
        }
    }
}

/// Read one kind on the blocking pool, bounded by `limit`
async fn read_with_timeout(
    source: Arc<dyn SensorSource>,
    kind: MetricKind,
    limit: Duration,
) -> Reading {
    let requested = kind.clone();
    match timeout(
        limit,
        tokio::task::spawn_blocking(move || source.read(&requested)),
    )
    .await
    {
        Ok(Ok(reading)) if reading.kind == kind => reading,
        Ok(Ok(reading)) => {
            warn!("Source answered {} with a {} reading", kind, reading.kind);
            Reading::unavailable(kind, format!("source returned {} instead", reading.kind))
        }
        Ok(Err(e)) if e.is_panic() => {
            warn!("Sensor read for {} panicked", kind);
            Reading::unavailable(kind, "sensor read panicked")
        }
        Ok(Err(e)) => {
            warn!("Sensor read for {} failed: {}", kind, e);
            Reading::unavailable(kind, "sensor read cancelled")
        }
        Err(_) => {
            warn!("Sensor read for {} timed out", kind);
            Reading::unavailable(
                kind,
                format!("timed out after {} ms", limit.as_millis()),
            )
        }
    }
}
