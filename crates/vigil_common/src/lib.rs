//! Vigil Common - health telemetry types, normalization and scoring.
//!
//! Sensor Source -> Normalizer -> Scorer -> Report Assembler -> Report Sink.
//! Platform adapters and sinks live in `vigilctl`; everything here is
//! host-independent.

pub mod collector;
pub mod config;
pub mod error;
pub mod metrics;
pub mod normalizer;
pub mod pipeline;
pub mod report;
pub mod scorer;
pub mod source;

pub use collector::{Collection, Collector};
pub use config::VigilConfig;
pub use error::{Result, VigilError};
pub use metrics::*;
pub use normalizer::Normalizer;
pub use pipeline::{publish, Pipeline};
pub use report::{assemble, HealthReport, HostInfo, NetworkInterface, ReportAssembler, Verdict};
pub use scorer::{CategoryFinding, FindingStatus, ScoreOutcome, Scorer};
pub use source::{ReportSink, SensorSource, Snapshot, SnapshotSource};
