//! Error types for the vigil core.
//!
//! Missing sensors are never errors here: an unavailable metric is data
//! (`Reading::available == false`) and an empty contributing set is an
//! indeterminate score. Only contract violations and ambient failures
//! (config, I/O, serialization) surface as `VigilError`.

use thiserror::Error;

use crate::metrics::MetricKind;

#[derive(Error, Debug)]
pub enum VigilError {
    /// A reading reached the normalizer in a shape its kind cannot carry.
    #[error("Unsupported metric {kind}: {reason}")]
    UnsupportedMetric { kind: MetricKind, reason: String },

    /// The assembler was handed parts that do not describe one pass.
    #[error("Inconsistent report state: {0}")]
    InconsistentReportState(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML render error: {0}")]
    TomlRender(#[from] toml::ser::Error),
}

impl VigilError {
    pub fn unsupported(kind: &MetricKind, reason: impl Into<String>) -> Self {
        VigilError::UnsupportedMetric {
            kind: kind.clone(),
            reason: reason.into(),
        }
    }

    /// True for errors that indicate a bug rather than a runtime condition.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            VigilError::UnsupportedMetric { .. } | VigilError::InconsistentReportState(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, VigilError>;
