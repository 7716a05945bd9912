//! Configuration for a vigil pass.
//!
//! Loads settings from the first config.toml found on the search path or
//! uses defaults. Weights, curves and cut-offs all live here so scoring
//! policy can be tuned without a rebuild.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{Result, VigilError};
use crate::metrics::MetricKind;

/// System-wide config file path
pub const SYSTEM_CONFIG_PATH: &str = "/etc/vigil/config.toml";

/// Environment override for the config file path
pub const CONFIG_ENV: &str = "VIGIL_CONFIG";

/// Allowed drift of the weight sum from 1.0
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Per-kind weights, summing to 1.0 across everything that can contribute.
/// The disk weight is shared by all volumes in a pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_cpu_usage_weight")]
    pub cpu_usage: f64,

    #[serde(default = "default_cpu_temperature_weight")]
    pub cpu_temperature: f64,

    #[serde(default = "default_ram_usage_weight")]
    pub ram_usage: f64,

    #[serde(default = "default_disk_usage_weight")]
    pub disk_usage: f64,

    #[serde(default = "default_battery_level_weight")]
    pub battery_level: f64,

    /// Informational only; anything but 0 is rejected by validation
    #[serde(default)]
    pub battery_power_source: f64,

    #[serde(default = "default_gpu_usage_weight")]
    pub gpu_usage: f64,

    #[serde(default = "default_gpu_temperature_weight")]
    pub gpu_temperature: f64,

    #[serde(default = "default_os_update_age_weight")]
    pub os_update_age_days: f64,
}

fn default_cpu_usage_weight() -> f64 {
    0.30
}

fn default_cpu_temperature_weight() -> f64 {
    0.10
}

fn default_ram_usage_weight() -> f64 {
    0.20
}

fn default_disk_usage_weight() -> f64 {
    0.15
}

fn default_battery_level_weight() -> f64 {
    0.05
}

fn default_gpu_usage_weight() -> f64 {
    0.05
}

fn default_gpu_temperature_weight() -> f64 {
    0.05
}

fn default_os_update_age_weight() -> f64 {
    0.10
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            cpu_usage: default_cpu_usage_weight(),
            cpu_temperature: default_cpu_temperature_weight(),
            ram_usage: default_ram_usage_weight(),
            disk_usage: default_disk_usage_weight(),
            battery_level: default_battery_level_weight(),
            battery_power_source: 0.0,
            gpu_usage: default_gpu_usage_weight(),
            gpu_temperature: default_gpu_temperature_weight(),
            os_update_age_days: default_os_update_age_weight(),
        }
    }
}

impl WeightsConfig {
    /// Configured weight of a kind's whole family
    pub fn family_weight(&self, kind: &MetricKind) -> f64 {
        match kind {
            MetricKind::CpuUsage => self.cpu_usage,
            MetricKind::CpuTemperature => self.cpu_temperature,
            MetricKind::RamUsage => self.ram_usage,
            MetricKind::DiskUsage { .. } => self.disk_usage,
            MetricKind::BatteryLevel => self.battery_level,
            MetricKind::BatteryPowerSource => self.battery_power_source,
            MetricKind::GpuUsage => self.gpu_usage,
            MetricKind::GpuTemperature => self.gpu_temperature,
            MetricKind::OsUpdateAgeDays => self.os_update_age_days,
        }
    }

    fn entries(&self) -> [(&'static str, f64); 9] {
        [
            ("cpu_usage", self.cpu_usage),
            ("cpu_temperature", self.cpu_temperature),
            ("ram_usage", self.ram_usage),
            ("disk_usage", self.disk_usage),
            ("battery_level", self.battery_level),
            ("battery_power_source", self.battery_power_source),
            ("gpu_usage", self.gpu_usage),
            ("gpu_temperature", self.gpu_temperature),
            ("os_update_age_days", self.os_update_age_days),
        ]
    }

    pub fn total(&self) -> f64 {
        self.entries().iter().map(|(_, w)| w).sum()
    }
}

/// Normalization curves and finding cut-offs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdsConfig {
    /// At or below this temperature the score is 1.0
    #[serde(default = "default_temperature_safe")]
    pub temperature_safe_c: f64,

    /// Above this temperature the score is 0.0
    #[serde(default = "default_temperature_critical")]
    pub temperature_critical_c: f64,

    /// Score reached at exactly the critical temperature
    #[serde(default = "default_temperature_floor")]
    pub temperature_floor_score: f64,

    /// Update age (days) still considered fresh
    #[serde(default = "default_update_fresh_days")]
    pub update_fresh_days: f64,

    /// Update age (days) at which the score reaches 0.0
    #[serde(default = "default_update_stale_days")]
    pub update_stale_days: f64,

    /// A category is Critical if any metric scores below this
    #[serde(default = "default_critical_below")]
    pub critical_below: f64,

    /// A category is Warning if any metric scores below this
    #[serde(default = "default_warning_below")]
    pub warning_below: f64,

    /// Aggregate at or above which the system is in good condition
    #[serde(default = "default_verdict_good_at")]
    pub verdict_good_at: u8,

    /// Aggregate at or above which the system only needs attention
    #[serde(default = "default_verdict_attention_at")]
    pub verdict_attention_at: u8,
}

fn default_temperature_safe() -> f64 {
    60.0
}

fn default_temperature_critical() -> f64 {
    85.0
}

fn default_temperature_floor() -> f64 {
    0.2
}

fn default_update_fresh_days() -> f64 {
    30.0
}

fn default_update_stale_days() -> f64 {
    180.0
}

fn default_critical_below() -> f64 {
    0.2
}

fn default_warning_below() -> f64 {
    0.6
}

fn default_verdict_good_at() -> u8 {
    80
}

fn default_verdict_attention_at() -> u8 {
    50
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            temperature_safe_c: default_temperature_safe(),
            temperature_critical_c: default_temperature_critical(),
            temperature_floor_score: default_temperature_floor(),
            update_fresh_days: default_update_fresh_days(),
            update_stale_days: default_update_stale_days(),
            critical_below: default_critical_below(),
            warning_below: default_warning_below(),
            verdict_good_at: default_verdict_good_at(),
            verdict_attention_at: default_verdict_attention_at(),
        }
    }
}

impl ThresholdsConfig {
    fn float_entries(&self) -> [(&'static str, f64); 7] {
        [
            ("temperature_safe_c", self.temperature_safe_c),
            ("temperature_critical_c", self.temperature_critical_c),
            ("temperature_floor_score", self.temperature_floor_score),
            ("update_fresh_days", self.update_fresh_days),
            ("update_stale_days", self.update_stale_days),
            ("critical_below", self.critical_below),
            ("warning_below", self.warning_below),
        ]
    }
}

/// Time limits for one collection pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Per-metric timeout in milliseconds
    #[serde(default = "default_metric_timeout")]
    pub metric_timeout_ms: u64,

    /// Overall pass deadline in milliseconds
    #[serde(default = "default_pass_deadline")]
    pub pass_deadline_ms: u64,
}

fn default_metric_timeout() -> u64 {
    3_000
}

fn default_pass_deadline() -> u64 {
    8_000
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            metric_timeout_ms: default_metric_timeout(),
            pass_deadline_ms: default_pass_deadline(),
        }
    }
}

/// Where finished reports go
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Write a timestamped JSON report file for every pass
    #[serde(default = "default_write_log")]
    pub write_log: bool,

    /// Directory for report files
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn default_write_log() -> bool {
    true
}

fn default_log_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            write_log: default_write_log(),
            log_dir: default_log_dir(),
        }
    }
}

/// Full vigil configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VigilConfig {
    #[serde(default)]
    pub weights: WeightsConfig,

    #[serde(default)]
    pub thresholds: ThresholdsConfig,

    #[serde(default)]
    pub collection: CollectionConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

impl VigilConfig {
    /// Load the first valid config on the search path, or return defaults
    pub fn load() -> Self {
        for path in Self::candidate_paths() {
            if !path.exists() {
                continue;
            }
            match Self::load_from_path(&path) {
                Ok(config) => return config,
                Err(e) => warn!("Ignoring config {}: {}", path.display(), e),
            }
        }
        info!("No config file found, using defaults");
        VigilConfig::default()
    }

    /// Load and validate config from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: VigilConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Search order: $VIGIL_CONFIG, the user config dir, /etc
    pub fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            paths.push(PathBuf::from(path));
        }
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("vigil/config.toml"));
        }
        paths.push(PathBuf::from(SYSTEM_CONFIG_PATH));
        paths
    }

    /// Reject configs the scorer cannot honour
    pub fn validate(&self) -> Result<()> {
        for (name, weight) in self.weights.entries() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(VigilError::InvalidConfig(format!(
                    "weight {} must be a non-negative number, got {}",
                    name, weight
                )));
            }
        }
        if self.weights.battery_power_source != 0.0 {
            return Err(VigilError::InvalidConfig(
                "battery_power_source is informational and must have weight 0".to_string(),
            ));
        }
        let total = self.weights.total();
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(VigilError::InvalidConfig(format!(
                "weights must sum to 1.0, got {:.6}",
                total
            )));
        }

        let t = &self.thresholds;
        for (name, value) in t.float_entries() {
            if !value.is_finite() {
                return Err(VigilError::InvalidConfig(format!(
                    "threshold {} must be a finite number, got {}",
                    name, value
                )));
            }
        }
        if t.temperature_safe_c >= t.temperature_critical_c {
            return Err(VigilError::InvalidConfig(format!(
                "temperature_safe_c ({}) must be below temperature_critical_c ({})",
                t.temperature_safe_c, t.temperature_critical_c
            )));
        }
        if !(0.0..=1.0).contains(&t.temperature_floor_score) {
            return Err(VigilError::InvalidConfig(
                "temperature_floor_score must lie in [0, 1]".to_string(),
            ));
        }
        if t.update_fresh_days < 0.0 || t.update_fresh_days >= t.update_stale_days {
            return Err(VigilError::InvalidConfig(format!(
                "update_fresh_days ({}) must be non-negative and below update_stale_days ({})",
                t.update_fresh_days, t.update_stale_days
            )));
        }
        if !(0.0 <= t.critical_below && t.critical_below <= t.warning_below && t.warning_below <= 1.0)
        {
            return Err(VigilError::InvalidConfig(
                "finding cut-offs must satisfy 0 <= critical_below <= warning_below <= 1".to_string(),
            ));
        }
        if t.verdict_attention_at > t.verdict_good_at || t.verdict_good_at > 100 {
            return Err(VigilError::InvalidConfig(
                "verdict cut-offs must satisfy attention_at <= good_at <= 100".to_string(),
            ));
        }

        let c = &self.collection;
        if c.metric_timeout_ms == 0 || c.pass_deadline_ms == 0 {
            return Err(VigilError::InvalidConfig(
                "collection timeouts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save default config to path (for init)
    pub fn save_default(path: &Path) -> Result<()> {
        let content = VigilConfig::default().to_toml_string()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        info!("Saved default config to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = VigilConfig::default();
        config.validate().unwrap();
        assert!((config.weights.total() - 1.0).abs() < WEIGHT_SUM_TOLERANCE);
        assert_eq!(config.thresholds.temperature_safe_c, 60.0);
        assert_eq!(config.collection.pass_deadline_ms, 8_000);
    }

    #[test]
    fn test_parse_toml_partial() {
        let toml_str = r#"
[thresholds]
temperature_critical_c = 90.0

[collection]
metric_timeout_ms = 500
"#;
        let config = VigilConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.thresholds.temperature_critical_c, 90.0);
        assert_eq!(config.collection.metric_timeout_ms, 500);
        // Defaults for missing fields
        assert_eq!(config.thresholds.temperature_safe_c, 60.0);
        assert_eq!(config.weights, WeightsConfig::default());
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let toml_str = r#"
[weights]
cpu_usage = 0.5
"#;
        let err = VigilConfig::from_toml_str(toml_str).unwrap_err();
        assert!(matches!(err, VigilError::InvalidConfig(_)));
        assert!(err.to_string().contains("sum to 1.0"));
    }

    #[test]
    fn test_rejects_negative_weight_and_power_source_weight() {
        let mut config = VigilConfig::default();
        config.weights.gpu_usage = -0.05;
        config.weights.cpu_usage = 0.40;
        assert!(config.validate().is_err());

        let mut config = VigilConfig::default();
        config.weights.battery_power_source = 0.05;
        config.weights.battery_level = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_misordered_thresholds() {
        let mut config = VigilConfig::default();
        config.thresholds.temperature_safe_c = 90.0;
        assert!(config.validate().is_err());

        let mut config = VigilConfig::default();
        config.thresholds.critical_below = 0.7;
        assert!(config.validate().is_err());

        let mut config = VigilConfig::default();
        config.thresholds.update_stale_days = 10.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_finite_thresholds() {
        let mut config = VigilConfig::default();
        config.thresholds.warning_below = f64::NAN;
        assert!(matches!(config.validate(), Err(VigilError::InvalidConfig(_))));

        let mut config = VigilConfig::default();
        config.thresholds.temperature_critical_c = f64::INFINITY;
        assert!(config.validate().is_err());

        let err = VigilConfig::from_toml_str("[thresholds]\ntemperature_safe_c = nan\n").unwrap_err();
        assert!(matches!(err, VigilError::InvalidConfig(_)));
    }

    #[test]
    fn test_candidate_paths_use_user_config_dir() {
        let paths = VigilConfig::candidate_paths();
        assert_eq!(paths.last(), Some(&PathBuf::from(SYSTEM_CONFIG_PATH)));
        if let Some(dir) = dirs::config_dir() {
            assert!(paths.contains(&dir.join("vigil/config.toml")));
        }
    }

    #[test]
    fn test_family_weight_lookup() {
        let weights = WeightsConfig::default();
        assert_eq!(weights.family_weight(&MetricKind::CpuUsage), 0.30);
        assert_eq!(weights.family_weight(&MetricKind::disk("/home")), 0.15);
        assert_eq!(weights.family_weight(&MetricKind::BatteryPowerSource), 0.0);
    }

    #[test]
    fn test_toml_round_trip_and_save_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");
        VigilConfig::save_default(&path).unwrap();

        let loaded = VigilConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded, VigilConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let err = VigilConfig::from_toml_str("[weights\ncpu_usage = ").unwrap_err();
        assert!(matches!(err, VigilError::Toml(_)));
    }
}
