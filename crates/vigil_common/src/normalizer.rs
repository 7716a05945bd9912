//! Normalizer - raw readings onto the unit interval
//!
//! Every kind maps to a score in [0, 1] where 1.0 is healthy. Unavailable
//! readings are kept but marked as not contributing, so a missing sensor
//! never drags the aggregate down.

use tracing::debug;

use crate::config::{ThresholdsConfig, WeightsConfig};
use crate::error::{Result, VigilError};
use crate::metrics::{MetricKind, NormalizedMetric, PowerSource, Reading, ReadingValue};

/// Stateless reading-to-score mapper
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    weights: WeightsConfig,
    thresholds: ThresholdsConfig,
}

impl Normalizer {
    pub fn new(weights: WeightsConfig, thresholds: ThresholdsConfig) -> Self {
        Self {
            weights,
            thresholds,
        }
    }

    /// Normalize one reading in isolation.
    ///
    /// The weight is the kind's full family weight; `normalize_all` splits
    /// the disk weight across volumes and applies the battery-on-mains rule.
    pub fn normalize(&self, reading: &Reading) -> Result<NormalizedMetric> {
        let kind = &reading.kind;
        let weight = self.weights.family_weight(kind);

        if !reading.available {
            return Ok(NormalizedMetric::excluded(kind.clone(), weight, None));
        }

        let value = reading
            .value
            .ok_or_else(|| VigilError::unsupported(kind, "available reading without a value"))?;

        if let MetricKind::BatteryPowerSource = kind {
            return match value {
                ReadingValue::Power(_) => Ok(NormalizedMetric::excluded(kind.clone(), 0.0, None)),
                ReadingValue::Number(_) => Err(VigilError::unsupported(
                    kind,
                    "expected a power source, got a number",
                )),
            };
        }

        let raw = match value {
            ReadingValue::Number(v) if v.is_finite() => v,
            ReadingValue::Number(v) => {
                return Err(VigilError::unsupported(
                    kind,
                    format!("non-finite value {}", v),
                ))
            }
            ReadingValue::Power(p) => {
                return Err(VigilError::unsupported(
                    kind,
                    format!("expected a number, got power source '{}'", p),
                ))
            }
        };

        let score = match kind {
            MetricKind::CpuUsage
            | MetricKind::RamUsage
            | MetricKind::GpuUsage
            | MetricKind::DiskUsage { .. } => usage_score(raw),
            MetricKind::CpuTemperature | MetricKind::GpuTemperature => self.temperature_score(raw),
            MetricKind::BatteryLevel => clamp_unit(raw / 100.0),
            MetricKind::OsUpdateAgeDays => self.update_age_score(raw),
            MetricKind::BatteryPowerSource => {
                return Ok(NormalizedMetric::excluded(kind.clone(), 0.0, None))
            }
        };

        Ok(NormalizedMetric {
            kind: kind.clone(),
            score,
            weight,
            contributed: true,
            raw: Some(raw),
        })
    }

    /// Normalize a whole pass.
    ///
    /// Output order matches input order. A battery level is excluded when
    /// an available power-source reading says the machine is plugged in.
    pub fn normalize_all(&self, readings: &[Reading]) -> Result<Vec<NormalizedMetric>> {
        let plugged_in = readings.iter().any(|r| {
            r.available
                && r.kind == MetricKind::BatteryPowerSource
                && r.value.and_then(|v| v.as_power()) == Some(PowerSource::PluggedIn)
        });

        let mut out = readings
            .iter()
            .map(|r| self.normalize(r))
            .collect::<Result<Vec<_>>>()?;

        // Only contributing volumes share the disk weight
        let volumes = out
            .iter()
            .filter(|m| m.contributed && matches!(m.kind, MetricKind::DiskUsage { .. }))
            .count()
            .max(1);

        for metric in &mut out {
            if let MetricKind::DiskUsage { .. } = metric.kind {
                metric.weight /= volumes as f64;
            }

            if metric.kind == MetricKind::BatteryLevel && metric.contributed && plugged_in {
                debug!("Battery on mains power, excluding level from the score");
                metric.contributed = false;
                metric.score = 0.0;
            }
        }
        Ok(out)
    }

    /// Safe / decay / critical curve shared by CPU and GPU temperatures
    pub fn temperature_score(&self, celsius: f64) -> f64 {
        let t = &self.thresholds;
        if celsius <= t.temperature_safe_c {
            1.0
        } else if celsius <= t.temperature_critical_c {
            let span = t.temperature_critical_c - t.temperature_safe_c;
            let progress = (celsius - t.temperature_safe_c) / span;
            clamp_unit(1.0 - (1.0 - t.temperature_floor_score) * progress)
        } else {
            0.0
        }
    }

    /// Full marks while fresh, linear decay to zero once stale
    pub fn update_age_score(&self, days: f64) -> f64 {
        let t = &self.thresholds;
        if days <= t.update_fresh_days {
            1.0
        } else if days >= t.update_stale_days {
            0.0
        } else {
            clamp_unit(1.0 - (days - t.update_fresh_days) / (t.update_stale_days - t.update_fresh_days))
        }
    }
}

/// Higher utilisation, lower score
fn usage_score(percent: f64) -> f64 {
    clamp_unit(1.0 - percent / 100.0)
}

fn clamp_unit(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}
