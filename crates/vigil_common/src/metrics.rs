//! Metric vocabulary shared by sources, the normalizer, the scorer and sinks.
//!
//! The set of metric kinds is closed. Every pass produces one reading per
//! kind (one per volume for disk usage), whether or not the host could
//! supply a value.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Volume used for the disk reading when no volume could be enumerated.
pub const PLACEHOLDER_VOLUME: &str = "/";

/// Whether the machine is drawing external power
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerSource {
    PluggedIn,
    OnBattery,
}

impl fmt::Display for PowerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerSource::PluggedIn => write!(f, "Plugged In"),
            PowerSource::OnBattery => write!(f, "On Battery"),
        }
    }
}

/// Raw value carried by a reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReadingValue {
    Number(f64),
    Power(PowerSource),
}

impl ReadingValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ReadingValue::Number(v) => Some(*v),
            ReadingValue::Power(_) => None,
        }
    }

    pub fn as_power(&self) -> Option<PowerSource> {
        match self {
            ReadingValue::Power(p) => Some(*p),
            ReadingValue::Number(_) => None,
        }
    }
}

/// Report category a metric rolls up into
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "CPU")]
    Cpu,
    Memory,
    Disk,
    Battery,
    #[serde(rename = "GPU")]
    Gpu,
    System,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Cpu,
        Category::Memory,
        Category::Disk,
        Category::Battery,
        Category::Gpu,
        Category::System,
    ];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Cpu => write!(f, "CPU"),
            Category::Memory => write!(f, "Memory"),
            Category::Disk => write!(f, "Disk"),
            Category::Battery => write!(f, "Battery"),
            Category::Gpu => write!(f, "GPU"),
            Category::System => write!(f, "System"),
        }
    }
}

/// One fixed kind of host telemetry.
///
/// Ordering follows declaration order, then volume name, and is what the
/// scorer sorts by to stay independent of input order. Serialized as a
/// flat string (`"cpu_usage"`, `"disk_usage:/home"`) so report files diff
/// cleanly.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum MetricKind {
    CpuUsage,
    CpuTemperature,
    RamUsage,
    DiskUsage { volume: String },
    BatteryLevel,
    BatteryPowerSource,
    GpuUsage,
    GpuTemperature,
    OsUpdateAgeDays,
}

impl MetricKind {
    /// Every kind except disk usage, which is enumerated per volume
    pub const SINGLETONS: [MetricKind; 8] = [
        MetricKind::CpuUsage,
        MetricKind::CpuTemperature,
        MetricKind::RamUsage,
        MetricKind::BatteryLevel,
        MetricKind::BatteryPowerSource,
        MetricKind::GpuUsage,
        MetricKind::GpuTemperature,
        MetricKind::OsUpdateAgeDays,
    ];

    pub fn disk(volume: impl Into<String>) -> Self {
        MetricKind::DiskUsage {
            volume: volume.into(),
        }
    }

    /// The full kind set for a host with the given volumes, in order.
    /// An empty volume list yields the placeholder volume.
    pub fn standard_set(volumes: &[String]) -> Vec<MetricKind> {
        let mut kinds: Vec<MetricKind> = Self::SINGLETONS.to_vec();
        if volumes.is_empty() {
            kinds.push(MetricKind::disk(PLACEHOLDER_VOLUME));
        } else {
            let unique: BTreeSet<&String> = volumes.iter().collect();
            kinds.extend(unique.into_iter().map(|v| MetricKind::disk(v.clone())));
        }
        kinds.sort();
        kinds
    }

    pub fn category(&self) -> Category {
        match self {
            MetricKind::CpuUsage | MetricKind::CpuTemperature => Category::Cpu,
            MetricKind::RamUsage => Category::Memory,
            MetricKind::DiskUsage { .. } => Category::Disk,
            MetricKind::BatteryLevel | MetricKind::BatteryPowerSource => Category::Battery,
            MetricKind::GpuUsage | MetricKind::GpuTemperature => Category::Gpu,
            MetricKind::OsUpdateAgeDays => Category::System,
        }
    }

    /// Stable identifier without the volume suffix
    pub fn id(&self) -> &'static str {
        match self {
            MetricKind::CpuUsage => "cpu_usage",
            MetricKind::CpuTemperature => "cpu_temperature",
            MetricKind::RamUsage => "ram_usage",
            MetricKind::DiskUsage { .. } => "disk_usage",
            MetricKind::BatteryLevel => "battery_level",
            MetricKind::BatteryPowerSource => "battery_power_source",
            MetricKind::GpuUsage => "gpu_usage",
            MetricKind::GpuTemperature => "gpu_temperature",
            MetricKind::OsUpdateAgeDays => "os_update_age_days",
        }
    }

    /// Human label for reports
    pub fn label(&self) -> String {
        match self {
            MetricKind::CpuUsage => "CPU usage".to_string(),
            MetricKind::CpuTemperature => "CPU temperature".to_string(),
            MetricKind::RamUsage => "Memory usage".to_string(),
            MetricKind::DiskUsage { volume } => format!("Disk usage on {}", volume),
            MetricKind::BatteryLevel => "Battery level".to_string(),
            MetricKind::BatteryPowerSource => "Power source".to_string(),
            MetricKind::GpuUsage => "GPU load".to_string(),
            MetricKind::GpuTemperature => "GPU temperature".to_string(),
            MetricKind::OsUpdateAgeDays => "Last OS update".to_string(),
        }
    }

    /// Unit suffix used when rendering a numeric value
    pub fn unit(&self) -> &'static str {
        match self {
            MetricKind::CpuTemperature | MetricKind::GpuTemperature => "°C",
            MetricKind::OsUpdateAgeDays => " days ago",
            MetricKind::BatteryPowerSource => "",
            _ => "%",
        }
    }

    /// Kinds whose value is a 0-100 utilisation percentage
    pub fn is_usage_percentage(&self) -> bool {
        matches!(
            self,
            MetricKind::CpuUsage
                | MetricKind::RamUsage
                | MetricKind::GpuUsage
                | MetricKind::DiskUsage { .. }
        )
    }

    pub fn is_temperature(&self) -> bool {
        matches!(self, MetricKind::CpuTemperature | MetricKind::GpuTemperature)
    }

    /// Whether two kinds belong to the same fixed family (all disks are one family)
    pub fn same_family(&self, other: &MetricKind) -> bool {
        self.id() == other.id()
    }

    /// Render a value with this kind's unit
    pub fn format_value(&self, value: f64) -> String {
        match self {
            MetricKind::OsUpdateAgeDays => format!("{:.0}{}", value, self.unit()),
            _ => format!("{:.1}{}", value, self.unit()),
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::DiskUsage { volume } => write!(f, "disk_usage:{}", volume),
            other => write!(f, "{}", other.id()),
        }
    }
}

impl FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(volume) = s.strip_prefix("disk_usage:") {
            if volume.is_empty() {
                return Err("disk_usage requires a volume".to_string());
            }
            return Ok(MetricKind::disk(volume));
        }
        Self::SINGLETONS
            .iter()
            .find(|k| k.id() == s)
            .cloned()
            .ok_or_else(|| format!("unknown metric kind '{}'", s))
    }
}

impl From<MetricKind> for String {
    fn from(kind: MetricKind) -> Self {
        kind.to_string()
    }
}

impl TryFrom<String> for MetricKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One raw observation of a metric kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub kind: MetricKind,

    /// Observed value, if any
    pub value: Option<ReadingValue>,

    /// False when the source could not obtain this metric
    pub available: bool,

    /// Why the metric is unavailable, or where it came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Reading {
    pub fn number(kind: MetricKind, value: f64) -> Self {
        Self {
            kind,
            value: Some(ReadingValue::Number(value)),
            available: true,
            detail: None,
        }
    }

    pub fn power(source: PowerSource) -> Self {
        Self {
            kind: MetricKind::BatteryPowerSource,
            value: Some(ReadingValue::Power(source)),
            available: true,
            detail: None,
        }
    }

    pub fn unavailable(kind: MetricKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            value: None,
            available: false,
            detail: Some(reason.into()),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn numeric_value(&self) -> Option<f64> {
        self.value.as_ref().and_then(ReadingValue::as_number)
    }

    /// Render the value for display
    pub fn display_value(&self) -> String {
        if !self.available {
            return "unavailable".to_string();
        }
        match self.value {
            Some(ReadingValue::Number(v)) => self.kind.format_value(v),
            Some(ReadingValue::Power(p)) => p.to_string(),
            None => "-".to_string(),
        }
    }
}

/// A reading mapped onto the unit interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMetric {
    pub kind: MetricKind,

    /// 1.0 is healthy, 0.0 is as bad as it gets
    pub score: f64,

    /// Configured weight before renormalization
    pub weight: f64,

    /// Whether this metric takes part in the aggregate
    pub contributed: bool,

    /// Numeric input the score was derived from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<f64>,
}

impl NormalizedMetric {
    pub fn excluded(kind: MetricKind, weight: f64, raw: Option<f64>) -> Self {
        Self {
            kind,
            score: 0.0,
            weight,
            contributed: false,
            raw,
        }
    }
}

/// Make a reading set complete: one reading per kind, every missing family
/// filled with an unavailable reading, sorted by kind.
///
/// Duplicate kinds resolve the same way regardless of input order: an
/// available reading beats an unavailable one, then the lower value wins.
pub fn complete_reading_set(readings: Vec<Reading>) -> Vec<Reading> {
    let mut by_kind: BTreeMap<MetricKind, Reading> = BTreeMap::new();

    for reading in readings {
        match by_kind.entry(reading.kind.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(reading);
            }
            Entry::Occupied(mut slot) => {
                warn!("Duplicate {} reading in one pass", reading.kind);
                if duplicate_order(&reading, slot.get()) == Ordering::Less {
                    slot.insert(reading);
                }
            }
        }
    }

    let seen: BTreeSet<MetricKind> = by_kind.keys().cloned().collect();
    let mut out: Vec<Reading> = by_kind.into_values().collect();

    for kind in MetricKind::SINGLETONS.iter() {
        if !seen.contains(kind) {
            out.push(Reading::unavailable(kind.clone(), "not reported by source"));
        }
    }

    if !out
        .iter()
        .any(|r| matches!(r.kind, MetricKind::DiskUsage { .. }))
    {
        out.push(Reading::unavailable(
            MetricKind::disk(PLACEHOLDER_VOLUME),
            "no volumes enumerated",
        ));
    }

    out.sort_by(|a, b| a.kind.cmp(&b.kind));
    out
}

fn duplicate_order(a: &Reading, b: &Reading) -> Ordering {
    fn value_rank(value: Option<ReadingValue>) -> (u8, f64) {
        match value {
            Some(ReadingValue::Number(v)) => (0, v),
            Some(ReadingValue::Power(PowerSource::PluggedIn)) => (1, 0.0),
            Some(ReadingValue::Power(PowerSource::OnBattery)) => (1, 1.0),
            None => (2, 0.0),
        }
    }
    let (ra, va) = value_rank(a.value);
    let (rb, vb) = value_rank(b.value);
    b.available
        .cmp(&a.available)
        .then(ra.cmp(&rb))
        .then(va.total_cmp(&vb))
        .then_with(|| a.detail.cmp(&b.detail))
}
