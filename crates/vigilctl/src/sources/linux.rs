//! Linux sensor source
//!
//! CPU, memory, disks and temperatures come from sysinfo. Battery and GPU
//! load are read from sysfs, with `nvidia-smi` as the GPU fallback. The
//! OS update age is the last full upgrade recorded by pacman, or the last
//! apt transaction on Debian-style systems.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;
use vigil_common::{HostInfo, MetricKind, PowerSource, Reading, SensorSource};

use super::system;
use crate::host;

const PACMAN_UPGRADE_MARKER: &str = "starting full system upgrade";
const APT_START_PREFIX: &str = "Start-Date:";

/// One entry under /sys/class/power_supply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PowerSupply {
    pub name: String,
    /// "Battery", "Mains", "USB", ...
    pub supply_type: String,
    pub capacity: Option<f64>,
    pub status: Option<String>,
    pub online: Option<bool>,
}

/// Average charge over all batteries that report a capacity
pub fn battery_level(supplies: &[PowerSupply]) -> Option<f64> {
    let levels: Vec<f64> = supplies
        .iter()
        .filter(|s| s.supply_type == "Battery")
        .filter_map(|s| s.capacity)
        .collect();
    if levels.is_empty() {
        return None;
    }
    Some(levels.iter().sum::<f64>() / levels.len() as f64)
}

/// Mains adapters decide when present; otherwise a discharging battery
/// means the machine runs on battery.
pub fn power_source(supplies: &[PowerSupply]) -> Option<PowerSource> {
    let mains: Vec<bool> = supplies
        .iter()
        .filter(|s| s.supply_type == "Mains")
        .filter_map(|s| s.online)
        .collect();
    if !mains.is_empty() {
        return Some(if mains.iter().any(|online| *online) {
            PowerSource::PluggedIn
        } else {
            PowerSource::OnBattery
        });
    }

    let statuses: Vec<&str> = supplies
        .iter()
        .filter(|s| s.supply_type == "Battery")
        .filter_map(|s| s.status.as_deref())
        .collect();
    if statuses.is_empty() {
        return None;
    }
    if statuses.iter().any(|s| *s == "Discharging") {
        Some(PowerSource::OnBattery)
    } else {
        Some(PowerSource::PluggedIn)
    }
}

/// First line of `nvidia-smi --query-gpu=utilization.gpu,temperature.gpu`
pub fn parse_nvidia_smi(output: &str) -> Option<(f64, f64)> {
    let line = output.lines().find(|l| !l.trim().is_empty())?;
    let mut fields = line.split(',').map(|f| f.trim().parse::<f64>());
    let usage = fields.next()?.ok()?;
    let temperature = fields.next()?.ok()?;
    Some((usage, temperature))
}

/// Timestamp of the last full system upgrade in a pacman log
pub fn last_pacman_upgrade(log: &str) -> Option<DateTime<Utc>> {
    log.lines()
        .rev()
        .filter(|line| line.contains(PACMAN_UPGRADE_MARKER))
        .find_map(|line| {
            let stamp = line.strip_prefix('[')?.split(']').next()?;
            parse_pacman_timestamp(stamp)
        })
}

fn parse_pacman_timestamp(stamp: &str) -> Option<DateTime<Utc>> {
    // Current format: 2024-05-01T10:22:33+0200
    if let Ok(dt) = DateTime::<FixedOffset>::parse_from_str(stamp, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }
    // Before pacman 5.1: 2018-03-01 10:22, local time
    NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d %H:%M")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Start of the last transaction in an apt history log, taken as UTC
pub fn last_apt_transaction(log: &str) -> Option<DateTime<Utc>> {
    log.lines().rev().find_map(|line| {
        let rest = line.trim().strip_prefix(APT_START_PREFIX)?;
        let normalized = rest.split_whitespace().collect::<Vec<_>>().join(" ");
        NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S")
            .ok()
            .map(|naive| Utc.from_utc_datetime(&naive))
    })
}

/// Whole and fractional days between two instants, never negative
pub fn days_between(then: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let seconds = (now - then).num_seconds().max(0);
    seconds as f64 / 86_400.0
}

/// Reads Linux sensors, rooted at `/` outside of tests
#[derive(Debug, Clone)]
pub struct LinuxSensors {
    root: PathBuf,
}

impl Default for LinuxSensors {
    fn default() -> Self {
        Self::new()
    }
}

impl LinuxSensors {
    pub fn new() -> Self {
        Self::with_root("/")
    }

    /// Resolve sysfs and log paths below `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    pub fn power_supplies(&self) -> Vec<PowerSupply> {
        let dir = self.path("sys/class/power_supply");
        let Ok(entries) = fs::read_dir(&dir) else {
            return Vec::new();
        };

        let mut supplies: Vec<PowerSupply> = entries
            .flatten()
            .map(|entry| {
                let path = entry.path();
                PowerSupply {
                    name: entry.file_name().to_string_lossy().into_owned(),
                    supply_type: read_trimmed(&path.join("type")).unwrap_or_default(),
                    capacity: read_trimmed(&path.join("capacity")).and_then(|s| s.parse().ok()),
                    status: read_trimmed(&path.join("status")),
                    online: read_trimmed(&path.join("online")).map(|s| s == "1"),
                }
            })
            .collect();
        supplies.sort_by(|a, b| a.name.cmp(&b.name));
        supplies
    }

    /// Highest busy percentage among DRM cards that expose one
    fn drm_gpu_busy(&self) -> Option<f64> {
        let dir = self.path("sys/class/drm");
        let entries = fs::read_dir(dir).ok()?;
        entries
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().starts_with("card"))
            .filter_map(|e| read_trimmed(&e.path().join("device/gpu_busy_percent")))
            .filter_map(|s| s.parse::<f64>().ok())
            .reduce(f64::max)
    }

    fn nvidia_smi(&self) -> Option<(f64, f64)> {
        let output = Command::new("nvidia-smi")
            .args([
                "--query-gpu=utilization.gpu,temperature.gpu",
                "--format=csv,noheader,nounits",
            ])
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        parse_nvidia_smi(&String::from_utf8_lossy(&output.stdout))
    }

    fn battery_level_reading(&self) -> Reading {
        match battery_level(&self.power_supplies()) {
            Some(level) => Reading::number(MetricKind::BatteryLevel, level)
                .with_detail("/sys/class/power_supply"),
            None => Reading::unavailable(MetricKind::BatteryLevel, "no battery present"),
        }
    }

    fn power_source_reading(&self) -> Reading {
        match power_source(&self.power_supplies()) {
            Some(source) => Reading::power(source).with_detail("/sys/class/power_supply"),
            None => Reading::unavailable(MetricKind::BatteryPowerSource, "no power supply information"),
        }
    }

    fn gpu_usage_reading(&self) -> Reading {
        if let Some(busy) = self.drm_gpu_busy() {
            return Reading::number(MetricKind::GpuUsage, busy).with_detail("gpu_busy_percent");
        }
        match self.nvidia_smi() {
            Some((usage, _)) => Reading::number(MetricKind::GpuUsage, usage).with_detail("nvidia-smi"),
            None => Reading::unavailable(MetricKind::GpuUsage, "no GPU load counter found"),
        }
    }

    fn gpu_temperature_reading(&self) -> Reading {
        if let Some(t) = system::pick_gpu_temperature(&system::component_temperatures()) {
            return Reading::number(MetricKind::GpuTemperature, t).with_detail("sysinfo");
        }
        match self.nvidia_smi() {
            Some((_, t)) => Reading::number(MetricKind::GpuTemperature, t).with_detail("nvidia-smi"),
            None => Reading::unavailable(MetricKind::GpuTemperature, "no GPU temperature sensor found"),
        }
    }

    /// Last upgrade from pacman, else apt
    pub fn last_update(&self) -> Option<(DateTime<Utc>, &'static str)> {
        if let Ok(log) = fs::read_to_string(self.path("var/log/pacman.log")) {
            if let Some(at) = last_pacman_upgrade(&log) {
                return Some((at, "pacman.log"));
            }
        }
        if let Ok(log) = fs::read_to_string(self.path("var/log/apt/history.log")) {
            if let Some(at) = last_apt_transaction(&log) {
                return Some((at, "apt history.log"));
            }
        }
        None
    }

    pub fn update_age_reading(&self, now: DateTime<Utc>) -> Reading {
        match self.last_update() {
            Some((at, origin)) => {
                debug!("Last OS update at {} ({})", at, origin);
                Reading::number(MetricKind::OsUpdateAgeDays, days_between(at, now)).with_detail(origin)
            }
            None => Reading::unavailable(MetricKind::OsUpdateAgeDays, "no package manager history found"),
        }
    }
}

impl SensorSource for LinuxSensors {
    fn name(&self) -> &str {
        "linux"
    }

    fn probes(&self) -> Vec<MetricKind> {
        MetricKind::standard_set(&system::mounted_volumes())
    }

    fn read(&self, kind: &MetricKind) -> Reading {
        match kind {
            MetricKind::CpuUsage => system::cpu_usage(),
            MetricKind::CpuTemperature => system::cpu_temperature(),
            MetricKind::RamUsage => system::ram_usage(),
            MetricKind::DiskUsage { volume } => system::disk_usage(volume),
            MetricKind::BatteryLevel => self.battery_level_reading(),
            MetricKind::BatteryPowerSource => self.power_source_reading(),
            MetricKind::GpuUsage => self.gpu_usage_reading(),
            MetricKind::GpuTemperature => self.gpu_temperature_reading(),
            MetricKind::OsUpdateAgeDays => self.update_age_reading(Utc::now()),
        }
    }

    fn host_info(&self) -> Option<HostInfo> {
        Some(host::probe())
    }
}

fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}
