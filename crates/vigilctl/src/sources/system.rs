//! sysinfo-backed readers shared by every platform adapter.
//!
//! Each call opens its own sysinfo handle and drops it before returning.

use sysinfo::{Components, Disks, System};
use tracing::debug;
use vigil_common::{MetricKind, Reading};

/// Filesystems that never hold user data
const VIRTUAL_FILESYSTEMS: &[&str] = &[
    "autofs",
    "binfmt_misc",
    "bpf",
    "cgroup",
    "cgroup2",
    "configfs",
    "debugfs",
    "devpts",
    "devtmpfs",
    "efivarfs",
    "fusectl",
    "hugetlbfs",
    "mqueue",
    "nsfs",
    "overlay",
    "proc",
    "pstore",
    "ramfs",
    "securityfs",
    "squashfs",
    "sysfs",
    "tmpfs",
    "tracefs",
];

/// Labels that identify the CPU package or die, best first
const CPU_TEMPERATURE_LABELS: &[&str] = &[
    "Package id 0",
    "Tctl",
    "Tdie",
    "Core 0",
    "k10temp",
    "coretemp",
    "cpu_thermal",
    "x86_pkg_temp",
    "CPU",
];

const GPU_TEMPERATURE_LABELS: &[&str] = &["edge", "junction", "amdgpu", "nouveau", "GPU"];

const SYSINFO: &str = "sysinfo";

pub fn is_virtual_filesystem(fs: &str) -> bool {
    let fs = fs.trim();
    VIRTUAL_FILESYSTEMS.contains(&fs) || fs.starts_with("fuse.")
}

/// Used share of a capacity, in percent
pub fn usage_percent(used: u64, total: u64) -> Option<f64> {
    if total == 0 {
        return None;
    }
    Some(used as f64 / total as f64 * 100.0)
}

/// First reading whose label matches the best-ranked pattern.
/// Zero and non-finite values are treated as absent sensors.
pub fn pick_temperature(sensors: &[(String, f32)], patterns: &[&str]) -> Option<f64> {
    patterns.iter().find_map(|pattern| {
        sensors
            .iter()
            .filter(|(label, _)| label.contains(pattern))
            .map(|(_, temp)| *temp as f64)
            .find(|t| t.is_finite() && *t > 0.0)
    })
}

pub fn pick_cpu_temperature(sensors: &[(String, f32)]) -> Option<f64> {
    pick_temperature(sensors, CPU_TEMPERATURE_LABELS)
}

pub fn pick_gpu_temperature(sensors: &[(String, f32)]) -> Option<f64> {
    pick_temperature(sensors, GPU_TEMPERATURE_LABELS)
}

pub fn component_temperatures() -> Vec<(String, f32)> {
    let components = Components::new_with_refreshed_list();
    components
        .list()
        .iter()
        .map(|c| (c.label().to_string(), c.temperature()))
        .collect()
}

/// Global CPU usage from two samples taken the minimum interval apart
pub fn cpu_usage() -> Reading {
    if !sysinfo::IS_SUPPORTED_SYSTEM {
        return Reading::unavailable(MetricKind::CpuUsage, "sysinfo does not support this OS");
    }
    let mut sys = System::new();
    sys.refresh_cpu();
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
    sys.refresh_cpu();

    if sys.cpus().is_empty() {
        return Reading::unavailable(MetricKind::CpuUsage, "no CPUs reported");
    }
    let usage = sys.global_cpu_info().cpu_usage() as f64;
    Reading::number(MetricKind::CpuUsage, usage).with_detail(SYSINFO)
}

pub fn ram_usage() -> Reading {
    let mut sys = System::new();
    sys.refresh_memory();
    match usage_percent(sys.used_memory(), sys.total_memory()) {
        Some(pct) => Reading::number(MetricKind::RamUsage, pct).with_detail(SYSINFO),
        None => Reading::unavailable(MetricKind::RamUsage, "total memory reported as zero"),
    }
}

/// Mount points of real filesystems, sorted and deduplicated
pub fn mounted_volumes() -> Vec<String> {
    let disks = Disks::new_with_refreshed_list();
    let mut volumes: Vec<String> = disks
        .list()
        .iter()
        .filter(|d| !is_virtual_filesystem(&d.file_system().to_string_lossy()))
        .filter(|d| d.total_space() > 0)
        .map(|d| d.mount_point().to_string_lossy().into_owned())
        .collect();
    volumes.sort();
    volumes.dedup();
    debug!("Enumerated {} volumes", volumes.len());
    volumes
}

pub fn disk_usage(volume: &str) -> Reading {
    let kind = MetricKind::disk(volume);
    let disks = Disks::new_with_refreshed_list();
    let Some(disk) = disks
        .list()
        .iter()
        .find(|d| d.mount_point().to_string_lossy() == volume)
    else {
        return Reading::unavailable(kind, "volume is no longer mounted");
    };

    let total = disk.total_space();
    let used = total.saturating_sub(disk.available_space());
    match usage_percent(used, total) {
        Some(pct) => Reading::number(kind, pct).with_detail(SYSINFO),
        None => Reading::unavailable(kind, "volume reports zero capacity"),
    }
}

pub fn cpu_temperature() -> Reading {
    match pick_cpu_temperature(&component_temperatures()) {
        Some(t) => Reading::number(MetricKind::CpuTemperature, t).with_detail(SYSINFO),
        None => Reading::unavailable(MetricKind::CpuTemperature, "no CPU temperature sensor found"),
    }
}
