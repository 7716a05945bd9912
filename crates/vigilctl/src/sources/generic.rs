//! Portable sensor source: whatever sysinfo can see, nothing else.

use vigil_common::{HostInfo, MetricKind, Reading, SensorSource};

use super::system;
use crate::host;

#[derive(Debug, Clone, Default)]
pub struct GenericSensors;

impl SensorSource for GenericSensors {
    fn name(&self) -> &str {
        "generic"
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
            MetricKind::GpuTemperature => {
                match system::pick_gpu_temperature(&system::component_temperatures()) {
                    Some(t) => Reading::number(kind.clone(), t).with_detail("sysinfo"),
                    None => Reading::unavailable(kind.clone(), "no GPU temperature sensor found"),
                }
            }
            MetricKind::BatteryLevel
            | MetricKind::BatteryPowerSource
            | MetricKind::GpuUsage
            | MetricKind::OsUpdateAgeDays => {
                Reading::unavailable(kind.clone(), "not supported on this platform")
            }
        }
    }

    fn host_info(&self) -> Option<HostInfo> {
        Some(host::probe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_kinds_are_unavailable() {
        let source = GenericSensors;
        for kind in [MetricKind::BatteryLevel, MetricKind::OsUpdateAgeDays] {
            let reading = source.read(&kind);
            assert!(!reading.available);
            assert_eq!(reading.kind, kind);
        }
    }

    #[test]
    fn test_probes_cover_every_family() {
        let kinds = GenericSensors.probes();
        for singleton in MetricKind::SINGLETONS.iter() {
            assert!(kinds.contains(singleton));
        }
        assert!(kinds
            .iter()
            .any(|k| matches!(k, MetricKind::DiskUsage { .. })));
    }
}
