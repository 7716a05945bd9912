//! Host facts: OS, CPU, memory and network interfaces

use std::fs;
use sysinfo::{Networks, System};
use tracing::debug;
use vigil_common::{HostInfo, NetworkInterface};

const CPU_MAX_FREQ_PATH: &str = "/sys/devices/system/cpu/cpu0/cpufreq/cpuinfo_max_freq";

/// Probe the running host through sysinfo
pub fn probe() -> HostInfo {
    let mut sys = System::new();
    sys.refresh_cpu();
    sys.refresh_memory();

    let cpu_brand = sys
        .cpus()
        .first()
        .map(|cpu| cpu.brand().trim().to_string())
        .filter(|brand| !brand.is_empty());
    let cpu_frequency_mhz = sys
        .cpus()
        .first()
        .map(|cpu| cpu.frequency())
        .filter(|mhz| *mhz > 0);

    let networks = Networks::new_with_refreshed_list();
    let mut network: Vec<NetworkInterface> = networks
        .list()
        .iter()
        .map(|(name, data)| {
            let mac = data.mac_address();
            NetworkInterface {
                name: name.clone(),
                mac_address: (!mac.is_unspecified()).then(|| mac.to_string()),
                received_bytes: data.total_received(),
                transmitted_bytes: data.total_transmitted(),
            }
        })
        .collect();
    network.sort_by(|a, b| a.name.cmp(&b.name));

    let host = HostInfo {
        hostname: System::host_name(),
        os_name: System::name(),
        os_version: System::os_version(),
        kernel_version: System::kernel_version(),
        architecture: std::env::consts::ARCH.to_string(),
        cpu_brand,
        cpu_cores: sys.cpus().len(),
        cpu_frequency_mhz,
        cpu_max_frequency_mhz: fs::read_to_string(CPU_MAX_FREQ_PATH)
            .ok()
            .and_then(|s| khz_to_mhz(&s)),
        total_memory_bytes: sys.total_memory(),
        total_swap_bytes: sys.total_swap(),
        uptime_secs: System::uptime(),
        network,
    };
    debug!(
        "Host {} with {} interfaces",
        host.hostname.as_deref().unwrap_or("unknown"),
        host.network.len()
    );
    host
}

/// cpufreq reports kHz
fn khz_to_mhz(raw: &str) -> Option<u64> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|khz| *khz > 0)
        .map(|khz| khz / 1000)
}
