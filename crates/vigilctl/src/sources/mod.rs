//! Platform sensor adapters

pub mod generic;
#[cfg(target_os = "linux")]
pub mod linux;
pub mod system;

use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use vigil_common::{SensorSource, SnapshotSource};

pub use generic::GenericSensors;
#[cfg(target_os = "linux")]
pub use linux::LinuxSensors;

/// Sensor source for the platform this binary runs on
pub fn detect() -> Arc<dyn SensorSource> {
    #[cfg(target_os = "linux")]
    let source: Arc<dyn SensorSource> = Arc::new(LinuxSensors::new());
    #[cfg(not(target_os = "linux"))]
    let source: Arc<dyn SensorSource> = Arc::new(GenericSensors);

    info!("Using {} sensor source", source.name());
    source
}

/// Replay source for `check --snapshot`
pub fn from_snapshot(path: &Path) -> anyhow::Result<Arc<dyn SensorSource>> {
    let source = SnapshotSource::load(path)
        .with_context(|| format!("cannot read snapshot {}", path.display()))?;
    Ok(Arc::new(source))
}
