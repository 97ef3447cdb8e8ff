use std::fmt;

use tracing::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DeviceMap {
    ForceCpu,
    Ordinal(usize),
}

impl Default for DeviceMap {
    fn default() -> Self {
        Self::Ordinal(0)
    }
}

impl fmt::Display for DeviceMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceMap::ForceCpu => f.write_str("cpu"),
            DeviceMap::Ordinal(ordinal) => write!(f, "gpu:{ordinal}"),
        }
    }
}

/// What to do when no accelerator is present.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AcceleratorPolicy {
    /// Refuse to run on the CPU.
    Required,
    /// Warn and continue on the CPU.
    #[default]
    PreferWithFallback,
}

impl AcceleratorPolicy {
    /// Resolves the device to use given whether an accelerator answered.
    ///
    /// Returns `None` when the policy forbids running without one.
    pub fn resolve(self, requested: DeviceMap, accelerator_available: bool) -> Option<DeviceMap> {
        match (self, requested, accelerator_available) {
            (Self::Required, _, false) => None,
            (Self::Required, DeviceMap::ForceCpu, true) => None,
            (_, requested, true) => Some(requested),
            (Self::PreferWithFallback, _, false) => Some(DeviceMap::ForceCpu),
        }
    }

    /// Like [`resolve`](Self::resolve), but only runs `probe` when its answer
    /// matters, and logs the outcome. CPU fallback is logged as a warning.
    pub fn choose(self, requested: DeviceMap, probe: impl FnOnce() -> bool) -> Option<DeviceMap> {
        if requested == DeviceMap::ForceCpu && self == Self::PreferWithFallback {
            info!("CPU requested, skipping accelerator check");
            return Some(DeviceMap::ForceCpu);
        }

        match self.resolve(requested, probe()) {
            Some(DeviceMap::ForceCpu) => {
                warn!("GPU acceleration not available, falling back to CPU (this will be slow)");
                Some(DeviceMap::ForceCpu)
            }
            Some(device_map) => {
                info!(device = %device_map, "GPU acceleration available");
                Some(device_map)
            }
            None => None,
        }
    }
}
