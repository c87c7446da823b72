// ============================================================
// Layer 6 — Compute Device Selection
// ============================================================
// Devices are named in the run config instead of being baked
// into the process environment:
//
//   devices: ["gpu:0"]        first discrete GPU
//   devices: ["igpu:0"]       first integrated GPU
//   devices: ["cpu"]          wgpu CPU adapter
//   devices: ["default"]      whatever wgpu picks
//
// Training runs on the first device of the list.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use burn::backend::wgpu::WgpuDevice;

/// Which Burn backend drives training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Wgpu,
    Ndarray,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Wgpu    => write!(f, "wgpu"),
            BackendKind::Ndarray => write!(f, "ndarray"),
        }
    }
}

/// A parsed entry of the `devices` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSpec {
    Default,
    Cpu,
    Gpu(usize),
    IntegratedGpu(usize),
}

impl FromStr for DeviceSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let index = |prefix: &str| -> Option<Result<usize, String>> {
            s.strip_prefix(prefix).map(|n| {
                n.parse::<usize>()
                    .map_err(|_| format!("invalid device index in '{s}'"))
            })
        };

        match s.as_str() {
            "default" => Ok(DeviceSpec::Default),
            "cpu"     => Ok(DeviceSpec::Cpu),
            _ => {
                if let Some(idx) = index("gpu:") {
                    idx.map(DeviceSpec::Gpu)
                } else if let Some(idx) = index("igpu:") {
                    idx.map(DeviceSpec::IntegratedGpu)
                } else {
                    Err(format!(
                        "unknown device '{s}' (expected default, cpu, gpu:N or igpu:N)"
                    ))
                }
            }
        }
    }
}

impl fmt::Display for DeviceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSpec::Default          => write!(f, "default"),
            DeviceSpec::Cpu              => write!(f, "cpu"),
            DeviceSpec::Gpu(i)           => write!(f, "gpu:{i}"),
            DeviceSpec::IntegratedGpu(i) => write!(f, "igpu:{i}"),
        }
    }
}

impl DeviceSpec {
    pub fn to_wgpu(self) -> WgpuDevice {
        match self {
            DeviceSpec::Default          => WgpuDevice::default(),
            DeviceSpec::Cpu              => WgpuDevice::Cpu,
            DeviceSpec::Gpu(i)           => WgpuDevice::DiscreteGpu(i),
            DeviceSpec::IntegratedGpu(i) => WgpuDevice::IntegratedGpu(i),
        }
    }
}

/// Parse the configured device list.
pub fn parse_devices(specs: &[String]) -> Result<Vec<DeviceSpec>, String> {
    if specs.is_empty() {
        return Err("at least one device must be listed".to_string());
    }
    specs.iter().map(|s| s.parse()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_devices() {
        assert_eq!("default".parse::<DeviceSpec>(), Ok(DeviceSpec::Default));
        assert_eq!("CPU".parse::<DeviceSpec>(), Ok(DeviceSpec::Cpu));
        assert_eq!("gpu:3".parse::<DeviceSpec>(), Ok(DeviceSpec::Gpu(3)));
        assert_eq!(" igpu:0 ".parse::<DeviceSpec>(), Ok(DeviceSpec::IntegratedGpu(0)));
    }

    #[test]
    fn rejects_unknown_devices() {
        assert!("tpu:0".parse::<DeviceSpec>().is_err());
        assert!("gpu:x".parse::<DeviceSpec>().is_err());
        assert!(parse_devices(&[]).is_err());
    }

    #[test]
    fn device_list_keeps_order() {
        let devices = parse_devices(&["gpu:3".into(), "gpu:4".into()]).unwrap();
        assert_eq!(devices, vec![DeviceSpec::Gpu(3), DeviceSpec::Gpu(4)]);
        assert_eq!(devices[0].to_string(), "gpu:3");
    }
}
