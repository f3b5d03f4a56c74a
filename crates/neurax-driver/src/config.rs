// SPDX-License-Identifier: AGPL-3.0-only

//! Operation and device configuration.

use crate::dtype::DataType;
use crate::error::{NeuraxError, Result};
use neurax_chip::{limits, window};
use std::path::PathBuf;
use std::str::FromStr;

/// Activation function selector.
///
/// `Unknown` keeps out-of-range selectors representable so validation can
/// reject them; applied directly it behaves as identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activation {
    /// `max(0, x)`
    #[default]
    Relu,
    /// Hyperbolic tangent
    Tanh,
    /// `1 / (1 + e^-x)`
    Sigmoid,
    /// Identity
    Linear,
    /// Selector outside the known set
    Unknown(u32),
}

impl Activation {
    /// Register selector value.
    pub const fn selector(self) -> u32 {
        match self {
            Self::Relu => 0,
            Self::Tanh => 1,
            Self::Sigmoid => 2,
            Self::Linear => 3,
            Self::Unknown(v) => v,
        }
    }

    /// Whether the selector is one the hardware implements.
    pub const fn is_known(self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    /// Apply to a scalar.
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Self::Relu => x.max(0.0),
            Self::Tanh => x.tanh(),
            Self::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Self::Linear | Self::Unknown(_) => x,
        }
    }
}

impl From<u32> for Activation {
    fn from(v: u32) -> Self {
        match v {
            0 => Self::Relu,
            1 => Self::Tanh,
            2 => Self::Sigmoid,
            3 => Self::Linear,
            other => Self::Unknown(other),
        }
    }
}

impl FromStr for Activation {
    type Err = NeuraxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "relu" => Ok(Self::Relu),
            "tanh" => Ok(Self::Tanh),
            "sigmoid" => Ok(Self::Sigmoid),
            "linear" | "identity" => Ok(Self::Linear),
            other => Err(NeuraxError::invalid_param(format!("unknown activation '{other}'"))),
        }
    }
}

/// Pooling reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PoolType {
    /// Maximum over in-bounds taps
    #[default]
    Max,
    /// Mean over in-bounds taps
    Average,
    /// Selector outside the known set
    Unknown(u32),
}

impl PoolType {
    /// Register selector value.
    pub const fn selector(self) -> u32 {
        match self {
            Self::Max => 0,
            Self::Average => 1,
            Self::Unknown(v) => v,
        }
    }

    /// Whether the selector is one the hardware implements.
    pub const fn is_known(self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl From<u32> for PoolType {
    fn from(v: u32) -> Self {
        match v {
            0 => Self::Max,
            1 => Self::Average,
            other => Self::Unknown(other),
        }
    }
}

/// 2-D convolution geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvConfig {
    /// Kernel width
    pub kernel_width: u32,
    /// Kernel height
    pub kernel_height: u32,
    /// Horizontal stride
    pub stride_x: u32,
    /// Vertical stride
    pub stride_y: u32,
    /// Horizontal zero padding
    pub padding_x: u32,
    /// Vertical zero padding
    pub padding_y: u32,
    /// Input channels consumed
    pub input_channels: u32,
    /// Output channels produced
    pub output_channels: u32,
    /// Add bias when a bias tensor is supplied
    pub use_bias: bool,
    /// Activation applied to each accumulated value
    pub activation: Activation,
}

impl ConvConfig {
    /// Square kernel, equal strides and padding, no bias, linear activation.
    pub const fn square(
        kernel: u32,
        stride: u32,
        padding: u32,
        input_channels: u32,
        output_channels: u32,
    ) -> Self {
        Self {
            kernel_width: kernel,
            kernel_height: kernel,
            stride_x: stride,
            stride_y: stride,
            padding_x: padding,
            padding_y: padding,
            input_channels,
            output_channels,
            use_bias: false,
            activation: Activation::Linear,
        }
    }

    /// Enable bias.
    #[must_use]
    pub const fn with_bias(mut self) -> Self {
        self.use_bias = true;
        self
    }

    /// Set the activation.
    #[must_use]
    pub const fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }
}

/// Pooling geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Window width
    pub pool_width: u32,
    /// Window height
    pub pool_height: u32,
    /// Horizontal stride
    pub stride_x: u32,
    /// Vertical stride
    pub stride_y: u32,
    /// Reduction
    pub pool_type: PoolType,
}

impl PoolConfig {
    /// Square window with equal strides.
    pub const fn square(pool: u32, stride: u32, pool_type: PoolType) -> Self {
        Self {
            pool_width: pool,
            pool_height: pool,
            stride_x: stride,
            stride_y: stride,
            pool_type,
        }
    }
}

/// Environment variable naming a single device node to probe.
pub const ENV_DEVICE: &str = "NEURAX_DEVICE";
/// Environment variable toggling the hardware path (`0|1|false|true`).
pub const ENV_USE_HARDWARE: &str = "NEURAX_USE_HARDWARE";
/// Environment variable overriding the completion timeout in milliseconds.
pub const ENV_TIMEOUT_MS: &str = "NEURAX_TIMEOUT_MS";

/// Device configuration supplied at init.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Register base address (informational, the window is mapped at offset 0)
    pub base_address: u64,
    /// Register window size in bytes, `0` selects the default window
    pub memory_size: usize,
    /// Program the hardware when it is bound
    pub use_hardware: bool,
    /// Largest kernel the device supports
    pub max_kernel_size: u32,
    /// Parallel multipliers (informational)
    pub num_multipliers: u32,
    /// Default element type
    pub data_type: DataType,
    /// Device nodes probed in order
    pub device_paths: Vec<PathBuf>,
    /// Completion polling budget
    pub timeout_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            base_address: 0,
            memory_size: 0,
            use_hardware: true,
            max_kernel_size: limits::MAX_KERNEL_SIZE,
            num_multipliers: limits::HW_MULTIPLIERS,
            data_type: DataType::F32,
            device_paths: window::PROBE_PATHS.iter().map(PathBuf::from).collect(),
            timeout_ms: window::DEFAULT_TIMEOUT_MS,
        }
    }
}

impl DeviceConfig {
    /// Configuration that never touches hardware.
    pub fn emulated() -> Self {
        Self {
            use_hardware: false,
            ..Self::default()
        }
    }

    /// Window size to map, resolving `0` to the default.
    pub const fn window_size(&self) -> usize {
        if self.memory_size == 0 {
            window::DEFAULT_WINDOW_SIZE
        } else {
            self.memory_size
        }
    }

    /// Defaults overlaid with `NEURAX_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParam` if a variable is set but unparsable.
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup` (keyed by the `ENV_*` names).
    ///
    /// # Errors
    ///
    /// Returns `InvalidParam` if a value is unparsable.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(path) = lookup(ENV_DEVICE) {
            self.device_paths = vec![PathBuf::from(path)];
        }
        if let Some(flag) = lookup(ENV_USE_HARDWARE) {
            self.use_hardware = parse_flag(&flag).ok_or_else(|| {
                NeuraxError::invalid_param(format!("{ENV_USE_HARDWARE}={flag} is not a boolean"))
            })?;
        }
        if let Some(ms) = lookup(ENV_TIMEOUT_MS) {
            self.timeout_ms = ms.trim().parse().map_err(|_| {
                NeuraxError::invalid_param(format!("{ENV_TIMEOUT_MS}={ms} is not a number"))
            })?;
        }
        Ok(self)
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn activation_functions() {
        assert_eq!(Activation::Relu.apply(-2.0), 0.0);
        assert_eq!(Activation::Relu.apply(2.5), 2.5);
        assert!((Activation::Tanh.apply(0.5) - 0.5f32.tanh()).abs() < 1e-7);
        assert_eq!(Activation::Sigmoid.apply(0.0), 0.5);
        assert_eq!(Activation::Linear.apply(-7.0), -7.0);
        assert_eq!(Activation::Unknown(9).apply(-7.0), -7.0);
    }

    #[test]
    fn selectors_roundtrip() {
        for v in 0..4 {
            assert_eq!(Activation::from(v).selector(), v);
            assert!(Activation::from(v).is_known());
        }
        assert_eq!(Activation::from(4), Activation::Unknown(4));
        assert_eq!(PoolType::from(1), PoolType::Average);
        assert!(!PoolType::from(2).is_known());
    }

    #[test]
    fn default_device_config() {
        let cfg = DeviceConfig::default();
        assert!(cfg.use_hardware);
        assert_eq!(cfg.window_size(), 0x1_0000);
        assert_eq!(cfg.timeout_ms, 5000);
        assert_eq!(cfg.device_paths[0], PathBuf::from("/dev/neurax0"));
        assert_eq!(cfg.device_paths[1], PathBuf::from("/dev/uio0"));
    }

    #[test]
    fn explicit_window_size_kept() {
        let cfg = DeviceConfig {
            memory_size: 4096,
            ..DeviceConfig::default()
        };
        assert_eq!(cfg.window_size(), 4096);
    }

    #[test]
    fn overrides_apply() {
        let vars: HashMap<&str, &str> = [
            (ENV_DEVICE, "/dev/custom"),
            (ENV_USE_HARDWARE, "false"),
            (ENV_TIMEOUT_MS, "250"),
        ]
        .into_iter()
        .collect();
        let cfg = DeviceConfig::default()
            .with_overrides(|k| vars.get(k).map(|v| (*v).to_string()))
            .unwrap();
        assert_eq!(cfg.device_paths, vec![PathBuf::from("/dev/custom")]);
        assert!(!cfg.use_hardware);
        assert_eq!(cfg.timeout_ms, 250);
    }

    #[test]
    fn bad_override_rejected() {
        let err = DeviceConfig::default()
            .with_overrides(|k| (k == ENV_TIMEOUT_MS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, NeuraxError::InvalidParam { .. }));
    }

    #[test]
    fn conv_builder() {
        let cfg = ConvConfig::square(3, 1, 1, 2, 4)
            .with_bias()
            .with_activation(Activation::Sigmoid);
        assert_eq!(cfg.kernel_height, 3);
        assert_eq!(cfg.padding_y, 1);
        assert!(cfg.use_bias);
        assert_eq!(cfg.activation, Activation::Sigmoid);
    }
}
