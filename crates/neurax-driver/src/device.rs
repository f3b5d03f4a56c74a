// SPDX-License-Identifier: AGPL-3.0-only

//! NEURAX device handle and operations
//!
//! ```text
//! Uninitialized → Opening → HardwareBound ─┐
//!                        └→ Emulated ──────┴→ Closed
//! ```
//!
//! `init` never fails because hardware is missing: any probe or mapping
//! failure lands in `Emulated`. Every operation validates first, runs the
//! register protocol when the hardware is bound and enabled, then always
//! computes the result with the CPU kernel. Hardware-leg failures are
//! logged and swallowed.

use std::fmt;
use std::time::Duration;

use neurax_chip::limits;
use neurax_chip::regs::{self, StatusWord};
use tracing::{debug, info, warn};

use crate::backends::{MmapWindow, RegisterWindow, WindowType};
use crate::config::{Activation, ConvConfig, DeviceConfig, PoolConfig};
use crate::dtype::DataType;
use crate::error::{NeuraxError, Result};
use crate::kernels;
use crate::protocol;
use crate::tensor::Tensor;
use crate::validate;

/// Device lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// Record allocated, nothing probed
    Uninitialized,
    /// Probing and mapping the register window
    Opening,
    /// Register window mapped and reset
    HardwareBound,
    /// CPU kernels only
    Emulated,
    /// Torn down
    Closed,
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Opening => "opening",
            Self::HardwareBound => "hardware",
            Self::Emulated => "emulated",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// NEURAX device handle
///
/// Owns the register window for its whole `HardwareBound` lifetime. Every
/// operation takes `&mut self`; share across threads only behind a lock.
#[derive(Debug)]
pub struct Device {
    config: DeviceConfig,
    state: DeviceState,
    window: Option<Box<dyn RegisterWindow>>,
}

impl Device {
    /// Probe for hardware and open the device.
    ///
    /// With `use_hardware` off nothing is probed. Otherwise each path in
    /// `device_paths` is tried in order; the first one that opens and maps
    /// binds the device. Missing hardware is not an error.
    pub fn init(config: DeviceConfig) -> Self {
        let mut dev = Self {
            config,
            state: DeviceState::Uninitialized,
            window: None,
        };
        dev.state = DeviceState::Opening;

        if !dev.config.use_hardware {
            info!("Hardware disabled by configuration, using CPU emulation");
            dev.state = DeviceState::Emulated;
            return dev;
        }

        match MmapWindow::open(&dev.config.device_paths, dev.config.window_size()) {
            Ok(window) => dev.bind(Box::new(window)),
            Err(e) => {
                info!("No NEURAX hardware ({e}), using CPU emulation");
                dev.state = DeviceState::Emulated;
            }
        }
        dev
    }

    /// Open the device on a caller-supplied register window.
    ///
    /// Used for platforms that expose the registers some other way and for
    /// driving the protocol against [`SoftwareRegisters`](crate::backends::SoftwareRegisters).
    /// A window that fails the reset pulse is dropped and the device falls
    /// back to emulation.
    pub fn with_window(config: DeviceConfig, window: Box<dyn RegisterWindow>) -> Self {
        let mut dev = Self {
            config,
            state: DeviceState::Opening,
            window: None,
        };
        dev.bind(window);
        dev
    }

    fn bind(&mut self, mut window: Box<dyn RegisterWindow>) {
        match protocol::reset_pulse(window.as_mut()) {
            Ok(()) => {
                info!(
                    "NEURAX device bound ({} window, {:#x} bytes)",
                    window.window_type(),
                    window.size()
                );
                self.window = Some(window);
                self.state = DeviceState::HardwareBound;
            }
            Err(e) => {
                warn!("Reset failed ({e}), using CPU emulation");
                self.state = DeviceState::Emulated;
            }
        }
    }

    /// Reset the hardware, release the window and close the device.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` if the device is already closed.
    pub fn cleanup(&mut self) -> Result<()> {
        self.ensure_open()?;
        if let Some(mut window) = self.window.take() {
            if let Err(e) = protocol::reset_pulse(window.as_mut()) {
                warn!("Reset during cleanup failed: {e}");
            }
        }
        self.state = DeviceState::Closed;
        info!("NEURAX device closed");
        Ok(())
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> DeviceState {
        self.state
    }

    /// True when a register window is bound.
    #[must_use]
    pub fn is_hardware_bound(&self) -> bool {
        self.state == DeviceState::HardwareBound
    }

    /// Configuration supplied at init.
    #[must_use]
    pub const fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Bound window kind, if any.
    #[must_use]
    pub fn window_type(&self) -> Option<WindowType> {
        self.window.as_ref().map(|w| w.window_type())
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            DeviceState::HardwareBound | DeviceState::Emulated => Ok(()),
            other => Err(NeuraxError::not_initialized(format!("device is {other}"))),
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms)
    }

    /// Window to program, when bound and enabled.
    fn hardware(&mut self) -> Option<&mut (dyn RegisterWindow + 'static)> {
        if self.state == DeviceState::HardwareBound && self.config.use_hardware {
            self.window.as_deref_mut()
        } else {
            None
        }
    }

    /// 2-D convolution into a caller-sized `output`.
    ///
    /// # Errors
    ///
    /// `NotInitialized` after cleanup, `InvalidParam` on bad arguments.
    /// Hardware failures are logged, not returned.
    pub fn conv2d(
        &mut self,
        input: &Tensor,
        weights: &Tensor,
        bias: Option<&Tensor>,
        config: &ConvConfig,
        output: &mut Tensor,
    ) -> Result<()> {
        self.ensure_open()?;
        validate::validate_conv_call(input, weights, bias, config, output)?;
        debug!(
            "conv2d {}x{} kernel {}x{} -> {} channels",
            input.width(),
            input.height(),
            config.kernel_width,
            config.kernel_height,
            config.output_channels
        );

        let timeout = self.timeout();
        if let Some(window) = self.hardware() {
            if let Err(e) = protocol::program_conv(window, input, config, timeout) {
                warn!("Hardware conv2d failed: {e}; continuing on CPU");
            }
            debug!("No DMA path, computing conv2d on CPU");
        }
        kernels::conv2d_unchecked(input, weights, bias, config, output)
    }

    /// Pooling into a caller-sized `output`.
    ///
    /// # Errors
    ///
    /// `NotInitialized` after cleanup, `InvalidParam` on bad arguments.
    /// Hardware failures are logged, not returned.
    pub fn pooling(
        &mut self,
        input: &Tensor,
        config: &PoolConfig,
        output: &mut Tensor,
    ) -> Result<()> {
        self.ensure_open()?;
        validate::validate_pool_call(input, config, output)?;
        debug!(
            "pooling {:?} {}x{} window {}x{}",
            config.pool_type,
            input.width(),
            input.height(),
            config.pool_width,
            config.pool_height
        );

        let timeout = self.timeout();
        if let Some(window) = self.hardware() {
            if let Err(e) = protocol::program_pool(window, input, config, timeout) {
                warn!("Hardware pooling failed: {e}; continuing on CPU");
            }
        }
        kernels::pooling_unchecked(input, config, output)
    }

    /// Element-wise activation into a same-shaped `output`.
    ///
    /// # Errors
    ///
    /// `NotInitialized` after cleanup, `InvalidParam` on shape mismatch.
    /// Hardware failures are logged, not returned.
    pub fn activation(
        &mut self,
        input: &Tensor,
        activation: Activation,
        output: &mut Tensor,
    ) -> Result<()> {
        self.ensure_open()?;
        validate::validate_activation_call(input, output)?;
        debug!("activation {activation:?} over {} elements", input.total_elements());

        let timeout = self.timeout();
        if let Some(window) = self.hardware() {
            if let Err(e) = protocol::program_activation(window, input, activation, timeout) {
                warn!("Hardware activation failed: {e}; continuing on CPU");
            }
        }
        kernels::activation_unchecked(input, activation, output);
        Ok(())
    }

    /// Recommended configuration for this device.
    ///
    /// Hardware bound: i16 data, 64 multipliers, hardware on. Emulated:
    /// f32 data, 1 multiplier, hardware off.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` after cleanup.
    pub fn optimal_config(&self) -> Result<DeviceConfig> {
        self.ensure_open()?;
        let hw = self.is_hardware_bound();
        Ok(DeviceConfig {
            use_hardware: hw,
            max_kernel_size: limits::MAX_KERNEL_SIZE,
            num_multipliers: if hw {
                limits::HW_MULTIPLIERS
            } else {
                limits::CPU_MULTIPLIERS
            },
            data_type: if hw { DataType::I16 } else { DataType::F32 },
            ..self.config.clone()
        })
    }

    /// Decoded status register, `None` when emulated.
    ///
    /// # Errors
    ///
    /// `NotInitialized` after cleanup, or a register access error.
    pub fn status(&self) -> Result<Option<StatusWord>> {
        self.ensure_open()?;
        self.window
            .as_ref()
            .map(|w| w.read_register(regs::STATUS).map(StatusWord::decode))
            .transpose()
    }

    /// Snapshot for display.
    #[must_use]
    pub fn info(&self) -> DeviceInfo {
        DeviceInfo {
            version: crate::version(),
            state: self.state,
            window_type: self.window_type(),
            base_address: self.config.base_address,
            window_size: self.config.window_size(),
            use_hardware: self.config.use_hardware,
            max_kernel_size: self.config.max_kernel_size,
            num_multipliers: self.config.num_multipliers,
            data_type: self.config.data_type,
            timeout_ms: self.config.timeout_ms,
            status: self.status().ok().flatten(),
        }
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        if self.state != DeviceState::Closed {
            if let Err(e) = self.cleanup() {
                debug!("cleanup on drop: {e}");
            }
        }
    }
}

/// Human-readable device summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Library version string
    pub version: &'static str,
    /// Lifecycle state
    pub state: DeviceState,
    /// Bound window kind
    pub window_type: Option<WindowType>,
    /// Configured base address
    pub base_address: u64,
    /// Register window size
    pub window_size: usize,
    /// Hardware path enabled by configuration
    pub use_hardware: bool,
    /// Largest supported kernel
    pub max_kernel_size: u32,
    /// Parallel multipliers
    pub num_multipliers: u32,
    /// Default element type
    pub data_type: DataType,
    /// Completion timeout
    pub timeout_ms: u64,
    /// Status register, when bound
    pub status: Option<StatusWord>,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.version)?;
        writeln!(
            f,
            "  Hardware:      {}",
            match self.window_type {
                Some(w) => format!("available ({w})"),
                None => "not available (CPU emulation)".to_string(),
            }
        )?;
        writeln!(f, "  State:         {}", self.state)?;
        writeln!(f, "  Use hardware:  {}", self.use_hardware)?;
        writeln!(f, "  Base address:  {:#010x}", self.base_address)?;
        writeln!(f, "  Window size:   {} bytes", self.window_size)?;
        writeln!(f, "  Max kernel:    {}x{}", self.max_kernel_size, self.max_kernel_size)?;
        writeln!(f, "  Multipliers:   {}", self.num_multipliers)?;
        writeln!(f, "  Data type:     {}", self.data_type)?;
        write!(f, "  Timeout:       {} ms", self.timeout_ms)?;
        if let Some(s) = self.status {
            write!(
                f,
                "\n  Status:        busy={} done={} error={}",
                u8::from(s.busy),
                u8::from(s.done),
                u8::from(s.error)
            )?;
        }
        Ok(())
    }
}
