// SPDX-License-Identifier: AGPL-3.0-only

//! Runtime for the NEURAX convolution accelerator.
//!
//! Uniform tensor operations (convolution, pooling, activation) backed by
//! two execution paths: a register-programmed accelerator mapped from
//! `/dev/neurax0` or `/dev/uio0`, and CPU reference kernels with the same
//! numeric contract. Missing hardware is never fatal; the device drops to
//! emulation and every result still comes from the CPU kernels.
//!
//! # Layers
//!
//! ```text
//! Device       lifecycle, hardware leg + CPU kernel per operation
//!   protocol   config words → registers, START, poll STATUS
//!   backends   RegisterWindow: MmapWindow (rustix mmap) | SoftwareRegisters
//!   kernels    conv2d / pooling / activation, nested loops
//!   validate   pure argument checks, hardware ceilings
//! Tensor       owned [batch, h, w, c] storage, five element types
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use neurax_driver::{Activation, ConvConfig, DataType, Device, DeviceConfig, Tensor};
//!
//! # fn main() -> neurax_driver::Result<()> {
//! let mut dev = Device::init(DeviceConfig::from_env()?);
//! println!("{}", dev.info());
//!
//! let input = Tensor::new(32, 32, 3, 1, DataType::F32)?;
//! let weights = Tensor::new(3, 3, 3, 16, DataType::F32)?;
//! let mut out = Tensor::new(32, 32, 16, 1, DataType::F32)?;
//! let cfg = ConvConfig::square(3, 1, 1, 3, 16).with_activation(Activation::Relu);
//! dev.conv2d(&input, &weights, None, &cfg, &mut out)?;
//! dev.cleanup()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod backends;
pub mod bench;
mod config;
mod convert;
mod device;
mod dtype;
mod error;
pub mod filter;
pub mod kernels;
mod perf;
pub mod protocol;
mod tensor;
pub mod validate;

/// Register map re-exported from `neurax-chip`.
pub use neurax_chip::{limits, regs};

pub use config::{
    Activation, ConvConfig, DeviceConfig, PoolConfig, PoolType, ENV_DEVICE, ENV_TIMEOUT_MS,
    ENV_USE_HARDWARE,
};
pub use convert::convert_data_type;
pub use device::{Device, DeviceInfo, DeviceState};
pub use dtype::DataType;
pub use error::{describe_code, NeuraxError, Result};
pub use perf::{PerfCounter, PerfStats};
pub use tensor::{Tensor, TensorData};

/// Library version string.
pub const fn version() -> &'static str {
    concat!("NEURAX v", env!("CARGO_PKG_VERSION"))
}
