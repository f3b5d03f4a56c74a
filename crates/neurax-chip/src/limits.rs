// SPDX-License-Identifier: AGPL-3.0-only

//! Hardware ceilings.
//!
//! These bound what the register fields and the MAC array can express. The
//! software path enforces the same limits so a configuration accepted in
//! emulation is always one the hardware accepts.

/// Largest convolution kernel edge.
pub const MAX_KERNEL_SIZE: u32 = 11;

/// Largest convolution stride.
pub const MAX_CONV_STRIDE: u32 = 8;

/// Largest pooling window edge.
pub const MAX_POOL_SIZE: u32 = 8;

/// Parallel multipliers in the MAC array.
pub const HW_MULTIPLIERS: u32 = 64;

/// Multipliers reported for the serial CPU path.
pub const CPU_MULTIPLIERS: u32 = 1;
