// SPDX-License-Identifier: AGPL-3.0-only

//! Register window geometry and timing.
//!
//! The accelerator exposes its registers through a character device that is
//! mapped with `mmap` at offset 0. Two device nodes are probed in order:
//!
//! ```text
//! /dev/neurax0   vendor driver node
//! /dev/uio0      generic UIO node (FPGA bitstream without vendor driver)
//! ```

/// Vendor driver device node.
pub const DEVICE_PATH: &str = "/dev/neurax0";

/// Generic UIO device node.
pub const UIO_PATH: &str = "/dev/uio0";

/// Probe order used when the caller does not supply paths.
pub const PROBE_PATHS: [&str; 2] = [DEVICE_PATH, UIO_PATH];

/// Window size mapped when the configuration leaves it at zero (64 KiB).
pub const DEFAULT_WINDOW_SIZE: usize = 0x1_0000;

/// Status polling interval.
pub const POLL_INTERVAL_US: u64 = 100;

/// Time the reset bit is held high.
pub const RESET_PULSE_US: u64 = 1_000;

/// Default completion timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
