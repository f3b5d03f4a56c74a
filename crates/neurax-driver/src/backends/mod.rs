// SPDX-License-Identifier: AGPL-3.0-only

//! Register window backends
//!
//! The device never sees a raw pointer. It programs the accelerator
//! through a [`RegisterWindow`]:
//!
//! ```text
//! MmapWindow         /dev/neurax0 or /dev/uio0 mapped with mmap (real hardware)
//! SoftwareRegisters  in-memory register file (tests, custom platforms)
//! ```

mod mmap;
mod software;

pub use mmap::MmapWindow;
pub use software::{CompletionMode, SoftwareRegisters};

use crate::error::Result;
use std::fmt::{self, Debug};

/// 32-bit register access to the accelerator.
///
/// Offsets are byte offsets from the start of the window and must be
/// 4-byte aligned and inside the window.
pub trait RegisterWindow: Debug + Send {
    /// Read the register at `offset`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParam` for a misaligned or out-of-window offset.
    fn read_register(&self, offset: usize) -> Result<u32>;

    /// Write `value` to the register at `offset`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParam` for a misaligned or out-of-window offset.
    fn write_register(&mut self, offset: usize, value: u32) -> Result<()>;

    /// Window size in bytes.
    fn size(&self) -> usize;

    /// Backend kind, for logs and device info.
    fn window_type(&self) -> WindowType;
}

/// Register window implementation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowType {
    /// Memory-mapped device node
    Mmio,
    /// In-memory register file
    Software,
}

impl fmt::Display for WindowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mmio => write!(f, "mmio"),
            Self::Software => write!(f, "software"),
        }
    }
}

/// Shared bounds and alignment check for window implementations.
pub(crate) fn check_offset(offset: usize, size: usize) -> Result<()> {
    if offset % 4 != 0 || offset.checked_add(4).map_or(true, |end| end > size) {
        return Err(crate::error::NeuraxError::invalid_param(format!(
            "register offset {offset:#x} invalid for {size:#x}-byte window"
        )));
    }
    Ok(())
}
