// SPDX-License-Identifier: AGPL-3.0-only

//! In-memory register file
//!
//! Behaves like the accelerator's register block closely enough to drive the
//! full protocol without hardware: writing `START` to the control register
//! resolves the status register according to the [`CompletionMode`]. Every
//! write is logged so tests can assert the exact words the driver produced.

use super::{check_offset, RegisterWindow, WindowType};
use crate::error::Result;
use neurax_chip::regs::{self, control, status};
use tracing::trace;

/// How a started operation resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionMode {
    /// Status reads `DONE` immediately.
    #[default]
    Complete,
    /// Status reads `DONE | ERROR`.
    Fail,
    /// Status stays `BUSY` forever.
    Hang,
}

/// Software register window.
#[derive(Debug, Clone)]
pub struct SoftwareRegisters {
    regs: Vec<u32>,
    mode: CompletionMode,
    writes: Vec<(usize, u32)>,
}

impl SoftwareRegisters {
    /// Register file covering the register block, completing immediately.
    pub fn new() -> Self {
        Self::with_mode(CompletionMode::Complete)
    }

    /// Register file with a chosen completion behaviour.
    pub fn with_mode(mode: CompletionMode) -> Self {
        Self {
            regs: vec![0; regs::BLOCK_SIZE / 4],
            mode,
            writes: Vec::new(),
        }
    }

    /// Change how the next started operation resolves.
    pub fn set_mode(&mut self, mode: CompletionMode) {
        self.mode = mode;
    }

    /// Every `(offset, value)` written so far, in order.
    pub fn writes(&self) -> &[(usize, u32)] {
        &self.writes
    }

    /// Last value written to `offset`.
    pub fn last_write(&self, offset: usize) -> Option<u32> {
        self.writes
            .iter()
            .rev()
            .find(|(o, _)| *o == offset)
            .map(|(_, v)| *v)
    }

    /// Forget the write log.
    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }
}

impl Default for SoftwareRegisters {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterWindow for SoftwareRegisters {
    fn read_register(&self, offset: usize) -> Result<u32> {
        check_offset(offset, self.size())?;
        let value = self.regs[offset / 4];
        trace!("sw read {} = {value:#x}", regs::name(offset));
        Ok(value)
    }

    fn write_register(&mut self, offset: usize, value: u32) -> Result<()> {
        check_offset(offset, self.size())?;
        trace!("sw write {} = {value:#x}", regs::name(offset));
        self.writes.push((offset, value));

        // Status is read-only on hardware.
        if offset == regs::STATUS {
            return Ok(());
        }
        self.regs[offset / 4] = value;

        if offset == regs::CONTROL {
            if value & control::RESET != 0 {
                self.regs[regs::STATUS / 4] = 0;
            } else if value & control::START != 0 {
                self.regs[regs::STATUS / 4] = match self.mode {
                    CompletionMode::Complete => status::DONE,
                    CompletionMode::Fail => status::DONE | status::ERROR,
                    CompletionMode::Hang => status::BUSY,
                };
            }
        }
        Ok(())
    }

    fn size(&self) -> usize {
        self.regs.len() * 4
    }

    fn window_type(&self) -> WindowType {
        WindowType::Software
    }
}
