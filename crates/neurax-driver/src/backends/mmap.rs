// SPDX-License-Identifier: AGPL-3.0-only

//! Memory-mapped register window
//!
//! Maps the accelerator's register block from its character device with
//! `rustix::mm::mmap`. All unsafe code for the hardware path lives in this
//! file; everything above it goes through the bounds-checked
//! [`RegisterWindow`] methods.

use super::{check_offset, RegisterWindow, WindowType};
use crate::error::{NeuraxError, Result};
use neurax_chip::regs;
use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};
use std::fs::{File, OpenOptions};
use std::os::unix::io::AsFd;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

/// Register window mapped from a device node.
#[derive(Debug)]
pub struct MmapWindow {
    ptr: NonNull<u8>,
    size: usize,
    _file: File,
    path: PathBuf,
}

impl MmapWindow {
    /// Map `size` bytes from the first node in `paths` that opens and maps.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParam` if `paths` is empty or `size` cannot hold the
    /// register block, `DeviceNotFound` naming the last node tried if none
    /// could be opened and mapped.
    pub fn open<P: AsRef<Path>>(paths: &[P], size: usize) -> Result<Self> {
        if size < regs::BLOCK_SIZE {
            return Err(NeuraxError::invalid_param(format!(
                "window of {size} bytes cannot hold the {}-byte register block",
                regs::BLOCK_SIZE
            )));
        }

        let mut last = None;
        for path in paths {
            let path = path.as_ref();
            match Self::map(path, size) {
                Ok(window) => return Ok(window),
                Err(e) => {
                    tracing::debug!("Cannot map {}: {e}", path.display());
                    last = Some(path.to_path_buf());
                }
            }
        }
        Err(last.map_or_else(
            || NeuraxError::invalid_param("no device paths to probe"),
            NeuraxError::device_not_found,
        ))
    }

    fn map(path: &Path, size: usize) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        // SAFETY: mmap preconditions:
        // - fd is valid (just opened, kept alive in `_file` for the mapping's lifetime)
        // - size is non-zero (checked against BLOCK_SIZE by the caller)
        // - PROT_READ|PROT_WRITE with MAP_SHARED is what register access needs
        // - offset 0 is the start of the register block
        // - the mapping is unmapped exactly once, in Drop
        let addr = unsafe {
            mmap(
                std::ptr::null_mut(),
                size,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                file.as_fd(),
                0,
            )
        }
        .map_err(|e| NeuraxError::from(std::io::Error::from(e)))?;

        let ptr = NonNull::new(addr.cast::<u8>())
            .ok_or_else(|| NeuraxError::device_not_found(path))?;

        tracing::info!("Mapped {} ({size:#x} bytes at {ptr:p})", path.display());

        Ok(Self {
            ptr,
            size,
            _file: file,
            path: path.to_path_buf(),
        })
    }

    /// Device node backing this window.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegisterWindow for MmapWindow {
    fn read_register(&self, offset: usize) -> Result<u32> {
        check_offset(offset, self.size)?;

        // SAFETY: volatile read from the mapped register block.
        // - offset + 4 <= size and offset is 4-byte aligned (checked above)
        // - ptr comes from a successful mmap that lives as long as self
        // - mmap returns page-aligned memory, so ptr + offset is u32-aligned
        // - volatile: the hardware changes STATUS behind our back
        #[allow(clippy::cast_ptr_alignment)]
        let value = unsafe { self.ptr.as_ptr().add(offset).cast::<u32>().read_volatile() };

        tracing::trace!("mmio read {} = {value:#x}", regs::name(offset));
        Ok(value)
    }

    fn write_register(&mut self, offset: usize, value: u32) -> Result<()> {
        check_offset(offset, self.size)?;
        tracing::trace!("mmio write {} = {value:#x}", regs::name(offset));

        // SAFETY: volatile write to the mapped register block.
        // - offset + 4 <= size and offset is 4-byte aligned (checked above)
        // - ptr comes from a successful mmap that lives as long as self
        // - volatile: writes to CONTROL trigger hardware actions and must not
        //   be merged or reordered
        #[allow(clippy::cast_ptr_alignment)]
        unsafe {
            self.ptr.as_ptr().add(offset).cast::<u32>().write_volatile(value);
        }
        Ok(())
    }

    fn size(&self) -> usize {
        self.size
    }

    fn window_type(&self) -> WindowType {
        WindowType::Mmio
    }
}

impl Drop for MmapWindow {
    fn drop(&mut self) {
        tracing::debug!("Unmapping {} ({:#x} bytes)", self.path.display(), self.size);

        // SAFETY: ptr and size are exactly what mmap returned and was given in
        // `map`; Drop runs once, so the mapping is released exactly once.
        unsafe {
            if let Err(e) = munmap(self.ptr.as_ptr().cast(), self.size) {
                tracing::error!("munmap failed during drop: {e}");
            }
        }
    }
}

// SAFETY: MmapWindow owns its mapping exclusively. Moving it to another
// thread does not invalidate the mapping; the fd travels with it. Writes need
// &mut self, so the Device's single-owner contract serialises register access.
unsafe impl Send for MmapWindow {}
