// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for NEURAX driver operations

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for NEURAX operations
pub type Result<T> = std::result::Result<T, NeuraxError>;

/// Errors that can occur during NEURAX operations
///
/// Every variant maps onto the integer taxonomy of the accelerator's C ABI
/// through [`NeuraxError::code`].
#[derive(Debug, Error)]
pub enum NeuraxError {
    /// Argument out of range, zero dimension or shape mismatch
    #[error("Invalid parameter: {reason}")]
    InvalidParam {
        /// What was wrong
        reason: String,
    },

    /// Device used before init or after cleanup
    #[error("Not initialized: {state}")]
    NotInitialized {
        /// Current state description
        state: String,
    },

    /// Device node missing or unmappable
    #[error("Device not found: {path}")]
    DeviceNotFound {
        /// Path that was checked
        path: PathBuf,
    },

    /// Storage could not be reserved
    #[error("Memory allocation failed: {bytes} bytes")]
    AllocationFailed {
        /// Requested size
        bytes: usize,
    },

    /// Status register reported the error bit
    #[error("Hardware failure: status={status:#x}")]
    HardwareFailure {
        /// Raw status register value
        status: u32,
    },

    /// Completion polling exceeded its budget
    #[error("Timeout after {duration_ms}ms")]
    Timeout {
        /// Timeout duration in milliseconds
        duration_ms: u64,
    },

    /// Reserved for model loading
    #[error("Invalid model: {reason}")]
    InvalidModel {
        /// Reason for rejection
        reason: String,
    },

    /// Copy request exceeds tensor capacity
    #[error("Buffer overflow: {requested} bytes into {capacity}")]
    BufferOverflow {
        /// Bytes offered
        requested: usize,
        /// Bytes available
        capacity: usize,
    },

    /// I/O error while talking to the device node
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },
}

impl NeuraxError {
    /// Create an invalid parameter error
    pub fn invalid_param(reason: impl Into<String>) -> Self {
        Self::InvalidParam {
            reason: reason.into(),
        }
    }

    /// Create a not initialized error
    pub fn not_initialized(state: impl Into<String>) -> Self {
        Self::NotInitialized {
            state: state.into(),
        }
    }

    /// Create a device not found error
    pub fn device_not_found(path: impl Into<PathBuf>) -> Self {
        Self::DeviceNotFound { path: path.into() }
    }

    /// Create an invalid model error
    pub fn invalid_model(reason: impl Into<String>) -> Self {
        Self::InvalidModel {
            reason: reason.into(),
        }
    }

    /// Integer code used by the accelerator's C ABI.
    ///
    /// I/O errors surface as `DeviceNotFound` (-3), which is how the device
    /// probe reports them.
    pub const fn code(&self) -> i32 {
        match self {
            Self::InvalidParam { .. } => -1,
            Self::NotInitialized { .. } => -2,
            Self::DeviceNotFound { .. } | Self::Io { .. } => -3,
            Self::AllocationFailed { .. } => -4,
            Self::HardwareFailure { .. } => -5,
            Self::Timeout { .. } => -6,
            Self::InvalidModel { .. } => -7,
            Self::BufferOverflow { .. } => -8,
        }
    }
}

/// Short description for an integer error code, `0` included.
pub const fn describe_code(code: i32) -> &'static str {
    match code {
        0 => "Success",
        -1 => "Invalid parameter",
        -2 => "Not initialized",
        -3 => "Device not found",
        -4 => "Memory allocation failed",
        -5 => "Hardware failure",
        -6 => "Timeout",
        -7 => "Invalid model",
        -8 => "Buffer overflow",
        _ => "Unknown error",
    }
}
