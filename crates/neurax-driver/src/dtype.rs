// SPDX-License-Identifier: AGPL-3.0-only

//! Element types and the saturation rule.

use crate::error::{NeuraxError, Result};
use std::fmt;
use std::str::FromStr;

/// Tensor element type.
///
/// Discriminants match the accelerator's C ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataType {
    /// Unsigned 8-bit.
    U8 = 0,
    /// Signed 8-bit.
    I8 = 1,
    /// Unsigned 16-bit.
    U16 = 2,
    /// Signed 16-bit.
    I16 = 3,
    /// 32-bit float.
    #[default]
    F32 = 4,
}

impl DataType {
    /// All element types, in ABI order.
    pub const ALL: [Self; 5] = [Self::U8, Self::I8, Self::U16, Self::I16, Self::F32];

    /// Bytes per element.
    pub const fn element_size(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::F32 => 4,
        }
    }

    /// Whether the hardware must run its 16/32-bit data path.
    pub const fn is_wide(self) -> bool {
        !matches!(self, Self::U8 | Self::I8)
    }

    /// Representable range, `None` for float.
    pub const fn range(self) -> Option<(f32, f32)> {
        match self {
            Self::U8 => Some((0.0, 255.0)),
            Self::I8 => Some((-128.0, 127.0)),
            Self::U16 => Some((0.0, 65_535.0)),
            Self::I16 => Some((-32_768.0, 32_767.0)),
            Self::F32 => None,
        }
    }

    /// Clamp-then-round a value into this type's range.
    ///
    /// Rounds half away from zero. NaN saturates to 0 for integer types.
    /// Float passes through untouched.
    pub fn saturate(self, value: f32) -> f32 {
        match self.range() {
            None => value,
            Some(_) if value.is_nan() => 0.0,
            Some((lo, hi)) => value.clamp(lo, hi).round(),
        }
    }

    /// Look up a type by its ABI code.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParam` for codes outside `0..=4`.
    pub fn from_code(code: u32) -> Result<Self> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or_else(|| NeuraxError::invalid_param(format!("unknown data type code {code}")))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::U8 => "u8",
            Self::I8 => "i8",
            Self::U16 => "u16",
            Self::I16 => "i16",
            Self::F32 => "f32",
        };
        f.write_str(name)
    }
}

impl FromStr for DataType {
    type Err = NeuraxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "u8" | "uint8" => Ok(Self::U8),
            "i8" | "int8" => Ok(Self::I8),
            "u16" | "uint16" => Ok(Self::U16),
            "i16" | "int16" => Ok(Self::I16),
            "f32" | "float32" | "float" => Ok(Self::F32),
            other => Err(NeuraxError::invalid_param(format!("unknown data type '{other}'"))),
        }
    }
}
