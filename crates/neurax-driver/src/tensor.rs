// SPDX-License-Identifier: AGPL-3.0-only

//! Tensor model
//!
//! A tensor is a dense 4-D buffer shaped `[batch, height, width, channels]`
//! (channels innermost) that exclusively owns its storage. Storage is a
//! [`TensorData`] variant per element type; every write, whatever the access
//! style, goes through [`TensorData::write`] so the clamp-then-round rule is
//! applied in exactly one place.
//!
//! When a tensor holds convolution weights its dimensions are read as
//! `[output_channels, input_channels, kernel_height, kernel_width]`:
//! `batch` is the output channel count and `channels` the input channel
//! count. See [`Tensor::weight`].

use crate::dtype::DataType;
use crate::error::{NeuraxError, Result};

/// Typed backing storage.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    /// Unsigned 8-bit elements.
    U8(Vec<u8>),
    /// Signed 8-bit elements.
    I8(Vec<i8>),
    /// Unsigned 16-bit elements.
    U16(Vec<u16>),
    /// Signed 16-bit elements.
    I16(Vec<i16>),
    /// 32-bit float elements.
    F32(Vec<f32>),
}

impl TensorData {
    /// Zero-filled storage of `len` elements.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailed` if the allocator refuses the request.
    pub fn zeroed(dtype: DataType, len: usize) -> Result<Self> {
        fn alloc<T: Clone + Default>(len: usize, elem: usize) -> Result<Vec<T>> {
            let mut v = Vec::new();
            v.try_reserve_exact(len)
                .map_err(|_| NeuraxError::AllocationFailed {
                    bytes: len.saturating_mul(elem),
                })?;
            v.resize(len, T::default());
            Ok(v)
        }
        let size = dtype.element_size();
        Ok(match dtype {
            DataType::U8 => Self::U8(alloc(len, size)?),
            DataType::I8 => Self::I8(alloc(len, size)?),
            DataType::U16 => Self::U16(alloc(len, size)?),
            DataType::I16 => Self::I16(alloc(len, size)?),
            DataType::F32 => Self::F32(alloc(len, size)?),
        })
    }

    /// Element type of this storage.
    pub const fn dtype(&self) -> DataType {
        match self {
            Self::U8(_) => DataType::U8,
            Self::I8(_) => DataType::I8,
            Self::U16(_) => DataType::U16,
            Self::I16(_) => DataType::I16,
            Self::F32(_) => DataType::F32,
        }
    }

    /// Element count.
    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::I8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::I16(v) => v.len(),
            Self::F32(v) => v.len(),
        }
    }

    /// True when there are no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read element `index`, promoted to `f32`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn read(&self, index: usize) -> f32 {
        match self {
            Self::U8(v) => f32::from(v[index]),
            Self::I8(v) => f32::from(v[index]),
            Self::U16(v) => f32::from(v[index]),
            Self::I16(v) => f32::from(v[index]),
            Self::F32(v) => v[index],
        }
    }

    /// Store `value` at `index` with clamp-then-round saturation.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    // Casts are exact: `saturate` has already clamped and rounded into range.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn write(&mut self, index: usize, value: f32) {
        let value = self.dtype().saturate(value);
        match self {
            Self::U8(v) => v[index] = value as u8,
            Self::I8(v) => v[index] = value as i8,
            Self::U16(v) => v[index] = value as u16,
            Self::I16(v) => v[index] = value as i16,
            Self::F32(v) => v[index] = value,
        }
    }

    /// Raw native-endian bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::U8(v) => v.as_slice(),
            Self::I8(v) => bytemuck::cast_slice(v),
            Self::U16(v) => bytemuck::cast_slice(v),
            Self::I16(v) => bytemuck::cast_slice(v),
            Self::F32(v) => bytemuck::cast_slice(v),
        }
    }

    /// Mutable raw native-endian bytes.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        match self {
            Self::U8(v) => v.as_mut_slice(),
            Self::I8(v) => bytemuck::cast_slice_mut(v),
            Self::U16(v) => bytemuck::cast_slice_mut(v),
            Self::I16(v) => bytemuck::cast_slice_mut(v),
            Self::F32(v) => bytemuck::cast_slice_mut(v),
        }
    }

    fn fill_zero(&mut self) {
        self.as_bytes_mut().fill(0);
    }
}

/// Owned 4-D tensor, `[batch, height, width, channels]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    width: usize,
    height: usize,
    channels: usize,
    batch: usize,
    data: TensorData,
}

impl Tensor {
    /// Create a zero-initialised tensor.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParam` if any dimension is zero or the element count
    /// overflows, `AllocationFailed` if storage cannot be reserved.
    pub fn new(
        width: usize,
        height: usize,
        channels: usize,
        batch: usize,
        dtype: DataType,
    ) -> Result<Self> {
        let len = element_count(width, height, channels, batch)?;
        len.checked_mul(dtype.element_size())
            .ok_or_else(|| NeuraxError::invalid_param("tensor byte length overflows usize"))?;
        Ok(Self {
            width,
            height,
            channels,
            batch,
            data: TensorData::zeroed(dtype, len)?,
        })
    }

    /// Wrap existing storage.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParam` if a dimension is zero or the storage length
    /// does not equal the product of the dimensions.
    pub fn from_data(
        width: usize,
        height: usize,
        channels: usize,
        batch: usize,
        data: TensorData,
    ) -> Result<Self> {
        let len = element_count(width, height, channels, batch)?;
        if data.len() != len {
            return Err(NeuraxError::invalid_param(format!(
                "storage holds {} elements, dimensions need {len}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            batch,
            data,
        })
    }

    /// Single-batch f32 tensor from a flat `[height, width, channels]` slice.
    ///
    /// # Errors
    ///
    /// Same as [`Tensor::from_data`].
    pub fn from_f32(width: usize, height: usize, channels: usize, values: &[f32]) -> Result<Self> {
        Self::from_data(width, height, channels, 1, TensorData::F32(values.to_vec()))
    }

    /// Width.
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Height.
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Channels.
    pub const fn channels(&self) -> usize {
        self.channels
    }

    /// Batch size.
    pub const fn batch(&self) -> usize {
        self.batch
    }

    /// Element type.
    pub const fn dtype(&self) -> DataType {
        self.data.dtype()
    }

    /// Backing storage.
    pub const fn data(&self) -> &TensorData {
        &self.data
    }

    /// `width * height * channels * batch`.
    pub const fn total_elements(&self) -> usize {
        self.width * self.height * self.channels * self.batch
    }

    /// Storage size in bytes.
    pub fn byte_len(&self) -> usize {
        self.data.as_bytes().len()
    }

    /// Copy raw bytes into the front of the tensor.
    ///
    /// Shorter input leaves the tail untouched.
    ///
    /// # Errors
    ///
    /// Returns `BufferOverflow` if `bytes` is longer than the tensor.
    pub fn set_data(&mut self, bytes: &[u8]) -> Result<()> {
        let dst = self.data.as_bytes_mut();
        if bytes.len() > dst.len() {
            return Err(NeuraxError::BufferOverflow {
                requested: bytes.len(),
                capacity: dst.len(),
            });
        }
        dst[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Copy the front of the tensor into `out`.
    ///
    /// # Errors
    ///
    /// Returns `BufferOverflow` if `out` is longer than the tensor.
    pub fn get_data(&self, out: &mut [u8]) -> Result<()> {
        let src = self.data.as_bytes();
        if out.len() > src.len() {
            return Err(NeuraxError::BufferOverflow {
                requested: out.len(),
                capacity: src.len(),
            });
        }
        out.copy_from_slice(&src[..out.len()]);
        Ok(())
    }

    /// Linear index of `(batch, y, x, channel)`.
    pub const fn index(&self, batch: usize, y: usize, x: usize, channel: usize) -> usize {
        ((batch * self.height + y) * self.width + x) * self.channels + channel
    }

    /// Read an element as `f32`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate lies outside the tensor.
    pub fn get(&self, batch: usize, y: usize, x: usize, channel: usize) -> f32 {
        self.data.read(self.index(batch, y, x, channel))
    }

    /// Write an element with saturation.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate lies outside the tensor.
    pub fn set(&mut self, batch: usize, y: usize, x: usize, channel: usize, value: f32) {
        let i = self.index(batch, y, x, channel);
        self.data.write(i, value);
    }

    /// Read by flat index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= total_elements()`.
    pub fn get_linear(&self, index: usize) -> f32 {
        self.data.read(index)
    }

    /// Write by flat index with saturation.
    ///
    /// # Panics
    ///
    /// Panics if `index >= total_elements()`.
    pub fn set_linear(&mut self, index: usize, value: f32) {
        self.data.write(index, value);
    }

    /// Weight tap `(out_ch, in_ch, ky, kx)` under the weight layout.
    ///
    /// # Panics
    ///
    /// Panics if the tap lies outside the tensor.
    pub fn weight(&self, out_ch: usize, in_ch: usize, ky: usize, kx: usize) -> f32 {
        let i = ((out_ch * self.channels + in_ch) * self.height + ky) * self.width + kx;
        self.data.read(i)
    }

    /// Bias for output channel `ch` (flat index).
    ///
    /// # Panics
    ///
    /// Panics if `ch >= total_elements()`.
    pub fn bias(&self, ch: usize) -> f32 {
        self.data.read(ch)
    }

    /// Converted copy with the same shape.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailed` if storage cannot be reserved.
    pub fn to_dtype(&self, dtype: DataType) -> Result<Self> {
        let mut out = Self::new(self.width, self.height, self.channels, self.batch, dtype)?;
        crate::convert::convert_data_type(self, &mut out)?;
        Ok(out)
    }

    /// Same width, height, channels and batch.
    pub fn same_shape(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.channels == other.channels
            && self.batch == other.batch
    }

    /// Zero every element.
    pub fn clear(&mut self) {
        self.data.fill_zero();
    }

    /// Copy of a single channel as a `[batch, h, w, 1]` tensor.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParam` if `channel` is out of range.
    pub fn extract_channel(&self, channel: usize) -> Result<Self> {
        if channel >= self.channels {
            return Err(NeuraxError::invalid_param(format!(
                "channel {channel} out of range ({} channels)",
                self.channels
            )));
        }
        let mut out = Self::new(self.width, self.height, 1, self.batch, self.dtype())?;
        for b in 0..self.batch {
            for y in 0..self.height {
                for x in 0..self.width {
                    out.set(b, y, x, 0, self.get(b, y, x, channel));
                }
            }
        }
        Ok(out)
    }

    /// Write a single-channel tensor into `channel`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParam` if `channel` is out of range or `src` is not a
    /// single-channel tensor of matching spatial size and batch.
    pub fn insert_channel(&mut self, channel: usize, src: &Self) -> Result<()> {
        if channel >= self.channels
            || src.channels != 1
            || src.width != self.width
            || src.height != self.height
            || src.batch != self.batch
        {
            return Err(NeuraxError::invalid_param(format!(
                "cannot insert {}x{}x{}x{} into channel {channel} of {}x{}x{}x{}",
                src.batch,
                src.height,
                src.width,
                src.channels,
                self.batch,
                self.height,
                self.width,
                self.channels
            )));
        }
        for b in 0..self.batch {
            for y in 0..self.height {
                for x in 0..self.width {
                    self.set(b, y, x, channel, src.get(b, y, x, 0));
                }
            }
        }
        Ok(())
    }
}

fn element_count(width: usize, height: usize, channels: usize, batch: usize) -> Result<usize> {
    if width == 0 || height == 0 || channels == 0 || batch == 0 {
        return Err(NeuraxError::invalid_param(format!(
            "zero dimension: {width}x{height}x{channels}x{batch}"
        )));
    }
    width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(channels))
        .and_then(|n| n.checked_mul(batch))
        .ok_or_else(|| NeuraxError::invalid_param("tensor element count overflows usize"))
}
