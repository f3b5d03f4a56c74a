// SPDX-License-Identifier: AGPL-3.0-only

//! Validation of tensors and operation configurations.
//!
//! Pure functions. Every check runs before any output is touched. The
//! kernel and stride ceilings come from the hardware; the software path
//! enforces them too so emulation never accepts a configuration the device
//! would refuse.

use crate::config::{ConvConfig, PoolConfig};
use crate::error::{NeuraxError, Result};
use crate::tensor::Tensor;
use neurax_chip::limits::{MAX_CONV_STRIDE, MAX_KERNEL_SIZE, MAX_POOL_SIZE};

/// Check dimensions and storage length.
///
/// # Errors
///
/// Returns `InvalidParam` on a zero dimension or a storage length that does
/// not match the dimensions.
pub fn validate_tensor(tensor: &Tensor) -> Result<()> {
    if tensor.width() == 0
        || tensor.height() == 0
        || tensor.channels() == 0
        || tensor.batch() == 0
    {
        return Err(NeuraxError::invalid_param("tensor has a zero dimension"));
    }
    let expected = tensor.total_elements() * tensor.dtype().element_size();
    if tensor.byte_len() != expected {
        return Err(NeuraxError::invalid_param(format!(
            "tensor holds {} bytes, dimensions need {expected}",
            tensor.byte_len()
        )));
    }
    Ok(())
}

/// Check convolution geometry against the hardware ceilings.
///
/// # Errors
///
/// Returns `InvalidParam` for kernel sides outside `1..=11`, strides outside
/// `1..=8`, zero channel counts or an unknown activation.
pub fn validate_conv_config(config: &ConvConfig) -> Result<()> {
    for (name, k) in [("width", config.kernel_width), ("height", config.kernel_height)] {
        if k == 0 || k > MAX_KERNEL_SIZE {
            return Err(NeuraxError::invalid_param(format!(
                "kernel {name} {k} outside 1..={MAX_KERNEL_SIZE}"
            )));
        }
    }
    for (name, s) in [("x", config.stride_x), ("y", config.stride_y)] {
        if s == 0 || s > MAX_CONV_STRIDE {
            return Err(NeuraxError::invalid_param(format!(
                "stride {name} {s} outside 1..={MAX_CONV_STRIDE}"
            )));
        }
    }
    if config.input_channels == 0 || config.output_channels == 0 {
        return Err(NeuraxError::invalid_param(format!(
            "channel counts must be non-zero (in {}, out {})",
            config.input_channels, config.output_channels
        )));
    }
    if !config.activation.is_known() {
        return Err(NeuraxError::invalid_param(format!(
            "unknown activation selector {}",
            config.activation.selector()
        )));
    }
    Ok(())
}

/// Check pooling geometry against the hardware ceilings.
///
/// # Errors
///
/// Returns `InvalidParam` for window sides outside `1..=8`, a zero stride or
/// an unknown pool type.
pub fn validate_pool_config(config: &PoolConfig) -> Result<()> {
    for (name, p) in [("width", config.pool_width), ("height", config.pool_height)] {
        if p == 0 || p > MAX_POOL_SIZE {
            return Err(NeuraxError::invalid_param(format!(
                "pool {name} {p} outside 1..={MAX_POOL_SIZE}"
            )));
        }
    }
    if config.stride_x == 0 || config.stride_y == 0 {
        return Err(NeuraxError::invalid_param("pool stride must be non-zero"));
    }
    if !config.pool_type.is_known() {
        return Err(NeuraxError::invalid_param(format!(
            "unknown pool type {}",
            config.pool_type.selector()
        )));
    }
    Ok(())
}

fn out_len(input: usize, pad: u32, window: u32, stride: u32, axis: &str) -> Result<usize> {
    let padded = input + 2 * pad as usize;
    let span = padded.checked_sub(window as usize).ok_or_else(|| {
        NeuraxError::invalid_param(format!(
            "{axis}: window {window} larger than input {input} with padding {pad}"
        ))
    })?;
    Ok(span / stride as usize + 1)
}

/// Convolution output `(width, height)` for `input`.
///
/// # Errors
///
/// Returns `InvalidParam` if the padded input is smaller than the kernel.
pub fn conv_output_dims(input: &Tensor, config: &ConvConfig) -> Result<(usize, usize)> {
    Ok((
        out_len(input.width(), config.padding_x, config.kernel_width, config.stride_x, "width")?,
        out_len(input.height(), config.padding_y, config.kernel_height, config.stride_y, "height")?,
    ))
}

/// Pooling output `(width, height)` for `input`.
///
/// # Errors
///
/// Returns `InvalidParam` if the input is smaller than the window.
pub fn pool_output_dims(input: &Tensor, config: &PoolConfig) -> Result<(usize, usize)> {
    Ok((
        out_len(input.width(), 0, config.pool_width, config.stride_x, "width")?,
        out_len(input.height(), 0, config.pool_height, config.stride_y, "height")?,
    ))
}

/// Full pre-flight for a convolution call.
///
/// Beyond the config itself this checks that the output has the formula
/// size, that the tensors hold enough channels and batches for the
/// addressing, and that an enabled bias covers every output channel.
///
/// # Errors
///
/// Returns `InvalidParam` on the first violated condition.
pub fn validate_conv_call(
    input: &Tensor,
    weights: &Tensor,
    bias: Option<&Tensor>,
    config: &ConvConfig,
    output: &Tensor,
) -> Result<()> {
    validate_tensor(input)?;
    validate_tensor(weights)?;
    validate_tensor(output)?;
    if let Some(b) = bias {
        validate_tensor(b)?;
    }
    validate_conv_config(config)?;

    let (out_w, out_h) = conv_output_dims(input, config)?;
    if output.width() != out_w || output.height() != out_h {
        return Err(NeuraxError::invalid_param(format!(
            "output is {}x{}, convolution produces {out_w}x{out_h}",
            output.width(),
            output.height()
        )));
    }

    let cin = config.input_channels as usize;
    let cout = config.output_channels as usize;
    if input.channels() < cin {
        return Err(NeuraxError::invalid_param(format!(
            "input has {} channels, config reads {cin}",
            input.channels()
        )));
    }
    if output.channels() < cout {
        return Err(NeuraxError::invalid_param(format!(
            "output has {} channels, config writes {cout}",
            output.channels()
        )));
    }
    if output.batch() < input.batch() {
        return Err(NeuraxError::invalid_param(format!(
            "output batch {} smaller than input batch {}",
            output.batch(),
            input.batch()
        )));
    }
    if weights.batch() < cout
        || weights.channels() < cin
        || weights.height() < config.kernel_height as usize
        || weights.width() < config.kernel_width as usize
    {
        return Err(NeuraxError::invalid_param(format!(
            "weights {}x{}x{}x{} too small for {cout}x{cin}x{}x{}",
            weights.batch(),
            weights.channels(),
            weights.height(),
            weights.width(),
            config.kernel_height,
            config.kernel_width
        )));
    }
    if let (true, Some(b)) = (config.use_bias, bias) {
        if b.total_elements() < cout {
            return Err(NeuraxError::invalid_param(format!(
                "bias has {} elements, need {cout}",
                b.total_elements()
            )));
        }
    }
    Ok(())
}

/// Full pre-flight for a pooling call.
///
/// # Errors
///
/// Returns `InvalidParam` on an invalid config, a formula mismatch or too few
/// output channels/batches.
pub fn validate_pool_call(input: &Tensor, config: &PoolConfig, output: &Tensor) -> Result<()> {
    validate_tensor(input)?;
    validate_tensor(output)?;
    validate_pool_config(config)?;

    let (out_w, out_h) = pool_output_dims(input, config)?;
    if output.width() != out_w || output.height() != out_h {
        return Err(NeuraxError::invalid_param(format!(
            "output is {}x{}, pooling produces {out_w}x{out_h}",
            output.width(),
            output.height()
        )));
    }
    if output.channels() < input.channels() || output.batch() < input.batch() {
        return Err(NeuraxError::invalid_param(format!(
            "output {}ch/{}b cannot hold input {}ch/{}b",
            output.channels(),
            output.batch(),
            input.channels(),
            input.batch()
        )));
    }
    Ok(())
}

/// Pre-flight for an activation call: identical shapes.
///
/// # Errors
///
/// Returns `InvalidParam` if the shapes differ.
pub fn validate_activation_call(input: &Tensor, output: &Tensor) -> Result<()> {
    validate_tensor(input)?;
    validate_tensor(output)?;
    if !input.same_shape(output) {
        return Err(NeuraxError::invalid_param(format!(
            "activation output {}x{}x{}x{} differs from input {}x{}x{}x{}",
            output.batch(),
            output.height(),
            output.width(),
            output.channels(),
            input.batch(),
            input.height(),
            input.width(),
            input.channels()
        )));
    }
    Ok(())
}
