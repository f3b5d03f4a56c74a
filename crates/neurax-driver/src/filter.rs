// SPDX-License-Identifier: AGPL-3.0-only

//! Per-channel 2-D filtering on top of [`Device::conv2d`].

use crate::config::ConvConfig;
use crate::device::Device;
use crate::dtype::DataType;
use crate::error::{NeuraxError, Result};
use crate::tensor::Tensor;
use neurax_chip::limits::MAX_KERNEL_SIZE;

/// Normalised `size`×`size` Gaussian kernel as a single-channel f32 tensor.
///
/// # Errors
///
/// Returns `InvalidParam` unless `size` is odd and within `1..=11` and
/// `sigma` is positive and finite.
pub fn gaussian_kernel(size: usize, sigma: f32) -> Result<Tensor> {
    if size % 2 == 0 || size > MAX_KERNEL_SIZE as usize {
        return Err(NeuraxError::invalid_param(format!(
            "kernel size {size} must be odd and at most {MAX_KERNEL_SIZE}"
        )));
    }
    if !(sigma.is_finite() && sigma > 0.0) {
        return Err(NeuraxError::invalid_param(format!("sigma {sigma} must be positive")));
    }

    let mut kernel = Tensor::new(size, size, 1, 1, DataType::F32)?;
    // Sizes are at most 11.
    #[allow(clippy::cast_precision_loss)]
    let centre = (size / 2) as f32;
    let denom = 2.0 * sigma * sigma;
    let mut sum = 0.0f32;
    for y in 0..size {
        for x in 0..size {
            #[allow(clippy::cast_precision_loss)]
            let (dx, dy) = (x as f32 - centre, y as f32 - centre);
            let v = (-(dx * dx + dy * dy) / denom).exp();
            kernel.set(0, y, x, 0, v);
            sum += v;
        }
    }
    for i in 0..kernel.total_elements() {
        kernel.set_linear(i, kernel.get_linear(i) / sum);
    }
    Ok(kernel)
}

/// Apply a single-channel square `kernel` to every channel of `input`.
///
/// Each channel is copied into a scratch single-channel tensor, convolved
/// with "same" padding on `device`, and written back. Scratch tensors are
/// dropped before returning, on error paths too.
///
/// # Errors
///
/// `InvalidParam` if `kernel` is not a square single-channel tensor with
/// an odd side, or any error from [`Device::conv2d`].
pub fn filter_channels(device: &mut Device, input: &Tensor, kernel: &Tensor) -> Result<Tensor> {
    if kernel.width() != kernel.height()
        || kernel.width() % 2 == 0
        || kernel.channels() != 1
        || kernel.batch() != 1
    {
        return Err(NeuraxError::invalid_param(format!(
            "filter kernel must be odd, square and single-channel, got {}x{}x{}x{}",
            kernel.batch(),
            kernel.height(),
            kernel.width(),
            kernel.channels()
        )));
    }
    let side = u32::try_from(kernel.width())
        .map_err(|_| NeuraxError::invalid_param("kernel side overflows u32"))?;
    let config = ConvConfig::square(side, 1, side / 2, 1, 1);

    let mut output = Tensor::new(
        input.width(),
        input.height(),
        input.channels(),
        input.batch(),
        input.dtype(),
    )?;
    for ch in 0..input.channels() {
        tracing::debug!("filtering channel {ch} of {}", input.channels());
        let plane = input.extract_channel(ch)?;
        let mut filtered =
            Tensor::new(plane.width(), plane.height(), 1, plane.batch(), plane.dtype())?;
        device.conv2d(&plane, kernel, None, &config, &mut filtered)?;
        output.insert_channel(ch, &filtered)?;
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceConfig;

    #[test]
    fn gaussian_is_normalised_and_symmetric() {
        let k = gaussian_kernel(5, 1.0).unwrap();
        let sum: f32 = (0..25).map(|i| k.get_linear(i)).sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert_eq!(k.get(0, 0, 0, 0), k.get(0, 4, 4, 0));
        assert_eq!(k.get(0, 0, 1, 0), k.get(0, 1, 0, 0));
        assert!(k.get(0, 2, 2, 0) > k.get(0, 2, 1, 0));
    }

    #[test]
    fn gaussian_rejects_bad_parameters() {
        assert!(gaussian_kernel(4, 1.0).is_err());
        assert!(gaussian_kernel(13, 1.0).is_err());
        assert!(gaussian_kernel(3, 0.0).is_err());
        assert!(gaussian_kernel(3, f32::NAN).is_err());
    }

    #[test]
    fn constant_image_keeps_interior() {
        let mut dev = Device::init(DeviceConfig::emulated());
        let input = Tensor::from_f32(6, 6, 3, &[0.5; 108]).unwrap();
        let kernel = gaussian_kernel(3, 1.0).unwrap();
        let out = filter_channels(&mut dev, &input, &kernel).unwrap();
        assert!(out.same_shape(&input));
        for ch in 0..3 {
            assert!((out.get(0, 3, 3, ch) - 0.5).abs() < 1e-5);
            // corners lose the taps that fall outside
            assert!(out.get(0, 0, 0, ch) < 0.5);
        }
    }

    #[test]
    fn channels_stay_separate() {
        let mut dev = Device::init(DeviceConfig::emulated());
        let mut input = Tensor::new(3, 3, 2, 1, DataType::F32).unwrap();
        input.set(0, 1, 1, 1, 1.0);
        let identity = Tensor::from_f32(1, 1, 1, &[1.0]).unwrap();
        let out = filter_channels(&mut dev, &input, &identity).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn non_square_kernel_rejected() {
        let mut dev = Device::init(DeviceConfig::emulated());
        let input = Tensor::new(4, 4, 1, 1, DataType::F32).unwrap();
        let kernel = Tensor::new(3, 1, 1, 1, DataType::F32).unwrap();
        assert!(filter_channels(&mut dev, &input, &kernel).is_err());
    }
}
