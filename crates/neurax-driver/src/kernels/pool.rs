// SPDX-License-Identifier: AGPL-3.0-only

//! Max and average pooling.

use crate::config::{PoolConfig, PoolType};
use crate::error::Result;
use crate::tensor::Tensor;
use crate::validate::{pool_output_dims, validate_pool_call};

/// Pool every channel of `input` into `output`.
///
/// # Errors
///
/// Returns `InvalidParam` if validation fails; `output` is untouched then.
pub fn pooling(input: &Tensor, config: &PoolConfig, output: &mut Tensor) -> Result<()> {
    validate_pool_call(input, config, output)?;
    pooling_unchecked(input, config, output)
}

/// Same as [`pooling`] minus the argument checks.
pub(crate) fn pooling_unchecked(
    input: &Tensor,
    config: &PoolConfig,
    output: &mut Tensor,
) -> Result<()> {
    let (out_w, out_h) = pool_output_dims(input, config)?;
    tracing::trace!(
        "pooling {:?} {}x{} -> {out_w}x{out_h} window {}x{}",
        config.pool_type,
        input.width(),
        input.height(),
        config.pool_width,
        config.pool_height
    );

    output.clear();
    for b in 0..input.batch() {
        for ch in 0..input.channels() {
            for oy in 0..out_h {
                for ox in 0..out_w {
                    let v = pool_window(input, b, ch, oy, ox, config);
                    output.set(b, oy, ox, ch, v);
                }
            }
        }
    }
    Ok(())
}

/// Reduce the window for output cell `(out_y, out_x)`.
///
/// Taps outside the input are skipped. Max takes the largest in-bounds
/// tap; average divides by the number of in-bounds taps, so a window
/// clipped by the edge averages over fewer than `pool_width * pool_height`
/// values. A window with no in-bounds taps yields `f32::MIN` for max and
/// `0.0` for average.
///
/// # Panics
///
/// Panics if `batch` or `channel` lie outside `input`.
pub fn pool_window(
    input: &Tensor,
    batch: usize,
    channel: usize,
    out_y: usize,
    out_x: usize,
    config: &PoolConfig,
) -> f32 {
    let y0 = out_y * config.stride_y as usize;
    let x0 = out_x * config.stride_x as usize;
    let y1 = (y0 + config.pool_height as usize).min(input.height());
    let x1 = (x0 + config.pool_width as usize).min(input.width());

    let mut count = 0u32;
    let mut acc = match config.pool_type {
        PoolType::Max => f32::MIN,
        PoolType::Average | PoolType::Unknown(_) => 0.0,
    };
    for y in y0..y1 {
        for x in x0..x1 {
            let v = input.get(batch, y, x, channel);
            acc = match config.pool_type {
                PoolType::Max if count == 0 => v,
                PoolType::Max => acc.max(v),
                PoolType::Average | PoolType::Unknown(_) => acc + v,
            };
            count += 1;
        }
    }

    match config.pool_type {
        // `count` is bounded by MAX_POOL_SIZE squared.
        #[allow(clippy::cast_precision_loss)]
        PoolType::Average if count > 0 => acc / count as f32,
        _ => acc,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DataType;
    use crate::error::NeuraxError;
    use crate::tensor::TensorData;

    fn run(input: &Tensor, cfg: &PoolConfig, w: usize, h: usize) -> Tensor {
        let mut out = Tensor::new(w, h, input.channels(), input.batch(), input.dtype()).unwrap();
        pooling(input, cfg, &mut out).unwrap();
        out
    }

    #[test]
    fn ones_average_and_max() {
        let input = Tensor::from_f32(4, 4, 1, &[1.0; 16]).unwrap();
        for kind in [PoolType::Average, PoolType::Max] {
            let out = run(&input, &PoolConfig::square(2, 2, kind), 2, 2);
            assert_eq!(out.data(), &TensorData::F32(vec![1.0; 4]));
        }
    }

    #[test]
    fn max_and_average_values() {
        let values: Vec<f32> = (0..16).map(|v| v as f32).collect();
        let input = Tensor::from_f32(4, 4, 1, &values).unwrap();
        let max = run(&input, &PoolConfig::square(2, 2, PoolType::Max), 2, 2);
        assert_eq!(max.data(), &TensorData::F32(vec![5.0, 7.0, 13.0, 15.0]));
        let avg = run(&input, &PoolConfig::square(2, 2, PoolType::Average), 2, 2);
        assert_eq!(avg.data(), &TensorData::F32(vec![2.5, 4.5, 10.5, 12.5]));
    }

    #[test]
    fn max_of_negatives() {
        let input = Tensor::from_f32(2, 2, 1, &[-4.0, -3.0, -2.0, -9.0]).unwrap();
        let out = run(&input, &PoolConfig::square(2, 1, PoolType::Max), 1, 1);
        assert_eq!(out.get_linear(0), -2.0);
    }

    #[test]
    fn clipped_window_divides_by_in_bounds_taps() {
        // 3x3 input, 2x2 window, stride 2: cell (1,1) starts at (2,2) and
        // only that tap is inside.
        let values: Vec<f32> = (1..=9).map(|v| v as f32).collect();
        let input = Tensor::from_f32(3, 3, 1, &values).unwrap();
        let cfg = PoolConfig::square(2, 2, PoolType::Average);
        assert_eq!(pool_window(&input, 0, 0, 1, 1, &cfg), 9.0);
        // cell (0,1): taps (0,2) and (1,2) -> (3 + 6) / 2
        assert_eq!(pool_window(&input, 0, 0, 0, 1, &cfg), 4.5);
        // full window
        assert_eq!(pool_window(&input, 0, 0, 0, 0, &cfg), 3.0);

        let max = PoolConfig::square(2, 2, PoolType::Max);
        assert_eq!(pool_window(&input, 0, 0, 1, 1, &max), 9.0);
    }

    #[test]
    fn formula_output_on_odd_input() {
        let values: Vec<f32> = (1..=9).map(|v| v as f32).collect();
        let input = Tensor::from_f32(3, 3, 1, &values).unwrap();
        let out = run(&input, &PoolConfig::square(2, 2, PoolType::Average), 1, 1);
        assert_eq!(out.get_linear(0), 3.0);
    }

    #[test]
    fn channels_pooled_independently() {
        // 2x2, 2 channels: ch0 = 1..4, ch1 = 10..40
        let input =
            Tensor::from_f32(2, 2, 2, &[1.0, 10.0, 2.0, 20.0, 3.0, 30.0, 4.0, 40.0]).unwrap();
        let out = run(&input, &PoolConfig::square(2, 2, PoolType::Max), 1, 1);
        assert_eq!(out.data(), &TensorData::F32(vec![4.0, 40.0]));
    }

    #[test]
    fn mismatched_output_rejected() {
        let input = Tensor::from_f32(4, 4, 1, &[0.0; 16]).unwrap();
        let mut out = Tensor::new(3, 3, 1, 1, DataType::F32).unwrap();
        let err = pooling(&input, &PoolConfig::square(2, 2, PoolType::Max), &mut out).unwrap_err();
        assert!(matches!(err, NeuraxError::InvalidParam { .. }));
    }

    #[test]
    fn u8_average_rounds() {
        let input = Tensor::from_data(2, 1, 1, 1, TensorData::U8(vec![1, 2])).unwrap();
        let cfg = PoolConfig {
            pool_width: 2,
            pool_height: 1,
            stride_x: 1,
            stride_y: 1,
            pool_type: PoolType::Average,
        };
        let out = run(&input, &cfg, 1, 1);
        assert_eq!(out.data(), &TensorData::U8(vec![2]));
    }
}
