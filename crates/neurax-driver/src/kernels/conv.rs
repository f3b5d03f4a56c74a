// SPDX-License-Identifier: AGPL-3.0-only

//! Direct 2-D convolution.

use crate::config::ConvConfig;
use crate::error::Result;
use crate::tensor::Tensor;
use crate::validate::{conv_output_dims, validate_conv_call};

/// Convolve `input` with `weights` into `output`.
///
/// `weights` is read as `[out_ch, in_ch, kh, kw]`. Taps that land outside
/// the input contribute nothing (implicit zero padding). Bias is added only
/// when `config.use_bias` is set and `bias` is supplied.
///
/// # Errors
///
/// Returns `InvalidParam` if validation fails; `output` is untouched then.
pub fn conv2d(
    input: &Tensor,
    weights: &Tensor,
    bias: Option<&Tensor>,
    config: &ConvConfig,
    output: &mut Tensor,
) -> Result<()> {
    validate_conv_call(input, weights, bias, config, output)?;
    conv2d_unchecked(input, weights, bias, config, output)
}

/// Same as [`conv2d`] minus the argument checks.
pub(crate) fn conv2d_unchecked(
    input: &Tensor,
    weights: &Tensor,
    bias: Option<&Tensor>,
    config: &ConvConfig,
    output: &mut Tensor,
) -> Result<()> {
    let (out_w, out_h) = conv_output_dims(input, config)?;
    let (kw, kh) = (config.kernel_width as usize, config.kernel_height as usize);
    let (sx, sy) = (config.stride_x as usize, config.stride_y as usize);
    // Padding is at most a few taps; the signed offsets below stay tiny.
    #[allow(clippy::cast_possible_wrap)]
    let (px, py) = (config.padding_x as isize, config.padding_y as isize);
    let bias = bias.filter(|_| config.use_bias);

    tracing::trace!(
        "conv2d {}x{}x{} -> {out_w}x{out_h}x{} k={kw}x{kh} s={sx}x{sy} p={px}x{py}",
        input.width(),
        input.height(),
        config.input_channels,
        config.output_channels
    );

    output.clear();

    for b in 0..input.batch() {
        for oc in 0..config.output_channels as usize {
            for oy in 0..out_h {
                for ox in 0..out_w {
                    let mut acc = 0.0f32;
                    for ic in 0..config.input_channels as usize {
                        for ky in 0..kh {
                            let Some(iy) = tap(oy * sy + ky, py, input.height()) else {
                                continue;
                            };
                            for kx in 0..kw {
                                let Some(ix) = tap(ox * sx + kx, px, input.width()) else {
                                    continue;
                                };
                                acc += input.get(b, iy, ix, ic) * weights.weight(oc, ic, ky, kx);
                            }
                        }
                    }
                    if let Some(bias) = bias {
                        acc += bias.bias(oc);
                    }
                    output.set(b, oy, ox, oc, config.activation.apply(acc));
                }
            }
        }
    }
    Ok(())
}

/// Input coordinate for padded position `pos`, if it lies inside `0..len`.
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
fn tap(pos: usize, pad: isize, len: usize) -> Option<usize> {
    let i = pos as isize - pad;
    (i >= 0 && (i as usize) < len).then_some(i as usize)
}
