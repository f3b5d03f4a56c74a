// SPDX-License-Identifier: AGPL-3.0-only

//! Fixed-shape layer benchmarks
//!
//! | Layer | Input | Parameters | Output |
//! |-------|-------|------------|--------|
//! | `conv2d` | 224×224×3 | 3×3 kernel, 64 filters, stride 1, no pad, ReLU | 222×222×64 |
//! | `pooling` | 224×224×3 | 2×2 max, stride 2 | 112×112×3 |
//! | `activation` | 224×224×3 | ReLU | 224×224×3 |
//!
//! Inputs are uniform in `[0, 1)`, weights in `[-0.5, 0.5)`, from a fixed
//! seed so runs are comparable.

use crate::config::{Activation, ConvConfig, PoolConfig, PoolType};
use crate::device::Device;
use crate::dtype::DataType;
use crate::error::{NeuraxError, Result};
use crate::perf::{PerfCounter, PerfStats};
use crate::tensor::Tensor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::str::FromStr;

const INPUT_SIDE: usize = 224;
const INPUT_CHANNELS: usize = 3;
const CONV_FILTERS: usize = 64;
const SEED: u64 = 0x4E45_5552_4158;

/// Benchmarked layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// 3×3 convolution
    Conv2d,
    /// 2×2 max pooling
    Pooling,
    /// ReLU
    Activation,
}

impl LayerKind {
    /// All layers, in report order.
    pub const ALL: [Self; 3] = [Self::Conv2d, Self::Pooling, Self::Activation];

    /// Name accepted by `FromStr`.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Conv2d => "conv2d",
            Self::Pooling => "pooling",
            Self::Activation => "activation",
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LayerKind {
    type Err = NeuraxError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| NeuraxError::invalid_param(format!("unknown layer '{s}'")))
    }
}

fn random_tensor(
    rng: &mut StdRng,
    w: usize,
    h: usize,
    c: usize,
    b: usize,
    offset: f32,
) -> Result<Tensor> {
    let mut t = Tensor::new(w, h, c, b, DataType::F32)?;
    for i in 0..t.total_elements() {
        t.set_linear(i, rng.gen::<f32>() + offset);
    }
    Ok(t)
}

/// Run `layer` `iterations` times and return the timing window.
///
/// Tensors are built before the clock starts.
///
/// # Errors
///
/// `InvalidParam` for zero iterations; any error from the device call.
pub fn benchmark_layer_stats(
    device: &mut Device,
    layer: LayerKind,
    iterations: u32,
) -> Result<PerfStats> {
    if iterations == 0 {
        return Err(NeuraxError::invalid_param("iterations must be non-zero"));
    }
    tracing::info!("Benchmarking {layer} layer for {iterations} iterations");

    let mut rng = StdRng::seed_from_u64(SEED);
    let input = random_tensor(&mut rng, INPUT_SIDE, INPUT_SIDE, INPUT_CHANNELS, 1, 0.0)?;
    let mut perf = PerfCounter::new();

    match layer {
        LayerKind::Conv2d => {
            let weights = random_tensor(&mut rng, 3, 3, INPUT_CHANNELS, CONV_FILTERS, -0.5)?;
            // Sizes are small constants.
            #[allow(clippy::cast_possible_truncation)]
            let config = ConvConfig::square(3, 1, 0, INPUT_CHANNELS as u32, CONV_FILTERS as u32)
                .with_activation(Activation::Relu);
            let side = INPUT_SIDE - 2;
            let mut output = Tensor::new(side, side, CONV_FILTERS, 1, DataType::F32)?;
            perf.start();
            for _ in 0..iterations {
                device.conv2d(&input, &weights, None, &config, &mut output)?;
            }
        }
        LayerKind::Pooling => {
            let config = PoolConfig::square(2, 2, PoolType::Max);
            let side = INPUT_SIDE / 2;
            let mut output = Tensor::new(side, side, INPUT_CHANNELS, 1, DataType::F32)?;
            perf.start();
            for _ in 0..iterations {
                device.pooling(&input, &config, &mut output)?;
            }
        }
        LayerKind::Activation => {
            let mut output = Tensor::new(INPUT_SIDE, INPUT_SIDE, INPUT_CHANNELS, 1, DataType::F32)?;
            perf.start();
            for _ in 0..iterations {
                device.activation(&input, Activation::Relu, &mut output)?;
            }
        }
    }

    perf.record_operations(iterations);
    let stats = perf.end()?;
    tracing::info!(
        "{layer}: {:.3} ms total, {:.3} ms/iter",
        stats.total_time_ms,
        stats.avg_op_ms().unwrap_or_default()
    );
    Ok(stats)
}

/// Run the named layer `iterations` times; returns elapsed milliseconds.
///
/// # Errors
///
/// `InvalidParam` for an unknown layer name or zero iterations.
pub fn benchmark_layer(device: &mut Device, layer: &str, iterations: u32) -> Result<f64> {
    let kind = layer.parse::<LayerKind>()?;
    benchmark_layer_stats(device, kind, iterations).map(|s| s.total_time_ms)
}
