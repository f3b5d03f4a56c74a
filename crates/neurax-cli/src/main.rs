// SPDX-License-Identifier: AGPL-3.0-only

//! `neurax` - command-line interface for the NEURAX accelerator.
//!
//! ```text
//! USAGE:
//!   neurax info                          Device state and configuration
//!   neurax bench [layer] -n <iters>      Time conv2d / pooling / activation
//!   neurax blur <in.bmp> <out.bmp>       Gaussian blur through conv2d
//!   neurax sample <out.bmp>              Write a 256x256 test image
//! ```
//!
//! Every command runs on CPU emulation when no hardware is found.

mod bmp;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use neurax_driver::bench::{self, LayerKind};
use neurax_driver::{filter, DataType, Device, DeviceConfig, PerfCounter, Tensor};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "neurax", about = "NEURAX accelerator CLI", version)]
struct Cli {
    /// Register window to map (overrides NEURAX_DEVICE).
    #[arg(long, global = true)]
    device: Option<PathBuf>,

    /// Never touch hardware.
    #[arg(long, global = true)]
    emulate: bool,

    /// Completion timeout in milliseconds (overrides NEURAX_TIMEOUT_MS).
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print device state, configuration and suggested settings.
    Info,
    /// Benchmark one layer, or all of them.
    Bench {
        /// conv2d, pooling or activation (default: all).
        layer: Option<String>,
        /// Iterations per layer.
        #[arg(short = 'n', long, default_value_t = 10)]
        iterations: u32,
    },
    /// Blur a BMP image with a Gaussian kernel, one channel at a time.
    Blur {
        /// Input 24- or 32-bit BMP.
        input: PathBuf,
        /// Output 24-bit BMP.
        output: PathBuf,
        /// Odd kernel side.
        #[arg(
            short,
            long,
            default_value_t = 5,
            value_parser = clap::value_parser!(u32).range(3..=11)
        )]
        kernel_size: u32,
        /// Gaussian standard deviation.
        #[arg(short, long, default_value_t = 1.0)]
        sigma: f32,
    },
    /// Write a synthetic test image for `blur`.
    Sample {
        /// Output 24-bit BMP.
        output: PathBuf,
        /// Image side in pixels.
        #[arg(long, default_value_t = 256)]
        size: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        1 => "info".into(),
        2 => "debug".into(),
        _ => "trace".into(),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Cmd::Info => cmd_info(&cli)?,
        Cmd::Bench { layer, iterations } => cmd_bench(&cli, layer.as_deref(), *iterations)?,
        Cmd::Blur {
            input,
            output,
            kernel_size,
            sigma,
        } => cmd_blur(&cli, input, output, *kernel_size, *sigma)?,
        Cmd::Sample { output, size } => cmd_sample(output, *size)?,
    }

    Ok(())
}

fn device_config(cli: &Cli) -> Result<DeviceConfig> {
    let mut config = DeviceConfig::from_env()?;
    if let Some(path) = &cli.device {
        config.device_paths = vec![path.clone()];
    }
    if cli.emulate {
        config.use_hardware = false;
    }
    if let Some(ms) = cli.timeout_ms {
        config.timeout_ms = ms;
    }
    Ok(config)
}

fn cmd_info(cli: &Cli) -> Result<()> {
    let mut device = Device::init(device_config(cli)?);
    println!("{}", device.info());

    let optimal = device.optimal_config()?;
    println!();
    println!("Optimal configuration:");
    println!("  Use hardware : {}", optimal.use_hardware);
    println!("  Max kernel   : {}", optimal.max_kernel_size);
    println!("  Multipliers  : {}", optimal.num_multipliers);
    println!("  Data type    : {}", optimal.data_type);

    device.cleanup()?;
    Ok(())
}

fn cmd_bench(cli: &Cli, layer: Option<&str>, iterations: u32) -> Result<()> {
    let layers = match layer {
        None | Some("all") => LayerKind::ALL.to_vec(),
        Some(name) => vec![name.parse::<LayerKind>()?],
    };

    let mut device = Device::init(device_config(cli)?);
    println!(
        "Running on {}",
        if device.is_hardware_bound() {
            "NEURAX hardware"
        } else {
            "CPU emulation"
        }
    );

    for kind in layers {
        let stats = bench::benchmark_layer_stats(&mut device, kind, iterations)
            .with_context(|| format!("benchmarking {kind}"))?;
        println!();
        println!("[{kind}] {iterations} iterations");
        println!("{stats}");
    }

    device.cleanup()?;
    Ok(())
}

fn cmd_blur(
    cli: &Cli,
    input: &Path,
    output: &Path,
    kernel_size: u32,
    sigma: f32,
) -> Result<()> {
    anyhow::ensure!(kernel_size % 2 == 1, "kernel size must be odd, got {kernel_size}");

    let image = bmp::read(input)?;
    println!(
        "Loaded {}: {}x{}, {} channels",
        input.display(),
        image.width(),
        image.height(),
        image.channels()
    );

    let kernel = filter::gaussian_kernel(kernel_size as usize, sigma)?;
    tracing::info!("Gaussian kernel {kernel_size}x{kernel_size}, sigma {sigma}");
    let mut device = Device::init(device_config(cli)?);

    let mut perf = PerfCounter::new();
    perf.start();
    let blurred = filter::filter_channels(&mut device, &image, &kernel)?;
    perf.record_operations(u32::try_from(image.channels()).unwrap_or(u32::MAX));
    let stats = perf.end()?;

    bmp::write(output, &blurred)?;
    println!(
        "Blurred with {kernel_size}x{kernel_size} Gaussian (sigma {sigma}) in {:.3} ms",
        stats.total_time_ms
    );
    println!("Wrote {}", output.display());

    device.cleanup()?;
    Ok(())
}

/// Radial sine in red, 16-pixel checkerboard in green, diagonal ramp in blue.
fn sample_image(size: usize) -> Result<Tensor> {
    let mut image = Tensor::new(size, size, 3, 1, DataType::F32)?;
    let centre = size as f32 / 2.0;
    let diagonal = (2 * size) as f32;
    for y in 0..size {
        for x in 0..size {
            let (dx, dy) = (x as f32 - centre, y as f32 - centre);
            let dist = (dx * dx + dy * dy).sqrt();
            image.set(0, y, x, 0, 0.5 + 0.5 * (dist * 0.1).sin());
            let checker = if (x / 16 + y / 16) % 2 == 1 { 0.8 } else { 0.2 };
            image.set(0, y, x, 1, checker);
            image.set(0, y, x, 2, (x + y) as f32 / diagonal);
        }
    }
    Ok(image)
}

fn cmd_sample(output: &Path, size: usize) -> Result<()> {
    anyhow::ensure!(size > 0, "image size must be positive");
    bmp::write(output, &sample_image(size)?)?;
    println!("Wrote {size}x{size} sample image to {}", output.display());
    Ok(())
}
