// SPDX-License-Identifier: AGPL-3.0-only

//! Open the accelerator and print what was found
//!
//! Honours `NEURAX_DEVICE`, `NEURAX_USE_HARDWARE` and `NEURAX_TIMEOUT_MS`.

use neurax_driver::{Device, DeviceConfig, Result};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("neurax_driver=debug")
        .init();

    let mut device = Device::init(DeviceConfig::from_env()?);
    println!("{}", device.info());

    let optimal = device.optimal_config()?;
    println!();
    println!("Suggested configuration:");
    println!("  Max kernel size: {}", optimal.max_kernel_size);
    println!("  Multipliers:     {}", optimal.num_multipliers);
    println!("  Data type:       {}", optimal.data_type);

    device.cleanup()
}
