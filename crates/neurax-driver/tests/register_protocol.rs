// SPDX-License-Identifier: AGPL-3.0-only

//! Integration tests for the register protocol as driven by `Device`
//!
//! A shared software register file stands in for the accelerator so the
//! test can inspect every word the device wrote.

use std::sync::{Arc, Mutex};

use neurax_driver::backends::{CompletionMode, RegisterWindow, SoftwareRegisters, WindowType};
use neurax_driver::regs::{self, control};
use neurax_driver::{
    Activation, ConvConfig, DataType, Device, DeviceConfig, DeviceState, PoolConfig, PoolType,
    Result, Tensor,
};

/// Register file shared between the device and the test.
#[derive(Debug, Clone, Default)]
struct SharedRegisters(Arc<Mutex<SoftwareRegisters>>);

impl SharedRegisters {
    fn writes(&self) -> Vec<(usize, u32)> {
        self.0.lock().unwrap().writes().to_vec()
    }

    fn clear(&self) {
        self.0.lock().unwrap().clear_writes();
    }

    fn set_mode(&self, mode: CompletionMode) {
        self.0.lock().unwrap().set_mode(mode);
    }
}

impl RegisterWindow for SharedRegisters {
    fn read_register(&self, offset: usize) -> Result<u32> {
        self.0.lock().unwrap().read_register(offset)
    }

    fn write_register(&mut self, offset: usize, value: u32) -> Result<()> {
        self.0.lock().unwrap().write_register(offset, value)
    }

    fn size(&self) -> usize {
        self.0.lock().unwrap().size()
    }

    fn window_type(&self) -> WindowType {
        WindowType::Software
    }
}

fn bind(config: DeviceConfig) -> (Device, SharedRegisters) {
    let regs = SharedRegisters::default();
    let dev = Device::with_window(config, Box::new(regs.clone()));
    (dev, regs)
}

#[test]
fn init_issues_reset_pulse() {
    let (dev, regs) = bind(DeviceConfig::default());
    assert_eq!(dev.state(), DeviceState::HardwareBound);
    assert_eq!(
        regs.writes(),
        vec![(regs::CONTROL, control::RESET), (regs::CONTROL, 0)]
    );
}

#[test]
fn cleanup_resets_and_releases() {
    let (mut dev, regs) = bind(DeviceConfig::default());
    regs.clear();
    dev.cleanup().unwrap();
    assert_eq!(dev.state(), DeviceState::Closed);
    assert_eq!(dev.window_type(), None);
    assert_eq!(
        regs.writes(),
        vec![(regs::CONTROL, control::RESET), (regs::CONTROL, 0)]
    );
    // Only the test's handle remains.
    assert_eq!(Arc::strong_count(&regs.0), 1);
}

#[test]
fn conv2d_programs_registers() {
    let (mut dev, regs) = bind(DeviceConfig::default());
    regs.clear();

    let input = Tensor::new(20, 10, 2, 1, DataType::U16).unwrap();
    let weights = Tensor::new(5, 5, 2, 3, DataType::F32).unwrap();
    let bias = Tensor::new(3, 1, 1, 1, DataType::F32).unwrap();
    let cfg = ConvConfig::square(5, 2, 2, 2, 3)
        .with_bias()
        .with_activation(Activation::Sigmoid);
    let mut out = Tensor::new(10, 5, 3, 1, DataType::U16).unwrap();
    dev.conv2d(&input, &weights, Some(&bias), &cfg, &mut out).unwrap();

    let conv_word = 4 | (1 << 4) | (2 << 7) | (1 << 9) | (1 << 10);
    assert_eq!(
        regs.writes(),
        vec![
            (regs::CONV_CONFIG, conv_word),
            (regs::DIM_CONFIG, 20 | (10 << 16)),
            (regs::ACT_CONFIG, 2),
            (
                regs::CONTROL,
                control::START | control::CONV_EN | control::ACT_EN | control::DATA_WIDTH
            ),
        ]
    );
}

#[test]
fn pooling_programs_registers() {
    let (mut dev, regs) = bind(DeviceConfig::default());
    regs.clear();

    let input = Tensor::new(9, 9, 1, 1, DataType::U8).unwrap();
    let cfg = PoolConfig::square(3, 3, PoolType::Max);
    let mut out = Tensor::new(3, 3, 1, 1, DataType::U8).unwrap();
    dev.pooling(&input, &cfg, &mut out).unwrap();

    assert_eq!(
        regs.writes(),
        vec![
            (regs::POOL_CONFIG, (1 << 1) | (2 << 4)),
            (regs::DIM_CONFIG, 9 | (9 << 16)),
            (regs::CONTROL, control::START | control::POOL_EN),
        ]
    );
}

#[test]
fn activation_programs_registers() {
    let (mut dev, regs) = bind(DeviceConfig::default());
    regs.clear();

    let input = Tensor::new(4, 4, 1, 1, DataType::F32).unwrap();
    let mut out = Tensor::new(4, 4, 1, 1, DataType::F32).unwrap();
    dev.activation(&input, Activation::Tanh, &mut out).unwrap();

    assert_eq!(
        regs.writes(),
        vec![
            (regs::ACT_CONFIG, 1),
            (regs::CONTROL, control::START | control::ACT_EN | control::DATA_WIDTH),
        ]
    );
}

#[test]
fn hardware_disabled_writes_nothing() {
    let (mut dev, regs) = bind(DeviceConfig::emulated());
    regs.clear();

    let input = Tensor::new(4, 4, 1, 1, DataType::F32).unwrap();
    let mut out = Tensor::new(4, 4, 1, 1, DataType::F32).unwrap();
    dev.activation(&input, Activation::Relu, &mut out).unwrap();
    assert!(regs.writes().is_empty());
}

#[test]
fn invalid_call_writes_nothing() {
    let (mut dev, regs) = bind(DeviceConfig::default());
    regs.clear();

    let input = Tensor::new(4, 4, 1, 1, DataType::F32).unwrap();
    let mut out = Tensor::new(3, 3, 1, 1, DataType::F32).unwrap();
    let cfg = PoolConfig::square(2, 2, PoolType::Max);
    assert!(dev.pooling(&input, &cfg, &mut out).is_err());
    assert!(regs.writes().is_empty());
}

#[test]
fn failing_hardware_still_returns_result() {
    let config = DeviceConfig {
        timeout_ms: 3,
        ..DeviceConfig::default()
    };
    let (mut dev, regs) = bind(config);
    let input = Tensor::from_f32(2, 1, 1, &[-1.0, 1.0]).unwrap();

    for mode in [CompletionMode::Fail, CompletionMode::Hang] {
        regs.set_mode(mode);
        let mut out = Tensor::new(2, 1, 1, 1, DataType::F32).unwrap();
        dev.activation(&input, Activation::Relu, &mut out).unwrap();
        assert_eq!(out.get_linear(0), 0.0);
        assert_eq!(out.get_linear(1), 1.0);
    }
}

#[test]
fn status_reflects_last_operation() {
    let (mut dev, regs) = bind(DeviceConfig::default());
    assert!(!dev.status().unwrap().unwrap().done);

    let input = Tensor::new(2, 2, 1, 1, DataType::F32).unwrap();
    let mut out = Tensor::new(2, 2, 1, 1, DataType::F32).unwrap();
    dev.activation(&input, Activation::Linear, &mut out).unwrap();
    assert!(dev.status().unwrap().unwrap().done);

    regs.set_mode(CompletionMode::Fail);
    dev.activation(&input, Activation::Linear, &mut out).unwrap();
    assert!(dev.status().unwrap().unwrap().error);
}

#[test]
#[ignore] // Requires NEURAX hardware at /dev/neurax0 or /dev/uio0
fn real_hardware_binds() {
    let mut dev = Device::init(DeviceConfig::default());
    assert_eq!(dev.state(), DeviceState::HardwareBound);
    println!("{}", dev.info());
    dev.cleanup().unwrap();
}
