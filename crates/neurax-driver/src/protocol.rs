// SPDX-License-Identifier: AGPL-3.0-only

//! Register protocol
//!
//! Encodes operation configurations into register words, kicks the
//! accelerator and polls for completion. Each `program_*` call writes the
//! config registers, then `CONTROL` with the unit enables and `START`, then
//! blocks in [`wait_for_completion`].
//!
//! No data moves: the accelerator has no DMA path, so the CPU kernel still
//! produces the result after the hardware reports done.

use crate::backends::RegisterWindow;
use crate::config::{Activation, ConvConfig, PoolConfig};
use crate::dtype::DataType;
use crate::error::{NeuraxError, Result};
use crate::tensor::Tensor;
use neurax_chip::regs::{
    self, control, status, ActConfigWord, ControlWord, ConvConfigWord, DimConfigWord,
    PoolConfigWord,
};
use neurax_chip::window::{POLL_INTERVAL_US, RESET_PULSE_US};
use std::time::{Duration, Instant};

/// Hold `RESET` for the pulse width, then release it.
///
/// # Errors
///
/// Propagates register access errors.
pub fn reset_pulse(window: &mut dyn RegisterWindow) -> Result<()> {
    tracing::debug!("Reset pulse ({} window)", window.window_type());
    window.write_register(regs::CONTROL, control::RESET)?;
    std::thread::sleep(Duration::from_micros(RESET_PULSE_US));
    window.write_register(regs::CONTROL, 0)
}

/// Poll `STATUS` every 100 µs until done, error or `timeout`.
///
/// The error bit wins over done.
///
/// # Errors
///
/// Returns `HardwareFailure` if the error bit is set, `Timeout` if neither
/// bit appears in time.
pub fn wait_for_completion(window: &dyn RegisterWindow, timeout: Duration) -> Result<()> {
    let start = Instant::now();

    loop {
        let raw = window.read_register(regs::STATUS)?;

        if raw & status::ERROR != 0 {
            return Err(NeuraxError::HardwareFailure { status: raw });
        }

        if raw & status::DONE != 0 {
            tracing::trace!("done after {:?}", start.elapsed());
            return Ok(());
        }

        if start.elapsed() > timeout {
            // Timeouts are configured in ms and fit u64.
            #[allow(clippy::cast_possible_truncation)]
            let duration_ms = timeout.as_millis() as u64;
            return Err(NeuraxError::Timeout { duration_ms });
        }

        std::thread::sleep(Duration::from_micros(POLL_INTERVAL_US));
    }
}

/// Dimension word for `tensor` (fields truncate to 16 bits).
#[allow(clippy::cast_possible_truncation)]
pub fn dim_word(tensor: &Tensor) -> u32 {
    DimConfigWord {
        width: tensor.width() as u32,
        height: tensor.height() as u32,
    }
    .encode()
}

/// Convolution config word. The hardware has one kernel/stride/padding
/// field, so the horizontal values are programmed.
pub const fn conv_word(config: &ConvConfig) -> u32 {
    ConvConfigWord {
        kernel_size: config.kernel_width,
        stride: config.stride_x,
        padding: config.padding_x,
        use_bias: config.use_bias,
        input_channels: config.input_channels,
    }
    .encode()
}

/// Pooling config word (horizontal window and stride).
///
/// Validation admits a 1-wide window, which the size field cannot hold; the
/// word then carries size 9. The CPU kernel is unaffected.
pub const fn pool_word(config: &PoolConfig) -> u32 {
    PoolConfigWord {
        pool_type: config.pool_type.selector(),
        pool_size: config.pool_width,
        stride: config.stride_x,
    }
    .encode()
}

/// Activation config word.
pub const fn act_word(activation: Activation) -> u32 {
    ActConfigWord {
        selector: activation.selector(),
    }
    .encode()
}

/// Control word for an operation on `dtype` data, `START` included.
pub const fn start_word(dtype: DataType, conv: bool, pool: bool, act: bool) -> u32 {
    ControlWord {
        start: true,
        reset: false,
        conv_enable: conv,
        pool_enable: pool,
        act_enable: act,
        wide_data: dtype.is_wide(),
    }
    .encode()
}

/// Program and run a convolution.
///
/// The activation unit is enabled unless the activation is linear.
///
/// # Errors
///
/// Register access errors, `HardwareFailure` or `Timeout`.
pub fn program_conv(
    window: &mut dyn RegisterWindow,
    input: &Tensor,
    config: &ConvConfig,
    timeout: Duration,
) -> Result<()> {
    window.write_register(regs::CONV_CONFIG, conv_word(config))?;
    window.write_register(regs::DIM_CONFIG, dim_word(input))?;
    window.write_register(regs::ACT_CONFIG, act_word(config.activation))?;
    let act = config.activation != Activation::Linear;
    window.write_register(regs::CONTROL, start_word(input.dtype(), true, false, act))?;
    wait_for_completion(window, timeout)
}

/// Program and run a pooling pass.
///
/// # Errors
///
/// Register access errors, `HardwareFailure` or `Timeout`.
pub fn program_pool(
    window: &mut dyn RegisterWindow,
    input: &Tensor,
    config: &PoolConfig,
    timeout: Duration,
) -> Result<()> {
    window.write_register(regs::POOL_CONFIG, pool_word(config))?;
    window.write_register(regs::DIM_CONFIG, dim_word(input))?;
    window.write_register(regs::CONTROL, start_word(input.dtype(), false, true, false))?;
    wait_for_completion(window, timeout)
}

/// Program and run an activation pass.
///
/// # Errors
///
/// Register access errors, `HardwareFailure` or `Timeout`.
pub fn program_activation(
    window: &mut dyn RegisterWindow,
    input: &Tensor,
    activation: Activation,
    timeout: Duration,
) -> Result<()> {
    window.write_register(regs::ACT_CONFIG, act_word(activation))?;
    window.write_register(regs::CONTROL, start_word(input.dtype(), false, false, true))?;
    wait_for_completion(window, timeout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{CompletionMode, SoftwareRegisters};
    use crate::config::PoolType;

    const SHORT: Duration = Duration::from_millis(5);

    #[test]
    fn done_completes() {
        let mut w = SoftwareRegisters::new();
        w.write_register(regs::CONTROL, control::START).unwrap();
        wait_for_completion(&w, SHORT).unwrap();
    }

    #[test]
    fn error_bit_is_hardware_failure() {
        let mut w = SoftwareRegisters::with_mode(CompletionMode::Fail);
        w.write_register(regs::CONTROL, control::START).unwrap();
        let err = wait_for_completion(&w, SHORT).unwrap_err();
        assert!(matches!(
            err,
            NeuraxError::HardwareFailure { status: raw } if raw & status::ERROR != 0
        ));
    }

    #[test]
    fn busy_times_out() {
        let mut w = SoftwareRegisters::with_mode(CompletionMode::Hang);
        w.write_register(regs::CONTROL, control::START).unwrap();
        let started = Instant::now();
        let err = wait_for_completion(&w, SHORT).unwrap_err();
        assert!(matches!(err, NeuraxError::Timeout { duration_ms: 5 }));
        assert!(started.elapsed() >= SHORT);
    }

    #[test]
    fn reset_pulse_sets_then_clears() {
        let mut w = SoftwareRegisters::new();
        reset_pulse(&mut w).unwrap();
        assert_eq!(
            w.writes(),
            &[(regs::CONTROL, control::RESET), (regs::CONTROL, 0)]
        );
    }

    #[test]
    fn conv_program_sequence() {
        let mut w = SoftwareRegisters::new();
        let input = Tensor::new(32, 16, 3, 1, DataType::I16).unwrap();
        let cfg = ConvConfig::square(3, 1, 1, 3, 8).with_activation(Activation::Relu);
        program_conv(&mut w, &input, &cfg, SHORT).unwrap();

        let offsets: Vec<usize> = w.writes().iter().map(|(o, _)| *o).collect();
        assert_eq!(
            offsets,
            [regs::CONV_CONFIG, regs::DIM_CONFIG, regs::ACT_CONFIG, regs::CONTROL]
        );
        assert_eq!(w.last_write(regs::CONV_CONFIG), Some(2 | (1 << 7) | (2 << 10)));
        assert_eq!(w.last_write(regs::DIM_CONFIG), Some(32 | (16 << 16)));
        assert_eq!(w.last_write(regs::ACT_CONFIG), Some(0));
        assert_eq!(
            w.last_write(regs::CONTROL),
            Some(control::START | control::CONV_EN | control::ACT_EN | control::DATA_WIDTH)
        );
    }

    #[test]
    fn linear_conv_leaves_act_unit_off() {
        let mut w = SoftwareRegisters::new();
        let input = Tensor::new(4, 4, 1, 1, DataType::U8).unwrap();
        program_conv(&mut w, &input, &ConvConfig::square(1, 1, 0, 1, 1), SHORT).unwrap();
        assert_eq!(w.last_write(regs::CONTROL), Some(control::START | control::CONV_EN));
    }

    #[test]
    fn pool_program_sequence() {
        let mut w = SoftwareRegisters::new();
        let input = Tensor::new(8, 8, 1, 1, DataType::F32).unwrap();
        let cfg = PoolConfig::square(2, 2, PoolType::Average);
        program_pool(&mut w, &input, &cfg, SHORT).unwrap();
        assert_eq!(w.last_write(regs::POOL_CONFIG), Some(1 | (1 << 4)));
        assert_eq!(
            w.last_write(regs::CONTROL),
            Some(control::START | control::POOL_EN | control::DATA_WIDTH)
        );
    }

    #[test]
    fn unit_pool_window_wraps_size_field() {
        let word = pool_word(&PoolConfig::square(1, 1, PoolType::Max));
        assert_eq!(word, 7 << 1);
        assert_eq!(PoolConfigWord::decode(word).pool_size, 9);
    }

    #[test]
    fn activation_program_sequence() {
        let mut w = SoftwareRegisters::new();
        let input = Tensor::new(8, 8, 1, 1, DataType::I8).unwrap();
        program_activation(&mut w, &input, Activation::Sigmoid, SHORT).unwrap();
        assert_eq!(w.last_write(regs::ACT_CONFIG), Some(2));
        assert_eq!(w.last_write(regs::CONTROL), Some(control::START | control::ACT_EN));
    }
}
