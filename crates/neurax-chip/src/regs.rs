// SPDX-License-Identifier: AGPL-3.0-only

//! Register map for the NEURAX accelerator.
//!
//! Eight 32-bit registers at the start of the register window:
//!
//! ```text
//! 0x00  CONTROL      start / reset / unit enables / data width
//! 0x04  STATUS       busy / done / error
//! 0x08  CONV_CONFIG  kernel, stride, padding, bias, input channels
//! 0x0C  POOL_CONFIG  pool type, pool size, stride
//! 0x10  ACT_CONFIG   activation selector
//! 0x14  DIM_CONFIG   input width (low half) / height (high half)
//! 0x18  WEIGHT_ADDR  weight buffer address (reserved for DMA)
//! 0x1C  BIAS_ADDR    bias buffer address (reserved for DMA)
//! ```
//!
//! Fields that the hardware stores as "value minus one" (kernel size,
//! stride, input channels) or "value minus two" (pool size) are taken and
//! returned as plain values; the offset is applied inside `encode`/`decode`.
//! Values wider than their field are truncated to the field width, exactly
//! as the hardware latches them.

// ── Offsets ──────────────────────────────────────────────────────────────────

/// Control register.
pub const CONTROL: usize = 0x00;
/// Status register (read-only on hardware).
pub const STATUS: usize = 0x04;
/// Convolution configuration word.
pub const CONV_CONFIG: usize = 0x08;
/// Pooling configuration word.
pub const POOL_CONFIG: usize = 0x0C;
/// Activation configuration word.
pub const ACT_CONFIG: usize = 0x10;
/// Input dimension word.
pub const DIM_CONFIG: usize = 0x14;
/// Weight buffer address. Nothing programs it until a DMA path exists.
pub const WEIGHT_ADDR: usize = 0x18;
/// Bias buffer address. Nothing programs it until a DMA path exists.
pub const BIAS_ADDR: usize = 0x1C;

/// Every register, in offset order.
pub const ALL: [usize; 8] = [
    CONTROL,
    STATUS,
    CONV_CONFIG,
    POOL_CONFIG,
    ACT_CONFIG,
    DIM_CONFIG,
    WEIGHT_ADDR,
    BIAS_ADDR,
];

/// Bytes spanned by the register block.
pub const BLOCK_SIZE: usize = BIAS_ADDR + 4;

/// Short mnemonic for a register offset (used in trace output).
#[must_use]
pub const fn name(offset: usize) -> &'static str {
    match offset {
        CONTROL => "CONTROL",
        STATUS => "STATUS",
        CONV_CONFIG => "CONV_CONFIG",
        POOL_CONFIG => "POOL_CONFIG",
        ACT_CONFIG => "ACT_CONFIG",
        DIM_CONFIG => "DIM_CONFIG",
        WEIGHT_ADDR => "WEIGHT_ADDR",
        BIAS_ADDR => "BIAS_ADDR",
        _ => "UNKNOWN",
    }
}

// ── Control register bit definitions ─────────────────────────────────────────

/// Control register bits.
pub mod control {
    /// Start the configured operation.
    pub const START: u32 = 1 << 0;
    /// Soft reset.
    pub const RESET: u32 = 1 << 1;
    /// Convolution unit enable.
    pub const CONV_EN: u32 = 1 << 2;
    /// Pooling unit enable.
    pub const POOL_EN: u32 = 1 << 3;
    /// Activation unit enable.
    pub const ACT_EN: u32 = 1 << 4;
    /// Data width: 0 = 8-bit, 1 = 16/32-bit.
    pub const DATA_WIDTH: u32 = 1 << 5;
}

// ── Status register bit definitions ──────────────────────────────────────────

/// Status register bits.
pub mod status {
    /// Operation in progress.
    pub const BUSY: u32 = 1 << 0;
    /// Last operation completed.
    pub const DONE: u32 = 1 << 1;
    /// Last operation failed.
    pub const ERROR: u32 = 1 << 2;
}

// ── Packed words ─────────────────────────────────────────────────────────────

/// Decoded control register.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlWord {
    /// Bit 0.
    pub start: bool,
    /// Bit 1.
    pub reset: bool,
    /// Bit 2.
    pub conv_enable: bool,
    /// Bit 3.
    pub pool_enable: bool,
    /// Bit 4.
    pub act_enable: bool,
    /// Bit 5, 16/32-bit data path.
    pub wide_data: bool,
}

impl ControlWord {
    /// Pack into the register layout.
    #[must_use]
    pub const fn encode(&self) -> u32 {
        let mut raw = 0;
        if self.start {
            raw |= control::START;
        }
        if self.reset {
            raw |= control::RESET;
        }
        if self.conv_enable {
            raw |= control::CONV_EN;
        }
        if self.pool_enable {
            raw |= control::POOL_EN;
        }
        if self.act_enable {
            raw |= control::ACT_EN;
        }
        if self.wide_data {
            raw |= control::DATA_WIDTH;
        }
        raw
    }

    /// Unpack a raw register value. Reserved bits are ignored.
    #[must_use]
    pub const fn decode(raw: u32) -> Self {
        Self {
            start: raw & control::START != 0,
            reset: raw & control::RESET != 0,
            conv_enable: raw & control::CONV_EN != 0,
            pool_enable: raw & control::POOL_EN != 0,
            act_enable: raw & control::ACT_EN != 0,
            wide_data: raw & control::DATA_WIDTH != 0,
        }
    }
}

/// Decoded status register.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusWord {
    /// Bit 0.
    pub busy: bool,
    /// Bit 1.
    pub done: bool,
    /// Bit 2.
    pub error: bool,
}

impl StatusWord {
    /// Pack into the register layout.
    #[must_use]
    pub const fn encode(&self) -> u32 {
        let mut raw = 0;
        if self.busy {
            raw |= status::BUSY;
        }
        if self.done {
            raw |= status::DONE;
        }
        if self.error {
            raw |= status::ERROR;
        }
        raw
    }

    /// Unpack a raw register value.
    #[must_use]
    pub const fn decode(raw: u32) -> Self {
        Self {
            busy: raw & status::BUSY != 0,
            done: raw & status::DONE != 0,
            error: raw & status::ERROR != 0,
        }
    }
}

const CONV_KERNEL_SHIFT: u32 = 0;
const CONV_KERNEL_MASK: u32 = 0xF;
const CONV_STRIDE_SHIFT: u32 = 4;
const CONV_STRIDE_MASK: u32 = 0x7;
const CONV_PADDING_SHIFT: u32 = 7;
const CONV_PADDING_MASK: u32 = 0x3;
const CONV_BIAS_SHIFT: u32 = 9;
const CONV_CHANNELS_SHIFT: u32 = 10;
const CONV_CHANNELS_MASK: u32 = 0x7;

/// Convolution configuration word.
///
/// ```text
/// [3:0]   kernel size - 1
/// [6:4]   stride - 1
/// [8:7]   padding
/// [9]     bias enable
/// [12:10] input channels - 1
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvConfigWord {
    /// Kernel size (1..=16 representable).
    pub kernel_size: u32,
    /// Stride (1..=8 representable).
    pub stride: u32,
    /// Padding (0..=3 representable).
    pub padding: u32,
    /// Bias enable.
    pub use_bias: bool,
    /// Input channel count (1..=8 representable).
    pub input_channels: u32,
}

impl ConvConfigWord {
    /// Pack into the register layout.
    #[must_use]
    pub const fn encode(&self) -> u32 {
        let mut raw = (self.kernel_size.wrapping_sub(1) & CONV_KERNEL_MASK) << CONV_KERNEL_SHIFT;
        raw |= (self.stride.wrapping_sub(1) & CONV_STRIDE_MASK) << CONV_STRIDE_SHIFT;
        raw |= (self.padding & CONV_PADDING_MASK) << CONV_PADDING_SHIFT;
        if self.use_bias {
            raw |= 1 << CONV_BIAS_SHIFT;
        }
        raw |= (self.input_channels.wrapping_sub(1) & CONV_CHANNELS_MASK) << CONV_CHANNELS_SHIFT;
        raw
    }

    /// Unpack a raw register value.
    #[must_use]
    pub const fn decode(raw: u32) -> Self {
        Self {
            kernel_size: ((raw >> CONV_KERNEL_SHIFT) & CONV_KERNEL_MASK) + 1,
            stride: ((raw >> CONV_STRIDE_SHIFT) & CONV_STRIDE_MASK) + 1,
            padding: (raw >> CONV_PADDING_SHIFT) & CONV_PADDING_MASK,
            use_bias: (raw >> CONV_BIAS_SHIFT) & 1 != 0,
            input_channels: ((raw >> CONV_CHANNELS_SHIFT) & CONV_CHANNELS_MASK) + 1,
        }
    }
}

const POOL_TYPE_MASK: u32 = 0x1;
const POOL_SIZE_SHIFT: u32 = 1;
const POOL_SIZE_MASK: u32 = 0x7;
const POOL_STRIDE_SHIFT: u32 = 4;
const POOL_STRIDE_MASK: u32 = 0x7;

/// Pooling configuration word.
///
/// ```text
/// [0]   pool type (0 = max, 1 = average)
/// [3:1] pool size - 2
/// [6:4] stride - 1
/// ```
///
/// A pool size of 1 has no encoding: the field wraps to 7 and reads back
/// as 9.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfigWord {
    /// Pool type selector (only bit 0 is latched).
    pub pool_type: u32,
    /// Pool size (2..=9 representable).
    pub pool_size: u32,
    /// Stride (1..=8 representable).
    pub stride: u32,
}

impl PoolConfigWord {
    /// Pack into the register layout.
    #[must_use]
    pub const fn encode(&self) -> u32 {
        let mut raw = self.pool_type & POOL_TYPE_MASK;
        raw |= (self.pool_size.wrapping_sub(2) & POOL_SIZE_MASK) << POOL_SIZE_SHIFT;
        raw |= (self.stride.wrapping_sub(1) & POOL_STRIDE_MASK) << POOL_STRIDE_SHIFT;
        raw
    }

    /// Unpack a raw register value.
    #[must_use]
    pub const fn decode(raw: u32) -> Self {
        Self {
            pool_type: raw & POOL_TYPE_MASK,
            pool_size: ((raw >> POOL_SIZE_SHIFT) & POOL_SIZE_MASK) + 2,
            stride: ((raw >> POOL_STRIDE_SHIFT) & POOL_STRIDE_MASK) + 1,
        }
    }
}

const ACT_SELECTOR_MASK: u32 = 0x3;

/// Activation configuration word: `[1:0]` activation selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActConfigWord {
    /// Activation selector (0 = ReLU, 1 = tanh, 2 = sigmoid, 3 = linear).
    pub selector: u32,
}

impl ActConfigWord {
    /// Pack into the register layout.
    #[must_use]
    pub const fn encode(&self) -> u32 {
        self.selector & ACT_SELECTOR_MASK
    }

    /// Unpack a raw register value.
    #[must_use]
    pub const fn decode(raw: u32) -> Self {
        Self {
            selector: raw & ACT_SELECTOR_MASK,
        }
    }
}

const DIM_HALF_MASK: u32 = 0xFFFF;
const DIM_HEIGHT_SHIFT: u32 = 16;

/// Dimension word: width in `[15:0]`, height in `[31:16]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimConfigWord {
    /// Input width.
    pub width: u32,
    /// Input height.
    pub height: u32,
}

impl DimConfigWord {
    /// Pack into the register layout.
    #[must_use]
    pub const fn encode(&self) -> u32 {
        (self.width & DIM_HALF_MASK) | ((self.height & DIM_HALF_MASK) << DIM_HEIGHT_SHIFT)
    }

    /// Unpack a raw register value.
    #[must_use]
    pub const fn decode(raw: u32) -> Self {
        Self {
            width: raw & DIM_HALF_MASK,
            height: (raw >> DIM_HEIGHT_SHIFT) & DIM_HALF_MASK,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn register_offsets_match_hardware() {
        assert_eq!(CONTROL, 0x00);
        assert_eq!(STATUS, 0x04);
        assert_eq!(CONV_CONFIG, 0x08);
        assert_eq!(POOL_CONFIG, 0x0C);
        assert_eq!(ACT_CONFIG, 0x10);
        assert_eq!(DIM_CONFIG, 0x14);
        assert_eq!(WEIGHT_ADDR, 0x18);
        assert_eq!(BIAS_ADDR, 0x1C);
        assert_eq!(BLOCK_SIZE, 0x20);
    }

    #[test]
    fn control_bits() {
        assert_eq!(control::START, 0x01);
        assert_eq!(control::RESET, 0x02);
        assert_eq!(control::CONV_EN, 0x04);
        assert_eq!(control::POOL_EN, 0x08);
        assert_eq!(control::ACT_EN, 0x10);
        assert_eq!(control::DATA_WIDTH, 0x20);
    }

    #[test]
    fn conv_word_layout() {
        // 3x3 kernel, stride 1, padding 1, bias, 3 input channels
        let word = ConvConfigWord {
            kernel_size: 3,
            stride: 1,
            padding: 1,
            use_bias: true,
            input_channels: 3,
        };
        // kernel-1 = 2 -> 0b10, stride-1 = 0, pad 1 << 7, bias 1 << 9, ch-1 = 2 << 10
        assert_eq!(word.encode(), 0x2 | (1 << 7) | (1 << 9) | (2 << 10));
        assert_eq!(ConvConfigWord::decode(word.encode()), word);
    }

    #[test]
    fn conv_word_at_ceilings() {
        let word = ConvConfigWord {
            kernel_size: 11,
            stride: 8,
            padding: 3,
            use_bias: false,
            input_channels: 8,
        };
        assert_eq!(word.encode(), 10 | (7 << 4) | (3 << 7) | (7 << 10));
    }

    #[test]
    fn conv_word_truncates_wide_channel_counts() {
        // 16 input channels - 1 = 15 = 0b1111, only 0b111 fits
        let word = ConvConfigWord {
            kernel_size: 1,
            stride: 1,
            padding: 0,
            use_bias: false,
            input_channels: 16,
        };
        assert_eq!(word.encode(), 7 << 10);
    }

    #[test]
    fn pool_word_layout() {
        let word = PoolConfigWord {
            pool_type: 1,
            pool_size: 2,
            stride: 2,
        };
        assert_eq!(word.encode(), 1 | (0 << 1) | (1 << 4));
        assert_eq!(PoolConfigWord::decode(word.encode()), word);
    }

    #[test]
    fn pool_size_one_wraps() {
        let word = PoolConfigWord {
            pool_type: 0,
            pool_size: 1,
            stride: 1,
        };
        assert_eq!(word.encode(), 7 << 1);
        assert_eq!(PoolConfigWord::decode(word.encode()).pool_size, 9);
    }

    #[test]
    fn dim_word_layout() {
        let word = DimConfigWord {
            width: 224,
            height: 100,
        };
        assert_eq!(word.encode(), 224 | (100 << 16));
        assert_eq!(DimConfigWord::decode(0x0064_00E0), word);
    }

    #[test]
    fn act_word_masks_selector() {
        assert_eq!(ActConfigWord { selector: 2 }.encode(), 2);
        assert_eq!(ActConfigWord { selector: 7 }.encode(), 3);
    }

    #[test]
    fn status_decode() {
        let s = StatusWord::decode(status::DONE | status::ERROR);
        assert!(!s.busy);
        assert!(s.done);
        assert!(s.error);
    }

    #[test]
    fn names() {
        assert_eq!(name(CONV_CONFIG), "CONV_CONFIG");
        assert_eq!(name(0x40), "UNKNOWN");
    }

    proptest! {
        #[test]
        fn control_word_roundtrip(raw in 0u32..64) {
            prop_assert_eq!(ControlWord::decode(raw).encode(), raw);
        }

        #[test]
        fn conv_word_roundtrip_in_hardware_range(
            kernel in 1u32..=11,
            stride in 1u32..=8,
            padding in 0u32..=3,
            bias in any::<bool>(),
            channels in 1u32..=8,
        ) {
            let word = ConvConfigWord {
                kernel_size: kernel,
                stride,
                padding,
                use_bias: bias,
                input_channels: channels,
            };
            prop_assert_eq!(ConvConfigWord::decode(word.encode()), word);
            prop_assert_eq!(word.encode() >> 13, 0);
        }

        #[test]
        fn dim_word_roundtrip(width in 0u32..=0xFFFF, height in 0u32..=0xFFFF) {
            let word = DimConfigWord { width, height };
            prop_assert_eq!(DimConfigWord::decode(word.encode()), word);
        }
    }
}
