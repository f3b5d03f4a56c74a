// SPDX-License-Identifier: AGPL-3.0-only

//! Silicon model for the NEURAX convolution accelerator.
//!
//! This crate has **no dependencies** and **no hardware access**. It is a
//! pure model of the accelerator's programming interface: register offsets,
//! bit definitions, the packed layout of every configuration word, the
//! register window geometry and the hardware-imposed ceilings.
//!
//! The register words are hardware ABI. Every field is produced by an
//! explicit shift/mask pair so the on-wire layout is identical no matter
//! which host language programs the device.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`regs`] | Register offsets, control/status bits, packed config words |
//! | [`window`] | Register window size, probe paths, polling/reset timing |
//! | [`limits`] | Kernel, stride and pool ceilings, multiplier count |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod limits;
pub mod regs;
pub mod window;
