// SPDX-License-Identifier: AGPL-3.0-only

//! CPU reference kernels
//!
//! These produce the authoritative result of every device operation. Each
//! public entry point validates its arguments before touching the output,
//! then runs the plain nested-loop computation. Writes go through the
//! tensor's saturating store, so narrower output types clamp and round.
//!
//! | Kernel | Cost |
//! |--------|------|
//! | [`conv2d`] | `O(B·Cout·Hout·Wout·Cin·Kh·Kw)` |
//! | [`pooling`] | `O(B·C·Hout·Wout·Ph·Pw)` |
//! | [`activation`] | `O(elements)` |

mod activation;
mod conv;
mod pool;

pub use activation::activation;
pub use conv::conv2d;
pub use pool::{pool_window, pooling};

pub(crate) use activation::activation_unchecked;
pub(crate) use conv::conv2d_unchecked;
pub(crate) use pool::pooling_unchecked;
