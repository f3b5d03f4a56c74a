// SPDX-License-Identifier: AGPL-3.0-only

//! Element type conversion between tensors.

use crate::error::{NeuraxError, Result};
use crate::tensor::Tensor;

/// Re-quantize `src` into `dst`.
///
/// Same-type conversion is a byte copy. Otherwise each element is read as
/// `f32` and stored into `dst` with saturation.
///
/// # Errors
///
/// Returns `InvalidParam` if the element counts differ.
pub fn convert_data_type(src: &Tensor, dst: &mut Tensor) -> Result<()> {
    if src.total_elements() != dst.total_elements() {
        return Err(NeuraxError::invalid_param(format!(
            "element count mismatch: {} -> {}",
            src.total_elements(),
            dst.total_elements()
        )));
    }

    if src.dtype() == dst.dtype() {
        return dst.set_data(src.data().as_bytes());
    }

    tracing::trace!(
        "convert {} -> {} ({} elements)",
        src.dtype(),
        dst.dtype(),
        src.total_elements()
    );
    for i in 0..src.total_elements() {
        dst.set_linear(i, src.get_linear(i));
    }
    Ok(())
}
