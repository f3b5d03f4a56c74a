// SPDX-License-Identifier: AGPL-3.0-only

//! Element-wise activation.

use crate::config::Activation;
use crate::error::Result;
use crate::tensor::Tensor;
use crate::validate::validate_activation_call;

/// Apply `func` to every element of `input`, storing into `output`.
///
/// # Errors
///
/// Returns `InvalidParam` if the shapes differ.
pub fn activation(input: &Tensor, func: Activation, output: &mut Tensor) -> Result<()> {
    validate_activation_call(input, output)?;
    activation_unchecked(input, func, output);
    Ok(())
}

/// Same as [`activation`] minus the shape check.
pub(crate) fn activation_unchecked(input: &Tensor, func: Activation, output: &mut Tensor) {
    tracing::trace!("activation {func:?} over {} elements", input.total_elements());
    for i in 0..input.total_elements() {
        output.set_linear(i, func.apply(input.get_linear(i)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DataType;
    use crate::tensor::TensorData;

    #[test]
    fn relu() {
        let input = Tensor::from_f32(4, 1, 1, &[-1.0, 0.0, 0.5, 3.0]).unwrap();
        let mut out = Tensor::new(4, 1, 1, 1, DataType::F32).unwrap();
        activation(&input, Activation::Relu, &mut out).unwrap();
        assert_eq!(out.data(), &TensorData::F32(vec![0.0, 0.0, 0.5, 3.0]));
    }

    #[test]
    fn sigmoid_into_u8() {
        let input = Tensor::from_f32(2, 1, 1, &[0.0, 100.0]).unwrap();
        let mut out = Tensor::new(2, 1, 1, 1, DataType::U8).unwrap();
        activation(&input, Activation::Sigmoid, &mut out).unwrap();
        // 0.5 rounds away from zero, 1.0 stays 1
        assert_eq!(out.data(), &TensorData::U8(vec![1, 1]));
    }

    #[test]
    fn unknown_selector_is_identity() {
        let input = Tensor::from_f32(2, 1, 1, &[-2.0, 2.0]).unwrap();
        let mut out = Tensor::new(2, 1, 1, 1, DataType::F32).unwrap();
        activation(&input, Activation::Unknown(42), &mut out).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn shape_mismatch() {
        let input = Tensor::new(2, 2, 1, 1, DataType::F32).unwrap();
        let mut out = Tensor::new(4, 1, 1, 1, DataType::F32).unwrap();
        assert!(activation(&input, Activation::Tanh, &mut out).is_err());
    }
}
