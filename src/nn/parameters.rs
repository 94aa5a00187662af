use itertools::Itertools;

use super::{ModuleError, flatten::try_flatten};
use crate::loom::{num::Scalar, tensor::Tensor};

/// Learnable tensors of one or more modules, paired by index with their gradients.
#[derive(Debug)]
pub struct Parameters<'a, T> {
    weights: Vec<&'a mut Tensor<T>>,
    grads: Vec<&'a mut Tensor<T>>,
}

impl<'a, T: Scalar> Parameters<'a, T> {
    /// Pair weights with their gradients. Returns error if counts or shapes disagree.
    pub fn new(
        weights: Vec<&'a mut Tensor<T>>,
        grads: Vec<&'a mut Tensor<T>>,
    ) -> Result<Self, ModuleError> {
        if weights.len() != grads.len() {
            return Err(ModuleError::Parameters(weights.len(), grads.len()));
        }
        for (weight, grad) in weights.iter().zip_eq(grads.iter()) {
            grad.check_shape(weight.layout())?;
        }
        Ok(Self { weights, grads })
    }

    /// Merge the parameter sets of several modules, preserving order.
    pub fn concat(parts: impl IntoIterator<Item = Parameters<'a, T>>) -> Self {
        let mut weights = vec![];
        let mut grads = vec![];
        for part in parts {
            weights.extend(part.weights);
            grads.extend(part.grads);
        }
        Self { weights, grads }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Compact weights and gradients into two contiguous buffers, rebinding every tensor into them.
    pub fn flatten(mut self) -> Result<(Tensor<T>, Tensor<T>), ModuleError> {
        let weights = try_flatten(&mut self.weights)?;
        let grads = try_flatten(&mut self.grads)?;
        Ok((weights, grads))
    }
}

/// Flatten the parameters of a whole network in one call. Modules without parameters are skipped.
///
/// Returns `None` if no module has parameters.
pub fn get_parameters_of<'a, T: Scalar>(
    parts: impl IntoIterator<Item = Option<Parameters<'a, T>>>,
) -> Result<Option<(Tensor<T>, Tensor<T>)>, ModuleError> {
    let parts = parts.into_iter().flatten().collect_vec();
    match parts.is_empty() {
        true => Ok(None),
        false => Parameters::concat(parts).flatten().map(Some),
    }
}
