use serde::{Deserialize, Serialize};

use super::{Module, ModuleError, ModuleState, Stateful};
use crate::loom::{num::Scalar, tensor::Tensor};

/// Passes the input through unchanged. The output is a view of the input, not a copy.
#[derive(Debug, Clone, Stateful, Serialize, Deserialize)]
#[stateful(crate = "crate", bound = "T: Scalar")]
#[serde(bound = "T: Scalar")]
pub struct Identity<T: Scalar> {
    #[state]
    state: ModuleState<Tensor<T>, Tensor<T>>,
}

impl<T: Scalar> Default for Identity<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> Identity<T> {
    pub fn new() -> Self {
        let state = ModuleState::new(Tensor::new(), Tensor::new());
        Self { state }
    }
}

impl<T: Scalar> Module for Identity<T> {
    type Scalar = T;

    #[inline]
    fn update_output(&mut self, input: &Tensor<T>) -> Result<Tensor<T>, ModuleError> {
        Ok(input.clone())
    }

    #[inline]
    fn update_grad_input(
        &mut self,
        _input: &Tensor<T>,
        grad_output: &Tensor<T>,
    ) -> Result<Tensor<T>, ModuleError> {
        Ok(grad_output.clone())
    }

    fn clone_module(&self) -> Self {
        let state = self.state.deep_clone();
        Self { state }
    }
}
