use std::{
    any::{Any, TypeId},
    borrow::Cow,
    hash::{Hash, Hasher},
    path::Path,
    time::Duration,
};

use instant::Instant;
use rustc_hash::FxHasher;
use serde::{Serialize, de::DeserializeOwned};

use super::{
    ModuleError,
    buffer::Buffer,
    parameters::Parameters,
    persist::{Archive, JsonArchive},
    state::{ModuleTime, Stateful},
};
use crate::loom::{
    num::{One, Scalar},
    tensor::Tensor,
};

/// A trainable computation node.
///
/// Layers implement the hooks ([`update_output`](Module::update_output),
/// [`update_grad_input`](Module::update_grad_input) and, if they own parameters,
/// [`acc_grad_parameters`](Module::acc_grad_parameters) and friends). Clients drive the node
/// through [`forward`](Module::forward) and [`backward`](Module::backward), which time the hooks
/// and store their results in the module's state.
///
/// A module instance is not meant to be shared between threads while computing: `forward` and
/// `backward` take `&mut self`. Parallel training replicates the module with
/// [`clone_module`](Module::clone_module) instead, see [`replica`](super::replica).
pub trait Module: Stateful + Sized + 'static {
    type Scalar: Scalar;

    /// Computes the output for `input`.
    fn update_output(&mut self, input: &Self::Input) -> Result<Self::Output, ModuleError>;

    /// Computes the gradient of the loss w.r.t. `input`, given the gradient w.r.t. the output.
    fn update_grad_input(
        &mut self,
        input: &Self::Input,
        grad_output: &Self::Output,
    ) -> Result<Self::Input, ModuleError>;

    /// Adds `scale` times the parameter gradients for this sample into the gradient buffers.
    /// Must accumulate, never overwrite.
    fn acc_grad_parameters(
        &mut self,
        _input: &Self::Input,
        _grad_output: &Self::Output,
        _scale: Self::Scalar,
    ) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Resets the gradient buffers to zero.
    fn zero_grad_parameters(&mut self) {}

    /// Plain gradient step on the parameters, for optimizers that do not flatten.
    fn update_parameters(&mut self, _learning_rate: Self::Scalar) {}

    /// Re-initializes the parameters.
    fn reset(&mut self) {}

    /// Restores transient state after the module was cleared or loaded.
    fn setup(&mut self) {}

    /// Weights and their gradients. `None` if the module has no learnable parameters.
    fn parameters(&mut self) -> Option<Parameters<'_, Self::Scalar>> {
        None
    }

    /// A deep copy sharing no storage with `self`.
    fn clone_module(&self) -> Self;

    /// Timings of this module and, for containers, of its children.
    fn times(&self) -> Vec<ModuleTime> {
        vec![self.time()]
    }

    /// Runs [`update_output`](Module::update_output), stores and returns its result.
    #[cfg_attr(feature = "trace", tracing::instrument(skip_all, fields(module = %self.name())))]
    fn forward(&mut self, input: &Self::Input) -> Result<&Self::Output, ModuleError> {
        let start = Instant::now();
        let output = self.update_output(input);
        self.state_mut().forward_time += start.elapsed();

        self.state_mut().output = output?;
        Ok(&self.state().output)
    }

    /// Computes the input gradient, then accumulates the parameter gradients with scale 1.
    #[cfg_attr(feature = "trace", tracing::instrument(skip_all, fields(module = %self.name())))]
    fn backward(
        &mut self,
        input: &Self::Input,
        grad_output: &Self::Output,
    ) -> Result<&Self::Input, ModuleError> {
        let start = Instant::now();
        let result = self
            .update_grad_input(input, grad_output)
            .and_then(|grad_input| {
                self.state_mut().grad_input = grad_input;
                self.acc_grad_parameters(input, grad_output, Self::Scalar::one())
            });
        self.state_mut().backward_time += start.elapsed();

        result?;
        Ok(&self.state().grad_input)
    }

    #[inline]
    fn output(&self) -> &Self::Output {
        &self.state().output
    }

    #[inline]
    fn grad_input(&self) -> &Self::Input {
        &self.state().grad_input
    }

    #[inline]
    fn training(&mut self) {
        self.state_mut().training = true;
    }

    #[inline]
    fn evaluate(&mut self) {
        self.state_mut().training = false;
    }

    #[inline]
    fn is_training(&self) -> bool {
        self.state().training
    }

    /// The name given by [`set_name`](Module::set_name), or the type's name.
    fn name(&self) -> Cow<'_, str> {
        match &self.state().name {
            Some(name) => Cow::Borrowed(name.as_str()),
            None => {
                let type_name = std::any::type_name::<Self>();
                let path = type_name.split('<').next().unwrap_or(type_name);
                let name = path.rsplit("::").next().unwrap_or(path);
                Cow::Owned(name.to_string())
            }
        }
    }

    #[inline]
    fn set_name(&mut self, name: impl Into<String>) {
        self.state_mut().name = Some(name.into());
    }

    fn time(&self) -> ModuleTime {
        let state = self.state();
        ModuleTime {
            name: self.name().into_owned(),
            forward: state.forward_time,
            backward: state.backward_time,
        }
    }

    fn reset_times(&mut self) {
        let state = self.state_mut();
        state.forward_time = Duration::ZERO;
        state.backward_time = Duration::ZERO;
    }

    /// Drops the output and input-gradient buffers.
    fn clear_state(&mut self) {
        let state = self.state_mut();
        state.output.clear();
        state.grad_input.clear();
    }

    /// Flattens weights and gradients into two contiguous buffers.
    /// Returns `None` if the module has no learnable parameters.
    fn get_parameters(
        &mut self,
    ) -> Result<Option<(Tensor<Self::Scalar>, Tensor<Self::Scalar>)>, ModuleError> {
        match self.parameters() {
            Some(parameters) => parameters.flatten().map(Some),
            None => Ok(None),
        }
    }

    /// Saves the module as JSON. See [`save_with`](Module::save_with).
    fn save(&mut self, path: impl AsRef<Path>, overwrite: bool) -> Result<(), ModuleError>
    where
        Self: Serialize,
    {
        self.save_with(&JsonArchive::new(), path, overwrite)
    }

    /// Clears the transient buffers, persists the module, then always runs [`setup`](Module::setup),
    /// even if persisting failed. Persistence errors are returned afterwards.
    fn save_with(
        &mut self,
        archive: &impl Archive,
        path: impl AsRef<Path>,
        overwrite: bool,
    ) -> Result<(), ModuleError>
    where
        Self: Serialize,
    {
        let path = path.as_ref();
        self.clear_state();
        let result = archive.save(&*self, path, overwrite);
        if let Err(err) = &result {
            log::warn!("failed to save {} to {}: {err}", self.name(), path.display());
        }
        self.setup();
        Ok(result?)
    }

    /// Loads a module saved as JSON. See [`load_with`](Module::load_with).
    fn load(path: impl AsRef<Path>) -> Result<Self, ModuleError>
    where
        Self: DeserializeOwned,
    {
        Self::load_with(&JsonArchive::new(), path)
    }

    /// Reads a module back and runs [`setup`](Module::setup) on it.
    fn load_with(archive: &impl Archive, path: impl AsRef<Path>) -> Result<Self, ModuleError>
    where
        Self: DeserializeOwned,
    {
        let mut module: Self = archive.load(path.as_ref())?;
        module.setup();
        Ok(module)
    }

    /// Two modules are equal if they are of the same type and hold equal output and
    /// input-gradient buffers.
    fn module_eq<M: Module>(&self, other: &M) -> bool {
        match (other as &dyn Any).downcast_ref::<Self>() {
            Some(other) => {
                self.state().output == other.state().output
                    && self.state().grad_input == other.state().grad_input
            }
            None => false,
        }
    }

    /// Folds `31 * acc + h` over the output, the input gradient and the type.
    fn module_hash(&self) -> u64 {
        let type_hash = {
            let mut hasher = FxHasher::default();
            TypeId::of::<Self>().hash(&mut hasher);
            hasher.finish()
        };
        [
            self.state().output.hash_code(),
            self.state().grad_input.hash_code(),
            type_hash,
        ]
        .into_iter()
        .fold(0u64, |acc, h| acc.wrapping_mul(31).wrapping_add(h))
    }
}
