use std::time::Duration;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::buffer::Buffer;

/// Bookkeeping shared by every module: the last computed buffers, name, mode and timers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleState<I, O> {
    /// Result of the last `forward`.
    pub output: O,
    /// Gradient w.r.t. the input of the last `backward`.
    pub grad_input: I,
    pub name: Option<String>,
    pub training: bool,
    #[serde(skip)]
    pub forward_time: Duration,
    #[serde(skip)]
    pub backward_time: Duration,
}

impl<I: Default, O: Default> Default for ModuleState<I, O> {
    #[inline]
    fn default() -> Self {
        Self::new(O::default(), I::default())
    }
}

impl<I, O> ModuleState<I, O> {
    /// Create the state from initial buffers supplied by the layer.
    #[inline]
    pub fn new(output: O, grad_input: I) -> Self {
        Self {
            output,
            grad_input,
            name: None,
            training: true,
            forward_time: Duration::ZERO,
            backward_time: Duration::ZERO,
        }
    }

    #[inline]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl<I: Buffer, O: Buffer> ModuleState<I, O> {
    /// Structural copy: buffers are re-homed, timers restart from zero.
    pub fn deep_clone(&self) -> Self {
        Self {
            output: self.output.deep_clone(),
            grad_input: self.grad_input.deep_clone(),
            name: self.name.clone(),
            training: self.training,
            forward_time: Duration::ZERO,
            backward_time: Duration::ZERO,
        }
    }
}

/// Access to a module's [`ModuleState`]. Usually derived with `#[derive(Stateful)]`.
pub trait Stateful {
    type Input: Buffer;
    type Output: Buffer;

    fn state(&self) -> &ModuleState<Self::Input, Self::Output>;
    fn state_mut(&mut self) -> &mut ModuleState<Self::Input, Self::Output>;
}

/// Cumulative time a module spent in `forward` and `backward`.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{name}\tforward {forward:?}\tbackward {backward:?}")]
pub struct ModuleTime {
    pub name: String,
    pub forward: Duration,
    pub backward: Duration,
}

impl ModuleTime {
    #[inline]
    pub fn forward_nanos(&self) -> u128 {
        self.forward.as_nanos()
    }

    #[inline]
    pub fn backward_nanos(&self) -> u128 {
        self.backward.as_nanos()
    }
}
