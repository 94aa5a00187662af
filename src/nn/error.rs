use thiserror::Error;

use super::{flatten::FlattenError, persist::PersistError};
use crate::loom::tensor::TensorError;

#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("module tensor error: {0}")]
    Tensor(#[from] TensorError),
    #[error("module flatten error: {0}")]
    Flatten(#[from] FlattenError),
    #[error("module persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("module parameter error: {0} weights not match {1} gradients")]
    Parameters(usize, usize),
    #[error("module mismatch error: buffer len {0} not match {1}")]
    Mismatch(usize, usize),
}
