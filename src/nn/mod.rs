//! Trainable computation nodes and the machinery shared by all of them.
//!
//! - [`Module`]: the forward/backward protocol, train/eval mode, timing and lifecycle hooks.
//! - [`ModuleState`]/[`Stateful`]: the per-node bookkeeping a layer embeds.
//! - [`flatten`]: compaction of many parameter tensors into one contiguous buffer.
//! - [`persist`]: the archive service behind `save`/`load`.
//! - [`replica`]: replication helpers for data-parallel training.

pub mod buffer;
pub mod error;
pub mod flatten;
pub mod identity;
pub mod module;
pub mod parameters;
pub mod persist;
pub mod replica;
pub mod state;

pub use buffer::Buffer;
pub use error::ModuleError;
pub use identity::Identity;
pub use module::Module;
pub use parameters::{Parameters, get_parameters_of};
pub use spindle_derive::Stateful;
pub use state::{ModuleState, ModuleTime, Stateful};
