//! Trainable computation nodes.
//!
//! A [`Module`](nn::Module) wraps a forward computation, its backward computation, and the bookkeeping
//! needed to train it: timing, train/eval mode, parameter extraction, cloning and persistence.
//! Learnable tensors of one or many modules can be compacted into a single contiguous buffer with
//! [`flatten`](nn::flatten::flatten), so an optimizer updates them in one pass.

pub mod loom;
pub mod nn;
