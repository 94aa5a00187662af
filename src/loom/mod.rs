//! The `loom` module provides the tensor plumbing consumed by trainable modules.
//!
//! ## Key Components
//! 1. **Storage** (`Storage`): a shared, resizable buffer of scalars. Any number of tensors may view one storage.
//! 2. **Layout** (`Layout`): sizes and strides of a view, with row-major contiguity checks.
//! 3. **Tensor** (`Tensor`): a view `(storage, offset, layout)` that can be rebound in place.
//! 4. **Numerical System**: scalar types (`f32`, `f64`) and their `DataType` tags.
//!
//! Only the storage/view contract and a handful of element kernels live here;
//! layer mathematics is left to the layers themselves.

pub mod layout;
pub mod num;
pub mod ops;
pub mod storage;
pub mod tensor;
