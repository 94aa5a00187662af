use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use crate::loom::{num::Scalar, tensor::Tensor};

/// Capabilities a module's input or output type must expose.
///
/// Composite buffers implement these by recursing into their constituent tensors.
pub trait Buffer: Clone + PartialEq + Hash {
    /// Detach all storages, leaving empty tensors behind.
    fn clear(&mut self);

    /// Returns `true` if no element is held.
    fn is_empty(&self) -> bool;

    /// Copy into freshly allocated storages that alias nothing.
    fn deep_clone(&self) -> Self;

    /// Hash of the contents, `0` when empty.
    #[inline]
    fn hash_code(&self) -> u64 {
        if self.is_empty() {
            return 0;
        }
        let mut hasher = FxHasher::default();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

impl<T: Scalar> Buffer for Tensor<T> {
    #[inline]
    fn clear(&mut self) {
        self.detach();
    }

    #[inline]
    fn is_empty(&self) -> bool {
        Tensor::is_empty(self)
    }

    #[inline]
    fn deep_clone(&self) -> Self {
        Tensor::deep_clone(self)
    }
}

impl<B: Buffer> Buffer for Vec<B> {
    fn clear(&mut self) {
        self.iter_mut().for_each(Buffer::clear);
    }

    fn is_empty(&self) -> bool {
        self.iter().all(Buffer::is_empty)
    }

    fn deep_clone(&self) -> Self {
        self.iter().map(Buffer::deep_clone).collect()
    }
}

impl<A: Buffer, B: Buffer> Buffer for (A, B) {
    fn clear(&mut self) {
        self.0.clear();
        self.1.clear();
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty() && self.1.is_empty()
    }

    fn deep_clone(&self) -> Self {
        (self.0.deep_clone(), self.1.deep_clone())
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::Buffer;
    use crate::loom::tensor::Tensor;

    #[test]
    fn test_clear_composite() -> Result<(), Box<dyn Error>> {
        let x = Tensor::create([2], vec![1.0f32, 2.0])?;
        let y = Tensor::create([1], vec![3.0f32])?;
        let mut table = vec![(x.clone(), y.clone()), (y.clone(), x.clone())];
        assert!(!Buffer::is_empty(&table));
        assert_ne!(table.hash_code(), 0);

        let copy = table.deep_clone();
        assert_eq!(copy, table);
        assert!(!copy[0].0.is_alias(&x));

        Buffer::clear(&mut table);
        assert!(Buffer::is_empty(&table));
        assert_eq!(table.hash_code(), 0);
        assert_eq!(table.len(), 2);

        // the copy and the original tensors are untouched
        assert_eq!(copy[1].1.to_vec(), vec![1.0, 2.0]);
        assert_eq!(x.to_vec(), vec![1.0, 2.0]);
        Ok(())
    }

    #[test]
    fn test_hash_code() -> Result<(), Box<dyn Error>> {
        let x = Tensor::create([3], vec![1.0f64, 2.0, 3.0])?;
        let y = x.deep_clone();
        assert_eq!(x.hash_code(), y.hash_code());
        assert_eq!(Tensor::<f64>::new().hash_code(), 0);
        Ok(())
    }
}
