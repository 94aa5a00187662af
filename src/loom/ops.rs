//! Element-wise kernels on tensor views. Results are written through the view,
//! so every tensor aliasing the storage observes them.

use itertools::Itertools;

use super::{
    num::Scalar,
    tensor::{Tensor, TensorError},
};

impl<T: Scalar> Tensor<T> {
    /// Apply `f` to every element in place.
    pub fn map_inplace(&mut self, f: impl Fn(T) -> T) {
        let offset = self.offset();
        let len = self.len();
        let contiguous = self.is_contiguous();
        let mut data = self.storage().write();
        match contiguous {
            true => data[offset..offset + len]
                .iter_mut()
                .for_each(|x| *x = f(*x)),
            false => self
                .layout()
                .positions()
                .for_each(|position| data[offset + position] = f(data[offset + position])),
        }
    }

    /// Combine every element with the matching element of `other` in place.
    pub fn zip_inplace(
        &mut self,
        other: &Tensor<T>,
        f: impl Fn(T, T) -> T,
    ) -> Result<(), TensorError> {
        self.check_shape(other.layout())?;
        // read first: `other` may alias this storage
        let values = other.to_vec();
        let offset = self.offset();
        let mut data = self.storage().write();
        self.layout()
            .positions()
            .zip_eq(values)
            .for_each(|(position, y)| data[offset + position] = f(data[offset + position], y));
        Ok(())
    }

    #[inline]
    pub fn fill(&mut self, value: T) {
        self.map_inplace(|_| value);
    }

    #[inline]
    pub fn scale(&mut self, alpha: T) {
        self.map_inplace(|x| x * alpha);
    }

    /// `self += alpha * other`.
    #[inline]
    pub fn add_scaled(&mut self, other: &Tensor<T>, alpha: T) -> Result<(), TensorError> {
        self.zip_inplace(other, |x, y| x + alpha * y)
    }

    /// Overwrite the elements with those of `other`.
    #[inline]
    pub fn copy_from_tensor(&mut self, other: &Tensor<T>) -> Result<(), TensorError> {
        self.zip_inplace(other, |_, y| y)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use crate::loom::{layout::Layout, storage::Storage, tensor::Tensor};

    #[test]
    fn test_add_scaled() -> Result<(), Box<dyn Error>> {
        let mut x = Tensor::create([3], vec![1.0f32, 2.0, 3.0])?;
        let y = Tensor::create([3], vec![10.0f32, 20.0, 30.0])?;
        x.add_scaled(&y, 0.5)?;
        assert_eq!(x.to_vec(), vec![6.0, 12.0, 18.0]);

        let z = Tensor::create([2], vec![0.0f32, 0.0])?;
        assert!(x.add_scaled(&z, 1.0).is_err());
        Ok(())
    }

    #[test]
    fn test_strided_write() -> Result<(), Box<dyn Error>> {
        let storage = Storage::from_vec(vec![0.0f64; 6]);
        let mut x = Tensor::from_storage(storage.clone(), 0, Layout::new(vec![3], vec![2])?)?;
        x.fill(1.0);
        assert_eq!(*storage.read(), vec![1.0, 0.0, 1.0, 0.0, 1.0, 0.0]);

        let mut y = Tensor::from_storage(storage.clone(), 1, Layout::new(vec![3], vec![2])?)?;
        y.copy_from_tensor(&x)?;
        y.scale(3.0);
        assert_eq!(*storage.read(), vec![1.0, 3.0, 1.0, 3.0, 1.0, 3.0]);
        Ok(())
    }

    #[test]
    fn test_self_alias() -> Result<(), Box<dyn Error>> {
        let mut x = Tensor::create([2], vec![1.0f32, 2.0])?;
        let y = x.clone();
        x.add_scaled(&y, 1.0)?;
        assert_eq!(x.to_vec(), vec![2.0, 4.0]);
        Ok(())
    }
}
