use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use derive_more::Display;

use super::num::Scalar;

#[derive(Debug, Default, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StorageId;

/// A shared, resizable buffer of scalars. Cloning a [`Storage`] yields another handle to the same buffer.
#[derive(Debug, Clone)]
pub struct Storage<T> {
    data: Arc<RwLock<Vec<T>>>,
    id: uid::Id<StorageId>,
}

impl<T: Scalar> Default for Storage<T> {
    #[inline]
    fn default() -> Self {
        Self::from_vec(vec![])
    }
}

impl<T: Scalar> Storage<T> {
    #[inline]
    pub fn from_vec(data: Vec<T>) -> Self {
        let data = Arc::new(RwLock::new(data));
        let id = uid::Id::new();
        Self { data, id }
    }

    /// Allocates a storage of `len` zeros.
    #[inline]
    pub fn zeros(len: usize) -> Self {
        Self::from_vec(vec![T::zero(); len])
    }

    #[inline]
    pub fn id(&self) -> uid::Id<StorageId> {
        self.id
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    #[inline]
    pub fn read(&self) -> RwLockReadGuard<'_, Vec<T>> {
        self.data.read().expect("failed to lock")
    }

    #[inline]
    pub fn write(&self) -> RwLockWriteGuard<'_, Vec<T>> {
        self.data.write().expect("failed to lock")
    }

    /// Returns `true` if both handles refer to the same buffer.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Grows or shrinks the buffer, filling new slots with zeros.
    #[inline]
    pub fn resize(&self, len: usize) {
        self.write().resize(len, T::zero());
    }

    /// Copies `count` elements of `src` starting at `src_start` into this storage starting at `dst_start`.
    ///
    /// # Panics
    /// Panics if either range is out of bounds.
    pub fn copy_from(&self, src: &Storage<T>, src_start: usize, dst_start: usize, count: usize) {
        if self.ptr_eq(src) {
            let mut data = self.write();
            data.copy_within(src_start..src_start + count, dst_start);
            return;
        }
        let src = src.read();
        let mut dst = self.write();
        dst[dst_start..dst_start + count].copy_from_slice(&src[src_start..src_start + count]);
    }

    /// Allocates a new buffer holding a copy of the contents.
    #[inline]
    pub fn deep_clone(&self) -> Self {
        Self::from_vec(self.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::Storage;

    #[test]
    fn test_copy() {
        let x = Storage::from_vec(vec![1.0f32, 2.0, 3.0, 4.0]);
        let y = Storage::<f32>::zeros(6);
        y.copy_from(&x, 1, 2, 3);
        assert_eq!(*y.read(), vec![0.0, 0.0, 2.0, 3.0, 4.0, 0.0]);

        x.copy_from(&x.clone(), 0, 1, 3);
        assert_eq!(*x.read(), vec![1.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_identity() {
        let x = Storage::from_vec(vec![1.0f64; 3]);
        let y = x.clone();
        let z = x.deep_clone();
        assert!(x.ptr_eq(&y));
        assert!(!x.ptr_eq(&z));
        assert_eq!(*x.read(), *z.read());
        assert_ne!(x.id(), z.id());

        y.resize(5);
        assert_eq!(x.len(), 5);
        assert_eq!(z.len(), 3);
    }
}
