//! Compaction of parameter (or gradient) tensors into one contiguous storage.
//!
//! After [`try_flatten`], every input tensor is a sub-view of the returned buffer,
//! so an optimizer can update all of them in a single pass over one slice.

use thiserror::Error;

use crate::loom::{layout::Layout, num::Scalar, storage::Storage, tensor::Tensor};

#[derive(Debug, Error)]
pub enum FlattenError {
    #[error("flatten error: no tensor to flatten")]
    Empty,
    #[error("flatten error: tensor {index} with layout {layout} is not contiguous")]
    NonContiguous { index: usize, layout: Layout },
}

/// Returns a full view over the shared storage if the tensors already fill exactly one storage.
///
/// The tensors are compact if all of them view the same storage and their element counts
/// sum to that storage's length. Returns `None` otherwise, or if there is no tensor.
pub fn compact<'a, T: Scalar>(
    tensors: impl IntoIterator<Item = &'a Tensor<T>>,
) -> Option<Tensor<T>> {
    let mut tensors = tensors.into_iter();
    let first = tensors.next()?;
    let storage = first.storage();

    let mut len = first.len();
    for tensor in tensors {
        if !tensor.storage().ptr_eq(storage) {
            return None;
        }
        len += tensor.len();
    }

    match len == storage.len() {
        true => Tensor::from_storage(storage.clone(), 0, len).ok(),
        false => None,
    }
}

/// Concatenate the tensors into one contiguous buffer and rebind each of them as a sub-view of it.
///
/// Already compact tensors are returned as a view over their storage without copying.
/// Otherwise a fresh storage is allocated, elements are copied in input order, and every tensor
/// keeps its shape and strides while its storage and offset are replaced.
///
/// All tensors are checked before anything is copied; on error the inputs are left untouched.
#[cfg_attr(feature = "trace", tracing::instrument(skip_all, fields(count = tensors.len())))]
pub fn try_flatten<T: Scalar>(tensors: &mut [&mut Tensor<T>]) -> Result<Tensor<T>, FlattenError> {
    if tensors.is_empty() {
        return Err(FlattenError::Empty);
    }
    if let Some(output) = compact(tensors.iter().map(|tensor| &**tensor)) {
        log::debug!(
            "{} tensors already compact in storage {}",
            tensors.len(),
            output.storage().id()
        );
        return Ok(output);
    }

    if let Some((index, tensor)) = tensors
        .iter()
        .enumerate()
        .find(|(_, tensor)| !tensor.is_contiguous())
    {
        let layout = tensor.layout().clone();
        return Err(FlattenError::NonContiguous { index, layout });
    }

    let len: usize = tensors.iter().map(|tensor| tensor.len()).sum();
    let storage = Storage::zeros(len);

    let mut cursor = 0;
    for tensor in tensors.iter_mut() {
        let count = tensor.len();
        storage.copy_from(tensor.storage(), tensor.offset(), cursor, count);

        let layout = tensor.layout().clone();
        tensor.set(storage.clone(), cursor, layout);
        cursor += count;
    }

    log::debug!(
        "flattened {} tensors into storage {} of len {len}",
        tensors.len(),
        storage.id()
    );
    Ok(Tensor::from_storage(storage, 0, len).expect("flat view must fit its storage"))
}

/// Concatenate the tensors into one contiguous buffer. See [`try_flatten`].
///
/// # Panics
/// Panics if `tensors` is empty or if a tensor to be copied is not contiguous.
#[inline]
pub fn flatten<T: Scalar>(tensors: &mut [&mut Tensor<T>]) -> Tensor<T> {
    try_flatten(tensors).expect("tensors must be non-empty and contiguous")
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use itertools::Itertools;

    use super::{FlattenError, compact, flatten, try_flatten};
    use crate::loom::{layout::Layout, storage::Storage, tensor::Tensor};

    #[test]
    fn test_flatten() -> Result<(), Box<dyn Error>> {
        let mut x = Tensor::create([2], vec![1.0f32, 2.0])?;
        let mut y = Tensor::create([3], vec![3.0f32, 4.0, 5.0])?;
        let mut z = Tensor::create([4], vec![6.0f32, 7.0, 8.0, 9.0])?;

        let output = flatten(&mut [&mut x, &mut y, &mut z]);
        assert_eq!(output.len(), 9);
        assert_eq!(output.to_vec(), (1..=9).map(|x| x as f32).collect_vec());

        assert_eq!(x.to_vec(), vec![1.0, 2.0]);
        assert_eq!(y.to_vec(), vec![3.0, 4.0, 5.0]);
        assert_eq!(z.to_vec(), vec![6.0, 7.0, 8.0, 9.0]);

        assert!(x.is_alias(&output) && y.is_alias(&output) && z.is_alias(&output));
        assert_eq!([x.offset(), y.offset(), z.offset()], [0, 2, 5]);
        Ok(())
    }

    #[test]
    fn test_shape_preserved() -> Result<(), Box<dyn Error>> {
        let mut x = Tensor::create([2, 3], (0..6).map(|x| x as f64).collect_vec())?;
        let mut y = Tensor::create([1, 2], vec![10.0, 11.0])?;
        let output = flatten(&mut [&mut y, &mut x]);

        assert_eq!(output.to_vec(), vec![10.0, 11.0, 0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(x.shape().to_vec(), vec![2, 3]);
        assert_eq!(x.stride(), &[3, 1]);
        assert_eq!(x.offset(), 2);
        assert_eq!(y.shape().to_vec(), vec![1, 2]);
        Ok(())
    }

    #[test]
    fn test_idempotent() -> Result<(), Box<dyn Error>> {
        let mut x = Tensor::create([2], vec![1.0f32, 2.0])?;
        let mut y = Tensor::create([2, 2], vec![3.0f32, 4.0, 5.0, 6.0])?;

        let first = flatten(&mut [&mut x, &mut y]);
        let (offset_x, offset_y) = (x.offset(), y.offset());

        let second = flatten(&mut [&mut x, &mut y]);
        assert!(second.is_alias(&first));
        assert!(x.is_alias(&first) && y.is_alias(&first));
        assert_eq!((x.offset(), y.offset()), (offset_x, offset_y));
        assert_eq!(second, first);
        Ok(())
    }

    #[test]
    fn test_compact() -> Result<(), Box<dyn Error>> {
        let storage = Storage::from_vec((0..6).map(|x| x as f32).collect_vec());
        let x = Tensor::from_storage(storage.clone(), 0, [2])?;
        let y = Tensor::from_storage(storage.clone(), 2, [4])?;
        let output = compact([&x, &y]).ok_or("must be compact")?;
        assert!(output.is_alias(&x));
        assert_eq!(output.len(), 6);

        // sums short of the storage
        let z = Tensor::from_storage(storage.clone(), 2, [3])?;
        assert!(compact([&x, &z]).is_none());

        // sums beyond the storage
        assert!(compact([&x, &y, &z]).is_none());

        // spans two storages
        let w = Tensor::create([4], vec![0.0f32; 4])?;
        assert!(compact([&x, &w]).is_none());

        // a single tensor is compact iff it fills its storage
        let v = Tensor::from_storage(storage.clone(), 0, [6])?;
        assert!(compact([&v]).is_some());
        assert!(compact([&x]).is_none());

        assert!(compact::<f32>([]).is_none());
        Ok(())
    }

    #[test]
    fn test_compact_no_copy() -> Result<(), Box<dyn Error>> {
        let storage = Storage::from_vec(vec![1.0f64, 2.0, 3.0]);
        let mut x = Tensor::from_storage(storage.clone(), 0, [1])?;
        let mut y = Tensor::from_storage(storage.clone(), 1, [2])?;
        let output = flatten(&mut [&mut x, &mut y]);
        assert!(output.storage().ptr_eq(&storage));
        assert!(x.storage().ptr_eq(&storage) && y.storage().ptr_eq(&storage));
        Ok(())
    }

    #[test]
    fn test_errors() -> Result<(), Box<dyn Error>> {
        assert!(matches!(
            try_flatten::<f32>(&mut []),
            Err(FlattenError::Empty)
        ));

        let storage = Storage::from_vec((0..8).map(|x| x as f32).collect_vec());
        let mut x = Tensor::create([2], vec![1.0f32, 2.0])?;
        let mut y = Tensor::from_storage(storage.clone(), 0, Layout::new(vec![4], vec![2])?)?;
        let result = try_flatten(&mut [&mut x, &mut y]);
        assert!(matches!(
            result,
            Err(FlattenError::NonContiguous { index: 1, .. })
        ));

        // nothing was rebound
        assert!(!x.is_alias(&y));
        assert!(y.storage().ptr_eq(&storage));
        assert_eq!(x.to_vec(), vec![1.0, 2.0]);
        Ok(())
    }

    #[test]
    #[should_panic]
    fn test_flatten_empty_panics() {
        flatten::<f32>(&mut []);
    }

    #[test]
    fn test_random() -> Result<(), Box<dyn Error>> {
        let mut rng = fastrand::Rng::with_seed(42);
        for _ in 0..32 {
            let count = rng.usize(1..8);
            let mut tensors = (0..count)
                .map(|_| {
                    let shape = (0..rng.usize(1..4)).map(|_| rng.usize(1..5)).collect_vec();
                    let len = shape.iter().product();
                    let data = (0..len).map(|_| rng.f32()).collect_vec();
                    Tensor::create(shape, data)
                })
                .collect::<Result<Vec<_>, _>>()?;
            let before = tensors.iter().map(|x| x.to_vec()).collect_vec();

            let mut refs = tensors.iter_mut().collect_vec();
            let output = try_flatten(&mut refs)?;

            assert_eq!(output.len(), before.iter().map(Vec::len).sum::<usize>());
            assert_eq!(output.to_vec(), before.concat());
            for (tensor, data) in tensors.iter().zip_eq(before.iter()) {
                assert_eq!(&tensor.to_vec(), data);
                assert!(tensor.is_alias(&output));
            }
        }
        Ok(())
    }
}
