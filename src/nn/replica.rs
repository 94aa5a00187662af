//! Data-parallel training by replication: every worker owns an independent clone of the module,
//! runs `forward`/`backward` on its share of the batch, and the flattened gradients are summed
//! into one aggregate before the optimizer step.

use super::{Module, ModuleError};
use crate::loom::{num::Scalar, tensor::Tensor};

/// Creates `count` independent copies of `module`.
pub fn replicate<M: Module>(module: &M, count: usize) -> Vec<M> {
    (0..count).map(|_| module.clone_module()).collect()
}

/// Adds every tensor of `parts` element-wise into `aggregate`.
///
/// All tensors must be contiguous flat buffers of the same length, as returned by
/// [`get_parameters`](Module::get_parameters).
pub fn accumulate<T: Scalar>(
    aggregate: &mut Tensor<T>,
    parts: &[Tensor<T>],
) -> Result<(), ModuleError> {
    let len = aggregate.len();
    if let Some(part) = parts.iter().find(|part| part.len() != len) {
        return Err(ModuleError::Mismatch(part.len(), len));
    }
    if !aggregate.is_contiguous() {
        // strided aggregates take the slow path
        for part in parts {
            aggregate.add_scaled(part, T::one())?;
        }
        return Ok(());
    }

    let parts: Vec<Vec<T>> = parts.iter().map(Tensor::to_vec).collect();
    let offset = aggregate.offset();
    let mut data = aggregate.storage().write();
    let data = &mut data[offset..offset + len];

    #[cfg(not(feature = "rayon"))]
    for part in &parts {
        data.iter_mut().zip(part.iter()).for_each(|(x, &y)| *x += y);
    }

    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;

        const CHUNK: usize = 4096;
        data.par_chunks_mut(CHUNK)
            .enumerate()
            .for_each(|(index, chunk)| {
                let start = index * CHUNK;
                for part in &parts {
                    let part = &part[start..start + chunk.len()];
                    chunk.iter_mut().zip(part.iter()).for_each(|(x, &y)| *x += y);
                }
            });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use itertools::Itertools;

    use super::{accumulate, replicate};
    use crate::{
        loom::{layout::Layout, storage::Storage, tensor::Tensor},
        nn::{Identity, Module, ModuleError},
    };

    #[test]
    fn test_replicate() -> Result<(), Box<dyn Error>> {
        let mut module = Identity::<f32>::new();
        let x = Tensor::create([2], vec![1.0f32, 2.0])?;
        module.forward(&x)?;

        let replicas = replicate(&module, 3);
        assert_eq!(replicas.len(), 3);
        for replica in &replicas {
            assert!(replica.module_eq(&module));
            assert!(!replica.output().is_alias(module.output()));
        }
        Ok(())
    }

    #[test]
    fn test_accumulate() -> Result<(), Box<dyn Error>> {
        let len = 10000;
        let mut aggregate = Tensor::<f64>::zeros([len]);
        let parts = (1..=3)
            .map(|k| Tensor::create([len], vec![k as f64; len]))
            .collect::<Result<Vec<_>, _>>()?;
        accumulate(&mut aggregate, &parts)?;
        assert!(aggregate.to_vec().iter().all(|&x| x == 6.0));

        let short = Tensor::<f64>::zeros([3]);
        assert!(matches!(
            accumulate(&mut aggregate, &[short]),
            Err(ModuleError::Mismatch(3, 10000))
        ));
        Ok(())
    }

    #[test]
    fn test_accumulate_view() -> Result<(), Box<dyn Error>> {
        let storage = Storage::from_vec(vec![0.0f32; 6]);
        let mut aggregate = Tensor::from_storage(storage.clone(), 2, [3])?;
        let parts = [
            Tensor::create([3], vec![1.0f32, 2.0, 3.0])?,
            Tensor::create([3], vec![1.0f32, 1.0, 1.0])?,
        ];
        accumulate(&mut aggregate, &parts)?;
        assert_eq!(*storage.read(), vec![0.0, 0.0, 2.0, 3.0, 4.0, 0.0]);

        let mut strided = Tensor::from_storage(storage.clone(), 0, Layout::new(vec![3], vec![2])?)?;
        accumulate(&mut strided, &parts[1..])?;
        assert_eq!(
            storage.read().iter().copied().collect_vec(),
            vec![1.0, 0.0, 3.0, 3.0, 5.0, 0.0]
        );
        Ok(())
    }
}
