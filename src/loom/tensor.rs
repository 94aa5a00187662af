use std::hash::{Hash, Hasher};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    layout::{IntoLayout, Layout, LayoutError, Shape},
    num::Scalar,
    storage::Storage,
};

#[derive(Debug, Error)]
pub enum TensorError {
    #[error("tensor creation error: layout {0}'s size not match data len {1}")]
    Create(Layout, usize),
    #[error("tensor view error: layout {0} at offset {1} exceeds storage len {2}")]
    View(Layout, usize, usize),
    #[error("tensor reshape error: layout {0}'s size not match layout {1}'s")]
    Reshape(Layout, Layout),
    #[error("tensor shape error: layout {0} not match layout {1}")]
    Shape(Layout, Layout),
    #[error("tensor layout error: {0}")]
    Layout(#[from] LayoutError),
}

/// A strided view into a [`Storage`]. Several tensors may alias one storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "TensorRepr<T>", try_from = "TensorRepr<T>", bound = "T: Scalar")]
pub struct Tensor<T> {
    storage: Storage<T>,
    offset: usize,
    layout: Layout,
}

impl<T: Scalar> Default for Tensor<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> Tensor<T> {
    /// Create an empty tensor over an empty storage.
    #[inline]
    pub fn new() -> Self {
        let storage = Storage::default();
        let offset = 0;
        let layout = Layout::default();
        Self {
            storage,
            offset,
            layout,
        }
    }

    /// Create a contiguous tensor owning a fresh storage with the given contents.
    pub fn create(
        layout: impl IntoLayout,
        contents: impl Into<Vec<T>>,
    ) -> Result<Self, TensorError> {
        let layout = layout.into_layout();
        let contents: Vec<T> = contents.into();
        if layout.size() != contents.len() || !layout.is_contiguous() {
            return Err(TensorError::Create(layout, contents.len()));
        }
        let storage = Storage::from_vec(contents);
        let offset = 0;
        Ok(Self {
            storage,
            offset,
            layout,
        })
    }

    /// Create a contiguous tensor of zeros.
    #[inline]
    pub fn zeros(layout: impl IntoLayout) -> Self {
        let layout = Layout::from_shape(layout.into_layout().shape().clone());
        let storage = Storage::zeros(layout.size());
        let offset = 0;
        Self {
            storage,
            offset,
            layout,
        }
    }

    /// Create a contiguous tensor of zeros with the same shape.
    #[inline]
    pub fn zeros_like(&self) -> Self {
        Self::zeros(self.shape().clone())
    }

    /// Create a view into an existing storage. Returns error if the view reaches past the storage.
    pub fn from_storage(
        storage: Storage<T>,
        offset: usize,
        layout: impl IntoLayout,
    ) -> Result<Self, TensorError> {
        let layout = layout.into_layout();
        check_view(&storage, offset, &layout)?;
        Ok(Self {
            storage,
            offset,
            layout,
        })
    }

    #[inline]
    pub fn storage(&self) -> &Storage<T> {
        &self.storage
    }

    /// 0-based position of the first element in the storage.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    #[inline]
    pub fn shape(&self) -> &Shape {
        self.layout.shape()
    }

    #[inline]
    pub fn stride(&self) -> &[usize] {
        self.layout.stride()
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.layout.size()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_contiguous(&self) -> bool {
        self.layout.is_contiguous()
    }

    /// Returns `true` if both tensors view the same storage.
    #[inline]
    pub fn is_alias(&self, other: &Self) -> bool {
        self.storage.ptr_eq(&other.storage)
    }

    /// Rebind the view in place.
    ///
    /// # Panics
    /// Panics if the view reaches past the storage.
    #[inline]
    pub fn set(&mut self, storage: Storage<T>, offset: usize, layout: impl IntoLayout) {
        let layout = layout.into_layout();
        if let Err(err) = check_view(&storage, offset, &layout) {
            panic!("{err}");
        }
        self.storage = storage;
        self.offset = offset;
        self.layout = layout;
    }

    /// Detach from the storage, leaving an empty tensor.
    #[inline]
    pub fn detach(&mut self) {
        *self = Self::new();
    }

    /// Reshape the tensor, leaving the underlying data untouched.
    #[inline]
    pub fn reshape(mut self, layout: impl IntoLayout) -> Result<Self, TensorError> {
        let layout = layout.into_layout();
        if self.len() != layout.size() || !self.is_contiguous() {
            return Err(TensorError::Reshape(self.layout.clone(), layout));
        }
        self.layout = layout;
        Ok(self)
    }

    /// Returns error if the shape differs from `layout`'s.
    #[inline]
    pub fn check_shape(&self, layout: impl IntoLayout) -> Result<(), TensorError> {
        let layout = layout.into_layout();
        match self.shape() == layout.shape() {
            true => Ok(()),
            false => Err(TensorError::Shape(self.layout.clone(), layout)),
        }
    }

    /// Read the elements in row-major order.
    pub fn to_vec(&self) -> Vec<T> {
        let data = self.storage.read();
        match self.is_contiguous() {
            true => data[self.offset..self.offset + self.len()].to_vec(),
            false => self
                .layout
                .positions()
                .map(|position| data[self.offset + position])
                .collect(),
        }
    }

    /// Copy the elements into a fresh contiguous storage.
    #[inline]
    pub fn deep_clone(&self) -> Self {
        if self.layout.is_empty() {
            return Self::new();
        }
        let storage = Storage::from_vec(self.to_vec());
        let offset = 0;
        let layout = Layout::from_shape(self.shape().clone());
        Self {
            storage,
            offset,
            layout,
        }
    }
}

/// A view is valid if it starts inside the storage (or right at its end) and its span fits.
fn check_view<T: Scalar>(
    storage: &Storage<T>,
    offset: usize,
    layout: &Layout,
) -> Result<(), TensorError> {
    let len = storage.len();
    match offset + layout.span() <= len {
        true => Ok(()),
        false => Err(TensorError::View(layout.clone(), offset, len)),
    }
}

impl<T: Scalar> PartialEq for Tensor<T> {
    fn eq(&self, other: &Self) -> bool {
        if self.shape() != other.shape() {
            return false;
        }
        if self.is_alias(other) && self.offset == other.offset && self.layout == other.layout {
            return true;
        }
        self.to_vec() == other.to_vec()
    }
}

impl<T: Scalar> Hash for Tensor<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.shape().hash(state);
        let data = self.to_vec().into_iter().map(T::canonical).collect_vec();
        bytemuck::cast_slice::<T, u8>(&data).hash(state);
    }
}

#[derive(Serialize, Deserialize)]
#[serde(bound = "T: Scalar")]
struct TensorRepr<T> {
    shape: Shape,
    data: Vec<T>,
}

impl<T: Scalar> From<Tensor<T>> for TensorRepr<T> {
    fn from(value: Tensor<T>) -> Self {
        let shape = value.shape().clone();
        let data = value.to_vec();
        Self { shape, data }
    }
}

impl<T: Scalar> TryFrom<TensorRepr<T>> for Tensor<T> {
    type Error = TensorError;

    fn try_from(value: TensorRepr<T>) -> Result<Self, Self::Error> {
        let TensorRepr { shape, data } = value;
        match shape.is_empty() {
            true => Ok(Self::new()),
            false => Self::create(shape, data),
        }
    }
}
