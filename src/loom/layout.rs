use derive_more::{Deref, DerefMut, Display, From, Into};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("layout error: shape {0} and stride {1} have different modes")]
    Mode(Shape, Stride),
}

#[derive(
    Debug,
    Default,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Deref,
    DerefMut,
    From,
    Into,
    Display,
    Serialize,
    Deserialize,
)]
#[display("[{}]", _0.iter().format(", "))]
pub struct Shape(Vec<usize>);

#[derive(
    Debug,
    Default,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Deref,
    DerefMut,
    From,
    Into,
    Display,
    Serialize,
    Deserialize,
)]
#[display("[{}]", _0.iter().format(", "))]
pub struct Stride(Vec<usize>);

impl Shape {
    /// Row-major strides for this shape.
    pub fn contiguous_stride(&self) -> Stride {
        let mut stride = vec![0; self.len()];
        let mut acc = 1;
        for (s, &extent) in stride.iter_mut().zip(self.iter()).rev() {
            *s = acc;
            acc *= extent;
        }
        Stride(stride)
    }
}

/// Sizes and strides of a tensor view. A layout with no axes describes the empty tensor.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[display("{shape}:{stride}")]
pub struct Layout {
    shape: Shape,
    stride: Stride,
}

impl Layout {
    pub fn new(shape: impl Into<Shape>, stride: impl Into<Stride>) -> Result<Self, LayoutError> {
        let shape = shape.into();
        let stride = stride.into();
        if shape.len() != stride.len() {
            return Err(LayoutError::Mode(shape, stride));
        }
        Ok(Self { shape, stride })
    }

    /// Creates a row-major layout.
    #[inline]
    pub fn from_shape(shape: impl Into<Shape>) -> Self {
        let shape = shape.into();
        let stride = shape.contiguous_stride();
        Self { shape, stride }
    }

    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    #[inline]
    pub fn stride(&self) -> &Stride {
        &self.stride
    }

    /// Number of axes.
    #[inline]
    pub fn len(&self) -> usize {
        self.shape.len()
    }

    /// Returns `true` if the layout has no axes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shape.is_empty()
    }

    /// Number of elements addressed by the layout.
    #[inline]
    pub fn size(&self) -> usize {
        match self.shape.is_empty() {
            true => 0,
            false => self.shape.iter().product(),
        }
    }

    /// Number of storage elements spanned, counted from the view's offset.
    #[inline]
    pub fn span(&self) -> usize {
        match self.size() {
            0 => 0,
            _ => {
                let last: usize = self
                    .shape
                    .iter()
                    .zip_eq(self.stride.iter())
                    .map(|(&extent, &stride)| (extent - 1) * stride)
                    .sum();
                last + 1
            }
        }
    }

    /// Returns `true` if the strides describe a row-major layout without gaps.
    /// Axes of extent 1 never break contiguity.
    pub fn is_contiguous(&self) -> bool {
        let mut expected = 1;
        for (&extent, &stride) in self.shape.iter().rev().zip_eq(self.stride.iter().rev()) {
            if extent == 1 {
                continue;
            }
            if stride != expected {
                return false;
            }
            expected *= extent;
        }
        true
    }

    /// Storage positions (relative to the view offset) of all elements in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        let size = self.size();
        let mut index = vec![0usize; self.len()];
        (0..size).map(move |n| {
            let position = index
                .iter()
                .zip_eq(self.stride.iter())
                .map(|(&i, &stride)| i * stride)
                .sum();
            if n + 1 < size {
                for (i, &extent) in index.iter_mut().zip(self.shape.iter()).rev() {
                    *i += 1;
                    if *i < extent {
                        break;
                    }
                    *i = 0;
                }
            }
            position
        })
    }
}

pub trait IntoLayout {
    fn into_layout(self) -> Layout;
}

impl IntoLayout for Layout {
    #[inline]
    fn into_layout(self) -> Layout {
        self
    }
}

impl IntoLayout for &Layout {
    #[inline]
    fn into_layout(self) -> Layout {
        self.clone()
    }
}

impl IntoLayout for Shape {
    #[inline]
    fn into_layout(self) -> Layout {
        Layout::from_shape(self)
    }
}

impl IntoLayout for usize {
    #[inline]
    fn into_layout(self) -> Layout {
        Layout::from_shape(vec![self])
    }
}

impl IntoLayout for Vec<usize> {
    #[inline]
    fn into_layout(self) -> Layout {
        Layout::from_shape(self)
    }
}

impl IntoLayout for &[usize] {
    #[inline]
    fn into_layout(self) -> Layout {
        Layout::from_shape(self.to_vec())
    }
}

impl<const N: usize> IntoLayout for [usize; N] {
    #[inline]
    fn into_layout(self) -> Layout {
        Layout::from_shape(self.to_vec())
    }
}
