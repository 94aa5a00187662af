use std::fmt::Debug;

use bytemuck::{Pod, Zeroable};
use derive_more::Display;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum DataType {
    F32,
    F64,
}

impl DataType {
    /// Returns the byte size of one element of this data type.
    pub const fn size(self) -> usize {
        match self {
            DataType::F32 => 4,
            DataType::F64 => 8,
        }
    }
}

pub trait Zero {
    fn zero() -> Self;
}

impl Zero for f32 {
    fn zero() -> Self {
        0.0
    }
}

impl Zero for f64 {
    fn zero() -> Self {
        0.0
    }
}

pub trait One {
    fn one() -> Self;
}

impl One for f32 {
    fn one() -> Self {
        1.0
    }
}

impl One for f64 {
    fn one() -> Self {
        1.0
    }
}

/// Element type of a storage. Fixed for the lifetime of a module.
pub trait Scalar:
    Sized
    + Zeroable
    + Pod
    + Zero
    + One
    + Debug
    + PartialEq
    + PartialOrd
    + std::ops::Add<Output = Self>
    + std::ops::Sub<Output = Self>
    + std::ops::Mul<Output = Self>
    + std::ops::AddAssign
    + std::ops::MulAssign
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + sealed::Sealed
    + 'static
{
    const DATA_TYPE: DataType;

    /// Lossy conversion used by initializers and tests.
    fn from_f64(value: f64) -> Self;

    /// Maps values that compare equal onto one bit pattern: `-0.0` becomes `0.0`, every NaN the
    /// same quiet NaN.
    fn canonical(self) -> Self;
}

impl Scalar for f32 {
    const DATA_TYPE: DataType = DataType::F32;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn canonical(self) -> Self {
        if self.is_nan() {
            f32::NAN
        } else if self == 0.0 {
            0.0
        } else {
            self
        }
    }
}

impl Scalar for f64 {
    const DATA_TYPE: DataType = DataType::F64;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    #[inline]
    fn canonical(self) -> Self {
        if self.is_nan() {
            f64::NAN
        } else if self == 0.0 {
            0.0
        } else {
            self
        }
    }
}

mod sealed {
    pub trait Sealed {}

    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

#[cfg(test)]
mod tests {
    use super::{DataType, One, Scalar, Zero};

    #[test]
    fn test_data_type() {
        assert_eq!(f32::DATA_TYPE, DataType::F32);
        assert_eq!(f64::DATA_TYPE, DataType::F64);
        assert_eq!(DataType::F32.size(), size_of::<f32>());
        assert_eq!(DataType::F64.size(), size_of::<f64>());
        assert_eq!(f64::zero() + f64::one(), 1.0);
        assert_eq!(f32::from_f64(0.5), 0.5f32);
    }

    #[test]
    fn test_canonical() {
        assert_eq!((-0.0f32).canonical().to_bits(), 0.0f32.to_bits());
        assert_eq!((-0.0f64).canonical().to_bits(), 0.0f64.to_bits());
        assert_eq!((-f64::NAN).canonical().to_bits(), f64::NAN.to_bits());
        assert_eq!(1.5f32.canonical(), 1.5);
    }
}
