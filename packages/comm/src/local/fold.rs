//! Element-wise reduction over native payloads.
//!
//! The local cluster performs reductions itself, so it needs to interpret
//! payloads by native datatype. Only fixed-width numeric and boolean
//! datatypes can be reduced; `CHAR` and `BYTE` can only be gathered.

use bytes::Bytes;

use crate::error::{CommError, Result};
use crate::native::{NativeDatatype, NativeOp};

trait Scalar: Copy + Default {
    const WIDTH: usize;

    fn read(bytes: &[u8]) -> Self;
    fn write(self) -> Bytes;
    fn apply(op: NativeOp, a: Self, b: Self) -> Option<Self>;
}

macro_rules! int_scalar {
    ($($ty:ty),*) => {$(
        impl Scalar for $ty {
            const WIDTH: usize = std::mem::size_of::<$ty>();

            fn read(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                buf.copy_from_slice(bytes);
                <$ty>::from_le_bytes(buf)
            }

            fn write(self) -> Bytes {
                Bytes::copy_from_slice(&self.to_le_bytes())
            }

            fn apply(op: NativeOp, a: Self, b: Self) -> Option<Self> {
                let truth = |x: Self| x != 0;
                Some(match op {
                    NativeOp::MIN => a.min(b),
                    NativeOp::MAX => a.max(b),
                    NativeOp::SUM => a.wrapping_add(b),
                    NativeOp::PROD => a.wrapping_mul(b),
                    NativeOp::LAND => (truth(a) && truth(b)) as $ty,
                    NativeOp::LOR => (truth(a) || truth(b)) as $ty,
                    NativeOp::LXOR => (truth(a) != truth(b)) as $ty,
                    NativeOp::BAND => a & b,
                    NativeOp::BOR => a | b,
                    NativeOp::BXOR => a ^ b,
                    _ => return None,
                })
            }
        }
    )*};
}

macro_rules! float_scalar {
    ($($ty:ty),*) => {$(
        impl Scalar for $ty {
            const WIDTH: usize = std::mem::size_of::<$ty>();

            fn read(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                buf.copy_from_slice(bytes);
                <$ty>::from_le_bytes(buf)
            }

            fn write(self) -> Bytes {
                Bytes::copy_from_slice(&self.to_le_bytes())
            }

            fn apply(op: NativeOp, a: Self, b: Self) -> Option<Self> {
                Some(match op {
                    NativeOp::MIN => a.min(b),
                    NativeOp::MAX => a.max(b),
                    NativeOp::SUM => a + b,
                    NativeOp::PROD => a * b,
                    _ => return None,
                })
            }
        }
    )*};
}

int_scalar!(i8, i16, i32, i64, u8, u16, u32, u64);
float_scalar!(f32, f64);

impl Scalar for bool {
    const WIDTH: usize = 1;

    fn read(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    fn write(self) -> Bytes {
        Bytes::copy_from_slice(&[self as u8])
    }

    fn apply(op: NativeOp, a: Self, b: Self) -> Option<Self> {
        Some(match op {
            NativeOp::LAND => a && b,
            NativeOp::LOR => a || b,
            NativeOp::LXOR => a != b,
            _ => return None,
        })
    }
}

fn supports<T: Scalar>(op: NativeOp) -> bool {
    T::apply(op, T::default(), T::default()).is_some()
}

fn fold_as<T: Scalar>(datatype: NativeDatatype, op: NativeOp, parts: &[Bytes]) -> Result<Bytes> {
    let mut acc: Option<T> = None;
    for part in parts {
        if part.len() != T::WIDTH {
            return Err(CommError::MalformedPayload {
                datatype,
                len: part.len(),
            });
        }
        let value = T::read(part);
        acc = Some(match acc {
            None => value,
            Some(prev) => {
                T::apply(op, prev, value).ok_or(CommError::UnsupportedOp { op, datatype })?
            }
        });
    }
    acc.map(T::write).ok_or(CommError::MalformedPayload { datatype, len: 0 })
}

/// Check that `op` is defined for `datatype`.
pub(crate) fn check(datatype: NativeDatatype, op: NativeOp) -> Result<()> {
    let supported = match datatype {
        NativeDatatype::BOOL => supports::<bool>(op),
        NativeDatatype::INT8 => supports::<i8>(op),
        NativeDatatype::INT16 => supports::<i16>(op),
        NativeDatatype::INT32 => supports::<i32>(op),
        NativeDatatype::INT64 => supports::<i64>(op),
        NativeDatatype::UINT8 => supports::<u8>(op),
        NativeDatatype::UINT16 => supports::<u16>(op),
        NativeDatatype::UINT32 => supports::<u32>(op),
        NativeDatatype::UINT64 => supports::<u64>(op),
        NativeDatatype::FLOAT => supports::<f32>(op),
        NativeDatatype::DOUBLE => supports::<f64>(op),
        NativeDatatype::CHAR | NativeDatatype::BYTE => false,
        other => return Err(CommError::UnsupportedDatatype(other)),
    };
    if supported {
        Ok(())
    } else {
        Err(CommError::UnsupportedOp { op, datatype })
    }
}

/// Reduce `parts` (one payload per rank, in rank order) with `op`.
pub(crate) fn fold(datatype: NativeDatatype, op: NativeOp, parts: &[Bytes]) -> Result<Bytes> {
    check(datatype, op)?;
    match datatype {
        NativeDatatype::BOOL => fold_as::<bool>(datatype, op, parts),
        NativeDatatype::INT8 => fold_as::<i8>(datatype, op, parts),
        NativeDatatype::INT16 => fold_as::<i16>(datatype, op, parts),
        NativeDatatype::INT32 => fold_as::<i32>(datatype, op, parts),
        NativeDatatype::INT64 => fold_as::<i64>(datatype, op, parts),
        NativeDatatype::UINT8 => fold_as::<u8>(datatype, op, parts),
        NativeDatatype::UINT16 => fold_as::<u16>(datatype, op, parts),
        NativeDatatype::UINT32 => fold_as::<u32>(datatype, op, parts),
        NativeDatatype::UINT64 => fold_as::<u64>(datatype, op, parts),
        NativeDatatype::FLOAT => fold_as::<f32>(datatype, op, parts),
        NativeDatatype::DOUBLE => fold_as::<f64>(datatype, op, parts),
        other => Err(CommError::UnsupportedDatatype(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn i32s(values: &[i32]) -> Vec<Bytes> {
        values.iter().map(|v| v.write()).collect()
    }

    fn as_i32(bytes: &Bytes) -> i32 {
        i32::read(bytes)
    }

    #[test]
    fn integer_reductions() {
        let parts = i32s(&[3, -1, 7, 2]);
        let dt = NativeDatatype::INT32;
        assert_eq!(as_i32(&fold(dt, NativeOp::SUM, &parts).unwrap()), 11);
        assert_eq!(as_i32(&fold(dt, NativeOp::MIN, &parts).unwrap()), -1);
        assert_eq!(as_i32(&fold(dt, NativeOp::MAX, &parts).unwrap()), 7);
        assert_eq!(as_i32(&fold(dt, NativeOp::PROD, &parts).unwrap()), -42);
        assert_eq!(as_i32(&fold(dt, NativeOp::BOR, &parts).unwrap()), -1);
        assert_eq!(as_i32(&fold(dt, NativeOp::LAND, &parts).unwrap()), 1);
    }

    #[test]
    fn bitwise_on_unsigned() {
        let parts: Vec<Bytes> = [0b1100u8, 0b1010].iter().map(|v| v.write()).collect();
        let dt = NativeDatatype::UINT8;
        assert_eq!(u8::read(&fold(dt, NativeOp::BAND, &parts).unwrap()), 0b1000);
        assert_eq!(u8::read(&fold(dt, NativeOp::BXOR, &parts).unwrap()), 0b0110);
    }

    #[test]
    fn float_reductions() {
        let parts: Vec<Bytes> = [1.5f64, 2.5, -4.0].iter().map(|v| v.write()).collect();
        let dt = NativeDatatype::DOUBLE;
        assert_eq!(f64::read(&fold(dt, NativeOp::SUM, &parts).unwrap()), 0.0);
        assert_eq!(f64::read(&fold(dt, NativeOp::MIN, &parts).unwrap()), -4.0);
    }

    #[test]
    fn bitwise_on_float_rejected() {
        assert!(matches!(
            check(NativeDatatype::DOUBLE, NativeOp::BAND),
            Err(CommError::UnsupportedOp { .. })
        ));
    }

    #[test]
    fn bool_reductions() {
        let parts: Vec<Bytes> = [true, false, true].iter().map(|v| v.write()).collect();
        let dt = NativeDatatype::BOOL;
        assert!(!bool::read(&fold(dt, NativeOp::LAND, &parts).unwrap()));
        assert!(bool::read(&fold(dt, NativeOp::LOR, &parts).unwrap()));
        assert!(!bool::read(&fold(dt, NativeOp::LXOR, &parts).unwrap()));
        assert!(check(dt, NativeOp::SUM).is_err());
    }

    #[test]
    fn char_and_byte_cannot_reduce() {
        assert!(check(NativeDatatype::CHAR, NativeOp::MAX).is_err());
        assert!(check(NativeDatatype::BYTE, NativeOp::SUM).is_err());
        assert!(matches!(
            check(NativeDatatype::from_raw(500), NativeOp::SUM),
            Err(CommError::UnsupportedDatatype(_))
        ));
    }

    #[test]
    fn wrong_width_is_malformed() {
        let parts = vec![Bytes::from_static(&[1, 2, 3])];
        assert!(matches!(
            fold(NativeDatatype::INT32, NativeOp::SUM, &parts),
            Err(CommError::MalformedPayload { len: 3, .. })
        ));
    }
}
