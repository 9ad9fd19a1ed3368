//! Type-erased collective dispatch.
//!
//! Collectives are generic over the element type, but the communicator only
//! understands native datatype and operation identifiers. This module holds
//! the closed tables that bridge the two:
//!
//! - [`TypeTag`] names every Rust scalar an [`Element`] can be.
//! - The datatype table maps a tag to its [`NativeDatatype`].
//! - The operation table maps a `(tag, op)` pair to its [`NativeOp`].
//!
//! Supporting a new element type means adding entries here, not new code
//! paths in the collectives.

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use zoneview_comm::{NativeDatatype, NativeOp};

use crate::error::{Error, Result};

/// Identifies the element type of a collective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeTag {
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    I128,
    U8,
    U16,
    U32,
    U64,
    U128,
    F32,
    F64,
}

impl TypeTag {
    /// Every tag, in declaration order.
    pub const ALL: [TypeTag; 14] = [
        TypeTag::Bool,
        TypeTag::Char,
        TypeTag::I8,
        TypeTag::I16,
        TypeTag::I32,
        TypeTag::I64,
        TypeTag::I128,
        TypeTag::U8,
        TypeTag::U16,
        TypeTag::U32,
        TypeTag::U64,
        TypeTag::U128,
        TypeTag::F32,
        TypeTag::F64,
    ];

    /// The Rust spelling of the type.
    pub fn name(&self) -> &'static str {
        match self {
            TypeTag::Bool => "bool",
            TypeTag::Char => "char",
            TypeTag::I8 => "i8",
            TypeTag::I16 => "i16",
            TypeTag::I32 => "i32",
            TypeTag::I64 => "i64",
            TypeTag::I128 => "i128",
            TypeTag::U8 => "u8",
            TypeTag::U16 => "u16",
            TypeTag::U32 => "u32",
            TypeTag::U64 => "u64",
            TypeTag::U128 => "u128",
            TypeTag::F32 => "f32",
            TypeTag::F64 => "f64",
        }
    }

    fn is_integer(&self) -> bool {
        !matches!(
            self,
            TypeTag::Bool | TypeTag::Char | TypeTag::F32 | TypeTag::F64
        )
    }

    fn is_float(&self) -> bool {
        matches!(self, TypeTag::F32 | TypeTag::F64)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A reduction operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReduceOp {
    Min,
    Max,
    Sum,
    Product,
    LogicalAnd,
    LogicalOr,
    LogicalXor,
    BitAnd,
    BitOr,
    BitXor,
}

impl ReduceOp {
    /// Every operator, in declaration order.
    pub const ALL: [ReduceOp; 10] = [
        ReduceOp::Min,
        ReduceOp::Max,
        ReduceOp::Sum,
        ReduceOp::Product,
        ReduceOp::LogicalAnd,
        ReduceOp::LogicalOr,
        ReduceOp::LogicalXor,
        ReduceOp::BitAnd,
        ReduceOp::BitOr,
        ReduceOp::BitXor,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ReduceOp::Min => "min",
            ReduceOp::Max => "max",
            ReduceOp::Sum => "sum",
            ReduceOp::Product => "product",
            ReduceOp::LogicalAnd => "logical_and",
            ReduceOp::LogicalOr => "logical_or",
            ReduceOp::LogicalXor => "logical_xor",
            ReduceOp::BitAnd => "bit_and",
            ReduceOp::BitOr => "bit_or",
            ReduceOp::BitXor => "bit_xor",
        }
    }

    fn native(&self) -> NativeOp {
        match self {
            ReduceOp::Min => NativeOp::MIN,
            ReduceOp::Max => NativeOp::MAX,
            ReduceOp::Sum => NativeOp::SUM,
            ReduceOp::Product => NativeOp::PROD,
            ReduceOp::LogicalAnd => NativeOp::LAND,
            ReduceOp::LogicalOr => NativeOp::LOR,
            ReduceOp::LogicalXor => NativeOp::LXOR,
            ReduceOp::BitAnd => NativeOp::BAND,
            ReduceOp::BitOr => NativeOp::BOR,
            ReduceOp::BitXor => NativeOp::BXOR,
        }
    }

    fn is_logical(&self) -> bool {
        matches!(
            self,
            ReduceOp::LogicalAnd | ReduceOp::LogicalOr | ReduceOp::LogicalXor
        )
    }

    fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            ReduceOp::Min | ReduceOp::Max | ReduceOp::Sum | ReduceOp::Product
        )
    }
}

impl fmt::Display for ReduceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A scalar that can take part in a collective.
///
/// Elements travel as little-endian bytes. `decode` returns `None` when the
/// bytes are not a valid encoding.
pub trait Element: Copy + Send + 'static {
    const TAG: TypeTag;

    fn encode(&self) -> Bytes;
    fn decode(bytes: &[u8]) -> Option<Self>;
}

macro_rules! numeric_element {
    ($($ty:ty => $tag:ident),* $(,)?) => {$(
        impl Element for $ty {
            const TAG: TypeTag = TypeTag::$tag;

            fn encode(&self) -> Bytes {
                Bytes::copy_from_slice(&self.to_le_bytes())
            }

            fn decode(bytes: &[u8]) -> Option<Self> {
                Some(<$ty>::from_le_bytes(bytes.try_into().ok()?))
            }
        }
    )*};
}

numeric_element!(
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    i128 => I128,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    u128 => U128,
    f32 => F32,
    f64 => F64,
);

impl Element for bool {
    const TAG: TypeTag = TypeTag::Bool;

    fn encode(&self) -> Bytes {
        Bytes::copy_from_slice(&[*self as u8])
    }

    fn decode(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0] => Some(false),
            [1] => Some(true),
            _ => None,
        }
    }
}

impl Element for char {
    const TAG: TypeTag = TypeTag::Char;

    fn encode(&self) -> Bytes {
        Bytes::copy_from_slice(&(*self as u32).to_le_bytes())
    }

    fn decode(bytes: &[u8]) -> Option<Self> {
        char::from_u32(u32::from_le_bytes(bytes.try_into().ok()?))
    }
}

lazy_static::lazy_static! {
    static ref DATATYPES: HashMap<TypeTag, NativeDatatype> = {
        let mut map = HashMap::new();
        map.insert(TypeTag::Bool, NativeDatatype::BOOL);
        map.insert(TypeTag::Char, NativeDatatype::CHAR);
        map.insert(TypeTag::I8, NativeDatatype::INT8);
        map.insert(TypeTag::I16, NativeDatatype::INT16);
        map.insert(TypeTag::I32, NativeDatatype::INT32);
        map.insert(TypeTag::I64, NativeDatatype::INT64);
        map.insert(TypeTag::U8, NativeDatatype::UINT8);
        map.insert(TypeTag::U16, NativeDatatype::UINT16);
        map.insert(TypeTag::U32, NativeDatatype::UINT32);
        map.insert(TypeTag::U64, NativeDatatype::UINT64);
        map.insert(TypeTag::F32, NativeDatatype::FLOAT);
        map.insert(TypeTag::F64, NativeDatatype::DOUBLE);
        map
    };

    static ref OPERATIONS: HashMap<(TypeTag, ReduceOp), NativeOp> = {
        let mut map = HashMap::new();
        for tag in DATATYPES.keys() {
            for op in ReduceOp::ALL {
                let registered = if tag.is_integer() {
                    true
                } else if tag.is_float() {
                    op.is_arithmetic()
                } else if *tag == TypeTag::Bool {
                    op.is_logical()
                } else {
                    false
                };
                if registered {
                    map.insert((*tag, op), op.native());
                }
            }
        }
        map
    };
}

/// The native datatype for `tag`.
pub fn datatype(tag: TypeTag) -> Result<NativeDatatype> {
    DATATYPES
        .get(&tag)
        .copied()
        .ok_or(Error::UnsupportedType(tag))
}

/// The native operation and datatype for reducing `tag` with `op`.
pub fn operation(tag: TypeTag, op: ReduceOp) -> Result<(NativeOp, NativeDatatype)> {
    let datatype = datatype(tag)?;
    let native = OPERATIONS
        .get(&(tag, op))
        .copied()
        .ok_or(Error::UnsupportedOperation { tag, op })?;
    Ok((native, datatype))
}

/// Is `op` registered for `tag`?
pub fn is_registered(tag: TypeTag, op: ReduceOp) -> bool {
    OPERATIONS.contains_key(&(tag, op))
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn i64_survives_encoding(v: i64) {
            prop_assert_eq!(i64::decode(&v.encode()), Some(v));
        }

        #[test]
        fn char_survives_encoding(c: char) {
            prop_assert_eq!(char::decode(&c.encode()), Some(c));
        }

        #[test]
        fn f64_bits_survive_encoding(v: f64) {
            let back = f64::decode(&v.encode()).unwrap();
            prop_assert_eq!(back.to_bits(), v.to_bits());
        }
    }
}
