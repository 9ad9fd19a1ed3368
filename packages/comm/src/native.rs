//! Native datatype and operation identifiers.
//!
//! These are the identifiers a communicator understands. They mirror the
//! predefined datatypes and reduction operations of MPI-style transports.
//! Higher layers map their own type and operator tags onto these through an
//! explicit registry; nothing here knows about Rust types.

use std::fmt;

/// A native element datatype identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeDatatype(i32);

impl NativeDatatype {
    /// Opaque bytes, one byte per element.
    pub const BYTE: NativeDatatype = NativeDatatype(1);
    /// A Unicode scalar value stored as 4 little-endian bytes.
    pub const CHAR: NativeDatatype = NativeDatatype(2);
    /// A boolean stored as one byte (0 or 1).
    pub const BOOL: NativeDatatype = NativeDatatype(3);
    pub const INT8: NativeDatatype = NativeDatatype(10);
    pub const INT16: NativeDatatype = NativeDatatype(11);
    pub const INT32: NativeDatatype = NativeDatatype(12);
    pub const INT64: NativeDatatype = NativeDatatype(13);
    pub const UINT8: NativeDatatype = NativeDatatype(20);
    pub const UINT16: NativeDatatype = NativeDatatype(21);
    pub const UINT32: NativeDatatype = NativeDatatype(22);
    pub const UINT64: NativeDatatype = NativeDatatype(23);
    pub const FLOAT: NativeDatatype = NativeDatatype(30);
    pub const DOUBLE: NativeDatatype = NativeDatatype(31);

    /// Wrap a raw datatype identifier.
    pub const fn from_raw(raw: i32) -> Self {
        NativeDatatype(raw)
    }

    /// The raw datatype identifier.
    pub const fn as_raw(&self) -> i32 {
        self.0
    }

    /// Width of one element in bytes, if fixed.
    ///
    /// `BYTE` payloads are variable-length and return `None`.
    pub fn width(&self) -> Option<usize> {
        match *self {
            Self::BOOL | Self::INT8 | Self::UINT8 => Some(1),
            Self::INT16 | Self::UINT16 => Some(2),
            Self::CHAR | Self::INT32 | Self::UINT32 | Self::FLOAT => Some(4),
            Self::INT64 | Self::UINT64 | Self::DOUBLE => Some(8),
            _ => None,
        }
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match *self {
            Self::BYTE => "byte",
            Self::CHAR => "char",
            Self::BOOL => "bool",
            Self::INT8 => "int8",
            Self::INT16 => "int16",
            Self::INT32 => "int32",
            Self::INT64 => "int64",
            Self::UINT8 => "uint8",
            Self::UINT16 => "uint16",
            Self::UINT32 => "uint32",
            Self::UINT64 => "uint64",
            Self::FLOAT => "float",
            Self::DOUBLE => "double",
            _ => "unknown",
        }
    }
}

impl fmt::Display for NativeDatatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A native reduction operation identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeOp(i32);

impl NativeOp {
    pub const MIN: NativeOp = NativeOp(1);
    pub const MAX: NativeOp = NativeOp(2);
    pub const SUM: NativeOp = NativeOp(3);
    pub const PROD: NativeOp = NativeOp(4);
    pub const LAND: NativeOp = NativeOp(5);
    pub const LOR: NativeOp = NativeOp(6);
    pub const LXOR: NativeOp = NativeOp(7);
    pub const BAND: NativeOp = NativeOp(8);
    pub const BOR: NativeOp = NativeOp(9);
    pub const BXOR: NativeOp = NativeOp(10);

    /// Wrap a raw operation identifier.
    pub const fn from_raw(raw: i32) -> Self {
        NativeOp(raw)
    }

    /// The raw operation identifier.
    pub const fn as_raw(&self) -> i32 {
        self.0
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match *self {
            Self::MIN => "min",
            Self::MAX => "max",
            Self::SUM => "sum",
            Self::PROD => "prod",
            Self::LAND => "land",
            Self::LOR => "lor",
            Self::LXOR => "lxor",
            Self::BAND => "band",
            Self::BOR => "bor",
            Self::BXOR => "bxor",
            _ => "unknown",
        }
    }
}

impl fmt::Display for NativeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
