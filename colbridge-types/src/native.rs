//! Engine-native scalars.
//!
//! A [`NativeValue`] is the physical form one value takes inside a column
//! vector. DECIMALs become scaled integers, temporal values become day or
//! microsecond counts, UUIDs become 128-bit integers, and ENUMs become
//! dictionary indexes. Nested values keep their shape so the writer can recurse
//! into child vectors.

use crate::interval::IntervalValue;

#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Null,
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Int128(i128),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    UInt128(u128),
    Float32(f32),
    Float64(f64),
    Interval(IntervalValue),
    /// VARCHAR and BLOB payloads.
    Bytes(Vec<u8>),
    /// LIST and ARRAY elements.
    List(Vec<NativeValue>),
    /// STRUCT children in field order.
    Struct(Vec<NativeValue>),
    Map(Vec<(NativeValue, NativeValue)>),
}

impl NativeValue {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, NativeValue::Null)
    }

    /// Name of the physical layout, used in internal error messages.
    pub fn physical_name(&self) -> &'static str {
        match self {
            NativeValue::Null => "null",
            NativeValue::Bool(_) => "bool",
            NativeValue::Int8(_) => "i8",
            NativeValue::Int16(_) => "i16",
            NativeValue::Int32(_) => "i32",
            NativeValue::Int64(_) => "i64",
            NativeValue::Int128(_) => "i128",
            NativeValue::UInt8(_) => "u8",
            NativeValue::UInt16(_) => "u16",
            NativeValue::UInt32(_) => "u32",
            NativeValue::UInt64(_) => "u64",
            NativeValue::UInt128(_) => "u128",
            NativeValue::Float32(_) => "f32",
            NativeValue::Float64(_) => "f64",
            NativeValue::Interval(_) => "interval",
            NativeValue::Bytes(_) => "bytes",
            NativeValue::List(_) => "list",
            NativeValue::Struct(_) => "struct",
            NativeValue::Map(_) => "map",
        }
    }
}
