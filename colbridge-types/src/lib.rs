//! Type system shared by the colbridge crates.
//!
//! This crate defines the semantic column types the driver understands
//! ([`LogicalType`]), the registry that maps them to and from the engine's Arrow
//! fields, and the two value models the marshalling layer converts between:
//! application-facing [`Value`]s and engine-native [`NativeValue`]s.
#![forbid(unsafe_code)]

pub mod constants;
pub mod decimal;
pub mod interval;
pub mod logical_type;
pub mod native;
pub mod registry;
pub mod value;

pub use constants::VECTOR_SIZE;
pub use decimal::{DecimalError, DecimalValue};
pub use interval::IntervalValue;
pub use logical_type::{DecimalStorage, LogicalType, StructField};
pub use native::NativeValue;
pub use registry::{
    ColumnDescriptor, TableSchema, arrow_schema_for_table, data_type_for_logical_type,
    field_for_logical_type, is_mappable_key, logical_type_from_field, table_schema_from_arrow,
};
pub use value::Value;
