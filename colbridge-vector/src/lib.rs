//! Marshalling between application rows and engine-native column vectors.
//!
//! The write path converts each [`Value`](colbridge_types::Value) with
//! [`to_native`] and stores the result in the chunk's [`ColumnVector`] at the
//! next row index. The read path imports engine batches into [`DataChunk`]s and
//! turns native scalars back into values with [`from_native`].
#![forbid(unsafe_code)]

pub mod arrow_export;
pub mod arrow_import;
pub mod chunk;
pub mod convert;
pub mod vector;

pub use arrow_export::conform_array;
pub use arrow_import::native_from_arrow;
pub use chunk::{DataChunk, chunks_from_record_batch, read_value};
pub use convert::{from_native, to_native};
pub use vector::{ColumnVector, ListEntry};
