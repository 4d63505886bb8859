//! colbridge: row-oriented ingestion into an Arrow-native columnar engine.
//!
//! This crate is the entrypoint for the colbridge workspace. It re-exports the
//! appender, the type registry and value model, column vectors, and the error
//! types from the underlying `colbridge-*` crates.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use colbridge::types::{ColumnDescriptor, LogicalType, TableSchema, arrow_schema_for_table};
//! use colbridge::{Appender, MemConnection, Value, scan_table};
//!
//! let conn = Arc::new(MemConnection::new());
//! let table = TableSchema::new(vec![
//!     ColumnDescriptor::new("id", LogicalType::Integer, false),
//!     ColumnDescriptor::new("tags", LogicalType::list(LogicalType::Varchar), true),
//! ]);
//! conn.create_table("main", "items", arrow_schema_for_table(&table))?;
//!
//! let mut appender = Appender::open(Arc::clone(&conn), "main", "items")?;
//! appender.append_row(&[Value::Integer(7), Value::List(vec![Value::from("new")])])?;
//! appender.close()?;
//!
//! let rows = scan_table(conn.as_ref(), "main", "items")?.rows()?;
//! assert_eq!(rows[0][0], Value::Integer(7));
//! # Ok::<(), colbridge::Error>(())
//! ```
//!
//! # Architecture
//!
//! - **Types** (`colbridge-types`): logical types, application values, and the
//!   registry mapping them to Arrow fields.
//! - **Vectors** (`colbridge-vector`): value conversion, column vectors, and data
//!   chunks with Arrow export and import.
//! - **Appender** (`colbridge-appender`): the appender lifecycle, the engine
//!   connection trait, and an in-memory engine.
//! - **Errors** (`colbridge-result`): the unified error type and engine error
//!   classification.

#![forbid(unsafe_code)]

pub use colbridge_appender::{
    Appender, AppenderConfig, AppenderState, Connection, MemConnection, TableScan, scan_table,
};
pub use colbridge_result::{EngineError, EngineErrorKind, Error, Result, classify};
pub use colbridge_types::{LogicalType, VECTOR_SIZE, Value};
pub use colbridge_vector::{DataChunk, read_value};

pub mod types {
    //! Type descriptors, values, and the Arrow type registry.

    pub use colbridge_types::*;
}

pub mod vector {
    //! Column vectors, data chunks, and value conversion.

    pub use colbridge_vector::*;
}
