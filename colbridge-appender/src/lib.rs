//! Bulk ingestion of rows into engine tables.
//!
//! An [`Appender`] converts application [`Value`](colbridge_types::Value) rows into
//! engine-native column vectors, buffers them in a chunk of at most
//! [`VECTOR_SIZE`](colbridge_types::VECTOR_SIZE) rows and hands each full chunk to
//! the engine through the [`Connection`] trait. [`MemConnection`] is an in-memory
//! engine implementing that trait; [`scan_table`] reads stored rows back.

#![forbid(unsafe_code)]

pub mod appender;
mod chunk_manager;
pub mod config;
pub mod connection;
pub mod mem_connection;
pub mod results;

pub use appender::{Appender, AppenderState};
pub use config::AppenderConfig;
pub use connection::Connection;
pub use mem_connection::{
    DEFAULT_SCHEMA, EngineCallStats, EngineCallStatsSnapshot, MemConnection,
};
pub use results::{TableScan, scan_table};
