//! The engine boundary consumed by appenders and result readers.

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use colbridge_result::Result;
use colbridge_types::LogicalType;
use colbridge_vector::ColumnVector;

/// Narrow interface to an open engine connection.
///
/// Appenders share a connection through an `Arc`; implementations serialize
/// concurrent access internally.
pub trait Connection: Send + Sync {
    fn is_closed(&self) -> bool;

    /// Engine schema of `schema.table`. An empty `schema` names the default schema.
    fn resolve_schema(&self, schema: &str, table: &str) -> Result<SchemaRef>;

    /// Allocate an empty vector able to hold `capacity` rows of `logical_type`.
    fn allocate_vector(&self, logical_type: &LogicalType, capacity: usize) -> Result<ColumnVector> {
        Ok(ColumnVector::with_capacity(logical_type.clone(), capacity))
    }

    /// Hand one chunk to the engine. The batch is applied entirely or not at all.
    ///
    /// On failure the engine's raw error message is returned. It may be empty, in
    /// which case [`last_error_message`](Self::last_error_message) holds it.
    fn append_chunk(
        &self,
        schema: &str,
        table: &str,
        batch: RecordBatch,
    ) -> std::result::Result<(), String>;

    fn last_error_message(&self) -> String;

    /// Every row stored in `schema.table`, as engine batches.
    fn scan(&self, schema: &str, table: &str) -> Result<Vec<RecordBatch>>;
}
