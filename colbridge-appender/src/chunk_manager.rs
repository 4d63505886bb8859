//! Bounded row buffer between an appender and the engine.

use std::sync::Arc;

use arrow::datatypes::{Schema, SchemaRef};
use colbridge_result::{Error, Result, classify};
use colbridge_types::{
    LogicalType, TableSchema, Value, table_schema_from_arrow,
};
use colbridge_vector::{DataChunk, to_native};

use crate::config::AppenderConfig;
use crate::connection::Connection;

/// Owns the chunk being filled for one target table and moves it to the
/// engine whenever it fills up or a flush is requested.
#[derive(Debug)]
pub(crate) struct ChunkManager {
    schema_name: String,
    table_name: String,
    table: TableSchema,
    types: Vec<LogicalType>,
    /// Schema the exported batches are built against.
    export_schema: SchemaRef,
    capacity: usize,
    chunk: Option<DataChunk>,
    rows_appended: u64,
    rows_flushed: u64,
    flush_count: u64,
}

impl ChunkManager {
    pub(crate) fn new<C: Connection + ?Sized>(
        conn: &C,
        schema_name: &str,
        table_name: &str,
        config: &AppenderConfig,
    ) -> Result<Self> {
        config.validate()?;
        let engine_schema = conn.resolve_schema(schema_name, table_name)?;
        let table = table_schema_from_arrow(&engine_schema)?;
        if table.is_empty() {
            return Err(Error::InvalidArgumentError(format!(
                "table {table_name} has no columns"
            )));
        }
        let types = table
            .columns()
            .iter()
            .map(|column| column.logical_type.clone())
            .collect();

        let mut manager = Self {
            schema_name: schema_name.to_string(),
            table_name: table_name.to_string(),
            export_schema: export_schema(&engine_schema),
            table,
            types,
            capacity: config.chunk_capacity,
            chunk: None,
            rows_appended: 0,
            rows_flushed: 0,
            flush_count: 0,
        };
        manager.chunk = Some(manager.allocate_chunk(conn)?);
        Ok(manager)
    }

    pub(crate) fn table(&self) -> &TableSchema {
        &self.table
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn rows_in_chunk(&self) -> usize {
        self.chunk.as_ref().map_or(0, DataChunk::len)
    }

    pub(crate) fn rows_appended(&self) -> u64 {
        self.rows_appended
    }

    pub(crate) fn rows_flushed(&self) -> u64 {
        self.rows_flushed
    }

    pub(crate) fn flush_count(&self) -> u64 {
        self.flush_count
    }

    /// Convert and write one row, flushing when the chunk reaches capacity.
    ///
    /// A failure part way through the row leaves the earlier columns written.
    pub(crate) fn append_row<C: Connection + ?Sized>(
        &mut self,
        conn: &C,
        values: &[Value],
    ) -> Result<()> {
        if values.len() != self.table.len() {
            return Err(Error::ColumnCount {
                actual: values.len(),
                expected: self.table.len(),
            });
        }
        let chunk = self
            .chunk
            .as_mut()
            .ok_or_else(|| Error::Internal("appender chunk already released".into()))?;
        for (index, (value, column)) in values.iter().zip(self.table.columns()).enumerate() {
            let native =
                to_native(value, &column.logical_type).map_err(|e| Error::column(index, e))?;
            chunk
                .write(index, &native)
                .map_err(|e| Error::column(index, e))?;
        }
        chunk.commit_row()?;
        self.rows_appended += 1;
        tracing::trace!(table = %self.table_name, row = chunk.len() - 1, "row appended");

        if chunk.is_full() {
            self.flush(conn)?;
        }
        Ok(())
    }

    /// Hand the buffered rows to the engine as one batch.
    ///
    /// The chunk is kept when the engine rejects it.
    pub(crate) fn flush<C: Connection + ?Sized>(&mut self, conn: &C) -> Result<()> {
        let chunk = self
            .chunk
            .as_ref()
            .ok_or_else(|| Error::Internal("appender chunk already released".into()))?;
        if chunk.is_empty() {
            return Ok(());
        }
        let rows = chunk.len();
        let batch = chunk.to_record_batch(Arc::clone(&self.export_schema))?;

        if let Err(message) = conn.append_chunk(&self.schema_name, &self.table_name, batch) {
            let message = if message.is_empty() {
                conn.last_error_message()
            } else {
                message
            };
            return Err(Error::Engine(classify(message)));
        }

        self.rows_flushed += rows as u64;
        self.flush_count += 1;
        tracing::debug!(
            schema = %self.schema_name,
            table = %self.table_name,
            rows,
            flushes = self.flush_count,
            "flushed chunk"
        );

        self.chunk = None;
        self.chunk = Some(self.allocate_chunk(conn)?);
        Ok(())
    }

    /// Drop the buffered chunk without contacting the engine.
    pub(crate) fn release(&mut self) -> usize {
        self.chunk.take().map_or(0, |chunk| chunk.len())
    }

    fn allocate_chunk<C: Connection + ?Sized>(&self, conn: &C) -> Result<DataChunk> {
        let vectors = self
            .types
            .iter()
            .map(|ty| conn.allocate_vector(ty, self.capacity))
            .collect::<Result<Vec<_>>>()?;
        DataChunk::from_vectors(vectors, self.capacity)
    }
}

/// The engine's schema with every top-level column nullable.
///
/// NOT NULL is enforced by the engine on append, so exported batches must be
/// able to carry the offending NULLs that far.
fn export_schema(schema: &Schema) -> SchemaRef {
    let fields: Vec<_> = schema
        .fields()
        .iter()
        .map(|field| field.as_ref().clone().with_nullable(true))
        .collect();
    Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone()))
}
