//! Reading table contents back through the result direction.

use colbridge_result::Result;
use colbridge_types::{TableSchema, Value, table_schema_from_arrow};
use colbridge_vector::{DataChunk, chunks_from_record_batch};

use crate::connection::Connection;

/// A table's stored rows, split into vector-sized chunks.
#[derive(Debug)]
pub struct TableScan {
    schema: TableSchema,
    chunks: Vec<DataChunk>,
}

impl TableScan {
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn chunks(&self) -> &[DataChunk] {
        &self.chunks
    }

    pub fn row_count(&self) -> usize {
        self.chunks.iter().map(DataChunk::len).sum()
    }

    /// Every row of every chunk, in storage order.
    pub fn rows(&self) -> Result<Vec<Vec<Value>>> {
        let mut rows = Vec::with_capacity(self.row_count());
        for chunk in &self.chunks {
            rows.extend(chunk.rows()?);
        }
        Ok(rows)
    }
}

/// Fetch the contents of `schema.table` from the engine.
pub fn scan_table<C: Connection + ?Sized>(
    conn: &C,
    schema: &str,
    table: &str,
) -> Result<TableScan> {
    let engine_schema = conn.resolve_schema(schema, table)?;
    let table_schema = table_schema_from_arrow(&engine_schema)?;
    let mut chunks = Vec::new();
    for batch in conn.scan(schema, table)? {
        chunks.extend(chunks_from_record_batch(&batch, &table_schema)?);
    }
    tracing::debug!(schema, table, chunks = chunks.len(), "scanned table");
    Ok(TableScan {
        schema: table_schema,
        chunks,
    })
}
