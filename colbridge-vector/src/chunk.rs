//! Data chunks: a bounded batch of rows stored column by column.

use arrow::array::ArrayRef;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use colbridge_result::{Error, Result};
use colbridge_types::{LogicalType, NativeValue, TableSchema, VECTOR_SIZE, Value};

use crate::arrow_export::conform_array;
use crate::convert::from_native;
use crate::vector::ColumnVector;

/// Ordered column vectors sharing one fill level.
///
/// The chunk is consistent when every vector holds exactly `len()` rows. A row
/// becomes part of the chunk only through [`DataChunk::commit_row`], after each
/// column has been written.
#[derive(Debug)]
pub struct DataChunk {
    vectors: Vec<ColumnVector>,
    fill: usize,
    capacity: usize,
}

impl DataChunk {
    /// Allocate an empty chunk with one vector per type.
    pub fn new(types: &[LogicalType], capacity: usize) -> Result<Self> {
        check_capacity(capacity)?;
        let vectors = types
            .iter()
            .map(|ty| ColumnVector::with_capacity(ty.clone(), capacity))
            .collect();
        Ok(Self {
            vectors,
            fill: 0,
            capacity,
        })
    }

    /// Assemble a chunk from freshly allocated, empty vectors.
    pub fn from_vectors(vectors: Vec<ColumnVector>, capacity: usize) -> Result<Self> {
        check_capacity(capacity)?;
        if let Some(vector) = vectors.iter().find(|v| !v.is_empty()) {
            return Err(Error::Internal(format!(
                "chunk vectors must start empty, found {} rows of {}",
                vector.len(),
                vector.logical_type()
            )));
        }
        if let Some(vector) = vectors
            .iter()
            .find(|v| v.capacity().is_some_and(|c| c < capacity))
        {
            return Err(Error::Internal(format!(
                "{} vector is smaller than chunk capacity {capacity}",
                vector.logical_type()
            )));
        }
        Ok(Self {
            vectors,
            fill: 0,
            capacity,
        })
    }

    /// Number of committed rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.fill
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fill == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.fill >= self.capacity
    }

    #[inline]
    pub fn column_count(&self) -> usize {
        self.vectors.len()
    }

    pub fn vector(&self, column: usize) -> Option<&ColumnVector> {
        self.vectors.get(column)
    }

    pub fn is_consistent(&self) -> bool {
        self.vectors.iter().all(|v| v.len() == self.fill)
    }

    /// Write one column of the next row.
    pub fn write(&mut self, column: usize, value: &NativeValue) -> Result<()> {
        let row = self.fill;
        let vector = self
            .vectors
            .get_mut(column)
            .ok_or_else(|| Error::Internal(format!("chunk has no column {column}")))?;
        vector.write(row, value)
    }

    /// Make the row written by the preceding [`write`](Self::write) calls visible.
    pub fn commit_row(&mut self) -> Result<()> {
        let next = self.fill + 1;
        if let Some((column, vector)) = self
            .vectors
            .iter()
            .enumerate()
            .find(|(_, v)| v.len() != next)
        {
            return Err(Error::Internal(format!(
                "column {column} holds {} rows while committing row {}",
                vector.len(),
                self.fill
            )));
        }
        self.fill = next;
        Ok(())
    }

    pub fn read_native(&self, column: usize, row: usize) -> Result<NativeValue> {
        if row >= self.fill {
            return Err(Error::InvalidArgumentError(format!(
                "row {row} out of bounds for chunk of {} rows",
                self.fill
            )));
        }
        self.vectors
            .get(column)
            .ok_or_else(|| Error::InvalidArgumentError(format!("chunk has no column {column}")))?
            .read(row)
    }

    /// Read the application value at (`column`, `row`).
    pub fn read_value(&self, column: usize, row: usize) -> Result<Value> {
        let native = self.read_native(column, row)?;
        from_native(&native, self.vectors[column].logical_type())
    }

    pub fn row_values(&self, row: usize) -> Result<Vec<Value>> {
        (0..self.vectors.len())
            .map(|column| self.read_value(column, row))
            .collect()
    }

    /// Every committed row, in order.
    pub fn rows(&self) -> Result<Vec<Vec<Value>>> {
        (0..self.fill).map(|row| self.row_values(row)).collect()
    }

    /// Export the committed rows as a `RecordBatch` against `schema`.
    ///
    /// Each column takes the data type of the matching schema field, which may
    /// name nested children differently from the registry.
    pub fn to_record_batch(&self, schema: SchemaRef) -> Result<RecordBatch> {
        if !self.is_consistent() {
            return Err(Error::Internal(
                "cannot export a chunk with a partially written row".into(),
            ));
        }
        if schema.fields().len() != self.vectors.len() {
            return Err(Error::ColumnCount {
                actual: self.vectors.len(),
                expected: schema.fields().len(),
            });
        }
        let columns = self
            .vectors
            .iter()
            .zip(schema.fields())
            .map(|(vector, field)| conform_array(vector.to_arrow()?, field.data_type()))
            .collect::<Result<Vec<ArrayRef>>>()?;
        let options = RecordBatchOptions::new().with_row_count(Some(self.fill));
        Ok(RecordBatch::try_new_with_options(schema, columns, &options)?)
    }

    /// Import an engine batch of at most [`VECTOR_SIZE`] rows.
    pub fn from_record_batch(batch: &RecordBatch, schema: &TableSchema) -> Result<Self> {
        if batch.num_columns() != schema.len() {
            return Err(Error::ColumnCount {
                actual: batch.num_columns(),
                expected: schema.len(),
            });
        }
        let rows = batch.num_rows();
        if rows > VECTOR_SIZE {
            return Err(Error::VectorCapacity {
                row: rows - 1,
                capacity: VECTOR_SIZE,
            });
        }
        let vectors = batch
            .columns()
            .iter()
            .zip(schema.columns())
            .map(|(array, column)| ColumnVector::from_arrow(array.as_ref(), &column.logical_type))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            vectors,
            fill: rows,
            capacity: rows.max(1),
        })
    }
}

/// Split an engine batch of any size into chunks of at most [`VECTOR_SIZE`] rows.
pub fn chunks_from_record_batch(
    batch: &RecordBatch,
    schema: &TableSchema,
) -> Result<Vec<DataChunk>> {
    let mut chunks = Vec::with_capacity(batch.num_rows().div_ceil(VECTOR_SIZE));
    let mut offset = 0;
    while offset < batch.num_rows() {
        let length = VECTOR_SIZE.min(batch.num_rows() - offset);
        chunks.push(DataChunk::from_record_batch(&batch.slice(offset, length), schema)?);
        offset += length;
    }
    Ok(chunks)
}

/// Read the application value at (`column`, `row`) of `chunk`.
pub fn read_value(chunk: &DataChunk, column: usize, row: usize) -> Result<Value> {
    chunk.read_value(column, row)
}

fn check_capacity(capacity: usize) -> Result<()> {
    if capacity == 0 || capacity > VECTOR_SIZE {
        return Err(Error::InvalidArgumentError(format!(
            "chunk capacity must be between 1 and {VECTOR_SIZE}, got {capacity}"
        )));
    }
    Ok(())
}
