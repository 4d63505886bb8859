//! Column vectors: the writer side of the marshalling layer.
//!
//! A [`ColumnVector`] buffers the native values of one column for one chunk
//! together with a validity mask of the same length. Values are written strictly
//! in row order; nested types keep their elements in unbounded child vectors.

use arrow::array::BooleanBufferBuilder;
use colbridge_result::{Error, Result};
use colbridge_types::constants::{MAP_KEY_FIELD, MAP_VALUE_FIELD};
use colbridge_types::{DecimalStorage, IntervalValue, LogicalType, NativeValue, StructField};

/// Position of one variable-length entry inside a heap or child vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListEntry {
    pub offset: usize,
    pub length: usize,
}

/// Physical storage of a vector. Chosen once from the logical type.
#[derive(Debug)]
pub(crate) enum VectorData {
    Bool(Vec<bool>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Int128(Vec<i128>),
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    UInt128(Vec<u128>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Interval(Vec<IntervalValue>),
    /// VARCHAR and BLOB: entries index into a shared byte heap.
    Bytes {
        entries: Vec<ListEntry>,
        heap: Vec<u8>,
    },
    /// LIST, and MAP with a `{key, value}` struct child.
    List {
        entries: Vec<ListEntry>,
        child: Box<ColumnVector>,
    },
    Struct(Vec<ColumnVector>),
    /// Row `i` owns child elements `i * length .. (i + 1) * length`.
    Array {
        length: usize,
        child: Box<ColumnVector>,
    },
}

/// Native values of one column.
#[derive(Debug)]
pub struct ColumnVector {
    pub(crate) logical_type: LogicalType,
    /// `None` for child vectors, which grow with their parent's elements.
    capacity: Option<usize>,
    pub(crate) validity: BooleanBufferBuilder,
    pub(crate) data: VectorData,
}

impl ColumnVector {
    /// Allocate a top-level vector that accepts rows `0..capacity`.
    pub fn with_capacity(logical_type: LogicalType, capacity: usize) -> Self {
        Self::build(logical_type, Some(capacity))
    }

    fn child(logical_type: LogicalType) -> Self {
        Self::build(logical_type, None)
    }

    fn build(logical_type: LogicalType, capacity: Option<usize>) -> Self {
        let data = match &logical_type {
            LogicalType::Boolean => VectorData::Bool(Vec::new()),
            LogicalType::TinyInt => VectorData::Int8(Vec::new()),
            LogicalType::SmallInt => VectorData::Int16(Vec::new()),
            LogicalType::Integer | LogicalType::Date => VectorData::Int32(Vec::new()),
            LogicalType::BigInt
            | LogicalType::Time
            | LogicalType::Timestamp
            | LogicalType::TimestampTz => VectorData::Int64(Vec::new()),
            LogicalType::HugeInt => VectorData::Int128(Vec::new()),
            LogicalType::UTinyInt => VectorData::UInt8(Vec::new()),
            LogicalType::USmallInt => VectorData::UInt16(Vec::new()),
            LogicalType::UInteger | LogicalType::Enum(_) => VectorData::UInt32(Vec::new()),
            LogicalType::UBigInt => VectorData::UInt64(Vec::new()),
            LogicalType::UHugeInt | LogicalType::Uuid => VectorData::UInt128(Vec::new()),
            LogicalType::Float => VectorData::Float32(Vec::new()),
            LogicalType::Double => VectorData::Float64(Vec::new()),
            LogicalType::Decimal { width, .. } => match DecimalStorage::for_width(*width) {
                DecimalStorage::Int32 => VectorData::Int32(Vec::new()),
                DecimalStorage::Int64 => VectorData::Int64(Vec::new()),
                DecimalStorage::Int128 => VectorData::Int128(Vec::new()),
            },
            LogicalType::Varchar | LogicalType::Blob => VectorData::Bytes {
                entries: Vec::new(),
                heap: Vec::new(),
            },
            LogicalType::Interval => VectorData::Interval(Vec::new()),
            LogicalType::List(child) => VectorData::List {
                entries: Vec::new(),
                child: Box::new(Self::child(child.as_ref().clone())),
            },
            LogicalType::Map { key, value } => VectorData::List {
                entries: Vec::new(),
                child: Box::new(Self::child(map_entry_type(key, value))),
            },
            LogicalType::Struct(fields) => VectorData::Struct(
                fields
                    .iter()
                    .map(|field| Self::child(field.logical_type.clone()))
                    .collect(),
            ),
            LogicalType::Array { child, length } => VectorData::Array {
                length: *length,
                child: Box::new(Self::child(child.as_ref().clone())),
            },
        };
        let reserve = capacity.unwrap_or(0);
        Self {
            logical_type,
            capacity,
            validity: BooleanBufferBuilder::new(reserve),
            data,
        }
    }

    #[inline]
    pub fn logical_type(&self) -> &LogicalType {
        &self.logical_type
    }

    #[inline]
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Number of rows written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.validity.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_valid(&self, row: usize) -> bool {
        row < self.len() && self.validity.get_bit(row)
    }

    pub fn null_count(&self) -> usize {
        (0..self.len()).filter(|row| !self.validity.get_bit(*row)).count()
    }

    /// Write `value` at `row`.
    ///
    /// Rows must be written in order: `row` has to equal the current length and
    /// lie below the vector's capacity.
    pub fn write(&mut self, row: usize, value: &NativeValue) -> Result<()> {
        if let Some(capacity) = self.capacity
            && row >= capacity
        {
            return Err(Error::VectorCapacity { row, capacity });
        }
        if row != self.len() {
            return Err(Error::Internal(format!(
                "non-sequential vector write: row {row}, expected {}",
                self.len()
            )));
        }
        tracing::trace!(row, logical_type = %self.logical_type, "write vector slot");
        self.push(value)
    }

    fn push(&mut self, value: &NativeValue) -> Result<()> {
        if value.is_null() {
            return self.push_null();
        }
        match (&mut self.data, value) {
            (VectorData::Bool(values), NativeValue::Bool(v)) => values.push(*v),
            (VectorData::Int8(values), NativeValue::Int8(v)) => values.push(*v),
            (VectorData::Int16(values), NativeValue::Int16(v)) => values.push(*v),
            (VectorData::Int32(values), NativeValue::Int32(v)) => values.push(*v),
            (VectorData::Int64(values), NativeValue::Int64(v)) => values.push(*v),
            (VectorData::Int128(values), NativeValue::Int128(v)) => values.push(*v),
            (VectorData::UInt8(values), NativeValue::UInt8(v)) => values.push(*v),
            (VectorData::UInt16(values), NativeValue::UInt16(v)) => values.push(*v),
            (VectorData::UInt32(values), NativeValue::UInt32(v)) => values.push(*v),
            (VectorData::UInt64(values), NativeValue::UInt64(v)) => values.push(*v),
            (VectorData::UInt128(values), NativeValue::UInt128(v)) => values.push(*v),
            (VectorData::Float32(values), NativeValue::Float32(v)) => values.push(*v),
            (VectorData::Float64(values), NativeValue::Float64(v)) => values.push(*v),
            (VectorData::Interval(values), NativeValue::Interval(v)) => values.push(*v),
            (VectorData::Bytes { entries, heap }, NativeValue::Bytes(bytes)) => {
                entries.push(ListEntry {
                    offset: heap.len(),
                    length: bytes.len(),
                });
                heap.extend_from_slice(bytes);
            }
            (VectorData::List { entries, child }, NativeValue::List(items)) => {
                let offset = child.len();
                for item in items {
                    child.push(item)?;
                }
                entries.push(ListEntry {
                    offset,
                    length: items.len(),
                });
            }
            (VectorData::List { entries, child }, NativeValue::Map(pairs)) => {
                let offset = child.len();
                for (key, value) in pairs {
                    child.push_pair(key, value)?;
                }
                entries.push(ListEntry {
                    offset,
                    length: pairs.len(),
                });
            }
            (VectorData::Struct(children), NativeValue::Struct(fields))
                if children.len() == fields.len() =>
            {
                for (child, field) in children.iter_mut().zip(fields) {
                    child.push(field)?;
                }
            }
            (VectorData::Array { length, child }, NativeValue::List(items))
                if items.len() == *length =>
            {
                for item in items {
                    child.push(item)?;
                }
            }
            (_, value) => {
                return Err(Error::Internal(format!(
                    "native {} value does not match {} vector",
                    value.physical_name(),
                    self.logical_type
                )));
            }
        }
        self.validity.append(true);
        Ok(())
    }

    fn push_null(&mut self) -> Result<()> {
        match &mut self.data {
            VectorData::Bool(values) => values.push(false),
            VectorData::Int8(values) => values.push(0),
            VectorData::Int16(values) => values.push(0),
            VectorData::Int32(values) => values.push(0),
            VectorData::Int64(values) => values.push(0),
            VectorData::Int128(values) => values.push(0),
            VectorData::UInt8(values) => values.push(0),
            VectorData::UInt16(values) => values.push(0),
            VectorData::UInt32(values) => values.push(0),
            VectorData::UInt64(values) => values.push(0),
            VectorData::UInt128(values) => values.push(0),
            VectorData::Float32(values) => values.push(0.0),
            VectorData::Float64(values) => values.push(0.0),
            VectorData::Interval(values) => values.push(IntervalValue::zero()),
            VectorData::Bytes { entries, heap } => entries.push(ListEntry {
                offset: heap.len(),
                length: 0,
            }),
            VectorData::List { entries, child } => entries.push(ListEntry {
                offset: child.len(),
                length: 0,
            }),
            VectorData::Struct(children) => {
                for child in children.iter_mut() {
                    child.push_null()?;
                }
            }
            VectorData::Array { length, child } => {
                for _ in 0..*length {
                    child.push_null()?;
                }
            }
        }
        self.validity.append(false);
        Ok(())
    }

    /// Append one MAP entry to a `{key, value}` struct vector.
    fn push_pair(&mut self, key: &NativeValue, value: &NativeValue) -> Result<()> {
        let VectorData::Struct(children) = &mut self.data else {
            return Err(Error::Internal(format!(
                "MAP entries require a struct vector, found {}",
                self.logical_type
            )));
        };
        let [key_vector, value_vector] = children.as_mut_slice() else {
            return Err(Error::Internal("MAP entries must have two children".into()));
        };
        key_vector.push(key)?;
        value_vector.push(value)?;
        self.validity.append(true);
        Ok(())
    }

    /// Read the native value stored at `row`.
    pub fn read(&self, row: usize) -> Result<NativeValue> {
        if row >= self.len() {
            return Err(Error::Internal(format!(
                "vector read out of bounds: row {row}, length {}",
                self.len()
            )));
        }
        if !self.validity.get_bit(row) {
            return Ok(NativeValue::Null);
        }
        let value = match &self.data {
            VectorData::Bool(values) => NativeValue::Bool(values[row]),
            VectorData::Int8(values) => NativeValue::Int8(values[row]),
            VectorData::Int16(values) => NativeValue::Int16(values[row]),
            VectorData::Int32(values) => NativeValue::Int32(values[row]),
            VectorData::Int64(values) => NativeValue::Int64(values[row]),
            VectorData::Int128(values) => NativeValue::Int128(values[row]),
            VectorData::UInt8(values) => NativeValue::UInt8(values[row]),
            VectorData::UInt16(values) => NativeValue::UInt16(values[row]),
            VectorData::UInt32(values) => NativeValue::UInt32(values[row]),
            VectorData::UInt64(values) => NativeValue::UInt64(values[row]),
            VectorData::UInt128(values) => NativeValue::UInt128(values[row]),
            VectorData::Float32(values) => NativeValue::Float32(values[row]),
            VectorData::Float64(values) => NativeValue::Float64(values[row]),
            VectorData::Interval(values) => NativeValue::Interval(values[row]),
            VectorData::Bytes { entries, heap } => {
                let entry = entries[row];
                NativeValue::Bytes(heap[entry.offset..entry.offset + entry.length].to_vec())
            }
            VectorData::List { entries, child } => {
                let entry = entries[row];
                let range = entry.offset..entry.offset + entry.length;
                if matches!(self.logical_type, LogicalType::Map { .. }) {
                    NativeValue::Map(range.map(|idx| child.read_pair(idx)).collect::<Result<_>>()?)
                } else {
                    NativeValue::List(range.map(|idx| child.read(idx)).collect::<Result<_>>()?)
                }
            }
            VectorData::Struct(children) => NativeValue::Struct(
                children
                    .iter()
                    .map(|child| child.read(row))
                    .collect::<Result<_>>()?,
            ),
            VectorData::Array { length, child } => NativeValue::List(
                (row * length..(row + 1) * length)
                    .map(|idx| child.read(idx))
                    .collect::<Result<_>>()?,
            ),
        };
        Ok(value)
    }

    fn read_pair(&self, row: usize) -> Result<(NativeValue, NativeValue)> {
        match &self.data {
            VectorData::Struct(children) if children.len() == 2 => {
                Ok((children[0].read(row)?, children[1].read(row)?))
            }
            _ => Err(Error::Internal(format!(
                "MAP entries require a two-field struct vector, found {}",
                self.logical_type
            ))),
        }
    }
}

/// Struct type of the entries child of a MAP vector.
pub(crate) fn map_entry_type(key: &LogicalType, value: &LogicalType) -> LogicalType {
    LogicalType::Struct(vec![
        StructField::not_null(MAP_KEY_FIELD, key.clone()),
        StructField::new(MAP_VALUE_FIELD, value.clone()),
    ])
}
