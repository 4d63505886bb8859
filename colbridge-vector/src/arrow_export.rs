//! Export of column vectors as Arrow arrays.
//!
//! [`ColumnVector::to_arrow`] produces exactly the data type the registry assigns
//! to the vector's logical type. Engines may spell the same type differently
//! (child field names, nested nullability, the zone of a zoned timestamp), so
//! [`conform_array`] re-expresses an exported array under the engine's own type.

use std::sync::Arc;

use arrow::array::{
    ArrayData, ArrayRef, AsArray, BinaryArray, BooleanArray, Date32Array, Decimal128Array, DictionaryArray,
    FixedSizeBinaryArray, FixedSizeListArray, Float32Array, Float64Array, Int8Array, Int16Array,
    Int32Array, Int64Array, IntervalMonthDayNanoArray, ListArray, MapArray, StringArray,
    StructArray, Time64MicrosecondArray, TimestampMicrosecondArray, UInt8Array, UInt16Array,
    UInt32Array, UInt64Array, make_array,
};
use arrow::buffer::{BooleanBuffer, Buffer, NullBuffer, OffsetBuffer, ScalarBuffer};
use arrow::compute::cast;
use arrow::datatypes::{DataType, IntervalMonthDayNano, UInt32Type};
use colbridge_result::{Error, Result};
use colbridge_types::constants::{NANOS_PER_MICRO, UTC_TIMEZONE};
use colbridge_types::registry::{list_item_field, map_entries_field, struct_fields};
use colbridge_types::{IntervalValue, LogicalType};

use crate::vector::{ColumnVector, ListEntry, VectorData};

const WIDE_VALUE_BYTES: i32 = 16;

impl ColumnVector {
    /// Export the vector's rows as an Arrow array, preserving NULLs.
    pub fn to_arrow(&self) -> Result<ArrayRef> {
        let nulls = self.null_buffer();
        let array: ArrayRef = match (&self.logical_type, &self.data) {
            (LogicalType::Boolean, VectorData::Bool(values)) => Arc::new(BooleanArray::new(
                BooleanBuffer::from(values.as_slice()),
                nulls,
            )),
            (LogicalType::TinyInt, VectorData::Int8(values)) => {
                Arc::new(Int8Array::try_new(ScalarBuffer::from(values.clone()), nulls)?)
            }
            (LogicalType::SmallInt, VectorData::Int16(values)) => {
                Arc::new(Int16Array::try_new(ScalarBuffer::from(values.clone()), nulls)?)
            }
            (LogicalType::Integer, VectorData::Int32(values)) => {
                Arc::new(Int32Array::try_new(ScalarBuffer::from(values.clone()), nulls)?)
            }
            (LogicalType::BigInt, VectorData::Int64(values)) => {
                Arc::new(Int64Array::try_new(ScalarBuffer::from(values.clone()), nulls)?)
            }
            (LogicalType::UTinyInt, VectorData::UInt8(values)) => {
                Arc::new(UInt8Array::try_new(ScalarBuffer::from(values.clone()), nulls)?)
            }
            (LogicalType::USmallInt, VectorData::UInt16(values)) => {
                Arc::new(UInt16Array::try_new(ScalarBuffer::from(values.clone()), nulls)?)
            }
            (LogicalType::UInteger, VectorData::UInt32(values)) => {
                Arc::new(UInt32Array::try_new(ScalarBuffer::from(values.clone()), nulls)?)
            }
            (LogicalType::UBigInt, VectorData::UInt64(values)) => {
                Arc::new(UInt64Array::try_new(ScalarBuffer::from(values.clone()), nulls)?)
            }
            (LogicalType::Float, VectorData::Float32(values)) => {
                Arc::new(Float32Array::try_new(ScalarBuffer::from(values.clone()), nulls)?)
            }
            (LogicalType::Double, VectorData::Float64(values)) => {
                Arc::new(Float64Array::try_new(ScalarBuffer::from(values.clone()), nulls)?)
            }
            (LogicalType::HugeInt, VectorData::Int128(values)) => Arc::new(fixed_binary(
                values.iter().map(|v| v.to_le_bytes()),
                nulls,
            )?),
            (LogicalType::UHugeInt, VectorData::UInt128(values)) => Arc::new(fixed_binary(
                values.iter().map(|v| v.to_le_bytes()),
                nulls,
            )?),
            (LogicalType::Uuid, VectorData::UInt128(values)) => Arc::new(fixed_binary(
                values.iter().map(|v| v.to_be_bytes()),
                nulls,
            )?),
            (LogicalType::Decimal { width, scale }, data) => {
                let values: Vec<i128> = match data {
                    VectorData::Int32(values) => values.iter().map(|v| i128::from(*v)).collect(),
                    VectorData::Int64(values) => values.iter().map(|v| i128::from(*v)).collect(),
                    VectorData::Int128(values) => values.clone(),
                    _ => return Err(layout_mismatch(self)),
                };
                let scale = i8::try_from(*scale)
                    .map_err(|_| Error::Internal(format!("decimal scale {scale} out of range")))?;
                Arc::new(
                    Decimal128Array::try_new(ScalarBuffer::from(values), nulls)?
                        .with_precision_and_scale(*width, scale)?,
                )
            }
            (LogicalType::Varchar, VectorData::Bytes { entries, heap }) => Arc::new(
                StringArray::try_new(offsets(entries)?, Buffer::from_vec(heap.clone()), nulls)?,
            ),
            (LogicalType::Blob, VectorData::Bytes { entries, heap }) => Arc::new(
                BinaryArray::try_new(offsets(entries)?, Buffer::from_vec(heap.clone()), nulls)?,
            ),
            (LogicalType::Date, VectorData::Int32(values)) => {
                Arc::new(Date32Array::try_new(ScalarBuffer::from(values.clone()), nulls)?)
            }
            (LogicalType::Time, VectorData::Int64(values)) => Arc::new(
                Time64MicrosecondArray::try_new(ScalarBuffer::from(values.clone()), nulls)?,
            ),
            (LogicalType::Timestamp, VectorData::Int64(values)) => Arc::new(
                TimestampMicrosecondArray::try_new(ScalarBuffer::from(values.clone()), nulls)?,
            ),
            (LogicalType::TimestampTz, VectorData::Int64(values)) => Arc::new(
                TimestampMicrosecondArray::try_new(ScalarBuffer::from(values.clone()), nulls)?
                    .with_timezone(UTC_TIMEZONE),
            ),
            (LogicalType::Interval, VectorData::Interval(values)) => {
                let values: Vec<IntervalMonthDayNano> =
                    values.iter().copied().map(month_day_nano).collect();
                Arc::new(IntervalMonthDayNanoArray::try_new(
                    ScalarBuffer::from(values),
                    nulls,
                )?)
            }
            (LogicalType::Enum(entries), VectorData::UInt32(keys)) => {
                let keys = UInt32Array::try_new(ScalarBuffer::from(keys.clone()), nulls)?;
                let dictionary: ArrayRef = Arc::new(StringArray::from_iter_values(entries));
                Arc::new(DictionaryArray::<UInt32Type>::try_new(keys, dictionary)?)
            }
            (LogicalType::List(child_type), VectorData::List { entries, child }) => {
                Arc::new(ListArray::try_new(
                    list_item_field(child_type),
                    offsets(entries)?,
                    child.to_arrow()?,
                    nulls,
                )?)
            }
            (LogicalType::Map { key, value }, VectorData::List { entries, child }) => {
                let child = child.to_arrow()?;
                let entries_array = child.as_struct_opt().cloned().ok_or_else(|| {
                    Error::Internal("MAP entries did not export as a struct array".into())
                })?;
                Arc::new(MapArray::try_new(
                    map_entries_field(key, value),
                    offsets(entries)?,
                    entries_array,
                    nulls,
                    false,
                )?)
            }
            (LogicalType::Struct(fields), VectorData::Struct(children)) => {
                let columns = children
                    .iter()
                    .map(ColumnVector::to_arrow)
                    .collect::<Result<Vec<_>>>()?;
                Arc::new(StructArray::try_new(struct_fields(fields), columns, nulls)?)
            }
            (LogicalType::Array { child: child_type, length }, VectorData::Array { child, .. }) => {
                let size = i32::try_from(*length).map_err(|_| {
                    Error::Internal(format!("ARRAY length {length} exceeds Arrow limits"))
                })?;
                Arc::new(FixedSizeListArray::try_new(
                    list_item_field(child_type),
                    size,
                    child.to_arrow()?,
                    nulls,
                )?)
            }
            _ => return Err(layout_mismatch(self)),
        };
        Ok(array)
    }

    fn null_buffer(&self) -> Option<NullBuffer> {
        let nulls = NullBuffer::new(self.validity.finish_cloned());
        (nulls.null_count() > 0).then_some(nulls)
    }
}

/// Re-express an exported array under the engine's `target` data type.
///
/// Differences in child field names, field metadata, nested nullability and
/// timestamp zone are applied to the existing buffers. Any other difference
/// (for example a `LargeUtf8` engine column) goes through Arrow's cast kernel.
pub fn conform_array(array: ArrayRef, target: &DataType) -> Result<ArrayRef> {
    if array.data_type() == target {
        return Ok(array);
    }
    match retag(array.to_data(), target) {
        Ok(data) => Ok(make_array(data)),
        Err(_) => Ok(cast(array.as_ref(), target)?),
    }
}

fn retag(data: ArrayData, target: &DataType) -> Result<ArrayData> {
    if data.data_type() == target {
        return Ok(data);
    }
    let same_layout = match (data.data_type(), target) {
        (DataType::Timestamp(unit, _), DataType::Timestamp(target_unit, _)) => unit == target_unit,
        (DataType::FixedSizeList(_, size), DataType::FixedSizeList(_, target_size)) => {
            size == target_size
        }
        (DataType::Dictionary(key, _), DataType::Dictionary(target_key, _)) => key == target_key,
        (DataType::List(_), DataType::List(_))
        | (DataType::Map(..), DataType::Map(..))
        | (DataType::Struct(_), DataType::Struct(_)) => true,
        _ => false,
    };
    if !same_layout {
        return Err(Error::Internal(format!(
            "{} and {target} do not share a layout",
            data.data_type()
        )));
    }

    let child_types: Vec<&DataType> = match target {
        DataType::List(field) | DataType::FixedSizeList(field, _) | DataType::Map(field, _) => {
            vec![field.data_type()]
        }
        DataType::Struct(fields) => fields.iter().map(|field| field.data_type()).collect(),
        DataType::Dictionary(_, values) => vec![values.as_ref()],
        _ => Vec::new(),
    };
    if child_types.len() != data.child_data().len() {
        return Err(Error::Internal(format!(
            "{} has {} children, {target} expects {}",
            data.data_type(),
            data.child_data().len(),
            child_types.len()
        )));
    }
    let children = data
        .child_data()
        .iter()
        .zip(child_types)
        .map(|(child, child_type)| retag(child.clone(), child_type))
        .collect::<Result<Vec<_>>>()?;
    Ok(data
        .into_builder()
        .data_type(target.clone())
        .child_data(children)
        .build()?)
}

fn offsets(entries: &[ListEntry]) -> Result<OffsetBuffer<i32>> {
    let total: usize = entries.iter().map(|entry| entry.length).sum();
    if i32::try_from(total).is_err() {
        return Err(Error::Internal(format!(
            "variable-length data of {total} elements exceeds 32-bit offsets"
        )));
    }
    Ok(OffsetBuffer::from_lengths(entries.iter().map(|entry| entry.length)))
}

fn fixed_binary(
    values: impl Iterator<Item = [u8; 16]>,
    nulls: Option<NullBuffer>,
) -> Result<FixedSizeBinaryArray> {
    let bytes: Vec<u8> = values.flatten().collect();
    Ok(FixedSizeBinaryArray::try_new(
        WIDE_VALUE_BYTES,
        Buffer::from_vec(bytes),
        nulls,
    )?)
}

fn month_day_nano(interval: IntervalValue) -> IntervalMonthDayNano {
    IntervalMonthDayNano::new(
        interval.months,
        interval.days,
        interval.micros.saturating_mul(NANOS_PER_MICRO),
    )
}

fn layout_mismatch(vector: &ColumnVector) -> Error {
    Error::Internal(format!(
        "vector storage does not match logical type {}",
        vector.logical_type
    ))
}
