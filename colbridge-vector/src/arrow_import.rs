//! Import of Arrow arrays delivered by the engine into column vectors.

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    Date32Type, Decimal128Type, Float32Type, Float64Type, Int8Type, Int16Type, Int32Type,
    Int64Type, IntervalMonthDayNanoType, Time64MicrosecondType, TimestampMicrosecondType,
    UInt8Type, UInt16Type, UInt32Type, UInt64Type,
};
use colbridge_result::{Error, Result};
use colbridge_types::{DecimalStorage, IntervalValue, LogicalType, NativeValue};

use crate::vector::{ColumnVector, map_entry_type};

impl ColumnVector {
    /// Build a vector holding every row of `array`, read as `logical_type`.
    pub fn from_arrow(array: &dyn Array, logical_type: &LogicalType) -> Result<Self> {
        let mut vector = ColumnVector::with_capacity(logical_type.clone(), array.len());
        for row in 0..array.len() {
            let value = native_from_arrow(array, row, logical_type)?;
            vector.write(row, &value)?;
        }
        Ok(vector)
    }
}

/// Read the native value at `row` of an engine array.
pub fn native_from_arrow(
    array: &dyn Array,
    row: usize,
    logical_type: &LogicalType,
) -> Result<NativeValue> {
    if array.is_null(row) {
        return Ok(NativeValue::Null);
    }
    let value = match logical_type {
        LogicalType::Boolean => NativeValue::Bool(
            array
                .as_boolean_opt()
                .ok_or_else(|| mismatch(array, logical_type))?
                .value(row),
        ),
        LogicalType::TinyInt => NativeValue::Int8(primitive::<Int8Type>(array, row, logical_type)?),
        LogicalType::SmallInt => {
            NativeValue::Int16(primitive::<Int16Type>(array, row, logical_type)?)
        }
        LogicalType::Integer => {
            NativeValue::Int32(primitive::<Int32Type>(array, row, logical_type)?)
        }
        LogicalType::BigInt => NativeValue::Int64(primitive::<Int64Type>(array, row, logical_type)?),
        LogicalType::UTinyInt => {
            NativeValue::UInt8(primitive::<UInt8Type>(array, row, logical_type)?)
        }
        LogicalType::USmallInt => {
            NativeValue::UInt16(primitive::<UInt16Type>(array, row, logical_type)?)
        }
        LogicalType::UInteger => {
            NativeValue::UInt32(primitive::<UInt32Type>(array, row, logical_type)?)
        }
        LogicalType::UBigInt => {
            NativeValue::UInt64(primitive::<UInt64Type>(array, row, logical_type)?)
        }
        LogicalType::Float => {
            NativeValue::Float32(primitive::<Float32Type>(array, row, logical_type)?)
        }
        LogicalType::Double => {
            NativeValue::Float64(primitive::<Float64Type>(array, row, logical_type)?)
        }
        LogicalType::HugeInt => {
            NativeValue::Int128(i128::from_le_bytes(wide_bytes(array, row, logical_type)?))
        }
        LogicalType::UHugeInt => {
            NativeValue::UInt128(u128::from_le_bytes(wide_bytes(array, row, logical_type)?))
        }
        LogicalType::Uuid => {
            NativeValue::UInt128(u128::from_be_bytes(wide_bytes(array, row, logical_type)?))
        }
        LogicalType::Decimal { width, .. } => {
            let raw = primitive::<Decimal128Type>(array, row, logical_type)?;
            let overflow = || Error::Internal(format!("decimal {raw} overflows {logical_type}"));
            match DecimalStorage::for_width(*width) {
                DecimalStorage::Int32 => {
                    NativeValue::Int32(i32::try_from(raw).map_err(|_| overflow())?)
                }
                DecimalStorage::Int64 => {
                    NativeValue::Int64(i64::try_from(raw).map_err(|_| overflow())?)
                }
                DecimalStorage::Int128 => NativeValue::Int128(raw),
            }
        }
        LogicalType::Varchar => {
            let text = if let Some(strings) = array.as_string_opt::<i32>() {
                strings.value(row)
            } else if let Some(strings) = array.as_string_opt::<i64>() {
                strings.value(row)
            } else {
                return Err(mismatch(array, logical_type));
            };
            NativeValue::Bytes(text.as_bytes().to_vec())
        }
        LogicalType::Blob => {
            let bytes = if let Some(binary) = array.as_binary_opt::<i32>() {
                binary.value(row)
            } else if let Some(binary) = array.as_binary_opt::<i64>() {
                binary.value(row)
            } else {
                return Err(mismatch(array, logical_type));
            };
            NativeValue::Bytes(bytes.to_vec())
        }
        LogicalType::Date => NativeValue::Int32(primitive::<Date32Type>(array, row, logical_type)?),
        LogicalType::Time => {
            NativeValue::Int64(primitive::<Time64MicrosecondType>(array, row, logical_type)?)
        }
        LogicalType::Timestamp | LogicalType::TimestampTz => {
            let micros = primitive::<TimestampMicrosecondType>(array, row, logical_type)?;
            NativeValue::Int64(micros)
        }
        LogicalType::Interval => {
            let raw = primitive::<IntervalMonthDayNanoType>(array, row, logical_type)?;
            NativeValue::Interval(IntervalValue::from_month_day_nano(
                raw.months,
                raw.days,
                raw.nanoseconds,
            ))
        }
        LogicalType::Enum(entries) => {
            let dictionary = array
                .as_dictionary_opt::<UInt32Type>()
                .ok_or_else(|| mismatch(array, logical_type))?;
            let values = dictionary
                .values()
                .as_string_opt::<i32>()
                .ok_or_else(|| mismatch(array, logical_type))?;
            let key = dictionary.keys().value(row) as usize;
            if key >= values.len() {
                return Err(Error::Internal(format!(
                    "dictionary key {key} outside {logical_type} dictionary"
                )));
            }
            let entry = values.value(key);
            let index = entries.iter().position(|e| e == entry).ok_or_else(|| {
                Error::Internal(format!("'{entry}' is not an entry of {logical_type}"))
            })?;
            NativeValue::UInt32(u32::try_from(index).map_err(|_| {
                Error::Internal(format!("{logical_type} dictionary exceeds 32-bit keys"))
            })?)
        }
        LogicalType::List(child) => {
            let list = array
                .as_list_opt::<i32>()
                .ok_or_else(|| mismatch(array, logical_type))?;
            NativeValue::List(elements(&list.value(row), child)?)
        }
        LogicalType::Array { child, length } => {
            let list = array
                .as_fixed_size_list_opt()
                .ok_or_else(|| mismatch(array, logical_type))?;
            let items = elements(&list.value(row), child)?;
            if items.len() != *length {
                return Err(mismatch(array, logical_type));
            }
            NativeValue::List(items)
        }
        LogicalType::Struct(fields) => {
            let structure = array
                .as_struct_opt()
                .ok_or_else(|| mismatch(array, logical_type))?;
            if structure.num_columns() != fields.len() {
                return Err(mismatch(array, logical_type));
            }
            NativeValue::Struct(
                fields
                    .iter()
                    .enumerate()
                    .map(|(idx, field)| {
                        native_from_arrow(structure.column(idx).as_ref(), row, &field.logical_type)
                    })
                    .collect::<Result<_>>()?,
            )
        }
        LogicalType::Map { key, value } => {
            let map = array
                .as_map_opt()
                .ok_or_else(|| mismatch(array, logical_type))?;
            let entries = map.value(row);
            if entries.num_columns() != 2 {
                return Err(mismatch(array, &map_entry_type(key, value)));
            }
            let keys = entries.column(0);
            let values = entries.column(1);
            NativeValue::Map(
                (0..entries.len())
                    .map(|idx| {
                        Ok((
                            native_from_arrow(keys.as_ref(), idx, key)?,
                            native_from_arrow(values.as_ref(), idx, value)?,
                        ))
                    })
                    .collect::<Result<_>>()?,
            )
        }
    };
    Ok(value)
}

fn primitive<T: arrow::datatypes::ArrowPrimitiveType>(
    array: &dyn Array,
    row: usize,
    logical_type: &LogicalType,
) -> Result<T::Native> {
    array
        .as_primitive_opt::<T>()
        .map(|values| values.value(row))
        .ok_or_else(|| mismatch(array, logical_type))
}

fn wide_bytes(array: &dyn Array, row: usize, logical_type: &LogicalType) -> Result<[u8; 16]> {
    let binary = array
        .as_fixed_size_binary_opt()
        .ok_or_else(|| mismatch(array, logical_type))?;
    binary
        .value(row)
        .try_into()
        .map_err(|_| mismatch(array, logical_type))
}

fn elements(values: &ArrayRef, child: &LogicalType) -> Result<Vec<NativeValue>> {
    (0..values.len())
        .map(|idx| native_from_arrow(values.as_ref(), idx, child))
        .collect()
}

fn mismatch(array: &dyn Array, logical_type: &LogicalType) -> Error {
    Error::Internal(format!(
        "engine array of type {} cannot be read as {logical_type}",
        array.data_type()
    ))
}
