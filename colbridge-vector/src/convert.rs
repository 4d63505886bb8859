//! Conversion between application values and engine-native scalars.
//!
//! [`to_native`] checks that a [`Value`] fits a column's [`LogicalType`] and
//! produces the [`NativeValue`] the writer stores; [`from_native`] is its
//! inverse for the read path. Both recurse through composite types. A value
//! that does not fit is a cast error and is never downgraded to NULL.

use colbridge_result::{Error, Result};
use colbridge_types::constants::{MICROS_PER_DAY, MICROS_PER_SECOND, UNIX_EPOCH_JULIAN_DAY};
use colbridge_types::{DecimalStorage, DecimalValue, LogicalType, NativeValue, StructField, Value};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

/// 2^127, the first `f64` above every `i128`.
const I128_LIMIT: f64 = 170_141_183_460_469_231_731_687_303_715_884_105_728.0;

/// Convert one application value into the native form of `logical_type`.
pub fn to_native(value: &Value, logical_type: &LogicalType) -> Result<NativeValue> {
    if value.is_null() {
        return Ok(NativeValue::Null);
    }
    let cast = || Error::cast(value.kind_name(), logical_type);
    let native = match (logical_type, value) {
        (LogicalType::Boolean, Value::Boolean(v)) => NativeValue::Bool(*v),
        (LogicalType::TinyInt, _) => NativeValue::Int8(integer(value).ok_or_else(cast)?),
        (LogicalType::SmallInt, _) => NativeValue::Int16(integer(value).ok_or_else(cast)?),
        (LogicalType::Integer, _) => NativeValue::Int32(integer(value).ok_or_else(cast)?),
        (LogicalType::BigInt, _) => NativeValue::Int64(integer(value).ok_or_else(cast)?),
        (LogicalType::HugeInt, _) => NativeValue::Int128(integer(value).ok_or_else(cast)?),
        (LogicalType::UTinyInt, _) => NativeValue::UInt8(integer(value).ok_or_else(cast)?),
        (LogicalType::USmallInt, _) => NativeValue::UInt16(integer(value).ok_or_else(cast)?),
        (LogicalType::UInteger, _) => NativeValue::UInt32(integer(value).ok_or_else(cast)?),
        (LogicalType::UBigInt, _) => NativeValue::UInt64(integer(value).ok_or_else(cast)?),
        (LogicalType::UHugeInt, Value::UHugeInt(v)) => NativeValue::UInt128(*v),
        (LogicalType::UHugeInt, _) => NativeValue::UInt128(integer(value).ok_or_else(cast)?),
        (LogicalType::Float, Value::Float(v)) => NativeValue::Float32(*v),
        (LogicalType::Float, Value::Double(v)) => {
            let narrowed = *v as f32;
            if f64::from(narrowed) != *v && !v.is_nan() {
                return Err(cast());
            }
            NativeValue::Float32(narrowed)
        }
        (LogicalType::Float, _) => {
            let int = value.as_i128().ok_or_else(cast)?;
            let float = int as f32;
            if f64::from(float) >= I128_LIMIT || float as i128 != int {
                return Err(cast());
            }
            NativeValue::Float32(float)
        }
        (LogicalType::Double, Value::Float(v)) => NativeValue::Float64(f64::from(*v)),
        (LogicalType::Double, Value::Double(v)) => NativeValue::Float64(*v),
        (LogicalType::Double, _) => {
            let int = value.as_i128().ok_or_else(cast)?;
            let float = int as f64;
            if float >= I128_LIMIT || float as i128 != int {
                return Err(cast());
            }
            NativeValue::Float64(float)
        }
        (LogicalType::Decimal { width, scale }, _) => decimal_to_native(value, *width, *scale)
            .ok_or_else(|| Error::cast(describe_decimal(value), logical_type))?,
        (LogicalType::Varchar, Value::Varchar(s)) => NativeValue::Bytes(s.as_bytes().to_vec()),
        (LogicalType::Blob, Value::Blob(bytes)) => NativeValue::Bytes(bytes.clone()),
        (LogicalType::Blob, Value::Varchar(s)) => NativeValue::Bytes(s.as_bytes().to_vec()),
        (LogicalType::Date, Value::Date(date)) => NativeValue::Int32(date_to_days(*date)),
        (LogicalType::Date, Value::Timestamp(ts)) => {
            NativeValue::Int32(date_to_days(ts.assume_utc().date()))
        }
        (LogicalType::Date, Value::TimestampTz(ts)) => {
            let days = ts.unix_timestamp().div_euclid(86_400);
            NativeValue::Int32(i32::try_from(days).map_err(|_| cast())?)
        }
        (LogicalType::Time, Value::Time(time)) => NativeValue::Int64(time_to_micros(*time)),
        (LogicalType::Timestamp | LogicalType::TimestampTz, Value::Timestamp(ts)) => {
            NativeValue::Int64(instant_to_micros(ts.assume_utc()).ok_or_else(cast)?)
        }
        (LogicalType::Timestamp | LogicalType::TimestampTz, Value::TimestampTz(ts)) => {
            NativeValue::Int64(instant_to_micros(*ts).ok_or_else(cast)?)
        }
        (LogicalType::Timestamp | LogicalType::TimestampTz, Value::Date(date)) => {
            let micros = i64::from(date_to_days(*date)) * MICROS_PER_DAY;
            NativeValue::Int64(micros)
        }
        (LogicalType::Interval, Value::Interval(interval)) => {
            interval.nanos().ok_or_else(cast)?;
            NativeValue::Interval(*interval)
        }
        (LogicalType::Uuid, Value::Uuid(uuid)) => NativeValue::UInt128(uuid.as_u128()),
        (LogicalType::Uuid, Value::Blob(bytes)) => NativeValue::UInt128(
            Uuid::from_slice(bytes)
                .map_err(|_| Error::cast(format!("BLOB of {} bytes", bytes.len()), logical_type))?
                .as_u128(),
        ),
        (LogicalType::Uuid, Value::Varchar(s)) => NativeValue::UInt128(
            Uuid::parse_str(s)
                .map_err(|_| Error::cast(format!("VARCHAR '{s}'"), logical_type))?
                .as_u128(),
        ),
        (LogicalType::Enum(entries), Value::Enum(s) | Value::Varchar(s)) => {
            let index = entries
                .iter()
                .position(|entry| entry == s)
                .ok_or_else(|| Error::cast(format!("'{s}'"), logical_type))?;
            NativeValue::UInt32(u32::try_from(index).map_err(|_| cast())?)
        }
        (LogicalType::List(child), Value::List(items)) => NativeValue::List(
            items
                .iter()
                .map(|item| to_native(item, child))
                .collect::<Result<_>>()?,
        ),
        (LogicalType::Array { child, length }, Value::List(items)) => {
            if items.len() != *length {
                return Err(Error::cast(
                    format!("LIST of length {}", items.len()),
                    logical_type,
                ));
            }
            NativeValue::List(
                items
                    .iter()
                    .map(|item| to_native(item, child))
                    .collect::<Result<_>>()?,
            )
        }
        (LogicalType::Struct(fields), Value::Struct(pairs)) => struct_to_native(fields, pairs)?,
        (LogicalType::Map { key, value: value_type }, Value::Map(pairs)) => {
            let mut entries = Vec::with_capacity(pairs.len());
            for (k, v) in pairs {
                if k.is_null() {
                    return Err(Error::cast("NULL MAP key", logical_type));
                }
                entries.push((to_native(k, key)?, to_native(v, value_type)?));
            }
            NativeValue::Map(entries)
        }
        _ => return Err(cast()),
    };
    Ok(native)
}

/// Convert a native scalar read from a vector of `logical_type` back into an
/// application value.
pub fn from_native(native: &NativeValue, logical_type: &LogicalType) -> Result<Value> {
    let value = match (logical_type, native) {
        (_, NativeValue::Null) => Value::Null,
        (LogicalType::Boolean, NativeValue::Bool(v)) => Value::Boolean(*v),
        (LogicalType::TinyInt, NativeValue::Int8(v)) => Value::TinyInt(*v),
        (LogicalType::SmallInt, NativeValue::Int16(v)) => Value::SmallInt(*v),
        (LogicalType::Integer, NativeValue::Int32(v)) => Value::Integer(*v),
        (LogicalType::BigInt, NativeValue::Int64(v)) => Value::BigInt(*v),
        (LogicalType::HugeInt, NativeValue::Int128(v)) => Value::HugeInt(*v),
        (LogicalType::UTinyInt, NativeValue::UInt8(v)) => Value::UTinyInt(*v),
        (LogicalType::USmallInt, NativeValue::UInt16(v)) => Value::USmallInt(*v),
        (LogicalType::UInteger, NativeValue::UInt32(v)) => Value::UInteger(*v),
        (LogicalType::UBigInt, NativeValue::UInt64(v)) => Value::UBigInt(*v),
        (LogicalType::UHugeInt, NativeValue::UInt128(v)) => Value::UHugeInt(*v),
        (LogicalType::Float, NativeValue::Float32(v)) => Value::Float(*v),
        (LogicalType::Double, NativeValue::Float64(v)) => Value::Double(*v),
        (LogicalType::Decimal { scale, .. }, raw) => {
            let raw = match raw {
                NativeValue::Int32(v) => i128::from(*v),
                NativeValue::Int64(v) => i128::from(*v),
                NativeValue::Int128(v) => *v,
                other => return Err(layout_mismatch(other, logical_type)),
            };
            let decimal = DecimalValue::new(raw, *scale)
                .map_err(|err| Error::Internal(format!("stored {logical_type}: {err}")))?;
            Value::Decimal(decimal)
        }
        (LogicalType::Varchar, NativeValue::Bytes(bytes)) => Value::Varchar(
            String::from_utf8(bytes.clone())
                .map_err(|err| Error::Internal(format!("stored VARCHAR is not UTF-8: {err}")))?,
        ),
        (LogicalType::Blob, NativeValue::Bytes(bytes)) => Value::Blob(bytes.clone()),
        (LogicalType::Date, NativeValue::Int32(days)) => Value::Date(days_to_date(*days)?),
        (LogicalType::Time, NativeValue::Int64(micros)) => Value::Time(micros_to_time(*micros)?),
        (LogicalType::Timestamp, NativeValue::Int64(micros)) => {
            let instant = micros_to_instant(*micros)?;
            Value::Timestamp(PrimitiveDateTime::new(instant.date(), instant.time()))
        }
        (LogicalType::TimestampTz, NativeValue::Int64(micros)) => {
            Value::TimestampTz(micros_to_instant(*micros)?)
        }
        (LogicalType::Interval, NativeValue::Interval(interval)) => Value::Interval(*interval),
        (LogicalType::Uuid, NativeValue::UInt128(v)) => Value::Uuid(Uuid::from_u128(*v)),
        (LogicalType::Enum(entries), NativeValue::UInt32(index)) => {
            let entry = entries.get(*index as usize).ok_or_else(|| {
                Error::Internal(format!("dictionary index {index} outside {logical_type}"))
            })?;
            Value::Enum(entry.clone())
        }
        (LogicalType::List(child), NativeValue::List(items))
        | (LogicalType::Array { child, .. }, NativeValue::List(items)) => Value::List(
            items
                .iter()
                .map(|item| from_native(item, child))
                .collect::<Result<_>>()?,
        ),
        (LogicalType::Struct(fields), NativeValue::Struct(children))
            if fields.len() == children.len() =>
        {
            Value::Struct(
                fields
                    .iter()
                    .zip(children)
                    .map(|(field, child)| {
                        Ok((field.name.clone(), from_native(child, &field.logical_type)?))
                    })
                    .collect::<Result<_>>()?,
            )
        }
        (LogicalType::Map { key, value }, NativeValue::Map(pairs)) => Value::Map(
            pairs
                .iter()
                .map(|(k, v)| Ok((from_native(k, key)?, from_native(v, value)?)))
                .collect::<Result<_>>()?,
        ),
        (_, other) => return Err(layout_mismatch(other, logical_type)),
    };
    Ok(value)
}

fn integer<T: TryFrom<i128>>(value: &Value) -> Option<T> {
    value.as_i128().and_then(|v| T::try_from(v).ok())
}

fn decimal_to_native(value: &Value, width: u8, scale: u8) -> Option<NativeValue> {
    let decimal = match value {
        Value::Decimal(decimal) => *decimal,
        other => DecimalValue::new(other.as_i128()?, 0).ok()?,
    };
    if decimal.scale() > scale {
        return None;
    }
    let rescaled = decimal.rescale(scale).ok()?;
    if rescaled.precision() > width {
        return None;
    }
    let raw = rescaled.raw_value();
    Some(match DecimalStorage::for_width(width) {
        DecimalStorage::Int32 => NativeValue::Int32(i32::try_from(raw).ok()?),
        DecimalStorage::Int64 => NativeValue::Int64(i64::try_from(raw).ok()?),
        DecimalStorage::Int128 => NativeValue::Int128(raw),
    })
}

fn describe_decimal(value: &Value) -> String {
    match value {
        Value::Decimal(decimal) => format!(
            "DECIMAL({},{})",
            decimal.precision().max(decimal.scale()),
            decimal.scale()
        ),
        other => other.kind_name().to_string(),
    }
}

fn struct_to_native(fields: &[StructField], pairs: &[(String, Value)]) -> Result<NativeValue> {
    let expected = || {
        fields
            .iter()
            .map(|field| field.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    for (idx, (name, _)) in pairs.iter().enumerate() {
        if !fields.iter().any(|field| &field.name == name) {
            return Err(Error::struct_field(name, expected()));
        }
        if pairs[..idx].iter().any(|(earlier, _)| earlier == name) {
            return Err(Error::struct_field(format!("duplicate field {name}"), expected()));
        }
    }
    let children = fields
        .iter()
        .map(|field| {
            let (_, value) = pairs
                .iter()
                .find(|(name, _)| *name == field.name)
                .ok_or_else(|| Error::struct_field("missing field", &field.name))?;
            to_native(value, &field.logical_type)
        })
        .collect::<Result<_>>()?;
    Ok(NativeValue::Struct(children))
}

fn date_to_days(date: Date) -> i32 {
    date.to_julian_day() - UNIX_EPOCH_JULIAN_DAY
}

fn days_to_date(days: i32) -> Result<Date> {
    let julian = UNIX_EPOCH_JULIAN_DAY
        .checked_add(days)
        .ok_or_else(|| Error::Internal(format!("DATE day count {days} out of range")))?;
    Date::from_julian_day(julian)
        .map_err(|err| Error::Internal(format!("invalid stored DATE {days}: {err}")))
}

fn time_to_micros(time: Time) -> i64 {
    let (hour, minute, second, micro) = time.as_hms_micro();
    (i64::from(hour) * 3_600 + i64::from(minute) * 60 + i64::from(second)) * MICROS_PER_SECOND
        + i64::from(micro)
}

fn micros_to_time(micros: i64) -> Result<Time> {
    let invalid = || Error::Internal(format!("invalid stored TIME {micros}"));
    if !(0..MICROS_PER_DAY).contains(&micros) {
        return Err(invalid());
    }
    let seconds = micros / MICROS_PER_SECOND;
    let hour = u8::try_from(seconds / 3_600).map_err(|_| invalid())?;
    let minute = u8::try_from(seconds / 60 % 60).map_err(|_| invalid())?;
    let second = u8::try_from(seconds % 60).map_err(|_| invalid())?;
    let micro = u32::try_from(micros % MICROS_PER_SECOND).map_err(|_| invalid())?;
    Time::from_hms_micro(hour, minute, second, micro).map_err(|_| invalid())
}

/// Microseconds since the epoch, truncating sub-microsecond precision toward
/// negative infinity.
fn instant_to_micros(instant: OffsetDateTime) -> Option<i64> {
    i64::try_from(instant.unix_timestamp_nanos().div_euclid(1_000)).ok()
}

fn micros_to_instant(micros: i64) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(micros) * 1_000)
        .map_err(|err| Error::Internal(format!("invalid stored timestamp {micros}: {err}")))
}

fn layout_mismatch(native: &NativeValue, logical_type: &LogicalType) -> Error {
    Error::Internal(format!(
        "native {} value cannot be read as {logical_type}",
        native.physical_name()
    ))
}
