//! Application-side values exchanged with the driver.
//!
//! A [`Value`] is what callers hand to an appender and what they get back when
//! reading a chunk. It is independent of any column type: the converter decides
//! whether a value fits a given [`LogicalType`](crate::LogicalType).

use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

use crate::decimal::DecimalValue;
use crate::interval::IntervalValue;

/// A single application value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    TinyInt(i8),
    SmallInt(i16),
    Integer(i32),
    BigInt(i64),
    HugeInt(i128),
    UTinyInt(u8),
    USmallInt(u16),
    UInteger(u32),
    UBigInt(u64),
    UHugeInt(u128),
    Float(f32),
    Double(f64),
    Decimal(DecimalValue),
    Varchar(String),
    Blob(Vec<u8>),
    Date(Date),
    Time(Time),
    /// Wall-clock timestamp interpreted as UTC.
    Timestamp(PrimitiveDateTime),
    TimestampTz(OffsetDateTime),
    Interval(IntervalValue),
    Uuid(Uuid),
    /// Dictionary entry of an ENUM column.
    Enum(String),
    List(Vec<Value>),
    /// Field name/value pairs; order is irrelevant on write and follows the
    /// column's field order on read.
    Struct(Vec<(String, Value)>),
    /// Key/value pairs in insertion order. Duplicate keys are kept.
    Map(Vec<(Value, Value)>),
}

impl Value {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the value's kind, used in cast error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Boolean(_) => "BOOLEAN",
            Value::TinyInt(_) => "TINYINT",
            Value::SmallInt(_) => "SMALLINT",
            Value::Integer(_) => "INTEGER",
            Value::BigInt(_) => "BIGINT",
            Value::HugeInt(_) => "HUGEINT",
            Value::UTinyInt(_) => "UTINYINT",
            Value::USmallInt(_) => "USMALLINT",
            Value::UInteger(_) => "UINTEGER",
            Value::UBigInt(_) => "UBIGINT",
            Value::UHugeInt(_) => "UHUGEINT",
            Value::Float(_) => "FLOAT",
            Value::Double(_) => "DOUBLE",
            Value::Decimal(_) => "DECIMAL",
            Value::Varchar(_) => "VARCHAR",
            Value::Blob(_) => "BLOB",
            Value::Date(_) => "DATE",
            Value::Time(_) => "TIME",
            Value::Timestamp(_) => "TIMESTAMP",
            Value::TimestampTz(_) => "TIMESTAMP WITH TIME ZONE",
            Value::Interval(_) => "INTERVAL",
            Value::Uuid(_) => "UUID",
            Value::Enum(_) => "ENUM",
            Value::List(_) => "LIST",
            Value::Struct(_) => "STRUCT",
            Value::Map(_) => "MAP",
        }
    }

    /// Integer payload widened to `i128`, for any integer kind that fits.
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            Value::TinyInt(v) => Some(i128::from(v)),
            Value::SmallInt(v) => Some(i128::from(v)),
            Value::Integer(v) => Some(i128::from(v)),
            Value::BigInt(v) => Some(i128::from(v)),
            Value::HugeInt(v) => Some(v),
            Value::UTinyInt(v) => Some(i128::from(v)),
            Value::USmallInt(v) => Some(i128::from(v)),
            Value::UInteger(v) => Some(i128::from(v)),
            Value::UBigInt(v) => Some(i128::from(v)),
            Value::UHugeInt(v) => i128::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Varchar(s) | Value::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Look up a STRUCT field by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }
}

macro_rules! impl_from_for_value {
    ($variant:ident, $($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_for_value!(Boolean, bool);
impl_from_for_value!(TinyInt, i8);
impl_from_for_value!(SmallInt, i16);
impl_from_for_value!(Integer, i32);
impl_from_for_value!(BigInt, i64);
impl_from_for_value!(HugeInt, i128);
impl_from_for_value!(UTinyInt, u8);
impl_from_for_value!(USmallInt, u16);
impl_from_for_value!(UInteger, u32);
impl_from_for_value!(UBigInt, u64);
impl_from_for_value!(UHugeInt, u128);
impl_from_for_value!(Float, f32);
impl_from_for_value!(Double, f64);
impl_from_for_value!(Decimal, DecimalValue);
impl_from_for_value!(Varchar, String);
impl_from_for_value!(Blob, Vec<u8>);
impl_from_for_value!(Date, Date);
impl_from_for_value!(Time, Time);
impl_from_for_value!(Timestamp, PrimitiveDateTime);
impl_from_for_value!(TimestampTz, OffsetDateTime);
impl_from_for_value!(Interval, IntervalValue);
impl_from_for_value!(Uuid, Uuid);
impl_from_for_value!(List, Vec<Value>);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Varchar(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_pick_matching_variant() {
        assert_eq!(Value::from(7_i16), Value::SmallInt(7));
        assert_eq!(Value::from("x"), Value::Varchar("x".into()));
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some(1_u8)), Value::UTinyInt(1));
        assert_eq!(Value::from(vec![1_u8, 2]), Value::Blob(vec![1, 2]));
    }

    #[test]
    fn struct_field_lookup() {
        let value = Value::Struct(vec![
            ("a".into(), Value::Integer(1)),
            ("b".into(), Value::from("two")),
        ]);
        assert_eq!(value.field("b").and_then(Value::as_str), Some("two"));
        assert_eq!(value.field("c"), None);
        assert_eq!(value.kind_name(), "STRUCT");
    }

    #[test]
    fn widening_integers() {
        assert_eq!(Value::UBigInt(u64::MAX).as_i128(), Some(i128::from(u64::MAX)));
        assert_eq!(Value::UHugeInt(u128::MAX).as_i128(), None);
        assert_eq!(Value::Double(1.0).as_i128(), None);
    }
}
