//! Semantic type descriptors.
//!
//! [`LogicalType`] is the closed set of engine column types the driver knows how
//! to marshal. Composite tags own their children, so a descriptor is a finite
//! tree that converters and writers walk with exhaustive `match`es.

use std::fmt;

use colbridge_result::{Error, Result};

use crate::constants::MAX_DECIMAL_WIDTH;

/// Semantic description of one engine column type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogicalType {
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    HugeInt,
    UTinyInt,
    USmallInt,
    UInteger,
    UBigInt,
    UHugeInt,
    Float,
    Double,
    /// Fixed-point number with `width` total digits, `scale` of them fractional.
    Decimal {
        width: u8,
        scale: u8,
    },
    Varchar,
    Blob,
    Date,
    Time,
    /// Instant without offset; values are interpreted as UTC.
    Timestamp,
    /// Instant normalized to UTC on write.
    TimestampTz,
    Interval,
    Uuid,
    /// Dictionary-encoded string restricted to the listed entries.
    Enum(Vec<String>),
    List(Box<LogicalType>),
    Struct(Vec<StructField>),
    Map {
        key: Box<LogicalType>,
        value: Box<LogicalType>,
    },
    /// Fixed-length list; every non-NULL row holds exactly `length` elements.
    Array {
        child: Box<LogicalType>,
        length: usize,
    },
}

/// Named child of a STRUCT descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructField {
    pub name: String,
    pub logical_type: LogicalType,
    pub nullable: bool,
}

impl StructField {
    /// A nullable field.
    pub fn new(name: impl Into<String>, logical_type: LogicalType) -> Self {
        Self {
            name: name.into(),
            logical_type,
            nullable: true,
        }
    }

    pub fn not_null(name: impl Into<String>, logical_type: LogicalType) -> Self {
        Self {
            name: name.into(),
            logical_type,
            nullable: false,
        }
    }
}

/// Integer width used to store a DECIMAL's scaled value in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecimalStorage {
    Int32,
    Int64,
    Int128,
}

impl DecimalStorage {
    pub fn for_width(width: u8) -> Self {
        match width {
            0..=9 => DecimalStorage::Int32,
            10..=18 => DecimalStorage::Int64,
            _ => DecimalStorage::Int128,
        }
    }
}

impl LogicalType {
    /// DECIMAL(width, scale), rejecting widths outside `1..=38` and scales above the width.
    pub fn decimal(width: u8, scale: u8) -> Result<Self> {
        let ty = LogicalType::Decimal { width, scale };
        ty.validate()?;
        Ok(ty)
    }

    pub fn list(child: LogicalType) -> Self {
        LogicalType::List(Box::new(child))
    }

    pub fn array(child: LogicalType, length: usize) -> Result<Self> {
        let ty = LogicalType::Array {
            child: Box::new(child),
            length,
        };
        ty.validate()?;
        Ok(ty)
    }

    /// MAP(key, value). Fails with [`Error::UnsupportedMapKeyType`] when `key` is not
    /// [mappable](Self::is_mappable_key).
    pub fn map(key: LogicalType, value: LogicalType) -> Result<Self> {
        let ty = LogicalType::Map {
            key: Box::new(key),
            value: Box::new(value),
        };
        ty.validate()?;
        Ok(ty)
    }

    pub fn structure(fields: Vec<StructField>) -> Result<Self> {
        let ty = LogicalType::Struct(fields);
        ty.validate()?;
        Ok(ty)
    }

    pub fn enumeration<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ty = LogicalType::Enum(entries.into_iter().map(Into::into).collect());
        ty.validate()?;
        Ok(ty)
    }

    /// Check structural constraints over the whole descriptor tree.
    pub fn validate(&self) -> Result<()> {
        match self {
            LogicalType::Decimal { width, scale } => {
                if *width == 0 || *width > MAX_DECIMAL_WIDTH || scale > width {
                    return Err(Error::UnsupportedType(format!(
                        "DECIMAL({width},{scale}): width must be in 1..={MAX_DECIMAL_WIDTH} and scale must not exceed width"
                    )));
                }
                Ok(())
            }
            LogicalType::Enum(entries) => {
                if entries.is_empty() {
                    return Err(Error::UnsupportedType(
                        "ENUM requires at least one dictionary entry".into(),
                    ));
                }
                for (idx, entry) in entries.iter().enumerate() {
                    if entries[..idx].contains(entry) {
                        return Err(Error::UnsupportedType(format!(
                            "ENUM dictionary contains duplicate entry '{entry}'"
                        )));
                    }
                }
                Ok(())
            }
            LogicalType::List(child) => child.validate(),
            LogicalType::Array { child, length } => {
                if *length == 0 {
                    return Err(Error::UnsupportedType(
                        "ARRAY length must be greater than zero".into(),
                    ));
                }
                child.validate()
            }
            LogicalType::Struct(fields) => {
                if fields.is_empty() {
                    return Err(Error::UnsupportedType(
                        "STRUCT requires at least one field".into(),
                    ));
                }
                for (idx, field) in fields.iter().enumerate() {
                    if fields[..idx].iter().any(|f| f.name == field.name) {
                        return Err(Error::UnsupportedType(format!(
                            "STRUCT contains duplicate field '{}'",
                            field.name
                        )));
                    }
                    field.logical_type.validate()?;
                }
                Ok(())
            }
            LogicalType::Map { key, value } => {
                key.validate()?;
                value.validate()?;
                if !key.is_mappable_key() {
                    return Err(Error::UnsupportedMapKeyType(key.to_string()));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Whether values of this type may be used as MAP keys.
    ///
    /// Primitives are always mappable. A STRUCT is mappable when all of its
    /// fields are non-nullable and mappable. LIST, ARRAY and MAP carry NULL-able
    /// children and never are.
    pub fn is_mappable_key(&self) -> bool {
        match self {
            LogicalType::Struct(fields) => fields
                .iter()
                .all(|field| !field.nullable && field.logical_type.is_mappable_key()),
            LogicalType::List(_) | LogicalType::Array { .. } | LogicalType::Map { .. } => false,
            _ => true,
        }
    }

    /// True for every tag without children.
    pub fn is_primitive(&self) -> bool {
        !matches!(
            self,
            LogicalType::List(_)
                | LogicalType::Struct(_)
                | LogicalType::Map { .. }
                | LogicalType::Array { .. }
        )
    }

    /// Integer class backing a DECIMAL, or `None` for other tags.
    pub fn decimal_storage(&self) -> Option<DecimalStorage> {
        match self {
            LogicalType::Decimal { width, .. } => Some(DecimalStorage::for_width(*width)),
            _ => None,
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalType::Boolean => f.write_str("BOOLEAN"),
            LogicalType::TinyInt => f.write_str("TINYINT"),
            LogicalType::SmallInt => f.write_str("SMALLINT"),
            LogicalType::Integer => f.write_str("INTEGER"),
            LogicalType::BigInt => f.write_str("BIGINT"),
            LogicalType::HugeInt => f.write_str("HUGEINT"),
            LogicalType::UTinyInt => f.write_str("UTINYINT"),
            LogicalType::USmallInt => f.write_str("USMALLINT"),
            LogicalType::UInteger => f.write_str("UINTEGER"),
            LogicalType::UBigInt => f.write_str("UBIGINT"),
            LogicalType::UHugeInt => f.write_str("UHUGEINT"),
            LogicalType::Float => f.write_str("FLOAT"),
            LogicalType::Double => f.write_str("DOUBLE"),
            LogicalType::Decimal { width, scale } => write!(f, "DECIMAL({width},{scale})"),
            LogicalType::Varchar => f.write_str("VARCHAR"),
            LogicalType::Blob => f.write_str("BLOB"),
            LogicalType::Date => f.write_str("DATE"),
            LogicalType::Time => f.write_str("TIME"),
            LogicalType::Timestamp => f.write_str("TIMESTAMP"),
            LogicalType::TimestampTz => f.write_str("TIMESTAMP WITH TIME ZONE"),
            LogicalType::Interval => f.write_str("INTERVAL"),
            LogicalType::Uuid => f.write_str("UUID"),
            LogicalType::Enum(entries) => {
                f.write_str("ENUM(")?;
                for (idx, entry) in entries.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "'{entry}'")?;
                }
                f.write_str(")")
            }
            LogicalType::List(child) => write!(f, "{child}[]"),
            LogicalType::Struct(fields) => {
                f.write_str("STRUCT(")?;
                for (idx, field) in fields.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{} {}", field.name, field.logical_type)?;
                    if !field.nullable {
                        f.write_str(" NOT NULL")?;
                    }
                }
                f.write_str(")")
            }
            LogicalType::Map { key, value } => write!(f, "MAP({key}, {value})"),
            LogicalType::Array { child, length } => write!(f, "{child}[{length}]"),
        }
    }
}
