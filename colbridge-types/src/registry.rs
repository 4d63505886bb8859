//! Type descriptor registry.
//!
//! Maps the engine's native type handles (Arrow [`Field`]s) to [`LogicalType`]
//! descriptors and back. Resolution recurses structurally through child fields,
//! so it always terminates on a finite schema.
//!
//! Types that Arrow cannot tell apart by [`DataType`] alone are distinguished by
//! the extension name stored under [`EXTENSION_NAME_KEY`]:
//!
//! | Descriptor | Arrow type | Extension |
//! |---|---|---|
//! | HUGEINT | `FixedSizeBinary(16)` | `colbridge.hugeint` |
//! | UHUGEINT | `FixedSizeBinary(16)` | `colbridge.uhugeint` |
//! | UUID | `FixedSizeBinary(16)` | `arrow.uuid` |
//! | ENUM | `Dictionary(UInt32, Utf8)` | `colbridge.enum` |

use std::collections::HashMap;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field, FieldRef, Fields, IntervalUnit, Schema, SchemaRef, TimeUnit};
use colbridge_result::{Error, Result};

use crate::constants::{
    ENUM_EXTENSION, EXTENSION_METADATA_KEY, EXTENSION_NAME_KEY, HUGEINT_EXTENSION,
    LIST_ITEM_FIELD, MAP_ENTRIES_FIELD, MAP_KEY_FIELD, MAP_VALUE_FIELD, UHUGEINT_EXTENSION,
    UTC_TIMEZONE, UUID_EXTENSION,
};
use crate::logical_type::{LogicalType, StructField};

/// Byte width of the `FixedSizeBinary` columns backing 128-bit types.
const WIDE_VALUE_BYTES: i32 = 16;

/// Resolve the descriptor for an engine field, recursing into children.
///
/// Fails with [`Error::UnsupportedType`] for types with no descriptor and with
/// [`Error::UnsupportedMapKeyType`] for MAPs whose key is not mappable.
pub fn logical_type_from_field(field: &Field) -> Result<LogicalType> {
    let extension = field.metadata().get(EXTENSION_NAME_KEY).map(String::as_str);
    match field.data_type() {
        DataType::Boolean => Ok(LogicalType::Boolean),
        DataType::Int8 => Ok(LogicalType::TinyInt),
        DataType::Int16 => Ok(LogicalType::SmallInt),
        DataType::Int32 => Ok(LogicalType::Integer),
        DataType::Int64 => Ok(LogicalType::BigInt),
        DataType::UInt8 => Ok(LogicalType::UTinyInt),
        DataType::UInt16 => Ok(LogicalType::USmallInt),
        DataType::UInt32 => Ok(LogicalType::UInteger),
        DataType::UInt64 => Ok(LogicalType::UBigInt),
        DataType::Float32 => Ok(LogicalType::Float),
        DataType::Float64 => Ok(LogicalType::Double),
        DataType::Decimal128(width, scale) => {
            let scale = u8::try_from(*scale).map_err(|_| unsupported(field.data_type()))?;
            LogicalType::decimal(*width, scale)
        }
        DataType::Utf8 | DataType::LargeUtf8 => Ok(LogicalType::Varchar),
        DataType::Binary | DataType::LargeBinary => Ok(LogicalType::Blob),
        DataType::Date32 => Ok(LogicalType::Date),
        DataType::Time64(TimeUnit::Microsecond) => Ok(LogicalType::Time),
        DataType::Timestamp(TimeUnit::Microsecond, None) => Ok(LogicalType::Timestamp),
        DataType::Timestamp(TimeUnit::Microsecond, Some(_)) => Ok(LogicalType::TimestampTz),
        DataType::Interval(IntervalUnit::MonthDayNano) => Ok(LogicalType::Interval),
        DataType::FixedSizeBinary(WIDE_VALUE_BYTES) => match extension {
            Some(HUGEINT_EXTENSION) => Ok(LogicalType::HugeInt),
            Some(UHUGEINT_EXTENSION) => Ok(LogicalType::UHugeInt),
            Some(UUID_EXTENSION) => Ok(LogicalType::Uuid),
            _ => Err(unsupported(field.data_type())),
        },
        DataType::Dictionary(key, value)
            if key.as_ref() == &DataType::UInt32
                && value.as_ref() == &DataType::Utf8
                && extension == Some(ENUM_EXTENSION) =>
        {
            let raw = field
                .metadata()
                .get(EXTENSION_METADATA_KEY)
                .ok_or_else(|| Error::UnsupportedType("ENUM without dictionary".into()))?;
            let entries: Vec<String> = serde_json::from_str(raw).map_err(|err| {
                Error::UnsupportedType(format!("ENUM dictionary metadata is malformed: {err}"))
            })?;
            LogicalType::enumeration(entries)
        }
        DataType::List(child) => Ok(LogicalType::list(logical_type_from_field(child)?)),
        DataType::FixedSizeList(child, length) => {
            let length = usize::try_from(*length).map_err(|_| unsupported(field.data_type()))?;
            LogicalType::array(logical_type_from_field(child)?, length)
        }
        DataType::Struct(fields) => {
            let children = fields
                .iter()
                .map(|child| {
                    Ok(StructField {
                        name: child.name().clone(),
                        logical_type: logical_type_from_field(child)?,
                        nullable: child.is_nullable(),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            LogicalType::structure(children)
        }
        DataType::Map(entries, _) => {
            let DataType::Struct(kv) = entries.data_type() else {
                return Err(unsupported(field.data_type()));
            };
            if kv.len() != 2 {
                return Err(unsupported(field.data_type()));
            }
            let key_type = logical_type_from_field(&kv[0])?;
            let value_type = logical_type_from_field(&kv[1])?;
            LogicalType::map(key_type, value_type)
        }
        other => Err(unsupported(other)),
    }
}

/// Arrow data type that stores columns of `ty`.
///
/// For extension-tagged types the returned data type is not enough to resolve
/// the descriptor again; use [`field_for_logical_type`] when building schemas.
pub fn data_type_for_logical_type(ty: &LogicalType) -> DataType {
    match ty {
        LogicalType::Boolean => DataType::Boolean,
        LogicalType::TinyInt => DataType::Int8,
        LogicalType::SmallInt => DataType::Int16,
        LogicalType::Integer => DataType::Int32,
        LogicalType::BigInt => DataType::Int64,
        LogicalType::UTinyInt => DataType::UInt8,
        LogicalType::USmallInt => DataType::UInt16,
        LogicalType::UInteger => DataType::UInt32,
        LogicalType::UBigInt => DataType::UInt64,
        LogicalType::HugeInt | LogicalType::UHugeInt | LogicalType::Uuid => {
            DataType::FixedSizeBinary(WIDE_VALUE_BYTES)
        }
        LogicalType::Float => DataType::Float32,
        LogicalType::Double => DataType::Float64,
        // Width and scale are validated to lie in 0..=38, so the cast is lossless.
        LogicalType::Decimal { width, scale } => DataType::Decimal128(*width, *scale as i8),
        LogicalType::Varchar => DataType::Utf8,
        LogicalType::Blob => DataType::Binary,
        LogicalType::Date => DataType::Date32,
        LogicalType::Time => DataType::Time64(TimeUnit::Microsecond),
        LogicalType::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, None),
        LogicalType::TimestampTz => {
            DataType::Timestamp(TimeUnit::Microsecond, Some(UTC_TIMEZONE.into()))
        }
        LogicalType::Interval => DataType::Interval(IntervalUnit::MonthDayNano),
        LogicalType::Enum(_) => {
            DataType::Dictionary(Box::new(DataType::UInt32), Box::new(DataType::Utf8))
        }
        LogicalType::List(child) => DataType::List(list_item_field(child)),
        LogicalType::Array { child, length } => {
            DataType::FixedSizeList(list_item_field(child), array_length(*length))
        }
        LogicalType::Struct(fields) => DataType::Struct(struct_fields(fields)),
        LogicalType::Map { key, value } => DataType::Map(map_entries_field(key, value), false),
    }
}

/// Arrow field for a column or child of type `ty`, tagged with extension
/// metadata where the data type alone is ambiguous.
pub fn field_for_logical_type(name: &str, ty: &LogicalType, nullable: bool) -> Field {
    let field = Field::new(name, data_type_for_logical_type(ty), nullable);
    let extension = match ty {
        LogicalType::HugeInt => Some((HUGEINT_EXTENSION, None)),
        LogicalType::UHugeInt => Some((UHUGEINT_EXTENSION, None)),
        LogicalType::Uuid => Some((UUID_EXTENSION, None)),
        LogicalType::Enum(entries) => Some((ENUM_EXTENSION, Some(enum_metadata(entries)))),
        _ => None,
    };
    match extension {
        Some((extension_name, extension_metadata)) => {
            let mut metadata = HashMap::new();
            metadata.insert(EXTENSION_NAME_KEY.to_string(), extension_name.to_string());
            if let Some(extension_metadata) = extension_metadata {
                metadata.insert(EXTENSION_METADATA_KEY.to_string(), extension_metadata);
            }
            field.with_metadata(metadata)
        }
        None => field,
    }
}

/// Child field of LIST and ARRAY types. Elements are always nullable.
pub fn list_item_field(child: &LogicalType) -> FieldRef {
    Arc::new(field_for_logical_type(LIST_ITEM_FIELD, child, true))
}

/// Entries field of a MAP type: a non-nullable struct of a non-nullable key and
/// a nullable value.
pub fn map_entries_field(key: &LogicalType, value: &LogicalType) -> FieldRef {
    let fields = Fields::from(vec![
        field_for_logical_type(MAP_KEY_FIELD, key, false),
        field_for_logical_type(MAP_VALUE_FIELD, value, true),
    ]);
    Arc::new(Field::new(MAP_ENTRIES_FIELD, DataType::Struct(fields), false))
}

pub fn struct_fields(fields: &[StructField]) -> Fields {
    fields
        .iter()
        .map(|field| field_for_logical_type(&field.name, &field.logical_type, field.nullable))
        .collect()
}

/// Whether `ty` may be used as a MAP key.
#[inline]
pub fn is_mappable_key(ty: &LogicalType) -> bool {
    ty.is_mappable_key()
}

fn enum_metadata(entries: &[String]) -> String {
    serde_json::Value::from(entries.to_vec()).to_string()
}

fn array_length(length: usize) -> i32 {
    i32::try_from(length).unwrap_or(i32::MAX)
}

fn unsupported(data_type: &DataType) -> Error {
    Error::UnsupportedType(data_type.to_string())
}

/// One resolved column of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub logical_type: LogicalType,
    pub nullable: bool,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, logical_type: LogicalType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            logical_type,
            nullable,
        }
    }

    pub fn to_field(&self) -> Field {
        field_for_logical_type(&self.name, &self.logical_type, self.nullable)
    }
}

/// Ordered column descriptors of one table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableSchema {
    columns: Vec<ColumnDescriptor>,
}

impl TableSchema {
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        Self { columns }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    #[inline]
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&ColumnDescriptor> {
        self.columns.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// Resolve every column of an engine schema.
///
/// The first column that cannot be resolved aborts the whole schema.
pub fn table_schema_from_arrow(schema: &Schema) -> Result<TableSchema> {
    let columns = schema
        .fields()
        .iter()
        .map(|field| {
            Ok(ColumnDescriptor {
                name: field.name().clone(),
                logical_type: logical_type_from_field(field)?,
                nullable: field.is_nullable(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(TableSchema::new(columns))
}

/// Engine schema used to export chunks of `table`.
pub fn arrow_schema_for_table(table: &TableSchema) -> SchemaRef {
    let fields: Vec<Field> = table.columns.iter().map(ColumnDescriptor::to_field).collect();
    Arc::new(Schema::new(fields))
}
