//! Resolution of engine schemas into column descriptors and back.

use std::collections::HashMap;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Fields, IntervalUnit, Schema, TimeUnit};
use colbridge_result::Error;
use colbridge_types::constants::{ENUM_EXTENSION, EXTENSION_METADATA_KEY, EXTENSION_NAME_KEY};
use colbridge_types::{
    ColumnDescriptor, LogicalType, StructField, TableSchema, arrow_schema_for_table,
    field_for_logical_type, logical_type_from_field, table_schema_from_arrow,
};

fn every_type() -> Vec<LogicalType> {
    let point = LogicalType::structure(vec![
        StructField::new("x", LogicalType::Double),
        StructField::not_null("label", LogicalType::Varchar),
    ])
    .unwrap();
    vec![
        LogicalType::Boolean,
        LogicalType::TinyInt,
        LogicalType::SmallInt,
        LogicalType::Integer,
        LogicalType::BigInt,
        LogicalType::HugeInt,
        LogicalType::UTinyInt,
        LogicalType::USmallInt,
        LogicalType::UInteger,
        LogicalType::UBigInt,
        LogicalType::UHugeInt,
        LogicalType::Float,
        LogicalType::Double,
        LogicalType::decimal(9, 2).unwrap(),
        LogicalType::decimal(38, 10).unwrap(),
        LogicalType::Varchar,
        LogicalType::Blob,
        LogicalType::Date,
        LogicalType::Time,
        LogicalType::Timestamp,
        LogicalType::TimestampTz,
        LogicalType::Interval,
        LogicalType::Uuid,
        LogicalType::enumeration(["sad", "ok", "happy"]).unwrap(),
        LogicalType::list(LogicalType::Integer),
        LogicalType::list(LogicalType::list(LogicalType::Uuid)),
        point.clone(),
        LogicalType::map(LogicalType::Varchar, point.clone()).unwrap(),
        LogicalType::array(LogicalType::enumeration(["a", "b"]).unwrap(), 3).unwrap(),
    ]
}

#[test]
fn every_descriptor_survives_the_registry() {
    let columns: Vec<ColumnDescriptor> = every_type()
        .into_iter()
        .enumerate()
        .map(|(idx, ty)| ColumnDescriptor::new(format!("c{idx}"), ty, idx % 2 == 0))
        .collect();
    let table = TableSchema::new(columns);

    let arrow_schema = arrow_schema_for_table(&table);
    let resolved = table_schema_from_arrow(&arrow_schema).expect("resolve");
    assert_eq!(resolved, table);
}

#[test]
fn native_mapping_matches_engine_layout() {
    let cases = [
        (LogicalType::Time, DataType::Time64(TimeUnit::Microsecond)),
        (LogicalType::Timestamp, DataType::Timestamp(TimeUnit::Microsecond, None)),
        (LogicalType::Interval, DataType::Interval(IntervalUnit::MonthDayNano)),
        (LogicalType::decimal(18, 3).unwrap(), DataType::Decimal128(18, 3)),
        (LogicalType::Uuid, DataType::FixedSizeBinary(16)),
    ];
    for (ty, expected) in cases {
        assert_eq!(field_for_logical_type("c", &ty, true).data_type(), &expected, "{ty}");
    }

    let map = LogicalType::map(LogicalType::Integer, LogicalType::Varchar).unwrap();
    let DataType::Map(entries, sorted) = field_for_logical_type("m", &map, true).data_type().clone()
    else {
        panic!("expected map data type");
    };
    assert!(!sorted);
    let DataType::Struct(kv) = entries.data_type() else {
        panic!("expected struct entries");
    };
    assert!(!kv[0].is_nullable());
    assert!(kv[1].is_nullable());
}

#[test]
fn map_with_nullable_struct_key_is_rejected() {
    let key = Field::new(
        "key",
        DataType::Struct(Fields::from(vec![
            Field::new("a", DataType::Int32, false),
            Field::new("b", DataType::Utf8, true),
        ])),
        false,
    );
    let entries = Field::new(
        "entries",
        DataType::Struct(Fields::from(vec![key, Field::new("value", DataType::Int64, true)])),
        false,
    );
    let schema = Schema::new(vec![
        Field::new("id", DataType::Int32, false),
        Field::new("m", DataType::Map(Arc::new(entries), false), true),
    ]);

    let err = table_schema_from_arrow(&schema).unwrap_err();
    match err {
        Error::UnsupportedMapKeyType(key) => {
            assert_eq!(key, "STRUCT(a INTEGER NOT NULL, b VARCHAR)")
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn list_keys_are_never_mappable() {
    let err = LogicalType::map(LogicalType::list(LogicalType::Integer), LogicalType::Integer)
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedMapKeyType(_)));
}

#[test]
fn unsupported_engine_types_name_the_type() {
    for data_type in [
        DataType::Float16,
        DataType::Utf8View,
        DataType::Timestamp(TimeUnit::Nanosecond, None),
        DataType::Time32(TimeUnit::Second),
        DataType::Duration(TimeUnit::Microsecond),
        DataType::Dictionary(Box::new(DataType::UInt32), Box::new(DataType::Utf8)),
    ] {
        let field = Field::new("c", data_type.clone(), true);
        match logical_type_from_field(&field) {
            Err(Error::UnsupportedType(name)) => assert_eq!(name, data_type.to_string()),
            other => panic!("{data_type}: unexpected {other:?}"),
        }
    }
}

#[test]
fn enum_dictionary_comes_from_metadata() {
    let metadata = HashMap::from([
        (EXTENSION_NAME_KEY.to_string(), ENUM_EXTENSION.to_string()),
        (EXTENSION_METADATA_KEY.to_string(), r#"["low","high"]"#.to_string()),
    ]);
    let field = Field::new(
        "level",
        DataType::Dictionary(Box::new(DataType::UInt32), Box::new(DataType::Utf8)),
        true,
    )
    .with_metadata(metadata);
    assert_eq!(
        logical_type_from_field(&field).unwrap(),
        LogicalType::Enum(vec!["low".into(), "high".into()])
    );
}
