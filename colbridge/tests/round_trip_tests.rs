//! Rows appended through the appender and read back through the engine.

use std::sync::Arc;

use arrow::array::AsArray;
use arrow::datatypes::TimestampMicrosecondType;
use colbridge::types::{
    ColumnDescriptor, DecimalValue, IntervalValue, StructField, TableSchema,
    arrow_schema_for_table,
};
use colbridge::{Appender, Connection, Error, LogicalType, MemConnection, Value, scan_table};
use colbridge_test_utils::init_tracing_for_tests;
use time::UtcOffset;
use time::macros::{date, datetime, time};
use uuid::Uuid;

fn create(conn: &MemConnection, name: &str, columns: Vec<(&str, LogicalType)>) -> TableSchema {
    init_tracing_for_tests();
    let table = TableSchema::new(
        columns
            .into_iter()
            .map(|(column, ty)| ColumnDescriptor::new(column, ty, true))
            .collect(),
    );
    conn.create_table("main", name, arrow_schema_for_table(&table))
        .unwrap();
    table
}

fn append_all(conn: &Arc<MemConnection>, table: &str, rows: &[Vec<Value>]) -> Result<(), Error> {
    let mut appender = Appender::open(Arc::clone(conn), "main", table)?;
    for row in rows {
        appender.append_row(row)?;
    }
    appender.close()
}

fn read_all(conn: &MemConnection, table: &str) -> Vec<Vec<Value>> {
    scan_table(conn, "main", table).unwrap().rows().unwrap()
}

#[test]
fn every_type_survives_the_engine() {
    let point = LogicalType::structure(vec![
        StructField::new("x", LogicalType::Double),
        StructField::not_null("label", LogicalType::Varchar),
    ])
    .unwrap();
    let columns = vec![
        ("flag", LogicalType::Boolean, Value::Boolean(false)),
        ("tiny", LogicalType::TinyInt, Value::TinyInt(i8::MIN)),
        ("small", LogicalType::SmallInt, Value::SmallInt(-2)),
        ("int", LogicalType::Integer, Value::Integer(i32::MAX)),
        ("big", LogicalType::BigInt, Value::BigInt(9_000_000_000)),
        ("huge", LogicalType::HugeInt, Value::HugeInt(i128::MIN)),
        ("utiny", LogicalType::UTinyInt, Value::UTinyInt(7)),
        ("usmall", LogicalType::USmallInt, Value::USmallInt(9)),
        ("uint", LogicalType::UInteger, Value::UInteger(u32::MAX)),
        ("ubig", LogicalType::UBigInt, Value::UBigInt(1 << 63)),
        ("uhuge", LogicalType::UHugeInt, Value::UHugeInt(1 << 100)),
        ("float", LogicalType::Float, Value::Float(-0.5)),
        ("double", LogicalType::Double, Value::Double(1e300)),
        (
            "dec",
            LogicalType::decimal(12, 3).unwrap(),
            Value::Decimal("-123456789.012".parse().unwrap()),
        ),
        ("text", LogicalType::Varchar, Value::from("grüße")),
        ("blob", LogicalType::Blob, Value::Blob(vec![0xde, 0xad])),
        ("day", LogicalType::Date, Value::Date(date!(1900-03-01))),
        ("clock", LogicalType::Time, Value::Time(time!(00:00:00.000_001))),
        (
            "ts",
            LogicalType::Timestamp,
            Value::Timestamp(datetime!(1969-12-31 23:59:59.5)),
        ),
        (
            "tstz",
            LogicalType::TimestampTz,
            Value::TimestampTz(datetime!(2030-01-01 00:00:00 UTC)),
        ),
        (
            "span",
            LogicalType::Interval,
            Value::Interval(IntervalValue::new(-1, 2, -3)),
        ),
        ("id", LogicalType::Uuid, Value::Uuid(Uuid::from_u128(u128::MAX - 1))),
        (
            "mood",
            LogicalType::enumeration(["sad", "ok", "happy"]).unwrap(),
            Value::Enum("ok".into()),
        ),
        (
            "list",
            LogicalType::list(LogicalType::list(LogicalType::SmallInt)),
            Value::List(vec![
                Value::List(vec![Value::SmallInt(1)]),
                Value::Null,
                Value::List(vec![]),
            ]),
        ),
        (
            "point",
            point.clone(),
            Value::Struct(vec![
                ("label".into(), Value::from("p")),
                ("x".into(), Value::Double(2.0)),
            ]),
        ),
        (
            "lookup",
            LogicalType::map(LogicalType::Integer, LogicalType::list(point)).unwrap(),
            Value::Map(vec![
                (Value::Integer(1), Value::Null),
                (Value::Integer(2), Value::List(vec![])),
            ]),
        ),
        (
            "vec3",
            LogicalType::array(LogicalType::Float, 3).unwrap(),
            Value::List(vec![Value::Float(1.0), Value::Float(2.0), Value::Null]),
        ),
    ];

    let conn = Arc::new(MemConnection::new());
    create(
        &conn,
        "everything",
        columns.iter().map(|(name, ty, _)| (*name, ty.clone())).collect(),
    );
    let values: Vec<Value> = columns.iter().map(|(_, _, v)| v.clone()).collect();
    let nulls = vec![Value::Null; columns.len()];
    let rows = vec![values.clone(), nulls];
    append_all(&conn, "everything", &rows).unwrap();

    let mut read = read_all(&conn, "everything");
    // Struct fields come back in column order.
    let point_index = columns.iter().position(|(name, ..)| *name == "point").unwrap();
    assert_eq!(
        read[0][point_index],
        Value::Struct(vec![
            ("x".into(), Value::Double(2.0)),
            ("label".into(), Value::from("p")),
        ])
    );
    read[0][point_index] = values[point_index].clone();
    assert_eq!(read, rows);
}

#[test]
fn decimal_values_round_trip_or_fail_to_cast() {
    let conn = Arc::new(MemConnection::new());
    create(&conn, "prices", vec![("amount", LogicalType::decimal(9, 2).unwrap())]);
    create(&conn, "narrow", vec![("amount", LogicalType::decimal(5, 2).unwrap())]);

    let amount: DecimalValue = "12345.67".parse().unwrap();
    append_all(&conn, "prices", &[vec![Value::Decimal(amount)]]).unwrap();
    assert_eq!(read_all(&conn, "prices"), vec![vec![Value::Decimal(amount)]]);

    let err = append_all(&conn, "narrow", &[vec![Value::Decimal("123.456".parse().unwrap())]])
        .unwrap_err();
    assert!(matches!(err, Error::AppenderAppend(_)));
    assert!(matches!(err.root_cause(), Error::Cast { .. }));
    assert!(read_all(&conn, "narrow").is_empty());
}

#[test]
fn offset_timestamps_are_stored_as_utc() {
    let conn = Arc::new(MemConnection::new());
    create(&conn, "events", vec![("at", LogicalType::TimestampTz)]);
    append_all(
        &conn,
        "events",
        &[vec![Value::TimestampTz(datetime!(2021-06-01 10:00:00 +02:00))]],
    )
    .unwrap();

    let batches = conn.scan("main", "events").unwrap();
    let stored = batches[0]
        .column(0)
        .as_primitive::<TimestampMicrosecondType>()
        .value(0);
    assert_eq!(stored, 1_622_534_400_000_000);

    let rows = read_all(&conn, "events");
    let Value::TimestampTz(at) = rows[0][0] else {
        panic!("unexpected value {:?}", rows[0][0]);
    };
    assert_eq!(at, datetime!(2021-06-01 08:00:00 UTC));
    assert_eq!(at.offset(), UtcOffset::UTC);
}

#[test]
fn struct_missing_field_is_named() {
    let conn = Arc::new(MemConnection::new());
    let pair = LogicalType::structure(vec![
        StructField::new("a", LogicalType::Integer),
        StructField::new("b", LogicalType::Varchar),
    ])
    .unwrap();
    create(&conn, "pairs", vec![("p", pair)]);

    let row = vec![Value::Struct(vec![("a".into(), Value::Integer(1))])];
    let err = append_all(&conn, "pairs", &[row]).unwrap_err();
    match err.root_cause() {
        Error::StructField { expected, .. } => assert_eq!(expected, "b"),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn map_duplicates_pass_through() {
    let conn = Arc::new(MemConnection::new());
    create(
        &conn,
        "maps",
        vec![("m", LogicalType::map(LogicalType::Varchar, LogicalType::Integer).unwrap())],
    );
    let row = vec![Value::Map(vec![
        (Value::from("k"), Value::Integer(1)),
        (Value::from("k"), Value::Integer(2)),
        (Value::from("j"), Value::Null),
    ])];
    append_all(&conn, "maps", &[row.clone()]).unwrap();
    assert_eq!(read_all(&conn, "maps"), vec![row]);
}

#[test]
fn nested_not_null_violation_fails_the_flush() {
    let conn = Arc::new(MemConnection::new());
    let strict = LogicalType::structure(vec![StructField::not_null("id", LogicalType::Integer)])
        .unwrap();
    create(&conn, "strict", vec![("s", strict)]);

    let row = vec![Value::Struct(vec![("id".into(), Value::Null)])];
    let err = append_all(&conn, "strict", &[row]).unwrap_err();
    assert!(matches!(err, Error::AppenderClose(_)));
    assert!(matches!(err.root_cause(), Error::Arrow(_)));
    assert!(read_all(&conn, "strict").is_empty());
}

#[test]
fn rows_spanning_several_chunks_read_back_in_order() {
    let conn = Arc::new(MemConnection::new());
    create(&conn, "seq", vec![("n", LogicalType::UInteger)]);
    let count = colbridge::VECTOR_SIZE * 2 + 17;
    let rows: Vec<_> = (0..count as u32).map(|n| vec![Value::UInteger(n)]).collect();
    append_all(&conn, "seq", &rows).unwrap();

    let scan = scan_table(conn.as_ref(), "main", "seq").unwrap();
    assert_eq!(scan.row_count(), count);
    assert_eq!(scan.chunks().len(), 3);
    assert_eq!(scan.rows().unwrap(), rows);
}
