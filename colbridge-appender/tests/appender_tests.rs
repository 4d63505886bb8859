//! Appender lifecycle against the in-memory engine.

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Fields, Schema, TimeUnit};
use colbridge_appender::{
    Appender, AppenderConfig, AppenderState, Connection, MemConnection, scan_table,
};
use colbridge_result::{EngineErrorKind, Error};
use colbridge_test_utils::init_tracing_for_tests;
use colbridge_types::{VECTOR_SIZE, Value};
use time::macros::datetime;

fn connection_with(columns: Vec<Field>) -> Arc<MemConnection> {
    init_tracing_for_tests();
    let conn = Arc::new(MemConnection::new());
    conn.create_table("main", "t", Arc::new(Schema::new(columns)))
        .unwrap();
    conn
}

fn int_pair_table() -> Arc<MemConnection> {
    connection_with(vec![
        Field::new("a", DataType::Int32, true),
        Field::new("b", DataType::Int32, true),
    ])
}

#[test]
fn one_flush_after_vector_size_rows() {
    let conn = connection_with(vec![Field::new("v", DataType::Int64, false)]);
    let mut appender = Appender::open(Arc::clone(&conn), "main", "t").unwrap();

    for row in 0..VECTOR_SIZE as i64 {
        appender.append_row(&[Value::BigInt(row)]).unwrap();
    }
    assert_eq!(appender.flush_count(), 1);
    assert_eq!(appender.rows_in_chunk(), 0);
    assert_eq!(conn.stats().snapshot().append_calls, 1);

    appender.append_row(&[Value::BigInt(-1)]).unwrap();
    assert_eq!(appender.flush_count(), 1);
    assert_eq!(appender.rows_in_chunk(), 1);
    assert_eq!(appender.rows_appended(), VECTOR_SIZE as u64 + 1);
    assert_eq!(appender.rows_flushed(), VECTOR_SIZE as u64);

    appender.close().unwrap();
    assert_eq!(conn.row_count("main", "t").unwrap(), VECTOR_SIZE + 1);
    assert_eq!(conn.stats().snapshot().append_calls, 2);
}

#[test]
fn mid_row_failure_invalidates_without_engine_calls() {
    let conn = int_pair_table();
    let mut appender = Appender::open(Arc::clone(&conn), "main", "t").unwrap();
    appender
        .append_row(&[Value::Integer(1), Value::Integer(2)])
        .unwrap();

    let err = appender
        .append_row(&[Value::Integer(3), Value::from("four")])
        .unwrap_err();
    match &err {
        Error::AppenderAppend(cause) => assert!(matches!(
            cause.as_ref(),
            Error::Column { index: 1, source } if matches!(**source, Error::Cast { .. })
        )),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(appender.state(), AppenderState::Invalidated);
    assert!(!appender.is_usable());

    let calls = conn.stats().snapshot();
    let err = appender
        .append_row(&[Value::Integer(5), Value::Integer(6)])
        .unwrap_err();
    assert!(err.is_invalidated_appender());
    assert!(matches!(err.root_cause(), Error::Cast { .. }));
    assert!(err.to_string().ends_with("appended data has been invalidated due to corrupt row"));
    assert!(appender.flush().unwrap_err().is_invalidated_appender());

    let err = appender.close().unwrap_err();
    assert!(matches!(err, Error::AppenderClose(_)));
    assert!(err.is_invalidated_appender());
    assert_eq!(appender.state(), AppenderState::Invalidated);
    assert!(matches!(appender.close(), Err(Error::AppenderDoubleClose)));
    assert_eq!(appender.state(), AppenderState::Invalidated);

    assert_eq!(conn.stats().snapshot(), calls);
    assert_eq!(conn.row_count("main", "t").unwrap(), 0);
}

#[test]
fn wrong_column_count_invalidates() {
    let conn = int_pair_table();
    let mut appender = Appender::open(conn, "main", "t").unwrap();
    let err = appender.append_row(&[Value::Integer(1)]).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        Error::ColumnCount {
            actual: 1,
            expected: 2
        }
    ));
    assert_eq!(appender.state(), AppenderState::Invalidated);
}

#[test]
fn double_close_is_reported() {
    let conn = int_pair_table();

    let mut empty = Appender::open(Arc::clone(&conn), "main", "t").unwrap();
    empty.close().unwrap();
    assert!(matches!(empty.close(), Err(Error::AppenderDoubleClose)));

    let mut filled = Appender::open(Arc::clone(&conn), "main", "t").unwrap();
    filled
        .append_row(&[Value::Integer(1), Value::Null])
        .unwrap();
    filled.close().unwrap();
    assert_eq!(filled.state(), AppenderState::Closed);
    assert!(matches!(filled.close(), Err(Error::AppenderDoubleClose)));

    assert_eq!(conn.row_count("main", "t").unwrap(), 1);
}

#[test]
fn closed_appender_rejects_everything() {
    let conn = int_pair_table();
    let mut appender = Appender::open(Arc::clone(&conn), "main", "t").unwrap();
    appender.close().unwrap();
    let calls = conn.stats().snapshot();

    assert!(matches!(
        appender.append_row(&[Value::Integer(1), Value::Integer(2)]),
        Err(Error::AppenderAppendAfterClose)
    ));
    assert!(matches!(appender.flush(), Err(Error::AppenderFlushAfterClose)));
    assert_eq!(conn.stats().snapshot(), calls);
}

#[test]
fn not_null_violation_surfaces_as_constraint_error() {
    let conn = connection_with(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("note", DataType::Utf8, true),
    ]);
    let mut appender = Appender::open(Arc::clone(&conn), "main", "t").unwrap();
    appender
        .append_row(&[Value::Null, Value::from("orphan")])
        .unwrap();

    let err = appender.flush().unwrap_err();
    assert!(matches!(err, Error::AppenderFlush(_)));
    let engine = err.engine_error().unwrap();
    assert_eq!(engine.kind(), EngineErrorKind::Constraint);
    assert_eq!(
        engine.message(),
        "Constraint Error: NOT NULL constraint failed: t.id"
    );
    assert_eq!(appender.state(), AppenderState::Invalidated);
    assert_eq!(appender.rows_in_chunk(), 1);
    assert_eq!(conn.row_count("main", "t").unwrap(), 0);
}

#[test]
fn failed_flush_during_close_still_closes() {
    let conn = int_pair_table();
    let mut appender = Appender::open(Arc::clone(&conn), "main", "t").unwrap();
    appender
        .append_row(&[Value::Integer(1), Value::Integer(2)])
        .unwrap();
    conn.fail_next_append("IO Error: could not write to file");

    let err = appender.close().unwrap_err();
    assert!(matches!(err, Error::AppenderClose(_)));
    assert_eq!(err.engine_error().unwrap().kind(), EngineErrorKind::Io);
    assert_eq!(appender.state(), AppenderState::Closed);
    assert_eq!(appender.rows_in_chunk(), 0);
    assert!(matches!(appender.close(), Err(Error::AppenderDoubleClose)));
}

#[test]
fn empty_flush_makes_no_engine_call() {
    let conn = int_pair_table();
    let mut appender = Appender::open(Arc::clone(&conn), "main", "t").unwrap();
    appender.flush().unwrap();
    appender.close().unwrap();
    assert_eq!(conn.stats().snapshot().append_calls, 0);
    assert_eq!(appender.flush_count(), 0);
}

#[test]
fn configured_capacity_triggers_auto_flush() {
    let conn = int_pair_table();
    let config = AppenderConfig::default().with_chunk_capacity(3);
    let mut appender = Appender::open_with_config(Arc::clone(&conn), "main", "t", config).unwrap();
    for row in 0..7 {
        appender
            .append_row(&[Value::Integer(row), Value::Integer(row * 10)])
            .unwrap();
    }
    assert_eq!(appender.flush_count(), 2);
    assert_eq!(appender.rows_in_chunk(), 1);
    appender.close().unwrap();

    let rows = scan_table(conn.as_ref(), "main", "t").unwrap().rows().unwrap();
    let expected: Vec<_> = (0..7)
        .map(|row| vec![Value::Integer(row), Value::Integer(row * 10)])
        .collect();
    assert_eq!(rows, expected);
}

#[test]
fn creation_failures() {
    let conn = int_pair_table();

    let err = Appender::open(Arc::clone(&conn), "main", "missing").unwrap_err();
    assert!(matches!(err, Error::AppenderCreation(_)));
    assert_eq!(err.engine_error().unwrap().kind(), EngineErrorKind::Catalog);

    let config = AppenderConfig::default().with_chunk_capacity(0);
    let err = Appender::open_with_config(Arc::clone(&conn), "main", "t", config).unwrap_err();
    assert!(matches!(err.root_cause(), Error::InvalidArgumentError(_)));

    conn.close();
    assert!(matches!(
        Appender::open(conn, "main", "t"),
        Err(Error::AppenderClosedConnection)
    ));
}

#[test]
fn unmappable_map_key_fails_before_any_row() {
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
        DataType::Struct(Fields::from(vec![key, Field::new("value", DataType::Int32, true)])),
        false,
    );
    let conn = connection_with(vec![Field::new(
        "m",
        DataType::Map(Arc::new(entries), false),
        true,
    )]);

    let err = Appender::open(Arc::clone(&conn), "main", "t").unwrap_err();
    assert!(matches!(err, Error::AppenderCreation(_)));
    assert!(matches!(err.root_cause(), Error::UnsupportedMapKeyType(_)));
    assert_eq!(conn.stats().snapshot().append_calls, 0);
}

#[test]
fn unsupported_column_type_fails_creation() {
    let conn = connection_with(vec![Field::new("f", DataType::Float16, true)]);
    let err = Appender::open(conn, "main", "t").unwrap_err();
    assert!(matches!(err.root_cause(), Error::UnsupportedType(_)));
}

fn round_trip(conn: &Arc<MemConnection>, rows: &[Vec<Value>]) -> Vec<Vec<Value>> {
    let mut appender = Appender::open(Arc::clone(conn), "main", "t").unwrap();
    for row in rows {
        appender.append_row(row).unwrap();
    }
    appender.close().unwrap();
    scan_table(conn.as_ref(), "main", "t").unwrap().rows().unwrap()
}

#[test]
fn map_with_keys_values_children_accepts_rows() {
    let entries = Field::new(
        "entries",
        DataType::Struct(Fields::from(vec![
            Field::new("keys", DataType::Utf8, false),
            Field::new("values", DataType::Int32, true),
        ])),
        false,
    );
    let conn = connection_with(vec![Field::new(
        "m",
        DataType::Map(Arc::new(entries), false),
        true,
    )]);
    let rows = vec![
        vec![Value::Map(vec![
            (Value::from("a"), Value::Integer(1)),
            (Value::from("b"), Value::Null),
        ])],
        vec![Value::Null],
    ];
    assert_eq!(round_trip(&conn, &rows), rows);
}

#[test]
fn list_with_element_child_accepts_rows() {
    let conn = connection_with(vec![Field::new(
        "l",
        DataType::List(Arc::new(Field::new("element", DataType::Int64, true))),
        true,
    )]);
    let rows = vec![
        vec![Value::List(vec![Value::BigInt(1), Value::Null])],
        vec![Value::Null],
        vec![Value::List(vec![])],
    ];
    assert_eq!(round_trip(&conn, &rows), rows);
}

#[test]
fn zoned_timestamp_column_keeps_engine_zone() {
    let zoned = DataType::Timestamp(TimeUnit::Microsecond, Some("+02:00".into()));
    let conn = connection_with(vec![Field::new("at", zoned.clone(), true)]);
    let at = datetime!(2021-06-01 10:00:00 +02:00);
    let rows = vec![vec![Value::TimestampTz(at)], vec![Value::Null]];

    let read = round_trip(&conn, &rows);
    assert_eq!(read, rows);
    assert_eq!(conn.scan("main", "t").unwrap()[0].column(0).data_type(), &zoned);
}

#[test]
fn null_only_rows_flush_into_renamed_children() {
    let conn = connection_with(vec![Field::new(
        "l",
        DataType::List(Arc::new(Field::new("element", DataType::Utf8, true))),
        true,
    )]);
    let rows = vec![vec![Value::Null]; 3];
    assert_eq!(round_trip(&conn, &rows), rows);
}
