//! In-memory engine connection.
//!
//! Tables are Arrow schemas plus the batches appended to them. Appends are
//! validated the way the embedded engine validates them: the column set must
//! match the table, NOT NULL columns reject NULLs, and failures come back as raw
//! engine messages for [`classify`](colbridge_result::classify).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use arrow::array::Array;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use colbridge_result::{Error, Result, classify};
use colbridge_types::LogicalType;
use colbridge_vector::ColumnVector;
use rustc_hash::FxHashMap;

use crate::connection::Connection;

/// Schema used when a caller passes an empty schema name.
pub const DEFAULT_SCHEMA: &str = "main";

/// Counters for every call that reaches the engine.
#[derive(Debug, Default)]
pub struct EngineCallStats {
    pub resolve_calls: AtomicU64,
    pub allocate_calls: AtomicU64,
    pub append_calls: AtomicU64,
    pub scan_calls: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineCallStatsSnapshot {
    pub resolve_calls: u64,
    pub allocate_calls: u64,
    pub append_calls: u64,
    pub scan_calls: u64,
}

impl EngineCallStats {
    pub fn snapshot(&self) -> EngineCallStatsSnapshot {
        EngineCallStatsSnapshot {
            resolve_calls: self.resolve_calls.load(Ordering::Relaxed),
            allocate_calls: self.allocate_calls.load(Ordering::Relaxed),
            append_calls: self.append_calls.load(Ordering::Relaxed),
            scan_calls: self.scan_calls.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug)]
struct MemTable {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

#[derive(Debug)]
enum InjectedFailure {
    /// Returned directly from `append_chunk`.
    Message(String),
    /// `append_chunk` returns an empty message; the text is only available
    /// through `last_error_message`.
    LastError(String),
}

type TableKey = (String, String);

/// Thread-safe in-memory engine.
#[derive(Debug)]
pub struct MemConnection {
    tables: RwLock<FxHashMap<TableKey, MemTable>>,
    closed: AtomicBool,
    last_error: Mutex<String>,
    injected: Mutex<Option<InjectedFailure>>,
    stats: EngineCallStats,
}

impl Default for MemConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl MemConnection {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(FxHashMap::default()),
            closed: AtomicBool::new(false),
            last_error: Mutex::new(String::new()),
            injected: Mutex::new(None),
            stats: EngineCallStats::default(),
        }
    }

    /// Register `schema.table` with the given column layout.
    pub fn create_table(&self, schema: &str, table: &str, columns: SchemaRef) -> Result<()> {
        let key = table_key(schema, table);
        let mut tables = self
            .tables
            .write()
            .expect("MemConnection tables write lock poisoned");
        if tables.contains_key(&key) {
            return Err(Error::Engine(classify(format!(
                "Catalog Error: Table with name {table} already exists!"
            ))));
        }
        tables.insert(
            key,
            MemTable {
                schema: columns,
                batches: Vec::new(),
            },
        );
        Ok(())
    }

    /// Close the connection. Later engine calls fail.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn stats(&self) -> &EngineCallStats {
        &self.stats
    }

    /// Number of rows stored in `schema.table`.
    pub fn row_count(&self, schema: &str, table: &str) -> Result<usize> {
        let tables = self
            .tables
            .read()
            .expect("MemConnection tables read lock poisoned");
        let stored = tables
            .get(&table_key(schema, table))
            .ok_or_else(|| Error::Engine(classify(missing_table(table))))?;
        Ok(stored.batches.iter().map(RecordBatch::num_rows).sum())
    }

    /// Make the next `append_chunk` call fail with `message`.
    pub fn fail_next_append(&self, message: impl Into<String>) {
        *self
            .injected
            .lock()
            .expect("MemConnection injected failure lock poisoned") =
            Some(InjectedFailure::Message(message.into()));
    }

    /// Make the next `append_chunk` call fail with an empty message, leaving
    /// `message` in [`last_error_message`](Connection::last_error_message).
    pub fn fail_next_append_silently(&self, message: impl Into<String>) {
        *self
            .injected
            .lock()
            .expect("MemConnection injected failure lock poisoned") =
            Some(InjectedFailure::LastError(message.into()));
    }

    fn record_error(&self, message: String) -> String {
        *self
            .last_error
            .lock()
            .expect("MemConnection last error lock poisoned") = message.clone();
        message
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Engine(classify(self.record_error(
                "Connection Error: Connection already closed!".into(),
            ))));
        }
        Ok(())
    }

    fn store_batch(
        &self,
        schema: &str,
        table: &str,
        batch: RecordBatch,
    ) -> std::result::Result<(), String> {
        let mut tables = self
            .tables
            .write()
            .expect("MemConnection tables write lock poisoned");
        let stored = tables
            .get_mut(&table_key(schema, table))
            .ok_or_else(|| missing_table(table))?;

        let fields = stored.schema.fields();
        if batch.num_columns() != fields.len() {
            return Err(format!(
                "Invalid Input Error: table {table} has {} columns but {} values were supplied",
                fields.len(),
                batch.num_columns()
            ));
        }
        for (field, column) in fields.iter().zip(batch.columns()) {
            if field.data_type() != column.data_type() {
                return Err(format!(
                    "Conversion Error: column \"{}\" expects {}, got {}",
                    field.name(),
                    field.data_type(),
                    column.data_type()
                ));
            }
            if !field.is_nullable() && column.null_count() > 0 {
                return Err(format!(
                    "Constraint Error: NOT NULL constraint failed: {table}.{}",
                    field.name()
                ));
            }
        }

        let rows = batch.num_rows();
        let batch = RecordBatch::try_new(stored.schema.clone(), batch.columns().to_vec())
            .map_err(|e| format!("Invalid Input Error: {e}"))?;
        stored.batches.push(batch);
        tracing::trace!(schema, table, rows, "stored batch");
        Ok(())
    }
}

impl Connection for MemConnection {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn resolve_schema(&self, schema: &str, table: &str) -> Result<SchemaRef> {
        self.stats.resolve_calls.fetch_add(1, Ordering::Relaxed);
        self.check_open()?;
        let tables = self
            .tables
            .read()
            .expect("MemConnection tables read lock poisoned");
        match tables.get(&table_key(schema, table)) {
            Some(stored) => Ok(stored.schema.clone()),
            None => Err(Error::Engine(classify(self.record_error(missing_table(table))))),
        }
    }

    fn allocate_vector(&self, logical_type: &LogicalType, capacity: usize) -> Result<ColumnVector> {
        self.stats.allocate_calls.fetch_add(1, Ordering::Relaxed);
        self.check_open()?;
        Ok(ColumnVector::with_capacity(logical_type.clone(), capacity))
    }

    fn append_chunk(
        &self,
        schema: &str,
        table: &str,
        batch: RecordBatch,
    ) -> std::result::Result<(), String> {
        self.stats.append_calls.fetch_add(1, Ordering::Relaxed);
        if self.is_closed() {
            return Err(self.record_error("Connection Error: Connection already closed!".into()));
        }
        let injected = self
            .injected
            .lock()
            .expect("MemConnection injected failure lock poisoned")
            .take();
        match injected {
            Some(InjectedFailure::Message(message)) => return Err(self.record_error(message)),
            Some(InjectedFailure::LastError(message)) => {
                self.record_error(message);
                return Err(String::new());
            }
            None => {}
        }
        self.store_batch(schema, table, batch)
            .map_err(|message| self.record_error(message))
    }

    fn last_error_message(&self) -> String {
        self.last_error
            .lock()
            .expect("MemConnection last error lock poisoned")
            .clone()
    }

    fn scan(&self, schema: &str, table: &str) -> Result<Vec<RecordBatch>> {
        self.stats.scan_calls.fetch_add(1, Ordering::Relaxed);
        self.check_open()?;
        let tables = self
            .tables
            .read()
            .expect("MemConnection tables read lock poisoned");
        tables
            .get(&table_key(schema, table))
            .map(|stored| stored.batches.clone())
            .ok_or_else(|| Error::Engine(classify(self.record_error(missing_table(table)))))
    }
}

fn table_key(schema: &str, table: &str) -> TableKey {
    let schema = if schema.is_empty() { DEFAULT_SCHEMA } else { schema };
    (schema.to_string(), table.to_string())
}

fn missing_table(table: &str) -> String {
    format!("Catalog Error: Table with name {table} does not exist!")
}
