//! Appender lifecycle.
//!
//! ```text
//!            append_row / flush
//!              ┌─────┐
//!              ▼     │
//! open ──▶  Open ────┘ ──── close ────▶ Closed
//!             │
//!             │ any failure
//!             ▼
//!        Invalidated
//! ```
//!
//! Both `Invalidated` and `Closed` are terminal. Closing an invalidated appender
//! releases its buffers but leaves it `Invalidated`. Operations rejected in
//! either state never reach the engine.

use std::sync::Arc;

use colbridge_result::{Error, Result};
use colbridge_types::{TableSchema, Value};

use crate::chunk_manager::ChunkManager;
use crate::config::AppenderConfig;
use crate::connection::Connection;

/// Observable appender state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppenderState {
    Open,
    /// An append or flush failed. Only `close` is still meaningful, and it
    /// does not leave this state.
    Invalidated,
    Closed,
}

#[derive(Debug)]
enum Lifecycle {
    Open,
    Invalidated { cause: Arc<Error>, released: bool },
    Closed,
}

/// Bulk row writer for a single table.
///
/// Rows are converted into engine-native column vectors and handed to the
/// engine one chunk at a time. The first failed append or flush invalidates the
/// appender; the rows buffered at that point are never delivered.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use arrow::datatypes::{DataType, Field, Schema};
/// use colbridge_appender::{Appender, MemConnection};
/// use colbridge_types::Value;
///
/// let conn = Arc::new(MemConnection::new());
/// conn.create_table(
///     "main",
///     "events",
///     Arc::new(Schema::new(vec![Field::new("id", DataType::Int64, false)])),
/// )?;
///
/// let mut appender = Appender::open(Arc::clone(&conn), "main", "events")?;
/// appender.append_row(&[Value::BigInt(1)])?;
/// appender.append_row(&[Value::BigInt(2)])?;
/// appender.close()?;
///
/// assert_eq!(conn.row_count("main", "events")?, 2);
/// # Ok::<(), colbridge_result::Error>(())
/// ```
#[derive(Debug)]
pub struct Appender<C: Connection> {
    conn: Arc<C>,
    chunks: ChunkManager,
    lifecycle: Lifecycle,
}

impl<C: Connection> Appender<C> {
    /// Open an appender on `schema.table` with the default configuration.
    pub fn open(conn: Arc<C>, schema: &str, table: &str) -> Result<Self> {
        Self::open_with_config(conn, schema, table, AppenderConfig::default())
    }

    pub fn open_with_config(
        conn: Arc<C>,
        schema: &str,
        table: &str,
        config: AppenderConfig,
    ) -> Result<Self> {
        if conn.is_closed() {
            return Err(Error::AppenderClosedConnection);
        }
        let chunks = ChunkManager::new(conn.as_ref(), schema, table, &config)
            .map_err(|err| Error::AppenderCreation(Arc::new(err)))?;
        tracing::debug!(
            schema,
            table,
            columns = chunks.table().len(),
            capacity = chunks.capacity(),
            "appender opened"
        );
        Ok(Self {
            conn,
            chunks,
            lifecycle: Lifecycle::Open,
        })
    }

    pub fn state(&self) -> AppenderState {
        match self.lifecycle {
            Lifecycle::Open => AppenderState::Open,
            Lifecycle::Invalidated { .. } => AppenderState::Invalidated,
            Lifecycle::Closed => AppenderState::Closed,
        }
    }

    /// Whether `append_row` and `flush` are currently permitted.
    pub fn is_usable(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Open)
    }

    /// The failure that invalidated this appender, if any.
    pub fn invalidation_cause(&self) -> Option<&Error> {
        match &self.lifecycle {
            Lifecycle::Invalidated { cause, .. } => Some(cause),
            _ => None,
        }
    }

    /// Column layout of the target table.
    pub fn schema(&self) -> &TableSchema {
        self.chunks.table()
    }

    /// Rows buffered in the current chunk.
    pub fn rows_in_chunk(&self) -> usize {
        self.chunks.rows_in_chunk()
    }

    pub fn rows_appended(&self) -> u64 {
        self.chunks.rows_appended()
    }

    pub fn rows_flushed(&self) -> u64 {
        self.chunks.rows_flushed()
    }

    pub fn flush_count(&self) -> u64 {
        self.chunks.flush_count()
    }

    /// Append one row. `values` must hold one value per column, in column order.
    pub fn append_row(&mut self, values: &[Value]) -> Result<()> {
        self.ensure_open(Error::AppenderAppendAfterClose)?;
        self.chunks
            .append_row(self.conn.as_ref(), values)
            .map_err(|err| Error::AppenderAppend(self.invalidate(err)))
    }

    /// Deliver the buffered rows to the engine now.
    pub fn flush(&mut self) -> Result<()> {
        self.ensure_open(Error::AppenderFlushAfterClose)?;
        self.chunks
            .flush(self.conn.as_ref())
            .map_err(|err| Error::AppenderFlush(self.invalidate(err)))
    }

    /// Flush the remaining rows and release the appender's buffers.
    ///
    /// An open appender is `Closed` afterwards whatever the outcome. An
    /// invalidated one stays `Invalidated`.
    pub fn close(&mut self) -> Result<()> {
        match &mut self.lifecycle {
            Lifecycle::Closed
            | Lifecycle::Invalidated {
                released: true, ..
            } => Err(Error::AppenderDoubleClose),
            Lifecycle::Invalidated { cause, released } => {
                *released = true;
                let cause = Arc::clone(cause);
                let discarded = self.chunks.release();
                tracing::debug!(discarded, "released invalidated appender");
                Err(Error::AppenderClose(Arc::new(Error::InvalidatedAppender(
                    Some(cause),
                ))))
            }
            Lifecycle::Open => {
                self.lifecycle = Lifecycle::Closed;
                let flushed = self.chunks.flush(self.conn.as_ref());
                let discarded = self.chunks.release();
                match flushed {
                    Ok(()) => {
                        tracing::debug!(
                            rows_flushed = self.chunks.rows_flushed(),
                            flushes = self.chunks.flush_count(),
                            "appender closed"
                        );
                        Ok(())
                    }
                    Err(err) => {
                        tracing::warn!(discarded, error = %err, "appender close failed to flush");
                        Err(Error::AppenderClose(Arc::new(err)))
                    }
                }
            }
        }
    }

    fn ensure_open(&self, after_close: Error) -> Result<()> {
        match &self.lifecycle {
            Lifecycle::Open => Ok(()),
            Lifecycle::Invalidated { cause, .. } => {
                Err(Error::InvalidatedAppender(Some(Arc::clone(cause))))
            }
            Lifecycle::Closed => Err(after_close),
        }
    }

    fn invalidate(&mut self, err: Error) -> Arc<Error> {
        let cause = Arc::new(err);
        tracing::warn!(
            error = %cause,
            buffered = self.chunks.rows_in_chunk(),
            "appender invalidated"
        );
        self.lifecycle = Lifecycle::Invalidated {
            cause: Arc::clone(&cause),
            released: false,
        };
        cause
    }
}

impl<C: Connection> Drop for Appender<C> {
    fn drop(&mut self) {
        if let Lifecycle::Open = self.lifecycle {
            let discarded = self.chunks.release();
            tracing::warn!(discarded, "appender dropped without close; buffered rows discarded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use arrow::datatypes::{DataType, Field, Schema};

    use crate::mem_connection::MemConnection;

    fn connection() -> Arc<MemConnection> {
        let conn = Arc::new(MemConnection::new());
        conn.create_table(
            "main",
            "t",
            Arc::new(Schema::new(vec![Field::new("v", DataType::Int32, true)])),
        )
        .unwrap();
        conn
    }

    #[test]
    fn appender_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Appender<MemConnection>>();
    }

    #[test]
    fn failure_keeps_shared_cause() {
        let conn = connection();
        let mut appender = Appender::open(conn, "main", "t").unwrap();
        let err = appender.append_row(&[Value::from("nope")]).unwrap_err();
        let Error::AppenderAppend(cause) = err else {
            panic!("unexpected error {err:?}");
        };
        assert_eq!(appender.state(), AppenderState::Invalidated);
        assert!(!appender.is_usable());
        assert!(std::ptr::eq(appender.invalidation_cause().unwrap(), cause.as_ref()));

        match appender.flush().unwrap_err() {
            Error::InvalidatedAppender(Some(again)) => assert!(Arc::ptr_eq(&again, &cause)),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn close_keeps_invalidated_state() {
        let conn = connection();
        let mut appender = Appender::open(Arc::clone(&conn), "main", "t").unwrap();
        appender.append_row(&[Value::Integer(1)]).unwrap();
        appender.append_row(&[Value::from("nope")]).unwrap_err();
        assert_eq!(appender.rows_in_chunk(), 1);

        let err = appender.close().unwrap_err();
        assert!(err.is_invalidated_appender());
        assert_eq!(appender.state(), AppenderState::Invalidated);
        assert_eq!(appender.rows_in_chunk(), 0);
        assert!(appender.invalidation_cause().is_some());

        assert!(matches!(appender.close(), Err(Error::AppenderDoubleClose)));
        assert_eq!(appender.state(), AppenderState::Invalidated);
        assert!(appender.append_row(&[Value::Integer(2)]).unwrap_err().is_invalidated_appender());
        assert_eq!(conn.stats().snapshot().append_calls, 0);
    }

    #[test]
    fn drop_without_close_discards_rows() {
        let conn = connection();
        {
            let mut appender = Appender::open(Arc::clone(&conn), "main", "t").unwrap();
            appender.append_row(&[Value::Integer(1)]).unwrap();
        }
        assert_eq!(conn.stats().snapshot().append_calls, 0);
        assert_eq!(conn.row_count("main", "t").unwrap(), 0);
    }
}
