use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::classify::EngineError;

/// Unified error type for all colbridge operations.
///
/// Each variant corresponds to one kind in the driver's closed error taxonomy.
/// Lifecycle variants wrap the error that caused them so callers can inspect the
/// originating failure with [`Error::root_cause`].
///
/// # Shared causes
///
/// Appender lifecycle wrappers hold their cause in an [`Arc`]. An appender that
/// becomes invalidated keeps a clone of the same cause and hands it out again
/// on every rejected call, so the original failure stays inspectable for the
/// lifetime of the handle.
#[derive(Error, Debug)]
pub enum Error {
    /// Arrow library error while exporting or importing columnar data.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Invalid configuration or API parameter.
    #[error("Invalid argument: {0}")]
    InvalidArgumentError(String),

    /// Violated internal invariant. Indicates a bug in colbridge, never bad input.
    #[error("An internal operation failed: {0}")]
    Internal(String),

    /// An engine type has no semantic counterpart in the type registry.
    #[error("unsupported data type: {0}")]
    UnsupportedType(String),

    /// An application value does not fit the declared target representation.
    #[error("cast error: cannot cast {actual} to {expected}")]
    Cast { actual: String, expected: String },

    /// A STRUCT value's field set does not match the descriptor.
    #[error("invalid STRUCT field: expected {expected}, got {actual}")]
    StructField { actual: String, expected: String },

    /// A MAP key type violates the mappable-key predicate.
    #[error("MAP key type not supported: {0}")]
    UnsupportedMapKeyType(String),

    /// A row carries a different number of values than the target has columns.
    #[error("invalid column count: expected {expected}, got {actual}")]
    ColumnCount { actual: usize, expected: usize },

    /// Failure while converting or writing a specific column of a row.
    #[error("{source}: column index: {index}")]
    Column { index: usize, source: Box<Error> },

    /// Attempt to address a row outside a vector's fixed capacity.
    #[error(
        "data chunks cannot exceed the internal vector size: row {row} is outside capacity {capacity}"
    )]
    VectorCapacity { row: usize, capacity: usize },

    #[error("could not create appender: {0}")]
    AppenderCreation(#[source] Arc<Error>),

    #[error("could not create appender: appender creation on a closed connection")]
    AppenderClosedConnection,

    #[error("could not append row: {0}")]
    AppenderAppend(#[source] Arc<Error>),

    #[error("could not append row: appender already closed")]
    AppenderAppendAfterClose,

    #[error("could not flush appender: {0}")]
    AppenderFlush(#[source] Arc<Error>),

    #[error("could not flush appender: appender already closed")]
    AppenderFlushAfterClose,

    #[error("could not close appender: {0}")]
    AppenderClose(#[source] Arc<Error>),

    #[error("could not close appender: already closed")]
    AppenderDoubleClose,

    /// Operation rejected because an earlier failure corrupted the appender's chunk.
    ///
    /// Holds the failure that triggered the invalidation when it is still known.
    #[error("{}", invalidated_message(.0))]
    InvalidatedAppender(Option<Arc<Error>>),

    /// Failure reported by the engine, classified by message prefix.
    #[error("engine error: {0}")]
    Engine(EngineError),
}

impl Error {
    /// Create a cast error from the description of the offending value and the
    /// expected target type.
    ///
    /// # Examples
    ///
    /// ```
    /// use colbridge_result::Error;
    ///
    /// let err = Error::cast("BIGINT", "TINYINT");
    /// assert_eq!(err.to_string(), "cast error: cannot cast BIGINT to TINYINT");
    /// ```
    #[inline]
    pub fn cast(actual: impl fmt::Display, expected: impl fmt::Display) -> Self {
        Error::Cast {
            actual: actual.to_string(),
            expected: expected.to_string(),
        }
    }

    /// Create a STRUCT field mismatch error.
    #[inline]
    pub fn struct_field(actual: impl fmt::Display, expected: impl fmt::Display) -> Self {
        Error::StructField {
            actual: actual.to_string(),
            expected: expected.to_string(),
        }
    }

    /// Attach the column index to an error raised while handling that column.
    #[inline]
    pub fn column(index: usize, source: Error) -> Self {
        Error::Column {
            index,
            source: Box::new(source),
        }
    }

    /// Walk lifecycle and column wrappers down to the error that started the chain.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use colbridge_result::Error;
    ///
    /// let err = Error::AppenderAppend(Arc::new(Error::column(1, Error::cast("VARCHAR", "INTEGER"))));
    /// assert!(matches!(err.root_cause(), Error::Cast { .. }));
    /// ```
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Column { source, .. } => source.root_cause(),
            Error::AppenderCreation(cause)
            | Error::AppenderAppend(cause)
            | Error::AppenderFlush(cause)
            | Error::AppenderClose(cause)
            | Error::InvalidatedAppender(Some(cause)) => cause.root_cause(),
            other => other,
        }
    }

    /// The classified engine error at the root of this error, if any.
    pub fn engine_error(&self) -> Option<&EngineError> {
        match self.root_cause() {
            Error::Engine(err) => Some(err),
            _ => None,
        }
    }

    /// Whether this error, or an error it wraps, reports an invalidated appender.
    pub fn is_invalidated_appender(&self) -> bool {
        match self {
            Error::InvalidatedAppender(_) => true,
            Error::AppenderClose(cause) => cause.is_invalidated_appender(),
            _ => false,
        }
    }
}

fn invalidated_message(cause: &Option<Arc<Error>>) -> InvalidatedMessage<'_> {
    InvalidatedMessage(cause.as_deref())
}

struct InvalidatedMessage<'a>(Option<&'a Error>);

impl fmt::Display for InvalidatedMessage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const MSG: &str = "appended data has been invalidated due to corrupt row";
        match self.0 {
            Some(cause) => write!(f, "{cause}: {MSG}"),
            None => f.write_str(MSG),
        }
    }
}

impl From<EngineError> for Error {
    fn from(err: EngineError) -> Self {
        Error::Engine(err)
    }
}
