//! Error types, the result alias, and engine error classification for colbridge.
//!
//! Every colbridge crate returns [`Result<T>`], whose error variant is the single
//! workspace-wide [`Error`] enum. Failures reported by the embedded engine arrive as
//! raw strings and are turned into an [`EngineError`] by [`classify`], which tags the
//! message with an [`EngineErrorKind`] for programmatic matching while keeping the
//! message itself verbatim for humans.
//!
//! # Error Categories
//!
//! - **Type mapping** ([`Error::UnsupportedType`], [`Error::UnsupportedMapKeyType`]):
//!   an engine type has no semantic counterpart, or a MAP key type is not allowed.
//! - **Value conversion** ([`Error::Cast`], [`Error::StructField`],
//!   [`Error::ColumnCount`], [`Error::Column`]): an application value does not fit
//!   its column.
//! - **Vector addressing** ([`Error::VectorCapacity`]): a write outside the chunk
//!   capacity. Always an internal defect.
//! - **Appender lifecycle** ([`Error::AppenderCreation`], [`Error::AppenderAppend`],
//!   [`Error::AppenderFlush`], [`Error::AppenderClose`], [`Error::AppenderDoubleClose`],
//!   [`Error::InvalidatedAppender`], ...).
//! - **Engine** ([`Error::Engine`]): a classified engine failure.

#![forbid(unsafe_code)]

pub mod classify;
pub mod error;
pub mod result;

pub use classify::{EngineError, EngineErrorKind, classify};
pub use error::Error;
pub use result::Result;
