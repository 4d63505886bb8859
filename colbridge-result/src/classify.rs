//! Classification of raw engine error messages.
//!
//! The engine reports failures as plain strings of the form
//! `"<Category> Error: <detail>"`. [`classify`] matches the longest known category
//! prefix against the start of the message and tags the message with the
//! corresponding [`EngineErrorKind`]. Messages without a known prefix are
//! [`EngineErrorKind::Unknown`].

use std::fmt;
use std::hash::{Hash, Hasher};

/// Closed set of engine error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineErrorKind {
    Invalid,
    OutOfRange,
    Conversion,
    UnknownType,
    Decimal,
    MismatchType,
    DivideByZero,
    ObjectSize,
    InvalidType,
    Serialization,
    Transaction,
    NotImplemented,
    Expression,
    Catalog,
    Parser,
    Planner,
    Scheduler,
    Executor,
    Constraint,
    Index,
    Stat,
    Connection,
    Syntax,
    Settings,
    Binder,
    Network,
    Optimizer,
    NullPointer,
    Io,
    Interrupt,
    /// Non-recoverable; the database is left unusable.
    Fatal,
    /// Engine-side bug.
    Internal,
    InvalidInput,
    OutOfMemory,
    Permission,
    ParameterNotResolved,
    ParameterNotAllowed,
    Dependency,
    Http,
    MissingExtension,
    AutoLoad,
    Sequence,
    /// No known category prefix matched.
    Unknown,
}

/// Category prefixes as they appear in engine messages, without the trailing
/// `" Error"`.
static ERROR_PREFIXES: [(EngineErrorKind, &str); 42] = [
    (EngineErrorKind::Invalid, "Invalid"),
    (EngineErrorKind::OutOfRange, "Out of Range"),
    (EngineErrorKind::Conversion, "Conversion"),
    (EngineErrorKind::UnknownType, "Unknown Type"),
    (EngineErrorKind::Decimal, "Decimal"),
    (EngineErrorKind::MismatchType, "Mismatch Type"),
    (EngineErrorKind::DivideByZero, "Divide by Zero"),
    (EngineErrorKind::ObjectSize, "Object Size"),
    (EngineErrorKind::InvalidType, "Invalid type"),
    (EngineErrorKind::Serialization, "Serialization"),
    (EngineErrorKind::Transaction, "TransactionContext"),
    (EngineErrorKind::NotImplemented, "Not implemented"),
    (EngineErrorKind::Expression, "Expression"),
    (EngineErrorKind::Catalog, "Catalog"),
    (EngineErrorKind::Parser, "Parser"),
    (EngineErrorKind::Planner, "Planner"),
    (EngineErrorKind::Scheduler, "Scheduler"),
    (EngineErrorKind::Executor, "Executor"),
    (EngineErrorKind::Constraint, "Constraint"),
    (EngineErrorKind::Index, "Index"),
    (EngineErrorKind::Stat, "Stat"),
    (EngineErrorKind::Connection, "Connection"),
    (EngineErrorKind::Syntax, "Syntax"),
    (EngineErrorKind::Settings, "Settings"),
    (EngineErrorKind::Binder, "Binder"),
    (EngineErrorKind::Network, "Network"),
    (EngineErrorKind::Optimizer, "Optimizer"),
    (EngineErrorKind::NullPointer, "NullPointer"),
    (EngineErrorKind::Io, "IO"),
    (EngineErrorKind::Interrupt, "INTERRUPT"),
    (EngineErrorKind::Fatal, "FATAL"),
    (EngineErrorKind::Internal, "INTERNAL"),
    (EngineErrorKind::InvalidInput, "Invalid Input"),
    (EngineErrorKind::OutOfMemory, "Out of Memory"),
    (EngineErrorKind::Permission, "Permission"),
    (EngineErrorKind::ParameterNotResolved, "Parameter Not Resolved"),
    (EngineErrorKind::ParameterNotAllowed, "Parameter Not Allowed"),
    (EngineErrorKind::Dependency, "Dependency"),
    (EngineErrorKind::Http, "HTTP"),
    (EngineErrorKind::MissingExtension, "Missing Extension"),
    (EngineErrorKind::AutoLoad, "Extension Autoloading"),
    (EngineErrorKind::Sequence, "Sequence"),
];

const ERROR_SUFFIX: &str = " Error";

impl EngineErrorKind {
    /// The message prefix for this kind (e.g. `"Constraint"`), or `None` for
    /// [`EngineErrorKind::Unknown`].
    pub fn prefix(self) -> Option<&'static str> {
        ERROR_PREFIXES
            .iter()
            .find(|(kind, _)| *kind == self)
            .map(|(_, prefix)| *prefix)
    }
}

/// A raw engine error message tagged with its category.
///
/// Two engine errors are equal exactly when their messages are equal; the kind
/// is informational and does not take part in equality.
#[derive(Debug, Clone, Eq)]
pub struct EngineError {
    kind: EngineErrorKind,
    message: String,
}

impl EngineError {
    #[inline]
    pub fn kind(&self) -> EngineErrorKind {
        self.kind
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message
    }
}

impl Hash for EngineError {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.message.hash(state);
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for EngineError {}

/// Classify a raw engine message by its longest matching category prefix.
///
/// # Examples
///
/// ```
/// use colbridge_result::{EngineErrorKind, classify};
///
/// let err = classify("Constraint Error: NOT NULL constraint failed: people.name");
/// assert_eq!(err.kind(), EngineErrorKind::Constraint);
/// assert_eq!(err.message(), "Constraint Error: NOT NULL constraint failed: people.name");
///
/// assert_eq!(classify("disk on fire").kind(), EngineErrorKind::Unknown);
/// ```
pub fn classify(raw: impl Into<String>) -> EngineError {
    let message = raw.into();
    let kind = ERROR_PREFIXES
        .iter()
        .filter(|(_, prefix)| {
            message
                .strip_prefix(*prefix)
                .is_some_and(|rest| rest.starts_with(ERROR_SUFFIX))
        })
        .max_by_key(|(_, prefix)| prefix.len())
        .map(|(kind, _)| *kind)
        .unwrap_or(EngineErrorKind::Unknown);
    EngineError { kind, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_prefixes() {
        let cases = [
            ("Conversion Error: Could not convert 'abc' to INT32", EngineErrorKind::Conversion),
            ("Out of Range Error: Overflow in addition", EngineErrorKind::OutOfRange),
            ("Catalog Error: Table with name t does not exist!", EngineErrorKind::Catalog),
            ("Invalid Input Error: bad argument", EngineErrorKind::InvalidInput),
            ("Invalid type Error: nope", EngineErrorKind::InvalidType),
            ("Invalid Error: generic", EngineErrorKind::Invalid),
            ("TransactionContext Error: conflict", EngineErrorKind::Transaction),
            ("Extension Autoloading Error: no network", EngineErrorKind::AutoLoad),
            ("FATAL Error: database invalidated", EngineErrorKind::Fatal),
        ];
        for (raw, expected) in cases {
            assert_eq!(classify(raw).kind(), expected, "message: {raw}");
        }
    }

    #[test]
    fn prefix_without_error_suffix_is_unknown() {
        assert_eq!(classify("Constraint violated").kind(), EngineErrorKind::Unknown);
        assert_eq!(classify("").kind(), EngineErrorKind::Unknown);
        assert_eq!(classify("constraint Error: lowercase").kind(), EngineErrorKind::Unknown);
    }

    #[test]
    fn equality_ignores_kind() {
        let a = classify("Binder Error: column x not found");
        let b = EngineError {
            kind: EngineErrorKind::Unknown,
            message: "Binder Error: column x not found".to_string(),
        };
        assert_eq!(a, b);
        assert_ne!(a, classify("Binder Error: column y not found"));
    }

    #[test]
    fn every_kind_except_unknown_has_prefix() {
        for (kind, prefix) in ERROR_PREFIXES.iter() {
            assert_eq!(kind.prefix(), Some(*prefix));
            let raw = format!("{prefix} Error: detail");
            assert_eq!(classify(raw).kind(), *kind);
        }
        assert_eq!(EngineErrorKind::Unknown.prefix(), None);
    }
}
