use crate::error::Error;

/// Result type alias used throughout colbridge.
///
/// Shorthand for `std::result::Result<T, Error>`. Every fallible colbridge
/// operation returns this type.
pub type Result<T> = std::result::Result<T, Error>;
