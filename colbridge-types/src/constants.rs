//! Compile-time constants shared by every colbridge crate.

/// Maximum number of rows in a single chunk's column vectors.
pub const VECTOR_SIZE: usize = 2048;

/// Field metadata key naming an Arrow extension type.
pub const EXTENSION_NAME_KEY: &str = "ARROW:extension:name";

/// Field metadata key carrying extension-specific parameters.
pub const EXTENSION_METADATA_KEY: &str = "ARROW:extension:metadata";

pub const HUGEINT_EXTENSION: &str = "colbridge.hugeint";
pub const UHUGEINT_EXTENSION: &str = "colbridge.uhugeint";
pub const UUID_EXTENSION: &str = "arrow.uuid";
/// ENUM columns carry their dictionary as a JSON string array under
/// [`EXTENSION_METADATA_KEY`].
pub const ENUM_EXTENSION: &str = "colbridge.enum";

pub const LIST_ITEM_FIELD: &str = "item";
pub const MAP_ENTRIES_FIELD: &str = "entries";
pub const MAP_KEY_FIELD: &str = "key";
pub const MAP_VALUE_FIELD: &str = "value";

/// Time zone attached to exported TIMESTAMP WITH TIME ZONE columns.
pub const UTC_TIMEZONE: &str = "UTC";

/// Maximum DECIMAL width (digits) supported by the engine.
pub const MAX_DECIMAL_WIDTH: u8 = 38;

/// Julian day number of 1970-01-01.
pub const UNIX_EPOCH_JULIAN_DAY: i32 = 2_440_588;

pub const MICROS_PER_SECOND: i64 = 1_000_000;
pub const MICROS_PER_DAY: i64 = 86_400 * MICROS_PER_SECOND;
pub const NANOS_PER_MICRO: i64 = 1_000;
