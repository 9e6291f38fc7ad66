//! # Store Primitives
//!
//! Fixed constants shared by the store, the codecs and the binary.
//! These are compiled in and immutable at runtime.

use std::time::Duration;

/// Lowest accepted importance score (inclusive).
pub const IMPORTANCE_MIN: f64 = 0.0;

/// Highest accepted importance score (inclusive).
pub const IMPORTANCE_MAX: f64 = 10.0;

/// Record discriminator for entity lines.
pub const ENTITY_RECORD_TAG: &str = "entity";

/// Record discriminator for relation lines.
pub const RELATION_RECORD_TAG: &str = "relation";

/// Name of the record discriminator field.
pub const RECORD_TAG_FIELD: &str = "type";

/// Separator used when a list field is flattened into one text cell.
pub const LIST_SEPARATOR: &str = "; ";

/// Suffix appended to the backing path to form the lock file path.
pub const LOCK_SUFFIX: &str = ".lock";

/// How long a mutation waits for the lock file before giving up.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll interval while waiting for the lock file.
pub const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Retries for transient I/O errors on read and write.
pub const DEFAULT_IO_RETRIES: u32 = 3;

/// Back-off between transient I/O retries.
pub const IO_RETRY_BACKOFF: Duration = Duration::from_millis(10);

/// Default backing file name.
pub const DEFAULT_FILE_NAME: &str = "memory.jsonl";

/// Backing file name used before line-delimited records were adopted.
pub const LEGACY_FILE_NAME: &str = "memory.json";
