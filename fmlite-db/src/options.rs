//! Open flags and per-connection settings.

use std::ops::{BitOr, BitOrAssign};

use crate::ffi;

/// Flags passed to `sqlite3_open_v2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpenFlags(i32);

impl OpenFlags {
    /// Open read-only.
    pub const READ_ONLY: Self = Self(ffi::SQLITE_OPEN_READONLY);
    /// Open for reading and writing.
    pub const READ_WRITE: Self = Self(ffi::SQLITE_OPEN_READWRITE);
    /// Create the file if it does not exist.
    pub const CREATE: Self = Self(ffi::SQLITE_OPEN_CREATE);
    /// Interpret the path as a URI.
    pub const URI: Self = Self(ffi::SQLITE_OPEN_URI);
    /// Open an in-memory database.
    pub const MEMORY: Self = Self(ffi::SQLITE_OPEN_MEMORY);
    /// Multi-thread mode (no per-connection mutex).
    pub const NO_MUTEX: Self = Self(ffi::SQLITE_OPEN_NOMUTEX);
    /// Serialized mode.
    pub const FULL_MUTEX: Self = Self(ffi::SQLITE_OPEN_FULLMUTEX);
    /// Enable shared cache.
    pub const SHARED_CACHE: Self = Self(ffi::SQLITE_OPEN_SHAREDCACHE);
    /// Disable shared cache.
    pub const PRIVATE_CACHE: Self = Self(ffi::SQLITE_OPEN_PRIVATECACHE);

    /// Returns the raw flag bits.
    #[must_use]
    pub const fn bits(self) -> i32 {
        self.0
    }

    /// Returns `true` if every bit of `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for OpenFlags {
    /// `READ_WRITE | CREATE`, the same flags `sqlite3_open` uses.
    fn default() -> Self {
        Self::READ_WRITE | Self::CREATE
    }
}

impl BitOr for OpenFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for OpenFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Settings applied to a [`Database`](crate::Database) at construction.
///
/// The default opens read-write, creating the file if needed, with the
/// statement cache off and unlimited busy retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatabaseOptions {
    /// Flags used by [`Database::open`](crate::Database::open).
    pub flags: OpenFlags,
    /// Keep compiled statements around, keyed by SQL text.
    pub cache_statements: bool,
    /// Attempts allowed while the database is busy; `0` retries forever.
    pub busy_retry_timeout: u32,
}

impl DatabaseOptions {
    /// Sets the open flags.
    #[must_use]
    pub const fn flags(mut self, flags: OpenFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Enables or disables the statement cache.
    #[must_use]
    pub const fn cache_statements(mut self, enabled: bool) -> Self {
        self.cache_statements = enabled;
        self
    }

    /// Sets the busy retry budget (`0` = unlimited).
    #[must_use]
    pub const fn busy_retry_timeout(mut self, attempts: u32) -> Self {
        self.busy_retry_timeout = attempts;
        self
    }
}
