//! Error types for the `SQLite` wrapper.

use std::fmt;

use thiserror::Error;

use crate::ffi;

/// Result code reported by `SQLite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    /// `SQLITE_OK`.
    pub const OK: Self = Self(0);
    /// `SQLITE_ERROR`.
    pub const ERROR: Self = Self(1);
    /// `SQLITE_BUSY`.
    pub const BUSY: Self = Self(5);
    /// `SQLITE_CONSTRAINT`.
    pub const CONSTRAINT: Self = Self(19);
    /// `SQLITE_MISUSE`.
    pub const MISUSE: Self = Self(21);
    /// `SQLITE_RANGE`.
    pub const RANGE: Self = Self(25);

    /// Primary result code, with the extended bits masked off.
    #[must_use]
    pub const fn primary(self) -> Self {
        Self(self.0 & 0xff)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A failed native call: the result code plus `sqlite3_errmsg`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NativeError {
    pub(crate) code: ErrorCode,
    pub(crate) message: String,
}

impl NativeError {
    pub(crate) fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode(code),
            message: message.into(),
        }
    }

    /// Whether this is a lock-contention failure worth retrying.
    pub(crate) const fn is_busy(&self) -> bool {
        ffi::is_busy(self.code.primary().0)
    }
}

/// How a column was addressed when the lookup failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRef {
    /// Zero-based column index.
    Index(usize),
    /// Column name.
    Name(String),
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(idx) => write!(f, "index {idx}"),
            Self::Name(name) => write!(f, "name '{name}'"),
        }
    }
}

/// Errors raised by [`Database`](crate::Database), [`Cursor`](crate::Cursor)
/// and [`Statement`](crate::Statement).
#[derive(Debug, Error)]
pub enum DbError {
    /// `sqlite3_open_v2` failed.
    #[error("failed to open {path}: sqlite error {code}: {message}")]
    Open {
        /// Database path that was being opened.
        path: String,
        /// `SQLite` result code.
        code: ErrorCode,
        /// Message from `SQLite`.
        message: String,
    },

    /// The SQL text could not be compiled.
    #[error("failed to prepare `{sql}`: sqlite error {code}: {message}")]
    Prepare {
        /// Offending SQL text.
        sql: String,
        /// `SQLite` result code.
        code: ErrorCode,
        /// Message from `SQLite`.
        message: String,
    },

    /// Parameter count or value did not fit the statement.
    #[error("bind error: {message}")]
    Bind {
        /// `SQLite` result code (`SQLITE_RANGE` for a count mismatch).
        code: ErrorCode,
        /// Description of the mismatch.
        message: String,
    },

    /// The database stayed locked for the whole retry budget.
    #[error("database is busy, gave up after {attempts} attempts")]
    BusyTimeout {
        /// Number of attempts made before giving up.
        attempts: u32,
    },

    /// `sqlite3_step` failed (constraint violation, I/O error, ...).
    #[error("sqlite error {code}: {message}")]
    Step {
        /// `SQLite` result code.
        code: ErrorCode,
        /// Message from `SQLite`.
        message: String,
    },

    /// No column with the given index or name exists in the result set.
    #[error("column not found: {0}")]
    ColumnNotFound(ColumnRef),

    /// The cursor has already been closed.
    #[error("cursor is closed")]
    ClosedCursor,

    /// The cursor is not positioned on a row.
    #[error("cursor is not positioned on a row")]
    NoRow,

    /// The database is not open.
    #[error("database is not open")]
    NotOpen,

    /// An argument could not be passed to `SQLite` (NUL byte, size limit).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A SQL script was not valid UTF-8.
    #[error("sql script is not valid utf-8: {0}")]
    Script(#[from] std::str::Utf8Error),

    /// Reading a SQL script failed.
    #[error("failed to read sql script: {0}")]
    Io(#[from] std::io::Error),
}

impl DbError {
    /// Returns the native result code behind this error, if there is one.
    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Open { code, .. }
            | Self::Prepare { code, .. }
            | Self::Bind { code, .. }
            | Self::Step { code, .. } => Some(*code),
            Self::BusyTimeout { .. } => Some(ErrorCode::BUSY),
            Self::NotOpen => Some(ErrorCode::MISUSE),
            _ => None,
        }
    }

    /// Returns `true` for lock-contention failures.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::BusyTimeout { .. })
    }

    /// Splits a native failure back into its code and message, for the
    /// database's last-error state. `None` for errors raised by the wrapper.
    pub(crate) fn to_native(&self) -> Option<NativeError> {
        let code = self.code()?;
        let message = match self {
            Self::Open { message, .. }
            | Self::Prepare { message, .. }
            | Self::Bind { message, .. }
            | Self::Step { message, .. } => message.clone(),
            Self::BusyTimeout { .. } => "database is locked".to_string(),
            other => other.to_string(),
        };
        Some(NativeError { code, message })
    }

    pub(crate) fn prepare(sql: &str, err: NativeError) -> Self {
        Self::Prepare {
            sql: sql.to_string(),
            code: err.code,
            message: err.message,
        }
    }

    pub(crate) fn step(err: NativeError) -> Self {
        Self::Step {
            code: err.code,
            message: err.message,
        }
    }

    pub(crate) fn bind(err: NativeError) -> Self {
        Self::Bind {
            code: err.code,
            message: err.message,
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
