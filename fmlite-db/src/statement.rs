//! Wrapper around one compiled `SQLite` statement.
//!
//! This file contains **no `unsafe` code**. All FFI interaction is delegated to
//! [`ffi::RawStmt`] which encapsulates the raw pointer and C type conversions.

use crate::busy::BusyRetry;
use crate::error::{DbError, DbResult, NativeError};
use crate::ffi::{self, RawStmt};
use crate::value::Value;

/// Result of a single `sqlite3_step` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// A result row is available.
    Row,
    /// The statement has finished executing.
    Done,
}

/// A prepared `SQLite` statement.
///
/// Created by [`Database`](crate::Database) when it compiles SQL. Owned either
/// by the database's statement cache or, while rows are being read, by the
/// [`Cursor`](crate::Cursor) that checked it out. Finalized on [`close`] or
/// drop.
///
/// [`close`]: Statement::close
pub struct Statement {
    raw: Option<RawStmt>,
    sql: String,
    use_count: usize,
    generation: u64,
}

impl Statement {
    pub(crate) fn from_raw(raw: RawStmt, sql: &str, generation: u64) -> Self {
        Self {
            raw: Some(raw),
            sql: sql.to_string(),
            use_count: 0,
            generation,
        }
    }

    /// Borrows the native handle; `None` once the statement is closed.
    pub(crate) const fn raw(&self) -> Option<&RawStmt> {
        self.raw.as_ref()
    }

    /// The SQL text this statement was compiled from.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Number of open cursors reading from this statement.
    #[must_use]
    pub const fn use_count(&self) -> usize {
        self.use_count
    }

    /// Returns `true` once the native handle has been finalized.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.raw.is_none()
    }

    /// Open generation of the database that compiled this statement.
    pub(crate) const fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn acquire(&mut self) {
        self.use_count += 1;
    }

    pub(crate) fn release(&mut self) {
        self.use_count = self.use_count.saturating_sub(1);
    }

    /// Rewinds the statement and clears its bindings so it can be reused.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Step`] if `SQLite` reports misuse.
    pub fn reset(&self) -> DbResult<()> {
        match &self.raw {
            Some(raw) => raw.reset().map_err(DbError::step),
            None => Ok(()),
        }
    }

    /// Finalizes the native handle. Calling it again is a no-op.
    pub fn close(&mut self) {
        self.raw = None;
    }

    // ── Binding ─────────────────────────────────────────────────────────

    /// Binds `values` to the statement parameters, in order (1-indexed).
    ///
    /// The number of values must equal the number of parameters.
    pub(crate) fn bind_values(&self, values: &[Value]) -> DbResult<()> {
        let raw = self.raw.as_ref().ok_or(DbError::NotOpen)?;
        let expected = raw.bind_parameter_count();
        if values.len() != expected {
            return Err(DbError::Bind {
                code: crate::ErrorCode::RANGE,
                message: format!(
                    "statement expects {expected} parameters but {} were given",
                    values.len()
                ),
            });
        }
        for (i, val) in values.iter().enumerate() {
            let idx = i32::try_from(i + 1)
                .map_err(|_| DbError::InvalidArgument("parameter index overflow".to_string()))?;
            let bound = match val {
                Value::Integer(v) => raw.bind_i64(idx, *v),
                Value::Real(v) => raw.bind_f64(idx, *v),
                Value::Text(v) => raw.bind_text(idx, v),
                Value::Blob(v) => raw.bind_blob(idx, v),
                Value::Null => raw.bind_null(idx),
            };
            bound.map_err(DbError::bind)?;
        }
        Ok(())
    }

    // ── Stepping ────────────────────────────────────────────────────────

    /// Executes a single step, retrying while the database is busy.
    pub(crate) fn step(&self, retry: &mut BusyRetry<'_>) -> DbResult<StepResult> {
        let raw = self.raw.as_ref().ok_or_else(|| {
            DbError::step(NativeError::new(ffi::SQLITE_MISUSE, "statement is closed"))
        })?;
        retry.run(
            || match raw.step() {
                ffi::SQLITE_ROW => Ok(StepResult::Row),
                ffi::SQLITE_DONE => Ok(StepResult::Done),
                rc => Err(raw.error(rc)),
            },
            |err| {
                log::warn!(
                    "sqlite3_step failed ({}) for `{}`: {}",
                    err.code,
                    self.sql,
                    err.message
                );
                DbError::step(err)
            },
        )
    }
}

impl std::fmt::Debug for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.sql)
            .field("use_count", &self.use_count)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
