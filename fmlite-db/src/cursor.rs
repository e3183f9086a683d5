//! Result cursor over the rows of an executed statement.
//!
//! This file contains **no `unsafe` code**. Column values are read through
//! [`ffi::RawStmt`], which applies `SQLite`'s own type coercions: text `"42"`
//! read as an integer is `42`, and NULL reads as the zero value of the
//! requested type.

use crate::connection::Database;
use crate::error::{ColumnRef, DbError, DbResult};
use crate::ffi::{self, RawStmt};
use crate::statement::{Statement, StepResult};
use crate::value::Value;

/// Where a [`Cursor`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Executed, no row read yet.
    BeforeFirst,
    /// Positioned on a row; column accessors are valid.
    OnRow,
    /// `next` returned `false`; no more rows.
    Exhausted,
    /// Closed; every accessor fails with [`DbError::ClosedCursor`].
    Closed,
}

/// Addresses a result column by zero-based index or by name.
pub trait ColumnIndex {
    /// Resolves `self` to a zero-based column index of `cursor`.
    ///
    /// # Errors
    ///
    /// [`DbError::ColumnNotFound`] if the index is out of range or the name is
    /// unknown.
    fn resolve(&self, cursor: &Cursor<'_>) -> DbResult<usize>;
}

impl ColumnIndex for usize {
    fn resolve(&self, cursor: &Cursor<'_>) -> DbResult<usize> {
        if *self < cursor.column_names.len() {
            Ok(*self)
        } else {
            Err(DbError::ColumnNotFound(ColumnRef::Index(*self)))
        }
    }
}

impl ColumnIndex for &str {
    fn resolve(&self, cursor: &Cursor<'_>) -> DbResult<usize> {
        cursor.column_index_for_name(self)
    }
}

/// Rows produced by [`Database::execute_query`].
///
/// The cursor borrows its [`Database`] and holds the [`Statement`] it reads
/// from. Closing it (explicitly or on drop) hands the statement back to the
/// database, which caches or finalizes it.
pub struct Cursor<'db> {
    db: &'db Database,
    statement: Option<Statement>,
    column_names: Vec<String>,
    sql: String,
    state: CursorState,
}

impl<'db> Cursor<'db> {
    pub(crate) fn new(db: &'db Database, mut statement: Statement) -> Self {
        statement.acquire();
        let column_names = statement
            .raw()
            .map(|raw| (0..raw.column_count()).map(|i| raw.column_name(i)).collect())
            .unwrap_or_default();
        Self {
            db,
            sql: statement.sql().to_string(),
            statement: Some(statement),
            column_names,
            state: CursorState::BeforeFirst,
        }
    }

    /// Advances to the next row.
    ///
    /// Returns `false` once the rows are exhausted, and keeps returning
    /// `false` afterwards without touching the statement again.
    ///
    /// # Errors
    ///
    /// [`DbError::ClosedCursor`], [`DbError::NotOpen`] if the database was
    /// closed underneath the cursor, [`DbError::Step`], or
    /// [`DbError::BusyTimeout`].
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> DbResult<bool> {
        match self.state {
            CursorState::Closed => return Err(DbError::ClosedCursor),
            CursorState::Exhausted => return Ok(false),
            CursorState::BeforeFirst | CursorState::OnRow => {}
        }
        let Some(stmt) = self.statement.as_ref() else {
            return Err(DbError::ClosedCursor);
        };
        let result = if self.db.database_exists() && stmt.generation() == self.db.generation() {
            let mut retry = self.db.busy_retry();
            stmt.step(&mut retry)
        } else {
            Err(DbError::NotOpen)
        };
        match self.db.track(result) {
            Ok(StepResult::Row) => {
                self.state = CursorState::OnRow;
                Ok(true)
            }
            Ok(StepResult::Done) => {
                self.state = CursorState::Exhausted;
                Ok(false)
            }
            Err(err) => {
                self.state = CursorState::Exhausted;
                Err(err)
            }
        }
    }

    /// Whether the cursor is positioned on a row.
    #[must_use]
    pub fn has_another_row(&self) -> bool {
        self.state == CursorState::OnRow
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> CursorState {
        self.state
    }

    /// Whether [`close`](Self::close) has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state == CursorState::Closed
    }

    /// The SQL text that produced this cursor.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The database this cursor reads from.
    #[must_use]
    pub const fn database(&self) -> &'db Database {
        self.db
    }

    /// The statement being read; `None` after close.
    #[must_use]
    pub const fn statement(&self) -> Option<&Statement> {
        self.statement.as_ref()
    }

    // ── Column metadata ─────────────────────────────────────────────────

    /// Number of result columns (`0` after close).
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.column_names.len()
    }

    /// Snapshot of the result column names (empty after close).
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Index of the column called `name`, compared case-insensitively.
    ///
    /// # Errors
    ///
    /// [`DbError::ClosedCursor`] or [`DbError::ColumnNotFound`].
    pub fn column_index_for_name(&self, name: &str) -> DbResult<usize> {
        self.ensure_open()?;
        self.column_names
            .iter()
            .position(|col| col.eq_ignore_ascii_case(name))
            .ok_or_else(|| DbError::ColumnNotFound(ColumnRef::Name(name.to_string())))
    }

    /// Name of the column at `idx`.
    ///
    /// # Errors
    ///
    /// [`DbError::ClosedCursor`] or [`DbError::ColumnNotFound`].
    pub fn column_name_for_index(&self, idx: usize) -> DbResult<&str> {
        self.ensure_open()?;
        self.column_names
            .get(idx)
            .map(String::as_str)
            .ok_or(DbError::ColumnNotFound(ColumnRef::Index(idx)))
    }

    // ── Typed accessors ─────────────────────────────────────────────────

    /// Whether the column holds SQL NULL.
    ///
    /// # Errors
    ///
    /// See [`int_for_column`](Self::int_for_column).
    pub fn column_is_null<I: ColumnIndex>(&self, idx: I) -> DbResult<bool> {
        let (raw, idx) = self.column(&idx)?;
        Ok(raw.column_type(idx) == ffi::SQLITE_NULL)
    }

    /// Reads a column as `i32`, truncating wider integers like
    /// `sqlite3_column_int`.
    ///
    /// # Errors
    ///
    /// [`DbError::ClosedCursor`], [`DbError::ColumnNotFound`], or
    /// [`DbError::NoRow`] when the cursor is not on a row.
    pub fn int_for_column<I: ColumnIndex>(&self, idx: I) -> DbResult<i32> {
        let (raw, idx) = self.column(&idx)?;
        Ok(raw.column_int(idx))
    }

    /// Reads a column as `i64`.
    ///
    /// # Errors
    ///
    /// See [`int_for_column`](Self::int_for_column).
    pub fn long_for_column<I: ColumnIndex>(&self, idx: I) -> DbResult<i64> {
        let (raw, idx) = self.column(&idx)?;
        Ok(raw.column_i64(idx))
    }

    /// Reads a column as a boolean: any non-zero integer value is `true`.
    ///
    /// # Errors
    ///
    /// See [`int_for_column`](Self::int_for_column).
    pub fn bool_for_column<I: ColumnIndex>(&self, idx: I) -> DbResult<bool> {
        self.long_for_column(idx).map(|v| v != 0)
    }

    /// Reads a column as `f64`.
    ///
    /// # Errors
    ///
    /// See [`int_for_column`](Self::int_for_column).
    pub fn double_for_column<I: ColumnIndex>(&self, idx: I) -> DbResult<f64> {
        let (raw, idx) = self.column(&idx)?;
        Ok(raw.column_f64(idx))
    }

    /// Reads a column as text; NULL reads as an empty string.
    ///
    /// # Errors
    ///
    /// See [`int_for_column`](Self::int_for_column).
    pub fn string_for_column<I: ColumnIndex>(&self, idx: I) -> DbResult<String> {
        let (raw, idx) = self.column(&idx)?;
        Ok(raw.column_text(idx))
    }

    /// Copies a column's bytes; NULL reads as `None`.
    ///
    /// The copy stays valid after the cursor advances or closes.
    ///
    /// # Errors
    ///
    /// See [`int_for_column`](Self::int_for_column).
    pub fn data_for_column<I: ColumnIndex>(&self, idx: I) -> DbResult<Option<Vec<u8>>> {
        self.data_no_copy_for_column(idx).map(|data| data.map(<[u8]>::to_vec))
    }

    /// Borrows a column's bytes from `SQLite`'s row buffer; NULL reads as
    /// `None`.
    ///
    /// The slice aliases engine memory that the next [`next`](Self::next) or
    /// [`close`](Self::close) invalidates, which the borrow on `self` rules out.
    ///
    /// # Errors
    ///
    /// See [`int_for_column`](Self::int_for_column).
    pub fn data_no_copy_for_column<I: ColumnIndex>(&self, idx: I) -> DbResult<Option<&[u8]>> {
        let (raw, idx) = self.column(&idx)?;
        if raw.column_type(idx) == ffi::SQLITE_NULL {
            return Ok(None);
        }
        Ok(Some(raw.column_blob(idx)))
    }

    /// Reads a column in its own storage class.
    ///
    /// # Errors
    ///
    /// See [`int_for_column`](Self::int_for_column).
    pub fn value_for_column<I: ColumnIndex>(&self, idx: I) -> DbResult<Value> {
        let (raw, idx) = self.column(&idx)?;
        Ok(match raw.column_type(idx) {
            ffi::SQLITE_INTEGER => Value::Integer(raw.column_i64(idx)),
            ffi::SQLITE_FLOAT => Value::Real(raw.column_f64(idx)),
            ffi::SQLITE_TEXT => Value::Text(raw.column_text(idx)),
            ffi::SQLITE_BLOB => Value::Blob(raw.column_blob(idx).to_vec()),
            _ => Value::Null,
        })
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Closes the cursor and hands its statement back to the database.
    ///
    /// Safe to call more than once; also runs on drop.
    pub fn close(&mut self) {
        if self.state == CursorState::Closed {
            return;
        }
        self.state = CursorState::Closed;
        self.column_names = Vec::new();
        if let Some(mut stmt) = self.statement.take() {
            stmt.release();
            self.db.release_statement(stmt);
        }
    }

    fn ensure_open(&self) -> DbResult<()> {
        if self.state == CursorState::Closed {
            Err(DbError::ClosedCursor)
        } else {
            Ok(())
        }
    }

    /// Resolves `idx` and checks that a row is available to read it from.
    fn column<I: ColumnIndex>(&self, idx: &I) -> DbResult<(&RawStmt, usize)> {
        self.ensure_open()?;
        let idx = idx.resolve(self)?;
        if self.state != CursorState::OnRow {
            return Err(DbError::NoRow);
        }
        let raw = self
            .statement
            .as_ref()
            .and_then(Statement::raw)
            .ok_or(DbError::ClosedCursor)?;
        Ok((raw, idx))
    }
}

impl Drop for Cursor<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Cursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("sql", &self.sql)
            .field("state", &self.state)
            .field("columns", &self.column_names)
            .finish_non_exhaustive()
    }
}
