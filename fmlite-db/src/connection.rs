//! The database connection and its statement cache.
//!
//! This file contains **no `unsafe` code**. All FFI interaction is delegated to
//! [`ffi::RawDb`] which encapsulates the raw pointers and C type conversions.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::busy::BusyRetry;
use crate::cursor::Cursor;
use crate::error::{DbError, DbResult, ErrorCode, NativeError};
use crate::ffi::{self, RawDb, RawStmt};
use crate::options::{DatabaseOptions, OpenFlags};
use crate::statement::Statement;
use crate::value::Value;

/// Path understood by `SQLite` as a private in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

/// A `SQLite` database connection.
///
/// Construction only records the path; the native handle is acquired by
/// [`open`](Self::open) and released by [`close`](Self::close) or on drop.
/// All methods take `&self` so that [`Cursor`]s, which borrow the database,
/// can stay open while further statements run.
///
/// `Send` but not `Sync`: a database may move between threads but is used from
/// one at a time. The [`in_use`](Self::in_use) flag is advisory only.
pub struct Database {
    path: PathBuf,
    flags: OpenFlags,
    handle: RefCell<Option<RawDb>>,
    /// Bumped on every successful open, so statements compiled by an earlier
    /// handle are never put back into the cache.
    generation: Cell<u64>,
    in_use: Cell<bool>,
    in_transaction: Cell<bool>,
    cache_statements: Cell<bool>,
    busy_retry_timeout: Cell<u32>,
    busy_calls: Cell<u64>,
    /// Idle statements only; a statement read by a cursor is checked out.
    cached_statements: RefCell<HashMap<String, Statement>>,
    statements_prepared: Cell<u64>,
    last_error: RefCell<NativeError>,
}

impl Database {
    /// Creates a closed database for `path` with default options.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_options(path, DatabaseOptions::default())
    }

    /// Creates a closed database for `path`.
    #[must_use]
    pub fn with_options(path: impl AsRef<Path>, options: DatabaseOptions) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            flags: options.flags,
            handle: RefCell::new(None),
            generation: Cell::new(0),
            in_use: Cell::new(false),
            in_transaction: Cell::new(false),
            cache_statements: Cell::new(options.cache_statements),
            busy_retry_timeout: Cell::new(options.busy_retry_timeout),
            busy_calls: Cell::new(0),
            cached_statements: RefCell::new(HashMap::new()),
            statements_prepared: Cell::new(0),
            last_error: RefCell::new(ok_status()),
        }
    }

    /// Creates and opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Open`] if `SQLite` cannot allocate the database.
    pub fn open_in_memory() -> DbResult<Self> {
        let db = Self::new(MEMORY_PATH);
        db.open()?;
        Ok(db)
    }

    /// Whether the linked `SQLite` was built thread-safe.
    #[must_use]
    pub fn is_thread_safe() -> bool {
        ffi::threadsafe() != 0
    }

    /// Version string of the linked `SQLite` library.
    #[must_use]
    pub fn sqlite_lib_version() -> String {
        ffi::libversion()
    }

    /// The database path given at construction.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ── Open / close ────────────────────────────────────────────────────

    /// Opens the database with the flags from [`DatabaseOptions`].
    ///
    /// Opening an already open database is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Open`] if `sqlite3_open_v2` fails; the database
    /// stays closed.
    pub fn open(&self) -> DbResult<()> {
        self.open_with_flags(self.flags)
    }

    /// Opens the database with explicit `flags`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Open`] if `sqlite3_open_v2` fails; the database
    /// stays closed.
    pub fn open_with_flags(&self, flags: OpenFlags) -> DbResult<()> {
        if self.database_exists() {
            return Ok(());
        }
        let path = self.path.to_string_lossy();
        let result = RawDb::open(&path, flags.bits()).map_err(|err| DbError::Open {
            path: path.to_string(),
            code: err.code,
            message: err.message,
        });
        let raw = self.track(result)?;
        *self.handle.borrow_mut() = Some(raw);
        self.generation.set(self.generation.get() + 1);
        log::debug!("opened database {path}");
        Ok(())
    }

    /// Finalizes every cached statement and closes the handle.
    ///
    /// Closing a closed database is a no-op. Statements still held by open
    /// cursors keep the native connection alive until they are closed.
    ///
    /// # Errors
    ///
    /// Currently infallible; the `Result` mirrors [`open`](Self::open).
    pub fn close(&self) -> DbResult<()> {
        self.clear_cached_statements();
        if let Some(raw) = self.handle.borrow_mut().take() {
            drop(raw);
            log::debug!("closed database {}", self.path.display());
        }
        self.in_transaction.set(false);
        Ok(())
    }

    /// Whether the database is open.
    #[must_use]
    pub fn database_exists(&self) -> bool {
        self.handle.borrow().is_some()
    }

    /// Whether the connection can still read its schema.
    #[must_use]
    pub fn good_connection(&self) -> bool {
        if !self.database_exists() {
            return false;
        }
        self.execute_query("SELECT name FROM sqlite_master WHERE type = 'table'", &[])
            .and_then(|mut cursor| cursor.next())
            .is_ok()
    }

    // ── Settings ────────────────────────────────────────────────────────

    /// Whether compiled statements are cached by SQL text.
    #[must_use]
    pub fn should_cache_statements(&self) -> bool {
        self.cache_statements.get()
    }

    /// Enables or disables the statement cache. Disabling clears it.
    pub fn set_should_cache_statements(&self, value: bool) {
        self.cache_statements.set(value);
        if !value {
            self.clear_cached_statements();
        }
    }

    /// Finalizes and forgets every cached statement.
    pub fn clear_cached_statements(&self) {
        self.cached_statements.borrow_mut().clear();
    }

    /// Number of idle statements in the cache.
    #[must_use]
    pub fn cached_statement_count(&self) -> usize {
        self.cached_statements.borrow().len()
    }

    /// Number of statements compiled by [`execute_query`](Self::execute_query)
    /// and [`execute_update`](Self::execute_update) since construction.
    ///
    /// A cache hit does not compile, so this counter makes cache reuse
    /// observable.
    #[must_use]
    pub fn statements_prepared(&self) -> u64 {
        self.statements_prepared.get()
    }

    /// Attempts allowed while the database is busy; `0` means unlimited.
    #[must_use]
    pub fn busy_retry_timeout(&self) -> u32 {
        self.busy_retry_timeout.get()
    }

    /// Sets the busy retry budget; `0` retries until the lock clears.
    pub fn set_busy_retry_timeout(&self, attempts: u32) {
        self.busy_retry_timeout.set(attempts);
    }

    /// Number of native prepare and step calls that came back busy since
    /// construction.
    #[must_use]
    pub fn busy_calls(&self) -> u64 {
        self.busy_calls.get()
    }

    /// Whether the database is flagged in use or inside a transaction.
    #[must_use]
    pub fn in_use(&self) -> bool {
        self.in_use.get() || self.in_transaction.get()
    }

    /// Sets the advisory in-use flag. Nothing enforces it.
    pub fn set_in_use(&self, value: bool) {
        self.in_use.set(value);
    }

    /// Whether a transaction was begun and not yet committed or rolled back.
    #[must_use]
    pub fn is_in_transaction(&self) -> bool {
        self.in_transaction.get()
    }

    pub(crate) fn set_in_transaction(&self, value: bool) {
        self.in_transaction.set(value);
    }

    // ── Error state ─────────────────────────────────────────────────────

    /// Result code of the most recent native call.
    #[must_use]
    pub fn last_error_code(&self) -> ErrorCode {
        self.last_error.borrow().code
    }

    /// Message of the most recent native call (`"not an error"` on success).
    #[must_use]
    pub fn last_error_message(&self) -> String {
        self.last_error.borrow().message.clone()
    }

    /// Whether the most recent native call failed.
    #[must_use]
    pub fn had_error(&self) -> bool {
        self.last_error_code() != ErrorCode::OK
    }

    /// Records the outcome of a native operation in the last-error state.
    ///
    /// Errors raised by the wrapper itself (closed cursor, unknown column)
    /// leave the state untouched.
    pub(crate) fn track<T>(&self, result: DbResult<T>) -> DbResult<T> {
        match &result {
            Ok(_) => *self.last_error.borrow_mut() = ok_status(),
            Err(err) => {
                if let Some(native) = err.to_native() {
                    *self.last_error.borrow_mut() = native;
                }
            }
        }
        result
    }

    // ── Row info ────────────────────────────────────────────────────────

    /// Rowid of the most recent successful INSERT, `0` when closed.
    #[must_use]
    pub fn last_insert_row_id(&self) -> i64 {
        self.handle.borrow().as_ref().map_or(0, RawDb::last_insert_rowid)
    }

    /// Rows changed by the most recent statement, `0` when closed.
    #[must_use]
    pub fn changes(&self) -> usize {
        self.handle
            .borrow()
            .as_ref()
            .map_or(0, |raw| usize::try_from(raw.changes()).unwrap_or(0))
    }

    // ── Execution ───────────────────────────────────────────────────────

    /// Runs a query and returns a cursor positioned before the first row.
    ///
    /// `params` are bound positionally and must match the number of `?`
    /// parameters in `sql`.
    ///
    /// # Errors
    ///
    /// [`DbError::NotOpen`], [`DbError::Prepare`], [`DbError::Bind`], or
    /// [`DbError::BusyTimeout`] if the schema stays locked.
    pub fn execute_query(&self, sql: &str, params: &[Value]) -> DbResult<Cursor<'_>> {
        self.warn_if_in_use();
        let mut retry = self.busy_retry();
        let result = self.checkout_statement(sql, &mut retry).and_then(|stmt| {
            if let Err(err) = stmt.bind_values(params) {
                self.release_statement(stmt);
                return Err(err);
            }
            Ok(Cursor::new(self, stmt))
        });
        self.track(result)
    }

    /// Runs a statement to completion, discarding any rows.
    ///
    /// With caching enabled the statement is reset and kept for the next call
    /// with the same SQL text; otherwise it is finalized.
    ///
    /// # Errors
    ///
    /// [`DbError::NotOpen`], [`DbError::Prepare`], [`DbError::Bind`],
    /// [`DbError::Step`] (constraint violations and other runtime failures),
    /// or [`DbError::BusyTimeout`].
    pub fn execute_update(&self, sql: &str, params: &[Value]) -> DbResult<()> {
        self.warn_if_in_use();
        let mut retry = self.busy_retry();
        let result = self.checkout_statement(sql, &mut retry).and_then(|stmt| {
            let outcome = stmt
                .bind_values(params)
                .and_then(|()| stmt.step(&mut retry))
                .map(|_| ());
            self.release_statement(stmt);
            outcome
        });
        self.track(result)
    }

    /// Compiles `sql` without running it.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Prepare`] describing why the SQL is invalid.
    pub fn validate_sql(&self, sql: &str) -> DbResult<()> {
        let mut retry = self.busy_retry();
        let result = self.prepare_raw(sql, &mut retry).map(drop);
        self.track(result)
    }

    // ── Statement plumbing ──────────────────────────────────────────────

    pub(crate) fn busy_retry(&self) -> BusyRetry<'_> {
        BusyRetry::new(self.busy_retry_timeout.get(), &self.busy_calls)
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.get()
    }

    /// Compiles the first statement of `sql`, retrying while busy.
    ///
    /// Returns the statement (`None` for an empty statement) and the byte
    /// offset of the unparsed tail.
    pub(crate) fn prepare_raw(
        &self,
        sql: &str,
        retry: &mut BusyRetry<'_>,
    ) -> DbResult<(Option<RawStmt>, usize)> {
        let handle = self.handle.borrow();
        let raw = handle.as_ref().ok_or(DbError::NotOpen)?;
        retry.run(|| raw.prepare(sql), |err| DbError::prepare(sql, err))
    }

    /// Returns an idle cached statement for `sql`, or compiles a new one.
    fn checkout_statement(&self, sql: &str, retry: &mut BusyRetry<'_>) -> DbResult<Statement> {
        if self.cache_statements.get() {
            if let Some(stmt) = self.cached_statements.borrow_mut().remove(sql) {
                log::debug!("statement cache hit for `{sql}`");
                return Ok(stmt);
            }
        }
        let (raw, _) = self.prepare_raw(sql, retry)?;
        let raw = raw.ok_or_else(|| {
            DbError::prepare(sql, NativeError::new(ffi::SQLITE_MISUSE, "no SQL statement"))
        })?;
        self.statements_prepared.set(self.statements_prepared.get() + 1);
        log::debug!("compiled statement `{sql}`");
        Ok(Statement::from_raw(raw, sql, self.generation.get()))
    }

    /// Takes back a statement nobody is reading any more.
    ///
    /// Caching enabled: reset and store it by SQL text, replacing an existing
    /// entry. Otherwise, or if it belongs to an earlier open: finalize it.
    pub(crate) fn release_statement(&self, mut stmt: Statement) {
        debug_assert_eq!(stmt.use_count(), 0, "released a statement still in use");
        let reusable = self.cache_statements.get()
            && self.database_exists()
            && stmt.generation() == self.generation.get()
            && !stmt.is_closed();
        if !reusable {
            stmt.close();
            return;
        }
        if let Err(err) = stmt.reset() {
            log::warn!("dropping statement `{}` that failed to reset: {err}", stmt.sql());
            return;
        }
        let sql = stmt.sql().to_string();
        self.cached_statements.borrow_mut().insert(sql, stmt);
    }

    fn warn_if_in_use(&self) {
        if self.in_use.get() {
            log::warn!(
                "database {} is already in use; the in-use flag is advisory",
                self.path.display()
            );
        }
    }
}

fn ok_status() -> NativeError {
    NativeError::new(ffi::SQLITE_OK, "not an error")
}

impl Drop for Database {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("open", &self.database_exists())
            .field("in_transaction", &self.in_transaction.get())
            .field("cache_statements", &self.cache_statements.get())
            .finish_non_exhaustive()
    }
}
