//! Raw FFI layer over the bundled `SQLite` library.
//!
//! This is the **only** file in the crate that contains `unsafe` code or C
//! types. [`RawDb`] and [`RawStmt`] own a `sqlite3*` / `sqlite3_stmt*` each and
//! expose them through safe methods; everything above this module works with
//! those two types and the plain constants below.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr::{self, NonNull};

/// `libsqlite3-sys` plus the one declaration its pregenerated bundled
/// bindings omit; the symbol itself is present in the bundled library.
mod sys {
    pub use libsqlite3_sys::*;

    extern "C" {
        pub fn sqlite3_close_v2(db: *mut sqlite3) -> std::os::raw::c_int;
    }
}

use crate::error::NativeError;

// ── SQLite constants ────────────────────────────────────────────────────

pub use sys::{SQLITE_BUSY, SQLITE_DONE, SQLITE_LOCKED, SQLITE_MISUSE, SQLITE_OK, SQLITE_ROW};

// Column type constants
pub use sys::{SQLITE_BLOB, SQLITE_FLOAT, SQLITE_INTEGER, SQLITE_NULL, SQLITE_TEXT};

// Open flags
pub use sys::{
    SQLITE_OPEN_CREATE, SQLITE_OPEN_FULLMUTEX, SQLITE_OPEN_MEMORY, SQLITE_OPEN_NOMUTEX,
    SQLITE_OPEN_PRIVATECACHE, SQLITE_OPEN_READONLY, SQLITE_OPEN_READWRITE,
    SQLITE_OPEN_SHAREDCACHE, SQLITE_OPEN_URI,
};

/// Returns `true` for the two lock-contention result codes.
pub const fn is_busy(code: c_int) -> bool {
    code == SQLITE_BUSY || code == SQLITE_LOCKED
}

/// Returns the version string of the linked `SQLite` library.
pub fn libversion() -> String {
    // SAFETY: sqlite3_libversion returns a pointer to a static C string.
    unsafe { CStr::from_ptr(sys::sqlite3_libversion()) }
        .to_string_lossy()
        .into_owned()
}

/// Returns the compile-time threading mode (0 = single-threaded).
pub fn threadsafe() -> c_int {
    // SAFETY: no arguments, no preconditions.
    unsafe { sys::sqlite3_threadsafe() }
}

/// Reads `sqlite3_errmsg` for `db`.
///
/// # Safety
///
/// `db` must be a live (possibly zombie) `sqlite3*` handle.
unsafe fn errmsg(db: *mut sys::sqlite3) -> String {
    let msg = sys::sqlite3_errmsg(db);
    if msg.is_null() {
        "unknown error".to_string()
    } else {
        CStr::from_ptr(msg).to_string_lossy().into_owned()
    }
}

fn len_as_c_int(len: usize) -> Result<c_int, NativeError> {
    c_int::try_from(len)
        .map_err(|_| NativeError::new(sys::SQLITE_TOOBIG, "value too large to bind"))
}

// ── Connection handle ───────────────────────────────────────────────────

/// Owned `sqlite3*` handle. Closed with `sqlite3_close_v2` on drop, which
/// defers the real close until every outstanding statement is finalized.
pub struct RawDb {
    db: NonNull<sys::sqlite3>,
}

// SAFETY: the bundled library is built in serialized threading mode, and the
// handle is only ever reached through `&`/`&mut` of its single owner.
unsafe impl Send for RawDb {}

impl RawDb {
    /// Opens `path` with `sqlite3_open_v2`.
    pub fn open(path: &str, flags: c_int) -> Result<Self, NativeError> {
        let c_path = CString::new(path)
            .map_err(|e| NativeError::new(SQLITE_MISUSE, format!("invalid path: {e}")))?;

        let mut db: *mut sys::sqlite3 = ptr::null_mut();
        // SAFETY: c_path is a valid NUL-terminated string and db is a valid
        // out-pointer; a null VFS name selects the default VFS.
        let rc = unsafe { sys::sqlite3_open_v2(c_path.as_ptr(), &mut db, flags, ptr::null()) };
        let Some(handle) = NonNull::new(db) else {
            return Err(NativeError::new(rc, format!("sqlite3_open_v2 returned {rc}")));
        };
        if rc != SQLITE_OK {
            // A handle is allocated even on failure; read the message, then free it.
            // SAFETY: handle came from sqlite3_open_v2 and is closed exactly once.
            let msg = unsafe {
                let m = errmsg(handle.as_ptr());
                sys::sqlite3_close_v2(handle.as_ptr());
                m
            };
            return Err(NativeError::new(rc, msg));
        }
        Ok(Self { db: handle })
    }

    /// Compiles the first statement in `sql`.
    ///
    /// Returns the statement (or `None` when the text holds only whitespace or
    /// comments) and the byte offset at which the unparsed tail begins.
    pub fn prepare(&self, sql: &str) -> Result<(Option<RawStmt>, usize), NativeError> {
        let n_byte = len_as_c_int(sql.len())?;
        let start: *const c_char = sql.as_ptr().cast();
        let mut stmt: *mut sys::sqlite3_stmt = ptr::null_mut();
        let mut tail: *const c_char = ptr::null();
        // SAFETY: `start` points at `n_byte` readable bytes; the out-pointers
        // are valid. nByte bounds the read, so no NUL terminator is needed.
        let rc = unsafe {
            sys::sqlite3_prepare_v2(self.db.as_ptr(), start, n_byte, &mut stmt, &mut tail)
        };
        if rc != SQLITE_OK {
            return Err(self.error(rc));
        }
        let consumed = if tail.is_null() {
            sql.len()
        } else {
            // SAFETY: sqlite sets the tail inside the buffer it was given.
            let offset = unsafe { tail.offset_from(start) };
            usize::try_from(offset).unwrap_or(sql.len())
        };
        Ok((NonNull::new(stmt).map(|stmt| RawStmt { stmt }), consumed))
    }

    /// Builds an error from `code` and the handle's current message.
    pub fn error(&self, code: c_int) -> NativeError {
        // SAFETY: self.db is a live handle.
        NativeError::new(code, unsafe { errmsg(self.db.as_ptr()) })
    }

    /// Rows changed by the most recent statement.
    pub fn changes(&self) -> i32 {
        // SAFETY: self.db is a live handle.
        unsafe { sys::sqlite3_changes(self.db.as_ptr()) }
    }

    /// Rowid of the most recent successful INSERT.
    pub fn last_insert_rowid(&self) -> i64 {
        // SAFETY: self.db is a live handle.
        unsafe { sys::sqlite3_last_insert_rowid(self.db.as_ptr()) }
    }
}

impl Drop for RawDb {
    fn drop(&mut self) {
        // SAFETY: the handle is owned and closed exactly once.
        unsafe {
            sys::sqlite3_close_v2(self.db.as_ptr());
        }
    }
}

// ── Statement handle ────────────────────────────────────────────────────

/// Owned `sqlite3_stmt*` handle, finalized on drop.
pub struct RawStmt {
    stmt: NonNull<sys::sqlite3_stmt>,
}

// SAFETY: see `RawDb`; a statement has exactly one owner at a time.
unsafe impl Send for RawStmt {}

impl RawStmt {
    fn ptr(&self) -> *mut sys::sqlite3_stmt {
        self.stmt.as_ptr()
    }

    /// Builds an error from `code` and the owning connection's message.
    pub fn error(&self, code: c_int) -> NativeError {
        // SAFETY: a live statement always has a live (maybe zombie) connection.
        NativeError::new(code, unsafe { errmsg(sys::sqlite3_db_handle(self.ptr())) })
    }

    fn check(&self, rc: c_int) -> Result<(), NativeError> {
        if rc == SQLITE_OK {
            Ok(())
        } else {
            Err(self.error(rc))
        }
    }

    // ── Binding ─────────────────────────────────────────────────────────

    pub fn bind_parameter_count(&self) -> usize {
        // SAFETY: live statement.
        let n = unsafe { sys::sqlite3_bind_parameter_count(self.ptr()) };
        usize::try_from(n).unwrap_or(0)
    }

    pub fn bind_i64(&self, idx: c_int, value: i64) -> Result<(), NativeError> {
        // SAFETY: live statement; sqlite range-checks idx.
        self.check(unsafe { sys::sqlite3_bind_int64(self.ptr(), idx, value) })
    }

    pub fn bind_f64(&self, idx: c_int, value: f64) -> Result<(), NativeError> {
        // SAFETY: live statement; sqlite range-checks idx.
        self.check(unsafe { sys::sqlite3_bind_double(self.ptr(), idx, value) })
    }

    pub fn bind_text(&self, idx: c_int, value: &str) -> Result<(), NativeError> {
        let n = len_as_c_int(value.len())?;
        // SAFETY: the buffer is valid for `n` bytes and SQLITE_TRANSIENT makes
        // sqlite copy it before returning.
        self.check(unsafe {
            sys::sqlite3_bind_text(
                self.ptr(),
                idx,
                value.as_ptr().cast(),
                n,
                sys::SQLITE_TRANSIENT(),
            )
        })
    }

    pub fn bind_blob(&self, idx: c_int, value: &[u8]) -> Result<(), NativeError> {
        let n = len_as_c_int(value.len())?;
        // SAFETY: as for bind_text.
        self.check(unsafe {
            sys::sqlite3_bind_blob(
                self.ptr(),
                idx,
                value.as_ptr().cast(),
                n,
                sys::SQLITE_TRANSIENT(),
            )
        })
    }

    pub fn bind_null(&self, idx: c_int) -> Result<(), NativeError> {
        // SAFETY: live statement; sqlite range-checks idx.
        self.check(unsafe { sys::sqlite3_bind_null(self.ptr(), idx) })
    }

    // ── Execution ───────────────────────────────────────────────────────

    /// Runs `sqlite3_step` and returns the raw result code.
    pub fn step(&self) -> c_int {
        // SAFETY: live statement.
        unsafe { sys::sqlite3_step(self.ptr()) }
    }

    /// Rewinds the statement and clears its bindings.
    pub fn reset(&self) -> Result<(), NativeError> {
        // SAFETY: live statement.
        let rc = unsafe {
            let rc = sys::sqlite3_reset(self.ptr());
            sys::sqlite3_clear_bindings(self.ptr());
            rc
        };
        // sqlite3_reset repeats the last step error; only misuse is ours.
        if rc == SQLITE_MISUSE {
            return Err(self.error(rc));
        }
        Ok(())
    }

    // ── Column reading ──────────────────────────────────────────────────
    //
    // Column indexes are range-checked by the caller; an index that does not
    // fit a C int is clamped and sqlite reports it as NULL.

    pub fn column_count(&self) -> usize {
        // SAFETY: live statement.
        let n = unsafe { sys::sqlite3_column_count(self.ptr()) };
        usize::try_from(n).unwrap_or(0)
    }

    /// Returns the declared output name of column `idx`.
    pub fn column_name(&self, idx: usize) -> String {
        // SAFETY: live statement; a null return is handled.
        unsafe {
            let name = sys::sqlite3_column_name(self.ptr(), col(idx));
            if name.is_null() {
                String::new()
            } else {
                CStr::from_ptr(name).to_string_lossy().into_owned()
            }
        }
    }

    pub fn column_type(&self, idx: usize) -> c_int {
        // SAFETY: live statement; out-of-range columns report NULL.
        unsafe { sys::sqlite3_column_type(self.ptr(), col(idx)) }
    }

    pub fn column_int(&self, idx: usize) -> i32 {
        // SAFETY: live statement.
        unsafe { sys::sqlite3_column_int(self.ptr(), col(idx)) }
    }

    pub fn column_i64(&self, idx: usize) -> i64 {
        // SAFETY: live statement.
        unsafe { sys::sqlite3_column_int64(self.ptr(), col(idx)) }
    }

    pub fn column_f64(&self, idx: usize) -> f64 {
        // SAFETY: live statement.
        unsafe { sys::sqlite3_column_double(self.ptr(), col(idx)) }
    }

    /// Reads a column as text. Returns an empty string for NULL.
    pub fn column_text(&self, idx: usize) -> String {
        // SAFETY: the text pointer is valid for `column_bytes` bytes until the
        // next step/reset/finalize; it is copied before returning.
        unsafe {
            let text = sys::sqlite3_column_text(self.ptr(), col(idx));
            if text.is_null() {
                return String::new();
            }
            let len = usize::try_from(sys::sqlite3_column_bytes(self.ptr(), col(idx))).unwrap_or(0);
            String::from_utf8_lossy(std::slice::from_raw_parts(text, len)).into_owned()
        }
    }

    /// Borrows a column's bytes straight out of sqlite's row buffer.
    ///
    /// The buffer is only valid until the next step, reset or finalize.
    /// [`Cursor`](crate::Cursor) enforces that by handing the slice out
    /// through `&self` while stepping needs `&mut self`. Returns an empty
    /// slice for NULL and zero-length blobs.
    pub fn column_blob(&self, idx: usize) -> &[u8] {
        // SAFETY: the buffer is valid for `column_bytes` bytes until the next
        // step/reset/finalize of this statement.
        unsafe {
            let blob = sys::sqlite3_column_blob(self.ptr(), col(idx));
            let len = usize::try_from(sys::sqlite3_column_bytes(self.ptr(), col(idx))).unwrap_or(0);
            if blob.is_null() || len == 0 {
                return &[];
            }
            std::slice::from_raw_parts(blob.cast::<u8>(), len)
        }
    }
}

fn col(idx: usize) -> c_int {
    c_int::try_from(idx).unwrap_or(c_int::MAX)
}

impl Drop for RawStmt {
    fn drop(&mut self) {
        // SAFETY: the statement is owned and finalized exactly once.
        unsafe {
            sys::sqlite3_finalize(self.ptr());
        }
    }
}
