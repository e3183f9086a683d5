//! FMDB-style `SQLite` wrapper.
//!
//! This crate provides a small, safe Rust API over the `SQLite` C FFI, in the
//! shape of the FMDB wrapper:
//!
//! * [`Database`] owns one connection handle, tracks transaction state, and
//!   caches compiled statements by SQL text.
//! * [`Statement`] owns one compiled statement.
//! * [`Cursor`] iterates the rows of an executed query with typed accessors.
//!
//! The raw symbols come from the bundled library in `libsqlite3-sys`. The
//! `ffi` module is the **only** file that contains `unsafe` code or C types.
//!
//! ```no_run
//! use fmlite_db::{params, Database};
//!
//! # fn main() -> fmlite_db::DbResult<()> {
//! let db = Database::new("app.sqlite");
//! db.open()?;
//! db.execute_update("CREATE TABLE IF NOT EXISTS kv (k TEXT PRIMARY KEY, v TEXT)", &[])?;
//! db.execute_update("INSERT OR REPLACE INTO kv VALUES (?, ?)", params!["greeting", "hello"])?;
//!
//! let mut cursor = db.execute_query("SELECT k, v FROM kv", &[])?;
//! while cursor.next()? {
//!     println!("{} = {}", cursor.string_for_column("k")?, cursor.string_for_column(1)?);
//! }
//! # Ok(())
//! # }
//! ```

mod ffi;

mod busy;
mod connection;
mod cursor;
pub mod error;
mod options;
mod query;
mod schema;
mod script;
mod statement;
mod transaction;
pub mod value;

pub use connection::{Database, MEMORY_PATH};
pub use cursor::{ColumnIndex, Cursor, CursorState};
pub use error::{ColumnRef, DbError, DbResult, ErrorCode};
pub use options::{DatabaseOptions, OpenFlags};
pub use script::{AssetLoader, DirectoryLoader};
pub use statement::{Statement, StepResult};
pub use transaction::{Transaction, TransactionBehavior};
pub use value::Value;

#[cfg(test)]
mod tests;
