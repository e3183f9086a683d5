//! Execution of multi-statement SQL scripts.
//!
//! A script runs inside a single exclusive transaction: either every
//! statement takes effect or, on the first failure, none of them does.
//! Statements are split where `sqlite3_prepare_v2` stops parsing, so
//! semicolons inside string literals and trigger bodies are handled by
//! `SQLite` itself.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::connection::Database;
use crate::error::DbResult;
use crate::statement::{Statement, StepResult};

/// Resolves a logical asset path to the raw bytes of a SQL script.
pub trait AssetLoader {
    /// Loads the asset at `path`.
    ///
    /// # Errors
    ///
    /// Any I/O error raised while locating or reading the asset.
    fn load(&self, path: &str) -> io::Result<Vec<u8>>;
}

/// Loads assets from files below a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    root: PathBuf,
}

impl DirectoryLoader {
    /// Creates a loader resolving asset paths against `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetLoader for DirectoryLoader {
    fn load(&self, path: &str) -> io::Result<Vec<u8>> {
        fs::read(self.root.join(path))
    }
}

impl Database {
    /// Runs the SQL script stored in the file at `path`.
    ///
    /// # Errors
    ///
    /// [`DbError::Io`](crate::DbError::Io) if the file cannot be read, or any
    /// error from [`execute_sql_bytes`](Self::execute_sql_bytes).
    pub fn execute_sql_file(&self, path: impl AsRef<Path>) -> DbResult<()> {
        let data = fs::read(path)?;
        self.execute_sql_bytes(&data)
    }

    /// Runs the SQL script that `loader` resolves for `path`.
    ///
    /// # Errors
    ///
    /// [`DbError::Io`](crate::DbError::Io) if the loader fails, or any error
    /// from [`execute_sql_bytes`](Self::execute_sql_bytes).
    pub fn execute_sql_asset(&self, path: &str, loader: &dyn AssetLoader) -> DbResult<()> {
        let data = loader.load(path)?;
        self.execute_sql_bytes(&data)
    }

    /// Runs a UTF-8 SQL script atomically.
    ///
    /// # Errors
    ///
    /// [`DbError::Script`](crate::DbError::Script) for invalid UTF-8, the
    /// error that made a statement fail (after rolling back), or any error
    /// from beginning or committing the transaction.
    pub fn execute_sql_bytes(&self, data: &[u8]) -> DbResult<()> {
        let script = std::str::from_utf8(data)?;
        let script = script.strip_prefix('\u{feff}').unwrap_or(script);

        let tx = self.transaction()?;
        let outcome = tx.run_script(script);
        if let Err(err) = outcome {
            log::warn!("sql script failed, rolling back: {err}");
            if let Err(rollback_err) = tx.rollback() {
                log::warn!("rollback after failed script also failed: {rollback_err}");
            }
            return self.track(Err(err));
        }
        // The guard rolls back a commit that fails.
        tx.commit().inspect_err(|err| {
            log::warn!("commit of sql script failed, rolled back: {err}");
        })
    }

    fn run_script(&self, script: &str) -> DbResult<()> {
        let mut rest = script;
        while !rest.trim().is_empty() {
            let mut retry = self.busy_retry();
            let (raw, consumed) = self.track(self.prepare_raw(rest, &mut retry))?;
            if let Some(raw) = raw {
                let text = rest.get(..consumed).unwrap_or(rest).trim();
                let stmt = Statement::from_raw(raw, text, self.generation());
                while self.track(stmt.step(&mut retry))? == StepResult::Row {}
            }
            match rest.get(consumed..) {
                Some(tail) if consumed > 0 => rest = tail,
                _ => break,
            }
        }
        Ok(())
    }
}
