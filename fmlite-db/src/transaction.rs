//! Transaction control: flag-tracking begin/commit/rollback on [`Database`]
//! and a scoped [`Transaction`] guard built on top of them.

use std::ops::Deref;

use crate::connection::Database;
use crate::error::DbResult;

/// Locking behaviour of `BEGIN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionBehavior {
    /// `BEGIN DEFERRED`: locks are taken on first access.
    Deferred,
    /// `BEGIN IMMEDIATE`: acquires a RESERVED lock right away.
    Immediate,
    /// `BEGIN EXCLUSIVE`: acquires an EXCLUSIVE lock right away.
    Exclusive,
}

impl TransactionBehavior {
    const fn begin_sql(self) -> &'static str {
        match self {
            Self::Deferred => "BEGIN DEFERRED TRANSACTION",
            Self::Immediate => "BEGIN IMMEDIATE TRANSACTION",
            Self::Exclusive => "BEGIN EXCLUSIVE TRANSACTION",
        }
    }
}

impl Database {
    /// Begins a transaction with the given locking behaviour and sets the
    /// in-transaction flag on success.
    ///
    /// # Errors
    ///
    /// Any error from [`execute_update`](Self::execute_update), e.g. when a
    /// transaction is already open.
    pub fn begin_transaction_with(&self, behavior: TransactionBehavior) -> DbResult<()> {
        self.execute_update(behavior.begin_sql(), &[])?;
        self.set_in_transaction(true);
        Ok(())
    }

    /// Begins an exclusive transaction.
    ///
    /// # Errors
    ///
    /// See [`begin_transaction_with`](Self::begin_transaction_with).
    pub fn begin_transaction(&self) -> DbResult<()> {
        self.begin_transaction_with(TransactionBehavior::Exclusive)
    }

    /// Begins a deferred transaction.
    ///
    /// # Errors
    ///
    /// See [`begin_transaction_with`](Self::begin_transaction_with).
    pub fn begin_deferred_transaction(&self) -> DbResult<()> {
        self.begin_transaction_with(TransactionBehavior::Deferred)
    }

    /// Begins an immediate transaction.
    ///
    /// # Errors
    ///
    /// See [`begin_transaction_with`](Self::begin_transaction_with).
    pub fn begin_immediate_transaction(&self) -> DbResult<()> {
        self.begin_transaction_with(TransactionBehavior::Immediate)
    }

    /// Commits the current transaction.
    ///
    /// The in-transaction flag is cleared whether or not the commit succeeds.
    ///
    /// # Errors
    ///
    /// Any error from [`execute_update`](Self::execute_update).
    pub fn commit(&self) -> DbResult<()> {
        let result = self.execute_update("COMMIT TRANSACTION", &[]);
        self.set_in_transaction(false);
        result
    }

    /// Rolls back the current transaction.
    ///
    /// The in-transaction flag is cleared whether or not the rollback
    /// succeeds.
    ///
    /// # Errors
    ///
    /// Any error from [`execute_update`](Self::execute_update).
    pub fn rollback(&self) -> DbResult<()> {
        let result = self.execute_update("ROLLBACK TRANSACTION", &[]);
        self.set_in_transaction(false);
        result
    }

    /// Begins an exclusive transaction scoped to the returned guard.
    ///
    /// # Errors
    ///
    /// See [`begin_transaction`](Self::begin_transaction).
    pub fn transaction(&self) -> DbResult<Transaction<'_>> {
        Transaction::begin(self, TransactionBehavior::Exclusive)
    }

    /// Begins a deferred transaction scoped to the returned guard.
    ///
    /// # Errors
    ///
    /// See [`begin_deferred_transaction`](Self::begin_deferred_transaction).
    pub fn deferred_transaction(&self) -> DbResult<Transaction<'_>> {
        Transaction::begin(self, TransactionBehavior::Deferred)
    }
}

/// An open database transaction.
///
/// Dereferences to the [`Database`], so statements run through the guard.
/// Rolls back on drop unless [`commit`](Self::commit) or
/// [`rollback`](Self::rollback) was called.
pub struct Transaction<'db> {
    db: &'db Database,
    finished: bool,
}

impl<'db> Transaction<'db> {
    fn begin(db: &'db Database, behavior: TransactionBehavior) -> DbResult<Self> {
        db.begin_transaction_with(behavior)?;
        Ok(Self {
            db,
            finished: false,
        })
    }

    /// Commits the transaction.
    ///
    /// # Errors
    ///
    /// See [`Database::commit`]. A failed commit (for example a deferred
    /// foreign key violation) leaves `SQLite` inside the transaction, so the
    /// guard rolls it back before returning the error. The last-error state
    /// keeps the commit failure.
    pub fn commit(mut self) -> DbResult<()> {
        self.finished = true;
        if let Err(err) = self.db.commit() {
            if let Err(rollback_err) = self.db.rollback() {
                log::warn!("rollback after failed commit also failed: {rollback_err}");
            }
            return self.db.track(Err(err));
        }
        Ok(())
    }

    /// Rolls the transaction back.
    ///
    /// # Errors
    ///
    /// See [`Database::rollback`]. The guard is consumed either way.
    pub fn rollback(mut self) -> DbResult<()> {
        self.finished = true;
        self.db.rollback()
    }
}

impl Deref for Transaction<'_> {
    type Target = Database;

    fn deref(&self) -> &Database {
        self.db
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(err) = self.db.rollback() {
                log::warn!("rollback of abandoned transaction failed: {err}");
            }
        }
    }
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
