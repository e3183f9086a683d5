//! Busy retry policy shared by prepare and step.
//!
//! Each retry is one full re-attempt of the `sqlite3_prepare_v2` or
//! `sqlite3_step` call that reported `SQLITE_BUSY`/`SQLITE_LOCKED`; no
//! `sqlite3_busy_handler` is installed. A budget of `N` allows exactly `N`
//! busy attempts per operation, and `0` retries until the lock clears.
//!
//! The schedule is a constant [`backon`] backoff. One backoff is built per
//! operation and drained by every native call the operation makes, so the
//! prepare and the steps that follow share the same budget.

use std::cell::Cell;
use std::thread;
use std::time::Duration;

use backon::{BackoffBuilder, BlockingRetryable, ConstantBackoff, ConstantBuilder};

use crate::error::{DbError, DbResult, NativeError};

/// Pause between two attempts.
const RETRY_DELAY: Duration = Duration::from_micros(20);

/// Blocks the current thread between two attempts.
pub(crate) type Sleeper = fn(Duration);

/// Retry state for one database operation.
#[derive(Debug)]
pub(crate) struct BusyRetry<'a> {
    backoff: ConstantBackoff,
    sleeper: Sleeper,
    busy_calls: u32,
    /// Running total kept by the owning database.
    total: &'a Cell<u64>,
}

impl<'a> BusyRetry<'a> {
    pub(crate) fn new(limit: u32, total: &'a Cell<u64>) -> Self {
        Self::with_sleeper(limit, total, thread::sleep)
    }

    pub(crate) fn with_sleeper(limit: u32, total: &'a Cell<u64>, sleeper: Sleeper) -> Self {
        let builder = ConstantBuilder::default().with_delay(RETRY_DELAY);
        let builder = match limit {
            0 => builder.without_max_times(),
            n => builder.with_max_times(usize::try_from(n - 1).unwrap_or(usize::MAX)),
        };
        Self {
            backoff: builder.build(),
            sleeper,
            busy_calls: 0,
            total,
        }
    }

    /// Runs `attempt` until it returns something other than busy or the
    /// budget is spent.
    ///
    /// A non-busy failure is turned into a [`DbError`] by `fail`; a spent
    /// budget yields [`DbError::BusyTimeout`].
    pub(crate) fn run<T>(
        &mut self,
        mut attempt: impl FnMut() -> Result<T, NativeError>,
        fail: impl FnOnce(NativeError) -> DbError,
    ) -> DbResult<T> {
        let busy_calls = &mut self.busy_calls;
        let total = self.total;
        let counted = || {
            let result = attempt();
            if matches!(&result, Err(err) if err.is_busy()) {
                *busy_calls += 1;
                total.set(total.get() + 1);
            }
            result
        };
        let outcome = counted
            .retry(&mut self.backoff)
            .sleep(self.sleeper)
            .when(NativeError::is_busy)
            .notify(|err: &NativeError, delay: Duration| {
                log::debug!("database is busy ({}), retrying in {delay:?}", err.message);
            })
            .call();

        match outcome {
            Ok(value) => Ok(value),
            Err(err) if err.is_busy() => {
                log::warn!(
                    "database still busy after {} attempts, giving up",
                    self.busy_calls
                );
                Err(DbError::BusyTimeout {
                    attempts: self.busy_calls,
                })
            }
            Err(err) => Err(fail(err)),
        }
    }
}
