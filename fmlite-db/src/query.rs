//! Single-value query helpers.
//!
//! Each helper runs the query, reads column 0 of the first row and closes the
//! cursor. An empty result yields the zero value of the type.

use crate::connection::Database;
use crate::cursor::Cursor;
use crate::error::DbResult;
use crate::value::Value;

impl Database {
    fn first_column<T>(
        &self,
        sql: &str,
        params: &[Value],
        read: impl FnOnce(&Cursor<'_>) -> DbResult<T>,
    ) -> DbResult<Option<T>> {
        let mut cursor = self.execute_query(sql, params)?;
        let value = if cursor.next()? {
            Some(read(&cursor)?)
        } else {
            None
        };
        cursor.close();
        Ok(value)
    }

    /// First column of the first row as `i32`, or `0`.
    ///
    /// # Errors
    ///
    /// Any error from [`execute_query`](Self::execute_query) or stepping.
    pub fn int_for_query(&self, sql: &str, params: &[Value]) -> DbResult<i32> {
        self.first_column(sql, params, |c| c.int_for_column(0))
            .map(Option::unwrap_or_default)
    }

    /// First column of the first row as `i64`, or `0`.
    ///
    /// # Errors
    ///
    /// Any error from [`execute_query`](Self::execute_query) or stepping.
    pub fn long_for_query(&self, sql: &str, params: &[Value]) -> DbResult<i64> {
        self.first_column(sql, params, |c| c.long_for_column(0))
            .map(Option::unwrap_or_default)
    }

    /// First column of the first row as `bool`, or `false`.
    ///
    /// # Errors
    ///
    /// Any error from [`execute_query`](Self::execute_query) or stepping.
    pub fn bool_for_query(&self, sql: &str, params: &[Value]) -> DbResult<bool> {
        self.first_column(sql, params, |c| c.bool_for_column(0))
            .map(Option::unwrap_or_default)
    }

    /// First column of the first row as `f64`, or `0.0`.
    ///
    /// # Errors
    ///
    /// Any error from [`execute_query`](Self::execute_query) or stepping.
    pub fn double_for_query(&self, sql: &str, params: &[Value]) -> DbResult<f64> {
        self.first_column(sql, params, |c| c.double_for_column(0))
            .map(Option::unwrap_or_default)
    }

    /// First column of the first row as text, or an empty string.
    ///
    /// # Errors
    ///
    /// Any error from [`execute_query`](Self::execute_query) or stepping.
    pub fn string_for_query(&self, sql: &str, params: &[Value]) -> DbResult<String> {
        self.first_column(sql, params, |c| c.string_for_column(0))
            .map(Option::unwrap_or_default)
    }

    /// First column of the first row as bytes; `None` for NULL or no rows.
    ///
    /// # Errors
    ///
    /// Any error from [`execute_query`](Self::execute_query) or stepping.
    pub fn data_for_query(&self, sql: &str, params: &[Value]) -> DbResult<Option<Vec<u8>>> {
        self.first_column(sql, params, |c| c.data_for_column(0))
            .map(Option::flatten)
    }

    /// First column of the first row as a [`Value`], or [`Value::Null`].
    ///
    /// # Errors
    ///
    /// Any error from [`execute_query`](Self::execute_query) or stepping.
    pub fn value_for_query(&self, sql: &str, params: &[Value]) -> DbResult<Value> {
        self.first_column(sql, params, |c| c.value_for_column(0))
            .map(|v| v.unwrap_or(Value::Null))
    }
}
