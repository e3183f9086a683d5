//! Schema introspection through `sqlite_master` and `PRAGMA table_info`.

use crate::connection::Database;
use crate::cursor::Cursor;
use crate::error::DbResult;
use crate::params;

/// Every user object in the main and temp schemas.
const SCHEMA_SQL: &str = "SELECT type, name, tbl_name, rootpage, sql \
     FROM (SELECT * FROM sqlite_master UNION ALL SELECT * FROM sqlite_temp_master) \
     WHERE type != 'meta' AND name NOT LIKE 'sqlite_%' \
     ORDER BY tbl_name, type DESC, name";

const TABLE_EXISTS_SQL: &str =
    "SELECT name FROM sqlite_master WHERE type = 'table' AND lower(name) = lower(?)";

/// Quotes `name` as a SQL string literal for statements that cannot take
/// bound parameters, such as PRAGMAs.
fn quote_literal(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

impl Database {
    /// Whether a table called `table_name` exists (case-insensitive).
    ///
    /// # Errors
    ///
    /// Any error from [`execute_query`](Self::execute_query).
    pub fn table_exists(&self, table_name: &str) -> DbResult<bool> {
        let mut cursor = self.execute_query(TABLE_EXISTS_SQL, params![table_name])?;
        let found = cursor.next()?;
        cursor.close();
        Ok(found)
    }

    /// Cursor over the schema: columns `type`, `name`, `tbl_name`, `rootpage`
    /// and `sql`, one row per table, index, view and trigger.
    ///
    /// # Errors
    ///
    /// Any error from [`execute_query`](Self::execute_query).
    pub fn get_schema(&self) -> DbResult<Cursor<'_>> {
        self.execute_query(SCHEMA_SQL, &[])
    }

    /// Cursor over `PRAGMA table_info` for `table_name`: columns `cid`,
    /// `name`, `type`, `notnull`, `dflt_value` and `pk`, one row per column.
    ///
    /// # Errors
    ///
    /// Any error from [`execute_query`](Self::execute_query).
    pub fn get_table_schema(&self, table_name: &str) -> DbResult<Cursor<'_>> {
        let sql = format!("PRAGMA table_info({})", quote_literal(table_name));
        self.execute_query(&sql, &[])
    }

    /// Whether `table_name` has a column called `column_name`
    /// (case-insensitive).
    ///
    /// # Errors
    ///
    /// Any error from [`get_table_schema`](Self::get_table_schema).
    pub fn column_exists(&self, table_name: &str, column_name: &str) -> DbResult<bool> {
        let mut cursor = self.get_table_schema(table_name)?;
        let mut found = false;
        while cursor.next()? {
            if cursor.string_for_column("name")?.eq_ignore_ascii_case(column_name) {
                found = true;
                break;
            }
        }
        cursor.close();
        Ok(found)
    }
}
