//! Unit tests for the FMDB-style wrapper.

use test_case::test_case;

use super::*;

fn memory_db(cache: bool) -> Database {
    let db = Database::with_options(
        MEMORY_PATH,
        DatabaseOptions::default().cache_statements(cache),
    );
    db.open().expect("open in-memory db");
    db
}

fn people_db() -> Database {
    let db = memory_db(false);
    db.execute_update(
        "CREATE TABLE people (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE, age INTEGER, score REAL, photo BLOB)",
        &[],
    )
    .expect("create table");
    db.execute_update(
        "INSERT INTO people (name, age, score, photo) VALUES (?, ?, ?, ?)",
        params!["alice", 30, 4.5, vec![1_u8, 2, 3]],
    )
    .expect("insert alice");
    db.execute_update(
        "INSERT INTO people (name, age, score, photo) VALUES (?, ?, ?, ?)",
        params!["bob", None::<i64>, None::<f64>, None::<Vec<u8>>],
    )
    .expect("insert bob");
    db
}

// ── Open / close ────────────────────────────────────────────────────────

#[test]
fn test_open_close_reopen() {
    let db = Database::new(MEMORY_PATH);
    assert!(!db.database_exists());
    assert!(matches!(
        db.execute_update("CREATE TABLE t (id INTEGER)", &[]),
        Err(DbError::NotOpen)
    ));

    db.open().expect("open");
    assert!(db.database_exists());
    assert!(db.good_connection());
    db.open().expect("second open is a no-op");

    db.close().expect("close");
    assert!(!db.database_exists());
    assert!(!db.good_connection());
    db.close().expect("second close is a no-op");

    db.open().expect("reopen");
    assert!(db.good_connection());
}

#[test]
fn test_open_failure_leaves_database_closed() {
    let db = Database::with_options(
        "/nonexistent-dir/definitely/missing.sqlite",
        DatabaseOptions::default().flags(OpenFlags::READ_ONLY),
    );
    let err = db.open().expect_err("open must fail");
    assert!(matches!(err, DbError::Open { .. }));
    assert!(!db.database_exists());
    assert!(db.had_error());
}

#[test]
fn test_library_info() {
    assert!(Database::sqlite_lib_version().starts_with("3."));
    assert!(Database::is_thread_safe());
    assert_eq!(Database::new("x.db").path(), std::path::Path::new("x.db"));
}

// ── Statement cache ─────────────────────────────────────────────────────

#[test]
fn test_cache_reuses_compiled_statement() {
    let db = memory_db(true);
    db.execute_update("CREATE TABLE t (id INTEGER)", &[])
        .expect("create table");
    let before = db.statements_prepared();

    for i in 0..5 {
        db.execute_update("INSERT INTO t (id) VALUES (?)", params![i])
            .expect("insert");
    }

    assert_eq!(db.statements_prepared() - before, 1);
    assert_eq!(db.int_for_query("SELECT count(*) FROM t", &[]).expect("count"), 5);
}

#[test]
fn test_without_cache_every_execution_compiles() {
    let db = memory_db(false);
    db.execute_update("CREATE TABLE t (id INTEGER)", &[])
        .expect("create table");
    let before = db.statements_prepared();

    for i in 0..3 {
        db.execute_update("INSERT INTO t (id) VALUES (?)", params![i])
            .expect("insert");
    }

    assert_eq!(db.statements_prepared() - before, 3);
    assert_eq!(db.cached_statement_count(), 0);
}

#[test]
fn test_cached_statement_checked_out_by_open_cursor() {
    let db = memory_db(true);
    db.execute_update("CREATE TABLE t (id INTEGER)", &[])
        .expect("create table");
    db.execute_update("INSERT INTO t (id) VALUES (1), (2)", &[])
        .expect("insert");

    let sql = "SELECT id FROM t ORDER BY id";
    let mut first = db.execute_query(sql, &[]).expect("first query");
    assert!(first.next().expect("step"));

    // The first cursor still holds its statement, so the same SQL compiles again.
    let before = db.statements_prepared();
    let mut second = db.execute_query(sql, &[]).expect("second query");
    assert_eq!(db.statements_prepared() - before, 1);
    assert!(second.next().expect("step"));
    assert_eq!(second.int_for_column(0).expect("read"), 1);
    assert!(first.next().expect("step"));
    assert_eq!(first.int_for_column(0).expect("read"), 2);

    first.close();
    second.close();
    // CREATE, INSERT and one entry for the SELECT text.
    assert_eq!(db.cached_statement_count(), 3);

    let before = db.statements_prepared();
    let mut third = db.execute_query(sql, &[]).expect("third query");
    assert_eq!(db.statements_prepared(), before);
    assert!(third.next().expect("step"));
    assert_eq!(third.int_for_column(0).expect("read"), 1);
}

#[test]
fn test_disabling_cache_clears_it() {
    let db = memory_db(true);
    db.execute_update("CREATE TABLE t (id INTEGER)", &[])
        .expect("create table");
    assert_eq!(db.cached_statement_count(), 1);

    db.set_should_cache_statements(false);
    assert!(!db.should_cache_statements());
    assert_eq!(db.cached_statement_count(), 0);
}

#[test]
fn test_close_finalizes_cache_and_clears_transaction() {
    let db = memory_db(true);
    db.execute_update("CREATE TABLE t (id INTEGER)", &[])
        .expect("create table");
    db.begin_transaction().expect("begin");
    db.close().expect("close");
    assert_eq!(db.cached_statement_count(), 0);
    assert!(!db.is_in_transaction());
}

// ── Cursor lifecycle ────────────────────────────────────────────────────

#[test]
fn test_cursor_lifecycle() {
    let db = people_db();
    let mut cursor = db
        .execute_query("SELECT name FROM people ORDER BY id", &[])
        .expect("query");
    assert_eq!(cursor.state(), CursorState::BeforeFirst);
    assert!(matches!(cursor.string_for_column(0), Err(DbError::NoRow)));

    assert!(cursor.next().expect("row 1"));
    assert_eq!(cursor.state(), CursorState::OnRow);
    assert!(cursor.has_another_row());
    assert!(cursor.next().expect("row 2"));
    assert!(!cursor.next().expect("end"));
    assert_eq!(cursor.state(), CursorState::Exhausted);
    assert!(!cursor.next().expect("still at end"));

    cursor.close();
    assert!(cursor.is_closed());
    assert!(cursor.statement().is_none());
    assert_eq!(cursor.column_count(), 0);
    assert!(matches!(cursor.next(), Err(DbError::ClosedCursor)));
    assert!(matches!(
        cursor.string_for_column(0),
        Err(DbError::ClosedCursor)
    ));
    cursor.close();
    assert!(cursor.is_closed());
}

fn read_column(cursor: &Cursor<'_>, accessor: &str) -> DbResult<()> {
    match accessor {
        "int" => cursor.int_for_column(0).map(|_| ()),
        "long" => cursor.long_for_column("name").map(|_| ()),
        "bool" => cursor.bool_for_column(0).map(|_| ()),
        "double" => cursor.double_for_column(0).map(|_| ()),
        "string" => cursor.string_for_column("name").map(|_| ()),
        "data" => cursor.data_for_column(0).map(|_| ()),
        "data_no_copy" => cursor.data_no_copy_for_column(0).map(|_| ()),
        "value" => cursor.value_for_column(0).map(|_| ()),
        "is_null" => cursor.column_is_null(0).map(|_| ()),
        "index_for_name" => cursor.column_index_for_name("name").map(|_| ()),
        "name_for_index" => cursor.column_name_for_index(0).map(|_| ()),
        other => panic!("unknown accessor {other}"),
    }
}

#[test_case("int")]
#[test_case("long")]
#[test_case("bool")]
#[test_case("double")]
#[test_case("string")]
#[test_case("data")]
#[test_case("data_no_copy")]
#[test_case("value")]
#[test_case("is_null")]
#[test_case("index_for_name")]
#[test_case("name_for_index")]
fn test_every_accessor_fails_after_close(accessor: &str) {
    let db = people_db();
    let mut cursor = db
        .execute_query("SELECT name FROM people ORDER BY id", &[])
        .expect("query");
    assert!(cursor.next().expect("row"));
    read_column(&cursor, accessor).expect("readable while open");

    cursor.close();
    assert!(matches!(
        read_column(&cursor, accessor),
        Err(DbError::ClosedCursor)
    ));
}

#[test]
fn test_cursor_after_database_close() {
    let db = people_db();
    let mut cursor = db.execute_query("SELECT name FROM people", &[]).expect("query");
    db.close().expect("close");
    assert!(matches!(cursor.next(), Err(DbError::NotOpen)));
    cursor.close();
}

#[test]
fn test_cursor_metadata() {
    let db = people_db();
    let cursor = db
        .execute_query("SELECT id, name AS Label FROM people", &[])
        .expect("query");
    assert_eq!(cursor.sql(), "SELECT id, name AS Label FROM people");
    assert_eq!(cursor.column_count(), 2);
    assert_eq!(cursor.column_names(), ["id", "Label"]);
    assert_eq!(cursor.column_index_for_name("label").expect("lookup"), 1);
    assert_eq!(cursor.column_name_for_index(0).expect("lookup"), "id");
    assert!(matches!(
        cursor.column_index_for_name("missing"),
        Err(DbError::ColumnNotFound(ColumnRef::Name(name))) if name == "missing"
    ));
    assert!(matches!(
        cursor.column_name_for_index(7),
        Err(DbError::ColumnNotFound(ColumnRef::Index(7)))
    ));
    assert!(std::ptr::eq(cursor.database(), &db));
}

#[test]
fn test_column_lookup_by_name() {
    let db = people_db();
    let mut cursor = db
        .execute_query("SELECT * FROM people WHERE name = ?", params!["alice"])
        .expect("query");
    assert!(cursor.next().expect("row"));
    assert_eq!(cursor.string_for_column("NAME").expect("name"), "alice");
    assert_eq!(cursor.int_for_column("age").expect("age"), 30);
    assert!((cursor.double_for_column("score").expect("score") - 4.5).abs() < f64::EPSILON);
    assert!(matches!(
        cursor.int_for_column("nope"),
        Err(DbError::ColumnNotFound(_))
    ));
    assert!(matches!(
        cursor.int_for_column(99),
        Err(DbError::ColumnNotFound(ColumnRef::Index(99)))
    ));
}

// ── Coercions and typed reads ───────────────────────────────────────────

#[test]
fn test_text_coerces_to_number() {
    let db = memory_db(false);
    let mut cursor = db.execute_query("SELECT '42', '2.5'", &[]).expect("query");
    assert!(cursor.next().expect("row"));
    assert_eq!(cursor.int_for_column(0).expect("int"), 42);
    assert_eq!(cursor.long_for_column(0).expect("long"), 42);
    assert!(cursor.bool_for_column(0).expect("bool"));
    assert!((cursor.double_for_column(1).expect("double") - 2.5).abs() < f64::EPSILON);
}

#[test]
fn test_null_reads_as_zero_values() {
    let db = people_db();
    let mut cursor = db
        .execute_query("SELECT age, score, photo FROM people WHERE name = 'bob'", &[])
        .expect("query");
    assert!(cursor.next().expect("row"));
    assert!(cursor.column_is_null("age").expect("is null"));
    assert_eq!(cursor.int_for_column("age").expect("int"), 0);
    assert_eq!(cursor.long_for_column("age").expect("long"), 0);
    assert!(!cursor.bool_for_column("age").expect("bool"));
    assert!(cursor.double_for_column("score").expect("double").abs() < f64::EPSILON);
    assert_eq!(cursor.string_for_column("age").expect("text"), "");
    assert_eq!(cursor.data_for_column("photo").expect("data"), None);
    assert_eq!(cursor.data_no_copy_for_column("photo").expect("data"), None);
    assert_eq!(cursor.value_for_column("photo").expect("value"), Value::Null);
}

#[test]
fn test_blob_reads() {
    let db = people_db();
    let mut cursor = db
        .execute_query("SELECT photo, x'' FROM people WHERE name = 'alice'", &[])
        .expect("query");
    assert!(cursor.next().expect("row"));
    assert_eq!(
        cursor.data_no_copy_for_column(0).expect("borrowed"),
        Some(&[1_u8, 2, 3][..])
    );
    assert_eq!(cursor.data_for_column(0).expect("copied"), Some(vec![1, 2, 3]));
    assert_eq!(cursor.data_for_column(1).expect("empty blob"), Some(Vec::new()));
}

#[test_case("SELECT 7", Value::Integer(7) ; "integer")]
#[test_case("SELECT 1.25", Value::Real(1.25) ; "real")]
#[test_case("SELECT 'hi'", Value::Text("hi".to_string()) ; "text")]
#[test_case("SELECT x'0aff'", Value::Blob(vec![0x0a, 0xff]) ; "blob")]
#[test_case("SELECT NULL", Value::Null ; "null")]
fn test_value_for_column_keeps_storage_class(sql: &str, expected: Value) {
    let db = memory_db(false);
    let mut cursor = db.execute_query(sql, &[]).expect("query");
    assert!(cursor.next().expect("row"));
    assert_eq!(cursor.value_for_column(0).expect("value"), expected);
}

#[test_case(Value::from(true), 1 ; "bool")]
#[test_case(Value::from(-3_i32), -3 ; "i32")]
#[test_case(Value::from(9_u32), 9 ; "u32")]
#[test_case(Value::from(Some(5_i64)), 5 ; "some")]
fn test_bound_integers_round_through_sqlite(value: Value, expected: i64) {
    let db = memory_db(false);
    let read = db
        .long_for_query("SELECT ?", std::slice::from_ref(&value))
        .expect("query");
    assert_eq!(read, expected);
}

// ── Scalar query helpers ────────────────────────────────────────────────

#[test]
fn test_scalar_helpers() {
    let db = people_db();
    assert_eq!(db.int_for_query("SELECT count(*) FROM people", &[]).expect("int"), 2);
    assert_eq!(
        db.long_for_query("SELECT age FROM people WHERE name = ?", params!["alice"])
            .expect("long"),
        30
    );
    assert!(db.bool_for_query("SELECT 1", &[]).expect("bool"));
    assert!(
        (db.double_for_query("SELECT score FROM people WHERE id = 1", &[])
            .expect("double")
            - 4.5)
            .abs()
            < f64::EPSILON
    );
    assert_eq!(
        db.string_for_query("SELECT name FROM people ORDER BY id DESC", &[])
            .expect("string"),
        "bob"
    );
    assert_eq!(
        db.data_for_query("SELECT photo FROM people WHERE id = 1", &[])
            .expect("data"),
        Some(vec![1, 2, 3])
    );
    assert_eq!(
        db.value_for_query("SELECT name FROM people WHERE id = 1", &[])
            .expect("value"),
        Value::Text("alice".to_string())
    );
}

#[test]
fn test_scalar_helpers_on_empty_result() {
    let db = people_db();
    let sql = "SELECT age FROM people WHERE name = 'nobody'";
    assert_eq!(db.int_for_query(sql, &[]).expect("int"), 0);
    assert_eq!(db.long_for_query(sql, &[]).expect("long"), 0);
    assert!(!db.bool_for_query(sql, &[]).expect("bool"));
    assert!(db.double_for_query(sql, &[]).expect("double").abs() < f64::EPSILON);
    assert_eq!(db.string_for_query(sql, &[]).expect("string"), "");
    assert_eq!(db.data_for_query(sql, &[]).expect("data"), None);
    assert_eq!(db.value_for_query(sql, &[]).expect("value"), Value::Null);
    assert!(!db.had_error());
}

// ── Binding and error state ─────────────────────────────────────────────

#[test]
fn test_bind_count_mismatch() {
    let db = people_db();
    let err = db
        .execute_update("INSERT INTO people (name, age) VALUES (?, ?)", params!["carol"])
        .expect_err("too few parameters");
    assert!(matches!(err, DbError::Bind { code: ErrorCode::RANGE, .. }));
    assert_eq!(db.last_error_code(), ErrorCode::RANGE);

    let err = db
        .execute_query("SELECT * FROM people", params![1])
        .expect_err("too many parameters");
    assert!(matches!(err, DbError::Bind { .. }));
    assert_eq!(db.int_for_query("SELECT count(*) FROM people", &[]).expect("count"), 2);
}

#[test]
fn test_last_error_after_constraint_violation() {
    let db = people_db();
    assert!(!db.had_error());
    assert_eq!(db.last_error_message(), "not an error");

    let err = db
        .execute_update("INSERT INTO people (name) VALUES (?)", params!["alice"])
        .expect_err("duplicate name");
    assert!(matches!(err, DbError::Step { .. }));
    assert_eq!(err.code().map(ErrorCode::primary), Some(ErrorCode::CONSTRAINT));
    assert!(db.had_error());
    assert_eq!(db.last_error_code().primary(), ErrorCode::CONSTRAINT);
    assert!(db.last_error_message().contains("UNIQUE"));

    db.execute_update("INSERT INTO people (name) VALUES (?)", params!["carol"])
        .expect("insert");
    assert!(!db.had_error());
    assert_eq!(db.last_error_code(), ErrorCode::OK);
}

#[test]
fn test_wrapper_errors_leave_error_state_alone() {
    let db = people_db();
    let mut cursor = db.execute_query("SELECT name FROM people", &[]).expect("query");
    assert!(cursor.next().expect("row"));
    assert!(cursor.string_for_column("nope").is_err());
    assert!(!db.had_error());
}

#[test]
fn test_validate_sql() {
    let db = people_db();
    db.validate_sql("SELECT name FROM people").expect("valid");
    let err = db.validate_sql("SELEC name FROM people").expect_err("invalid");
    assert!(matches!(err, DbError::Prepare { .. }));
    assert!(db.had_error());
    assert!(db.validate_sql("SELECT * FROM missing_table").is_err());
}

#[test]
fn test_row_info() {
    let db = people_db();
    db.execute_update("INSERT INTO people (name) VALUES ('carol')", &[])
        .expect("insert");
    assert_eq!(db.last_insert_row_id(), 3);
    db.execute_update("UPDATE people SET age = 1", &[])
        .expect("update");
    assert_eq!(db.changes(), 3);
}

// ── Transactions ────────────────────────────────────────────────────────

#[test_case(TransactionBehavior::Deferred ; "deferred")]
#[test_case(TransactionBehavior::Immediate ; "immediate")]
#[test_case(TransactionBehavior::Exclusive ; "exclusive")]
fn test_transaction_flag(behavior: TransactionBehavior) {
    let db = people_db();
    assert!(!db.in_use());
    db.begin_transaction_with(behavior).expect("begin");
    assert!(db.is_in_transaction());
    assert!(db.in_use());
    db.commit().expect("commit");
    assert!(!db.is_in_transaction());
    assert!(!db.in_use());
}

#[test]
fn test_rollback_discards_changes() {
    let db = people_db();
    db.begin_deferred_transaction().expect("begin");
    db.execute_update("DELETE FROM people", &[]).expect("delete");
    db.rollback().expect("rollback");
    assert!(!db.is_in_transaction());
    assert_eq!(db.int_for_query("SELECT count(*) FROM people", &[]).expect("count"), 2);
}

#[test]
fn test_commit_without_transaction_clears_flag() {
    let db = people_db();
    assert!(db.commit().is_err());
    assert!(!db.is_in_transaction());

    db.begin_immediate_transaction().expect("begin");
    assert!(db.begin_transaction().is_err());
    assert!(db.is_in_transaction());
    db.rollback().expect("rollback");
    assert!(db.rollback().is_err());
    assert!(!db.is_in_transaction());
}

#[test]
fn test_transaction_guard_commit() {
    let db = people_db();
    {
        let tx = db.transaction().expect("begin tx");
        tx.execute_update("INSERT INTO people (name) VALUES ('carol')", &[])
            .expect("insert");
        tx.commit().expect("commit");
    }
    assert_eq!(db.int_for_query("SELECT count(*) FROM people", &[]).expect("count"), 3);
}

#[test]
fn test_transaction_guard_rollback_on_drop() {
    let db = people_db();
    {
        let tx = db.deferred_transaction().expect("begin tx");
        tx.execute_update("INSERT INTO people (name) VALUES ('carol')", &[])
            .expect("insert");
        assert!(tx.is_in_transaction());
    }
    assert!(!db.is_in_transaction());
    assert_eq!(db.int_for_query("SELECT count(*) FROM people", &[]).expect("count"), 2);
}

fn deferred_foreign_key_db() -> Database {
    let db = memory_db(false);
    db.execute_update("PRAGMA foreign_keys = ON", &[])
        .expect("enable foreign keys");
    db.execute_sql_bytes(
        b"CREATE TABLE parent (id INTEGER PRIMARY KEY);\n\
          CREATE TABLE child (parent_id INTEGER REFERENCES parent (id) DEFERRABLE INITIALLY DEFERRED);",
    )
    .expect("create tables");
    db
}

#[test]
fn test_transaction_guard_rolls_back_failed_commit() {
    let db = deferred_foreign_key_db();
    let tx = db.transaction().expect("begin tx");
    tx.execute_update("INSERT INTO child VALUES (99)", &[])
        .expect("foreign key is only checked at commit");

    let err = tx.commit().expect_err("commit rejects dangling reference");
    assert!(matches!(err, DbError::Step { .. }));
    assert_eq!(db.last_error_code().primary(), ErrorCode::CONSTRAINT);
    assert!(!db.is_in_transaction());
    assert_eq!(db.int_for_query("SELECT count(*) FROM child", &[]).expect("count"), 0);

    db.begin_transaction().expect("no transaction left open");
    db.commit().expect("commit");
}

#[test]
fn test_in_use_flag_is_advisory() {
    let db = people_db();
    db.set_in_use(true);
    assert!(db.in_use());
    assert_eq!(db.int_for_query("SELECT count(*) FROM people", &[]).expect("count"), 2);
    db.set_in_use(false);
    assert!(!db.in_use());
}

// ── Schema ──────────────────────────────────────────────────────────────

#[test]
fn test_table_and_column_exists() {
    let db = people_db();
    assert!(db.table_exists("people").expect("exists"));
    assert!(db.table_exists("PEOPLE").expect("exists"));
    assert!(!db.table_exists("ghosts").expect("exists"));
    assert!(db.column_exists("people", "Age").expect("exists"));
    assert!(!db.column_exists("people", "height").expect("exists"));
    assert!(!db.column_exists("ghosts", "age").expect("exists"));
}

#[test]
fn test_table_schema() {
    let db = people_db();
    let mut cursor = db.get_table_schema("people").expect("table info");
    let mut columns = Vec::new();
    while cursor.next().expect("step") {
        columns.push(cursor.string_for_column("name").expect("name"));
    }
    assert_eq!(columns, ["id", "name", "age", "score", "photo"]);
}

#[test]
fn test_schema_lists_objects() {
    let db = people_db();
    db.execute_update("CREATE INDEX people_age ON people (age)", &[])
        .expect("create index");
    let mut cursor = db.get_schema().expect("schema");
    let mut objects = Vec::new();
    while cursor.next().expect("step") {
        objects.push((
            cursor.string_for_column("type").expect("type"),
            cursor.string_for_column("name").expect("name"),
        ));
    }
    assert!(objects.contains(&("table".to_string(), "people".to_string())));
    assert!(objects.contains(&("index".to_string(), "people_age".to_string())));
    assert!(objects.iter().all(|(_, name)| !name.starts_with("sqlite_")));
}

// ── Scripts ─────────────────────────────────────────────────────────────

#[test]
fn test_script_runs_every_statement() {
    let db = memory_db(false);
    db.execute_sql_bytes(
        b"CREATE TABLE t (id INTEGER, note TEXT);\n\
          INSERT INTO t VALUES (1, 'a;b');\n\
          INSERT INTO t VALUES (2, 'c');\n",
    )
    .expect("script");
    assert_eq!(db.int_for_query("SELECT count(*) FROM t", &[]).expect("count"), 2);
    assert_eq!(
        db.string_for_query("SELECT note FROM t WHERE id = 1", &[])
            .expect("note"),
        "a;b"
    );
    assert!(!db.is_in_transaction());
}

#[test]
fn test_script_is_atomic() {
    let db = memory_db(false);
    db.execute_update("CREATE TABLE t (id INTEGER)", &[])
        .expect("create table");
    let err = db
        .execute_sql_bytes(b"INSERT INTO t VALUES (1); INSERT INTO t VALUES (2); INSERT INTO nope VALUES (3);")
        .expect_err("third statement fails");
    assert!(matches!(err, DbError::Prepare { .. }));
    assert_eq!(db.int_for_query("SELECT count(*) FROM t", &[]).expect("count"), 0);
    assert!(!db.is_in_transaction());
}

#[test]
fn test_script_rolls_back_when_commit_fails() {
    let db = deferred_foreign_key_db();
    let err = db
        .execute_sql_bytes(b"INSERT INTO parent VALUES (1); INSERT INTO child VALUES (99);")
        .expect_err("commit rejects dangling reference");
    assert_eq!(err.code().map(ErrorCode::primary), Some(ErrorCode::CONSTRAINT));
    assert!(db.had_error());
    assert!(!db.is_in_transaction());
    assert_eq!(db.int_for_query("SELECT count(*) FROM parent", &[]).expect("count"), 0);
    assert_eq!(db.int_for_query("SELECT count(*) FROM child", &[]).expect("count"), 0);

    db.begin_transaction().expect("no transaction left open");
    db.rollback().expect("rollback");
}

#[test]
fn test_script_rejects_invalid_utf8() {
    let db = memory_db(false);
    assert!(matches!(
        db.execute_sql_bytes(&[0xff, 0xfe, 0x00]),
        Err(DbError::Script(_))
    ));
}

#[test]
fn test_empty_script_is_ok() {
    let db = memory_db(false);
    db.execute_sql_bytes(b"  \n -- nothing here\n").expect("empty script");
    db.execute_sql_bytes("\u{feff}SELECT 1;".as_bytes())
        .expect("bom is skipped");
}
