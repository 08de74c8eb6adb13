//! Integration tests against real fixture databases

use sqlite_reader::{Database, Error, Projection, QueryOutput, SelectStatement};

/// The canonical three-table fixture: apples, oranges, pears on 4096-byte
/// pages, apples holding four known rows.
fn tiny_db(path: &std::path::Path) {
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.execute_batch(
        "
        PRAGMA page_size = 4096;
        CREATE TABLE apples (id integer primary key, name text, color text);
        CREATE TABLE oranges (id integer primary key, name text, description text);
        CREATE TABLE pears (id integer primary key, name text);

        INSERT INTO apples (name, color) VALUES
            ('Granny Smith', 'Light Green'),
            ('Fuji', 'Red'),
            ('Honeycrisp', 'Blush Red'),
            ('Golden Delicious', 'Yellow');
        ",
    )
    .unwrap();
}

#[test]
fn test_dbinfo_page_size_and_table_count() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tiny.db");
    tiny_db(&path);

    let db = Database::open(&path).unwrap();
    assert_eq!(db.page_size(), 4096);
    assert_eq!(db.table_count(), 3);
}

#[test]
fn test_tables_listed_sorted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tiny.db");
    // Insertion order deliberately differs from lexicographic order
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch(
        "
        CREATE TABLE pears (id integer primary key, name text);
        CREATE TABLE apples (id integer primary key, name text);
        CREATE TABLE oranges (id integer primary key, name text);
        ",
    )
    .unwrap();
    drop(conn);

    let db = Database::open(&path).unwrap();
    assert_eq!(db.list_tables(), vec!["apples", "oranges", "pears"]);
}

#[test]
fn test_autoincrement_bookkeeping_table_is_hidden() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("auto.db");
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch(
        "
        CREATE TABLE logs (id integer primary key autoincrement, line text);
        INSERT INTO logs (line) VALUES ('a'), ('b');
        ",
    )
    .unwrap();
    drop(conn);

    let db = Database::open(&path).unwrap();
    // sqlite_sequence exists in the file but is not a user table
    assert_eq!(db.list_tables(), vec!["logs"]);
    assert_eq!(db.table_count(), 1);
}

#[test]
fn test_count_star() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tiny.db");
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch("CREATE TABLE apples (id integer primary key, name text);")
        .unwrap();
    for i in 0..42 {
        conn.execute(
            "INSERT INTO apples (name) VALUES (?1)",
            rusqlite::params![format!("apple-{i}")],
        )
        .unwrap();
    }
    drop(conn);

    let mut db = Database::open(&path).unwrap();
    let output = db.execute_sql("SELECT COUNT(*) FROM apples").unwrap();
    assert_eq!(output, QueryOutput::Count(42));
    assert_eq!(db.row_count("apples").unwrap(), 42);
}

#[test]
fn test_select_with_equality_filter() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tiny.db");
    tiny_db(&path);

    let mut db = Database::open(&path).unwrap();
    let output = db
        .execute_sql("SELECT name, color FROM apples WHERE color = 'Yellow'")
        .unwrap();
    assert_eq!(
        output,
        QueryOutput::Rows(vec![vec![
            "Golden Delicious".to_string(),
            "Yellow".to_string()
        ]])
    );
}

#[test]
fn test_rowid_alias_renders_rowid() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tiny.db");
    tiny_db(&path);

    let mut db = Database::open(&path).unwrap();
    // The id column stores NULL on disk; the rowid must show through.
    let output = db
        .execute_sql("SELECT id, name FROM apples WHERE id = 3")
        .unwrap();
    assert_eq!(
        output,
        QueryOutput::Rows(vec![vec!["3".to_string(), "Honeycrisp".to_string()]])
    );
}

#[test]
fn test_rowid_alias_off_first_column() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tiny.db");
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch(
        "
        CREATE TABLE notes (title text, id integer primary key, body text);
        INSERT INTO notes (title, body) VALUES ('first', 'aaa'), ('second', 'bbb');
        ",
    )
    .unwrap();
    drop(conn);

    let mut db = Database::open(&path).unwrap();
    let output = db
        .execute_sql("SELECT id, title FROM notes WHERE id = 2")
        .unwrap();
    assert_eq!(
        output,
        QueryOutput::Rows(vec![vec!["2".to_string(), "second".to_string()]])
    );
}

#[test]
fn test_select_star_projects_all_columns() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tiny.db");
    tiny_db(&path);

    let mut db = Database::open(&path).unwrap();
    let output = db.execute_sql("SELECT * FROM apples WHERE id = 1").unwrap();
    assert_eq!(
        output,
        QueryOutput::Rows(vec![vec![
            "1".to_string(),
            "Granny Smith".to_string(),
            "Light Green".to_string()
        ]])
    );
}

#[test]
fn test_null_fields_render_as_null_marker() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tiny.db");
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch(
        "
        CREATE TABLE contacts (id integer primary key, name text, email text);
        INSERT INTO contacts (name, email) VALUES ('Diana', NULL);
        ",
    )
    .unwrap();
    drop(conn);

    let mut db = Database::open(&path).unwrap();
    let output = db
        .execute_sql("SELECT name, email FROM contacts WHERE id = 1")
        .unwrap();
    assert_eq!(
        output,
        QueryOutput::Rows(vec![vec!["Diana".to_string(), "<null>".to_string()]])
    );
}

#[test]
fn test_unknown_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tiny.db");
    tiny_db(&path);

    let mut db = Database::open(&path).unwrap();
    let result = db.execute_sql("SELECT name FROM bananas");
    assert!(matches!(result, Err(Error::UnknownName(name)) if name == "bananas"));
}

#[test]
fn test_unknown_column() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tiny.db");
    tiny_db(&path);

    let mut db = Database::open(&path).unwrap();
    let result = db.execute_sql("SELECT flavour FROM apples");
    assert!(matches!(result, Err(Error::UnknownName(_))));
    let result = db.execute_sql("SELECT name FROM apples WHERE flavour = 'x'");
    assert!(matches!(result, Err(Error::UnknownName(_))));
}

#[test]
fn test_unsupported_statements_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tiny.db");
    tiny_db(&path);

    let mut db = Database::open(&path).unwrap();
    for sql in [
        "SELECT name FROM apples ORDER BY name",
        "SELECT a.name FROM apples a JOIN pears p ON a.id = p.id",
        "SELECT name FROM apples WHERE id > 2",
    ] {
        assert!(
            matches!(db.execute_sql(sql), Err(Error::Unsupported(_))),
            "expected Unsupported for {sql}"
        );
    }
}

#[test]
fn test_open_invalid_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("invalid.db");
    std::fs::write(&path, vec![0u8; 200]).unwrap();

    assert!(matches!(Database::open(&path), Err(Error::Malformed(_))));
}

#[test]
fn test_open_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.db");
    assert!(matches!(Database::open(&path), Err(Error::Io(_))));
}

#[test]
fn test_parse_statement_shapes() {
    let stmt = SelectStatement::parse("SELECT COUNT(*) FROM apples").unwrap();
    assert_eq!(stmt.projection, Projection::CountStar);

    let stmt = SelectStatement::parse("SELECT name FROM apples WHERE id IN (1, 3)").unwrap();
    assert_eq!(stmt.binding("id"), Some("1,3"));
}
