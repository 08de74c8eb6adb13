//! Query execution against multi-page fixtures: scan strategies, index
//! acceleration, and tree-order properties

use sqlite_reader::{Catalog, Database, Pager, QueryOutput, btree};

const ROWS: usize = 1000;

/// A multi-page fixture on 512-byte pages: a thousand companies with a
/// `country` index. Rows 100..110 are the only ones in eritrea, so an
/// index-assisted query touches a handful of pages while a scan walks
/// dozens of leaves.
fn big_db(path: &std::path::Path) {
    let mut conn = rusqlite::Connection::open(path).unwrap();
    conn.execute_batch(
        "
        PRAGMA page_size = 512;
        CREATE TABLE companies (id integer primary key, name text, country text);
        CREATE INDEX idx_companies_country ON companies (country);
        ",
    )
    .unwrap();

    let countries = ["france", "ghana", "japan", "mexico", "norway", "peru", "tonga"];
    let tx = conn.transaction().unwrap();
    {
        let mut stmt = tx
            .prepare("INSERT INTO companies (name, country) VALUES (?1, ?2)")
            .unwrap();
        for i in 0..ROWS {
            let country = if (100..110).contains(&i) {
                "eritrea"
            } else {
                countries[i % countries.len()]
            };
            stmt.execute(rusqlite::params![format!("company-{i}"), country])
                .unwrap();
        }
    }
    tx.commit().unwrap();
}

fn users_db(path: &std::path::Path) {
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.execute_batch(
        "
        CREATE TABLE users (id integer primary key, name text, age integer, city text);
        CREATE INDEX idx_age_city ON users (age, city);
        CREATE INDEX idx_city ON users (city);
        INSERT INTO users (name, age, city) VALUES
            ('Alice', 30, 'New York'),
            ('Bob', 25, 'Los Angeles'),
            ('Charlie', 35, 'New York'),
            ('David', 30, 'Chicago'),
            ('Erin', 30, 'New York');
        ",
    )
    .unwrap();
}

#[test]
fn test_indexed_query_returns_every_match() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.db");
    big_db(&path);

    let mut db = Database::open(&path).unwrap();
    let output = db
        .execute_sql("SELECT name FROM companies WHERE country = 'eritrea'")
        .unwrap();

    let expected: Vec<Vec<String>> = (100..110).map(|i| vec![format!("company-{i}")]).collect();
    assert_eq!(output, QueryOutput::Rows(expected));
}

#[test]
fn test_indexed_query_touches_fewer_pages_than_scan() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.db");
    big_db(&path);

    // Full scan cost: counting rows walks every leaf of the table tree.
    let mut scan_db = Database::open(&path).unwrap();
    let opened = scan_db.pages_fetched();
    assert_eq!(scan_db.row_count("companies").unwrap(), ROWS);
    let scan_pages = scan_db.pages_fetched() - opened;

    // Index-assisted cost, measured on a fresh handle with a cold cache.
    let mut idx_db = Database::open(&path).unwrap();
    let opened = idx_db.pages_fetched();
    let output = idx_db
        .execute_sql("SELECT name FROM companies WHERE country = 'eritrea'")
        .unwrap();
    let indexed_pages = idx_db.pages_fetched() - opened;

    match output {
        QueryOutput::Rows(rows) => assert_eq!(rows.len(), 10),
        QueryOutput::Count(_) => panic!("expected rows"),
    }
    assert!(
        indexed_pages < scan_pages,
        "index path fetched {indexed_pages} pages, full scan {scan_pages}"
    );
}

#[test]
fn test_count_star_on_multi_page_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.db");
    big_db(&path);

    let mut db = Database::open(&path).unwrap();
    let output = db.execute_sql("SELECT COUNT(*) FROM companies").unwrap();
    assert_eq!(output, QueryOutput::Count(ROWS));
}

#[test]
fn test_filtered_count_uses_index() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.db");
    big_db(&path);

    let mut db = Database::open(&path).unwrap();
    let output = db
        .execute_sql("SELECT COUNT(*) FROM companies WHERE country = 'eritrea'")
        .unwrap();
    assert_eq!(output, QueryOutput::Count(10));
}

#[test]
fn test_multi_rowid_in_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.db");
    big_db(&path);

    let mut db = Database::open(&path).unwrap();
    // Out-of-order list; results come back in rowid order
    let output = db
        .execute_sql("SELECT id, name FROM companies WHERE id IN (999, 5, 250)")
        .unwrap();
    assert_eq!(
        output,
        QueryOutput::Rows(vec![
            vec!["5".to_string(), "company-4".to_string()],
            vec!["250".to_string(), "company-249".to_string()],
            vec!["999".to_string(), "company-998".to_string()],
        ])
    );
}

#[test]
fn test_rowid_point_lookup_on_deep_tree() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.db");
    big_db(&path);

    let mut db = Database::open(&path).unwrap();
    let output = db
        .execute_sql("SELECT name FROM companies WHERE id = 700")
        .unwrap();
    assert_eq!(
        output,
        QueryOutput::Rows(vec![vec!["company-699".to_string()]])
    );

    // Absent rowids simply match nothing
    let output = db
        .execute_sql("SELECT name FROM companies WHERE id = 100000")
        .unwrap();
    assert_eq!(output, QueryOutput::Rows(vec![]));
}

#[test]
fn test_batch_lookup_matches_single_lookups() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.db");
    big_db(&path);

    let mut pager = Pager::open(&path).unwrap();
    let catalog = Catalog::load(&mut pager).unwrap();
    let root = catalog.table("companies").unwrap().root_page as usize - 1;

    let targets = [3i64, 250, 717, 999, 5000];
    let batch = btree::lookup_rowids(&mut pager, root, &targets, Some(0)).unwrap();
    assert_eq!(batch.len(), 4); // 5000 is absent

    for &rowid in &targets {
        let single = btree::lookup_rowids(&mut pager, root, &[rowid], Some(0)).unwrap();
        assert_eq!(single.contains_key(&rowid), batch.contains_key(&rowid));
        if let Some(cell) = single.get(&rowid) {
            assert_eq!(
                cell.fields[1].render(),
                batch[&rowid].fields[1].render()
            );
        }
    }
}

#[test]
fn test_leaf_enumeration_yields_increasing_rowids() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.db");
    big_db(&path);

    let mut pager = Pager::open(&path).unwrap();
    let catalog = Catalog::load(&mut pager).unwrap();
    let root = catalog.table("companies").unwrap().root_page as usize - 1;

    let leaves = btree::table_leaf_pages(&mut pager, root).unwrap();
    assert!(leaves.len() > 1, "fixture should span multiple leaf pages");

    let mut rowids = Vec::new();
    for leaf in leaves {
        let page = pager.read_page(leaf).unwrap();
        for i in 0..usize::from(page.cell_count) {
            rowids.push(page.table_leaf_cell(i, None).unwrap().rowid);
        }
    }
    assert_eq!(rowids.len(), ROWS);
    assert!(rowids.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn test_index_enumeration_yields_sorted_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.db");
    big_db(&path);

    let mut pager = Pager::open(&path).unwrap();
    let catalog = Catalog::load(&mut pager).unwrap();
    let table = catalog.table("companies").unwrap();
    let index = catalog.table_indices(table)[0];

    // An empty bound component matches every key, enumerating the index
    let entries =
        btree::index_prefix_scan(&mut pager, index.root_page as usize - 1, &[String::new()])
            .unwrap();
    assert_eq!(entries.len(), ROWS);

    let countries: Vec<&str> = entries
        .iter()
        .map(|entry| entry.key[0].as_str())
        .collect();
    assert!(countries.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn test_composite_index_full_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.db");
    users_db(&path);

    let mut db = Database::open(&path).unwrap();
    let output = db
        .execute_sql("SELECT name FROM users WHERE age = 30 AND city = 'New York'")
        .unwrap();
    assert_eq!(
        output,
        QueryOutput::Rows(vec![
            vec!["Alice".to_string()],
            vec!["Erin".to_string()],
        ])
    );
}

#[test]
fn test_composite_index_prefix_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.db");
    users_db(&path);

    let mut db = Database::open(&path).unwrap();
    let output = db
        .execute_sql("SELECT name FROM users WHERE age = 30")
        .unwrap();
    assert_eq!(
        output,
        QueryOutput::Rows(vec![
            vec!["Alice".to_string()],
            vec!["David".to_string()],
            vec!["Erin".to_string()],
        ])
    );
}

#[test]
fn test_single_column_index_query() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.db");
    users_db(&path);

    let mut db = Database::open(&path).unwrap();
    let output = db
        .execute_sql("SELECT name, age FROM users WHERE city = 'Los Angeles'")
        .unwrap();
    assert_eq!(
        output,
        QueryOutput::Rows(vec![vec!["Bob".to_string(), "25".to_string()]])
    );
}

#[test]
fn test_unindexed_predicate_falls_back_to_scan() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.db");
    users_db(&path);

    let mut db = Database::open(&path).unwrap();
    // name carries no index; the scan must still find the row
    let output = db
        .execute_sql("SELECT city FROM users WHERE name = 'Charlie'")
        .unwrap();
    assert_eq!(output, QueryOutput::Rows(vec![vec!["New York".to_string()]]));
}
