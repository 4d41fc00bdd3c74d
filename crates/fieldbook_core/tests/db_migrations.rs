use fieldbook_core::db::migrations::latest_version;
use fieldbook_core::db::{open_db, open_db_in_memory, DbError};
use fieldbook_core::{DataStore, Settings, StoreError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "customers");
    assert_table_exists(&conn, "installations");
    assert_table_exists(&conn, "settings");
}

#[test]
fn reopening_keeps_data_and_settings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fieldbook.db");

    let store = DataStore::open(&path).unwrap();
    store.add_branch("Eldorado").unwrap();
    let saved = store
        .import_customers(
            "Ana\nBruno",
            "Eldorado",
            Some(fieldbook_core::Plan::Start),
            Some(fieldbook_core::DueDay::Day10),
        )
        .unwrap();
    assert_eq!(saved.created_count(), 2);
    drop(store);

    let reopened = DataStore::open(&path).unwrap();
    assert_eq!(schema_version(reopened.connection()), latest_version());
    let snapshot = reopened.load_snapshot().unwrap();
    assert_eq!(snapshot.customers.len(), 2);
    assert!(snapshot.settings.has_branch("Eldorado"));

    let rows: i64 = reopened
        .connection()
        .query_row("SELECT COUNT(*) FROM settings;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn fresh_store_materializes_default_settings() {
    let store = DataStore::open_in_memory().unwrap();
    assert_eq!(store.settings().unwrap(), Settings::default());
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::SchemaTooNew { found, supported } => {
            assert_eq!(found, 999);
            assert_eq!(supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(matches!(
        DataStore::open(&path),
        Err(StoreError::Storage(_))
    ));
}

#[test]
fn name_and_branch_pair_is_unique_at_schema_level() {
    let conn = open_db_in_memory().unwrap();
    let insert = "INSERT INTO customers (name, branch, plan, due_day, status, created_at)
                  VALUES ('Ana', 'Iporanga', 'start', '5', 'not-installed', '2024-01-01T00:00:00.000Z');";
    conn.execute_batch(insert).unwrap();

    let err = conn.execute_batch(insert).unwrap_err();
    assert!(err.to_string().contains("UNIQUE"));
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
