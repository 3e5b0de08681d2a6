use parcel_core::db::{open_db, open_db_in_memory};
use parcel_core::{Parcel, ParcelRepository, SqliteParcelRepository};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_creates_parcel_schema() {
    let conn = open_db_in_memory().unwrap();

    assert_sqlite_object_exists(&conn, "table", "parcel");
    assert_sqlite_object_exists(&conn, "index", "idx_parcel_client");
    assert!(SqliteParcelRepository::try_new(&conn).is_ok());
}

#[test]
fn reopening_file_database_keeps_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracker.db");

    let conn_first = open_db(&path).unwrap();
    let number = SqliteParcelRepository::try_new(&conn_first)
        .unwrap()
        .add(&Parcel::new(1, "A", "2024-03-01T10:00:00Z"))
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    let repo = SqliteParcelRepository::try_new(&conn_second).unwrap();
    assert_eq!(repo.get(number).unwrap().address, "A");
}

#[test]
fn opening_existing_parcel_table_leaves_it_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracker.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE parcel (
            number INTEGER PRIMARY KEY AUTOINCREMENT,
            client INTEGER NOT NULL,
            status TEXT NOT NULL,
            address TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        INSERT INTO parcel (client, status, address, created_at)
        VALUES (5, 'sent', 'A', '2024-03-01T10:00:00Z');",
    )
    .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    let parcels = SqliteParcelRepository::try_new(&conn)
        .unwrap()
        .get_by_client(5)
        .unwrap();
    assert_eq!(parcels.len(), 1);
    assert_eq!(parcels[0].status, "sent");
    assert_sqlite_object_exists(&conn, "index", "idx_parcel_client");
}

#[test]
fn opening_unwritable_path_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("tracker.db");

    assert!(open_db(&path).is_err());
}

fn assert_sqlite_object_exists(conn: &Connection, kind: &str, name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = ?1 AND name = ?2
            );",
            [kind, name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "{kind} {name} does not exist");
}
