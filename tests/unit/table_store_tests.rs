/*!
 * Tests for the table model and the SQLite table store
 */

use anyhow::Result;
use tabletrans::database::{
    ConnectionDescriptor, IfExists, Row, SqliteLocation, SqliteStore, Table, TableStore, Value,
};
use tabletrans::errors::StoreError;

use crate::common;

/// Test that rows of a different shape are rejected
#[test]
fn test_table_fromRows_withMismatchedRow_shouldFail() {
    let result = Table::from_rows(
        "zaken",
        vec!["id".to_string(), "verdachte".to_string()],
        vec![
            Row::from_cells([("id", Value::Integer(1)), ("verdachte", Value::from("a"))]),
            Row::from_cells([("id", Value::Integer(2))]),
        ],
    );

    assert!(matches!(result, Err(StoreError::ShapeMismatch { row: 1, .. })));
}

/// Test value text conversion used by the translator
#[test]
fn test_value_asText_shouldRenderScalarsAndBlankNull() {
    assert_eq!(Value::Null.as_text(), "");
    assert_eq!(Value::Integer(6).as_text(), "6");
    assert_eq!(Value::from("6 maanden").as_text(), "6 maanden");
    assert_eq!(Value::from(None::<&str>), Value::Null);
}

/// Test that a written table reads back with values, NULLs and order intact
#[test]
fn test_sqliteStore_writeThenRead_shouldPreserveRowsAndOrder() -> Result<()> {
    let store = SqliteStore::new_in_memory()?;
    let table = common::make_table(
        "zaken",
        &["verdachte", "beslissing"],
        &[
            &[Some("fraude"), Some("vrijspraak")],
            &[None, Some("")],
            &[Some("diefstal"), None],
        ],
    );

    store.write_table(&table, "zaken", IfExists::Replace)?;
    let read = store.read_table("zaken")?;

    assert_eq!(read.columns(), table.columns());
    assert_eq!(read.rows(), table.rows());
    Ok(())
}

/// Test the three write policies against an existing table
#[test]
fn test_sqliteStore_ifExistsPolicies_shouldBehaveDifferently() -> Result<()> {
    let store = SqliteStore::new_in_memory()?;
    let table = common::create_case_table("zaken", 2);
    store.write_table(&table, "zaken", IfExists::Fail)?;

    let fail = store.write_table(&table, "zaken", IfExists::Fail);
    assert!(matches!(fail, Err(StoreError::TableExists(_))));

    store.write_table(&table, "zaken", IfExists::Append)?;
    assert_eq!(store.read_table("zaken")?.len(), 4);

    store.write_table(&table, "zaken", IfExists::Replace)?;
    assert_eq!(store.read_table("zaken")?.len(), 2);
    Ok(())
}

/// Test that an empty table still creates its columns
#[test]
fn test_sqliteStore_writeEmptyTable_shouldCreateColumns() -> Result<()> {
    let store = SqliteStore::new_in_memory()?;
    let table = common::make_table("leeg", &["id", "tekst"], &[]);

    store.write_table(&table, "leeg", IfExists::Replace)?;
    let read = store.read_table("leeg")?;

    assert!(read.is_empty());
    assert_eq!(read.columns(), &["id".to_string(), "tekst".to_string()]);
    assert_eq!(store.list_tables()?, vec!["leeg".to_string()]);
    Ok(())
}

/// Test reading a table that does not exist
#[test]
fn test_sqliteStore_readMissingTable_shouldReturnTableNotFound() -> Result<()> {
    let store = SqliteStore::new_in_memory()?;
    assert!(!store.table_exists("rechtspraak")?);
    assert!(matches!(
        store.read_table("rechtspraak"),
        Err(StoreError::TableNotFound(_))
    ));
    Ok(())
}

/// Test connection string forms
#[test]
fn test_connectionDescriptor_parse_shouldHandleCommonForms() -> Result<()> {
    assert_eq!(
        ConnectionDescriptor::parse("sqlite:///rechtspraak.db")?,
        ConnectionDescriptor::Sqlite(SqliteLocation::File("rechtspraak.db".into()))
    );
    assert_eq!(
        ConnectionDescriptor::parse("sqlite:////data/rechtspraak.db")?,
        ConnectionDescriptor::Sqlite(SqliteLocation::File("/data/rechtspraak.db".into()))
    );
    assert_eq!(
        ConnectionDescriptor::parse("sqlite://")?,
        ConnectionDescriptor::Sqlite(SqliteLocation::Memory)
    );
    assert_eq!(
        ConnectionDescriptor::parse("rechtspraak_sqlite.db")?,
        ConnectionDescriptor::Sqlite(SqliteLocation::File("rechtspraak_sqlite.db".into()))
    );
    assert!(matches!(
        ConnectionDescriptor::parse("postgresql://user@localhost/db"),
        Err(StoreError::UnsupportedEngine(_))
    ));
    assert!(ConnectionDescriptor::parse("").is_err());
    Ok(())
}

/// Test that opening a missing database for reading fails instead of creating it
#[test]
fn test_sqliteStore_connectExisting_withMissingFile_shouldFail() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let url = common::sqlite_url(dir.path(), "missing.db");

    assert!(SqliteStore::connect_existing(&url).is_err());
    assert!(!common::sqlite_path(dir.path(), "missing.db").exists());
    Ok(())
}
