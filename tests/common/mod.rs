/*!
 * Common test utilities for the tabletrans test suite
 */

use anyhow::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use tabletrans::database::{Row, SqliteStore, Table, TableStore, Value};


/// Routes library logs to the test output; safe to call from every test
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Connection string for an SQLite file inside `dir`
pub fn sqlite_url(dir: &Path, filename: &str) -> String {
    format!("sqlite:///{}", dir.join(filename).display())
}

/// MySQL scratch database for tests that need a server, if one is configured
pub fn mysql_test_url() -> Option<String> {
    std::env::var("TABLETRANS_TEST_MYSQL_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
}

/// Path of an SQLite file inside `dir`
pub fn sqlite_path(dir: &Path, filename: &str) -> PathBuf {
    dir.join(filename)
}

/// Builds a table from string columns; `None` cells become NULL
pub fn make_table(name: &str, columns: &[&str], rows: &[&[Option<&str>]]) -> Table {
    let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
    let rows = rows
        .iter()
        .map(|cells| {
            Row::from_cells(
                columns
                    .iter()
                    .cloned()
                    .zip(cells.iter().map(|c| Value::from(*c))),
            )
        })
        .collect();
    Table::from_rows(name, columns, rows).expect("rows match the column set")
}

/// A court-case style table with an `id` column and the three default fields
pub fn create_case_table(name: &str, count: usize) -> Table {
    let columns = vec![
        "id".to_string(),
        "verdachte".to_string(),
        "beslissing".to_string(),
        "strafmaat".to_string(),
    ];
    let rows = (0..count)
        .map(|i| {
            Row::from_cells(vec![
                ("id".to_string(), Value::Integer(i as i64)),
                ("verdachte".to_string(), Value::from(format!("verdachte {}", i))),
                ("beslissing".to_string(), Value::from(format!("beslissing {}", i))),
                ("strafmaat".to_string(), Value::from(format!("strafmaat {}", i))),
            ])
        })
        .collect();
    Table::from_rows(name, columns, rows).expect("rows match the column set")
}

/// Writes `table` into a fresh on-disk SQLite database and returns its store
pub fn create_store_with(dir: &Path, filename: &str, table: &Table) -> Result<SqliteStore> {
    let store = SqliteStore::connect(&sqlite_url(dir, filename))?;
    store.write_table(table, table.name(), Default::default())?;
    Ok(store)
}
