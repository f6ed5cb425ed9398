/*!
 * Table-level read and write operations.
 *
 * `TableStore` is the seam between the jobs and a relational engine. The
 * SQLite implementation reads whole tables in column order and writes them
 * back with a schema inferred from the in-memory values. A column whose
 * values mix storage types is declared without a type so SQLite keeps every
 * value as it was given.
 */

use log::{debug, info};
use rusqlite::{params_from_iter, Connection};

use super::connection::{ConnectionDescriptor, DatabaseConnection, SqliteLocation};
use super::models::{Row, SqlType, Table, Value};
use super::mysql::MysqlStore;
use crate::errors::StoreError;

/// What to do when the destination table already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IfExists {
    /// Refuse to write
    Fail,
    /// Drop the existing table and recreate it
    #[default]
    Replace,
    /// Insert into the existing table
    Append,
}

/// A relational store holding named tables
pub trait TableStore: Send + Sync {
    /// Read every row of a table (full scan, no filtering)
    fn read_table(&self, name: &str) -> Result<Table, StoreError>;

    /// Persist a table under `name`
    fn write_table(&self, table: &Table, name: &str, if_exists: IfExists) -> Result<(), StoreError>;

    /// Whether a table with this name exists
    fn table_exists(&self, name: &str) -> Result<bool, StoreError>;

    /// Names of all user tables
    fn list_tables(&self) -> Result<Vec<String>, StoreError>;
}

/// Open the store named by a connection string, creating a SQLite database
/// if needed
pub fn connect_store(descriptor: &str) -> Result<Box<dyn TableStore>, StoreError> {
    match ConnectionDescriptor::parse(descriptor)? {
        ConnectionDescriptor::Mysql(url) => Ok(Box::new(MysqlStore::connect(&url)?)),
        sqlite => Ok(Box::new(SqliteStore::new(DatabaseConnection::open(&sqlite)?))),
    }
}

/// Open the store named by a connection string; a SQLite database must
/// already exist
pub fn connect_existing_store(descriptor: &str) -> Result<Box<dyn TableStore>, StoreError> {
    match ConnectionDescriptor::parse(descriptor)? {
        ConnectionDescriptor::Mysql(url) => Ok(Box::new(MysqlStore::connect(&url)?)),
        sqlite => Ok(Box::new(SqliteStore::new(DatabaseConnection::open_existing(&sqlite)?))),
    }
}

/// Quote a name as an SQL identifier
pub fn quote_identifier(name: &str) -> Result<String, StoreError> {
    if name.trim().is_empty() || name.contains('\0') {
        return Err(StoreError::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// SQLite-backed table store
#[derive(Clone)]
pub struct SqliteStore {
    db: DatabaseConnection,
}

impl SqliteStore {
    /// Wrap an open connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Open a store from a connection string, creating the database if needed
    pub fn connect(descriptor: &str) -> Result<Self, StoreError> {
        let descriptor = ConnectionDescriptor::parse(descriptor)?;
        Ok(Self::new(DatabaseConnection::open(&descriptor)?))
    }

    /// Open a store from a connection string; the database must already exist
    pub fn connect_existing(descriptor: &str) -> Result<Self, StoreError> {
        let descriptor = ConnectionDescriptor::parse(descriptor)?;
        Ok(Self::new(DatabaseConnection::open_existing(&descriptor)?))
    }

    /// Create a store over a fresh in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self, StoreError> {
        Ok(Self::new(DatabaseConnection::new_in_memory()?))
    }

    /// Where the underlying database lives
    pub fn location(&self) -> &SqliteLocation {
        self.db.location()
    }

    fn exists_sync(conn: &Connection, name: &str) -> Result<bool, StoreError> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name = ?1 COLLATE NOCASE",
            [name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn create_sql(table: &Table, quoted_name: &str) -> Result<String, StoreError> {
        let mut definitions = Vec::with_capacity(table.column_count());
        for (index, column) in table.columns().iter().enumerate() {
            let column = quote_identifier(column)?;
            match SqlType::infer(table.column_values(index)) {
                Some(sql_type) => definitions.push(format!("{} {}", column, sql_type)),
                None => definitions.push(column),
            }
        }
        Ok(format!("CREATE TABLE {} ({})", quoted_name, definitions.join(", ")))
    }

    fn insert_sql(table: &Table, quoted_name: &str) -> Result<String, StoreError> {
        let columns = table
            .columns()
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<Result<Vec<_>, _>>()?;
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>();
        Ok(format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quoted_name,
            columns.join(", "),
            placeholders.join(", ")
        ))
    }
}

impl TableStore for SqliteStore {
    fn read_table(&self, name: &str) -> Result<Table, StoreError> {
        let quoted = quote_identifier(name)?;

        self.db.execute(|conn| {
            if !Self::exists_sync(conn, name)? {
                return Err(StoreError::TableNotFound(name.to_string()));
            }

            let mut stmt = conn.prepare(&format!("SELECT * FROM {}", quoted))?;
            let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
            let mut table = Table::new(name, columns.clone());

            let mut rows = stmt.query([])?;
            while let Some(sql_row) = rows.next()? {
                let mut row = Row::new();
                for (index, column) in columns.iter().enumerate() {
                    row.push(column.clone(), Value::from(sql_row.get_ref(index)?));
                }
                table.push_row(row)?;
            }

            debug!("Read {} rows from '{}'", table.len(), name);
            Ok(table)
        })
    }

    fn write_table(&self, table: &Table, name: &str, if_exists: IfExists) -> Result<(), StoreError> {
        if table.columns().is_empty() {
            return Err(StoreError::EmptySchema(name.to_string()));
        }
        let quoted = quote_identifier(name)?;
        let create_sql = Self::create_sql(table, &quoted)?;
        let insert_sql = Self::insert_sql(table, &quoted)?;

        self.db.transaction(|tx| {
            let exists = Self::exists_sync(tx, name)?;
            match (exists, if_exists) {
                (true, IfExists::Fail) => {
                    return Err(StoreError::TableExists(name.to_string()));
                }
                (true, IfExists::Replace) => {
                    debug!("Dropping existing table '{}'", name);
                    tx.execute(&format!("DROP TABLE {}", quoted), [])?;
                    tx.execute(&create_sql, [])?;
                }
                (true, IfExists::Append) => {}
                (false, _) => {
                    tx.execute(&create_sql, [])?;
                }
            }

            let mut stmt = tx.prepare(&insert_sql)?;
            for row in table.rows() {
                stmt.execute(params_from_iter(row.values()))?;
            }
            Ok(())
        })?;

        info!(
            "Wrote {} rows ({} columns) to table '{}'",
            table.len(),
            table.column_count(),
            name
        );
        Ok(())
    }

    fn table_exists(&self, name: &str) -> Result<bool, StoreError> {
        self.db.execute(|conn| Self::exists_sync(conn, name))
    }

    fn list_tables(&self) -> Result<Vec<String>, StoreError> {
        self.db.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(names)
        })
    }
}
