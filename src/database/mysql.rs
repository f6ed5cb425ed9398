/*!
 * MySQL/MariaDB table store.
 *
 * Reads use the binary protocol so integers and floats arrive typed. Text and
 * decimal columns come back as strings, binary-charset columns as blobs, and
 * temporal values as their canonical MySQL text.
 */

use log::{debug, info};
use mysql::consts::ColumnType;
use mysql::prelude::Queryable;
use mysql::{Column, Pool, PooledConn, TxOpts};
use url::Url;

use super::models::{Row, SqlType, Table, Value};
use super::store::{IfExists, TableStore};
use crate::errors::StoreError;

/// Character set id MySQL reports for binary strings
const BINARY_CHARSET: u16 = 63;

/// Quote a name as a MySQL identifier
pub fn quote_mysql_identifier(name: &str) -> Result<String, StoreError> {
    if name.trim().is_empty() || name.contains('\0') {
        return Err(StoreError::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("`{}`", name.replace('`', "``")))
}

/// MySQL-backed table store
#[derive(Clone)]
pub struct MysqlStore {
    pool: Pool,
}

impl MysqlStore {
    /// Connect to the server named by a `mysql://` URL
    pub fn connect(url: &Url) -> Result<Self, StoreError> {
        let pool = Pool::new(url.as_str())?;
        // Fail now rather than on first use
        drop(pool.get_conn()?);
        info!(
            "Connected to MySQL database '{}' on {}",
            url.path().trim_start_matches('/'),
            url.host_str().unwrap_or_default()
        );
        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConn, StoreError> {
        Ok(self.pool.get_conn()?)
    }

    fn exists_on(conn: &mut PooledConn, name: &str) -> Result<bool, StoreError> {
        let count: Option<i64> = conn.exec_first(
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE table_schema = DATABASE() AND table_name = ?",
            (name,),
        )?;
        Ok(count.unwrap_or(0) > 0)
    }

    fn create_sql(table: &Table, quoted_name: &str) -> Result<String, StoreError> {
        let mut definitions = Vec::with_capacity(table.column_count());
        for (index, column) in table.columns().iter().enumerate() {
            let sql_type = match SqlType::infer(table.column_values(index)) {
                Some(SqlType::Integer) => "BIGINT",
                Some(SqlType::Real) => "DOUBLE",
                Some(SqlType::Blob) => "LONGBLOB",
                Some(SqlType::Text) | None => "LONGTEXT",
            };
            definitions.push(format!("{} {}", quote_mysql_identifier(column)?, sql_type));
        }
        Ok(format!("CREATE TABLE {} ({})", quoted_name, definitions.join(", ")))
    }
}

/// Convert a MySQL value read from `column` into a cell value
pub fn from_mysql_value(value: mysql::Value, column: &Column) -> Value {
    match value {
        mysql::Value::NULL => Value::Null,
        mysql::Value::Int(i) => Value::Integer(i),
        mysql::Value::UInt(u) => match i64::try_from(u) {
            Ok(i) => Value::Integer(i),
            Err(_) => Value::Text(u.to_string()),
        },
        mysql::Value::Float(f) => Value::Real(f64::from(f)),
        mysql::Value::Double(d) => Value::Real(d),
        mysql::Value::Bytes(bytes) if column.character_set() == BINARY_CHARSET => Value::Blob(bytes),
        mysql::Value::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(text) => Value::Text(text),
            Err(e) => Value::Blob(e.into_bytes()),
        },
        mysql::Value::Date(year, month, day, hour, minute, second, micros) => {
            let date = format!("{:04}-{:02}-{:02}", year, month, day);
            match column.column_type() {
                ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE => Value::Text(date),
                _ if micros > 0 => Value::Text(format!(
                    "{} {:02}:{:02}:{:02}.{:06}",
                    date, hour, minute, second, micros
                )),
                _ => Value::Text(format!("{} {:02}:{:02}:{:02}", date, hour, minute, second)),
            }
        }
        mysql::Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let sign = if negative { "-" } else { "" };
            let hours = u64::from(days) * 24 + u64::from(hours);
            let mut text = format!("{}{:02}:{:02}:{:02}", sign, hours, minutes, seconds);
            if micros > 0 {
                text.push_str(&format!(".{:06}", micros));
            }
            Value::Text(text)
        }
    }
}

/// Convert a cell value into a MySQL parameter
pub fn to_mysql_value(value: &Value) -> mysql::Value {
    match value {
        Value::Null => mysql::Value::NULL,
        Value::Integer(i) => mysql::Value::Int(*i),
        Value::Real(r) => mysql::Value::Double(*r),
        Value::Text(s) => mysql::Value::Bytes(s.as_bytes().to_vec()),
        Value::Blob(b) => mysql::Value::Bytes(b.clone()),
    }
}

impl TableStore for MysqlStore {
    fn read_table(&self, name: &str) -> Result<Table, StoreError> {
        let quoted = quote_mysql_identifier(name)?;
        let mut conn = self.conn()?;
        if !Self::exists_on(&mut conn, name)? {
            return Err(StoreError::TableNotFound(name.to_string()));
        }

        let mut result = conn.exec_iter(format!("SELECT * FROM {}", quoted), ())?;
        let columns: Vec<Column> = result.columns().as_ref().to_vec();
        let names: Vec<String> = columns.iter().map(|c| c.name_str().into_owned()).collect();
        let mut table = Table::new(name, names.clone());

        for mysql_row in result.by_ref() {
            let mysql_row = mysql_row?;
            let mut row = Row::new();
            for (index, (column, name)) in columns.iter().zip(names.iter()).enumerate() {
                let value = mysql_row.as_ref(index).cloned().unwrap_or(mysql::Value::NULL);
                row.push(name.clone(), from_mysql_value(value, column));
            }
            table.push_row(row)?;
        }

        debug!("Read {} rows from MySQL table '{}'", table.len(), name);
        Ok(table)
    }

    fn write_table(&self, table: &Table, name: &str, if_exists: IfExists) -> Result<(), StoreError> {
        if table.columns().is_empty() {
            return Err(StoreError::EmptySchema(name.to_string()));
        }
        let quoted = quote_mysql_identifier(name)?;
        let create_sql = Self::create_sql(table, &quoted)?;
        let columns = table
            .columns()
            .iter()
            .map(|c| quote_mysql_identifier(c))
            .collect::<Result<Vec<_>, _>>()?;
        let insert_sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quoted,
            columns.join(", "),
            vec!["?"; columns.len()].join(", ")
        );

        let mut conn = self.conn()?;
        let exists = Self::exists_on(&mut conn, name)?;
        match (exists, if_exists) {
            (true, IfExists::Fail) => return Err(StoreError::TableExists(name.to_string())),
            (true, IfExists::Replace) => {
                debug!("Dropping existing MySQL table '{}'", name);
                conn.query_drop(format!("DROP TABLE {}", quoted))?;
                conn.query_drop(&create_sql)?;
            }
            (true, IfExists::Append) => {}
            (false, _) => conn.query_drop(&create_sql)?,
        }

        let mut tx = conn.start_transaction(TxOpts::default())?;
        tx.exec_batch(
            &insert_sql,
            table
                .rows()
                .iter()
                .map(|row| row.values().map(to_mysql_value).collect::<Vec<_>>()),
        )?;
        tx.commit()?;

        info!(
            "Wrote {} rows ({} columns) to MySQL table '{}'",
            table.len(),
            table.column_count(),
            name
        );
        Ok(())
    }

    fn table_exists(&self, name: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        Self::exists_on(&mut conn, name)
    }

    fn list_tables(&self) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn()?;
        Ok(conn.exec(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = DATABASE() ORDER BY table_name",
            (),
        )?)
    }
}
