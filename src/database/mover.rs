/*!
 * Table mover: copy one table verbatim between two stores.
 */

use log::info;
use std::fmt;

use super::store::{IfExists, TableStore};
use crate::errors::StoreError;

/// Outcome of a table move
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveReport {
    /// Table that was copied
    pub table: String,
    /// Rows written to the destination
    pub rows: usize,
    /// Columns written to the destination
    pub columns: usize,
}

impl fmt::Display for MoveReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Moved table '{}': {} rows, {} columns",
            self.table, self.rows, self.columns
        )
    }
}

/// Copy `table` from `source` to `destination`, replacing any existing
/// destination table of the same name. Any error aborts the move.
pub fn move_table(
    source: &dyn TableStore,
    destination: &dyn TableStore,
    table: &str,
) -> Result<MoveReport, StoreError> {
    let data = source.read_table(table)?;
    info!(
        "Read {} rows ({} columns) from source table '{}'",
        data.len(),
        data.column_count(),
        table
    );

    destination.write_table(&data, table, IfExists::Replace)?;

    Ok(MoveReport {
        table: table.to_string(),
        rows: data.len(),
        columns: data.column_count(),
    })
}
