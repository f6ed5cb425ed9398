/*!
 * Relational store access.
 *
 * This module provides:
 * - Connection descriptors and SQLite connections
 * - The in-memory `Table`/`Row`/`Value` model
 * - The `TableStore` read/write seam with SQLite and MySQL implementations
 * - The table mover
 */

pub mod connection;
pub mod models;
pub mod mover;
pub mod mysql;
pub mod store;

// Re-export main types
pub use connection::{ConnectionDescriptor, DatabaseConnection, SqliteLocation};
pub use models::{Row, SqlType, Table, Value};
pub use mover::{move_table, MoveReport};
pub use mysql::MysqlStore;
pub use store::{
    connect_existing_store, connect_store, quote_identifier, IfExists, SqliteStore, TableStore,
};
