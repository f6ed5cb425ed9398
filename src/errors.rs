/*!
 * Error types for the tabletrans application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while talking to a relational store
///
/// These are the connectivity/schema class: always fatal for the run.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The connection string names an engine this build cannot open
    #[error("Unsupported database engine: {0}")]
    UnsupportedEngine(String),

    /// The connection string could not be parsed
    #[error("Invalid connection descriptor '{descriptor}': {reason}")]
    InvalidDescriptor {
        /// The descriptor as given
        descriptor: String,
        /// Why it was rejected
        reason: String,
    },

    /// The requested table does not exist in the store
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// The destination table exists and the write policy forbids replacing it
    #[error("Table already exists: {0}")]
    TableExists(String),

    /// The table name cannot be used as an SQL identifier
    #[error("Invalid table or column name: {0:?}")]
    InvalidIdentifier(String),

    /// A table without columns cannot be written
    #[error("Table '{0}' has no columns")]
    EmptySchema(String),

    /// Rows do not match the declared column set
    #[error("Row {row} does not match the column set of table '{table}'")]
    ShapeMismatch {
        /// Table name
        table: String,
        /// Zero-based row position
        row: usize,
    },

    /// Error reported by SQLite
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Error reported by a MySQL server or its client
    #[error("MySQL error: {0}")]
    Mysql(#[from] mysql::Error),

    /// Filesystem error around the database file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while provisioning language packages
#[derive(Error, Debug)]
pub enum PackageError {
    /// The package index could not be fetched or parsed
    #[error("Failed to load package index from {url}: {message}")]
    Index {
        /// Index location
        url: String,
        /// Underlying failure
        message: String,
    },

    /// A package archive could not be downloaded
    #[error("Failed to download package {package}: {message}")]
    Download {
        /// Package name
        package: String,
        /// Underlying failure
        message: String,
    },

    /// A package archive is malformed
    #[error("Invalid package archive {path:?}: {message}")]
    Archive {
        /// Archive path
        path: PathBuf,
        /// Underlying failure
        message: String,
    },

    /// A package's metadata.json is missing or unreadable
    #[error("Invalid package metadata in {path:?}: {message}")]
    Metadata {
        /// Package directory
        path: PathBuf,
        /// Underlying failure
        message: String,
    },

    /// Filesystem error in the packages directory
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur during translation of a single text
#[derive(Error, Debug)]
pub enum TranslationError {
    /// No installed package covers the language pair
    #[error("No installed translation model for {source_code} -> {target_code}")]
    ModelNotInstalled {
        /// Source language code
        source_code: String,
        /// Target language code
        target_code: String,
    },

    /// The translation engine could not be started or talked to
    #[error("Translation engine failed: {0}")]
    Process(String),

    /// The translation engine ran but reported a failure
    #[error("Translation failed: {0}")]
    Execution(String),

    /// Error surfaced by a model provided outside this crate
    #[error("Translation model error: {0}")]
    Model(String),
}

/// Errors that abort a translation job
#[derive(Error, Debug)]
pub enum JobError {
    /// Reading or writing a table failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Provisioning the language package failed
    #[error("Package error: {0}")]
    Package(#[from] PackageError),

    /// The translation model could not be resolved before starting the pool
    #[error("Translation model unavailable: {0}")]
    ModelUnavailable(TranslationError),

    /// A worker could not build its translation context
    #[error("Worker {worker} failed to initialise: {message}")]
    WorkerInit {
        /// Worker index
        worker: usize,
        /// Underlying failure
        message: String,
    },

    /// A worker or blocking task panicked
    #[error("Background task panicked: {0}")]
    TaskPanicked(String),

    /// The input table already has a column the job would add
    #[error("Input table already has column '{0}'")]
    ColumnConflict(String),

    /// The pool finished without producing a result for an input row
    #[error("No result produced for row at position {0}")]
    MissingResult(usize),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a table store
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Error from package provisioning
    #[error("Package error: {0}")]
    Package(#[from] PackageError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Error from a translation job
    #[error("Job error: {0}")]
    Job(#[from] JobError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
