/*!
 * # tabletrans - Parallel machine translation of database tables
 *
 * A Rust library that copies tables between relational databases and
 * translates selected text columns of a table with locally installed
 * Argos Translate models, writing the result to a new table.
 *
 * ## Features
 *
 * - Copy a table between databases, replacing the destination table
 * - Idempotent download and installation of language packages
 * - Per-row translation with failure isolation
 * - Fixed-size worker pool with one model instance per worker
 * - Order-preserving results with progress reporting
 * - ISO 639-1 and ISO 639-2 language code support
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `database`: Tables, connection strings and the SQLite and MySQL stores:
 *   - `database::models`: Values, rows and tables
 *   - `database::connection`: Connection descriptors and SQLite connections
 *   - `database::store`: The `TableStore` abstraction and SQLite store
 *   - `database::mysql`: MySQL store
 *   - `database::mover`: Table copying between stores
 * - `translation`: Model provisioning and the translation job:
 *   - `translation::package`: Package registry and provisioning
 *   - `translation::argos`: Argos Translate backend
 *   - `translation::row`: Row translation
 *   - `translation::pool`: Worker pool
 *   - `translation::job`: Job orchestration
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod database;
pub mod errors;
pub mod language_utils;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::Controller;
pub use database::{
    connect_store, move_table, IfExists, MysqlStore, Row, SqliteStore, Table, TableStore, Value,
};
pub use errors::{AppError, JobError, PackageError, StoreError, TranslationError};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part1_or_part2t};
pub use translation::{JobOptions, JobReport, LanguagePair, TranslationJob, TranslationModel};
