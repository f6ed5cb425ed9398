/*!
 * Table translation with locally installed models.
 *
 * This module is split into several submodules:
 *
 * - `model`: Language pairs, the `TranslationModel` handle and `ModelResolver`
 * - `package`: Package registry abstraction and idempotent provisioning
 * - `argos`: Argos Translate registry, resolver and command-line model
 * - `row`: Per-row translation with failure isolation
 * - `pool`: Fixed-size worker pool with per-worker initialisation
 * - `job`: The parallel translation job orchestrator
 */

// Re-export main types for easier usage
pub use self::argos::{ArgosCliModel, ArgosModelResolver, ArgosPackageRegistry, WorkerCommand};
pub use self::job::{JobOptions, JobReport, TranslationJob};
pub use self::model::{LanguagePair, ModelResolver, TranslationModel};
pub use self::package::{
    provision, InstalledPackage, Language, PackageInfo, PackageRegistry, ProvisionOutcome,
};
pub use self::pool::WorkerPool;
pub use self::row::{RowOutcome, RowTranslator, DEFAULT_TRANSLATED_FIELDS};

// Submodules
pub mod argos;
pub mod job;
pub mod model;
pub mod package;
pub mod pool;
pub mod row;
