/*!
 * Parallel translation job.
 *
 * Loads a table, provisions the language package, translates the designated
 * fields of every row on a worker pool and writes the augmented table back
 * under a new name.
 */

use log::{info, warn};
use std::fmt;
use std::sync::Arc;

use super::model::{LanguagePair, ModelResolver, TranslationModel};
use super::package::{provision, PackageRegistry, ProvisionOutcome};
use super::pool::WorkerPool;
use super::row::{RowOutcome, RowTranslator, DEFAULT_TRANSLATED_FIELDS};
use crate::database::models::Table;
use crate::database::store::{IfExists, TableStore};
use crate::errors::JobError;

/// What a translation job reads, translates and writes
#[derive(Debug, Clone)]
pub struct JobOptions {
    /// Table to translate
    pub input_table: String,
    /// Table to write (replaced if it exists)
    pub output_table: String,
    /// Language pair of the model
    pub pair: LanguagePair,
    /// Columns to translate
    pub fields: Vec<String>,
    /// Worker pool size
    pub workers: usize,
}

impl JobOptions {
    /// Options for the default fields, nl -> en, one worker per processing unit
    pub fn new(input_table: impl Into<String>, output_table: impl Into<String>) -> Self {
        Self {
            input_table: input_table.into(),
            output_table: output_table.into(),
            pair: LanguagePair::new("nl", "en"),
            fields: DEFAULT_TRANSLATED_FIELDS.iter().map(|s| s.to_string()).collect(),
            workers: super::pool::default_pool_size(),
        }
    }
}

/// Summary of a completed job
#[derive(Debug, Clone, PartialEq)]
pub struct JobReport {
    /// Rows read from the input table
    pub input_rows: usize,
    /// Columns of the input table
    pub input_columns: usize,
    /// Rows written to the output table
    pub output_rows: usize,
    /// Columns of the output table
    pub output_columns: usize,
    /// Rows whose translations were blanked after a model error
    pub failed_rows: usize,
    /// What provisioning did
    pub provision: ProvisionOutcome,
}

impl fmt::Display for JobReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows translated ({} failed), {} -> {} columns",
            self.output_rows, self.failed_rows, self.input_columns, self.output_columns
        )
    }
}

/// A configured translation job
pub struct TranslationJob {
    store: Arc<dyn TableStore>,
    registry: Arc<dyn PackageRegistry>,
    resolver: Arc<dyn ModelResolver>,
    options: JobOptions,
}

impl TranslationJob {
    /// Create a job over a store, package registry and model resolver
    pub fn new(
        store: Arc<dyn TableStore>,
        registry: Arc<dyn PackageRegistry>,
        resolver: Arc<dyn ModelResolver>,
        options: JobOptions,
    ) -> Self {
        Self {
            store,
            registry,
            resolver,
            options,
        }
    }

    /// Job options
    pub fn options(&self) -> &JobOptions {
        &self.options
    }

    /// Run the job to completion.
    ///
    /// Per-row translation errors are absorbed (the row keeps empty
    /// translations); load, provisioning, model resolution, worker start-up
    /// and the final write are fatal.
    pub async fn run<P>(&self, on_progress: P) -> Result<JobReport, JobError>
    where
        P: FnMut(usize, usize),
    {
        let options = &self.options;
        let translator = RowTranslator::new(options.fields.clone(), &options.pair.target);

        let table = self.read_input().await?;
        info!(
            "Loaded {} rows (and {} columns) from '{}'.",
            table.len(),
            table.column_count(),
            table.name()
        );

        if let Some(column) = translator
            .output_columns()
            .iter()
            .find(|c| table.columns().contains(c))
        {
            return Err(JobError::ColumnConflict(column.clone()));
        }

        let provision_outcome = provision(self.registry.as_ref(), &options.pair).await?;
        if !provision_outcome.is_available() {
            warn!("{} package not found; checking for a usable local model", options.pair);
        }

        // Fail before spawning workers if no model can be resolved
        let resolver = self.resolver.clone();
        let pair = options.pair.clone();
        tokio::task::spawn_blocking(move || resolver.resolve(&pair).map(drop))
            .await
            .map_err(|e| JobError::TaskPanicked(e.to_string()))?
            .map_err(JobError::ModelUnavailable)?;

        let input_rows = table.len();
        let input_columns = table.column_count();
        let output_columns = table.with_added_columns(translator.output_columns());
        let rows = table.into_rows();

        info!(
            "Starting parallel translation with {} workers...",
            options.workers
        );
        let resolver = self.resolver.clone();
        let pair = options.pair.clone();
        let work_translator = translator.clone();
        let outcomes = WorkerPool::new(options.workers)
            .run(
                rows,
                move |_worker| resolver.resolve(&pair),
                move |model: &Box<dyn TranslationModel>, row| {
                    work_translator.translate_row(&row, model.as_ref())
                },
                on_progress,
            )
            .await?;

        let failed_rows = outcomes.iter().filter(|o| o.failed()).count();
        let rows = outcomes.into_iter().map(|o: RowOutcome| o.row).collect();
        let output = Table::from_rows(options.output_table.clone(), output_columns, rows)?;

        let report = JobReport {
            input_rows,
            input_columns,
            output_rows: output.len(),
            output_columns: output.column_count(),
            failed_rows,
            provision: provision_outcome,
        };

        self.write_output(output).await?;
        info!("Saved translated data to new table '{}'.", options.output_table);
        if failed_rows > 0 {
            warn!("{} rows were saved with empty translations", failed_rows);
        }

        Ok(report)
    }

    async fn read_input(&self) -> Result<Table, JobError> {
        let store = self.store.clone();
        let name = self.options.input_table.clone();
        tokio::task::spawn_blocking(move || store.read_table(&name))
            .await
            .map_err(|e| JobError::TaskPanicked(e.to_string()))?
            .map_err(JobError::from)
    }

    async fn write_output(&self, table: Table) -> Result<(), JobError> {
        let store = self.store.clone();
        let name = self.options.output_table.clone();
        tokio::task::spawn_blocking(move || store.write_table(&table, &name, IfExists::Replace))
            .await
            .map_err(|e| JobError::TaskPanicked(e.to_string()))?
            .map_err(JobError::from)
    }
}
