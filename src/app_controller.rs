use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::database::connection::ConnectionDescriptor;
use crate::database::mover::{move_table, MoveReport};
use crate::database::store::{connect_existing_store, connect_store, SqliteStore, TableStore};
use crate::translation::{
    ArgosModelResolver, ArgosPackageRegistry, JobReport, ModelResolver, PackageRegistry,
    ProvisionOutcome, TranslationJob,
};

// @module: Application controller for table moving and translation

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Configuration the controller runs with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Copy the configured table between the mover's source and destination
    pub async fn run_move(&self) -> Result<MoveReport> {
        let start_time = Instant::now();
        let mover = self.config.mover.clone();
        let source_name = Self::redacted(&mover.source_url);
        let destination_name = Self::redacted(&mover.destination_url);

        info!(
            "Moving table '{}' from {} to {}",
            mover.table, source_name, destination_name
        );

        let report = tokio::task::spawn_blocking(move || -> Result<MoveReport> {
            let source = connect_existing_store(&mover.source_url)
                .with_context(|| format!("Failed to open source database: {}", source_name))?;
            let destination = connect_store(&mover.destination_url).with_context(|| {
                format!("Failed to open destination database: {}", destination_name)
            })?;
            move_table(source.as_ref(), destination.as_ref(), &mover.table)
                .with_context(|| format!("Failed to move table '{}'", mover.table))
        })
        .await
        .context("Table move task panicked")??;

        info!(
            "{} in {}.",
            report,
            Self::format_duration(start_time.elapsed())
        );
        Ok(report)
    }

    /// Translate the configured input table into the output table
    pub async fn run_translate(&self) -> Result<JobReport> {
        let start_time = Instant::now();
        let packages_dir = self.config.packages.resolved_packages_dir()?;

        let store: Arc<dyn TableStore> = Arc::new(
            SqliteStore::connect_existing(&self.config.database_path).with_context(|| {
                format!("Failed to open database: {}", self.config.database_path)
            })?,
        );
        let registry: Arc<dyn PackageRegistry> = Arc::new(
            ArgosPackageRegistry::new(&self.config.packages.index_url, &packages_dir)
                .context("Failed to prepare packages directory")?,
        );
        let resolver: Arc<dyn ModelResolver> = Arc::new(ArgosModelResolver::new(
            &packages_dir,
            self.config.packages.worker_command(),
        ));

        let options = self.config.job_options()?;
        info!(
            "Translating '{}' ({}) into '{}' with {} workers",
            options.input_table, options.pair, options.output_table, options.workers
        );

        let job = TranslationJob::new(store, registry, resolver, options);

        let progress_bar = ProgressBar::new(0);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} rows ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));
        progress_bar.set_message("Translating rows");
        progress_bar.enable_steady_tick(Duration::from_millis(100));

        let pb = progress_bar.clone();
        let result = job
            .run(move |completed, total| {
                pb.set_length(total as u64);
                pb.set_position(completed as u64);
            })
            .await;

        let report = match result {
            Ok(report) => {
                progress_bar.finish_with_message("Translation complete");
                report
            }
            Err(e) => {
                progress_bar.abandon_with_message("Translation failed");
                return Err(e).context("Translation job failed");
            }
        };

        match &report.provision {
            ProvisionOutcome::Installed(package) => {
                info!("Installed package {}", package.info)
            }
            ProvisionOutcome::AlreadyInstalled(package) => {
                info!("Using installed package {}", package.info)
            }
            ProvisionOutcome::Unavailable => {
                warn!("No package found in the index; used a locally resolved model")
            }
        }

        info!(
            "{} in {}.",
            report,
            Self::format_duration(start_time.elapsed())
        );
        Ok(report)
    }

    // Connection string with any password masked
    fn redacted(descriptor: &str) -> String {
        ConnectionDescriptor::parse(descriptor)
            .map(|d| d.to_string())
            .unwrap_or_else(|_| descriptor.to_string())
    }

    // Format duration in a human-readable format (HH:MM:SS)
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
