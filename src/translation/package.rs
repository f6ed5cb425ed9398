/*!
 * Language package registry and provisioning.
 *
 * Packages are Argos-style archives: each one covers a single
 * `(from_code, to_code)` pair and, once installed, lives in its own directory
 * under the packages dir with a `metadata.json` describing it.
 */

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::model::LanguagePair;
use crate::errors::PackageError;

/// Name of the metadata file inside an installed package directory
pub const METADATA_FILENAME: &str = "metadata.json";

/// A package entry, as listed in the index and in installed metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageInfo {
    /// Source language code
    pub from_code: String,
    /// Target language code
    pub to_code: String,
    /// Source language name
    #[serde(default)]
    pub from_name: String,
    /// Target language name
    #[serde(default)]
    pub to_name: String,
    /// Package version
    #[serde(default)]
    pub package_version: String,
    /// Download locations, tried in order
    #[serde(default)]
    pub links: Vec<String>,
}

impl PackageInfo {
    /// Whether this package translates exactly `pair`
    pub fn covers(&self, pair: &LanguagePair) -> bool {
        pair.matches(&self.from_code, &self.to_code)
    }

    /// Short human-readable name
    pub fn display_name(&self) -> String {
        format!("translate-{}_{}", self.from_code, self.to_code)
    }
}

impl fmt::Display for PackageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.package_version.is_empty() {
            write!(f, "{}", self.display_name())
        } else {
            write!(f, "{} v{}", self.display_name(), self.package_version)
        }
    }
}

/// A package present in the local packages directory
#[derive(Debug, Clone, PartialEq)]
pub struct InstalledPackage {
    /// Metadata read from `metadata.json`
    pub info: PackageInfo,
    /// Package directory
    pub path: PathBuf,
}

/// Catalog of downloadable packages plus the local installation
#[async_trait]
pub trait PackageRegistry: Send + Sync {
    /// List every package the registry can provide
    async fn available_packages(&self) -> Result<Vec<PackageInfo>, PackageError>;

    /// Fetch a package archive, returning its local path
    async fn download(&self, package: &PackageInfo) -> Result<PathBuf, PackageError>;

    /// Install a downloaded archive
    async fn install_from_path(&self, archive: &Path) -> Result<InstalledPackage, PackageError>;

    /// Packages currently installed
    fn installed_packages(&self) -> Result<Vec<InstalledPackage>, PackageError>;
}

/// Result of a provisioning attempt
#[derive(Debug, Clone, PartialEq)]
pub enum ProvisionOutcome {
    /// A matching package was already installed; nothing was done
    AlreadyInstalled(InstalledPackage),
    /// A matching package was downloaded and installed
    Installed(InstalledPackage),
    /// No package in the registry covers the pair
    Unavailable,
}

impl ProvisionOutcome {
    /// Whether a model for the pair is installed after provisioning
    pub fn is_available(&self) -> bool {
        !matches!(self, ProvisionOutcome::Unavailable)
    }
}

/// Make sure a package for `pair` is installed.
///
/// Idempotent: an installed match is a no-op. A registry without a matching
/// package is reported as `Unavailable` rather than failing; registry I/O
/// errors are returned.
pub async fn provision(
    registry: &dyn PackageRegistry,
    pair: &LanguagePair,
) -> Result<ProvisionOutcome, PackageError> {
    info!("Checking for {} language package...", pair);

    if let Some(installed) = registry
        .installed_packages()?
        .into_iter()
        .find(|p| p.info.covers(pair))
    {
        info!("Package {} already installed at {:?}", installed.info, installed.path);
        return Ok(ProvisionOutcome::AlreadyInstalled(installed));
    }

    let available = registry.available_packages().await?;
    debug!("Registry lists {} packages", available.len());

    let Some(package) = available.into_iter().find(|p| p.covers(pair)) else {
        warn!("No {} language package found in the registry", pair);
        return Ok(ProvisionOutcome::Unavailable);
    };

    info!("Installing {}...", package);
    let archive = registry.download(&package).await?;
    let installed = registry.install_from_path(&archive).await?;
    info!("Installed {} at {:?}", installed.info, installed.path);

    Ok(ProvisionOutcome::Installed(installed))
}

/// Read `metadata.json` from a package directory
pub fn read_package_metadata(package_dir: &Path) -> Result<InstalledPackage, PackageError> {
    let metadata_path = package_dir.join(METADATA_FILENAME);
    let content = std::fs::read_to_string(&metadata_path).map_err(|e| PackageError::Metadata {
        path: package_dir.to_path_buf(),
        message: e.to_string(),
    })?;
    let info: PackageInfo = serde_json::from_str(&content).map_err(|e| PackageError::Metadata {
        path: package_dir.to_path_buf(),
        message: e.to_string(),
    })?;

    Ok(InstalledPackage {
        info,
        path: package_dir.to_path_buf(),
    })
}

/// Discover installed packages: every direct sub-directory of `packages_dir`
/// holding a readable `metadata.json`. A missing directory means none.
pub fn scan_installed_packages(packages_dir: &Path) -> Result<Vec<InstalledPackage>, PackageError> {
    if !packages_dir.exists() {
        return Ok(Vec::new());
    }

    let mut packages = Vec::new();
    for entry in WalkDir::new(packages_dir)
        .min_depth(2)
        .max_depth(2)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| PackageError::Io(std::io::Error::other(e.to_string())))?;
        if entry.file_name() != METADATA_FILENAME {
            continue;
        }
        let Some(package_dir) = entry.path().parent() else {
            continue;
        };
        match read_package_metadata(package_dir) {
            Ok(package) => packages.push(package),
            Err(e) => warn!("Skipping package directory: {}", e),
        }
    }

    Ok(packages)
}

/// An installed language and the translations it offers
#[derive(Debug, Clone, PartialEq)]
pub struct Language {
    /// Language code
    pub code: String,
    /// Language name, if any package carried one
    pub name: String,
    /// Installed packages translating from this language
    pub translations: Vec<InstalledPackage>,
}

impl Language {
    /// Installed package translating from this language into `target`
    pub fn get_translation(&self, target: &str) -> Option<&InstalledPackage> {
        self.translations.iter().find(|p| p.info.to_code == target)
    }
}

/// Group installed packages into languages by source code, in first-seen order
pub fn load_installed_languages(packages: &[InstalledPackage]) -> Vec<Language> {
    let mut languages: Vec<Language> = Vec::new();
    for package in packages {
        match languages.iter_mut().find(|l| l.code == package.info.from_code) {
            Some(language) => language.translations.push(package.clone()),
            None => languages.push(Language {
                code: package.info.from_code.clone(),
                name: package.info.from_name.clone(),
                translations: vec![package.clone()],
            }),
        }
    }
    languages
}
