/*!
 * Argos Translate backend.
 *
 * - `ArgosPackageRegistry` reads the argospm package index over HTTP, downloads
 *   `.argosmodel` archives and unpacks them into the packages directory.
 * - `ArgosModelResolver` finds an installed package for a language pair and
 *   starts an `ArgosCliModel` for it.
 * - `ArgosCliModel` owns one worker process that loads the model once and then
 *   translates one line-delimited request at a time.
 */

use async_trait::async_trait;
use log::{debug, info};
use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::Duration;
use tempfile::TempDir;

use super::model::{LanguagePair, ModelResolver, TranslationModel};
use super::package::{
    load_installed_languages, read_package_metadata, scan_installed_packages, InstalledPackage,
    PackageInfo, PackageRegistry,
};
use crate::errors::{PackageError, TranslationError};

/// Public argospm package index
pub const DEFAULT_INDEX_URL: &str =
    "https://raw.githubusercontent.com/argosopentech/argospm-index/main/index.json";

/// Default Python interpreter for translation workers
pub const DEFAULT_PYTHON_EXECUTABLE: &str = "python3";

/// Worker script run by `WorkerCommand::python`
pub const WORKER_SCRIPT: &str = include_str!("argos_worker.py");

/// Environment variable Argos reads its packages directory from
pub const PACKAGES_DIR_ENV: &str = "ARGOS_PACKAGES_DIR";

/// Package registry backed by the argospm index
pub struct ArgosPackageRegistry {
    /// Index location
    index_url: String,
    /// Where packages are installed
    packages_dir: PathBuf,
    /// HTTP client for index and archive downloads
    client: Client,
    /// Scratch space for downloaded archives, removed on drop
    downloads: TempDir,
}

impl ArgosPackageRegistry {
    /// Create a registry for `index_url` installing into `packages_dir`
    pub fn new(index_url: impl Into<String>, packages_dir: impl Into<PathBuf>) -> Result<Self, PackageError> {
        let packages_dir = packages_dir.into();
        std::fs::create_dir_all(&packages_dir)?;
        let downloads = tempfile::Builder::new()
            .prefix(".downloads-")
            .tempdir_in(&packages_dir)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(600))
            .build()
            .map_err(|e| PackageError::Index {
                url: String::new(),
                message: e.to_string(),
            })?;

        Ok(Self {
            index_url: index_url.into(),
            packages_dir,
            client,
            downloads,
        })
    }

    /// Packages directory this registry installs into
    pub fn packages_dir(&self) -> &Path {
        &self.packages_dir
    }

    async fn fetch_bytes(&self, url: &str) -> reqwest::Result<Vec<u8>> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl PackageRegistry for ArgosPackageRegistry {
    async fn available_packages(&self) -> Result<Vec<PackageInfo>, PackageError> {
        debug!("Fetching package index from {}", self.index_url);
        let index_error = |message: String| PackageError::Index {
            url: self.index_url.clone(),
            message,
        };

        // Local indexes are allowed for offline use
        if let Some(path) = self.index_url.strip_prefix("file://") {
            let content = std::fs::read_to_string(path).map_err(|e| index_error(e.to_string()))?;
            return serde_json::from_str(&content).map_err(|e| index_error(e.to_string()));
        }

        let response = self
            .client
            .get(&self.index_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| index_error(e.to_string()))?;
        response
            .json::<Vec<PackageInfo>>()
            .await
            .map_err(|e| index_error(e.to_string()))
    }

    async fn download(&self, package: &PackageInfo) -> Result<PathBuf, PackageError> {
        let target = self
            .downloads
            .path()
            .join(format!("{}.argosmodel", package.display_name()));

        let mut last_error = "package lists no download links".to_string();
        for link in &package.links {
            info!("Downloading {} from {}", package, link);
            let fetched = match link.strip_prefix("file://") {
                Some(path) => tokio::fs::read(path).await.map_err(|e| e.to_string()),
                None => self.fetch_bytes(link).await.map_err(|e| e.to_string()),
            };
            match fetched {
                Ok(body) => {
                    let mut file = File::create(&target)?;
                    file.write_all(&body)?;
                    return Ok(target);
                }
                Err(e) => {
                    debug!("Download from {} failed: {}", link, e);
                    last_error = e;
                }
            }
        }

        Err(PackageError::Download {
            package: package.display_name(),
            message: last_error,
        })
    }

    async fn install_from_path(&self, archive: &Path) -> Result<InstalledPackage, PackageError> {
        let archive = archive.to_path_buf();
        let packages_dir = self.packages_dir.clone();

        tokio::task::spawn_blocking(move || extract_package(&archive, &packages_dir))
            .await
            .map_err(|e| PackageError::Io(std::io::Error::other(e.to_string())))?
    }

    fn installed_packages(&self) -> Result<Vec<InstalledPackage>, PackageError> {
        scan_installed_packages(&self.packages_dir)
    }
}

/// Unpack a `.argosmodel` archive into `packages_dir`.
///
/// The archive holds a single top-level directory; it becomes the package
/// directory and must contain `metadata.json`.
pub fn extract_package(archive: &Path, packages_dir: &Path) -> Result<InstalledPackage, PackageError> {
    let archive_error = |message: String| PackageError::Archive {
        path: archive.to_path_buf(),
        message,
    };

    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| archive_error(e.to_string()))?;

    let mut top_level: Option<PathBuf> = None;
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).map_err(|e| archive_error(e.to_string()))?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(archive_error(format!("unsafe entry path: {}", entry.name())));
        };

        let Some(first) = relative.components().next() else {
            continue;
        };
        let first = PathBuf::from(first.as_os_str());
        if top_level.as_ref().is_some_and(|existing| *existing != first) {
            return Err(archive_error("archive has more than one top-level entry".to_string()));
        }
        if top_level.is_none() {
            top_level = Some(first);
        }

        let destination = packages_dir.join(&relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&destination)?;
        } else {
            if let Some(parent) = destination.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&destination)?;
            std::io::copy(&mut entry, &mut out)?;
        }
    }

    let top_level = top_level.ok_or_else(|| archive_error("archive is empty".to_string()))?;
    read_package_metadata(&packages_dir.join(top_level))
}

/// Command that starts a translation worker process.
///
/// The language codes are appended as the last two arguments. The process
/// answers on stdout with one JSON object per line: `{"ready": true}` once its
/// model is loaded, then `{"translation": ...}` or `{"error": ...}` for every
/// JSON string it reads from stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    /// Program to run
    pub program: PathBuf,
    /// Arguments placed before the language codes
    pub args: Vec<String>,
}

impl WorkerCommand {
    /// Run `program` with no extra arguments
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Run the bundled worker script with a Python interpreter that has
    /// `argostranslate` installed
    pub fn python(interpreter: impl Into<PathBuf>) -> Self {
        Self {
            program: interpreter.into(),
            args: vec!["-u".to_string(), "-c".to_string(), WORKER_SCRIPT.to_string()],
        }
    }
}

/// Resolves models from packages installed in a directory
#[derive(Debug, Clone)]
pub struct ArgosModelResolver {
    packages_dir: PathBuf,
    command: WorkerCommand,
}

impl ArgosModelResolver {
    /// Create a resolver over `packages_dir` starting workers with `command`
    pub fn new(packages_dir: impl Into<PathBuf>, command: WorkerCommand) -> Self {
        Self {
            packages_dir: packages_dir.into(),
            command,
        }
    }

    /// Installed package covering `pair`, if any
    pub fn installed_package(&self, pair: &LanguagePair) -> Result<InstalledPackage, TranslationError> {
        let installed = scan_installed_packages(&self.packages_dir)
            .map_err(|e| TranslationError::Process(e.to_string()))?;
        let languages = load_installed_languages(&installed);

        languages
            .iter()
            .find(|l| l.code == pair.source)
            .and_then(|l| l.get_translation(&pair.target))
            .cloned()
            .ok_or_else(|| pair.not_installed())
    }
}

impl ModelResolver for ArgosModelResolver {
    fn resolve(&self, pair: &LanguagePair) -> Result<Box<dyn TranslationModel>, TranslationError> {
        let package = self.installed_package(pair)?;
        debug!("Resolved {} to package at {:?}", pair, package.path);

        let model = ArgosCliModel::spawn(&self.command, &self.packages_dir, pair)?;
        Ok(Box::new(model))
    }
}

#[derive(Debug, Default, Deserialize)]
struct WorkerReply {
    #[serde(default)]
    ready: bool,
    translation: Option<String>,
    error: Option<String>,
}

struct WorkerProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl WorkerProcess {
    fn read_reply(&mut self) -> Result<WorkerReply, TranslationError> {
        let mut line = String::new();
        let read = self
            .stdout
            .read_line(&mut line)
            .map_err(|e| TranslationError::Process(e.to_string()))?;
        if read == 0 {
            let status = self
                .child
                .wait()
                .map(|s| s.to_string())
                .unwrap_or_else(|e| e.to_string());
            return Err(TranslationError::Process(format!(
                "translation worker exited ({})",
                status
            )));
        }

        serde_json::from_str(line.trim_end()).map_err(|e| {
            TranslationError::Process(format!("unreadable worker reply {:?}: {}", line.trim_end(), e))
        })
    }
}

impl Drop for WorkerProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Translation handle backed by a long-lived worker process.
///
/// The model is loaded once when the process starts and stays loaded until
/// the handle is dropped, which stops the process.
pub struct ArgosCliModel {
    pair: LanguagePair,
    process: Mutex<WorkerProcess>,
}

impl ArgosCliModel {
    /// Start a worker for `pair` and wait until its model is loaded
    pub fn spawn(
        command: &WorkerCommand,
        packages_dir: &Path,
        pair: &LanguagePair,
    ) -> Result<Self, TranslationError> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .args([pair.source.as_str(), pair.target.as_str()])
            .env(PACKAGES_DIR_ENV, packages_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                TranslationError::Process(format!(
                    "failed to start {}: {}",
                    command.program.display(),
                    e
                ))
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(TranslationError::Process("worker pipes unavailable".to_string()));
        };
        let mut process = WorkerProcess {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        };

        let reply = process.read_reply()?;
        if let Some(message) = reply.error {
            return Err(TranslationError::Execution(message));
        }
        if !reply.ready {
            return Err(TranslationError::Process(
                "translation worker did not report ready".to_string(),
            ));
        }

        debug!("Started translation worker for {}", pair);
        Ok(Self {
            pair: pair.clone(),
            process: Mutex::new(process),
        })
    }

    /// Language pair this handle translates
    pub fn pair(&self) -> &LanguagePair {
        &self.pair
    }
}

impl TranslationModel for ArgosCliModel {
    fn translate(&self, text: &str) -> Result<String, TranslationError> {
        let request =
            serde_json::to_string(text).map_err(|e| TranslationError::Process(e.to_string()))?;

        let mut process = self.process.lock();
        writeln!(process.stdin, "{}", request)
            .and_then(|_| process.stdin.flush())
            .map_err(|e| TranslationError::Process(e.to_string()))?;

        match process.read_reply()? {
            WorkerReply { error: Some(message), .. } => Err(TranslationError::Execution(message)),
            WorkerReply { translation: Some(translation), .. } => Ok(translation),
            _ => Err(TranslationError::Process(
                "worker reply carries no translation".to_string(),
            )),
        }
    }
}
