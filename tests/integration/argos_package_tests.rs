/*!
 * Integration tests for offline Argos package provisioning and the CLI model
 */

use anyhow::Result;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use tabletrans::errors::TranslationError;
use tabletrans::translation::{
    provision, ArgosModelResolver, ArgosPackageRegistry, LanguagePair, ModelResolver,
    PackageRegistry, ProvisionOutcome, TranslationModel, WorkerCommand,
};

use crate::common;

/// Writes a `.argosmodel` archive with a single package directory
fn write_package_archive(path: &Path, from: &str, to: &str) -> Result<()> {
    let mut zip = zip::ZipWriter::new(File::create(path)?);
    let options = zip::write::SimpleFileOptions::default();
    let root = format!("translate-{}_{}-1_0", from, to);

    zip.start_file(format!("{}/metadata.json", root), options)?;
    write!(
        zip,
        r#"{{"from_code":"{}","to_code":"{}","package_version":"1.0","type":"translate"}}"#,
        from, to
    )?;
    zip.start_file(format!("{}/model/model.bin", root), options)?;
    zip.write_all(b"weights")?;
    zip.finish()?;
    Ok(())
}

/// Writes an index listing one package per archive
fn write_index(path: &Path, entries: &[(&str, &str, &Path)]) -> Result<()> {
    let entries: Vec<serde_json::Value> = entries
        .iter()
        .map(|(from, to, archive)| {
            serde_json::json!({
                "from_code": from,
                "to_code": to,
                "package_version": "1.0",
                "links": [format!("file://{}", archive.display())],
            })
        })
        .collect();
    std::fs::write(path, serde_json::to_string_pretty(&entries)?)?;
    Ok(())
}

/// Test installing from a local index, then provisioning again as a no-op
#[tokio::test]
async fn test_provision_withLocalIndex_shouldInstallOnceThenReuse() -> Result<()> {
    let scratch = common::create_temp_dir()?;
    let packages_dir = scratch.path().join("packages");
    let archive = scratch.path().join("nl_en.argosmodel");
    let other = scratch.path().join("en_nl.argosmodel");
    let index = scratch.path().join("index.json");
    write_package_archive(&archive, "nl", "en")?;
    write_package_archive(&other, "en", "nl")?;
    write_index(&index, &[("en", "nl", other.as_path()), ("nl", "en", archive.as_path())])?;

    let registry = ArgosPackageRegistry::new(format!("file://{}", index.display()), &packages_dir)?;
    let pair = LanguagePair::new("nl", "en");

    let installed = match provision(&registry, &pair).await? {
        ProvisionOutcome::Installed(installed) => installed,
        other => panic!("expected a fresh install, got {:?}", other),
    };
    assert_eq!(installed.info.from_code, "nl");
    assert_eq!(installed.info.to_code, "en");
    assert!(installed.path.join("model").join("model.bin").exists());

    let second = provision(&registry, &pair).await?;
    assert!(matches!(second, ProvisionOutcome::AlreadyInstalled(_)));
    assert_eq!(registry.installed_packages()?.len(), 1);

    let resolver = ArgosModelResolver::new(&packages_dir, WorkerCommand::new("unused"));
    assert_eq!(resolver.installed_package(&pair)?.path, installed.path);
    assert!(matches!(
        resolver.resolve(&LanguagePair::new("en", "nl")),
        Err(TranslationError::ModelNotInstalled { .. })
    ));
    Ok(())
}

/// Test that a pair missing from the index is reported, not installed
#[tokio::test]
async fn test_provision_withPairMissingFromIndex_shouldBeUnavailable() -> Result<()> {
    let scratch = common::create_temp_dir()?;
    let archive = scratch.path().join("en_nl.argosmodel");
    let index = scratch.path().join("index.json");
    write_package_archive(&archive, "en", "nl")?;
    write_index(&index, &[("en", "nl", archive.as_path())])?;

    let registry = ArgosPackageRegistry::new(
        format!("file://{}", index.display()),
        scratch.path().join("packages"),
    )?;

    let outcome = provision(&registry, &LanguagePair::new("nl", "en")).await?;

    assert_eq!(outcome, ProvisionOutcome::Unavailable);
    assert!(registry.installed_packages()?.is_empty());
    Ok(())
}

/// Test that an unreadable index is an error
#[tokio::test]
async fn test_provision_withMissingIndex_shouldFail() -> Result<()> {
    let scratch = common::create_temp_dir()?;
    let registry = ArgosPackageRegistry::new(
        format!("file://{}", scratch.path().join("nope.json").display()),
        scratch.path().join("packages"),
    )?;

    assert!(provision(&registry, &LanguagePair::new("nl", "en")).await.is_err());
    Ok(())
}

/// Writes an executable shell script
#[cfg(unix)]
fn write_script(path: &Path, body: &str) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::write(path, format!("#!/bin/sh\n{}", body))?;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    Ok(())
}

/// Packages directory holding an installed nl -> en package
#[cfg(unix)]
fn installed_packages_dir(root: &Path) -> Result<std::path::PathBuf> {
    let packages_dir = root.join("packages");
    let package_dir = packages_dir.join("translate-nl_en");
    std::fs::create_dir_all(&package_dir)?;
    std::fs::write(
        package_dir.join("metadata.json"),
        r#"{"from_code":"nl","to_code":"en"}"#,
    )?;
    Ok(packages_dir)
}

/// Test that one worker process serves every text of a model handle
#[cfg(unix)]
#[test]
fn test_argosCliModel_withWorkerScript_shouldStartProcessOnce() -> Result<()> {
    let scratch = common::create_temp_dir()?;
    let packages_dir = installed_packages_dir(scratch.path())?;
    let starts = scratch.path().join("starts.log");
    let script = scratch.path().join("fake-worker");
    write_script(
        &script,
        &format!(
            r#"echo "$ARGOS_PACKAGES_DIR" >> '{}'
echo '{{"ready":true}}'
while IFS= read -r line; do
  printf '{{"translation":"%s-%s:%s}}\n' "$1" "$2" "${{line#\"}}"
done
"#,
            starts.display()
        ),
    )?;
    let pair = LanguagePair::new("nl", "en");

    let model = ArgosModelResolver::new(&packages_dir, WorkerCommand::new(&script)).resolve(&pair)?;

    assert_eq!(model.translate("fraude")?, "nl-en:fraude");
    assert_eq!(model.translate("6 maanden")?, "nl-en:6 maanden");
    assert_eq!(model.translate("vrijspraak")?, "nl-en:vrijspraak");
    let log = std::fs::read_to_string(&starts)?;
    assert_eq!(log.lines().collect::<Vec<_>>(), [packages_dir.display().to_string()]);
    Ok(())
}

/// Test that a worker which cannot load its model fails resolution
#[cfg(unix)]
#[test]
fn test_argosCliModel_withWorkerLoadError_shouldFailResolve() -> Result<()> {
    let scratch = common::create_temp_dir()?;
    let packages_dir = installed_packages_dir(scratch.path())?;
    let script = scratch.path().join("broken-worker");
    write_script(&script, "echo '{\"error\":\"model files missing\"}'\nexit 1\n")?;

    let result = ArgosModelResolver::new(&packages_dir, WorkerCommand::new(&script))
        .resolve(&LanguagePair::new("nl", "en"));

    match result {
        Err(TranslationError::Execution(message)) => assert_eq!(message, "model files missing"),
        other => panic!("expected an execution error, got {:?}", other.map(|_| ())),
    }
    Ok(())
}

/// Test per-text errors, worker exit and a missing executable
#[cfg(unix)]
#[test]
fn test_argosCliModel_withFailingTexts_shouldReportErrors() -> Result<()> {
    let scratch = common::create_temp_dir()?;
    let packages_dir = installed_packages_dir(scratch.path())?;
    let pair = LanguagePair::new("nl", "en");

    let picky = scratch.path().join("picky-worker");
    write_script(
        &picky,
        r#"echo '{"ready":true}'
while IFS= read -r line; do
  case "$line" in
    *boom*) echo '{"error":"cannot translate"}' ;;
    *) echo '{"translation":"ok"}' ;;
  esac
done
"#,
    )?;
    let model = ArgosModelResolver::new(&packages_dir, WorkerCommand::new(&picky)).resolve(&pair)?;
    match model.translate("boom") {
        Err(TranslationError::Execution(message)) => assert_eq!(message, "cannot translate"),
        other => panic!("expected an execution error, got {:?}", other),
    }
    assert_eq!(model.translate("fraude")?, "ok");

    let crashing = scratch.path().join("crashing-worker");
    write_script(&crashing, "echo '{\"ready\":true}'\nread -r line\nexit 3\n")?;
    let model = ArgosModelResolver::new(&packages_dir, WorkerCommand::new(&crashing)).resolve(&pair)?;
    assert!(matches!(model.translate("fraude"), Err(TranslationError::Process(_))));

    let missing = ArgosModelResolver::new(&packages_dir, WorkerCommand::new(scratch.path().join("missing")))
        .resolve(&pair);
    assert!(matches!(missing, Err(TranslationError::Process(_))));
    Ok(())
}
