//! Local manifest directory: the desired job set as synced to disk.
//!
//! ```text
//! <root>/<namespace>/<job>.yaml   -> namespace from the directory
//! <root>/<job>.yaml               -> namespace "default"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use crontopus_common::manifest::{DEFAULT_NAMESPACE, JobManifest};
use tracing::{debug, warn};

use crate::domain::job::JobEntry;

/// Load every schedulable manifest below `root`, in path order.
///
/// Files that fail to parse or validate are logged and skipped.
///
/// # Errors
///
/// Returns an error if `root` does not exist or cannot be listed. A missing
/// root is an error so that an unsynced directory never reads as "no jobs".
pub fn load_desired(root: &Path) -> Result<Vec<JobEntry>> {
    anyhow::ensure!(
        root.is_dir(),
        "manifest directory not found: {}",
        root.display()
    );
    let mut files = Vec::new();
    collect_yaml(root, &mut files)?;
    files.sort();

    let mut entries = Vec::new();
    for file in files {
        let namespace = namespace_of(root, &file);
        match load_one(&file) {
            Ok(manifest) if manifest.should_schedule() => {
                entries.push(manifest.to_entry(&namespace));
            }
            Ok(manifest) => {
                debug!(file = %file.display(), name = %manifest.metadata.name, "manifest disabled or paused");
            }
            Err(e) => warn!(file = %file.display(), error = format!("{e:#}"), "skipping manifest"),
        }
    }
    Ok(entries)
}

fn load_one(file: &Path) -> Result<JobManifest> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("cannot read {}", file.display()))?;
    let manifest: JobManifest =
        serde_yaml::from_str(&content).context("invalid manifest YAML")?;
    manifest.validate()?;
    Ok(manifest)
}

fn collect_yaml(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let listing =
        std::fs::read_dir(dir).with_context(|| format!("cannot list {}", dir.display()))?;
    for item in listing {
        let item = item.with_context(|| format!("cannot list {}", dir.display()))?;
        let path = item.path();
        if item.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        if path.is_dir() {
            collect_yaml(&path, out)?;
        } else if path
            .extension()
            .is_some_and(|ext| ext == "yaml" || ext == "yml")
        {
            out.push(path);
        }
    }
    Ok(())
}

fn namespace_of(root: &Path, file: &Path) -> String {
    let Ok(relative) = file.strip_prefix(root) else {
        return DEFAULT_NAMESPACE.to_string();
    };
    let mut components = relative.components();
    match (components.next(), components.next()) {
        (Some(first), Some(_)) => first.as_os_str().to_string_lossy().into_owned(),
        _ => DEFAULT_NAMESPACE.to_string(),
    }
}
