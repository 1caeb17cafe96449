use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{error, info};

use crate::process::CommandRunner;

/// Clone `url` into `target_dir`. Failure is logged and reported as `false`;
/// callers decide whether to continue.
pub fn clone_repository(runner: &dyn CommandRunner, url: &str, target_dir: &Path) -> bool {
    info!("Cloning {} into {}", url, target_dir.display());
    let dir = target_dir.to_string_lossy();
    match runner.run("git", &["clone", url, dir.as_ref()]) {
        Ok(output) if output.success() => true,
        Ok(output) => {
            error!(
                "Error cloning {}: git exited with {:?}: {}",
                url,
                output.status,
                output.stderr.trim()
            );
            false
        }
        Err(err) => {
            error!("Error cloning {}: {:#}", url, err);
            false
        }
    }
}

/// Recursively remove a cloned repository.
///
/// Git object files are often written read-only; when a removal fails with
/// a permission error the read-only bit is cleared on the offending path and
/// the removal retried exactly once. Any other failure propagates.
pub fn delete_repository(directory: &Path) -> Result<()> {
    remove_tree(directory)
        .with_context(|| format!("Failed to remove directory {}", directory.display()))?;
    info!("Deleted repository directory: {}", directory.display());
    Ok(())
}

fn remove_tree(path: &Path) -> io::Result<()> {
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            remove_tree(&entry.path())?;
        } else {
            remove_or_force(&entry.path(), |p| fs::remove_file(p))?;
        }
    }
    remove_or_force(path, |p| fs::remove_dir(p))
}

fn remove_or_force<F>(path: &Path, remove: F) -> io::Result<()>
where
    F: Fn(&Path) -> io::Result<()>,
{
    match remove(path) {
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
            let mut permissions = fs::metadata(path)?.permissions();
            permissions.set_readonly(false);
            fs::set_permissions(path, permissions)?;
            remove(path)
        }
        result => result,
    }
}
