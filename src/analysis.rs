use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::process::CommandRunner;

/// Run the CK metrics tool against a working copy, writing its CSV output
/// under `results_dir/repo_name`.
///
/// Only invocation-level failures (missing `java`, spawn errors) surface as
/// errors. CK's own exit status is not checked: whatever CSVs it managed to
/// produce are picked up later by the aggregation step.
pub fn run_ck_analysis(
    runner: &dyn CommandRunner,
    repo_path: &Path,
    results_dir: &Path,
    ck_jar: &Path,
    repo_name: &str,
) -> Result<()> {
    let output_dir = results_dir.join(repo_name);
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create results directory {}", output_dir.display()))?;

    info!("Running CK analysis on {}...", repo_path.display());
    let jar = ck_jar.to_string_lossy();
    let repo = repo_path.to_string_lossy();
    let out = output_dir.to_string_lossy();

    // Argument order is fixed by CK: jar, source dir, use-jars flag,
    // max-files-per-partition (0 = automatic), variable/field metrics flag,
    // output path.
    let output = runner.run(
        "java",
        &[
            "-jar",
            jar.as_ref(),
            repo.as_ref(),
            "true",
            "0",
            "false",
            out.as_ref(),
        ],
    )?;

    if !output.success() {
        debug!(
            "CK exited with {:?} for {}: {}",
            output.status,
            repo_path.display(),
            output.stderr.trim()
        );
    }
    info!("CK analysis completed for {}", repo_path.display());
    Ok(())
}
