//! Sequential clone → analyze → cleanup orchestration.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

use crate::analysis::run_ck_analysis;
use crate::clone::{clone_repository, delete_repository};
use crate::config::HarvestConfig;
use crate::github::{self, GithubSearchClient, RepositoryRef};
use crate::process::{CommandRunner, SystemCommandRunner};
use crate::report;

/// Process every repository in order: create the target directory, clone,
/// run CK, then delete the clone. A failure in any step is logged and never
/// prevents the next repository from being processed.
pub fn run_pipeline(
    runner: &dyn CommandRunner,
    repositories: &[RepositoryRef],
    clone_dir: &Path,
    results_dir: &Path,
    ck_jar: &Path,
) -> Result<()> {
    for repository in repositories {
        let clone_url = format!("{}.git", repository.url);
        let target_dir = clone_dir.join(&repository.name);

        if let Err(err) = fs::create_dir_all(&target_dir) {
            error!(
                "Failed to create {} for {}: {}",
                target_dir.display(),
                repository.name,
                err
            );
            continue;
        }

        if !clone_repository(runner, &clone_url, &target_dir) {
            // Analysis still runs against whatever exists at the target
            // path; an empty clone simply produces no CSV output.
            warn!(
                "Proceeding with analysis of {} despite clone failure",
                repository.name
            );
        }

        if let Err(err) = run_ck_analysis(runner, &target_dir, results_dir, ck_jar, &repository.name)
        {
            error!("CK invocation failed for {}: {:#}", repository.name, err);
        }

        match delete_repository(&target_dir) {
            Ok(()) => info!("Removed clone of {}", repository.name),
            Err(err) => error!("Error removing clone of {}: {:#}", repository.name, err),
        }
    }
    Ok(())
}

/// Full harvest: fetch the repository list, run the pipeline over it, then
/// aggregate all CSV results into the consolidated report.
pub async fn run_harvest(config: &HarvestConfig) -> Result<()> {
    let token = config.resolve_token()?;
    fs::create_dir_all(&config.clone_dir).with_context(|| {
        format!("Failed to create clone directory {}", config.clone_dir.display())
    })?;
    fs::create_dir_all(&config.results_dir).with_context(|| {
        format!(
            "Failed to create results directory {}",
            config.results_dir.display()
        )
    })?;

    let client = GithubSearchClient::new(token, config.search_term(), config.page_size)?;
    let repositories = github::collect_repositories(&client, config.max_repositories).await?;
    info!("Fetched {} repositories", repositories.len());

    let runner = SystemCommandRunner;
    run_pipeline(
        &runner,
        &repositories,
        &config.clone_dir,
        &config.results_dir,
        &config.ck_jar,
    )?;

    let summary = report::aggregate_results(&config.results_dir, &config.report_path)?;
    info!(
        "Appended {} metric rows from {} CSV files to {}",
        summary.rows_appended,
        summary.files_read,
        config.report_path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::CommandOutput;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Scripted runner: git clones of the named repositories fail with a
    /// non-zero exit, everything else succeeds. Records every invocation.
    struct ScriptedRunner {
        fail_clone_of: Vec<String>,
        invocations: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedRunner {
        fn new(fail_clone_of: &[&str]) -> Self {
            Self {
                fail_clone_of: fail_clone_of.iter().map(|s| s.to_string()).collect(),
                invocations: Mutex::new(Vec::new()),
            }
        }

        fn invocations(&self) -> Vec<Vec<String>> {
            self.invocations.lock().unwrap().clone()
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
            let mut invocation = vec![program.to_string()];
            invocation.extend(args.iter().map(|arg| arg.to_string()));
            self.invocations.lock().unwrap().push(invocation);

            let failed = program == "git"
                && self
                    .fail_clone_of
                    .iter()
                    .any(|name| args.iter().any(|arg| arg.contains(name.as_str())));
            Ok(CommandOutput {
                status: if failed { Some(128) } else { Some(0) },
                stdout: String::new(),
                stderr: if failed {
                    "fatal: could not read from remote repository".to_string()
                } else {
                    String::new()
                },
            })
        }
    }

    fn repository(name: &str) -> RepositoryRef {
        RepositoryRef {
            name: name.to_string(),
            url: format!("https://github.com/example/{name}"),
        }
    }

    #[test]
    fn clone_failure_does_not_stop_the_batch() {
        let temp = tempfile::tempdir().expect("temp dir");
        let clone_dir = temp.path().join("repositories");
        let results_dir = temp.path().join("results");
        let runner = ScriptedRunner::new(&["repo-a"]);
        let repositories = vec![repository("repo-a"), repository("repo-b")];

        run_pipeline(
            &runner,
            &repositories,
            &clone_dir,
            &results_dir,
            &PathBuf::from("ck.jar"),
        )
        .expect("pipeline runs");

        let invocations = runner.invocations();
        // Analysis is still attempted for the failed clone, and the loop
        // reaches the second repository.
        let java_targets: Vec<&Vec<String>> = invocations
            .iter()
            .filter(|args| args[0] == "java")
            .collect();
        assert_eq!(java_targets.len(), 2);
        assert!(java_targets[0].iter().any(|arg| arg.contains("repo-a")));
        assert!(java_targets[1].iter().any(|arg| arg.contains("repo-b")));

        let git_clones: Vec<&Vec<String>> = invocations
            .iter()
            .filter(|args| args[0] == "git")
            .collect();
        assert_eq!(git_clones.len(), 2);
    }

    #[test]
    fn clones_are_deleted_after_analysis() {
        let temp = tempfile::tempdir().expect("temp dir");
        let clone_dir = temp.path().join("repositories");
        let results_dir = temp.path().join("results");
        let runner = ScriptedRunner::new(&[]);
        let repositories = vec![repository("repo-a")];

        run_pipeline(
            &runner,
            &repositories,
            &clone_dir,
            &results_dir,
            &PathBuf::from("ck.jar"),
        )
        .expect("pipeline runs");

        assert!(!clone_dir.join("repo-a").exists());
        assert!(results_dir.join("repo-a").is_dir());
    }

    #[test]
    fn clone_urls_carry_the_git_suffix() {
        let temp = tempfile::tempdir().expect("temp dir");
        let runner = ScriptedRunner::new(&[]);
        let repositories = vec![repository("repo-a")];

        run_pipeline(
            &runner,
            &repositories,
            &temp.path().join("repositories"),
            &temp.path().join("results"),
            &PathBuf::from("ck.jar"),
        )
        .expect("pipeline runs");

        let invocations = runner.invocations();
        let clone = invocations
            .iter()
            .find(|args| args[0] == "git")
            .expect("git invoked");
        assert_eq!(clone[1], "clone");
        assert_eq!(clone[2], "https://github.com/example/repo-a.git");
    }
}
