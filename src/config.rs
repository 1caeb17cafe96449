use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for a harvest run, loaded from a YAML file.
///
/// Every field has a default so a minimal config file (or `{}`) is valid.
/// The GitHub token is deliberately not part of this struct: it is resolved
/// from the environment variable named by `token_env` at process start and
/// never written to disk.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HarvestConfig {
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_min_stars")]
    pub min_stars: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_max_repositories")]
    pub max_repositories: usize,
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_clone_dir")]
    pub clone_dir: PathBuf,
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    #[serde(default = "default_ck_jar")]
    pub ck_jar: PathBuf,
    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,
}

fn default_language() -> String {
    "Java".to_string()
}

fn default_min_stars() -> u32 {
    1
}

fn default_page_size() -> u32 {
    100
}

fn default_max_repositories() -> usize {
    1000
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_clone_dir() -> PathBuf {
    PathBuf::from("repositories")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_ck_jar() -> PathBuf {
    PathBuf::from("scripts/ck_script/target/ck-0.7.1-SNAPSHOT-jar-with-dependencies.jar")
}

fn default_report_path() -> PathBuf {
    PathBuf::from("metrics.xlsx")
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            min_stars: default_min_stars(),
            page_size: default_page_size(),
            max_repositories: default_max_repositories(),
            token_env: default_token_env(),
            clone_dir: default_clone_dir(),
            results_dir: default_results_dir(),
            ck_jar: default_ck_jar(),
            report_path: default_report_path(),
        }
    }
}

impl HarvestConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// The GitHub search string: language filtered, star threshold applied,
    /// forks excluded, sorted by stars descending.
    pub fn search_term(&self) -> String {
        format!(
            "language:{} stars:>{} fork:false sort:stars-desc",
            self.language, self.min_stars
        )
    }

    pub fn resolve_token(&self) -> Result<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "No GitHub token found; set the {} environment variable",
                    self.token_env
                )
            })
    }
}
