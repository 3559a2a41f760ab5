use crate::devops::az;
use crate::error::{ReportError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application configuration, shared by both binaries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Organization URL, e.g. https://dev.azure.com/contoso
    pub organization: Option<String>,

    /// Default DevOps project to query
    pub project: Option<String>,

    /// Default creator email for PR filtering
    pub user: Option<String>,

    /// Concurrent enrichment requests
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Default HTML output path
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Claude Code history file (default: ~/.claude/history.jsonl)
    pub claude_history: Option<PathBuf>,

    /// Directories scanned for local git repositories
    #[serde(default)]
    pub repo_roots: Vec<PathBuf>,

    /// Anthropic admin API key for the cost section
    pub anthropic_admin_key: Option<String>,
}

impl Config {
    /// Load configuration from the default location, falling back to
    /// defaults when no config file exists
    pub fn load_or_default() -> Result<Self> {
        let path = Self::default_config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Default config file path (~/.config/devops-report/config.toml)
    pub fn default_config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| ReportError::config("could not determine home directory"))?;
        Ok(home
            .join(".config")
            .join("devops-report")
            .join("config.toml"))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(ReportError::config("workers must be > 0"));
        }
        if let Some(org) = &self.organization {
            if !org.starts_with("https://") {
                return Err(ReportError::config(format!(
                    "organization must be a URL like https://dev.azure.com/contoso, got '{}'",
                    org
                )));
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            organization: None,
            project: None,
            user: None,
            workers: default_workers(),
            output: default_output(),
            claude_history: None,
            repo_roots: Vec::new(),
            anthropic_admin_key: None,
        }
    }
}

fn default_workers() -> usize {
    crate::aggregate::DEFAULT_WORKERS
}

fn default_output() -> PathBuf {
    PathBuf::from("reports/pr-report.html")
}

/// Who and where the report is about. Resolved exactly once at startup
/// so every downstream component sees the same answer.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Organization URL
    pub organization: String,
    /// Signed-in user email
    pub user: String,
}

impl Identity {
    /// Resolve organization and user, preferring explicit CLI values,
    /// then the config file, then the ambient az session.
    pub async fn resolve(
        org_override: Option<&str>,
        user_override: Option<&str>,
        config: &Config,
    ) -> Result<Self> {
        let organization = match org_override.or(config.organization.as_deref()) {
            Some(org) => org.to_string(),
            None => {
                let defaults = az::devops_defaults().await?;
                defaults.get("organization").cloned().ok_or_else(|| {
                    ReportError::config(
                        "no organization configured; pass --org, set it in config.toml, \
                         or run 'az devops configure --defaults organization=...'",
                    )
                })?
            }
        };

        let user = match user_override.or(config.user.as_deref()) {
            Some(user) => user.to_string(),
            None => az::current_user().await?,
        };

        Ok(Self { organization, user })
    }
}
