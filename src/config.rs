use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::render::DEFAULT_HISTORY_CAP;

const PLACEHOLDER: &str = "changeme";

/// Configuration file structure for CISync.
///
/// Holds the connection settings for both services and the sync options, so
/// a CI job only has to pass the pipeline, project and page ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub gitlab: GitLabConfig,

    #[serde(default)]
    pub confluence: ConfluenceConfig,

    #[serde(default)]
    pub options: OptionsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitLabConfig {
    /// GitLab instance base URL
    #[serde(default = "default_gitlab_url")]
    pub url: String,

    /// GitLab private token; public projects need none
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConfluenceConfig {
    /// Confluence base URL, e.g. `https://example.atlassian.net/wiki`
    pub url: Option<String>,

    /// Account email used for basic auth
    pub email: Option<String>,

    /// Confluence API token
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OptionsConfig {
    /// Number of recent pipelines shown in the history
    #[serde(default = "default_history_count")]
    pub history_count: usize,

    /// Regex with a `name` (and optional `version`) group used to group history by application
    pub ref_regex: Option<String>,

    /// Fetch test counts for every history run
    #[serde(default = "default_history_tests")]
    pub history_tests: bool,
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            url: default_gitlab_url(),
            token: None,
        }
    }
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            history_count: default_history_count(),
            ref_regex: None,
            history_tests: default_history_tests(),
        }
    }
}

fn default_gitlab_url() -> String {
    "https://gitlab.com".to_string()
}

fn default_history_count() -> usize {
    DEFAULT_HISTORY_CAP
}

fn default_history_tests() -> bool {
    true
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./cisync.toml
    /// 3. ./cisync.json
    /// 4. ./cisync.yaml
    /// 5. ./cisync.yml
    ///
    /// Returns default configuration if no path is given and no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = ["cisync.toml", "cisync.json", "cisync.yaml", "cisync.yml"];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }

    /// A configuration with placeholder credentials, for `init-config`.
    pub fn template() -> Self {
        Self {
            gitlab: GitLabConfig {
                url: "https://gitlab.example.com".to_string(),
                token: Some(PLACEHOLDER.to_string()),
            },
            confluence: ConfluenceConfig {
                url: Some("https://confluence.example.com".to_string()),
                email: Some(PLACEHOLDER.to_string()),
                token: Some(PLACEHOLDER.to_string()),
            },
            options: OptionsConfig::default(),
        }
    }

    /// Save configuration to a new file; existing files are never overwritten.
    pub fn save(&self, path: &Path) -> Result<()> {
        if path.exists() {
            bail!("File already exists: {}", path.display());
        }

        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("yaml" | "yml") => serde_yaml::to_string(self)?,
            _ => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}
