use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};

use crate::auth::Token;
use crate::config::Config;
use crate::error::CISyncError;
use crate::output;
use crate::providers::{ConfluenceClient, GitLabClient};
use crate::refs::RefPattern;
use crate::sync::{SyncOptions, SyncReport, SyncRequest, Synchronizer};

#[derive(Parser)]
#[command(name = "cisync")]
#[command(
    author,
    version,
    about = "Publish GitLab pipeline results to Confluence pages",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Write the run report as JSON to this file
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Indent the JSON report
    #[arg(long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Update the pipeline's section on a Confluence page
    Sync(SyncArgs),

    /// Write a configuration template and exit
    InitConfig {
        /// Destination; the format follows the extension
        path: PathBuf,
    },
}

#[derive(Args)]
struct SyncArgs {
    /// GitLab pipeline id
    #[arg(short = 'p', long)]
    pipeline_id: u64,

    /// GitLab project id or `group/project` path
    #[arg(short = 'P', long, env = "PROJECT_ID")]
    project_id: String,

    /// Confluence page id to update
    #[arg(long, env = "CONFLUENCE_PAGE_ID")]
    page_id: String,

    #[arg(long, env = "GITLAB_URL")]
    gitlab_url: Option<String>,

    #[arg(long, env = "GITLAB_TOKEN", hide_env_values = true)]
    gitlab_token: Option<String>,

    #[arg(long, env = "CONFLUENCE_URL")]
    confluence_url: Option<String>,

    #[arg(long, env = "CONFLUENCE_EMAIL")]
    confluence_email: Option<String>,

    #[arg(long, env = "CONFLUENCE_TOKEN", hide_env_values = true)]
    confluence_token: Option<String>,

    /// Number of recent pipelines shown in the history
    #[arg(long, env = "HISTORY_COUNT")]
    history_count: Option<usize>,

    /// Regex with a `name` group used to group history by application
    #[arg(long, env = "REF_REGEX")]
    ref_regex: Option<String>,

    /// Skip fetching test counts for history runs
    #[arg(long, default_value_t = false)]
    no_history_tests: bool,

    /// Render and splice, but do not write the page
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

/// Fully resolved settings of one `sync` invocation.
#[derive(Debug)]
struct SyncSettings {
    gitlab_url: String,
    gitlab_token: Option<Token>,
    confluence_url: String,
    confluence_email: String,
    confluence_token: Token,
    options: SyncOptions,
}

impl SyncArgs {
    /// Merges flags and environment over the config file.
    ///
    /// Everything is validated here, before any request is made.
    fn resolve(&self, config: Config) -> Result<SyncSettings, CISyncError> {
        let history_count = self
            .history_count
            .unwrap_or(config.options.history_count);
        if history_count == 0 {
            return Err(CISyncError::Config(
                "history count must be at least 1".to_string(),
            ));
        }

        let ref_pattern = self
            .ref_regex
            .clone()
            .or(config.options.ref_regex)
            .filter(|pattern| !pattern.is_empty())
            .map(|pattern| RefPattern::new(&pattern))
            .transpose()?;

        let confluence_url = required(
            self.confluence_url.clone().or(config.confluence.url),
            "Confluence URL (--confluence-url, CONFLUENCE_URL or confluence.url)",
        )?;
        let confluence_email = required(
            self.confluence_email.clone().or(config.confluence.email),
            "Confluence email (--confluence-email, CONFLUENCE_EMAIL or confluence.email)",
        )?;
        let confluence_token = required(
            self.confluence_token.clone().or(config.confluence.token),
            "Confluence token (--confluence-token, CONFLUENCE_TOKEN or confluence.token)",
        )?;

        Ok(SyncSettings {
            gitlab_url: self.gitlab_url.clone().unwrap_or(config.gitlab.url),
            gitlab_token: self
                .gitlab_token
                .clone()
                .or(config.gitlab.token)
                .map(Token::from),
            confluence_url,
            confluence_email,
            confluence_token: Token::from(confluence_token),
            options: SyncOptions {
                history_count,
                ref_pattern,
                history_tests: !self.no_history_tests && config.options.history_tests,
                dry_run: self.dry_run,
            },
        })
    }

    fn request(&self) -> SyncRequest {
        SyncRequest {
            project_id: self.project_id.clone(),
            pipeline_id: self.pipeline_id,
            page_id: self.page_id.clone(),
        }
    }
}

fn required(value: Option<String>, what: &str) -> Result<String, CISyncError> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| CISyncError::Config(format!("missing {what}")))
}

impl Cli {
    async fn execute_sync(&self, args: &SyncArgs) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;
        let settings = args.resolve(config)?;

        info!(
            "Syncing pipeline {} of project {} to page {}",
            args.pipeline_id, args.project_id, args.page_id
        );

        let gitlab = GitLabClient::new(&settings.gitlab_url, settings.gitlab_token)?;
        let confluence = ConfluenceClient::new(
            &settings.confluence_url,
            settings.confluence_email,
            settings.confluence_token,
        )?;

        let report = Synchronizer::new(&gitlab, &confluence, &settings.options)
            .run(&args.request())
            .await?;

        self.write_report(&report)
    }

    fn write_report(&self, report: &SyncReport) -> Result<()> {
        let Some(output_path) = &self.output else {
            output::print_summary(report);
            return Ok(());
        };

        let json_output = if self.pretty {
            serde_json::to_string_pretty(report)?
        } else {
            serde_json::to_string(report)?
        };

        std::fs::write(output_path, json_output)?;
        info!("Report written to: {}", output_path.display());

        Ok(())
    }

    fn execute_init_config(path: &Path) -> Result<()> {
        Config::template().save(path)?;

        eprintln!("Configuration template saved to: {}", path.display());
        eprintln!("Please update the values in the config file before running a sync.");

        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Sync(args) => self.execute_sync(args).await,
            Commands::InitConfig { path } => Self::execute_init_config(path),
        }
    }
}
