//! Run configuration assembled once at startup.

use clap::Args;
use log::info;
use prlint_core::{PrLintError, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_API_URL: &str = "https://api.github.com";
const DEFAULT_CHECK_NAME: &str = "ESLint";
const DEFAULT_ESLINT_BIN: &str = "node_modules/.bin/eslint";
const DEFAULT_IGNORE_FILE: &str = ".eslintignore";

/// CLI arguments for a lint run; every value can come from the CI environment.
#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Commit that triggered the workflow.
    #[arg(long, env = "GITHUB_SHA")]
    pub sha: String,
    /// Token used for GitHub API calls.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: String,
    /// Checkout root; annotation paths are relative to it.
    #[arg(long, env = "GITHUB_WORKSPACE")]
    pub workspace: PathBuf,
    /// Repository in `owner/name` form.
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repository: String,
    /// Webhook event payload used to find the pull request number.
    #[arg(long, env = "GITHUB_EVENT_PATH")]
    pub event_path: Option<PathBuf>,
    /// Pull request number; overrides the event payload.
    #[arg(long, env = "PR_NUMBER")]
    pub pr_number: Option<u64>,
    /// Directory ESLint runs in (defaults to the workspace).
    #[arg(long, env = "WORKING_DIRECTORY")]
    pub working_directory: Option<PathBuf>,
    /// Base URL of the GitHub REST API.
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,
    /// GitHub GraphQL endpoint (defaults to `<api-url>/graphql`).
    #[arg(long, env = "GITHUB_GRAPHQL_URL")]
    pub graphql_url: Option<String>,
    /// Name of the check run.
    #[arg(long, env = "CHECK_NAME", default_value = DEFAULT_CHECK_NAME)]
    pub check_name: String,
    /// ESLint executable, relative paths resolve against the lint directory.
    #[arg(long, env = "ESLINT_BIN", default_value = DEFAULT_ESLINT_BIN)]
    pub eslint_bin: PathBuf,
    /// Ignore file at the workspace root passed to ESLint when present.
    #[arg(long, env = "ESLINT_IGNORE_FILE", default_value = DEFAULT_IGNORE_FILE)]
    pub ignore_file: PathBuf,
    /// Timeout for each GitHub API request, in seconds.
    #[arg(long, env = "PRLINT_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,
}

/// Repository coordinates on the hosting platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    /// Owning user or organization.
    pub owner: String,
    /// Repository name.
    pub name: String,
}

impl RepoRef {
    /// Parse an `owner/name` identifier.
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        let (owner, name) = trimmed.split_once('/').ok_or_else(|| {
            PrLintError::Config(format!("repository must be owner/name, got {trimmed:?}"))
        })?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(PrLintError::Config(format!(
                "repository must be owner/name, got {trimmed:?}"
            )));
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Endpoints and credentials for the GitHub client.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// REST base URL without a trailing slash.
    pub api_url: String,
    /// GraphQL endpoint.
    pub graphql_url: String,
    /// Bearer token.
    pub token: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// How the linting engine is launched.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// ESLint executable.
    pub program: PathBuf,
    /// Directory the engine runs in.
    pub working_dir: PathBuf,
    /// Ignore file to pass along, if it exists.
    pub ignore_file: Option<PathBuf>,
}

/// Fully resolved configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Commit that triggered the workflow.
    pub event_sha: String,
    /// Absolute checkout root.
    pub workspace: PathBuf,
    /// Target repository.
    pub repo: RepoRef,
    /// Pull request under review.
    pub pr_number: u64,
    /// Check run name and output title.
    pub check_name: String,
    /// GitHub client settings.
    pub api: ApiSettings,
    /// Engine launch settings.
    pub engine: EngineSettings,
}

impl Config {
    /// Resolve CLI arguments into a run configuration.
    pub async fn from_args(args: RunArgs) -> Result<Self> {
        let repo = RepoRef::parse(&args.repository)?;
        if args.token.trim().is_empty() {
            return Err(PrLintError::Config("GITHUB_TOKEN is required".to_string()));
        }
        let workspace = std::path::absolute(&args.workspace)?;
        let pr_number = match args.pr_number {
            Some(number) => number,
            None => {
                let event_path = args.event_path.as_deref().ok_or_else(|| {
                    PrLintError::Config(
                        "pull request number unavailable: set PR_NUMBER or GITHUB_EVENT_PATH"
                            .to_string(),
                    )
                })?;
                let payload = tokio::fs::read_to_string(event_path).await?;
                pr_number_from_event(&payload)?
            }
        };

        let working_dir = match args.working_directory {
            Some(dir) if dir.is_absolute() => dir,
            Some(dir) => workspace.join(dir),
            None => workspace.clone(),
        };
        let program = resolve_program(&args.eslint_bin, &working_dir);
        let ignore_file = resolve_ignore_file(&workspace, &args.ignore_file).await;

        let api_url = args.api_url.trim().trim_end_matches('/').to_string();
        let graphql_url = args
            .graphql_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| format!("{api_url}/graphql"));

        Ok(Self {
            event_sha: args.sha,
            workspace,
            repo,
            pr_number,
            check_name: args.check_name,
            api: ApiSettings {
                api_url,
                graphql_url,
                token: args.token,
                timeout: Duration::from_secs(args.timeout_secs.max(1)),
            },
            engine: EngineSettings {
                program,
                working_dir,
                ignore_file,
            },
        })
    }
}

/// Extract the pull request number from a webhook event payload.
pub fn pr_number_from_event(payload: &str) -> Result<u64> {
    let value: serde_json::Value = serde_json::from_str(payload)
        .map_err(|err| PrLintError::Config(format!("unreadable event payload: {err}")))?;
    value
        .pointer("/pull_request/number")
        .or_else(|| value.get("number"))
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| {
            PrLintError::Config("event payload does not reference a pull request".to_string())
        })
}

/// Bare program names are looked up on `PATH`; other relative paths are
/// resolved against the lint directory.
fn resolve_program(program: &Path, working_dir: &Path) -> PathBuf {
    if program.is_absolute() || program.components().count() == 1 {
        program.to_path_buf()
    } else {
        working_dir.join(program)
    }
}

async fn resolve_ignore_file(workspace: &Path, ignore_file: &Path) -> Option<PathBuf> {
    let path = workspace.join(ignore_file);
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => Some(path),
        _ => {
            info!("no ignore file at {}, linting without one", path.display());
            None
        }
    }
}
