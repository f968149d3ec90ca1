#![deny(missing_docs)]
//! prlint command-line interface.
//!
//! Lints the JavaScript and TypeScript files touched by a pull request with
//! ESLint and reports the findings as a GitHub check run.

mod check_run;
mod config;
mod engine;
mod github;
mod pipeline;

use clap::Parser;
use config::{Config, RunArgs};
use engine::EslintEngine;
use github::GitHubClient;
use pipeline::{Collaborators, PipelineOutcome, exit_code_for, run_pipeline};
use prlint_core::StdFileSystem;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by the collaborator traits.
pub(crate) type BoxFuture<'a, T> =
    Pin<Box<dyn Future<Output = prlint_core::Result<T>> + Send + 'a>>;

#[derive(Parser)]
#[command(name = "prlint", version, about = "Lint pull request changes into a check run")]
struct Cli {
    #[command(flatten)]
    run: RunArgs,
}

#[cfg(not(test))]
#[tokio::main]
async fn main() -> std::process::ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    std::process::ExitCode::from(exit_code_for(run(cli.run).await))
}

#[cfg(test)]
fn main() {}

#[cfg_attr(test, allow(dead_code))]
async fn run(args: RunArgs) -> prlint_core::Result<PipelineOutcome> {
    let config = Config::from_args(args).await?;
    let github = GitHubClient::new(&config.api)?;
    let engine = EslintEngine::new(config.engine.clone());
    let fs = StdFileSystem::new();
    let deps = Collaborators {
        pulls: &github,
        checks: &github,
        engine: &engine,
        fs: &fs,
    };
    run_pipeline(&config, &deps).await
}
