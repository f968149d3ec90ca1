//! The lint pipeline: resolve, filter, open, collect, normalize, close.

use crate::check_run::{CheckRunReporter, OpenCheckRun};
use crate::config::Config;
use crate::engine::{LintEngine, collect_diagnostics};
use crate::github::{CheckRunApi, PullRequestApi};
use log::{debug, error, info};
use prlint_core::{
    Conclusion, FileSystem, LintTarget, Report, Result, normalize, render_json, select_targets,
};

/// Process exit code when lint errors fail the run.
pub const EXIT_LINT_FAILURE: u8 = 78;
/// Process exit code for fatal errors.
pub const EXIT_FATAL: u8 = 1;

/// How a pipeline run ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// No changed file needed linting; no check run was created.
    NothingToLint,
    /// The check run was completed with this conclusion.
    Completed(Conclusion),
}

impl PipelineOutcome {
    /// Exit code for the process.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineOutcome::NothingToLint => 0,
            PipelineOutcome::Completed(Conclusion::Success) => 0,
            PipelineOutcome::Completed(Conclusion::Failure) => EXIT_LINT_FAILURE,
        }
    }
}

/// Exit code for a finished run; fatal errors are logged here.
pub fn exit_code_for(result: Result<PipelineOutcome>) -> u8 {
    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(err) => {
            error!("{err}");
            EXIT_FATAL
        }
    }
}

/// External collaborators of the pipeline.
pub struct Collaborators<'a> {
    /// Change-set source.
    pub pulls: &'a dyn PullRequestApi,
    /// Check-run endpoints.
    pub checks: &'a dyn CheckRunApi,
    /// Linting engine.
    pub engine: &'a dyn LintEngine,
    /// Local filesystem.
    pub fs: &'a dyn FileSystem,
}

/// Run the pipeline once.
///
/// Errors before the check run is opened are returned as-is. Errors after it
/// is opened complete the run as a failure first, best-effort.
pub async fn run_pipeline(config: &Config, deps: &Collaborators<'_>) -> Result<PipelineOutcome> {
    info!(
        "linting pull request #{} of {} (event {})",
        config.pr_number, config.repo, config.event_sha
    );
    let change_set = deps.pulls.change_set(&config.repo, config.pr_number).await?;
    info!(
        "pull request touches {} file(s), head {}",
        change_set.files.len(),
        change_set.head_commit_id
    );

    let targets = select_targets(deps.fs, &config.workspace, &change_set);
    if targets.is_empty() {
        info!("nothing to lint");
        return Ok(PipelineOutcome::NothingToLint);
    }

    let reporter = CheckRunReporter::new(deps.checks, &config.repo, &config.check_name);
    let run = reporter.open(&change_set.head_commit_id).await?;
    debug!("check run {} is {:?}", run.id(), run.status());

    match lint(config, deps.engine, &targets).await {
        Ok(report) => {
            let closed = reporter.close(run, Some(&report)).await?;
            debug!("check run {} is {:?}", closed.id, closed.status());
            Ok(PipelineOutcome::Completed(closed.conclusion))
        }
        Err(err) => {
            fail_check_run(&reporter, run).await;
            Err(err)
        }
    }
}

async fn lint(
    config: &Config,
    engine: &dyn LintEngine,
    targets: &[LintTarget],
) -> Result<Report> {
    let outcome = collect_diagnostics(engine, targets).await?;
    let report = normalize(&outcome, &config.workspace, &config.check_name)?;
    if log::log_enabled!(log::Level::Debug) {
        if let Ok(json) = render_json(&report) {
            debug!("report: {json}");
        }
    }
    info!("{}", report.summary);
    Ok(report)
}

async fn fail_check_run(reporter: &CheckRunReporter<'_>, run: OpenCheckRun) {
    let id = run.id();
    if let Err(err) = reporter.close(run, None).await {
        error!("could not mark check run {id} as failed: {err}");
    }
}
