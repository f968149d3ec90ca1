//! Check-run lifecycle: opened once before linting, completed once afterwards.

use crate::config::RepoRef;
use crate::github::{CheckRunApi, CheckRunOutput, CreateCheckRun, UpdateCheckRun};
use chrono::Utc;
use log::{error, info};
use prlint_core::{Annotation, Conclusion, Report, Result};
use serde::{Deserialize, Serialize};

/// Most annotations the platform accepts in one update request.
pub const ANNOTATIONS_PER_REQUEST: usize = 50;

/// Check-run status. The only transition is `InProgress` to `Completed`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckRunStatus {
    /// Created and awaiting a verdict.
    InProgress,
    /// Finished with a conclusion.
    Completed,
}

/// A check run that has been created and not yet completed.
///
/// Not `Clone`: [`CheckRunReporter::close`] consumes it, so a run can only be
/// completed once and only after it was opened.
#[derive(Debug, PartialEq, Eq)]
pub struct OpenCheckRun {
    id: u64,
}

impl OpenCheckRun {
    /// Platform id of the run.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Always [`CheckRunStatus::InProgress`].
    pub fn status(&self) -> CheckRunStatus {
        CheckRunStatus::InProgress
    }
}

/// A check run that has been completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedCheckRun {
    /// Platform id of the run.
    pub id: u64,
    /// Verdict sent with the completing update.
    pub conclusion: Conclusion,
}

impl ClosedCheckRun {
    /// Always [`CheckRunStatus::Completed`].
    pub fn status(&self) -> CheckRunStatus {
        CheckRunStatus::Completed
    }
}

/// Opens and closes the check run for one pipeline run.
pub struct CheckRunReporter<'a> {
    api: &'a dyn CheckRunApi,
    repo: &'a RepoRef,
    name: &'a str,
}

impl<'a> CheckRunReporter<'a> {
    /// Create a reporter for the named check.
    pub fn new(api: &'a dyn CheckRunApi, repo: &'a RepoRef, name: &'a str) -> Self {
        Self { api, repo, name }
    }

    /// Create the check run in progress against `head_sha`.
    pub async fn open(&self, head_sha: &str) -> Result<OpenCheckRun> {
        let request = CreateCheckRun {
            name: self.name.to_string(),
            head_sha: head_sha.to_string(),
            status: CheckRunStatus::InProgress,
            started_at: Utc::now(),
        };
        let id = self.api.create_check_run(self.repo, &request).await?;
        info!("opened check run {id} on {head_sha}");
        Ok(OpenCheckRun { id })
    }

    /// Complete the check run.
    ///
    /// With a report, its conclusion and output are attached; annotations
    /// beyond [`ANNOTATIONS_PER_REQUEST`] go out in earlier output-only
    /// updates. Without a report the run is completed as a failure with no
    /// output.
    ///
    /// If delivering the report fails, the run is still completed as a
    /// failure, best-effort, and the delivery error is returned.
    pub async fn close(
        &self,
        run: OpenCheckRun,
        report: Option<&Report>,
    ) -> Result<ClosedCheckRun> {
        let conclusion = match report {
            Some(report) => match self.send_report(run.id, report).await {
                Ok(()) => report.conclusion,
                Err(err) => {
                    if let Err(close_err) = self.complete_as_failure(run.id).await {
                        error!("could not mark check run {} as failed: {close_err}", run.id);
                    }
                    return Err(err);
                }
            },
            None => {
                self.complete_as_failure(run.id).await?;
                Conclusion::Failure
            }
        };
        info!("completed check run {} ({})", run.id, conclusion.as_str());
        Ok(ClosedCheckRun {
            id: run.id,
            conclusion,
        })
    }

    async fn complete_as_failure(&self, id: u64) -> Result<()> {
        let request = self.completion(Conclusion::Failure, None);
        self.api.update_check_run(self.repo, id, &request).await
    }

    async fn send_report(&self, id: u64, report: &Report) -> Result<()> {
        let batches = annotation_batches(&report.annotations);
        let total = batches.len();
        for (index, batch) in batches.into_iter().enumerate() {
            let output = Some(CheckRunOutput {
                title: report.title.clone(),
                summary: report.summary.clone(),
                annotations: batch.to_vec(),
            });
            let request = if index + 1 == total {
                self.completion(report.conclusion, output)
            } else {
                UpdateCheckRun {
                    name: self.name.to_string(),
                    status: None,
                    completed_at: None,
                    conclusion: None,
                    output,
                }
            };
            self.api.update_check_run(self.repo, id, &request).await?;
        }
        Ok(())
    }

    fn completion(
        &self,
        conclusion: Conclusion,
        output: Option<CheckRunOutput>,
    ) -> UpdateCheckRun {
        UpdateCheckRun {
            name: self.name.to_string(),
            status: Some(CheckRunStatus::Completed),
            completed_at: Some(Utc::now()),
            conclusion: Some(conclusion),
            output,
        }
    }
}

/// Split annotations into request-sized batches; always at least one batch.
fn annotation_batches(annotations: &[Annotation]) -> Vec<&[Annotation]> {
    if annotations.is_empty() {
        return vec![annotations];
    }
    annotations.chunks(ANNOTATIONS_PER_REQUEST).collect()
}
