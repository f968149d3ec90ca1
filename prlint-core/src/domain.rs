//! Domain entities for prlint.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A file touched by a pull request, as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    /// Repository-relative path of the file.
    pub path: String,
}

impl ChangedFile {
    /// Create a changed file entry.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Files touched by a pull request together with its most recent commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    /// Object id of the most recent commit on the pull request.
    pub head_commit_id: String,
    /// Files attached to the pull request, in platform order.
    pub files: Vec<ChangedFile>,
}

/// Severity reported by the linting engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Severity {
    /// Informational; never surfaced as an annotation.
    Info = 0,
    /// Warning; surfaced but never fails the run.
    Warning = 1,
    /// Error; fails the run.
    Error = 2,
}

impl TryFrom<u8> for Severity {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, String> {
        match value {
            0 => Ok(Severity::Info),
            1 => Ok(Severity::Warning),
            2 => Ok(Severity::Error),
            other => Err(format!("unknown severity {other}")),
        }
    }
}

impl From<Severity> for u8 {
    fn from(value: Severity) -> Self {
        value as u8
    }
}

/// A single finding produced by the linting engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// One-based line the finding is anchored to.
    pub line: u32,
    /// Engine severity.
    pub severity: Severity,
    /// Rule that produced the finding, absent for engine-internal messages.
    pub rule_id: Option<String>,
    /// Free-text message.
    pub message: String,
}

/// Diagnostics for one file the engine processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiagnostics {
    /// Absolute path as reported by the engine.
    pub file_path: PathBuf,
    /// Findings in engine order.
    pub diagnostics: Vec<Diagnostic>,
}

/// Aggregate output of one engine invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintOutcome {
    /// Per-file results in engine order.
    pub results: Vec<FileDiagnostics>,
    /// Errors summed across all processed files.
    pub error_count: u64,
    /// Warnings summed across all processed files.
    pub warning_count: u64,
}

/// Final verdict of a completed check run.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conclusion {
    /// No lint errors were found.
    Success,
    /// At least one lint error was found, or the pipeline failed.
    Failure,
}

impl Conclusion {
    /// Platform label for the conclusion.
    pub fn as_str(&self) -> &'static str {
        match self {
            Conclusion::Success => "success",
            Conclusion::Failure => "failure",
        }
    }
}

/// Annotation level understood by the check-run API.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationLevel {
    /// Rendered as a warning on the diff.
    Warning,
    /// Rendered as a failure on the diff.
    Failure,
}

impl AnnotationLevel {
    /// Platform label for the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationLevel::Warning => "warning",
            AnnotationLevel::Failure => "failure",
        }
    }
}

/// A line-anchored comment attached to a check run's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Path relative to the workspace root, using `/` separators.
    pub path: String,
    /// First annotated line.
    pub start_line: u32,
    /// Last annotated line; equal to `start_line`.
    pub end_line: u32,
    /// Annotation level.
    pub annotation_level: AnnotationLevel,
    /// Rule-prefixed message.
    pub message: String,
}

/// Platform-agnostic check-run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Pass/fail verdict.
    pub conclusion: Conclusion,
    /// Output title.
    pub title: String,
    /// Error and warning counts.
    pub summary: String,
    /// Annotations in file order, then message order.
    pub annotations: Vec<Annotation>,
}
