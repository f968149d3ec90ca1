//! Parser for the ESLint `--format json` output.

use std::path::PathBuf;

use serde::Deserialize;

use crate::domain::{Diagnostic, FileDiagnostics, LintOutcome, Severity};
use crate::error::{PrLintError, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EslintFileResult {
    file_path: PathBuf,
    #[serde(default)]
    messages: Vec<EslintMessage>,
    #[serde(default)]
    error_count: u64,
    #[serde(default)]
    warning_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EslintMessage {
    rule_id: Option<String>,
    severity: Severity,
    message: String,
    line: Option<u32>,
}

impl From<EslintMessage> for Diagnostic {
    fn from(value: EslintMessage) -> Self {
        Self {
            // File-level messages (ignored files, parse failures without a
            // location) anchor to the first line.
            line: value.line.unwrap_or(1).max(1),
            severity: value.severity,
            rule_id: value.rule_id,
            message: value.message,
        }
    }
}

/// Parse the JSON array ESLint prints for `--format json`.
pub fn parse_eslint_json(output: &str) -> Result<LintOutcome> {
    let files: Vec<EslintFileResult> = serde_json::from_str(output.trim())
        .map_err(|err| PrLintError::engine(format!("unreadable eslint output: {err}")))?;

    let mut outcome = LintOutcome::default();
    for file in files {
        outcome.error_count += file.error_count;
        outcome.warning_count += file.warning_count;
        outcome.results.push(FileDiagnostics {
            file_path: file.file_path,
            diagnostics: file.messages.into_iter().map(Diagnostic::from).collect(),
        });
    }
    Ok(outcome)
}
