//! Translation of engine output into a check-run report.

use std::path::{Component, Path};

use serde::Serialize;

use crate::domain::{
    Annotation, AnnotationLevel, Conclusion, Diagnostic, LintOutcome, Report, Severity,
};
use crate::error::{PrLintError, Result};

/// Token rendered in place of a missing rule id.
pub const UNKNOWN_RULE: &str = "unknown-rule";

/// Build a report from engine output, rebasing paths under `workspace`.
pub fn normalize(outcome: &LintOutcome, workspace: &Path, title: &str) -> Result<Report> {
    let mut annotations = Vec::new();
    for result in &outcome.results {
        let path = rebase_path(&result.file_path, workspace)?;
        annotations.extend(
            result
                .diagnostics
                .iter()
                .filter_map(|diagnostic| annotate(&path, diagnostic)),
        );
    }

    Ok(Report {
        conclusion: conclusion_for(outcome.error_count),
        title: title.to_string(),
        summary: render_summary(outcome.error_count, outcome.warning_count),
        annotations,
    })
}

/// Strip the workspace root from an engine path.
///
/// The result uses `/` separators. Paths outside the workspace, or the
/// workspace itself, are rejected.
pub fn rebase_path(file_path: &Path, workspace: &Path) -> Result<String> {
    let relative = file_path.strip_prefix(workspace).map_err(|_| {
        PrLintError::Precondition(format!(
            "{} is not under workspace {}",
            file_path.display(),
            workspace.display()
        ))
    })?;

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy()),
            Component::CurDir => {}
            _ => {
                return Err(PrLintError::Precondition(format!(
                    "{} escapes workspace {}",
                    file_path.display(),
                    workspace.display()
                )));
            }
        }
    }
    if parts.is_empty() {
        return Err(PrLintError::Precondition(format!(
            "{} names the workspace root, not a file",
            file_path.display()
        )));
    }
    Ok(parts.join("/"))
}

/// Map an engine severity onto an annotation level.
///
/// Informational findings have no level and are never surfaced.
pub fn annotation_level(severity: Severity) -> Option<AnnotationLevel> {
    match severity {
        Severity::Info => None,
        Severity::Warning => Some(AnnotationLevel::Warning),
        Severity::Error => Some(AnnotationLevel::Failure),
    }
}

/// Render `[rule] message`.
pub fn format_message(rule_id: Option<&str>, message: &str) -> String {
    let rule = rule_id.filter(|rule| !rule.is_empty()).unwrap_or(UNKNOWN_RULE);
    format!("[{rule}] {message}")
}

/// Errors fail the run; warnings alone never do.
pub fn conclusion_for(error_count: u64) -> Conclusion {
    if error_count > 0 {
        Conclusion::Failure
    } else {
        Conclusion::Success
    }
}

/// Render the one-line count summary.
pub fn render_summary(error_count: u64, warning_count: u64) -> String {
    format!("{error_count} error(s), {warning_count} warning(s) found")
}

/// Render any serializable payload as JSON.
pub fn render_json<T: Serialize + ?Sized>(
    payload: &T,
) -> std::result::Result<String, serde_json::Error> {
    serde_json::to_string_pretty(payload)
}

fn annotate(path: &str, diagnostic: &Diagnostic) -> Option<Annotation> {
    let level = annotation_level(diagnostic.severity)?;
    Some(Annotation {
        path: path.to_string(),
        start_line: diagnostic.line,
        end_line: diagnostic.line,
        annotation_level: level,
        message: format_message(diagnostic.rule_id.as_deref(), &diagnostic.message),
    })
}
