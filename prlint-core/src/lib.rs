#![deny(missing_docs)]
//! prlint core library.
//!
//! Domain types, lint target selection, ESLint output parsing, and the
//! translation of lint diagnostics into a check-run report.

pub mod domain;
pub mod error;
pub mod eslint;
pub mod fs;
pub mod report;
pub mod targets;

pub use domain::{
    Annotation, AnnotationLevel, ChangeSet, ChangedFile, Conclusion, Diagnostic,
    FileDiagnostics, LintOutcome, Report, Severity,
};
pub use error::{PrLintError, Result};
pub use eslint::parse_eslint_json;
pub use fs::{FileSystem, StdFileSystem};
pub use report::{normalize, rebase_path, render_json};
pub use targets::{
    ENGINE_EXTENSIONS, LINTABLE_EXTENSIONS, LintTarget, filter_lintable,
    partition_engine_targets, select_targets,
};
