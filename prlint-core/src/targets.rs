//! Lint target selection from a pull request change set.
//!
//! Selection happens in two steps: an extension filter over the changed paths,
//! then an existence check against the workspace. Paths that no longer exist
//! (deleted or renamed away in the pull request) are dropped with a warning.

use std::path::{Path, PathBuf};

use log::warn;

use crate::domain::{ChangeSet, ChangedFile};
use crate::fs::FileSystem;

/// Extensions a changed file must carry to be selected for linting.
pub const LINTABLE_EXTENSIONS: &[&str] = &["mjs", "js", "ts", "jsx", "tsx"];

/// Extensions the engine is configured to evaluate.
///
/// Narrower than [`LINTABLE_EXTENSIONS`]: `.ts` and `.mjs` targets are accepted
/// but never handed to the engine.
pub const ENGINE_EXTENSIONS: &[&str] = &["js", "jsx", "tsx"];

/// A changed file selected for linting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintTarget {
    /// Repository-relative path, as reported by the platform.
    pub relative: String,
    /// Path resolved against the workspace root.
    pub absolute: PathBuf,
}

impl LintTarget {
    /// Resolve a repository-relative path under the workspace root.
    pub fn new(workspace: &Path, relative: impl Into<String>) -> Self {
        let relative = relative.into();
        let absolute = workspace.join(&relative);
        Self { relative, absolute }
    }

    /// Whether the engine's extension table covers this target.
    pub fn is_engine_target(&self) -> bool {
        has_extension(&self.relative, ENGINE_EXTENSIONS)
    }
}

/// Whether the path ends in one of the given extensions (case-sensitive).
pub fn has_extension(path: &str, extensions: &[&str]) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.contains(&ext))
}

/// Keep the changed paths with a lintable extension, preserving order.
pub fn filter_lintable(files: &[ChangedFile]) -> Vec<String> {
    files
        .iter()
        .filter(|file| has_extension(&file.path, LINTABLE_EXTENSIONS))
        .map(|file| file.path.clone())
        .collect()
}

/// Resolve paths under the workspace and drop those that are not on disk.
pub fn retain_existing<F: FileSystem + ?Sized>(
    fs: &F,
    workspace: &Path,
    paths: Vec<String>,
) -> Vec<LintTarget> {
    paths
        .into_iter()
        .map(|path| LintTarget::new(workspace, path))
        .filter(|target| {
            let present = fs.is_file(&target.absolute);
            if !present {
                warn!(
                    "skipping {}: not present in the workspace",
                    target.absolute.display()
                );
            }
            present
        })
        .collect()
}

/// Select lint targets for a change set.
pub fn select_targets<F: FileSystem + ?Sized>(
    fs: &F,
    workspace: &Path,
    change_set: &ChangeSet,
) -> Vec<LintTarget> {
    retain_existing(fs, workspace, filter_lintable(&change_set.files))
}

/// Split targets into those the engine evaluates and those it does not.
pub fn partition_engine_targets(targets: &[LintTarget]) -> (Vec<&LintTarget>, Vec<&LintTarget>) {
    targets.iter().partition(|target| target.is_engine_target())
}
