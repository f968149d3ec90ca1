//! Lint engine invocation.

use crate::config::EngineSettings;
use crate::BoxFuture;
use log::{debug, info};
use prlint_core::{
    LintOutcome, LintTarget, PrLintError, Result, parse_eslint_json, partition_engine_targets,
};
use std::path::PathBuf;
use tokio::process::Command;

/// A linting engine that evaluates a list of files.
pub trait LintEngine: Sync {
    /// Lint the files and return per-file diagnostics with aggregate counts.
    fn lint<'a>(&'a self, files: &'a [PathBuf]) -> BoxFuture<'a, LintOutcome>;
}

/// ESLint run as a child process with `--format json`.
#[derive(Debug, Clone)]
pub struct EslintEngine {
    settings: EngineSettings,
}

impl EslintEngine {
    /// Build an engine from launch settings.
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    fn args(&self, files: &[PathBuf]) -> Vec<std::ffi::OsString> {
        let mut args: Vec<std::ffi::OsString> = vec![
            "--format".into(),
            "json".into(),
            "--no-error-on-unmatched-pattern".into(),
        ];
        if let Some(ignore_file) = &self.settings.ignore_file {
            args.push("--ignore-path".into());
            args.push(ignore_file.into());
        }
        args.extend(files.iter().map(Into::into));
        args
    }

    async fn run(&self, files: &[PathBuf]) -> Result<LintOutcome> {
        let program = &self.settings.program;
        debug!("running {} on {} file(s)", program.display(), files.len());
        let output = Command::new(program)
            .args(self.args(files))
            .current_dir(&self.settings.working_dir)
            .output()
            .await
            .map_err(|err| {
                PrLintError::engine(format!("failed to start {}: {err}", program.display()))
            })?;

        // 0: clean, 1: lint errors reported. Anything else is a crash or a
        // configuration problem.
        match output.status.code() {
            Some(0) | Some(1) => parse_eslint_json(&String::from_utf8_lossy(&output.stdout)),
            _ => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let stdout = String::from_utf8_lossy(&output.stdout);
                let detail = [stderr.trim(), stdout.trim()]
                    .into_iter()
                    .find(|text| !text.is_empty())
                    .unwrap_or("no output");
                Err(PrLintError::engine(format!(
                    "{} exited with {}: {detail}",
                    program.display(),
                    output.status
                )))
            }
        }
    }
}

impl LintEngine for EslintEngine {
    fn lint<'a>(&'a self, files: &'a [PathBuf]) -> BoxFuture<'a, LintOutcome> {
        Box::pin(self.run(files))
    }
}

/// Run the engine over the targets its extension table covers.
///
/// Targets outside that table are logged and skipped; when none remain the
/// engine is not invoked and the outcome is empty.
pub async fn collect_diagnostics(
    engine: &dyn LintEngine,
    targets: &[LintTarget],
) -> Result<LintOutcome> {
    let (evaluated, skipped) = partition_engine_targets(targets);
    for target in &skipped {
        info!("{} accepted but not evaluated by the engine", target.relative);
    }
    if evaluated.is_empty() {
        return Ok(LintOutcome::default());
    }
    let files: Vec<PathBuf> = evaluated
        .iter()
        .map(|target| target.absolute.clone())
        .collect();
    let outcome = engine.lint(&files).await?;
    info!(
        "engine processed {} file(s): {} error(s), {} warning(s)",
        outcome.results.len(),
        outcome.error_count,
        outcome.warning_count
    );
    Ok(outcome)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use prlint_core::{Diagnostic, FileDiagnostics, Severity};
    use std::path::Path;
    use std::sync::Mutex;

    /// Returns a canned outcome, or fails, and records each file list it saw.
    pub(crate) struct FakeEngine {
        outcome: Option<LintOutcome>,
        pub(crate) calls: Mutex<Vec<Vec<PathBuf>>>,
    }

    impl FakeEngine {
        pub(crate) fn returning(outcome: LintOutcome) -> Self {
            Self {
                outcome: Some(outcome),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn crashing() -> Self {
            Self {
                outcome: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn calls(&self) -> Vec<Vec<PathBuf>> {
            self.calls.lock().expect("calls").clone()
        }
    }

    impl LintEngine for FakeEngine {
        fn lint<'a>(&'a self, files: &'a [PathBuf]) -> BoxFuture<'a, LintOutcome> {
            Box::pin(async move {
                self.calls.lock().expect("calls").push(files.to_vec());
                self.outcome
                    .clone()
                    .ok_or_else(|| PrLintError::engine("config file is invalid"))
            })
        }
    }

    pub(crate) fn one_error(path: &str) -> LintOutcome {
        LintOutcome {
            results: vec![FileDiagnostics {
                file_path: PathBuf::from(path),
                diagnostics: vec![Diagnostic {
                    line: 1,
                    severity: Severity::Error,
                    rule_id: Some("semi".to_string()),
                    message: "Missing semicolon.".to_string(),
                }],
            }],
            error_count: 1,
            warning_count: 0,
        }
    }

    fn targets(paths: &[&str]) -> Vec<LintTarget> {
        paths
            .iter()
            .map(|path| LintTarget::new(Path::new("/work"), *path))
            .collect()
    }

    #[tokio::test]
    async fn collector_hands_engine_only_engine_extensions() {
        let engine = FakeEngine::returning(one_error("/work/a.js"));
        let outcome = collect_diagnostics(&engine, &targets(&["a.js", "c.ts", "d.mjs", "e.tsx"]))
            .await
            .expect("outcome");
        assert_eq!(outcome.error_count, 1);
        assert_eq!(
            engine.calls(),
            vec![vec![PathBuf::from("/work/a.js"), PathBuf::from("/work/e.tsx")]]
        );
    }

    #[tokio::test]
    async fn collector_skips_engine_when_nothing_is_evaluable() {
        let engine = FakeEngine::crashing();
        let outcome = collect_diagnostics(&engine, &targets(&["c.ts", "d.mjs"]))
            .await
            .expect("outcome");
        assert_eq!(outcome, LintOutcome::default());
        assert!(engine.calls().is_empty());
    }

    #[tokio::test]
    async fn collector_propagates_engine_failures() {
        let engine = FakeEngine::crashing();
        let err = collect_diagnostics(&engine, &targets(&["a.js"]))
            .await
            .unwrap_err();
        assert!(matches!(err, PrLintError::Engine(_)));
    }

    fn settings(program: PathBuf, ignore_file: Option<PathBuf>) -> EngineSettings {
        EngineSettings {
            program,
            working_dir: std::env::temp_dir(),
            ignore_file,
        }
    }

    #[test]
    fn eslint_arguments_request_json_and_ignore_file() {
        let engine = EslintEngine::new(settings(
            PathBuf::from("eslint"),
            Some(PathBuf::from("/work/.eslintignore")),
        ));
        let args: Vec<String> = engine
            .args(&[PathBuf::from("/work/a.js")])
            .into_iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "--format",
                "json",
                "--no-error-on-unmatched-pattern",
                "--ignore-path",
                "/work/.eslintignore",
                "/work/a.js",
            ]
        );
    }

    #[tokio::test]
    async fn missing_executable_is_an_engine_error() {
        let engine = EslintEngine::new(settings(
            PathBuf::from("/nonexistent/prlint/eslint"),
            None,
        ));
        let err = engine.lint(&[PathBuf::from("a.js")]).await.unwrap_err();
        assert!(matches!(err, PrLintError::Engine(_)));
        assert!(err.to_string().contains("failed to start"));
    }

    #[cfg(unix)]
    fn fake_eslint(name: &str, script: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system time")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("prlint_engine_{name}_{nanos}"));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join("eslint");
        std::fs::write(&path, script).expect("write script");
        let mut perms = std::fs::metadata(&path).expect("metadata").permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).expect("chmod");
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn lint_errors_exit_status_is_parsed() {
        let script = "#!/bin/sh\n\
            echo '[{\"filePath\":\"/work/a.js\",\"messages\":[{\"ruleId\":\"semi\",\"severity\":2,\"message\":\"Missing semicolon.\",\"line\":2}],\"errorCount\":1,\"warningCount\":0}]'\n\
            exit 1\n";
        let program = fake_eslint("lint", script);
        let engine = EslintEngine::new(settings(program.clone(), None));
        let outcome = engine
            .lint(&[PathBuf::from("/work/a.js")])
            .await
            .expect("outcome");
        assert_eq!(outcome.error_count, 1);
        assert_eq!(outcome.results[0].diagnostics[0].line, 2);
        std::fs::remove_dir_all(program.parent().expect("dir")).expect("cleanup");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn fatal_exit_status_is_an_engine_error() {
        let script = "#!/bin/sh\necho 'Oops! Something went wrong!' >&2\nexit 2\n";
        let program = fake_eslint("fatal", script);
        let engine = EslintEngine::new(settings(program.clone(), None));
        let err = engine
            .lint(&[PathBuf::from("/work/a.js")])
            .await
            .unwrap_err();
        assert!(matches!(err, PrLintError::Engine(_)));
        assert!(err.to_string().contains("Something went wrong"));
        std::fs::remove_dir_all(program.parent().expect("dir")).expect("cleanup");
    }
}
