//! The execution engine: workspace → synthesize → resolve → build → run
//! → classify.
//!
//! Each invocation is self-contained. The driver is synthesized once per
//! execution against the engine's partitioned catalog, so tool-surface
//! changes take effect on the next call without restarting anything.

use std::time::Duration;

use codemode_gen::{driver, manifest};
use codemode_types::{CodeModeServer, ExecError, ExecutionOutput, ExecutionRequest};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::classify::{Classification, classify};
use crate::workspace::SandboxWorkspace;
use crate::{content, imports, localdeps, process, spill};

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Ceiling for per-request execution timeouts, in seconds.
    pub max_timeout_secs: u64,
    /// Explicit spill threshold in characters; 0 defers to the context
    /// window heuristic.
    pub spill_threshold: usize,
    /// Model context window in tokens, for the spill heuristic; 0
    /// disables spilling when no explicit threshold is set.
    pub context_window_tokens: usize,
    /// The cargo executable to invoke.
    pub cargo_bin: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_timeout_secs: 300,
            spill_threshold: 0,
            context_window_tokens: 0,
            cargo_bin: "cargo".to_string(),
        }
    }
}

/// Compiles and runs user programs against a fixed code-mode catalog.
pub struct Engine {
    config: EngineConfig,
    servers: Vec<CodeModeServer>,
}

impl Engine {
    /// Create an engine for the given partitioned catalog.
    pub fn new(servers: Vec<CodeModeServer>, config: EngineConfig) -> Self {
        Self { config, servers }
    }

    /// The code-mode servers this engine generates drivers for.
    pub fn servers(&self) -> &[CodeModeServer] {
        &self.servers
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute one request to completion.
    ///
    /// # Errors
    ///
    /// [`ExecError::Recoverable`] for build failures and nonzero child
    /// exits other than 3, [`ExecError::Fatal`] for driver exit 3, and
    /// [`ExecError::Infrastructure`] for failures unrelated to the
    /// user's code.
    pub async fn execute(
        &self,
        request: &ExecutionRequest,
        parent: &CancellationToken,
    ) -> Result<ExecutionOutput, ExecError> {
        let local_deps = localdeps::validate_local_deps(&request.local_deps)?;
        let ws = SandboxWorkspace::create()?;
        let content_path = ws.content_path();

        let driver_source = driver::synthesize(&self.servers, &content_path.to_string_lossy())
            .map_err(|e| ExecError::Infrastructure(format!("synthesizing driver: {e}")))?;
        ws.write(
            "Cargo.toml",
            &manifest::sandbox_manifest(&self.servers, &local_deps),
        )?;
        ws.write(&format!("src/{}", driver::DRIVER_FILE_NAME), &driver_source)?;

        let fix = imports::fix_imports(&request.code);
        let note = fix.note(driver::USER_FILE_NAME);
        if let Some(note) = &note {
            tracing::debug!(%note, "user imports auto-corrected");
        }
        ws.write(&format!("src/{}", driver::USER_FILE_NAME), &fix.source)?;

        let threshold = spill::resolve_threshold(
            self.config.spill_threshold,
            self.config.context_window_tokens,
        );

        let fetched = self.cargo_step(&ws, "fetch", parent).await?;
        if fetched.exit_code != 0 {
            return Err(ExecError::Recoverable {
                output: spill::spill_output(with_note(&note, fetched.output), threshold)?,
                exit_code: fetched.exit_code,
            });
        }

        let built = self.cargo_step(&ws, "build", parent).await?;
        if built.exit_code != 0 {
            return Err(ExecError::Recoverable {
                output: spill::spill_output(with_note(&note, built.output), threshold)?,
                exit_code: built.exit_code,
            });
        }

        let mut run = Command::new(ws.binary_path());
        run.current_dir(ws.path());
        let captured = process::run_command(
            &mut run,
            parent,
            Some(Duration::from_secs(request.timeout_secs)),
        )
        .await?;

        let mut output = with_note(&note, captured.output);
        if captured.timed_out {
            if !output.is_empty() && !output.ends_with('\n') {
                output.push('\n');
            }
            output.push_str(&format!(
                "execution timed out after {} seconds; context was canceled because executionTimeout was reached.",
                request.timeout_secs
            ));
        }

        match classify(captured.exit_code) {
            Classification::Success => {
                let blocks = match std::fs::read(&content_path) {
                    Ok(bytes) => content::parse_content_file(&bytes)?,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
                    Err(e) => {
                        return Err(ExecError::Infrastructure(format!(
                            "reading content output: {e}"
                        )));
                    }
                };
                Ok(ExecutionOutput {
                    output: spill::spill_output(output, threshold)?,
                    exit_code: captured.exit_code,
                    content: blocks,
                })
            }
            Classification::Fatal => Err(ExecError::Fatal { output }),
            Classification::Recoverable => Err(ExecError::Recoverable {
                output: spill::spill_output(output, threshold)?,
                exit_code: captured.exit_code,
            }),
        }
    }

    async fn cargo_step(
        &self,
        ws: &SandboxWorkspace,
        subcommand: &str,
        parent: &CancellationToken,
    ) -> Result<process::CapturedOutput, ExecError> {
        let mut cmd = Command::new(&self.config.cargo_bin);
        cmd.arg(subcommand)
            .current_dir(ws.path())
            .env("CARGO_TERM_COLOR", "never");
        tracing::debug!(%subcommand, "running cargo step");
        process::run_command(&mut cmd, parent, None).await
    }
}

fn with_note(note: &Option<String>, output: String) -> String {
    match note {
        Some(note) if output.is_empty() => note.clone(),
        Some(note) => format!("{note}\n\n{output}"),
        None => output,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.max_timeout_secs, 300);
        assert_eq!(config.spill_threshold, 0);
        assert_eq!(config.cargo_bin, "cargo");
    }

    #[tokio::test]
    async fn invalid_local_dep_fails_before_any_subprocess() {
        let engine = Engine::new(vec![], EngineConfig::default());
        let mut request = ExecutionRequest::new("pub async fn run() {}", 5);
        request.local_deps.push("/no/such/crate".into());

        let err = engine
            .execute(&request, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Infrastructure(_)));
    }

    #[test]
    fn note_prefixes_output() {
        let note = Some("note: imports in run.rs were auto-corrected; added: none; removed: std::fs::File".to_string());
        assert_eq!(
            with_note(&note, "error[E0599]".to_string()),
            "note: imports in run.rs were auto-corrected; added: none; removed: std::fs::File\n\nerror[E0599]"
        );
        assert_eq!(with_note(&None, "plain".to_string()), "plain");
    }
}
