//! Ephemeral sandbox workspaces.
//!
//! A workspace is owned by exactly one execution: created on entry,
//! removed on every exit path when the handle drops. Only the spill
//! file, which lives outside the workspace, survives an execution.

use std::path::{Path, PathBuf};

use codemode_types::ExecError;
use tempfile::TempDir;

use codemode_gen::manifest::SANDBOX_PACKAGE_NAME;

/// Name of the content-output file inside the workspace.
const CONTENT_FILE_NAME: &str = "content.json";

/// A temporary cargo package directory for one execution.
pub(crate) struct SandboxWorkspace {
    dir: TempDir,
}

impl SandboxWorkspace {
    pub(crate) fn create() -> Result<Self, ExecError> {
        let dir = tempfile::Builder::new()
            .prefix("codemode-sandbox-")
            .tempdir()
            .map_err(|e| ExecError::Infrastructure(format!("creating workspace: {e}")))?;
        std::fs::create_dir(dir.path().join("src"))
            .map_err(|e| ExecError::Infrastructure(format!("creating workspace src dir: {e}")))?;
        Ok(Self { dir })
    }

    pub(crate) fn path(&self) -> &Path {
        self.dir.path()
    }

    pub(crate) fn content_path(&self) -> PathBuf {
        self.dir.path().join(CONTENT_FILE_NAME)
    }

    pub(crate) fn binary_path(&self) -> PathBuf {
        self.dir
            .path()
            .join("target")
            .join("debug")
            .join(SANDBOX_PACKAGE_NAME)
    }

    pub(crate) fn write(&self, rel: &str, contents: &str) -> Result<(), ExecError> {
        std::fs::write(self.dir.path().join(rel), contents)
            .map_err(|e| ExecError::Infrastructure(format!("writing {rel}: {e}")))
    }
}
