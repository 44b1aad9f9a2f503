//! Large-output spill: replace oversized output with a preview summary
//! and write the full text to a sidecar file.
//!
//! All counts are code points, not bytes: the threshold comparison, the
//! reported total, and the preview slice.

use std::io::Write as _;

use codemode_types::ExecError;

/// Resolve the effective spill threshold.
///
/// An explicit value wins when positive; otherwise 20% of the context
/// window at 4 characters per token; otherwise zero (spill disabled).
pub fn resolve_threshold(explicit: usize, context_window_tokens: usize) -> usize {
    if explicit > 0 {
        explicit
    } else {
        context_window_tokens * 4 / 5
    }
}

/// Apply the spill policy to `output`.
///
/// Returns the output unchanged when it fits (or spill is disabled).
/// Otherwise writes the full output to a persistent sidecar file outside
/// any workspace and returns the fixed-shape summary.
pub fn spill_output(output: String, threshold: usize) -> Result<String, ExecError> {
    if threshold == 0 {
        return Ok(output);
    }
    let total = output.chars().count();
    if total <= threshold {
        return Ok(output);
    }

    let mut file = tempfile::Builder::new()
        .prefix("codemode-output-")
        .suffix(".txt")
        .tempfile()
        .map_err(|e| ExecError::Infrastructure(format!("creating spill file: {e}")))?;
    file.write_all(output.as_bytes())
        .map_err(|e| ExecError::Infrastructure(format!("writing spill file: {e}")))?;
    let (_, path) = file
        .keep()
        .map_err(|e| ExecError::Infrastructure(format!("persisting spill file: {e}")))?;

    let preview: String = output.chars().take(threshold).collect();
    Ok(format!(
        "[output truncated: {total} characters total; showing first {threshold}]\n{preview}\n\nfull output at: {}",
        path.display()
    ))
}
