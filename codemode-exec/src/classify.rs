//! Exit-code classification for sandboxed children.
//!
//! The contract with the generated driver:
//! `0` success, `1` the user's `run` returned an error, `2` an uncaught
//! fault, `3` a driver-initiated fatal. Anything else — including the
//! negative codes we synthesize for signal deaths — is recoverable.

/// What an exit code means for the invoking agent turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The program completed; its output and content are valid.
    Success,
    /// The model sees the output and may adapt.
    Recoverable,
    /// Driver setup failed; the turn aborts.
    Fatal,
}

/// Classify a child exit code. Pure function.
pub fn classify(exit_code: i32) -> Classification {
    match exit_code {
        0 => Classification::Success,
        3 => Classification::Fatal,
        _ => Classification::Recoverable,
    }
}
