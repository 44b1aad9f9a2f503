#![deny(missing_docs)]
//! Sandboxed build-and-run engine for codemode.
//!
//! Takes one user-supplied `run` module, synthesizes the matching
//! driver and manifest, and shepherds the result through `cargo fetch`,
//! `cargo build`, and a deadline-bounded run with SIGINT-then-SIGKILL
//! termination. Outcomes are classified by the driver exit-code
//! contract, oversized output spills to a sidecar file, and the
//! `execute_rust_code` adapter exposes the whole pipeline as a tool.

pub mod classify;
pub mod content;
pub mod engine;
pub mod imports;
pub mod process;
pub mod spill;
pub mod tool;

mod localdeps;
mod workspace;

pub use classify::{Classification, classify};
pub use engine::{Engine, EngineConfig};
pub use tool::{ExecuteCodeTool, toolchain_version};
