//! sigmaker-core
//!
//! Core library for deriving unique byte signatures from native binaries.
//!
//! This crate defines the signature model, the operand-aware synthesis loop,
//! the uniqueness oracle, output formatting, xref aggregation, and backend
//! adapters for the disassembly engines that feed them.
//!
//! The goal is to keep all substantive logic here so it is fully testable and
//! reusable from multiple frontends (CLI, scripting bindings, etc.).

pub mod format;
pub mod image;
pub mod model;
pub mod services;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
