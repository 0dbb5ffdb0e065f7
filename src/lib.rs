// Library surface for headless/integration tests and reuse.
// Terminal rendering stays in the binary.
pub mod app_dirs;
pub mod config;
pub mod corpus;
pub mod drill;
pub mod error;
pub mod language;
pub mod practice;
pub mod runtime;
pub mod session;
pub mod stats;
