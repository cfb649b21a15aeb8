// Document loading and config cascade, shared with integration tests
pub mod loader;

// Re-export CLI types and functions for testing
pub mod cli;
pub use cli::{Cli, Commands, run_with_cli};
