//! Executor abstraction for administrative commands.
//!
//! The [`Executor`] trait is the only way the crate touches the host:
//! - [`ShellExecutor`] runs command lines through the system shell
//! - [`MockExecutor`] simulates an IIS host in memory for tests
//!
//! # Testing
//!
//! ```
//! use iiskit::backend::{Executor, MockExecutor};
//!
//! let host = MockExecutor::new().with_pool("DefaultAppPool", "v4.0");
//! let xml = host.execute("appcmd list apppool /xml").unwrap();
//! assert!(xml.contains("DefaultAppPool"));
//! assert_eq!(host.commands(), vec!["appcmd list apppool /xml"]);
//! ```

pub mod mock;
pub mod shell;

pub use mock::MockExecutor;
pub use shell::ShellExecutor;

use crate::error::Result;

/// Runs a command line and returns its captured output.
///
/// Implementations report an error only when the command could not be run
/// at all. A command that ran and failed still returns its output: whether
/// a change took effect is decided by re-querying the inventory, never by
/// exit status.
pub trait Executor: Send + Sync {
    /// Run one command line.
    fn execute(&self, command_line: &str) -> Result<String>;
}

/// Get the default executor (the system shell).
pub fn default_executor() -> ShellExecutor {
    ShellExecutor::new()
}
