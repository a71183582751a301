//! Error types for IIS provisioning.
//!
//! The variants separate the failure modes of a text-parsing boundary:
//! an inventory that could not be read is not the same thing as a resource
//! that is absent, and a create that ran but left nothing behind is not the
//! same thing as a create that was never attempted.

use crate::types::ResourceType;
use thiserror::Error;

/// Categories of provisioning errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The inventory could not be queried or parsed
    Inventory,
    /// A create or update ran but its effect was not observed
    NotObserved,
    /// The desired configuration is invalid
    Input,
    /// The external command could not be run
    Command,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Inventory => "Could not read the current IIS inventory",
            Self::NotObserved => "Change was not observed after running the command",
            Self::Input => "Invalid desired configuration",
            Self::Command => "Administrative command could not be run",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Inventory => {
                "Run from an elevated prompt and check that appcmd.exe is available"
            }
            Self::NotObserved => "Check the captured command output for the reason appcmd gave",
            Self::Input => "Fix the target definition and try again",
            Self::Command => "Check that the appcmd path is correct and the shell can start",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur while provisioning IIS resources.
#[derive(Debug, Error)]
pub enum Error {
    /// The `list <type> /xml` output could not be turned into an inventory
    #[error("could not query {resource_type} inventory: {message}")]
    InventoryQuery {
        /// Resource type that was being listed
        resource_type: ResourceType,
        /// Why the output was unusable
        message: String,
    },

    /// A create or update command ran, but the re-query did not find the resource
    #[error("{resource_type} '{name}' was not found after running the command")]
    CreationNotObserved {
        /// Resource type that was being created
        resource_type: ResourceType,
        /// Name or path that was looked up
        name: String,
        /// Captured output of the command that should have created it
        output: String,
    },

    /// A binding string is not in a recognized shape
    #[error("malformed binding '{binding}': {reason}")]
    MalformedBinding {
        /// The binding string as given
        binding: String,
        /// What is wrong with it
        reason: String,
    },

    /// A value cannot be placed on an appcmd command line safely
    #[error("invalid {field} '{value}': {reason}")]
    InvalidArgument {
        /// Which configuration field the value came from
        field: &'static str,
        /// The rejected value
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// The command executor could not run the command
    #[error("command failed: {message}")]
    CommandFailed {
        /// The command line that was being run
        command: String,
        /// Description of the failure
        message: String,
    },

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InventoryQuery { .. } | Error::Xml(_) => ErrorCategory::Inventory,
            Error::CreationNotObserved { .. } => ErrorCategory::NotObserved,
            Error::MalformedBinding { .. } | Error::InvalidArgument { .. } => {
                ErrorCategory::Input
            }
            Error::CommandFailed { .. } | Error::Io(_) => ErrorCategory::Command,
            Error::Other(_) => ErrorCategory::Other,
        }
    }

    /// Captured command output attached to this error, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            Error::CreationNotObserved { output, .. } => Some(output.as_str()),
            _ => None,
        }
    }

    pub(crate) fn invalid(field: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed_binding(binding: &str, reason: impl Into<String>) -> Self {
        Error::MalformedBinding {
            binding: binding.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for provisioning operations.
pub type Result<T> = std::result::Result<T, Error>;
