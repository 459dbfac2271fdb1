//! Sandbox error types

use thiserror::Error;

/// Error type a [`crate::ModuleHost`] reports from `require`. It crosses
/// script frames as a thrown `Error` and is handed back unchanged when no
/// script code catches it.
pub type HostError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum SandboxError {
    /// The code handed to `evaluate` did not parse as a script. ES module
    /// syntax lands here too.
    #[error("syntax error in {label}: {message}")]
    Syntax { label: String, message: String },

    /// A script exception nobody caught, rendered as `Name: message`.
    #[error("uncaught exception in {label}: {message}")]
    Uncaught { label: String, message: String },

    /// A `require` failure from the host that escaped every script frame.
    #[error("{0}")]
    Host(HostError),

    /// The capabilities could not be installed into a fresh realm.
    #[error("failed to set up sandbox context: {message}")]
    Setup { message: String },
}
