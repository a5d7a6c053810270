//! Error types for the command-line client.

use scholarhub_session::AuthError;
use std::fmt;

/// Errors that end a command.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded.
    Config { details: String },
    /// The identity provider is misconfigured.
    Provider { details: String },
    /// The session context could not be started.
    Startup { details: String },
    /// The command needs `--email` and `--password`.
    CredentialsRequired { command: &'static str },
    /// The identity provider rejected an operation.
    Auth(AuthError),
    /// Interrupted by the user.
    Interrupted,
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "failed to load configuration: {details}"),
            Self::Provider { details } => write!(f, "identity provider unavailable: {details}"),
            Self::Startup { details } => write!(f, "failed to start session: {details}"),
            Self::CredentialsRequired { command } => {
                write!(f, "'{command}' requires --email and --password")
            }
            Self::Auth(e) => write!(f, "{}", e.user_message()),
            Self::Interrupted => write!(f, "interrupted"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<AuthError> for CliError {
    fn from(e: AuthError) -> Self {
        Self::Auth(e)
    }
}
