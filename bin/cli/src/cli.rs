//! Command-line arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "scholarhub")]
#[command(version)]
#[command(about = "Headless scholarhub client: sign in, check routes, inspect roles")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (TOML); SCHOLARHUB__* environment variables override it
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Account email to sign in with before running the command
    #[arg(long, global = true)]
    pub email: Option<String>,

    /// Account password
    #[arg(long, global = true)]
    pub password: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Shows what a route renders for the signed-in (or anonymous) user
    Visit {
        /// Route path, e.g. /dashboard/manage-users
        path: String,
    },
    /// Lists the dashboard menu for the signed-in user's role
    Menu,
    /// Registers a new account with --email and --password
    SignUp {
        /// Display name
        #[arg(long)]
        name: String,
        /// Profile photo URL
        #[arg(long)]
        photo_url: Option<String>,
    },
    /// Sends a password-reset email
    ResetPassword {
        /// Account email
        email: String,
    },
}

impl Cli {
    /// Returns the credentials if both were given.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.email.as_deref()?, self.password.as_deref()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_visit_with_global_credentials() {
        let cli = Cli::try_parse_from([
            "scholarhub",
            "visit",
            "/dashboard",
            "--email",
            "ada@example.com",
            "--password",
            "pw1234",
        ])
        .expect("parse");

        assert!(matches!(cli.command, Command::Visit { ref path } if path == "/dashboard"));
        assert_eq!(cli.credentials(), Some(("ada@example.com", "pw1234")));
    }

    #[test]
    fn sign_up_requires_name() {
        assert!(Cli::try_parse_from(["scholarhub", "sign-up"]).is_err());
        let cli = Cli::try_parse_from(["scholarhub", "sign-up", "--name", "Ada"]).expect("parse");
        assert!(matches!(cli.command, Command::SignUp { ref name, photo_url: None } if name == "Ada"));
    }

    #[test]
    fn verify_command() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
