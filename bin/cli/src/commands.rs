//! Command dispatch.

use crate::cli::{Cli, Command};
use crate::error::CliError;
use rootcause::prelude::Report;
use scholarhub_guard::{GuardOutcome, RouteGate, RouteOutcome, dashboard_menu};
use scholarhub_session::{
    AuthFlows, ClientConfig, HistoryNavigator, IdentityConfig, IdentityProvider,
    IdentityToolkitProvider, MemoryIdentityProvider, ProviderKind, Registration, SessionContext,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Runs one command against a fresh session.
pub async fn run(cli: Cli) -> Result<(), Report<CliError>> {
    let config = ClientConfig::load(cli.config.as_deref()).map_err(|e| CliError::Config {
        details: e.to_string(),
    })?;

    // The in-memory provider starts empty; seed it with the given account
    // unless the command is about to create it.
    let seed = match cli.command {
        Command::SignUp { .. } => None,
        _ => cli.credentials(),
    };
    let provider = build_provider(config.identity(), config.request_timeout(), seed)?;

    let context = SessionContext::start(&config, provider, Arc::new(HistoryNavigator::default()))
        .map_err(|e| CliError::Startup {
            details: e.to_string(),
        })?;
    let settled = context.store().wait_settled().await;
    debug!(phase = ?settled.phase(), "session settled");
    let flows = context.flows();

    match &cli.command {
        Command::Visit { path } => {
            if let Some((email, password)) = cli.credentials() {
                sign_in(&flows, email, password).await?;
            }
            let outcome = RouteGate::from_context(&context).settle(path).await;
            println!("{}", describe(path, &outcome));
        }
        Command::Menu => {
            let (email, password) = cli
                .credentials()
                .ok_or(CliError::CredentialsRequired { command: "menu" })?;
            sign_in(&flows, email, password).await?;

            let role = RouteGate::from_context(&context).current_role().await;
            println!("{role} dashboard");
            for item in dashboard_menu(role.role()) {
                println!("  {:<22} {}", item.label, item.path);
            }
        }
        Command::SignUp { name, photo_url } => {
            let (email, password) = cli
                .credentials()
                .ok_or(CliError::CredentialsRequired { command: "sign-up" })?;
            let registration = Registration {
                name: name.clone(),
                email: email.to_string(),
                password: password.to_string(),
                photo_url: photo_url.clone(),
            };
            let identity = flows
                .register(&registration, None)
                .await
                .map_err(CliError::from)?;
            println!("Registered {}", identity.label());
        }
        Command::ResetPassword { email } => {
            flows.reset_password(email).await.map_err(CliError::from)?;
            println!("Password reset email sent to {email}");
        }
    }

    Ok(())
}

async fn sign_in(flows: &AuthFlows, email: &str, password: &str) -> Result<(), Report<CliError>> {
    let identity = flows
        .sign_in(email, password, None)
        .await
        .map_err(CliError::from)?;
    info!(uid = %identity.uid(), "signed in");
    Ok(())
}

fn build_provider(
    identity: &IdentityConfig,
    timeout: Duration,
    seed: Option<(&str, &str)>,
) -> Result<Arc<dyn IdentityProvider>, Report<CliError>> {
    match identity.provider() {
        ProviderKind::Memory => {
            let provider = match seed {
                Some((email, password)) => MemoryIdentityProvider::new().with_account(email, password),
                None => MemoryIdentityProvider::new(),
            };
            Ok(Arc::new(provider))
        }
        ProviderKind::IdentityToolkit => {
            let api_key = identity.api_key().ok_or_else(|| CliError::Provider {
                details: "identity.api_key is not set".to_string(),
            })?;
            let provider = IdentityToolkitProvider::new(identity.endpoint(), api_key, timeout)
                .map_err(|e| CliError::Provider {
                    details: e.to_string(),
                })?;
            Ok(Arc::new(provider))
        }
    }
}

/// Renders a route outcome for the terminal.
fn describe(path: &str, outcome: &RouteOutcome) -> String {
    let RouteOutcome::Page { page, guard, .. } = outcome else {
        return format!("{path}: page not found");
    };
    match guard {
        GuardOutcome::Render => format!("{path}: renders {page}"),
        GuardOutcome::Waiting => format!("{path}: still loading"),
        GuardOutcome::Redirect(location) => format!("{path}: redirected to {}", location.path()),
        GuardOutcome::Forbidden(view) => {
            let actions: Vec<_> = view
                .actions()
                .iter()
                .map(|action| format!("[{}]", action.label()))
                .collect();
            format!(
                "{path}: {view}\n  {}\n  {}",
                view.message(),
                actions.join(" ")
            )
        }
    }
}
