//! Tollgate - authenticated HTTP gateway CLI
//!
#![doc = "Tollgate - authenticated HTTP gateway CLI"]
#![doc = "Main entry point for the Tollgate application."]

use anyhow::Result;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tollgate::cli::{ClientCommand, Cli, Commands};
use tollgate::commands;
use tollgate::config::Config;
use tollgate::gateway::Gateway;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose, cli.json_logs);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/tollgate.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    let gateway = Gateway::from_config(&config)?;

    // Execute command
    match cli.command {
        Commands::Login {
            username,
            password,
            guid,
        } => {
            tracing::info!("Logging in as {}", username);
            commands::session::login(&gateway, &username, &password, guid).await?;
        }
        Commands::Logout => commands::session::logout(&gateway)?,
        Commands::Refresh => commands::session::refresh(&gateway).await?,
        Commands::Status => commands::session::status(&gateway)?,
        Commands::ForgotPassword { username } => {
            commands::session::forgot_password(&gateway, &username).await?
        }
        Commands::Client { command } => match command {
            ClientCommand::Set { json } => commands::client::set(&gateway, &json)?,
            ClientCommand::Show { key } => commands::client::show(&gateway, key.as_deref())?,
            ClientCommand::Clear => commands::client::clear(&gateway)?,
        },
        Commands::Identity => commands::client::identity(&gateway).await?,
        Commands::Request {
            method,
            path,
            params,
            data,
        } => {
            tracing::debug!("Sending {} {}", method, path);
            commands::request::run(&gateway, &method, &path, &params, data.as_deref()).await?;
        }
    }

    Ok(())
}

/// Logs go to stderr so command output on stdout stays parseable.
fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "tollgate=debug" } else { "tollgate=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
