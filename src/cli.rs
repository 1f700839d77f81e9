//! Command-line interface definition for Tollgate
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for the token lifecycle, client context, identity,
//! and ad-hoc requests through the authenticated pipeline.

use clap::{Parser, Subcommand};

use crate::config::StorageBackend;

/// Tollgate - authenticated HTTP gateway CLI
///
/// Log in against the auth server, keep the token fresh, and send requests
/// through the versioning, client-id, and 401-refresh pipeline.
#[derive(Parser, Debug, Clone)]
#[command(name = "tollgate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config/tollgate.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Override the API base URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Override the auth server base URL
    #[arg(long, global = true)]
    pub auth_url: Option<String>,

    /// Override the token storage backend
    #[arg(long, global = true, value_enum)]
    pub storage: Option<StorageBackend>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Tollgate
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Log in and store the issued token
    Login {
        /// Account name
        #[arg(short, long)]
        username: String,

        /// Account password (prefer the environment variable)
        #[arg(short, long, env = "TOLLGATE_PASSWORD", hide_env_values = true)]
        password: String,

        /// Device identifier sent with the credentials; random when omitted
        #[arg(short, long)]
        guid: Option<String>,
    },

    /// Clear the client context and delete the stored token
    Logout,

    /// Exchange the refresh token for a new access token
    Refresh,

    /// Show the stored token's expiry and the active client
    Status,

    /// Manage the active client context
    Client {
        /// Client subcommand
        #[command(subcommand)]
        command: ClientCommand,
    },

    /// Print the logged-in user's identity claims
    Identity,

    /// Start the password-reset flow
    ForgotPassword {
        /// Account name
        #[arg(short, long)]
        username: String,
    },

    /// Send a request through the authenticated pipeline
    Request {
        /// HTTP method (GET, POST, PUT, DELETE)
        method: String,

        /// Unversioned API path, e.g. /api/widgets
        path: String,

        /// Query parameter as key=value (repeatable)
        #[arg(short, long = "param")]
        params: Vec<String>,

        /// JSON request body
        #[arg(short, long)]
        data: Option<String>,
    },
}

/// Client context subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ClientCommand {
    /// Store the client context from a JSON object
    Set {
        /// JSON object, e.g. '{"id": 12, "name": "Acme"}'
        json: String,
    },

    /// Print the client context, or one field of it
    Show {
        /// Field name
        #[arg(short, long)]
        key: Option<String>,
    },

    /// Remove the client context
    Clear,
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_login() {
        let cli = Cli::try_parse_from([
            "tollgate", "login", "--username", "alice", "--password", "pw",
        ])
        .unwrap();
        if let Commands::Login {
            username,
            password,
            guid,
        } = cli.command
        {
            assert_eq!(username, "alice");
            assert_eq!(password, "pw");
            assert_eq!(guid, None);
        } else {
            panic!("Expected Login command");
        }
    }

    #[test]
    fn test_cli_parse_global_overrides_after_subcommand() {
        let cli = Cli::try_parse_from([
            "tollgate",
            "status",
            "--storage",
            "memory",
            "--api-url",
            "http://api.test",
        ])
        .unwrap();
        assert_eq!(cli.storage, Some(StorageBackend::Memory));
        assert_eq!(cli.api_url.as_deref(), Some("http://api.test"));
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn test_cli_parse_invalid_storage() {
        let cli = Cli::try_parse_from(["tollgate", "--storage", "sqlite", "status"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_cli_parse_request_with_params_and_data() {
        let cli = Cli::try_parse_from([
            "tollgate",
            "request",
            "POST",
            "/api/widgets",
            "--param",
            "page=2",
            "-p",
            "size=10",
            "--data",
            r#"{"name":"w"}"#,
        ])
        .unwrap();
        if let Commands::Request {
            method,
            path,
            params,
            data,
        } = cli.command
        {
            assert_eq!(method, "POST");
            assert_eq!(path, "/api/widgets");
            assert_eq!(params, vec!["page=2", "size=10"]);
            assert_eq!(data.as_deref(), Some(r#"{"name":"w"}"#));
        } else {
            panic!("Expected Request command");
        }
    }

    #[test]
    fn test_cli_parse_client_show_key() {
        let cli = Cli::try_parse_from(["tollgate", "client", "show", "--key", "id"]).unwrap();
        if let Commands::Client {
            command: ClientCommand::Show { key },
        } = cli.command
        {
            assert_eq!(key.as_deref(), Some("id"));
        } else {
            panic!("Expected Client Show command");
        }
    }

    #[test]
    fn test_cli_parse_with_verbose() {
        let cli = Cli::try_parse_from(["tollgate", "-v", "logout"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn test_cli_parse_missing_command() {
        let cli = Cli::try_parse_from(["tollgate"]);
        assert!(cli.is_err());
    }
}
