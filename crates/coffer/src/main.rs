// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Coffer - a local secrets vault.
//!
//! This is the binary entry point. Every subcommand loads configuration,
//! opens the account database, runs one vault operation and exits.

mod commands;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Coffer - a local secrets vault with password-gated visibility groups.
#[derive(Parser, Debug)]
#[command(name = "coffer", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Backend kinds accepted by `add-config`.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum BackendKind {
    Sqlite,
    Memory,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Register a new user. Reads the password from COFFER_PASSWORD or a prompt.
    SignUp {
        #[arg(long)]
        username: String,
    },
    /// Create a visibility group. Reads its password from COFFER_GROUP_PASSWORD or a prompt.
    CreateGroup {
        #[arg(long)]
        username: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Add a data storage config, optionally inside a visibility group.
    AddConfig {
        #[arg(long)]
        username: String,
        #[arg(long)]
        name: String,
        /// Name of the visibility group to place the config in.
        #[arg(long)]
        group: Option<String>,
        #[arg(long, value_enum, default_value_t = BackendKind::Sqlite)]
        backend: BackendKind,
        /// Database file for the sqlite backend.
        #[arg(long, required_if_eq("backend", "sqlite"))]
        path: Option<String>,
    },
    /// List the data storage configs available to a user.
    ListConfigs {
        #[arg(long)]
        username: String,
        /// Also open visibility groups matching COFFER_GROUP_PASSWORD.
        #[arg(long)]
        open_group: bool,
        /// Output JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Show the database location, user count and KDF parameters.
    Status {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => coffer_config::load_and_validate_path(path),
        None => coffer_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            coffer_config::render_errors(&errors);
            std::process::exit(1);
        }
    };
    init_tracing(&config.log.level);

    let result = match cli.command {
        Commands::SignUp { username } => commands::run_sign_up(&config, &username).await,
        Commands::CreateGroup {
            username,
            name,
            description,
        } => commands::run_create_group(&config, &username, &name, &description).await,
        Commands::AddConfig {
            username,
            name,
            group,
            backend,
            path,
        } => {
            let backend = match (backend, path) {
                (BackendKind::Sqlite, Some(path)) => coffer_core::DataStorageBackend::Sqlite { path },
                (BackendKind::Sqlite, None) => {
                    eprintln!("error: --path is required for the sqlite backend");
                    std::process::exit(2);
                }
                (BackendKind::Memory, _) => coffer_core::DataStorageBackend::Memory,
            };
            commands::run_add_config(&config, &username, &name, group.as_deref(), backend).await
        }
        Commands::ListConfigs {
            username,
            open_group,
            json,
        } => commands::run_list_configs(&config, &username, open_group, json).await,
        Commands::Status { json } => status::run_status(&config, json).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber with the given log level, writing to stderr.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "coffer={log_level},coffer_vault={log_level},coffer_storage={log_level},warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn add_config_requires_path_for_sqlite() {
        let parsed = Cli::try_parse_from(["coffer", "add-config", "--username", "a", "--name", "n"]);
        assert!(parsed.is_err());
        let parsed = Cli::try_parse_from([
            "coffer",
            "add-config",
            "--username",
            "a",
            "--name",
            "n",
            "--backend",
            "memory",
        ]);
        assert!(parsed.is_ok());
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = coffer_config::load_and_validate_str("").expect("default config should be valid");
        assert_eq!(config.vault.salt_len, 16);
    }
}
