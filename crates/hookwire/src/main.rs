// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hookwire - multi-tenant messaging-to-webhook gateway.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod tenant;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use hookwire_config::{ConfigError, HookwireConfig};

/// Hookwire - multi-tenant messaging-to-webhook gateway.
#[derive(Parser, Debug)]
#[command(name = "hookwire", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the gateway server.
    Serve,
    /// Manage tenants.
    Tenant {
        #[command(subcommand)]
        action: TenantCommands,
    },
}

#[derive(Subcommand, Debug)]
enum TenantCommands {
    /// Provision a tenant with an API token.
    Add(tenant::AddArgs),
}

fn load_config(path: Option<&std::path::Path>) -> Result<HookwireConfig, Vec<ConfigError>> {
    match path {
        Some(path) => hookwire_config::load_and_validate_path(path),
        None => hookwire_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            hookwire_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Tenant {
            action: TenantCommands::Add(args),
        }) => tenant::run_add(config, args).await,
        None => {
            println!("hookwire: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_loads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hookwire.toml");
        std::fs::write(&path, "[server]\nport = 9090\n").unwrap();

        let config = load_config(Some(path.as_path())).expect("config should be valid");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.session.connect_wait_secs, 10);
    }

    #[test]
    fn invalid_config_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hookwire.toml");
        std::fs::write(&path, "[server]\nprot = 9090\n").unwrap();

        let errors = load_config(Some(path.as_path())).expect_err("typo should fail");
        assert!(errors[0].to_string().contains("prot"));
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["hookwire", "serve", "--config", "/tmp/h.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/h.toml")));
        assert!(matches!(cli.command, Some(Commands::Serve)));
    }

    #[test]
    fn tenant_add_parses_arguments() {
        let cli = Cli::try_parse_from([
            "hookwire", "tenant", "add", "--name", "acme", "--token", "abc", "--events",
            "Message,ReadReceipt",
        ])
        .unwrap();
        let Some(Commands::Tenant {
            action: TenantCommands::Add(args),
        }) = cli.command
        else {
            panic!("expected tenant add");
        };
        assert_eq!(args.name, "acme");
        assert_eq!(args.token, "abc");
        assert_eq!(args.events, vec!["Message", "ReadReceipt"]);
        assert_eq!(args.webhook, None);
    }
}
