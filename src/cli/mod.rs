//! CLI module for the Rewardz command-line interface.
//!
//! Subcommands:
//! - `serve` - Start the admin server (also the default with no subcommand)
//! - `config check` - Validate configuration file
//! - `create-staff` - Create a staff account in the local database

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::api::validation::{validate_email, validate_password, validate_username};
use crate::config::Config;
use crate::students::{create_account, CreateStudent};

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "rewardz")]
#[command(author, version, about = "Staff admin service for book rentals", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "REWARDZ_CONFIG", default_value = "rewardz.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Subcommand to run (if none, starts the server)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Whether this invocation runs the HTTP server
    pub fn serves(&self) -> bool {
        matches!(self.command, None | Some(Commands::Serve))
    }
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the admin server
    Serve,

    /// Configuration management commands
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Create a staff account
    CreateStaff {
        #[arg(long)]
        username: String,
        #[arg(long, default_value = "")]
        email: String,
        /// Password (prefer the environment variable over the command line)
        #[arg(long, env = "REWARDZ_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration file
    Check,
}

/// Run a CLI command
pub async fn run_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Some(Commands::Config(ConfigCommands::Check)) => cmd_config_check(cli),
        Some(Commands::CreateStaff {
            username,
            email,
            password,
        }) => cmd_create_staff(cli, username, email, password).await,
        // Serving is handled in main.rs
        Some(Commands::Serve) | None => Ok(()),
    }
}

fn enabled(flag: bool) -> &'static str {
    if flag {
        "Enabled"
    } else {
        "Disabled"
    }
}

/// Validate the configuration file and print a summary
fn cmd_config_check(cli: &Cli) -> Result<()> {
    let config_path = &cli.config;

    println!("Checking configuration file: {}", config_path.display());
    println!();

    if !config_path.exists() {
        println!(
            "[!!] Configuration file not found: {}",
            config_path.display()
        );
        println!();
        println!("A default configuration will be used when starting the server.");
        println!("To create a custom configuration, copy rewardz.example.toml to rewardz.toml");
        return Ok(());
    }

    match Config::load(config_path) {
        Ok(config) => {
            println!("[OK] Configuration file is valid!");
            println!();
            println!("=== Configuration Summary ===");
            println!();
            println!("Server:");
            println!("  Host:         {}", config.server.host);
            println!("  Port:         {}", config.server.port);
            println!("  Data Dir:     {}", config.server.data_dir.display());
            println!();
            println!("Book lookup:");
            println!("  Status:       {}", enabled(config.lookup.enabled));
            println!("  Base URL:     {}", config.lookup.base_url);
            println!("  Timeout:      {}s", config.lookup.timeout_secs);
            println!();
            println!("Rentals:");
            println!(
                "  Extension pricing: {}",
                if config.rentals.snapshot_page_count {
                    "page count at rental creation"
                } else {
                    "current page count"
                }
            );
            println!();

            let mut warnings = Vec::new();

            if config.auth.admin_username.is_some() != config.auth.admin_password.is_some() {
                warnings.push("auth.admin_username and auth.admin_password must be set together");
            }
            if !config.auth.secure_cookies {
                warnings.push("Session cookies are not marked Secure - enable behind HTTPS");
            }
            if config.auth.session_ttl_days <= 0 {
                warnings.push(
                    "auth.session_ttl_days must be positive - logins will expire at once",
                );
            }

            if !warnings.is_empty() {
                println!("Warnings:");
                for warning in warnings {
                    println!("  [!] {}", warning);
                }
                println!();
            }

            Ok(())
        }
        Err(e) => {
            println!("[!!] Configuration file is invalid!");
            println!();
            println!("Error: {:#}", e);
            println!();
            println!("Please check the configuration file syntax and try again.");
            anyhow::bail!("Invalid configuration file");
        }
    }
}

/// Create a staff account directly in the database
async fn cmd_create_staff(cli: &Cli, username: &str, email: &str, password: &str) -> Result<()> {
    let request = CreateStudent {
        username: username.trim().to_string(),
        email: email.trim().to_string(),
        password: password.trim().to_string(),
    };

    validate_username(&request.username).map_err(anyhow::Error::msg)?;
    validate_email(&request.email).map_err(anyhow::Error::msg)?;
    validate_password(&request.password).map_err(anyhow::Error::msg)?;

    let config = Config::load(&cli.config)?;
    std::fs::create_dir_all(&config.server.data_dir).with_context(|| {
        format!(
            "Failed to create data directory {}",
            config.server.data_dir.display()
        )
    })?;
    let db = crate::db::init(&config.server.data_dir).await?;

    let user = create_account(&db, &request, true)
        .await
        .context("Failed to create staff account")?;

    println!("[OK] Created staff account '{}' (id {})", user.username, user.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_invocation_serves() {
        let cli = Cli::try_parse_from(["rewardz"]).unwrap();
        assert!(cli.serves());
        assert_eq!(cli.config, PathBuf::from("rewardz.toml"));

        let cli = Cli::try_parse_from(["rewardz", "--config", "other.toml", "serve"]).unwrap();
        assert!(cli.serves());
        assert_eq!(cli.config, PathBuf::from("other.toml"));
    }

    #[test]
    fn test_subcommands_parse() {
        let cli = Cli::try_parse_from(["rewardz", "config", "check"]).unwrap();
        assert!(!cli.serves());
        assert!(matches!(
            cli.command,
            Some(Commands::Config(ConfigCommands::Check))
        ));

        let cli = Cli::try_parse_from([
            "rewardz",
            "create-staff",
            "--username",
            "admin",
            "--password",
            "pw",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::CreateStaff {
                username,
                email,
                password,
            }) => {
                assert_eq!(username, "admin");
                assert_eq!(email, "");
                assert_eq!(password, "pw");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
