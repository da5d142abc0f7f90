//! Citadel daemon: entry point for validating configuration and booting
//! the protocol.

use anyhow::Context;
use citadel_node::{Protocol, ProtocolConfig};
use citadel_types::SystemClock;
use citadel_utils::format_duration;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "citadel-daemon", about = "Citadel guardian quorum and treasury protection")]
struct Cli {
    /// Override the configured log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "CITADEL_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Parse and validate a configuration file without booting.
    Check {
        /// Path to a TOML configuration file.
        #[arg(long, env = "CITADEL_CONFIG")]
        config: PathBuf,
    },
    /// Print the default configuration as TOML.
    #[command(name = "print-default-config")]
    PrintDefaultConfig,
    /// Boot the protocol from a configuration file and report its status.
    Run {
        /// Path to a TOML configuration file.
        #[arg(long, env = "CITADEL_CONFIG")]
        config: PathBuf,
    },
}

fn load(path: &PathBuf) -> anyhow::Result<ProtocolConfig> {
    let config = ProtocolConfig::from_toml_file(path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid configuration in {}", path.display()))?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Check { config } => {
            let cfg = load(&config)?;
            println!(
                "{}: ok ({} guardians, {} required approvals, {} backups, {} principals)",
                config.display(),
                cfg.guardians.len(),
                cfg.required_approvals,
                cfg.backups.len(),
                cfg.principals.len(),
            );
            println!(
                "  voting period {}, proposal cooldown {}, forensic reactivation cooldown {}",
                format_duration(cfg.governance.voting_period_secs),
                format_duration(cfg.governance.proposal_cooldown_secs),
                format_duration(cfg.forensic.reactivation_cooldown_secs),
            );
        }
        Command::PrintDefaultConfig => {
            print!("{}", ProtocolConfig::default().to_toml_string()?);
        }
        Command::Run { config } => {
            let mut cfg = load(&config)?;
            if let Some(level) = cli.log_level {
                cfg.log_level = level;
            }
            citadel_utils::init_logging(cfg.log_format, &cfg.log_level);
            tracing::info!(config = %config.display(), "starting Citadel protocol");

            let protocol = Protocol::from_config(cfg, Arc::new(SystemClock))?;
            let status = protocol.status();
            tracing::info!(
                guardians = status.active_guardians,
                required_approvals = status.required_approvals,
                required_signatures = status.required_signatures,
                backups = status.backups,
                principals = status.principals,
                "protocol ready"
            );
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}
