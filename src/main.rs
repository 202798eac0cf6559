mod cli;
mod commands;

use clap::error::ErrorKind;
use clap::Parser;
use cli::{Cli, Operation};
use systemd_snmp_agent::{AgentConfig, Error as AgentError};

fn main() {
    if let Err(e) = run() {
        if let Some(agent_error) = e.downcast_ref::<AgentError>() {
            eprintln!("Error: {}", agent_error);
            if let Some(suggestion) = agent_error.suggestion() {
                eprintln!("\nHint: {}", suggestion);
            }
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = parse_args();

    let persist = matches!(cli.operation(), Operation::Persist);
    init_tracing(persist)?;

    let config = load_config(&cli)?;

    match cli.operation() {
        Operation::Get(oid) => commands::run_get(&config, &oid)?,
        Operation::GetNext => commands::run_getnext(&config)?,
        Operation::Set => commands::run_set(),
        Operation::Persist => {
            if let Err(e) = commands::run_persist(&config) {
                // snmpd treats our exit as transient and restarts the
                // agent on its next query; the log file is where the
                // failure context survives the restart.
                tracing::error!(error = %e, "pass_persist loop failed");
                return Err(e.into());
            }
        }
    }

    Ok(())
}

/// snmpd expects exit code 1 plus a usage message on malformed arguments;
/// clap's default usage-error exit code is 2.
fn parse_args() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            std::process::exit(0);
        }
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<AgentConfig> {
    let mut config = match &cli.config {
        Some(path) => AgentConfig::load(path)?,
        None => AgentConfig::default(),
    };

    if let Some(prefix) = &cli.prefix {
        config.oid_prefix = prefix.clone();
    }
    if let Some(path) = &cli.cache_file {
        config.cache_file = path.clone();
    }
    if let Some(path) = &cli.index_file {
        config.index_file = path.clone();
    }
    if let Some(lifetime) = &cli.cache_lifetime {
        config.cache_lifetime = lifetime.clone();
    }
    if let Some(mode) = &cli.mode {
        config.status_mode = mode.parse()?;
    }

    config.validate()?;
    Ok(config)
}

fn init_tracing(persist: bool) -> anyhow::Result<()> {
    if persist {
        // In the persist loop stdout belongs to snmpd, and stderr is
        // usually discarded by the daemon; write logs to a file.
        let log_dir = dirs::home_dir()
            .unwrap_or_else(|| std::path::PathBuf::from("."))
            .join(".sdagent")
            .join("logs");
        std::fs::create_dir_all(&log_dir)?;

        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_dir.join("persist.log"))?;

        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_writer(std::sync::Mutex::new(log_file))
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    Ok(())
}
