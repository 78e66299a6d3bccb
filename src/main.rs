//! sktop - live terminal dashboard for your Slurm jobs

mod engine;
mod formatting;
mod gateway;
mod models;
mod slurm;
mod tui;

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gateway::SchedulerGateway;
use models::{AppConfig, MAX_REFRESH_INTERVAL, MIN_REFRESH_INTERVAL, is_valid_refresh_interval};
use slurm::SlurmGateway;

#[derive(Parser, Debug)]
#[command(name = "sktop")]
#[command(about = "Live terminal dashboard for your Slurm jobs", long_about = None)]
#[command(version)]
struct Cli {
    /// Poll interval in seconds (0.1 to 86400)
    #[arg(short, long, value_name = "SECONDS", value_parser = parse_refresh)]
    refresh: Option<f64>,

    /// Show jobs of this user instead of the current one
    #[arg(short, long)]
    user: Option<String>,

    /// Read configuration from this file instead of the default locations
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn parse_refresh(value: &str) -> Result<f64, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    if !is_valid_refresh_interval(secs) {
        return Err(format!(
            "must be between {} and {} seconds",
            MIN_REFRESH_INTERVAL, MAX_REFRESH_INTERVAL
        ));
    }
    Ok(secs)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = init_logging();

    let (mut config, config_warnings) =
        AppConfig::load(cli.config.as_deref()).map_err(anyhow::Error::msg)?;
    for warning in &config_warnings {
        warn!("config: {}", warning);
    }
    if let Some(secs) = cli.refresh {
        config.refresh.interval_secs = secs;
    }

    let username = resolve_user(cli.user)?;

    let gateway = SlurmGateway::new(&config.system, config.behavior.log_tail_lines);
    if let Err(e) = gateway.check_connection() {
        eprintln!("Error: Unable to reach Slurm: {}", e);
        eprintln!(
            "Make sure squeue/scancel/scontrol are in {} or on PATH.",
            gateway.bin_path().display()
        );
        std::process::exit(1);
    }

    info!(
        user = %username,
        log = ?log_path,
        slurm = %gateway.bin_path().display(),
        "sktop starting"
    );

    tui::run(tui::Session {
        config,
        config_warnings,
        username,
        gateway: Arc::new(gateway),
    })
}

/// `--user`, else `$USER`, else `$LOGNAME`
fn resolve_user(explicit: Option<String>) -> Result<String> {
    let env_user = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
    match explicit.or_else(|| env_user("USER")).or_else(|| env_user("LOGNAME")) {
        Some(user) => Ok(user),
        None => bail!("Cannot determine the current user; pass --user <name>"),
    }
}

/// Where the log file goes: `$XDG_STATE_HOME/sktop/sktop.log`, falling back to
/// the platform state or cache directory
fn log_file_path() -> Option<PathBuf> {
    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME")
        && !xdg_state.is_empty()
    {
        return Some(PathBuf::from(xdg_state).join("sktop/sktop.log"));
    }
    dirs::state_dir()
        .or_else(dirs::cache_dir)
        .map(|dir| dir.join("sktop/sktop.log"))
}

/// File logging filtered by `SKTOP_LOG` (default `warn`). The terminal belongs
/// to the TUI, so nothing is ever written to stdout or stderr. Failing to set
/// up the log file only disables logging.
fn init_logging() -> Option<PathBuf> {
    let filter = EnvFilter::try_from_env("SKTOP_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    let opened = log_file_path().and_then(|path| {
        let file = open_log_file(&path).ok()?;
        Some((path, file))
    });

    match opened {
        Some((path, file)) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .try_init();
            Some(path)
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::sink)
                .try_init();
            None
        }
    }
}

fn open_log_file(path: &std::path::Path) -> Result<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_refresh() {
        assert_eq!(parse_refresh("2.5"), Ok(2.5));
        assert_eq!(parse_refresh("0.1"), Ok(0.1));
        assert!(parse_refresh("0.05").is_err());
        assert!(parse_refresh("fast").is_err());
        assert!(parse_refresh("NaN").is_err());
        assert!(parse_refresh("inf").is_err());
        assert!(parse_refresh("1e300").is_err());
        assert_eq!(parse_refresh("86400"), Ok(86_400.0));
        assert!(parse_refresh("86401").is_err());
    }

    #[test]
    fn test_cli_flags() {
        let args = ["sktop", "--refresh", "3", "--user", "bob", "-c", "/tmp/x.toml"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.refresh, Some(3.0));
        assert_eq!(cli.user.as_deref(), Some("bob"));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/x.toml")));

        assert!(Cli::try_parse_from(["sktop", "--refresh", "0"]).is_err());
    }

    #[test]
    fn test_explicit_user_wins() {
        assert_eq!(resolve_user(Some("carol".into())).unwrap(), "carol");
    }

    #[test]
    fn test_open_log_file_creates_directories() {
        let dir = std::env::temp_dir().join(format!("sktop-log-test-{}", std::process::id()));
        let path = dir.join("nested/sktop.log");
        assert!(open_log_file(&path).is_ok());
        assert!(path.exists());
        let _ = fs::remove_dir_all(&dir);
    }
}
