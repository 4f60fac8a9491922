use std::backtrace::Backtrace;
use std::panic;
use std::path::PathBuf;
use std::process::exit;
use std::time::Duration;

use clap::{CommandFactory, Parser};
use tracing::{error, Level};

use check_ssl::config::{DEFAULT_CRITICAL_DAYS, DEFAULT_PORT, DEFAULT_WARNING_DAYS};
use check_ssl::logging::{self, ColorMode, LogOptions, TimestampMode};
use check_ssl::{run, Config, Severity};

/// Exit code when the host name cannot be resolved at all.
const LOOKUP_FAILURE_EXIT_CODE: i32 = 1;

#[derive(Parser, Debug)]
#[command(name = "check-ssl", version, author, about, long_about = None)]
struct Cli {
    /// The domain name of the host to check
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Timeout for DNS lookups, e.g. 10s or 1m30s
    #[arg(long, default_value = "10s", value_parser = humantime::parse_duration)]
    lookup_timeout: Duration,

    /// Timeout for connecting to a single address
    #[arg(long, default_value = "30s", value_parser = humantime::parse_duration)]
    connection_timeout: Duration,

    /// Warning validity in days
    #[arg(short = 'w', long = "warning", default_value_t = DEFAULT_WARNING_DAYS)]
    warning: u32,

    /// Critical validity in days
    #[arg(short = 'c', long = "critical", default_value_t = DEFAULT_CRITICAL_DAYS)]
    critical: u32,

    /// Port to connect to on every address
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// CA bundle to verify against instead of the system trust store
    #[arg(long)]
    ca_file: Option<PathBuf>,

    /// Print a JSON report to stdout when done
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Always colour log output
    #[arg(long, conflicts_with = "no_color")]
    color: bool,

    /// Never colour log output
    #[arg(long)]
    no_color: bool,

    /// Log wall clock timestamps instead of seconds since start
    #[arg(long, conflicts_with = "no_timestamp")]
    full_timestamp: bool,

    /// Log without timestamps
    #[arg(long)]
    no_timestamp: bool,
}

impl Cli {
    fn log_options(&self) -> LogOptions {
        let color = if self.color {
            ColorMode::Always
        } else if self.no_color {
            ColorMode::Never
        } else {
            ColorMode::Auto
        };
        let timestamp = if self.full_timestamp {
            TimestampMode::Full
        } else if self.no_timestamp {
            TimestampMode::Disabled
        } else {
            TimestampMode::Relative
        };
        LogOptions {
            level: if self.debug { Level::DEBUG } else { Level::INFO },
            color,
            timestamp,
        }
    }

    fn config(&self, host: &str) -> Config {
        Config {
            lookup_timeout: self.lookup_timeout,
            connection_timeout: self.connection_timeout,
            warning_days: self.warning,
            critical_days: self.critical,
            port: self.port,
            ca_file: self.ca_file.clone(),
            json: self.json,
            ..Config::new(host)
        }
    }
}

fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        let stacktrace = Backtrace::force_capture();
        error!("Panic: {}", info);
        error!("{}", stacktrace);
        exit(Severity::Critical.exit_code());
    }));
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.log_options()) {
        eprintln!("Failed to set up logging: {}", e);
    }
    install_panic_hook();

    let host = match cli.host.as_deref() {
        Some(host) if !host.is_empty() => host,
        _ => {
            let _ = Cli::command().print_help();
            error!("--host is required");
            exit(Severity::Critical.exit_code());
        }
    };
    let config = cli.config(host);

    match run(&config) {
        Ok(report) => {
            if config.json {
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{}", json),
                    Err(e) => error!("Failed to serialize report: {}", e),
                }
            }
            exit(report.status.exit_code());
        }
        Err(err) => {
            error!("{}", err);
            exit(LOOKUP_FAILURE_EXIT_CODE);
        }
    }
}
