//! Run configuration for check-ssl.
//!
//! Settings come from the command line only; every field has a default
//! except the host. Configuration files are not supported.
//!
//! # Defaults
//!
//! - `lookup_timeout`: 10 seconds
//! - `connection_timeout`: 30 seconds
//! - `warning_days`: 30
//! - `critical_days`: 14
//! - `port`: 443

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::certificate::Thresholds;
use crate::severity::{Severity, Status};

pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_WARNING_DAYS: u32 = 30;
pub const DEFAULT_CRITICAL_DAYS: u32 = 14;
pub const DEFAULT_PORT: u16 = 443;

/// Settings for one check run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Host name to resolve and to send as TLS server name
    pub host: String,
    /// Upper bound for the DNS lookup
    pub lookup_timeout: Duration,
    /// Upper bound for connecting to a single address
    pub connection_timeout: Duration,
    /// Remaining validity in days below which a certificate is a warning
    pub warning_days: u32,
    /// Remaining validity in days below which a certificate is critical
    pub critical_days: u32,
    pub port: u16,
    /// CA bundle used instead of the system trust store
    pub ca_file: Option<PathBuf>,
    /// Print a JSON report when the run is over
    pub json: bool,
}

impl Config {
    /// Creates a configuration for `host` with default values.
    pub fn new(host: &str) -> Self {
        Config {
            host: host.to_string(),
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            warning_days: DEFAULT_WARNING_DAYS,
            critical_days: DEFAULT_CRITICAL_DAYS,
            port: DEFAULT_PORT,
            ca_file: None,
            json: false,
        }
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds::from_days(self.warning_days, self.critical_days)
    }

    /// Flags a warning threshold below the critical one.
    ///
    /// Such a configuration can never report a warning, so the run is raised
    /// to at least [`Severity::Warning`]. Returns `false` in that case.
    pub fn check_sanity(&self, status: &mut Status) -> bool {
        if self.thresholds().is_inverted() {
            warn!(
                warning = self.warning_days,
                critical = self.critical_days,
                "-c is higher than -w, the warning threshold will never trigger"
            );
            status.raise(Severity::Warning);
            return false;
        }
        true
    }
}
