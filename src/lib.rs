//! Certificate expiry checks for every address of a host.
//!
//! A run resolves the host, opens a TLS connection to each address in turn
//! and classifies the end-entity certificates it is shown against a warning
//! and a critical threshold. The worst result of the run becomes the exit
//! code, following the monitoring-plugin convention
//! (0 OK, 1 WARNING, 2 CRITICAL, 3 UNKNOWN).
//!
//! ```no_run
//! use check_ssl::{run, Config};
//!
//! let report = run(&Config::new("example.com"))?;
//! std::process::exit(report.status.exit_code());
//! # Ok::<(), check_ssl::CheckError>(())
//! ```

pub mod certificate;
pub mod config;
pub mod error;
pub mod logging;
pub mod probe;
pub mod resolver;
pub mod severity;

use std::io;
use std::net::IpAddr;

use serde::Serialize;

pub use certificate::{format_duration, CertificateRecord, Evaluation, Thresholds};
pub use config::Config;
pub use error::{CheckError, Reachability};
pub use probe::{probe_addresses, Chain, Connector, TlsConnector};
pub use severity::{Severity, Status};

/// Outcome of a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub host: String,
    pub status: Severity,
    pub certificates: Vec<Evaluation>,
}

/// Checks `config.host` using the system resolver and OpenSSL.
///
/// Only a failed DNS lookup is returned as an error; everything else is
/// folded into the report status.
pub fn run(config: &Config) -> Result<Report, CheckError> {
    let connector = TlsConnector::new(&config.host, config.connection_timeout)
        .with_port(config.port)
        .with_ca_file(config.ca_file.as_ref());
    run_with(config, &connector, resolver::system_lookup)
}

/// Same as [`run`] with a custom connector and lookup function.
pub fn run_with<C, F>(config: &Config, connector: &C, lookup: F) -> Result<Report, CheckError>
where
    C: Connector,
    F: FnOnce(&str) -> io::Result<Vec<IpAddr>> + Send + 'static,
{
    let mut status = Status::new();
    config.check_sanity(&mut status);

    let addresses =
        resolver::lookup_with_timeout_using(&config.host, config.lookup_timeout, &mut status, lookup)?;
    let certificates = probe_addresses(connector, &addresses, &config.thresholds(), &mut status);

    Ok(Report {
        host: config.host.clone(),
        status: status.current(),
        certificates,
    })
}
