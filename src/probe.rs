//! TLS connections to resolved addresses.

use std::io::{self, Read, Write};
use std::net::{IpAddr, SocketAddr, TcpStream};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Utc;
use openssl::ssl::{SslConnector, SslMethod, SslVerifyMode};
use tracing::{error, info};

use crate::certificate::{evaluate_chains, CertificateRecord, Evaluation, Thresholds};
use crate::error::{CheckError, Reachability};
use crate::severity::{Severity, Status};

/// Extra time granted to a whole dial on top of the connection timeout.
pub const DEADLINE_GRACE: Duration = Duration::from_secs(5);

/// Certificates of one verified chain, leaf first.
pub type Chain = Vec<CertificateRecord>;

/// Opens a TLS connection to an address and returns the verified chains.
pub trait Connector {
    fn connect(&self, address: IpAddr) -> Result<Vec<Chain>, CheckError>;
}

/// CA bundle locations used by common distributions.
const CA_BUNDLES: &[&str] = &[
    "/etc/ssl/certs/ca-certificates.crt",
    "/etc/pki/tls/certs/ca-bundle.crt",
    "/etc/ssl/ca-bundle.pem",
    "/etc/pki/ca-trust/extracted/pem/tls-ca-bundle.pem",
    "/etc/ssl/cert.pem",
    "/usr/local/etc/openssl/cert.pem",
];

/// TCP stream bounded by an absolute deadline.
///
/// Every read and write gets the socket timeout `min(timeout, deadline - now)`,
/// so a peer trickling bytes cannot stretch the handshake past the deadline.
#[derive(Debug)]
struct DeadlineStream {
    inner: TcpStream,
    deadline: Instant,
    timeout: Duration,
}

impl DeadlineStream {
    fn new(inner: TcpStream, deadline: Instant, timeout: Duration) -> Self {
        DeadlineStream {
            inner,
            deadline,
            timeout,
        }
    }

    fn remaining(&self) -> io::Result<Duration> {
        self.deadline
            .checked_duration_since(Instant::now())
            .filter(|left| !left.is_zero())
            .map(|left| left.min(self.timeout))
            .ok_or_else(|| io::Error::new(io::ErrorKind::TimedOut, "dial deadline exceeded"))
    }
}

impl Read for DeadlineStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.remaining()?;
        self.inner.set_read_timeout(Some(remaining))?;
        self.inner.read(buf)
    }
}

impl Write for DeadlineStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let remaining = self.remaining()?;
        self.inner.set_write_timeout(Some(remaining))?;
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// [`Connector`] backed by OpenSSL, verifying against the system trust store.
#[derive(Debug, Clone)]
pub struct TlsConnector {
    hostname: String,
    port: u16,
    timeout: Duration,
    ca_file: Option<PathBuf>,
}

impl TlsConnector {
    pub fn new(hostname: &str, timeout: Duration) -> Self {
        TlsConnector {
            hostname: hostname.to_string(),
            port: 443,
            timeout,
            ca_file: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_ca_file<P: AsRef<Path>>(mut self, ca_file: Option<P>) -> Self {
        self.ca_file = ca_file.map(|path| path.as_ref().to_path_buf());
        self
    }

    fn connector(&self) -> Result<SslConnector, CheckError> {
        let mut builder = SslConnector::builder(SslMethod::tls())?;
        builder.set_verify(SslVerifyMode::PEER);
        match &self.ca_file {
            Some(path) => builder.set_ca_file(path)?,
            None => {
                if let Some(bundle) = CA_BUNDLES.iter().find(|path| Path::new(path).exists()) {
                    builder.set_ca_file(bundle)?;
                }
            }
        }
        Ok(builder.build())
    }
}

impl Connector for TlsConnector {
    fn connect(&self, address: IpAddr) -> Result<Vec<Chain>, CheckError> {
        let deadline = Instant::now() + self.timeout + DEADLINE_GRACE;
        let socket_addr = SocketAddr::new(address, self.port);

        let tcp_stream = TcpStream::connect_timeout(&socket_addr, self.timeout).map_err(|e| {
            CheckError::ConnectionFailed {
                address: socket_addr.to_string(),
                source: e,
            }
        })?;

        let stream = DeadlineStream::new(tcp_stream, deadline, self.timeout);
        let stream = self.connector()?.connect(&self.hostname, stream)?;

        let chain = stream
            .ssl()
            .verified_chain()
            .ok_or_else(|| CheckError::CertificateError {
                reason: "no verified chain presented".to_string(),
            })?
            .iter()
            .map(CertificateRecord::from_x509)
            .collect::<Result<Chain, CheckError>>()?;

        Ok(vec![chain])
    }
}

/// Probes each address in turn and evaluates the certificates it presents.
///
/// Every address is attempted; failures raise the status to critical except
/// for IPv6 addresses the host has no route to, which are skipped.
pub fn probe_addresses<C: Connector>(
    connector: &C,
    addresses: &[IpAddr],
    thresholds: &Thresholds,
    status: &mut Status,
) -> Vec<Evaluation> {
    let mut evaluations = Vec::new();
    for address in addresses {
        match connector.connect(*address) {
            Ok(chains) => {
                evaluations.extend(evaluate_chains(
                    *address,
                    &chains,
                    thresholds,
                    Utc::now(),
                    status,
                ));
            }
            Err(err) if address.is_ipv6() && err.is_host_unreachable() => {
                info!("{:<15} - ignoring unreachable IPv6 address", address);
            }
            Err(err) => {
                error!("{}: {}", address, err);
                status.raise(Severity::Critical);
            }
        }
    }
    evaluations
}
