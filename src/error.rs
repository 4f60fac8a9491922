//! Error types for host checks.
//!
//! This module defines the errors that can occur while resolving a host,
//! connecting to one of its addresses, or reading the presented certificates,
//! together with the [`Reachability`] capability used to recognise
//! "host unreachable" failures without touching platform error codes.

use std::error::Error;
use std::fmt;
use std::io;

/// Error type for failed checks.
#[derive(Debug)]
pub enum CheckError {
    /// DNS resolution failed for the given hostname
    DnsResolution {
        /// The hostname that failed to resolve
        hostname: String,
        /// The underlying I/O error
        source: io::Error,
    },

    /// TCP connection failed to the target address
    ConnectionFailed {
        /// The address (ip:port) that connection failed to
        address: String,
        /// The underlying I/O error
        source: io::Error,
    },

    /// TLS handshake failed
    HandshakeFailed {
        /// Details about why the handshake failed
        details: String,
        /// The I/O error that interrupted the handshake, if any
        source: Option<io::Error>,
    },

    /// Certificate parsing error
    CertificateError {
        /// Description of what went wrong
        reason: String,
    },

    /// Network operation timeout
    Timeout {
        /// Description of which operation timed out
        operation: String,
    },

    /// OpenSSL error occurred
    OpenSSLError {
        /// The underlying OpenSSL error
        details: String,
    },

    /// Generic I/O error
    IoError {
        /// The underlying I/O error
        source: io::Error,
    },

    /// A generic error with a custom message
    Other {
        /// Error message
        message: String,
    },
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DnsResolution { hostname, source } => {
                write!(f, "failed to resolve {}: {}", hostname, source)
            }
            Self::ConnectionFailed { address, source } => {
                write!(f, "dial tcp {}: {}", address, source)
            }
            Self::HandshakeFailed { details, .. } => {
                write!(f, "TLS handshake failed: {}", details)
            }
            Self::CertificateError { reason } => {
                write!(f, "Certificate error: {}", reason)
            }
            Self::Timeout { operation } => {
                write!(f, "Operation timed out: {}", operation)
            }
            Self::OpenSSLError { details } => {
                write!(f, "OpenSSL error: {}", details)
            }
            Self::IoError { source } => {
                write!(f, "I/O error: {}", source)
            }
            Self::Other { message } => {
                write!(f, "{}", message)
            }
        }
    }
}

impl Error for CheckError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::DnsResolution { source, .. } => Some(source),
            Self::ConnectionFailed { source, .. } => Some(source),
            Self::HandshakeFailed {
                source: Some(source),
                ..
            } => Some(source),
            Self::IoError { source } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for CheckError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::TimedOut || e.kind() == io::ErrorKind::WouldBlock {
            return Self::Timeout {
                operation: e.to_string(),
            };
        }
        Self::IoError { source: e }
    }
}

impl From<&str> for CheckError {
    fn from(s: &str) -> Self {
        Self::Other {
            message: s.to_string(),
        }
    }
}

impl From<String> for CheckError {
    fn from(s: String) -> Self {
        Self::Other { message: s }
    }
}

impl From<openssl::error::ErrorStack> for CheckError {
    fn from(e: openssl::error::ErrorStack) -> Self {
        Self::OpenSSLError {
            details: e.to_string(),
        }
    }
}

impl<S: fmt::Debug> From<openssl::ssl::HandshakeError<S>> for CheckError {
    fn from(e: openssl::ssl::HandshakeError<S>) -> Self {
        let details = format!("{}", e);
        let source = match e {
            openssl::ssl::HandshakeError::Failure(mid)
            | openssl::ssl::HandshakeError::WouldBlock(mid) => mid
                .into_error()
                .into_io_error()
                .ok(),
            openssl::ssl::HandshakeError::SetupFailure(_) => None,
        };
        Self::HandshakeFailed { details, source }
    }
}

/// Answers whether an error means the remote host could not be routed to.
///
/// IPv6 records are often published for hosts that the checking machine has
/// no IPv6 route to; callers use this to tell that case apart from real
/// connection problems.
pub trait Reachability {
    fn is_host_unreachable(&self) -> bool;
}

impl Reachability for io::Error {
    fn is_host_unreachable(&self) -> bool {
        if self.kind() == io::ErrorKind::HostUnreachable {
            return true;
        }
        // io::Error may wrap another error, e.g. when built with io::Error::new
        self.get_ref()
            .is_some_and(|inner| source_chain_unreachable(inner))
    }
}

impl Reachability for CheckError {
    fn is_host_unreachable(&self) -> bool {
        source_chain_unreachable(self)
    }
}

fn source_chain_unreachable(err: &(dyn Error + 'static)) -> bool {
    let mut current: Option<&(dyn Error + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            if io_err.kind() == io::ErrorKind::HostUnreachable {
                return true;
            }
        }
        current = e.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable() -> io::Error {
        io::Error::from(io::ErrorKind::HostUnreachable)
    }

    #[test]
    fn test_error_display() {
        let err = CheckError::DnsResolution {
            hostname: "example.invalid".to_string(),
            source: io::Error::new(io::ErrorKind::Other, "no such host"),
        };
        assert_eq!(err.to_string(), "failed to resolve example.invalid: no such host");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_error_from_str() {
        let err: CheckError = "test error".into();
        assert_eq!(err.to_string(), "test error");
    }

    #[test]
    fn test_timed_out_io_error_becomes_timeout() {
        let err: CheckError = io::Error::from(io::ErrorKind::TimedOut).into();
        assert!(matches!(err, CheckError::Timeout { .. }));
    }

    #[test]
    fn test_io_error_host_unreachable() {
        assert!(unreachable().is_host_unreachable());
        assert!(!io::Error::from(io::ErrorKind::ConnectionRefused).is_host_unreachable());
    }

    #[test]
    fn test_wrapped_io_error_host_unreachable() {
        let wrapped = io::Error::new(io::ErrorKind::Other, unreachable());
        assert!(wrapped.is_host_unreachable());
    }

    #[test]
    fn test_check_error_host_unreachable() {
        let err = CheckError::ConnectionFailed {
            address: "[2001:db8::1]:443".to_string(),
            source: unreachable(),
        };
        assert!(err.is_host_unreachable());

        let err = CheckError::HandshakeFailed {
            details: "interrupted".to_string(),
            source: Some(unreachable()),
        };
        assert!(err.is_host_unreachable());
    }

    #[test]
    fn test_check_error_not_unreachable() {
        let err = CheckError::ConnectionFailed {
            address: "192.0.2.1:443".to_string(),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        };
        assert!(!err.is_host_unreachable());

        let err = CheckError::Timeout {
            operation: "connect".to_string(),
        };
        assert!(!err.is_host_unreachable());
    }
}
