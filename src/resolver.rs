//! Bounded DNS resolution.
//!
//! The lookup runs on its own thread and the caller waits on a channel for at
//! most the configured timeout. A lookup that loses the race is not cancelled:
//! the thread keeps running and its late result is dropped with the channel.
//! The process exits shortly after a run, so at most one such thread lingers.

use std::io;
use std::net::{IpAddr, ToSocketAddrs};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::{debug, error};

use crate::error::CheckError;
use crate::severity::{Severity, Status};

/// Resolves `host` with the system resolver, waiting at most `timeout`.
///
/// On timeout the status is raised to critical and no addresses are
/// returned. A lookup failure is returned as [`CheckError::DnsResolution`].
pub fn lookup_with_timeout(
    host: &str,
    timeout: Duration,
    status: &mut Status,
) -> Result<Vec<IpAddr>, CheckError> {
    lookup_with_timeout_using(host, timeout, status, system_lookup)
}

/// Same as [`lookup_with_timeout`] with a custom lookup function.
pub fn lookup_with_timeout_using<F>(
    host: &str,
    timeout: Duration,
    status: &mut Status,
    lookup: F,
) -> Result<Vec<IpAddr>, CheckError>
where
    F: FnOnce(&str) -> io::Result<Vec<IpAddr>> + Send + 'static,
{
    let (sender, receiver) = mpsc::channel();
    let name = host.to_string();
    thread::Builder::new()
        .name("dns-lookup".to_string())
        .spawn(move || {
            let result = lookup(name.as_str());
            // receiver is gone once the caller timed out
            let _ = sender.send(result);
        })?;

    match receiver.recv_timeout(timeout) {
        Ok(Ok(addresses)) => {
            let addresses = dedup(addresses);
            debug!(host = %host, "lookup result: {:?}", addresses);
            Ok(addresses)
        }
        Ok(Err(source)) => Err(CheckError::DnsResolution {
            hostname: host.to_string(),
            source,
        }),
        Err(mpsc::RecvTimeoutError::Timeout) => {
            error!("timeout resolving {}", host);
            status.raise(Severity::Critical);
            Ok(Vec::new())
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(CheckError::Other {
            message: format!("lookup of {} ended without a result", host),
        }),
    }
}

/// Resolves `host` through the operating system resolver.
pub fn system_lookup(host: &str) -> io::Result<Vec<IpAddr>> {
    Ok((host, 0)
        .to_socket_addrs()?
        .map(|socket_addr| socket_addr.ip())
        .collect())
}

fn dedup(addresses: Vec<IpAddr>) -> Vec<IpAddr> {
    let mut unique = Vec::with_capacity(addresses.len());
    for address in addresses {
        if !unique.contains(&address) {
            unique.push(address);
        }
    }
    unique
}
