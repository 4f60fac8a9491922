//! Certificate records and expiry classification.

use std::collections::HashSet;
use std::net::IpAddr;

use chrono::{DateTime, TimeDelta, Utc};
use openssl::asn1::{Asn1Time, Asn1TimeRef};
use openssl::nid::Nid;
use openssl::x509::X509Ref;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use x509_parser::prelude::*;

use crate::error::CheckError;
use crate::severity::{Severity, Status};

/// A certificate taken from a verified chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRecord {
    /// Subject common name, or the whole subject when it has none
    pub subject: String,
    pub not_after: DateTime<Utc>,
    /// Signature bytes; identical certificates share them across chains
    pub signature: Vec<u8>,
    /// Set by the basicConstraints extension
    pub is_ca: bool,
}

impl CertificateRecord {
    pub fn from_x509(cert: &X509Ref) -> Result<CertificateRecord, CheckError> {
        let subject = common_name(cert).unwrap_or_else(|| subject_line(cert));
        let not_after = asn1_to_datetime(cert.not_after())?;
        let signature = cert.signature().as_slice().to_vec();
        let is_ca = is_ca(&cert.to_der()?)?;

        Ok(CertificateRecord {
            subject,
            not_after,
            signature,
            is_ca,
        })
    }
}

fn common_name(cert: &X509Ref) -> Option<String> {
    cert.subject_name()
        .entries_by_nid(Nid::COMMONNAME)
        .next()
        .and_then(|entry| entry.data().as_utf8().ok())
        .map(|cn| cn.to_string())
}

fn subject_line(cert: &X509Ref) -> String {
    cert.subject_name()
        .entries()
        .filter_map(|entry| {
            let key = entry.object().nid().short_name().ok()?;
            let value = entry.data().as_utf8().ok()?;
            Some(format!("{}={}", key, value))
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn asn1_to_datetime(time: &Asn1TimeRef) -> Result<DateTime<Utc>, CheckError> {
    let epoch = Asn1Time::from_unix(0)?;
    let diff = epoch.diff(time)?;
    let seconds = i64::from(diff.days) * 86_400 + i64::from(diff.secs);
    DateTime::from_timestamp(seconds, 0).ok_or_else(|| CheckError::CertificateError {
        reason: format!("expiry {} out of range", time),
    })
}

fn is_ca(der: &[u8]) -> Result<bool, CheckError> {
    let (_, cert) = X509Certificate::from_der(der).map_err(|e| CheckError::CertificateError {
        reason: format!("failed to parse certificate: {}", e),
    })?;
    Ok(cert
        .basic_constraints()
        .map(|bc| bc.map(|ext| ext.value.ca).unwrap_or(false))
        .unwrap_or(false))
}

/// Remaining-validity windows below which a certificate is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub warning: TimeDelta,
    pub critical: TimeDelta,
}

impl Thresholds {
    pub fn from_days(warning: u32, critical: u32) -> Thresholds {
        Thresholds {
            warning: TimeDelta::days(i64::from(warning)),
            critical: TimeDelta::days(i64::from(critical)),
        }
    }

    pub fn classify(&self, remaining: TimeDelta) -> Severity {
        if remaining < self.critical {
            Severity::Critical
        } else if remaining < self.warning {
            Severity::Warning
        } else {
            Severity::Ok
        }
    }

    /// A warning window shorter than the critical one never yields a warning.
    pub fn is_inverted(&self) -> bool {
        self.warning < self.critical
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds::from_days(30, 14)
    }
}

/// Outcome for one end-entity certificate of one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub address: IpAddr,
    pub subject: String,
    pub not_after: DateTime<Utc>,
    pub remaining_seconds: i64,
    pub severity: Severity,
}

/// Classifies every end-entity certificate found in `chains`.
///
/// A certificate present in several chains is looked at once; CA
/// certificates are skipped.
pub fn evaluate_chains(
    address: IpAddr,
    chains: &[Vec<CertificateRecord>],
    thresholds: &Thresholds,
    now: DateTime<Utc>,
    status: &mut Status,
) -> Vec<Evaluation> {
    let mut seen: HashSet<&[u8]> = HashSet::new();
    let mut evaluations = Vec::new();

    for cert in chains.iter().flatten() {
        if !seen.insert(cert.signature.as_slice()) {
            continue;
        }
        if cert.is_ca {
            debug!("{:<15} - ignoring CA certificate {}", address, cert.subject);
            continue;
        }

        let remaining = cert.not_after - now;
        let severity = thresholds.classify(remaining);
        status.raise(severity);

        let state = if remaining < TimeDelta::zero() {
            "expired since"
        } else {
            "valid until"
        };
        log_with_severity(
            severity,
            &format!(
                "{:<15} - {} {} {} ({})",
                address,
                cert.subject,
                state,
                cert.not_after,
                format_duration(remaining.num_seconds())
            ),
        );

        evaluations.push(Evaluation {
            address,
            subject: cert.subject.clone(),
            not_after: cert.not_after,
            remaining_seconds: remaining.num_seconds(),
            severity,
        });
    }
    evaluations
}

fn log_with_severity(severity: Severity, message: &str) {
    match severity {
        Severity::Ok => info!("{}", message),
        Severity::Warning => warn!("{}", message),
        Severity::Critical | Severity::Unknown => error!("{}", message),
    }
}

/// Formats a number of seconds as `1d 2h 3m 4s`, leaving out zero parts.
pub fn format_duration(seconds: i64) -> String {
    if seconds == 0 {
        return "0s".to_string();
    }
    let sign = if seconds < 0 { "-" } else { "" };
    let total = seconds.unsigned_abs();

    let parts = [
        (total / 86_400, 'd'),
        (total % 86_400 / 3_600, 'h'),
        (total % 3_600 / 60, 'm'),
        (total % 60, 's'),
    ];
    let formatted = parts
        .iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{}{}", value, unit))
        .collect::<Vec<_>>()
        .join(" ");
    format!("{}{}", sign, formatted)
}
