//! Severity levels and the run-wide status accumulator.
//!
//! Severities follow the monitoring-plugin convention: the numeric value of
//! each level is the process exit code reported for it.

use serde::Serialize;
use strum_macros::{Display, EnumIter, EnumString};

/// Ordered check result: `Ok < Warning < Critical < Unknown`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Display,
    EnumString,
    EnumIter,
    Serialize,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    #[default]
    Ok = 0,
    Warning = 1,
    Critical = 2,
    Unknown = 3,
}

impl Severity {
    /// Exit code used by monitoring systems for this severity.
    pub fn exit_code(self) -> i32 {
        self as i32
    }
}

/// Worst severity observed during one run.
///
/// Starts at [`Severity::Ok`] and only ever moves up.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Status {
    current: Severity,
}

impl Status {
    pub fn new() -> Self {
        Status::default()
    }

    /// Raises the status to `severity` if it is worse than the current one.
    ///
    /// Returns `true` when the status changed.
    pub fn raise(&mut self, severity: Severity) -> bool {
        if severity > self.current {
            self.current = severity;
            return true;
        }
        false
    }

    pub fn current(&self) -> Severity {
        self.current
    }

    pub fn exit_code(&self) -> i32 {
        self.current.exit_code()
    }
}
