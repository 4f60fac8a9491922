//! Line formatter for plugin output.
//!
//! Each event becomes one line: the level, an optional timestamp, the message
//! and the structured fields as `key=value` pairs, for example
//!
//! ```text
//! WARNING[0001] 192.0.2.10      - example.com valid until 2026-02-01 00:00:00 UTC (20d)
//! ERROR[0003] 192.0.2.11: dial tcp 192.0.2.11:443: connection refused  port=443
//! ```

use std::fmt::{self, Write as _};
use std::io::{self, IsTerminal};
use std::time::Instant;

use lazy_static::lazy_static;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

lazy_static! {
    pub(crate) static ref START: Instant = Instant::now();
}

const GRAY: u8 = 37;
const BLUE: u8 = 34;
const YELLOW: u8 = 33;
const RED: u8 = 31;

/// Minimum width of the message column when fields follow it.
const MESSAGE_WIDTH: usize = 44;

/// RFC 3339 with second precision.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// When to emit ANSI colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// Only when stderr is a terminal, never on Windows
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    pub fn enabled(self) -> bool {
        match self {
            ColorMode::Auto => io::stderr().is_terminal() && !cfg!(windows),
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

/// Timestamp printed after the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampMode {
    /// Seconds since the process started, `[0004]`
    #[default]
    Relative,
    /// Wall clock time, `[2026-10-18T10:00:00+02:00]`
    Full,
    Disabled,
}

/// Event formatter producing one plain line per event.
#[derive(Debug, Clone)]
pub struct SimpleTextFormat {
    colored: bool,
    timestamp: TimestampMode,
    timestamp_format: String,
    sort_fields: bool,
}

impl SimpleTextFormat {
    pub fn new(color: ColorMode, timestamp: TimestampMode) -> Self {
        SimpleTextFormat {
            colored: color.enabled(),
            timestamp,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            sort_fields: true,
        }
    }

    pub fn with_timestamp_format(mut self, format: &str) -> Self {
        self.timestamp_format = format.to_string();
        self
    }

    /// Keeps fields in the order they were recorded.
    pub fn without_sorting(mut self) -> Self {
        self.sort_fields = false;
        self
    }

    fn timestamp(&self) -> String {
        match self.timestamp {
            TimestampMode::Relative => format!("[{:04}]", START.elapsed().as_secs()),
            TimestampMode::Full => {
                format!("[{}]", chrono::Local::now().format(&self.timestamp_format))
            }
            TimestampMode::Disabled => String::new(),
        }
    }
}

impl Default for SimpleTextFormat {
    fn default() -> Self {
        SimpleTextFormat::new(ColorMode::default(), TimestampMode::default())
    }
}

fn level_text(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "TRACE",
        Level::DEBUG => "DEBUG",
        Level::INFO => "INFO",
        Level::WARN => "WARNING",
        Level::ERROR => "ERROR",
    }
}

fn level_color(level: &Level) -> u8 {
    match *level {
        Level::TRACE | Level::DEBUG => GRAY,
        Level::WARN => YELLOW,
        Level::ERROR => RED,
        Level::INFO => BLUE,
    }
}

/// Whether `value` can be written without quotes.
///
/// Values with spaces, colons or other punctuation are quoted so a field
/// never runs into the next one; this differs from plain `%+v` output.
fn is_bare(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '.')
}

fn quote_if_needed(value: &str) -> String {
    if is_bare(value) {
        value.to_string()
    } else {
        format!("{:?}", value)
    }
}

#[derive(Default)]
struct FieldCollector {
    message: String,
    fields: Vec<(String, String)>,
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push((field.name().to_string(), value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields
                .push((field.name().to_string(), format!("{:?}", value)));
        }
    }
}

impl<S, N> FormatEvent<S, N> for SimpleTextFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut collector = FieldCollector::default();
        event.record(&mut collector);
        if self.sort_fields {
            collector.fields.sort_by(|a, b| a.0.cmp(&b.0));
        }

        let level = event.metadata().level();
        let color = level_color(level);
        let mut line = String::new();
        if self.colored {
            write!(line, "\x1b[{}m{}\x1b[0m", color, level_text(level))?;
        } else {
            line.push_str(level_text(level));
        }
        line.push_str(&self.timestamp());

        if collector.fields.is_empty() {
            write!(line, " {}", collector.message)?;
        } else {
            write!(line, " {:<width$} ", collector.message, width = MESSAGE_WIDTH)?;
        }
        for (key, value) in &collector.fields {
            if self.colored {
                write!(line, " \x1b[{}m{}\x1b[0m={}", color, key, quote_if_needed(value))?;
            } else {
                write!(line, " {}={}", key, quote_if_needed(value))?;
            }
        }
        writeln!(writer, "{}", line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::testing::capture;
    use tracing::{debug, error, info, warn};

    fn plain() -> SimpleTextFormat {
        SimpleTextFormat::new(ColorMode::Never, TimestampMode::Disabled)
    }

    #[test]
    fn test_plain_levels() {
        let output = capture(plain(), || {
            debug!("debugging");
            info!("all good");
            warn!("careful");
            error!("broken");
        });
        assert_eq!(
            output,
            "DEBUG debugging\nINFO all good\nWARNING careful\nERROR broken\n"
        );
    }

    #[test]
    fn test_fields_sorted_after_padded_message() {
        let output = capture(plain(), || {
            info!(zone = "eu", address = "192.0.2.1", "probing");
        });
        assert_eq!(
            output,
            format!("INFO {:<44}  address=192.0.2.1 zone=eu\n", "probing")
        );
    }

    #[test]
    fn test_fields_unsorted() {
        let output = capture(plain().without_sorting(), || {
            info!(zone = "eu", address = "192.0.2.1", "probing");
        });
        assert!(output.ends_with(" zone=eu address=192.0.2.1\n"));
    }

    #[test]
    fn test_values_quoted_when_needed() {
        let output = capture(plain(), || {
            warn!(reason = "no route to host", count = 3, "skipped");
        });
        assert!(output.contains(" count=3"));
        assert!(output.contains(" reason=\"no route to host\""));
    }

    #[test]
    fn test_colored_output() {
        let format = SimpleTextFormat::new(ColorMode::Always, TimestampMode::Disabled);
        let output = capture(format, || {
            warn!(days = 20, "expiring");
        });
        assert!(output.starts_with("\x1b[33mWARNING\x1b[0m expiring"));
        assert!(output.ends_with(" \x1b[33mdays\x1b[0m=20\n"));
    }

    #[test]
    fn test_relative_timestamp() {
        let format = SimpleTextFormat::new(ColorMode::Never, TimestampMode::Relative);
        let output = capture(format, || info!("started"));
        assert!(output.starts_with("INFO["));
        assert_eq!(&output[9..10], "]");
        assert!(output[5..9].chars().all(|ch| ch.is_ascii_digit()));
        assert!(output.ends_with("] started\n"));
    }

    #[test]
    fn test_full_timestamp_with_custom_format() {
        let format = SimpleTextFormat::new(ColorMode::Never, TimestampMode::Full)
            .with_timestamp_format("fixed");
        let output = capture(format, || error!("failed"));
        assert_eq!(output, "ERROR[fixed] failed\n");
    }

    #[test]
    fn test_is_bare() {
        assert!(is_bare("example.com"));
        assert!(is_bare("v1-2"));
        assert!(!is_bare(""));
        assert!(!is_bare("a b"));
        assert!(!is_bare("2001:db8::1"));
    }
}
