//! Logging setup.
//!
//! All output goes through `tracing`; the subscriber installed here writes to
//! stderr using [`format::SimpleTextFormat`].
//!
//! # Submodules
//!
//! - `format` - line formatter with optional colours and timestamps

pub mod format;

use std::io;

use tracing::Level;

pub use format::{ColorMode, SimpleTextFormat, TimestampMode};

/// Options controlling the log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogOptions {
    pub level: Level,
    pub color: ColorMode,
    pub timestamp: TimestampMode,
}

impl Default for LogOptions {
    fn default() -> Self {
        LogOptions {
            level: Level::INFO,
            color: ColorMode::Auto,
            timestamp: TimestampMode::Relative,
        }
    }
}

/// Installs the global subscriber.
///
/// Fails if a global subscriber was already set.
pub fn init(options: LogOptions) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    lazy_static::initialize(&format::START);
    tracing_subscriber::fmt()
        .with_max_level(options.level)
        .with_writer(io::stderr)
        .event_format(SimpleTextFormat::new(options.color, options.timestamp))
        .try_init()
}

#[cfg(test)]
pub(crate) mod testing {
    use std::io;
    use std::sync::{Arc, Mutex};

    use tracing::Level;

    use super::SimpleTextFormat;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Runs `f` under a scoped subscriber and returns everything it logged.
    pub(crate) fn capture_at<F: FnOnce()>(level: Level, format: SimpleTextFormat, f: F) -> String {
        let buffer = Capture::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(move || writer.clone())
            .event_format(format)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    pub(crate) fn capture<F: FnOnce()>(format: SimpleTextFormat, f: F) -> String {
        capture_at(Level::TRACE, format, f)
    }
}
