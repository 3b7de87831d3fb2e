//! Logging initialization: file, stderr or nowhere, never stdout.
//!
//! Reads `RUST_LOG` (level) and `LOG_FILE` (path) from env (e.g. via .env).
//! When `LOG_FILE` is set, logs are appended to that file. Otherwise `--verbose`
//! sends them to stderr; without it they are dropped so stdout only carries the
//! report and chat replies.

use std::io::Write;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::log_format::TextWithSpanPath;

const DEFAULT_FILTER: &str = "info,hyper_util=off,reqwest=warn";

/// Initializes tracing.
///
/// - **RUST_LOG**: Log level filter, e.g. `info`, `strategist=debug`. Default: `info`.
/// - **LOG_FILE**: When set, logs are appended to this file (plain text, no ANSI).
pub fn init(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER));

    if let Ok(path) = std::env::var("LOG_FILE") {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        let writer = std::sync::Mutex::new(StripAnsiWriter::new(file));
        let file_layer = tracing_subscriber::fmt::layer()
            .event_format(TextWithSpanPath::new())
            .with_writer(writer)
            .with_ansi(false)
            .with_filter(filter);
        tracing_subscriber::registry().with(file_layer).init();
        tracing::info!(path = %path, "strategist logging to file");
    } else if verbose {
        let stderr_layer = tracing_subscriber::fmt::layer()
            .event_format(TextWithSpanPath::new())
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_filter(filter);
        tracing_subscriber::registry().with(stderr_layer).init();
    } else {
        let sink_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::sink)
            .with_filter(filter);
        tracing_subscriber::registry().with(sink_layer).init();
    }
    Ok(())
}

/// Strips ANSI escape sequences so file logs are plain text, including escapes
/// carried inside logged field values such as model output.
struct StripAnsiWriter<W> {
    inner: W,
    state: Vec<u8>,
}

impl<W: Write> StripAnsiWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            state: Vec::with_capacity(16),
        }
    }

    fn flush_state(&mut self) -> std::io::Result<()> {
        self.inner.write_all(&self.state)?;
        self.state.clear();
        Ok(())
    }
}

impl<W: Write> Write for StripAnsiWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut rest = buf;
        while let Some((&b, tail)) = rest.split_first() {
            match self.state.len() {
                0 => match rest.iter().position(|&c| c == 0x1b) {
                    Some(i) => {
                        self.inner.write_all(&rest[..i])?;
                        self.state.push(0x1b);
                        rest = &rest[i + 1..];
                        continue;
                    }
                    None => {
                        self.inner.write_all(rest)?;
                        break;
                    }
                },
                1 => {
                    self.state.push(b);
                    if b != b'[' {
                        self.flush_state()?;
                    }
                }
                _ => {
                    if (0x40..=0x7e).contains(&b) {
                        // final byte of a CSI sequence
                        self.state.clear();
                    } else if b.is_ascii_digit() || matches!(b, b';' | b'?' | b':') {
                        self.state.push(b);
                        if self.state.len() > 64 {
                            self.flush_state()?;
                        }
                    } else {
                        self.flush_state()?;
                        self.inner.write_all(&[b])?;
                    }
                }
            }
            rest = tail;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if !self.state.is_empty() {
            self.flush_state()?;
        }
        self.inner.flush()
    }
}
