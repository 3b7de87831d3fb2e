//! Custom event formatter that prefixes each log line with the span path and trace id (plain text).
//!
//! Used by `logging::init()` so lines from one analysis run or chat turn can be
//! grouped. Interacts with: `tracing_subscriber::fmt::Layer`, `FmtContext`, `FormatEvent`.

use std::fmt;

use tracing_core::Subscriber;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};
use tracing_subscriber::fmt::{FmtContext, FormattedFields};
use tracing_subscriber::registry::LookupSpan;

/// Plain-text formatter.
///
/// Output format: `TIMESTAMP trace_id=X analysis{run_id=..}:chat_turn{turn=2}: LEVEL target: fields`
/// when the event is inside a span; otherwise `TIMESTAMP LEVEL target: fields`.
/// `trace_id` is the id of the root span.
pub struct TextWithSpanPath {
    timer: SystemTime,
    with_target: bool,
}

impl Default for TextWithSpanPath {
    fn default() -> Self {
        Self {
            timer: SystemTime,
            with_target: true,
        }
    }
}

impl TextWithSpanPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable target (module path) in the output.
    #[cfg(test)]
    pub fn with_target(mut self, on: bool) -> Self {
        self.with_target = on;
        self
    }
}

impl<S, N> FormatEvent<S, N> for TextWithSpanPath
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing_core::Event<'_>,
    ) -> fmt::Result {
        self.timer.format_time(&mut writer)?;
        if let Some(scope) = ctx.event_scope() {
            let spans: Vec<_> = scope.from_root().collect();
            if let Some(root) = spans.first() {
                write!(writer, " trace_id={}", root.id().into_u64())?;
            }
            write!(writer, " ")?;
            for span in &spans {
                write!(writer, "{}", span.name())?;
                let ext = span.extensions();
                if let Some(fields) = ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{}}}", fields)?;
                    }
                }
                write!(writer, ":")?;
            }
        }

        write!(writer, " {}", event.metadata().level())?;
        if self.with_target {
            write!(writer, " {}:", event.metadata().target())?;
        }
        write!(writer, " ")?;

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Clone)]
    struct VecWriter(Arc<Mutex<Vec<u8>>>);

    impl Write for VecWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn capture(formatter: TextWithSpanPath, f: impl FnOnce()) -> String {
        let sink = Arc::new(Mutex::new(Vec::<u8>::new()));
        let writer = {
            let sink = Arc::clone(&sink);
            move || VecWriter(Arc::clone(&sink))
        };
        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .event_format(formatter)
                .with_writer(writer)
                .with_ansi(false),
        );
        tracing::subscriber::with_default(subscriber, f);
        let bytes = sink.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn event_inside_spans_has_path_and_trace_id() {
        let output = capture(TextWithSpanPath::new(), || {
            let outer = tracing::info_span!("analysis", run_id = "r1");
            let _outer = outer.enter();
            let inner = tracing::info_span!("chat_turn", turn = 2);
            let _inner = inner.enter();
            tracing::info!(k = "v", "hello");
        });
        assert!(output.contains("trace_id="), "{output}");
        assert!(output.contains("analysis{run_id=\"r1\"}:chat_turn{turn=2}:"), "{output}");
        assert!(output.contains("INFO"));
        assert!(output.contains("hello"));
        assert!(output.contains("k=\"v\""));
    }

    #[test]
    fn event_outside_spans_has_no_trace_id() {
        let output = capture(TextWithSpanPath::new().with_target(false), || {
            tracing::warn!("plain");
        });
        assert!(!output.contains("trace_id="));
        assert!(output.contains("WARN plain"), "{output}");
    }
}
