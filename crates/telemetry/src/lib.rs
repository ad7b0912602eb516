//! Tracing subscriber bootstrap shared by the server and the migration CLI.

use bookshelf_kernel::settings::{LogFormat, TelemetrySettings};
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Build the log filter: `RUST_LOG` wins, then the configured level, then `info`.
pub fn env_filter(settings: &TelemetrySettings) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Formatting layer for `format`, writing to `writer`.
pub fn fmt_layer<S, W>(format: &LogFormat, writer: W) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Pretty => fmt::layer().pretty().with_writer(writer).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
    }
}

/// Install the global subscriber. Calling it twice is an error.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(env_filter(settings))
        .with(fmt_layer(&settings.log_format, std::io::stdout))
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    tracing::debug!(
        target: "bookshelf-telemetry",
        format = ?settings.log_format,
        level = %settings.log_level,
        "tracing initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn render(format: LogFormat) -> String {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::registry().with(fmt_layer(&format, captured.clone()));
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(shelf = 3, "book shelved");
        });
        captured.text()
    }

    #[test]
    fn invalid_level_falls_back_to_info() {
        let settings = TelemetrySettings {
            log_level: "books=loudest".to_string(),
            log_format: LogFormat::Pretty,
        };
        if std::env::var("RUST_LOG").is_err() {
            assert_eq!(
                env_filter(&settings).max_level_hint(),
                Some(tracing::level_filters::LevelFilter::INFO)
            );
        }
    }

    #[test]
    fn pretty_format_prints_source_location() {
        let output = render(LogFormat::Pretty);
        assert!(output.contains("book shelved"));
        assert!(output.contains("lib.rs"), "{output}");
    }

    #[test]
    fn json_format_emits_structured_fields() {
        let output = render(LogFormat::Json);
        assert!(output.contains(r#""message":"book shelved""#), "{output}");
        assert!(output.contains(r#""shelf":3"#), "{output}");
    }

    #[test]
    fn second_init_is_rejected() {
        let settings = TelemetrySettings::default();
        let _ = init(&settings);
        assert!(init(&settings).is_err());
    }
}
