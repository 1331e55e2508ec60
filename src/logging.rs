use colored::*;
use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

/// A tracing event formatter that colours each line by level.
///
/// Lines are prefixed with the level and the event target, e.g.
/// `DEBUG sysv_mq::queue: Opened message queue key=0x12345 id=3 ...`,
/// so queue traffic can be told apart from application output.
pub struct ColorizedFormatter;

impl<S, N> FormatEvent<S, N> for ColorizedFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        // Buffer the fields so the whole line can be coloured at once.
        let mut buffer = String::new();
        let mut buf_writer = Writer::new(&mut buffer);
        ctx.format_fields(buf_writer.by_ref(), event)?;

        let metadata = event.metadata();
        let line = format!("{:>5} {}: {}", metadata.level(), metadata.target(), buffer);
        let colored_output = match *metadata.level() {
            Level::INFO => line.white(),
            Level::WARN => line.yellow(),
            Level::ERROR => line.red(),
            Level::DEBUG => line.blue(),
            Level::TRACE => line.purple(),
        };

        writeln!(writer, "{}", colored_output)
    }
}

/// Install a global subscriber using [`ColorizedFormatter`].
///
/// `RUST_LOG` takes precedence; otherwise `default_directive` (e.g.
/// `"sysv_mq=debug"`) is used. Returns `false` if a global subscriber was
/// already installed, so tests can call it repeatedly.
pub fn init(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .event_format(ColorizedFormatter)
        .try_init()
        .is_ok()
}
