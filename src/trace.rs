//! Log output for the binaries.
//!
//! Events are written to stderr, one per line, with a colored level tag, the
//! event's fields, and the chain of spans it occurred in. Since every puzzle
//! thread runs inside a `thread` span carrying its role, the span chain says
//! which thread an event came from.
use crate::cli::OutputOptions;
use owo_colors::{style, OwoColorize, Style};
use std::fmt;
use tracing::{field::Field, Event, Level, Subscriber};
use tracing_subscriber::{
    field::Visit,
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields, FormattedFields},
    registry::LookupSpan,
};

impl OutputOptions {
    /// Installs a `tracing` subscriber that writes to stderr, filtered by
    /// [`OutputOptions::log`], with [`tracing_error::ErrorLayer`] capturing
    /// span traces for error reports.
    ///
    /// # Errors
    ///
    /// If the log filter does not parse, or a subscriber is already set.
    pub fn trace_init(&self) -> color_eyre::Result<()> {
        use tracing_subscriber::prelude::*;
        let fmt = tracing_subscriber::fmt::layer()
            .event_format(EventFormatter {
                styles: Styles::new(self.colors(atty::Stream::Stderr)),
            })
            .with_writer(std::io::stderr);

        tracing_subscriber::registry()
            .with(fmt)
            .with(tracing_error::ErrorLayer::default())
            .with(self.log.parse::<tracing_subscriber::EnvFilter>()?)
            .try_init()?;
        Ok(())
    }
}

#[derive(Debug)]
struct EventFormatter {
    styles: Styles,
}

struct Visitor<'styles, 'writer> {
    writer: Writer<'writer>,
    is_empty: bool,
    styles: &'styles Styles,
}

#[derive(Debug)]
struct Styles {
    error: Style,
    warn: Style,
    info: Style,
    debug: Style,
    trace: Style,
    pipes: Style,
    bold: Style,
}

impl<S, N> FormatEvent<S, N> for EventFormatter
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
        let (tag, tag_style) = match *event.metadata().level() {
            Level::ERROR => ("error", self.styles.error),
            Level::WARN => ("warning", self.styles.warn),
            Level::INFO => ("info", self.styles.info),
            Level::DEBUG => ("debug", self.styles.debug),
            Level::TRACE => ("trace", self.styles.trace),
        };
        write!(
            writer,
            "{:>7}{} ",
            tag.style(tag_style),
            ":".style(self.styles.bold)
        )?;

        event.record(&mut Visitor {
            writer: writer.by_ref(),
            is_empty: true,
            styles: &self.styles,
        });

        let mut first = true;
        ctx.visit_spans(|span| {
            let sep = if first { " " } else { ":" };
            first = false;
            let exts = span.extensions();
            let fields = exts
                .get::<FormattedFields<N>>()
                .map(|f| f.fields.as_str())
                .unwrap_or("");
            write!(writer, "{}{}", sep.style(self.styles.pipes), span.name())?;
            if !fields.is_empty() {
                write!(
                    writer,
                    "{}{fields}{}",
                    "{".style(self.styles.pipes),
                    "}".style(self.styles.pipes)
                )?;
            }
            Ok(())
        })?;

        writer.write_char('\n')
    }
}

// === impl Visitor ===

impl Visitor<'_, '_> {
    const MESSAGE: &'static str = "message";
}

impl Visit for Visitor<'_, '_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if !self.is_empty {
            let _ = self.writer.write_str(", ");
        }

        if field.name() == Self::MESSAGE {
            let _ = write!(self.writer, "{:?}", value.style(self.styles.bold));
        } else {
            let _ = write!(
                self.writer,
                "{}{} {:?}",
                field.name().style(self.styles.bold),
                ":".style(self.styles.bold),
                value
            );
        }

        self.is_empty = false;
    }
}

// === impl Styles ===

impl Styles {
    fn new(colors: bool) -> Self {
        if !colors {
            return Self {
                error: style(),
                warn: style(),
                info: style(),
                debug: style(),
                trace: style(),
                pipes: style(),
                bold: style(),
            };
        }
        Self {
            error: style().red().bold(),
            warn: style().yellow().bold(),
            info: style().green().bold(),
            debug: style().blue().bold(),
            trace: style().purple().bold(),
            pipes: style().blue().bold(),
            bold: style().bold(),
        }
    }
}
