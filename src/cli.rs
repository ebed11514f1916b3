//! Command-line options shared by every binary.
//!
//! Every option is optional, and every binary runs its puzzle with the
//! default configuration when given no arguments.
use crate::Jitter;
use clap::{ArgGroup, Args, ColorChoice, CommandFactory, FromArgMatches, Parser};
use color_eyre::eyre::ensure;
use owo_colors::{style, Style};

/// Options accepted by every binary.
#[derive(Debug, Parser)]
#[command(version)]
pub struct Options {
    /// Log and color settings.
    #[clap(flatten)]
    pub output: OutputOptions,

    /// Settings for the simulation itself.
    #[clap(flatten)]
    pub run: RunOptions,
}

/// Options controlling log and summary output.
#[derive(Debug, Args)]
#[command(
    next_help_heading = "Output Options",
    group = ArgGroup::new("output-opts").multiple(true),
)]
pub struct OutputOptions {
    /// Whether to emit colors in output.
    #[clap(
        long,
        env = "CARGO_TERM_COLORS",
        default_value_t = ColorChoice::Auto,
        global = true,
        group = "output-opts",
    )]
    pub color: ColorChoice,

    /// Configures logging, using `RUST_LOG` filter syntax.
    #[clap(
        short,
        long,
        env = "RUST_LOG",
        default_value = "morel=info,warn",
        global = true,
        group = "output-opts",
    )]
    pub log: String,
}

/// Options that change how a simulation runs.
#[derive(Debug, Args)]
#[command(next_help_heading = "Simulation Options")]
pub struct RunOptions {
    /// Seed for the simulation's random choices.
    ///
    /// Runs with the same seed make the same choices, though their threads
    /// still interleave differently.
    /// Simulations that make no random choices refuse to run with a seed.
    #[clap(long, env = "MOREL_SEED")]
    pub seed: Option<u64>,

    /// How to perturb the timing of the simulation's threads.
    #[clap(long, env = "MOREL_JITTER", value_enum)]
    pub jitter: Option<JitterMode>,
}

/// A [`Jitter`] mode, as named on the command line.
#[derive(Copy, Clone, Debug, Eq, PartialEq, clap::ValueEnum)]
#[clap(rename_all = "lower")]
pub enum JitterMode {
    /// Don't perturb threads.
    Off,
    /// Yield a fixed number of times.
    Yield,
    /// Yield a random number of times.
    Random,
    /// Spin for a random number of backoff rounds.
    Spin,
}

// === impl Options ===

impl Options {
    /// Parses options from the process's arguments, exiting with a usage
    /// message if they are invalid.
    ///
    /// `name` and `about` describe the binary in `--help` output.
    #[must_use]
    pub fn parse_for(name: &'static str, about: &'static str) -> Self {
        let matches = Self::command().name(name).about(about).get_matches();
        Self::from_arg_matches(&matches).unwrap_or_else(|err| err.exit())
    }

    /// Installs `color-eyre`'s error and panic reports and the `tracing`
    /// subscriber.
    ///
    /// A panic on any thread aborts the process once it has been reported:
    /// inside a puzzle, a panic means a safety invariant was broken, and the
    /// other threads may be blocked waiting on the thread that panicked.
    ///
    /// # Errors
    ///
    /// If `color-eyre` or the subscriber could not be installed.
    pub fn init(&self) -> color_eyre::Result<()> {
        color_eyre::install()?;
        self.output.trace_init()?;

        let report = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            report(info);
            std::process::abort();
        }));
        Ok(())
    }
}

// === impl OutputOptions ===

impl OutputOptions {
    /// Returns `true` if output written to `stream` should be colored.
    #[must_use]
    pub fn colors(&self, stream: atty::Stream) -> bool {
        match self.color {
            ColorChoice::Auto => atty::is(stream),
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        }
    }

    /// The style for headings printed to stdout.
    #[must_use]
    pub fn heading(&self) -> Style {
        if self.colors(atty::Stream::Stdout) {
            style().bold()
        } else {
            style()
        }
    }
}

// === impl RunOptions ===

impl RunOptions {
    /// Fails if a seed was given to a simulation that makes no random choices.
    ///
    /// # Errors
    ///
    /// If `--seed` or `MOREL_SEED` was set.
    pub fn reject_seed(&self, name: &str) -> color_eyre::Result<()> {
        ensure!(
            self.seed.is_none(),
            "`{name}` makes no random choices, so `--seed` has no effect"
        );
        Ok(())
    }

    /// Returns the seed given on the command line, or `default`.
    #[must_use]
    pub fn seed_or(&self, default: u64) -> u64 {
        self.seed.unwrap_or(default)
    }

    /// Returns the jitter mode given on the command line, or `default`.
    #[must_use]
    pub fn jitter_or(&self, default: Jitter) -> Jitter {
        self.jitter.map_or(default, JitterMode::jitter)
    }
}

// === impl JitterMode ===

impl JitterMode {
    /// Returns the [`Jitter`] this mode selects.
    #[must_use]
    pub fn jitter(self) -> Jitter {
        match self {
            JitterMode::Off => Jitter::Off,
            JitterMode::Yield => Jitter::Yield(20),
            JitterMode::Random => Jitter::RandomYield { max: 20 },
            JitterMode::Spin => Jitter::Spin { max_exp: 8 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        Options::command().debug_assert();
    }

    #[test]
    fn simulation_options() {
        let options = Options::try_parse_from([
            "rendezvous",
            "--seed",
            "42",
            "--jitter",
            "random",
            "--color",
            "never",
        ])
        .expect("options parse");
        assert_eq!(options.run.seed_or(7), 42);
        assert_eq!(
            options.run.jitter_or(Jitter::Off),
            Jitter::RandomYield { max: 20 }
        );
        assert_eq!(options.output.color, ColorChoice::Never);
        assert!(!options.output.colors(atty::Stream::Stdout));
        assert_eq!(options.output.heading(), style());
    }

    #[test]
    fn seed_rejected_where_unused() {
        let seeded = Options::try_parse_from(["bounded-channel", "--seed", "3"])
            .expect("options parse");
        let err = seeded
            .run
            .reject_seed("bounded-channel")
            .expect_err("seed is rejected");
        assert!(err.to_string().contains("--seed"), "{err}");

        let unseeded = Options::try_parse_from(["bounded-channel", "--jitter", "off"])
            .expect("options parse");
        assert!(unseeded.run.reject_seed("bounded-channel").is_ok());
    }

    #[test]
    fn unknown_jitter_is_rejected() {
        assert!(Options::try_parse_from(["ordering", "--jitter", "sideways"]).is_err());
    }
}
