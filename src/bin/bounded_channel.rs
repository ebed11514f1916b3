use color_eyre::Result;
use morel::{
    bounded_channel::{self, Config},
    cli::Options,
};
use owo_colors::OwoColorize;

fn main() -> Result<()> {
    let options = Options::parse_for(
        env!("CARGO_BIN_NAME"),
        "Producers and consumers sharing a bounded channel, coordinated with semaphores.",
    );
    options.init()?;
    options.run.reject_seed(env!("CARGO_BIN_NAME"))?;

    let defaults = Config::default();
    let config = Config {
        jitter: options.run.jitter_or(defaults.jitter),
        ..defaults
    };
    let summary = bounded_channel::run(&config)?;

    let heading = options.output.heading();
    println!("{}", "bounded channel".style(heading));
    println!("{summary}");
    summary.verify(config.operations())?;
    Ok(())
}
