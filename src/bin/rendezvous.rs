use color_eyre::Result;
use morel::{
    cli::Options,
    rendezvous::{self, Config},
};
use owo_colors::OwoColorize;

fn main() -> Result<()> {
    let options = Options::parse_for(
        env!("CARGO_BIN_NAME"),
        "A dispenser and three consumers that each need two of three resources.",
    );
    options.init()?;

    let defaults = Config::default();
    let config = Config {
        seed: options.run.seed_or(defaults.seed),
        jitter: options.run.jitter_or(defaults.jitter),
        ..defaults
    };
    let summary = rendezvous::run(&config);

    let heading = options.output.heading();
    println!("{}", "resource rendezvous".style(heading));
    println!("{summary}");
    summary.verify(config.rounds)?;
    Ok(())
}
