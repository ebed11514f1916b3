use color_eyre::Result;
use morel::{
    cli::Options,
    fair_room::{self, Config},
};
use owo_colors::OwoColorize;

fn main() -> Result<()> {
    let options = Options::parse_for(
        env!("CARGO_BIN_NAME"),
        "Two sides sharing a room of bounded capacity, without starving either side.",
    );
    options.init()?;

    let defaults = Config::default();
    let config = Config {
        seed: options.run.seed_or(defaults.seed),
        jitter: options.run.jitter_or(defaults.jitter),
        ..defaults
    };
    let summary = fair_room::run(&config)?;

    let heading = options.output.heading();
    println!("{}", "fair room".style(heading));
    println!("{summary}");
    summary.verify()?;
    Ok(())
}
