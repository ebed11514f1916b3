use color_eyre::Result;
use morel::{cli::Options, ordering, Jitter};
use owo_colors::OwoColorize;

const BARRIER_THREADS: usize = 3;

fn main() -> Result<()> {
    let options = Options::parse_for(
        env!("CARGO_BIN_NAME"),
        "Threads printing in a fixed order: a barrier, then a chain.",
    );
    options.init()?;
    options.run.reject_seed(env!("CARGO_BIN_NAME"))?;
    let jitter = options.run.jitter_or(Jitter::Off);
    let heading = options.output.heading();

    println!("{}", "barrier".style(heading));
    for line in ordering::barrier(BARRIER_THREADS, &jitter) {
        println!("{line}");
    }
    println!("------");

    println!("{}", "chain".style(heading));
    for line in ordering::chain(&jitter) {
        println!("{line}");
    }
    Ok(())
}
