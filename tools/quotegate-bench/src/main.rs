//! Measures how solve time scales with difficulty, to sanity-check the
//! difficulty curve against real hardware.

use std::time::Instant;

use anyhow::Result;
use clap::Parser;

use quotegate_pow::Challenge;

#[derive(Debug, Parser)]
#[command(name = "quotegate-bench")]
struct Args {
    /// First difficulty level to sample.
    #[arg(long, default_value_t = 1)]
    start: i32,

    /// Last difficulty level to sample.
    #[arg(long, default_value_t = 24)]
    max: i32,

    /// Challenges solved per level.
    #[arg(long, default_value_t = 5)]
    samples: u32,
}

fn main() -> Result<()> {
    let args = Args::parse();

    for difficulty in args.start..=args.max {
        println!("difficulty {difficulty}");
        for _ in 0..args.samples {
            let challenge = Challenge::generate(difficulty)?;
            let clock = Instant::now();
            let nonce = challenge.solve()?;
            let elapsed = clock.elapsed();
            challenge.verify(&nonce)?;
            println!("  solved in {elapsed:?} ({}-byte nonce)", nonce.len());
        }
    }

    Ok(())
}
