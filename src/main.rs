use anyhow::Result;
use clap::Parser;

use microtraffic::simulation::Simulation;

#[derive(Parser)]
#[command(name = "microtraffic")]
#[command(about = "Microscopic traffic simulation over a four-way stop")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "12000")]
    ticks: u64,

    /// Time delta per tick in seconds
    #[arg(long, default_value = "0.01")]
    delta: f64,

    /// Vehicles per minute per approach
    #[arg(long, default_value = "20.0")]
    rate: f64,

    /// RNG seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    anyhow::ensure!(cli.delta > 0.0, "delta must be positive");

    println!("Running traffic simulation in headless mode...");
    println!("Ticks: {}, Delta: {}s, Rate: {}/min", cli.ticks, cli.delta, cli.rate);
    println!();

    let mut sim = Simulation::demo_crossroads(cli.rate, cli.seed)?;
    sim.dt = cli.delta;

    println!("Initial state:");
    sim.print_summary();
    println!();

    // Print a summary after every simulated second
    let ticks_per_second = (1.0 / cli.delta).ceil() as u64;
    let mut tick = 0;
    while tick < cli.ticks {
        let ticks_to_run = ticks_per_second.min(cli.ticks - tick);
        sim.run(ticks_to_run);
        tick += ticks_to_run;

        println!(
            "--- After tick {} ({:.1}s simulated time) ---",
            tick,
            tick as f64 * cli.delta
        );
        sim.print_summary();
        println!();
    }

    println!("=== Final State ===");
    sim.print_summary();
    Ok(())
}
