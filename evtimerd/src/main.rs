//! # Event Timer Host Daemon
//!
//! Main entry point: prints the consumers' message stream to stdout.

use evtimerd::{CliArgs, CliCommand, HostRuntime};
use std::env;
use std::io;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("evtimerd");

    let cli = match CliArgs::parse(&args) {
        Ok(CliCommand::Run(cli)) => cli,
        Ok(CliCommand::Help) => {
            print_usage(program);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage(program);
            process::exit(1);
        }
    };

    let config = cli.into_config().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        process::exit(1);
    });

    let mut runtime = HostRuntime::new(config).unwrap_or_else(|e| {
        eprintln!("Failed to create runtime: {}", e);
        process::exit(1);
    });

    let stdout = io::stdout();
    if let Err(e) = runtime.run(&mut stdout.lock()) {
        eprintln!("Runtime error: {}", e);
        process::exit(1);
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} [OPTIONS]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --config <FILE>      JSON configuration file");
    eprintln!("  --consumers <N>          Periodic consumers (default 8)");
    eprintln!("  --period <TICKS>         Period shared by all consumers");
    eprintln!("  --bits <N>               Simulated counter width, 2..=32");
    eprintln!("  --start <TICK>           Counter value at start");
    eprintln!("  -n, --iterations <N>     Message groups to print (0 = forever)");
    eprintln!("  --arm-latency <TICKS>    Ticks lost writing the compare");
    eprintln!("  --dispatch-cost <TICKS>  Ticks each delivery takes");
    eprintln!("  -h, --help               Show this help message");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} --iterations 16", program);
    eprintln!("  RUST_LOG=evtimer=debug {} --bits 8 --arm-latency 3", program);
}
