mod config;
mod coordinator;
mod error;
mod job_queue;
mod job_source;
mod logging;
mod stop_signal;
mod summary;
mod types;
mod worker;

use config::{DEFAULT_CONSUMERS, DEFAULT_DURATION_MS, DEFAULT_PRODUCERS, RunConfig};

fn print_usage(program: &str) {
    println!("Job Relay CLI");
    println!("Usage:");
    println!("  {program} [producers] [consumers] [duration_ms] [produce_interval_us]");
    println!("  {program} --help");
    println!();
    println!("Use \"-\" to keep the default for a position.");
    println!("Defaults:");
    println!(
        "  producers={DEFAULT_PRODUCERS} consumers={DEFAULT_CONSUMERS} duration_ms={DEFAULT_DURATION_MS} produce_interval_us=0"
    );
    println!("Logging:");
    println!("  RUST_LOG=job_relay=debug  show every push and pop");
}

fn exit_with_usage(program: &str, message: &str) -> ! {
    eprintln!("{message}");
    print_usage(program);
    std::process::exit(2);
}

fn main() {
    let program = std::env::args()
        .next()
        .unwrap_or_else(|| "job_relay".to_string());
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Some("--help" | "-h" | "help") = args.first().map(String::as_str) {
        print_usage(&program);
        return;
    }
    let config = match RunConfig::from_args(&args) {
        Ok(config) => config,
        Err(err) => exit_with_usage(&program, &err.to_string()),
    };

    logging::init();
    match coordinator::run(&config) {
        Ok(summary) => print!("{}", summary.render()),
        Err(err) => {
            eprintln!("run failed: {err}");
            std::process::exit(1);
        }
    }
}
