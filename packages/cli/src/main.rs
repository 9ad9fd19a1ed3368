use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use zoneview_comm::LocalConfig;

/// zoneview - run runtime views over an in-process cluster
#[derive(Parser, Debug)]
#[command(name = "zoneview")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of participants (overrides the config file)
    #[arg(short, long)]
    participants: Option<usize>,

    /// Memory per participant in bytes (overrides the config file)
    #[arg(short, long)]
    memory: Option<u64>,

    /// Cluster configuration as JSON
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug diagnostics
    #[arg(short, long)]
    verbose: bool,

    /// Arguments passed through to the runtime
    #[arg(last = true)]
    runtime_args: Vec<String>,
}

fn load_config(args: &Args) -> Result<LocalConfig, zoneview_comm::CommError> {
    let mut config = match &args.config {
        Some(path) => LocalConfig::from_file(path)?,
        None => LocalConfig::default(),
    };
    if let Some(participants) = args.participants {
        config.participants = participants;
    }
    if let Some(memory) = args.memory {
        config.memory_per_participant = memory;
    }
    Ok(config)
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match zoneview_cli::run(config, &args.runtime_args) {
        Ok(summary) if args.json => match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        Ok(summary) => {
            println!("participants: {}", summary.participants);
            println!("rank sum:     {}", summary.rank_sum);
            for (rank, (memory, label)) in summary.memory.iter().zip(&summary.labels).enumerate() {
                println!("  [{}] {:<10} {} bytes", rank, label, memory);
            }
            println!("like root:    {}", summary.like_root);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
