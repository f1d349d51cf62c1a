//! evmatch CLI: run a matching job or inspect a chunk container.

use clap::{Parser, Subcommand};
use evmatch_core::config::MatchConfig;
use evmatch_engine::Engine;
use evmatch_io::container;
use evmatch_io::FsStorage;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "evmatch")]
#[command(about = "One-pass key-based matcher for ordered chunked event datasets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match two datasets and write merged output segments
    Run {
        /// File listing dataset A's chunk paths, one per line
        #[arg(long)]
        filelist_a: Option<String>,

        /// File listing dataset B's chunk paths, one per line
        #[arg(long)]
        filelist_b: Option<String>,

        /// Field-name prefix for dataset A (e.g. "ZB.")
        #[arg(long)]
        prefix_a: Option<String>,

        /// Field-name prefix for dataset B (e.g. "AlCa.")
        #[arg(long)]
        prefix_b: Option<String>,

        /// Output directory for merged segments
        #[arg(long)]
        out_dir: Option<String>,

        /// Filename prefix for output segments
        #[arg(long)]
        out_prefix: Option<String>,

        /// Segment rotation bound in bytes (pre-serialization)
        #[arg(long)]
        max_segment_bytes: Option<u64>,

        /// Verbosity 0-3
        #[arg(short, long)]
        verbose: Option<u8>,

        /// Progress-print frequency as a percent of the driving dataset
        #[arg(long)]
        print_every_percent: Option<f64>,
    },

    /// Print a container's header and schema
    Inspect {
        /// Path to a .evc container
        path: String,

        /// Also list per-field details from the schema
        #[arg(long)]
        fields: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            filelist_a,
            filelist_b,
            prefix_a,
            prefix_b,
            out_dir,
            out_prefix,
            max_segment_bytes,
            verbose,
            print_every_percent,
        } => {
            let mut config = MatchConfig::from_env();
            if let Some(v) = filelist_a {
                config.filelist_a = v;
            }
            if let Some(v) = filelist_b {
                config.filelist_b = v;
            }
            if let Some(v) = prefix_a {
                config.prefix_a = v;
            }
            if let Some(v) = prefix_b {
                config.prefix_b = v;
            }
            if let Some(v) = out_dir {
                config.out_dir = v;
            }
            if let Some(v) = out_prefix {
                config.out_prefix = v;
            }
            if let Some(v) = max_segment_bytes {
                config.max_segment_bytes = v;
            }
            if let Some(v) = verbose {
                config.verbose = v.min(3);
            }
            if let Some(v) = print_every_percent {
                config.print_every_percent = v;
            }

            init_tracing(config.verbose);
            if let Err(e) = run_match(config) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Inspect { path, fields } => {
            init_tracing(0);
            if let Err(e) = inspect_container(&path, fields) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("evmatch={default}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run_match(config: MatchConfig) -> Result<(), Box<dyn std::error::Error>> {
    let engine = Engine::new(config);
    let summary = engine.run()?;

    println!("✓ Matching complete");
    println!("  Run id:    {}", summary.id.0);
    println!("  Processed: {}", summary.processed);
    println!(
        "  Matched:   {} ({:.3}% of A, {:.3}% of B)",
        summary.matched,
        summary.match_rate_a(),
        summary.match_rate_b()
    );
    println!("  Segments:  {}", summary.segments_written);
    println!(
        "  Duration:  {}ms",
        summary.finished_ms.saturating_sub(summary.started_ms)
    );

    Ok(())
}

fn inspect_container(path: &str, fields: bool) -> Result<(), Box<dyn std::error::Error>> {
    let storage = FsStorage::new();
    let header = container::read_header(&storage, path)?;

    println!("Container: {}", path);
    println!("  Version:  {}", container::VERSION);
    println!("  Records:  {}", header.n_records);
    println!("  Schema:   {} bytes", header.schema_len);
    println!("  Payload:  {} bytes", header.payload_len);

    if fields {
        let (schema, _) = container::read(&storage, path)?;
        println!("  Fields ({}):", schema.fields.len());
        for field in &schema.fields {
            let shape = match field.counter.as_deref() {
                Some(counter) => format!("[{counter}]"),
                None => String::new(),
            };
            let max = schema
                .counter_max
                .get(&field.name)
                .map(|m| format!(" (counts up to {m})"))
                .unwrap_or_default();
            println!("    {}{} {:?}{}", field.name, shape, field.kind, max);
        }
    }

    Ok(())
}
