use backed_bloom_rs::{
    BitArrayBackend, BloomFilter, BloomFilterConfig, BloomFilterOps,
    BloomFilterStats, backing_file_len, common::bits2hr,
    common::bytes2hr,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Bloom filters stored in files.
///
/// Settings not given on the command line are read from the environment
/// (BLOOM_* variables, `.env` supported).
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Backing file of the filter
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    /// Memory-map the backing file instead of plain file I/O
    #[arg(long, global = true)]
    mmap: bool,

    /// Number of insertions the filter is sized for
    #[arg(short = 'n', long, global = true)]
    expected_insertions: Option<usize>,

    /// Target false positive probability (between 0 and 1)
    #[arg(short = 'p', long, global = true)]
    fpp: Option<f64>,

    /// Charset values are encoded with before hashing
    #[arg(long, global = true)]
    charset: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add values to the filter
    Add {
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Check whether values may be in the filter
    Check {
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Display information about the filter
    Info,

    /// Reset every bit of the filter (with confirmation)
    Clear {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = resolve_config(&cli, BloomFilterConfig::from_env_unvalidated()?)?;
    let backend = config.backend.clone();
    let mut filter = BloomFilter::<str>::new(config)?;

    let code = match &cli.command {
        Commands::Add { values } => {
            for value in values {
                if filter.add(value.as_str())? {
                    println!("added: {value}");
                } else {
                    println!("already present (probably): {value}");
                }
            }
            ExitCode::SUCCESS
        }
        Commands::Check { values } => {
            // exit status mirrors contains_all, like grep
            if check_values(&filter, values)? {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Commands::Info => {
            print_info(&filter, &backend)?;
            ExitCode::SUCCESS
        }
        Commands::Clear { force } => {
            if *force
                || confirm_action("Are you sure you want to clear the filter?")
            {
                filter.clear()?;
                println!("Filter cleared");
            } else {
                println!("Clear cancelled");
            }
            ExitCode::SUCCESS
        }
    };

    filter.close()?;
    info!(backend = backend.name(), "Filter closed");
    Ok(code)
}

/// Prints one line per value; true if every value is probably present.
fn check_values(
    filter: &BloomFilter<str>,
    values: &[String],
) -> Result<bool, Box<dyn std::error::Error>> {
    let mut all_present = true;
    for value in values {
        if filter.contains(value.as_str())? {
            println!("probably present: {value}");
        } else {
            println!("absent: {value}");
            all_present = false;
        }
    }
    Ok(all_present)
}

/// Applies command-line overrides on top of the environment settings, then
/// validates the result.
fn resolve_config(
    cli: &Cli,
    env: BloomFilterConfig,
) -> Result<BloomFilterConfig, Box<dyn std::error::Error>> {
    let mut config = env;

    if let Some(n) = cli.expected_insertions {
        config.expected_insertions = n;
    }
    if let Some(p) = cli.fpp {
        config.false_positive_probability = p;
    }
    if let Some(name) = &cli.charset {
        config.charset = name.parse()?;
    }

    let env_path = match &config.backend {
        BitArrayBackend::FileBacked(path) | BitArrayBackend::MemoryMapped(path) => {
            Some(path.clone())
        }
        BitArrayBackend::InMemory => None,
    };
    let path = cli.file.clone().or(env_path).ok_or(
        "a backing file is required: pass --file or set BLOOM_BACKEND and BLOOM_FILE_PATH",
    )?;

    let mmap = cli.mmap
        || (cli.file.is_none()
            && matches!(config.backend, BitArrayBackend::MemoryMapped(_)));
    config.backend = if mmap {
        BitArrayBackend::MemoryMapped(path)
    } else {
        BitArrayBackend::FileBacked(path)
    };

    config.validate()?;

    Ok(config)
}

fn print_info(
    filter: &BloomFilter<str>,
    backend: &BitArrayBackend,
) -> Result<(), Box<dyn std::error::Error>> {
    let bits = filter.number_of_bits();
    let set = filter.bit_array().count_ones()?;
    let approx = filter.approximate_count()?;

    println!("Bloom Filter Configuration:");
    if let BitArrayBackend::FileBacked(path) | BitArrayBackend::MemoryMapped(path) =
        backend
    {
        println!("  Backing file: {}", path.display());
        println!("  File size: {}", bytes2hr(backing_file_len(bits)));
    }
    println!("  Backend: {}", backend.name());
    println!("  Expected insertions: {}", filter.expected_insertions());
    println!("  Charset: {}", filter.charset());
    println!("  Bit vector size: {bits} ({})", bits2hr(bits));
    println!("  Number of hash functions: {}", filter.number_of_hashes());

    println!("\nCurrent State:");
    println!(
        "  Bits set: {set} ({:.2}%)",
        set as f64 * 100.0 / bits as f64
    );
    println!("  Approximate insertions: {approx}");
    println!(
        "  Estimated false positive probability: {:.6}",
        filter.false_positive_probability(approx)
    );
    Ok(())
}

fn confirm_action(prompt: &str) -> bool {
    use std::io::{self, Write};

    print!("{prompt} [y/N]: ");
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return false;
    }

    input.trim().to_lowercase() == "y"
}
