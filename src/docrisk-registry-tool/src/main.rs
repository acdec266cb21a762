//! docrisk-registry - administrative tool for the broker registry.
//!
//! Ingestion is the only write path. Assessments open the registry
//! read-only, so an import never exposes a half-written table to them.
//!
//! ## Usage
//!
//! ```bash
//! # Import the regulator's spreadsheet into a SQLite registry
//! # (first two columns: name, registration number; schema created if missing)
//! docrisk-registry import --input Registered_stock_brokers_in_equity.xlsx --db registry.sqlite
//!
//! # CSV exports and JSON arrays are accepted too
//! docrisk-registry import --input brokers.csv --db registry.sqlite
//!
//! # Export the SQLite registry back to JSON
//! docrisk-registry export --db registry.sqlite --output brokers.json
//!
//! # Check a (name, registration number) pair
//! docrisk-registry lookup --registry registry.sqlite \
//!     --name "ALPHA SECURITIES" --registration-number INZ00000101
//!
//! # Summary counts
//! docrisk-registry stats --registry brokers.json
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use docrisk_registry::{
    load_registry, read_source_records, write_json_records, BrokerLookup, MatchPolicy,
    RegistryFormat, SqliteStore,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Broker registry administration.
///
/// Imports, exports, and queries the registry consumed by `docrisk assess`.
#[derive(Parser)]
#[command(name = "docrisk-registry")]
#[command(version = VERSION)]
#[command(about = "Broker registry administration for docrisk")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a broker list into a SQLite registry
    Import {
        /// Spreadsheet (.xlsx, .xls, .ods, .csv; name and registration
        /// number in the first two columns) or JSON array of records
        #[arg(short, long)]
        input: PathBuf,

        /// SQLite registry (created if missing)
        #[arg(long)]
        db: PathBuf,
    },

    /// Export a SQLite registry as JSON
    Export {
        /// SQLite registry
        #[arg(long)]
        db: PathBuf,

        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Look up a broker by name, or by (name, registration number)
    Lookup {
        /// Registry (.json or SQLite)
        #[arg(short, long)]
        registry: PathBuf,

        /// Broker name
        #[arg(short, long)]
        name: String,

        /// Registration number; when given, the exact pair is checked
        #[arg(long)]
        registration_number: Option<String>,

        /// Ignore case when comparing
        #[arg(long)]
        case_insensitive: bool,
    },

    /// Print registry counts
    Stats {
        /// Registry (.json or SQLite)
        #[arg(short, long)]
        registry: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Import { input, db } => {
            eprintln!("Importing broker list...");
            eprintln!("  Input: {}", input.display());
            eprintln!("  Registry: {}", db.display());

            let records = read_source_records(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let mut store =
                SqliteStore::open(&db).with_context(|| format!("opening {}", db.display()))?;
            let summary = store.import(&records)?;

            println!("inserted: {}", summary.inserted);
            println!("ignored: {}", summary.ignored);
        },

        Commands::Export { db, output } => {
            let store = SqliteStore::open_read_only(&db)
                .with_context(|| format!("opening {}", db.display()))?;
            let records = store.records()?;

            if let Some(output_path) = output {
                write_json_records(&output_path, &records)?;
                eprintln!("Exported {} brokers to {}", records.len(), output_path.display());
            } else {
                println!("{}", serde_json::to_string_pretty(&records)?);
            }
        },

        Commands::Lookup {
            registry,
            name,
            registration_number,
            case_insensitive,
        } => {
            let policy = if case_insensitive {
                MatchPolicy::CaseInsensitive
            } else {
                MatchPolicy::Exact
            };
            let snapshot = load_registry(&registry, policy)
                .with_context(|| format!("loading {}", registry.display()))?;

            let found = match &registration_number {
                Some(number) => snapshot.contains_pair(&name, number),
                None => snapshot.contains_name(&name),
            };

            if found {
                println!("found");
            } else {
                println!("not found");
                std::process::exit(1);
            }
        },

        Commands::Stats { registry } => {
            let format = RegistryFormat::detect(&registry)?;
            let snapshot = load_registry(&registry, MatchPolicy::Exact)
                .with_context(|| format!("loading {}", registry.display()))?;

            println!("Registry: {}", registry.display());
            println!("  Format:         {:?}", format);
            println!("  Brokers:        {}", snapshot.len());
            println!("  Distinct names: {}", snapshot.distinct_names());
        },
    }

    Ok(())
}
