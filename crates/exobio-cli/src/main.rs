mod analyser;
mod finder;
mod journal;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use exobio_core::{CacheConfig, EdsmClient, EdsmConfig, SystemCache};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "exobio", version, about = "Exobiology survey planning over the EDSM catalog")]
struct Cli {
    /// Directory for the persistent system caches
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory holding the commander's Journal*.log files
    #[arg(long, global = true)]
    journal_dir: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Survey a cube of space for systems of the given mass codes
    FindSystems {
        /// Central system name
        #[arg(short, long)]
        system: String,

        /// Cube edge size in light-years
        #[arg(long, default_value_t = 100.0)]
        size: f64,

        /// Mass code letters to keep, e.g. --mass-codes g,h
        #[arg(short = 'm', long = "mass-codes", value_delimiter = ',', required = true)]
        mass_codes: Vec<String>,
    },

    /// Report every analysed species and where it was found
    Findings,

    /// Cluster systems holding valuable scans into revisit clumps
    Clumps {
        /// Minimum species value in millions of credits
        #[arg(long, default_value_t = 1.0)]
        min_value: f64,

        /// Maximum linking distance between systems in light-years
        #[arg(long, default_value_t = 100.0)]
        max_distance: f64,
    },
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("exobio={default_level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn open_cache(data_dir: &Option<PathBuf>, mode: &str) -> Result<SystemCache> {
    let config = match data_dir {
        Some(dir) => CacheConfig::for_mode_in(dir.clone(), mode),
        None => CacheConfig::for_mode(mode),
    };
    let catalog = Arc::new(EdsmClient::new(&EdsmConfig::default()));
    SystemCache::open(catalog, &config).context("opening the system cache")
}

fn read_journals(journal_dir: &Option<PathBuf>) -> Result<Vec<journal::JournalEntry>> {
    let dir = match journal_dir {
        Some(dir) => dir.clone(),
        None => match journal::default_journal_dir() {
            Some(dir) => dir,
            None => bail!("no journal directory given and no default could be determined"),
        },
    };
    if !dir.is_dir() {
        bail!("journal directory {} does not exist", dir.display());
    }
    journal::read_entries(&dir)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::FindSystems {
            system,
            size,
            mass_codes,
        } => {
            let mut cache = open_cache(&cli.data_dir, "finder")?;
            finder::find_mass_code_systems_in_cube(&mut cache, system, *size, mass_codes).await
        }

        Commands::Findings => {
            let entries = read_journals(&cli.journal_dir)?;
            let mut cache = open_cache(&cli.data_dir, "hunt")?;
            analyser::findings_report(&mut cache, &entries).await
        }

        Commands::Clumps {
            min_value,
            max_distance,
        } => {
            let entries = read_journals(&cli.journal_dir)?;
            let mut cache = open_cache(&cli.data_dir, "hunt")?;
            analyser::clump_report(&mut cache, &entries, *min_value, *max_distance).await
        }
    }
}
