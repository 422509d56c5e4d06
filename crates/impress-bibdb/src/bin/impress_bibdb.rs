//! impress-bibdb command line
//!
//! Check, format and query BibTeX files.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use impress_bibdb::{split_name, BibConfig, Database};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to <config dir>/impress-bibdb/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a file and report load errors, crossref warnings and validation
    Check {
        file: PathBuf,
    },
    /// Reformat a file
    Format {
        file: PathBuf,
        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Order entries by sort key
        #[arg(long)]
        sort: bool,
    },
    /// Split a personal name into its parts
    Name {
        text: String,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a field of an entry, following crossrefs
    Resolve {
        file: PathBuf,
        key: String,
        field: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<BibConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => BibConfig::load(path)?,
        None => BibConfig::load_default()?,
    };
    Ok(config)
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Check { file } => {
            let mut db = Database::open(&file, &config)?;
            let mut failed = false;

            if let Some(err) = db.error() {
                println!("{}: load stopped: {}", file.display(), err);
                failed = true;
            }
            for warning in db.warnings() {
                println!("{}: warning: {}", file.display(), warning);
            }

            let invalid = db.validate_all();
            for entry in db.records() {
                for message in entry.validation_messages() {
                    println!(
                        "{}:{}: {}: {}",
                        file.display(),
                        entry.line(),
                        entry.key().unwrap_or_default(),
                        message
                    );
                }
            }

            println!("{} entries, {} invalid", db.records().count(), invalid);
            Ok(if failed || invalid > 0 {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Commands::Format { file, output, sort } => {
            let mut db = Database::open(&file, &config)?;
            if let Some(err) = db.error() {
                return Err(format!("{}: {}", file.display(), err).into());
            }

            let text = if sort {
                db.to_bibtex_sorted()
            } else {
                db.to_bibtex()
            };
            match output {
                Some(path) => std::fs::write(path, text)?,
                None => print!("{text}"),
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Name { text, json } => {
            let name = split_name(&text);
            if json {
                println!("{}", serde_json::to_string_pretty(&name)?);
            } else {
                println!("first: {}", name.first().unwrap_or("-"));
                println!("von:   {}", name.von().unwrap_or("-"));
                println!("last:  {}", name.last().unwrap_or("-"));
                println!("jr:    {}", name.jr().unwrap_or("-"));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Resolve { file, key, field } => {
            let db = Database::open(&file, &config)?;
            match db.resolve(&key, &field) {
                Some(value) => {
                    println!("{value}");
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    eprintln!("{key}: no value for `{field}`");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}
