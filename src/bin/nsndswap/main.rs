//! nsndswap CLI tool
//!
//! ## Commands
//!
//! - `extract <kind> <path>`: scan one page and print its tracks
//! - `build <config>`: scan every source in a manifest, build its webs and write the exports
//! - `load <path>`: reload a web from its JSON dump and summarize it

use clap::{Parser, Subcommand};
use nsndswap::{
    codec::SourceKind,
    config::Config,
    normalize::{Identity, TitleNormalizer},
    web::export::read_json,
};
use std::{fs::File, path::PathBuf};

#[derive(Parser)]
#[command(name = "nsndswap")]
#[command(
    author,
    version,
    about = "Scrapes music reference tables into a reference graph",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan one page and print the tracks found, in document order
    Extract {
        /// Which layout the page uses (makin, cookie, xzaz, listing)
        kind: SourceKind,

        /// Path to the page
        path: PathBuf,

        /// Normalize titles with this manifest's tables
        #[arg(long)]
        config: Option<PathBuf>,

        /// Use the benchmark rules the manifest gives this source name
        #[arg(long, requires = "config")]
        source: Option<String>,

        /// Print the extraction as JSON instead of one track per line
        #[arg(long)]
        json: bool,
    },

    /// Build every web a manifest describes and write its exports
    Build {
        /// Path to the manifest
        config: PathBuf,

        /// Write exports here instead of the manifest's output_dir
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Reload a web from its JSON dump
    Load {
        /// Path to a `<name>.json` export
        path: PathBuf,

        /// Also list the titles that were referenced but never scanned
        #[arg(long)]
        unknown: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            kind,
            path,
            config,
            source,
            json,
        } => {
            let markup = std::fs::read_to_string(&path)?;
            let config = config.map(Config::from_path).transpose()?;
            let normalizer: Box<dyn TitleNormalizer> = match &config {
                Some(config) => Box::new(config.normalizer_for(source.as_deref().unwrap_or(""))),
                None => Box::new(Identity),
            };
            let extraction = kind.extractor().extract(&markup, normalizer.as_ref())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&extraction)?);
            } else {
                for track in extraction.tracks.iter() {
                    println!("{track}");
                }
            }
            for diagnostic in extraction.diagnostics.iter() {
                eprintln!("{diagnostic}");
            }
            if !extraction.is_complete() {
                std::process::exit(2);
            }
            Ok(())
        }

        Commands::Build { config, output_dir } => {
            let mut config = Config::from_path(&config)?;
            if let Some(output_dir) = output_dir {
                config.output_dir = output_dir;
            }
            let reports = config.run()?;
            for report in reports.iter() {
                println!(
                    "{}: {} nodes, {} edges, {} unknown, {} files written",
                    report.name,
                    report.nodes,
                    report.edges,
                    report.unknown,
                    report.written.len()
                );
                for source in report.incomplete_sources.iter() {
                    eprintln!("  warning: source \"{source}\" ended early");
                }
            }
            Ok(())
        }

        Commands::Load { path, unknown } => {
            let web = read_json(File::open(&path)?)?;
            println!(
                "{}: {} nodes, {} edges, {} unknown",
                path.display(),
                web.node_count(),
                web.edge_count(),
                web.unknown().count()
            );
            if unknown {
                for title in web.unknown().filter_map(|i| web.title(i)) {
                    println!("    {title}");
                }
            }
            Ok(())
        }
    }
}
