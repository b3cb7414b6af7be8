use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use genomicops::catalog::{CatalogBuilder, SpeciesLookup, list_species, match_species};
use genomicops::config::{ConfigLoader, Settings};
use genomicops::error::GenomicOpsError;
use genomicops::liftover::{ConvertOptions, Liftover};
use genomicops::output::JsonOutput;
use genomicops::tracks::{self, DEFAULT_GENOME, DEFAULT_TRACK, TrackListing};
use genomicops::ucsc::UcscHttpClient;

#[derive(Parser)]
#[command(name = "genomicops")]
#[command(about = "UCSC genome catalog lookups and coordinate liftover")]
#[command(version)]
struct Cli {
    /// Path to a genomicops.json config file
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List UCSC species and their assemblies")]
    Genomes {
        #[arg(long)]
        no_cache: bool,
    },
    #[command(about = "Find the assemblies of a species by scientific or common name")]
    Species(SpeciesArgs),
    #[command(about = "List the tracks available for an assembly")]
    Tracks { genome: String },
    #[command(about = "Fetch track annotations overlapping a region")]
    Annotations(AnnotationArgs),
    #[command(about = "Convert a region between assemblies with liftOver")]
    Liftover(LiftoverArgs),
    #[command(about = "Download the liftOver binary or a chain file")]
    Provision(ProvisionArgs),
}

#[derive(Args)]
struct SpeciesArgs {
    query: String,

    #[arg(long)]
    exact: bool,

    #[arg(long)]
    no_cache: bool,
}

#[derive(Args)]
struct AnnotationArgs {
    region: String,

    #[arg(long, default_value = DEFAULT_GENOME)]
    genome: String,

    #[arg(long, default_value = DEFAULT_TRACK)]
    track: String,
}

#[derive(Args)]
struct LiftoverArgs {
    region: String,

    #[arg(long)]
    from: String,

    #[arg(long)]
    to: String,

    #[arg(long)]
    no_ensure_binary: bool,

    #[arg(long)]
    no_ensure_chain: bool,
}

#[derive(Args)]
struct ProvisionArgs {
    #[command(subcommand)]
    artifact: ProvisionCommand,
}

#[derive(Subcommand)]
enum ProvisionCommand {
    Binary {
        #[arg(long)]
        force: bool,
    },
    Chain {
        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,

        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(report) => {
            eprintln!("{report:?}");
            match report.downcast_ref::<GenomicOpsError>() {
                Some(error) => ExitCode::from(map_exit_code(error)),
                None => ExitCode::from(1),
            }
        }
    }
}

fn map_exit_code(error: &GenomicOpsError) -> u8 {
    match error {
        GenomicOpsError::InvalidRegion(_)
        | GenomicOpsError::InvalidAssembly(_)
        | GenomicOpsError::ConfigRead(_)
        | GenomicOpsError::ConfigParse(_) => 2,
        GenomicOpsError::UcscHttp(_)
        | GenomicOpsError::UcscStatus { .. }
        | GenomicOpsError::InvalidResponse(_)
        | GenomicOpsError::Provisioning { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = ConfigLoader::resolve(cli.config.as_deref())?;
    let client = UcscHttpClient::new(&settings)?;

    match cli.command {
        Commands::Genomes { no_cache } => {
            let catalog = catalog_builder(client, &settings).fetch_genomes(!no_cache)?;
            JsonOutput::print(&list_species(&catalog)).into_diagnostic()?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Species(args) => {
            let catalog = catalog_builder(client, &settings).fetch_genomes(!args.no_cache)?;
            let lookup = match_species(&args.query, &catalog, args.exact);
            JsonOutput::print(&lookup).into_diagnostic()?;
            Ok(match lookup {
                SpeciesLookup::Found(_) => ExitCode::SUCCESS,
                SpeciesLookup::NotFound { .. } => ExitCode::from(2),
            })
        }
        Commands::Tracks { genome } => {
            let listing = tracks::list_tracks(&client, &genome)?;
            JsonOutput::print(&listing).into_diagnostic()?;
            Ok(match listing {
                TrackListing::Found(_) => ExitCode::SUCCESS,
                TrackListing::NotFound { .. } => ExitCode::from(2),
                TrackListing::Failed { .. } => ExitCode::from(3),
            })
        }
        Commands::Annotations(args) => {
            let annotations =
                tracks::annotations(&client, &args.region, &args.genome, &args.track)?;
            JsonOutput::print(&annotations).into_diagnostic()?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Liftover(args) => {
            let liftover = Liftover::new(client, settings.store, settings.download_base);
            let options = ConvertOptions {
                ensure_binary: !args.no_ensure_binary,
                ensure_chain: !args.no_ensure_chain,
            };
            let result = liftover.convert(&args.region, &args.from, &args.to, options)?;
            JsonOutput::print(&result).into_diagnostic()?;
            Ok(match result.output() {
                Some(_) => ExitCode::SUCCESS,
                None => ExitCode::from(3),
            })
        }
        Commands::Provision(args) => {
            let liftover = Liftover::new(client, settings.store, settings.download_base);
            let path = match args.artifact {
                ProvisionCommand::Binary { force } => liftover.ensure_binary(force)?,
                ProvisionCommand::Chain { from, to, force } => {
                    liftover.ensure_chain(&from, &to, force)?
                }
            };
            println!("{path}");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn catalog_builder(client: UcscHttpClient, settings: &Settings) -> CatalogBuilder<UcscHttpClient> {
    CatalogBuilder::new(client, settings.store.clone(), settings.cache_ttl)
}
