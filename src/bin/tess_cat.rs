use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use tess_catalogs::app::{App, CatalogOptions, StarsResult};
use tess_catalogs::config::{ConfigLoader, FetchOptions};
use tess_catalogs::domain::{CatalogSource, SectorNumber, SectorSelector};
use tess_catalogs::error::TessError;
use tess_catalogs::http::HttpFetcher;
use tess_catalogs::mast::MastTicClient;
use tess_catalogs::output::{JsonOutput, OutputMode, TableSummary, TracingSink};
use tess_catalogs::store::Store;
use tess_catalogs::table::Table;

#[derive(Parser)]
#[command(name = "tess-cat")]
#[command(about = "TESS sector target catalogs joined with TIC stellar parameters, and TOI tables")]
#[command(version, author)]
struct Cli {
    /// Path to a JSON config file (default: ./tess-cat.json).
    #[arg(long, global = true)]
    config: Option<String>,

    /// Base directory for cached tables.
    #[arg(long, global = true)]
    base_path: Option<String>,

    #[arg(long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    #[arg(long, global = true)]
    quiet: bool,

    #[arg(long, global = true)]
    force_redownload: bool,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Build the target catalog of one sector")]
    Sector(SectorArgs),
    #[command(about = "Build target catalogs for several sectors (all, 5, 3,4,7 or 3-7)")]
    Stars(StarsArgs),
    #[command(about = "Merge sector catalogs into one stellar catalog")]
    Catalog(CatalogArgs),
    #[command(about = "Fetch the TESS Objects of Interest table")]
    Toi(ToiArgs),
    #[command(about = "Probe how many sectors have published target lists")]
    CheckSectors,
}

#[derive(Args)]
struct SectorArgs {
    sector: SectorNumber,
}

#[derive(Args)]
struct StarsArgs {
    sectors: SectorSelector,
}

#[derive(Args)]
struct CatalogArgs {
    /// Sectors to merge; defaults to the config file's `sectors`.
    sectors: Option<SectorSelector>,

    /// Keep one row per sector observation instead of one per star.
    #[arg(long)]
    all_rows: bool,

    /// Rebuild every sector catalog from the remote sources.
    #[arg(long)]
    force_resave: bool,

    /// Write the merged catalog to this CSV file.
    #[arg(long)]
    output: Option<Utf8PathBuf>,
}

#[derive(Args)]
struct ToiArgs {
    #[arg(value_enum)]
    source: CatalogSource,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<TessError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &TessError) -> u8 {
    match error {
        TessError::InvalidArgument(_)
        | TessError::UnknownCatalogSource(_)
        | TessError::ConfigRead(_)
        | TessError::ConfigParse(_) => 2,
        err if err.is_remote() => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();

    let mut settings = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(base_path) = &cli.base_path {
        settings.base_path = Utf8PathBuf::from(base_path);
    }
    let options = FetchOptions {
        verbose: if cli.verbose {
            Some(true)
        } else if cli.quiet {
            Some(false)
        } else {
            None
        },
        force_redownload: cli.force_redownload.then_some(true),
    };

    init_tracing(options.verbose(&settings));

    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let app = App::new(settings, HttpFetcher::new()?, MastTicClient::new()?);
    let sink = TracingSink;

    match cli.command {
        Commands::Sector(args) => {
            let result =
                app.stars_for_sectors(&SectorSelector::Single(args.sector), options, &sink)?;
            print_stars(&result, output_mode)
        }
        Commands::Stars(args) => {
            let result = app.stars_for_sectors(&args.sectors, options, &sink)?;
            print_stars(&result, output_mode)
        }
        Commands::Catalog(args) => {
            let selector = args
                .sectors
                .unwrap_or_else(|| app.settings().sectors.clone());
            let catalog = CatalogOptions {
                unique: !args.all_rows,
                force_resave: args.force_resave,
            };
            let table = app.stellar_catalog(&selector, catalog, options, &sink)?;
            if let Some(path) = &args.output {
                Store::write_table_atomic(path, &table)?;
            }
            print_table(&table, args.output.map(|path| path.to_string()), output_mode)
        }
        Commands::Toi(args) => {
            let table = app.tois(args.source, options, &sink)?;
            let path = app.store().toi_path(args.source).to_string();
            print_table(&table, Some(path), output_mode)
        }
        Commands::CheckSectors => {
            let report = app.check_sector_count(&sink)?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_sector_count(&report).into_diagnostic(),
                OutputMode::Human => {
                    println!(
                        "sectors available: {} (configured: {})",
                        report.available, report.configured
                    );
                    Ok(())
                }
            }
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "info" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_stars(result: &StarsResult, mode: OutputMode) -> miette::Result<()> {
    match mode {
        OutputMode::Json => JsonOutput::print_stars(result).into_diagnostic(),
        OutputMode::Human => {
            for item in &result.sectors {
                let noise = if item.has_noise {
                    "with noise"
                } else {
                    "no noise"
                };
                println!(
                    "sector {:>3}: {} stars, {noise} ({:?}) -> {}",
                    item.sector, item.rows, item.action, item.path
                );
            }
            Ok(())
        }
    }
}

fn print_table(table: &Table, path: Option<String>, mode: OutputMode) -> miette::Result<()> {
    let summary = TableSummary {
        rows: table.len(),
        columns: table.columns().to_vec(),
        path,
    };
    match mode {
        OutputMode::Json => JsonOutput::print_table(&summary).into_diagnostic(),
        OutputMode::Human => {
            println!("{} rows, {} columns", summary.rows, summary.columns.len());
            if let Some(path) = &summary.path {
                println!("saved to {path}");
            }
            Ok(())
        }
    }
}
