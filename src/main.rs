//! Survey-Harvest main entry point
//!
//! This is the command-line interface for the Survey-Harvest archive crawler.

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use std::path::{Path, PathBuf};
use survey_harvest::config::{self, Config};
use survey_harvest::process::UnavailableProcessor;
use survey_harvest::query::{ship_survey_pairs, CatalogClient, QueryFilters, QueryProfile};
use survey_harvest::regions::{GeojsonBoundaryReader, RegionSet};
use survey_harvest::{net, SurveyLedger, Walker};
use tracing_subscriber::EnvFilter;

/// Survey-Harvest: an archive crawler for ship survey data
///
/// Survey-Harvest walks a remote ship/survey/file archive, optionally
/// restricted to surveys matching a region and date query against the
/// remote catalog, downloads the raw data files, hands each finished survey
/// to a processing engine, and tracks everything in a local ledger so an
/// interrupted run picks up where it left off.
#[derive(Parser, Debug)]
#[command(name = "survey-harvest")]
#[command(version)]
#[command(about = "Crawl, filter, and track ship survey archives", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply without one)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Override the output directory
    #[arg(long, value_name = "DIR")]
    output_dir: Option<String>,

    /// Restrict the crawl to surveys inside this named region
    #[arg(long, value_name = "NAME")]
    region: Option<String>,

    /// Directory containing region boundary files
    #[arg(long, value_name = "DIR")]
    region_dir: Option<String>,

    /// Only surveys starting on or after this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    start_date: Option<NaiveDate>,

    /// Only surveys ending on or before this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    end_date: Option<NaiveDate>,

    /// Override the processing coordinate system
    #[arg(long, value_name = "CRS")]
    coordinate_system: Option<String>,

    /// Override the processing vertical reference
    #[arg(long, value_name = "REF")]
    vertical_reference: Option<String>,

    /// Override the grid type
    #[arg(long, value_name = "TYPE")]
    grid_type: Option<String>,

    /// Override the grid resolution in meters
    #[arg(long, value_name = "METERS")]
    resolution: Option<f64>,

    /// Override the grid export format
    #[arg(long, value_name = "FORMAT")]
    grid_format: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["stats", "forget"])]
    dry_run: bool,

    /// Show the ledger contents and exit
    #[arg(long, conflicts_with_all = ["dry_run", "forget"])]
    stats: bool,

    /// Remove one ledger row so the survey is re-fetched next run
    #[arg(long, num_args = 2, value_names = ["SHIP", "SURVEY"],
          conflicts_with_all = ["dry_run", "stats"])]
    forget: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            config::load_config(path).context("failed to load configuration")?
        }
        None => config::default_config().context("failed to build default configuration")?,
    };
    apply_overrides(&mut config, &cli);
    config::validate(&config).context("invalid configuration")?;

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if !cli.forget.is_empty() {
        handle_forget(&config, &cli.forget[0], &cli.forget[1])?;
    } else {
        handle_harvest(config, &cli).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("survey_harvest=info,warn"),
            1 => EnvFilter::new("survey_harvest=debug,info"),
            2 => EnvFilter::new("survey_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Folds command-line overrides into the loaded configuration
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(dir) = &cli.output_dir {
        config.output.directory = dir.clone();
    }
    if let Some(name) = &cli.region {
        config.region.name = Some(name.clone());
    }
    if let Some(dir) = &cli.region_dir {
        config.region.directory = Some(dir.clone());
    }
    if let Some(crs) = &cli.coordinate_system {
        config.processing.coordinate_system = crs.clone();
    }
    if let Some(vr) = &cli.vertical_reference {
        config.processing.vertical_reference = vr.clone();
    }
    if let Some(gt) = &cli.grid_type {
        config.processing.grid_type = gt.clone();
    }
    if let Some(res) = cli.resolution {
        config.processing.resolution = Some(res);
    }
    if let Some(gf) = &cli.grid_format {
        config.processing.grid_format = gf.clone();
    }
}

/// Handles the --dry-run mode: validates config and shows the effective plan
fn handle_dry_run(config: &Config) {
    println!("=== Survey-Harvest Dry Run ===\n");

    println!("Archive:");
    println!("  Root URL: {}", config.archive.root_url);
    println!("  Wanted extensions: {}", config.archive.wanted_extensions.join(", "));
    println!("  Ignorable extension: {}", config.archive.ignorable_extension);
    println!("  Excluded ships: {}", config.archive.excluded_ships.len());

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);

    println!("\nRetries:");
    println!("  Listings: {}", config.retry.listing_retries);
    println!("  Downloads: {}", config.retry.download_retries);

    println!("\nCatalog query:");
    println!("  Catalog URL: {}", config.query.catalog_url);
    println!("  Data type: {}", config.query.data_type);
    println!("  Chunk size: {}", config.query.chunk_size);

    println!("\nRegion:");
    match (&config.region.name, &config.region.directory) {
        (Some(name), Some(dir)) => {
            println!("  Name: {}", name);
            println!("  Directory: {}", dir);
        }
        _ => println!("  (none: crawling the full archive)"),
    }

    println!("\nProcessing:");
    println!("  Coordinate system: {}", config.processing.coordinate_system);
    println!("  Vertical reference: {}", config.processing.vertical_reference);
    println!("  Grid type: {}", config.processing.grid_type);
    match config.processing.resolution {
        Some(res) => println!("  Resolution: {} m", res),
        None => println!("  Resolution: auto"),
    }
    println!("  Grid format: {}", config.processing.grid_format);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: dumps the ledger contents
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let ledger = SurveyLedger::open(Path::new(&config.output.directory))
        .context("failed to open ledger")?;
    let records = ledger.all_records().context("failed to read ledger")?;

    println!("Ledger: {} surveys\n", records.len());
    for record in &records {
        let status = if record.is_complete() { "complete" } else { "incomplete" };
        println!(
            "{}/{}: {} ok, {} failed, {} ignored [{}]",
            record.ship_name,
            record.survey_name,
            record.downloaded_success_count,
            record.downloaded_error_count,
            record.ignored_count,
            status
        );
        if !record.grid_path.is_empty() {
            println!("  grid: {}", record.grid_path);
        }
    }
    Ok(())
}

/// Handles --forget: drops one ledger row so the survey is re-fetched
fn handle_forget(config: &Config, ship: &str, survey: &str) -> anyhow::Result<()> {
    let mut ledger = SurveyLedger::open(Path::new(&config.output.directory))
        .context("failed to open ledger")?;
    ledger
        .remove(ship, survey)
        .with_context(|| format!("failed to forget {}/{}", ship, survey))?;
    println!("✓ Forgot {}/{}", ship.to_lowercase(), survey.to_lowercase());
    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config, cli: &Cli) -> anyhow::Result<()> {
    std::fs::create_dir_all(&config.output.directory)
        .with_context(|| format!("cannot create output directory {}", config.output.directory))?;

    let ledger = SurveyLedger::open(Path::new(&config.output.directory))
        .context("failed to open ledger")?;
    let client = net::build_http_client().context("failed to build HTTP client")?;

    // region or date restrictions turn into an allowed (ship, survey) list
    // via the catalog; otherwise the whole archive is walked
    let filtered = config.region.name.is_some()
        || cli.start_date.is_some()
        || cli.end_date.is_some();
    let allowed = if filtered {
        let pairs = query_allowed_surveys(&config, &client, cli).await?;
        tracing::info!("Catalog query matched {} surveys", pairs.len());
        if pairs.is_empty() {
            tracing::warn!("No surveys found for your query, skipping download");
            return Ok(());
        }
        Some(pairs)
    } else {
        None
    };

    let mut walker = Walker::new(
        config,
        client,
        ledger,
        Box::new(UnavailableProcessor),
        allowed,
    );
    match walker.run().await {
        Ok(()) => {
            tracing::info!("Harvest completed successfully");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}

/// Resolves the region/date restriction into (ship, survey) pairs
async fn query_allowed_surveys(
    config: &Config,
    client: &reqwest::Client,
    cli: &Cli,
) -> anyhow::Result<Vec<(String, String)>> {
    let regions = match &config.region.directory {
        Some(dir) => Some(
            RegionSet::load(Path::new(dir), &GeojsonBoundaryReader::new())
                .context("failed to load region boundaries")?,
        ),
        None => None,
    };

    let profile = QueryProfile::for_data_type(&config.query.data_type)
        .with_context(|| format!("unknown data type {}", config.query.data_type))?;
    let catalog = CatalogClient::new(
        client.clone(),
        &config.query.catalog_url,
        profile,
        config.query.chunk_size,
        config.retry.listing_retries,
    );

    let filters = QueryFilters {
        start_date: cli.start_date,
        end_date: cli.end_date,
        region: config.region.name.clone(),
        ..Default::default()
    };
    let features = catalog
        .query(&filters, regions.as_ref())
        .await
        .context("catalog query failed")?;
    Ok(ship_survey_pairs(&features, "PLATFORM", "SURVEY_ID"))
}
