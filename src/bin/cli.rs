use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use sumo_batch::engine::locate_tool;
use sumo_batch::prelude::*;
use sumo_batch::{ConfigError, DEFAULT_CONFIG_FILE};
use tracing_subscriber::EnvFilter;
#[cfg(feature = "otel")]
use tracing_subscriber::layer::SubscriberExt;
#[cfg(feature = "otel")]
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "sumo-batch")]
#[command(about = "Convert OSM extracts into runnable SUMO scenarios", long_about = None)]
#[command(version)]
struct Cli {
    /// Runs the batch when omitted
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to batch config (default: ./batch.yaml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Process all configured areas and write the reports
    Run(RunArgs),

    /// List configured areas
    List,

    /// Validate the configuration without running anything
    Validate,

    /// Check that the external SUMO tools can be found
    CheckTools,
}

#[derive(Args, Default)]
struct RunArgs {
    /// Maximum number of areas processed at once (overrides config)
    #[arg(short, long)]
    parallel: Option<usize>,

    /// Only process the named area (repeatable)
    #[arg(short, long = "area", value_name = "NAME")]
    areas: Vec<String>,

    /// Print the batch report as JSON
    #[arg(long)]
    json: bool,

    /// Directory for report files (overrides config)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

#[cfg(feature = "otel")]
fn init_otel_tracing(verbose: bool) {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::runtime::Tokio;
    use opentelemetry_sdk::trace::TracerProvider;

    let filter = if verbose {
        "sumo_batch=debug"
    } else {
        "sumo_batch=info"
    };

    let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4317".to_string());

    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&otlp_endpoint)
        .build()
    {
        Ok(exporter) => exporter,
        Err(e) => {
            eprintln!("Failed to create OTLP exporter, tracing locally: {}", e);
            init_tracing(verbose);
            return;
        }
    };

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, Tokio)
        .build();

    let tracer = provider.tracer("sumo-batch");
    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    tracing_subscriber::registry()
        .with(EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(otel_layer)
        .init();

    opentelemetry::global::set_tracer_provider(provider);
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        "sumo_batch=debug"
    } else {
        "sumo_batch=info"
    };

    // stdout is reserved for reports and --json output
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    #[cfg(feature = "otel")]
    init_otel_tracing(cli.verbose);

    #[cfg(not(feature = "otel"))]
    init_tracing(cli.verbose);

    let result = run(cli).await;

    #[cfg(feature = "otel")]
    opentelemetry::global::shutdown_tracer_provider();

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            tracing::error!(error = %e, "Batch failed");
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Run(RunArgs::default())) {
        Commands::Run(args) => run_batch(config, args).await,
        Commands::List => list_areas(&config),
        Commands::Validate => validate(&config),
        Commands::CheckTools => check_tools(&config),
    }
}

/// Explicit path, else `batch.yaml` in the current directory, else defaults
fn load_config(path: Option<&Path>) -> Result<BatchConfig, ConfigError> {
    match path {
        Some(path) => {
            tracing::info!("Using config: {}", path.display());
            BatchConfig::load(path)
        }
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            tracing::info!("Using config: {}", DEFAULT_CONFIG_FILE);
            BatchConfig::load(DEFAULT_CONFIG_FILE)
        }
        None => Ok(BatchConfig::default()),
    }
}

#[tracing::instrument(skip_all, fields(work_dir = %config.work_dir.display()))]
async fn run_batch(mut config: BatchConfig, args: RunArgs) -> anyhow::Result<bool> {
    if let Some(p) = args.parallel {
        config.parallel = p;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }

    let known: HashSet<&str> = config.areas.iter().map(|a| a.name.as_str()).collect();
    let unknown: Vec<&str> = args
        .areas
        .iter()
        .map(String::as_str)
        .filter(|name| !known.contains(name))
        .collect();
    if !unknown.is_empty() {
        anyhow::bail!("Unknown area(s): {}", unknown.join(", "));
    }

    let output_dir = config.output_dir.clone();
    let report_files = config.reports.clone();

    let mut runner = BatchRunner::new(config);
    if !args.areas.is_empty() {
        let selected: HashSet<String> = args.areas.into_iter().collect();
        runner = runner.filter(move |name| selected.contains(name));
    }

    if !args.json {
        println!("Processing {} areas\n", runner.selected_areas().len());
    }

    let report = runner.run().await?;
    let rendered = render(&report)?;
    let written = write_reports(&rendered, &output_dir, &report_files)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_batch_report(&report);
        println!("\nReports:");
        for path in &written {
            println!("  {}", path.display());
        }
    }

    Ok(report.all_succeeded())
}

fn list_areas(config: &BatchConfig) -> anyhow::Result<bool> {
    println!("Baseline: {} (pre-built)\n", config.baseline.name);

    if config.areas.is_empty() {
        println!("No areas configured");
        return Ok(true);
    }

    println!("Areas in {}:\n", config.work_dir.display());
    for area in &config.areas {
        let source = config.source_path(area);
        let status = if source.exists() { "✓" } else { "✗" };
        let coverage = area
            .coverage_km2
            .map(|c| format!(", {:.1} km²", c))
            .unwrap_or_default();
        println!("  {} {} ({}{})", status, area.name, source.display(), coverage);
        if !area.key_roads.is_empty() {
            println!("      Key roads: {}", area.key_roads.join(", "));
        }
        if let Some(bbox) = &area.bounding_box {
            println!("      Extent: {}", bbox.osmium_extent());
        }
    }

    Ok(true)
}

fn validate(config: &BatchConfig) -> anyhow::Result<bool> {
    config.validate()?;

    let missing: Vec<_> = config
        .areas
        .iter()
        .filter(|a| !config.source_path(a).exists())
        .collect();

    println!(
        "✓ configuration valid: {} areas, parallel {}",
        config.areas.len(),
        config.parallel
    );
    for area in &missing {
        println!(
            "  ! {}: source not found at {}",
            area.name,
            config.source_path(area).display()
        );
    }

    Ok(true)
}

fn check_tools(config: &BatchConfig) -> anyhow::Result<bool> {
    let mut all_found = true;

    for command in [
        &config.tools.netconvert,
        &config.tools.duarouter,
        &config.tools.python,
    ] {
        match locate_tool(command) {
            Some(path) => println!("✓ {} ({})", command, path.display()),
            None => {
                println!("✗ {} not found", command);
                all_found = false;
            }
        }
    }

    let script = config.tools.random_trips_script();
    if script.exists() {
        println!("✓ randomTrips.py ({})", script.display());
    } else {
        println!("✗ randomTrips.py not found at {}", script.display());
        all_found = false;
    }

    Ok(all_found)
}

fn print_batch_report(report: &BatchReport) {
    println!("\n=== Batch Result ===\n");
    println!("Success: {}", if report.all_succeeded() { "YES" } else { "NO" });
    println!("Run ID: {}\n", report.run_id);

    for result in report.all_entries() {
        let status = if result.is_success() { "✓" } else { "✗" };
        println!("{} {}", status, result.area_name);
        match &result.failure {
            Some(failure) => {
                println!("    {} at {}: {}", failure.kind, failure.stage, failure.diagnostic);
            }
            None => println!(
                "    {} junctions, {} edges, {} vehicles",
                result.network_metrics.junction_count,
                result.network_metrics.edge_count,
                result.vehicle_count
            ),
        }
    }

    let totals = &report.totals;
    println!(
        "\nCompleted: {}/{} areas, {} junctions, {} edges, {} vehicles",
        totals.areas_completed,
        report.configured_areas(),
        totals.total_junctions,
        totals.total_edges,
        totals.total_vehicles
    );
}
