use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgMatches, Command, arg, value_parser};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use school_access::cache::{CacheConfig, PlanCache};
use school_access::centroids::{CentroidClient, CentroidClientConfig, download_centroids};
use school_access::config::{AnalysisConfig, ServerConfig};
use school_access::export::write_report;
use school_access::pipeline::Analysis;
use school_access::socrata::{SocrataClient, SocrataClientConfig, download_all};
use school_access::web::{AppState, create_router};

type CliResult = Result<(), Box<dyn Error>>;

fn cli() -> Command {
    Command::new("school-access")
        .about("Walking access to school-special bus stops")
        .arg_required_else_help(true)
        .subcommand_required(true)
        .arg(
            arg!(--data <DIR> "Data directory holding raw/ and manual/ inputs")
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .subcommand(
            Command::new("download")
                .about("Download the open-data datasets into <data>/raw and zone centroids into <data>/manual"),
        )
        .subcommand(
            Command::new("run")
                .visible_alias("export")
                .about("Compute KPIs and quick wins and write the report tables")
                .arg(
                    arg!(--out <DIR> "Output directory")
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("serve")
                .about("Serve the KPIs and on-demand quick-win searches over HTTP")
                .arg(
                    arg!(--bind <ADDR> "Address to listen on")
                        .value_parser(value_parser!(std::net::SocketAddr)),
                ),
        )
}

fn server_config(matches: &ArgMatches) -> Result<ServerConfig, Box<dyn Error>> {
    let mut config = ServerConfig::from_env()?;
    if let Some(dir) = matches.get_one::<PathBuf>("data") {
        config.data_dir = dir.clone();
    }
    Ok(config)
}

async fn download(server: ServerConfig) -> CliResult {
    let client = SocrataClient::new(SocrataClientConfig::from_env())?;
    let raw_dir = server.data_dir.join("raw");
    let written = download_all(&client, &raw_dir).await?;
    info!(files = written.len(), dir = %raw_dir.display(), "download complete");

    let centroids = CentroidClient::new(CentroidClientConfig::default())?;
    if let Err(e) = download_centroids(&centroids, &server.data_dir).await {
        warn!(error = %e, "centroid download failed; zones will be approximated from stops");
    }
    Ok(())
}

fn run(server: ServerConfig, out: Option<PathBuf>) -> CliResult {
    let config = AnalysisConfig::from_env()?;
    let report = Analysis::load(&server.data_dir, config)?.report()?;
    let out_dir = out.unwrap_or(server.output_dir);
    write_report(&report, &out_dir)?;

    println!(
        "Covered within {} min: {:.1}%  within {} min: {:.1}%  uncovered: {:.1}%",
        report.parameters.threshold_min,
        report.summary.pct_covered_t1,
        report.parameters.threshold2_min,
        report.summary.pct_covered_t2,
        report.summary.pct_uncovered,
    );
    if let Some(plan) = &report.quick_wins {
        println!(
            "{} quick wins: {:.1}% -> {:.1}%",
            plan.picks.len(),
            plan.baseline.pct_covered_t1,
            plan.projected.pct_covered_t1,
        );
    }
    println!("Wrote report to {}", out_dir.display());
    Ok(())
}

async fn serve(server: ServerConfig) -> CliResult {
    let config = AnalysisConfig::from_env()?;
    let analysis = Analysis::load(&server.data_dir, config)?;
    let report = analysis.report()?;

    let cache_config = CacheConfig {
        ttl: server.cache_ttl,
        max_capacity: server.cache_capacity,
    };
    let state = AppState::new(analysis, report, PlanCache::new(&cache_config));
    let app = create_router(state);

    let addr = server.bind;
    println!("School access API listening on http://{addr}");
    println!();
    println!("API Endpoints:");
    println!("  GET  /health              - Health check");
    println!("  GET  /kpis/summary        - Aggregate coverage");
    println!("  GET  /kpis/zones          - Per-zone KPIs");
    println!("  GET  /kpis/zones/{{code}}   - One zone with its reachable stops");
    println!("  GET  /kpis/schools        - Per-school reachability");
    println!("  GET  /quick-wins          - Greedy stop proposals");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let matches = cli().get_matches();
    let result = match matches.subcommand() {
        Some(("download", sub)) => match server_config(sub) {
            Ok(server) => download(server).await,
            Err(e) => Err(e),
        },
        Some(("run", sub)) => server_config(sub)
            .and_then(|server| run(server, sub.get_one::<PathBuf>("out").cloned())),
        Some(("serve", sub)) => match server_config(sub) {
            Ok(mut server) => {
                if let Some(bind) = sub.get_one::<std::net::SocketAddr>("bind") {
                    server.bind = *bind;
                }
                serve(server).await
            }
            Err(e) => Err(e),
        },
        _ => unreachable!("subcommand required"),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
