//! geoasn: DN42 IP-to-ASN lookup server.

use clap::Parser;
use geoasn::config::{Config, MmdbSource, Overrides};
use geoasn::server::HttpServer;
use geoasn::{
    HotStore, HttpFetcher, MmdbProvider, QueryEngine, RefreshScheduler, BOOTSTRAP_ATTEMPTS,
    BOOTSTRAP_BACKOFF,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "geoasn")]
#[command(version)]
#[command(about = "Serve DN42 IP-to-ASN lookups from a self-updating MMDB database", long_about = None)]
struct Cli {
    /// Listen host [default: 0.0.0.0]
    #[arg(long)]
    host: Option<String>,

    /// Listen port [default: 8080]
    #[arg(long)]
    port: Option<u16>,

    /// Database source: github or mirror [default: github]
    #[arg(long)]
    mmdb_source: Option<MmdbSource>,

    /// Local database path [default: ./GeoLite2-ASN-DN42.mmdb]
    #[arg(long)]
    data: Option<PathBuf>,

    /// Request worker threads [default: 4]
    #[arg(long)]
    workers: Option<usize>,

    /// YAML config file; command-line flags take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ignore X-Forwarded-For and X-Real-IP
    #[arg(long)]
    no_proxy_headers: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> geoasn::Result<()> {
    let config = Config::resolve(
        cli.config.as_deref(),
        Overrides {
            host: cli.host,
            port: cli.port,
            mmdb_source: cli.mmdb_source,
            data: cli.data,
            workers: cli.workers,
            no_proxy_headers: cli.no_proxy_headers,
        },
    )?;
    let bind_addr = config.bind_addr()?;
    let url = config.source_url();

    let store = Arc::new(HotStore::new());
    let scheduler = Arc::new(RefreshScheduler::new(
        &url,
        &config.data,
        Arc::clone(&store),
        MmdbProvider,
        HttpFetcher::new(),
    ));

    scheduler.bootstrap(BOOTSTRAP_ATTEMPTS, BOOTSTRAP_BACKOFF)?;
    let refresh = Arc::clone(&scheduler).spawn()?;

    let server = HttpServer::bind(bind_addr, QueryEngine::new(Arc::clone(&store)))?
        .with_workers(config.workers)
        .with_proxy_headers(config.trust_proxy_headers);

    let shutdown = server.shutdown_handle();
    let stop_refresh = refresh.signal();
    ctrlc::set_handler(move || {
        log::info!("Shutting down...");
        stop_refresh.stop();
        shutdown.shutdown();
    })
    .map_err(|e| geoasn::Error::Config(format!("failed to install signal handler: {}", e)))?;

    log::info!("Database source: {} ({})", config.mmdb_source, url);
    server.run()?;

    refresh.stop();
    drop(store.take());
    log::info!("Database released, exiting");
    Ok(())
}
