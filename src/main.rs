use anyhow::Result;
use bareos_exporter::{
    collector::{BackupCollector, CollectorOptions},
    config::Settings,
    descriptors::DescriptorRegistry,
    metrics::MetricsSink,
    server::start_server,
    store::SqlJobStore,
};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Bareos Exporter - Prometheus metrics exporter for the Bareos backup catalog
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Port to listen on (overrides the configured listen address port)
    #[arg(short, long, env = "BAREOS_EXPORTER_PORT")]
    port: Option<u16>,

    /// Path the metrics are served on
    #[arg(long, env = "BAREOS_EXPORTER_ENDPOINT")]
    endpoint: Option<String>,

    /// Catalog database dialect (postgres, mysql, sqlite)
    #[arg(long)]
    dialect: Option<String>,

    /// Catalog database connection URL
    #[arg(long, env = "BAREOS_EXPORTER_DATABASE_URL", hide_env_values = true)]
    url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        settings.exporter.set_port(port);
    }
    if let Some(endpoint) = args.endpoint {
        settings.exporter.endpoint = endpoint;
    }
    if let Some(dialect) = args.dialect {
        settings.database.dialect = dialect;
    }
    if let Some(url) = args.url {
        settings.database.url = url;
    }
    settings.validate()?;

    init_logging(&settings.exporter.log_level, &settings.exporter.log_format);

    info!("Starting Bareos Exporter");
    info!("Catalog: {:?}", settings.database);
    info!("Listen address: {}", settings.exporter.listen_address);

    let store = SqlJobStore::connect(&settings.database).await?;
    info!("Catalog store initialized");

    let collector = BackupCollector::new(
        Arc::new(store),
        Arc::new(DescriptorRegistry::new()),
        CollectorOptions {
            query_timeout: settings.database.query_timeout(),
            scrape_timeout: settings.exporter.scrape_timeout(),
            concurrency: settings.exporter.concurrency,
        },
    );
    let sink = MetricsSink::new(collector, &settings.exporter.namespace)?;
    info!("Metrics sink initialized");

    if let Err(e) = start_server(
        &settings.exporter.listen_address,
        &settings.exporter.endpoint,
        sink,
    )
    .await
    {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}

/// Initialize structured logging with tracing.
fn init_logging(log_level: &str, log_format: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
