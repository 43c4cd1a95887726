use std::env;
use std::sync::Arc;

use doc_harvester::config::Settings;
use doc_harvester::orchestrator::Orchestrator;
use doc_harvester::store::SqliteStore;
use tracing::{error, info};

/// Exit codes per the external-interfaces table: 0 normal, 1 configuration
/// error, 2 unrecoverable I/O error on the database.
const EXIT_CONFIG_ERROR: i32 = 1;
const EXIT_DATABASE_ERROR: i32 = 2;

#[tokio::main]
async fn main() {
    let config_path = env::var("DOC_HARVESTER_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());

    let settings = if std::path::Path::new(&config_path).exists() {
        match Settings::load_from_file(&config_path) {
            Ok(settings) => settings,
            Err(error) => {
                init_tracing(&Settings::default());
                error!(%error, path = config_path, "failed to load configuration");
                std::process::exit(EXIT_CONFIG_ERROR);
            }
        }
    } else {
        Settings::default()
    };

    init_tracing(&settings);
    info!("starting doc-harvester");

    let store = match SqliteStore::open(&settings.database.path) {
        Ok(store) => Arc::new(store),
        Err(error) => {
            error!(%error, path = settings.database.path, "failed to open database");
            std::process::exit(EXIT_DATABASE_ERROR);
        }
    };

    let orchestrator = match Orchestrator::new(settings, store) {
        Ok(orchestrator) => orchestrator,
        Err(error) => {
            error!(%error, "failed to build orchestrator");
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    if let Err(error) = orchestrator.run_forever().await {
        error!(%error, "scheduler loop exited with an error");
        std::process::exit(EXIT_DATABASE_ERROR);
    }
}

fn init_tracing(settings: &Settings) {
    let default_filter = format!("{},tower_http=warn", settings.logging.level);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    let subscriber = tracing_subscriber::fmt().with_env_filter(env_filter);
    if settings.logging.format == "compact" {
        subscriber.compact().init();
    } else {
        subscriber.init();
    }
}
