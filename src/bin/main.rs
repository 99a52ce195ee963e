use std::{path::PathBuf, process};

use structopt::StructOpt;
use worker_registry::{settings::Settings, WorkerRegistry};

#[macro_use]
extern crate tracing;

#[derive(Debug, StructOpt)]
#[structopt(name = "worker-registry")]
/// Loads the worker registry as the coordinator would at startup and prints the allowed workers.
struct Opt {
    /// Path of the configuration file
    #[structopt(short, parse(from_os_str))]
    config_path: PathBuf,
}

#[tokio::main]
async fn main() {
    let opt = Opt::from_args();

    let settings = Settings::new(opt.config_path).unwrap_or_else(|err| {
        eprintln!("{}", err);
        process::exit(1);
    });
    let Settings {
        registry: registry_settings,
        log: log_settings,
    } = settings;

    tracing_subscriber::fmt()
        .with_env_filter(log_settings.filter)
        .with_ansi(true)
        .init();

    if sodiumoxide::init().is_err() {
        error!("failed to initialize the crypto layer");
        process::exit(1);
    }

    let registry = WorkerRegistry::from_settings(&registry_settings).unwrap_or_else(|err| {
        error!("failed to initialize the worker registry: {}", err);
        process::exit(1);
    });

    let workers = registry.list_workers().await;
    info!(
        "worker registry initialized in {} mode with {} allowed worker(s)",
        if registry.is_safe() { "safe" } else { "unsafe" },
        workers.len()
    );

    match serde_json::to_string_pretty(&workers) {
        Ok(listing) => println!("{}", listing),
        Err(err) => {
            error!("failed to serialize the worker listing: {}", err);
            process::exit(1);
        }
    }
}
