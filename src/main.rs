// src/main.rs
use anyhow::Context;
use log::info;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::Filter;

use petroleum_helper::config::HelperConfig;
use petroleum_helper::host::KeyValueStore;
use petroleum_helper::routes;
use petroleum_helper::services::store::FileStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    info!("Logger initialized. Starting the companion API...");

    let config = HelperConfig::from_env();
    info!("Using PORT: {}", config.port);

    let store = FileStore::open(&config.store_dir)
        .with_context(|| format!("opening store directory {}", config.store_dir))?;
    info!("Persisting helper state under {}", config.store_dir);
    let store: Arc<dyn KeyValueStore> = Arc::new(store);

    let addr: SocketAddr = ([127, 0, 0, 1], config.port).into();

    // The extension popup calls in from its own origin.
    let cors = warp::cors()
        .allow_any_origin()
        .allow_header("content-type")
        .allow_methods(vec!["GET", "POST"]);

    let api = routes::routes(store, config.planner).with(cors);
    info!("Routes configured successfully with CORS.");

    info!("Starting server on {}", addr);
    warp::serve(api).run(addr).await;
    Ok(())
}
