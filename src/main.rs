use std::sync::Arc;

use anyhow::Context;
use crop_yield_service::{ModelStore, ServiceConfig, http, store::ModelOrigin};
use log::info;
use tokio::{net::TcpListener, signal, task};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServiceConfig::from_env()?;
    info!("starting crop yield prediction service");

    let store = Arc::new(ModelStore::from_config(&config));
    let origin = {
        let store = Arc::clone(&store);
        task::spawn_blocking(move || store.ensure_ready()).await??
    };

    match origin {
        ModelOrigin::Loaded => info!("model ready, loaded from cache"),
        ModelOrigin::Trained => info!("model ready, freshly trained"),
    }

    let addr = config.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening at {addr}");

    axum::serve(listener, http::router(store))
        .with_graceful_shutdown(async {
            let _ = signal::ctrl_c().await;
            info!("received SIGTERM");
        })
        .await?;

    info!("wrapping up, shutting down...");
    Ok(())
}
