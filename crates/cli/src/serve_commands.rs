//! `pinion serve`: run listeners until interrupted.

use std::path::Path;

use {
    anyhow::{Result, bail},
    tracing::info,
};

use crate::runtime;

pub async fn handle_serve(config_path: Option<&Path>) -> Result<()> {
    let config = runtime::load_config(config_path)?;
    if config.listen.is_empty() {
        bail!("nothing to serve: add a [[listen]] entry to the config");
    }
    let dispatcher = runtime::bootstrap(&config, &[]).await?;

    let mut listeners = Vec::with_capacity(config.listen.len());
    for pin in &config.listen {
        let (prefix, endpoint) = runtime::resolve_pin(pin)?;
        let handle = dispatcher.listen(prefix, endpoint).await?;
        eprintln!("listening on {} for {}", handle.endpoint(), handle.pin());
        listeners.push(handle);
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    for handle in listeners {
        handle.shutdown().await;
    }
    Ok(())
}
