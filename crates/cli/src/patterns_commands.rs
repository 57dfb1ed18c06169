//! `pinion patterns`: show what a configured process would route.

use std::path::Path;

use {
    anyhow::Result,
    pinion_dispatch::TransportDescriptor,
};

use crate::runtime;

pub async fn handle_patterns(config_path: Option<&Path>, plugins: &[String]) -> Result<()> {
    let config = runtime::load_config(config_path)?;
    let dispatcher = runtime::bootstrap(&config, plugins).await?;

    let patterns = dispatcher.patterns();
    if patterns.is_empty() {
        println!("No actions registered.");
    }
    for (pattern, depth) in patterns {
        if depth > 1 {
            println!("{pattern}  ({depth} actions)");
        } else {
            println!("{pattern}");
        }
    }

    for (prefix, descriptor) in dispatcher.pins() {
        match descriptor {
            TransportDescriptor::RemoteClient { endpoint } => println!("{prefix}  -> {endpoint}"),
            TransportDescriptor::LocalListener { bind } => println!("{prefix}  <- {bind}"),
        }
    }
    for pin in &config.listen {
        let (prefix, endpoint) = runtime::resolve_pin(pin)?;
        println!("{prefix}  <- {endpoint} (on serve)");
    }
    Ok(())
}
