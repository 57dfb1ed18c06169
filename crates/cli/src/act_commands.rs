//! `pinion act`: send one message and print the reply.

use std::path::Path;

use {anyhow::Result, pinion_routing::parse_message, serde_json::Value};

use crate::runtime;

pub async fn handle_act(config_path: Option<&Path>, message: &str, plugins: &[String]) -> Result<()> {
    let msg = parse_message(message)?;
    let config = runtime::load_config(config_path)?;
    let dispatcher = runtime::bootstrap(&config, plugins).await?;

    match dispatcher.send(msg).await {
        Ok(out) => {
            println!("{}", serde_json::to_string_pretty(&Value::Object(out))?);
            Ok(())
        },
        Err(e) => {
            eprintln!("{}", serde_json::to_string_pretty(&e.to_shape())?);
            Err(e.into())
        },
    }
}
