//! Turn a config into a ready dispatcher: plugins initialized, client pins
//! registered.

use std::path::Path;

use {
    anyhow::{Context, Result},
    pinion_config::{PinConfig, PinionConfig},
    pinion_dispatch::{Dispatcher, DispatcherOptions, Endpoint},
    pinion_plugins::PluginHost,
    pinion_routing::Pattern,
    serde_json::Value,
    tracing::{debug, info},
};

/// Load the config at `path`, or discover one when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<PinionConfig> {
    match path {
        Some(path) => pinion_config::load_config(path),
        None => Ok(pinion_config::discover_and_load()),
    }
}

/// Build a dispatcher from `config`, loading `extra_plugins` after the
/// configured ones (skipping any the config already loads).
pub async fn bootstrap(config: &PinionConfig, extra_plugins: &[String]) -> Result<Dispatcher> {
    let dispatcher = Dispatcher::with_options(DispatcherOptions {
        timeout: config.timeout(),
    });

    let mut host = PluginHost::new(dispatcher.clone());
    host.use_config(config).await?;
    for name in extra_plugins {
        if host.loaded().iter().any(|loaded| loaded == name) {
            debug!(plugin = %name, "plugin already loaded from config");
            continue;
        }
        host.use_named(name, &Value::Object(Default::default())).await?;
    }

    for pin in &config.client {
        let (prefix, endpoint) = resolve_pin(pin)?;
        dispatcher.client(prefix, endpoint);
    }

    info!(plugins = ?host.loaded(), clients = config.client.len(), "dispatcher ready");
    Ok(dispatcher)
}

pub fn resolve_pin(pin: &PinConfig) -> Result<(Pattern, Endpoint)> {
    let prefix = Pattern::parse(&pin.pin).with_context(|| format!("invalid pin {:?}", pin.pin))?;
    let endpoint = Endpoint::try_from(pin)?;
    Ok((prefix, endpoint))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {pinion_config::TransportKind, pinion_dispatch::ErrorKind, serde_json::json};

    use super::*;

    fn config(v: Value) -> PinionConfig {
        serde_json::from_value(v).unwrap()
    }

    #[tokio::test]
    async fn configured_and_extra_plugins_load() {
        let cfg = config(json!({"plugins": {"math": {}}}));
        let dispatcher = bootstrap(&cfg, &["math-integer".into(), "math".into()]).await.unwrap();
        let msg = json!({"role": "math", "cmd": "sum", "left": 1.5, "right": 2.5, "integer": true});
        let out = dispatcher.send(msg.as_object().cloned().unwrap()).await.unwrap();
        assert_eq!(out["answer"], 3);
        assert_eq!(dispatcher.patterns().len(), 3);
    }

    #[tokio::test]
    async fn unknown_plugin_fails_bootstrap() {
        let cfg = config(json!({"plugins": {"mth": {}}}));
        let err = bootstrap(&cfg, &[]).await.unwrap_err();
        let act = err.downcast_ref::<pinion_dispatch::ActError>().unwrap();
        assert_eq!(act.kind(), ErrorKind::Initialization);
    }

    #[test]
    fn bad_pins_are_reported() {
        let mut pin = PinConfig {
            transport: TransportKind::Tcp,
            host: None,
            port: Some(9000),
            path: None,
            pin: "role:".into(),
        };
        assert!(resolve_pin(&pin).unwrap_err().to_string().contains("invalid pin"));

        pin.pin = "role:store".into();
        pin.transport = TransportKind::Local;
        assert!(resolve_pin(&pin).is_err());
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("pinion.toml"))).is_err());
    }
}
