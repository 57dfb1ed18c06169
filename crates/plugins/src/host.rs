//! Plugin trait and the host that runs plugin startup in order.

use std::sync::Arc;

use {
    async_trait::async_trait,
    pinion_config::PinionConfig,
    pinion_dispatch::{ActError, Dispatcher},
    serde_json::Value,
    tracing::{info, warn},
};

use crate::bundled;

/// A named group of actions with a startup step.
///
/// `init` registers the plugin's actions and acquires whatever they need
/// (files, connections). An error aborts startup.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    async fn init(&self, dispatcher: &Dispatcher, options: &Value) -> anyhow::Result<()>;
}

/// Runs plugin startup against one dispatcher and records what loaded.
pub struct PluginHost {
    dispatcher: Dispatcher,
    loaded: Vec<String>,
}

impl PluginHost {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            loaded: Vec::new(),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Names of plugins whose startup succeeded, in load order.
    pub fn loaded(&self) -> &[String] {
        &self.loaded
    }

    /// Run `plugin`'s startup step. Failure is reported as an
    /// initialization error naming the plugin.
    pub async fn use_plugin(&mut self, plugin: &dyn Plugin, options: &Value) -> Result<(), ActError> {
        let name = plugin.name().to_string();
        match plugin.init(&self.dispatcher, options).await {
            Ok(()) => {
                info!(plugin = %name, "plugin initialized");
                self.loaded.push(name);
                Ok(())
            },
            Err(e) => {
                warn!(plugin = %name, error = %e, "plugin failed to initialize");
                Err(ActError::initialization(name, format!("{e:#}")))
            },
        }
    }

    /// Load a bundled plugin by name.
    pub async fn use_named(&mut self, name: &str, options: &Value) -> Result<(), ActError> {
        let plugin = resolve(name)?;
        self.use_plugin(plugin.as_ref(), options).await
    }

    /// Load every plugin listed in `config`, in document order, stopping at
    /// the first failure.
    pub async fn use_config(&mut self, config: &PinionConfig) -> Result<(), ActError> {
        for (name, options) in &config.plugins {
            self.use_named(name, options).await?;
        }
        Ok(())
    }
}

fn resolve(name: &str) -> Result<Arc<dyn Plugin>, ActError> {
    bundled::by_name(name).ok_or_else(|| {
        ActError::initialization(
            name,
            crate::Error::UnknownPlugin {
                name: name.to_string(),
            }
            .to_string(),
        )
    })
}
