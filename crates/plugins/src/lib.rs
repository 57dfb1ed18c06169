//! Plugins: named groups of actions with a startup step, plus the bundled
//! math plugins.

pub mod bundled;
pub mod error;
pub mod host;
pub mod log_sink;

pub use {
    error::{Error, Result},
    host::{Plugin, PluginHost},
    log_sink::LogSink,
};
