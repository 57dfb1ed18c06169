//! Pinned transports: per-prefix routing of messages across processes.

pub mod endpoint;
mod framing;
pub mod link;
pub mod listener;
pub mod registry;

pub use {
    endpoint::Endpoint,
    link::RemoteLink,
    listener::ListenerHandle,
    registry::{TransportDescriptor, TransportRegistry},
};
