//! Pattern-matched action dispatch.
//!
//! Handlers register under patterns; messages route to the most specific
//! matching pattern; a handler can delegate to the action it overrode; and
//! message prefixes can be pinned to other processes over TCP or local
//! sockets.

pub mod action;
pub mod dispatcher;
pub mod error;
pub mod table;
pub mod transport;

pub use {
    action::{ActResult, Action, ActionContext, ActionFuture, ActionId, HandlerFn, handler},
    dispatcher::{Dispatcher, DispatcherOptions},
    error::{ActError, Error, ErrorKind, Result},
    transport::{Endpoint, ListenerHandle, RemoteLink, TransportDescriptor},
};
