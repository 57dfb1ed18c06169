//! The dispatcher: registers actions and routes messages to them.
//!
//! `send` checks pinned transports first. A message whose best pin is a
//! remote client is forwarded over that link; anything else resolves against
//! the local action table and runs the active action for the best pattern.

use std::{
    future::Future,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use {
    pinion_common::Message,
    pinion_protocol::DEFAULT_TIMEOUT_MS,
    pinion_routing::Pattern,
    tracing::{debug, info, warn},
};

use crate::{
    action::{ActResult, Action, ActionContext, ActionId, HandlerFn, handler, invoke},
    error::{ActError, Result},
    table::ActionTable,
    transport::{
        Endpoint, ListenerHandle, RemoteLink, TransportDescriptor, TransportRegistry, listener,
    },
};

#[derive(Debug, Clone)]
pub struct DispatcherOptions {
    /// How long a remote link waits to connect, and then for each reply.
    pub timeout: Duration,
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

/// Cheaply cloneable handle; clones share one action table and one set of
/// transports.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    actions: RwLock<ActionTable>,
    transports: RwLock<TransportRegistry>,
    options: DispatcherOptions,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::with_options(DispatcherOptions::default())
    }

    pub fn with_options(options: DispatcherOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                actions: RwLock::new(ActionTable::new()),
                transports: RwLock::new(TransportRegistry::new()),
                options,
            }),
        }
    }

    pub fn options(&self) -> &DispatcherOptions {
        &self.inner.options
    }

    fn actions(&self) -> RwLockReadGuard<'_, ActionTable> {
        self.inner.actions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn actions_mut(&self) -> RwLockWriteGuard<'_, ActionTable> {
        self.inner.actions.write().unwrap_or_else(|e| e.into_inner())
    }

    fn transports(&self) -> RwLockReadGuard<'_, TransportRegistry> {
        self.inner.transports.read().unwrap_or_else(|e| e.into_inner())
    }

    fn transports_mut(&self) -> RwLockWriteGuard<'_, TransportRegistry> {
        self.inner.transports.write().unwrap_or_else(|e| e.into_inner())
    }

    // ── Registration ─────────────────────────────────────────────────────────

    /// Register `handler` under `pattern`. An equal pattern registered
    /// earlier stays reachable as this action's prior.
    pub fn register(&self, pattern: Pattern, handler: HandlerFn) -> ActionId {
        let action = self.actions_mut().register(pattern, handler);
        debug!(
            action = %action.id(),
            pattern = %action.pattern(),
            prior = ?action.prior().map(|p| p.id()),
            "registered action"
        );
        action.id()
    }

    /// Parse `pattern` and register an async closure under it.
    pub fn add<F, Fut>(&self, pattern: &str, f: F) -> Result<ActionId>
    where
        F: Fn(Message, ActionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActResult> + Send + 'static,
    {
        Ok(self.register(Pattern::parse(pattern)?, handler(f)))
    }

    // ── Dispatch ─────────────────────────────────────────────────────────────

    /// Route `msg` to the best action, locally or over a pinned remote link.
    pub async fn send(&self, msg: Message) -> ActResult {
        let link = self.transports().remote_link(&msg);
        if let Some(link) = link {
            debug!(endpoint = %link.endpoint(), "forwarding to remote link");
            return link.forward(msg).await;
        }

        let action = match self.resolve(&msg) {
            Ok(action) => action,
            Err(e) => {
                debug!(error = %e, "no action for message");
                return Err(e);
            },
        };
        let result = invoke(action, msg, self.clone()).await;
        if let Err(e) = &result {
            warn!(kind = ?e.kind(), error = %e, "action failed");
        }
        result
    }

    /// The action `msg` would run locally.
    pub fn resolve(&self, msg: &Message) -> std::result::Result<Arc<Action>, ActError> {
        self.actions().resolve(msg)
    }

    /// Registered patterns with the length of their chains, in first
    /// registration order.
    pub fn patterns(&self) -> Vec<(Pattern, usize)> {
        self.actions()
            .iter()
            .map(|(pattern, chain)| (pattern.clone(), chain.len()))
            .collect()
    }

    // ── Transports ───────────────────────────────────────────────────────────

    /// Forward messages matching `pin` to `endpoint`. The connection opens on
    /// first use.
    pub fn client(&self, pin: Pattern, endpoint: Endpoint) -> Arc<RemoteLink> {
        info!(pin = %pin, endpoint = %endpoint, "pinned remote client");
        self.transports_mut()
            .pin_client(pin, endpoint, self.inner.options.timeout)
    }

    /// Accept remote messages matching `pin` on `endpoint`.
    pub async fn listen(&self, pin: Pattern, endpoint: Endpoint) -> Result<ListenerHandle> {
        let handle = listener::start(self.clone(), pin.clone(), &endpoint).await?;
        self.transports_mut()
            .pin_listener(pin, handle.endpoint().clone());
        Ok(handle)
    }

    pub(crate) fn unpin_listener(&self, pin: &Pattern, endpoint: &Endpoint) {
        if self.transports_mut().unpin_listener(pin, endpoint) {
            info!(pin = %pin, endpoint = %endpoint, "listener unpinned");
        }
    }

    pub fn lookup_transport(&self, msg: &Message) -> Option<TransportDescriptor> {
        self.transports().lookup_transport(msg).cloned()
    }

    pub fn pins(&self) -> Vec<(Pattern, TransportDescriptor)> {
        self.transports().pins()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("patterns", &self.actions().len())
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}
