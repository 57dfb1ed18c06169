//! Registered actions and the context a handler runs with.

use std::{
    any::Any,
    fmt,
    future::Future,
    panic::AssertUnwindSafe,
    pin::Pin,
    sync::Arc,
};

use {
    futures::FutureExt,
    pinion_common::Message,
    pinion_routing::Pattern,
    tracing::{debug, error},
};

use crate::{dispatcher::Dispatcher, error::ActError};

pub type ActResult = Result<Message, ActError>;

pub type ActionFuture = Pin<Box<dyn Future<Output = ActResult> + Send>>;

pub type HandlerFn = Arc<dyn Fn(Message, ActionContext) -> ActionFuture + Send + Sync>;

/// Wrap an async closure as a [`HandlerFn`].
pub fn handler<F, Fut>(f: F) -> HandlerFn
where
    F: Fn(Message, ActionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ActResult> + Send + 'static,
{
    Arc::new(move |msg, ctx| Box::pin(f(msg, ctx)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(pub(crate) u64);

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "action-{}", self.0)
    }
}

/// A handler registered under a pattern.
///
/// `prior` is fixed at registration: it is the action that was active for
/// the same pattern (or, failing that, the one the pattern itself resolved
/// to) just before this one was added. The chain only ever points at older
/// actions, so walking it terminates.
pub struct Action {
    pub(crate) id: ActionId,
    pub(crate) pattern: Pattern,
    pub(crate) handler: HandlerFn,
    pub(crate) prior: Option<Arc<Action>>,
}

impl Action {
    pub fn id(&self) -> ActionId {
        self.id
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn prior(&self) -> Option<&Arc<Action>> {
        self.prior.as_ref()
    }

    /// Number of actions reachable through `prior`, this one included.
    pub fn depth(&self) -> usize {
        std::iter::successors(Some(self), |a| a.prior.as_deref()).count()
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("id", &self.id)
            .field("pattern", &self.pattern.to_string())
            .field("prior", &self.prior.as_ref().map(|p| p.id))
            .finish_non_exhaustive()
    }
}

/// What a running handler can reach: its own prior and the dispatcher.
#[derive(Clone)]
pub struct ActionContext {
    action: Arc<Action>,
    dispatcher: Dispatcher,
}

impl ActionContext {
    pub fn action_id(&self) -> ActionId {
        self.action.id
    }

    pub fn pattern(&self) -> &Pattern {
        &self.action.pattern
    }

    pub fn has_prior(&self) -> bool {
        self.action.prior.is_some()
    }

    /// Run the action this one overrode. Fails with `NoMatch` when there is
    /// none.
    pub fn prior(&self, msg: Message) -> ActionFuture {
        match &self.action.prior {
            Some(prior) => invoke(Arc::clone(prior), msg, self.dispatcher.clone()),
            None => {
                let err = ActError::no_match(&msg);
                Box::pin(async move { Err(err) })
            },
        }
    }

    /// Send a new message through the full dispatch path.
    pub async fn act(&self, msg: Message) -> ActResult {
        self.dispatcher.send(msg).await
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

impl fmt::Debug for ActionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionContext")
            .field("action", &self.action)
            .finish_non_exhaustive()
    }
}

/// Run `action` on `msg`. A handler that panics yields a handler error
/// instead of unwinding into the caller.
pub(crate) fn invoke(action: Arc<Action>, msg: Message, dispatcher: Dispatcher) -> ActionFuture {
    debug!(action = %action.id, pattern = %action.pattern, "invoking action");
    let ctx = ActionContext {
        action: Arc::clone(&action),
        dispatcher,
    };
    let started = std::panic::catch_unwind(AssertUnwindSafe(|| (action.handler)(msg, ctx)));
    Box::pin(async move {
        let fut = match started {
            Ok(fut) => fut,
            Err(panic) => return Err(panicked(&action, panic.as_ref())),
        };
        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(panicked(&action, panic.as_ref())),
        }
    })
}

fn panicked(action: &Action, payload: &(dyn Any + Send)) -> ActError {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".into());
    error!(action = %action.id, pattern = %action.pattern, panic = %detail, "action handler panicked");
    ActError::handler(format!("handler for {} panicked: {detail}", action.pattern))
}
