use std::{sync::Arc, time::Duration};

use {
    pinion_common::Message,
    pinion_routing::{Pattern, PatternIndex},
};

use crate::transport::{endpoint::Endpoint, link::RemoteLink};

/// How messages under a pinned prefix are handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportDescriptor {
    /// This process accepts remote messages for the prefix.
    LocalListener { bind: Endpoint },
    /// Messages for the prefix are forwarded to another process.
    RemoteClient { endpoint: Endpoint },
}

struct Pinned {
    descriptor: TransportDescriptor,
    link: Option<Arc<RemoteLink>>,
}

/// Pins resolved with the same specificity rules as actions.
///
/// Outbound routing only considers remote-client pins: a listener pin exposes
/// local actions to other processes and never keeps a message under a remote
/// pin from being forwarded.
#[derive(Default)]
pub struct TransportRegistry {
    pins: PatternIndex<Pinned>,
}

impl TransportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin `prefix` to a listener. Re-pinning an equal prefix replaces it.
    pub fn pin_listener(&mut self, prefix: Pattern, bind: Endpoint) {
        self.insert(prefix, Pinned {
            descriptor: TransportDescriptor::LocalListener { bind },
            link: None,
        });
    }

    /// Pin `prefix` to a remote endpoint and return the link that will carry it.
    pub fn pin_client(&mut self, prefix: Pattern, endpoint: Endpoint, timeout: Duration) -> Arc<RemoteLink> {
        let link = Arc::new(RemoteLink::new(endpoint.clone(), timeout));
        self.insert(prefix, Pinned {
            descriptor: TransportDescriptor::RemoteClient { endpoint },
            link: Some(Arc::clone(&link)),
        });
        link
    }

    fn insert(&mut self, prefix: Pattern, pinned: Pinned) {
        self.pins.upsert(prefix, pinned, |old, new| *old = new);
    }

    /// Remove a listener pin, but only while it still points at `bind`.
    pub fn unpin_listener(&mut self, prefix: &Pattern, bind: &Endpoint) -> bool {
        let still_pinned = matches!(
            self.pins.get(prefix).map(|entry| &entry.value().descriptor),
            Some(TransportDescriptor::LocalListener { bind: pinned }) if pinned == bind
        );
        if still_pinned {
            self.pins.remove(prefix);
        }
        still_pinned
    }

    /// The transport governing `msg`: its best remote-client pin when one
    /// matches, otherwise its best listener pin.
    pub fn lookup_transport(&self, msg: &Message) -> Option<&TransportDescriptor> {
        self.best_remote(msg)
            .or_else(|| self.pins.resolve(msg).map(|entry| entry.value()))
            .map(|pinned| &pinned.descriptor)
    }

    /// The link to forward `msg` over, when any remote-client pin matches it.
    pub fn remote_link(&self, msg: &Message) -> Option<Arc<RemoteLink>> {
        self.best_remote(msg).and_then(|pinned| pinned.link.clone())
    }

    fn best_remote(&self, msg: &Message) -> Option<&Pinned> {
        self.pins
            .candidates(msg)
            .into_iter()
            .map(|entry| entry.value())
            .find(|pinned| pinned.link.is_some())
    }

    pub fn pins(&self) -> Vec<(Pattern, TransportDescriptor)> {
        self.pins
            .iter()
            .map(|entry| (entry.pattern().clone(), entry.value().descriptor.clone()))
            .collect()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use pinion_routing::parse_message;

    use super::*;

    fn p(src: &str) -> Pattern {
        Pattern::parse(src).unwrap()
    }

    #[test]
    fn remote_pin_outranks_narrower_listener_pin() {
        let mut registry = TransportRegistry::new();
        let timeout = Duration::from_secs(1);
        registry.pin_client(p("role:math"), Endpoint::tcp("127.0.0.1", 9001), timeout);
        registry.pin_listener(p("role:math,cmd:sum"), Endpoint::tcp("127.0.0.1", 9002));

        let remote = TransportDescriptor::RemoteClient {
            endpoint: Endpoint::tcp("127.0.0.1", 9001),
        };
        for src in ["role:math,cmd:sum,left:1", "role:math,cmd:product"] {
            let msg = parse_message(src).unwrap();
            assert_eq!(registry.lookup_transport(&msg), Some(&remote));
            let link = registry.remote_link(&msg).unwrap();
            assert_eq!(link.endpoint(), &Endpoint::tcp("127.0.0.1", 9001));
        }

        assert!(registry.lookup_transport(&parse_message("role:store").unwrap()).is_none());
    }

    #[test]
    fn most_specific_remote_pin_wins() {
        let mut registry = TransportRegistry::new();
        let timeout = Duration::from_secs(1);
        registry.pin_client(p("role:math"), Endpoint::tcp("127.0.0.1", 9001), timeout);
        registry.pin_client(p("role:math,cmd:sum"), Endpoint::tcp("127.0.0.1", 9003), timeout);

        let sum = parse_message("role:math,cmd:sum").unwrap();
        assert_eq!(
            registry.remote_link(&sum).unwrap().endpoint(),
            &Endpoint::tcp("127.0.0.1", 9003)
        );
    }

    #[test]
    fn listener_pin_alone_keeps_messages_local() {
        let mut registry = TransportRegistry::new();
        let bind = Endpoint::tcp("127.0.0.1", 9002);
        registry.pin_listener(p("role:math"), bind.clone());

        let msg = parse_message("role:math,cmd:sum").unwrap();
        assert!(registry.remote_link(&msg).is_none());
        assert_eq!(
            registry.lookup_transport(&msg),
            Some(&TransportDescriptor::LocalListener { bind: bind.clone() })
        );

        assert!(!registry.unpin_listener(&p("role:math"), &Endpoint::tcp("127.0.0.1", 1)));
        assert!(registry.unpin_listener(&p("role:math"), &bind));
        assert!(registry.lookup_transport(&msg).is_none());
        assert!(registry.pins().is_empty());
    }

    #[test]
    fn repinning_replaces() {
        let mut registry = TransportRegistry::new();
        let timeout = Duration::from_secs(1);
        registry.pin_client(p("role:math"), Endpoint::tcp("127.0.0.1", 9001), timeout);
        registry.pin_client(p("role:math"), Endpoint::tcp("127.0.0.1", 9003), timeout);
        let pins = registry.pins();
        assert_eq!(pins.len(), 1);
        assert_eq!(pins[0].1, TransportDescriptor::RemoteClient {
            endpoint: Endpoint::tcp("127.0.0.1", 9003)
        });
    }
}
