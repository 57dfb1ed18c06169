use std::sync::Arc;

use {
    pinion_common::Message,
    pinion_routing::{Pattern, PatternIndex},
};

use crate::{
    action::{Action, ActionId, HandlerFn},
    error::ActError,
};

/// Every registered action, keyed by pattern.
///
/// Each pattern holds its chain oldest first; the last element is the
/// active action.
#[derive(Default)]
pub struct ActionTable {
    index: PatternIndex<Vec<Arc<Action>>>,
    next_id: u64,
}

impl ActionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, pattern: Pattern, handler: HandlerFn) -> Arc<Action> {
        let prior = self.prior_for(&pattern);
        self.next_id += 1;
        let action = Arc::new(Action {
            id: ActionId(self.next_id),
            pattern: pattern.clone(),
            handler,
            prior,
        });
        self.index
            .upsert(pattern, vec![Arc::clone(&action)], |chain, new| chain.extend(new));
        action
    }

    /// The action a new registration under `pattern` will override: the
    /// active action for an equal pattern, or else whatever the pattern's
    /// own literals resolve to.
    fn prior_for(&self, pattern: &Pattern) -> Option<Arc<Action>> {
        match self.index.get(pattern) {
            Some(entry) => entry.value().last().cloned(),
            None => self
                .index
                .resolve(&pattern.to_message())
                .and_then(|entry| entry.value().last().cloned()),
        }
    }

    pub fn resolve(&self, msg: &Message) -> Result<Arc<Action>, ActError> {
        self.index
            .resolve(msg)
            .and_then(|entry| entry.value().last().cloned())
            .ok_or_else(|| ActError::no_match(msg))
    }

    /// Actions registered under a pattern equal to `pattern`, oldest first.
    pub fn chain(&self, pattern: &Pattern) -> Vec<Arc<Action>> {
        self.index
            .get(pattern)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Pattern, &[Arc<Action>])> {
        self.index
            .iter()
            .map(|entry| (entry.pattern(), entry.value().as_slice()))
    }

    /// Number of distinct patterns.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {pinion_routing::parse_message, serde_json::json};

    use {super::*, crate::action::handler};

    fn noop() -> HandlerFn {
        handler(|msg, _ctx| async move { Ok(msg) })
    }

    fn p(src: &str) -> Pattern {
        Pattern::parse(src).unwrap()
    }

    #[test]
    fn equal_pattern_chains_onto_active_action() {
        let mut table = ActionTable::new();
        let first = table.register(p("role:math,cmd:sum"), noop());
        let second = table.register(p("cmd:sum,role:math"), noop());
        let third = table.register(p("role:math,cmd:sum"), noop());

        assert!(first.prior().is_none());
        assert_eq!(second.prior().unwrap().id(), first.id());
        assert_eq!(third.prior().unwrap().id(), second.id());
        assert_eq!(third.depth(), 3);
        assert_eq!(table.len(), 1);
        assert_eq!(table.chain(&p("role:math,cmd:sum")).len(), 3);

        let msg = parse_message("role:math,cmd:sum,left:1,right:2").unwrap();
        assert_eq!(table.resolve(&msg).unwrap().id(), third.id());
    }

    #[test]
    fn more_specific_pattern_overrides_resolved_action() {
        let mut table = ActionTable::new();
        let sum = table.register(p("role:math,cmd:sum"), noop());
        let integer = table.register(p("role:math,cmd:sum,integer:true"), noop());
        assert_eq!(integer.prior().unwrap().id(), sum.id());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn unrelated_pattern_has_no_prior() {
        let mut table = ActionTable::new();
        table.register(p("role:math,cmd:sum"), noop());
        let general = table.register(p("role:math"), noop());
        assert!(general.prior().is_none());
    }

    #[test]
    fn resolve_without_match_is_no_match() {
        let mut table = ActionTable::new();
        table.register(p("role:math,cmd:sum"), noop());
        let msg = json!({"role": "math", "cmd": "product"}).as_object().cloned().unwrap();
        let err = table.resolve(&msg).unwrap_err();
        assert_eq!(err, ActError::no_match(&msg));
        assert!(ActionTable::new().resolve(&msg).is_err());
    }
}
