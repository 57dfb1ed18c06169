//! Pattern-keyed table with deterministic best-match resolution.
//!
//! Resolution rank (highest wins):
//! 1. Specificity (number of literal constraints)
//! 2. Registration stamp (the most recent registration of an equal pattern)
//!
//! Stamps come from a counter owned by the index, so the order is total and
//! independent of where an entry sits in storage.

use pinion_common::Message;

use crate::pattern::Pattern;

/// One pattern and the value registered under it.
#[derive(Debug, Clone)]
pub struct Entry<T> {
    pattern: Pattern,
    value: T,
    stamp: u64,
}

impl<T> Entry<T> {
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// Registration stamp of the latest `upsert` for this pattern.
    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    fn rank(&self) -> (usize, u64) {
        (self.pattern.specificity(), self.stamp)
    }
}

#[derive(Debug, Clone)]
pub struct PatternIndex<T> {
    entries: Vec<Entry<T>>,
    clock: u64,
}

impl<T> Default for PatternIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PatternIndex<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            clock: 0,
        }
    }

    /// Insert `value` under `pattern`. When an equal pattern already exists,
    /// `merge` folds the new value into the stored one instead. Either way
    /// the entry becomes the most recent registration; the returned stamp
    /// identifies it.
    pub fn upsert(&mut self, pattern: Pattern, value: T, merge: impl FnOnce(&mut T, T)) -> u64 {
        self.clock += 1;
        let stamp = self.clock;
        match self.entries.iter_mut().find(|e| e.pattern == pattern) {
            Some(entry) => {
                merge(&mut entry.value, value);
                entry.pattern = pattern;
                entry.stamp = stamp;
            },
            None => self.entries.push(Entry {
                pattern,
                value,
                stamp,
            }),
        }
        stamp
    }

    /// The best entry whose pattern matches `msg`.
    pub fn resolve(&self, msg: &Message) -> Option<&Entry<T>> {
        self.entries
            .iter()
            .filter(|e| e.pattern.matches(msg))
            .max_by_key(|e| e.rank())
    }

    /// Every entry matching `msg`, best first.
    pub fn candidates(&self, msg: &Message) -> Vec<&Entry<T>> {
        let mut found: Vec<_> = self
            .entries
            .iter()
            .filter(|e| e.pattern.matches(msg))
            .collect();
        found.sort_by_key(|e| std::cmp::Reverse(e.rank()));
        found
    }

    /// The entry registered under a pattern equal to `pattern`.
    pub fn get(&self, pattern: &Pattern) -> Option<&Entry<T>> {
        self.entries.iter().find(|e| &e.pattern == pattern)
    }

    /// Remove the entry registered under a pattern equal to `pattern`.
    pub fn remove(&mut self, pattern: &Pattern) -> Option<T> {
        let pos = self.entries.iter().position(|e| &e.pattern == pattern)?;
        Some(self.entries.remove(pos).value)
    }

    /// Entries in first-registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry<T>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use {super::*, crate::syntax::parse_message};

    fn p(src: &str) -> Pattern {
        Pattern::parse(src).unwrap()
    }

    fn m(src: &str) -> Message {
        parse_message(src).unwrap()
    }

    fn replace<T>(old: &mut T, new: T) {
        *old = new;
    }

    #[test]
    fn more_specific_pattern_wins_regardless_of_order() {
        let mut specific_first = PatternIndex::new();
        specific_first.upsert(p("role:math,cmd:sum,integer:true"), "integer", replace);
        specific_first.upsert(p("role:math,cmd:sum"), "sum", replace);

        let mut general_first = PatternIndex::new();
        general_first.upsert(p("role:math,cmd:sum"), "sum", replace);
        general_first.upsert(p("role:math,cmd:sum,integer:true"), "integer", replace);

        let msg = m("role:math,cmd:sum,left:1.5,right:2.5,integer:true");
        for index in [&specific_first, &general_first] {
            assert_eq!(*index.resolve(&msg).unwrap().value(), "integer");
            assert_eq!(*index.resolve(&m("role:math,cmd:sum,left:1")).unwrap().value(), "sum");
        }
    }

    #[rstest]
    #[case("a:1", "a:1,b:2", "a:1,b:2,c:3")]
    #[case("role:math", "role:math,cmd:sum", "role:math,cmd:sum,left:1")]
    #[case("x:true", "x:true,y:null", "x:true,y:null,z:[1]")]
    #[case("k:v", "k:v,w:*,q:1", "k:v,q:1")]
    fn subset_resolves_to_superset(#[case] small: &str, #[case] large: &str, #[case] msg: &str) {
        let msg = m(msg);
        for order in [[small, large], [large, small]] {
            let mut index = PatternIndex::new();
            for src in order {
                index.upsert(p(src), src.to_string(), replace);
            }
            assert!(p(small).matches(&msg) && p(large).matches(&msg));
            assert_eq!(index.resolve(&msg).unwrap().value(), large);
        }
    }

    #[test]
    fn equal_specificity_ties_go_to_most_recent() {
        let mut index = PatternIndex::new();
        index.upsert(p("role:math"), "role", replace);
        index.upsert(p("cmd:sum"), "cmd", replace);
        let msg = m("role:math,cmd:sum");
        assert_eq!(*index.resolve(&msg).unwrap().value(), "cmd");

        // Re-registering moves the pattern to the front of the tie-break.
        index.upsert(p("role:math"), "role again", replace);
        assert_eq!(*index.resolve(&msg).unwrap().value(), "role again");
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn resolution_is_deterministic() {
        let mut index = PatternIndex::new();
        for src in ["a:1", "b:2", "c:3", "a:1,b:2", "b:2,c:3"] {
            index.upsert(p(src), src, replace);
        }
        let msg = m("a:1,b:2,c:3");
        let first = index.resolve(&msg).unwrap().stamp();
        for _ in 0..10 {
            assert_eq!(index.resolve(&msg).unwrap().stamp(), first);
        }
        assert_eq!(*index.resolve(&msg).unwrap().value(), "b:2,c:3");
        let order: Vec<_> = index.candidates(&msg).iter().map(|e| *e.value()).collect();
        assert_eq!(order, ["b:2,c:3", "a:1,b:2", "c:3", "b:2", "a:1"]);
    }

    #[test]
    fn merge_folds_into_existing_entry() {
        let mut index: PatternIndex<Vec<&str>> = PatternIndex::new();
        index.upsert(p("role:math,cmd:sum"), vec!["first"], |old, new| old.extend(new));
        index.upsert(p("cmd:sum,role:math"), vec!["second"], |old, new| old.extend(new));
        assert_eq!(index.len(), 1);
        let entry = index.get(&p("role:math,cmd:sum")).unwrap();
        assert_eq!(entry.value(), &vec!["first", "second"]);
    }

    #[test]
    fn removed_pattern_no_longer_resolves() {
        let mut index = PatternIndex::new();
        index.upsert(p("role:math"), "broad", replace);
        index.upsert(p("role:math,cmd:sum"), "narrow", replace);
        let msg = m("role:math,cmd:sum");

        assert_eq!(index.remove(&p("cmd:sum,role:math")), Some("narrow"));
        assert_eq!(*index.resolve(&msg).unwrap().value(), "broad");
        assert!(index.remove(&p("role:math,cmd:sum")).is_none());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn no_match() {
        let mut index = PatternIndex::new();
        index.upsert(p("role:math,cmd:sum"), (), replace);
        assert!(index.resolve(&m("role:math,cmd:product")).is_none());
        assert!(index.resolve(&serde_json::Map::new()).is_none());
        assert!(index.candidates(&m("role:store")).is_empty());
    }
}
