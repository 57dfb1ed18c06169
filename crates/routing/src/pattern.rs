//! Partial-attribute patterns and how they match messages.

use std::{collections::BTreeMap, fmt, str::FromStr};

use {
    pinion_common::{Message, message::is_scalar, values_equal},
    serde_json::Value,
};

use crate::{
    error::{Error, Result},
    syntax::{parse_message, parse_scalar},
};

/// The marker that turns a pattern value into a wildcard.
pub const WILDCARD: &str = "*";

/// A single key constraint.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// The message must carry this key with an equal value.
    Literal(Value),
    /// Documents that any value (or none) is accepted.
    Wildcard,
}

/// An immutable set of key constraints.
///
/// Keys are kept sorted, so two patterns built from the same pairs in a
/// different order are indistinguishable. Equality only considers literal
/// constraints: `role:api,path:*` equals `role:api`.
#[derive(Debug, Clone)]
pub struct Pattern {
    constraints: BTreeMap<String, Constraint>,
}

impl Pattern {
    /// Parse `key:value` pairs, e.g. `role:math, cmd:sum`.
    pub fn parse(src: &str) -> Result<Self> {
        Self::from_message(&parse_message(src)?)
    }

    /// Build a pattern from structured form. Values must be scalars; the
    /// string `"*"` becomes a wildcard.
    pub fn from_message(msg: &Message) -> Result<Self> {
        if msg.is_empty() {
            return Err(Error::EmptyPattern);
        }
        let mut constraints = BTreeMap::new();
        for (key, value) in msg {
            let constraint = match value {
                Value::String(s) if s == WILDCARD => Constraint::Wildcard,
                v if is_scalar(v) => Constraint::Literal(v.clone()),
                _ => return Err(Error::NonScalar { key: key.clone() }),
            };
            constraints.insert(key.clone(), constraint);
        }
        Ok(Self { constraints })
    }

    /// True when every literal constraint is present in `msg` with an equal value.
    pub fn matches(&self, msg: &Message) -> bool {
        self.literals()
            .all(|(key, want)| msg.get(key).is_some_and(|got| values_equal(got, want)))
    }

    /// Number of literal constraints.
    pub fn specificity(&self) -> usize {
        self.literals().count()
    }

    pub fn literals(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.constraints.iter().filter_map(|(k, c)| match c {
            Constraint::Literal(v) => Some((k.as_str(), v)),
            Constraint::Wildcard => None,
        })
    }

    pub fn wildcards(&self) -> impl Iterator<Item = &str> {
        self.constraints
            .iter()
            .filter(|(_, c)| matches!(c, Constraint::Wildcard))
            .map(|(k, _)| k.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&Constraint> {
        self.constraints.get(key)
    }

    /// The literal constraints viewed as a message.
    pub fn to_message(&self) -> Message {
        self.literals()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    /// True when every literal constraint of `self` also appears in `other`.
    pub fn is_subset_of(&self, other: &Pattern) -> bool {
        other.matches(&self.to_message())
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.specificity() == other.specificity() && self.is_subset_of(other)
    }
}

impl Eq for Pattern {}

impl FromStr for Pattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<&Message> for Pattern {
    type Error = Error;

    fn try_from(msg: &Message) -> Result<Self> {
        Self::from_message(msg)
    }
}

/// Canonical form with sorted keys; parses back to an equal pattern.
impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, constraint)) in self.constraints.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{key}:")?;
            match constraint {
                Constraint::Wildcard => f.write_str(WILDCARD)?,
                Constraint::Literal(Value::String(s)) if needs_quotes(s) => {
                    write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))?
                },
                Constraint::Literal(Value::String(s)) => f.write_str(s)?,
                Constraint::Literal(v) => write!(f, "{v}")?,
            }
        }
        Ok(())
    }
}

fn needs_quotes(s: &str) -> bool {
    s.is_empty()
        || s == WILDCARD
        || s.trim() != s
        || s.contains([',', ':', '{', '}', '[', ']', '"', '\''])
        || parse_scalar(s) != Value::String(s.to_string())
}
