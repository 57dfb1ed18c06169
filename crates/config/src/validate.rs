//! Configuration validation.
//!
//! Checks syntax, unknown or misspelled fields, value types, and transport
//! settings that would fail at startup (unparsable pins, `local` without a
//! path).

use std::path::{Path, PathBuf};

use {pinion_routing::Pattern, serde_json::Value};

use crate::schema::{PinConfig, PinionConfig, TransportKind};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "pin", "transport",
    /// "unknown-plugin"
    pub category: &'static str,
    /// Dotted path, e.g. "listen[0].pin"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(severity: Severity, category: &'static str, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{} [{}] {}", self.severity, self.category, self.message)
        } else {
            write!(
                f,
                "{} [{}] {}: {}",
                self.severity, self.category, self.path, self.message
            )
        }
    }
}

/// Result of validating a configuration file.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

// ── Known keys ──────────────────────────────────────────────────────────────

const TOP_LEVEL_KEYS: &[&str] = &["plugins", "transport", "listen", "client"];
const TRANSPORT_KEYS: &[&str] = &["timeout_ms"];
const PIN_KEYS: &[&str] = &["transport", "host", "port", "path", "pin"];

// ── Levenshtein distance ────────────────────────────────────────────────────

fn levenshtein(a: &str, b: &str) -> usize {
    let b_len = b.chars().count();
    if a.is_empty() {
        return b_len;
    }
    if b.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_len]
}

/// Closest candidate within `max_distance` edits, if any.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    let mut best: Option<(&'a str, usize)> = None;
    for &candidate in candidates {
        let d = levenshtein(needle, candidate);
        if d > 0 && d <= max_distance && best.as_ref().is_none_or(|(_, bd)| d < *bd) {
            best = Some((candidate, d));
        }
    }
    best.map(|(s, _)| s)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate a config file at the given path, or discover the default config
/// file location if `path` is `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => crate::loader::find_config_file(),
    };

    let Some(actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Info,
                "file-ref",
                "",
                "no config file found; using defaults",
            )],
            config_path: None,
        };
    };

    let mut result = match crate::loader::load_config_value(&actual_path) {
        Ok(value) => validate_value(&value),
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic::new(Severity::Error, "syntax", "", e.to_string())],
            config_path: None,
        },
    };
    result.config_path = Some(actual_path);
    result
}

/// Validate an already-parsed config tree.
#[must_use]
pub fn validate_value(value: &Value) -> ValidationResult {
    let mut diagnostics = Vec::new();

    check_unknown_fields(value, &mut diagnostics);

    match serde_json::from_value::<PinionConfig>(value.clone()) {
        Ok(config) => diagnostics.extend(check_config(&config)),
        Err(e) => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "type-error",
            "",
            format!("type error: {e}"),
        )),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

/// Validate a TOML string without touching the filesystem.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    match toml::from_str::<toml::Value>(toml_str) {
        Ok(v) => match serde_json::to_value(v) {
            Ok(value) => validate_value(&value),
            Err(e) => single_error("syntax", format!("TOML conversion error: {e}")),
        },
        Err(e) => single_error("syntax", format!("TOML syntax error: {e}")),
    }
}

fn single_error(category: &'static str, message: String) -> ValidationResult {
    ValidationResult {
        diagnostics: vec![Diagnostic::new(Severity::Error, category, "", message)],
        config_path: None,
    }
}

/// Semantic checks on a parsed config.
#[must_use]
pub fn check_config(config: &PinionConfig) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    if config.transport.timeout_ms == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "transport",
            "transport.timeout_ms",
            "timeout must be greater than zero",
        ));
    }

    for (name, options) in &config.plugins {
        if !options.is_object() {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "type-error",
                format!("plugins.{name}"),
                "plugin options must be a table",
            ));
        }
    }

    for (section, pins) in [("listen", &config.listen), ("client", &config.client)] {
        for (i, pin) in pins.iter().enumerate() {
            check_pin(&format!("{section}[{i}]"), pin, &mut diagnostics);
        }
    }

    let mut seen: Vec<(&TransportKind, String)> = Vec::new();
    for (i, pin) in config.listen.iter().enumerate() {
        let key = match pin.transport {
            TransportKind::Tcp => format!(
                "{}:{}",
                pin.host.as_deref().unwrap_or(pinion_protocol::DEFAULT_HOST),
                pin.port.unwrap_or(pinion_protocol::DEFAULT_PORT)
            ),
            TransportKind::Local => pin
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        };
        if seen.iter().any(|(t, k)| **t == pin.transport && *k == key) {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "transport",
                format!("listen[{i}]"),
                format!("{} endpoint {key} is bound twice", pin.transport),
            ));
        }
        seen.push((&pin.transport, key));
    }

    diagnostics
}

fn check_pin(path: &str, pin: &PinConfig, diagnostics: &mut Vec<Diagnostic>) {
    if let Err(e) = Pattern::parse(&pin.pin) {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "pin",
            format!("{path}.pin"),
            format!("invalid pin {:?}: {e}", pin.pin),
        ));
    }
    match pin.transport {
        TransportKind::Local => {
            if pin.path.is_none() {
                diagnostics.push(Diagnostic::new(
                    Severity::Error,
                    "transport",
                    path,
                    "local transport requires a path",
                ));
            }
            if pin.host.is_some() || pin.port.is_some() {
                diagnostics.push(Diagnostic::new(
                    Severity::Warning,
                    "transport",
                    path,
                    "host and port are ignored for local transport",
                ));
            }
        },
        TransportKind::Tcp => {
            if pin.port.is_none() {
                diagnostics.push(Diagnostic::new(
                    Severity::Warning,
                    "transport",
                    format!("{path}.port"),
                    format!("no port given; using {}", pinion_protocol::DEFAULT_PORT),
                ));
            }
            if pin.path.is_some() {
                diagnostics.push(Diagnostic::new(
                    Severity::Warning,
                    "transport",
                    format!("{path}.path"),
                    "path is ignored for tcp transport",
                ));
            }
        },
    }
}

/// Flag plugins that `known` does not list.
#[must_use]
pub fn check_plugin_names(config: &PinionConfig, known: &[&str]) -> Vec<Diagnostic> {
    config
        .plugin_names()
        .filter(|name| !known.contains(name))
        .map(|name| {
            let message = match suggest(name, known, 3) {
                Some(s) => format!("unknown plugin (did you mean \"{s}\"?)"),
                None => format!("unknown plugin (available: {})", known.join(", ")),
            };
            Diagnostic::new(Severity::Error, "unknown-plugin", format!("plugins.{name}"), message)
        })
        .collect()
}

fn check_unknown_fields(value: &Value, diagnostics: &mut Vec<Diagnostic>) {
    let Some(root) = value.as_object() else {
        return;
    };
    check_keys(root.keys(), "", TOP_LEVEL_KEYS, diagnostics);
    if let Some(transport) = root.get("transport").and_then(Value::as_object) {
        check_keys(transport.keys(), "transport", TRANSPORT_KEYS, diagnostics);
    }
    for section in ["listen", "client"] {
        let Some(items) = root.get(section).and_then(Value::as_array) else {
            continue;
        };
        for (i, item) in items.iter().enumerate() {
            if let Some(table) = item.as_object() {
                check_keys(table.keys(), &format!("{section}[{i}]"), PIN_KEYS, diagnostics);
            }
        }
    }
}

fn check_keys<'a>(
    keys: impl Iterator<Item = &'a String>,
    prefix: &str,
    known: &[&str],
    diagnostics: &mut Vec<Diagnostic>,
) {
    for key in keys {
        if known.contains(&key.as_str()) {
            continue;
        }
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        let level = if prefix.is_empty() {
            " at top level"
        } else {
            ""
        };
        let message = match suggest(key, known, 3) {
            Some(s) => format!("unknown field{level} (did you mean \"{s}\"?)"),
            None => format!("unknown field{level}"),
        };
        diagnostics.push(Diagnostic::new(Severity::Error, "unknown-field", path, message));
    }
}
