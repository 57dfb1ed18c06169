//! Plugins shipped with the binary, selected by name from config.

use std::sync::Arc;

use crate::host::Plugin;

pub mod math;
pub mod math_integer;
pub mod math_valid;

pub use {math::MathPlugin, math_integer::MathIntegerPlugin, math_valid::MathValidPlugin};

/// Names accepted under `[plugins]`.
pub const NAMES: &[&str] = &["math", "math-integer", "math-valid"];

pub fn by_name(name: &str) -> Option<Arc<dyn Plugin>> {
    match name {
        "math" => Some(Arc::new(MathPlugin)),
        "math-integer" => Some(Arc::new(MathIntegerPlugin)),
        "math-valid" => Some(Arc::new(MathValidPlugin)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_name_resolves_to_itself() {
        for name in NAMES {
            let plugin = by_name(name);
            assert_eq!(plugin.map(|p| p.name().to_string()).as_deref(), Some(*name));
        }
        assert!(by_name("math-fancy").is_none());
    }
}
