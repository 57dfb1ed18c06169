//! The message envelope routed by the dispatcher.
//!
//! A message is an ordered JSON object. Key order is preserved end to end
//! (`serde_json` is built with `preserve_order`), so a message printed after a
//! round trip over the wire reads the same as the one that was sent.

use serde_json::{Map, Number, Value};

/// An ordered mapping from string keys to arbitrary JSON values.
pub type Message = Map<String, Value>;

/// Compare two values the way pattern matching does.
///
/// Numbers compare by numeric value (`1`, `1.0` and `1e0` are equal); every
/// other variant compares structurally, recursing into arrays and objects.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        },
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        },
        _ => a == b,
    }
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    match (integer(x), integer(y)) {
        (Some(a), Some(b)) => a == b,
        (Some(i), None) => y.as_f64().is_some_and(|f| float_equals_integer(f, i)),
        (None, Some(i)) => x.as_f64().is_some_and(|f| float_equals_integer(f, i)),
        (None, None) => x.as_f64() == y.as_f64(),
    }
}

fn integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

/// Exact comparison: `f` must be integral and inside the 64-bit integer range.
fn float_equals_integer(f: f64, i: i128) -> bool {
    const MIN: f64 = -9_223_372_036_854_775_808.0; // -2^63
    const MAX: f64 = 18_446_744_073_709_551_616.0; // 2^64
    f.fract() == 0.0 && (MIN..MAX).contains(&f) && f as i128 == i
}

/// Build a JSON number, preferring an integer representation when `n` has no
/// fractional part. Non-finite input becomes `null`.
pub fn number_value(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        return Value::from(n as i64);
    }
    Number::from_f64(n).map_or(Value::Null, Value::Number)
}

/// Returns true for strings, numbers, booleans and null.
pub fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {rstest::rstest, serde_json::json};

    use super::*;

    #[rstest]
    #[case(json!(1), json!(1.0), true)]
    #[case(json!(3), json!(3u64), true)]
    #[case(json!(-2), json!(-2.0), true)]
    #[case(json!(1), json!(2), false)]
    #[case(json!("1"), json!(1), false)]
    #[case(json!(true), json!(true), true)]
    #[case(json!(null), json!(null), true)]
    #[case(json!([1, 2.0]), json!([1.0, 2]), true)]
    #[case(json!([1, 2]), json!([2, 1]), false)]
    #[case(json!({"a": 1, "b": {"c": 2}}), json!({"b": {"c": 2.0}, "a": 1}), true)]
    #[case(json!({"a": 1}), json!({"a": 1, "b": 2}), false)]
    #[case(json!(9_007_199_254_740_993i64), json!(9_007_199_254_740_992.0), false)]
    #[case(json!(9_007_199_254_740_992i64), json!(9_007_199_254_740_992.0), true)]
    #[case(json!(u64::MAX), json!(18_446_744_073_709_551_616.0), false)]
    #[case(json!(-1), json!(u64::MAX), false)]
    #[case(json!(1), json!(1.5), false)]
    fn value_equality(#[case] a: Value, #[case] b: Value, #[case] expected: bool) {
        assert_eq!(values_equal(&a, &b), expected);
        assert_eq!(values_equal(&b, &a), expected);
    }

    #[test]
    fn number_value_prefers_integers() {
        assert_eq!(number_value(3.0), json!(3));
        assert_eq!(number_value(-4.0), json!(-4));
        assert_eq!(number_value(2.5), json!(2.5));
        assert_eq!(number_value(f64::NAN), Value::Null);
    }

    #[test]
    fn scalars() {
        assert!(is_scalar(&json!("x")));
        assert!(is_scalar(&json!(null)));
        assert!(!is_scalar(&json!([1])));
        assert!(!is_scalar(&json!({"a": 1})));
    }
}
