//! Compact `key:value` syntax shared by patterns and messages.
//!
//! ```text
//! pairs  := pair (',' pair)* [',']
//! pair   := key ':' value
//! value  := '{' [pairs] '}' | '[' [value (',' value)*] ']' | quoted | bare
//! quoted := '"' ... '"' | '\'' ... '\''
//! bare   := text up to the next ',' or closing bracket, trimmed
//! ```
//!
//! Bare values are typed: `true`/`false`, `null` and JSON numbers keep their
//! JSON type, anything else is a string. Whitespace around keys and values is
//! insignificant and a repeated key keeps its last value.

use {pinion_common::Message, serde_json::Value};

use crate::error::{Error, Result};

/// Parse a compact message such as `role:math,cmd:sum,left:1,right:2` or
/// `role:store,add:book,data:{title:Action in Rust,price:9.99}`.
pub fn parse_message(src: &str) -> Result<Message> {
    let mut parser = Parser::new(src);
    let message = parser.pairs(None)?;
    Ok(message)
}

/// Type a bare (unquoted) token.
pub fn parse_scalar(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        _ => serde_json::from_str::<serde_json::Number>(raw)
            .map(Value::Number)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn current_char(&self) -> char {
        self.src[self.pos..].chars().next().unwrap_or('\0')
    }

    fn unexpected(&self) -> Error {
        Error::Unexpected {
            offset: self.pos,
            found: self.current_char(),
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// True when positioned on the closing delimiter (or at the end of input
    /// for the top level).
    fn at_close(&self, close: Option<u8>, opened_at: usize) -> Result<bool> {
        match (self.peek(), close) {
            (None, None) => Ok(true),
            (None, Some(_)) => Err(Error::Unterminated {
                offset: opened_at,
                what: "object",
            }),
            (Some(b), Some(c)) => Ok(b == c),
            (Some(_), None) => Ok(false),
        }
    }

    fn pairs(&mut self, close: Option<u8>) -> Result<Message> {
        let opened_at = self.pos.saturating_sub(1);
        let mut map = Message::new();
        loop {
            self.skip_ws();
            if self.at_close(close, opened_at)? {
                break;
            }
            let key = self.key()?;
            self.skip_ws();
            if self.peek() != Some(b':') {
                return Err(Error::MissingColon {
                    key,
                    offset: self.pos,
                });
            }
            self.pos += 1;
            let value = self.value(&key, close)?;
            map.insert(key, value);
            self.skip_ws();
            if self.peek() == Some(b',') {
                self.pos += 1;
                continue;
            }
            if self.at_close(close, opened_at)? {
                break;
            }
            return Err(self.unexpected());
        }
        Ok(map)
    }

    fn key(&mut self) -> Result<String> {
        let start = self.pos;
        if let Some(q @ (b'"' | b'\'')) = self.peek() {
            return self.quoted(q);
        }
        while let Some(b) = self.peek() {
            if matches!(b, b':' | b',' | b'{' | b'}' | b'[' | b']') {
                break;
            }
            self.pos += 1;
        }
        let key = self.src[start..self.pos].trim();
        if key.is_empty() {
            if self.peek().is_some_and(|b| b != b':') {
                return Err(self.unexpected());
            }
            return Err(Error::EmptyKey { offset: start });
        }
        Ok(key.to_string())
    }

    fn value(&mut self, key: &str, close: Option<u8>) -> Result<Value> {
        self.skip_ws();
        match self.peek() {
            Some(b'{') => {
                self.pos += 1;
                let map = self.pairs(Some(b'}'))?;
                self.pos += 1;
                Ok(Value::Object(map))
            },
            Some(b'[') => self.array(key),
            Some(q @ (b'"' | b'\'')) => self.quoted(q).map(Value::String),
            _ => {
                let start = self.pos;
                while let Some(b) = self.peek() {
                    if b == b',' || Some(b) == close {
                        break;
                    }
                    self.pos += 1;
                }
                let raw = self.src[start..self.pos].trim();
                if raw.is_empty() {
                    return Err(Error::MissingValue {
                        key: key.to_string(),
                        offset: start,
                    });
                }
                Ok(parse_scalar(raw))
            },
        }
    }

    fn array(&mut self, key: &str) -> Result<Value> {
        let opened_at = self.pos;
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                None => {
                    return Err(Error::Unterminated {
                        offset: opened_at,
                        what: "array",
                    });
                },
                Some(b']') => {
                    self.pos += 1;
                    break;
                },
                _ => {},
            }
            items.push(self.value(key, Some(b']'))?);
            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    break;
                },
                None => {
                    return Err(Error::Unterminated {
                        offset: opened_at,
                        what: "array",
                    });
                },
                Some(_) => return Err(self.unexpected()),
            }
        }
        Ok(Value::Array(items))
    }

    fn quoted(&mut self, quote: u8) -> Result<String> {
        let opened_at = self.pos;
        self.pos += 1;
        let mut out = String::new();
        let mut run_start = self.pos;
        loop {
            match self.peek() {
                None => {
                    return Err(Error::Unterminated {
                        offset: opened_at,
                        what: "string",
                    });
                },
                Some(b) if b == quote => {
                    out.push_str(&self.src[run_start..self.pos]);
                    self.pos += 1;
                    return Ok(out);
                },
                Some(b'\\') => {
                    out.push_str(&self.src[run_start..self.pos]);
                    self.pos += 1;
                    if self.peek().is_none() {
                        return Err(Error::Unterminated {
                            offset: opened_at,
                            what: "string",
                        });
                    }
                    let escaped = self.current_char();
                    out.push(escaped);
                    self.pos += escaped.len_utf8();
                    run_start = self.pos;
                },
                Some(_) => self.pos += 1,
            }
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {rstest::rstest, serde_json::json};

    use super::*;

    fn parsed(src: &str) -> Value {
        Value::Object(parse_message(src).unwrap())
    }

    #[test]
    fn flat_message_with_typed_scalars() {
        assert_eq!(
            parsed("role:math, cmd:sum, left:1.5, right:2, integer:true, note:null"),
            json!({
                "role": "math",
                "cmd": "sum",
                "left": 1.5,
                "right": 2,
                "integer": true,
                "note": null
            })
        );
    }

    #[test]
    fn nested_object_and_array() {
        assert_eq!(
            parsed("role:store,add:book,data:{title:Action in Rust,price:9.99,tags:[new, 2]}"),
            json!({
                "role": "store",
                "add": "book",
                "data": {"title": "Action in Rust", "price": 9.99, "tags": ["new", 2]}
            })
        );
    }

    #[test]
    fn quoted_values_keep_delimiters_and_types() {
        assert_eq!(
            parsed(r#"title:"a, b: {c}", flag:'true', esc:"say \"hi\"""#),
            json!({"title": "a, b: {c}", "flag": "true", "esc": "say \"hi\""})
        );
    }

    #[test]
    fn key_order_is_preserved() {
        let msg = parse_message("z:1,a:2,m:3").unwrap();
        let keys: Vec<_> = msg.keys().map(String::as_str).collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }

    #[test]
    fn trailing_comma_and_empty_input() {
        assert_eq!(parsed("a:1,"), json!({"a": 1}));
        assert!(parse_message("").unwrap().is_empty());
        assert_eq!(parsed("data:{}, list:[]"), json!({"data": {}, "list": []}));
    }

    #[test]
    fn repeated_key_keeps_last_value() {
        assert_eq!(parsed("a:1,a:2"), json!({"a": 2}));
    }

    #[test]
    fn non_ascii_text() {
        assert_eq!(parsed("title:名前, price:1"), json!({"title": "名前", "price": 1}));
    }

    #[rstest]
    #[case("42", json!(42))]
    #[case("-7", json!(-7))]
    #[case("1e3", json!(1000.0))]
    #[case("01", json!("01"))]
    #[case("+1", json!("+1"))]
    #[case("NaN", json!("NaN"))]
    #[case("false", json!(false))]
    #[case("*", json!("*"))]
    fn scalar_typing(#[case] raw: &str, #[case] expected: Value) {
        assert_eq!(parse_scalar(raw), expected);
    }

    #[rstest]
    #[case("role", Error::MissingColon { key: "role".into(), offset: 4 })]
    #[case(":math", Error::EmptyKey { offset: 0 })]
    #[case("role:", Error::MissingValue { key: "role".into(), offset: 5 })]
    #[case("data:{a:1", Error::Unterminated { offset: 5, what: "object" })]
    #[case("list:[1,2", Error::Unterminated { offset: 5, what: "array" })]
    #[case("t:\"open", Error::Unterminated { offset: 2, what: "string" })]
    #[case("a:{b:1}x", Error::Unexpected { offset: 7, found: 'x' })]
    fn syntax_errors(#[case] src: &str, #[case] expected: Error) {
        assert_eq!(parse_message(src).unwrap_err(), expected);
    }
}
