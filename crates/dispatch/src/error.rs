use {
    pinion_common::{FromMessage, Message},
    pinion_protocol::{ErrorShape, error_codes},
    serde_json::Value,
};

// ── Action errors ────────────────────────────────────────────────────────────

/// The failure side of every `send`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NoMatch,
    Handler,
    Transport,
    Initialization,
}

/// Failure delivered through the result of `send`, an invoked prior, or a
/// plugin's startup step.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActError {
    /// No registered pattern matches the message.
    #[error("no action matches {message}")]
    NoMatch { message: String },

    /// A handler reported failure.
    #[error("{message}")]
    Handler {
        message: String,
        details: Option<Value>,
    },

    /// Connection refused or reset, or a remote reply timed out.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// A plugin's startup step failed.
    #[error("plugin {plugin} failed to initialize: {message}")]
    Initialization { plugin: String, message: String },
}

impl ActError {
    #[must_use]
    pub fn no_match(msg: &Message) -> Self {
        Self::NoMatch {
            message: serde_json::to_string(msg).unwrap_or_else(|_| "<unprintable>".into()),
        }
    }

    #[must_use]
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler {
            message: message.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn handler_with_details(message: impl Into<String>, details: Value) -> Self {
        Self::Handler {
            message: message.into(),
            details: Some(details),
        }
    }

    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn initialization(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Initialization {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoMatch { .. } => ErrorKind::NoMatch,
            Self::Handler { .. } => ErrorKind::Handler,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Initialization { .. } => ErrorKind::Initialization,
        }
    }

    /// Wire representation, used when replying over a remote link.
    pub fn to_shape(&self) -> ErrorShape {
        match self {
            Self::NoMatch { message } => ErrorShape::new(error_codes::NO_MATCH, message),
            Self::Handler { message, details } => {
                let shape = ErrorShape::new(error_codes::HANDLER_ERROR, message);
                match details {
                    Some(d) => shape.with_details(d.clone()),
                    None => shape,
                }
            },
            Self::Transport { message } => ErrorShape::new(error_codes::TRANSPORT_ERROR, message),
            Self::Initialization { plugin, message } => {
                ErrorShape::new(error_codes::INIT_ERROR, message)
                    .with_details(serde_json::json!({ "plugin": plugin }))
            },
        }
    }

    /// Rebuild an error received from a remote process. Unknown codes are
    /// reported as handler errors with the code kept in `details`.
    pub fn from_shape(shape: ErrorShape) -> Self {
        let ErrorShape {
            code,
            message,
            details,
        } = shape;
        match code.as_str() {
            error_codes::NO_MATCH => Self::NoMatch { message },
            error_codes::HANDLER_ERROR => Self::Handler { message, details },
            error_codes::TRANSPORT_ERROR => Self::Transport { message },
            error_codes::INIT_ERROR => Self::Initialization {
                plugin: details
                    .as_ref()
                    .and_then(|d| d.get("plugin"))
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
                message,
            },
            _ => Self::Handler {
                message,
                details: Some(serde_json::json!({ "code": code, "details": details })),
            },
        }
    }
}

impl From<ErrorShape> for ActError {
    fn from(shape: ErrorShape) -> Self {
        Self::from_shape(shape)
    }
}

// ── Setup errors ─────────────────────────────────────────────────────────────

/// Errors raised while wiring a dispatcher (patterns, sockets, config).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Pattern(#[from] pinion_routing::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pinion_common::impl_context!();

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {rstest::rstest, serde_json::json};

    use super::*;

    #[rstest]
    #[case(ActError::NoMatch { message: r#"{"role":"x"}"#.into() }, error_codes::NO_MATCH)]
    #[case(ActError::handler("bad input"), error_codes::HANDLER_ERROR)]
    #[case(ActError::handler_with_details("bad", json!({"field": "left"})), error_codes::HANDLER_ERROR)]
    #[case(ActError::transport("connection reset"), error_codes::TRANSPORT_ERROR)]
    #[case(ActError::initialization("math", "cannot open log"), error_codes::INIT_ERROR)]
    fn shape_conversion_is_lossless(#[case] err: ActError, #[case] code: &str) {
        let shape = err.to_shape();
        assert_eq!(shape.code, code);
        assert_eq!(ActError::from_shape(shape), err);
    }

    #[test]
    fn unknown_code_becomes_handler_error() {
        let err = ActError::from(ErrorShape::new("TEAPOT", "short and stout"));
        assert_eq!(err.kind(), ErrorKind::Handler);
        assert_eq!(err.to_string(), "short and stout");
        let ActError::Handler { details, .. } = err else {
            panic!("expected handler error");
        };
        assert_eq!(details.unwrap()["code"], "TEAPOT");
    }

    #[test]
    fn no_match_renders_message() {
        let msg = json!({"role": "math", "cmd": "div"}).as_object().cloned().unwrap();
        let err = ActError::no_match(&msg);
        assert_eq!(err.kind(), ErrorKind::NoMatch);
        assert_eq!(err.to_string(), r#"no action matches {"role":"math","cmd":"div"}"#);
    }
}
