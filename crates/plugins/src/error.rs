use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("unknown plugin {name:?}")]
    UnknownPlugin { name: String },

    #[error("invalid options for plugin {plugin}: {reason}")]
    InvalidOptions { plugin: String, reason: String },

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn invalid_options(plugin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOptions {
            plugin: plugin.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

impl pinion_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pinion_common::impl_context!();
