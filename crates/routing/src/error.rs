#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("unexpected {found:?} at offset {offset}")]
    Unexpected { offset: usize, found: char },

    #[error("unterminated {what} starting at offset {offset}")]
    Unterminated { offset: usize, what: &'static str },

    #[error("expected ':' after key {key:?} at offset {offset}")]
    MissingColon { key: String, offset: usize },

    #[error("empty key at offset {offset}")]
    EmptyKey { offset: usize },

    #[error("missing value for key {key:?} at offset {offset}")]
    MissingValue { key: String, offset: usize },

    #[error("pattern has no constraints")]
    EmptyPattern,

    #[error("pattern value for {key:?} must be a scalar")]
    NonScalar { key: String },
}

pub type Result<T> = std::result::Result<T, Error>;
