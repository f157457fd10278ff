use thiserror::Error;

use crate::models::Role;

#[derive(Debug, Error)]
pub enum WellbeingError {
    #[error("mood must be between 1 and 5, got {0}")]
    InvalidMood(u8),

    #[error("stored value under `{key}` is not valid JSON")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode value for storage")]
    Encode(#[from] serde_json::Error),

    #[error("no roster member with id {0}")]
    UnknownMember(String),

    #[error("{id} is a {role} and cannot {action}")]
    RoleNotAllowed {
        id: String,
        role: Role,
        action: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, WellbeingError>;
