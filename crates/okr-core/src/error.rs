use thiserror::Error;

#[derive(Debug, Error)]
pub enum OkrError {
    #[error("objective not found: {0}")]
    ObjectiveNotFound(String),

    #[error("activity not found: {0}")]
    ActivityNotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("token error: {0}")]
    Token(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OkrError>;
