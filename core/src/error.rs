#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("server responded with status {0}")]
    Status(u16),
    #[error("{0}")]
    Rejected(String),
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("admin session is not active")]
    SessionInactive,
    #[error("invalid endpoint: {0}")]
    Endpoint(String),
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::Endpoint(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}
