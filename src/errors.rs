use thiserror::Error;

/// Errors surfaced by the REST client and the typed facades built on it
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// No response was received (network, DNS, timeout)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The exchange answered with a non-success status
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// Input rejected before any request was built
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("JSON parse error: {0}")]
    JsonParse(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),
}

impl Error {
    /// HTTP status carried by an API error
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Signature or credential rejection
    pub fn is_auth_failure(&self) -> bool {
        self.status() == Some(401)
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(400..=499))
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self.status(), Some(500..=599))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::JsonParse(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}
