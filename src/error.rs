use thiserror::Error;

/// Raw strings the companion server uses to reject a token.
const UNAUTHORIZED_SENTINELS: [&str; 4] =
    ["UNAUTHORIZED", "Unauthorized", "Unathorized", "FORBIDDEN"];

/// Raw message reported for push channel transport failures.
pub const TRANSPORT_POLL_ERROR: &str = "xhr poll error";

// Basic error handling with thiserror
#[derive(Error, Debug)]
pub enum CompanionError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    ParseFailed(#[from] serde_json::Error),

    #[error("URL encoding failed: {0}")]
    UrlEncodingFailed(#[from] serde_urlencoded::ser::Error),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Companion server error: {0}")]
    Remote(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Not authenticated with the companion server")]
    NotAuthenticated,

    #[error("Credential storage failed: {0}")]
    Storage(String),

    #[error("Authorization failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Task panicked or cancelled")]
    TaskJoinError(#[from] tokio::task::JoinError),
}

/// Failures of the pairing exchange.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("could not request an authorization code: {0}")]
    CodeRequestFailed(String),

    #[error("authorization was denied in the player")]
    ApprovalDenied,

    #[error("authorization was not approved in time")]
    ApprovalTimeout,

    #[error("authorization response was rejected: {0}")]
    Invalid(String),

    #[error("transport error during authorization: {0}")]
    Transport(String),
}

impl AuthError {
    /// Key into the friendly message table.
    pub fn raw_message(&self) -> String {
        match self {
            AuthError::CodeRequestFailed(raw)
            | AuthError::Invalid(raw)
            | AuthError::Transport(raw) => raw.clone(),
            AuthError::ApprovalDenied => "AUTHORIZATION_DENIED".to_string(),
            AuthError::ApprovalTimeout => "AUTHORIZATION_TIMEOUT".to_string(),
        }
    }
}

impl CompanionError {
    /// Classify a raw error string reported by the companion server.
    pub fn from_remote(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        if is_unauthorized_message(&raw) {
            CompanionError::Unauthorized(raw)
        } else {
            CompanionError::Remote(raw)
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, CompanionError::Unauthorized(_))
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            CompanionError::RequestFailed(e) => e.is_timeout(),
            CompanionError::Remote(raw) => raw == "timeout",
            _ => false,
        }
    }

    /// The string shown to the user after friendly-table rewriting.
    pub fn raw_message(&self) -> String {
        match self {
            CompanionError::RequestFailed(e) if e.is_timeout() => "timeout".to_string(),
            CompanionError::RequestFailed(e) if e.is_connect() => "connect error".to_string(),
            CompanionError::Unauthorized(raw) | CompanionError::Remote(raw) => raw.clone(),
            CompanionError::Auth(auth) => auth.raw_message(),
            other => other.to_string(),
        }
    }
}

pub(crate) fn is_unauthorized_message(raw: &str) -> bool {
    UNAUTHORIZED_SENTINELS.contains(&raw)
}
