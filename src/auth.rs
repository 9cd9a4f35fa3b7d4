use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::client::CompanionApi;
use crate::display::Notifier;
use crate::error::{AuthError, CompanionError};
use crate::messages::MESSAGE_PREFIX;
use crate::models::AppIdentity;

const DENIED: &str = "AUTHORIZATION_DENIED";
const TIMED_OUT: &str = "AUTHORIZATION_TIMEOUT";

/// Pairs this app with the player: request a code, show it to the user,
/// then wait for the user to approve the request inside the player.
pub struct AuthFlow {
    api: Arc<dyn CompanionApi>,
    notifier: Arc<dyn Notifier>,
    identity: AppIdentity,
}

impl AuthFlow {
    pub fn new(
        api: Arc<dyn CompanionApi>,
        notifier: Arc<dyn Notifier>,
        identity: AppIdentity,
    ) -> Self {
        Self {
            api,
            notifier,
            identity,
        }
    }

    pub async fn request_authorization(&self) -> Result<String, AuthError> {
        info!(app_id = %self.identity.app_id, "Requesting authorization code.");
        let code = self.api.request_code(&self.identity).await.map_err(|e| {
            warn!(error = %e, "Authorization code request failed.");
            AuthError::CodeRequestFailed(e.raw_message())
        })?;

        self.notifier.info(&format!(
            "{}: Please approve the request with code {} in the Youtube Music Desktop Player.",
            MESSAGE_PREFIX, code
        ));

        debug!("Waiting for approval in the player.");
        let token = self
            .api
            .request_token(&self.identity, &code)
            .await
            .map_err(classify_token_error)?;

        if token.is_empty() {
            return Err(AuthError::Invalid("AUTHORIZATION_INVALID".to_string()));
        }
        info!("Authorization approved.");
        Ok(token)
    }
}

fn classify_token_error(e: CompanionError) -> AuthError {
    warn!(error = %e, "Token request failed.");
    if e.is_timeout() {
        return AuthError::ApprovalTimeout;
    }
    match e {
        CompanionError::Remote(raw) | CompanionError::Unauthorized(raw) => match raw.as_str() {
            DENIED => AuthError::ApprovalDenied,
            TIMED_OUT => AuthError::ApprovalTimeout,
            _ => AuthError::Invalid(raw),
        },
        transport @ CompanionError::RequestFailed(_) => {
            AuthError::Transport(transport.raw_message())
        }
        CompanionError::Auth(auth) => auth,
        other => AuthError::Invalid(other.raw_message()),
    }
}
