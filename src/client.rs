use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

use crate::commands::PlayerCommand;
use crate::models::{
    ApiErrorBody, AppIdentity, CodeResponse, CommandRequest, StatePayload, TokenRequest,
    TokenResponse,
};
use crate::settings::Settings;
use crate::CompanionError;

/// Requests understood by the companion server's REST API.
#[async_trait]
pub trait CompanionApi: Send + Sync {
    /// Step one of pairing: ask for a one-time code.
    async fn request_code(&self, identity: &AppIdentity) -> Result<String, CompanionError>;

    /// Step two of pairing: exchange an approved code for a token. The
    /// server holds this request open until the user decides.
    async fn request_token(
        &self,
        identity: &AppIdentity,
        code: &str,
    ) -> Result<String, CompanionError>;

    async fn fetch_state(&self, token: &str) -> Result<StatePayload, CompanionError>;

    async fn send_command(
        &self,
        token: &str,
        command: &PlayerCommand,
    ) -> Result<(), CompanionError>;
}

/// HTTP implementation of [`CompanionApi`].
#[derive(Clone)]
pub struct CompanionClient {
    client: Arc<Client>,
    api_base: String,
    approval_timeout: Duration,
}

impl CompanionClient {
    pub fn new(settings: &Settings) -> Result<Self, CompanionError> {
        let client = Client::builder()
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .timeout(settings.request_timeout)
            .connect_timeout(settings.request_timeout)
            .build()?;
        Ok(Self::with_client(Arc::new(client), settings))
    }

    /// Reuse an existing reqwest client for connection pooling.
    pub fn with_client(client: Arc<Client>, settings: &Settings) -> Self {
        Self {
            client,
            api_base: settings.api_base(),
            approval_timeout: settings.approval_timeout,
        }
    }

    pub fn http(&self) -> Arc<Client> {
        self.client.clone()
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }
}

/// Turns error bodies and failing statuses into a [`CompanionError`].
fn check_body(status: StatusCode, body: &str) -> Result<(), CompanionError> {
    let error_body: ApiErrorBody = if body.trim().is_empty() {
        ApiErrorBody::default()
    } else {
        serde_json::from_str(body).unwrap_or_default()
    };

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        let raw = error_body
            .raw()
            .map(ToString::to_string)
            .unwrap_or_else(|| "UNAUTHORIZED".to_string());
        warn!(%status, raw = %raw, "Companion server rejected the token.");
        return Err(CompanionError::Unauthorized(raw));
    }

    if let Some(raw) = error_body.raw() {
        debug!(
            %status,
            raw,
            message = ?error_body.message,
            "Companion server returned an error body."
        );
        return Err(CompanionError::from_remote(raw));
    }

    if !status.is_success() {
        let reason = status.canonical_reason().unwrap_or(status.as_str());
        error!(%status, "Companion server returned an unsuccessful status.");
        return Err(CompanionError::Remote(reason.to_string()));
    }

    Ok(())
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, CompanionError> {
    let status = response.status();
    let body = response.text().await?;
    trace!(%status, body = %body, "Companion server response.");
    check_body(status, &body)?;
    serde_json::from_str(&body).map_err(CompanionError::ParseFailed)
}

#[async_trait]
impl CompanionApi for CompanionClient {
    async fn request_code(&self, identity: &AppIdentity) -> Result<String, CompanionError> {
        info!(app_id = %identity.app_id, "Requesting authorization code.");
        let response = self
            .client
            .post(self.url("/auth/requestcode"))
            .json(identity)
            .send()
            .await?;
        let code = read_json::<CodeResponse>(response).await?;
        Ok(code.code)
    }

    async fn request_token(
        &self,
        identity: &AppIdentity,
        code: &str,
    ) -> Result<String, CompanionError> {
        info!(app_id = %identity.app_id, "Waiting for authorization approval.");
        let response = self
            .client
            .post(self.url("/auth/request"))
            .json(&TokenRequest {
                app_id: &identity.app_id,
                code,
            })
            .timeout(self.approval_timeout)
            .send()
            .await?;
        let token = read_json::<TokenResponse>(response).await?;
        Ok(token.token)
    }

    async fn fetch_state(&self, token: &str) -> Result<StatePayload, CompanionError> {
        let response = self
            .client
            .get(self.url("/state"))
            .header(AUTHORIZATION, token)
            .send()
            .await?;
        read_json::<StatePayload>(response).await
    }

    async fn send_command(
        &self,
        token: &str,
        command: &PlayerCommand,
    ) -> Result<(), CompanionError> {
        debug!(command = command.name(), "Sending command.");
        let response = self
            .client
            .post(self.url("/command"))
            .header(AUTHORIZATION, token)
            .json(&CommandRequest {
                command: command.name(),
                data: command.data(),
            })
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            debug!(command = command.name(), "Command accepted.");
            return Ok(());
        }
        let body = response.text().await?;
        check_body(status, &body)
    }
}

impl std::fmt::Debug for CompanionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompanionClient")
            .field("api_base", &self.api_base)
            .finish()
    }
}
