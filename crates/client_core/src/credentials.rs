use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use shared::error::ReportError;
use tracing::{debug, info};
use url::Url;
use zeroize::Zeroize;

use crate::CredentialProvider;

pub const DEFAULT_TOKEN_PATH: &str = "/oauth/token";

/// Opaque bearer token. The value never appears in `Debug` output and is
/// wiped on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

impl Drop for AccessToken {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

pub struct StaticTokenProvider {
    token: AccessToken,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: AccessToken::new(token),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<AccessToken, ReportError> {
        Ok(self.token.clone())
    }
}

pub struct MissingCredentialProvider;

#[async_trait]
impl CredentialProvider for MissingCredentialProvider {
    async fn access_token(&self) -> Result<AccessToken, ReportError> {
        Err(ReportError::auth(
            "no client credentials or access token configured",
        ))
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// OAuth2 client-credentials grant against `token_host` + `token_path`,
/// authenticating the client with HTTP Basic.
pub struct ClientCredentialsProvider {
    http: Client,
    token_url: Url,
    client_id: String,
    client_secret: String,
}

impl ClientCredentialsProvider {
    pub fn new(
        token_host: &str,
        token_path: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, ReportError> {
        Ok(Self::with_client(
            Client::new(),
            token_url(token_host, token_path)?,
            client_id,
            client_secret,
        ))
    }

    pub fn with_client(
        http: Client,
        token_url: Url,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_url,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl Drop for ClientCredentialsProvider {
    fn drop(&mut self) {
        self.client_secret.zeroize();
    }
}

pub fn token_url(token_host: &str, token_path: &str) -> Result<Url, ReportError> {
    let host = Url::parse(token_host)
        .map_err(|err| ReportError::auth(format!("invalid token host '{token_host}': {err}")))?;
    let path = if token_path.trim().is_empty() {
        DEFAULT_TOKEN_PATH
    } else {
        token_path
    };
    host.join(path)
        .map_err(|err| ReportError::auth(format!("invalid token path '{path}': {err}")))
}

#[async_trait]
impl CredentialProvider for ClientCredentialsProvider {
    async fn access_token(&self) -> Result<AccessToken, ReportError> {
        debug!(url = %self.token_url, "auth: requesting client credentials token");
        let response = self
            .http
            .post(self.token_url.clone())
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|err| ReportError::auth(format!("token request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::auth(format!(
                "token endpoint returned {status}"
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|err| ReportError::auth(format!("malformed token response: {err}")))?;
        if body.access_token.is_empty() {
            return Err(ReportError::auth("token endpoint returned an empty token"));
        }

        info!(
            "auth: token acquired type={} expires_in={:?}",
            body.token_type.as_deref().unwrap_or("bearer"),
            body.expires_in
        );
        Ok(AccessToken::new(body.access_token))
    }
}

#[cfg(test)]
#[path = "tests/credentials_tests.rs"]
mod tests;
