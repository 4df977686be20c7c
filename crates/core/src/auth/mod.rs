use crate::config::Settings;
use crate::storage::credentials::{CredentialStore, Credentials};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_AUTHORIZE_URL: &str = "https://www.fitbit.com/oauth2/authorize";
const DEFAULT_TOKEN_URL: &str = "https://api.fitbit.com/oauth2/token";
const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8080/";
const DEFAULT_SCOPE: &str = "heartrate respiratory_rate temperature oxygen_saturation";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

// Lifetime of the authorization granted on the consent screen (one week).
const AUTHORIZATION_EXPIRES_IN: &str = "604800";

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,

    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub user_id: String,
}

impl TokenResponse {
    pub fn credentials(&self) -> Credentials {
        Credentials {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
        }
    }
}

#[async_trait::async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse>;
}

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scope: String,
    pub authorize_url: String,
    pub token_url: String,
}

impl OAuthConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            client_id: settings.require_fitbit_client_id()?.to_string(),
            client_secret: settings.require_fitbit_client_secret()?.to_string(),
            redirect_uri: settings
                .fitbit_redirect_uri
                .clone()
                .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
            scope: std::env::var("FITBIT_SCOPE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
            authorize_url: std::env::var("FITBIT_AUTHORIZE_URL")
                .unwrap_or_else(|_| DEFAULT_AUTHORIZE_URL.to_string()),
            token_url: std::env::var("FITBIT_TOKEN_URL")
                .unwrap_or_else(|_| DEFAULT_TOKEN_URL.to_string()),
        })
    }
}

#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: reqwest::Client,
    config: OAuthConfig,
}

impl OAuthClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout_secs = std::env::var("FITBIT_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self::new(
            OAuthConfig::from_settings(settings)?,
            Duration::from_secs(timeout_secs),
        )
    }

    pub fn new(config: OAuthConfig, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build OAuth http client")?;
        Ok(Self { http, config })
    }

    pub fn authorize_url(&self) -> Result<String> {
        let url = reqwest::Url::parse_with_params(
            &self.config.authorize_url,
            &[
                ("response_type", "code"),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("scope", self.config.scope.as_str()),
                ("expires_in", AUTHORIZATION_EXPIRES_IN),
            ],
        )
        .with_context(|| format!("invalid authorize URL {}", self.config.authorize_url))?;
        Ok(url.to_string())
    }

    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        let code = code.trim();
        anyhow::ensure!(!code.is_empty(), "authorization code must be non-empty");

        self.request_token(&[
            ("client_id", self.config.client_id.as_str()),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code", code),
        ])
        .await
        .context("authorization code exchange failed")
    }

    pub async fn exchange_and_store(
        &self,
        store: &dyn CredentialStore,
        code: &str,
    ) -> Result<Credentials> {
        let token = self.exchange_code(code).await?;
        let creds = token.credentials();
        store.save(&creds).await?;
        tracing::info!(
            user_id = %token.user_id,
            scope = %token.scope,
            expires_in = token.expires_in,
            "stored new Fitbit credentials"
        );
        Ok(creds)
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let res = self
            .http
            .post(&self.config.token_url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(form)
            .send()
            .await
            .context("token request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read token response")?;
        if !status.is_success() {
            anyhow::bail!("token endpoint HTTP {status}: {text}");
        }

        serde_json::from_str::<TokenResponse>(&text).context("failed to parse token response")
    }
}

#[async_trait::async_trait]
impl TokenRefresher for OAuthClient {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse> {
        anyhow::ensure!(
            !refresh_token.trim().is_empty(),
            "refresh token must be non-empty"
        );

        self.request_token(&[
            ("client_id", self.config.client_id.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
        .context("refresh token exchange failed")
    }
}
