//! Signed Letterboxd API client
//!
//! Every API call carries `apikey`, `nonce` and `timestamp` query parameters and
//! a `signature` computed as HMAC-SHA256 over `METHOD \0 URL \0 BODY` with the
//! API secret. Member lookups go through the public website instead, which
//! exposes the member ID in a response header.

use std::{path::Path, time::Duration};

use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client as HttpClient, StatusCode, Url};
use serde_json::Value;
use sha2::Sha256;
use uuid::Uuid;

use crate::{
    config::Config,
    error::{LetterboxdError, LetterboxdResult},
    services::letterboxd::LetterboxdApi,
};

type HmacSha256 = Hmac<Sha256>;

/// Header the website uses to expose a member's API identifier
pub const IDENTIFIER_HEADER: &str = "x-letterboxd-identifier";

/// API key and secret
#[derive(Clone)]
pub struct Credentials {
    pub key: String,
    secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }

    /// Parses key and secret from the first two non-empty lines
    pub fn parse(contents: &str) -> LetterboxdResult<Self> {
        let mut lines = contents.lines().map(str::trim).filter(|l| !l.is_empty());

        let key = lines
            .next()
            .ok_or_else(|| LetterboxdError::Credentials("missing API key".to_string()))?;
        let secret = lines
            .next()
            .ok_or_else(|| LetterboxdError::Credentials("missing API secret".to_string()))?;

        Ok(Self::new(key, secret))
    }

    pub fn from_file(path: &Path) -> LetterboxdResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            LetterboxdError::Credentials(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&contents)
    }

    fn sign(&self, method: &str, url: &str, body: &str) -> LetterboxdResult<String> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| LetterboxdError::Credentials(format!("invalid secret: {}", e)))?;
        mac.update(format!("{}\u{0}{}\u{0}{}", method, url, body).as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

#[derive(Clone)]
pub struct LetterboxdClient {
    http_client: HttpClient,
    credentials: Credentials,
    api_url: String,
    site_url: String,
}

impl LetterboxdClient {
    pub fn new(
        credentials: Credentials,
        api_url: impl Into<String>,
        site_url: impl Into<String>,
        timeout: Duration,
    ) -> LetterboxdResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            credentials,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            site_url: site_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Builds a client from the configured credentials file and endpoints
    pub fn from_config(config: &Config) -> LetterboxdResult<Self> {
        let credentials = Credentials::from_file(&config.credentials_path)?;
        Self::new(
            credentials,
            &config.letterboxd_api_url,
            &config.letterboxd_site_url,
            Duration::from_secs(config.letterboxd_timeout_secs),
        )
    }

    /// Looks up a member's API identifier from their username
    pub async fn resolve_member_id(&self, username: &str) -> LetterboxdResult<String> {
        let url = format!("{}/{}/", self.site_url, username);

        let response = self.http_client.head(&url).send().await?;

        if response.status() != StatusCode::OK {
            tracing::warn!(
                username = %username,
                status = response.status().as_u16(),
                "Member lookup failed"
            );
            return Err(LetterboxdError::Status {
                status: response.status().as_u16(),
                path: url,
            });
        }

        let member_id = response
            .headers()
            .get(IDENTIFIER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| LetterboxdError::MissingIdentifier(username.to_string()))?;

        tracing::debug!(username = %username, member_id = %member_id, "Resolved member");

        Ok(member_id)
    }

    /// Builds the fully signed URL for a GET on `path`
    fn signed_url(&self, path: &str) -> LetterboxdResult<Url> {
        let raw = format!("{}/{}", self.api_url, path.trim_start_matches('/'));
        let mut url = Url::parse(&raw)
            .map_err(|e| LetterboxdError::InvalidRequest(format!("{}: {}", raw, e)))?;

        url.query_pairs_mut()
            .append_pair("apikey", &self.credentials.key)
            .append_pair("nonce", &Uuid::new_v4().to_string())
            .append_pair("timestamp", &Utc::now().timestamp().to_string());

        let signature = self.credentials.sign("GET", url.as_str(), "")?;
        url.query_pairs_mut().append_pair("signature", &signature);

        Ok(url)
    }
}

#[async_trait::async_trait]
impl LetterboxdApi for LetterboxdClient {
    async fn get_json(&self, path: &str) -> LetterboxdResult<Value> {
        let url = self.signed_url(path)?;

        let response = self.http_client.get(url).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::debug!(path = %path, status = status.as_u16(), "Letterboxd request failed");
            return Err(LetterboxdError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|source| LetterboxdError::Decode {
            path: path.to_string(),
            source,
        })
    }
}
