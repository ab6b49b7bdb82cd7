//! Bot Framework request authentication.
//!
//! The channel sends a JWT with every activity (`Authorization: Bearer`).
//! It must be signed by a key published through the Bot Framework OpenID
//! metadata, issued by `https://api.botframework.com`, addressed to this
//! bot's app id and unexpired. Its `serviceurl` claim must match the
//! activity's `serviceUrl`, so replies only go where the channel said.
//!
//! Without app credentials the bot runs unauthenticated (emulator setups);
//! replies then never carry a connector token.

use async_trait::async_trait;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

pub const OPENID_METADATA_URL: &str =
    "https://login.botframework.com/v1/.well-known/openidconfiguration";
const ISSUER: &str = "https://api.botframework.com";
const KEY_REFRESH: Duration = Duration::from_secs(24 * 60 * 60);
const CLOCK_SKEW_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum BotAuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("No signing key with id {0}")]
    UnknownKey(String),

    #[error("Token issued for {claimed}, activity targets {actual}")]
    ServiceUrlMismatch { claimed: String, actual: String },

    #[error("Failed to fetch signing keys: {0}")]
    KeyFetch(String),
}

impl From<jsonwebtoken::errors::Error> for BotAuthError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        BotAuthError::InvalidToken(e.to_string())
    }
}

/// Resolves the key id in a token header to a verification key.
#[async_trait]
pub trait SigningKeySource: Send + Sync {
    async fn key(&self, kid: &str) -> Result<(DecodingKey, Algorithm), BotAuthError>;
}

#[derive(Deserialize)]
struct OpenIdMetadata {
    jwks_uri: String,
}

struct CachedKeys {
    set: JwkSet,
    fetched_at: Instant,
}

/// Signing keys from the Bot Framework OpenID metadata document.
///
/// The key set is cached for a day and refetched early when a token names a
/// key id the cache does not know (key rollover).
pub struct OpenIdKeySource {
    http: reqwest::Client,
    metadata_url: String,
    cache: RwLock<Option<CachedKeys>>,
}

impl OpenIdKeySource {
    pub fn new(metadata_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            metadata_url: metadata_url.to_string(),
            cache: RwLock::new(None),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, BotAuthError> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| BotAuthError::KeyFetch(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| BotAuthError::KeyFetch(e.to_string()))?;
        if !status.is_success() {
            return Err(BotAuthError::KeyFetch(format!("{} - {}", url, status)));
        }
        serde_json::from_str(&body).map_err(|e| BotAuthError::KeyFetch(format!("{}: {}", url, e)))
    }

    async fn cached(&self, kid: &str) -> Option<Jwk> {
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .filter(|c| c.fetched_at.elapsed() < KEY_REFRESH)
            .and_then(|c| c.set.find(kid).cloned())
    }

    async fn refresh(&self) -> Result<JwkSet, BotAuthError> {
        let metadata: OpenIdMetadata = self.get_json(&self.metadata_url).await?;
        let set: JwkSet = self.get_json(&metadata.jwks_uri).await?;
        tracing::debug!(keys = set.keys.len(), "Fetched Bot Framework signing keys");
        *self.cache.write().await = Some(CachedKeys {
            set: set.clone(),
            fetched_at: Instant::now(),
        });
        Ok(set)
    }
}

#[async_trait]
impl SigningKeySource for OpenIdKeySource {
    async fn key(&self, kid: &str) -> Result<(DecodingKey, Algorithm), BotAuthError> {
        let jwk = match self.cached(kid).await {
            Some(jwk) => jwk,
            None => self
                .refresh()
                .await?
                .find(kid)
                .cloned()
                .ok_or_else(|| BotAuthError::UnknownKey(kid.to_string()))?,
        };
        Ok((DecodingKey::from_jwk(&jwk)?, Algorithm::RS256))
    }
}

#[derive(Deserialize)]
struct BotClaims {
    #[serde(default)]
    serviceurl: Option<String>,
}

/// Checks inbound activity tokens for one bot.
#[derive(Clone)]
pub struct BotAuthenticator {
    app_id: Option<String>,
    keys: Arc<dyn SigningKeySource>,
}

impl BotAuthenticator {
    /// `app_id` of `None` turns authentication off.
    pub fn new(app_id: Option<String>, keys: Arc<dyn SigningKeySource>) -> Self {
        Self { app_id, keys }
    }

    pub fn is_enabled(&self) -> bool {
        self.app_id.is_some()
    }

    pub async fn authenticate(
        &self,
        authorization: Option<&str>,
        service_url: Option<&str>,
    ) -> Result<(), BotAuthError> {
        let Some(app_id) = &self.app_id else {
            return Ok(());
        };

        let token = authorization
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(BotAuthError::MissingToken)?;

        let header = decode_header(token)?;
        let kid = header
            .kid
            .ok_or_else(|| BotAuthError::InvalidToken("token names no signing key".to_string()))?;
        let (key, algorithm) = self.keys.key(&kid).await?;

        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[ISSUER]);
        validation.set_audience(&[app_id]);
        validation.leeway = CLOCK_SKEW_SECS;
        let claims = decode::<BotClaims>(token, &key, &validation)?.claims;

        match (claims.serviceurl.as_deref(), service_url) {
            (Some(claimed), Some(actual))
                if claimed.trim_end_matches('/') != actual.trim_end_matches('/') =>
            {
                Err(BotAuthError::ServiceUrlMismatch {
                    claimed: claimed.to_string(),
                    actual: actual.to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header};
    use serde_json::{json, Value};

    pub const APP_ID: &str = "test-app-id";
    pub const KEY_ID: &str = "test-bot-key";
    const SECRET: &[u8] = b"bot-framework-test-secret";

    /// HMAC key standing in for the channel's RSA keys.
    pub struct SharedSecretKeys;

    #[async_trait]
    impl SigningKeySource for SharedSecretKeys {
        async fn key(&self, kid: &str) -> Result<(DecodingKey, Algorithm), BotAuthError> {
            if kid == KEY_ID {
                Ok((DecodingKey::from_secret(SECRET), Algorithm::HS256))
            } else {
                Err(BotAuthError::UnknownKey(kid.to_string()))
            }
        }
    }

    pub fn claims(service_url: &str) -> Value {
        json!({
            "iss": ISSUER,
            "aud": APP_ID,
            "exp": chrono::Utc::now().timestamp() + 600,
            "serviceurl": service_url,
        })
    }

    pub fn token_with(claims: &Value) -> String {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(KEY_ID.to_string());
        jsonwebtoken::encode(&header, claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    pub fn token(service_url: &str) -> String {
        token_with(&claims(service_url))
    }
}
