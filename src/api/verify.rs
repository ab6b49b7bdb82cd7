//! Copilot Extension request signatures.
//!
//! GitHub signs every request body with ECDSA P-256/SHA-256. The signature
//! arrives base64-encoded (DER) in `X-GitHub-Public-Key-Signature` and names
//! its key in `X-GitHub-Public-Key-Identifier`; the keys themselves are
//! published at `{github_api}/meta/public_keys/copilot_api`.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature, VerifyingKey};
use p256::pkcs8::DecodePublicKey;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("Missing {0} header")]
    MissingHeader(&'static str),

    #[error("No public key with identifier {0}")]
    UnknownKey(String),

    #[error("Invalid public key: {0}")]
    InvalidKey(String),

    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    #[error("Signature does not match payload")]
    SignatureMismatch,

    #[error("Failed to fetch public keys: {0}")]
    KeyFetch(String),
}

/// One entry of the published key list.
#[derive(Debug, Clone, Deserialize)]
pub struct PublicKeyEntry {
    pub key_identifier: String,
    /// PEM-encoded SubjectPublicKeyInfo
    pub key: String,
    /// Preferred when identifiers collide
    #[serde(default)]
    pub is_current: bool,
}

#[derive(Deserialize)]
struct PublicKeysResponse {
    public_keys: Vec<PublicKeyEntry>,
}

#[async_trait]
pub trait PublicKeySource: Send + Sync {
    async fn public_keys(&self, token: Option<&str>)
        -> Result<Vec<PublicKeyEntry>, VerificationError>;
}

/// Reads the key list from the GitHub API.
#[derive(Debug, Clone)]
pub struct GithubKeySource {
    http: reqwest::Client,
    url: String,
}

impl GithubKeySource {
    pub fn new(github_api_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: format!(
                "{}/meta/public_keys/copilot_api",
                github_api_url.trim_end_matches('/')
            ),
        }
    }
}

#[async_trait]
impl PublicKeySource for GithubKeySource {
    async fn public_keys(
        &self,
        token: Option<&str>,
    ) -> Result<Vec<PublicKeyEntry>, VerificationError> {
        let mut request = self
            .http
            .get(&self.url)
            .header(reqwest::header::USER_AGENT, "agu-bridge")
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| VerificationError::KeyFetch(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| VerificationError::KeyFetch(e.to_string()))?;
        if !status.is_success() {
            return Err(VerificationError::KeyFetch(format!("{} - {}", status, body)));
        }

        let parsed: PublicKeysResponse = serde_json::from_str(&body)
            .map_err(|e| VerificationError::KeyFetch(format!("invalid key list: {}", e)))?;
        Ok(parsed.public_keys)
    }
}

/// Fixed key list.
#[derive(Debug, Clone, Default)]
pub struct StaticKeySource(pub Vec<PublicKeyEntry>);

#[async_trait]
impl PublicKeySource for StaticKeySource {
    async fn public_keys(
        &self,
        _token: Option<&str>,
    ) -> Result<Vec<PublicKeyEntry>, VerificationError> {
        Ok(self.0.clone())
    }
}

#[derive(Clone)]
pub struct SignatureVerifier {
    source: Arc<dyn PublicKeySource>,
}

impl SignatureVerifier {
    pub fn new(source: Arc<dyn PublicKeySource>) -> Self {
        Self { source }
    }

    /// Check `signature` (base64 DER) over `payload` with the key `key_id`.
    pub async fn verify(
        &self,
        payload: &[u8],
        signature: &str,
        key_id: &str,
        token: Option<&str>,
    ) -> Result<(), VerificationError> {
        let keys = self.source.public_keys(token).await?;
        // A rotated-out key may still share its identifier; the current one wins.
        let entry = keys
            .iter()
            .filter(|k| k.key_identifier == key_id)
            .max_by_key(|k| k.is_current)
            .ok_or_else(|| VerificationError::UnknownKey(key_id.to_string()))?;

        let key = VerifyingKey::from_public_key_pem(entry.key.trim())
            .map_err(|e| VerificationError::InvalidKey(e.to_string()))?;
        let der = STANDARD
            .decode(signature.trim())
            .map_err(|e| VerificationError::MalformedSignature(e.to_string()))?;
        let signature = Signature::from_der(&der)
            .map_err(|e| VerificationError::MalformedSignature(e.to_string()))?;

        key.verify(payload, &signature)
            .map_err(|_| VerificationError::SignatureMismatch)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{key_source, sign, KEY_ID};
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::new(Arc::new(key_source()))
    }

    #[tokio::test]
    async fn accepts_valid_signature() {
        let body = br#"{"messages":[]}"#;
        verifier()
            .verify(body, &sign(body), KEY_ID, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rejects_tampered_body() {
        let signature = sign(b"signed body");
        let err = verifier()
            .verify(b"tampered", &signature, KEY_ID, None)
            .await
            .unwrap_err();
        assert!(matches!(err, VerificationError::SignatureMismatch));
    }

    #[tokio::test]
    async fn rejects_unknown_key_and_garbage() {
        let body = b"payload";
        let err = verifier()
            .verify(body, &sign(body), "other-key", None)
            .await
            .unwrap_err();
        assert!(matches!(err, VerificationError::UnknownKey(id) if id == "other-key"));

        let err = verifier()
            .verify(body, "not base64!!", KEY_ID, None)
            .await
            .unwrap_err();
        assert!(matches!(err, VerificationError::MalformedSignature(_)));
    }

    #[tokio::test]
    async fn current_key_wins_on_shared_identifier() {
        let valid = key_source().0.remove(0);
        let stale = PublicKeyEntry {
            key_identifier: KEY_ID.to_string(),
            key: "-----BEGIN PUBLIC KEY-----\nstale\n-----END PUBLIC KEY-----".to_string(),
            is_current: false,
        };
        let body = b"payload";

        for keys in [
            vec![stale.clone(), valid.clone()],
            vec![valid.clone(), stale.clone()],
        ] {
            SignatureVerifier::new(Arc::new(StaticKeySource(keys)))
                .verify(body, &sign(body), KEY_ID, None)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn github_source_reads_key_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/meta/public_keys/copilot_api"))
            .and(header("authorization", "Bearer gho_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "public_keys": [
                    { "key_identifier": "abc", "key": "-----BEGIN PUBLIC KEY-----", "is_current": true }
                ]
            })))
            .mount(&server)
            .await;

        let keys = GithubKeySource::new(&server.uri())
            .public_keys(Some("gho_token"))
            .await
            .unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].key_identifier, "abc");
        assert!(keys[0].is_current);
    }

    #[tokio::test]
    async fn github_source_surfaces_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = GithubKeySource::new(&server.uri())
            .public_keys(None)
            .await
            .unwrap_err();
        assert!(matches!(err, VerificationError::KeyFetch(_)));
    }
}
