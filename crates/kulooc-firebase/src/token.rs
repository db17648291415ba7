//! OAuth2 access tokens for service accounts.
//!
//! # Design
//! - Exchanges a self-signed RS256 assertion for a bearer token (JWT-bearer grant).
//! - Caches the token and refreshes it shortly before expiry.
//! - `StaticToken` covers emulators and pre-issued tokens behind the same trait.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::credential::ServiceAccountKey;
use crate::error::{FirebaseError, FirebaseResult};

/// Full access to Google Cloud APIs.
pub const SCOPE_CLOUD_PLATFORM: &str = "https://www.googleapis.com/auth/cloud-platform";
/// Firebase management APIs (rules, auth).
pub const SCOPE_FIREBASE: &str = "https://www.googleapis.com/auth/firebase";
/// Firestore / Datastore data access.
pub const SCOPE_DATASTORE: &str = "https://www.googleapis.com/auth/datastore";

/// Scopes requested by the admin tooling.
pub const ADMIN_SCOPES: [&str; 3] = [SCOPE_CLOUD_PLATFORM, SCOPE_FIREBASE, SCOPE_DATASTORE];

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

/// Source of bearer tokens for REST calls.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Return a bearer token valid for at least the next request.
    async fn access_token(&self) -> FirebaseResult<String>;
}

/// Fixed token, e.g. `owner` for the Firestore emulator.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    /// Wrap a pre-issued token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticToken(<redacted>)")
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> FirebaseResult<String> {
        Ok(self.0.clone())
    }
}

/// Token provider backed by a service-account key.
pub struct ServiceAccountTokenProvider {
    client: Client,
    key: ServiceAccountKey,
    scopes: String,
    cached: Mutex<Option<CachedToken>>,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl ServiceAccountTokenProvider {
    /// Create a provider requesting the given scopes.
    #[must_use]
    pub fn new(client: Client, key: ServiceAccountKey, scopes: &[&str]) -> Self {
        Self {
            client,
            key,
            scopes: scopes.join(" "),
            cached: Mutex::new(None),
        }
    }

    fn build_assertion(&self, now: DateTime<Utc>) -> FirebaseResult<String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid.clone_from(&self.key.private_key_id);
        let claims = AssertionClaims {
            iss: self.key.client_email.clone(),
            scope: self.scopes.clone(),
            aud: self.key.token_uri.clone(),
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|source| FirebaseError::SigningKey { source })?;
        jsonwebtoken::encode(&header, &claims, &key)
            .map_err(|source| FirebaseError::SigningKey { source })
    }

    async fn exchange(&self, now: DateTime<Utc>) -> FirebaseResult<CachedToken> {
        let assertion = self.build_assertion(now)?;
        tracing::debug!(client_email = %self.key.client_email, "exchanging service-account assertion");

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|source| FirebaseError::Http {
                operation: "token exchange",
                source,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| FirebaseError::Http {
            operation: "token exchange",
            source,
        })?;
        if !status.is_success() {
            return Err(FirebaseError::TokenExchange { status, body });
        }

        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|source| FirebaseError::Decode {
                operation: "token exchange",
                source,
            })?;
        let lifetime = parsed.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS);
        Ok(CachedToken {
            token: parsed.access_token,
            expires_at: now + Duration::seconds(lifetime),
        })
    }
}

impl fmt::Debug for ServiceAccountTokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountTokenProvider")
            .field("key", &self.key)
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokenProvider {
    async fn access_token(&self) -> FirebaseResult<String> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref()
            && token.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now
        {
            return Ok(token.token.clone());
        }
        let fresh = self.exchange(now).await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }
}
