//! Authenticated session: one credential, one HTTP client, one client per API.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::accounts::AccountsClient;
use crate::credential::ServiceAccountKey;
use crate::error::{FirebaseError, FirebaseResult};
use crate::firestore::FirestoreClient;
use crate::indexes::IndexAdminClient;
use crate::rest::RestClient;
use crate::rules::RulesClient;
use crate::token::{ADMIN_SCOPES, ServiceAccountTokenProvider, TokenSource};

/// Public Firestore endpoint.
pub const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com";
/// Public Firebase Rules endpoint.
pub const DEFAULT_RULES_URL: &str = "https://firebaserules.googleapis.com";
/// Public Identity Toolkit endpoint.
pub const DEFAULT_IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com";

/// API base URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Firestore data and admin API.
    pub firestore: String,
    /// Firebase Rules API.
    pub rules: String,
    /// Identity Toolkit API.
    pub identity: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            firestore: DEFAULT_FIRESTORE_URL.to_string(),
            rules: DEFAULT_RULES_URL.to_string(),
            identity: DEFAULT_IDENTITY_URL.to_string(),
        }
    }
}

/// Clients for one Firebase project sharing a token source.
#[derive(Debug, Clone)]
pub struct FirebaseSession {
    project_id: String,
    firestore: RestClient,
    rules: RestClient,
    identity: RestClient,
}

impl FirebaseSession {
    /// Load the service-account key at `credentials_path` and prepare clients
    /// for its project. No network call is made until the first request.
    ///
    /// # Errors
    ///
    /// Returns credential errors from [`ServiceAccountKey::from_file`], an HTTP
    /// error if the client cannot be built, or [`FirebaseError::InvalidUrl`]
    /// for malformed endpoints.
    pub fn connect(
        credentials_path: &Path,
        endpoints: &Endpoints,
        timeout: Duration,
    ) -> FirebaseResult<Self> {
        let key = ServiceAccountKey::from_file(credentials_path)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| FirebaseError::Http {
                operation: "build http client",
                source,
            })?;
        let project_id = key.project_id.clone();
        tracing::debug!(project_id = %project_id, client_email = %key.client_email, "loaded service account");
        let tokens = Arc::new(ServiceAccountTokenProvider::new(
            client.clone(),
            key,
            &ADMIN_SCOPES,
        ));
        Self::with_token_source(&client, tokens, project_id, endpoints)
    }

    /// Build a session around an existing token source.
    ///
    /// # Errors
    ///
    /// Returns [`FirebaseError::InvalidUrl`] for malformed endpoints.
    pub fn with_token_source(
        client: &Client,
        tokens: Arc<dyn TokenSource>,
        project_id: impl Into<String>,
        endpoints: &Endpoints,
    ) -> FirebaseResult<Self> {
        Ok(Self {
            project_id: project_id.into(),
            firestore: RestClient::new(client.clone(), Arc::clone(&tokens), &endpoints.firestore)?,
            rules: RestClient::new(client.clone(), Arc::clone(&tokens), &endpoints.rules)?,
            identity: RestClient::new(client.clone(), tokens, &endpoints.identity)?,
        })
    }

    /// Project named by the credential.
    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Firestore document client.
    #[must_use]
    pub fn firestore(&self) -> FirestoreClient {
        FirestoreClient::new(self.firestore.clone(), self.project_id.clone())
    }

    /// Firestore index administration client.
    #[must_use]
    pub fn index_admin(&self) -> IndexAdminClient {
        IndexAdminClient::new(self.firestore.clone(), self.project_id.clone())
    }

    /// Firebase Rules client.
    #[must_use]
    pub fn rules(&self) -> RulesClient {
        RulesClient::new(self.rules.clone(), self.project_id.clone())
    }

    /// Identity Toolkit account client.
    #[must_use]
    pub fn accounts(&self) -> AccountsClient {
        AccountsClient::new(self.identity.clone(), self.project_id.clone())
    }
}
