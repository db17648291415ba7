//! Firebase Authentication accounts via the Identity Toolkit API.

use reqwest::Method;
use serde_json::{Value, json};

use crate::error::FirebaseResult;
use crate::rest::RestClient;

/// Client for `identitytoolkit.googleapis.com` project-level account calls.
#[derive(Debug, Clone)]
pub struct AccountsClient {
    rest: RestClient,
    project_id: String,
}

impl AccountsClient {
    /// Build a client for the project.
    #[must_use]
    pub fn new(rest: RestClient, project_id: impl Into<String>) -> Self {
        Self {
            rest,
            project_id: project_id.into(),
        }
    }

    /// Delete the account with the given uid.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FirebaseError::Api`] when the account does not exist
    /// (`USER_NOT_FOUND`) or the caller lacks permission.
    pub async fn delete_account(&self, uid: &str) -> FirebaseResult<()> {
        let path = format!("v1/projects/{}/accounts:delete", self.project_id);
        let body = json!({ "localId": uid });
        let _: Value = self
            .rest
            .call("delete account", Method::POST, &path, &[], Some(&body))
            .await?;
        Ok(())
    }
}
