//! Storage seams used by the driver commands.
//!
//! The command handlers depend on these traits rather than on the REST clients
//! so they can run against in-memory stores in tests.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::accounts::AccountsClient;
use crate::error::FirebaseResult;
use crate::firestore::{Document, FieldQuery, FirestoreClient};

/// Document operations over named collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every document of `collection`.
    ///
    /// # Errors
    ///
    /// Returns the underlying API or decoding error.
    async fn list_documents(&self, collection: &str) -> FirebaseResult<Vec<Document>>;

    /// Documents matching a single-field equality query.
    ///
    /// # Errors
    ///
    /// Returns the underlying API or decoding error.
    async fn run_query(&self, query: &FieldQuery) -> FirebaseResult<Vec<Document>>;

    /// Create a document with a generated id and return the id.
    ///
    /// # Errors
    ///
    /// Returns the underlying API or decoding error.
    async fn create_document(
        &self,
        collection: &str,
        fields: &Map<String, Value>,
        server_timestamps: &[&str],
    ) -> FirebaseResult<String>;

    /// Update the given fields of an existing document.
    ///
    /// # Errors
    ///
    /// Returns the underlying API or decoding error.
    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: &Map<String, Value>,
        server_timestamps: &[&str],
    ) -> FirebaseResult<()>;

    /// Delete a document.
    ///
    /// # Errors
    ///
    /// Returns the underlying API or decoding error.
    async fn delete_document(&self, collection: &str, id: &str) -> FirebaseResult<()>;
}

/// Authentication account operations.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Delete the account with `uid`.
    ///
    /// # Errors
    ///
    /// Returns the underlying API or decoding error.
    async fn delete_account(&self, uid: &str) -> FirebaseResult<()>;
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn list_documents(&self, collection: &str) -> FirebaseResult<Vec<Document>> {
        Self::list_documents(self, collection).await
    }

    async fn run_query(&self, query: &FieldQuery) -> FirebaseResult<Vec<Document>> {
        Self::run_query(self, query).await
    }

    async fn create_document(
        &self,
        collection: &str,
        fields: &Map<String, Value>,
        server_timestamps: &[&str],
    ) -> FirebaseResult<String> {
        Self::create_document(self, collection, fields, server_timestamps).await
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: &Map<String, Value>,
        server_timestamps: &[&str],
    ) -> FirebaseResult<()> {
        Self::update_document(self, collection, id, fields, server_timestamps).await
    }

    async fn delete_document(&self, collection: &str, id: &str) -> FirebaseResult<()> {
        Self::delete_document(self, collection, id).await
    }
}

#[async_trait]
impl AccountStore for AccountsClient {
    async fn delete_account(&self, uid: &str) -> FirebaseResult<()> {
        Self::delete_account(self, uid).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::RestClient;
    use crate::token::StaticToken;
    use anyhow::Result;
    use httpmock::prelude::*;
    use reqwest::Client;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn firestore_client_is_usable_as_a_trait_object() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(DELETE)
                .path("/v1/projects/kulooc-test/databases/(default)/documents/drivers/d1");
            then.status(200).json_body(json!({}));
        });
        let rest = RestClient::new(
            Client::new(),
            Arc::new(StaticToken::new("owner")),
            &server.base_url(),
        )?;
        let store: Arc<dyn DocumentStore> = Arc::new(FirestoreClient::new(rest, "kulooc-test"));

        store.delete_document("drivers", "d1").await?;
        mock.assert();
        Ok(())
    }
}
