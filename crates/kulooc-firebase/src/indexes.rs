//! Firestore composite index administration.
//!
//! Index creation returns a long-running operation. Callers wait a bounded
//! amount of time for it to finish; past that, the build continues server-side.

use std::fmt;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{FirebaseError, FirebaseResult};
use crate::firestore::DEFAULT_DATABASE;
use crate::rest::RestClient;

/// Sort direction of one indexed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexOrder {
    /// Ascending order.
    Ascending,
    /// Descending order.
    Descending,
}

impl IndexOrder {
    /// Wire name of the direction.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "ASCENDING",
            Self::Descending => "DESCENDING",
        }
    }
}

/// One `(field path, direction)` entry of a composite index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexField {
    /// Indexed field.
    pub field_path: &'static str,
    /// Sort direction.
    pub order: IndexOrder,
}

/// Composite index declaration scoped to one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDescriptor {
    /// Collection group the index covers.
    pub collection_group: &'static str,
    /// Ordered index fields.
    pub fields: Vec<IndexField>,
}

impl IndexDescriptor {
    /// Build a collection-scoped index.
    #[must_use]
    pub fn new(collection_group: &'static str, fields: &[(&'static str, IndexOrder)]) -> Self {
        Self {
            collection_group,
            fields: fields
                .iter()
                .map(|&(field_path, order)| IndexField { field_path, order })
                .collect(),
        }
    }
}

impl fmt::Display for IndexDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection_group)?;
        for field in &self.fields {
            write!(f, "_{}", field.field_path)?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IndexRequest<'a> {
    query_scope: &'static str,
    fields: &'a [IndexField],
}

/// Long-running operation resource.
#[derive(Debug, Clone, Deserialize)]
pub struct Operation {
    /// Operation resource name.
    pub name: String,
    /// Whether the operation finished.
    #[serde(default)]
    pub done: bool,
    /// Failure status when the operation finished unsuccessfully.
    #[serde(default)]
    pub error: Option<OperationError>,
}

/// `google.rpc.Status` carried by a failed operation.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationError {
    /// Canonical gRPC code.
    #[serde(default)]
    pub code: i32,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
}

impl OperationError {
    fn into_firebase_error(self) -> FirebaseError {
        let (status, api_status) = match self.code {
            5 => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            6 => (StatusCode::CONFLICT, "ALREADY_EXISTS"),
            7 => (StatusCode::FORBIDDEN, "PERMISSION_DENIED"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "UNKNOWN"),
        };
        FirebaseError::Api {
            operation: "index build",
            status,
            api_status: Some(api_status.to_string()),
            message: Some(self.message.clone()),
            body: self.message,
        }
    }
}

/// Outcome of waiting on an index build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexBuild {
    /// The build finished within the wait.
    Ready,
    /// The wait elapsed; the build continues in the background.
    InProgress {
        /// Operation to poll later.
        operation: String,
    },
}

/// Client for `projects/{p}/databases/(default)/collectionGroups/*/indexes`.
#[derive(Debug, Clone)]
pub struct IndexAdminClient {
    rest: RestClient,
    project_id: String,
    poll_interval: Duration,
}

impl IndexAdminClient {
    /// Build a client for the project's default database.
    #[must_use]
    pub fn new(rest: RestClient, project_id: impl Into<String>) -> Self {
        Self {
            rest,
            project_id: project_id.into(),
            poll_interval: Duration::from_secs(1),
        }
    }

    /// Override the delay between operation polls.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Submit a create-index request and return the operation.
    ///
    /// # Errors
    ///
    /// Returns [`FirebaseError::Api`] for rejected requests, including
    /// `ALREADY_EXISTS` and `PERMISSION_DENIED`.
    pub async fn create_index(&self, index: &IndexDescriptor) -> FirebaseResult<Operation> {
        let path = format!(
            "v1/projects/{}/databases/{DEFAULT_DATABASE}/collectionGroups/{}/indexes",
            self.project_id, index.collection_group
        );
        let body = IndexRequest {
            query_scope: "COLLECTION",
            fields: &index.fields,
        };
        self.rest
            .call("create index", Method::POST, &path, &[], Some(&body))
            .await
    }

    /// Fetch the current state of an operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation cannot be read.
    pub async fn get_operation(&self, name: &str) -> FirebaseResult<Operation> {
        let path = format!("v1/{name}");
        self.rest
            .call::<Value, _>("get operation", Method::GET, &path, &[], None)
            .await
    }

    /// Poll `operation` until it finishes or `wait` elapses.
    ///
    /// # Errors
    ///
    /// Returns the operation's failure as [`FirebaseError::Api`], or any polling error.
    pub async fn wait_for(&self, operation: Operation, wait: Duration) -> FirebaseResult<IndexBuild> {
        let name = operation.name.clone();
        match tokio::time::timeout(wait, self.poll_until_done(operation)).await {
            Ok(Ok(())) => Ok(IndexBuild::Ready),
            Ok(Err(err)) => Err(err),
            Err(_) => Ok(IndexBuild::InProgress { operation: name }),
        }
    }

    async fn poll_until_done(&self, mut current: Operation) -> FirebaseResult<()> {
        loop {
            if current.done {
                return current
                    .error
                    .map_or(Ok(()), |error| Err(error.into_firebase_error()));
            }
            tokio::time::sleep(self.poll_interval).await;
            current = self.get_operation(&current.name).await?;
        }
    }
}
