//! Firebase Rules API: rulesets and releases.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{ApiStatus, FirebaseResult};
use crate::rest::RestClient;

/// Release channel serving Cloud Firestore.
pub const FIRESTORE_RELEASE: &str = "cloud.firestore";

/// Ruleset resource returned on creation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ruleset {
    /// `projects/{p}/rulesets/{id}`.
    pub name: String,
}

#[derive(Debug, Serialize)]
struct RulesetRequest<'a> {
    source: RulesetSource<'a>,
}

#[derive(Debug, Serialize)]
struct RulesetSource<'a> {
    files: [RulesFile<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RulesFile<'a> {
    name: &'a str,
    content: &'a str,
}

/// How a release ended up pointing at the ruleset.
#[derive(Debug, Clone, PartialEq)]
pub enum ReleaseOutcome {
    /// A new release was created.
    Created(Value),
    /// An existing release was repointed.
    Updated(Value),
}

impl ReleaseOutcome {
    /// Release resource returned by the API.
    #[must_use]
    pub const fn release(&self) -> &Value {
        match self {
            Self::Created(release) | Self::Updated(release) => release,
        }
    }
}

/// Client for `firebaserules.googleapis.com`.
#[derive(Debug, Clone)]
pub struct RulesClient {
    rest: RestClient,
    project_id: String,
}

impl RulesClient {
    /// Build a client for the project.
    #[must_use]
    pub fn new(rest: RestClient, project_id: impl Into<String>) -> Self {
        Self {
            rest,
            project_id: project_id.into(),
        }
    }

    /// `projects/{p}/releases/{release_id}`.
    #[must_use]
    pub fn release_name(&self, release_id: &str) -> String {
        format!("projects/{}/releases/{release_id}", self.project_id)
    }

    /// Upload a rules source as a new ruleset.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FirebaseError::Api`] when the source is rejected (e.g.
    /// compilation errors) or the caller lacks permission.
    pub async fn create_ruleset(&self, file_name: &str, content: &str) -> FirebaseResult<Ruleset> {
        let path = format!("v1/projects/{}/rulesets", self.project_id);
        let body = RulesetRequest {
            source: RulesetSource {
                files: [RulesFile {
                    name: file_name,
                    content,
                }],
            },
        };
        self.rest
            .call("create ruleset", Method::POST, &path, &[], Some(&body))
            .await
    }

    /// Create the release `release_id` pointing at `ruleset_name`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FirebaseError::Api`] when the release exists or the call is rejected.
    pub async fn create_release(&self, release_id: &str, ruleset_name: &str) -> FirebaseResult<Value> {
        let path = format!("v1/projects/{}/releases", self.project_id);
        let body = json!({
            "name": self.release_name(release_id),
            "rulesetName": ruleset_name,
        });
        self.rest
            .call("create release", Method::POST, &path, &[], Some(&body))
            .await
    }

    /// Repoint the existing release `release_id` at `ruleset_name`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FirebaseError::Api`] when the call is rejected.
    pub async fn update_release(&self, release_id: &str, ruleset_name: &str) -> FirebaseResult<Value> {
        let name = self.release_name(release_id);
        let path = format!("v1/{name}");
        let body = json!({
            "release": {
                "name": name,
                "rulesetName": ruleset_name,
            }
        });
        self.rest
            .call("update release", Method::PATCH, &path, &[], Some(&body))
            .await
    }

    /// Point `release_id` at `ruleset_name`, creating the release or updating it
    /// when it already exists.
    ///
    /// # Errors
    ///
    /// Returns the first failure that is not `ALREADY_EXISTS`.
    pub async fn publish(&self, release_id: &str, ruleset_name: &str) -> FirebaseResult<ReleaseOutcome> {
        match self.create_release(release_id, ruleset_name).await {
            Ok(release) => Ok(ReleaseOutcome::Created(release)),
            Err(err) if err.api_status() == Some(ApiStatus::AlreadyExists) => {
                tracing::debug!(release_id, "release exists; updating in place");
                self.update_release(release_id, ruleset_name)
                    .await
                    .map(ReleaseOutcome::Updated)
            }
            Err(err) => Err(err),
        }
    }
}
