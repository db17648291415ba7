//! Firestore document client over the v1 REST API.
//!
//! # Design
//! - Documents are exposed as decoded JSON maps (`Document::fields`).
//! - Writes go through `:commit` so server timestamps can be applied as
//!   field transforms alongside the data in one atomic write.
//! - Document ids for new records are generated client-side, 20 alphanumeric
//!   characters like the official SDKs.

use rand::Rng;
use rand::distr::Alphanumeric;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::error::FirebaseResult;
use crate::rest::RestClient;
use crate::value::{decode_fields, encode_fields, encode_value};

/// Database used by the project.
pub const DEFAULT_DATABASE: &str = "(default)";

const LIST_PAGE_SIZE: &str = "300";
const DOCUMENT_ID_LEN: usize = 20;

/// A decoded Firestore document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Full resource name (`projects/…/documents/<collection>/<id>`).
    pub name: String,
    /// Decoded fields.
    pub fields: Map<String, Value>,
    /// Creation time reported by the server.
    pub create_time: Option<String>,
    /// Last update time reported by the server.
    pub update_time: Option<String>,
}

impl Document {
    /// Document id: the last segment of the resource name.
    #[must_use]
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// String field accessor.
    #[must_use]
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    fn from_raw(raw: RawDocument) -> FirebaseResult<Self> {
        Ok(Self {
            name: raw.name,
            fields: decode_fields(&raw.fields)?,
            create_time: raw.create_time,
            update_time: raw.update_time,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
    #[serde(default)]
    create_time: Option<String>,
    #[serde(default)]
    update_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    document: Option<RawDocument>,
}

/// Equality query on a single field of one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldQuery {
    /// Collection id, e.g. `drivers`.
    pub collection: String,
    /// Field path compared for equality.
    pub field: String,
    /// Plain JSON value the field must equal.
    pub value: Value,
    /// Maximum number of documents returned.
    pub limit: Option<u32>,
}

impl FieldQuery {
    /// Documents in `collection` whose `field` equals `value`.
    #[must_use]
    pub fn equal(collection: impl Into<String>, field: impl Into<String>, value: Value) -> Self {
        Self {
            collection: collection.into(),
            field: field.into(),
            value,
            limit: None,
        }
    }

    /// Cap the number of returned documents.
    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    fn structured_query(&self) -> Value {
        let mut query = json!({
            "from": [{ "collectionId": self.collection }],
            "where": {
                "fieldFilter": {
                    "field": { "fieldPath": quote_field_path(&self.field) },
                    "op": "EQUAL",
                    "value": encode_value(&self.value),
                }
            },
        });
        if let (Some(limit), Some(object)) = (self.limit, query.as_object_mut()) {
            object.insert("limit".into(), json!(limit));
        }
        json!({ "structuredQuery": query })
    }
}

/// Quote a simple field name with backticks when it is not a bare identifier.
#[must_use]
pub fn quote_field_path(field: &str) -> String {
    let mut chars = field.chars();
    let bare = chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if bare {
        field.to_string()
    } else {
        format!("`{}`", field.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

/// Generate a document id in the style of the Firestore SDKs.
#[must_use]
pub fn generate_document_id() -> String {
    let mut rng = rand::rng();
    std::iter::repeat_with(|| rng.sample(Alphanumeric) as char)
        .take(DOCUMENT_ID_LEN)
        .collect()
}

/// Client for documents of one project database.
#[derive(Debug, Clone)]
pub struct FirestoreClient {
    rest: RestClient,
    project_id: String,
}

impl FirestoreClient {
    /// Build a client for the project's default database.
    #[must_use]
    pub fn new(rest: RestClient, project_id: impl Into<String>) -> Self {
        Self {
            rest,
            project_id: project_id.into(),
        }
    }

    /// `projects/{p}/databases/(default)`.
    #[must_use]
    pub fn database_path(&self) -> String {
        format!("projects/{}/databases/{DEFAULT_DATABASE}", self.project_id)
    }

    /// Full resource name of a document.
    #[must_use]
    pub fn document_name(&self, collection: &str, id: &str) -> String {
        format!("{}/documents/{collection}/{id}", self.database_path())
    }

    /// Read every document of a collection, following pagination to the end.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails or a document cannot be decoded.
    pub async fn list_documents(&self, collection: &str) -> FirebaseResult<Vec<Document>> {
        let path = format!("v1/{}/documents/{collection}", self.database_path());
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut query = vec![("pageSize", LIST_PAGE_SIZE)];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }
            let page: ListDocumentsResponse = self
                .rest
                .call::<Value, _>("list documents", Method::GET, &path, &query, None)
                .await?;
            for raw in page.documents {
                documents.push(Document::from_raw(raw)?);
            }
            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(documents)
    }

    /// Run a single-field equality query.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a document cannot be decoded.
    pub async fn run_query(&self, query: &FieldQuery) -> FirebaseResult<Vec<Document>> {
        let path = format!("v1/{}/documents:runQuery", self.database_path());
        let results: Vec<QueryResult> = self
            .rest
            .call("run query", Method::POST, &path, &[], Some(&query.structured_query()))
            .await?;
        results
            .into_iter()
            .filter_map(|result| result.document)
            .map(Document::from_raw)
            .collect()
    }

    /// Create a document with a generated id; `server_timestamps` name fields set
    /// to the commit time. Fails if the id is already taken.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    pub async fn create_document(
        &self,
        collection: &str,
        fields: &Map<String, Value>,
        server_timestamps: &[&str],
    ) -> FirebaseResult<String> {
        let id = generate_document_id();
        let write = self.create_write(collection, &id, fields, server_timestamps);
        self.commit(vec![write]).await?;
        Ok(id)
    }

    fn create_write(
        &self,
        collection: &str,
        id: &str,
        fields: &Map<String, Value>,
        server_timestamps: &[&str],
    ) -> Value {
        json!({
            "update": {
                "name": self.document_name(collection, id),
                "fields": encode_fields(fields),
            },
            "currentDocument": { "exists": false },
            "updateTransforms": server_time_transforms(server_timestamps),
        })
    }

    /// Update only the given fields of an existing document, plus server timestamps.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not exist or the commit fails.
    pub async fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: &Map<String, Value>,
        server_timestamps: &[&str],
    ) -> FirebaseResult<()> {
        let mask: Vec<String> = fields.keys().map(|field| quote_field_path(field)).collect();
        let write = json!({
            "update": {
                "name": self.document_name(collection, id),
                "fields": encode_fields(fields),
            },
            "updateMask": { "fieldPaths": mask },
            "currentDocument": { "exists": true },
            "updateTransforms": server_time_transforms(server_timestamps),
        });
        self.commit(vec![write]).await
    }

    /// Delete a document. Deleting a missing document succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete_document(&self, collection: &str, id: &str) -> FirebaseResult<()> {
        let path = format!("v1/{}", self.document_name(collection, id));
        let _: Value = self
            .rest
            .call::<Value, _>("delete document", Method::DELETE, &path, &[], None)
            .await?;
        Ok(())
    }

    async fn commit(&self, writes: Vec<Value>) -> FirebaseResult<()> {
        let path = format!("v1/{}/documents:commit", self.database_path());
        let body = json!({ "writes": writes });
        let _: Value = self
            .rest
            .call("commit", Method::POST, &path, &[], Some(&body))
            .await?;
        Ok(())
    }
}

fn server_time_transforms(fields: &[&str]) -> Vec<Value> {
    fields
        .iter()
        .map(|field| {
            json!({
                "fieldPath": quote_field_path(field),
                "setToServerValue": "REQUEST_TIME",
            })
        })
        .collect()
}
