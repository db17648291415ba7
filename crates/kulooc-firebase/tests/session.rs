use std::time::Duration;

use anyhow::Result;
use httpmock::prelude::*;
use kulooc_firebase::{DocumentStore, Endpoints, FirebaseSession};
use kulooc_test_support::fixtures::{TEST_PROJECT_ID, write_service_account};
use serde_json::json;

#[tokio::test]
async fn session_exchanges_credential_and_lists_documents() -> Result<()> {
    let server = MockServer::start_async().await;
    let token = server.mock(|when, then| {
        when.method(POST)
            .path("/token")
            .header("content-type", "application/x-www-form-urlencoded");
        then.status(200).json_body(json!({
            "access_token": "ya29.session",
            "expires_in": 3600,
            "token_type": "Bearer"
        }));
    });
    let list = server.mock(|when, then| {
        when.method(GET)
            .path("/v1/projects/kulooc-test/databases/(default)/documents/drivers")
            .header("authorization", "Bearer ya29.session");
        then.status(200).json_body(json!({
            "documents": [{
                "name": "projects/kulooc-test/databases/(default)/documents/drivers/d1",
                "fields": { "name": { "stringValue": "Jean Dupont" } }
            }]
        }));
    });

    let dir = tempfile::tempdir()?;
    let path = write_service_account(dir.path(), &server.url("/token"))?;

    let endpoints = Endpoints {
        firestore: server.base_url(),
        ..Endpoints::default()
    };
    let session = FirebaseSession::connect(&path, &endpoints, Duration::from_secs(5))?;
    assert_eq!(session.project_id(), TEST_PROJECT_ID);

    let store = session.firestore();
    let first = DocumentStore::list_documents(&store, "drivers").await?;
    let second = store.list_documents("drivers").await?;
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].id(), "d1");
    assert_eq!(first, second);

    token.assert();
    list.assert_calls(2);
    Ok(())
}
