use std::io::Write;

use kulooc_firebase::DocumentStore;

use crate::cli::OutputFormat;
use crate::client::{AppContext, CliError, CliResult};
use crate::commands::DRIVERS;
use crate::output::{DriverSummary, emit, render_driver_list};

pub(crate) async fn handle_list_drivers(
    ctx: &AppContext,
    out: &mut (dyn Write + Send),
) -> CliResult<()> {
    let firestore = ctx.session.firestore();
    list_drivers(&firestore, ctx.session.project_id(), ctx.output, out).await
}

/// Print one summary per driver record. Read-only.
pub(crate) async fn list_drivers(
    store: &dyn DocumentStore,
    project_id: &str,
    format: OutputFormat,
    out: &mut (dyn Write + Send),
) -> CliResult<()> {
    if format == OutputFormat::Table {
        emit(out, "🔍 Vérification des chauffeurs dans Firestore...")?;
        emit(out, format!("📦 Projet: {project_id}\n"))?;
    }

    let documents = store
        .list_documents(DRIVERS)
        .await
        .map_err(CliError::failure)?;
    tracing::debug!(count = documents.len(), "listed drivers");

    let drivers: Vec<DriverSummary> = documents.iter().map(DriverSummary::from_document).collect();
    render_driver_list(out, &drivers, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_context::context_for;
    use anyhow::Result;
    use httpmock::prelude::*;
    use kulooc_test_support::mocks::InMemoryStore;
    use serde_json::json;

    async fn listed(store: &InMemoryStore, format: OutputFormat) -> Result<String> {
        let mut out = Vec::new();
        list_drivers(store, "kulooc-test", format, &mut out).await?;
        Ok(String::from_utf8(out)?)
    }

    #[tokio::test]
    async fn prints_one_entry_per_driver() -> Result<()> {
        let store = InMemoryStore::new();
        for id in ["d1", "d2", "d3"] {
            store.seed(DRIVERS, id, json!({ "email": format!("{id}@kulooc.com") }));
        }

        let text = listed(&store, OutputFormat::Table).await?;
        assert!(text.contains("✅ 3 chauffeur(s) trouvé(s):"));
        assert_eq!(text.matches("📍 Chauffeur ID:").count(), 3);
        assert_eq!(text.matches("   Nom: N/A").count(), 3);
        assert_eq!(text.matches("   Position: Non définie").count(), 3);
        assert_eq!(store.writes(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn empty_collection_is_reported() -> Result<()> {
        let store = InMemoryStore::new();
        let text = listed(&store, OutputFormat::Table).await?;
        assert!(text.contains("❌ Aucun chauffeur trouvé dans Firestore"));
        Ok(())
    }

    #[tokio::test]
    async fn json_output_skips_banner() -> Result<()> {
        let store = InMemoryStore::new();
        store.seed(DRIVERS, "d1", json!({ "name": "Jean Dupont", "status": "busy" }));

        let text = listed(&store, OutputFormat::Json).await?;
        let parsed: serde_json::Value = serde_json::from_str(&text)?;
        assert_eq!(parsed[0]["name"], json!("Jean Dupont"));
        assert_eq!(parsed[0]["status"], json!("busy"));
        Ok(())
    }

    #[tokio::test]
    async fn handler_follows_pagination() -> Result<()> {
        let server = MockServer::start_async().await;
        let path = "/v1/projects/kulooc-test/databases/(default)/documents/drivers";
        let second = server.mock(|when, then| {
            when.method(GET).path(path).query_param("pageToken", "next");
            then.status(200).json_body(json!({
                "documents": [{
                    "name": "projects/kulooc-test/databases/(default)/documents/drivers/d2",
                    "fields": { "status": { "stringValue": "offline" } }
                }]
            }));
        });
        let first = server.mock(|when, then| {
            when.method(GET)
                .path(path)
                .query_param("pageSize", "300")
                .query_param_missing("pageToken");
            then.status(200).json_body(json!({
                "documents": [{
                    "name": "projects/kulooc-test/databases/(default)/documents/drivers/d1",
                    "fields": { "status": { "stringValue": "online" } }
                }],
                "nextPageToken": "next"
            }));
        });

        let ctx = context_for(&server, OutputFormat::Table)?;
        let mut out = Vec::new();
        handle_list_drivers(&ctx, &mut out).await?;

        first.assert();
        second.assert();
        let text = String::from_utf8(out)?;
        assert!(text.contains("📍 Chauffeur ID: d1"));
        assert!(text.contains("📍 Chauffeur ID: d2"));
        Ok(())
    }

    #[tokio::test]
    async fn non_finite_rating_does_not_hide_drivers() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET)
                .path("/v1/projects/kulooc-test/databases/(default)/documents/drivers");
            then.status(200).json_body(json!({
                "documents": [
                    {
                        "name": "projects/kulooc-test/databases/(default)/documents/drivers/d1",
                        "fields": { "rating": { "doubleValue": 4.8 } }
                    },
                    {
                        "name": "projects/kulooc-test/databases/(default)/documents/drivers/d2",
                        "fields": {
                            "name": { "stringValue": "Emily Chen" },
                            "rating": { "doubleValue": "NaN" }
                        }
                    }
                ]
            }));
        });

        let ctx = context_for(&server, OutputFormat::Table)?;
        let mut out = Vec::new();
        handle_list_drivers(&ctx, &mut out).await?;

        let text = String::from_utf8(out)?;
        assert!(text.contains("✅ 2 chauffeur(s) trouvé(s):"));
        assert_eq!(text.matches("📍 Chauffeur ID:").count(), 2);
        assert!(text.contains("   Nom: Emily Chen"));
        Ok(())
    }
}
