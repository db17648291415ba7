use std::io::Write;

use anyhow::anyhow;
use kulooc_firebase::{DocumentStore, FieldQuery};
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::client::{AppContext, CliError, CliResult};
use crate::commands::DRIVERS;
use crate::output::emit;

const TEST_DRIVER_EMAIL: &str = "jean.dupont@kulooc.com";
const DISPATCH_DASHBOARD_URL: &str = "https://kulooc-app.vercel.app/dispatch";
const CREATE_TIMESTAMPS: [&str; 3] = ["onlineSince", "createdAt", "updatedAt"];
const REACTIVATE_TIMESTAMPS: [&str; 2] = ["onlineSince", "updatedAt"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DriverProfile {
    name: &'static str,
    email: &'static str,
    phone: &'static str,
    status: &'static str,
    location: Location,
    vehicle: Vehicle,
    rating: f64,
    total_trips: u32,
    acceptance_rate: f64,
    average_rating: f64,
}

#[derive(Debug, Serialize)]
struct Location {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Vehicle {
    make: &'static str,
    model: &'static str,
    year: u16,
    color: &'static str,
    license_plate: &'static str,
}

const fn sample_driver() -> DriverProfile {
    DriverProfile {
        name: "Jean Dupont",
        email: TEST_DRIVER_EMAIL,
        phone: "+15141234567",
        status: "online",
        location: Location {
            latitude: 45.5088,
            longitude: -73.554,
        },
        vehicle: Vehicle {
            make: "Toyota",
            model: "Camry",
            year: 2022,
            color: "Noir",
            license_plate: "ABC123",
        },
        rating: 4.8,
        total_trips: 0,
        acceptance_rate: 0.95,
        average_rating: 4.8,
    }
}

fn into_fields(profile: &DriverProfile) -> CliResult<Map<String, Value>> {
    match serde_json::to_value(profile) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(CliError::failure(anyhow!("driver profile is not an object"))),
        Err(err) => Err(CliError::failure(err)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TestDriverOutcome {
    Created(String),
    Reactivated(String),
}

pub(crate) async fn handle_create_test_driver(
    ctx: &AppContext,
    out: &mut (dyn Write + Send),
) -> CliResult<()> {
    let firestore = ctx.session.firestore();
    create_test_driver(&firestore, ctx.session.project_id(), out)
        .await
        .map(|_| ())
}

/// Create the sample driver, or put the existing one back online.
pub(crate) async fn create_test_driver(
    store: &dyn DocumentStore,
    project_id: &str,
    out: &mut (dyn Write + Send),
) -> CliResult<TestDriverOutcome> {
    emit(out, "🚗 Création d'un chauffeur de test dans Firestore...")?;
    emit(out, format!("📦 Projet: {project_id}"))?;

    let query = FieldQuery::equal(DRIVERS, "email", json!(TEST_DRIVER_EMAIL)).limit(1);
    let existing = store.run_query(&query).await.map_err(CliError::failure)?;

    if let Some(driver) = existing.first() {
        let id = driver.id().to_string();
        emit(out, "ℹ️  Un chauffeur avec cet email existe déjà")?;
        emit(out, format!("   ID: {id}"))?;
        emit(out, format!("   Nom: {}", driver.str_field("name").unwrap_or("N/A")))?;
        emit(out, format!("   Statut: {}", driver.str_field("status").unwrap_or("N/A")))?;

        let mut fields = Map::new();
        fields.insert("status".to_string(), json!("online"));
        store
            .update_document(DRIVERS, &id, &fields, &REACTIVATE_TIMESTAMPS)
            .await
            .map_err(CliError::failure)?;
        tracing::info!(driver_id = %id, "test driver set online");
        emit(out, "   ✅ Statut mis à jour: online")?;
        return Ok(TestDriverOutcome::Reactivated(id));
    }

    let profile = sample_driver();
    let fields = into_fields(&profile)?;
    let id = store
        .create_document(DRIVERS, &fields, &CREATE_TIMESTAMPS)
        .await
        .map_err(CliError::failure)?;
    tracing::info!(driver_id = %id, "test driver created");

    emit(out, "\n✅ Chauffeur créé avec succès!")?;
    emit(out, format!("   ID: {id}"))?;
    emit(out, format!("   Nom: {}", profile.name))?;
    emit(out, format!("   Email: {}", profile.email))?;
    emit(
        out,
        format!("   Véhicule: {} {}", profile.vehicle.make, profile.vehicle.model),
    )?;
    emit(out, format!("   Plaque: {}", profile.vehicle.license_plate))?;
    emit(out, format!("   Statut: {}", profile.status))?;
    emit(
        out,
        format!(
            "   Position: {}, {}",
            profile.location.latitude, profile.location.longitude
        ),
    )?;
    emit(out, "\n🎉 Le chauffeur est maintenant disponible pour recevoir des courses!")?;
    emit(out, "\n📍 Vous pouvez le voir sur le dashboard dispatch:")?;
    emit(out, format!("   {DISPATCH_DASHBOARD_URL}"))?;
    Ok(TestDriverOutcome::Created(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use crate::client::test_context::context_for;
    use anyhow::Result;
    use httpmock::prelude::*;
    use kulooc_test_support::mocks::{InMemoryStore, SERVER_TIME};

    async fn run(store: &InMemoryStore) -> Result<(TestDriverOutcome, String)> {
        let mut out = Vec::new();
        let outcome = create_test_driver(store, "kulooc-test", &mut out).await?;
        Ok((outcome, String::from_utf8(out)?))
    }

    #[test]
    fn sample_payload_matches_the_reference_driver() -> Result<()> {
        let fields = into_fields(&sample_driver())?;
        assert_eq!(fields["email"], json!("jean.dupont@kulooc.com"));
        assert_eq!(fields["location"], json!({ "latitude": 45.5088, "longitude": -73.554 }));
        assert_eq!(fields["vehicle"]["licensePlate"], json!("ABC123"));
        assert_eq!(fields["vehicle"]["year"], json!(2022));
        assert_eq!(fields["totalTrips"], json!(0));
        assert_eq!(fields["acceptanceRate"], json!(0.95));
        assert!(!fields.contains_key("createdAt"));
        Ok(())
    }

    #[tokio::test]
    async fn repeated_runs_keep_a_single_driver() -> Result<()> {
        let store = InMemoryStore::new();

        let (first, text) = run(&store).await?;
        let TestDriverOutcome::Created(id) = first else {
            anyhow::bail!("expected a newly created driver");
        };
        assert!(text.contains("https://kulooc-app.vercel.app/dispatch"));
        assert_eq!(id.len(), 20);

        let (second, text) = run(&store).await?;
        assert_eq!(second, TestDriverOutcome::Reactivated(id.clone()));
        assert!(text.contains("existe déjà"));
        assert_eq!(store.count(DRIVERS), 1);
        assert_eq!(store.writes(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn reactivation_only_touches_status_and_timestamps() -> Result<()> {
        let store = InMemoryStore::new();
        store.seed(
            DRIVERS,
            "existing",
            json!({
                "name": "Jean Dupont",
                "email": TEST_DRIVER_EMAIL,
                "status": "offline",
                "rating": 3.9,
                "createdAt": "2025-01-01T00:00:00Z"
            }),
        );

        let (outcome, _) = run(&store).await?;
        assert_eq!(outcome, TestDriverOutcome::Reactivated("existing".into()));
        let fields = store.get(DRIVERS, "existing").unwrap_or_default();
        assert_eq!(fields["status"], json!("online"));
        assert_eq!(fields["onlineSince"], json!(SERVER_TIME));
        assert_eq!(fields["updatedAt"], json!(SERVER_TIME));
        assert_eq!(fields["rating"], json!(3.9));
        assert_eq!(fields["createdAt"], json!("2025-01-01T00:00:00Z"));
        Ok(())
    }

    #[tokio::test]
    async fn handler_creates_with_precondition_and_server_timestamps() -> Result<()> {
        let server = MockServer::start_async().await;
        let query = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/projects/kulooc-test/databases/(default)/documents:runQuery")
                .json_body(json!({
                    "structuredQuery": {
                        "from": [{ "collectionId": "drivers" }],
                        "where": { "fieldFilter": {
                            "field": { "fieldPath": "email" },
                            "op": "EQUAL",
                            "value": { "stringValue": "jean.dupont@kulooc.com" }
                        } },
                        "limit": 1
                    }
                }));
            then.status(200)
                .json_body(json!([{ "readTime": "2026-01-01T00:00:00Z" }]));
        });
        let commit = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/projects/kulooc-test/databases/(default)/documents:commit")
                .body_includes("\"exists\":false")
                .body_includes("\"setToServerValue\":\"REQUEST_TIME\"")
                .body_includes("\"integerValue\":\"2022\"");
            then.status(200).json_body(json!({
                "writeResults": [{ "updateTime": "2026-01-01T00:00:00Z" }],
                "commitTime": "2026-01-01T00:00:00Z"
            }));
        });

        let ctx = context_for(&server, OutputFormat::Table)?;
        let mut out = Vec::new();
        handle_create_test_driver(&ctx, &mut out).await?;

        query.assert();
        commit.assert();
        Ok(())
    }
}
