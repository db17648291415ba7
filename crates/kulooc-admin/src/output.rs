//! Output renderers and formatting helpers for CLI commands.

use std::fmt::Display;
use std::io::Write;

use anyhow::anyhow;
use kulooc_firebase::Document;
use serde::Serialize;
use serde_json::Value;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

const MISSING: &str = "N/A";
const NO_POSITION: &str = "Non définie";

/// Write one line of console output.
pub(crate) fn emit(out: &mut dyn Write, line: impl Display) -> CliResult<()> {
    writeln!(out, "{line}")
        .map_err(|err| CliError::failure(anyhow!("failed to write output: {err}")))
}

/// Pretty-print a JSON value.
pub(crate) fn render_json<T: Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    emit(out, text)
}

/// Fixed projection of a driver record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct DriverSummary {
    pub(crate) id: String,
    pub(crate) name: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) phone: Option<String>,
    pub(crate) status: Option<String>,
    pub(crate) position: Option<Position>,
    pub(crate) vehicle: Option<VehicleSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Position {
    pub(crate) latitude: Option<f64>,
    pub(crate) longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VehicleSummary {
    pub(crate) make: Option<String>,
    pub(crate) model: Option<String>,
    pub(crate) license_plate: Option<String>,
}

impl DriverSummary {
    pub(crate) fn from_document(document: &Document) -> Self {
        let location = document.fields.get("location").and_then(Value::as_object);
        let vehicle = document.fields.get("vehicle").and_then(Value::as_object);
        Self {
            id: document.id().to_string(),
            name: display_name(document),
            email: text(document.fields.get("email")),
            phone: text(document.fields.get("phone")),
            status: text(document.fields.get("status")),
            position: location.map(|location| Position {
                latitude: location.get("latitude").and_then(Value::as_f64),
                longitude: location.get("longitude").and_then(Value::as_f64),
            }),
            vehicle: vehicle.map(|vehicle| VehicleSummary {
                make: text(vehicle.get("make")),
                model: text(vehicle.get("model")),
                license_plate: text(vehicle.get("licensePlate")),
            }),
        }
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// `name`, or `firstName lastName` when only the parts are stored.
fn display_name(document: &Document) -> Option<String> {
    if let Some(name) = document.str_field("name").filter(|name| !name.is_empty()) {
        return Some(name.to_string());
    }
    let parts: Vec<&str> = ["firstName", "lastName"]
        .into_iter()
        .filter_map(|field| document.str_field(field))
        .filter(|part| !part.is_empty())
        .collect();
    (!parts.is_empty()).then(|| parts.join(" "))
}

fn or_missing(value: Option<&str>) -> &str {
    value.unwrap_or(MISSING)
}

fn format_coordinate(value: Option<f64>) -> String {
    value.map_or_else(|| MISSING.to_string(), |value| value.to_string())
}

pub(crate) fn format_position(position: Option<&Position>) -> String {
    position.map_or_else(
        || NO_POSITION.to_string(),
        |position| {
            format!(
                "{}, {}",
                format_coordinate(position.latitude),
                format_coordinate(position.longitude)
            )
        },
    )
}

pub(crate) fn format_vehicle(vehicle: Option<&VehicleSummary>) -> String {
    vehicle.map_or_else(
        || MISSING.to_string(),
        |vehicle| {
            format!(
                "{} {} ({})",
                or_missing(vehicle.make.as_deref()),
                or_missing(vehicle.model.as_deref()),
                or_missing(vehicle.license_plate.as_deref())
            )
        },
    )
}

pub(crate) fn render_driver_list(
    out: &mut dyn Write,
    drivers: &[DriverSummary],
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => render_json(out, drivers),
        OutputFormat::Table => {
            if drivers.is_empty() {
                return emit(out, "❌ Aucun chauffeur trouvé dans Firestore");
            }
            emit(out, format!("✅ {} chauffeur(s) trouvé(s):\n", drivers.len()))?;
            for driver in drivers {
                render_driver(out, driver)?;
            }
            Ok(())
        }
    }
}

fn render_driver(out: &mut dyn Write, driver: &DriverSummary) -> CliResult<()> {
    emit(out, format!("📍 Chauffeur ID: {}", driver.id))?;
    emit(out, format!("   Nom: {}", or_missing(driver.name.as_deref())))?;
    emit(out, format!("   Email: {}", or_missing(driver.email.as_deref())))?;
    emit(out, format!("   Téléphone: {}", or_missing(driver.phone.as_deref())))?;
    emit(out, format!("   Statut: {}", or_missing(driver.status.as_deref())))?;
    emit(out, format!("   Position: {}", format_position(driver.position.as_ref())))?;
    emit(out, format!("   Véhicule: {}", format_vehicle(driver.vehicle.as_ref())))?;
    emit(out, "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};

    fn document(id: &str, fields: Value) -> Document {
        Document {
            name: format!("projects/p/databases/(default)/documents/drivers/{id}"),
            fields: match fields {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            create_time: None,
            update_time: None,
        }
    }

    fn rendered(drivers: &[DriverSummary], format: OutputFormat) -> anyhow::Result<String> {
        let mut out = Vec::new();
        render_driver_list(&mut out, drivers, format)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn summary_projects_fixed_fields() {
        let summary = DriverSummary::from_document(&document(
            "d1",
            json!({
                "name": "Jean Dupont",
                "email": "jean.dupont@kulooc.com",
                "phone": "+15141234567",
                "status": "en-route",
                "location": { "latitude": 45.5088, "longitude": -73.554 },
                "vehicle": { "make": "Toyota", "model": "Camry", "licensePlate": "ABC123", "year": 2022 }
            }),
        ));
        assert_eq!(summary.id, "d1");
        assert_eq!(summary.status.as_deref(), Some("en-route"));
        assert_eq!(format_position(summary.position.as_ref()), "45.5088, -73.554");
        assert_eq!(format_vehicle(summary.vehicle.as_ref()), "Toyota Camry (ABC123)");
    }

    #[test]
    fn name_falls_back_to_first_and_last_name() {
        let summary = DriverSummary::from_document(&document(
            "d2",
            json!({ "firstName": "Jean-Pierre", "lastName": "Tremblay" }),
        ));
        assert_eq!(summary.name.as_deref(), Some("Jean-Pierre Tremblay"));
    }

    #[test]
    fn table_substitutes_placeholders_for_missing_fields() -> anyhow::Result<()> {
        let summary = DriverSummary::from_document(&document("bare", json!({})));
        let text = rendered(&[summary], OutputFormat::Table)?;
        assert!(text.contains("📍 Chauffeur ID: bare"));
        assert!(text.contains("   Nom: N/A"));
        assert!(text.contains("   Email: N/A"));
        assert!(text.contains("   Position: Non définie"));
        assert!(text.contains("   Véhicule: N/A"));
        Ok(())
    }

    #[test]
    fn table_reports_empty_collection() -> anyhow::Result<()> {
        let text = rendered(&[], OutputFormat::Table)?;
        assert_eq!(text, "❌ Aucun chauffeur trouvé dans Firestore\n");
        Ok(())
    }

    #[test]
    fn json_renders_an_array_of_summaries() -> anyhow::Result<()> {
        let drivers: Vec<DriverSummary> = ["a", "b"]
            .into_iter()
            .map(|id| DriverSummary::from_document(&document(id, json!({ "status": "online" }))))
            .collect();
        let text = rendered(&drivers, OutputFormat::Json)?;
        let parsed: Value = serde_json::from_str(&text)?;
        assert_eq!(parsed.as_array().map(Vec::len), Some(2));
        assert_eq!(parsed[0]["status"], json!("online"));
        assert_eq!(parsed[1]["position"], Value::Null);
        Ok(())
    }
}
