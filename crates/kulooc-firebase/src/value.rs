//! Conversion between plain JSON and Firestore's typed REST values.
//!
//! Firestore wraps every value in a single-key object naming its type
//! (`{"stringValue": "x"}`, `{"integerValue": "42"}`, ...). Documents are
//! handled as plain `serde_json` maps everywhere else in the workspace.

use serde_json::{Map, Number, Value, json};

use crate::error::{FirebaseError, FirebaseResult};

/// Encode a plain JSON field map into Firestore `fields`.
#[must_use]
pub fn encode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), encode_value(value)))
        .collect()
}

/// Encode a single plain JSON value.
///
/// Firestore integers are signed 64-bit; an unsigned number above `i64::MAX`
/// is sent as a `doubleValue` and may lose precision.
#[must_use]
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(flag) => json!({ "booleanValue": flag }),
        Value::Number(number) => match number.as_i64() {
            Some(integer) => json!({ "integerValue": integer.to_string() }),
            None => json!({ "doubleValue": number.as_f64().unwrap_or_default() }),
        },
        Value::String(text) => json!({ "stringValue": text }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// Decode Firestore `fields` into a plain JSON map.
///
/// # Errors
///
/// Returns [`FirebaseError::InvalidValue`] when a value has no recognised type
/// or carries a malformed payload.
pub fn decode_fields(fields: &Map<String, Value>) -> FirebaseResult<Map<String, Value>> {
    fields
        .iter()
        .map(|(name, value)| decode_value(name, value).map(|decoded| (name.clone(), decoded)))
        .collect()
}

/// Decode a single typed value; `field` names the value in errors.
///
/// # Errors
///
/// Returns [`FirebaseError::InvalidValue`] for unknown or malformed values.
pub fn decode_value(field: &str, value: &Value) -> FirebaseResult<Value> {
    let invalid = |reason| FirebaseError::InvalidValue {
        field: field.to_string(),
        reason,
    };
    let object = value.as_object().ok_or_else(|| invalid("expected a typed value object"))?;
    let (kind, payload) = object
        .iter()
        .next()
        .ok_or_else(|| invalid("empty typed value"))?;

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => payload
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| invalid("booleanValue is not a boolean")),
        "integerValue" => {
            // Integers travel as decimal strings; some emulators send numbers.
            let parsed = match payload {
                Value::String(text) => text.parse::<i64>().ok(),
                Value::Number(number) => number.as_i64(),
                _ => None,
            };
            parsed
                .map(|integer| Value::Number(integer.into()))
                .ok_or_else(|| invalid("integerValue is not a 64-bit integer"))
        }
        "doubleValue" => {
            // JSON has no NaN or infinities; keep the wire spelling as a string.
            if let Some(text @ ("NaN" | "Infinity" | "-Infinity")) = payload.as_str() {
                return Ok(Value::String(text.to_string()));
            }
            let parsed = match payload {
                Value::Number(number) => number.as_f64(),
                Value::String(text) => text.parse::<f64>().ok(),
                _ => None,
            };
            parsed
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| invalid("doubleValue is not a number"))
        }
        "timestampValue" | "stringValue" | "bytesValue" | "referenceValue" => payload
            .as_str()
            .map(|text| Value::String(text.to_string()))
            .ok_or_else(|| invalid("expected a string payload")),
        "geoPointValue" => {
            let point = payload
                .as_object()
                .ok_or_else(|| invalid("geoPointValue is not an object"))?;
            // Firestore omits zero components.
            let component = |name: &str| match point.get(name) {
                None => Ok(0.0),
                Some(value) => value
                    .as_f64()
                    .ok_or_else(|| invalid("geoPointValue component is not a number")),
            };
            let latitude = component("latitude")?;
            let longitude = component("longitude")?;
            Ok(json!({ "latitude": latitude, "longitude": longitude }))
        }
        "arrayValue" => {
            let Some(values) = payload.get("values") else {
                return Ok(Value::Array(Vec::new()));
            };
            let values = values
                .as_array()
                .ok_or_else(|| invalid("arrayValue.values is not an array"))?;
            values
                .iter()
                .map(|item| decode_value(field, item))
                .collect::<FirebaseResult<Vec<_>>>()
                .map(Value::Array)
        }
        "mapValue" => {
            let Some(fields) = payload.get("fields") else {
                return Ok(Value::Object(Map::new()));
            };
            let fields = fields
                .as_object()
                .ok_or_else(|| invalid("mapValue.fields is not an object"))?;
            decode_fields(fields).map(Value::Object)
        }
        _ => Err(invalid("unknown value type")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};

    fn object(value: Value) -> Result<Map<String, Value>> {
        match value {
            Value::Object(map) => Ok(map),
            _ => Err(anyhow!("expected object")),
        }
    }

    #[test]
    fn encodes_driver_payload() -> Result<()> {
        let fields = object(json!({
            "name": "Jean Dupont",
            "rating": 4.8,
            "totalTrips": 0,
            "active": true,
            "notes": null,
            "tags": ["vip"],
            "location": { "latitude": 45.5088, "longitude": -73.554 },
        }))?;

        let encoded = encode_fields(&fields);
        assert_eq!(encoded["name"], json!({ "stringValue": "Jean Dupont" }));
        assert_eq!(encoded["rating"], json!({ "doubleValue": 4.8 }));
        assert_eq!(encoded["totalTrips"], json!({ "integerValue": "0" }));
        assert_eq!(encoded["active"], json!({ "booleanValue": true }));
        assert_eq!(encoded["notes"], json!({ "nullValue": null }));
        assert_eq!(
            encoded["tags"],
            json!({ "arrayValue": { "values": [{ "stringValue": "vip" }] } })
        );
        assert_eq!(
            encoded["location"],
            json!({ "mapValue": { "fields": {
                "latitude": { "doubleValue": 45.5088 },
                "longitude": { "doubleValue": -73.554 },
            } } })
        );
        Ok(())
    }

    #[test]
    fn decodes_every_value_kind() -> Result<()> {
        let fields = object(json!({
            "nothing": { "nullValue": null },
            "flag": { "booleanValue": false },
            "count": { "integerValue": "1247" },
            "ratio": { "doubleValue": 0.95 },
            "seen": { "timestampValue": "2026-10-19T08:00:00Z" },
            "name": { "stringValue": "Emily Chen" },
            "blob": { "bytesValue": "AQID" },
            "ref": { "referenceValue": "projects/p/databases/(default)/documents/drivers/d1" },
            "where": { "geoPointValue": { "latitude": 45.5, "longitude": -73.6 } },
            "empty": { "arrayValue": {} },
            "vehicle": { "mapValue": { "fields": {
                "make": { "stringValue": "Tesla" },
                "year": { "integerValue": "2023" },
            } } },
        }))?;

        let decoded = decode_fields(&fields)?;
        assert_eq!(decoded["nothing"], Value::Null);
        assert_eq!(decoded["flag"], json!(false));
        assert_eq!(decoded["count"], json!(1247));
        assert_eq!(decoded["ratio"], json!(0.95));
        assert_eq!(decoded["seen"], json!("2026-10-19T08:00:00Z"));
        assert_eq!(decoded["name"], json!("Emily Chen"));
        assert_eq!(decoded["blob"], json!("AQID"));
        assert_eq!(decoded["where"], json!({ "latitude": 45.5, "longitude": -73.6 }));
        assert_eq!(decoded["empty"], json!([]));
        assert_eq!(decoded["vehicle"], json!({ "make": "Tesla", "year": 2023 }));
        Ok(())
    }

    #[test]
    fn rejects_malformed_integers_and_unknown_kinds() {
        let bad_integer = decode_value("totalTrips", &json!({ "integerValue": "12abc" }));
        assert!(matches!(
            bad_integer,
            Err(FirebaseError::InvalidValue { ref field, .. }) if field == "totalTrips"
        ));

        let unknown = decode_value("x", &json!({ "vectorValue": [] }));
        assert!(unknown.is_err());

        let untyped = decode_value("x", &json!("plain"));
        assert!(untyped.is_err());
    }

    #[test]
    fn non_finite_doubles_decode_to_their_wire_spelling() -> Result<()> {
        for spelling in ["NaN", "Infinity", "-Infinity"] {
            let decoded = decode_value("rating", &json!({ "doubleValue": spelling }))?;
            assert_eq!(decoded, json!(spelling));
        }
        assert_eq!(
            decode_value("rating", &json!({ "doubleValue": "4.5" }))?,
            json!(4.5)
        );
        assert!(decode_value("rating", &json!({ "doubleValue": "fast" })).is_err());
        Ok(())
    }

    #[test]
    fn geo_points_default_only_missing_components() -> Result<()> {
        let equator = decode_value("where", &json!({ "geoPointValue": { "longitude": 12.5 } }))?;
        assert_eq!(equator, json!({ "latitude": 0.0, "longitude": 12.5 }));

        let scalar = decode_value("where", &json!({ "geoPointValue": "45.5,-73.6" }));
        assert!(matches!(scalar, Err(FirebaseError::InvalidValue { .. })));

        let text_component = decode_value(
            "where",
            &json!({ "geoPointValue": { "latitude": "north", "longitude": 1.0 } }),
        );
        assert!(text_component.is_err());
        Ok(())
    }

    #[test]
    fn unsigned_beyond_i64_is_sent_as_double() {
        let encoded = encode_value(&json!(u64::MAX));
        assert!(encoded.get("doubleValue").is_some());
        assert_eq!(encode_value(&json!(i64::MAX)), json!({ "integerValue": i64::MAX.to_string() }));
    }

    #[test]
    fn encode_then_decode_preserves_nested_documents() -> Result<()> {
        let original = object(json!({
            "vehicle": { "make": "Toyota", "year": 2022, "plates": ["ABC123"] },
        }))?;
        let decoded = decode_fields(&encode_fields(&original))?;
        assert_eq!(decoded, original);
        Ok(())
    }
}
