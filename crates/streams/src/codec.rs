//! Tolerant conversion between typed records and flat field maps.
//!
//! The transport stores envelopes as flat string-keyed maps. Encoding keeps
//! scalars as their string form and serializes nested values (results lists,
//! trace carriers) to JSON text so they round-trip. Decoding is tolerant per
//! field: integer-looking strings come back as integers, valid JSON
//! objects/arrays come back as structure, everything else stays a string,
//! and absent fields take the record's default.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

use crate::log::FieldMap;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    Encode(String),

    #[error("decode failed: {0}")]
    Decode(String),
}

/// Flatten a record into a field map.
///
/// `None` fields are omitted; a decoder recovers them as defaults.
///
/// # Errors
///
/// Fails when the record does not serialize to a JSON object.
pub fn to_fields<T: Serialize>(record: &T) -> Result<FieldMap, CodecError> {
    let value = serde_json::to_value(record).map_err(|e| CodecError::Encode(e.to_string()))?;
    let JsonValue::Object(map) = value else {
        return Err(CodecError::Encode(
            "record must serialize to an object".to_string(),
        ));
    };

    let mut fields = FieldMap::new();
    for (name, value) in map {
        let raw = match value {
            JsonValue::Null => continue,
            JsonValue::String(s) => s,
            JsonValue::Number(n) => n.to_string(),
            JsonValue::Bool(b) => b.to_string(),
            nested @ (JsonValue::Array(_) | JsonValue::Object(_)) => {
                serde_json::to_string(&nested).map_err(|e| CodecError::Encode(e.to_string()))?
            }
        };
        fields.insert(name, raw);
    }
    Ok(fields)
}

/// Rebuild a typed record from a field map.
///
/// # Errors
///
/// Fails only when no record can be formed at all (e.g. a required field
/// such as `search_id` is missing or unparseable); individual malformed
/// nested fields degrade to strings instead of failing.
pub fn from_fields<T: DeserializeOwned>(fields: &FieldMap) -> Result<T, CodecError> {
    serde_json::from_value(fields_to_json(fields)).map_err(|e| CodecError::Decode(e.to_string()))
}

/// Tolerant dynamic view of a field map, used to mirror envelopes to
/// callers without committing to a record shape.
pub fn fields_to_json(fields: &FieldMap) -> JsonValue {
    let mut map = Map::new();
    for (name, raw) in fields {
        map.insert(name.clone(), normalize(raw));
    }
    JsonValue::Object(map)
}

fn normalize(raw: &str) -> JsonValue {
    if let Ok(n) = raw.parse::<i64>() {
        return JsonValue::Number(n.into());
    }
    if matches!(raw.as_bytes().first(), Some(b'[' | b'{')) {
        if let Ok(nested) = serde_json::from_str::<JsonValue>(raw) {
            if nested.is_array() || nested.is_object() {
                return nested;
            }
        }
    }
    JsonValue::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{SearchJob, SearchStatus, SearchUpdate, TraceCarrier};
    use farestream_core::{SearchId, SearchRequest};
    use proptest::prelude::*;

    fn request(from: &str, to: &str, date: &str, passengers: u32) -> SearchRequest {
        SearchRequest {
            from: from.to_string(),
            to: to.to_string(),
            date: date.to_string(),
            passengers,
        }
    }

    #[test]
    fn job_round_trips_including_zero_values() {
        let job = SearchJob::new(
            SearchId::new(),
            &request("CGK", "DPS", "2025-07-10", 0),
            None,
        );
        let decoded: SearchJob = from_fields(&to_fields(&job).unwrap()).unwrap();
        assert_eq!(decoded, job);
    }

    #[test]
    fn trace_carrier_round_trips_as_nested_object() {
        let mut carrier = TraceCarrier::new();
        carrier.insert(
            "traceparent".to_string(),
            "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01".to_string(),
        );
        let job = SearchJob::new(
            SearchId::new(),
            &request("CGK", "DPS", "2025-07-10", 2),
            Some(carrier.clone()),
        );

        let fields = to_fields(&job).unwrap();
        assert!(fields["trace_context"].starts_with('{'));

        let decoded: SearchJob = from_fields(&fields).unwrap();
        assert_eq!(decoded.trace_context, Some(carrier));
    }

    #[test]
    fn update_round_trips_with_results_payload() {
        let update = SearchUpdate::completed(
            SearchId::new(),
            serde_json::json!([{"id": "FL-1", "price": 950000}]),
            None,
        );
        let fields = to_fields(&update).unwrap();
        assert_eq!(fields["status"], "completed");
        assert!(fields["results"].starts_with('['));

        let decoded: SearchUpdate = from_fields(&fields).unwrap();
        assert_eq!(decoded, update);
    }

    #[test]
    fn absent_fields_decode_to_defaults() {
        let mut fields = FieldMap::new();
        fields.insert("search_id".to_string(), SearchId::new().to_string());
        fields.insert("status".to_string(), "processing".to_string());

        let decoded: SearchUpdate = from_fields(&fields).unwrap();
        assert_eq!(decoded.status, SearchStatus::Processing);
        assert_eq!(decoded.results, None);
        assert_eq!(decoded.total_results, None);

        let mut fields = FieldMap::new();
        fields.insert("search_id".to_string(), SearchId::new().to_string());
        fields.insert("from".to_string(), "CGK".to_string());
        let decoded: SearchJob = from_fields(&fields).unwrap();
        assert_eq!(decoded.passengers, 0);
        assert_eq!(decoded.to, "");
    }

    #[test]
    fn missing_search_id_is_a_decode_error() {
        let mut fields = FieldMap::new();
        fields.insert("status".to_string(), "processing".to_string());
        assert!(from_fields::<SearchUpdate>(&fields).is_err());
    }

    #[test]
    fn dynamic_view_normalizes_per_field() {
        let mut fields = FieldMap::new();
        fields.insert("total_results".to_string(), "7".to_string());
        fields.insert("date".to_string(), "2025-07-10".to_string());
        fields.insert("results".to_string(), "[{\"id\":\"FL-1\"}]".to_string());
        fields.insert("broken".to_string(), "{not json".to_string());

        let view = fields_to_json(&fields);
        assert_eq!(view["total_results"], serde_json::json!(7));
        assert_eq!(view["date"], serde_json::json!("2025-07-10"));
        assert_eq!(view["results"][0]["id"], serde_json::json!("FL-1"));
        assert_eq!(view["broken"], serde_json::json!("{not json"));
    }

    prop_compose! {
        fn airport_code()(code in "[A-Z]{3}") -> String { code }
    }

    proptest! {
        #[test]
        fn any_valid_job_round_trips(
            from in airport_code(),
            to in airport_code(),
            year in 2024u32..2030,
            month in 1u32..=12,
            day in 1u32..=28,
            passengers in 0u32..10_000,
        ) {
            let job = SearchJob::new(
                SearchId::new(),
                &request(&from, &to, &format!("{year:04}-{month:02}-{day:02}"), passengers),
                None,
            );
            let decoded: SearchJob = from_fields(&to_fields(&job).unwrap()).unwrap();
            prop_assert_eq!(decoded, job);
        }
    }
}
