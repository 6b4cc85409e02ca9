use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::domain::entity::{
    canonical_value, EntityType, FieldKind, NormalisedField, NormalisedNode, SectionType,
};
use crate::domain::guardrail::json_type_name;
use crate::errors::DomainError;

/// Converts a loosely-typed entity payload into normalised nodes.
///
/// Accepts a single entity record, a list of records, or a record
/// wrapping the list under `entities`/`nodes`. Every member must be
/// record-shaped and declare a recognized `entity_type`; anything else
/// is a malformed payload.
pub fn normalize_payload(payload: &Value) -> Result<Vec<NormalisedNode>, DomainError> {
    let records = entity_records(payload)?;
    let mut nodes = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        nodes.push(normalize_entity(index, record)?);
    }
    Ok(nodes)
}

fn entity_records(payload: &Value) -> Result<Vec<&Value>, DomainError> {
    match payload {
        Value::Array(items) => Ok(items.iter().collect()),
        Value::Object(record) => {
            for key in ["entities", "nodes"] {
                match record.get(key) {
                    Some(Value::Array(items)) => return Ok(items.iter().collect()),
                    Some(other) => {
                        return Err(DomainError::malformed(format!(
                            "payload {key} must be a list, got {}",
                            json_type_name(other)
                        )))
                    }
                    None => {}
                }
            }
            // A bare record is treated as a single-entity payload.
            Ok(vec![payload])
        }
        other => Err(DomainError::malformed(format!(
            "entity payload must be an object or a list, got {}",
            json_type_name(other)
        ))),
    }
}

fn normalize_entity(index: usize, record: &Value) -> Result<NormalisedNode, DomainError> {
    let record = record.as_object().ok_or_else(|| {
        DomainError::malformed(format!(
            "entity record at index {index} is not an object, got {}",
            json_type_name(record)
        ))
    })?;

    let entity_type = match record.get("entity_type").and_then(Value::as_str) {
        Some(raw) => EntityType::parse(raw).ok_or_else(|| {
            DomainError::malformed(format!(
                "entity record at index {index} has unrecognized entity_type {raw:?}"
            ))
        })?,
        None => {
            return Err(DomainError::malformed(format!(
                "entity record at index {index} is missing entity_type"
            )))
        }
    };

    Ok(NormalisedNode {
        entity_type,
        entity_id: identifier_string(record.get("entity_id")),
        name: plain_string(record.get("name")),
        anchor: plain_string(record.get("anchor")),
        status: plain_string(record.get("status")),
        sections: normalize_sections(record.get("sections")),
        metrics: object_or_empty(record.get("metrics")),
        guardrails: object_or_empty(record.get("guardrails")),
        metadata: object_or_empty(record.get("metadata")),
    })
}

fn normalize_sections(
    raw: Option<&Value>,
) -> BTreeMap<SectionType, BTreeMap<String, NormalisedField>> {
    let mut sections = BTreeMap::new();
    let Some(Value::Object(entries)) = raw else {
        return sections;
    };

    for (name, fields) in entries {
        // Unknown section names are dropped rather than rejected; the
        // diff only compares the four declared sections.
        let Some(section) = SectionType::parse(name) else {
            continue;
        };
        let Some(field_records) = fields.as_object() else {
            continue;
        };

        let mut normalised = BTreeMap::new();
        for (key, raw_field) in field_records {
            normalised.insert(key.clone(), normalize_field(section, key, raw_field));
        }
        sections.insert(section, normalised);
    }
    sections
}

fn normalize_field(section: SectionType, key: &str, raw: &Value) -> NormalisedField {
    let record = match raw.as_object() {
        Some(record) if record.contains_key("value") => Some(record),
        _ => None,
    };

    let value = record.map_or(raw, |record| &record["value"]);
    let declared_kind = record
        .and_then(|record| record.get("kind"))
        .and_then(Value::as_str)
        .and_then(FieldKind::parse);
    // Bare numbers default to numeric so deltas still appear for
    // payloads that skip the full field-record shape.
    let kind = declared_kind
        .unwrap_or_else(|| if value.is_number() { FieldKind::Numeric } else { FieldKind::Any });

    NormalisedField {
        key: key.to_string(),
        field_path: record
            .and_then(|record| plain_string(record.get("field_path")))
            .unwrap_or_else(|| format!("{}.{key}", section.as_str())),
        label: record
            .and_then(|record| plain_string(record.get("label")))
            .unwrap_or_else(|| key.to_string()),
        value: canonical_value(kind, value),
        kind,
        unit: record.and_then(|record| plain_string(record.get("unit"))),
        forecast_delta: record
            .and_then(|record| record.get("forecast_delta"))
            .and_then(crate::numeric::coerce_numeric),
        metadata: record.map_or_else(Map::new, |record| object_or_empty(record.get("metadata"))),
    }
}

fn plain_string(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(text)) if !text.is_empty() => Some(text.clone()),
        _ => None,
    }
}

fn identifier_string(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(text)) if !text.is_empty() => Some(text.clone()),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    }
}

fn object_or_empty(value: Option<&Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(entries)) => entries.clone(),
        _ => Map::new(),
    }
}
