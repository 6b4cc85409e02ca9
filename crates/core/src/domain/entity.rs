use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::numeric::coerce_numeric;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Campaign,
    AdSet,
    Ad,
    Creative,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Campaign => "campaign",
            Self::AdSet => "ad_set",
            Self::Ad => "ad",
            Self::Creative => "creative",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "campaign" => Some(Self::Campaign),
            "ad_set" => Some(Self::AdSet),
            "ad" => Some(Self::Ad),
            "creative" => Some(Self::Creative),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Spend,
    Audience,
    Creative,
    Delivery,
}

impl SectionType {
    /// Walk order for every section union; diff artifacts depend on it
    /// being fixed.
    pub const ALL: [SectionType; 4] =
        [Self::Spend, Self::Audience, Self::Creative, Self::Delivery];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spend => "spend",
            Self::Audience => "audience",
            Self::Creative => "creative",
            Self::Delivery => "delivery",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "spend" => Some(Self::Spend),
            "audience" => Some(Self::Audience),
            "creative" => Some(Self::Creative),
            "delivery" => Some(Self::Delivery),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[default]
    Any,
    Numeric,
    Categorical,
    Set,
    Mapping,
    Sequence,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Numeric => "numeric",
            Self::Categorical => "categorical",
            Self::Set => "set",
            Self::Mapping => "mapping",
            Self::Sequence => "sequence",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "any" => Some(Self::Any),
            "numeric" => Some(Self::Numeric),
            "categorical" => Some(Self::Categorical),
            "set" => Some(Self::Set),
            "mapping" => Some(Self::Mapping),
            "sequence" => Some(Self::Sequence),
            _ => None,
        }
    }
}

/// One comparable leaf of a normalised entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalisedField {
    pub key: String,
    pub field_path: String,
    pub label: String,
    pub value: Value,
    pub kind: FieldKind,
    pub unit: Option<String>,
    pub forecast_delta: Option<f64>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl NormalisedField {
    /// Canonical comparison value. Deterministic and idempotent: sets
    /// become sorted deduplicated string lists, mapping keys are sorted,
    /// sequences are materialized as lists, numerics collapse int/string
    /// spellings of the same number.
    pub fn normalised_value(&self) -> Value {
        canonical_value(self.kind, &self.value)
    }

    /// Numeric reading used for delta computation. Only numeric-kind
    /// fields ever produce one.
    pub fn numeric_value(&self) -> Option<f64> {
        match self.kind {
            FieldKind::Numeric => coerce_numeric(&self.value),
            _ => None,
        }
    }

    pub fn is_usd(&self) -> bool {
        self.unit.as_deref().is_some_and(|unit| unit.eq_ignore_ascii_case("usd"))
    }
}

pub fn canonical_value(kind: FieldKind, value: &Value) -> Value {
    match kind {
        FieldKind::Numeric => match coerce_numeric(value) {
            Some(number) => serde_json::Number::from_f64(number)
                .map(Value::Number)
                .unwrap_or_else(|| value.clone()),
            None => value.clone(),
        },
        FieldKind::Set => Value::Array(canonical_set_members(value)),
        FieldKind::Mapping => canonical_mapping(value),
        FieldKind::Sequence => match value {
            Value::Array(items) => Value::Array(items.clone()),
            Value::Null => Value::Array(Vec::new()),
            other => Value::Array(vec![other.clone()]),
        },
        FieldKind::Any | FieldKind::Categorical => value.clone(),
    }
}

fn canonical_set_members(value: &Value) -> Vec<Value> {
    let raw: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    };

    let mut members: Vec<String> = raw
        .into_iter()
        .filter_map(|member| match member {
            Value::Null => None,
            Value::String(text) if text.is_empty() => None,
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            other => Some(other.to_string()),
        })
        .collect();
    members.sort();
    members.dedup();
    members.into_iter().map(Value::String).collect()
}

fn canonical_mapping(value: &Value) -> Value {
    match value {
        Value::Object(entries) => {
            // serde_json maps iterate key-sorted; rebuilding recursively
            // canonicalizes nested objects as well.
            let mut sorted = Map::new();
            for (key, nested) in entries {
                let nested = match nested {
                    Value::Object(_) => canonical_mapping(nested),
                    other => other.clone(),
                };
                sorted.insert(key.clone(), nested);
            }
            Value::Object(sorted)
        }
        other => other.clone(),
    }
}

/// One normalised entity: sections of comparable fields plus the raw
/// metric/guardrail/metadata bags carried through for reporting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalisedNode {
    pub entity_type: EntityType,
    pub entity_id: Option<String>,
    pub name: Option<String>,
    pub anchor: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub sections: BTreeMap<SectionType, BTreeMap<String, NormalisedField>>,
    #[serde(default)]
    pub metrics: Map<String, Value>,
    #[serde(default)]
    pub guardrails: Map<String, Value>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl NormalisedNode {
    /// Stable identity used to match baseline entities to proposed ones.
    /// Priority order: anchor, entity_id, metadata external_id, metadata
    /// reference, name, then a positional synthetic key so anonymous
    /// nodes never collide.
    pub fn identity_key(&self, position: usize) -> String {
        let tail = self
            .anchor
            .clone()
            .or_else(|| self.entity_id.clone())
            .or_else(|| metadata_string(&self.metadata, "external_id"))
            .or_else(|| metadata_string(&self.metadata, "reference"))
            .or_else(|| self.name.clone())
            .unwrap_or_else(|| format!("#{position}"));
        format!("{}:{}", self.entity_type.as_str(), tail)
    }

    /// Ad platform this entity belongs to, read from metadata.
    pub fn platform(&self) -> Option<String> {
        metadata_string(&self.metadata, "platform")
            .or_else(|| metadata_string(&self.metadata, "channel"))
            .or_else(|| metadata_string(&self.metadata, "provider"))
    }

    pub fn section(&self, section: SectionType) -> Option<&BTreeMap<String, NormalisedField>> {
        self.sections.get(&section)
    }
}

fn metadata_string(metadata: &Map<String, Value>, key: &str) -> Option<String> {
    match metadata.get(key) {
        Some(Value::String(text)) if !text.is_empty() => Some(text.clone()),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    }
}
