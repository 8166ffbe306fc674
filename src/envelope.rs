//! Response normalizers
//!
//! Each registry family wraps its hits differently. One normalizer per known
//! envelope shape turns the response body into a uniform `{total, items}`
//! pair; the endpoint descriptor picks which one applies.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::catalog::EnvelopeShape;
use crate::error::TransportError;

/// One unprocessed hit, source fields preserved opaquely
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub fields: Map<String, Value>,
}

/// Uniform result of normalizing one response body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedEnvelope {
    pub total: u64,
    pub items: Vec<RawItem>,
}

pub trait ResponseNormalizer: Send + Sync {
    /// `fallback_prefix` is used to mint ids for records that carry none
    fn normalize(
        &self,
        body: &Value,
        fallback_prefix: &str,
    ) -> Result<NormalizedEnvelope, TransportError>;
}

/// Normalizer for the given envelope shape
pub fn normalizer_for(shape: EnvelopeShape) -> &'static dyn ResponseNormalizer {
    match shape {
        EnvelopeShape::SearchHits => &SearchHitsNormalizer,
        EnvelopeShape::ProcessList => &ProcessListNormalizer,
        EnvelopeShape::Array => &ArrayNormalizer,
    }
}

// =============================================================================
// Elasticsearch-style hits
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct SearchHitsNormalizer;

impl ResponseNormalizer for SearchHitsNormalizer {
    fn normalize(
        &self,
        body: &Value,
        fallback_prefix: &str,
    ) -> Result<NormalizedEnvelope, TransportError> {
        let hits = body
            .get("hits")
            .ok_or_else(|| TransportError::Malformed("missing 'hits' object".to_string()))?;

        let declared = match hits.get("total") {
            Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
            Some(total) => total.get("value").and_then(Value::as_u64).unwrap_or(0),
            None => 0,
        };

        let records: &[Value] = match hits.get("hits") {
            Some(Value::Array(records)) => records.as_slice(),
            Some(_) => {
                return Err(TransportError::Malformed(
                    "'hits.hits' is not an array".to_string(),
                ))
            }
            None => &[],
        };

        let items: Vec<RawItem> = records
            .iter()
            .enumerate()
            .map(|(index, hit)| {
                let fields = match hit.get("_source") {
                    Some(Value::Object(source)) => source.clone(),
                    _ => Map::new(),
                };
                let id = hit
                    .get("_id")
                    .and_then(id_string)
                    .or_else(|| record_id(&fields))
                    .unwrap_or_else(|| format!("{fallback_prefix}-{index}"));
                RawItem {
                    id,
                    score: hit.get("_score").and_then(Value::as_f64),
                    fields,
                }
            })
            .collect();

        Ok(NormalizedEnvelope {
            total: declared.max(items.len() as u64),
            items,
        })
    }
}

// =============================================================================
// Process list (authenticated court systems)
// =============================================================================

const LIST_KEYS: [&str; 3] = ["processos", "items", "data"];
const TOTAL_KEYS: [&str; 2] = ["total", "totalRegistros"];

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessListNormalizer;

impl ResponseNormalizer for ProcessListNormalizer {
    fn normalize(
        &self,
        body: &Value,
        fallback_prefix: &str,
    ) -> Result<NormalizedEnvelope, TransportError> {
        let object = body
            .as_object()
            .ok_or_else(|| TransportError::Malformed("expected a JSON object".to_string()))?;

        let records = LIST_KEYS
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_array))
            .ok_or_else(|| {
                TransportError::Malformed("no process list in response".to_string())
            })?;

        let declared = TOTAL_KEYS
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_u64))
            .unwrap_or(0);

        let items = records_to_items(records, fallback_prefix);
        Ok(NormalizedEnvelope {
            total: declared.max(items.len() as u64),
            items,
        })
    }
}

// =============================================================================
// Bare array
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayNormalizer;

impl ResponseNormalizer for ArrayNormalizer {
    fn normalize(
        &self,
        body: &Value,
        fallback_prefix: &str,
    ) -> Result<NormalizedEnvelope, TransportError> {
        let records = body
            .as_array()
            .ok_or_else(|| TransportError::Malformed("expected a JSON array".to_string()))?;
        let items = records_to_items(records, fallback_prefix);
        Ok(NormalizedEnvelope {
            total: items.len() as u64,
            items,
        })
    }
}

fn records_to_items(records: &[Value], fallback_prefix: &str) -> Vec<RawItem> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let fields = match record {
                Value::Object(map) => map.clone(),
                other => {
                    let mut map = Map::new();
                    map.insert("value".to_string(), other.clone());
                    map
                }
            };
            RawItem {
                id: record_id(&fields).unwrap_or_else(|| format!("{fallback_prefix}-{index}")),
                score: fields.get("score").and_then(Value::as_f64),
                fields,
            }
        })
        .collect()
}

fn record_id(fields: &Map<String, Value>) -> Option<String> {
    fields
        .get("id")
        .and_then(id_string)
        .or_else(|| fields.get("numeroProcesso").and_then(id_string))
        .or_else(|| {
            fields
                .get("dadosBasicos")
                .and_then(|d| d.get("numeroProcesso"))
                .and_then(id_string)
        })
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
