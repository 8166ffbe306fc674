//! Result aggregation
//!
//! Turns the raw hits of a merged search into normalized items and a summary
//! report: per-category counts with endpoint breakdown, type and status
//! histograms, and the filing date range.
//!
//! Every call recomputes the report from scratch. Missing or malformed item
//! fields resolve to placeholder labels; nothing in here fails.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::catalog::Category;
use crate::config::DEFAULT_RECENT_EVENTS;
use crate::envelope::RawItem;
use crate::types::{EndpointError, MergedSearchResult, RawSearchResult};

pub const UNSPECIFIED_TYPE: &str = "Unspecified";
pub const UNSPECIFIED_SUBJECT: &str = "Unspecified subject";
pub const STATUS_IN_PROGRESS: &str = "In progress";
pub const STATUS_UNAVAILABLE: &str = "Status unavailable";
pub const NOT_AVAILABLE: &str = "N/A";

// =============================================================================
// Report types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Party {
    pub role: String,
    pub name: String,
    pub document: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessEvent {
    pub date: String,
    pub description: String,
}

/// Uniformly shaped record extracted from one raw item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedItem {
    pub process_number: String,
    pub registry_id: String,
    pub registry: String,
    pub category: Category,
    pub effective_date: Option<NaiveDate>,
    pub type_label: String,
    pub status_label: String,
    pub subject: String,
    pub parties: Vec<Party>,
    pub recent_events: Vec<ProcessEvent>,
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DateRange {
    pub earliest: Option<NaiveDate>,
    pub latest: Option<NaiveDate>,
}

impl DateRange {
    fn include(&mut self, date: NaiveDate) {
        if self.earliest.map_or(true, |e| date < e) {
            self.earliest = Some(date);
        }
        if self.latest.map_or(true, |l| date > l) {
            self.latest = Some(date);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointContribution {
    pub endpoint_id: String,
    pub endpoint_name: String,
    pub category: Category,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category: Category,
    pub count: u64,
    /// Only endpoints that contributed at least one hit
    pub endpoints: Vec<EndpointContribution>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramEntry {
    pub label: String,
    pub count: u64,
}

/// Normalized, analyzable view of one search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryReport {
    pub total_items: u64,
    pub endpoints_with_items: usize,
    pub endpoints_attempted: usize,
    pub endpoints_succeeded: usize,
    pub date_range: DateRange,
    pub by_category: Vec<CategorySummary>,
    pub by_endpoint: Vec<EndpointContribution>,
    /// Descending by count, ties in first-seen order
    pub type_histogram: Vec<HistogramEntry>,
    /// Descending by count, ties in first-seen order
    pub status_histogram: Vec<HistogramEntry>,
    pub errors: Vec<EndpointError>,
    pub items: Vec<NormalizedItem>,
}

impl SummaryReport {
    pub fn category(&self, category: Category) -> Option<&CategorySummary> {
        self.by_category.iter().find(|c| c.category == category)
    }
}

// =============================================================================
// Aggregator
// =============================================================================

#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    recent_events: usize,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(DEFAULT_RECENT_EVENTS)
    }
}

impl Aggregator {
    pub fn new(recent_events: usize) -> Self {
        Self { recent_events }
    }

    pub fn aggregate(&self, merged: &MergedSearchResult) -> SummaryReport {
        let mut by_category: Vec<CategorySummary> = Vec::new();
        let mut by_endpoint = Vec::new();
        let mut types = Histogram::default();
        let mut statuses = Histogram::default();
        let mut date_range = DateRange::default();
        let mut items = Vec::new();

        for result in merged.results.iter().filter(|r| r.is_success()) {
            let contribution = EndpointContribution {
                endpoint_id: result.endpoint_id.clone(),
                endpoint_name: result.endpoint_name.clone(),
                category: result.category,
                count: result.total,
            };

            let summary = match by_category
                .iter()
                .position(|c| c.category == result.category)
            {
                Some(index) => &mut by_category[index],
                None => {
                    by_category.push(CategorySummary {
                        category: result.category,
                        count: 0,
                        endpoints: Vec::new(),
                    });
                    let last = by_category.len() - 1;
                    &mut by_category[last]
                }
            };
            summary.count += result.total;
            if result.total > 0 {
                summary.endpoints.push(contribution.clone());
                by_endpoint.push(contribution);
            }

            for raw in &result.items {
                let item = self.normalize_item(raw, result);
                types.add(&item.type_label);
                statuses.add(&item.status_label);
                if let Some(date) = item.effective_date {
                    date_range.include(date);
                }
                items.push(item);
            }
        }

        SummaryReport {
            total_items: items.len() as u64,
            endpoints_with_items: by_endpoint.len(),
            endpoints_attempted: merged.endpoints_attempted,
            endpoints_succeeded: merged.endpoints_succeeded,
            date_range,
            by_category,
            by_endpoint,
            type_histogram: types.into_sorted(),
            status_histogram: statuses.into_sorted(),
            errors: merged.errors.clone(),
            items,
        }
    }

    /// Extract the normalized view of one raw item
    ///
    /// Category always comes from the endpoint, never from the item.
    pub fn normalize_item(&self, raw: &RawItem, result: &RawSearchResult) -> NormalizedItem {
        let fields = &raw.fields;
        let basic = fields.get("dadosBasicos").and_then(Value::as_object);

        let process_number = lookup(fields, basic, "numeroProcesso")
            .and_then(non_empty_str)
            .map(str::to_string)
            .unwrap_or_else(|| raw.id.clone());

        let history = events(fields);

        NormalizedItem {
            process_number,
            registry_id: result.endpoint_id.clone(),
            registry: result.endpoint_name.clone(),
            category: result.category,
            effective_date: effective_date(fields, basic),
            type_label: type_label(fields, basic),
            status_label: status_label(history),
            subject: subject(fields, basic),
            parties: parties(basic),
            recent_events: recent_events(history, self.recent_events),
            score: raw.score.unwrap_or(0.0),
        }
    }
}

// =============================================================================
// Field extraction
// =============================================================================

/// Look a key up under `dadosBasicos` first, then at the top level
fn lookup<'a>(
    fields: &'a Map<String, Value>,
    basic: Option<&'a Map<String, Value>>,
    key: &str,
) -> Option<&'a Value> {
    basic
        .and_then(|b| b.get(key))
        .or_else(|| fields.get(key))
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

fn name_of(value: &Value) -> Option<&str> {
    value.get("nome").and_then(non_empty_str)
}

fn topics<'a>(
    fields: &'a Map<String, Value>,
    basic: Option<&'a Map<String, Value>>,
) -> Vec<&'a str> {
    ["assunto", "assuntos"]
        .iter()
        .find_map(|key| lookup(fields, basic, key).and_then(Value::as_array))
        .map(|list| list.iter().filter_map(name_of).collect())
        .unwrap_or_default()
}

fn type_label(fields: &Map<String, Value>, basic: Option<&Map<String, Value>>) -> String {
    topics(fields, basic)
        .first()
        .copied()
        .or_else(|| lookup(fields, basic, "classe").and_then(name_of))
        .unwrap_or(UNSPECIFIED_TYPE)
        .to_string()
}

fn subject(fields: &Map<String, Value>, basic: Option<&Map<String, Value>>) -> String {
    let names = topics(fields, basic);
    if names.is_empty() {
        UNSPECIFIED_SUBJECT.to_string()
    } else {
        names.join("; ")
    }
}

fn events(fields: &Map<String, Value>) -> &[Value] {
    ["movimentosNacionais", "movimentos"]
        .iter()
        .find_map(|key| fields.get(*key).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn status_label(events: &[Value]) -> String {
    match events.last() {
        None => STATUS_UNAVAILABLE.to_string(),
        Some(last) => name_of(last).unwrap_or(STATUS_IN_PROGRESS).to_string(),
    }
}

fn recent_events(events: &[Value], n: usize) -> Vec<ProcessEvent> {
    let start = events.len().saturating_sub(n);
    events[start..]
        .iter()
        .map(|event| ProcessEvent {
            date: event
                .get("dataHora")
                .and_then(non_empty_str)
                .unwrap_or(NOT_AVAILABLE)
                .to_string(),
            description: name_of(event).unwrap_or(NOT_AVAILABLE).to_string(),
        })
        .collect()
}

fn parties(basic: Option<&Map<String, Value>>) -> Vec<Party> {
    let Some(list) = basic.and_then(|b| b.get("polo")).and_then(Value::as_array) else {
        return Vec::new();
    };
    list.iter()
        .map(|entry| {
            let person = entry.get("pessoa");
            let text = |value: Option<&Value>| {
                value
                    .and_then(non_empty_str)
                    .unwrap_or(NOT_AVAILABLE)
                    .to_string()
            };
            Party {
                role: text(entry.get("polo")),
                name: text(person.and_then(|p| p.get("nome"))),
                document: text(person.and_then(|p| p.get("documento"))),
            }
        })
        .collect()
}

fn effective_date(
    fields: &Map<String, Value>,
    basic: Option<&Map<String, Value>>,
) -> Option<NaiveDate> {
    ["dataDistribuicao", "dataAjuizamento"]
        .iter()
        .find_map(|key| lookup(fields, basic, key).and_then(non_empty_str))
        .and_then(parse_date)
}

/// Parse the date formats registries are known to emit
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.date());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }

    // Compact YYYYMMDD[HHMMSS]
    if (raw.len() == 8 || raw.len() == 14) && raw.chars().all(|c| c.is_ascii_digit()) {
        let year = raw[0..4].parse().ok()?;
        let month = raw[4..6].parse().ok()?;
        let day = raw[6..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    None
}

// =============================================================================
// Histogram
// =============================================================================

/// Exact-string counter that remembers first-seen order
#[derive(Debug, Default)]
struct Histogram {
    entries: Vec<HistogramEntry>,
    index: HashMap<String, usize>,
}

impl Histogram {
    fn add(&mut self, label: &str) {
        match self.index.get(label) {
            Some(&i) => self.entries[i].count += 1,
            None => {
                self.index.insert(label.to_string(), self.entries.len());
                self.entries.push(HistogramEntry {
                    label: label.to_string(),
                    count: 1,
                });
            }
        }
    }

    fn into_sorted(mut self) -> Vec<HistogramEntry> {
        // Stable: equal counts keep insertion order
        self.entries.sort_by(|a, b| b.count.cmp(&a.count));
        self.entries
    }
}
