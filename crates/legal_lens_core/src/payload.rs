//! Validation of the JSON returned by the external analysis service.
//!
//! The service is a black box, so every field is read defensively: missing or
//! mistyped fields become empty values, malformed collection entries are skipped.

use crate::domain::{AnalysisPayload, CategoryEntry, FindingEntry, RiskLevel};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

impl AnalysisPayload {
    pub fn from_json(value: &Value) -> Self {
        let empty = Map::new();
        let obj = value.as_object().unwrap_or(&empty);

        Self {
            summary: string_field(obj, "full_summary"),
            risk_score: match obj.get("risk_score") {
                Some(Value::Number(n)) => n.to_string(),
                Some(Value::String(s)) => s.clone(),
                _ => String::new(),
            },
            categories: obj
                .get("categories")
                .and_then(Value::as_object)
                .map(parse_categories)
                .unwrap_or_default(),
            findings: obj
                .get("key_findings")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(parse_finding).collect())
                .unwrap_or_default(),
            questions: string_list(obj.get("legal_questions")),
        }
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_categories(raw: &Map<String, Value>) -> BTreeMap<String, CategoryEntry> {
    raw.iter()
        .filter_map(|(name, entry)| {
            let entry = entry.as_object()?;
            Some((
                name.clone(),
                CategoryEntry {
                    risk_level: string_field(entry, "risk_level"),
                    points: string_list(entry.get("points")),
                },
            ))
        })
        .collect()
}

fn parse_finding(raw: &Value) -> Option<FindingEntry> {
    let entry = raw.as_object()?;
    let title = string_field(entry, "title");
    let description = string_field(entry, "description");
    if title.is_empty() && description.is_empty() {
        return None;
    }
    Some(FindingEntry {
        title,
        description,
        risk_level: RiskLevel::normalize(&string_field(entry, "risk_level")),
        icon: string_field(entry, "icon"),
        section: string_field(entry, "section"),
    })
}
