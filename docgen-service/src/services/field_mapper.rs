//! Maps template fields onto tender columns by word-set similarity.

use crate::dtos::TemplateField;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Jaccard similarity of the lower-cased, whitespace-separated word sets.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let set_a: HashSet<&str> = a.split_whitespace().collect();
    let set_b: HashSet<&str> = b.split_whitespace().collect();

    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 0.0;
    }
    set_a.intersection(&set_b).count() as f64 / union as f64
}

/// Candidate with the highest similarity at or above `threshold`.
///
/// Ties keep the earliest candidate.
pub fn best_match<'a, I>(query: &str, candidates: I, threshold: f64) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&'a str, f64)> = None;
    for candidate in candidates {
        let score = jaccard_similarity(query, candidate);
        if score < threshold || score <= 0.0 {
            continue;
        }
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((candidate, score));
        }
    }
    best.map(|(candidate, _)| candidate)
}

/// Value for every template field id; `""` when no tender column matches.
pub fn map_fields(
    fields: &[TemplateField],
    tender: &Map<String, Value>,
    threshold: f64,
) -> BTreeMap<String, String> {
    let mut mapped = BTreeMap::new();

    for field in fields {
        let label = if field.label.trim().is_empty() {
            field.id.as_str()
        } else {
            field.label.as_str()
        };

        match best_match(label, tender.keys().map(String::as_str), threshold) {
            Some(column) => {
                tracing::info!(label = %label, column = %column, "Mapped template field");
                let value = tender.get(column).map(value_to_text).unwrap_or_default();
                mapped.insert(field.id.clone(), value);
            }
            None => {
                tracing::warn!(label = %label, "No good match for template field");
                mapped.insert(field.id.clone(), String::new());
            }
        }
    }

    mapped
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
