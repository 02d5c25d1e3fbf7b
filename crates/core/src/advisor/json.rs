use crate::domain::analysis::{Anomaly, Recommendation};
use crate::domain::contract::{AdvisorAnomalyEntry, AdvisorRecommendationEntry};
use serde_json::Value;

/// Pulls a JSON array out of free-form model output: strips Markdown fences,
/// otherwise takes the first '[' to the last ']'.
pub fn extract_json_array(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        let mut inner = trimmed;
        if let Some(after_first) = inner.splitn(2, '\n').nth(1) {
            inner = after_first;
        }
        if let Some(end) = inner.rfind("```") {
            inner = &inner[..end];
        }
        return Some(inner.trim().to_string());
    }

    let start = trimmed.find('[')?;
    let end = trimmed.rfind(']')?;
    if end <= start {
        return None;
    }
    Some(trimmed[start..=end].trim().to_string())
}

fn parse_array(text: &str, what: &'static str) -> Option<Vec<Value>> {
    let json_str = extract_json_array(text).unwrap_or_else(|| text.trim().to_string());
    match serde_json::from_str::<Value>(&json_str) {
        Ok(Value::Array(entries)) => Some(entries),
        Ok(other) => {
            tracing::warn!(
                what,
                got = other.to_string(),
                "advisor output is valid JSON but not an array; discarding"
            );
            None
        }
        Err(err) => {
            tracing::warn!(what, error = %err, "advisor output is not valid JSON; discarding");
            None
        }
    }
}

/// Parses anomalies out of the model's text. Entries failing schema
/// validation are dropped individually; a wholly unparseable payload yields
/// an empty list, never an error.
pub fn parse_anomalies(text: &str) -> Vec<Anomaly> {
    let Some(entries) = parse_array(text, "anomalies") else {
        return Vec::new();
    };

    let mut out = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<AdvisorAnomalyEntry>(entry)
            .map_err(anyhow::Error::from)
            .and_then(AdvisorAnomalyEntry::validate_into_anomaly)
        {
            Ok(anomaly) => out.push(anomaly),
            Err(err) => {
                tracing::warn!(index, error = %err, "discarding invalid anomaly entry");
            }
        }
    }
    out
}

pub fn parse_recommendations(text: &str) -> Vec<Recommendation> {
    let Some(entries) = parse_array(text, "recommendations") else {
        return Vec::new();
    };

    let mut out = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<AdvisorRecommendationEntry>(entry)
            .map_err(anyhow::Error::from)
            .and_then(AdvisorRecommendationEntry::validate_into_recommendation)
        {
            Ok(recommendation) => out.push(recommendation),
            Err(err) => {
                tracing::warn!(index, error = %err, "discarding invalid recommendation entry");
            }
        }
    }
    out
}
