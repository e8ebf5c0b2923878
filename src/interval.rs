//! Loose interval-word and date parsing.
//!
//! Providers describe maintenance cadence in many ways ("Annually",
//! "every 3 months", "5 years", or a bare "12"). This module coerces the
//! recognized phrasings into a canonical months count and splits free-form
//! task lists into vectors. The policy throughout is best-effort coercion,
//! never an error: unrecognized input passes through unchanged and the
//! validator only requires the field to be a string.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::Value;

/// Coerce an interval phrase into a months count, as a string.
///
/// Recognized forms, in order:
/// - a bare integer ("7" → "7")
/// - anything mentioning "quarter" → "3"
/// - "annual"/"annually" → "12"
/// - "monthly" → "1"
/// - "N year(s)" → N × 12
/// - "N month(s)" → N
///
/// Everything else is returned unchanged.
pub fn parse_interval_to_months(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.parse::<i64>().is_ok() {
        return trimmed.to_string();
    }
    let lower = trimmed.to_lowercase();
    if lower.contains("quarter") {
        return "3".to_string();
    }
    if lower.contains("annual") {
        return "12".to_string();
    }
    if lower.contains("monthly") {
        return "1".to_string();
    }
    if let Some(n) = number_before_unit(&lower, "year") {
        return (n * 12).to_string();
    }
    if let Some(n) = number_before_unit(&lower, "month") {
        return n.to_string();
    }
    input.to_string()
}

/// Find a number immediately followed by a unit word ("3 months" → 3).
fn number_before_unit(lower: &str, unit: &str) -> Option<i64> {
    let tokens: Vec<&str> = lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    tokens.windows(2).find_map(|pair| {
        if pair[1].starts_with(unit) {
            pair[0].parse::<i64>().ok()
        } else {
            None
        }
    })
}

/// Coerce a raw task-list value into a list of strings.
///
/// Arrays are kept element-wise (non-string elements are stringified);
/// a single string is split on newlines, semicolons, and commas;
/// null/absent becomes an empty list.
pub fn to_task_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Value::String(s) => s
            .split(['\n', ';', ','])
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}

/// Parse a date-ish string: full RFC 3339 first, then a bare `YYYY-MM-DD`
/// (interpreted as midnight UTC).
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
}

/// Format a timestamp the way `Date.prototype.toISOString` does
/// (`2024-01-01T00:00:00.000Z`), which is the form historical documents use.
pub fn to_iso_string(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_interval_words() {
        assert_eq!(parse_interval_to_months("Annually"), "12");
        assert_eq!(parse_interval_to_months("annual"), "12");
        assert_eq!(parse_interval_to_months("Monthly"), "1");
        assert_eq!(parse_interval_to_months("Quarterly-ish 3 months"), "3");
        assert_eq!(parse_interval_to_months("5 years"), "60");
        assert_eq!(parse_interval_to_months("every 6 months"), "6");
    }

    #[test]
    fn test_interval_bare_integer_passthrough() {
        assert_eq!(parse_interval_to_months("7"), "7");
        assert_eq!(parse_interval_to_months(" 12 "), "12");
    }

    #[test]
    fn test_interval_unrecognized_passthrough() {
        assert_eq!(parse_interval_to_months("gibberish"), "gibberish");
        assert_eq!(parse_interval_to_months("as needed"), "as needed");
    }

    #[test]
    fn test_task_list_array() {
        assert_eq!(to_task_list(&json!(["a", "b"])), vec!["a", "b"]);
    }

    #[test]
    fn test_task_list_array_coerces_non_strings() {
        assert_eq!(to_task_list(&json!(["a", 2])), vec!["a", "2"]);
    }

    #[test]
    fn test_task_list_split_string() {
        assert_eq!(to_task_list(&json!("a; b, c")), vec!["a", "b", "c"]);
        assert_eq!(to_task_list(&json!("one\ntwo")), vec!["one", "two"]);
    }

    #[test]
    fn test_task_list_null() {
        assert_eq!(to_task_list(&Value::Null), Vec::<String>::new());
    }

    #[test]
    fn test_parse_datetime_forms() {
        assert!(parse_datetime("2024-06-01T12:00:00.000Z").is_some());
        assert!(parse_datetime("2024-06-01").is_some());
        assert!(parse_datetime("next Tuesday").is_none());
    }

    #[test]
    fn test_iso_string_shape() {
        let dt = parse_datetime("2024-06-01T12:00:00.000Z").unwrap();
        assert_eq!(to_iso_string(dt), "2024-06-01T12:00:00.000Z");
    }
}
