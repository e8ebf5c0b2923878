//! Closed structural validation of a normalized AI result.
//!
//! The schema is closed at every level: exactly the required keys, no more.
//! The normalizer never emits stray keys by construction, so a closed check
//! is a safety net against silent schema drift rather than an expected
//! failure path. Validation never panics or returns `Err`; the outcome is a
//! report value the caller turns into a diagnostic.

use serde::Serialize;
use serde_json::Value;

/// A single structural complaint, with a JSON-pointer-ish path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

/// Outcome of validating one normalized result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

const TOP_LEVEL_KEYS: &[&str] = &[
    "name",
    "nextMaintenanceDates",
    "maintenanceSchedule",
    "reasoning",
];
const DATE_KEYS: &[&str] = &["minor", "major"];
const SCHEDULE_KEYS: &[&str] = &[
    "minorIntervalMonths",
    "minorTasks",
    "majorIntervalMonths",
    "majorTasks",
];

fn err(errors: &mut Vec<ValidationError>, path: &str, message: impl Into<String>) {
    errors.push(ValidationError {
        path: path.to_string(),
        message: message.into(),
    });
}

/// Require `value` at `path` to be an object with exactly `keys`.
fn check_closed_object<'a>(
    errors: &mut Vec<ValidationError>,
    value: Option<&'a Value>,
    path: &str,
    keys: &[&str],
) -> Option<&'a serde_json::Map<String, Value>> {
    let Some(obj) = value.and_then(Value::as_object) else {
        err(errors, path, "must be an object");
        return None;
    };
    for key in keys {
        if !obj.contains_key(*key) {
            err(errors, &format!("{path}/{key}"), "missing required field");
        }
    }
    for key in obj.keys() {
        if !keys.contains(&key.as_str()) {
            err(errors, &format!("{path}/{key}"), "unexpected field");
        }
    }
    Some(obj)
}

fn check_string(errors: &mut Vec<ValidationError>, obj: &serde_json::Map<String, Value>, path: &str, key: &str) {
    if let Some(v) = obj.get(key) {
        if !v.is_string() {
            err(errors, &format!("{path}/{key}"), "must be a string");
        }
    }
}

fn check_date_time(errors: &mut Vec<ValidationError>, obj: &serde_json::Map<String, Value>, path: &str, key: &str) {
    if let Some(v) = obj.get(key) {
        match v.as_str() {
            Some(s) if chrono::DateTime::parse_from_rfc3339(s).is_ok() => {}
            Some(_) => err(
                errors,
                &format!("{path}/{key}"),
                "must be an ISO-8601 date-time string",
            ),
            None => err(errors, &format!("{path}/{key}"), "must be a string"),
        }
    }
}

fn check_string_array(
    errors: &mut Vec<ValidationError>,
    obj: &serde_json::Map<String, Value>,
    path: &str,
    key: &str,
) {
    if let Some(v) = obj.get(key) {
        match v.as_array() {
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    if !item.is_string() {
                        err(errors, &format!("{path}/{key}/{i}"), "must be a string");
                    }
                }
            }
            None => err(errors, &format!("{path}/{key}"), "must be an array of strings"),
        }
    }
}

/// Validate a normalized result against the canonical contract.
pub fn validate_maintenance_ai_result(value: &Value) -> ValidationReport {
    let mut errors = Vec::new();

    if let Some(top) = check_closed_object(&mut errors, Some(value), "", TOP_LEVEL_KEYS) {
        check_string(&mut errors, top, "", "name");
        check_string(&mut errors, top, "", "reasoning");

        if let Some(dates) = check_closed_object(
            &mut errors,
            top.get("nextMaintenanceDates"),
            "/nextMaintenanceDates",
            DATE_KEYS,
        ) {
            check_date_time(&mut errors, dates, "/nextMaintenanceDates", "minor");
            check_date_time(&mut errors, dates, "/nextMaintenanceDates", "major");
        }

        if let Some(schedule) = check_closed_object(
            &mut errors,
            top.get("maintenanceSchedule"),
            "/maintenanceSchedule",
            SCHEDULE_KEYS,
        ) {
            check_string(&mut errors, schedule, "/maintenanceSchedule", "minorIntervalMonths");
            check_string(&mut errors, schedule, "/maintenanceSchedule", "majorIntervalMonths");
            check_string_array(&mut errors, schedule, "/maintenanceSchedule", "minorTasks");
            check_string_array(&mut errors, schedule, "/maintenanceSchedule", "majorTasks");
        }
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_result() -> Value {
        json!({
            "name": "Boiler",
            "nextMaintenanceDates": {
                "minor": "2025-06-01T00:00:00.000Z",
                "major": "2026-06-01T00:00:00.000Z"
            },
            "maintenanceSchedule": {
                "minorIntervalMonths": "12",
                "minorTasks": ["Inspect"],
                "majorIntervalMonths": "60",
                "majorTasks": []
            },
            "reasoning": "Because."
        })
    }

    #[test]
    fn test_accepts_canonical_result() {
        let report = validate_maintenance_ai_result(&valid_result());
        assert!(report.valid, "errors: {:?}", report.errors);
    }

    #[test]
    fn test_rejects_extra_top_level_key() {
        let mut v = valid_result();
        v["confidence"] = json!(0.9);
        let report = validate_maintenance_ai_result(&v);
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.path == "/confidence"));
    }

    #[test]
    fn test_rejects_non_datetime_minor() {
        let mut v = valid_result();
        v["nextMaintenanceDates"]["minor"] = json!("2025-06-01");
        let report = validate_maintenance_ai_result(&v);
        assert!(!report.valid);
        assert!(report
            .errors
            .iter()
            .any(|e| e.path == "/nextMaintenanceDates/minor"));
    }

    #[test]
    fn test_rejects_missing_schedule_field() {
        let mut v = valid_result();
        v["maintenanceSchedule"]
            .as_object_mut()
            .unwrap()
            .remove("majorTasks");
        let report = validate_maintenance_ai_result(&v);
        assert!(!report.valid);
    }

    #[test]
    fn test_rejects_non_string_task_entry() {
        let mut v = valid_result();
        v["maintenanceSchedule"]["minorTasks"] = json!(["ok", 3]);
        let report = validate_maintenance_ai_result(&v);
        assert!(!report.valid);
        assert!(report
            .errors
            .iter()
            .any(|e| e.path == "/maintenanceSchedule/minorTasks/1"));
    }

    #[test]
    fn test_rejects_non_object() {
        let report = validate_maintenance_ai_result(&json!("nope"));
        assert!(!report.valid);
    }

    #[test]
    fn test_free_form_interval_string_is_allowed() {
        // The schema only requires `string` here; intervals the parser does
        // not recognize stay free-form.
        let mut v = valid_result();
        v["maintenanceSchedule"]["minorIntervalMonths"] = json!("as needed");
        assert!(validate_maintenance_ai_result(&v).valid);
    }
}
