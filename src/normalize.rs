//! Normalization of heterogeneous provider output into [`MaintenanceAiResult`].
//!
//! Two providers and several prompt-format iterations have used different key
//! names for the same concept, so every field is resolved through an ordered
//! alias chain (first present wins). The chains are declared as tables rather
//! than nested conditionals so they stay independently testable.
//!
//! Normalization is a pure transformation and never fails: malformed input
//! degrades to empty strings and empty lists, and every next-maintenance date
//! is floored to the caller-supplied minimum (conventionally one week from
//! now) when it is unparsable or in the past.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::interval::{parse_datetime, parse_interval_to_months, to_iso_string, to_task_list};
use crate::models::{MaintenanceAiResult, MaintenanceScheduleSpec, NextMaintenanceDates};

/// Aliases for the item name.
const NAME_ALIASES: &[&[&str]] = &[&["name"], &["Name"]];

/// Aliases for the next minor maintenance date.
const MINOR_DATE_ALIASES: &[&[&str]] = &[
    &["nextMaintenanceDates", "minor"],
    &["nextMinorServiceDate"],
    &["nextMinor"],
    &["nextMinorService"],
    &["nextMinorDate"],
];

/// Aliases for the next major maintenance date.
const MAJOR_DATE_ALIASES: &[&[&str]] = &[
    &["nextMaintenanceDates", "major"],
    &["nextMajorServiceDate"],
    &["nextMajor"],
    &["nextMajorService"],
    &["nextMajorDate"],
];

/// Aliases for the reasoning text.
const REASONING_ALIASES: &[&[&str]] = &[
    &["reasoning"],
    &["Reasoning"],
    &["Maintenance Schedule", "reasoning"],
    &["reason"],
];

/// Aliases for the schedule sub-object.
const SCHEDULE_ALIASES: &[&[&str]] = &[
    &["maintenanceSchedule"],
    &["maintenanceScheduleRecommendation"],
    &["Maintenance Schedule"],
    &["MaintenanceSchedule"],
];

/// Aliases for fields inside the schedule sub-object. The bare
/// `Minor`/`Major` keys come from an early prompt format that asked for the
/// cadence as a single word, so they feed the interval parser.
const MINOR_INTERVAL_ALIASES: &[&[&str]] = &[
    &["minorIntervalMonths"],
    &["MinorIntervalMonths"],
    &["minorInterval"],
    &["Minor"],
    &["minor"],
];

const MAJOR_INTERVAL_ALIASES: &[&[&str]] = &[
    &["majorIntervalMonths"],
    &["MajorIntervalMonths"],
    &["majorInterval"],
    &["Major"],
    &["major"],
];

const MINOR_TASKS_ALIASES: &[&[&str]] = &[
    &["minorTasks"],
    &["MinorTasks"],
    &["minorTaskList"],
    &["minor_tasks"],
];

const MAJOR_TASKS_ALIASES: &[&[&str]] = &[
    &["majorTasks"],
    &["MajorTasks"],
    &["majorTaskList"],
    &["major_tasks"],
];

/// Walk a key path into a JSON object.
pub(crate) fn lookup<'a>(raw: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = raw;
    for key in path {
        current = current.get(key)?;
    }
    Some(current)
}

/// Return the first alias whose value is present and non-null.
fn first_present<'a>(raw: &'a Value, aliases: &[&[&str]]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|path| lookup(raw, path))
        .find(|v| !v.is_null())
}

/// Return the first alias whose value is a string.
pub(crate) fn first_string(raw: &Value, aliases: &[&[&str]]) -> Option<String> {
    aliases
        .iter()
        .filter_map(|path| lookup(raw, path))
        .find_map(|v| v.as_str().map(String::from))
}

/// Floor a resolved date string against `min_date`.
///
/// Unparsable or past dates become exactly `min_date` in ISO form. Parseable
/// future dates keep their original text when already a full date-time, and
/// are canonicalized to a date-time when only a bare date was given.
fn floor_date(value: Option<&str>, min_date: DateTime<Utc>) -> String {
    if let Some(text) = value {
        if let Some(parsed) = parse_datetime(text) {
            if parsed >= min_date {
                if DateTime::parse_from_rfc3339(text).is_ok() {
                    return text.to_string();
                }
                return to_iso_string(parsed);
            }
        }
    }
    to_iso_string(min_date)
}

/// Map raw provider JSON (any historical key-name variant) into the
/// canonical [`MaintenanceAiResult`] shape.
///
/// `fallback_name` is used when the payload carries no name of its own;
/// `min_date` is the earliest acceptable next-maintenance date.
pub fn normalize_to_maintenance_ai_result(
    raw: &Value,
    fallback_name: &str,
    min_date: DateTime<Utc>,
) -> MaintenanceAiResult {
    let name = first_string(raw, NAME_ALIASES).unwrap_or_else(|| fallback_name.to_string());
    let reasoning = first_string(raw, REASONING_ALIASES).unwrap_or_default();

    let minor_raw = first_string(raw, MINOR_DATE_ALIASES);
    let major_raw = first_string(raw, MAJOR_DATE_ALIASES);
    let next_maintenance_dates = NextMaintenanceDates {
        minor: floor_date(minor_raw.as_deref(), min_date),
        major: floor_date(major_raw.as_deref(), min_date),
    };

    let schedule = first_present(raw, SCHEDULE_ALIASES).unwrap_or(&Value::Null);
    let maintenance_schedule = MaintenanceScheduleSpec {
        minor_interval_months: first_string(schedule, MINOR_INTERVAL_ALIASES)
            .map(|s| parse_interval_to_months(&s))
            .unwrap_or_default(),
        minor_tasks: first_present(schedule, MINOR_TASKS_ALIASES)
            .map(to_task_list)
            .unwrap_or_default(),
        major_interval_months: first_string(schedule, MAJOR_INTERVAL_ALIASES)
            .map(|s| parse_interval_to_months(&s))
            .unwrap_or_default(),
        major_tasks: first_present(schedule, MAJOR_TASKS_ALIASES)
            .map(to_task_list)
            .unwrap_or_default(),
    };

    MaintenanceAiResult {
        name,
        next_maintenance_dates,
        maintenance_schedule,
        reasoning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn floor() -> DateTime<Utc> {
        parse_datetime("2025-01-08T00:00:00.000Z").unwrap()
    }

    #[test]
    fn test_happy_path_keeps_canonical_shape() {
        let raw = json!({
            "name": "Boiler",
            "nextMaintenanceDates": {
                "minor": "2025-06-01T00:00:00.000Z",
                "major": "2026-06-01T00:00:00.000Z"
            },
            "maintenanceSchedule": {
                "minorIntervalMonths": "12",
                "minorTasks": ["Inspect"],
                "majorIntervalMonths": "60",
                "majorTasks": ["Overhaul"]
            },
            "reasoning": "Because."
        });
        let out = normalize_to_maintenance_ai_result(&raw, "fallback", floor());
        assert_eq!(out.name, "Boiler");
        assert_eq!(out.next_maintenance_dates.minor, "2025-06-01T00:00:00.000Z");
        assert_eq!(out.maintenance_schedule.minor_interval_months, "12");
        assert_eq!(out.maintenance_schedule.major_tasks, vec!["Overhaul"]);
        assert_eq!(out.reasoning, "Because.");
    }

    #[test]
    fn test_legacy_aliases_resolve() {
        let raw = json!({
            "Name": "Pump",
            "nextMinorServiceDate": "2025-06-01T00:00:00.000Z",
            "nextMajorDate": "2026-06-01T00:00:00.000Z",
            "Maintenance Schedule": {
                "Minor": "Annually",
                "Major": "5 years",
                "reasoning": "Legacy"
            }
        });
        let out = normalize_to_maintenance_ai_result(&raw, "fallback", floor());
        assert_eq!(out.name, "Pump");
        assert_eq!(out.next_maintenance_dates.minor, "2025-06-01T00:00:00.000Z");
        assert_eq!(out.next_maintenance_dates.major, "2026-06-01T00:00:00.000Z");
        assert_eq!(out.maintenance_schedule.minor_interval_months, "12");
        assert_eq!(out.maintenance_schedule.major_interval_months, "60");
        assert_eq!(out.reasoning, "Legacy");
    }

    #[test]
    fn test_fallback_name_and_empty_degradation() {
        let raw = json!({ "nextMinor": "2020-01-01T00:00:00.000Z" });
        let out = normalize_to_maintenance_ai_result(&raw, "HVAC", floor());
        assert_eq!(out.name, "HVAC");
        assert_eq!(out.reasoning, "");
        assert_eq!(out.maintenance_schedule.minor_interval_months, "");
        assert!(out.maintenance_schedule.minor_tasks.is_empty());
    }

    #[test]
    fn test_past_date_floored_exactly() {
        let raw = json!({ "nextMinorServiceDate": "2020-01-01T00:00:00.000Z" });
        let out = normalize_to_maintenance_ai_result(&raw, "HVAC", floor());
        assert_eq!(out.next_maintenance_dates.minor, to_iso_string(floor()));
        // major was never supplied, so it also lands on the floor
        assert_eq!(out.next_maintenance_dates.major, to_iso_string(floor()));
    }

    #[test]
    fn test_unparsable_date_floored() {
        let raw = json!({ "nextMinorServiceDate": "soon-ish" });
        let out = normalize_to_maintenance_ai_result(&raw, "HVAC", floor());
        assert_eq!(out.next_maintenance_dates.minor, to_iso_string(floor()));
    }

    #[test]
    fn test_bare_date_canonicalized_to_datetime() {
        let raw = json!({ "nextMinorServiceDate": "2025-06-01" });
        let out = normalize_to_maintenance_ai_result(&raw, "HVAC", floor());
        assert_eq!(out.next_maintenance_dates.minor, "2025-06-01T00:00:00.000Z");
    }

    #[test]
    fn test_string_task_lists_and_interval_words() {
        let raw = json!({
            "name": "Pump",
            "nextMaintenanceDates": {
                "minor": "2020-01-01T00:00:00.000Z",
                "major": "2020-01-01T00:00:00.000Z"
            },
            "maintenanceSchedule": {
                "minorIntervalMonths": "Annually",
                "minorTasks": "Inspect; Clean",
                "majorIntervalMonths": "5 years",
                "majorTasks": "Overhaul"
            },
            "reasoning": "Legacy"
        });
        let out = normalize_to_maintenance_ai_result(&raw, "Pump", floor());
        assert_eq!(out.maintenance_schedule.minor_tasks, vec!["Inspect", "Clean"]);
        assert_eq!(out.maintenance_schedule.minor_interval_months, "12");
        assert_eq!(out.maintenance_schedule.major_interval_months, "60");
        assert_eq!(out.next_maintenance_dates.minor, to_iso_string(floor()));
    }

    #[test]
    fn test_schedule_recommendation_alias() {
        let raw = json!({
            "maintenanceScheduleRecommendation": {
                "minorInterval": "3 months",
                "minorTasks": ["Rinse"]
            }
        });
        let out = normalize_to_maintenance_ai_result(&raw, "Filter", floor());
        assert_eq!(out.maintenance_schedule.minor_interval_months, "3");
        assert_eq!(out.maintenance_schedule.minor_tasks, vec!["Rinse"]);
    }
}
