//! Core data models used throughout SimpleHome.
//!
//! Field names serialize in camelCase so the on-disk document and the
//! canonical AI result stay byte-compatible with historical exports.

use serde::{Deserialize, Serialize};

/// A minor/major date pair. Either side may be unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceDates {
    #[serde(default)]
    pub minor: Option<String>,
    #[serde(default)]
    pub major: Option<String>,
}

/// A physical household item or maintenance subject, as handed to the AI
/// services for a single request. Owned by the store; the AI layer only
/// borrows it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub installation_date: Option<String>,
    #[serde(default)]
    pub last_maintenance_date: MaintenanceDates,
    #[serde(default)]
    pub next_maintenance_date: MaintenanceDates,
    #[serde(default)]
    pub notes: Option<String>,
    /// Which LLM service last/should handle this item.
    #[serde(default)]
    pub provider: Option<String>,
}

/// Next minor/major maintenance dates in the canonical AI result. Both are
/// required ISO-8601 date-time strings once normalized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NextMaintenanceDates {
    pub minor: String,
    pub major: String,
}

/// Minor/major cadence and task lists in the canonical AI result.
///
/// The interval fields are strings on purpose: the interval parser coerces
/// recognized phrases to a months count, but free-form strings that it does
/// not recognize pass through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceScheduleSpec {
    pub minor_interval_months: String,
    pub minor_tasks: Vec<String>,
    pub major_interval_months: String,
    pub major_tasks: Vec<String>,
}

/// Canonical output of any AI normalization pass.
///
/// Created fresh per AI call, never mutated after validation, and consumed
/// immediately by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceAiResult {
    pub name: String,
    pub next_maintenance_dates: NextMaintenanceDates,
    pub maintenance_schedule: MaintenanceScheduleSpec,
    pub reasoning: String,
}

/// A property template that seeds a maintenance task list.
///
/// `id` is a deterministic function of `type` so that re-importing the same
/// source document never mints duplicate templates. `task_count` is derived;
/// it is recomputed from the task map after every mutation and never trusted
/// from an input document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyTemplate {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub template_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub task_count: usize,
    #[serde(default)]
    pub created_at: Option<String>,
}

fn default_priority() -> String {
    "Medium".to_string()
}

fn default_status() -> String {
    "pending".to_string()
}

/// A tracked maintenance task (one per catalog item under a template).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceTask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub is_template: bool,
    #[serde(default)]
    pub is_ai_generated: bool,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub installation_date: Option<String>,
    #[serde(default)]
    pub warranty_period_months: Option<i64>,
    #[serde(default)]
    pub minor_interval_months: Option<i64>,
    #[serde(default)]
    pub major_interval_months: Option<i64>,
    #[serde(default)]
    pub minor_tasks: Vec<String>,
    #[serde(default)]
    pub major_tasks: Vec<String>,
    #[serde(default)]
    pub last_maintenance_date: MaintenanceDates,
    #[serde(default)]
    pub next_maintenance_date: MaintenanceDates,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Default for MaintenanceTask {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            description: String::new(),
            category: String::new(),
            priority: default_priority(),
            status: default_status(),
            is_template: false,
            is_ai_generated: false,
            template_id: None,
            notes: None,
            brand: None,
            model: None,
            serial_number: None,
            location: None,
            installation_date: None,
            warranty_period_months: None,
            minor_interval_months: None,
            major_interval_months: None,
            minor_tasks: Vec::new(),
            major_tasks: Vec::new(),
            last_maintenance_date: MaintenanceDates::default(),
            next_maintenance_date: MaintenanceDates::default(),
            created_at: None,
            updated_at: None,
        }
    }
}

/// A saved questionnaire response, keyed by session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireResponse {
    pub id: String,
    pub session_id: String,
    /// Raw answers as a JSON string, opaque to the store.
    #[serde(default)]
    pub responses: String,
    #[serde(default)]
    pub property_type: String,
    #[serde(default)]
    pub created_at: Option<String>,
}
