//! Schedule generation service.
//!
//! Orchestrates one AI request per catalog item: prompt → provider → raw
//! payload → normalization → validation. Normalization and validation never
//! throw; a result that fails the structural contract becomes a
//! [`ScheduleDiagnostic`] value that is also recorded in the diagnostics
//! buffer. Only provider I/O surfaces as `Err`.
//!
//! Category batches run sequentially in input order and support cooperative
//! cancellation keyed by category name: a second request for a category that
//! is already in flight is interpreted as "cancel the first", not "start a
//! second".

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::diagnostics::{DiagnosticRecord, DiagnosticsBuffer};
use crate::models::{CatalogItem, MaintenanceAiResult};
use crate::normalize::normalize_to_maintenance_ai_result;
use crate::providers::{build_schedule_prompt, AiProvider};
use crate::validate::{validate_maintenance_ai_result, ValidationError};

/// The recoverable failure shape returned to callers when a provider
/// answered but the answer could not be turned into a valid result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDiagnostic {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<Vec<ValidationError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

/// Outcome of one schedule generation: a validated result or a diagnostic.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ScheduleOutcome {
    Valid(MaintenanceAiResult),
    Invalid(ScheduleDiagnostic),
}

impl ScheduleOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ScheduleOutcome::Valid(_))
    }

    pub fn as_result(&self) -> Option<&MaintenanceAiResult> {
        match self {
            ScheduleOutcome::Valid(r) => Some(r),
            ScheduleOutcome::Invalid(_) => None,
        }
    }
}

/// Outcome of a category batch run.
#[derive(Debug)]
pub enum CategoryRun {
    /// Every item was processed; same length and order as the input.
    Completed(Vec<ScheduleOutcome>),
    /// The run was cancelled between items; holds the prefix it finished.
    Aborted { completed: Vec<ScheduleOutcome> },
    /// A run for this category was already in flight; it has been asked to
    /// stop and no new run was started.
    CancelledInFlight,
}

/// The earliest next-maintenance date we will accept from a provider.
pub fn one_week_from_now() -> DateTime<Utc> {
    Utc::now() + Duration::weeks(1)
}

/// Stateful service owning the diagnostics buffer and the in-flight
/// category cancellation flags.
pub struct ScheduleService {
    diagnostics: Mutex<DiagnosticsBuffer>,
    in_flight: Mutex<HashMap<String, Arc<AtomicBool>>>,
}

impl ScheduleService {
    pub fn new() -> Self {
        Self {
            diagnostics: Mutex::new(DiagnosticsBuffer::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Generate a maintenance schedule for one item, flooring next dates at
    /// one week from now.
    pub async fn generate_maintenance_schedule(
        &self,
        provider: &dyn AiProvider,
        item: &CatalogItem,
    ) -> Result<ScheduleOutcome> {
        self.generate_with_floor(provider, item, one_week_from_now())
            .await
    }

    /// Generate with an explicit date floor. Provider I/O errors propagate;
    /// every other failure mode is a [`ScheduleOutcome::Invalid`].
    pub async fn generate_with_floor(
        &self,
        provider: &dyn AiProvider,
        item: &CatalogItem,
        min_date: DateTime<Utc>,
    ) -> Result<ScheduleOutcome> {
        let prompt = build_schedule_prompt(item);
        let raw = provider.generate(&prompt).await?;

        // Some prompt variants wrap the object in an array; take the first
        // element.
        let raw = match raw {
            Value::Array(mut items) if !items.is_empty() => items.remove(0),
            other => other,
        };

        if !raw.is_object() {
            let error = "Provider response was not a JSON object".to_string();
            let mut record = DiagnosticRecord::new(provider.name(), &item.name, &error);
            record.raw = Some(raw.clone());
            self.diagnostics.lock().unwrap().push(record);
            return Ok(ScheduleOutcome::Invalid(ScheduleDiagnostic {
                error,
                validation_errors: None,
                normalized: None,
                raw: Some(raw),
            }));
        }

        let normalized = normalize_to_maintenance_ai_result(&raw, &item.name, min_date);
        let normalized_value = serde_json::to_value(&normalized)?;
        let report = validate_maintenance_ai_result(&normalized_value);

        if !report.valid {
            let error = "Normalized result failed schema validation".to_string();
            tracing::warn!(item = %item.name, provider = provider.name(), "schedule validation failed");
            let mut record = DiagnosticRecord::new(provider.name(), &item.name, &error);
            record.validation_errors = Some(report.errors.clone());
            record.raw = Some(raw);
            self.diagnostics.lock().unwrap().push(record);
            return Ok(ScheduleOutcome::Invalid(ScheduleDiagnostic {
                error,
                validation_errors: Some(report.errors),
                normalized: Some(normalized_value),
                raw: None,
            }));
        }

        Ok(ScheduleOutcome::Valid(normalized))
    }

    /// Generate schedules for a whole category, one item at a time, in
    /// input order.
    ///
    /// If a run for `category` is already in flight, that run is asked to
    /// stop and this call returns [`CategoryRun::CancelledInFlight`] without
    /// starting a second one.
    pub async fn generate_category_maintenance_schedules(
        &self,
        provider: &dyn AiProvider,
        category: &str,
        items: &[CatalogItem],
    ) -> Result<CategoryRun> {
        let cancel = {
            let mut in_flight = self.in_flight.lock().unwrap();
            if let Some(existing) = in_flight.get(category) {
                existing.store(true, Ordering::SeqCst);
                return Ok(CategoryRun::CancelledInFlight);
            }
            let flag = Arc::new(AtomicBool::new(false));
            in_flight.insert(category.to_string(), flag.clone());
            flag
        };

        let mut outcomes = Vec::with_capacity(items.len());
        for item in items {
            if cancel.load(Ordering::SeqCst) {
                self.finish_category(category);
                tracing::info!(category, completed = outcomes.len(), "category run cancelled");
                return Ok(CategoryRun::Aborted { completed: outcomes });
            }
            match self.generate_maintenance_schedule(provider, item).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    self.finish_category(category);
                    return Err(e);
                }
            }
        }

        self.finish_category(category);
        Ok(CategoryRun::Completed(outcomes))
    }

    fn finish_category(&self, category: &str) {
        self.in_flight.lock().unwrap().remove(category);
    }

    /// Copy of the diagnostics buffer, oldest first.
    pub fn get_diagnostics(&self) -> Vec<DiagnosticRecord> {
        self.diagnostics.lock().unwrap().get_all()
    }

    /// Clear the diagnostics buffer. Callers are expected to have enforced
    /// operator authorization before invoking this.
    pub fn clear_diagnostics(&self) {
        self.diagnostics.lock().unwrap().clear();
    }
}

impl Default for ScheduleService {
    fn default() -> Self {
        Self::new()
    }
}
