//! Storage reconciliation and the JSON file store.
//!
//! The persisted document has existed in three historical shapes: the legacy
//! relational-ish `{templates, tasks, responses}`, the schema-aligned
//! `{provider, householdCatalog}`, and partial hybrids from mid-migration
//! exports. [`reconcile`] detects the shape by key presence and rebuilds one
//! internal representation; shape logic never leaks past that boundary.
//! [`persist_document`] always writes the legacy shape, which is the single
//! canonical on-disk form going forward.
//!
//! Template ids are a deterministic function of the template type
//! (UUIDv5 under a fixed namespace), so re-running reconciliation against a
//! historical export never mints duplicate templates or orphans tasks.
//!
//! Durability is best-effort: a read/parse failure falls back to a fresh
//! seed, and a failed write is logged and swallowed so the process keeps
//! serving from memory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::interval::{parse_interval_to_months, to_iso_string, to_task_list};
use crate::models::{
    CatalogItem, MaintenanceAiResult, MaintenanceDates, MaintenanceTask, PropertyTemplate,
    QuestionnaireResponse,
};

/// Namespace string for deterministic template ids. Changing it would orphan
/// every task's `templateId` in existing documents.
const TEMPLATE_ID_NAMESPACE: &str = "simplehome-template";

/// Fixed category-name → template-type lookup for householdCatalog imports.
const NAME_TO_TYPE: &[(&str, &str)] = &[
    ("single-family home", "single_family"),
    ("condo", "apartment"),
    ("townhouse", "townhouse"),
    ("commercial building", "commercial"),
    ("rental property", "rental"),
];

/// Templates seeded into a fresh store.
const DEFAULT_TEMPLATES: &[(&str, &str, &str)] = &[
    (
        "Single-Family Home",
        "single_family",
        "Comprehensive maintenance for detached homes with yard, roof, HVAC systems, and exterior care.",
    ),
    (
        "Condo",
        "apartment",
        "Essential maintenance for condo owners covering unit-specific systems, appliances, and shared building responsibilities.",
    ),
    (
        "Townhouse",
        "townhouse",
        "Balanced maintenance for attached homes with shared walls and individual system responsibilities.",
    ),
    (
        "Commercial Building",
        "commercial",
        "Professional maintenance schedules for office spaces, retail, and commercial properties.",
    ),
    (
        "Rental Property",
        "rental",
        "Landlord-focused maintenance with tenant safety priorities and investment protection.",
    ),
];

/// Derive the stable template id for a template type.
///
/// Pure function of `(namespace, type)`: the same type always yields the
/// same id across runs and machines.
pub fn deterministic_template_id(template_type: &str) -> String {
    let namespace = Uuid::new_v5(&Uuid::NAMESPACE_DNS, TEMPLATE_ID_NAMESPACE.as_bytes());
    Uuid::new_v5(&namespace, template_type.as_bytes()).to_string()
}

/// Map a catalog category name onto a canonical template type, falling back
/// to a slug of the name itself.
pub fn canonical_type_for(category_name: &str) -> String {
    let lower = category_name.trim().to_lowercase();
    for (name, template_type) in NAME_TO_TYPE {
        if lower == *name {
            return (*template_type).to_string();
        }
    }
    slugify(&lower)
}

fn slugify(lower: &str) -> String {
    let mut slug = String::with_capacity(lower.len());
    let mut last_was_sep = true;
    for c in lower.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_was_sep = false;
        } else if !last_was_sep {
            slug.push('_');
            last_was_sep = true;
        }
    }
    slug.trim_end_matches('_').to_string()
}

fn is_uuid_shaped(s: &str) -> bool {
    Uuid::try_parse(s).is_ok()
}

fn now_iso() -> String {
    to_iso_string(Utc::now())
}

/// Coerce a raw date field into a minor/major pair: a bare string is the
/// minor date, an object keeps both sides, anything else is empty.
fn date_pair(value: Option<&Value>) -> MaintenanceDates {
    match value {
        Some(Value::String(s)) => MaintenanceDates {
            minor: Some(s.clone()),
            major: None,
        },
        Some(Value::Object(obj)) => MaintenanceDates {
            minor: obj.get("minor").and_then(Value::as_str).map(String::from),
            major: obj.get("major").and_then(Value::as_str).map(String::from),
        },
        _ => MaintenanceDates::default(),
    }
}

/// Coerce an interval field (number, numeric string, or interval phrase)
/// into a months count.
fn interval_months(value: Option<&Value>) -> Option<i64> {
    match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => parse_interval_to_months(s).parse().ok(),
        _ => None,
    }
}

/// Task names from a catalog schedule list, which may hold plain strings or
/// `{taskName, description, id}` objects.
fn catalog_task_names(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Object(obj) => obj
                    .get("taskName")
                    .or_else(|| obj.get("name"))
                    .and_then(Value::as_str)
                    .map(String::from),
                _ => None,
            })
            .collect(),
        Some(other) => to_task_list(other),
        None => Vec::new(),
    }
}

/// In-memory state rebuilt from a persisted document.
///
/// Maps are ordered so that persisting is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    pub templates: BTreeMap<String, PropertyTemplate>,
    pub tasks: BTreeMap<String, MaintenanceTask>,
    pub responses: BTreeMap<String, QuestionnaireResponse>,
}

/// Recompute every template's `taskCount` from the task map. Input documents
/// are never trusted for this field.
pub fn recompute_task_counts(state: &mut StoreState) {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for task in state.tasks.values() {
        if let Some(template_id) = task.template_id.as_deref() {
            *counts.entry(template_id).or_default() += 1;
        }
    }
    for template in state.templates.values_mut() {
        template.task_count = counts.get(template.id.as_str()).copied().unwrap_or(0);
    }
}

/// Rebuild in-memory state from a persisted document in any historical
/// shape.
///
/// Shape detection: a non-empty `templates` array wins (legacy shape,
/// imported verbatim); otherwise a non-empty `householdCatalog` array is
/// imported with deterministic template ids; otherwise the state is empty
/// and the caller decides whether to seed. `responses` are restored verbatim
/// in every case.
pub fn reconcile(document: &Value) -> StoreState {
    let mut state = StoreState::default();

    let templates = document
        .get("templates")
        .and_then(Value::as_array)
        .filter(|a| !a.is_empty());

    if let Some(templates) = templates {
        for raw in templates {
            if let Ok(template) = serde_json::from_value::<PropertyTemplate>(raw.clone()) {
                state.templates.insert(template.id.clone(), template);
            }
        }
        if let Some(tasks) = document.get("tasks").and_then(Value::as_array) {
            for raw in tasks {
                if let Some(task) = import_legacy_task(raw) {
                    state.tasks.insert(task.id.clone(), task);
                }
            }
        }
    } else if let Some(catalog) = document
        .get("householdCatalog")
        .and_then(Value::as_array)
        .filter(|a| !a.is_empty())
    {
        for category in catalog {
            import_catalog_category(&mut state, category);
        }
    }

    if let Some(responses) = document.get("responses").and_then(Value::as_object) {
        for raw in responses.values() {
            if let Ok(response) = serde_json::from_value::<QuestionnaireResponse>(raw.clone()) {
                state.responses.insert(response.session_id.clone(), response);
            }
        }
    }

    recompute_task_counts(&mut state);
    state
}

/// Import one legacy task verbatim, tolerating the oldest exports that still
/// carried flat `dueDate`/`nextDue`/`lastCompleted`/`completedAt` fields.
fn import_legacy_task(raw: &Value) -> Option<MaintenanceTask> {
    let mut task = serde_json::from_value::<MaintenanceTask>(raw.clone()).ok()?;
    if task.next_maintenance_date == MaintenanceDates::default() {
        let due = raw
            .get("nextDue")
            .or_else(|| raw.get("dueDate"))
            .and_then(Value::as_str);
        if let Some(due) = due {
            task.next_maintenance_date.minor = Some(due.to_string());
        }
    }
    if task.last_maintenance_date == MaintenanceDates::default() {
        let last = raw
            .get("lastCompleted")
            .or_else(|| raw.get("completedAt"))
            .and_then(Value::as_str);
        if let Some(last) = last {
            task.last_maintenance_date.minor = Some(last.to_string());
        }
    }
    Some(task)
}

/// Import one householdCatalog category: derive the template, then one task
/// per item with `templateId` pointing at it.
fn import_catalog_category(state: &mut StoreState, category: &Value) {
    let name = category
        .get("categoryName")
        .or_else(|| category.get("category"))
        .and_then(Value::as_str)
        .unwrap_or("General");
    let template_type = canonical_type_for(name);
    let template_id = deterministic_template_id(&template_type);

    state
        .templates
        .entry(template_id.clone())
        .or_insert_with(|| PropertyTemplate {
            id: template_id.clone(),
            name: name.to_string(),
            template_type,
            description: category
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            task_count: 0,
            created_at: Some(now_iso()),
        });

    let Some(items) = category.get("items").and_then(Value::as_array) else {
        return;
    };

    for item in items {
        let id = item
            .get("id")
            .and_then(Value::as_str)
            .filter(|s| is_uuid_shaped(s))
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let get_str =
            |key: &str| -> Option<String> { item.get(key).and_then(Value::as_str).map(String::from) };
        let schedule = item.get("maintenanceSchedule").unwrap_or(&Value::Null);

        let task = MaintenanceTask {
            id: id.clone(),
            title: get_str("name").unwrap_or_else(|| "Untitled".to_string()),
            description: get_str("description")
                .or_else(|| get_str("notes"))
                .unwrap_or_default(),
            category: name.to_string(),
            priority: get_str("priority").unwrap_or_else(|| "Medium".to_string()),
            status: "pending".to_string(),
            is_template: true,
            is_ai_generated: false,
            template_id: Some(template_id.clone()),
            notes: get_str("notes"),
            brand: get_str("brand"),
            model: get_str("model"),
            serial_number: get_str("serialNumber"),
            location: get_str("location"),
            installation_date: get_str("installationDate"),
            warranty_period_months: item.get("warrantyPeriodMonths").and_then(Value::as_i64),
            minor_interval_months: interval_months(schedule.get("minorIntervalMonths")),
            major_interval_months: interval_months(schedule.get("majorIntervalMonths")),
            minor_tasks: catalog_task_names(schedule.get("minorTasks")),
            major_tasks: catalog_task_names(schedule.get("majorTasks")),
            last_maintenance_date: date_pair(item.get("lastMaintenanceDate")),
            next_maintenance_date: date_pair(item.get("nextMaintenanceDate")),
            created_at: Some(now_iso()),
            updated_at: Some(now_iso()),
        };
        state.tasks.insert(id, task);
    }
}

/// Serialize state back to the canonical (legacy-shaped) document.
pub fn persist_document(state: &StoreState) -> Value {
    serde_json::json!({
        "templates": state.templates.values().collect::<Vec<_>>(),
        "tasks": state.tasks.values().collect::<Vec<_>>(),
        "responses": state.responses,
    })
}

/// Borrow a stored task as a [`CatalogItem`] for a single AI request.
pub fn catalog_item_for_task(task: &MaintenanceTask) -> CatalogItem {
    CatalogItem {
        id: task.id.clone(),
        name: task.title.clone(),
        brand: task.brand.clone(),
        model: task.model.clone(),
        serial_number: task.serial_number.clone(),
        location: task.location.clone(),
        description: Some(task.description.clone()),
        priority: Some(task.priority.clone()),
        installation_date: task.installation_date.clone(),
        last_maintenance_date: task.last_maintenance_date.clone(),
        next_maintenance_date: task.next_maintenance_date.clone(),
        notes: task.notes.clone(),
        provider: None,
    }
}

/// Filters for task listing.
#[derive(Debug, Clone, Default)]
pub struct TaskFilters {
    pub category: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub template_id: Option<String>,
}

/// The JSON-document-backed store.
///
/// Every mutation rewrites the whole document (UTF-8, pretty-printed,
/// newline-terminated) so the on-disk copy never lags in-memory state for
/// more than one operation. Concurrent writers outside this process are not
/// supported.
pub struct JsonFileStore {
    path: PathBuf,
    state: StoreState,
}

impl JsonFileStore {
    /// Open (or create) the store at `path`. An unreadable or unparsable
    /// document is treated as "no valid persisted state" and replaced with
    /// the default template seed.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(document) => reconcile(&document),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "persisted document unreadable, reseeding");
                    StoreState::default()
                }
            },
            Err(_) => StoreState::default(),
        };

        let mut store = Self { path, state };
        if store.state.templates.is_empty() && store.state.tasks.is_empty() {
            store.seed_defaults();
            store.persist();
        }
        store
    }

    /// Seed the five default property templates with deterministic ids.
    pub fn seed_defaults(&mut self) {
        for (name, template_type, description) in DEFAULT_TEMPLATES {
            let id = deterministic_template_id(template_type);
            self.state.templates.insert(
                id.clone(),
                PropertyTemplate {
                    id,
                    name: (*name).to_string(),
                    template_type: (*template_type).to_string(),
                    description: (*description).to_string(),
                    task_count: 0,
                    created_at: Some(now_iso()),
                },
            );
        }
    }

    /// Seed templates and tasks from a bundled householdCatalog file.
    /// Existing records win; returns the number of tasks added.
    pub fn seed_from_catalog_file(&mut self, path: &Path) -> Result<usize> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;
        let document: Value =
            serde_json::from_str(&raw).with_context(|| "Failed to parse catalog file")?;
        let imported = reconcile(&document);

        let mut added = 0;
        for (id, template) in imported.templates {
            self.state.templates.entry(id).or_insert(template);
        }
        for (id, task) in imported.tasks {
            if let std::collections::btree_map::Entry::Vacant(slot) = self.state.tasks.entry(id) {
                slot.insert(task);
                added += 1;
            }
        }
        recompute_task_counts(&mut self.state);
        self.persist();
        Ok(added)
    }

    /// Write the canonical document. Failure is logged and swallowed; the
    /// store keeps serving from memory.
    fn persist(&self) {
        let document = persist_document(&self.state);
        let pretty = match serde_json::to_string_pretty(&document) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize storage document");
                return;
            }
        };
        if let Some(parent) = self.path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                tracing::error!(error = %e, "failed to create storage directory");
                return;
            }
        }
        if let Err(e) = fs::write(&self.path, pretty + "\n") {
            tracing::error!(path = %self.path.display(), error = %e, "failed to persist storage");
        }
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn templates(&self) -> Vec<&PropertyTemplate> {
        self.state.templates.values().collect()
    }

    pub fn template(&self, id: &str) -> Option<&PropertyTemplate> {
        self.state.templates.get(id)
    }

    pub fn create_template(
        &mut self,
        name: &str,
        template_type: &str,
        description: &str,
    ) -> PropertyTemplate {
        let id = deterministic_template_id(template_type);
        let template = PropertyTemplate {
            id: id.clone(),
            name: name.to_string(),
            template_type: template_type.to_string(),
            description: description.to_string(),
            task_count: 0,
            created_at: Some(now_iso()),
        };
        self.state.templates.insert(id, template.clone());
        recompute_task_counts(&mut self.state);
        self.persist();
        template
    }

    pub fn task(&self, id: &str) -> Option<&MaintenanceTask> {
        self.state.tasks.get(id)
    }

    /// List tasks matching the filters, overdue first.
    pub fn tasks(&self, filters: &TaskFilters) -> Vec<&MaintenanceTask> {
        let mut tasks: Vec<&MaintenanceTask> = self
            .state
            .tasks
            .values()
            .filter(|t| {
                filters.category.as_deref().is_none_or(|c| t.category == c)
                    && filters.priority.as_deref().is_none_or(|p| t.priority == p)
                    && filters.status.as_deref().is_none_or(|s| t.status == s)
                    && filters
                        .template_id
                        .as_deref()
                        .is_none_or(|id| t.template_id.as_deref() == Some(id))
                    && filters.search.as_deref().is_none_or(|q| {
                        let q = q.to_lowercase();
                        t.title.to_lowercase().contains(&q)
                            || t.description.to_lowercase().contains(&q)
                    })
            })
            .collect();
        tasks.sort_by_key(|t| t.status != "overdue");
        tasks
    }

    pub fn create_task(&mut self, mut task: MaintenanceTask) -> MaintenanceTask {
        task.id = Uuid::new_v4().to_string();
        task.created_at = Some(now_iso());
        task.updated_at = Some(now_iso());
        if task.status.is_empty() {
            task.status = "pending".to_string();
        }
        self.state.tasks.insert(task.id.clone(), task.clone());
        recompute_task_counts(&mut self.state);
        self.persist();
        task
    }

    pub fn update_task(
        &mut self,
        id: &str,
        apply: impl FnOnce(&mut MaintenanceTask),
    ) -> Option<MaintenanceTask> {
        let task = self.state.tasks.get_mut(id)?;
        apply(task);
        task.updated_at = Some(now_iso());
        let updated = task.clone();
        recompute_task_counts(&mut self.state);
        self.persist();
        Some(updated)
    }

    pub fn delete_task(&mut self, id: &str) -> bool {
        let existed = self.state.tasks.remove(id).is_some();
        if existed {
            recompute_task_counts(&mut self.state);
            self.persist();
        }
        existed
    }

    /// Merge a validated AI result into a stored task: next dates, interval
    /// months, task lists, and reasoning-as-notes.
    pub fn apply_ai_result(
        &mut self,
        task_id: &str,
        result: &MaintenanceAiResult,
    ) -> Option<MaintenanceTask> {
        self.update_task(task_id, |task| {
            task.next_maintenance_date = MaintenanceDates {
                minor: Some(result.next_maintenance_dates.minor.clone()),
                major: Some(result.next_maintenance_dates.major.clone()),
            };
            if let Ok(months) = result.maintenance_schedule.minor_interval_months.parse() {
                task.minor_interval_months = Some(months);
            }
            if let Ok(months) = result.maintenance_schedule.major_interval_months.parse() {
                task.major_interval_months = Some(months);
            }
            if !result.maintenance_schedule.minor_tasks.is_empty() {
                task.minor_tasks = result.maintenance_schedule.minor_tasks.clone();
            }
            if !result.maintenance_schedule.major_tasks.is_empty() {
                task.major_tasks = result.maintenance_schedule.major_tasks.clone();
            }
            if !result.reasoning.is_empty() {
                task.notes = Some(result.reasoning.clone());
            }
            task.is_ai_generated = true;
        })
    }

    pub fn save_response(
        &mut self,
        session_id: &str,
        responses: String,
        property_type: &str,
    ) -> QuestionnaireResponse {
        let response = QuestionnaireResponse {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            responses,
            property_type: property_type.to_string(),
            created_at: Some(now_iso()),
        };
        self.state
            .responses
            .insert(session_id.to_string(), response.clone());
        self.persist();
        response
    }

    pub fn response(&self, session_id: &str) -> Option<&QuestionnaireResponse> {
        self.state.responses.get(session_id)
    }
}
