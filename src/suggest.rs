//! Questionnaire-driven task suggestions.
//!
//! A saved [`QuestionnaireResponse`](crate::models::QuestionnaireResponse)
//! carries a property assessment; this module turns it into a prompt, asks a
//! provider for suggested maintenance tasks, and normalizes the reply into
//! [`TaskSuggestion`] values. Like schedule normalization, field resolution
//! goes through alias chains because the two providers answer in different
//! shapes (OpenAI wraps the list in a `tasks` or `suggestions` key; Gemini
//! has returned bare objects and nested arrays). Normalization never fails;
//! an answer with no recognizable suggestions becomes an empty list.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::interval::parse_interval_to_months;
use crate::models::MaintenanceTask;
use crate::normalize::first_string;
use crate::providers::AiProvider;

/// Answers collected by the onboarding questionnaire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyAssessment {
    #[serde(default)]
    pub home_age: String,
    #[serde(default)]
    pub home_size: String,
    #[serde(default)]
    pub home_type: String,
    #[serde(default)]
    pub climate: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub last_maintenance: String,
    #[serde(default)]
    pub budget: String,
    #[serde(default)]
    pub concerns: Vec<String>,
}

/// One suggested maintenance task, normalized from provider output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSuggestion {
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: String,
    pub frequency: String,
    pub reasoning: String,
}

const TITLE_ALIASES: &[&[&str]] = &[&["title"], &["Name"], &["name"]];
const DESCRIPTION_ALIASES: &[&[&str]] = &[&["description"], &["Maintenance Schedule", "Minor"]];
const CATEGORY_ALIASES: &[&[&str]] = &[&["category"]];
const PRIORITY_ALIASES: &[&[&str]] = &[&["priority"]];
const FREQUENCY_ALIASES: &[&[&str]] = &[&["frequency"], &["Maintenance Schedule", "Major"]];
const REASONING_ALIASES: &[&[&str]] = &[&["reasoning"], &["Maintenance Schedule", "reasoning"]];

/// Build the assessment prompt for a property type.
pub fn build_assessment_prompt(property_type: &str, assessment: &PropertyAssessment) -> String {
    format!(
        "You are a home maintenance expert AI. Generate personalized maintenance tasks for a \
         {} property based on the following assessment:\n\n\
         Home Age: {}\n\
         Home Size: {}\n\
         Climate: {}\n\
         Features: {}\n\
         Last Maintenance: {}\n\
         Budget: {}\n\
         Concerns: {}\n\n\
         Generate 8-12 specific, actionable maintenance tasks. For each task, provide:\n\
         - title: Clear, concise task name\n\
         - description: Detailed instructions (2-3 sentences)\n\
         - category: One of [HVAC, Plumbing, Electrical, Exterior, Interior, Safety, Landscaping]\n\
         - priority: One of [Low, Medium, High, Urgent]\n\
         - frequency: How often this should be done\n\
         - reasoning: Why this task is important for this specific property\n\n\
         Focus on tasks that are most relevant to the property age, type, and climate. \
         Prioritize safety and system efficiency.\n\n\
         Respond with valid JSON in this exact format:\n\
         {{\n  \"tasks\": [\n    {{\n      \"title\": \"string\",\n      \"description\": \"string\",\n      \
         \"category\": \"string\",\n      \"priority\": \"string\",\n      \"frequency\": \"string\",\n      \
         \"reasoning\": \"string\"\n    }}\n  ]\n}}",
        property_type,
        assessment.home_age,
        assessment.home_size,
        assessment.climate,
        assessment.features.join(", "),
        assessment.last_maintenance,
        assessment.budget,
        assessment.concerns.join(", "),
    )
}

/// Build the gap-analysis prompt from the titles of existing tasks.
pub fn build_quick_suggestions_prompt(existing_titles: &[String], property_info: &str) -> String {
    format!(
        "Based on existing maintenance tasks: {}\n\n\
         Property info: {}\n\n\
         Suggest 2-3 additional important maintenance tasks that are missing from the current \
         list. Consider seasonal needs and typical maintenance gaps.\n\n\
         Respond with valid JSON in this format:\n\
         {{\n  \"suggestions\": [\n    {{\n      \"title\": \"string\",\n      \"description\": \"string\",\n      \
         \"category\": \"string\",\n      \"priority\": \"string\",\n      \"frequency\": \"string\",\n      \
         \"reasoning\": \"string\"\n    }}\n  ]\n}}",
        existing_titles.join(", "),
        property_info,
    )
}

/// Flatten the provider payload into candidate suggestion objects.
///
/// Accepts a `tasks` or `suggestions` wrapper object, a bare array (nested
/// arrays are flattened), or a single bare object.
fn candidate_objects(raw: &Value) -> Vec<&Value> {
    let list = raw
        .get("tasks")
        .or_else(|| raw.get("suggestions"))
        .unwrap_or(raw);

    let mut out = Vec::new();
    flatten_into(list, &mut out);
    out
}

fn flatten_into<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                flatten_into(item, out);
            }
        }
        Value::Object(_) => out.push(value),
        _ => {}
    }
}

/// Normalize raw provider output into suggestions.
///
/// Each candidate object is resolved through alias chains, with the same
/// fallback values for absent fields regardless of provider.
pub fn normalize_suggestions(raw: &Value) -> Vec<TaskSuggestion> {
    candidate_objects(raw)
        .into_iter()
        .map(|s| TaskSuggestion {
            title: first_string(s, TITLE_ALIASES).unwrap_or_else(|| "Maintenance Task".to_string()),
            description: first_string(s, DESCRIPTION_ALIASES)
                .unwrap_or_else(|| "Regular maintenance".to_string()),
            category: first_string(s, CATEGORY_ALIASES)
                .unwrap_or_else(|| "HVAC & Mechanical".to_string()),
            priority: first_string(s, PRIORITY_ALIASES).unwrap_or_else(|| "Medium".to_string()),
            frequency: first_string(s, FREQUENCY_ALIASES).unwrap_or_else(|| "Annual".to_string()),
            reasoning: first_string(s, REASONING_ALIASES)
                .unwrap_or_else(|| "Recommended maintenance".to_string()),
        })
        .collect()
}

/// Ask a provider for tasks matching a property assessment.
///
/// Provider I/O errors propagate; a reply with no recognizable suggestions
/// yields an empty list.
///
/// # Errors
///
/// Returns an error when the provider request itself fails.
pub async fn generate_task_suggestions(
    provider: &dyn AiProvider,
    property_type: &str,
    assessment: &PropertyAssessment,
) -> Result<Vec<TaskSuggestion>> {
    let prompt = build_assessment_prompt(property_type, assessment);
    let raw = provider.generate(&prompt).await?;
    let suggestions = normalize_suggestions(&raw);
    if suggestions.is_empty() {
        tracing::warn!(provider = provider.name(), "no suggestions in provider reply");
    }
    Ok(suggestions)
}

/// Ask a provider for 2-3 tasks missing from an existing list.
pub async fn generate_quick_suggestions(
    provider: &dyn AiProvider,
    existing_titles: &[String],
    property_info: &str,
) -> Result<Vec<TaskSuggestion>> {
    let prompt = build_quick_suggestions_prompt(existing_titles, property_info);
    let raw = provider.generate(&prompt).await?;
    Ok(normalize_suggestions(&raw))
}

/// Convert a suggestion into a task draft ready for the store.
pub fn task_from_suggestion(suggestion: &TaskSuggestion, template_id: Option<&str>) -> MaintenanceTask {
    MaintenanceTask {
        title: suggestion.title.clone(),
        description: suggestion.description.clone(),
        category: suggestion.category.clone(),
        priority: suggestion.priority.clone(),
        is_ai_generated: true,
        template_id: template_id.map(String::from),
        notes: Some(suggestion.reasoning.clone()),
        minor_interval_months: parse_interval_to_months(&suggestion.frequency).parse().ok(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tasks_wrapper_is_unwrapped() {
        let raw = json!({
            "tasks": [{
                "title": "Flush water heater",
                "description": "Drain sediment.",
                "category": "Plumbing",
                "priority": "High",
                "frequency": "Annually",
                "reasoning": "Extends tank life."
            }]
        });
        let out = normalize_suggestions(&raw);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "Flush water heater");
        assert_eq!(out[0].priority, "High");
    }

    #[test]
    fn test_suggestions_wrapper_and_defaults() {
        let raw = json!({ "suggestions": [{}] });
        let out = normalize_suggestions(&raw);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "Maintenance Task");
        assert_eq!(out[0].description, "Regular maintenance");
        assert_eq!(out[0].category, "HVAC & Mechanical");
        assert_eq!(out[0].priority, "Medium");
        assert_eq!(out[0].frequency, "Annual");
        assert_eq!(out[0].reasoning, "Recommended maintenance");
    }

    #[test]
    fn test_schedule_shaped_reply_resolves_through_aliases() {
        // a reply in the schedule vocabulary instead of the suggestion one
        let raw = json!([{
            "Name": "Gutter Cleaning",
            "Maintenance Schedule": {
                "Minor": "Clear leaves and debris",
                "Major": "Twice a year",
                "reasoning": "Prevents water damage"
            }
        }]);
        let out = normalize_suggestions(&raw);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "Gutter Cleaning");
        assert_eq!(out[0].description, "Clear leaves and debris");
        assert_eq!(out[0].frequency, "Twice a year");
        assert_eq!(out[0].reasoning, "Prevents water damage");
    }

    #[test]
    fn test_nested_arrays_flatten_and_non_objects_drop() {
        let raw = json!([[{ "title": "A" }], [[{ "title": "B" }]], "noise", 3]);
        let out = normalize_suggestions(&raw);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].title, "A");
        assert_eq!(out[1].title, "B");
    }

    #[test]
    fn test_bare_object_counts_as_one_suggestion() {
        let out = normalize_suggestions(&json!({ "title": "Solo" }));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "Solo");
    }

    #[test]
    fn test_plain_text_reply_yields_nothing() {
        assert!(normalize_suggestions(&json!("I cannot help with that.")).is_empty());
    }

    #[test]
    fn test_assessment_prompt_carries_answers() {
        let assessment = PropertyAssessment {
            home_age: "25 years".to_string(),
            climate: "humid continental".to_string(),
            features: vec!["pool".to_string(), "deck".to_string()],
            concerns: vec!["roof".to_string()],
            ..Default::default()
        };
        let prompt = build_assessment_prompt("single_family", &assessment);
        assert!(prompt.contains("single_family property"));
        assert!(prompt.contains("Home Age: 25 years"));
        assert!(prompt.contains("Features: pool, deck"));
        assert!(prompt.contains("Concerns: roof"));
        assert!(prompt.contains("\"tasks\""));
    }

    #[test]
    fn test_quick_prompt_lists_existing_titles() {
        let titles = vec!["Replace filter".to_string(), "Clean gutters".to_string()];
        let prompt = build_quick_suggestions_prompt(&titles, "townhouse, 10 years");
        assert!(prompt.contains("Replace filter, Clean gutters"));
        assert!(prompt.contains("townhouse, 10 years"));
        assert!(prompt.contains("\"suggestions\""));
    }

    #[test]
    fn test_task_from_suggestion_parses_frequency() {
        let suggestion = TaskSuggestion {
            title: "Service furnace".to_string(),
            description: "Inspect burners.".to_string(),
            category: "HVAC".to_string(),
            priority: "High".to_string(),
            frequency: "Annually".to_string(),
            reasoning: "Safety.".to_string(),
        };
        let task = task_from_suggestion(&suggestion, Some("t-1"));
        assert_eq!(task.title, "Service furnace");
        assert_eq!(task.minor_interval_months, Some(12));
        assert_eq!(task.template_id.as_deref(), Some("t-1"));
        assert_eq!(task.notes.as_deref(), Some("Safety."));
        assert!(task.is_ai_generated);

        let vague = TaskSuggestion {
            frequency: "as needed".to_string(),
            ..suggestion
        };
        assert_eq!(task_from_suggestion(&vague, None).minor_interval_months, None);
    }
}
