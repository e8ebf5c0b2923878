//! # SimpleHome CLI (`home`)
//!
//! The `home` binary is the primary interface for SimpleHome. It provides
//! commands for store initialization, template and task inspection, AI
//! schedule generation, and diagnostics.
//!
//! ## Usage
//!
//! ```bash
//! home --config ./config/home.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `home init` | Create the JSON store and seed the default property templates |
//! | `home seed <file>` | Import templates and tasks from a household catalog file |
//! | `home templates` | List property templates with their task counts |
//! | `home tasks` | List maintenance tasks, with optional filters |
//! | `home schedule <task-id>` | Generate and apply an AI maintenance schedule for one task |
//! | `home schedule-category <name>` | Generate schedules for every task in a category |
//! | `home respond <session-id> <file>` | Save a property questionnaire response |
//! | `home suggest <session-id>` | Generate AI task suggestions from a saved questionnaire |
//! | `home gaps` | Suggest tasks missing from the current list |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the store with default templates
//! home init --config ./config/home.toml
//!
//! # List overdue HVAC tasks
//! home tasks --category "HVAC & Mechanical" --status overdue
//!
//! # Generate a schedule with the default provider (key from GEMINI_API_KEY
//! # or ./gemini.key)
//! home schedule 4f2d7a34-58f2-4f7b-9c24-8e8f2b8a0f11
//!
//! # Same, but force OpenAI
//! home schedule 4f2d7a34-58f2-4f7b-9c24-8e8f2b8a0f11 --provider openai
//!
//! # Save questionnaire answers, then turn them into tasks
//! home respond kitchen-remodel ./answers.json --property-type single_family
//! home suggest kitchen-remodel --apply
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use simplehome::config::{self, Config};
use simplehome::providers::create_provider;
use simplehome::schedule::{CategoryRun, ScheduleOutcome, ScheduleService};
use simplehome::store::{catalog_item_for_task, JsonFileStore, TaskFilters};
use simplehome::suggest::{
    generate_quick_suggestions, generate_task_suggestions, task_from_suggestion,
    PropertyAssessment,
};

/// SimpleHome CLI — a household maintenance tracker with AI-generated
/// schedules.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/home.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "home",
    about = "SimpleHome — a household maintenance tracker with AI-generated schedules",
    version,
    long_about = "SimpleHome tracks household items and their maintenance cadence in a single \
    JSON document, and asks an AI provider (OpenAI or Gemini) to propose minor/major service \
    schedules. Provider output is normalized and validated before anything touches the store; \
    failures land in an in-memory diagnostics buffer instead of corrupting data."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/home.toml`. Storage and AI provider settings
    /// are read from this file.
    #[arg(long, global = true, default_value = "./config/home.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the JSON store.
    ///
    /// Creates the storage document and seeds the five default property
    /// templates. Template ids are deterministic, so running this multiple
    /// times is safe and never duplicates templates.
    Init,

    /// Import templates and tasks from a household catalog file.
    ///
    /// Accepts any historical document shape. Existing records win; only
    /// new tasks are added.
    Seed {
        /// Path to the catalog JSON file.
        file: PathBuf,
    },

    /// List property templates with their task counts.
    Templates,

    /// List maintenance tasks.
    ///
    /// All filters combine with AND. Overdue tasks sort first.
    Tasks {
        /// Filter by category name (exact match).
        #[arg(long)]
        category: Option<String>,

        /// Filter by priority (e.g. `Low`, `Medium`, `High`, `Urgent`).
        #[arg(long)]
        priority: Option<String>,

        /// Filter by status (e.g. `pending`, `completed`, `overdue`).
        #[arg(long)]
        status: Option<String>,

        /// Case-insensitive substring match on title and description.
        #[arg(long)]
        search: Option<String>,

        /// Filter by owning template id.
        #[arg(long)]
        template: Option<String>,
    },

    /// Generate an AI maintenance schedule for one task and apply it.
    ///
    /// The provider's response is normalized into the canonical result shape
    /// and validated; only a valid result is written back to the task. An
    /// invalid result is printed along with its validation errors and
    /// recorded in the diagnostics buffer.
    Schedule {
        /// Task id (UUID).
        task_id: String,

        /// Provider override: `openai` or `gemini`. Defaults to the
        /// configured provider.
        #[arg(long)]
        provider: Option<String>,

        /// API key. Falls back to `OPENAI_API_KEY`/`GEMINI_API_KEY`, then to
        /// a `./gemini.key` file for Gemini.
        #[arg(long)]
        api_key: Option<String>,

        /// Print the failure diagnostics recorded during this run.
        #[arg(long)]
        diagnostics: bool,
    },

    /// Generate AI schedules for every task in a category, in order.
    ///
    /// Valid results are applied to their tasks as they arrive; failures are
    /// reported per item without stopping the run.
    ScheduleCategory {
        /// Category name (exact match).
        category: String,

        /// Provider override: `openai` or `gemini`.
        #[arg(long)]
        provider: Option<String>,

        /// API key (same fallbacks as `schedule`).
        #[arg(long)]
        api_key: Option<String>,

        /// Print the failure diagnostics recorded during this run.
        #[arg(long)]
        diagnostics: bool,
    },

    /// Save a property questionnaire response.
    ///
    /// The answers file is JSON matching the assessment shape (homeAge,
    /// homeSize, climate, features, lastMaintenance, budget, concerns).
    /// Saving again under the same session id replaces the response.
    Respond {
        /// Session id to file the response under.
        session_id: String,

        /// Path to the JSON answers file.
        file: PathBuf,

        /// Property type the questionnaire was answered for
        /// (e.g. `single_family`, `apartment`).
        #[arg(long)]
        property_type: String,
    },

    /// Generate AI task suggestions from a saved questionnaire response.
    ///
    /// Prints the suggested tasks; with `--apply`, each suggestion is also
    /// created as a task in the store.
    Suggest {
        /// Session id of the saved questionnaire response.
        session_id: String,

        /// Create a task for every suggestion.
        #[arg(long)]
        apply: bool,

        /// Provider override: `openai` or `gemini`.
        #[arg(long)]
        provider: Option<String>,

        /// API key (same fallbacks as `schedule`).
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Suggest 2-3 maintenance tasks missing from the current list.
    ///
    /// Sends the titles of the stored tasks for gap analysis. Purely
    /// advisory: suggestions are printed, never written to the store.
    Gaps {
        /// Free-form property description to steer the suggestions
        /// (e.g. "townhouse, 15 years, coastal").
        #[arg(long, default_value = "No specific property info")]
        property_info: String,

        /// Provider override: `openai` or `gemini`.
        #[arg(long)]
        provider: Option<String>,

        /// API key (same fallbacks as `schedule`).
        #[arg(long)]
        api_key: Option<String>,
    },
}

/// Resolve the API key for a provider: explicit flag, then the provider's
/// environment variable, then (for Gemini) a `./gemini.key` file.
fn resolve_api_key(provider: &str, flag: Option<String>) -> Result<String> {
    if let Some(key) = flag {
        return Ok(key);
    }

    let var = match provider {
        "openai" => "OPENAI_API_KEY",
        "gemini" => "GEMINI_API_KEY",
        other => bail!("Unknown AI provider: {}", other),
    };
    if let Ok(key) = std::env::var(var) {
        if !key.trim().is_empty() {
            return Ok(key.trim().to_string());
        }
    }

    if provider == "gemini" {
        if let Ok(key) = std::fs::read_to_string("gemini.key") {
            let key = key.trim();
            if !key.is_empty() {
                return Ok(key.to_string());
            }
        }
    }

    bail!(
        "No API key for {}: pass --api-key or set {}",
        provider,
        var
    )
}

fn print_outcome(outcome: &ScheduleOutcome) -> Result<()> {
    match outcome {
        ScheduleOutcome::Valid(result) => {
            println!("{}", serde_json::to_string_pretty(result)?);
        }
        ScheduleOutcome::Invalid(diagnostic) => {
            println!("Schedule generation failed: {}", diagnostic.error);
            if let Some(errors) = &diagnostic.validation_errors {
                for e in errors {
                    println!("  {}: {}", e.path, e.message);
                }
            }
        }
    }
    Ok(())
}

fn print_diagnostics(service: &ScheduleService) -> Result<()> {
    let records = service.get_diagnostics();
    if records.is_empty() {
        println!("No diagnostics recorded.");
    } else {
        println!("{}", serde_json::to_string_pretty(&records)?);
    }
    Ok(())
}

async fn run_schedule(
    cfg: &Config,
    store: &mut JsonFileStore,
    task_id: &str,
    provider_flag: Option<String>,
    api_key_flag: Option<String>,
    diagnostics: bool,
) -> Result<()> {
    let task = store
        .task(task_id)
        .with_context(|| format!("No task with id {}", task_id))?
        .clone();

    let provider_name = provider_flag.unwrap_or_else(|| cfg.ai.provider.clone());
    let api_key = resolve_api_key(&provider_name, api_key_flag)?;
    let provider = create_provider(&provider_name, api_key, &cfg.ai)?;

    let service = ScheduleService::new();
    let item = catalog_item_for_task(&task);
    let outcome = service
        .generate_maintenance_schedule(provider.as_ref(), &item)
        .await?;

    if let ScheduleOutcome::Valid(result) = &outcome {
        match store.apply_ai_result(task_id, result) {
            Some(_) => println!("Applied schedule to task {} ({}).", task_id, task.title),
            None => println!("Task {} disappeared before the schedule was applied.", task_id),
        }
    }
    print_outcome(&outcome)?;
    if diagnostics {
        print_diagnostics(&service)?;
    }
    Ok(())
}

async fn run_schedule_category(
    cfg: &Config,
    store: &mut JsonFileStore,
    category: &str,
    provider_flag: Option<String>,
    api_key_flag: Option<String>,
    diagnostics: bool,
) -> Result<()> {
    let tasks: Vec<_> = store
        .tasks(&TaskFilters {
            category: Some(category.to_string()),
            ..Default::default()
        })
        .into_iter()
        .cloned()
        .collect();
    if tasks.is_empty() {
        println!("No tasks in category '{}'.", category);
        return Ok(());
    }

    let provider_name = provider_flag.unwrap_or_else(|| cfg.ai.provider.clone());
    let api_key = resolve_api_key(&provider_name, api_key_flag)?;
    let provider = create_provider(&provider_name, api_key, &cfg.ai)?;

    let service = ScheduleService::new();
    let items: Vec<_> = tasks.iter().map(catalog_item_for_task).collect();
    let run = service
        .generate_category_maintenance_schedules(provider.as_ref(), category, &items)
        .await?;

    let outcomes = match run {
        CategoryRun::Completed(outcomes) => outcomes,
        CategoryRun::Aborted { completed } => {
            println!(
                "Run cancelled after {} of {} items.",
                completed.len(),
                tasks.len()
            );
            completed
        }
        CategoryRun::CancelledInFlight => {
            println!("A run for '{}' was already in flight; asked it to stop.", category);
            return Ok(());
        }
    };

    let mut applied = 0;
    for (task, outcome) in tasks.iter().zip(&outcomes) {
        match outcome {
            ScheduleOutcome::Valid(result) => {
                if store.apply_ai_result(&task.id, result).is_some() {
                    applied += 1;
                    println!("  ok      {}", task.title);
                }
            }
            ScheduleOutcome::Invalid(diagnostic) => {
                println!("  failed  {} — {}", task.title, diagnostic.error);
            }
        }
    }
    println!("Applied {} of {} schedules.", applied, outcomes.len());
    if diagnostics {
        print_diagnostics(&service)?;
    }
    Ok(())
}

async fn run_suggest(
    cfg: &Config,
    store: &mut JsonFileStore,
    session_id: &str,
    apply: bool,
    provider_flag: Option<String>,
    api_key_flag: Option<String>,
) -> Result<()> {
    let response = store
        .response(session_id)
        .with_context(|| format!("No questionnaire response for session {}", session_id))?
        .clone();
    let assessment: PropertyAssessment = serde_json::from_str(&response.responses)
        .with_context(|| format!("Saved answers for session {} are not valid JSON", session_id))?;

    let provider_name = provider_flag.unwrap_or_else(|| cfg.ai.provider.clone());
    let api_key = resolve_api_key(&provider_name, api_key_flag)?;
    let provider = create_provider(&provider_name, api_key, &cfg.ai)?;

    let suggestions =
        generate_task_suggestions(provider.as_ref(), &response.property_type, &assessment).await?;
    if suggestions.is_empty() {
        println!("The provider returned no usable suggestions.");
        return Ok(());
    }

    for suggestion in &suggestions {
        println!(
            "{:<32} {:<10} {:<12} {}",
            suggestion.title, suggestion.priority, suggestion.category, suggestion.frequency
        );
    }

    if apply {
        for suggestion in &suggestions {
            let task = store.create_task(task_from_suggestion(suggestion, None));
            println!("  created {} ({})", task.title, task.id);
        }
        println!("Created {} task(s).", suggestions.len());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    let mut store = JsonFileStore::open(&cfg.storage.path);

    match cli.command {
        Commands::Init => {
            // open() already seeds an empty store
            println!(
                "Store initialized at {} with {} templates.",
                cfg.storage.path.display(),
                store.templates().len()
            );
        }
        Commands::Seed { file } => {
            let added = store.seed_from_catalog_file(&file)?;
            println!("Imported {} new tasks from {}.", added, file.display());
        }
        Commands::Templates => {
            for template in store.templates() {
                println!(
                    "{}  {:<24} {:<16} {} tasks",
                    template.id, template.name, template.template_type, template.task_count
                );
            }
        }
        Commands::Tasks {
            category,
            priority,
            status,
            search,
            template,
        } => {
            let filters = TaskFilters {
                category,
                priority,
                status,
                search,
                template_id: template,
            };
            let tasks = store.tasks(&filters);
            for task in &tasks {
                let next = task
                    .next_maintenance_date
                    .minor
                    .as_deref()
                    .unwrap_or("unscheduled");
                println!(
                    "{}  {:<32} {:<10} {:<10} next: {}",
                    task.id, task.title, task.priority, task.status, next
                );
            }
            println!("{} task(s).", tasks.len());
        }
        Commands::Schedule {
            task_id,
            provider,
            api_key,
            diagnostics,
        } => {
            run_schedule(&cfg, &mut store, &task_id, provider, api_key, diagnostics).await?;
        }
        Commands::ScheduleCategory {
            category,
            provider,
            api_key,
            diagnostics,
        } => {
            run_schedule_category(&cfg, &mut store, &category, provider, api_key, diagnostics)
                .await?;
        }
        Commands::Respond {
            session_id,
            file,
            property_type,
        } => {
            let answers = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read answers file: {}", file.display()))?;
            // fail here rather than at suggestion time
            serde_json::from_str::<PropertyAssessment>(&answers)
                .with_context(|| "Answers file is not a valid assessment")?;
            let response = store.save_response(&session_id, answers, &property_type);
            println!(
                "Saved questionnaire response {} for session {}.",
                response.id, session_id
            );
        }
        Commands::Suggest {
            session_id,
            apply,
            provider,
            api_key,
        } => {
            run_suggest(&cfg, &mut store, &session_id, apply, provider, api_key).await?;
        }
        Commands::Gaps {
            property_info,
            provider,
            api_key,
        } => {
            let titles: Vec<String> = store
                .tasks(&TaskFilters::default())
                .iter()
                .map(|t| t.title.clone())
                .collect();
            let provider_name = provider.unwrap_or_else(|| cfg.ai.provider.clone());
            let key = resolve_api_key(&provider_name, api_key)?;
            let provider = create_provider(&provider_name, key, &cfg.ai)?;
            let suggestions =
                generate_quick_suggestions(provider.as_ref(), &titles, &property_info).await?;
            if suggestions.is_empty() {
                println!("The provider returned no usable suggestions.");
            }
            for suggestion in &suggestions {
                println!(
                    "{:<32} {:<10} {:<12} {}",
                    suggestion.title, suggestion.priority, suggestion.category, suggestion.frequency
                );
                println!("    {}", suggestion.reasoning);
            }
        }
    }

    Ok(())
}
