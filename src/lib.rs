//! # SimpleHome
//!
//! A local-first household maintenance tracker with AI-generated schedules.
//!
//! SimpleHome keeps a catalog of household items and their maintenance
//! cadence (minor and major) in a single JSON document on disk. An LLM
//! provider (OpenAI-style or Gemini-style) can be asked to generate or
//! refine a maintenance schedule for an item; the free-form provider output
//! is normalized into one canonical result shape, validated against a closed
//! structural schema, and either merged back into the stored task or
//! recorded as a diagnostic for operator inspection.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────┐   ┌───────────┐   ┌───────────┐
//! │  Providers   │──▶│ Normalizer │──▶│ Validator │──▶│   Store   │
//! │ OpenAI/Gemini│   │ alias+floor│   │  (closed) │   │ JSON file │
//! └──────────────┘   └────────────┘   └─────┬─────┘   └───────────┘
//!                                           │ on failure
//!                                           ▼
//!                                    ┌─────────────┐
//!                                    │ Diagnostics │
//!                                    │ ring buffer │
//!                                    └─────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`interval`] | Loose interval-word and date parsing |
//! | [`normalize`] | Provider output → canonical result |
//! | [`validate`] | Closed structural schema validation |
//! | [`providers`] | OpenAI-style and Gemini-style adapters |
//! | [`diagnostics`] | Bounded ring buffer of failures |
//! | [`schedule`] | Schedule generation service |
//! | [`suggest`] | Questionnaire-driven task suggestions |
//! | [`store`] | Storage reconciliation and JSON file store |

pub mod config;
pub mod diagnostics;
pub mod interval;
pub mod models;
pub mod normalize;
pub mod providers;
pub mod schedule;
pub mod store;
pub mod suggest;
pub mod validate;
