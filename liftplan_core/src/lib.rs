#![forbid(unsafe_code)]

//! Core domain model and generation pipeline for liftplan.
//!
//! This crate provides:
//! - Domain types (catalog entries, context, analysis, plans)
//! - Catalog management
//! - Context analysis and prompt strategies
//! - Plan validation, the retry controller and the fallback planner
//! - Generation oracles (HTTP and scripted)
//! - Persistence (history, plan and context files) and configuration

pub mod types;
pub mod error;
pub mod rules;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod analysis;
pub mod prompt;
pub mod validator;
pub mod response;
pub mod oracle;
pub mod retry;
pub mod fallback;
pub mod generator;
pub mod history;
pub mod persist;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_catalog, get_default_catalog, Catalog, ExerciseCatalog, ExerciseLookup};
pub use config::Config;
pub use analysis::analyze_context;
pub use prompt::{strategy_for, PromptRequest, PromptStrategy};
pub use validator::{validate_plan, ValidationPolicy};
pub use oracle::{GenerationOracle, HttpOracle, ScriptedOracle, ScriptedReply};
pub use fallback::build_fallback_plan;
pub use generator::{FallbackReason, GenerationReport, PlanOrigin, WorkoutGenerator};
pub use history::load_history;
