use clap::{Parser, Subcommand};
use liftplan_core::history::load_history_dir;
use liftplan_core::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "liftplan")]
#[command(about = "Strength workout plan generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: $XDG_CONFIG_HOME/liftplan/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a workout plan
    Generate {
        /// Workout context JSON (profile, progress, equipment, filters)
        #[arg(long)]
        context: Option<PathBuf>,

        /// Force a split instead of the recommended one
        #[arg(long, value_parser = parse_split)]
        split: Option<Split>,

        /// Free-text request passed to the oracle
        #[arg(long)]
        request: Option<String>,

        /// Previous plan to vary from
        #[arg(long)]
        previous: Option<PathBuf>,

        /// Directory holding sessions.jsonl / sessions.csv (default: data_dir)
        #[arg(long)]
        history_dir: Option<PathBuf>,

        /// Skip the oracle and build the plan from the catalog
        #[arg(long, conflicts_with = "replay")]
        offline: bool,

        /// Replay oracle responses from a JSON array instead of calling out
        #[arg(long)]
        replay: Option<PathBuf>,

        /// Also write the plan to this file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print the full generation report instead of the bare plan
        #[arg(long)]
        report: bool,
    },

    /// Print the context analysis as JSON
    Analyze {
        #[arg(long)]
        context: Option<PathBuf>,

        #[arg(long, value_parser = parse_split)]
        split: Option<Split>,

        #[arg(long)]
        history_dir: Option<PathBuf>,
    },

    /// Print the prompt that would be sent to the oracle
    Prompt {
        #[arg(long)]
        context: Option<PathBuf>,

        #[arg(long, value_parser = parse_split)]
        split: Option<Split>,

        #[arg(long)]
        request: Option<String>,

        #[arg(long)]
        history_dir: Option<PathBuf>,
    },

    /// Validate a plan file and print the result as JSON
    Validate {
        #[arg(long)]
        plan: PathBuf,

        /// Context supplying custom exercises and the workout type
        #[arg(long)]
        context: Option<PathBuf>,

        #[arg(long, value_parser = parse_workout_type)]
        workout_type: Option<WorkoutType>,
    },

    /// List catalog exercises
    Catalog {
        /// Only entries unlocked at this percentile
        #[arg(long, default_value_t = 100.0)]
        percentile: f64,

        /// Only entries usable with this equipment (comma separated)
        #[arg(long, value_delimiter = ',', value_parser = parse_equipment)]
        equipment: Option<Vec<Equipment>>,
    },
}

fn parse_split(s: &str) -> std::result::Result<Split, String> {
    s.parse().map_err(|e: Error| e.to_string())
}

fn parse_workout_type(s: &str) -> std::result::Result<WorkoutType, String> {
    s.parse().map_err(|e: Error| e.to_string())
}

fn parse_equipment(s: &str) -> std::result::Result<Equipment, String> {
    s.parse().map_err(|e: Error| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    liftplan_core::logging::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let catalog = get_default_catalog();
    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::CatalogValidation("Invalid catalog".into()));
    }

    match cli.command {
        Commands::Generate {
            context,
            split,
            request,
            previous,
            history_dir,
            offline,
            replay,
            output,
            report,
        } => {
            let ctx = load_context(context.as_deref(), history_dir.as_deref(), &config)?;
            let previous = previous
                .as_deref()
                .map(GeneratedWorkout::load)
                .transpose()?;
            let oracle = select_oracle(offline, replay.as_deref(), &config)?;
            cmd_generate(
                catalog,
                &ctx,
                oracle,
                config.oracle.max_retries,
                split,
                request.as_deref(),
                previous.as_ref(),
                output.as_deref(),
                report,
            )
            .await
        }
        Commands::Analyze {
            context,
            split,
            history_dir,
        } => {
            let ctx = load_context(context.as_deref(), history_dir.as_deref(), &config)?;
            let lookup = ExerciseLookup::new(catalog, &ctx.custom_exercises);
            let analysis = analyze_context(&ctx, &lookup, split);
            println!("{}", serde_json::to_string_pretty(&analysis)?);
            Ok(())
        }
        Commands::Prompt {
            context,
            split,
            request,
            history_dir,
        } => {
            let ctx = load_context(context.as_deref(), history_dir.as_deref(), &config)?;
            let lookup = ExerciseLookup::new(catalog, &ctx.custom_exercises);
            let analysis = analyze_context(&ctx, &lookup, split);
            let strategy = strategy_for(ctx.filters.workout_type);
            let prompt = strategy.build_prompt(&PromptRequest {
                context: &ctx,
                analysis: &analysis,
                catalog,
                custom_request: request.as_deref(),
                split,
                previous: None,
            });
            print!("{}", prompt);
            Ok(())
        }
        Commands::Validate {
            plan,
            context,
            workout_type,
        } => {
            let plan = GeneratedWorkout::load(&plan)?;
            let ctx = match context {
                Some(path) => Some(WorkoutContext::load(&path)?),
                None => None,
            };
            let custom = ctx
                .as_ref()
                .map(|c| c.custom_exercises.as_slice())
                .unwrap_or(&[]);
            let workout_type =
                workout_type.or_else(|| ctx.as_ref().and_then(|c| c.filters.workout_type));
            let strategy = strategy_for(workout_type);

            let result = validate_plan(
                &plan,
                &ExerciseLookup::new(catalog, custom),
                strategy.validation_policy(),
            );
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Commands::Catalog {
            percentile,
            equipment,
        } => {
            cmd_catalog(catalog, percentile, equipment.as_deref());
            Ok(())
        }
    }
}

/// Context file (or an empty context on configured equipment) plus the
/// history found in `history_dir` or the configured data directory
fn load_context(
    path: Option<&Path>,
    history_dir: Option<&Path>,
    config: &Config,
) -> Result<WorkoutContext> {
    let mut ctx = match path {
        Some(path) => WorkoutContext::load(path)?,
        None => WorkoutContext::new(chrono::Utc::now(), config.equipment.parsed()?),
    };
    config.generation.apply_to(&mut ctx.preferences);

    let dir = history_dir.unwrap_or(config.data.data_dir.as_path());
    let known: HashSet<_> = ctx.history.iter().map(|s| s.id).collect();
    let loaded = load_history_dir(dir)?;
    ctx.history
        .extend(loaded.into_iter().filter(|s| !known.contains(&s.id)));

    Ok(ctx)
}

/// Replies from a JSON array: strings are responses, `{"failure": "..."}`
/// entries are failed calls
fn load_replay(path: &Path) -> Result<Vec<ScriptedReply>> {
    let contents = std::fs::read_to_string(path)?;
    let values: Vec<serde_json::Value> = serde_json::from_str(&contents)?;

    values
        .into_iter()
        .map(|value| match value {
            serde_json::Value::String(text) => Ok(ScriptedReply::Text(text)),
            serde_json::Value::Object(map) => map
                .get("failure")
                .and_then(|f| f.as_str())
                .map(|f| ScriptedReply::Failure(f.to_string()))
                .ok_or_else(|| Error::Other("replay objects need a \"failure\" string".into())),
            other => Ok(ScriptedReply::Text(other.to_string())),
        })
        .collect()
}

fn select_oracle(
    offline: bool,
    replay: Option<&Path>,
    config: &Config,
) -> Result<Option<Box<dyn GenerationOracle>>> {
    if offline {
        return Ok(None);
    }
    if let Some(path) = replay {
        let replies = load_replay(path)?;
        tracing::info!("Replaying {} oracle responses from {:?}", replies.len(), path);
        return Ok(Some(Box::new(ScriptedOracle::new(replies))));
    }

    match HttpOracle::from_config(&config.oracle) {
        Ok(oracle) => Ok(Some(Box::new(oracle))),
        Err(Error::OracleUnavailable(reason)) => {
            tracing::info!("Generation oracle disabled: {}", reason);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[allow(clippy::too_many_arguments)]
async fn cmd_generate(
    catalog: &Catalog,
    ctx: &WorkoutContext,
    oracle: Option<Box<dyn GenerationOracle>>,
    max_retries: u32,
    split: Option<Split>,
    request: Option<&str>,
    previous: Option<&GeneratedWorkout>,
    output: Option<&Path>,
    report: bool,
) -> Result<()> {
    let mut generator = WorkoutGenerator::new(catalog).with_max_retries(max_retries);
    if let Some(oracle) = oracle {
        generator = generator.with_oracle(oracle);
    }

    let result = generator
        .generate_plan_with_report(ctx, request, split, previous)
        .await;

    if let Some(path) = output {
        result.plan.save(path)?;
    }

    if report {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&result.plan)?);
    }

    let source = match &result.origin {
        PlanOrigin::Oracle { attempts } => format!("oracle, {} attempt(s)", attempts),
        PlanOrigin::Fallback { reason } => format!("fallback, {:?}", reason),
    };
    eprintln!(
        "✓ {} ({} exercises, ~{} min) [{}; {} strategy]",
        result.plan.title,
        result.plan.exercises.len(),
        result.plan.estimated_duration,
        source,
        result.strategy
    );
    eprintln!(
        "  Validation: {} (score {})",
        if result.validation.is_valid { "valid" } else { "INVALID" },
        result.validation.score
    );
    for issue in &result.validation.critical_issues {
        eprintln!("  ✗ {}", issue);
    }

    Ok(())
}

fn cmd_catalog(catalog: &Catalog, percentile: f64, equipment: Option<&[Equipment]>) {
    let entries: Vec<&CatalogEntry> = match equipment {
        Some(equipment) => catalog.list_by_percentile_and_equipment(percentile, equipment, None),
        None => catalog
            .entries()
            .iter()
            .filter(|e| f64::from(e.percentile_tier) <= percentile)
            .collect(),
    };

    for entry in &entries {
        let equipment: Vec<&str> = entry.equipment.iter().map(|e| e.as_str()).collect();
        println!(
            "{:<28} {:<30} {:<11} {:>3}  {}",
            entry.id,
            entry.name,
            format!("{:?}", entry.category).to_lowercase(),
            entry.percentile_tier,
            equipment.join(",")
        );
    }
    eprintln!("{} exercises", entries.len());
}
