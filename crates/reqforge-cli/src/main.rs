//! reqforge - requirement quality CLI
//!
//! Exposes the deterministic parts of the reqforge core. Evaluation and
//! repair need LLM-backed collaborators and are driven from library code.
//!
//! ## Commands
//!
//! - `check`: Run the structural health pre-check on a requirement
//! - `criteria`: List the active criteria in repair-phase order
//! - `score`: Aggregate a JSON score map through the tier scorer
//! - `artifact`: Verify and summarize a persisted validation artifact

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, Level};

use reqforge_core::metrics::METRICS;
use reqforge_core::telemetry::{init_tracing, LogFormat};
use reqforge_core::{
    check_health, read_validation_artifact, score_tiers, CriteriaRegistry, EvaluationSnapshot,
    HealthSeverity, TomlCriteriaSource,
};

#[derive(Parser)]
#[command(name = "reqforge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Requirement quality scoring and repair", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the structural health pre-check
    Check {
        /// Requirement text
        text: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List active criteria grouped by repair phase
    Criteria {
        /// Settings file with [[criteria]] entries (default: built-in table)
        #[arg(short, long, env = "REQFORGE_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Score a JSON map of criterion -> score
    Score {
        /// JSON file such as {"clarity": 0.8, "testability": 0.6}
        #[arg(short, long)]
        scores: PathBuf,

        /// Settings file with [[criteria]] entries (default: built-in table)
        #[arg(short, long, env = "REQFORGE_CONFIG")]
        config: Option<PathBuf>,

        /// Print the verdict as JSON
        #[arg(long)]
        json: bool,
    },

    /// Verify and summarize a stored validation artifact
    Artifact {
        /// Requirement ID the artifact was written for
        requirement_id: String,

        /// Root directory containing artifacts
        #[arg(long, default_value = ".reqforge/results")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    init_tracing(format, level);

    let outcome = match cli.command {
        Commands::Check { text, json } => cmd_check(&text, json),
        Commands::Criteria { config } => cmd_criteria(config.as_deref()).await,
        Commands::Score {
            scores,
            config,
            json,
        } => cmd_score(&scores, config.as_deref(), json).await,
        Commands::Artifact {
            requirement_id,
            dir,
        } => cmd_artifact(&requirement_id, &dir),
    };

    METRICS.flush();
    outcome
}

async fn load_registry(config: Option<&Path>) -> Result<CriteriaRegistry> {
    match config {
        Some(path) => {
            debug!(path = %path.display(), "loading criteria");
            CriteriaRegistry::load(&TomlCriteriaSource::new(path))
                .await
                .with_context(|| format!("Failed to load criteria from {}", path.display()))
        }
        None => Ok(CriteriaRegistry::builtin()),
    }
}

fn cmd_check(text: &str, json: bool) -> Result<()> {
    let report = check_health(text);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let status = if report.passed { "ok" } else { "FAILED" };
    println!("Health: {} ({} words)", status, report.word_count);
    for issue in &report.issues {
        let severity = match issue.severity {
            HealthSeverity::Critical => "critical",
            HealthSeverity::Warning => "warning",
        };
        println!("  [{}] {}", severity, issue.message);
    }
    println!("Guidance: {}", report.guidance);
    Ok(())
}

async fn cmd_criteria(config: Option<&Path>) -> Result<()> {
    let registry = load_registry(config).await?;

    if registry.is_empty() {
        println!("No active criteria");
        return Ok(());
    }

    for (phase, members) in registry.phases() {
        if members.is_empty() {
            continue;
        }
        println!("{}:", phase);
        for criterion in members {
            let cfg = registry.resolve(criterion);
            let fail_fast = if cfg.fail_fast { " fail-fast" } else { "" };
            println!(
                "  {:<20} {:<8} threshold={:.2} weight={:.2}{}",
                criterion.key(),
                cfg.tier.label(),
                cfg.threshold,
                cfg.weight,
                fail_fast
            );
        }
    }
    Ok(())
}

async fn cmd_score(scores: &Path, config: Option<&Path>, json: bool) -> Result<()> {
    let registry = load_registry(config).await?;
    let raw = std::fs::read_to_string(scores)
        .with_context(|| format!("Failed to read {}", scores.display()))?;
    let snapshot: EvaluationSnapshot =
        serde_json::from_str(&raw).context("Score file must map criterion keys to numbers")?;

    let verdict = score_tiers(&snapshot, &registry);

    if json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
        return Ok(());
    }

    println!(
        "Overall: {:.3} ({})",
        verdict.overall_score,
        if verdict.passed { "passed" } else { "not passed" }
    );
    println!(
        "Tiers: gating={:.3} priority={:.3} polish={:.3}",
        verdict.tier_averages.gating, verdict.tier_averages.priority, verdict.tier_averages.polish
    );
    for fb in &verdict.feedback {
        println!(
            "  #{} {:<20} {:.2} < {:.2}  {}",
            fb.priority_rank,
            fb.criterion.key(),
            fb.score,
            fb.threshold,
            fb.action
        );
    }
    Ok(())
}

fn cmd_artifact(requirement_id: &str, dir: &Path) -> Result<()> {
    let result = read_validation_artifact(requirement_id, dir)
        .with_context(|| format!("Failed to read artifact for {}", requirement_id))?;

    println!("{}", result.summary());
    println!("Final text: {}", result.final_text);
    if !result.split_children.is_empty() {
        for child in &result.split_children {
            println!("  - {}", child);
        }
    }
    Ok(())
}
