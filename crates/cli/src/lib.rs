pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use commands::alerts::AlertsArgs;
use commands::diff::DiffArgs;
use commands::simulate::SimulateArgs;
use commands::CommandResult;

#[derive(Debug, Parser)]
#[command(
    name = "adpush",
    about = "Ad-spend change-control CLI",
    long_about = "Diff campaign snapshots, evaluate spend guardrails, persist rollback \
                  manifests, and simulate rollbacks.",
    after_help = "Examples:\n  adpush diff --baseline baseline.json --proposed proposed.json --tenant acme\n  adpush simulate --tenant acme --run-id run-1\n  adpush alerts --limit 10"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Diff a baseline snapshot against a proposed one and persist the artifacts")]
    Diff {
        #[arg(long, help = "Path to the baseline entity payload (json)")]
        baseline: PathBuf,
        #[arg(long, help = "Path to the proposed entity payload (json)")]
        proposed: PathBuf,
        #[arg(long, help = "Path to the guardrail configuration (json); defaults apply if omitted")]
        guardrails: Option<PathBuf>,
        #[arg(long = "tenant", help = "Tenant the run belongs to")]
        tenant_id: String,
        #[arg(long, help = "Run identifier; generated when omitted")]
        run_id: Option<String>,
        #[arg(long, default_value = "automated", help = "Generation mode recorded on the artifact")]
        mode: String,
        #[arg(long, help = "Window start (RFC 3339)")]
        window_start: Option<String>,
        #[arg(long, help = "Window end (RFC 3339)")]
        window_end: Option<String>,
        #[arg(long = "note", help = "Free-form note attached to the artifacts; repeatable")]
        notes: Vec<String>,
        #[arg(long, help = "Identifier of the allocator plan that produced the proposal")]
        source_plan_id: Option<String>,
        #[arg(long, default_value = ".adpush", help = "Artifact store root directory")]
        store_dir: PathBuf,
    },
    #[command(about = "Simulate the rollback actions for a persisted manifest")]
    Simulate {
        #[arg(long = "tenant", help = "Tenant the manifest belongs to")]
        tenant_id: String,
        #[arg(long, help = "Run identifier; the tenant's latest manifest when omitted")]
        run_id: Option<String>,
        #[arg(long, default_value = ".adpush", help = "Artifact store root directory")]
        store_dir: PathBuf,
    },
    #[command(about = "Print the bounded automation alert history, most recent first")]
    Alerts {
        #[arg(long, help = "Maximum number of alerts to print")]
        limit: Option<usize>,
        #[arg(long, default_value = ".adpush", help = "Artifact store root directory")]
        store_dir: PathBuf,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Diff {
            baseline,
            proposed,
            guardrails,
            tenant_id,
            run_id,
            mode,
            window_start,
            window_end,
            notes,
            source_plan_id,
            store_dir,
        } => {
            let window_start = match parse_window("window_start", window_start.as_deref()) {
                Ok(value) => value,
                Err(result) => return finish(result),
            };
            let window_end = match parse_window("window_end", window_end.as_deref()) {
                Ok(value) => value,
                Err(result) => return finish(result),
            };
            commands::diff::run(DiffArgs {
                baseline,
                proposed,
                guardrails,
                tenant_id,
                run_id: run_id.unwrap_or_else(|| format!("run-{}", Uuid::new_v4())),
                mode,
                window_start,
                window_end,
                notes,
                source_plan_id,
                store_dir,
            })
        }
        Command::Simulate { tenant_id, run_id, store_dir } => {
            commands::simulate::run(SimulateArgs { tenant_id, run_id, store_dir })
        }
        Command::Alerts { limit, store_dir } => {
            commands::alerts::run(AlertsArgs { store_dir, limit })
        }
    };

    finish(result)
}

fn parse_window(
    name: &str,
    raw: Option<&str>,
) -> Result<Option<DateTime<Utc>>, CommandResult> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| Some(parsed.with_timezone(&Utc)))
        .map_err(|error| {
            CommandResult::failure(
                "diff",
                "window_parse",
                format!("invalid {name} {raw:?}: {error}"),
                2,
            )
        })
}

fn finish(result: CommandResult) -> ExitCode {
    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
