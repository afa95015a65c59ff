//! `mnemo schedule` command group
//!
//! Persists tasks to `schedules/tasks.json` and can run one
//! immediately; installing OS-level timers is delegated to the wrapper.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Subcommand};
use tracing::info;

use super::{agent, App};
use crate::scheduler::{describe_cron, next_run, TaskStore};

#[derive(Subcommand, Debug)]
pub enum ScheduleCommand {
    /// Schedule an agent on a cron expression
    Add(AddArgs),
    /// List scheduled tasks
    List,
    /// Remove a task
    Remove(IdArgs),
    /// Enable a task
    Enable(IdArgs),
    /// Disable a task
    Disable(IdArgs),
    /// Run a task immediately
    Run(IdArgs),
    /// Show a task's run log
    Logs(IdArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Agent to run
    pub agent: String,

    /// 5-field POSIX cron expression
    #[arg(short = 'c', long)]
    pub cron: String,

    /// Arguments passed to the agent
    #[arg(short = 'a', long, default_value = "")]
    pub args: String,

    /// Task name; defaults to the agent name
    #[arg(short = 'n', long)]
    pub name: Option<String>,
}

#[derive(Args, Debug)]
pub struct IdArgs {
    pub id: String,
}

pub async fn run(app: &App, command: ScheduleCommand) -> Result<()> {
    let mut store = TaskStore::load(app.state.tasks_file())?;

    match command {
        ScheduleCommand::Add(args) => {
            let name = args.name.clone().unwrap_or_else(|| args.agent.clone());
            let task = store.add(&name, &args.agent, &args.cron, &args.args)?;
            println!(
                "Scheduled {} ({}): {}",
                task.id,
                task.name,
                describe_cron(&task.cron)
            );
            Ok(())
        }
        ScheduleCommand::List => {
            if store.tasks().is_empty() {
                println!("No scheduled tasks");
                return Ok(());
            }
            for task in store.tasks() {
                let next = next_run(&task.cron, Utc::now())
                    .ok()
                    .flatten()
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{}  {}  [{}]  {}  next: {}  last: {}",
                    task.id,
                    task.name,
                    if task.enabled { "on" } else { "off" },
                    describe_cron(&task.cron),
                    next,
                    task.last_run.as_deref().unwrap_or("-"),
                );
            }
            Ok(())
        }
        ScheduleCommand::Remove(args) => {
            store.remove(&args.id)?;
            println!("Removed {}", args.id);
            Ok(())
        }
        ScheduleCommand::Enable(args) => {
            store.set_enabled(&args.id, true)?;
            println!("Enabled {}", args.id);
            Ok(())
        }
        ScheduleCommand::Disable(args) => {
            store.set_enabled(&args.id, false)?;
            println!("Disabled {}", args.id);
            Ok(())
        }
        ScheduleCommand::Run(args) => run_task(app, &mut store, &args.id).await,
        ScheduleCommand::Logs(args) => {
            let path = app.state.schedule_log(&args.id);
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("no log at {}", path.display()))?;
            print!("{}", content);
            Ok(())
        }
    }
}

async fn run_task(app: &App, store: &mut TaskStore, id: &str) -> Result<()> {
    let task = store
        .get(id)
        .with_context(|| format!("no task with id '{}'", id))?
        .clone();

    info!("Running scheduled task {} ({})", task.id, task.agent);

    let agent_args: Vec<String> = task
        .args
        .split_whitespace()
        .map(|s| s.to_string())
        .collect();

    let result = agent::run(
        app,
        agent::AgentCommand::Run(agent::RunArgs {
            name: task.agent.clone(),
            args: agent_args,
        }),
    )
    .await;

    // Record the run whether or not the agent succeeded
    store.mark_run(id)?;
    let log_line = format!(
        "{} agent={} ok={}\n",
        Utc::now().to_rfc3339(),
        task.agent,
        result.is_ok()
    );
    let log_path = app.state.schedule_log(id);
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    use std::io::Write;
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?
        .write_all(log_line.as_bytes())?;

    result
}
