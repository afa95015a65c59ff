//! Scheduled task persistence
//!
//! Tasks live in `schedules/tasks.json`. The engine only validates the
//! cron expression, computes next runs, and records executions;
//! installing OS-level timers is the wrapper's concern.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use cron::Schedule;
use serde::{Deserialize, Serialize};

/// One scheduled task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub id: String,
    pub name: String,
    /// Agent the task runs (`agent run <agent> <args>`)
    pub agent: String,
    /// Standard 5-field POSIX cron expression
    pub cron: String,
    #[serde(default)]
    pub args: String,
    pub enabled: bool,
    pub created: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<String>,
}

/// Validate a 5-field POSIX cron expression
///
/// The `cron` crate wants a seconds field, so a zero is prepended
/// before parsing.
pub fn parse_cron(expression: &str) -> Result<Schedule> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    if fields.len() != 5 {
        bail!(
            "cron expression must have 5 fields (minute hour day month weekday), got {}",
            fields.len()
        );
    }
    let with_seconds = format!("0 {}", expression);
    Schedule::from_str(&with_seconds)
        .with_context(|| format!("invalid cron expression '{}'", expression))
}

/// Next fire time of a 5-field expression after `after`
pub fn next_run(expression: &str, after: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
    let schedule = parse_cron(expression)?;
    Ok(schedule.after(&after).next())
}

/// Human-readable rendering for the common expression shapes
pub fn describe_cron(expression: &str) -> String {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    if fields.len() != 5 {
        return expression.to_string();
    }
    let (minute, hour, dom, month, dow) = (fields[0], fields[1], fields[2], fields[3], fields[4]);

    match (minute, hour, dom, month, dow) {
        ("*", "*", "*", "*", "*") => "every minute".to_string(),
        (m, "*", "*", "*", "*") if m.starts_with("*/") => {
            format!("every {} minutes", &m[2..])
        }
        ("0", "*", "*", "*", "*") => "every hour".to_string(),
        (m, h, "*", "*", "*") if is_number(m) && is_number(h) => {
            format!("daily at {:0>2}:{:0>2}", h, m)
        }
        (m, h, "*", "*", dow) if is_number(m) && is_number(h) && is_number(dow) => {
            format!("{} at {:0>2}:{:0>2}", weekday_name(dow), h, m)
        }
        (m, h, dom, "*", "*") if is_number(m) && is_number(h) && is_number(dom) => {
            format!("monthly on day {} at {:0>2}:{:0>2}", dom, h, m)
        }
        _ => expression.to_string(),
    }
}

fn is_number(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

fn weekday_name(dow: &str) -> &'static str {
    match dow {
        "0" | "7" => "every Sunday",
        "1" => "every Monday",
        "2" => "every Tuesday",
        "3" => "every Wednesday",
        "4" => "every Thursday",
        "5" => "every Friday",
        "6" => "every Saturday",
        _ => "weekly",
    }
}

/// Loads and saves `tasks.json`
#[derive(Debug, Clone)]
pub struct TaskStore {
    path: PathBuf,
    tasks: Vec<ScheduledTask>,
}

impl TaskStore {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let tasks = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?
        } else {
            Vec::new()
        };
        Ok(Self { path, tasks })
    }

    pub fn tasks(&self) -> &[ScheduledTask] {
        &self.tasks
    }

    /// Add a task, validating the cron expression first
    pub fn add(&mut self, name: &str, agent: &str, cron: &str, args: &str) -> Result<&ScheduledTask> {
        parse_cron(cron)?;

        let id = format!("task-{:04}", self.next_id());
        self.tasks.push(ScheduledTask {
            id,
            name: name.to_string(),
            agent: agent.to_string(),
            cron: cron.to_string(),
            args: args.to_string(),
            enabled: true,
            created: Utc::now().to_rfc3339(),
            last_run: None,
        });
        self.save()?;
        Ok(self.tasks.last().expect("just pushed"))
    }

    fn next_id(&self) -> usize {
        self.tasks
            .iter()
            .filter_map(|t| t.id.strip_prefix("task-"))
            .filter_map(|n| n.parse::<usize>().ok())
            .max()
            .unwrap_or(0)
            + 1
    }

    pub fn get(&self, id: &str) -> Option<&ScheduledTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn remove(&mut self, id: &str) -> Result<()> {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            bail!("no task with id '{}'", id);
        }
        self.save()
    }

    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<()> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .with_context(|| format!("no task with id '{}'", id))?;
        task.enabled = enabled;
        self.save()
    }

    /// Stamp a task as just executed
    pub fn mark_run(&mut self, id: &str) -> Result<()> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .with_context(|| format!("no task with id '{}'", id))?;
        task.last_run = Some(Utc::now().to_rfc3339());
        self.save()
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.tasks)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("writing {}", self.path.display()))
    }
}
