//! Per-user state directory layout
//!
//! Everything mnemo persists outside the backends lives under one
//! directory (default `~/.mnemo`, override with `MNEMO_HOME`):
//!
//! ```text
//! config.toml               global configuration
//! schedules/tasks.json      scheduled tasks
//! logs/deletions.jsonl      append-only deletion audit
//! logs/schedules/<id>.log   per-task run logs
//! research/reports/*.md     research agent output
//! research/todo.md          research queue
//! prds/*.md, prds/index.json
//! heartbeat.md              markdown checklist of pending tasks
//! agents/<name>/            custom-agent definitions
//! categories.json           repository category map
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Handle to the state directory
#[derive(Debug, Clone)]
pub struct StateDir {
    root: PathBuf,
}

impl StateDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tasks_file(&self) -> PathBuf {
        self.root.join("schedules").join("tasks.json")
    }

    pub fn deletions_log(&self) -> PathBuf {
        self.root.join("logs").join("deletions.jsonl")
    }

    pub fn schedule_log(&self, task_id: &str) -> PathBuf {
        self.root
            .join("logs")
            .join("schedules")
            .join(format!("{}.log", task_id))
    }

    pub fn research_reports(&self) -> PathBuf {
        self.root.join("research").join("reports")
    }

    pub fn research_todo(&self) -> PathBuf {
        self.root.join("research").join("todo.md")
    }

    pub fn prds_dir(&self) -> PathBuf {
        self.root.join("prds")
    }

    pub fn heartbeat(&self) -> PathBuf {
        self.root.join("heartbeat.md")
    }

    pub fn agents_dir(&self) -> PathBuf {
        self.root.join("agents")
    }

    pub fn agent_dir(&self, name: &str) -> PathBuf {
        self.agents_dir().join(name)
    }

    pub fn categories_file(&self) -> PathBuf {
        self.root.join("categories.json")
    }

    /// Create the standard subdirectories
    pub fn ensure_layout(&self) -> Result<()> {
        for dir in [
            self.root.clone(),
            self.root.join("schedules"),
            self.root.join("logs").join("schedules"),
            self.research_reports(),
            self.prds_dir(),
            self.agents_dir(),
        ] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("creating state directory {}", dir.display()))?;
        }
        Ok(())
    }
}

/// One entry of the heartbeat checklist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatTask {
    pub title: String,
    pub tags: Vec<String>,
    pub done: bool,
}

/// Parse `heartbeat.md` checklist lines: `- [ ] title #tag`
pub fn parse_heartbeat(content: &str) -> Vec<HeartbeatTask> {
    content
        .lines()
        .filter_map(|line| {
            let trimmed = line.trim_start();
            let (done, rest) = if let Some(rest) = trimmed.strip_prefix("- [ ] ") {
                (false, rest)
            } else if let Some(rest) = trimmed.strip_prefix("- [x] ") {
                (true, rest)
            } else {
                return None;
            };

            let mut tags = Vec::new();
            let mut title_words = Vec::new();
            for word in rest.split_whitespace() {
                if let Some(tag) = word.strip_prefix('#') {
                    if !tag.is_empty() {
                        tags.push(tag.to_string());
                        continue;
                    }
                }
                title_words.push(word);
            }

            let title = title_words.join(" ");
            (!title.is_empty()).then_some(HeartbeatTask { title, tags, done })
        })
        .collect()
}

/// Skills attached to a custom agent (`agents/<name>/skills.json`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentSkills {
    #[serde(default)]
    pub skills: Vec<String>,
}

/// A custom agent on disk
#[derive(Debug, Clone)]
pub struct CustomAgent {
    pub name: String,
    pub readme: Option<String>,
    pub skills: AgentSkills,
}

/// Create a custom agent directory with a README and empty skills
pub fn create_agent(state: &StateDir, name: &str, description: &str) -> Result<PathBuf> {
    let dir = state.agent_dir(name);
    if dir.exists() {
        anyhow::bail!("agent '{}' already exists", name);
    }
    std::fs::create_dir_all(&dir)?;

    let readme = format!("# {}\n\n{}\n", name, description);
    std::fs::write(dir.join("README.md"), readme)?;
    std::fs::write(
        dir.join("skills.json"),
        serde_json::to_string_pretty(&AgentSkills::default())?,
    )?;

    Ok(dir)
}

/// List custom agents by directory name
pub fn list_agents(state: &StateDir) -> Result<Vec<String>> {
    let dir = state.agents_dir();
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut names: Vec<String> = std::fs::read_dir(&dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    Ok(names)
}

/// Load one custom agent
pub fn load_agent(state: &StateDir, name: &str) -> Result<CustomAgent> {
    let dir = state.agent_dir(name);
    if !dir.exists() {
        anyhow::bail!("agent '{}' not found", name);
    }

    let readme = std::fs::read_to_string(dir.join("README.md")).ok();
    let skills = std::fs::read_to_string(dir.join("skills.json"))
        .ok()
        .and_then(|content| serde_json::from_str(&content).ok())
        .unwrap_or_default();

    Ok(CustomAgent {
        name: name.to_string(),
        readme,
        skills,
    })
}

/// Append a skill to a custom agent
pub fn add_skill(state: &StateDir, name: &str, skill: &str) -> Result<()> {
    let mut agent = load_agent(state, name)?;
    if agent.skills.skills.iter().any(|s| s == skill) {
        return Ok(());
    }
    agent.skills.skills.push(skill.to_string());
    std::fs::write(
        state.agent_dir(name).join("skills.json"),
        serde_json::to_string_pretty(&agent.skills)?,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> (tempfile::TempDir, StateDir) {
        let dir = tempfile::tempdir().unwrap();
        let state = StateDir::new(dir.path());
        state.ensure_layout().unwrap();
        (dir, state)
    }

    #[test]
    fn test_layout_paths() {
        let (_guard, state) = state();
        assert!(state.tasks_file().ends_with("schedules/tasks.json"));
        assert!(state.deletions_log().ends_with("logs/deletions.jsonl"));
        assert!(state.research_reports().exists());
        assert!(state.prds_dir().exists());
    }

    #[test]
    fn test_parse_heartbeat() {
        let content = "\
# Heartbeat

- [ ] review deployment notes #ops
- [x] archive old reports #cleanup #weekly
- [ ] plain task without tag
not a task line
";
        let tasks = parse_heartbeat(content);
        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[0].title, "review deployment notes");
        assert_eq!(tasks[0].tags, vec!["ops"]);
        assert!(!tasks[0].done);
        assert!(tasks[1].done);
        assert_eq!(tasks[1].tags, vec!["cleanup", "weekly"]);
        assert!(tasks[2].tags.is_empty());
    }

    #[test]
    fn test_agent_lifecycle() {
        let (_guard, state) = state();

        create_agent(&state, "curator", "Curates the weekly digest").unwrap();
        assert_eq!(list_agents(&state).unwrap(), vec!["curator"]);

        add_skill(&state, "curator", "summarize").unwrap();
        add_skill(&state, "curator", "summarize").unwrap(); // idempotent

        let agent = load_agent(&state, "curator").unwrap();
        assert_eq!(agent.skills.skills, vec!["summarize"]);
        assert!(agent.readme.unwrap().contains("Curates"));

        // Duplicate creation is refused
        assert!(create_agent(&state, "curator", "again").is_err());
    }
}
