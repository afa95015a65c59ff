//! `mnemo agent` command group
//!
//! A thin dispatcher over core operations. Built-in agents map onto the
//! coordinator and consolidation engine; custom agents are directories
//! under `agents/<name>/` with a README and a skills file.

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use mnemo_consolidate::Consolidator;
use tracing::info;

use super::memory::{ingest_content, parse_metadata};
use super::{print_json, App};
use crate::state;

#[derive(Subcommand, Debug)]
pub enum AgentCommand {
    /// Run an agent
    Run(RunArgs),
    /// Create a custom agent
    Create(CreateArgs),
    /// List custom agents
    List,
    /// Show the skills of one agent, or all agents
    Skills(SkillsArgs),
    /// Attach a skill to a custom agent
    AddSkill(AddSkillArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Agent name: librarian, consolidator, deleter, consultant,
    /// researcher, auto-researcher, proactive, or a custom agent
    pub name: String,

    /// Agent arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    pub name: String,

    /// One-line description for the README
    #[arg(short, long, default_value = "Custom agent")]
    pub description: String,
}

#[derive(Args, Debug)]
pub struct SkillsArgs {
    pub name: Option<String>,
}

#[derive(Args, Debug)]
pub struct AddSkillArgs {
    pub agent: String,
    pub skill: String,
}

pub async fn run(app: &App, command: AgentCommand) -> Result<()> {
    match command {
        AgentCommand::Run(args) => run_agent(app, args).await,
        AgentCommand::Create(args) => {
            let dir = state::create_agent(&app.state, &args.name, &args.description)?;
            println!("Created agent '{}' at {}", args.name, dir.display());
            Ok(())
        }
        AgentCommand::List => {
            for name in state::list_agents(&app.state)? {
                println!("{}", name);
            }
            Ok(())
        }
        AgentCommand::Skills(args) => skills(app, args),
        AgentCommand::AddSkill(args) => {
            state::add_skill(&app.state, &args.agent, &args.skill)?;
            println!("Added skill '{}' to '{}'", args.skill, args.agent);
            Ok(())
        }
    }
}

fn skills(app: &App, args: SkillsArgs) -> Result<()> {
    let names = match args.name {
        Some(name) => vec![name],
        None => state::list_agents(&app.state)?,
    };
    for name in names {
        let agent = state::load_agent(&app.state, &name)?;
        println!("{}: {}", name, agent.skills.skills.join(", "));
    }
    Ok(())
}

async fn run_agent(app: &App, args: RunArgs) -> Result<()> {
    match args.name.as_str() {
        "librarian" => librarian(app, &args.args).await,
        "consolidator" => consolidator(app).await,
        "deleter" => deleter(app, &args.args).await,
        "consultant" => consultant(app, &args.args).await,
        "researcher" | "auto-researcher" => researcher(app, &args.args).await,
        "proactive" => proactive(app).await,
        custom => run_custom(app, custom, &args.args).await,
    }
}

/// Ingest files, URLs or inline text
async fn librarian(app: &App, inputs: &[String]) -> Result<()> {
    if inputs.is_empty() {
        bail!("librarian needs at least one file, URL or text argument");
    }

    let store = app.connect().await?;
    for input in inputs {
        let ids = ingest_content(&store, input, parse_metadata(&[])?).await?;
        info!("librarian ingested '{}' as {} document(s)", input, ids.len());
        println!("{} -> {} document(s)", input, ids.len());
    }
    Ok(())
}

async fn consolidator(app: &App) -> Result<()> {
    let store = app.connect().await?;
    let mut engine = Consolidator::new(store);
    let report = engine.consolidate(false).await;
    print_json(&report)
}

async fn deleter(app: &App, args: &[String]) -> Result<()> {
    let Some(query) = args.first() else {
        bail!("deleter needs a query argument");
    };
    let confirm = args.iter().any(|a| a == "--confirm");

    super::memory::run(
        app,
        super::memory::MemoryCommand::Delete(super::memory::DeleteArgs {
            query: query.clone(),
            confirm,
            force: false,
        }),
    )
    .await
}

/// Answer a question from memory
async fn consultant(app: &App, args: &[String]) -> Result<()> {
    if args.is_empty() {
        bail!("consultant needs a question");
    }
    let question = args.join(" ");
    let store = app.connect().await?;
    let response = store.query(&question, 5, true).await;

    if response.vector_results.is_empty() && response.graph_results.is_empty() {
        println!("No relevant memory found for: {}", question);
        return Ok(());
    }

    println!("Relevant memory for: {}\n", question);
    for (rank, hit) in response.vector_results.iter().enumerate() {
        println!("{}. [{:.2}] {}", rank + 1, hit.score, hit.content.trim());
        if let Some(ref source) = hit.metadata.source {
            println!("   source: {}", source);
        }
    }
    Ok(())
}

/// Queue a research question and report what memory already holds
///
/// The web-search provider is an external collaborator; without one
/// configured this agent refuses with an actionable message.
async fn researcher(app: &App, args: &[String]) -> Result<()> {
    if app.config.research.provider.is_empty() {
        bail!(
            "no web search provider configured; set [research].provider \
             and {} in config.toml",
            app.config.research.api_key_env
        );
    }
    if args.is_empty() {
        bail!("researcher needs a question");
    }
    let question = args.join(" ");

    // Queue the question for the external search pass
    let todo_path = app.state.research_todo();
    if let Some(parent) = todo_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut todo = std::fs::read_to_string(&todo_path).unwrap_or_default();
    todo.push_str(&format!("- [ ] {}\n", question));
    std::fs::write(&todo_path, todo)?;

    // Report what internal memory already knows
    let store = app.connect().await?;
    let response = store.query(&question, 10, true).await;
    let report = format!(
        "# Research: {}\n\nInternal matches: {}\n\n{}",
        question,
        response.vector_results.len(),
        response
            .vector_results
            .iter()
            .map(|h| format!("- [{:.2}] {}\n", h.score, h.content.trim()))
            .collect::<String>()
    );

    let slug: String = question
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .take(48)
        .collect();
    let report_path = app.state.research_reports().join(format!("{}.md", slug));
    std::fs::write(&report_path, report)?;

    println!("Queued '{}' and wrote {}", question, report_path.display());
    Ok(())
}

/// Walk the heartbeat checklist and surface relevant memory
async fn proactive(app: &App) -> Result<()> {
    let heartbeat_path = app.state.heartbeat();
    if !heartbeat_path.exists() {
        println!("No heartbeat file at {}", heartbeat_path.display());
        return Ok(());
    }

    let content = std::fs::read_to_string(&heartbeat_path)?;
    let pending: Vec<_> = state::parse_heartbeat(&content)
        .into_iter()
        .filter(|t| !t.done)
        .collect();

    if pending.is_empty() {
        println!("Heartbeat is clear");
        return Ok(());
    }

    let store = app.connect().await?;
    for task in pending {
        let response = store.query(&task.title, 3, true).await;
        println!(
            "- {} ({} related memories)",
            task.title,
            response.vector_results.len()
        );
    }
    Ok(())
}

/// A custom agent queries memory with its skills as context
async fn run_custom(app: &App, name: &str, args: &[String]) -> Result<()> {
    let agent = state::load_agent(&app.state, name)
        .map_err(|_| anyhow::anyhow!("unknown agent '{}'; see 'mnemo agent list'", name))?;

    let query = if args.is_empty() {
        agent.skills.skills.join(" ")
    } else {
        args.join(" ")
    };
    if query.is_empty() {
        bail!("agent '{}' has no skills and no arguments were given", name);
    }

    let store = app.connect().await?;
    let response = store.query(&query, 5, true).await;
    println!(
        "{} found {} vector / {} graph results for '{}'",
        name,
        response.vector_results.len(),
        response.graph_results.len(),
        query
    );
    Ok(())
}
