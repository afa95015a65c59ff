//! `mnemo code-index` command

use anyhow::{bail, Result};
use clap::Args;
use mnemo_core::Category;
use mnemo_ingest::{parse_repo_url, CategoryManager, IndexOptions, RepoIndexer};

use super::{print_json, App};

#[derive(Args, Debug)]
pub struct CodeIndexArgs {
    /// Repository: owner/repo or a GitHub URL
    pub repo: String,

    /// Category: lefarma, e6labs, personal, opensource, hobby,
    /// trabajo, dependencias
    #[arg(short = 'c', long)]
    pub category: Option<String>,

    /// Re-index every file, ignoring stored commit SHAs
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Cap on files processed
    #[arg(short = 'l', long)]
    pub limit: Option<usize>,

    /// Extra exclude patterns, repeatable
    #[arg(short = 'e', long = "exclude")]
    pub exclude: Vec<String>,
}

pub async fn run(app: &App, args: CodeIndexArgs) -> Result<()> {
    let (owner, repo) = parse_repo_url(&args.repo)?;
    let repo_full_name = format!("{}/{}", owner, repo);

    // Category: explicit flag, then the persisted preference map
    let category = match args.category {
        Some(ref name) => match Category::parse(name) {
            Some(category) => Some(category),
            None => bail!(
                "invalid category '{}'; valid: {}",
                name,
                Category::ALL
                    .iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        },
        None => CategoryManager::load(app.state.categories_file())?.get(&repo_full_name),
    };

    // Remember an explicitly chosen category for next time
    if let (Some(category), Some(_)) = (category, args.category.as_ref()) {
        CategoryManager::load(app.state.categories_file())?.set(&repo_full_name, category)?;
    }

    let store = app.connect().await?;
    let indexer = RepoIndexer::new(store).await?;

    let report = indexer
        .index(
            &args.repo,
            IndexOptions {
                category,
                force: args.force,
                exclude_patterns: args.exclude,
                limit: args.limit,
            },
        )
        .await?;

    print_json(&report)
}
