//! ODAVL CLI
//!
//! The `odavl` command manages baselines and pattern memory and replays
//! recorded stage outputs through the decision core.
//!
//! ## Commands
//!
//! - `baseline`: create, list, show, delete and diff named baselines
//! - `memory`: inspect the learned-pattern store
//! - `fingerprint`: print stable issue fingerprints
//! - `fuse`: fuse recorded stage outputs into a decision report

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use tracing::Level;

use odavl_core::{
    fuse, git, render_report_md, BaselineMatcher, BaselineMeta, BaselineStore, BrainConfig,
    FingerprintEngine, FusionInputs, InsightResult, Issue, MemoryManager, OdavlError,
    PatternQuery,
};

#[derive(Parser)]
#[command(name = "odavl")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "ODAVL decision core: baselines, pattern memory and release fusion", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Workspace root
    #[arg(short, long, global = true, default_value = ".", env = "ODAVL_WORKSPACE")]
    workspace: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage baselines
    Baseline {
        #[command(subcommand)]
        action: BaselineAction,
    },

    /// Inspect pattern memory
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },

    /// Print the fingerprint of every issue in a file
    Fingerprint {
        /// Issues file (JSON array of issues or an analysis result)
        issues: PathBuf,
    },

    /// Fuse recorded stage outputs into a decision report
    Fuse {
        /// Fusion inputs (JSON)
        inputs: PathBuf,

        /// Brain config (default: <workspace>/.odavl/brain.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,
    },
}

#[derive(Subcommand)]
enum BaselineAction {
    /// Snapshot issues as a named baseline
    Create {
        /// Issues file (JSON array of issues or an analysis result)
        #[arg(short, long)]
        issues: PathBuf,

        #[arg(short, long, default_value = odavl_core::DEFAULT_BASELINE)]
        name: String,

        /// Git SHA to stamp (auto-detected from the workspace if omitted)
        #[arg(long)]
        git_sha: Option<String>,
    },

    /// List baselines
    List,

    /// Show one baseline as JSON
    Show {
        #[arg(default_value = odavl_core::DEFAULT_BASELINE)]
        name: String,
    },

    /// Delete a baseline
    Delete { name: String },

    /// Diff an issues file against a baseline
    Diff {
        #[arg(short, long)]
        issues: PathBuf,

        #[arg(short, long, default_value = odavl_core::DEFAULT_BASELINE)]
        name: String,
    },
}

#[derive(Subcommand)]
enum MemoryAction {
    /// Entry count, size and age range
    Stats,

    /// Show stored entries, most recently seen first
    Show {
        /// Restrict to these error types
        #[arg(short = 't', long = "type")]
        types: Vec<String>,

        #[arg(short, long)]
        limit: Option<usize>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Markdown,
    Json,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IssuesFile {
    List(Vec<Issue>),
    Insight(InsightResult),
}

fn read_issues(path: &Path) -> Result<Vec<Issue>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let parsed: IssuesFile = serde_json::from_str(&content)
        .with_context(|| format!("{} is neither an issue list nor an analysis result", path.display()))?;
    Ok(match parsed {
        IssuesFile::List(issues) => issues,
        IssuesFile::Insight(result) => result.issues,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    odavl_core::init_tracing(cli.json, level);

    let workspace = cli.workspace;
    match cli.command {
        Commands::Baseline { action } => match action {
            BaselineAction::Create {
                issues,
                name,
                git_sha,
            } => cmd_baseline_create(&workspace, &issues, &name, git_sha).await,
            BaselineAction::List => cmd_baseline_list(&workspace).await,
            BaselineAction::Show { name } => cmd_baseline_show(&workspace, &name).await,
            BaselineAction::Delete { name } => cmd_baseline_delete(&workspace, &name).await,
            BaselineAction::Diff { issues, name } => {
                cmd_baseline_diff(&workspace, &issues, &name).await
            }
        },
        Commands::Memory { action } => match action {
            MemoryAction::Stats => cmd_memory_stats(&workspace).await,
            MemoryAction::Show { types, limit } => cmd_memory_show(&workspace, types, limit).await,
        },
        Commands::Fingerprint { issues } => cmd_fingerprint(&workspace, &issues),
        Commands::Fuse {
            inputs,
            config,
            format,
        } => cmd_fuse(&workspace, &inputs, config.as_deref(), format),
    }
}

async fn cmd_baseline_create(
    workspace: &Path,
    issues_path: &Path,
    name: &str,
    git_sha: Option<String>,
) -> Result<()> {
    let issues = read_issues(issues_path)?;
    let git_commit = git_sha.or_else(|| git::head_commit_if_available(workspace));
    let store = BaselineStore::new(workspace);
    let baseline = store
        .create(
            name,
            issues,
            BaselineMeta {
                git_commit,
                ..BaselineMeta::default()
            },
        )
        .await?;

    println!(
        "Baseline '{}' created: {} issue(s) in {} file(s)",
        baseline.name, baseline.metadata.total_issues, baseline.metadata.total_files
    );
    if let Some(sha) = &baseline.metadata.git_commit {
        println!("  commit: {}", git::short_sha(sha));
    }
    Ok(())
}

async fn cmd_baseline_list(workspace: &Path) -> Result<()> {
    let baselines = BaselineStore::new(workspace).list().await?;
    if baselines.is_empty() {
        println!("No baselines found. Run 'odavl baseline create' first.");
        return Ok(());
    }
    for b in baselines {
        println!(
            "{:<20} {:>6} issue(s)  {}",
            b.name,
            b.metadata.total_issues,
            b.metadata.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    Ok(())
}

async fn cmd_baseline_show(workspace: &Path, name: &str) -> Result<()> {
    let baseline = BaselineStore::new(workspace).load(name).await?;
    println!("{}", serde_json::to_string_pretty(&baseline)?);
    Ok(())
}

async fn cmd_baseline_delete(workspace: &Path, name: &str) -> Result<()> {
    BaselineStore::new(workspace).delete(name).await?;
    println!("Baseline '{name}' deleted");
    Ok(())
}

async fn cmd_baseline_diff(workspace: &Path, issues_path: &Path, name: &str) -> Result<()> {
    let current = read_issues(issues_path)?;
    let baseline = match BaselineStore::new(workspace).load(name).await {
        Ok(b) => b,
        Err(OdavlError::BaselineNotFound { .. }) => {
            bail!("Baseline '{name}' not found. Run 'odavl baseline create --name {name}' first.")
        }
        Err(e) => return Err(e.into()),
    };

    let matcher = BaselineMatcher::new(FingerprintEngine::with_root(workspace));
    let diff = matcher.diff(&baseline, &current);
    println!("{}", serde_json::to_string_pretty(&diff)?);
    if diff.has_regressions() {
        eprintln!("{} new issue(s) relative to '{name}'", diff.new.len());
        std::process::exit(1);
    }
    Ok(())
}

/// Memory store at the default location, budgeted by `brain.toml`.
fn memory_manager(workspace: &Path) -> Result<MemoryManager> {
    let config = BrainConfig::from_workspace(workspace)?;
    Ok(MemoryManager::for_workspace(workspace).with_config(config.memory)?)
}

async fn cmd_memory_stats(workspace: &Path) -> Result<()> {
    let manager = memory_manager(workspace)?;
    let stats = manager.stats().await?;
    println!("path:    {}", manager.path().display());
    println!("entries: {}", stats.entries);
    println!("bytes:   {} / {}", stats.bytes, manager.config().max_bytes);
    if let (Some(oldest), Some(newest)) = (stats.oldest, stats.newest) {
        println!("seen:    {oldest} .. {newest}");
    }
    Ok(())
}

async fn cmd_memory_show(workspace: &Path, types: Vec<String>, limit: Option<usize>) -> Result<()> {
    let manager = memory_manager(workspace)?;
    let entries = manager.try_load().await?;
    let query = PatternQuery {
        error_types: types,
        limit,
    };
    println!("{}", serde_json::to_string_pretty(&query.apply(&entries))?);
    Ok(())
}

fn cmd_fingerprint(workspace: &Path, issues_path: &Path) -> Result<()> {
    let engine = FingerprintEngine::with_root(workspace);
    for issue in read_issues(issues_path)? {
        println!(
            "{}  {}:{}  {}",
            engine.fingerprint(&issue).short(),
            engine.relative_path(&issue.file),
            issue.line,
            issue.issue_type
        );
    }
    Ok(())
}

fn cmd_fuse(
    workspace: &Path,
    inputs_path: &Path,
    config_path: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let config = match config_path {
        Some(path) => BrainConfig::load(path)?,
        None => BrainConfig::from_workspace(workspace)?,
    };
    let content = std::fs::read_to_string(inputs_path)
        .with_context(|| format!("Failed to read {}", inputs_path.display()))?;
    let inputs: FusionInputs =
        serde_json::from_str(&content).context("Failed to parse fusion inputs")?;

    let _span = odavl_core::obs::PipelineSpan::enter("offline", &workspace.display().to_string());
    let report = fuse(&inputs, &config);
    match format {
        OutputFormat::Markdown => print!("{}", render_report_md(&report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_baseline_diff() {
        let cli = Cli::try_parse_from([
            "odavl", "-w", "/repo", "baseline", "diff", "--issues", "cur.json", "--name", "rel",
        ])
        .unwrap();
        assert_eq!(cli.workspace, PathBuf::from("/repo"));
        match cli.command {
            Commands::Baseline {
                action: BaselineAction::Diff { issues, name },
            } => {
                assert_eq!(issues, PathBuf::from("cur.json"));
                assert_eq!(name, "rel");
            }
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn read_issues_accepts_both_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("list.json");
        let insight = dir.path().join("insight.json");
        let issue = r#"{"file":"a.ts","line":1,"severity":"high","type":"xss","detector":"security","message":"m"}"#;
        std::fs::write(&list, format!("[{issue}]")).unwrap();
        std::fs::write(&insight, format!("{{\"issues\":[{issue}]}}")).unwrap();

        assert_eq!(read_issues(&list).unwrap().len(), 1);
        assert_eq!(read_issues(&insight).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn baseline_create_accepts_non_ascii_git_sha() {
        let dir = tempfile::tempdir().unwrap();
        let issues = dir.path().join("issues.json");
        std::fs::write(&issues, "[]").unwrap();

        cmd_baseline_create(dir.path(), &issues, "main", Some("aéééééééééé".into()))
            .await
            .unwrap();

        let stored = BaselineStore::new(dir.path()).load("main").await.unwrap();
        assert_eq!(stored.metadata.git_commit.as_deref(), Some("aéééééééééé"));
    }

    #[test]
    fn cli_verify_structure() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
