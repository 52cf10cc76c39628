//! Command-line entry point for the example catalog.
//!
//! Usage:
//!   example-docs list [--json]
//!   example-docs run-example --example hello_world
//!   example-docs deploy --list
//!   example-docs generate-docs -o docs -e .mdx --index
//!   example-docs test-plan --git-diff HEAD^..HEAD --format json

use anyhow::{Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use example_docs::config::run_timeout_from_env;
use example_docs::{
    ChangeSource, DocsConfig, Entry, ExampleCatalog, IndexStyle, Layout, PlanConfig, PlanFormat,
    format_plan, generate_docs, load_catalog, logging, plan_tests, run_entry,
};
use rand::seq::IndexedRandom;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "example-docs")]
#[command(about = "Discover, run, deploy, and document examples")]
struct Cli {
    /// Examples root; defaults to EXAMPLES_ROOT or the nearest examples/ directory.
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every discovered example and whether it deploys.
    List {
        /// Print the catalog as a JSON array instead.
        #[arg(long)]
        json: bool,
    },
    /// Run one example as a subprocess.
    RunExample(RunArgs),
    /// Run the deploy command of examples flagged `deploy: true`.
    Deploy(DeployArgs),
    /// Render examples into Markdown/MDX pages.
    GenerateDocs(DocsArgs),
    /// Select the examples affected by a set of changed files.
    TestPlan(PlanArgs),
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("target").required(true).args(["example", "random", "list"])))]
struct RunArgs {
    /// Exact path, stem, or path fragment of the example.
    #[arg(short, long)]
    example: Option<String>,
    /// Run a randomly chosen example.
    #[arg(short, long)]
    random: bool,
    /// List examples instead of running one.
    #[arg(short, long)]
    list: bool,
    /// Wall-clock limit in seconds (default: EXAMPLES_RUN_TIMEOUT_SECS or 600).
    #[arg(long)]
    timeout: Option<u64>,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("target").required(true).args(["example", "all", "list"])))]
struct DeployArgs {
    /// Deploy the example whose path equals or contains this value.
    #[arg(short, long)]
    example: Option<String>,
    /// Deploy every example marked for deployment.
    #[arg(short, long)]
    all: bool,
    /// Show what would be deployed without running anything.
    #[arg(short, long)]
    list: bool,
}

#[derive(Args, Debug)]
struct DocsArgs {
    #[arg(short, long, default_value = "docs")]
    output_dir: PathBuf,
    #[arg(short, long, default_value = ".mdx", value_parser = [".md", ".mdx"])]
    extension: String,
    #[arg(long, default_value = "flat", value_parser = ["flat", "categorized"])]
    layout: String,
    /// Also write an index page listing every generated page.
    #[arg(long)]
    index: bool,
    /// Heading of the index page.
    #[arg(long)]
    title: Option<String>,
    /// `cards` writes an MDX card overview instead of a listing (implies --index).
    #[arg(long, default_value = "listing", value_parser = ["listing", "cards"])]
    index_style: String,
    /// Link prefix of each card, followed by the page path without extension.
    #[arg(long)]
    card_href_prefix: Option<String>,
}

#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(["github_action", "git_diff", "changed_files"])
))]
struct PlanArgs {
    /// Read changed files from the event at GITHUB_EVENT_PATH.
    #[arg(long)]
    github_action: bool,
    /// Read changed files from `git diff --name-only RANGE`.
    #[arg(long, value_name = "RANGE")]
    git_diff: Option<String>,
    /// Changed files, relative to the repository root.
    #[arg(long, num_args = 1..)]
    changed_files: Vec<String>,
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    format: String,
    /// Exit 0 even when nothing needs testing.
    #[arg(long)]
    allow_empty: bool,
}

enum Status {
    Success,
    Failure,
}

impl Status {
    fn from_success(success: bool) -> Self {
        if success {
            Status::Success
        } else {
            Status::Failure
        }
    }
}

fn main() {
    match run() {
        Ok(Status::Success) => {}
        Ok(Status::Failure) => std::process::exit(1),
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<Status> {
    let cli = Cli::parse();
    logging::init()?;
    let catalog = load_catalog(cli.root.as_deref())?;
    report_rejected(&catalog);

    match cli.command {
        Command::List { json } => list(&catalog, json),
        Command::RunExample(args) => run_example(&catalog, args),
        Command::Deploy(args) => deploy(&catalog, args),
        Command::GenerateDocs(args) => docs(&catalog, args),
        Command::TestPlan(args) => test_plan(&catalog, args),
    }
}

fn report_rejected(catalog: &ExampleCatalog) {
    for rejected in catalog.rejected() {
        eprintln!(
            "warning: skipping {}: {}",
            rejected.path.display(),
            rejected.reason
        );
    }
}

fn list(catalog: &ExampleCatalog, json: bool) -> Result<Status> {
    if json {
        let export = serde_json::to_string_pretty(&catalog.to_json_value()?)
            .context("serializing catalog")?;
        println!("{export}");
        return Ok(Status::Success);
    }
    if catalog.is_empty() {
        println!("No examples found.");
        return Ok(Status::Success);
    }
    println!("Found {} examples:", catalog.len());
    for entry in catalog.sorted() {
        let marker = if entry.deploy_enabled() {
            "[deploy]"
        } else {
            "[ -    ]"
        };
        println!("{marker} {}", entry.repo_relative_path);
    }
    Ok(Status::Success)
}

fn run_example(catalog: &ExampleCatalog, args: RunArgs) -> Result<Status> {
    if args.list {
        return list(catalog, false);
    }
    let timeout = match args.timeout {
        Some(secs) => Duration::from_secs(secs),
        None => run_timeout_from_env()?,
    };

    let entry = match args.example.as_deref() {
        Some(query) => catalog.resolve(query).into_unique(query)?,
        None => {
            let candidates: Vec<&Entry> = catalog
                .modules()
                .filter(|entry| entry.pytest_enabled())
                .collect();
            match candidates.choose(&mut rand::rng()) {
                Some(entry) => *entry,
                None => {
                    println!("No examples found.");
                    return Ok(Status::Failure);
                }
            }
        }
    };

    println!("Running: {}", entry.repo_relative_path);
    println!("CLI args: {}", entry.command_line().unwrap_or_default());
    let outcome = run_entry(entry, catalog.root(), Some(timeout))?;
    println!("{}", outcome.describe());
    Ok(Status::from_success(outcome.is_success()))
}

fn deploy(catalog: &ExampleCatalog, args: DeployArgs) -> Result<Status> {
    if let Some(query) = args.example.as_deref() {
        let entry = catalog.resolve_deployable(query).into_unique(query)?;
        return Ok(Status::from_success(deploy_one(catalog, entry)?));
    }

    let candidates = catalog.deployable();
    if candidates.is_empty() {
        println!("No examples found to deploy");
        return Ok(Status::Success);
    }

    if args.list {
        println!(
            "Found {} examples that would be deployed:",
            candidates.len()
        );
        for entry in &candidates {
            println!("- {}", entry.repo_relative_path);
            println!("  Command: {}", entry.command_line().unwrap_or_default());
        }
        return Ok(Status::Success);
    }

    println!("Found {} examples to deploy", candidates.len());
    let mut failed = 0;
    for entry in &candidates {
        if !deploy_one(catalog, entry)? {
            failed += 1;
        }
    }
    if failed > 0 {
        println!("Failed to deploy {failed} examples");
        return Ok(Status::Failure);
    }
    println!("Successfully deployed {} examples", candidates.len());
    Ok(Status::Success)
}

fn deploy_one(catalog: &ExampleCatalog, entry: &Entry) -> Result<bool> {
    println!("Deploying {}...", entry.repo_relative_path);
    println!("Command: {}", entry.command_line().unwrap_or_default());
    let outcome = run_entry(entry, catalog.root(), None)?;
    if outcome.is_success() {
        println!("Successfully deployed {}", entry.repo_relative_path);
    } else {
        println!(
            "Failed to deploy {}: {}",
            entry.repo_relative_path,
            outcome.describe()
        );
    }
    Ok(outcome.is_success())
}

fn docs(catalog: &ExampleCatalog, args: DocsArgs) -> Result<Status> {
    if catalog.modules().next().is_none() {
        println!("No examples found.");
        return Ok(Status::Success);
    }
    let mut config = DocsConfig::from_env(args.output_dir);
    config.extension = args.extension;
    config.layout = args.layout.parse::<Layout>()?;
    config.index_style = args.index_style.parse::<IndexStyle>()?;
    config.index = args.index || config.index_style == IndexStyle::Cards;
    if let Some(title) = args.title {
        config.index_title = title;
    }
    if let Some(prefix) = args.card_href_prefix {
        config.card_href_prefix = prefix;
    }

    println!("Processing {} examples...", catalog.len());
    let summary = generate_docs(catalog, &config)?;
    for page in &summary.generated {
        println!("Generated: {}", config.output_dir.join(page).display());
    }
    for failure in &summary.failures {
        eprintln!("failed: {}: {}", failure.repo_relative_path, failure.error);
    }
    if let Some(index) = &summary.index {
        println!("Generated index: {}", index.display());
    }
    println!("{}", summary.summary_line());
    Ok(Status::from_success(summary.is_success()))
}

fn test_plan(catalog: &ExampleCatalog, args: PlanArgs) -> Result<Status> {
    let format = args.format.parse::<PlanFormat>()?;
    let source = if args.github_action {
        ChangeSource::github_event_from_env()?
    } else if let Some(range) = args.git_diff {
        ChangeSource::GitDiff {
            range,
            repo: catalog.root().to_path_buf(),
        }
    } else {
        ChangeSource::Files(args.changed_files)
    };

    let changed = source.changed_files()?;
    let plan = plan_tests(catalog, &changed, &PlanConfig::default());
    if let Some(trigger) = &plan.full_catalog_trigger {
        eprintln!("Internal tools changed ({trigger}), testing all examples");
    }
    println!("{}", format_plan(&plan, format)?);
    Ok(Status::from_success(!plan.is_empty() || args.allow_empty))
}
