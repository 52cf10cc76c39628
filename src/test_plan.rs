//! Map changed repository paths back to the examples that need a re-run.

use crate::catalog::{Entry, ExampleCatalog};
use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;
use tracing::{debug, info};

pub const ENV_GITHUB_EVENT_PATH: &str = "GITHUB_EVENT_PATH";

const PACKAGE_INIT: &str = "__init__.py";
const MODULE_SUFFIX: &str = ".py";

/// Where the list of changed files comes from.
#[derive(Clone, Debug)]
pub enum ChangeSource {
    /// A GitHub Actions event payload on disk.
    GithubEvent(PathBuf),
    /// `git diff --name-only <range>` run inside `repo`.
    GitDiff { range: String, repo: PathBuf },
    Files(Vec<String>),
}

impl ChangeSource {
    /// The event payload named by `GITHUB_EVENT_PATH`.
    pub fn github_event_from_env() -> Result<Self> {
        match std::env::var_os(ENV_GITHUB_EVENT_PATH) {
            Some(path) if !path.is_empty() => Ok(ChangeSource::GithubEvent(PathBuf::from(path))),
            _ => bail!(
                "{ENV_GITHUB_EVENT_PATH} is not set; --github-action only works inside a GitHub Action"
            ),
        }
    }

    pub fn changed_files(&self) -> Result<Vec<String>> {
        match self {
            ChangeSource::GithubEvent(path) => changed_files_from_github_event(path),
            ChangeSource::GitDiff { range, repo } => changed_files_from_git_diff(range, repo),
            ChangeSource::Files(files) => Ok(files.clone()),
        }
    }
}

/// Changed paths listed in a pull-request event payload.
pub fn changed_files_from_github_event(path: &Path) -> Result<Vec<String>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading GitHub event {}", path.display()))?;
    let event: Value = serde_json::from_str(&raw)
        .with_context(|| format!("parsing GitHub event {}", path.display()))?;
    Ok(changed_files_in_event(&event))
}

/// `pull_request.changed_files` items may be `{ "filename": ... }` objects or
/// plain strings. Events without a pull request yield nothing.
pub fn changed_files_in_event(event: &Value) -> Vec<String> {
    let Some(items) = event
        .get("pull_request")
        .and_then(|pr| pr.get("changed_files"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(name) => Some(name.clone()),
            Value::Object(map) => map.get("filename").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .collect()
}

pub fn changed_files_from_git_diff(range: &str, repo: &Path) -> Result<Vec<String>> {
    let output = Command::new("git")
        .args(["diff", "--name-only", range])
        .current_dir(repo)
        .output()
        .with_context(|| format!("running git diff in {}", repo.display()))?;
    if !output.status.success() {
        bail!(
            "git diff --name-only {range} failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Prefixes of changed paths, relative to the repository root.
#[derive(Clone, Debug)]
pub struct PlanConfig {
    /// Any change below this prefix selects the whole catalog.
    pub tooling_prefix: String,
    /// Directory of the examples root within the repository.
    pub examples_prefix: String,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            tooling_prefix: "internal/".to_string(),
            examples_prefix: "examples/".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct TestPlan<'a> {
    pub entries: Vec<&'a Entry>,
    /// The tooling path that forced a full run, if any.
    pub full_catalog_trigger: Option<String>,
}

impl TestPlan<'_> {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn plan_tests<'a>(
    catalog: &'a ExampleCatalog,
    changed_files: &[String],
    config: &PlanConfig,
) -> TestPlan<'a> {
    if let Some(trigger) = changed_files
        .iter()
        .find(|path| path.starts_with(config.tooling_prefix.as_str()))
    {
        info!(%trigger, "tooling changed; selecting every example");
        return TestPlan {
            entries: catalog.entries().iter().collect(),
            full_catalog_trigger: Some(trigger.clone()),
        };
    }

    let entries = changed_files
        .iter()
        .filter(|path| path.ends_with(MODULE_SUFFIX) && !path.ends_with(PACKAGE_INIT))
        .filter_map(|path| {
            path.strip_prefix(config.examples_prefix.as_str())
                .or_else(|| catalog.is_extra_root_path(path).then_some(path.as_str()))
        })
        .filter_map(|relative| {
            let found = catalog.get(relative).filter(|entry| entry.is_module());
            if found.is_none() {
                debug!(path = relative, "changed file is not a cataloged example");
            }
            found
        })
        .collect::<Vec<_>>();
    TestPlan {
        entries: dedup_in_catalog_order(catalog, entries),
        full_catalog_trigger: None,
    }
}

fn dedup_in_catalog_order<'a>(
    catalog: &'a ExampleCatalog,
    picked: Vec<&'a Entry>,
) -> Vec<&'a Entry> {
    catalog
        .entries()
        .iter()
        .filter(|entry| {
            picked
                .iter()
                .any(|chosen| chosen.repo_relative_path == entry.repo_relative_path)
        })
        .collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlanFormat {
    #[default]
    Text,
    Json,
}

impl PlanFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanFormat::Text => "text",
            PlanFormat::Json => "json",
        }
    }
}

impl FromStr for PlanFormat {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "text" => Ok(PlanFormat::Text),
            "json" => Ok(PlanFormat::Json),
            other => bail!("unknown plan format '{other}' (expected text or json)"),
        }
    }
}

pub fn format_plan(plan: &TestPlan<'_>, format: PlanFormat) -> Result<String> {
    if plan.is_empty() {
        return Ok("No examples to test.".to_string());
    }
    match format {
        PlanFormat::Json => {
            serde_json::to_string_pretty(&plan.entries).context("serializing test plan")
        }
        PlanFormat::Text => {
            let mut out = format!("Test plan: {} examples to test", plan.entries.len());
            for entry in &plan.entries {
                out.push_str(&format!("\n- {}", entry.repo_relative_path));
            }
            Ok(out)
        }
    }
}
