//! Configuration values threaded through the catalog, doc and plan tools.
//!
//! Nothing here is global: callers resolve an examples root once (flag, env,
//! or upward search) and pass the resulting config structs down.

use anyhow::{Result, bail};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Explicit examples root, overriding discovery.
pub const ENV_EXAMPLES_ROOT: &str = "EXAMPLES_ROOT";
/// Extra doc-set exclusions (comma or whitespace separated prefixes).
pub const ENV_DOCS_EXCLUDE: &str = "EXAMPLES_DOCS_EXCLUDE";
/// Wall-clock limit for `run-example`, in seconds.
pub const ENV_RUN_TIMEOUT: &str = "EXAMPLES_RUN_TIMEOUT_SECS";
/// Names of sibling trees cataloged next to the examples root. Empty disables them.
pub const ENV_EXTRA_ROOTS: &str = "EXAMPLES_EXTRA_ROOTS";

/// Directory name searched for when walking up from the working directory.
pub const EXAMPLES_DIR: &str = "examples";
pub const DEFAULT_INTERPRETER: &str = "python";
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(10 * 60);

const DEFAULT_IGNORED_DIRS: &[&str] = &["internal", "misc", "archive"];
const DEFAULT_ASSET_EXTENSIONS: &[&str] = &["png", "jpeg", "jpg", "gif", "mp4"];
const DEFAULT_SIBLING_ROOTS: &[&str] = &["pacc"];

/// A secondary tree cataloged after the examples root.
///
/// Its categories are scanned like the main root's, and its loose top-level
/// modules are cataloged too. Every path and import path it yields carries
/// its own prefix, so it never collides with the main root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtraRoot {
    pub dir: PathBuf,
    /// Leading segment of every `repo_filename` from this tree.
    pub path_prefix: String,
    /// Leading segment of every dotted import path from this tree.
    pub module_prefix: String,
}

impl ExtraRoot {
    /// `<repo>/<name>` for an examples root at `<repo>/examples`.
    pub fn sibling(examples_root: &Path, name: &str) -> Option<Self> {
        let dir = examples_root.parent()?.join(name);
        Some(Self {
            dir,
            path_prefix: name.to_string(),
            module_prefix: name.to_string(),
        })
    }
}

/// What the classifier scans and how it names what it finds.
#[derive(Clone, Debug)]
pub struct CatalogConfig {
    /// Examples root; every `repo_filename` is relative to it.
    pub root: PathBuf,
    /// Leading segment of every dotted import path (empty for none).
    pub module_prefix: String,
    /// Top-level directory-name prefixes never scanned.
    pub ignored_dirs: Vec<String>,
    /// Lowercase extensions (without dot) classified as assets.
    pub asset_extensions: Vec<String>,
    /// Program used when an example declares no `cmd`.
    pub default_interpreter: String,
    /// Further trees scanned after `root`, in order.
    pub extra_roots: Vec<ExtraRoot>,
}

impl CatalogConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            module_prefix: EXAMPLES_DIR.to_string(),
            ignored_dirs: to_strings(DEFAULT_IGNORED_DIRS),
            asset_extensions: to_strings(DEFAULT_ASSET_EXTENSIONS),
            default_interpreter: DEFAULT_INTERPRETER.to_string(),
            extra_roots: Vec::new(),
        }
    }

    /// Add each named sibling of the root that exists on disk.
    pub fn with_sibling_roots(mut self, names: &[String]) -> Self {
        for name in names {
            match ExtraRoot::sibling(&self.root, name) {
                Some(extra) if extra.dir.is_dir() => self.extra_roots.push(extra),
                _ => debug!(sibling = %name, "no sibling tree next to the examples root"),
            }
        }
        self
    }

    pub fn is_ignored_dir(&self, name: &str) -> bool {
        name.starts_with('.')
            || self
                .ignored_dirs
                .iter()
                .any(|prefix| name.starts_with(prefix.as_str()))
    }

    pub fn is_asset_extension(&self, extension: &str) -> bool {
        self.asset_extensions
            .iter()
            .any(|known| known.eq_ignore_ascii_case(extension))
    }
}

/// Resolve the examples root.
///
/// Order: explicit path, `EXAMPLES_ROOT`, an `examples/` directory found by
/// walking up from the working directory, then the build-time hint. Explicit
/// values are returned as given even if missing so the catalog build can
/// report the missing directory itself.
pub fn find_examples_root(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(canonical_or_given(path));
    }

    if let Some(raw) = env::var_os(ENV_EXAMPLES_ROOT).filter(|raw| !raw.is_empty()) {
        return Ok(canonical_or_given(Path::new(&raw)));
    }

    if let Ok(cwd) = env::current_dir() {
        if let Some(root) = search_upwards(&cwd) {
            return Ok(root);
        }
    }

    if let Some(hint) = option_env!("EXAMPLES_ROOT_HINT") {
        let hint = Path::new(hint);
        if hint.is_dir() {
            return Ok(canonical_or_given(hint));
        }
    }

    bail!(
        "Unable to locate an examples directory. Pass --root or set {ENV_EXAMPLES_ROOT} to the examples checkout."
    )
}

/// Walk up from `start` looking for a directory that is, or contains,
/// `examples/`.
pub fn search_upwards(start: &Path) -> Option<PathBuf> {
    let mut dir = fs::canonicalize(start).ok()?;
    loop {
        if dir.file_name().is_some_and(|name| name == EXAMPLES_DIR) {
            return Some(dir);
        }
        let candidate = dir.join(EXAMPLES_DIR);
        if candidate.is_dir() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// Run timeout from `EXAMPLES_RUN_TIMEOUT_SECS`, falling back to ten minutes.
pub fn run_timeout_from_env() -> Result<Duration> {
    match env::var(ENV_RUN_TIMEOUT) {
        Ok(raw) if !raw.trim().is_empty() => {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                anyhow::anyhow!("{ENV_RUN_TIMEOUT} must be a whole number of seconds, got '{raw}'")
            })?;
            Ok(Duration::from_secs(secs))
        }
        _ => Ok(DEFAULT_RUN_TIMEOUT),
    }
}

/// Sibling tree names from `EXAMPLES_EXTRA_ROOTS`, defaulting to `pacc`.
pub fn sibling_roots_from_env() -> Vec<String> {
    match env::var(ENV_EXTRA_ROOTS) {
        Ok(raw) => split_list(&raw),
        Err(_) => to_strings(DEFAULT_SIBLING_ROOTS),
    }
}

/// Extra excluded prefixes from `EXAMPLES_DOCS_EXCLUDE`.
pub fn docs_excludes_from_env() -> Vec<String> {
    env::var(ENV_DOCS_EXCLUDE)
        .map(|raw| split_list(&raw))
        .unwrap_or_default()
}

/// Split a comma and/or whitespace separated list.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn canonical_or_given(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
