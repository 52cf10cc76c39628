//! Directory walker that turns an examples tree into catalog entries.
//!
//! Each top-level category directory is scanned two levels deep: its own
//! files plus the files of its immediate subdirectories. Anything nested
//! deeper is ignored unless a caller asks [`Classifier::scan_directory`] to
//! recurse into it explicitly, and even then only one more level is listed.
//! Extra roots from the config are scanned the same way after the main root,
//! and their loose top-level modules are cataloged as well.
//!
//! Per file: `.py` (except `__init__.py`) becomes a module entry with parsed
//! frontmatter, known media extensions become asset entries, everything else
//! is recorded in `ignored`. A module whose frontmatter fails validation is
//! recorded in `rejected` instead of failing the scan. Only an unreadable
//! main root fails the scan; an unreadable directory below it is ignored.

use crate::catalog::{Entry, ExampleMetadata};
use crate::config::{CatalogConfig, ExtraRoot};
use crate::frontmatter::parse_frontmatter;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const MODULE_EXTENSION: &str = "py";
const PACKAGE_INIT_STEM: &str = "__init__";

/// A module file left out of the catalog, with the reason.
#[derive(Clone, Debug, PartialEq)]
pub struct Rejected {
    pub path: PathBuf,
    pub reason: String,
}

/// Everything one scan produced. A fresh value per scan; nothing is cached.
#[derive(Clone, Debug, Default)]
pub struct ScanOutcome {
    pub entries: Vec<Entry>,
    pub ignored: Vec<PathBuf>,
    pub rejected: Vec<Rejected>,
}

/// How entries from one scanned tree are named.
struct Scope<'s> {
    path_prefix: Option<&'s str>,
    module_prefix: &'s str,
    /// Default commands point at the absolute file instead of the relative
    /// path, which only resolves from the main root.
    absolute_scripts: bool,
}

impl Scope<'_> {
    fn repo_path(&self, segments: &[&str]) -> String {
        let joined = segments.join("/");
        match self.path_prefix {
            Some(prefix) => format!("{prefix}/{joined}"),
            None => joined,
        }
    }

    // Dotted paths cannot express segments that themselves contain dots or
    // whitespace; such files are still runnable, just not importable.
    fn import_path(&self, segments: &[&str]) -> Option<String> {
        if segments
            .iter()
            .any(|segment| segment.is_empty() || segment.contains(['.', ' ', '\t']))
        {
            return None;
        }
        let mut parts: Vec<&str> = Vec::with_capacity(segments.len() + 1);
        if !self.module_prefix.is_empty() {
            parts.push(self.module_prefix);
        }
        parts.extend_from_slice(segments);
        Some(parts.join("."))
    }
}

pub struct Classifier<'a> {
    config: &'a CatalogConfig,
}

impl<'a> Classifier<'a> {
    pub fn new(config: &'a CatalogConfig) -> Self {
        Self { config }
    }

    /// Scan every non-ignored top-level directory under the configured root,
    /// in name order, then each extra root. Loose files at the top of the
    /// main root are recorded as ignored.
    pub fn scan(&self) -> Result<ScanOutcome> {
        let mut outcome = ScanOutcome::default();
        let main = self.main_scope();
        for path in sorted_children(&self.config.root)? {
            self.visit_top_level(&main, path, false, &mut outcome);
        }
        for extra in &self.config.extra_roots {
            self.scan_extra_root(extra, &mut outcome);
        }
        Ok(outcome)
    }

    /// Scan one directory below the main root. `parents` are the directory
    /// names between the root and `dir`. With `recurse`, immediate
    /// subdirectories are listed too (without descending further).
    pub fn scan_directory(&self, parents: &[String], dir: &Path, recurse: bool) -> ScanOutcome {
        let mut outcome = ScanOutcome::default();
        self.gather(&self.main_scope(), parents, dir, recurse, &mut outcome);
        outcome
    }

    fn main_scope(&self) -> Scope<'_> {
        Scope {
            path_prefix: None,
            module_prefix: &self.config.module_prefix,
            absolute_scripts: false,
        }
    }

    fn scan_extra_root(&self, extra: &ExtraRoot, outcome: &mut ScanOutcome) {
        let scope = Scope {
            path_prefix: Some(extra.path_prefix.as_str()),
            module_prefix: &extra.module_prefix,
            absolute_scripts: true,
        };
        match sorted_children(&extra.dir) {
            Ok(children) => {
                for path in children {
                    self.visit_top_level(&scope, path, true, outcome);
                }
            }
            Err(err) => {
                let error = format!("{err:#}");
                warn!(dir = %extra.dir.display(), %error, "skipping extra root");
                outcome.ignored.push(extra.dir.clone());
            }
        }
    }

    fn visit_top_level(
        &self,
        scope: &Scope<'_>,
        path: PathBuf,
        loose_modules: bool,
        outcome: &mut ScanOutcome,
    ) {
        let name = file_name(&path);
        if path.is_dir() {
            if self.config.is_ignored_dir(&name) {
                debug!(dir = %path.display(), "skipping ignored category");
                return;
            }
            self.gather(scope, &[], &path, true, outcome);
        } else if loose_modules && !name.starts_with('.') && is_module_file(&path) {
            self.classify_file(scope, &[], &path, outcome);
        } else {
            outcome.ignored.push(path);
        }
    }

    fn gather(
        &self,
        scope: &Scope<'_>,
        parents: &[String],
        dir: &Path,
        recurse: bool,
        outcome: &mut ScanOutcome,
    ) {
        let children = match sorted_children(dir) {
            Ok(children) => children,
            Err(err) => {
                let error = format!("{err:#}");
                warn!(dir = %dir.display(), %error, "skipping unreadable directory");
                outcome.ignored.push(dir.to_path_buf());
                return;
            }
        };
        let mut here = parents.to_vec();
        here.push(file_name(dir));
        for path in children {
            if file_name(&path).starts_with('.') {
                continue;
            }
            if path.is_dir() && recurse {
                self.gather(scope, &here, &path, false, outcome);
                continue;
            }
            self.classify_file(scope, &here, &path, outcome);
        }
    }

    fn classify_file(
        &self,
        scope: &Scope<'_>,
        dirs: &[String],
        path: &Path,
        outcome: &mut ScanOutcome,
    ) {
        let name = file_name(path);
        let segments: Vec<&str> = dirs
            .iter()
            .map(String::as_str)
            .chain([name.as_str()])
            .collect();
        let repo_relative_path = scope.repo_path(&segments);
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();

        if is_module_file(path) {
            let stem = file_stem(path);
            let mut module_segments = segments.clone();
            module_segments.pop();
            module_segments.push(&stem);
            let import_path = scope.import_path(&module_segments);
            match self.load_module(scope, path, repo_relative_path, import_path) {
                Ok(entry) => outcome.entries.push(entry),
                Err(err) => {
                    let reason = format!("{err:#}");
                    debug!(file = %path.display(), %reason, "rejecting example");
                    outcome.rejected.push(Rejected {
                        path: path.to_path_buf(),
                        reason,
                    });
                }
            }
        } else if path.is_file() && self.config.is_asset_extension(&extension) {
            outcome
                .entries
                .push(Entry::asset(absolute(path), repo_relative_path));
        } else {
            debug!(file = %path.display(), "ignoring non-example file");
            outcome.ignored.push(path.to_path_buf());
        }
    }

    fn load_module(
        &self,
        scope: &Scope<'_>,
        path: &Path,
        repo_relative_path: String,
        import_path: Option<String>,
    ) -> Result<Entry> {
        let content =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let (raw, _) = parse_frontmatter(&content);
        let metadata = ExampleMetadata::from_map(raw.unwrap_or_default())?;
        let absolute_path = absolute(path);
        let script = if scope.absolute_scripts {
            absolute_path.display().to_string()
        } else {
            repo_relative_path.clone()
        };
        Ok(Entry::module_with_script(
            absolute_path,
            repo_relative_path,
            import_path,
            metadata,
            &self.config.default_interpreter,
            script,
        ))
    }
}

fn is_module_file(path: &Path) -> bool {
    path.is_file()
        && path.extension().is_some_and(|ext| ext == MODULE_EXTENSION)
        && file_stem(path) != PACKAGE_INIT_STEM
}

fn sorted_children(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut children = fs::read_dir(dir)
        .with_context(|| format!("listing {}", dir.display()))?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("listing {}", dir.display()))?;
    children.sort();
    Ok(children)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn absolute(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
