//! Indexed view of every example under one examples root.
//!
//! The catalog is built in one pass over the filesystem and is strict about
//! its inputs: a missing root is an error, and so is a duplicate relative
//! path. Lookups never choose between several matches; they hand the
//! candidates back so the caller can list them.

use crate::catalog::Entry;
use crate::classify::{Classifier, Rejected};
use crate::config::CatalogConfig;
use anyhow::{Result, bail};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug)]
/// Catalog entries plus an index keyed by relative path.
pub struct ExampleCatalog {
    root: PathBuf,
    entries: Vec<Entry>,
    by_path: BTreeMap<String, usize>,
    ignored: Vec<PathBuf>,
    rejected: Vec<Rejected>,
    /// `<prefix>/` of every extra root that was scanned.
    extra_prefixes: Vec<String>,
}

/// Result of resolving a user query against the catalog.
#[derive(Debug)]
pub enum Lookup<'a> {
    Missing,
    Unique(&'a Entry),
    Ambiguous(Vec<&'a Entry>),
}

impl<'a> Lookup<'a> {
    fn from_matches(mut matches: Vec<&'a Entry>) -> Self {
        match matches.len() {
            0 => Lookup::Missing,
            1 => Lookup::Unique(matches.remove(0)),
            _ => Lookup::Ambiguous(matches),
        }
    }

    /// The single match, or an error naming every candidate.
    pub fn into_unique(self, query: &str) -> Result<&'a Entry> {
        match self {
            Lookup::Unique(entry) => Ok(entry),
            Lookup::Missing => bail!("No examples found matching '{query}'"),
            Lookup::Ambiguous(candidates) => {
                let listing = candidates
                    .iter()
                    .map(|entry| format!("- {}", entry.repo_relative_path))
                    .collect::<Vec<_>>()
                    .join("\n");
                bail!("Multiple examples found matching '{query}':\n{listing}")
            }
        }
    }
}

impl ExampleCatalog {
    /// Scan the configured root and index what it contains.
    ///
    /// A missing root is the one hard failure; malformed example files are
    /// collected in [`ExampleCatalog::rejected`] instead.
    pub fn build(config: &CatalogConfig) -> Result<Self> {
        if !config.root.is_dir() {
            bail!(
                "Can't find directory {}. You might need to clone the examples repo there.",
                config.root.display()
            );
        }
        let outcome = Classifier::new(config).scan()?;
        debug!(
            entries = outcome.entries.len(),
            ignored = outcome.ignored.len(),
            rejected = outcome.rejected.len(),
            "catalog scan finished"
        );
        let mut catalog = Self::from_entries(&config.root, outcome.entries)?;
        catalog.ignored = outcome.ignored;
        catalog.rejected = outcome.rejected;
        catalog.extra_prefixes = config
            .extra_roots
            .iter()
            .map(|extra| format!("{}/", extra.path_prefix))
            .collect();
        Ok(catalog)
    }

    /// Index an already classified set of entries.
    pub fn from_entries(root: &Path, entries: Vec<Entry>) -> Result<Self> {
        let by_path = build_index(&entries)?;
        Ok(Self {
            root: root.to_path_buf(),
            entries,
            by_path,
            ignored: Vec::new(),
            rejected: Vec::new(),
            extra_prefixes: Vec::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `path` falls under one of the extra roots' prefixes.
    pub fn is_extra_root_path(&self, path: &str) -> bool {
        self.extra_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Entries in scan order (category, then file name).
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn modules(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|entry| entry.is_module())
    }

    /// Files seen during the scan that are neither modules nor assets.
    pub fn ignored(&self) -> &[PathBuf] {
        &self.ignored
    }

    /// Module files dropped because their frontmatter failed validation.
    pub fn rejected(&self) -> &[Rejected] {
        &self.rejected
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry by exact relative path.
    pub fn get(&self, repo_relative_path: &str) -> Option<&Entry> {
        self.by_path
            .get(repo_relative_path)
            .map(|&idx| &self.entries[idx])
    }

    pub fn find_exact(&self, query: &str) -> Vec<&Entry> {
        self.get(query).into_iter().collect()
    }

    pub fn find_by_stem(&self, stem: &str) -> Vec<&Entry> {
        self.entries
            .iter()
            .filter(|entry| entry.stem == stem)
            .collect()
    }

    pub fn find_containing(&self, fragment: &str) -> Vec<&Entry> {
        self.entries
            .iter()
            .filter(|entry| entry.repo_relative_path.contains(fragment))
            .collect()
    }

    /// Resolve a runnable module by exact path, then stem, then substring.
    /// The first tier with any match decides the result.
    pub fn resolve(&self, query: &str) -> Lookup<'_> {
        let tiers: [for<'c> fn(&'c Self, &str) -> Vec<&'c Entry>; 3] =
            [Self::find_exact, Self::find_by_stem, Self::find_containing];
        for tier in tiers {
            let matches: Vec<&Entry> = tier(self, query)
                .into_iter()
                .filter(|entry| entry.is_module())
                .collect();
            if !matches.is_empty() {
                return Lookup::from_matches(matches);
            }
        }
        Lookup::Missing
    }

    /// Modules flagged `deploy: true` that have a command to run.
    pub fn deployable(&self) -> Vec<&Entry> {
        self.modules()
            .filter(|entry| entry.deploy_enabled())
            .filter(|entry| entry.cli_args.as_ref().is_some_and(|args| !args.is_empty()))
            .collect()
    }

    /// Resolve a deployable entry whose relative path equals or contains
    /// `query`.
    pub fn resolve_deployable(&self, query: &str) -> Lookup<'_> {
        let candidates = self.deployable();
        if let Some(exact) = candidates
            .iter()
            .find(|entry| entry.repo_relative_path == query)
        {
            return Lookup::Unique(*exact);
        }
        Lookup::from_matches(
            candidates
                .into_iter()
                .filter(|entry| entry.repo_relative_path.contains(query))
                .collect(),
        )
    }

    /// Entries sorted by relative path, for listings.
    pub fn sorted(&self) -> Vec<&Entry> {
        self.by_path.values().map(|&idx| &self.entries[idx]).collect()
    }

    /// The catalog as an array of flat entry mappings.
    pub fn to_json_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(&self.entries)?)
    }
}

fn build_index(entries: &[Entry]) -> Result<BTreeMap<String, usize>> {
    let mut map = BTreeMap::new();
    for (idx, entry) in entries.iter().enumerate() {
        let path = entry.repo_relative_path.as_str();
        if path.is_empty() {
            bail!("encountered entry with no relative path: {}", entry.absolute_path.display());
        }
        if path.starts_with('/') {
            bail!("entry path {path} must be relative to the examples root");
        }
        if map.insert(path.to_string(), idx).is_some() {
            bail!("duplicate example path {path}");
        }
    }
    Ok(map)
}
