//! Example catalog data model.
//!
//! An [`Entry`] is one discoverable example: either a runnable module or a
//! media asset shipped next to the docs. Entries are built fresh on every
//! scan and never mutated afterwards; downstream tools (docs, test plans,
//! runners) only read them. [`ExampleCatalog`] holds the full set with
//! lookup helpers.

pub mod index;
pub mod metadata;

pub use index::{ExampleCatalog, Lookup};
pub use metadata::{ExampleMetadata, MetadataError};

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Module,
    Asset,
}

/// One classified example. Serializes to a flat mapping whose keys
/// (`filename`, `repo_filename`, `module`, ...) are the catalog's JSON
/// export contract.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Entry {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(rename = "filename")]
    pub absolute_path: PathBuf,
    #[serde(rename = "module")]
    pub import_path: Option<String>,
    pub metadata: Option<ExampleMetadata>,
    #[serde(rename = "repo_filename")]
    pub repo_relative_path: String,
    pub cli_args: Option<Vec<String>>,
    pub stem: String,
    pub tags: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl Entry {
    /// Build a module entry, resolving its command line from metadata.
    ///
    /// `cli_args` is `cmd + args` when `cmd` is declared, otherwise
    /// `[interpreter, repo_relative_path] + args`.
    pub fn module(
        absolute_path: PathBuf,
        repo_relative_path: String,
        import_path: Option<String>,
        metadata: ExampleMetadata,
        interpreter: &str,
    ) -> Self {
        let script = repo_relative_path.clone();
        Self::module_with_script(
            absolute_path,
            repo_relative_path,
            import_path,
            metadata,
            interpreter,
            script,
        )
    }

    /// Like [`Entry::module`], but the interpreter is handed `script`
    /// instead of the relative path when no `cmd` is declared.
    pub fn module_with_script(
        absolute_path: PathBuf,
        repo_relative_path: String,
        import_path: Option<String>,
        metadata: ExampleMetadata,
        interpreter: &str,
        script: String,
    ) -> Self {
        let mut cli_args = match &metadata.cmd {
            Some(cmd) => cmd.clone(),
            None => vec![interpreter.to_string(), script],
        };
        cli_args.extend(metadata.args.iter().flatten().cloned());
        let tags = metadata.tags.clone().unwrap_or_default();
        let env = metadata.env.clone().unwrap_or_default();

        Self {
            kind: EntryKind::Module,
            stem: file_stem(&absolute_path),
            absolute_path,
            import_path,
            metadata: Some(metadata),
            repo_relative_path,
            cli_args: Some(cli_args),
            tags,
            env,
        }
    }

    pub fn asset(absolute_path: PathBuf, repo_relative_path: String) -> Self {
        Self {
            kind: EntryKind::Asset,
            stem: file_stem(&absolute_path),
            absolute_path,
            import_path: None,
            metadata: None,
            repo_relative_path,
            cli_args: None,
            tags: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    pub fn is_module(&self) -> bool {
        self.kind == EntryKind::Module
    }

    /// Final path component, e.g. `01_hello_world.py`.
    pub fn file_name(&self) -> &str {
        self.repo_relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.repo_relative_path)
    }

    /// Top-level directory of the relative path, if the entry is nested.
    pub fn category(&self) -> Option<&str> {
        self.repo_relative_path
            .split_once('/')
            .map(|(category, _)| category)
    }

    pub fn deploy_enabled(&self) -> bool {
        self.metadata
            .as_ref()
            .is_some_and(ExampleMetadata::deploy_enabled)
    }

    pub fn is_draft(&self) -> bool {
        self.metadata.as_ref().is_some_and(ExampleMetadata::is_draft)
    }

    pub fn pytest_enabled(&self) -> bool {
        self.is_module()
            && self
                .metadata
                .as_ref()
                .is_none_or(ExampleMetadata::pytest_enabled)
    }

    /// Shell-ish rendering of `cli_args` for listings.
    pub fn command_line(&self) -> Option<String> {
        self.cli_args.as_ref().map(|args| args.join(" "))
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
