//! Example catalog tooling.
//!
//! Scans an examples tree, parses the frontmatter each example carries, and
//! exposes the result as an [`ExampleCatalog`] that the doc generator, test
//! planner, and runner all read from.

pub mod catalog;
pub mod classify;
pub mod config;
pub mod docs;
pub mod frontmatter;
pub mod logging;
pub mod render;
pub mod runner;
pub mod test_plan;

pub use catalog::{Entry, EntryKind, ExampleCatalog, ExampleMetadata, Lookup, MetadataError};
pub use config::{CatalogConfig, ExtraRoot, find_examples_root, split_list};
pub use docs::{DocsConfig, DocsSummary, IndexStyle, Layout, generate_docs};
pub use frontmatter::{Metadata, parse_frontmatter, render_frontmatter, scan_draft_flag};
pub use render::{render_example_md, render_markdown};
pub use runner::{CommandSpec, RunOutcome, run_entry};
pub use test_plan::{ChangeSource, PlanConfig, PlanFormat, TestPlan, format_plan, plan_tests};

use anyhow::Result;
use std::path::Path;

/// Locate the examples root (see [`find_examples_root`]) and build its
/// catalog with default settings plus any sibling trees that exist.
pub fn load_catalog(explicit_root: Option<&Path>) -> Result<ExampleCatalog> {
    let root = find_examples_root(explicit_root)?;
    let config = CatalogConfig::new(root).with_sibling_roots(&config::sibling_roots_from_env());
    ExampleCatalog::build(&config)
}
