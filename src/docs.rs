//! Doc-set generation: one page per eligible module, plus an optional index.
//!
//! Each catalog entry walks `considered -> skipped (excluded | draft) ->
//! rendered -> written`. Per-entry problems are collected in
//! [`DocsSummary::failures`] and never stop the run; only an unusable output
//! directory does.

use crate::catalog::{Entry, ExampleCatalog};
use crate::config::docs_excludes_from_env;
use crate::frontmatter::{Metadata, render_frontmatter, scan_draft_flag};
use crate::render::{DEFAULT_SOURCE_BASE_URL, render_markdown};
use anyhow::{Context, Result, bail};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::debug;

const DEFAULT_EXCLUDED_PREFIXES: &[&str] = &[
    ".venv/",
    "venv/",
    "env/",
    "node_modules/",
    "modal-examples/",
    "archive/",
];
const UNCATEGORIZED: &str = "misc";
const INDEX_STEM: &str = "index";
const DEFAULT_CARD_ICON: &str = "play";
const DEFAULT_CARD_HREF_PREFIX: &str = "/v3/examples/";
const CARD_COLUMNS: usize = 3;

static ORDERING_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+_").expect("ordering prefix pattern compiles"));

/// How generated pages are arranged under the output directory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Layout {
    /// `<category>/<stem><ext>`
    Categorized,
    /// `<stem without leading NN_><ext>`
    #[default]
    Flat,
}

impl Layout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layout::Categorized => "categorized",
            Layout::Flat => "flat",
        }
    }
}

impl FromStr for Layout {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "categorized" => Ok(Layout::Categorized),
            "flat" => Ok(Layout::Flat),
            other => bail!("unknown doc layout '{other}' (expected categorized or flat)"),
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of the index page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IndexStyle {
    /// A heading per category with a bullet per page.
    #[default]
    Listing,
    /// An MDX `<CardGroup>` of every page, built from each page's title,
    /// description and icon.
    Cards,
}

impl IndexStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexStyle::Listing => "listing",
            IndexStyle::Cards => "cards",
        }
    }
}

impl FromStr for IndexStyle {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "listing" => Ok(IndexStyle::Listing),
            "cards" => Ok(IndexStyle::Cards),
            other => bail!("unknown index style '{other}' (expected listing or cards)"),
        }
    }
}

impl fmt::Display for IndexStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct DocsConfig {
    pub output_dir: PathBuf,
    /// Page extension including the dot: `.md` or `.mdx`.
    pub extension: String,
    pub layout: Layout,
    pub index: bool,
    /// Relative-path prefixes that are never rendered.
    pub excluded_prefixes: Vec<String>,
    pub source_base_url: String,
    pub index_title: String,
    pub index_style: IndexStyle,
    /// Prepended to a page's extension-less path to form a card link.
    pub card_href_prefix: String,
}

impl DocsConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            extension: ".mdx".to_string(),
            layout: Layout::default(),
            index: false,
            excluded_prefixes: DEFAULT_EXCLUDED_PREFIXES
                .iter()
                .map(|prefix| prefix.to_string())
                .collect(),
            source_base_url: DEFAULT_SOURCE_BASE_URL.to_string(),
            index_title: "Examples".to_string(),
            index_style: IndexStyle::default(),
            card_href_prefix: DEFAULT_CARD_HREF_PREFIX.to_string(),
        }
    }

    /// Defaults plus any prefixes listed in `EXAMPLES_DOCS_EXCLUDE`.
    pub fn from_env(output_dir: impl Into<PathBuf>) -> Self {
        let mut config = Self::new(output_dir);
        config.excluded_prefixes.extend(docs_excludes_from_env());
        config
    }

    fn is_excluded(&self, repo_relative_path: &str) -> bool {
        self.excluded_prefixes
            .iter()
            .any(|prefix| repo_relative_path.starts_with(prefix.as_str()))
    }

    /// Output path of `entry`'s page, relative to the output directory.
    pub fn page_path(&self, entry: &Entry) -> String {
        match self.layout {
            Layout::Categorized => {
                format!("{}/{}{}", category_of(entry), entry.stem, self.extension)
            }
            Layout::Flat => format!("{}{}", clean_stem(&entry.stem), self.extension),
        }
    }

    fn asset_path(&self, entry: &Entry) -> String {
        match self.layout {
            Layout::Categorized => format!("{}/{}", category_of(entry), entry.file_name()),
            Layout::Flat => entry.file_name().to_string(),
        }
    }

    fn index_path(&self) -> String {
        format!("{INDEX_STEM}{}", self.extension)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DocFailure {
    pub repo_relative_path: String,
    pub error: String,
}

#[derive(Clone, Debug, Default)]
pub struct DocsSummary {
    /// Pages written, relative to the output directory.
    pub generated: Vec<String>,
    pub skipped_excluded: Vec<String>,
    pub skipped_draft: Vec<String>,
    pub assets_copied: usize,
    pub failures: Vec<DocFailure>,
    pub index: Option<PathBuf>,
}

impl DocsSummary {
    pub fn skipped(&self) -> usize {
        self.skipped_excluded.len() + self.skipped_draft.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn summary_line(&self) -> String {
        format!(
            "Generated {} docs, skipped {} ({} draft, {} excluded), copied {} assets, {} failed",
            self.generated.len(),
            self.skipped(),
            self.skipped_draft.len(),
            self.skipped_excluded.len(),
            self.assets_copied,
            self.failures.len()
        )
    }
}

struct IndexItem {
    category: String,
    repo_relative_path: String,
    stem: String,
    link: String,
    card: Option<Card>,
}

struct Card {
    title: String,
    description: String,
    icon: String,
}

impl IndexItem {
    fn new(entry: &Entry, link: String, config: &DocsConfig) -> Result<Self> {
        let card = match config.index_style {
            IndexStyle::Cards => Some(card_for(entry)?),
            IndexStyle::Listing => None,
        };
        Ok(Self {
            category: category_of(entry).to_string(),
            repo_relative_path: entry.repo_relative_path.clone(),
            stem: entry.stem.clone(),
            link,
            card,
        })
    }
}

fn card_for(entry: &Entry) -> Result<Card> {
    let metadata = entry.metadata.as_ref();
    let title = metadata.and_then(|metadata| metadata.title.clone());
    let description = metadata.and_then(|metadata| metadata.description.clone());
    let (Some(title), Some(description)) = (title, description) else {
        bail!(
            "{} does not have a title or description for its index card",
            entry.repo_relative_path
        );
    };
    let icon = metadata
        .and_then(|metadata| metadata.icon.clone())
        .unwrap_or_else(|| DEFAULT_CARD_ICON.to_string());
    Ok(Card {
        title,
        description,
        icon,
    })
}

/// Render every eligible entry of `catalog` into `config.output_dir`.
pub fn generate_docs(catalog: &ExampleCatalog, config: &DocsConfig) -> Result<DocsSummary> {
    if !matches!(config.extension.as_str(), ".md" | ".mdx") {
        bail!("unsupported doc extension '{}' (expected .md or .mdx)", config.extension);
    }
    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating {}", config.output_dir.display()))?;

    let mut summary = DocsSummary::default();
    let mut claimed: BTreeMap<String, String> = BTreeMap::new();
    if config.index {
        claimed.insert(config.index_path(), "the index page".to_string());
    }
    let mut index_items = Vec::new();

    for entry in catalog.entries() {
        let path = entry.repo_relative_path.clone();
        if config.is_excluded(&path) {
            debug!(example = %path, "excluded from docs");
            summary.skipped_excluded.push(path);
            continue;
        }

        let outcome = if entry.is_module() {
            write_page(entry, config, &mut claimed)
        } else {
            copy_asset(entry, config, &mut claimed).map(|_| Written::Asset)
        };
        match outcome {
            Ok(Written::Page(link)) => {
                if config.index {
                    match IndexItem::new(entry, link.clone(), config) {
                        Ok(item) => index_items.push(item),
                        Err(err) => summary.failures.push(failure(&path, &err)),
                    }
                }
                summary.generated.push(link);
            }
            Ok(Written::Draft) => {
                debug!(example = %path, "draft skipped");
                summary.skipped_draft.push(path);
            }
            Ok(Written::Asset) => summary.assets_copied += 1,
            Err(err) => summary.failures.push(failure(&path, &err)),
        }
    }

    if config.index {
        let index_path = config.output_dir.join(config.index_path());
        let page = match config.index_style {
            IndexStyle::Listing => render_index(&config.index_title, index_items),
            IndexStyle::Cards => render_card_index(config, index_items)?,
        };
        fs::write(&index_path, page)
            .with_context(|| format!("writing {}", index_path.display()))?;
        summary.index = Some(index_path);
    }
    Ok(summary)
}

fn failure(path: &str, err: &anyhow::Error) -> DocFailure {
    let error = format!("{err:#}");
    debug!(example = %path, %error, "doc generation failed");
    DocFailure {
        repo_relative_path: path.to_string(),
        error,
    }
}

enum Written {
    Page(String),
    Draft,
    Asset,
}

fn write_page(
    entry: &Entry,
    config: &DocsConfig,
    claimed: &mut BTreeMap<String, String>,
) -> Result<Written> {
    let content = fs::read_to_string(&entry.absolute_path)
        .with_context(|| format!("reading {}", entry.absolute_path.display()))?;
    if entry.is_draft() || scan_draft_flag(&content) {
        return Ok(Written::Draft);
    }
    let page = render_markdown(entry, &content, &config.source_base_url);
    let relative = config.page_path(entry);
    claim(claimed, &relative, entry)?;
    write_output(&config.output_dir, &relative, page.as_bytes())?;
    Ok(Written::Page(relative))
}

fn copy_asset(
    entry: &Entry,
    config: &DocsConfig,
    claimed: &mut BTreeMap<String, String>,
) -> Result<()> {
    let relative = config.asset_path(entry);
    claim(claimed, &relative, entry)?;
    let bytes = fs::read(&entry.absolute_path)
        .with_context(|| format!("reading {}", entry.absolute_path.display()))?;
    write_output(&config.output_dir, &relative, &bytes)
}

fn claim(claimed: &mut BTreeMap<String, String>, relative: &str, entry: &Entry) -> Result<()> {
    if let Some(owner) = claimed.get(relative) {
        bail!("output {relative} is already produced by {owner}");
    }
    claimed.insert(relative.to_string(), entry.repo_relative_path.clone());
    Ok(())
}

fn write_output(output_dir: &Path, relative: &str, bytes: &[u8]) -> Result<()> {
    let target = output_dir.join(relative);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(&target, bytes).with_context(|| format!("writing {}", target.display()))
}

fn sort_items(items: &mut [IndexItem]) {
    items.sort_by(|a, b| {
        (a.category.as_str(), a.repo_relative_path.as_str())
            .cmp(&(b.category.as_str(), b.repo_relative_path.as_str()))
    });
}

fn render_index(title: &str, mut items: Vec<IndexItem>) -> String {
    sort_items(&mut items);
    let mut out = format!(
        "# {title}\n\nThis documentation is auto-generated from the {title} repository.\n\n"
    );
    let mut current: Option<&str> = None;
    for item in &items {
        if current != Some(item.category.as_str()) {
            if current.is_some() {
                out.push('\n');
            }
            out.push_str(&format!("## {}\n\n", display_name(&item.category)));
            current = Some(item.category.as_str());
        }
        out.push_str(&format!("- [{}]({})\n", display_name(&item.stem), item.link));
    }
    if current.is_some() {
        out.push('\n');
    }
    out
}

fn render_card_index(config: &DocsConfig, mut items: Vec<IndexItem>) -> Result<String> {
    sort_items(&mut items);
    let mut header = Metadata::new();
    header.insert("title".into(), Value::String(config.index_title.clone()));
    let mut out = render_frontmatter(&header)?;
    out.push_str(&format!("<CardGroup cols={{{CARD_COLUMNS}}}>\n"));
    for item in &items {
        let Some(card) = &item.card else { continue };
        let target = item
            .link
            .strip_suffix(config.extension.as_str())
            .unwrap_or(&item.link);
        out.push_str(&format!(
            "  <Card title=\"{}\" icon=\"{}\" href=\"{}{target}\">\n    {}\n  </Card>\n",
            attribute(&card.title),
            attribute(&card.icon),
            config.card_href_prefix,
            card.description,
        ));
    }
    out.push_str("</CardGroup>\n");
    Ok(out)
}

fn attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

fn category_of(entry: &Entry) -> &str {
    entry.category().unwrap_or(UNCATEGORIZED)
}

fn clean_stem(stem: &str) -> &str {
    match ORDERING_PREFIX.find(stem) {
        Some(prefix) if prefix.end() < stem.len() => &stem[prefix.end()..],
        _ => stem,
    }
}

/// `01_getting_started` -> `01 Getting Started`.
pub fn display_name(raw: &str) -> String {
    title_case(&raw.replace('_', " "))
}

// A letter is upper-cased when the character before it is not a letter and
// lower-cased otherwise.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut after_letter = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if after_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            after_letter = true;
        } else {
            out.push(ch);
            after_letter = false;
        }
    }
    out
}
