//! Markdown rendering for a single example module.
//!
//! Comment lines (`# text` or a bare `#`) become prose and every other line
//! becomes code, grouped into fenced blocks. A frontmatter block that survives
//! as prose is cut down to `title`/`description` and followed by a link to
//! the source. A page that ends up being one bare code block gets a heading.

use crate::catalog::Entry;
use anyhow::{Context, Result, bail};
use regex::Regex;
use std::fs;
use std::sync::LazyLock;

/// Where rendered pages link back to; the entry's relative path is appended.
pub const DEFAULT_SOURCE_BASE_URL: &str =
    "https://github.com/prefecthq/examples/blob/examples-markdown/examples/";

const OPEN_FENCE: &str = "```python";
const CLOSE_FENCE: &str = "```";
const COMMENT_MARKER: &str = "#";
const DELIMITER: &str = "---";
const KEPT_HEADER_KEYS: [&str; 2] = ["title:", "description:"];

static NEWLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n").expect("newline pattern compiles"));
static SINGLE_CODE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\A\s*```[^`]+```\s*\z").expect("code block pattern compiles")
});

/// Read `entry` from disk and render it.
pub fn render_example_md(entry: &Entry, source_base_url: &str) -> Result<String> {
    if !entry.is_module() {
        bail!("{} is an asset and has no page", entry.repo_relative_path);
    }
    let content = fs::read_to_string(&entry.absolute_path)
        .with_context(|| format!("reading {}", entry.absolute_path.display()))?;
    Ok(render_markdown(entry, &content, source_base_url))
}

/// Render already-loaded source text for `entry`.
pub fn render_markdown(entry: &Entry, content: &str, source_base_url: &str) -> String {
    let text = interleave(content);
    let text = rewrite_frontmatter(text, &entry.repo_relative_path, source_base_url);
    if SINGLE_CODE_BLOCK.is_match(&text) {
        let module = entry
            .import_path
            .as_deref()
            .unwrap_or(&entry.repo_relative_path);
        return format!(
            "# Example ({})\n\nThis is the source code for **{module}**.\n{text}",
            entry.file_name()
        );
    }
    text
}

fn interleave(content: &str) -> String {
    let mut markdown: Vec<&str> = Vec::new();
    let mut code: Vec<&str> = Vec::new();

    for line in NEWLINE.split(content) {
        if let Some(prose) = prose_text(line) {
            flush_code(&mut markdown, &mut code);
            markdown.push(prose);
        } else {
            if markdown.last().is_some_and(|last| !last.is_empty()) {
                markdown.push("");
            }
            if !code.is_empty() || !line.is_empty() {
                code.push(line);
            }
        }
    }
    flush_code(&mut markdown, &mut code);
    markdown.join("\n")
}

fn prose_text(line: &str) -> Option<&str> {
    if line == COMMENT_MARKER {
        return Some("");
    }
    line.strip_prefix("# ")
}

fn flush_code<'a>(markdown: &mut Vec<&'a str>, code: &mut Vec<&'a str>) {
    if code.is_empty() {
        return;
    }
    markdown.push(OPEN_FENCE);
    markdown.append(code);
    markdown.extend([CLOSE_FENCE, ""]);
}

// The header only counts when the very first line is the delimiter and a
// later line closes it.
fn rewrite_frontmatter(text: String, repo_relative_path: &str, source_base_url: &str) -> String {
    let Some(first) = text.split('\n').next() else {
        return text;
    };
    if first != DELIMITER {
        return text;
    }
    let mut offset = first.len() + 1;
    let mut close_end = None;
    for line in text.get(offset..).unwrap_or_default().split('\n') {
        if line == DELIMITER {
            close_end = Some(offset + line.len());
            break;
        }
        offset += line.len() + 1;
    }
    let Some(close_end) = close_end else {
        return text;
    };

    let mut page = format!("{DELIMITER}\n");
    for line in text[..close_end].split('\n') {
        if KEPT_HEADER_KEYS.iter().any(|key| line.starts_with(key)) {
            page.push_str(line);
            page.push('\n');
        }
    }
    page.push_str(&format!("{DELIMITER}\n\n"));
    page.push_str(&format!(
        "<a href=\"{source_base_url}{repo_relative_path}\" target=\"_blank\">View on GitHub</a>\n\n"
    ));
    page.push_str(text.get(close_end + 1..).unwrap_or_default());
    page
}
