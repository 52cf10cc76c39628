//! Frontmatter extraction for example sources.
//!
//! An example may open with a YAML block bounded by `---` lines. Python
//! examples carry the same block as comments (`# ---`, `# title: ...`,
//! `# ---`), so both the bare and the `#`-prefixed form are accepted. A block
//! that is properly delimited but is not a YAML mapping still counts as
//! frontmatter: its metadata degrades to an empty map so catalog builds keep
//! going.

use anyhow::{Context, Result};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::warn;

/// Raw frontmatter mapping, exactly as written in the source file.
pub type Metadata = Map<String, Value>;

const DELIMITER: &str = "---";

/// Number of leading source lines searched by [`scan_draft_flag`].
pub const DRAFT_SCAN_LINES: usize = 200;

static DRAFT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^\s*#*\s*draft\s*:\s*["']?(true|yes|on)["']?\s*(#.*)?$"#)
        .expect("draft pattern compiles")
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BlockStyle {
    Bare,
    Commented,
}

struct Block {
    yaml: String,
    end: usize,
}

/// Split `content` into its frontmatter mapping and the remaining body.
///
/// Returns `(None, content)` unchanged when the text does not open with a
/// delimiter line or the block is never closed. Leading blank lines before
/// the opening delimiter are allowed. The returned body has the whole block
/// removed and is trimmed of leading blank lines and trailing whitespace.
pub fn parse_frontmatter(content: &str) -> (Option<Metadata>, String) {
    let Some(block) = locate_block(content) else {
        return (None, content.to_string());
    };
    let metadata = parse_mapping(&block.yaml);
    (Some(metadata), trim_blank_lines(&content[block.end..]))
}

/// Serialize `metadata` as a bare `---` delimited block, newline terminated.
///
/// `parse_frontmatter(render_frontmatter(m)? + body)` yields `m` back for any
/// body that has no leading blank lines or trailing whitespace.
pub fn render_frontmatter(metadata: &Metadata) -> Result<String> {
    let yaml = serde_yaml::to_string(metadata).context("serializing frontmatter")?;
    Ok(format!("{DELIMITER}\n{yaml}{DELIMITER}\n"))
}

/// Best-effort check for a `draft: true` line in the head of a source file.
///
/// This overlaps with [`parse_frontmatter`]: it exists for files whose block
/// the structured parser could not recognize, and deliberately matches
/// loosely (any comment depth, any casing, quoted values).
pub fn scan_draft_flag(content: &str) -> bool {
    content
        .lines()
        .take(DRAFT_SCAN_LINES)
        .any(|line| DRAFT_LINE.is_match(line))
}

fn locate_block(content: &str) -> Option<Block> {
    let mut offset = 0;
    let mut lines = content.split_inclusive('\n');

    let style = loop {
        let line = lines.next()?;
        offset += line.len();
        let text = strip_line_ending(line);
        if text.trim().is_empty() {
            continue;
        }
        break delimiter_style(text)?;
    };

    let mut yaml = String::new();
    for line in lines {
        offset += line.len();
        let text = strip_line_ending(line);
        if delimiter_style(text) == Some(style) {
            return Some(Block { yaml, end: offset });
        }
        match style {
            BlockStyle::Bare => yaml.push_str(text),
            BlockStyle::Commented => yaml.push_str(uncomment(text)?),
        }
        yaml.push('\n');
    }
    None
}

fn delimiter_style(line: &str) -> Option<BlockStyle> {
    let line = line.trim_end();
    if line == DELIMITER {
        return Some(BlockStyle::Bare);
    }
    match line.strip_prefix('#') {
        Some(rest) if rest.trim_start() == DELIMITER => Some(BlockStyle::Commented),
        _ => None,
    }
}

// Inside a commented block every line must be a comment (or blank); anything
// else means the block is not frontmatter at all.
fn uncomment(line: &str) -> Option<&str> {
    if line.trim().is_empty() {
        return Some("");
    }
    line.strip_prefix("# ").or_else(|| line.strip_prefix('#'))
}

fn parse_mapping(yaml: &str) -> Metadata {
    match serde_yaml::from_str::<Value>(yaml) {
        Ok(Value::Object(map)) => map,
        Ok(Value::Null) => Metadata::new(),
        Ok(other) => {
            warn!(
                found = value_kind(&other),
                "frontmatter is not a mapping; using empty metadata"
            );
            Metadata::new()
        }
        Err(err) => {
            warn!(error = %err, "frontmatter is not valid YAML; using empty metadata");
            Metadata::new()
        }
    }
}

fn strip_line_ending(line: &str) -> &str {
    line.trim_end_matches('\n').trim_end_matches('\r')
}

fn trim_blank_lines(text: &str) -> String {
    let mut rest = text;
    while let Some(idx) = rest.find('\n') {
        if !rest[..idx].trim().is_empty() {
            break;
        }
        rest = &rest[idx + 1..];
    }
    rest.trim_end().to_string()
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_bare_block_and_strips_it() {
        let content = "---\ndeploy: true\ncmd: [\"prefect\", \"deployment\", \"build\", \"test.py:flow_name\"]\n---\nimport prefect\n";
        let (metadata, body) = parse_frontmatter(content);
        let metadata = metadata.expect("frontmatter present");
        assert_eq!(
            Value::Object(metadata),
            json!({
                "deploy": true,
                "cmd": ["prefect", "deployment", "build", "test.py:flow_name"]
            })
        );
        assert_eq!(body, "import prefect");
    }

    #[test]
    fn content_without_delimiter_is_returned_unchanged() {
        let content = "import prefect\n\n# This is a test file\n";
        let (metadata, body) = parse_frontmatter(content);
        assert!(metadata.is_none());
        assert_eq!(body, content);
    }

    #[test]
    fn delimiter_after_code_is_not_frontmatter() {
        let content = "import os\n---\ntitle: nope\n---\n";
        let (metadata, body) = parse_frontmatter(content);
        assert!(metadata.is_none());
        assert_eq!(body, content);
    }

    #[test]
    fn unclosed_block_is_not_frontmatter() {
        let content = "---\ntitle: Hello\nimport prefect\n";
        let (metadata, body) = parse_frontmatter(content);
        assert!(metadata.is_none());
        assert_eq!(body, content);
    }

    #[test]
    fn parses_commented_block() {
        let content = "# ---\n# title: Hello, world!\n# tags: [getting_started, basics]\n# env:\n#   PREFECT_LOGGING_LEVEL: DEBUG\n# ---\n#\n# Welcome\n\nfrom prefect import flow\n";
        let (metadata, body) = parse_frontmatter(content);
        let metadata = metadata.expect("frontmatter present");
        assert_eq!(metadata["title"], json!("Hello, world!"));
        assert_eq!(metadata["tags"], json!(["getting_started", "basics"]));
        assert_eq!(metadata["env"], json!({"PREFECT_LOGGING_LEVEL": "DEBUG"}));
        assert_eq!(body, "#\n# Welcome\n\nfrom prefect import flow");
    }

    #[test]
    fn commented_block_with_code_line_is_rejected() {
        let content = "# ---\n# title: x\nimport os\n# ---\n";
        let (metadata, body) = parse_frontmatter(content);
        assert!(metadata.is_none());
        assert_eq!(body, content);
    }

    #[test]
    fn malformed_yaml_degrades_to_empty_metadata() {
        let content = "---\ntitle: [unclosed\n---\n\nprint('hi')\n\n";
        let (metadata, body) = parse_frontmatter(content);
        assert_eq!(metadata, Some(Metadata::new()));
        assert_eq!(body, "print('hi')");
    }

    #[test]
    fn scalar_block_degrades_to_empty_metadata() {
        let (metadata, body) = parse_frontmatter("---\njust text\n---\nx = 1");
        assert_eq!(metadata, Some(Metadata::new()));
        assert_eq!(body, "x = 1");
    }

    #[test]
    fn tolerates_leading_blank_lines_and_crlf() {
        let content = "\r\n---\r\ndraft: true\r\n---\r\n\r\nbody\r\n";
        let (metadata, body) = parse_frontmatter(content);
        assert_eq!(metadata.expect("frontmatter")["draft"], json!(true));
        assert_eq!(body, "body");
    }

    #[test]
    fn rendered_block_round_trips() -> Result<()> {
        let Value::Object(metadata) = json!({
            "title": "Retries",
            "description": "Retry a flaky task: with backoff",
            "deploy": false,
            "draft": true,
            "pytest": false,
            "cmd": ["python", "02_flows/retries.py"],
            "args": ["--count", "3"],
            "tags": ["flows", "retries"],
            "env": {"PREFECT_API_URL": "http://localhost:4200/api"},
            "dependencies": ["prefect", "httpx"],
            "icon": "rotate"
        }) else {
            unreachable!()
        };
        let body = "from prefect import flow\n\n\n@flow\ndef main():\n    pass";
        let rendered = render_frontmatter(&metadata)? + body;
        let (parsed, parsed_body) = parse_frontmatter(&rendered);
        assert_eq!(parsed, Some(metadata));
        assert_eq!(parsed_body, body);
        Ok(())
    }

    #[test]
    fn draft_scan_matches_loose_forms() {
        assert!(scan_draft_flag("# ---\n# draft: true\n# ---\n"));
        assert!(scan_draft_flag("## Draft:   \"True\"  # wip\n"));
        assert!(scan_draft_flag("draft: yes"));
        assert!(!scan_draft_flag("# draft: false\n"));
        assert!(!scan_draft_flag("undrafted: true\n"));
    }

    #[test]
    fn draft_scan_only_reads_the_head() {
        let mut content = "x = 1\n".repeat(DRAFT_SCAN_LINES);
        content.push_str("# draft: true\n");
        assert!(!scan_draft_flag(&content));
    }
}
