//! Validated view of an example's frontmatter.
//!
//! Recognized keys are typed fields; anything else lands in `extra` untouched
//! so newer keys survive a round trip through the catalog. Serialization
//! flattens everything back into one plain mapping.

use crate::frontmatter::{Metadata, value_kind};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("frontmatter key '{key}' must be {expected}, found {found}")]
    WrongType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("frontmatter key '{key}' contains {found} at position {index}; expected a string")]
    WrongItem {
        key: String,
        index: usize,
        found: &'static str,
    },
    #[error("frontmatter key 'env' maps '{name}' to {found}; expected a string")]
    WrongEnvValue { name: String, found: &'static str },
    #[error("frontmatter key 'cmd' must not be an empty sequence")]
    EmptyCommand,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ExampleMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmd: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deploy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pytest: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, String>>,
    /// Unrecognized keys, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExampleMetadata {
    /// Validate a raw frontmatter mapping.
    ///
    /// Scalars inside string sequences and `env` values (numbers, booleans)
    /// are coerced to their string form, matching how they end up on a
    /// command line. Nested structures are rejected.
    pub fn from_map(raw: Metadata) -> Result<Self, MetadataError> {
        let mut metadata = ExampleMetadata::default();
        for (key, value) in raw {
            match key.as_str() {
                "title" => metadata.title = Some(expect_string(&key, value)?),
                "description" => metadata.description = Some(expect_string(&key, value)?),
                "icon" => metadata.icon = Some(expect_string(&key, value)?),
                "dependencies" => metadata.dependencies = Some(expect_strings(&key, value)?),
                "cmd" => {
                    let cmd = expect_strings(&key, value)?;
                    if cmd.is_empty() {
                        return Err(MetadataError::EmptyCommand);
                    }
                    metadata.cmd = Some(cmd);
                }
                "args" => metadata.args = Some(expect_strings(&key, value)?),
                "tags" => metadata.tags = Some(expect_strings(&key, value)?),
                "deploy" => metadata.deploy = Some(expect_bool(&key, value)?),
                "draft" => metadata.draft = Some(expect_bool(&key, value)?),
                "pytest" => metadata.pytest = Some(expect_bool(&key, value)?),
                "env" => metadata.env = Some(expect_env(value)?),
                _ => {
                    metadata.extra.insert(key, value);
                }
            }
        }
        Ok(metadata)
    }

    pub fn deploy_enabled(&self) -> bool {
        self.deploy.unwrap_or(false)
    }

    pub fn is_draft(&self) -> bool {
        self.draft.unwrap_or(false)
    }

    /// Examples opt out of inline test runs with `pytest: false`.
    pub fn pytest_enabled(&self) -> bool {
        self.pytest.unwrap_or(true)
    }

    pub fn is_empty(&self) -> bool {
        *self == ExampleMetadata::default()
    }
}

fn expect_string(key: &str, value: Value) -> Result<String, MetadataError> {
    match value {
        Value::String(text) => Ok(text),
        other => Err(wrong_type(key, "a string", &other)),
    }
}

fn expect_bool(key: &str, value: Value) -> Result<bool, MetadataError> {
    match value {
        Value::Bool(flag) => Ok(flag),
        other => Err(wrong_type(key, "a boolean", &other)),
    }
}

fn expect_strings(key: &str, value: Value) -> Result<Vec<String>, MetadataError> {
    let Value::Array(items) = value else {
        return Err(wrong_type(key, "a sequence of strings", &value));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            scalar_to_string(item).map_err(|found| MetadataError::WrongItem {
                key: key.to_string(),
                index,
                found,
            })
        })
        .collect()
}

fn expect_env(value: Value) -> Result<BTreeMap<String, String>, MetadataError> {
    let Value::Object(vars) = value else {
        return Err(wrong_type("env", "a mapping of strings", &value));
    };
    vars.into_iter()
        .map(|(name, value)| match scalar_to_string(value) {
            Ok(text) => Ok((name, text)),
            Err(found) => Err(MetadataError::WrongEnvValue { name, found }),
        })
        .collect()
}

fn scalar_to_string(value: Value) -> Result<String, &'static str> {
    match value {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        other => Err(value_kind(&other)),
    }
}

fn wrong_type(key: &str, expected: &'static str, found: &Value) -> MetadataError {
    MetadataError::WrongType {
        key: key.to_string(),
        expected,
        found: value_kind(found),
    }
}
