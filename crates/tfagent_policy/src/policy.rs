//! Ownership policy definition.
//!
//! The policy is data, not code: which identifiers the model may never
//! declare, assign or reference, and which top-level block keywords are
//! reserved for system-owned files. It can be loaded from YAML or embedded
//! in the agent configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, PolicyResult};

/// Identifiers the model must never touch, plus reserved block keywords.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipPolicy {
    /// Matched as plain substrings of a trimmed line
    #[serde(default = "default_forbidden_identifiers")]
    pub forbidden_identifiers: Vec<String>,
    /// Keywords whose blocks are dropped wholesale (`terraform {}`, `provider "x" {}`)
    #[serde(default = "default_block_keywords")]
    pub block_keywords: Vec<String>,
}

fn default_forbidden_identifiers() -> Vec<String> {
    ["project_id", "var.project_id", "region", "var.region"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_block_keywords() -> Vec<String> {
    vec!["terraform".to_string(), "provider".to_string()]
}

impl Default for OwnershipPolicy {
    fn default() -> Self {
        Self {
            forbidden_identifiers: default_forbidden_identifiers(),
            block_keywords: default_block_keywords(),
        }
    }
}

impl OwnershipPolicy {
    /// Load a policy from a YAML file.
    pub fn from_yaml_file(path: &Path) -> PolicyResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let policy: Self = serde_yaml::from_str(&content).map_err(|source| PolicyError::PolicyFile {
            path: path.to_path_buf(),
            source,
        })?;
        policy.validate()?;
        Ok(policy)
    }

    /// Add another forbidden identifier.
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        if !self.forbidden_identifiers.contains(&identifier) {
            self.forbidden_identifiers.push(identifier);
        }
        self
    }

    /// Add another reserved block keyword.
    pub fn with_block_keyword(mut self, keyword: impl Into<String>) -> Self {
        let keyword = keyword.into();
        if !self.block_keywords.contains(&keyword) {
            self.block_keywords.push(keyword);
        }
        self
    }

    /// Reject policies that would silently match everything or nothing.
    pub fn validate(&self) -> PolicyResult<()> {
        if self.forbidden_identifiers.is_empty() {
            return Err(PolicyError::InvalidPolicy(
                "at least one forbidden identifier is required".to_string(),
            ));
        }
        if self.forbidden_identifiers.iter().any(|i| i.trim().is_empty()) {
            return Err(PolicyError::InvalidPolicy(
                "forbidden identifiers must not be blank".to_string(),
            ));
        }
        if self.block_keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(PolicyError::InvalidPolicy(
                "block keywords must not be blank".to_string(),
            ));
        }
        Ok(())
    }

    /// First forbidden identifier occurring in `text`, if any.
    pub fn find_forbidden<'a>(&'a self, text: &str) -> Option<&'a str> {
        self.forbidden_identifiers
            .iter()
            .map(String::as_str)
            .find(|id| text.contains(id))
    }

    pub fn contains_forbidden(&self, text: &str) -> bool {
        self.find_forbidden(text).is_some()
    }

    /// Bare variable names owned by the system (`var.region` -> `region`).
    pub fn ownership_variables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .forbidden_identifiers
            .iter()
            .map(|id| id.strip_prefix("var.").unwrap_or(id))
            .filter(|name| !name.contains('.'))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    pub fn is_ownership_variable(&self, name: &str) -> bool {
        self.ownership_variables().contains(&name)
    }

    /// Whether a trimmed line opens a reserved block.
    ///
    /// The keyword must be a whole leading token followed by a label, a brace
    /// or nothing; `provider = google-beta` inside a resource is an attribute.
    pub fn opens_reserved_block(&self, trimmed: &str) -> bool {
        self.block_keywords.iter().any(|keyword| {
            let Some(rest) = trimmed.strip_prefix(keyword.as_str()) else {
                return false;
            };
            match rest.chars().next() {
                None => true,
                Some('{') | Some('"') => true,
                Some(c) if c.is_whitespace() => {
                    let rest = rest.trim_start();
                    rest.is_empty() || rest.starts_with('{') || rest.starts_with('"')
                }
                _ => false,
            }
        })
    }

    /// Whether a trimmed line declares one of the ownership variables.
    pub fn declares_ownership_variable(&self, trimmed: &str) -> bool {
        declared_variable_name(trimmed).is_some_and(|name| self.is_ownership_variable(name))
    }
}

/// Name of the variable declared by a `variable "name" {` line.
pub(crate) fn declared_variable_name(trimmed: &str) -> Option<&str> {
    let rest = trimmed.strip_prefix("variable")?;
    if !rest.starts_with(|c: char| c.is_whitespace() || c == '"') {
        return None;
    }
    let rest = rest.trim_start();
    if let Some(quoted) = rest.strip_prefix('"') {
        let end = quoted.find('"')?;
        return Some(&quoted[..end]);
    }
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(rest.len());
    if end == 0 {
        None
    } else {
        Some(&rest[..end])
    }
}
