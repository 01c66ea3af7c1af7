//! Post-write audit of a stack workspace.
//!
//! Walks every Terraform file the model contributed and reports anything the
//! ownership policy forbids. A clean run is the on-disk proof that
//! sanitization happened before every write.

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{PolicyError, PolicyResult};
use crate::policy::OwnershipPolicy;

/// Rule severity levels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuleSeverity {
    Error,
    Warning,
    Info,
}

/// A single audit finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleViolation {
    pub rule_id: String,
    pub severity: RuleSeverity,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<usize>,
}

/// Audits a written stack workspace against an [`OwnershipPolicy`].
pub struct WorkspaceAudit {
    policy: OwnershipPolicy,
    /// Paths relative to the stack root that the system writes itself
    system_owned: Vec<String>,
    /// Glob patterns of files to inspect
    paths: Vec<String>,
}

impl WorkspaceAudit {
    pub fn new(policy: OwnershipPolicy) -> Self {
        Self {
            policy,
            system_owned: vec![
                "providers.tf".to_string(),
                "variables.tf".to_string(),
                "terraform.tfvars".to_string(),
            ],
            paths: vec!["**/*.tf".to_string(), "*.tf".to_string()],
        }
    }

    pub fn with_system_owned(mut self, files: Vec<String>) -> Self {
        self.system_owned = files;
        self
    }

    fn block_regex(&self) -> PolicyResult<Option<Regex>> {
        if self.policy.block_keywords.is_empty() {
            return Ok(None);
        }
        let keywords: Vec<String> = self
            .policy
            .block_keywords
            .iter()
            .map(|k| regex::escape(k))
            .collect();
        let pattern = format!(r#"^\s*({})\s*("|\{{|$)"#, keywords.join("|"));
        Regex::new(&pattern)
            .map(Some)
            .map_err(|e| PolicyError::UnusableKeyword {
                keyword: self.policy.block_keywords.join(", "),
                reason: e.to_string(),
            })
    }

    /// Inspect every model-owned file under `root`.
    pub fn run(&self, root: &Path) -> PolicyResult<Vec<RuleViolation>> {
        let block_regex = self.block_regex()?;
        let mut violations = Vec::new();

        for entry in WalkDir::new(root)
            .into_iter()
            .filter_entry(|e| e.file_name() != ".terraform")
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
        {
            let file_path = entry.path();
            let relative = file_path.strip_prefix(root).unwrap_or(file_path);
            let relative_str = relative.to_string_lossy().replace('\\', "/");

            if self.system_owned.iter().any(|f| f.eq_ignore_ascii_case(&relative_str)) {
                continue;
            }

            let matches_path = self.paths.iter().any(|p| {
                glob::Pattern::new(p)
                    .map(|pat| pat.matches_path(relative))
                    .unwrap_or(false)
            });
            if !matches_path {
                continue;
            }

            debug!("Auditing {}", relative_str);
            let content = std::fs::read_to_string(file_path)?;

            for (line_num, line) in content.lines().enumerate() {
                if let Some(identifier) = self.policy.find_forbidden(line) {
                    violations.push(RuleViolation {
                        rule_id: "forbidden-identifier".to_string(),
                        severity: RuleSeverity::Error,
                        message: format!("Forbidden identifier '{}' in model-owned file", identifier),
                        file: Some(relative_str.clone()),
                        line: Some(line_num + 1),
                    });
                }
                if block_regex.as_ref().is_some_and(|re| re.is_match(line)) {
                    violations.push(RuleViolation {
                        rule_id: "reserved-block".to_string(),
                        severity: RuleSeverity::Error,
                        message: "Reserved block in model-owned file".to_string(),
                        file: Some(relative_str.clone()),
                        line: Some(line_num + 1),
                    });
                }
            }
        }

        Ok(violations)
    }
}
