//! Resolution of the GCP project and region for a request.
//!
//! The request text wins over configuration: "... project id my-proj,
//! region europe-west1" binds that stack to `my-proj` in `europe-west1`
//! whatever the defaults say.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tfagent_iac::CloudScope;

use crate::error::{CoreError, CoreResult};

pub const DEFAULT_REGION: &str = "us-central1";

fn project_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bproject[\s_-]?id\b\s*[:=]?\s*([a-z0-9][a-z0-9_-]*[a-z0-9])")
            .expect("valid project regex")
    })
}

fn region_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bregion\s*[:=]?\s*([a-z]+-[a-z]+[0-9]+)\b").expect("valid region regex")
    })
}

/// Explicit scope settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    pub project_id: Option<String>,
    pub region: Option<String>,
    /// Region used when neither the request nor `region` names one
    pub default_region: String,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            region: None,
            default_region: DEFAULT_REGION.to_string(),
        }
    }
}

/// Project id named in free text, if any.
pub fn project_from_text(text: &str) -> Option<String> {
    project_regex()
        .captures(text)
        .map(|caps| caps[1].to_string())
}

/// Region named in free text, if any.
pub fn region_from_text(text: &str) -> Option<String> {
    region_regex()
        .captures(text)
        .map(|caps| caps[1].to_lowercase())
}

/// Turns request text plus [`ScopeConfig`] into a [`CloudScope`].
#[derive(Debug, Clone, Default)]
pub struct ScopeResolver {
    config: ScopeConfig,
}

impl ScopeResolver {
    pub fn new(config: ScopeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScopeConfig {
        &self.config
    }

    /// Fails with [`CoreError::MissingScope`] when no project id is known.
    pub fn resolve(&self, text: &str) -> CoreResult<CloudScope> {
        let project_id = project_from_text(text)
            .or_else(|| non_empty(&self.config.project_id))
            .ok_or(CoreError::MissingScope)?;

        let region = region_from_text(text)
            .or_else(|| non_empty(&self.config.region))
            .unwrap_or_else(|| self.config.default_region.clone());

        debug!("Resolved scope: project {} in {}", project_id, region);
        Ok(CloudScope::new(project_id, region))
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
