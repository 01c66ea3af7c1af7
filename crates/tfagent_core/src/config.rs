//! Agent configuration.
//!
//! Loaded from TOML (`--config <path>` or `./tfagent.toml`), then overridden
//! from the environment. API keys are never read from the file.
//!
//! ```toml
//! [paths]
//! stacks_dir = "terraform/stacks"
//! runs_dir = "output/runs"
//!
//! [scope]
//! project_id = "my-proj"
//! default_region = "europe-west1"
//!
//! [policy]
//! forbidden_identifiers = ["project_id", "var.project_id", "region", "var.region"]
//!
//! [llm]
//! provider = "openai"
//! temperature = 0.1
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tfagent_chat::LlmSettings;
use tfagent_iac::{ProviderConfig, StackSanitization, WorkspaceLayout, DEFAULT_STACK_NAME};
use tfagent_policy::OwnershipPolicy;

use crate::error::{CoreError, CoreResult};
use crate::scope::ScopeConfig;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "tfagent.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub stacks_dir: PathBuf,
    pub runs_dir: PathBuf,
    pub default_stack: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            stacks_dir: PathBuf::from("terraform/stacks"),
            runs_dir: PathBuf::from("output/runs"),
            default_stack: DEFAULT_STACK_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySettings {
    #[serde(flatten)]
    pub ownership: OwnershipPolicy,
    /// YAML policy file replacing the inline identifiers and keywords
    pub file: Option<PathBuf>,
    /// Rewrite multi-line quoted values as heredocs
    pub repair_multiline: bool,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            ownership: OwnershipPolicy::default(),
            file: None,
            repair_multiline: true,
        }
    }
}

impl PolicySettings {
    /// The effective policy, reading `file` when set.
    pub fn resolve(&self) -> CoreResult<OwnershipPolicy> {
        match &self.file {
            Some(path) => Ok(OwnershipPolicy::from_yaml_file(path)?),
            None => {
                self.ownership.validate()?;
                Ok(self.ownership.clone())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerraformSettings {
    pub binary: String,
    /// Per-command timeout in seconds (0 = none)
    pub timeout_seconds: u64,
}

impl Default for TerraformSettings {
    fn default() -> Self {
        Self {
            binary: "terraform".to_string(),
            timeout_seconds: 0,
        }
    }
}

/// Complete agent configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub paths: PathsConfig,
    pub scope: ScopeConfig,
    pub policy: PolicySettings,
    pub stack_sanitization: StackSanitization,
    pub provider: ProviderConfig,
    pub llm: LlmSettings,
    pub terraform: TerraformSettings,
}

impl AgentConfig {
    /// Load from `path`, or from `./tfagent.toml` if present, then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::from_file(default_path)?
                } else {
                    debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a TOML file without environment overrides.
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content).map_err(|message| CoreError::InvalidConfig {
            path: path.to_path_buf(),
            message,
        })?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Apply environment overrides through `lookup`.
    ///
    /// `TFAGENT_*` variables always win. The Google Cloud variables only
    /// fill values that are still unset.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = get("TFAGENT_STACKS_DIR") {
            self.paths.stacks_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("TFAGENT_RUNS_DIR") {
            self.paths.runs_dir = PathBuf::from(dir);
        }

        if let Some(project) = get("TFAGENT_PROJECT_ID") {
            self.scope.project_id = Some(project);
        } else if self.scope.project_id.is_none() {
            self.scope.project_id = get("GOOGLE_CLOUD_PROJECT");
        }

        if let Some(region) = get("TFAGENT_REGION") {
            self.scope.region = Some(region);
        } else if self.scope.region.is_none() {
            self.scope.region = get("GOOGLE_CLOUD_REGION").or_else(|| get("GOOGLE_CLOUD_LOCATION"));
        }

        if let Some(provider) = get("TFAGENT_LLM_PROVIDER") {
            self.llm.provider = Some(provider);
        }
        if let Some(model) = get("TFAGENT_LLM_MODEL") {
            self.llm.model = Some(model);
        }
    }

    pub fn layout(&self) -> WorkspaceLayout {
        WorkspaceLayout::new(&self.paths.stacks_dir, &self.paths.runs_dir)
    }
}
