//! The generation pipeline.
//!
//! `generate_infrastructure` is the only path by which model output reaches
//! the disk: resolve scope, call the model, extract, materialize, audit.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use tfagent_chat::{ModelClient, OutputFormat};
use tfagent_iac::{
    CloudScope, MaterializeReport, Materializer, ProviderConfig, StackSanitization, StackWorkspace,
    WorkspaceLayout, DEFAULT_STACK_NAME,
};
use tfagent_policy::{OwnershipPolicy, RuleViolation, Sanitizer, WorkspaceAudit};

use crate::config::AgentConfig;
use crate::error::CoreResult;
use crate::extractor::extract;
use crate::prompt::system_prompt;
use crate::scope::{ScopeConfig, ScopeResolver};

/// One generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub text: String,
    pub stack_name: Option<String>,
}

impl GenerationRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            stack_name: None,
        }
    }

    pub fn with_stack(mut self, name: impl Into<String>) -> Self {
        self.stack_name = Some(name.into());
        self
    }
}

/// Result of a successful generation.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    pub stack_name: String,
    pub workspace: PathBuf,
    pub scope: CloudScope,
    pub report: MaterializeReport,
    /// Findings of the post-write audit; empty when the policy held
    pub violations: Vec<RuleViolation>,
}

/// Composes model, extractor and materializer.
pub struct Orchestrator {
    client: Arc<dyn ModelClient>,
    layout: WorkspaceLayout,
    materializer: Materializer,
    audit: WorkspaceAudit,
    scope: ScopeResolver,
    system_prompt: String,
    default_stack: String,
}

impl Orchestrator {
    pub fn new(
        client: Arc<dyn ModelClient>,
        layout: WorkspaceLayout,
        policy: OwnershipPolicy,
        provider: ProviderConfig,
        scope: ScopeConfig,
    ) -> Self {
        Self {
            client,
            layout,
            system_prompt: system_prompt(&policy),
            audit: WorkspaceAudit::new(policy.clone())
                .with_system_owned(StackWorkspace::system_owned_files()),
            materializer: Materializer::new(Sanitizer::new(policy), provider),
            scope: ScopeResolver::new(scope),
            default_stack: DEFAULT_STACK_NAME.to_string(),
        }
    }

    /// Build from a loaded [`AgentConfig`].
    pub fn from_config(config: &AgentConfig, client: Arc<dyn ModelClient>) -> CoreResult<Self> {
        let policy = config.policy.resolve()?;
        Ok(Self::new(
            client,
            config.layout(),
            policy,
            config.provider.clone(),
            config.scope.clone(),
        )
        .with_stack_sanitization(config.stack_sanitization)
        .with_multiline_repair(config.policy.repair_multiline)
        .with_default_stack(&config.paths.default_stack))
    }

    pub fn with_stack_sanitization(mut self, mode: StackSanitization) -> Self {
        self.materializer = self.materializer.with_stack_sanitization(mode);
        self
    }

    pub fn with_multiline_repair(mut self, enabled: bool) -> Self {
        self.materializer = self.materializer.with_multiline_repair(enabled);
        self
    }

    pub fn with_default_stack(mut self, name: impl Into<String>) -> Self {
        self.default_stack = name.into();
        self
    }

    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Generate a stack from free text.
    ///
    /// Scope is resolved before the model is called, so a request without a
    /// project id costs nothing. Errors are terminal: there is no retry and
    /// files already written stay in place.
    pub async fn generate_infrastructure(&self, request: &GenerationRequest) -> CoreResult<GenerationOutcome> {
        let stack_name = request
            .stack_name
            .clone()
            .unwrap_or_else(|| self.default_stack.clone());

        let scope = self.scope.resolve(&request.text)?;
        let workspace = self.layout.stack(&stack_name)?;

        info!(
            "Generating stack '{}' for project {} in {}",
            stack_name, scope.project_id, scope.region
        );

        let raw = self
            .client
            .invoke(&self.system_prompt, &request.text, OutputFormat::Json)
            .await?;
        debug!("Raw model output:\n{}", raw);

        let document = extract(&raw)?;
        let report = self.materializer.materialize(&document, &workspace, &scope)?;

        let violations = self.audit.run(workspace.root())?;
        for violation in &violations {
            warn!(
                "Policy audit: {} ({}:{})",
                violation.message,
                violation.file.as_deref().unwrap_or("?"),
                violation.line.unwrap_or(0)
            );
        }

        info!("Terraform generated at {}", workspace.root().display());

        Ok(GenerationOutcome {
            stack_name,
            workspace: workspace.root().to_path_buf(),
            scope,
            report,
            violations,
        })
    }
}
