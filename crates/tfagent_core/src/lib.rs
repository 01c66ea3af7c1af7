//! # tfagent_core
//!
//! Natural-language request in, sanitized Terraform stack out.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use tfagent_chat::LlmAdapter;
//! use tfagent_core::{AgentConfig, GenerationRequest, Orchestrator};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AgentConfig::load(None)?;
//! let client = Arc::new(LlmAdapter::from_settings(&config.llm)?);
//! let orchestrator = Orchestrator::from_config(&config, client)?;
//!
//! let outcome = orchestrator
//!     .generate_infrastructure(&GenerationRequest::new(
//!         "Create a storage bucket named logs-bucket, project id my-proj, region europe-west1",
//!     ))
//!     .await?;
//! println!("{}", outcome.workspace.display());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod extractor;
pub mod orchestrator;
pub mod prompt;
pub mod scope;

pub use config::{AgentConfig, PathsConfig, PolicySettings, TerraformSettings, DEFAULT_CONFIG_FILE};
pub use error::{CoreError, CoreResult};
pub use extractor::extract;
pub use orchestrator::{GenerationOutcome, GenerationRequest, Orchestrator};
pub use prompt::system_prompt;
pub use scope::{ScopeConfig, ScopeResolver, DEFAULT_REGION};
