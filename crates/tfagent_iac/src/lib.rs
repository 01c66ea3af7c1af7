//! # tfagent_iac
//!
//! Stack workspaces, materialization of generated Terraform, and the
//! human-gated Terraform lifecycle.
//!
//! ## Features
//!
//! - Workspace layout keyed by stack name, with system-owned files
//! - Field-by-field validation of the untrusted generation document
//! - Materialization through the ownership sanitizers, sanitize-before-write
//! - `init` / `plan` / `apply` / `destroy` through a [`tfagent_runner::CommandRunner`]
//! - Confirmation gates for `apply` and `destroy`
//!
//! ## Example
//!
//! ```rust,no_run
//! use tfagent_iac::{CloudScope, Materializer, ProviderConfig, UntrustedDocument, WorkspaceLayout};
//! use tfagent_policy::{OwnershipPolicy, Sanitizer};
//!
//! let layout = WorkspaceLayout::new("terraform/stacks", "output/runs");
//! let workspace = layout.stack("gcp_stack").unwrap();
//!
//! let document = UntrustedDocument::from_value(serde_json::json!({
//!     "modules": [],
//!     "stack": { "main.tf": "locals {}" }
//! }));
//!
//! let materializer = Materializer::new(Sanitizer::new(OwnershipPolicy::default()), ProviderConfig::default());
//! let scope = CloudScope::new("my-proj", "europe-west1");
//! materializer.materialize(&document, &workspace, &scope).unwrap();
//! ```

pub mod document;
pub mod error;
pub mod gate;
pub mod materializer;
pub mod provider;
pub mod terraform;
pub mod workspace;

pub use document::{GenerationDocument, ModuleSpec, UntrustedDocument};
pub use error::{IacError, IacResult};
pub use gate::{Confirmer, LifecycleGate, NonInteractive, DESTROY_PHRASE};
pub use materializer::{MaterializeReport, Materializer, StackSanitization};
pub use provider::{CloudScope, ProviderConfig};
pub use terraform::{LifecycleCommand, TerraformResult, TerraformRunner};
pub use workspace::{StackWorkspace, WorkspaceLayout, DEFAULT_STACK_NAME, MODULE_FILES};
