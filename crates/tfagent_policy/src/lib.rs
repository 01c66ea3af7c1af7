//! # tfagent_policy
//!
//! Ownership policy enforcement over model-generated Terraform.
//!
//! This crate provides:
//! - **Ownership Policy**: the forbidden identifiers and block keywords, as data
//! - **Sanitizer**: line-oriented, idempotent rewrites of a single file body
//! - **Multi-line Repair**: turns broken multi-line string values into heredocs
//! - **Workspace Audit**: walks a written stack and reports anything that slipped through
//!
//! ## Example
//!
//! ```rust
//! use tfagent_policy::{OwnershipPolicy, Sanitizer};
//!
//! let sanitizer = Sanitizer::new(OwnershipPolicy::default());
//!
//! let body = r#"
//! provider "google" {
//!   project = var.project_id
//! }
//!
//! resource "google_storage_bucket" "logs" {
//!   name     = "logs-bucket"
//!   location = "EU"
//! }
//! "#;
//!
//! let clean = sanitizer.sanitize_definition_body(body);
//! assert!(!clean.contains("provider"));
//! assert!(clean.starts_with("resource"));
//! ```

pub mod audit;
pub mod error;
pub mod multiline;
pub mod policy;
pub mod sanitizer;

pub use audit::{RuleSeverity, RuleViolation, WorkspaceAudit};
pub use error::{PolicyError, PolicyResult};
pub use multiline::repair_multiline_values;
pub use policy::OwnershipPolicy;
pub use sanitizer::{SanitizeOutcome, Sanitizer, SanitizerKind};
