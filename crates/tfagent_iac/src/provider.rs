//! System-owned provider wiring.
//!
//! The provider block, the ownership variable declarations and the tfvars
//! values are rendered here and nowhere else. Model output never reaches
//! these files.

use serde::{Deserialize, Serialize};

/// Project and region every generated stack is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudScope {
    pub project_id: String,
    pub region: String,
}

impl CloudScope {
    pub fn new(project_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            region: region.into(),
        }
    }
}

/// Settings for the rendered provider files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Terraform `required_version` constraint
    pub terraform_version: String,
    pub provider_name: String,
    pub provider_source: String,
    pub provider_version: String,
    /// Default for the `region` variable
    pub default_region: String,
    /// Optional service account key passed to the provider
    pub credentials_file: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            terraform_version: ">= 1.5.0".to_string(),
            provider_name: "google".to_string(),
            provider_source: "hashicorp/google".to_string(),
            provider_version: "~> 5.0".to_string(),
            default_region: "us-central1".to_string(),
            credentials_file: None,
        }
    }
}

impl ProviderConfig {
    /// Render `providers.tf`.
    pub fn providers_tf(&self) -> String {
        let credentials = self
            .credentials_file
            .as_deref()
            .map(|path| format!("  credentials = file(\"{}\")\n", escape_hcl(path)))
            .unwrap_or_default();

        format!(
            r#"terraform {{
  required_version = "{version}"

  required_providers {{
    {name} = {{
      source  = "{source}"
      version = "{provider_version}"
    }}
  }}
}}

provider "{name}" {{
  project = var.project_id
  region  = var.region
{credentials}}}
"#,
            version = escape_hcl(&self.terraform_version),
            name = self.provider_name,
            source = escape_hcl(&self.provider_source),
            provider_version = escape_hcl(&self.provider_version),
            credentials = credentials,
        )
    }

    /// Render the root `variables.tf`.
    pub fn variables_tf(&self) -> String {
        format!(
            r#"variable "project_id" {{
  description = "GCP Project ID"
  type        = string
}}

variable "region" {{
  description = "GCP region"
  type        = string
  default     = "{region}"
}}
"#,
            region = escape_hcl(&self.default_region),
        )
    }

    /// Render `terraform.tfvars` for a resolved scope.
    pub fn tfvars(&self, scope: &CloudScope) -> String {
        format!(
            "project_id = \"{}\"\nregion     = \"{}\"\n",
            escape_hcl(&scope.project_id),
            escape_hcl(&scope.region),
        )
    }
}

fn escape_hcl(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace("${", "$${")
}
