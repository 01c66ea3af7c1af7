//! End-to-end generation with a scripted model.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::tempdir;
use walkdir::WalkDir;

use tfagent_chat::ScriptedModel;
use tfagent_core::{AgentConfig, CoreError, GenerationRequest, Orchestrator};
use tfagent_iac::{IacError, ProviderConfig};

/// Reply shaped like a real model that ignored half of its instructions.
const MODEL_REPLY: &str = r#"Sure! Here is your Terraform:
```json
{
  "modules": [
    {
      "name": "logs_bucket",
      "files": {
        "main.tf": "terraform {\n  required_providers {\n    google = {\n      source = \"hashicorp/google\"\n    }\n  }\n}\n\nprovider \"google\" {\n  project = var.project_id\n  region  = var.region\n}\n\nresource \"google_storage_bucket\" \"this\" {\n  name                        = var.bucket_name\n  location                    = var.location\n  project                     = var.project_id\n  uniform_bucket_level_access = true\n}",
        "variables.tf": "variable \"project_id\" {\n  type = string\n}\n\nvariable \"region\" {\n  type    = string\n  default = \"us-central1\"\n}\n\nvariable \"bucket_name\" {\n  type = string\n}\n\nvariable \"location\" {\n  type    = string\n  default = \"EU\"\n}",
        "outputs.tf": "output \"bucket_url\" {\n  value = google_storage_bucket.this.url\n}"
      }
    }
  ],
  "stack": {
    "main.tf": "module \"logs_bucket\" {\n  source      = \"./modules/logs_bucket\"\n  project_id  = var.project_id\n  region      = var.region\n  bucket_name = \"logs-bucket\"\n}",
    "variables.tf": "variable \"project_id\" {\n  type    = string\n  default = \"attacker-project\"\n}",
    "outputs.tf": "output \"bucket_url\" {\n  value = module.logs_bucket.bucket_url\n}"
  }
}
```
Let me know if you need anything else."#;

fn config_for(root: &Path) -> AgentConfig {
    let mut config = AgentConfig::default();
    config.paths.stacks_dir = root.join("stacks");
    config.paths.runs_dir = root.join("runs");
    config
}

fn model_owned_files(stack: &Path) -> Vec<std::path::PathBuf> {
    let system_owned = ["providers.tf", "variables.tf", "terraform.tfvars"];
    WalkDir::new(stack)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter(|e| {
            let relative = e.path().strip_prefix(stack).unwrap();
            !system_owned.iter().any(|f| relative == Path::new(f))
        })
        .map(|e| e.path().to_path_buf())
        .collect()
}

#[tokio::test]
async fn test_bucket_request_end_to_end() {
    let temp = tempdir().unwrap();
    let model = ScriptedModel::new().reply(MODEL_REPLY);
    let orchestrator = Orchestrator::from_config(&config_for(temp.path()), Arc::new(model)).unwrap();

    let outcome = orchestrator
        .generate_infrastructure(&GenerationRequest::new(
            "Create a storage bucket named logs-bucket, project id my-proj, region europe-west1",
        ))
        .await
        .unwrap();

    assert_eq!(outcome.stack_name, "gcp_stack");
    assert_eq!(outcome.scope.project_id, "my-proj");
    assert_eq!(outcome.scope.region, "europe-west1");
    assert!(outcome.violations.is_empty());

    let stack = outcome.workspace.as_path();
    assert_eq!(stack, temp.path().join("stacks").join("gcp_stack"));

    let provider = ProviderConfig::default();
    assert_eq!(fs::read_to_string(stack.join("variables.tf")).unwrap(), provider.variables_tf());
    assert_eq!(fs::read_to_string(stack.join("providers.tf")).unwrap(), provider.providers_tf());
    assert_eq!(
        fs::read_to_string(stack.join("terraform.tfvars")).unwrap(),
        "project_id = \"my-proj\"\nregion     = \"europe-west1\"\n"
    );

    let modules: Vec<_> = fs::read_dir(stack.join("modules")).unwrap().collect();
    assert_eq!(modules.len(), 1);
    for file in ["main.tf", "variables.tf", "outputs.tf"] {
        assert!(stack.join("modules/logs_bucket").join(file).is_file());
    }

    for path in model_owned_files(stack) {
        let content = fs::read_to_string(&path).unwrap();
        for needle in ["project_id =", "region =", "project_id", "var.region", "provider \"google\"", "terraform {"] {
            assert!(!content.contains(needle), "{} leaked into {}", needle, path.display());
        }
        assert!(!content.contains("attacker-project"));
    }

    let module_vars = fs::read_to_string(stack.join("modules/logs_bucket/variables.tf")).unwrap();
    assert!(module_vars.contains("variable \"bucket_name\""));
    assert!(module_vars.contains("variable \"location\""));

    let wiring = fs::read_to_string(stack.join("main.tf")).unwrap();
    assert_eq!(
        wiring,
        "module \"logs_bucket\" {\n  source      = \"./modules/logs_bucket\"\n  bucket_name = \"logs-bucket\"\n}"
    );
}

#[tokio::test]
async fn test_later_generation_overwrites() {
    let temp = tempdir().unwrap();
    let model = ScriptedModel::new()
        .reply(MODEL_REPLY)
        .reply(r#"{"modules": [], "stack": {"main.tf": "locals {\n  replaced = true\n}"}}"#);
    let orchestrator = Orchestrator::from_config(&config_for(temp.path()), Arc::new(model)).unwrap();
    let request = GenerationRequest::new("bucket, project id my-proj");

    orchestrator.generate_infrastructure(&request).await.unwrap();
    let outcome = orchestrator.generate_infrastructure(&request).await.unwrap();

    assert_eq!(
        fs::read_to_string(outcome.workspace.join("main.tf")).unwrap(),
        "locals {\n  replaced = true\n}"
    );
    assert_eq!(outcome.scope.region, "us-central1");
}

#[tokio::test]
async fn test_invalid_documents_are_rejected() {
    let temp = tempdir().unwrap();
    let model = ScriptedModel::new()
        .reply(r#"{"modules": [{"files": {"main.tf": ""}}]}"#)
        .reply(r#"{"modules": [{"name": "../../escape", "files": {}}]}"#)
        .reply("{not valid}");
    let orchestrator = Orchestrator::from_config(&config_for(temp.path()), Arc::new(model)).unwrap();
    let request = GenerationRequest::new("bucket, project id my-proj");

    let err = orchestrator.generate_infrastructure(&request).await.unwrap_err();
    assert!(matches!(err, CoreError::Iac(IacError::MissingRequiredField { .. })));

    let err = orchestrator.generate_infrastructure(&request).await.unwrap_err();
    assert!(matches!(err, CoreError::Iac(IacError::InvalidField { .. })));
    assert!(!temp.path().join("escape").exists());

    let err = orchestrator.generate_infrastructure(&request).await.unwrap_err();
    assert_eq!(err.raw_response(), Some("{not valid}"));
}

#[tokio::test]
async fn test_unsafe_stack_name_rejected() {
    let temp = tempdir().unwrap();
    let model = ScriptedModel::new().reply("{}");
    let orchestrator = Orchestrator::from_config(&config_for(temp.path()), Arc::new(model.clone())).unwrap();

    let err = orchestrator
        .generate_infrastructure(&GenerationRequest::new("project id p1").with_stack("../x"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Iac(IacError::InvalidName { .. })));
    assert_eq!(model.request_count(), 0);
}
