//! Materialization of a generation document into a stack workspace.
//!
//! System-owned files are written first and unconditionally. Every
//! model-owned body then passes through the sanitizer for its file role
//! before it is written; the sanitized text is the only thing that ever
//! reaches the disk.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use tfagent_policy::{repair_multiline_values, Sanitizer, SanitizerKind};

use crate::document::{GenerationDocument, ModuleSpec, UntrustedDocument};
use crate::error::IacResult;
use crate::provider::{CloudScope, ProviderConfig};
use crate::workspace::{StackWorkspace, MODULES_DIR, MODULE_FILES, PROVIDERS_FILE, TFVARS_FILE, VARIABLES_FILE};

/// Sanitization applied to stack-level files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackSanitization {
    /// Reserved blocks and forbidden lines are removed.
    #[default]
    Definition,
    /// Only forbidden lines are removed.
    Wiring,
}

impl StackSanitization {
    fn kind(self) -> SanitizerKind {
        match self {
            StackSanitization::Definition => SanitizerKind::Definition,
            StackSanitization::Wiring => SanitizerKind::StackWiring,
        }
    }
}

/// What a materialization wrote and skipped.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MaterializeReport {
    /// Written files, relative to the stack root
    pub written: Vec<PathBuf>,
    /// Files from the document that were not written, relative to the stack root
    pub skipped: Vec<PathBuf>,
    /// Lines removed by sanitization across all files
    pub dropped_lines: usize,
}

/// Writes documents into stack workspaces.
pub struct Materializer {
    sanitizer: Sanitizer,
    provider: ProviderConfig,
    stack_sanitization: StackSanitization,
    repair_multiline: bool,
}

impl Materializer {
    pub fn new(sanitizer: Sanitizer, provider: ProviderConfig) -> Self {
        Self {
            sanitizer,
            provider,
            stack_sanitization: StackSanitization::default(),
            repair_multiline: true,
        }
    }

    pub fn with_stack_sanitization(mut self, mode: StackSanitization) -> Self {
        self.stack_sanitization = mode;
        self
    }

    /// Toggle rewriting of multi-line quoted values as heredocs.
    pub fn with_multiline_repair(mut self, enabled: bool) -> Self {
        self.repair_multiline = enabled;
        self
    }

    pub fn sanitizer(&self) -> &Sanitizer {
        &self.sanitizer
    }

    /// Validate `document` and write it into `workspace`.
    ///
    /// Validation happens before any file is created, so a rejected document
    /// leaves the workspace untouched.
    pub fn materialize(
        &self,
        document: &UntrustedDocument,
        workspace: &StackWorkspace,
        scope: &CloudScope,
    ) -> IacResult<MaterializeReport> {
        let document = document.validate()?;
        self.write_document(&document, workspace, scope)
    }

    /// Write an already validated document.
    pub fn write_document(
        &self,
        document: &GenerationDocument,
        workspace: &StackWorkspace,
        scope: &CloudScope,
    ) -> IacResult<MaterializeReport> {
        info!(
            "Materializing stack '{}' ({} module(s), {} stack file(s))",
            workspace.name(),
            document.modules.len(),
            document.stack.len()
        );

        workspace.ensure_dirs()?;
        let mut report = MaterializeReport::default();

        self.write_system_files(workspace, scope, &mut report)?;

        for module in &document.modules {
            self.write_module(workspace, module, &mut report)?;
        }

        if !document.stack.contains_key("main.tf") {
            warn!("Generated stack has no main.tf");
        }
        for (file_name, body) in &document.stack {
            self.write_stack_file(workspace, file_name, body, &mut report)?;
        }

        info!(
            "Stack '{}' materialized: {} written, {} skipped, {} line(s) sanitized away",
            workspace.name(),
            report.written.len(),
            report.skipped.len(),
            report.dropped_lines
        );
        Ok(report)
    }

    /// Render `providers.tf`, `variables.tf` and `terraform.tfvars`.
    pub fn write_system_files(
        &self,
        workspace: &StackWorkspace,
        scope: &CloudScope,
        report: &mut MaterializeReport,
    ) -> IacResult<()> {
        let files = [
            (PROVIDERS_FILE, self.provider.providers_tf()),
            (VARIABLES_FILE, self.provider.variables_tf()),
            (TFVARS_FILE, self.provider.tfvars(scope)),
        ];

        for (file_name, content) in files {
            fs::write(workspace.file(file_name), content)?;
            report.written.push(PathBuf::from(file_name));
        }
        debug!("System-owned files written for project {}", scope.project_id);
        Ok(())
    }

    fn write_module(
        &self,
        workspace: &StackWorkspace,
        module: &ModuleSpec,
        report: &mut MaterializeReport,
    ) -> IacResult<()> {
        let module_dir = workspace.module_dir(&module.name);
        fs::create_dir_all(&module_dir)?;
        let relative_dir = Path::new(MODULES_DIR).join(&module.name);

        for (file_name, body) in &module.files {
            let relative = relative_dir.join(file_name);

            let kind = match file_name.as_str() {
                "main.tf" => SanitizerKind::Definition,
                "variables.tf" => SanitizerKind::OwnershipVariables,
                "outputs.tf" => SanitizerKind::StackWiring,
                _ => {
                    warn!("Skipping unexpected module file {}", relative.display());
                    report.skipped.push(relative);
                    continue;
                }
            };

            let content = self.sanitize(kind, body, kind == SanitizerKind::Definition, report);
            fs::write(module_dir.join(file_name), content)?;
            report.written.push(relative);
        }

        for required in MODULE_FILES {
            if !module.files.contains_key(required) {
                warn!("Module '{}' has no {}", module.name, required);
            }
        }
        Ok(())
    }

    fn write_stack_file(
        &self,
        workspace: &StackWorkspace,
        file_name: &str,
        body: &str,
        report: &mut MaterializeReport,
    ) -> IacResult<()> {
        if StackWorkspace::is_system_owned(file_name) {
            debug!("Ignoring model-supplied {}", file_name);
            report.skipped.push(PathBuf::from(file_name));
            return Ok(());
        }
        if !file_name.ends_with(".tf") {
            warn!("Skipping non-Terraform stack file {}", file_name);
            report.skipped.push(PathBuf::from(file_name));
            return Ok(());
        }

        let content = self.sanitize(self.stack_sanitization.kind(), body, true, report);
        fs::write(workspace.file(file_name), content)?;
        report.written.push(PathBuf::from(file_name));
        Ok(())
    }

    fn sanitize(&self, kind: SanitizerKind, body: &str, repair: bool, report: &mut MaterializeReport) -> String {
        let outcome = self.sanitizer.run(kind, body);
        report.dropped_lines += outcome.dropped_lines;

        if self.repair_multiline && repair {
            repair_multiline_values(&outcome.body)
        } else {
            outcome.body
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;
    use tfagent_policy::OwnershipPolicy;

    use crate::workspace::WorkspaceLayout;

    fn materializer() -> Materializer {
        Materializer::new(Sanitizer::new(OwnershipPolicy::default()), ProviderConfig::default())
    }

    fn scope() -> CloudScope {
        CloudScope::new("my-proj", "europe-west1")
    }

    #[test]
    fn test_writes_system_files_for_empty_document() {
        let temp = tempdir().unwrap();
        let layout = WorkspaceLayout::new(temp.path(), temp.path().join("runs"));
        let workspace = layout.stack("empty").unwrap();

        let report = materializer()
            .materialize(&UntrustedDocument::from_value(json!({})), &workspace, &scope())
            .unwrap();

        assert_eq!(report.written.len(), 3);
        assert!(workspace.modules_dir().is_dir());
        assert_eq!(
            fs::read_to_string(workspace.file("terraform.tfvars")).unwrap(),
            "project_id = \"my-proj\"\nregion     = \"europe-west1\"\n"
        );
    }

    #[test]
    fn test_model_cannot_override_system_files() {
        let temp = tempdir().unwrap();
        let layout = WorkspaceLayout::new(temp.path(), temp.path().join("runs"));
        let workspace = layout.stack("s").unwrap();
        let doc = UntrustedDocument::from_value(json!({
            "stack": {
                "variables.tf": "variable \"region\" { default = \"asia-east1\" }",
                "providers.tf": "provider \"aws\" {}",
                "main.tf": "locals {}"
            }
        }));

        let report = materializer().materialize(&doc, &workspace, &scope()).unwrap();

        let provider = ProviderConfig::default();
        assert_eq!(fs::read_to_string(workspace.file("variables.tf")).unwrap(), provider.variables_tf());
        assert_eq!(fs::read_to_string(workspace.file("providers.tf")).unwrap(), provider.providers_tf());
        assert!(report.skipped.contains(&PathBuf::from("variables.tf")));
        assert!(report.skipped.contains(&PathBuf::from("providers.tf")));
    }

    #[test]
    fn test_system_file_names_match_case_insensitively() {
        let temp = tempdir().unwrap();
        let layout = WorkspaceLayout::new(temp.path(), temp.path().join("runs"));
        let workspace = layout.stack("s").unwrap();
        let doc = UntrustedDocument::from_value(json!({
            "stack": {
                "Variables.tf": "variable \"region\" { default = \"asia-east1\" }",
                "Providers.tf": "provider \"aws\" {}"
            }
        }));

        let report = materializer().materialize(&doc, &workspace, &scope()).unwrap();

        assert!(report.skipped.contains(&PathBuf::from("Variables.tf")));
        assert!(report.skipped.contains(&PathBuf::from("Providers.tf")));
        assert!(!report.written.contains(&PathBuf::from("Variables.tf")));
        assert!(!report.written.contains(&PathBuf::from("Providers.tf")));
        assert_eq!(
            fs::read_to_string(workspace.file("variables.tf")).unwrap(),
            ProviderConfig::default().variables_tf()
        );
    }

    #[test]
    fn test_invalid_document_writes_nothing() {
        let temp = tempdir().unwrap();
        let layout = WorkspaceLayout::new(temp.path(), temp.path().join("runs"));
        let workspace = layout.stack("s").unwrap();
        let doc = UntrustedDocument::from_value(json!({"modules": [{"name": "x"}]}));

        assert!(materializer().materialize(&doc, &workspace, &scope()).is_err());
        assert!(!workspace.exists());
    }

    #[test]
    fn test_unexpected_module_file_skipped() {
        let temp = tempdir().unwrap();
        let layout = WorkspaceLayout::new(temp.path(), temp.path().join("runs"));
        let workspace = layout.stack("s").unwrap();
        let doc = UntrustedDocument::from_value(json!({
            "modules": [{"name": "net", "files": {"main.tf": "locals {}", "README.md": "# docs"}}],
            "stack": {"notes.txt": "hi"}
        }));

        let report = materializer().materialize(&doc, &workspace, &scope()).unwrap();

        assert!(workspace.module_dir("net").join("main.tf").exists());
        assert!(!workspace.module_dir("net").join("README.md").exists());
        assert!(!workspace.file("notes.txt").exists());
        assert_eq!(report.skipped.len(), 2);
    }

    #[test]
    fn test_wiring_mode_keeps_reserved_blocks_text() {
        let temp = tempdir().unwrap();
        let layout = WorkspaceLayout::new(temp.path(), temp.path().join("runs"));
        let workspace = layout.stack("s").unwrap();
        let body = "module \"a\" {\n  source = \"./modules/a\"\n  region = var.region\n}";
        let doc = UntrustedDocument::from_value(json!({"stack": {"main.tf": body}}));

        materializer()
            .with_stack_sanitization(StackSanitization::Wiring)
            .materialize(&doc, &workspace, &scope())
            .unwrap();

        assert_eq!(
            fs::read_to_string(workspace.file("main.tf")).unwrap(),
            "module \"a\" {\n  source = \"./modules/a\"\n}"
        );
    }

    #[test]
    fn test_multiline_repair_toggle() {
        let temp = tempdir().unwrap();
        let layout = WorkspaceLayout::new(temp.path(), temp.path().join("runs"));
        let body = "resource \"google_compute_instance\" \"vm\" {\n  metadata_startup_script = \"#!/bin/bash\necho hi\"\n}";
        let doc = UntrustedDocument::from_value(json!({
            "modules": [{"name": "vm", "files": {"main.tf": body}}]
        }));

        let repaired = layout.stack("on").unwrap();
        materializer().materialize(&doc, &repaired, &scope()).unwrap();
        let content = fs::read_to_string(repaired.module_dir("vm").join("main.tf")).unwrap();
        assert!(content.contains("<<EOT"));

        let raw = layout.stack("off").unwrap();
        materializer()
            .with_multiline_repair(false)
            .materialize(&doc, &raw, &scope())
            .unwrap();
        let content = fs::read_to_string(raw.module_dir("vm").join("main.tf")).unwrap();
        assert!(!content.contains("<<EOT"));
    }
}
