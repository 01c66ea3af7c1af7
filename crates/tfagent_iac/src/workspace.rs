//! Stack workspace layout on disk.
//!
//! ```text
//! <stacks_dir>/<stack>/
//!   providers.tf          system-owned
//!   variables.tf          system-owned
//!   terraform.tfvars      system-owned
//!   main.tf, outputs.tf   model-owned, sanitized
//!   modules/<name>/{main.tf,variables.tf,outputs.tf}
//! <runs_dir>/<stack>.tfplan
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;
use walkdir::WalkDir;

use crate::error::{IacError, IacResult};

/// Stack name used when a request does not name one.
pub const DEFAULT_STACK_NAME: &str = "gcp_stack";

pub const PROVIDERS_FILE: &str = "providers.tf";
pub const VARIABLES_FILE: &str = "variables.tf";
pub const TFVARS_FILE: &str = "terraform.tfvars";
pub const MODULES_DIR: &str = "modules";

/// The three files every generated module consists of.
pub const MODULE_FILES: [&str; 3] = ["main.tf", "variables.tf", "outputs.tf"];

const SYSTEM_OWNED_FILES: [&str; 3] = [PROVIDERS_FILE, VARIABLES_FILE, TFVARS_FILE];
const MAX_NAME_LEN: usize = 64;

/// Check that a stack or module name is a single safe path component.
pub fn validate_name(name: &str) -> IacResult<()> {
    let invalid = |reason: &str| IacError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid("too long"));
    }
    if !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return Err(invalid("must start with a letter or digit"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(invalid("only letters, digits, '_' and '-' are allowed"));
    }
    Ok(())
}

/// Check that a file name stays inside the directory it is written to.
pub fn validate_file_name(name: &str) -> IacResult<()> {
    let invalid = |reason: &str| IacError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(invalid("invalid length"));
    }
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(invalid("path separators are not allowed"));
    }
    if !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return Err(invalid("must start with a letter or digit"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(invalid("only letters, digits, '_', '-' and '.' are allowed"));
    }
    Ok(())
}

/// Where stacks and saved plans live.
#[derive(Debug, Clone)]
pub struct WorkspaceLayout {
    stacks_dir: PathBuf,
    runs_dir: PathBuf,
}

impl WorkspaceLayout {
    pub fn new(stacks_dir: impl Into<PathBuf>, runs_dir: impl Into<PathBuf>) -> Self {
        Self {
            stacks_dir: stacks_dir.into(),
            runs_dir: runs_dir.into(),
        }
    }

    pub fn stacks_dir(&self) -> &Path {
        &self.stacks_dir
    }

    pub fn runs_dir(&self) -> &Path {
        &self.runs_dir
    }

    /// Workspace for a stack name. Does not touch the filesystem.
    pub fn stack(&self, name: &str) -> IacResult<StackWorkspace> {
        validate_name(name)?;
        Ok(StackWorkspace {
            name: name.to_string(),
            root: self.stacks_dir.join(name),
        })
    }

    /// Saved plan for a stack.
    pub fn plan_file(&self, name: &str) -> PathBuf {
        self.runs_dir.join(format!("{}.tfplan", name))
    }

    /// Create the runs directory and return its absolute path.
    pub fn ensure_runs_dir(&self) -> IacResult<PathBuf> {
        fs::create_dir_all(&self.runs_dir)?;
        Ok(fs::canonicalize(&self.runs_dir)?)
    }

    /// Names of all stacks that currently exist.
    pub fn list_stacks(&self) -> IacResult<Vec<String>> {
        if !self.stacks_dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.stacks_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

/// A single stack directory.
#[derive(Debug, Clone)]
pub struct StackWorkspace {
    name: String,
    root: PathBuf,
}

impl StackWorkspace {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn modules_dir(&self) -> PathBuf {
        self.root.join(MODULES_DIR)
    }

    pub fn module_dir(&self, module: &str) -> PathBuf {
        self.modules_dir().join(module)
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Create the root and `modules/` directories. Idempotent.
    pub fn ensure_dirs(&self) -> IacResult<()> {
        fs::create_dir_all(self.modules_dir())?;
        Ok(())
    }

    /// Whether a root-level file name belongs to the system. Case is ignored
    /// since `Variables.tf` and `variables.tf` are one file on some filesystems.
    pub fn is_system_owned(file_name: &str) -> bool {
        SYSTEM_OWNED_FILES
            .iter()
            .any(|owned| owned.eq_ignore_ascii_case(file_name))
    }

    /// Root-level file names written by the system.
    pub fn system_owned_files() -> Vec<String> {
        SYSTEM_OWNED_FILES.iter().map(|f| f.to_string()).collect()
    }

    /// Generated Terraform files, relative to the root, sorted.
    pub fn list_files(&self) -> IacResult<Vec<PathBuf>> {
        if !self.exists() {
            return Err(IacError::StackNotFound(self.name.clone()));
        }

        let mut files: Vec<PathBuf> = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|e| e.file_name() != ".terraform")
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .is_some_and(|ext| ext == "tf" || ext == "tfvars")
            })
            .filter_map(|e| e.path().strip_prefix(&self.root).ok().map(Path::to_path_buf))
            .collect();
        files.sort();
        Ok(files)
    }

    /// Delete the whole stack directory.
    pub fn remove(&self) -> IacResult<()> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root)?;
            info!("Local Terraform stack '{}' removed", self.name);
        }
        Ok(())
    }
}
