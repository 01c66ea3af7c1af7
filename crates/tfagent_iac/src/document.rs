//! The generation document returned by the model.
//!
//! The model is asked for `{"modules": [{"name", "files"}], "stack": {...}}`
//! but nothing guarantees it complies. [`UntrustedDocument`] wraps the raw
//! JSON value and [`UntrustedDocument::validate`] checks it field by field
//! before anything touches the disk.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{IacError, IacResult};
use crate::workspace::{validate_file_name, validate_name};

/// Raw JSON as parsed from a model response.
#[derive(Debug, Clone, PartialEq)]
pub struct UntrustedDocument(Value);

/// One generated module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub name: String,
    /// File name to file body
    pub files: BTreeMap<String, String>,
}

/// A document whose shape and names have been checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationDocument {
    #[serde(default)]
    pub modules: Vec<ModuleSpec>,
    #[serde(default)]
    pub stack: BTreeMap<String, String>,
}

impl GenerationDocument {
    /// Total number of file bodies carried by the document.
    pub fn file_count(&self) -> usize {
        self.modules.iter().map(|m| m.files.len()).sum::<usize>() + self.stack.len()
    }
}

impl UntrustedDocument {
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Check the shape of the document.
    ///
    /// `modules` and `stack` may be absent or null. Every module needs a
    /// `name` and a `files` object, every file body must be a string, and
    /// every module or file name must be a safe single path component.
    pub fn validate(&self) -> IacResult<GenerationDocument> {
        let root = self.0.as_object().ok_or_else(|| invalid("$", "expected a JSON object"))?;

        let modules = match root.get("modules") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(index, item)| validate_module(index, item))
                .collect::<IacResult<Vec<_>>>()?,
            Some(_) => return Err(invalid("modules", "expected an array")),
        };

        let stack = match root.get("stack") {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(value) => validate_files("stack", value)?,
        };

        Ok(GenerationDocument { modules, stack })
    }
}

impl From<Value> for UntrustedDocument {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

fn validate_module(index: usize, item: &Value) -> IacResult<ModuleSpec> {
    let field = format!("modules[{}]", index);
    let module = item
        .as_object()
        .ok_or_else(|| invalid(&field, "expected an object"))?;

    let name = match module.get("name") {
        None | Some(Value::Null) => {
            return Err(IacError::MissingRequiredField {
                field: format!("{}.name", field),
            })
        }
        Some(Value::String(name)) => name.clone(),
        Some(_) => return Err(invalid(&format!("{}.name", field), "expected a string")),
    };
    validate_name(&name).map_err(|e| invalid(&format!("{}.name", field), &e.to_string()))?;

    let files = match module.get("files") {
        None | Some(Value::Null) => {
            return Err(IacError::MissingRequiredField {
                field: format!("{}.files", field),
            })
        }
        Some(value) => validate_files(&format!("{}.files", field), value)?,
    };

    Ok(ModuleSpec { name, files })
}

fn validate_files(field: &str, value: &Value) -> IacResult<BTreeMap<String, String>> {
    let map = value
        .as_object()
        .ok_or_else(|| invalid(field, "expected an object of file name to content"))?;

    let mut files = BTreeMap::new();
    for (name, body) in map {
        let entry = format!("{}.{}", field, name);
        validate_file_name(name).map_err(|e| invalid(&entry, &e.to_string()))?;
        let body = body
            .as_str()
            .ok_or_else(|| invalid(&entry, "file content must be a string"))?;
        files.insert(name.clone(), body.to_string());
    }
    Ok(files)
}

fn invalid(field: &str, reason: &str) -> IacError {
    IacError::InvalidField {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
