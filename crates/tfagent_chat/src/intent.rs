//! Coarse routing of free text to infrastructure generation or chat.

use serde::{Deserialize, Serialize};

/// Where a request should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Terraform,
    Chat,
}

pub trait IntentClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Intent;
}

/// Case-insensitive substring match against a keyword list.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    keywords: Vec<String>,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(
            ["terraform", "gcp", "bucket", "vpc", "subnet", "iam", "cloud"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
        )
    }
}

impl KeywordClassifier {
    pub fn new(keywords: Vec<String>) -> Self {
        Self {
            keywords: keywords.into_iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

impl IntentClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> Intent {
        let text = text.to_lowercase();
        if self.keywords.iter().any(|k| text.contains(k.as_str())) {
            Intent::Terraform
        } else {
            Intent::Chat
        }
    }
}
