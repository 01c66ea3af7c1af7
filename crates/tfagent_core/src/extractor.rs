//! Recovery of the JSON document from raw model output.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use tfagent_iac::UntrustedDocument;

use crate::error::{CoreError, CoreResult};

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```[A-Za-z0-9_+-]*").expect("valid fence regex"))
}

/// Pull the JSON object out of a model reply.
///
/// Code fences are removed wherever they appear, then everything from the
/// first `{` to the last `}` is parsed. Surrounding prose is ignored.
pub fn extract(raw: &str) -> CoreResult<UntrustedDocument> {
    if raw.trim().is_empty() {
        return Err(CoreError::EmptyResponse);
    }

    let unfenced = fence_regex().replace_all(raw, "");

    let (start, end) = match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => {
            return Err(CoreError::NoJsonFound {
                raw: raw.to_string(),
            })
        }
    };

    let candidate = &unfenced[start..=end];
    debug!("Parsing {} byte JSON candidate", candidate.len());

    serde_json::from_str(candidate)
        .map(UntrustedDocument::from_value)
        .map_err(|source| CoreError::MalformedJson {
            raw: raw.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fenced_response_with_prose() {
        let raw = "Here is the result:\n```json\n{\"modules\":[],\"stack\":{}}\n```\nDone.";
        let doc = extract(raw).unwrap();
        assert_eq!(doc.as_value(), &json!({"modules": [], "stack": {}}));
    }

    #[test]
    fn test_bare_fence_and_plain_json() {
        assert!(extract("```\n{\"stack\": {}}\n```").is_ok());
        assert!(extract("{\"stack\": {}}").is_ok());
    }

    #[test]
    fn test_empty_response() {
        assert!(matches!(extract(""), Err(CoreError::EmptyResponse)));
        assert!(matches!(extract("  \n\t"), Err(CoreError::EmptyResponse)));
    }

    #[test]
    fn test_no_json() {
        assert!(matches!(extract("I cannot help with that."), Err(CoreError::NoJsonFound { .. })));
        assert!(matches!(extract("} backwards {"), Err(CoreError::NoJsonFound { .. })));
        assert!(matches!(extract("only { open"), Err(CoreError::NoJsonFound { .. })));
    }

    #[test]
    fn test_malformed_json_keeps_raw() {
        let err = extract("{not valid}").unwrap_err();
        assert!(matches!(err, CoreError::MalformedJson { .. }));
        assert_eq!(err.raw_response(), Some("{not valid}"));
    }

    #[test]
    fn test_braces_inside_bodies() {
        let raw = "```json\n{\"stack\": {\"main.tf\": \"locals {\\n  a = 1\\n}\"}}\n```";
        let doc = extract(raw).unwrap();
        assert_eq!(doc.as_value()["stack"]["main.tf"], "locals {\n  a = 1\n}");
    }
}
