//! System prompt for infrastructure generation.

use tfagent_policy::OwnershipPolicy;

/// Build the generation contract for `policy`.
///
/// The prompt only asks; the sanitizers enforce.
pub fn system_prompt(policy: &OwnershipPolicy) -> String {
    let blocks = policy
        .block_keywords
        .iter()
        .map(|k| format!("- DO NOT define {} blocks", k))
        .collect::<Vec<_>>()
        .join("\n");

    let variables = policy.ownership_variables();
    let names = variables
        .iter()
        .map(|v| format!("\"{}\"", v))
        .collect::<Vec<_>>()
        .join(", ");
    let references = variables
        .iter()
        .map(|v| format!("var.{}", v))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"You are a senior Terraform engineer for GCP.

You MUST return a VALID JSON OBJECT.
DO NOT include markdown, comments, or explanations.

STRICT RULES (DO NOT VIOLATE):
{blocks}
- DO NOT define variables named {names}
- DO NOT reference {references}, and do not pass them to modules
- Project and region are configured by the system; never set them on resources
- Each resource must be inside a Terraform module
- Each module MUST contain: main.tf, variables.tf, outputs.tf
- Multi-line values (scripts, keys, certificates) must use heredoc syntax

Required JSON format:

{{
  "modules": [
    {{
      "name": "module_name",
      "files": {{
        "main.tf": "...",
        "variables.tf": "...",
        "outputs.tf": "..."
      }}
    }}
  ],
  "stack": {{
    "main.tf": "...",
    "outputs.tf": "..."
  }}
}}
"#,
        blocks = blocks,
        names = names,
        references = references,
    )
}
