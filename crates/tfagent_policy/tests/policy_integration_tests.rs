//! Integration tests for the ownership policy and sanitizers.

use tfagent_policy::{repair_multiline_values, OwnershipPolicy, Sanitizer, SanitizerKind};

/// Bodies shaped like real model output, including the awkward cases.
fn corpus() -> Vec<&'static str> {
    vec![
        "",
        "locals {\n  name = \"logs\"\n}",
        r#"terraform {
  required_providers {
    google = {
      source = "hashicorp/google"
    }
  }
}

provider "google" {
  project = var.project_id
  region  = var.region
}

resource "google_storage_bucket" "logs" {
  name     = "logs-bucket"
  location = "EU"
}"#,
        r#"variable "project_id" {
  type = string
}
variable "region" {
  type    = string
  default = "europe-west1"
}
variable "bucket_name" {
  type = string
}"#,
        r#"module "network" {
  source     = "./modules/network"
  project_id = var.project_id
  region     = var.region
  name       = "main-vpc"
}

output "network_id" {
  value = module.network.id
}"#,
        "provider \"google\" {\n  project = \"x\"\nresource \"google_compute_network\" \"vpc\" {\n  name = \"vpc\"\n}",
        "terraform\n{\n}\n\n\n  resource \"a\" \"b\" {}   \n",
        "resource \"google_compute_subnetwork\" \"subnet\" {\n  provider      = google-beta\n  region        = \"us-east1\"\n  ip_cidr_range = \"10.0.0.0/24\"\n}",
        "# region: europe-west1\n# project_id: demo\nlocals {}",
        "}\n}\nprovider \"google\" {}\n}",
    ]
}

fn all_kinds() -> [SanitizerKind; 3] {
    [
        SanitizerKind::Definition,
        SanitizerKind::OwnershipVariables,
        SanitizerKind::StackWiring,
    ]
}

#[test]
fn test_sanitizers_are_idempotent() {
    let sanitizer = Sanitizer::new(OwnershipPolicy::default());

    for body in corpus() {
        for kind in all_kinds() {
            let once = sanitizer.run(kind, body).body;
            let twice = sanitizer.run(kind, &once).body;
            assert_eq!(once, twice, "{:?} not idempotent for {:?}", kind, body);
            assert_eq!(sanitizer.run(kind, &once).dropped_lines, 0);
        }
    }
}

#[test]
fn test_no_forbidden_identifier_survives() {
    let policy = OwnershipPolicy::default();
    let sanitizer = Sanitizer::new(policy.clone());

    for body in corpus() {
        for kind in all_kinds() {
            let out = sanitizer.run(kind, body).body;
            for line in out.lines() {
                for identifier in &policy.forbidden_identifiers {
                    assert!(
                        !line.contains(identifier.as_str()),
                        "{:?} left '{}' in line {:?}",
                        kind,
                        identifier,
                        line
                    );
                }
            }
        }
    }
}

#[test]
fn test_reserved_blocks_removed_with_nested_content() {
    let sanitizer = Sanitizer::new(OwnershipPolicy::default());
    let body = r#"provider "google" {
  alias = "secondary"
  batching {
    enable_batching = true
  }
}
terraform {
  backend "gcs" {
    bucket = "state"
    prefix = "stacks"
  }
}
resource "google_pubsub_topic" "events" {
  name = "events"
}"#;

    let out = sanitizer.sanitize_definition_body(body);

    for gone in ["provider", "alias", "batching", "enable_batching", "terraform", "backend", "state", "prefix"] {
        assert!(!out.contains(gone), "'{}' should have been removed", gone);
    }
    assert_eq!(out, "resource \"google_pubsub_topic\" \"events\" {\n  name = \"events\"\n}");
}

#[test]
fn test_extended_policy_needs_no_code_change() {
    let policy = OwnershipPolicy::default()
        .with_identifier("zone")
        .with_identifier("var.zone");
    let sanitizer = Sanitizer::new(policy);

    let vars = "variable \"zone\" {\n  type = string\n}\nvariable \"size\" {\n  type = number\n}";
    assert_eq!(
        sanitizer.sanitize_ownership_variables_body(vars),
        "variable \"size\" {\n  type = number\n}"
    );

    let wiring = "module \"vm\" {\n  zone = var.zone\n  size = 2\n}";
    assert_eq!(sanitizer.sanitize_stack_wiring(wiring), "module \"vm\" {\n  size = 2\n}");
}

#[test]
fn test_repair_after_sanitize_keeps_policy() {
    let sanitizer = Sanitizer::new(OwnershipPolicy::default());
    let body = "provider \"google\" {}\nresource \"google_compute_instance\" \"vm\" {\n  metadata_startup_script = \"#!/bin/bash\necho ready\"\n  zone = \"europe-west1-b\"\n}";

    let out = repair_multiline_values(&sanitizer.sanitize_definition_body(body));

    assert!(out.contains("metadata_startup_script = <<EOT\n#!/bin/bash\necho ready\nEOT"));
    assert!(!out.contains("provider"));
    assert_eq!(sanitizer.sanitize_definition_body(&out), out);
}

mod properties {
    use proptest::prelude::*;
    use tfagent_policy::{repair_multiline_values, OwnershipPolicy, Sanitizer, SanitizerKind};

    /// Single lines a model is likely to produce, reserved and forbidden ones included.
    const LINES: &[&str] = &[
        "resource \"google_storage_bucket\" \"logs\" {",
        "module \"net\" {",
        "locals {",
        "}",
        "  name = \"logs-bucket\"",
        "  source = \"./modules/net\"",
        "  labels = { env = \"dev\" }",
        "  alias = \"}\"",
        "  pattern = \"{\"",
        "  # closing } in a comment",
        "  // {",
        "provider \"google\" {",
        "provider \"google-beta\" {}",
        "terraform {",
        "terraform",
        "  required_version = \">= 1.5\"",
        "variable \"region\" {",
        "variable \"bucket_name\" {",
        "  project = var.project_id",
        "  region = \"us-east1\"",
        "# deployed per region",
        "",
        "   ",
    ];

    /// Lines inside a quoted value that spans several lines.
    const VALUE_LINES: &[&str] = &[
        "  \\\"type\\\": \\\"service_account\\\",",
        "echo \\\"ready\\\"",
        "apt-get update",
        "  {",
        "}",
        "# not a comment",
        "",
    ];

    fn multiline_value() -> impl Strategy<Value = String> {
        (
            prop::sample::select(vec!["credentials", "metadata_startup_script", "private_key"]),
            prop::sample::select(vec!["{", "#!/bin/bash", "-----BEGIN KEY-----"]),
            prop::collection::vec(prop::sample::select(VALUE_LINES.to_vec()), 0..4),
            prop::sample::select(vec!["}\"", "done\"", "\""]),
        )
            .prop_map(|(attribute, first, middle, last)| {
                let mut lines = vec![format!("  {} = \"{}", attribute, first)];
                lines.extend(middle.into_iter().map(String::from));
                lines.push(last.to_string());
                lines.join("\n")
            })
    }

    fn fragment() -> impl Strategy<Value = String> {
        prop_oneof![
            3 => prop::sample::select(LINES.to_vec()).prop_map(String::from),
            1 => multiline_value(),
        ]
    }

    fn body() -> impl Strategy<Value = String> {
        prop::collection::vec(fragment(), 0..16).prop_map(|fragments| fragments.join("\n"))
    }

    fn kind() -> impl Strategy<Value = SanitizerKind> {
        prop::sample::select(vec![
            SanitizerKind::Definition,
            SanitizerKind::OwnershipVariables,
            SanitizerKind::StackWiring,
        ])
    }

    fn forbidden_line(policy: &OwnershipPolicy, body: &str) -> Option<String> {
        body.lines()
            .find(|line| policy.contains_forbidden(line))
            .map(String::from)
    }

    fn sanitize_and_repair(sanitizer: &Sanitizer, kind: SanitizerKind, body: &str) -> String {
        repair_multiline_values(&sanitizer.run(kind, body).body)
    }

    proptest! {
        /// A second pass over sanitized text changes nothing
        #[test]
        fn prop_sanitize_is_idempotent(body in body(), kind in kind()) {
            let sanitizer = Sanitizer::new(OwnershipPolicy::default());
            let once = sanitizer.run(kind, &body);
            let twice = sanitizer.run(kind, &once.body);
            prop_assert_eq!(&twice.body, &once.body);
            prop_assert_eq!(twice.dropped_lines, 0);
        }

        /// No output line mentions a forbidden identifier
        #[test]
        fn prop_sanitize_drops_forbidden(body in body(), kind in kind()) {
            let policy = OwnershipPolicy::default();
            let sanitizer = Sanitizer::new(policy.clone());
            let out = sanitizer.run(kind, &body).body;
            prop_assert_eq!(forbidden_line(&policy, &out), None);
        }

        /// Definition output keeps nothing from inside a reserved block
        #[test]
        fn prop_reserved_block_content_never_leaks(value in multiline_value(), tail in body()) {
            let sanitizer = Sanitizer::new(OwnershipPolicy::default());
            let body = format!(
                "provider \"google\" {{\n{}\n  impersonate_service_account = \"sa@x.iam\"\n}}\n{}",
                value, tail
            );
            let out = sanitizer.run(SanitizerKind::Definition, &body).body;
            prop_assert!(!out.contains("impersonate_service_account"));
        }

        /// Repairing multi-line values after sanitizing is stable and keeps the policy
        #[test]
        fn prop_sanitize_then_repair(body in body(), kind in kind()) {
            let policy = OwnershipPolicy::default();
            let sanitizer = Sanitizer::new(policy.clone());
            let once = sanitize_and_repair(&sanitizer, kind, &body);
            let twice = sanitize_and_repair(&sanitizer, kind, &once);
            prop_assert_eq!(&twice, &once);
            prop_assert_eq!(forbidden_line(&policy, &once), None);
        }
    }
}
