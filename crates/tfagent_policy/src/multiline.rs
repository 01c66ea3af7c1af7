//! Repair of multi-line string values.
//!
//! Models routinely emit SSH keys, startup scripts and certificates as a
//! quoted string that spans several physical lines, which Terraform rejects.
//! Such assignments are rewritten as heredocs.

use std::sync::OnceLock;

use regex::Regex;

const HEREDOC_MARKER: &str = "EOT";

fn assignment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^(\s*)([A-Za-z_][A-Za-z0-9_-]*)\s*=\s*"(.*)$"#).expect("valid assignment regex")
    })
}

fn heredoc_open_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<<-?([A-Za-z_][A-Za-z0-9_]*)\s*$").expect("valid heredoc regex"))
}

/// Count of unescaped double quotes.
fn unescaped_quotes(text: &str) -> usize {
    let mut count = 0;
    let mut escaped = false;
    for c in text.chars() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' {
            count += 1;
        }
    }
    count
}

/// Byte index of the last unescaped double quote.
fn last_unescaped_quote(text: &str) -> Option<usize> {
    let mut last = None;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' {
            last = Some(i);
        }
    }
    last
}

fn unescape(text: &str) -> String {
    text.replace("\\\"", "\"")
}

/// Rewrite quoted values that span several lines as heredocs.
///
/// Existing heredocs are left alone, and an assignment whose closing quote is
/// followed by anything but whitespace is not touched.
pub fn repair_multiline_values(body: &str) -> String {
    let lines: Vec<&str> = body.lines().collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if let Some(caps) = heredoc_open_regex().captures(line) {
            let marker = caps[1].to_string();
            out.push(line.to_string());
            i += 1;
            while i < lines.len() {
                out.push(lines[i].to_string());
                let done = lines[i].trim() == marker;
                i += 1;
                if done {
                    break;
                }
            }
            continue;
        }

        if let Some(caps) = assignment_regex().captures(line) {
            let rest = caps.get(3).map_or("", |m| m.as_str());
            if unescaped_quotes(rest) % 2 == 0 {
                if let Some((rewritten, consumed)) = rewrite_as_heredoc(&caps[1], &caps[2], rest, &lines[i + 1..]) {
                    out.extend(rewritten);
                    i += 1 + consumed;
                    continue;
                }
            }
        }

        out.push(line.to_string());
        i += 1;
    }

    let mut repaired = out.join("\n");
    if body.ends_with('\n') {
        repaired.push('\n');
    }
    repaired
}

/// Build the heredoc lines for an unterminated assignment, returning how
/// many following lines were folded in.
fn rewrite_as_heredoc(
    indent: &str,
    attribute: &str,
    first: &str,
    following: &[&str],
) -> Option<(Vec<String>, usize)> {
    let mut content = vec![unescape(first)];

    for (offset, line) in following.iter().enumerate() {
        if unescaped_quotes(line) % 2 == 1 {
            let close = last_unescaped_quote(line)?;
            if !line[close + 1..].trim().is_empty() {
                return None;
            }
            let last = &line[..close];
            if !last.is_empty() {
                content.push(unescape(last));
            }

            let mut rewritten = Vec::with_capacity(content.len() + 2);
            rewritten.push(format!("{}{} = <<{}", indent, attribute, HEREDOC_MARKER));
            rewritten.extend(content);
            rewritten.push(HEREDOC_MARKER.to_string());
            return Some((rewritten, offset + 1));
        }
        content.push(unescape(line));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_script_becomes_heredoc() {
        let body = "resource \"google_compute_instance\" \"vm\" {\n  metadata_startup_script = \"#!/bin/bash\napt-get update\napt-get install -y nginx\"\n  name = \"vm\"\n}";
        let out = repair_multiline_values(body);
        assert_eq!(
            out,
            "resource \"google_compute_instance\" \"vm\" {\n  metadata_startup_script = <<EOT\n#!/bin/bash\napt-get update\napt-get install -y nginx\nEOT\n  name = \"vm\"\n}"
        );
    }

    #[test]
    fn test_escaped_quotes_are_unescaped() {
        let body = "  script = \"echo \\\"hi\\\"\nexit 0\"";
        let out = repair_multiline_values(body);
        assert_eq!(out, "  script = <<EOT\necho \"hi\"\nexit 0\nEOT");
    }

    #[test]
    fn test_single_line_values_untouched() {
        let body = "  ssh_keys = \"admin:ssh-ed25519 AAAA admin\"\n  tags = [\"web\"]";
        assert_eq!(repair_multiline_values(body), body);
    }

    #[test]
    fn test_interpolation_quotes_counted() {
        let body = "  name = \"${join(\"-\", var.parts)}\"";
        assert_eq!(repair_multiline_values(body), body);
    }

    #[test]
    fn test_unclosed_value_left_alone() {
        let body = "  script = \"echo hi\nexit 0";
        assert_eq!(repair_multiline_values(body), body);
    }

    #[test]
    fn test_trailing_text_after_close_left_alone() {
        let body = "  script = \"echo hi\nexit 0\", other = 1";
        assert_eq!(repair_multiline_values(body), body);
    }

    #[test]
    fn test_existing_heredoc_untouched() {
        let body = "  script = <<-EOT\n    FOO=\"bar\n  EOT\n  name = \"x\"";
        assert_eq!(repair_multiline_values(body), body);
    }

    #[test]
    fn test_idempotent() {
        let body = "  metadata_startup_script = \"#!/bin/bash\nFOO=\\\"bar\necho done\"\n";
        let once = repair_multiline_values(body);
        assert_eq!(repair_multiline_values(&once), once);
        assert!(once.ends_with('\n'));
    }
}
