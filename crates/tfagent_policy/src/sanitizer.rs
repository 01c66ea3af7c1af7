//! Line-oriented sanitization of generated Terraform.
//!
//! Every operation here is a pure text-to-text transform over one file body.
//! Nothing is parsed beyond what a line scan can see: reserved blocks are
//! tracked by brace depth, and forbidden identifiers are matched as plain
//! substrings. All transforms are idempotent.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::policy::OwnershipPolicy;

/// Which sanitization pass to run over a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SanitizerKind {
    /// Drop reserved blocks and forbidden-identifier lines.
    Definition,
    /// Drop ownership variable declarations and forbidden-identifier lines.
    OwnershipVariables,
    /// Drop forbidden-identifier lines only.
    StackWiring,
}

/// Sanitized body plus how much was removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizeOutcome {
    pub body: String,
    pub dropped_lines: usize,
}

/// Per-file scan state. Created fresh for every body.
#[derive(Debug, Default)]
struct ScanState {
    skipping_block: bool,
    depth: usize,
    saw_open_brace: bool,
    braces: BraceScanner,
}

impl ScanState {
    fn begin_block(&mut self, line: &str) {
        self.skipping_block = true;
        self.depth = 0;
        self.saw_open_brace = false;
        self.braces = BraceScanner::default();
        self.consume(line);
    }

    /// Track braces of a dropped line; the block ends once its depth returns to zero.
    fn consume(&mut self, line: &str) {
        for brace in self.braces.scan(line) {
            match brace {
                '{' => {
                    self.depth += 1;
                    self.saw_open_brace = true;
                }
                _ => self.depth = self.depth.saturating_sub(1),
            }
        }
        if self.saw_open_brace && self.depth == 0 {
            self.skipping_block = false;
        }
    }
}

/// Finds structural braces line by line. An open string literal carries over
/// to the next line, comments do not.
#[derive(Debug, Default)]
struct BraceScanner {
    in_string: bool,
    escaped: bool,
}

impl BraceScanner {
    /// Braces outside string literals and comments, in order.
    fn scan(&mut self, line: &str) -> Vec<char> {
        let mut braces = Vec::new();
        let mut chars = line.chars().peekable();

        while let Some(c) = chars.next() {
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if c == '\\' {
                    self.escaped = true;
                } else if c == '"' {
                    self.in_string = false;
                }
                continue;
            }
            match c {
                '"' => self.in_string = true,
                '#' => break,
                '/' if chars.peek() == Some(&'/') => break,
                '{' | '}' => braces.push(c),
                _ => {}
            }
        }
        self.escaped = false;

        braces
    }
}

/// Applies an [`OwnershipPolicy`] to file bodies.
#[derive(Debug, Clone, Default)]
pub struct Sanitizer {
    policy: OwnershipPolicy,
}

impl Sanitizer {
    pub fn new(policy: OwnershipPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &OwnershipPolicy {
        &self.policy
    }

    /// Strip reserved blocks and every line mentioning a forbidden identifier.
    ///
    /// Used for module `main.tf` and stack definition files. An unterminated
    /// reserved block swallows the rest of the file.
    pub fn sanitize_definition_body(&self, body: &str) -> String {
        self.run(SanitizerKind::Definition, body).body
    }

    /// Strip declarations of ownership variables (`variable "region" { ... }`).
    ///
    /// Lines outside those blocks that still mention a forbidden identifier are
    /// dropped as well, so no sanitizer ever emits one.
    pub fn sanitize_ownership_variables_body(&self, body: &str) -> String {
        self.run(SanitizerKind::OwnershipVariables, body).body
    }

    /// Drop every line mentioning a forbidden identifier. No block tracking.
    pub fn sanitize_stack_wiring(&self, body: &str) -> String {
        self.run(SanitizerKind::StackWiring, body).body
    }

    /// Run one sanitization pass and report how many lines were removed.
    pub fn run(&self, kind: SanitizerKind, body: &str) -> SanitizeOutcome {
        let policy = &self.policy;
        let outcome = match kind {
            SanitizerKind::Definition => scan(body, policy, |trimmed| {
                policy.opens_reserved_block(trimmed) || policy.declares_ownership_variable(trimmed)
            }),
            SanitizerKind::OwnershipVariables => {
                scan(body, policy, |trimmed| policy.declares_ownership_variable(trimmed))
            }
            SanitizerKind::StackWiring => scan(body, policy, |_| false),
        };

        if outcome.dropped_lines > 0 {
            debug!("{:?} sanitizer dropped {} line(s)", kind, outcome.dropped_lines);
        }
        outcome
    }
}

fn scan(body: &str, policy: &OwnershipPolicy, opens_block: impl Fn(&str) -> bool) -> SanitizeOutcome {
    let mut state = ScanState::default();
    let mut kept = Vec::new();
    let mut dropped_lines = 0;

    for line in body.lines() {
        let trimmed = line.trim();

        if state.skipping_block {
            state.consume(line);
            dropped_lines += 1;
            continue;
        }

        if opens_block(trimmed) {
            state.begin_block(line);
            dropped_lines += 1;
            continue;
        }

        if policy.contains_forbidden(trimmed) {
            dropped_lines += 1;
            continue;
        }

        kept.push(line);
    }

    SanitizeOutcome {
        body: kept.join("\n").trim().to_string(),
        dropped_lines,
    }
}
