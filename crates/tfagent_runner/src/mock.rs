//! Scripted command runner for tests.
//!
//! Nothing is spawned: every `run` is recorded and answered with the next
//! scripted [`MockResponse`]. Once the script is used up, runs succeed with
//! empty output.

use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::config::{CommandSpec, RunConfig};
use crate::error::{RunnerError, RunnerResult};
use crate::runner::{CommandRunner, ExecutionResult};

/// Scripted outcome of one `run`.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub exit_code: i64,
    pub stdout: String,
    pub stderr: String,
}

impl MockResponse {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(exit_code: i64, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// A recorded `run` call.
#[derive(Debug, Clone)]
pub struct CapturedCall {
    pub program: String,
    pub args: Vec<String>,
    pub workdir: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
}

#[derive(Default)]
struct MockState {
    unavailable: bool,
    script: VecDeque<MockResponse>,
    error: Option<String>,
    runs: Vec<CapturedCall>,
    availability_checks: Vec<String>,
}

/// In-memory [`CommandRunner`].
///
/// Clones share state, so a test can keep one handle and give the other to
/// the code under test.
#[derive(Clone, Default)]
pub struct MockRunner {
    state: Arc<Mutex<MockState>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `is_available` reports programs as runnable (default true).
    pub fn set_available(self, available: bool) -> Self {
        self.state.lock().unavailable = !available;
        self
    }

    /// Append one response to the script.
    pub fn add_response(self, response: MockResponse) -> Self {
        self.state.lock().script.push_back(response);
        self
    }

    /// Replace the script.
    pub fn with_responses(self, responses: Vec<MockResponse>) -> Self {
        self.state.lock().script = responses.into();
        self
    }

    /// Make every `run` fail with [`RunnerError::ExecutionFailed`].
    pub fn fail_with(self, message: impl Into<String>) -> Self {
        self.state.lock().error = Some(message.into());
        self
    }

    /// Recorded `run` calls, oldest first.
    pub fn runs(&self) -> Vec<CapturedCall> {
        self.state.lock().runs.clone()
    }

    /// Programs passed to `is_available`, oldest first.
    pub fn availability_checks(&self) -> Vec<String> {
        self.state.lock().availability_checks.clone()
    }

    /// Number of calls of either kind.
    pub fn call_count(&self) -> usize {
        let state = self.state.lock();
        state.runs.len() + state.availability_checks.len()
    }

    pub fn clear_calls(&self) {
        let mut state = self.state.lock();
        state.runs.clear();
        state.availability_checks.clear();
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn is_available(&self, program: &str) -> RunnerResult<bool> {
        let mut state = self.state.lock();
        state.availability_checks.push(program.to_string());
        Ok(!state.unavailable)
    }

    async fn run(&self, spec: &CommandSpec, _run_config: &RunConfig) -> RunnerResult<ExecutionResult> {
        let response = {
            let mut state = self.state.lock();
            state.runs.push(CapturedCall {
                program: spec.program.clone(),
                args: spec.args.clone(),
                workdir: spec.workdir.clone(),
                env: spec.env.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            });
            if let Some(message) = &state.error {
                return Err(RunnerError::ExecutionFailed(message.clone()));
            }
            state
                .script
                .pop_front()
                .unwrap_or_else(|| MockResponse::success(""))
        };

        let now = Utc::now();
        Ok(ExecutionResult {
            exit_code: response.exit_code,
            stdout: response.stdout,
            stderr: response.stderr,
            started_at: now,
            finished_at: now,
            duration_ms: 0,
        })
    }
}
