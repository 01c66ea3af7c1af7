//! Local process runner.
//!
//! Spawns programs on the host, streams their output line by line and
//! captures it for the caller.

use std::io::{BufRead, BufReader, Read};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::{CommandSpec, RunConfig};
use crate::error::{RunnerError, RunnerResult};
use crate::runner::{CommandRunner, ExecutionResult};

/// Log output from process execution.
#[derive(Debug, Clone)]
pub struct LogLine {
    pub timestamp: chrono::DateTime<Utc>,
    pub stream: LogStream,
    pub message: String,
}

/// Log stream type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Stdout,
    Stderr,
}

impl std::fmt::Display for LogStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

/// Log handler callback type.
pub type LogHandler = Arc<dyn Fn(LogLine) + Send + Sync>;

/// Process runner options.
#[derive(Debug, Clone)]
pub struct ProcessRunnerOptions {
    /// Dry-run mode (print commands without executing)
    pub dry_run: bool,
    /// CI mode (format logs for CI systems)
    pub ci_mode: bool,
}

impl Default for ProcessRunnerOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            ci_mode: std::env::var("CI").is_ok(),
        }
    }
}

impl ProcessRunnerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn ci_mode(mut self) -> Self {
        self.ci_mode = true;
        self
    }
}

/// Runs programs as local child processes.
#[derive(Clone)]
pub struct ProcessRunner {
    options: ProcessRunnerOptions,
    log_handler: Option<LogHandler>,
}

impl ProcessRunner {
    pub fn new(options: ProcessRunnerOptions) -> Self {
        Self {
            options,
            log_handler: None,
        }
    }

    /// Set a log handler for streaming logs.
    pub fn with_log_handler(mut self, handler: LogHandler) -> Self {
        self.log_handler = Some(handler);
        self
    }

    /// Check if dry-run mode is enabled.
    pub fn is_dry_run(&self) -> bool {
        self.options.dry_run
    }

    fn dry_run_result(spec: &CommandSpec) -> ExecutionResult {
        let now = Utc::now();
        ExecutionResult {
            exit_code: 0,
            stdout: format!("[DRY-RUN] {}", spec.display()),
            stderr: String::new(),
            started_at: now,
            finished_at: now,
            duration_ms: 0,
        }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn is_available(&self, program: &str) -> RunnerResult<bool> {
        if self.options.dry_run {
            return Ok(true);
        }
        let program = program.to_string();
        let available = tokio::task::spawn_blocking(move || {
            Command::new(&program)
                .arg("version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|s| s.success())
                .unwrap_or(false)
        })
        .await
        .map_err(|e| RunnerError::ExecutionFailed(e.to_string()))?;
        Ok(available)
    }

    async fn run(&self, spec: &CommandSpec, run_config: &RunConfig) -> RunnerResult<ExecutionResult> {
        info!("$ {}", spec.display());

        if self.options.dry_run {
            info!("[DRY-RUN] Would execute: {}", spec.display());
            return Ok(Self::dry_run_result(spec));
        }

        if let Some(dir) = &spec.workdir {
            if !dir.is_dir() {
                return Err(RunnerError::InvalidWorkdir(dir.display().to_string()));
            }
        }

        let spec = spec.clone();
        let run_config = run_config.clone();
        let ci_mode = self.options.ci_mode;
        let handler = self.log_handler.clone();

        let started_at = Utc::now();
        let start = Instant::now();

        let (exit_code, stdout, stderr) = tokio::task::spawn_blocking(move || {
            execute_with_streaming(&spec, &run_config, ci_mode, handler)
        })
        .await
        .map_err(|e| RunnerError::ExecutionFailed(e.to_string()))??;

        let duration_ms = start.elapsed().as_millis() as u64;
        debug!("Process exited with {} after {}ms", exit_code, duration_ms);

        Ok(ExecutionResult {
            exit_code,
            stdout,
            stderr,
            started_at,
            finished_at: Utc::now(),
            duration_ms,
        })
    }
}

/// Execute a command and capture output, streaming each line as it arrives.
fn execute_with_streaming(
    spec: &CommandSpec,
    run_config: &RunConfig,
    ci_mode: bool,
    handler: Option<LogHandler>,
) -> RunnerResult<(i64, String, String)> {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args);
    cmd.envs(&spec.env);
    if let Some(dir) = &spec.workdir {
        cmd.current_dir(dir);
    }
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            RunnerError::ProgramNotAvailable(spec.program.clone())
        } else {
            RunnerError::ExecutionFailed(format!("Failed to spawn {}: {}", spec.program, e))
        }
    })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| RunnerError::ExecutionFailed("stdout not captured".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| RunnerError::ExecutionFailed("stderr not captured".to_string()))?;

    let stdout_handle = collect_stream(stdout, LogStream::Stdout, run_config.stream_logs, ci_mode, handler.clone());
    let stderr_handle = collect_stream(stderr, LogStream::Stderr, run_config.stream_logs, ci_mode, handler);

    let status = if run_config.timeout_seconds > 0 {
        let timeout = Duration::from_secs(run_config.timeout_seconds);
        let start = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if start.elapsed() > timeout {
                        if let Err(e) = child.kill() {
                            warn!("Failed to kill {} after timeout: {}", spec.program, e);
                        }
                        // Reap the killed process. Readers finish once its pipes close.
                        if let Err(e) = child.wait() {
                            warn!("Failed to reap {} after timeout: {}", spec.program, e);
                        }
                        return Err(RunnerError::Timeout(run_config.timeout_seconds));
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    return Err(RunnerError::ExecutionFailed(format!(
                        "Failed to wait for process: {}",
                        e
                    )));
                }
            }
        }
    } else {
        child.wait().map_err(|e| {
            RunnerError::ExecutionFailed(format!("Failed to wait for process: {}", e))
        })?
    };

    let stdout_output = stdout_handle.join().unwrap_or_default();
    let stderr_output = stderr_handle.join().unwrap_or_default();

    let exit_code = status.code().map(i64::from).unwrap_or(-1);

    Ok((exit_code, stdout_output, stderr_output))
}

fn collect_stream<R: Read + Send + 'static>(
    source: R,
    stream: LogStream,
    stream_logs: bool,
    ci_mode: bool,
    handler: Option<LogHandler>,
) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let reader = BufReader::new(source);
        let mut output = String::new();
        for line in reader.lines().map_while(Result::ok) {
            output.push_str(&line);
            output.push('\n');
            if !stream_logs {
                continue;
            }
            let log_line = LogLine {
                timestamp: Utc::now(),
                stream,
                message: line,
            };
            if ci_mode {
                println!(
                    "[{}] [{}] {}",
                    log_line.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
                    log_line.stream,
                    log_line.message
                );
            } else {
                match stream {
                    LogStream::Stdout => println!("{}", log_line.message),
                    LogStream::Stderr => eprintln!("{}", log_line.message),
                }
            }
            if let Some(handler) = &handler {
                handler(log_line);
            }
        }
        output
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[tokio::test]
    async fn test_dry_run_does_not_execute() {
        let runner = ProcessRunner::new(ProcessRunnerOptions::new().dry_run());
        let spec = CommandSpec::new("definitely-not-a-real-binary").arg("destroy");
        assert!(runner.is_dry_run());

        let result = runner.run(&spec, &RunConfig::default()).await.unwrap();

        assert!(result.success());
        assert!(result.stdout.contains("[DRY-RUN]"));
        assert!(result.stdout.contains("definitely-not-a-real-binary destroy"));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let runner = ProcessRunner::new(ProcessRunnerOptions::default());
        let spec = CommandSpec::new("definitely-not-a-real-binary");

        let result = runner.run(&spec, &RunConfig::default()).await;
        assert!(matches!(result, Err(RunnerError::ProgramNotAvailable(_))));
        assert!(!runner.is_available("definitely-not-a-real-binary").await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_workdir() {
        let runner = ProcessRunner::new(ProcessRunnerOptions::default());
        let spec = CommandSpec::new("sh").workdir("/definitely/not/here");

        let result = runner.run(&spec, &RunConfig::default()).await;
        assert!(matches!(result, Err(RunnerError::InvalidWorkdir(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_and_streams_output() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = lines.clone();
        let runner = ProcessRunner::new(ProcessRunnerOptions::default())
            .with_log_handler(Arc::new(move |line: LogLine| sink.lock().push(line)));

        let dir = tempfile::tempdir().unwrap();
        let spec = CommandSpec::new("sh")
            .args(["-c", "echo planned; echo warned 1>&2; exit 3"])
            .workdir(dir.path());

        let result = runner.run(&spec, &RunConfig::default().stream()).await.unwrap();

        assert_eq!(result.exit_code, 3);
        assert_eq!(result.stdout, "planned\n");
        assert_eq!(result.stderr, "warned\n");
        assert!(result.combined_output().contains("planned"));

        let captured = lines.lock();
        assert_eq!(captured.len(), 2);
        assert!(captured.iter().any(|l| l.stream == LogStream::Stderr && l.message == "warned"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_process() {
        let runner = ProcessRunner::new(ProcessRunnerOptions::default());
        let spec = CommandSpec::new("sh").args(["-c", "sleep 5"]);

        let started = Instant::now();
        let result = runner.run(&spec, &RunConfig::default().timeout(1)).await;
        assert!(matches!(result, Err(RunnerError::Timeout(1))));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_timed_out_process_is_reaped() {
        let temp = tempfile::tempdir().unwrap();
        let pid_file = temp.path().join("pid");
        let script = format!("echo $$ > {}; exec sleep 5", pid_file.display());
        let runner = ProcessRunner::new(ProcessRunnerOptions::default());
        let spec = CommandSpec::new("sh").args(["-c", script.as_str()]);

        let result = runner.run(&spec, &RunConfig::default().timeout(1)).await;
        assert!(matches!(result, Err(RunnerError::Timeout(1))));

        let pid = std::fs::read_to_string(&pid_file).unwrap();
        let proc_entry = std::path::PathBuf::from(format!("/proc/{}", pid.trim()));
        assert!(!proc_entry.exists(), "killed process left a zombie");
    }
}
