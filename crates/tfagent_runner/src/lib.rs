//! # tfagent_runner
//!
//! Process execution wrapper for the Terraform agent.
//!
//! Every external tool the agent drives (the `terraform` binary in practice)
//! goes through the [`CommandRunner`] trait, so lifecycle code can be tested
//! against [`MockRunner`] without spawning anything.
//!
//! # Features
//!
//! - **Process Runner**: spawns local programs, streams stdout/stderr line by line
//! - **Dry-Run Mode**: print commands without executing
//! - **CI Integration**: timestamped log lines for CI systems
//! - **Mock Runner**: canned responses and call capture for tests
//!
//! # Example
//!
//! ```rust,no_run
//! use tfagent_runner::{CommandRunner, CommandSpec, ProcessRunner, ProcessRunnerOptions, RunConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = ProcessRunner::new(ProcessRunnerOptions::default());
//!
//!     let spec = CommandSpec::new("terraform")
//!         .arg("version")
//!         .workdir("terraform/stacks/gcp_stack");
//!
//!     let result = runner.run(&spec, &RunConfig::default().stream()).await?;
//!     println!("Exit code: {}", result.exit_code);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod mock;
pub mod process;
pub mod runner;

pub use config::{CommandSpec, RunConfig};
pub use error::{RunnerError, RunnerResult};
pub use mock::{CapturedCall, MockResponse, MockRunner};
pub use process::{LogHandler, LogLine, LogStream, ProcessRunner, ProcessRunnerOptions};
pub use runner::{CommandRunner, ExecutionResult};
