//! Recording tool runner for tests.
//!
//! Nothing is executed: each invocation is captured and answered with the
//! next scripted response, so deploy flows can be checked without `gcloud`
//! or `kubectl` installed.

use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::config::Invocation;
use crate::error::RunnerResult;
use crate::runner::{ExecutionResult, ToolRunner};

/// Scripted outcome for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
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

/// An invocation as the runner received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedCall {
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub workdir: Option<PathBuf>,
}

impl CapturedCall {
    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

#[derive(Debug, Default)]
struct MockState {
    queued: VecDeque<MockResponse>,
    calls: Vec<CapturedCall>,
}

/// Runner that records calls and replays queued responses.
///
/// Once the queue is empty every call succeeds with no output.
#[derive(Debug, Default)]
pub struct MockRunner {
    state: Mutex<MockState>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `response` after any already queued.
    pub fn add_response(self, response: MockResponse) -> Self {
        self.state.lock().queued.push_back(response);
        self
    }

    /// Replace the queue with `responses`.
    pub fn with_responses(self, responses: Vec<MockResponse>) -> Self {
        self.state.lock().queued = responses.into();
        self
    }

    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    /// Calls made to `program`, in order.
    pub fn calls_to(&self, program: &str) -> Vec<CapturedCall> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.program == program)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ToolRunner for MockRunner {
    async fn run(&self, invocation: &Invocation) -> RunnerResult<ExecutionResult> {
        let response = {
            let mut state = self.state.lock();
            state.calls.push(CapturedCall {
                program: invocation.program.clone(),
                args: invocation.args.clone(),
                env: invocation.env.clone(),
                workdir: invocation.workdir.clone(),
            });
            state
                .queued
                .pop_front()
                .unwrap_or_else(|| MockResponse::success(""))
        };

        let now = Utc::now();
        Ok(ExecutionResult {
            program: invocation.program.clone(),
            exit_code: response.exit_code,
            stdout: response.stdout,
            stderr: response.stderr,
            started_at: now,
            finished_at: now,
            duration_ms: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_runner_captures_calls() {
        let runner = MockRunner::new();
        let invocation = Invocation::new("kubectl")
            .args(["apply", "--filename", "/tmp/app.yaml"])
            .env("GOOGLE_APPLICATION_CREDENTIALS", "/tmp/key.json");

        runner.run(&invocation).await.unwrap();

        let calls = runner.calls_to("kubectl");
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].argv(),
            vec!["kubectl", "apply", "--filename", "/tmp/app.yaml"]
        );
        assert_eq!(
            calls[0].env.get("GOOGLE_APPLICATION_CREDENTIALS").map(String::as_str),
            Some("/tmp/key.json")
        );
    }

    #[tokio::test]
    async fn test_queued_responses_then_success() {
        let runner = MockRunner::new().with_responses(vec![
            MockResponse::success("first"),
            MockResponse::failure(1, "second failed"),
        ]);
        let invocation = Invocation::new("gcloud");

        let r1 = runner.run(&invocation).await.unwrap();
        assert_eq!(r1.stdout, "first");

        let r2 = runner.run(&invocation).await.unwrap();
        assert_eq!(r2.exit_code, 1);
        assert_eq!(r2.error_summary(), "second failed");

        let r3 = runner.run(&invocation).await.unwrap();
        assert!(r3.success());
        assert!(r3.stdout.is_empty());
        assert_eq!(runner.call_count(), 3);
    }
}
