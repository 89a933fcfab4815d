//! Process-based tool runner.
//!
//! Spawns the requested program with the inherited environment plus the
//! invocation's extra variables. Child output is echoed line by line to the
//! plugin's own stdout/stderr and captured for the result.

use std::io::{BufRead, BufReader, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::thread::JoinHandle;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::Invocation;
use crate::error::{RunnerError, RunnerResult};
use crate::runner::{ExecutionResult, ToolRunner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

/// Runs tools as local child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct CliRunner;

impl CliRunner {
    pub fn new() -> Self {
        Self
    }

    fn execute(&self, invocation: &Invocation) -> RunnerResult<(ExitStatus, String, String)> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .envs(&invocation.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &invocation.workdir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| RunnerError::SpawnFailed {
            program: invocation.program.clone(),
            message: e.to_string(),
        })?;

        let stdout = child.stdout.take().map(|out| echo(out, Stream::Stdout));
        let stderr = child.stderr.take().map(|err| echo(err, Stream::Stderr));

        let status = child.wait();
        // Readers finish once the child closes its pipes.
        let stdout = join_output(stdout);
        let stderr = join_output(stderr);

        Ok((status?, stdout, stderr))
    }
}

/// Read a child stream to the end on its own thread, echoing each line.
fn echo<R: Read + Send + 'static>(reader: R, stream: Stream) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let mut output = String::new();
        for line in BufReader::new(reader).lines().map_while(Result::ok) {
            match stream {
                Stream::Stdout => println!("{}", line),
                Stream::Stderr => eprintln!("{}", line),
            }
            output.push_str(&line);
            output.push('\n');
        }
        output
    })
}

fn join_output(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

#[async_trait]
impl ToolRunner for CliRunner {
    async fn run(&self, invocation: &Invocation) -> RunnerResult<ExecutionResult> {
        info!("$ {}", invocation.command_line());
        if !invocation.env.is_empty() {
            debug!(
                "Extra environment: {:?}",
                invocation.env.keys().collect::<Vec<_>>()
            );
        }

        let started_at = Utc::now();
        let (status, stdout, stderr) = self.execute(invocation)?;
        let finished_at = Utc::now();
        let duration_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;
        let exit_code = status.code().map(i64::from).unwrap_or(-1);

        if status.success() {
            debug!("{} completed in {}ms", invocation.program, duration_ms);
        } else {
            warn!(
                "{} exited with code {} after {}ms",
                invocation.program, exit_code, duration_ms
            );
        }

        Ok(ExecutionResult {
            program: invocation.program.clone(),
            exit_code,
            stdout,
            stderr,
            started_at,
            finished_at,
            duration_ms,
        })
    }
}
