//! Spawning external programs with a wall-clock limit.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use super::error::{ProcessError, Result};

/// One external program run: what to launch, where, and for how long.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Human-readable step name used in logs and errors.
    pub step: String,
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub timeout: Duration,
}

impl Invocation {
    pub fn new(step: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: Vec::new(),
            timeout: Duration::from_secs(30 * 60),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Command line as it would be typed, for logging.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs an [`Invocation`] and returns its standard output on success.
#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> Result<String>;
}

/// [`ProcessExecutor`] backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessExecutor;

impl TokioProcessExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessExecutor for TokioProcessExecutor {
    async fn run(&self, invocation: &Invocation) -> Result<String> {
        let step = invocation.step.as_str();

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &invocation.working_dir {
            cmd.current_dir(dir);
        }

        log::info!("[{}] running {}", step, invocation.display());

        let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            step: step.to_string(),
            source,
        })?;

        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        // Filled incrementally so a timed-out run still leaves partial output.
        let mut stdout = String::new();
        let mut stderr = String::new();

        let run = async {
            tokio::join!(
                drain(stdout_pipe, step, "stdout", &mut stdout),
                drain(stderr_pipe, step, "stderr", &mut stderr),
            );
            child.wait().await
        };

        let outcome = tokio::time::timeout(invocation.timeout, run).await;
        let status = match outcome {
            Ok(status) => status.map_err(|source| ProcessError::Io {
                step: step.to_string(),
                source,
            })?,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    log::warn!("[{}] failed to kill timed-out process: {}", step, e);
                }
                if !stderr.trim().is_empty() {
                    log::warn!("[{}] stderr before timeout: {}", step, stderr.trim());
                }
                return Err(ProcessError::Timeout {
                    step: step.to_string(),
                    timeout: invocation.timeout,
                });
            }
        };

        if status.success() {
            log::info!("[{}] finished", step);
            Ok(stdout)
        } else {
            Err(ProcessError::Exit {
                step: step.to_string(),
                code: status.code().unwrap_or(-1),
                stderr: stderr.trim().to_string(),
            })
        }
    }
}

async fn drain<R>(pipe: Option<R>, step: &str, stream: &str, buffer: &mut String)
where
    R: AsyncRead + Unpin,
{
    let Some(pipe) = pipe else {
        return;
    };
    let mut reader = BufReader::new(pipe);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line);
                log::debug!("[{}] {}: {}", step, stream, text.trim_end());
                buffer.push_str(&text);
            }
            Err(e) => {
                log::warn!("[{}] failed reading {}: {}", step, stream, e);
                break;
            }
        }
    }
}
