//! Effect Runner: executes one effect as an isolated child process.
//!
//! The child receives only the job id on its command line plus the job directory in
//! [`JOB_DIR_ENV`]. Everything else travels through the files written by the job codec.

use std::{
    path::PathBuf,
    process::{Command, Stdio},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
    time::{Duration, Instant},
};

use crate::foundation::error::StrokeFxError;
use crate::job::codec::{self, JobPaths};
use crate::job::model::{Job, JobId};
use crate::raster::block::ImageBlock;
use crate::registry::catalog::{EffectDescriptor, EffectLauncher};

/// Environment variable naming the job directory for effect processes.
pub const JOB_DIR_ENV: &str = "STROKEFX_JOB_DIR";

/// Bytes of captured output kept in a failure diagnostic.
const DIAGNOSTIC_TAIL: usize = 4096;

/// How long to wait for the output pipes to close after the child has exited.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// The job could not be written.
    Encode,
    /// The child could not be started.
    Spawn,
    /// The child exited unsuccessfully.
    ExitStatus,
    /// The child outlived the timeout and was killed.
    Timeout,
    /// The run was cancelled and the child killed.
    Cancelled,
    /// Exit 0 but no result artifact.
    MissingOutput,
    /// The result artifact could not be decoded.
    Decode,
    /// The result decoded but its dimensions differ from the job's crop.
    ShapeMismatch,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Encode => "job encoding failed",
            Self::Spawn => "failed to start",
            Self::ExitStatus => "exited unsuccessfully",
            Self::Timeout => "timed out",
            Self::Cancelled => "cancelled",
            Self::MissingOutput => "produced no result",
            Self::Decode => "produced an unreadable result",
            Self::ShapeMismatch => "produced a result of the wrong size",
        };
        f.write_str(s)
    }
}

/// Why an effect run produced no usable result.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
#[error("effect '{effect_id}' {kind} (job {job_id}): {diagnostic}")]
pub struct EffectFailure {
    pub effect_id: String,
    pub job_id: JobId,
    pub kind: FailureKind,
    pub exit_code: Option<i32>,
    /// Captured child output or the local error, trimmed.
    pub diagnostic: String,
}

/// Shared flag that asks an in-flight run to kill its child.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Debug)]
pub struct RunnerConfig {
    pub paths: JobPaths,
    /// Executable hosting built-in effects (`<host> effect <id> <job_id>`).
    pub builtin_host: PathBuf,
    pub poll_interval: Duration,
    pub keep_artifacts: bool,
}

impl RunnerConfig {
    /// Config whose built-in host is the running executable.
    pub fn new(job_dir: impl Into<PathBuf>) -> Self {
        let builtin_host = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("strokefx"));
        Self {
            paths: JobPaths::new(job_dir),
            builtin_host,
            poll_interval: Duration::from_millis(20),
            keep_artifacts: false,
        }
    }

    pub fn with_builtin_host(mut self, host: impl Into<PathBuf>) -> Self {
        self.builtin_host = host.into();
        self
    }
}

#[derive(Clone, Debug)]
pub struct EffectRunner {
    cfg: RunnerConfig,
}

impl EffectRunner {
    pub fn new(cfg: RunnerConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.cfg
    }

    /// Run `effect` on `job`, bounded by `timeout`. Never panics; every problem is an
    /// [`EffectFailure`].
    pub fn run_effect(
        &self,
        effect: &EffectDescriptor,
        job: &Job,
        timeout: Duration,
    ) -> Result<ImageBlock, EffectFailure> {
        self.run_effect_cancellable(effect, job, timeout, &CancelToken::new())
    }

    #[tracing::instrument(skip_all, fields(effect = %effect.id, job = %job.id()))]
    pub fn run_effect_cancellable(
        &self,
        effect: &EffectDescriptor,
        job: &Job,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<ImageBlock, EffectFailure> {
        let out = self.run_inner(effect, job, timeout, cancel);
        if !self.cfg.keep_artifacts {
            self.cfg.paths.remove(job.id());
        }
        match &out {
            Ok(_) => tracing::info!("effect completed"),
            Err(f) => tracing::warn!(kind = ?f.kind, exit_code = ?f.exit_code, "{f}"),
        }
        out
    }

    fn run_inner(
        &self,
        effect: &EffectDescriptor,
        job: &Job,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<ImageBlock, EffectFailure> {
        let fail = |kind: FailureKind, exit_code: Option<i32>, diagnostic: String| EffectFailure {
            effect_id: effect.id.clone(),
            job_id: job.id(),
            kind,
            exit_code,
            diagnostic,
        };

        codec::write_job(&self.cfg.paths, job)
            .map_err(|e| fail(FailureKind::Encode, None, e.to_string()))?;

        let job_dir = std::path::absolute(self.cfg.paths.dir())
            .unwrap_or_else(|_| self.cfg.paths.dir().to_path_buf());
        let mut cmd = match &effect.launcher {
            EffectLauncher::Builtin => {
                let mut c = Command::new(&self.cfg.builtin_host);
                c.args(["effect", effect.id.as_str()]);
                c
            }
            EffectLauncher::Command { program, args } => {
                let mut c = Command::new(program);
                c.args(args);
                c
            }
        };
        cmd.arg(job.id().to_string())
            .env(JOB_DIR_ENV, &job_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            fail(
                FailureKind::Spawn,
                None,
                format!("failed to spawn {:?}: {e}", cmd.get_program()),
            )
        })?;
        tracing::info!(pid = child.id(), "effect spawned");

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(fail(
                        FailureKind::ExitStatus,
                        None,
                        format!("failed to wait for effect: {e}"),
                    ));
                }
            }

            let stop = if cancel.is_cancelled() {
                Some(FailureKind::Cancelled)
            } else if started.elapsed() >= timeout {
                Some(FailureKind::Timeout)
            } else {
                None
            };
            if let Some(kind) = stop {
                let _ = child.kill();
                let _ = child.wait();
                let output = collect_output(&stdout, &stderr);
                let what = match kind {
                    FailureKind::Timeout => format!("killed after {timeout:?}"),
                    _ => "killed on request".to_owned(),
                };
                return Err(fail(kind, None, join_diagnostic(&what, &output)));
            }
            std::thread::sleep(self.cfg.poll_interval);
        };

        let output = collect_output(&stdout, &stderr);
        if !output.is_empty() {
            tracing::debug!(output = %output, "effect output");
        }

        if !status.success() {
            return Err(fail(
                FailureKind::ExitStatus,
                status.code(),
                join_diagnostic(&format!("exit status {status}"), &output),
            ));
        }

        let result_path = self.cfg.paths.result_file(job.id());
        if !result_path.exists() {
            return Err(fail(
                FailureKind::MissingOutput,
                status.code(),
                join_diagnostic(
                    &format!("'{}' was not written", result_path.display()),
                    &output,
                ),
            ));
        }

        codec::read_result(&self.cfg.paths, job.id(), job.expected_dims()).map_err(|e| {
            let kind = match e {
                StrokeFxError::ShapeMismatch { .. } => FailureKind::ShapeMismatch,
                _ => FailureKind::Decode,
            };
            fail(kind, status.code(), e.to_string())
        })
    }
}

fn drain<R: std::io::Read + Send + 'static>(pipe: Option<R>) -> mpsc::Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    if let Some(mut pipe) = pipe {
        std::thread::spawn(move || {
            let _ = tx.send(read_tail(&mut pipe, DIAGNOSTIC_TAIL));
        });
    }
    rx
}

/// Read `pipe` to the end, keeping only its last `limit` bytes.
fn read_tail<R: std::io::Read>(pipe: &mut R, limit: usize) -> Vec<u8> {
    let mut kept = Vec::with_capacity(2 * limit);
    let mut chunk = [0u8; 8192];
    loop {
        match pipe.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                kept.extend_from_slice(&chunk[..n]);
                if kept.len() > 2 * limit {
                    kept.drain(..kept.len() - limit);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(_) => break,
        }
    }
    let excess = kept.len().saturating_sub(limit);
    kept.drain(..excess);
    kept
}

/// Tail of stderr then stdout. Pipes still held open by grandchildren are abandoned.
fn collect_output(stdout: &mpsc::Receiver<Vec<u8>>, stderr: &mpsc::Receiver<Vec<u8>>) -> String {
    let deadline = Instant::now() + DRAIN_GRACE;
    let take = |rx: &mpsc::Receiver<Vec<u8>>| {
        let left = deadline.saturating_duration_since(Instant::now());
        rx.recv_timeout(left).map(|b| tail_lossy(&b)).unwrap_or_default()
    };
    let err = take(stderr);
    let out = take(stdout);
    match (err.is_empty(), out.is_empty()) {
        (true, true) => String::new(),
        (false, true) => err,
        (true, false) => out,
        (false, false) => format!("{err}\n{out}"),
    }
}

fn tail_lossy(bytes: &[u8]) -> String {
    let start = bytes.len().saturating_sub(DIAGNOSTIC_TAIL);
    String::from_utf8_lossy(&bytes[start..]).trim().to_owned()
}

fn join_diagnostic(what: &str, output: &str) -> String {
    if output.is_empty() {
        what.to_owned()
    } else {
        format!("{what}: {output}")
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effect/runner.rs"]
mod tests;
