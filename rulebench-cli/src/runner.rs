//! Tool Runner
//!
//! Invokes the analysis tool once per (corpus, variant) pair and captures
//! its output together with the wall-clock duration of the invocation.
//!
//! ```text
//! <tool...> --json [--time] --config <rules>... <tool_opts> <target>
//!     env: <engine_env>=<variant.engine_opts>
//! ```
//!
//! Engine options travel in the child's own environment, so concurrent
//! invocations never observe each other's settings.

use rulebench_core::{CoreError, Variant};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Grace period between SIGTERM and SIGKILL on timeout
const TERMINATION_GRACE: Duration = Duration::from_millis(500);

/// Poll interval while waiting on a child with a deadline
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Captured output kept in error values
const OUTPUT_EXCERPT: usize = 2048;

/// Why one invocation produced no usable output
#[derive(Debug, Error)]
pub enum RunError {
    /// The tool could not be started
    #[error("Failed to spawn {program}: {source}")]
    SpawnFailed {
        /// Program that failed to start
        program: String,
        /// Underlying spawn error
        #[source]
        source: std::io::Error,
    },

    /// The tool exited with a failure code or was killed by a signal
    #[error("Tool {status}")]
    ToolFailed {
        /// Human-readable exit status
        status: String,
        /// Exit code, if the tool exited normally
        code: Option<i32>,
        /// Tail of captured stdout
        stdout: String,
        /// Tail of captured stderr
        stderr: String,
    },

    /// The tool ran past its deadline and was terminated
    #[error("Tool timed out after {elapsed:?}")]
    Timeout {
        /// Time from spawn until the tool was gone
        elapsed: Duration,
        /// Tail of stdout captured before termination
        stdout: String,
        /// Tail of stderr captured before termination
        stderr: String,
    },

    /// The tool's JSON did not have the expected shape
    #[error(transparent)]
    Malformed(#[from] CoreError),

    /// Waiting on the tool or reading its pipes failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A corpus ready to be analyzed: local rule files and a local target
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedCorpus {
    /// Corpus name
    pub name: String,
    /// Rule config files, passed as one `--config` each
    pub rules: Vec<PathBuf>,
    /// Target directory or file
    pub target: PathBuf,
}

/// Output of one tool invocation that exited acceptably
#[derive(Debug, Clone)]
pub struct RawRun {
    /// Wall-clock time from spawn to exit
    pub duration: Duration,
    /// Everything the tool wrote to stdout
    pub stdout: Vec<u8>,
    /// Everything the tool wrote to stderr
    pub stderr: Vec<u8>,
    /// Exit code, 0 or the partial-parse code
    pub exit_code: i32,
    /// The tool reported that some files could not be parsed
    pub partial_parse: bool,
}

/// Executes one (corpus, variant) pair
pub trait Runner: Sync {
    /// Run the tool and return its raw output
    fn execute(&self, corpus: &PreparedCorpus, variant: &Variant) -> Result<RawRun, RunError>;

    /// Whether invocations request the timing breakdown
    fn requests_timings(&self) -> bool;
}

/// Settings for [`ProcessRunner`]
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    /// Executable followed by fixed leading arguments
    pub tool: Vec<String>,
    /// Environment variable carrying the variant's engine options
    pub engine_env: String,
    /// Per-invocation timeout
    pub timeout: Option<Duration>,
    /// Exit code meaning "usable output, some files failed to parse"
    pub partial_exit_code: i32,
    /// Pass `--time` to the tool
    pub request_timings: bool,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            tool: vec!["semgrep".to_string()],
            engine_env: "SEMGREP_CORE_EXTRA".to_string(),
            timeout: None,
            partial_exit_code: 3,
            request_timings: true,
        }
    }
}

/// Runs the tool as a child process
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    settings: RunnerSettings,
}

impl ProcessRunner {
    /// Create a runner with the given settings
    pub fn new(settings: RunnerSettings) -> Self {
        Self { settings }
    }

    /// Settings this runner invokes the tool with
    pub fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    /// Build the command line for one pair
    ///
    /// On unix the tool leads its own process group, so a timeout reaches
    /// any helpers it spawns.
    pub fn command(&self, corpus: &PreparedCorpus, variant: &Variant) -> Command {
        let (program, leading) = match self.settings.tool.split_first() {
            Some((program, leading)) => (program.as_str(), leading),
            None => ("semgrep", &[][..]),
        };

        let mut command = Command::new(program);
        command.args(leading).arg("--json");
        if self.settings.request_timings {
            command.arg("--time");
        }
        for rules in &corpus.rules {
            command.arg("--config").arg(rules);
        }
        command
            .args(variant.tool_args())
            .arg(&corpus.target)
            .env(&self.settings.engine_env, &variant.engine_opts)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        command
    }

    /// Wait for the child, enforcing the timeout if one is set.
    ///
    /// Returns `None` when the deadline passed and the child was terminated.
    fn wait(&self, child: &mut Child) -> std::io::Result<Option<ExitStatus>> {
        let Some(timeout) = self.settings.timeout else {
            return child.wait().map(Some);
        };

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Some(status));
            }
            if Instant::now() >= deadline {
                terminate(child);
                return Ok(None);
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Runner for ProcessRunner {
    fn execute(&self, corpus: &PreparedCorpus, variant: &Variant) -> Result<RawRun, RunError> {
        let mut command = self.command(corpus, variant);
        debug!(
            corpus = %corpus.name,
            variant = %variant.name,
            command = ?command,
            "spawning tool"
        );

        let start = Instant::now();
        let mut child = command.spawn().map_err(|source| RunError::SpawnFailed {
            program: command.get_program().to_string_lossy().into_owned(),
            source,
        })?;

        // Drain both pipes concurrently so a chatty child never blocks on a full pipe
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = self.wait(&mut child)?;
        let duration = start.elapsed();

        let stdout = collect(stdout)?;
        let stderr = collect(stderr)?;

        let Some(status) = status else {
            return Err(RunError::Timeout {
                elapsed: duration,
                stdout: excerpt(&stdout),
                stderr: excerpt(&stderr),
            });
        };

        let exit_code = status.code();
        match exit_code {
            Some(0) => {}
            Some(code) if code == self.settings.partial_exit_code => {
                warn!(
                    corpus = %corpus.name,
                    variant = %variant.name,
                    code,
                    "tool reported partial parse failure"
                );
            }
            _ => {
                return Err(RunError::ToolFailed {
                    status: describe_status(&status),
                    code: exit_code,
                    stdout: excerpt(&stdout),
                    stderr: excerpt(&stderr),
                });
            }
        }

        let exit_code = exit_code.unwrap_or_default();
        Ok(RawRun {
            duration,
            stdout,
            stderr,
            exit_code,
            partial_parse: exit_code != 0,
        })
    }

    fn requests_timings(&self) -> bool {
        self.settings.request_timings
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<std::io::Result<Vec<u8>>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn collect(handle: Option<JoinHandle<std::io::Result<Vec<u8>>>>) -> std::io::Result<Vec<u8>> {
    match handle {
        Some(handle) => handle
            .join()
            .map_err(|_| std::io::Error::other("output reader thread panicked"))?,
        None => Ok(Vec::new()),
    }
}

/// Graceful termination of the tool's process group: SIGTERM, grace
/// period, then SIGKILL
///
/// Helpers left in the group would keep the output pipes open, so the
/// group is killed even when the tool itself exits within the grace period.
fn terminate(child: &mut Child) {
    let group = child.id();
    // The group may already be gone
    let _ = send_sigterm(group);

    let deadline = Instant::now() + TERMINATION_GRACE;
    while Instant::now() < deadline {
        if matches!(child.try_wait(), Ok(Some(_))) {
            break;
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    let _ = send_sigkill(group);
    let _ = child.kill();
    let _ = child.wait();
}

/// Send SIGTERM to a process group. Returns `Err` if the signal could not be delivered.
#[cfg(unix)]
fn send_sigterm(group: u32) -> Result<(), std::io::Error> {
    signal_group(group, libc::SIGTERM)
}

/// Send SIGKILL to a process group
#[cfg(unix)]
fn send_sigkill(group: u32) -> Result<(), std::io::Error> {
    signal_group(group, libc::SIGKILL)
}

#[cfg(unix)]
fn signal_group(group: u32, signal: libc::c_int) -> Result<(), std::io::Error> {
    let ret = unsafe { libc::killpg(group as libc::pid_t, signal) };
    if ret == -1 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

#[cfg(not(unix))]
fn send_sigterm(_group: u32) -> Result<(), std::io::Error> {
    Err(std::io::Error::other("SIGTERM is not available on this platform"))
}

#[cfg(not(unix))]
fn send_sigkill(_group: u32) -> Result<(), std::io::Error> {
    Err(std::io::Error::other("process groups are not available on this platform"))
}

fn describe_status(status: &ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("exited with code {code}");
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("killed by signal {signal}");
        }
    }
    "exited abnormally".to_string()
}

/// Tail of captured output, lossily decoded
fn excerpt(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.len() <= OUTPUT_EXCERPT {
        return text.into_owned();
    }
    let mut start = text.len() - OUTPUT_EXCERPT;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &text[start..])
}
