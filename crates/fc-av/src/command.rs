//! Builder for executing external tool commands with timeout support.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Number of diagnostic stderr lines kept for error messages.
const STDERR_TAIL_LINES: usize = 10;

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8). For streamed runs this is the
    /// tail of lines the callback chose to keep.
    pub stderr: String,
}

/// What a streaming stderr callback wants done with the line it just saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StderrLine {
    /// Keep the line for the error message if the process fails.
    Keep,
    /// The line was fully handled (e.g. a progress field); drop it.
    Skip,
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use fc_av::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> fc_core::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffprobe"))
///     .arg("-v").arg("error")
///     .arg("-show_entries").arg("format=duration")
///     .arg("/path/to/video.mkv")
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = Some(d);
        self
    }

    /// Let the process run for as long as it takes.
    pub fn unbounded(&mut self) -> &mut Self {
        self.timeout = None;
        self
    }

    /// Arguments collected so far.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    fn build(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// - Returns [`fc_core::Error::Tool`] if the process times out (message
    ///   includes the timeout duration).
    /// - Returns [`fc_core::Error::Tool`] if the process exits with a non-zero
    ///   status (message includes stderr).
    /// - Returns [`fc_core::Error::Tool`] if spawning the process fails.
    pub async fn execute(&self) -> fc_core::Result<ToolOutput> {
        let program_name = self.program_name();

        let child = self
            .build()
            .spawn()
            .map_err(|e| fc_core::Error::tool(&program_name, format!("failed to spawn: {e}")))?;

        let result = match self.timeout {
            Some(t) => tokio::time::timeout(t, child.wait_with_output())
                .await
                .map_err(|_| {
                    // The child is dropped with the cancelled future and
                    // `kill_on_drop` reaps it.
                    fc_core::Error::tool(&program_name, format!("timed out after {t:?}"))
                })?,
            None => child.wait_with_output().await,
        };

        let output = result.map_err(|e| {
            fc_core::Error::tool(&program_name, format!("I/O error waiting for process: {e}"))
        })?;

        let tool_output = ToolOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if !output.status.success() {
            return Err(fc_core::Error::tool(
                program_name,
                format!(
                    "exited with status {}: {}",
                    output.status,
                    tool_output.stderr.trim()
                ),
            ));
        }

        Ok(tool_output)
    }

    /// Execute the command, handing each stderr line to `on_line` as soon as
    /// the process writes it.
    ///
    /// Lines for which the callback returns [`StderrLine::Keep`] are retained
    /// (the last few of them) and used as the error message if the process
    /// exits unsuccessfully. Stdout is drained concurrently so the child never
    /// blocks on a full pipe.
    pub async fn execute_with_stderr_callback<F>(&self, mut on_line: F) -> fc_core::Result<ToolOutput>
    where
        F: FnMut(&str) -> StderrLine,
    {
        let program_name = self.program_name();

        let mut child = self
            .build()
            .spawn()
            .map_err(|e| fc_core::Error::tool(&program_name, format!("failed to spawn: {e}")))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| fc_core::Error::tool(&program_name, "stderr not captured"))?;
        let stdout = child.stdout.take();

        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);

        let read_stderr = async {
            let mut reader = BufReader::new(stderr);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                if reader.read_until(b'\n', &mut buf).await? == 0 {
                    break;
                }
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\r', '\n']);
                if on_line(line) == StderrLine::Keep && !line.trim().is_empty() {
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line.trim().to_string());
                }
            }
            Ok::<_, std::io::Error>(())
        };

        let read_stdout = async {
            let mut buf = Vec::new();
            if let Some(mut out) = stdout {
                out.read_to_end(&mut buf).await?;
            }
            Ok::<_, std::io::Error>(buf)
        };

        let run = async {
            let (err_res, out_res) = tokio::join!(read_stderr, read_stdout);
            err_res?;
            let stdout = out_res?;
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, stdout))
        };

        let result = match self.timeout {
            Some(t) => tokio::time::timeout(t, run).await.ok(),
            None => Some(run.await),
        };

        let Some(result) = result else {
            let _ = child.start_kill();
            return Err(fc_core::Error::tool(
                program_name,
                format!("timed out after {:?}", self.timeout.unwrap_or_default()),
            ));
        };

        let (status, stdout) = result.map_err(|e| {
            fc_core::Error::tool(&program_name, format!("I/O error waiting for process: {e}"))
        })?;

        let stderr = Vec::from(tail).join("\n");

        if !status.success() {
            return Err(fc_core::Error::tool(
                program_name,
                format!("exited with status {status}: {stderr}"),
            ));
        }

        Ok(ToolOutput {
            status,
            stdout: String::from_utf8_lossy(&stdout).to_string(),
            stderr,
        })
    }
}
