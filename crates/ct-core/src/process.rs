//! Shell execution for external tools.
//!
//! brilcalc needs its environment script sourced in the same shell as the
//! actual command, so everything goes through `sh -c <script>`. The
//! [`CommandRunner`] trait lets callers swap the real shell for
//! [`DryRunRunner`] (print only) or [`RecordingRunner`] (tests).

use std::cell::RefCell;
use std::collections::VecDeque;
use std::process::{Command, Stdio};

use crate::error::{Error, Result};

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Exit code; `None` if the process was killed by a signal.
    pub code: Option<i32>,
    /// Captured stdout (empty when output was not captured).
    pub stdout: String,
    /// Captured stderr (empty when output was not captured).
    pub stderr: String,
}

impl CommandOutput {
    /// Successful, empty output.
    pub fn ok() -> Self {
        Self { code: Some(0), ..Self::default() }
    }

    /// Successful output with the given stdout.
    pub fn with_stdout(stdout: impl Into<String>) -> Self {
        Self { code: Some(0), stdout: stdout.into(), stderr: String::new() }
    }

    /// Failed output with the given exit code and stdout.
    pub fn failed(code: i32, stdout: impl Into<String>) -> Self {
        Self { code: Some(code), stdout: stdout.into(), stderr: String::new() }
    }

    /// Whether the command exited with status 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    fn status_text(&self) -> String {
        match self.code {
            Some(c) => format!("exit status {c}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Something that can run a shell script.
pub trait CommandRunner {
    /// Run `script`, inheriting stdout/stderr, and wait for it.
    fn run(&self, script: &str) -> Result<CommandOutput>;

    /// Run `script` capturing stdout/stderr, and wait for it.
    fn run_captured(&self, script: &str) -> Result<CommandOutput>;

    /// Like [`run`](Self::run) but a non-zero exit becomes [`Error::CommandFailed`].
    fn check_run(&self, script: &str) -> Result<()> {
        let out = self.run(script)?;
        ensure_success(script, out).map(|_| ())
    }

    /// Like [`run_captured`](Self::run_captured) but a non-zero exit becomes
    /// [`Error::CommandFailed`]; returns stdout on success.
    fn check_output(&self, script: &str) -> Result<String> {
        let out = self.run_captured(script)?;
        ensure_success(script, out).map(|o| o.stdout)
    }

    /// Whether scripts are only shown, never executed.
    fn is_dry_run(&self) -> bool {
        false
    }
}

fn ensure_success(script: &str, out: CommandOutput) -> Result<CommandOutput> {
    if out.success() {
        return Ok(out);
    }
    Err(Error::CommandFailed {
        command: script.to_string(),
        status: out.status_text(),
        stdout: out.stdout,
    })
}

/// Runs scripts with `/bin/sh -c`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl ShellRunner {
    fn command(&self, script: &str) -> Command {
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c").arg(script);
        cmd
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, script: &str) -> Result<CommandOutput> {
        tracing::debug!(script, "spawning shell");
        let status = self.command(script).stdin(Stdio::null()).status()?;
        Ok(CommandOutput { code: status.code(), ..CommandOutput::default() })
    }

    fn run_captured(&self, script: &str) -> Result<CommandOutput> {
        tracing::debug!(script, "spawning shell (captured)");
        let out = self.command(script).stdin(Stdio::null()).output()?;
        Ok(CommandOutput {
            code: out.status.code(),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        })
    }
}

/// Prints each script to stdout instead of running it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunRunner;

impl CommandRunner for DryRunRunner {
    fn run(&self, script: &str) -> Result<CommandOutput> {
        println!("{script}");
        Ok(CommandOutput::ok())
    }

    fn run_captured(&self, script: &str) -> Result<CommandOutput> {
        println!("{script}");
        Ok(CommandOutput::ok())
    }

    fn is_dry_run(&self) -> bool {
        true
    }
}

/// In-memory runner: records every script and replays queued outputs.
///
/// When the queue is empty, commands succeed with empty output.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    scripts: RefCell<Vec<String>>,
    replies: RefCell<VecDeque<CommandOutput>>,
}

impl RecordingRunner {
    /// Empty runner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the output returned by the next command.
    pub fn push_reply(&self, out: CommandOutput) {
        self.replies.borrow_mut().push_back(out);
    }

    /// Scripts seen so far, in order.
    pub fn scripts(&self) -> Vec<String> {
        self.scripts.borrow().clone()
    }

    fn next(&self, script: &str) -> CommandOutput {
        self.scripts.borrow_mut().push(script.to_string());
        self.replies.borrow_mut().pop_front().unwrap_or_else(CommandOutput::ok)
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, script: &str) -> Result<CommandOutput> {
        Ok(self.next(script))
    }

    fn run_captured(&self, script: &str) -> Result<CommandOutput> {
        Ok(self.next(script))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_output_returns_stdout() {
        let r = RecordingRunner::new();
        r.push_reply(CommandOutput::with_stdout("a\nb\n"));
        assert_eq!(r.check_output("ls").unwrap(), "a\nb\n");
        assert_eq!(r.scripts(), vec!["ls".to_string()]);
    }

    #[test]
    fn non_zero_exit_is_command_failed() {
        let r = RecordingRunner::new();
        r.push_reply(CommandOutput::failed(3, "boom"));
        match r.check_output("false") {
            Err(Error::CommandFailed { command, status, stdout }) => {
                assert_eq!(command, "false");
                assert_eq!(status, "exit status 3");
                assert_eq!(stdout, "boom");
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }

    #[test]
    fn empty_queue_defaults_to_success() {
        let r = RecordingRunner::new();
        r.check_run("true").unwrap();
        r.check_run("true").unwrap();
        assert_eq!(r.scripts().len(), 2);
        assert!(!r.is_dry_run());
        assert!(DryRunRunner.is_dry_run());
    }

    #[cfg(unix)]
    #[test]
    fn shell_runner_captures_and_reports_status() {
        let sh = ShellRunner;
        assert!(!sh.is_dry_run());
        let out = sh.run_captured("echo hello; exit 4").unwrap();
        assert_eq!(out.code, Some(4));
        assert_eq!(out.stdout, "hello\n");
        assert!(sh.check_output("echo ok").unwrap().starts_with("ok"));
    }
}
