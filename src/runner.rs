// SPDX-FileCopyrightText: 2024 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

use std::{
    env,
    ffi::OsStr,
    io::{self, Read},
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use tracing::{debug, error, warn};

use crate::{
    command::CommandLine,
    credential::CredentialFile,
    error::{Error, Result},
    util::HostPath,
};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Shared flag for stopping a running archiver from another thread.
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

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    ToolReported,
    WrongPassword,
}

/// Captured output of an archiver that ran to completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionResult {
    pub succeeded: bool,
    pub stdout: String,
    pub stderr: String,
    /// `-1` if the process was terminated by a signal.
    pub exit_code: i32,
}

impl ExecutionResult {
    /// Text the archiver prints when an encrypted archive can't be decrypted.
    pub const WRONG_PASSWORD_MARKER: &'static str = "Wrong password";

    pub fn failure(&self) -> Option<FailureKind> {
        if self.succeeded {
            None
        } else if self.stderr.contains(Self::WRONG_PASSWORD_MARKER)
            || self.stdout.contains(Self::WRONG_PASSWORD_MARKER)
        {
            Some(FailureKind::WrongPassword)
        } else {
            Some(FailureKind::ToolReported)
        }
    }

    /// The archiver's output on success, or its error output prefixed with
    /// `Error: ` on failure.
    pub fn display_text(&self) -> String {
        if self.succeeded {
            self.stdout.clone()
        } else {
            format!("Error: {}", self.stderr)
        }
    }

    /// Convert a failed result into the matching [`Error`].
    pub fn into_checked(self) -> Result<Self> {
        match self.failure() {
            None => Ok(self),
            Some(FailureKind::ToolReported) => Err(Error::ToolReported { result: self }),
            Some(FailureKind::WrongPassword) => Err(Error::WrongPassword { result: self }),
        }
    }
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

fn join_reader(handle: JoinHandle<io::Result<Vec<u8>>>, name: &str) -> Result<String> {
    let data = handle
        .join()
        .unwrap_or_else(|_| Err(io::Error::other("Reader thread panicked")))
        .map_err(|e| Error::io(format!("Failed to read archiver {name}"), e))?;

    Ok(String::from_utf8_lossy(&data).into_owned())
}

fn kill(child: &mut Child) {
    if let Err(e) = child.kill() {
        debug!("Failed to kill archiver: {e}");
    }
    if let Err(e) = child.wait() {
        debug!("Failed to reap archiver: {e}");
    }
}

/// Runs [`CommandLine`]s without a shell and captures their output.
#[derive(Clone, Debug)]
pub struct Runner {
    credential_dir: PathBuf,
    timeout: Option<Duration>,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    pub fn new() -> Self {
        Self {
            credential_dir: env::temp_dir(),
            timeout: None,
        }
    }

    /// Directory for password files. Defaults to the system temp directory.
    pub fn with_credential_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.credential_dir = dir.into();
        self
    }

    /// Kill the archiver if it runs for longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn credential_dir(&self) -> &Path {
        &self.credential_dir
    }

    /// Find the program in `PATH`.
    pub fn locate(program: impl AsRef<OsStr>) -> Option<PathBuf> {
        which::which(program).ok()
    }

    /// Run the command and wait for it to finish. A password file, if the
    /// command needs one, only exists for the duration of this call.
    ///
    /// A non-zero exit status is not an error here. Use
    /// [`ExecutionResult::failure`] or [`ExecutionResult::into_checked`].
    pub fn run(&self, command: &CommandLine, cancel: &CancelToken) -> Result<ExecutionResult> {
        let credential = command
            .password_file_secret()
            .map(|secret| CredentialFile::create_in(&self.credential_dir, secret))
            .transpose()
            .map_err(Error::Credential)?;

        let args = command.render(credential.as_ref().map(|c| c.path()))?;

        debug!("Executing command: {command:?}");

        let mut child = Command::new(command.program())
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                error!("Failed to launch {:?}: {e}", command.program());
                Error::Launch {
                    program: command.program().to_string_lossy().into_owned(),
                    source: e,
                }
            })?;

        let stdout_reader = spawn_reader(child.stdout.take());
        let stderr_reader = spawn_reader(child.stderr.take());

        let status = self.wait(&mut child, cancel)?;

        let result = ExecutionResult {
            succeeded: status.success(),
            stdout: join_reader(stdout_reader, "stdout")?,
            stderr: join_reader(stderr_reader, "stderr")?,
            exit_code: status.code().unwrap_or(-1),
        };

        if result.succeeded {
            debug!("Command output: {}", result.stdout);
        } else {
            error!("Command failed with exit code {}", result.exit_code);
            error!("Error output: {}", result.stderr);
        }

        // The archiver already ran, so a cleanup failure must not hide its
        // result.
        if let Some(c) = credential {
            let path = HostPath(c.path().to_path_buf());

            if let Err(e) = c.close() {
                warn!("Failed to delete password file: {path:?}: {e}");
            }
        }

        Ok(result)
    }

    fn wait(&self, child: &mut Child, cancel: &CancelToken) -> Result<ExitStatus> {
        let start = Instant::now();

        loop {
            let status = child
                .try_wait()
                .map_err(|e| Error::io("Failed to wait for archiver", e))?;
            if let Some(status) = status {
                return Ok(status);
            }

            if cancel.is_cancelled() {
                debug!("Cancelling archiver");
                kill(child);
                return Err(Error::Cancelled);
            }

            if let Some(timeout) = self.timeout {
                if start.elapsed() >= timeout {
                    error!("Archiver timed out after {timeout:?}");
                    kill(child);
                    return Err(Error::TimedOut(timeout));
                }
            }

            thread::sleep(POLL_INTERVAL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(succeeded: bool, stdout: &str, stderr: &str) -> ExecutionResult {
        ExecutionResult {
            succeeded,
            stdout: stdout.to_owned(),
            stderr: stderr.to_owned(),
            exit_code: if succeeded { 0 } else { 2 },
        }
    }

    #[test]
    fn classify_results() {
        assert_eq!(result(true, "Everything is Ok", "").failure(), None);
        assert_eq!(
            result(false, "", "ERROR: Data Error in encrypted file. Wrong password? : a.txt")
                .failure(),
            Some(FailureKind::WrongPassword)
        );
        assert_eq!(
            result(false, "", "ERROR: a.7z\nCannot open the file as archive").failure(),
            Some(FailureKind::ToolReported)
        );
    }

    #[test]
    fn display_text_marks_errors() {
        let ok = result(true, "Everything is Ok\n", "");
        assert_eq!(ok.display_text(), "Everything is Ok\n");
        assert_eq!(result(false, "", "boom").display_text(), "Error: boom");
    }

    #[test]
    fn into_checked_keeps_raw_text() {
        let err = result(false, "", "Wrong password")
            .into_checked()
            .unwrap_err();
        assert!(err.is_wrong_password());
        assert_eq!(err.to_string(), "Error: Wrong password");
        assert_eq!(err.execution_result().unwrap().stderr, "Wrong password");

        let err = result(false, "", "disk full").into_checked().unwrap_err();
        assert!(matches!(err, Error::ToolReported { .. }));
    }

    #[test]
    fn launch_failure_for_missing_program() {
        let command = CommandLine::new("szwrap-definitely-not-installed", vec![]);
        let err = Runner::new()
            .run(&command, &CancelToken::new())
            .unwrap_err();

        assert!(matches!(err, Error::Launch { .. }), "{err:?}");
    }

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
