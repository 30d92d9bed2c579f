//! `cfssl` subprocess signer.
//!
//! Runs `cfssl gencert -initca <request>` for a root CA and
//! `cfssl gencert -ca <cert> -ca-key <key> <request>` for a leaf. The JSON
//! document cfssl prints on stdout is returned untouched.

use crate::config::SignerConfig;
use crate::error::{LabPkiError, Result};
use crate::signer::{SignMode, Signer};
use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// How often a running signer is polled while a timeout is armed.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Signer backed by an external `cfssl` executable.
#[derive(Debug, Clone)]
pub struct CfsslSigner {
    executable: PathBuf,
    leading_args: Vec<OsString>,
    timeout: Option<Duration>,
}

impl CfsslSigner {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            leading_args: Vec::new(),
            timeout: None,
        }
    }

    pub fn from_config(config: &SignerConfig) -> Self {
        Self::new(&config.executable)
            .with_leading_args(config.leading_args.iter())
            .with_timeout(config.timeout())
    }

    /// Arguments passed before `gencert`, for wrappers such as `sh script`.
    pub fn with_leading_args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Kill the subprocess and fail if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// `gencert` arguments for a request.
    pub fn gencert_args(request: &Path, mode: &SignMode) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["gencert".into()];
        match mode {
            SignMode::InitializeCa => args.push("-initca".into()),
            SignMode::SignWithCa { ca_cert, ca_key } => {
                args.push("-ca".into());
                args.push(ca_cert.into());
                args.push("-ca-key".into());
                args.push(ca_key.into());
            }
        }
        args.push(request.into());
        args
    }

    fn command(&self, request: &Path, mode: &SignMode) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.args(&self.leading_args)
            .args(Self::gencert_args(request, mode))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    fn run(&self, mut cmd: Command) -> Result<Output> {
        let child = cmd.spawn().map_err(|e| {
            LabPkiError::SignerUnavailable(format!(
                "Failed to run {}: {}",
                self.executable.display(),
                e
            ))
        })?;

        match self.timeout {
            None => child.wait_with_output().map_err(|e| {
                LabPkiError::SignerUnavailable(format!("Failed to wait for signer: {}", e))
            }),
            Some(timeout) => wait_with_timeout(child, timeout),
        }
    }
}

impl Signer for CfsslSigner {
    fn sign(&self, request: &Path, mode: &SignMode) -> Result<Vec<u8>> {
        let cmd = self.command(request, mode);
        debug!(command = ?cmd, "running signer");

        let output = self.run(cmd)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(status = %output.status, stderr = %stderr.trim(), "signer failed");
            return Err(LabPkiError::SignerUnavailable(format!(
                "{} exited with {}: {}",
                self.executable.display(),
                output.status,
                stderr.trim()
            )));
        }

        Ok(output.stdout)
    }
}

fn spawn_reader<R: Read + Send + 'static>(source: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut source) = source {
            let _ = source.read_to_end(&mut buf);
        }
        buf
    })
}

/// Wait for `child`, draining its pipes, and kill it once `timeout` elapses.
fn wait_with_timeout(mut child: Child, timeout: Duration) -> Result<Output> {
    let stdout = spawn_reader(child.stdout.take());
    let stderr = spawn_reader(child.stderr.take());
    let started = Instant::now();

    let status = loop {
        let polled = child.try_wait().map_err(|e| {
            LabPkiError::SignerUnavailable(format!("Failed to wait for signer: {}", e))
        })?;
        if let Some(status) = polled {
            break status;
        }
        if started.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(LabPkiError::SignerUnavailable(format!(
                "Signer timed out after {:?}",
                timeout
            )));
        }
        thread::sleep(POLL_INTERVAL);
    };

    Ok(Output {
        status,
        stdout: stdout.join().unwrap_or_default(),
        stderr: stderr.join().unwrap_or_default(),
    })
}
