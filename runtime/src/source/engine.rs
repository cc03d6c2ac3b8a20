//! Container engine CLI source.
//!
//! Drives a docker-compatible command line (`docker`, `podman`):
//! `image inspect` checks presence, `save` streams the archive on stdout,
//! `pull` fetches from a registry.

use std::io::{self, Read};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

use splat_core::error::{Result, SplatError};

use super::ImageSource;

/// Image source backed by a container engine binary.
#[derive(Debug, Clone)]
pub struct EngineSource {
    binary: String,
    global_args: Vec<String>,
}

impl EngineSource {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            global_args: Vec::new(),
        }
    }

    /// Arguments placed before every subcommand (e.g. `--context remote`).
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.global_args = args;
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(&self.global_args);
        cmd
    }

    fn spawn_error(&self, e: io::Error) -> SplatError {
        SplatError::Other(format!(
            "Failed to run {}: {} (is it installed?)",
            self.binary, e
        ))
    }

    /// Whether the engine has `reference` in its local image store.
    fn is_present(&self, reference: &str) -> Result<bool> {
        let output = self
            .command()
            .args(["image", "inspect", "--format", "{{.Id}}", reference])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            tracing::debug!(
                reference,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "Image not present in engine store"
            );
        }
        Ok(output.status.success())
    }
}

impl ImageSource for EngineSource {
    fn describe(&self) -> String {
        std::iter::once(self.binary.as_str())
            .chain(self.global_args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn open(&self, reference: &str) -> Result<Box<dyn Read + Send>> {
        if !self.is_present(reference)? {
            return Err(SplatError::ImageNotFound {
                reference: reference.to_string(),
            });
        }

        let mut child = self
            .command()
            .args(["save", reference])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        tracing::debug!(
            pid = child.id(),
            engine = %self.binary,
            reference,
            "Streaming image save"
        );

        let stdout = child.stdout.take().ok_or_else(|| {
            SplatError::Other(format!("{} save produced no stdout pipe", self.binary))
        })?;
        let stderr = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut text = String::new();
                let _ = pipe.read_to_string(&mut text);
                text
            })
        });

        Ok(Box::new(SaveStream {
            binary: self.binary.clone(),
            child,
            stdout,
            stderr,
            finished: false,
        }))
    }

    fn pull(&self, reference: &str) -> Result<()> {
        tracing::info!(reference, engine = %self.binary, "Pulling image");

        let output = self
            .command()
            .args(["pull", reference])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| SplatError::PullFailed {
                reference: reference.to_string(),
                message: format!("failed to run {}: {}", self.binary, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SplatError::PullFailed {
                reference: reference.to_string(),
                message: format!(
                    "{} pull exited with {}: {}",
                    self.binary,
                    output.status.code().unwrap_or(-1),
                    stderr.trim()
                ),
            });
        }

        Ok(())
    }
}

/// Stdout of a running `save`; a failed exit shows up as a read error at EOF.
struct SaveStream {
    binary: String,
    child: Child,
    stdout: ChildStdout,
    /// Drained on its own thread so a chatty engine cannot block on a full pipe.
    stderr: Option<JoinHandle<String>>,
    finished: bool,
}

impl SaveStream {
    fn finish(&mut self) -> io::Result<()> {
        self.finished = true;
        let status = self.child.wait()?;
        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if status.success() {
            return Ok(());
        }

        Err(io::Error::new(
            io::ErrorKind::Other,
            format!(
                "{} save exited with {}: {}",
                self.binary,
                status.code().unwrap_or(-1),
                stderr.trim()
            ),
        ))
    }
}

impl Read for SaveStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.finished {
            return Ok(0);
        }

        let n = self.stdout.read(buf)?;
        if n == 0 && !buf.is_empty() {
            self.finish()?;
        }
        Ok(n)
    }
}

impl Drop for SaveStream {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
