/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Long-lived `exiftool` subprocess wrapper.
//!
//! The process is started once with `-stay_open True -@ -` and then receives
//! batched requests over stdin: command lines, a target-path line and a
//! literal `-execute` line. Responses stream back on stdout until a line
//! ending in `{ready}`; a response containing `due to errors` indicates
//! failure.
//!
//! Every failure mode (process not running, failed to start, timeout,
//! non-zero version check) surfaces as a boolean result or `None`, never a
//! panic: metadata writing is best-effort and must not abort a download.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

/// Marker terminating each exiftool response.
const READY_MARKER: &str = "{ready}";

/// Substring exiftool prints when a request failed.
const ERROR_MARKER: &str = "due to errors";

/// Where to write metadata relative to the original file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidecarFile {
    /// Write to the original file only.
    No,
    /// Write to the original file, and to a sidecar if that write failed.
    OnError,
    /// Write to both the original file and a sidecar.
    Both,
    /// Write to a sidecar only.
    Only,
}

/// Options for a metadata write request.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Clear existing metadata before writing.
    pub clear: bool,
    /// When clearing, restore the color profile from the original file.
    pub keep_color_profile: bool,
    /// Sidecar policy.
    pub sidecar: SidecarFile,
    /// Name the sidecar `<dir>/<stem>.xmp` instead of `<file>.xmp`.
    pub sidecar_no_extension: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            clear: false,
            keep_color_profile: false,
            sidecar: SidecarFile::No,
            sidecar_no_extension: false,
        }
    }
}

struct Process {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

/// Handle on the stay-open exiftool process.
///
/// Start and stop are explicit; requests on a stopped handle fail cleanly.
#[derive(Default)]
pub struct Exiftool {
    process: Option<Process>,
}

impl Exiftool {
    /// Create a handle without starting the process.
    pub fn new() -> Self {
        Self::default()
    }

    /// Query the installed exiftool version.
    ///
    /// Returns `None` if the binary is missing, exits non-zero or does not
    /// answer within the timeout.
    pub async fn version(timeout: Duration) -> Option<String> {
        let output = Command::new("exiftool").arg("-ver").output();
        match tokio::time::timeout(timeout, output).await {
            Ok(Ok(output)) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
            }
            _ => None,
        }
    }

    /// Whether the stay-open process is currently running.
    pub fn is_running(&self) -> bool {
        self.process.is_some()
    }

    /// Start the stay-open process. Starting an already-running handle
    /// succeeds without side effects.
    pub async fn start(&mut self) -> bool {
        if self.process.is_some() {
            return true;
        }

        let mut child = match Command::new("exiftool")
            .args(["-stay_open", "True", "-@", "-"])
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(error) => {
                tracing::error!(error = %error, "error starting exiftool");
                return false;
            }
        };

        let (Some(stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            tracing::error!("exiftool started without the expected pipes");
            return false;
        };

        // Relay stderr to the log; warnings are not failures
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line.starts_with("Warning:") {
                    tracing::warn!(line = %line, "exiftool");
                } else {
                    tracing::error!(line = %line, "exiftool");
                }
            }
        });

        self.process = Some(Process {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        });
        true
    }

    /// Stop the stay-open process, waiting for it to exit.
    pub async fn stop(&mut self, timeout: Duration) -> bool {
        let Some(mut process) = self.process.take() else {
            return true;
        };

        let _ = process.stdin.write_all(b"-stay_open\nFalse\n").await;
        let _ = process.stdin.shutdown().await;
        drop(process.stdin);

        match tokio::time::timeout(timeout, process.child.wait()).await {
            Ok(Ok(_)) => true,
            _ => {
                let _ = process.child.kill().await;
                false
            }
        }
    }

    /// Write metadata to a file, honoring the sidecar policy.
    pub async fn write_metadata(
        &mut self,
        file: &Path,
        metadata: &[(String, String)],
        options: &WriteOptions,
        timeout: Duration,
    ) -> bool {
        let commands = build_commands(metadata);

        // Try the original file first, unless only the sidecar is wanted
        if options.sidecar != SidecarFile::Only {
            let file_commands =
                original_file_commands(&commands, options.clear, options.keep_color_profile);
            let ok = self.execute(file, &file_commands.join("\n"), timeout).await;

            if options.sidecar == SidecarFile::No {
                return ok;
            }
            if ok && options.sidecar == SidecarFile::OnError {
                return ok;
            }
        }

        let sidecar = sidecar_path(file, options.sidecar_no_extension);
        self.execute(&sidecar, &commands.join("\n"), timeout).await
    }

    /// Send one request (command lines, target path, `-execute`) and read the
    /// response up to the ready marker.
    pub async fn execute(&mut self, file: &Path, command: &str, timeout: Duration) -> bool {
        let Some(process) = self.process.as_mut() else {
            tracing::error!("cannot execute command, exiftool is not running");
            return false;
        };

        let mut request = String::new();
        if !command.is_empty() {
            request.push_str(command);
            request.push('\n');
        }
        request.push_str(&file.display().to_string());
        request.push_str("\n-execute\n");

        if process.stdin.write_all(request.as_bytes()).await.is_err()
            || process.stdin.flush().await.is_err()
        {
            tracing::error!("failed writing to exiftool stdin");
            return false;
        }

        let mut response = String::new();
        loop {
            match tokio::time::timeout(timeout, process.stdout.next_line()).await {
                Ok(Ok(Some(line))) => {
                    tracing::debug!(line = %line, "exiftool");
                    let done = line.trim_end().ends_with(READY_MARKER);
                    response.push_str(&line);
                    response.push('\n');
                    if done {
                        return response_indicates_success(&response);
                    }
                }
                Ok(_) => {
                    tracing::error!("exiftool stdout closed mid-request");
                    return false;
                }
                Err(_) => {
                    tracing::error!("timed out waiting for exiftool response");
                    return false;
                }
            }
        }
    }
}

/// Base command lines for a metadata write: charset, list separator, one
/// assignment per entry, minor-error tolerance.
fn build_commands(metadata: &[(String, String)]) -> Vec<String> {
    let mut commands = vec![
        "-charset".to_string(),
        "filename=utf8".to_string(),
        "-sep".to_string(),
        ";".to_string(),
    ];
    for (key, value) in metadata {
        commands.push(format!("-{key}={value}"));
    }
    commands.push("-m".to_string());
    commands
}

/// Command lines for the original-file write: optional clearing, optional
/// color-profile restore, always overwrite in place.
fn original_file_commands(base: &[String], clear: bool, keep_color_profile: bool) -> Vec<String> {
    let mut commands = base.to_vec();
    if clear {
        commands.insert(2, "-all=".to_string());
        if keep_color_profile {
            commands.insert(
                3,
                ["--icc_profile:all", "-tagsfromfile", "@", "-colorspacetags"].join("\n"),
            );
        }
    }
    commands.push("-overwrite_original".to_string());
    commands
}

/// Derive the sidecar file name: `<file>.xmp`, or `<dir>/<stem>.xmp` when the
/// original extension should not appear.
fn sidecar_path(file: &Path, no_extension: bool) -> PathBuf {
    if no_extension {
        file.with_extension("xmp")
    } else {
        let mut name = file.as_os_str().to_os_string();
        name.push(".xmp");
        PathBuf::from(name)
    }
}

/// A response succeeded when it reached the ready marker without the error
/// marker.
fn response_indicates_success(response: &str) -> bool {
    !response.contains(ERROR_MARKER)
}
