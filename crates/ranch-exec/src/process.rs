//! Running external programs.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::ExecError;

/// Captured output of a successful run.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Run `program` with `args` to completion.
///
/// The child is killed if the returned future is dropped before it exits.
#[tracing::instrument(skip(args), fields(program = %program.display()))]
pub async fn run_command<I, S>(program: &Path, args: I) -> Result<ProcessOutput, ExecError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!("spawning external program");

    let child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ExecError::BinaryNotFound {
                program: program.display().to_string(),
            }
        } else {
            ExecError::Io(e)
        }
    })?;

    let output = child.wait_with_output().await?;
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if !output.status.success() {
        warn!(
            exit_code = ?output.status.code(),
            stderr = %stderr,
            "external program failed"
        );
        return Err(ExecError::ProcessFailed {
            program: program.display().to_string(),
            status: output.status,
            stderr,
        });
    }

    Ok(ProcessOutput { stdout, stderr })
}

/// Remove a file, treating an already missing file as success.
pub async fn delete_file_if_exists(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
