use std::env;
use std::io;
use std::process::ExitStatus;
use std::process::Stdio;

use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio::process::Child;
use tokio::process::ChildStderr;
use tokio::process::Command;

// Spawns a process detached from the caller.  The process keeps running when
// the returned `Child` is dropped, which is what a media player launched on
// demand needs.
pub fn spawn_process(command: &str) -> Result<Child, Error> {
    spawn(command, Stdio::null())
}

fn spawn(command: &str, stdout: Stdio) -> Result<Child, Error> {
    let words = match shell_words::split(command) {
        Ok(words) => words,
        Err(_) => return Err(Error::UnableToParse(command.to_string())),
    };
    let (prog, args) = match words.split_first() {
        Some(split) => split,
        None => return Err(Error::UnableToParse(command.to_string())),
    };
    let debug_child_process = env::var_os("STREAMNOTIFY_DEBUG_CHILD_PROCESS").is_some();
    let stderr = if debug_child_process {
        Stdio::piped()
    } else {
        Stdio::null()
    };
    let mut child = Command::new(prog)
        .args(args)
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr)
        .spawn()
        .map_err(|err| Error::UnableToSpawn(command.to_string(), err))?;
    if let Some(stderr) = child.stderr.take() {
        let label = format!("{}#{}", prog, child.id().unwrap_or_default());
        tokio::spawn(log_stderr(label, stderr));
    }
    Ok(child)
}

// Lines may contain non-utf8 sequences, so they are read as bytes.
async fn log_stderr(label: String, stderr: ChildStderr) {
    let mut reader = BufReader::new(stderr);
    let mut line = Vec::with_capacity(4096);
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) => tracing::debug!("{}: {}", label, String::from_utf8_lossy(&line).trim_end()),
        }
    }
}

// Runs a command to completion.  A non-zero exit status is an error.
pub async fn run_command(command: &str) -> Result<ExitStatus, Error> {
    let mut child = spawn_process(command)?;
    let status = child.wait().await?;
    if status.success() {
        Ok(status)
    } else {
        Err(Error::Failed(command.to_string(), status))
    }
}

// Runs a command to completion and returns what it printed to stdout.
pub async fn run_command_with_output(command: &str) -> Result<String, Error> {
    let child = spawn(command, Stdio::piped())?;
    let output = child.wait_with_output().await?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        Err(Error::Failed(command.to_string(), output.status))
    }
}

// errors

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unable to parse: {0}")]
    UnableToParse(String),
    #[error("Unable to spawn: {0}: {1}")]
    UnableToSpawn(String, io::Error),
    #[error("Failed: {0}: {1}")]
    Failed(String, ExitStatus),
    #[error(transparent)]
    IoError(#[from] io::Error),
}

// </coverage:exclude>
