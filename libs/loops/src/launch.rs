//! Launching companion processes with a bounded lifetime
//!
//! A launched process gets `timeout` to exit on its own. After that it is
//! asked to terminate, given [`GRACE_PERIOD`] to comply, then killed.

use std::ffi::OsString;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};

use crate::error::Result;

/// How long a terminated process gets before it is killed, and how long a
/// killed process gets to be reaped
pub const GRACE_PERIOD: Duration = Duration::from_secs(1);

/// Configuration for launching a process.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    /// Script or executable to run.
    pub program: PathBuf,
    /// Interpreter to run `program` with, if it is a script.
    pub interpreter: Option<PathBuf>,
    /// Arguments passed after `program`.
    pub args: Vec<OsString>,
    /// How long to wait for a natural exit; zero returns right after spawning.
    pub timeout: Duration,
    /// Run through `sudo`.
    pub elevate: bool,
}

impl LaunchConfig {
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            interpreter: None,
            args: Vec::new(),
            timeout: Duration::from_secs(60),
            elevate: false,
        }
    }

    /// Run `script` with the system Python interpreter
    pub fn python(script: impl AsRef<Path>) -> Self {
        Self::new(script).with_interpreter("python3")
    }

    pub fn with_interpreter(mut self, interpreter: impl AsRef<Path>) -> Self {
        self.interpreter = Some(interpreter.as_ref().to_path_buf());
        self
    }

    pub fn with_arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append `--key value` for every parameter that has a value
    pub fn with_params<I, K, V>(self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Display,
        V: Display,
    {
        self.with_args(param_args(params))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn elevated(mut self, elevate: bool) -> Self {
        self.elevate = elevate;
        self
    }

    fn command(&self) -> Command {
        let mut argv: Vec<OsString> = Vec::new();
        if self.elevate {
            argv.push("sudo".into());
        }
        if let Some(interpreter) = &self.interpreter {
            argv.push(interpreter.into());
        }
        argv.push(self.program.clone().into());
        argv.extend(self.args.iter().cloned());

        let mut command = Command::new(&argv[0]);
        command.args(&argv[1..]).stdin(Stdio::null());
        command
    }
}

/// Render parameters as `--key value` pairs, skipping those without a value
pub fn param_args<I, K, V>(params: I) -> Vec<String>
where
    I: IntoIterator<Item = (K, Option<V>)>,
    K: Display,
    V: Display,
{
    params
        .into_iter()
        .filter_map(|(key, value)| Some([format!("--{}", key), value?.to_string()]))
        .flatten()
        .collect()
}

/// How a launched process ended, as far as the launcher saw it
#[derive(Debug)]
pub enum LaunchOutcome {
    /// Zero timeout: the process was left running
    Detached { pid: Option<u32> },
    /// Exited on its own within the timeout
    Exited(ExitStatus),
    /// Exited after being asked to terminate
    Terminated(ExitStatus),
    /// Had to be killed
    Killed,
}

/// Start the configured process and see it through its timeout
pub async fn launch(config: &LaunchConfig) -> Result<LaunchOutcome> {
    let mut child = config.command().spawn()?;
    let pid = child.id();
    tracing::info!(program = %config.program.display(), ?pid, "Launched process");

    if config.timeout.is_zero() {
        return Ok(LaunchOutcome::Detached { pid });
    }

    if let Ok(status) = tokio::time::timeout(config.timeout, child.wait()).await {
        let status = status?;
        tracing::debug!(?pid, %status, "Process exited");
        return Ok(LaunchOutcome::Exited(status));
    }

    tracing::warn!(?pid, timeout = ?config.timeout, "Process outlived its timeout, terminating");
    request_termination(&mut child)?;
    if let Ok(status) = tokio::time::timeout(GRACE_PERIOD, child.wait()).await {
        return Ok(LaunchOutcome::Terminated(status?));
    }

    tracing::warn!(?pid, "Process ignored termination, killing");
    child.start_kill()?;
    if tokio::time::timeout(GRACE_PERIOD, child.wait()).await.is_err() {
        tracing::error!(?pid, "Killed process was not reaped");
    }
    Ok(LaunchOutcome::Killed)
}

/// Launch `script` with `params` as flags and `port` injected as `--port`
pub async fn launch_with_params<I, K, V>(
    script: impl AsRef<Path>,
    params: I,
    port: u16,
    timeout: Duration,
) -> Result<LaunchOutcome>
where
    I: IntoIterator<Item = (K, Option<V>)>,
    K: Display,
    V: Display,
{
    let config = LaunchConfig::python(script)
        .with_args(["--port".to_string(), port.to_string()])
        .with_params(params)
        .with_timeout(timeout);
    launch(&config).await
}

#[cfg(unix)]
fn request_termination(child: &mut Child) -> Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    // Already reaped
    let Some(pid) = child.id() else {
        return Ok(());
    };
    match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
        Err(errno) => Err(std::io::Error::from(errno).into()),
    }
}

#[cfg(not(unix))]
fn request_termination(child: &mut Child) -> Result<()> {
    child.start_kill()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_render_as_flags() {
        let args = param_args([("rows", Some(3)), ("skip", None), ("cols", Some(90))]);
        assert_eq!(args, vec!["--rows", "3", "--cols", "90"]);
    }

    #[test]
    fn command_line_is_assembled_in_order() {
        let config = LaunchConfig::python("demo.py")
            .with_arg("--fast")
            .elevated(true);
        let command = config.command();
        let cmd = command.as_std();

        assert_eq!(cmd.get_program(), "sudo");
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, vec!["python3", "demo.py", "--fast"]);
    }
}
