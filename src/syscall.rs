// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! External command execution.
//!
//! fe-build does not build or copy anything by itself. Git, npm, ping, and
//! scp do the real work, and this module is the only place that talks to
//! them. Every call is described by an [`Invocation`] and handed to a
//! [`Shell`], so the rest of the crate never touches
//! [`std::process::Command`] directly.
//!
//! Commands never inherit a changed process working directory. If a
//! command must run inside a specific directory, then its invocation says
//! so through [`Invocation::current_dir`].

use std::{
    ffi::{OsStr, OsString},
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    process::{Command, ExitStatus},
};
use tracing::{debug, info, instrument};

/// Description of one external command.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: OsString,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
}

impl Invocation {
    /// Construct new invocation of target program without arguments.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append many arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<OsString>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run command inside target directory.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &OsStr {
        self.program.as_os_str()
    }

    pub fn get_current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }

        command
    }
}

impl Display for Invocation {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.program.to_string_lossy().as_ref())?;
        for arg in &self.args {
            write!(fmt, " {}", arg.to_string_lossy())?;
        }

        Ok(())
    }
}

/// Layer of indirection for running external commands.
pub trait Shell {
    /// Run command with inherited standard streams.
    ///
    /// Output of the command goes straight to the user's console, and the
    /// current process blocks until the command exits.
    fn interactive(&self, invocation: &Invocation) -> Result<()>;

    /// Run command and capture its standard output.
    ///
    /// Standard error still goes to the user's console.
    fn capture(&self, invocation: &Invocation) -> Result<String>;
}

impl<S> Shell for &S
where
    S: Shell + ?Sized,
{
    fn interactive(&self, invocation: &Invocation) -> Result<()> {
        (**self).interactive(invocation)
    }

    fn capture(&self, invocation: &Invocation) -> Result<String> {
        (**self).capture(invocation)
    }
}

/// Shell that runs commands on the host system.
#[derive(Debug, Default, Clone)]
pub struct SystemShell;

impl Shell for SystemShell {
    #[instrument(skip(self), level = "debug")]
    fn interactive(&self, invocation: &Invocation) -> Result<()> {
        debug!("run {invocation}");
        let status = invocation
            .to_command()
            .spawn()
            .map_err(|err| SyscallError::Spawn {
                source: err,
                command: invocation.to_string(),
            })?
            .wait()
            .map_err(|err| SyscallError::Spawn {
                source: err,
                command: invocation.to_string(),
            })?;

        check_status(invocation, status)
    }

    #[instrument(skip(self), level = "debug")]
    fn capture(&self, invocation: &Invocation) -> Result<String> {
        debug!("run {invocation}");
        let output = invocation
            .to_command()
            .stderr(std::process::Stdio::inherit())
            .output()
            .map_err(|err| SyscallError::Spawn {
                source: err,
                command: invocation.to_string(),
            })?;
        check_status(invocation, output.status)?;

        Ok(String::from_utf8_lossy(output.stdout.as_slice()).into_owned())
    }
}

/// Shell that only reports what it would run.
#[derive(Debug, Default, Clone)]
pub struct DryRunShell;

impl Shell for DryRunShell {
    fn interactive(&self, invocation: &Invocation) -> Result<()> {
        info!("dry run: {}", describe(invocation));
        Ok(())
    }

    fn capture(&self, invocation: &Invocation) -> Result<String> {
        info!("dry run: {}", describe(invocation));
        Ok(String::new())
    }
}

fn describe(invocation: &Invocation) -> String {
    match invocation.get_current_dir() {
        Some(dir) => format!("{invocation} (in {:?})", dir.display()),
        None => invocation.to_string(),
    }
}

fn check_status(invocation: &Invocation, status: ExitStatus) -> Result<()> {
    if !status.success() {
        return Err(SyscallError::Status {
            command: invocation.to_string(),
            status,
        });
    }

    Ok(())
}

/// External command error types.
#[derive(Debug, thiserror::Error)]
pub enum SyscallError {
    /// Command could not be started or waited on.
    #[error("failed to run command {command:?}")]
    Spawn {
        #[source]
        source: std::io::Error,
        command: String,
    },

    /// Command exited unsuccessfully.
    #[error("command {command:?} failed with {status}")]
    Status { command: String, status: ExitStatus },
}

/// Friendly result alias :3
pub type Result<T, E = SyscallError> = std::result::Result<T, E>;
