// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Settings store.
//!
//! fe-build keeps a tiny per-user __settings file__ that holds everything a
//! build needs to know about the local machine: the SSH password for the
//! deployment host, and the path to the front-end project to build.
//!
//! # Settings File Layout
//!
//! The settings file is plain text with one `key: value` pair per line:
//!
//! ```text
//! ssh_password: hunter2
//! project_dir: /srv/app
//! ```
//!
//! Each line is split on the first `": "` into a key and a value, both trimmed
//! of surrounding whitespace. Lines without that separator are skipped. Order
//! does not matter, unknown keys are kept but never written back, and missing
//! keys stay missing.
//!
//! # Pitfalls
//!
//! The SSH password is stored in clear text. Nothing here encrypts it.

use std::{
    collections::HashMap,
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    fs::{read_to_string, remove_file, write},
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{debug, info, instrument};

/// Key holding the SSH password.
pub const SSH_PASSWORD_KEY: &str = "ssh_password";

/// Key holding the project directory.
pub const PROJECT_DIR_KEY: &str = "project_dir";

const SEPARATOR: &str = ": ";

/// Parsed settings file.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct Settings {
    entries: HashMap<String, String>,
}

impl Settings {
    /// Construct settings holding both known keys.
    pub fn new(ssh_password: impl Into<String>, project_dir: impl Into<String>) -> Self {
        let mut entries = HashMap::new();
        entries.insert(SSH_PASSWORD_KEY.into(), ssh_password.into());
        entries.insert(PROJECT_DIR_KEY.into(), project_dir.into());
        Self { entries }
    }

    /// Get value of any key.
    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        self.entries.get(key.as_ref()).map(String::as_str)
    }

    pub fn ssh_password(&self) -> Option<&str> {
        self.get(SSH_PASSWORD_KEY)
    }

    pub fn project_dir(&self) -> Option<&str> {
        self.get(PROJECT_DIR_KEY)
    }

    /// Project directory with `~` and environment variables expanded.
    ///
    /// Returns `None` if the settings file never set a project directory.
    ///
    /// # Errors
    ///
    /// - Return [`SettingsError::ShellExpansion`] if a referenced variable
    ///   cannot be looked up.
    pub fn expanded_project_dir(&self) -> Result<Option<PathBuf>> {
        self.project_dir()
            .map(|dir| {
                shellexpand::full(dir)
                    .map(|dir| PathBuf::from(dir.into_owned()))
                    .map_err(SettingsError::ShellExpansion)
            })
            .transpose()
    }

    /// Raw key-value mapping.
    pub fn as_map(&self) -> &HashMap<String, String> {
        &self.entries
    }
}

impl FromStr for Settings {
    type Err = SettingsError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let entries = data
            .lines()
            .filter_map(|line| line.split_once(SEPARATOR))
            .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
            .collect();

        Ok(Self { entries })
    }
}

impl Display for Settings {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        // INVARIANT: Known keys are always written in the same order.
        for key in [SSH_PASSWORD_KEY, PROJECT_DIR_KEY] {
            if let Some(value) = self.get(key) {
                writeln!(fmt, "{key}{SEPARATOR}{value}")?;
            }
        }

        Ok(())
    }
}

impl Debug for Settings {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.debug_struct("Settings")
            .field("ssh_password", &self.ssh_password().map(|_| "<redacted>"))
            .field("project_dir", &self.project_dir())
            .finish()
    }
}

/// Handle to settings file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Construct new handle to settings file at target path.
    ///
    /// Does not touch the file system.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path to settings file.
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Read and parse settings file.
    ///
    /// # Errors
    ///
    /// - Return [`SettingsError::NotFound`] if settings file does not exist.
    /// - Return [`SettingsError::Read`] if settings file cannot be read.
    #[instrument(skip(self), level = "debug")]
    pub fn read(&self) -> Result<Settings> {
        debug!("read settings file {:?}", self.path.display());
        let content = read_to_string(&self.path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => SettingsError::NotFound {
                path: self.path.clone(),
            },
            _ => SettingsError::Read {
                source: err,
                path: self.path.clone(),
            },
        })?;

        content.parse()
    }

    /// Write settings to settings file.
    ///
    /// Creates or truncates the settings file. Missing parent directories are
    /// created first.
    ///
    /// # Errors
    ///
    /// - Return [`SettingsError::Write`] if settings file cannot be written.
    #[instrument(skip(self, settings), level = "debug")]
    pub fn write(&self, settings: &Settings) -> Result<()> {
        debug!("write settings file {:?}", self.path.display());
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            mkdirp::mkdirp(parent).map_err(|err| SettingsError::Write {
                source: err,
                path: self.path.clone(),
            })?;
        }

        write(&self.path, settings.to_string().as_bytes()).map_err(|err| SettingsError::Write {
            source: err,
            path: self.path.clone(),
        })
    }

    /// Delete settings file if it exists.
    ///
    /// Returns whether a file was actually removed.
    ///
    /// # Errors
    ///
    /// - Return [`SettingsError::Delete`] if settings file exists, but cannot
    ///   be removed.
    #[instrument(skip(self), level = "debug")]
    pub fn remove(&self) -> Result<bool> {
        match remove_file(&self.path) {
            Ok(()) => {
                info!("removed previous settings file {:?}", self.path.display());
                Ok(true)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(SettingsError::Delete {
                source: err,
                path: self.path.clone(),
            }),
        }
    }

    /// Replace settings file with fresh settings.
    ///
    /// Removes any previous settings file, asks `ask` for the new settings,
    /// and writes them out. The previous file is gone even if `ask` fails.
    ///
    /// # Errors
    ///
    /// - Return [`SettingsError::Delete`] if previous file cannot be removed.
    /// - Return any error produced by `ask`.
    /// - Return [`SettingsError::Write`] if new settings cannot be written.
    pub fn init<F>(&self, ask: F) -> Result<Settings>
    where
        F: FnOnce() -> Result<Settings>,
    {
        self.remove()?;
        let settings = ask()?;
        self.write(&settings)?;
        info!("settings file {:?} initialized", self.path.display());

        Ok(settings)
    }
}

/// Settings file error types.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Settings file does not exist.
    #[error("settings file {path:?} not found, run `fe-build init` first")]
    NotFound { path: PathBuf },

    /// Settings file cannot be read.
    #[error("failed to read settings file {path:?}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Settings file cannot be written.
    #[error("failed to write settings file {path:?}")]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Previous settings file cannot be removed.
    #[error("failed to delete previous settings file {path:?}")]
    Delete {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Prompting for a setting failed.
    #[error(transparent)]
    Prompt(#[from] crate::prompt::PromptError),

    /// Failed to perform shell expansion on a setting.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

/// Friendly result alias :3
type Result<T, E = SettingsError> = std::result::Result<T, E>;
