// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine where the files that fe-build reads and writes live on the
//! user's machine. None of these functions check that the returned path
//! actually exists.

use std::path::PathBuf;

/// Name of settings file placed at the top of the user's home directory.
pub const SETTINGS_FILE_NAME: &str = ".fe-build-settings.conf";

/// Name of optional build-type table placed at the top of the user's home
/// directory.
pub const BUILD_TYPES_FILE_NAME: &str = ".fe-build-types.toml";

/// Determine absolute path to user's home directory.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(NoWayHome)
}

/// Determine default absolute path to settings file.
///
/// Uses `$HOME/.fe-build-settings.conf`.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_settings_path() -> Result<PathBuf> {
    home_dir().map(|path| path.join(SETTINGS_FILE_NAME))
}

/// Determine default absolute path to build-type table.
///
/// Uses `$HOME/.fe-build-types.toml`.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_build_types_path() -> Result<PathBuf> {
    home_dir().map(|path| path.join(BUILD_TYPES_FILE_NAME))
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;
