// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Build-type table layout.
//!
//! Every deployment target of the front-end project is a __build type__: a
//! short label picked on the command line that names the npm script to run,
//! and the directory under the remote web root that receives the artifacts.
//!
//! # General Layout
//!
//! The built-in table knows three build types. Users can replace it with a
//! TOML file of the following shape:
//!
//! ```toml
//! [variant.gr]
//! script = "build:preprod"
//! remote_dir = "public.gr"
//! ```
//!
//! A table file replaces the built-in table entirely, it does not extend it.

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{debug, instrument};

/// Table of known build types.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct BuildTable {
    /// Build variants keyed by build type label.
    #[serde(rename = "variant")]
    pub variants: BTreeMap<String, BuildVariant>,
}

impl BuildTable {
    /// Load build table from target path.
    ///
    /// Falls back to [`BuildTable::default`] if no file exists at target path.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if table file exists but cannot be read.
    /// - Return [`ConfigError::Deserialize`] if table file is malformed.
    #[instrument(skip(path), level = "debug")]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        match read_to_string(path.as_ref()) {
            Ok(content) => {
                debug!("load build table {:?}", path.as_ref().display());
                content.parse()
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("no build table at {:?}, use built-in", path.as_ref().display());
                Ok(Self::default())
            }
            Err(err) => Err(ConfigError::Read {
                source: err,
                path: path.as_ref().to_path_buf(),
            }),
        }
    }

    /// Find variant for given build type label.
    pub fn lookup(&self, build_type: impl AsRef<str>) -> Option<&BuildVariant> {
        self.variants.get(build_type.as_ref())
    }

    /// Labels of all known build types in sorted order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.variants.keys().map(String::as_str)
    }
}

impl Default for BuildTable {
    fn default() -> Self {
        let variants = [
            ("gr", "build:preprod", "public.gr"),
            ("cy", "build:preprod_cyprus", "public.com.cy"),
            ("b2b", "build:b2b", "publicbusiness.gr"),
        ]
        .into_iter()
        .map(|(label, script, remote_dir)| (label.to_string(), BuildVariant::new(script, remote_dir)))
        .collect();

        Self { variants }
    }
}

impl FromStr for BuildTable {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let table: BuildTable = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: A table must offer at least one build type.
        if table.variants.is_empty() {
            return Err(ConfigError::EmptyTable);
        }

        Ok(table)
    }
}

impl Display for BuildTable {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Single build variant.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct BuildVariant {
    /// Name of npm script that builds this variant.
    pub script: String,

    /// Directory under remote web root that receives the artifacts.
    pub remote_dir: String,
}

impl BuildVariant {
    pub fn new(script: impl Into<String>, remote_dir: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            remote_dir: remote_dir.into(),
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Build table lists no build types.
    #[error("build table does not define any build type")]
    EmptyTable,

    /// Failed to read build table file.
    #[error("failed to read build table {path:?}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
