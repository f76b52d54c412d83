// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Build a front-end branch and ship its artifacts to a web host.
//!
//! fe-build glues together git, npm, and scp. It checks out a branch of the
//! front-end project named in the user's settings file, builds one of the
//! known build types, and copies the result into the web root of a
//! deployment host.
//!
//! # See Also
//!
//! 1. [`build`] for the build sequence.
//! 2. [`store`] for the settings file layout.
//! 3. [`config`] for the build-type table.

pub mod build;
pub mod config;
pub mod path;
pub mod prompt;
pub mod resolve;
pub mod store;
pub mod syscall;
pub mod transfer;

pub use build::{BuildError, BuildRequest, Builder};
pub use config::{BuildTable, BuildVariant};
pub use resolve::{HostResolver, Strategy};
pub use store::{Settings, SettingsStore};
pub use syscall::{DryRunShell, Invocation, Shell, SystemShell};
