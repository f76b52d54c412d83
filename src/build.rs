// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Build orchestration.
//!
//! A build checks out the requested branch of the front-end project, pulls
//! the latest changes, installs dependencies, runs the npm script of the
//! requested build type, and ships `dist/pbc/browser` to the deployment host.
//!
//! Every step runs inside the project directory through the working
//! directory of its own command. The process working directory is never
//! changed. The first failing step aborts the whole build, and nothing is
//! rolled back.

use crate::{
    config::{BuildTable, BuildVariant},
    resolve::{HostResolver, ResolveError},
    store::{SettingsError, SettingsStore, PROJECT_DIR_KEY},
    syscall::{Invocation, Shell, SyscallError},
    transfer::{ArtifactTransfer, TransferError},
};

use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Location of build artifacts relative to the project directory.
pub const ARTIFACT_DIR: &str = "dist/pbc/browser";

/// One build and deploy request from the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// Literal IP address, or short name of deployment host.
    pub target: String,

    /// Branch to check out.
    pub branch: String,

    /// Label of build type in the build table.
    pub build_type: String,
}

impl BuildRequest {
    pub fn new(
        target: impl Into<String>,
        branch: impl Into<String>,
        build_type: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            branch: branch.into(),
            build_type: build_type.into(),
        }
    }
}

/// Build orchestrator.
#[derive(Debug)]
pub struct Builder<S>
where
    S: Shell,
{
    shell: S,
    store: SettingsStore,
    table: BuildTable,
}

impl<S> Builder<S>
where
    S: Shell,
{
    /// Construct new builder.
    pub fn new(shell: S, store: SettingsStore, table: BuildTable) -> Self {
        Self {
            shell,
            store,
            table,
        }
    }

    /// Find build variant of target build type.
    ///
    /// # Errors
    ///
    /// - Return [`BuildError::InvalidBuildType`] if build type is unknown.
    pub fn variant(&self, build_type: &str) -> Result<&BuildVariant> {
        self.table
            .lookup(build_type)
            .ok_or_else(|| BuildError::InvalidBuildType {
                build_type: build_type.to_string(),
                known: self.table.labels().collect::<Vec<_>>().join(", "),
            })
    }

    /// Validate, resolve, build, and deploy a request.
    ///
    /// The build type is checked before anything runs, so an unknown build
    /// type never starts a subprocess. The resolved address is the one the
    /// artifacts are copied to.
    ///
    /// # Errors
    ///
    /// - Return [`BuildError::InvalidBuildType`] if build type is unknown.
    /// - Return [`BuildError::Resolve`] if target cannot be resolved.
    /// - Return any error of [`Builder::build`].
    pub fn deploy<R>(&self, resolver: &HostResolver<R>, request: &BuildRequest) -> Result<()>
    where
        R: Shell,
    {
        let variant = self.variant(&request.build_type)?;
        let host = resolver.resolve(&request.target)?;
        self.build(&host, &request.branch, variant)
    }

    /// Build target branch with target variant, then copy artifacts to host.
    ///
    /// # Errors
    ///
    /// - Return [`BuildError::Settings`] if settings cannot be loaded.
    /// - Return [`BuildError::MissingSetting`] if no project directory is set.
    /// - Return [`BuildError::ProjectDir`] if project directory is unusable.
    /// - Return [`BuildError::Command`] if git or npm fails.
    /// - Return [`BuildError::Transfer`] if artifacts cannot be copied.
    #[instrument(skip(self, variant), level = "debug")]
    pub fn build(&self, host: &str, branch: &str, variant: &BuildVariant) -> Result<()> {
        let project_dir = self.project_dir()?;

        info!("checking out to branch: {branch}");
        self.run_in(&project_dir, Invocation::new("git").args(["checkout", branch]))?;

        info!("pulling the latest changes");
        self.run_in(&project_dir, Invocation::new("git").arg("pull"))?;

        info!("running npm install to update dependencies");
        self.run_in(
            &project_dir,
            Invocation::new("npm").args(["i", "--legacy-peer-deps"]),
        )?;

        info!("running npm build command: {}", variant.script);
        self.run_in(
            &project_dir,
            Invocation::new("npm").args(["run", variant.script.as_str()]),
        )?;

        let artifacts = project_dir.join(ARTIFACT_DIR);
        ArtifactTransfer::new(&self.shell).copy(&artifacts, host, &variant.remote_dir)?;

        info!("build process completed successfully");
        Ok(())
    }

    fn project_dir(&self) -> Result<PathBuf> {
        let settings = self.store.read()?;
        let project_dir = settings
            .expanded_project_dir()?
            .ok_or(BuildError::MissingSetting(PROJECT_DIR_KEY))?;

        // INVARIANT: Project directory must exist before any command runs in it.
        if !project_dir.is_dir() {
            return Err(BuildError::ProjectDir(project_dir));
        }

        Ok(project_dir)
    }

    fn run_in(&self, dir: &Path, invocation: Invocation) -> Result<()> {
        Ok(self.shell.interactive(&invocation.current_dir(dir))?)
    }
}

/// Build error types.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Build type is not in build table.
    #[error("invalid build type: {build_type} (expected one of: {known})")]
    InvalidBuildType { build_type: String, known: String },

    /// Settings file cannot be loaded.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Settings file lacks a required key.
    #[error("settings file does not set {0:?}, run `fe-build init` again")]
    MissingSetting(&'static str),

    /// Project directory does not exist or is not a directory.
    #[error("project directory {0:?} is not accessible")]
    ProjectDir(PathBuf),

    /// Deployment host cannot be resolved.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Git or npm failed.
    #[error(transparent)]
    Command(#[from] SyscallError),

    /// Artifacts cannot be copied.
    #[error(transparent)]
    Transfer(#[from] TransferError),
}

/// Friendly result alias :3
pub type Result<T, E = BuildError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{resolve::Strategy, store::Settings};
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::{cell::RefCell, fs::create_dir_all, process::ExitStatus};

    #[derive(Default)]
    struct RecordingShell {
        fail_on: Option<&'static str>,
        calls: RefCell<Vec<String>>,
    }

    impl Shell for RecordingShell {
        fn interactive(&self, invocation: &Invocation) -> crate::syscall::Result<()> {
            let call = invocation.to_string();
            self.calls.borrow_mut().push(call.clone());
            if self.fail_on.is_some_and(|prefix| call.starts_with(prefix)) {
                return Err(SyscallError::Status {
                    command: call,
                    status: ExitStatus::default(),
                });
            }

            Ok(())
        }

        fn capture(&self, invocation: &Invocation) -> crate::syscall::Result<String> {
            self.interactive(invocation).map(|_| String::new())
        }
    }

    fn builder(shell: &RecordingShell) -> Builder<&RecordingShell> {
        Builder::new(
            shell,
            SettingsStore::new("settings.conf"),
            BuildTable::default(),
        )
    }

    fn setup_project() -> anyhow::Result<PathBuf> {
        let project_dir = std::env::current_dir()?.join("app");
        create_dir_all(&project_dir)?;
        SettingsStore::new("settings.conf").write(&Settings::new(
            "hunter2",
            project_dir.to_string_lossy(),
        ))?;

        Ok(project_dir)
    }

    #[sealed_test]
    fn build_runs_steps_in_order() -> anyhow::Result<()> {
        let project_dir = setup_project()?;
        let shell = RecordingShell::default();
        let builder = builder(&shell);

        let variant = builder.variant("cy")?.clone();
        builder.build("203.0.113.5", "release", &variant)?;

        let expect = vec![
            "git checkout release".to_string(),
            "git pull".into(),
            "npm i --legacy-peer-deps".into(),
            "npm run build:preprod_cyprus".into(),
            format!(
                "scp -r {} thatguy@203.0.113.5:/var/www/html/public.com.cy",
                project_dir.join("dist/pbc/browser").display()
            ),
        ];
        assert_eq!(shell.calls.into_inner(), expect);

        Ok(())
    }

    #[sealed_test]
    fn build_stops_at_first_failure() -> anyhow::Result<()> {
        setup_project()?;
        let shell = RecordingShell {
            fail_on: Some("git pull"),
            ..Default::default()
        };
        let builder = builder(&shell);

        let variant = builder.variant("gr")?.clone();
        let result = builder.build("203.0.113.5", "main", &variant);
        assert!(matches!(result, Err(BuildError::Command(_))));
        assert_eq!(
            shell.calls.into_inner(),
            vec!["git checkout main".to_string(), "git pull".into()]
        );

        Ok(())
    }

    #[sealed_test]
    fn unknown_build_type_runs_nothing() -> anyhow::Result<()> {
        setup_project()?;
        let shell = RecordingShell::default();
        let resolver = HostResolver::new(&shell, Strategy::Probe);
        let request = BuildRequest::new("vm42", "main", "xyz");

        let err = builder(&shell).deploy(&resolver, &request).unwrap_err();
        assert!(matches!(err, BuildError::InvalidBuildType { .. }));
        assert!(err.to_string().contains("xyz"));
        assert!(shell.calls.borrow().is_empty());

        Ok(())
    }

    #[sealed_test]
    fn missing_settings_file() {
        let shell = RecordingShell::default();
        let builder = builder(&shell);
        let variant = BuildVariant::new("build:b2b", "publicbusiness.gr");

        let result = builder.build("203.0.113.5", "main", &variant);
        assert!(matches!(
            result,
            Err(BuildError::Settings(SettingsError::NotFound { .. }))
        ));
        assert!(shell.calls.borrow().is_empty());
    }

    #[sealed_test]
    fn missing_project_dir_setting() -> anyhow::Result<()> {
        std::fs::write("settings.conf", "ssh_password: hunter2\n")?;
        let shell = RecordingShell::default();
        let variant = BuildVariant::new("build:b2b", "publicbusiness.gr");

        let result = builder(&shell).build("203.0.113.5", "main", &variant);
        assert!(matches!(
            result,
            Err(BuildError::MissingSetting(PROJECT_DIR_KEY))
        ));

        Ok(())
    }

    #[sealed_test]
    fn inaccessible_project_dir() -> anyhow::Result<()> {
        SettingsStore::new("settings.conf").write(&Settings::new("hunter2", "does/not/exist"))?;
        let shell = RecordingShell::default();
        let variant = BuildVariant::new("build:b2b", "publicbusiness.gr");

        let result = builder(&shell).build("203.0.113.5", "main", &variant);
        assert!(matches!(result, Err(BuildError::ProjectDir(_))));
        assert!(shell.calls.borrow().is_empty());

        Ok(())
    }
}
