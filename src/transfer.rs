// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Artifact transfer to the deployment host.
//!
//! Build artifacts are copied recursively with scp into a directory under the
//! remote web root. Transfer integrity is left entirely to scp: nothing is
//! retried, checksummed, or cleaned up after a partial copy.

use crate::syscall::{Invocation, Shell, SyscallError};

use std::{
    net::Ipv6Addr,
    path::{Path, PathBuf},
};
use tracing::{info, instrument};

/// Web root on every deployment host.
pub const REMOTE_WEB_ROOT: &str = "/var/www/html/";

/// User that owns the web root on every deployment host.
pub const REMOTE_USER: &str = "thatguy";

/// Recursive scp transfer into the remote web root.
#[derive(Debug)]
pub struct ArtifactTransfer<S>
where
    S: Shell,
{
    shell: S,
    user: String,
}

impl<S> ArtifactTransfer<S>
where
    S: Shell,
{
    /// Construct new transfer that logs in as [`REMOTE_USER`].
    pub fn new(shell: S) -> Self {
        Self {
            shell,
            user: REMOTE_USER.into(),
        }
    }

    /// Copy local directory into remote web root of target host.
    ///
    /// Destination is `<user>@<host>:/var/www/html/<remote_dir>`, with IPv6
    /// hosts wrapped in brackets. Output of scp streams straight to the
    /// console.
    ///
    /// # Errors
    ///
    /// - Return [`TransferError`] if scp cannot be run or fails.
    #[instrument(skip(self), level = "debug")]
    pub fn copy(&self, local_dir: &Path, host: &str, remote_dir: &str) -> Result<()> {
        let remote_path = remote_path(remote_dir);
        info!("starting scp process on {host}:{}", remote_path.display());

        let invocation = Invocation::new("scp")
            .arg("-r")
            .arg(local_dir)
            .arg(format!(
                "{}@{}:{}",
                self.user,
                scp_host(host),
                remote_path.display()
            ));
        self.shell
            .interactive(&invocation)
            .map_err(|err| TransferError {
                source: err,
                host: host.to_string(),
            })?;

        info!("files copied successfully");
        Ok(())
    }
}

/// Path under remote web root for target directory.
pub fn remote_path(remote_dir: &str) -> PathBuf {
    Path::new(REMOTE_WEB_ROOT).join(remote_dir)
}

/// Host part of an scp destination.
///
/// scp splits the destination on the first colon, so IPv6 literals must be
/// bracketed.
pub fn scp_host(host: &str) -> String {
    match host.parse::<Ipv6Addr>() {
        Ok(_) => format!("[{host}]"),
        Err(_) => host.to_string(),
    }
}

/// Files could not be copied to deployment host.
#[derive(Debug, thiserror::Error)]
#[error("error copying files via scp to {host:?}")]
pub struct TransferError {
    #[source]
    source: SyscallError,
    host: String,
}

/// Friendly result alias :3
type Result<T, E = TransferError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;
    use std::{cell::RefCell, process::ExitStatus};

    #[derive(Default)]
    struct RecordingShell {
        fail: bool,
        calls: RefCell<Vec<Invocation>>,
    }

    impl Shell for RecordingShell {
        fn interactive(&self, invocation: &Invocation) -> crate::syscall::Result<()> {
            self.calls.borrow_mut().push(invocation.clone());
            if self.fail {
                return Err(SyscallError::Status {
                    command: invocation.to_string(),
                    status: ExitStatus::default(),
                });
            }

            Ok(())
        }

        fn capture(&self, invocation: &Invocation) -> crate::syscall::Result<String> {
            self.interactive(invocation).map(|_| String::new())
        }
    }

    #[test]
    fn copy_builds_scp_command() -> anyhow::Result<()> {
        let shell = RecordingShell::default();
        ArtifactTransfer::new(&shell).copy(
            Path::new("/srv/app/dist/pbc/browser"),
            "203.0.113.5",
            "public.gr",
        )?;

        let expect = Invocation::new("scp").args([
            "-r",
            "/srv/app/dist/pbc/browser",
            "thatguy@203.0.113.5:/var/www/html/public.gr",
        ]);
        assert_eq!(shell.calls.into_inner(), vec![expect]);

        Ok(())
    }

    #[test_case("2001:db8::5", "thatguy@[2001:db8::5]:/var/www/html/public.gr"; "ipv6")]
    #[test_case("::ffff:203.0.113.5", "thatguy@[::ffff:203.0.113.5]:/var/www/html/public.gr"; "ipv4 mapped ipv6")]
    #[test_case("vm42.public.gr", "thatguy@vm42.public.gr:/var/www/html/public.gr"; "host name")]
    #[test]
    fn copy_brackets_ipv6_destination(host: &str, expect: &str) -> anyhow::Result<()> {
        let shell = RecordingShell::default();
        ArtifactTransfer::new(&shell).copy(Path::new("dist"), host, "public.gr")?;

        let destination = shell.calls.borrow()[0].to_string();
        assert!(destination.ends_with(&format!(" {expect}")), "{destination}");

        Ok(())
    }

    #[test]
    fn copy_reports_failed_scp() {
        let shell = RecordingShell {
            fail: true,
            ..Default::default()
        };
        let result = ArtifactTransfer::new(&shell).copy(
            Path::new("dist"),
            "203.0.113.5",
            "public.com.cy",
        );

        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "error copying files via scp to \"203.0.113.5\"");
    }

    #[test]
    fn remote_path_joins_web_root() {
        assert_eq!(
            remote_path("publicbusiness.gr"),
            PathBuf::from("/var/www/html/publicbusiness.gr")
        );
    }
}
