// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Deployment host resolution.
//!
//! Users name deployment hosts either by a literal IP address, or by the short
//! name of a VM. Short names live under the `public.gr` domain, so `vm42`
//! means `vm42.public.gr`.
//!
//! # Resolution Strategies
//!
//! Literal addresses are always used unchanged. Short names are resolved by
//! one of two strategies:
//!
//! - [`Strategy::Lookup`] asks the system resolver for the address of the
//!   fully qualified name.
//! - [`Strategy::Probe`] pings the fully qualified name once and scrapes the
//!   second token of the second output line.
//!
//! # Pitfalls
//!
//! The probe strategy depends on the exact text ping prints, which differs
//! between platforms and locales. The scraped token is not checked to be an
//! address at all.

use crate::syscall::{Invocation, Shell, SyscallError};

use std::{
    io,
    net::{IpAddr, ToSocketAddrs},
};
use tracing::{info, instrument};

/// Domain appended to short host names.
pub const HOST_SUFFIX: &str = ".public.gr";

/// How short host names turn into addresses.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Ask the system resolver.
    #[default]
    Lookup,

    /// Scrape output of a single ping.
    Probe,
}

/// Function that maps a host name to its addresses.
pub type LookupFn = fn(&str) -> io::Result<Vec<IpAddr>>;

/// Resolver of deployment hosts.
#[derive(Debug)]
pub struct HostResolver<S>
where
    S: Shell,
{
    shell: S,
    strategy: Strategy,
    lookup: LookupFn,
}

impl<S> HostResolver<S>
where
    S: Shell,
{
    /// Construct new resolver using the system resolver for lookups.
    pub fn new(shell: S, strategy: Strategy) -> Self {
        Self {
            shell,
            strategy,
            lookup: system_lookup,
        }
    }

    /// Replace function used by [`Strategy::Lookup`].
    pub fn with_lookup(mut self, lookup: LookupFn) -> Self {
        self.lookup = lookup;
        self
    }

    /// Resolve user supplied target into an address.
    ///
    /// A literal IPv4 or IPv6 address is returned unchanged without running
    /// anything. Anything else gets [`HOST_SUFFIX`] appended and is resolved
    /// by the configured [`Strategy`].
    ///
    /// # Errors
    ///
    /// - Return [`ResolveError::Lookup`] if system resolution fails.
    /// - Return [`ResolveError::Probe`] if ping cannot be run or fails.
    /// - Return [`ResolveError::UnexpectedOutput`] if ping output cannot be
    ///   scraped.
    #[instrument(skip(self), level = "debug")]
    pub fn resolve(&self, target: &str) -> Result<String> {
        if target.parse::<IpAddr>().is_ok() {
            info!("using provided IP address: {target}");
            return Ok(target.to_string());
        }

        let host = format!("{target}{HOST_SUFFIX}");
        let address = match self.strategy {
            Strategy::Lookup => self.lookup_address(&host)?,
            Strategy::Probe => self.probe_address(&host)?,
        };
        info!("IP address of {target}: {address}");

        Ok(address)
    }

    fn lookup_address(&self, host: &str) -> Result<String> {
        let addresses = (self.lookup)(host).map_err(|err| ResolveError::Lookup {
            source: err,
            host: host.to_string(),
        })?;

        // INVARIANT: Prefer IPv4, because that is what the web hosts listen on.
        addresses
            .iter()
            .find(|address| address.is_ipv4())
            .or_else(|| addresses.first())
            .map(ToString::to_string)
            .ok_or_else(|| ResolveError::Lookup {
                source: io::Error::new(io::ErrorKind::NotFound, "no address found"),
                host: host.to_string(),
            })
    }

    fn probe_address(&self, host: &str) -> Result<String> {
        let invocation = Invocation::new("ping").args(["-c", "1", host]);
        let output = self
            .shell
            .capture(&invocation)
            .map_err(|err| ResolveError::Probe {
                source: err,
                host: host.to_string(),
            })?;

        parse_probe_output(&output)
    }
}

/// Scrape address out of ping output.
///
/// Takes the second line, splits it on single spaces, and returns the second
/// token stripped of surrounding parentheses.
///
/// # Errors
///
/// - Return [`ResolveError::UnexpectedOutput`] if the output has fewer than
///   two lines, or the second line has fewer than two tokens.
pub fn parse_probe_output(output: &str) -> Result<String> {
    let line = output
        .split('\n')
        .nth(1)
        .ok_or_else(|| ResolveError::UnexpectedOutput(output.to_string()))?;
    let token = line
        .split(' ')
        .nth(1)
        .ok_or_else(|| ResolveError::UnexpectedOutput(output.to_string()))?;

    Ok(token.trim_matches(['(', ')']).to_string())
}

/// Resolve host name through the system resolver.
pub fn system_lookup(host: &str) -> io::Result<Vec<IpAddr>> {
    Ok((host, 0)
        .to_socket_addrs()?
        .map(|address| address.ip())
        .collect())
}

/// Host resolution error types.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// System resolver could not resolve host.
    #[error("unable to determine IP address of {host:?}")]
    Lookup {
        #[source]
        source: io::Error,
        host: String,
    },

    /// Ping could not be run, or did not reach host.
    #[error("unable to ping {host:?}")]
    Probe {
        #[source]
        source: SyscallError,
        host: String,
    },

    /// Ping output does not have the expected shape.
    #[error("unable to determine IP address from ping output {0:?}")]
    UnexpectedOutput(String),
}

/// Friendly result alias :3
type Result<T, E = ResolveError> = std::result::Result<T, E>;
