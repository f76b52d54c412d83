// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use fe_build::{
    build::{BuildRequest, Builder},
    config::BuildTable,
    path::{default_build_types_path, default_settings_path},
    prompt::{ask_settings, stdin_prompter},
    resolve::{HostResolver, Strategy},
    store::SettingsStore,
    syscall::{DryRunShell, Shell, SystemShell},
};

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::{ffi::OsString, path::PathBuf, process::exit};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  fe-build [options] <fe-build-command>\n  fe-build [options] <target> <branch> <build_type>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to settings file.
    #[arg(long, global = true, value_name = "path", env = "FE_BUILD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to build-type table.
    #[arg(long, global = true, value_name = "path")]
    pub build_types: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub build: BuildOptions,
}

impl Cli {
    fn run(self) -> Result<()> {
        match (self.command, self.build.request()) {
            (Some(Command::Init(opts)), _) => run_init(self.config, opts),
            (Some(Command::Types), _) => run_types(self.build_types),
            (None, Some(request)) => run_build(
                self.config,
                self.build_types,
                self.build.dry_run,
                self.build.probe,
                request,
            ),
            (None, None) => Ok(Cli::command().print_help()?),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Initialize settings for the build.
    #[command(override_usage = "fe-build init [options]")]
    Init(InitOptions),

    /// Show known build types.
    #[command(override_usage = "fe-build types [options]")]
    Types,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct InitOptions {
    /// SSH password of deployment hosts, prompted for if absent.
    #[arg(short, long, value_name = "password")]
    pub ssh_password: Option<String>,

    /// Path to front-end project, prompted for if absent.
    #[arg(short, long, value_name = "path")]
    pub project_dir: Option<String>,
}

#[derive(Args, Clone, Debug)]
struct BuildOptions {
    /// IP address or short name of deployment host.
    #[arg(value_name = "target", requires_all = ["branch", "build_type"])]
    pub target: Option<String>,

    /// Branch to build.
    #[arg(value_name = "branch")]
    pub branch: Option<String>,

    /// Type of build to deploy.
    #[arg(value_name = "build_type")]
    pub build_type: Option<String>,

    /// Show commands instead of running them.
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Resolve host names by scraping ping output, as older releases did.
    ///
    /// Host names are looked up through the system resolver by default.
    #[arg(long)]
    pub probe: bool,
}

impl BuildOptions {
    fn request(&self) -> Option<BuildRequest> {
        match (&self.target, &self.branch, &self.build_type) {
            (Some(target), Some(branch), Some(build_type)) => {
                Some(BuildRequest::new(target, branch, build_type))
            }
            _ => None,
        }
    }
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse_from(dispatch_args(std::env::args_os())).run()
}

/// Options that take their value as a separate argument.
const VALUE_OPTIONS: [&str; 6] = [
    "--config",
    "--build-types",
    "-s",
    "--ssh-password",
    "-p",
    "--project-dir",
];

/// Route any invocation with exactly three positional arguments to a build.
///
/// Clap would match a leading `init` or `types` as a subcommand, so options
/// are moved to the front and the positionals are placed after `--`. Any
/// other shape is returned untouched.
fn dispatch_args(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    let args: Vec<OsString> = args.into_iter().collect();

    let mut options = Vec::new();
    let mut positionals = Vec::new();
    let mut escaped = false;
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        let text = arg.to_str().unwrap_or_default();
        if escaped {
            positionals.push(arg.clone());
        } else if text == "--" {
            escaped = true;
        } else if VALUE_OPTIONS.contains(&text) {
            options.push(arg.clone());
            options.extend(iter.next().cloned());
        } else if text.len() > 1 && text.starts_with('-') {
            options.push(arg.clone());
        } else {
            positionals.push(arg.clone());
        }
    }

    if positionals.len() != 3 {
        return args;
    }

    let mut dispatched: Vec<OsString> = args.into_iter().take(1).collect();
    dispatched.extend(options);
    dispatched.push("--".into());
    dispatched.extend(positionals);
    dispatched
}

fn settings_store(config: Option<PathBuf>) -> Result<SettingsStore> {
    let path = match config {
        Some(path) => path,
        None => default_settings_path()?,
    };

    Ok(SettingsStore::new(path))
}

fn build_table(build_types: Option<PathBuf>) -> Result<BuildTable> {
    let path = match build_types {
        Some(path) => path,
        None => default_build_types_path()?,
    };

    Ok(BuildTable::load(path)?)
}

fn run_init(config: Option<PathBuf>, opts: InitOptions) -> Result<()> {
    let store = settings_store(config)?;
    let mut prompter = stdin_prompter();
    store.init(|| {
        Ok(ask_settings(
            prompter.as_mut(),
            opts.ssh_password,
            opts.project_dir,
        )?)
    })?;
    info!("configuration file initialized successfully");

    Ok(())
}

fn run_types(build_types: Option<PathBuf>) -> Result<()> {
    print!("{}", build_table(build_types)?);

    Ok(())
}

fn run_build(
    config: Option<PathBuf>,
    build_types: Option<PathBuf>,
    dry_run: bool,
    probe: bool,
    request: BuildRequest,
) -> Result<()> {
    let store = settings_store(config)?;
    let table = build_table(build_types)?;
    let strategy = if probe {
        Strategy::Probe
    } else {
        Strategy::Lookup
    };

    // INVARIANT: Resolution has no side effects, so it runs even on dry runs.
    let resolver = HostResolver::new(SystemShell, strategy);
    if dry_run {
        deploy(DryRunShell, store, table, &resolver, &request)
    } else {
        deploy(SystemShell, store, table, &resolver, &request)
    }
}

fn deploy<S: Shell>(
    shell: S,
    store: SettingsStore,
    table: BuildTable,
    resolver: &HostResolver<SystemShell>,
    request: &BuildRequest,
) -> Result<()> {
    Builder::new(shell, store, table).deploy(resolver, request)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(dispatch_args(args.iter().map(OsString::from)))
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_arguments_means_help() -> Result<()> {
        let cli = Cli::try_parse_from(["fe-build"])?;
        assert!(cli.command.is_none());
        assert_eq!(cli.build.request(), None);

        Ok(())
    }

    #[test]
    fn parse_build_request() -> Result<()> {
        let cli = parse(&["fe-build", "203.0.113.5", "main", "gr"])?;
        assert!(cli.command.is_none());
        assert_eq!(
            cli.build.request(),
            Some(BuildRequest::new("203.0.113.5", "main", "gr"))
        );
        assert!(!cli.build.dry_run);
        assert!(!cli.build.probe);

        Ok(())
    }

    #[test]
    fn parse_build_flags() -> Result<()> {
        let cli = parse(&["fe-build", "--dry-run", "--probe", "vm42", "main", "b2b"])?;
        assert!(cli.build.dry_run);
        assert!(cli.build.probe);

        Ok(())
    }

    #[test]
    fn parse_init() -> Result<()> {
        let cli = Cli::try_parse_from(["fe-build", "init", "--project-dir", "/srv/app"])?;
        match cli.command {
            Some(Command::Init(opts)) => {
                assert_eq!(opts.project_dir.as_deref(), Some("/srv/app"));
                assert_eq!(opts.ssh_password, None);
            }
            other => panic!("expected init, got {other:?}"),
        }

        Ok(())
    }

    #[test]
    fn parse_global_config_after_subcommand() -> Result<()> {
        let cli = Cli::try_parse_from(["fe-build", "init", "--config", "/tmp/fe.conf"])?;
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/fe.conf")));

        Ok(())
    }

    #[test_case(&["fe-build", "vm42"]; "target only")]
    #[test_case(&["fe-build", "vm42", "main"]; "missing build type")]
    #[test_case(&["fe-build", "vm42", "main", "gr", "extra"]; "too many arguments")]
    #[test_case(&["fe-build", "init", "extra"]; "init with argument")]
    #[test]
    fn reject_invalid_shapes(args: &[&str]) {
        assert!(parse(args).is_err());
    }

    #[test]
    fn three_positionals_always_build() -> Result<()> {
        for target in ["init", "types", "help"] {
            let cli = parse(&["fe-build", target, "main", "gr"])?;
            assert!(cli.command.is_none());
            assert_eq!(
                cli.build.request(),
                Some(BuildRequest::new(target, "main", "gr"))
            );
        }

        let cli = parse(&["fe-build", "types", "--dry-run", "main", "--config", "fe.conf", "b2b"])?;
        assert!(cli.command.is_none());
        assert!(cli.build.dry_run);
        assert_eq!(cli.config, Some(PathBuf::from("fe.conf")));
        assert_eq!(
            cli.build.request(),
            Some(BuildRequest::new("types", "main", "b2b"))
        );

        Ok(())
    }

    #[test]
    fn subcommands_keep_their_options() -> Result<()> {
        let cli = parse(&["fe-build", "init", "-p", "/srv/app", "-s", "hunter2"])?;
        match cli.command {
            Some(Command::Init(opts)) => {
                assert_eq!(opts.project_dir.as_deref(), Some("/srv/app"));
                assert_eq!(opts.ssh_password.as_deref(), Some("hunter2"));
            }
            other => panic!("expected init, got {other:?}"),
        }

        let cli = parse(&["fe-build", "--build-types", "types.toml", "types"])?;
        assert!(matches!(cli.command, Some(Command::Types)));
        assert_eq!(cli.build_types, Some(PathBuf::from("types.toml")));

        Ok(())
    }

    #[test]
    fn help_explains_resolution_modes() {
        let help = Cli::command().render_long_help().to_string();
        assert!(help.contains("scraping ping output"));
        assert!(help.contains("system resolver by default"));
    }
}
