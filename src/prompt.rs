// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Prompting for settings.
//!
//! `fe-build init` needs an SSH password and a project directory. Values
//! given on the command line are taken as-is, and the rest are asked for
//! through a [`Prompter`]. A terminal gets proper [`inquire`] prompts, while
//! piped input is read one line per value.

use crate::store::Settings;

use inquire::{InquireError, Password, Text};
use std::io::{self, BufRead, IsTerminal, Write};

pub const SSH_PASSWORD_PROMPT: &str = "Enter SSH password:";
pub const PROJECT_DIR_PROMPT: &str = "Enter project directory:";

/// Source of interactive answers.
pub trait Prompter {
    /// Ask for a secret value without echoing it.
    fn password(&mut self, message: &str) -> Result<String>;

    /// Ask for a plain text value.
    fn text(&mut self, message: &str) -> Result<String>;
}

/// Prompter backed by [`inquire`] for use on a terminal.
#[derive(Debug, Default, Clone)]
pub struct InquirePrompter;

impl Prompter for InquirePrompter {
    fn password(&mut self, message: &str) -> Result<String> {
        let answer = Password::new(message).without_confirmation().prompt()?;
        Ok(answer.trim().to_string())
    }

    fn text(&mut self, message: &str) -> Result<String> {
        let answer = Text::new(message).prompt()?;
        Ok(answer.trim().to_string())
    }
}

/// Prompter that prints each message on its own line and reads one line back.
#[derive(Debug)]
pub struct LinePrompter<R, W> {
    reader: R,
    writer: W,
}

impl<R, W> LinePrompter<R, W>
where
    R: BufRead,
    W: Write,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    fn ask(&mut self, message: &str) -> Result<String> {
        writeln!(self.writer, "{message}")?;
        self.writer.flush()?;

        // INVARIANT: End of input yields an empty answer.
        let mut line = String::new();
        self.reader.read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}

impl<R, W> Prompter for LinePrompter<R, W>
where
    R: BufRead,
    W: Write,
{
    fn password(&mut self, message: &str) -> Result<String> {
        self.ask(message)
    }

    fn text(&mut self, message: &str) -> Result<String> {
        self.ask(message)
    }
}

/// Pick prompter suited to current standard input.
pub fn stdin_prompter() -> Box<dyn Prompter> {
    if io::stdin().is_terminal() {
        Box::new(InquirePrompter)
    } else {
        Box::new(LinePrompter::new(io::stdin().lock(), io::stdout()))
    }
}

/// Build settings from given values, prompting for whatever is missing.
///
/// The password is asked for before the project directory.
///
/// # Errors
///
/// - Return [`PromptError`] if a prompt cannot be answered.
pub fn ask_settings(
    prompter: &mut dyn Prompter,
    ssh_password: Option<String>,
    project_dir: Option<String>,
) -> Result<Settings> {
    let ssh_password = match ssh_password {
        Some(password) => password,
        None => prompter.password(SSH_PASSWORD_PROMPT)?,
    };
    let project_dir = match project_dir {
        Some(dir) => dir,
        None => prompter.text(PROJECT_DIR_PROMPT)?,
    };

    Ok(Settings::new(ssh_password, project_dir))
}

/// Prompting error types.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    /// Terminal prompt failed or was cancelled.
    #[error(transparent)]
    Inquire(#[from] InquireError),

    /// Plain line prompt failed.
    #[error("failed to prompt for input")]
    Io(#[from] io::Error),
}

/// Friendly result alias :3
type Result<T, E = PromptError> = std::result::Result<T, E>;
