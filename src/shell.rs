//! Shell command text and subprocess launch

use crate::config::schema::ShellConfig;
use crate::error::{MemoizeError, MemoizeResult};
use std::path::Path;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::debug;

/// Ordered command words as given on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    words: Vec<String>,
}

impl CommandLine {
    /// Build from command words; `None` if there are none
    pub fn new<I, S>(words: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let words: Vec<String> = words.into_iter().map(Into::into).collect();
        (!words.is_empty()).then_some(Self { words })
    }

    /// The words themselves
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Shell text: every word followed by a single space.
    ///
    /// This is both the hash input and what the shell runs, and it matches
    /// the keys of entries written by earlier releases. Words are not
    /// quoted, so pipes and globs inside a word reach the shell intact.
    pub fn text(&self) -> String {
        let mut text = String::with_capacity(self.words.iter().map(|w| w.len() + 1).sum());
        for word in &self.words {
            text.push_str(word);
            text.push(' ');
        }
        text
    }
}

/// Runs command text through a shell
#[derive(Debug, Clone)]
pub struct ShellLauncher {
    program: String,
    flag: String,
}

impl ShellLauncher {
    /// Create a launcher from config
    pub fn new(config: &ShellConfig) -> Self {
        Self {
            program: config.program.clone(),
            flag: config.flag.clone(),
        }
    }

    /// Spawn `text` with stdout piped. Stdin, stderr and the environment
    /// are inherited; `cwd` is applied unless it is empty.
    pub fn spawn(&self, text: &str, cwd: &Path) -> MemoizeResult<Child> {
        debug!("Executing: {} {} {:?}", self.program, self.flag, text);

        let mut command = Command::new(&self.program);
        command
            .arg(&self.flag)
            .arg(text)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        if !cwd.as_os_str().is_empty() {
            command.current_dir(cwd);
        }

        command.spawn().map_err(|e| MemoizeError::spawn(text, e))
    }
}

impl Default for ShellLauncher {
    fn default() -> Self {
        Self::new(&ShellConfig::default())
    }
}
