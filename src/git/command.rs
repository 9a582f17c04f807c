use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, Context as _, Result};

/// A `git` invocation, optionally rooted in a working tree.
#[derive(Debug)]
pub struct GitCommand {
    command: Command,
}

impl GitCommand {
    pub fn new<I, S>(args: I) -> Result<GitCommand>
    where
        I: IntoIterator<Item = S> + Copy,
        S: AsRef<OsStr>,
    {
        GitCommand::internal(None, args)
    }

    pub fn for_repo<I, S>(repo_path: &Path, args: I) -> Result<GitCommand>
    where
        I: IntoIterator<Item = S> + Copy,
        S: AsRef<OsStr>,
    {
        GitCommand::internal(Some(repo_path), args)
    }

    fn internal<I, S>(repo_path: Option<&Path>, args: I) -> Result<GitCommand>
    where
        I: IntoIterator<Item = S> + Copy,
        S: AsRef<OsStr>,
    {
        let git_path = which::which("git").context("can't find git command")?;

        let shown: Vec<String> = args
            .into_iter()
            .map(|a| a.as_ref().to_string_lossy().into_owned())
            .collect();
        log::debug!(
            "GIT_COMMAND repo={} args={:?}",
            repo_path.map(|p| p.display().to_string()).unwrap_or_default(),
            shown
        );

        let mut command = Command::new(&git_path);
        command.args(args);
        if let Some(repo_path) = repo_path {
            command.current_dir(repo_path);
        }
        // Never block on a credential prompt
        command.env("GIT_TERMINAL_PROMPT", "0");

        Ok(GitCommand { command })
    }

    /// Run to completion, returning stdout decoded lossily.
    pub fn output(&mut self) -> Result<String> {
        let output = self.command.output()?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.trim().is_empty() {
            Err(anyhow!("git failed [{}]", output.status))
        } else {
            Err(anyhow!("(from git) {} [{}]", stderr.trim(), output.status))
        }
    }
}
