//! User command execution

use super::{PostProcessContext, PostProcessStep};
use crate::error::{PostProcessError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, warn};

/// Placeholders and the environment variables carrying their values
const PLACEHOLDERS: &[(&str, &str)] = &[
    ("{{episode_path}}", "EPISODE_PATH"),
    ("{{episode_path_base}}", "EPISODE_PATH_BASE"),
    ("{{episode_filename}}", "EPISODE_FILENAME"),
    ("{{episode_filename_base}}", "EPISODE_FILENAME_BASE"),
    ("{{url}}", "EPISODE_URL"),
];

/// Runs a user-supplied command template after each committed episode
///
/// Recognized placeholders:
///
/// | Token | Variable | Value |
/// |-------|----------|-------|
/// | `{{episode_path}}` | `EPISODE_PATH` | absolute path of the committed file |
/// | `{{episode_path_base}}` | `EPISODE_PATH_BASE` | directory containing it |
/// | `{{episode_filename}}` | `EPISODE_FILENAME` | path relative to the base directory |
/// | `{{episode_filename_base}}` | `EPISODE_FILENAME_BASE` | that relative path without its extension |
/// | `{{url}}` | `EPISODE_URL` | source URL |
///
/// Values come from the feed, so they are never spliced into the command
/// line. Each is exported as an environment variable of the child and the
/// placeholder becomes a quoted reference to it (`"$EPISODE_PATH"`, or
/// `"%EPISODE_PATH%"` on Windows).
pub struct ExecStep {
    template: Option<String>,
    timeout: Option<Duration>,
}

impl ExecStep {
    /// Create an exec step; `None` makes the step inapplicable
    pub fn new(template: Option<String>, timeout: Option<Duration>) -> Self {
        Self { template, timeout }
    }

    /// Replace every placeholder of `template` with a reference to its variable
    pub fn expand(template: &str) -> String {
        PLACEHOLDERS
            .iter()
            .fold(template.to_string(), |command, (token, var)| {
                command.replace(token, &var_reference(var))
            })
    }

    /// Environment handed to the command for this episode
    pub fn env(ctx: &PostProcessContext<'_>) -> Vec<(&'static str, String)> {
        let path_base = ctx.output_path.parent().unwrap_or_else(|| Path::new(""));
        let filename_base = ctx.relative_path.with_extension("");

        vec![
            ("EPISODE_PATH", ctx.output_path.display().to_string()),
            ("EPISODE_PATH_BASE", path_base.display().to_string()),
            ("EPISODE_FILENAME", ctx.relative_path.display().to_string()),
            ("EPISODE_FILENAME_BASE", filename_base.display().to_string()),
            ("EPISODE_URL", ctx.url.to_string()),
        ]
    }
}

fn var_reference(var: &str) -> String {
    if cfg!(windows) {
        format!("\"%{var}%\"")
    } else {
        format!("\"${var}\"")
    }
}

fn shell_command(command_line: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command_line);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command_line);
        cmd
    }
}

#[async_trait]
impl PostProcessStep for ExecStep {
    fn name(&self) -> &'static str {
        "exec"
    }

    fn applies(&self, _ctx: &PostProcessContext<'_>) -> bool {
        self.template.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    async fn run(&self, ctx: &PostProcessContext<'_>) -> Result<()> {
        let Some(template) = &self.template else {
            return Ok(());
        };
        let command = Self::expand(template);
        info!(command = %command, path = %ctx.output_path.display(), "Running exec...");

        let mut cmd = shell_command(&command);
        cmd.envs(Self::env(ctx))
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true);

        let status = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, cmd.status()).await {
                Ok(status) => status,
                Err(_) => {
                    warn!(command = %command, timeout = ?timeout, "exec command timed out");
                    return Err(PostProcessError::CommandTimedOut { command }.into());
                }
            },
            None => cmd.status().await,
        }
        .map_err(|e| crate::Error::ExternalTool(format!("Failed to run exec command: {}", e)))?;

        if !status.success() {
            warn!(command = %command, code = ?status.code(), "exec command failed");
            return Err(PostProcessError::CommandFailed {
                command,
                exit_code: status.code(),
            }
            .into());
        }

        Ok(())
    }
}
