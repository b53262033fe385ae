use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;

pub mod local;
pub mod selector;
pub mod ssh;

#[cfg(test)]
pub mod recording;

use crate::utils::shell::{quote, quote_path};

/// A shell command line plus the context it runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub command: String,
    pub cwd: Option<PathBuf>,
    pub as_user: Option<String>,
    /// Keep stdout off the terminal (it may hold credentials).
    pub quiet: bool,
}

impl ShellCommand {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            cwd: None,
            as_user: None,
            quiet: false,
        }
    }

    pub fn in_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    pub fn as_user(mut self, user: Option<&str>) -> Self {
        self.as_user = user.map(str::to_string);
        self
    }

    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// Full line handed to the shell: `cd` prefix, then the optional sudo wrapper.
    pub fn render(&self) -> String {
        let line = match &self.cwd {
            Some(dir) => format!("cd {} && {}", quote_path(dir), self.command),
            None => self.command.clone(),
        };
        match &self.as_user {
            Some(user) => format!("sudo -H -u {} sh -c {}", quote(user), quote(&line)),
            None => line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    pub succeeded: bool,
    pub code: Option<i32>,
    pub output: String,
    pub stderr: String,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("[{host}] failed to start `{command}`: {source}")]
    Spawn {
        host: String,
        command: String,
        source: std::io::Error,
    },

    #[error("[{host}] `{command}` exited with status {}{}", status_text(.code), detail(.stderr))]
    NonZeroExit {
        host: String,
        command: String,
        code: Option<i32>,
        output: String,
        stderr: String,
    },

    #[error("[{host}] failed to download '{remote}' to '{local}': {reason}")]
    Transfer {
        host: String,
        remote: String,
        local: PathBuf,
        reason: String,
    },
}

fn status_text(code: &Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn detail(stderr: &str) -> String {
    let last = stderr.lines().rev().find(|l| !l.trim().is_empty());
    match last {
        Some(line) => format!(": {}", line.trim()),
        None => String::new(),
    }
}

pub trait Executor: Send + Sync {
    /// Host label used in output and errors.
    fn host(&self) -> &str;

    /// Run a command. A non-zero exit is reported through `CommandOutput::succeeded`;
    /// `Err` means the command could not be started at all.
    fn execute(&self, cmd: &ShellCommand) -> Result<CommandOutput, CommandError>;

    /// Download a file from this host to a local path.
    fn fetch(&self, remote: &str, local: &Path) -> Result<(), CommandError>;

    /// Run a command that must succeed.
    fn run(&self, cmd: &ShellCommand) -> Result<CommandOutput, CommandError> {
        let out = self.execute(cmd)?;
        if out.succeeded {
            Ok(out)
        } else {
            Err(CommandError::NonZeroExit {
                host: self.host().to_string(),
                command: cmd.command.clone(),
                code: out.code,
                output: out.output,
                stderr: out.stderr,
            })
        }
    }
}

/// Whether a spinner may be drawn while `cmd` runs. Transports that can ask for
/// a password on the tty (ssh, sudo) must not be drawn over.
pub(crate) fn shows_spinner(may_prompt: bool, cmd: &ShellCommand) -> bool {
    !may_prompt && cmd.as_user.is_none()
}

/// Spawn `process`, optionally show a spinner while it runs and echo its captured output.
pub(crate) fn capture(
    host: &str,
    cmd: &ShellCommand,
    mut process: Command,
    may_prompt: bool,
) -> Result<CommandOutput, CommandError> {
    println!("{} {} {}", format!("[{}]", host).bold(), "run:".cyan(), cmd.command);
    tracing::debug!(host, rendered = %cmd.render(), "executing");

    let bar = if shows_spinner(may_prompt, cmd) {
        create_spinner(&cmd.command)
    } else {
        ProgressBar::hidden()
    };
    let result = process
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output();
    bar.finish_and_clear();

    let output = result.map_err(|source| CommandError::Spawn {
        host: host.to_string(),
        command: cmd.command.clone(),
        source,
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let echoed = if cmd.quiet { "" } else { stdout.as_str() };
    for line in echoed.lines().chain(stderr.lines()) {
        println!("{} {} {}", format!("[{}]", host).bold(), "out:".dimmed(), line);
    }
    tracing::debug!(host, code = ?output.status.code(), "finished");

    Ok(CommandOutput {
        succeeded: output.status.success(),
        code: output.status.code(),
        output: stdout,
        stderr,
    })
}

fn create_spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style.tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "));
    }
    bar.set_message(message.to_string());
    bar.enable_steady_tick(std::time::Duration::from_millis(80));
    bar
}

#[cfg(test)]
mod tests {
    use super::*;
    use recording::RecordingExecutor;

    #[test]
    fn test_render_plain_command() {
        let cmd = ShellCommand::new("git pull");
        assert_eq!(cmd.render(), "git pull");
    }

    #[test]
    fn test_render_with_cwd() {
        let cmd = ShellCommand::new("./manage.py migrate").in_dir(Path::new("/srv/shop/live/src/shop"));
        assert_eq!(cmd.render(), "cd /srv/shop/live/src/shop && ./manage.py migrate");
    }

    #[test]
    fn test_render_quotes_cwd_with_spaces() {
        let cmd = ShellCommand::new("ls").in_dir(Path::new("/srv/my shop"));
        assert_eq!(cmd.render(), "cd '/srv/my shop' && ls");
    }

    #[test]
    fn test_render_as_user_wraps_in_sudo() {
        let cmd = ShellCommand::new("touch app.wsgi")
            .in_dir(Path::new("/srv/src"))
            .as_user(Some("www-data"));
        assert_eq!(
            cmd.render(),
            "sudo -H -u www-data sh -c 'cd /srv/src && touch app.wsgi'"
        );
    }

    #[test]
    fn test_quiet_does_not_change_rendering() {
        let cmd = ShellCommand::new("python -c 'print(1)'").quiet();
        assert!(cmd.quiet);
        assert_eq!(cmd.render(), "python -c 'print(1)'");
        assert!(!ShellCommand::new("ls").quiet);
    }

    #[test]
    fn test_spinner_hidden_when_a_password_prompt_is_possible() {
        let plain = ShellCommand::new("git pull");
        let sudo = ShellCommand::new("git pull").as_user(Some("www-data"));
        assert!(shows_spinner(false, &plain));
        assert!(!shows_spinner(true, &plain));
        assert!(!shows_spinner(false, &sudo));
    }

    #[test]
    fn test_execute_tolerates_failure_but_run_does_not() {
        let exec = RecordingExecutor::new("web1");
        exec.respond("false", false, "");

        let out = exec.execute(&ShellCommand::new("false")).unwrap();
        assert!(!out.succeeded);

        let err = exec.run(&ShellCommand::new("false")).unwrap_err();
        assert!(matches!(err, CommandError::NonZeroExit { .. }));
        assert_eq!(err.to_string(), "[web1] `false` exited with status 1");
    }

    #[test]
    fn test_non_zero_exit_message_includes_last_stderr_line() {
        let err = CommandError::NonZeroExit {
            host: "web1".into(),
            command: "git pull".into(),
            code: Some(128),
            output: String::new(),
            stderr: "fatal: not a git repository\n\n".into(),
        };
        assert_eq!(
            err.to_string(),
            "[web1] `git pull` exited with status 128: fatal: not a git repository"
        );
    }
}
