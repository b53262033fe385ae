use std::path::Path;
use std::process::{Command, Stdio};

use super::{CommandError, CommandOutput, Executor, ShellCommand, capture};

/// Runs commands on a remote host through the system `ssh` client.
pub struct SshExecutor {
    host: String,
    destination: String,
    port: Option<u16>,
}

impl SshExecutor {
    /// `host` is `[user@]hostname[:port]`.
    pub fn new(host: &str) -> Self {
        let (destination, port) = split_port(host);
        Self {
            host: host.to_string(),
            destination: destination.to_string(),
            port,
        }
    }
}

fn split_port(host: &str) -> (&str, Option<u16>) {
    match host.rsplit_once(':') {
        Some((dest, port)) => match port.parse::<u16>() {
            Ok(p) => (dest, Some(p)),
            Err(_) => (host, None),
        },
        None => (host, None),
    }
}

impl Executor for SshExecutor {
    fn host(&self) -> &str {
        &self.host
    }

    fn execute(&self, cmd: &ShellCommand) -> Result<CommandOutput, CommandError> {
        let mut process = Command::new("ssh");
        if let Some(port) = self.port {
            process.arg("-p").arg(port.to_string());
        }
        process.arg(&self.destination).arg(cmd.render());
        capture(&self.host, cmd, process, true)
    }

    fn fetch(&self, remote: &str, local: &Path) -> Result<(), CommandError> {
        let mut process = Command::new("scp");
        if let Some(port) = self.port {
            process.arg("-P").arg(port.to_string());
        }
        process
            .arg(format!("{}:{}", self.destination, remote))
            .arg(local)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped());

        tracing::debug!(host = %self.host, remote, local = %local.display(), "downloading");
        let output = process.output().map_err(|e| CommandError::Transfer {
            host: self.host.clone(),
            remote: remote.to_string(),
            local: local.to_path_buf(),
            reason: e.to_string(),
        })?;
        if !output.status.success() {
            return Err(CommandError::Transfer {
                host: self.host.clone(),
                remote: remote.to_string(),
                local: local.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}
