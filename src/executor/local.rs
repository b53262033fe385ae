use std::fs;
use std::path::Path;
use std::process::Command;

use super::{CommandError, CommandOutput, Executor, ShellCommand, capture};

/// Runs commands on this machine through `sh -c`.
pub struct LocalExecutor;

impl Executor for LocalExecutor {
    fn host(&self) -> &str {
        "localhost"
    }

    fn execute(&self, cmd: &ShellCommand) -> Result<CommandOutput, CommandError> {
        let mut process = Command::new("sh");
        process.arg("-c").arg(cmd.render());
        capture(self.host(), cmd, process, false)
    }

    fn fetch(&self, remote: &str, local: &Path) -> Result<(), CommandError> {
        fs::copy(remote, local)
            .map(|_| ())
            .map_err(|e| CommandError::Transfer {
                host: self.host().to_string(),
                remote: remote.to_string(),
                local: local.to_path_buf(),
                reason: e.to_string(),
            })
    }
}
