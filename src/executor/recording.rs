//! In-memory executor used by the workflow tests.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{CommandError, CommandOutput, Executor, ShellCommand};

struct Response {
    pattern: String,
    succeeded: bool,
    output: String,
}

/// Records every command and answers with canned responses.
///
/// Commands that match no response succeed with empty output.
pub struct RecordingExecutor {
    host: String,
    responses: Mutex<Vec<Response>>,
    commands: Mutex<Vec<ShellCommand>>,
    fetched: Mutex<Vec<(String, PathBuf)>>,
}

impl RecordingExecutor {
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            responses: Mutex::new(Vec::new()),
            commands: Mutex::new(Vec::new()),
            fetched: Mutex::new(Vec::new()),
        }
    }

    /// Answer commands containing `pattern`. Later registrations win.
    pub fn respond(&self, pattern: &str, succeeded: bool, output: &str) {
        self.responses.lock().unwrap().push(Response {
            pattern: pattern.to_string(),
            succeeded,
            output: output.to_string(),
        });
    }

    pub fn commands(&self) -> Vec<ShellCommand> {
        self.commands.lock().unwrap().clone()
    }

    /// The bare command lines, in execution order.
    pub fn lines(&self) -> Vec<String> {
        self.commands().into_iter().map(|c| c.command).collect()
    }

    pub fn fetched(&self) -> Vec<(String, PathBuf)> {
        self.fetched.lock().unwrap().clone()
    }
}

impl Executor for RecordingExecutor {
    fn host(&self) -> &str {
        &self.host
    }

    fn execute(&self, cmd: &ShellCommand) -> Result<CommandOutput, CommandError> {
        self.commands.lock().unwrap().push(cmd.clone());
        let responses = self.responses.lock().unwrap();
        let matched = responses
            .iter()
            .rev()
            .find(|r| cmd.command.contains(&r.pattern));
        Ok(match matched {
            Some(r) => CommandOutput {
                succeeded: r.succeeded,
                code: Some(if r.succeeded { 0 } else { 1 }),
                output: r.output.clone(),
                stderr: String::new(),
            },
            None => CommandOutput {
                succeeded: true,
                code: Some(0),
                ..CommandOutput::default()
            },
        })
    }

    fn fetch(&self, remote: &str, local: &Path) -> Result<(), CommandError> {
        self.fetched
            .lock()
            .unwrap()
            .push((remote.to_string(), local.to_path_buf()));
        Ok(())
    }
}
