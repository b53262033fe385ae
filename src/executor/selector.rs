use super::{Executor, local::LocalExecutor, ssh::SshExecutor};
use std::sync::Arc;

pub fn select_executor_for_host(host: &str) -> Arc<dyn Executor> {
    if host == "local" || host == "localhost" {
        Arc::new(LocalExecutor)
    } else {
        Arc::new(SshExecutor::new(host))
    }
}

pub fn local_executor() -> Arc<dyn Executor> {
    Arc::new(LocalExecutor)
}
