use std::path::{Path, PathBuf};

/// Where a downloaded database dump is stored locally.
pub fn local_download_path(remote_artifact: &str) -> PathBuf {
    local_download_path_in(&std::env::temp_dir(), remote_artifact)
}

pub fn local_download_path_in(dir: &Path, remote_artifact: &str) -> PathBuf {
    let name = remote_artifact
        .rsplit('/')
        .find(|part| !part.is_empty())
        .unwrap_or(remote_artifact);
    dir.join(name)
}
