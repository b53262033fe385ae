use std::borrow::Cow;
use std::path::Path;

pub fn quote(s: &str) -> Cow<'_, str> {
    shell_words::quote(s)
}

pub fn quote_path(path: &Path) -> String {
    shell_words::quote(&path.to_string_lossy()).into_owned()
}

/// Host name usable by `rdiff-backup`, which cannot take a port: everything from the
/// first `:` is dropped, so the port has to come from `~/.ssh/config`.
pub fn transfer_host(host: &str) -> &str {
    match host.split_once(':') {
        Some((name, _)) => name,
        None => host,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_host_strips_port() {
        assert_eq!(transfer_host("example.com:2222"), "example.com");
        assert_eq!(transfer_host("deploy@example.com:22"), "deploy@example.com");
    }

    #[test]
    fn test_transfer_host_without_port_is_unchanged() {
        assert_eq!(transfer_host("example.com"), "example.com");
    }

    #[test]
    fn test_quote_path_leaves_plain_paths_alone() {
        assert_eq!(quote_path(Path::new("/srv/shop/live")), "/srv/shop/live");
        assert_eq!(quote_path(Path::new("/srv/my shop")), "'/srv/my shop'");
    }
}
