//! Shared key generation for backends.
//!
//! Key format: `{prefix}/{path}`, or just `{path}` when the prefix is empty. Keys never
//! start with `/`, always use `/` separators and never contain `.` or `..` segments,
//! so a key cannot leave its prefix.

/// Generate the storage key for an artifact path under a prefix.
pub fn object_key(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let path = path.replace('\\', "/");
    let path = path
        .split('/')
        .filter(|segment| !matches!(*segment, "" | "." | ".."))
        .collect::<Vec<_>>()
        .join("/");

    if prefix.is_empty() {
        path
    } else {
        format!("{}/{}", prefix, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_prefix_and_path() {
        assert_eq!(object_key("prefix", "log/a.log"), "prefix/log/a.log");
        assert_eq!(object_key("prefix/", "/log/a.log"), "prefix/log/a.log");
    }

    #[test]
    fn empty_prefix_uses_path_only() {
        assert_eq!(object_key("", "a.log"), "a.log");
        assert_eq!(object_key("/", "a.log"), "a.log");
    }

    #[test]
    fn normalizes_windows_separators() {
        assert_eq!(object_key("job", "log\\a.log"), "job/log/a.log");
    }

    #[test]
    fn relative_segments_cannot_escape_the_prefix() {
        assert_eq!(object_key("job", "../dist/app.zip"), "job/dist/app.zip");
        assert_eq!(object_key("job", "../../etc/./passwd"), "job/etc/passwd");
        assert_eq!(object_key("job", "log//a.log"), "job/log/a.log");
    }
}
