/// Joins a child entry name onto its parent remote directory.
///
/// Listing APIs disagree about separators: cPanel reports directories with a
/// trailing slash in some panel versions, and the SFTP walk may be rooted at
/// `.` (the login directory), where a `./` prefix would confuse the server
/// less than it confuses the logs. Trimming the parent's trailing slash keeps
/// `/` + `name` from producing `//name`.
pub fn child_remote_path(parent: &str, name: &str) -> String {
    if parent.is_empty() || parent == "." {
        return name.to_string();
    }
    format!("{}/{}", parent.trim_end_matches('/'), name)
}

/// Directory name for one invocation under the backup root: the requested
/// remote path with separators flattened to underscores.
pub fn invocation_dir_name(remote: &str) -> String {
    let flattened = remote.replace('/', "_");
    let trimmed = flattened.trim_matches('_');
    if trimmed.is_empty() {
        "root".to_string()
    } else {
        trimmed.to_string()
    }
}
