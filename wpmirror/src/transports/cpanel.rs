use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use wpmirror_core::CpanelClient;

use crate::mirror::{EntryKind, RemoteEntry, Transport};

/// Walker adapter over the cPanel Fileman API. The client returns listing
/// rows as raw JSON because panel versions disagree about field names; all of
/// that duck typing is confined to [`normalize_row`].
pub struct CpanelTransport {
    client: CpanelClient,
}

impl CpanelTransport {
    pub fn new(client: CpanelClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for CpanelTransport {
    async fn list(&mut self, path: &str) -> anyhow::Result<Vec<RemoteEntry>> {
        let rows = self.client.list_files(path).await?;
        Ok(rows.iter().filter_map(normalize_row).collect())
    }

    async fn fetch(&mut self, remote_path: &str, local_path: &Path) -> anyhow::Result<()> {
        self.client.download_to_path(remote_path, local_path).await?;
        Ok(())
    }
}

/// Collapses one duck-typed listing row into a canonical [`RemoteEntry`].
///
/// Name comes from `file`, `name` or `filename` (first non-empty wins); rows
/// without any of those are dropped. The directory signal is either a string
/// `type` field or a truthy `is_dir` flag. When both are present and
/// disagree, the explicit `type` field wins and the conflict is reported
/// rather than silently resolved.
pub fn normalize_row(row: &Value) -> Option<RemoteEntry> {
    let name = string_field(row, &["file", "name", "filename"])?;
    let type_says_dir = row
        .get("type")
        .and_then(Value::as_str)
        .map(|value| value == "dir");
    let flag_says_dir = row.get("is_dir").map(is_truthy);
    let is_dir = match (type_says_dir, flag_says_dir) {
        (Some(from_type), Some(from_flag)) if from_type != from_flag => {
            eprintln!(
                "[wpmirror] entry {name} has conflicting type signals (type vs is_dir); trusting type"
            );
            from_type
        }
        (Some(from_type), _) => from_type,
        (None, Some(from_flag)) => from_flag,
        (None, None) => false,
    };
    let size = row
        .get("size")
        .and_then(|value| value.as_u64().or_else(|| value.as_str()?.parse().ok()));
    Some(RemoteEntry {
        name,
        kind: if is_dir {
            EntryKind::Directory
        } else {
            EntryKind::File
        },
        full_path: string_field(row, &["fullpath", "path"]),
        size,
    })
}

/// Human-readable size for the listing preview, if the panel supplied one.
pub fn human_size(row: &Value) -> Option<String> {
    string_field(row, &["humansize"])
}

fn string_field(row: &Value, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| row.get(*name).and_then(Value::as_str))
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty() && text != "0",
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn name_probing_prefers_file_over_name_over_filename() {
        let entry = normalize_row(&json!({ "file": "a", "name": "b", "filename": "c" })).unwrap();
        assert_eq!(entry.name, "a");

        let entry = normalize_row(&json!({ "name": "b", "filename": "c" })).unwrap();
        assert_eq!(entry.name, "b");

        let entry = normalize_row(&json!({ "file": "", "filename": "c" })).unwrap();
        assert_eq!(entry.name, "c");
    }

    #[test]
    fn nameless_rows_are_dropped() {
        assert!(normalize_row(&json!({ "type": "dir", "size": 4096 })).is_none());
        assert!(normalize_row(&json!("not an object")).is_none());
    }

    #[test]
    fn type_field_marks_directories() {
        let entry = normalize_row(&json!({ "file": "wp-content", "type": "dir" })).unwrap();
        assert_eq!(entry.kind, EntryKind::Directory);

        let entry = normalize_row(&json!({ "file": "index.php", "type": "file" })).unwrap();
        assert_eq!(entry.kind, EntryKind::File);
    }

    #[test]
    fn truthy_is_dir_variants_mark_directories() {
        for flag in [json!(true), json!(1), json!("1")] {
            let entry = normalize_row(&json!({ "file": "d", "is_dir": flag })).unwrap();
            assert_eq!(entry.kind, EntryKind::Directory, "flag {flag:?}");
        }
        for flag in [json!(false), json!(0), json!("0"), json!("")] {
            let entry = normalize_row(&json!({ "file": "f", "is_dir": flag })).unwrap();
            assert_eq!(entry.kind, EntryKind::File, "flag {flag:?}");
        }
    }

    #[test]
    fn absent_signals_default_to_file() {
        let entry = normalize_row(&json!({ "file": "mystery" })).unwrap();
        assert_eq!(entry.kind, EntryKind::File);
    }

    #[test]
    fn conflicting_signals_trust_the_type_field() {
        let entry =
            normalize_row(&json!({ "file": "odd", "type": "file", "is_dir": 1 })).unwrap();
        assert_eq!(entry.kind, EntryKind::File);

        let entry =
            normalize_row(&json!({ "file": "odd", "type": "dir", "is_dir": 0 })).unwrap();
        assert_eq!(entry.kind, EntryKind::Directory);
    }

    #[test]
    fn full_path_and_size_are_carried_through() {
        let entry = normalize_row(&json!({
            "file": "a.txt",
            "fullpath": "/home/wpuser/a.txt",
            "size": 1024
        }))
        .unwrap();
        assert_eq!(entry.full_path.as_deref(), Some("/home/wpuser/a.txt"));
        assert_eq!(entry.size, Some(1024));

        let entry = normalize_row(&json!({ "file": "b.txt", "path": "/b.txt", "size": "77" }))
            .unwrap();
        assert_eq!(entry.full_path.as_deref(), Some("/b.txt"));
        assert_eq!(entry.size, Some(77));
    }
}
