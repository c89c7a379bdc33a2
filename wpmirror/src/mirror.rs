use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::paths::child_remote_path;

/// One normalized directory-listing row. Every transport reports listings in
/// its own shape (duck-typed JSON for cPanel, file attributes for SFTP, raw
/// `LIST` lines for FTP); adapters collapse those into this one form before
/// the walker sees them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub kind: EntryKind,
    /// Absolute remote path when the backing API supplies one directly.
    pub full_path: Option<String>,
    /// Informational only; shown in progress output.
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

impl RemoteEntry {
    pub fn is_special(&self) -> bool {
        self.name == "." || self.name == ".."
    }

    /// Remote path of this entry under `parent`: an API-supplied absolute
    /// path wins over concatenation, which some panels need because their
    /// listings already carry absolute paths with their own separator rules.
    pub fn remote_path_under(&self, parent: &str) -> String {
        match self.full_path.as_deref() {
            Some(path) if !path.is_empty() => path.to_string(),
            _ => child_remote_path(parent, &self.name),
        }
    }
}

/// The two capabilities the walker needs from a transport.
#[async_trait]
pub trait Transport: Send {
    async fn list(&mut self, path: &str) -> anyhow::Result<Vec<RemoteEntry>>;
    async fn fetch(&mut self, remote_path: &str, local_path: &Path) -> anyhow::Result<()>;
}

/// Transient unit of work: one remote directory to reproduce locally.
#[derive(Debug, Clone)]
pub struct WalkJob {
    pub remote_path: String,
    pub local_path: PathBuf,
    pub depth: u32,
}

impl WalkJob {
    pub fn root(remote_path: impl Into<String>, local_path: impl Into<PathBuf>) -> Self {
        Self {
            remote_path: remote_path.into(),
            local_path: local_path.into(),
            depth: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub directories: u64,
    pub files: u64,
    pub failures: u64,
}

/// Depth-first, fully sequential mirror of a remote tree onto the local
/// filesystem. Every failure below the initial connection is non-fatal: it is
/// logged with the remote path and the walk moves on to the next sibling, so
/// one unreadable directory or file never costs the rest of the backup.
pub struct MirrorWalker {
    max_depth: u32,
    stats: WalkStats,
}

pub const DEFAULT_MAX_DEPTH: u32 = 10;

impl MirrorWalker {
    pub fn new(max_depth: u32) -> Self {
        Self {
            max_depth,
            stats: WalkStats::default(),
        }
    }

    pub fn stats(&self) -> WalkStats {
        self.stats
    }

    pub async fn walk(&mut self, transport: &mut dyn Transport, job: WalkJob) {
        // Bounded descent: none of the transports canonicalize paths, so a
        // symlink loop or a self-referential listing would otherwise never
        // terminate.
        if job.depth > self.max_depth {
            eprintln!(
                "[wpmirror] max depth {} reached at {}; not descending",
                self.max_depth, job.remote_path
            );
            return;
        }
        let indent = "  ".repeat(job.depth as usize);

        if let Err(err) = tokio::fs::create_dir_all(&job.local_path).await {
            eprintln!(
                "[wpmirror] cannot create local directory {}: {err}",
                job.local_path.display()
            );
            self.stats.failures += 1;
            return;
        }

        println!("{indent}exploring {}", job.remote_path);
        let entries = match transport.list(&job.remote_path).await {
            Ok(entries) => entries,
            Err(err) => {
                eprintln!(
                    "[wpmirror] listing failed for {}: {err:#}",
                    job.remote_path
                );
                self.stats.failures += 1;
                return;
            }
        };
        if entries.is_empty() {
            println!("{indent}  (empty)");
            return;
        }

        for entry in entries {
            if entry.is_special() {
                continue;
            }
            if entry.name.contains('/') || entry.name.contains('\\') {
                eprintln!(
                    "[wpmirror] skipping entry with separator in name under {}: {:?}",
                    job.remote_path, entry.name
                );
                continue;
            }
            let remote_path = entry.remote_path_under(&job.remote_path);
            let local_path = job.local_path.join(&entry.name);
            match entry.kind {
                EntryKind::Directory => {
                    println!("{indent}  dir  {}", entry.name);
                    self.stats.directories += 1;
                    let child = WalkJob {
                        remote_path,
                        local_path,
                        depth: job.depth + 1,
                    };
                    Box::pin(self.walk(transport, child)).await;
                }
                EntryKind::File => {
                    println!(
                        "{indent}  file {} ({} bytes)",
                        entry.name,
                        entry.size.unwrap_or(0)
                    );
                    match transport.fetch(&remote_path, &local_path).await {
                        Ok(()) => self.stats.files += 1,
                        Err(err) => {
                            eprintln!("[wpmirror] download failed for {remote_path}: {err:#}");
                            self.stats.failures += 1;
                        }
                    }
                }
            }
        }
    }
}
