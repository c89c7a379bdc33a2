use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use russh::client;
use russh::keys::ssh_key;
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::FileAttributes;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::config::SftpConfig;
use crate::mirror::{EntryKind, RemoteEntry, Transport};

const S_IFMT: u32 = 0o170000;
const S_IFDIR: u32 = 0o040000;

#[derive(Debug, Error)]
pub enum SftpError {
    #[error("connection to {host}:{port} failed: {source}")]
    Connection {
        host: String,
        port: u16,
        #[source]
        source: anyhow::Error,
    },
    #[error("authentication rejected for user {user}")]
    Authentication { user: String },
}

/// The hosting provider presents whatever host key it likes; the tool is a
/// one-shot downloader with no known-hosts store, so the key is accepted as
/// presented.
struct AcceptAnyHostKey;

impl client::Handler for AcceptAnyHostKey {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &ssh_key::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

pub struct SftpTransport {
    handle: client::Handle<AcceptAnyHostKey>,
    sftp: SftpSession,
}

impl SftpTransport {
    /// Connects, authenticates with a password and opens the SFTP subsystem.
    /// Connection and authentication failures are the only fatal errors in a
    /// run, so they are distinguished here.
    pub async fn connect(
        config: &SftpConfig,
        user: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self, SftpError> {
        let connection_error = |source: anyhow::Error| SftpError::Connection {
            host: config.host.clone(),
            port: config.port,
            source,
        };

        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: Some(timeout),
            ..Default::default()
        });
        let mut handle = tokio::time::timeout(
            timeout,
            client::connect(
                ssh_config,
                (config.host.as_str(), config.port),
                AcceptAnyHostKey,
            ),
        )
        .await
        .map_err(|_| connection_error(anyhow!("connect timed out after {timeout:?}")))?
        .map_err(|err| connection_error(err.into()))?;

        let auth = handle
            .authenticate_password(user, password)
            .await
            .map_err(|err| connection_error(err.into()))?;
        if !auth.success() {
            return Err(SftpError::Authentication {
                user: user.to_string(),
            });
        }

        let channel = handle
            .channel_open_session()
            .await
            .map_err(|err| connection_error(err.into()))?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|err| connection_error(err.into()))?;
        let sftp = SftpSession::new(channel.into_stream())
            .await
            .map_err(|err| connection_error(anyhow!("sftp subsystem init failed: {err}")))?;

        Ok(Self { handle, sftp })
    }

    /// Whether `path` exists remotely and is a directory. Used to validate
    /// the requested target before any mirroring starts.
    pub async fn is_directory(&self, path: &str) -> bool {
        match self.sftp.metadata(path).await {
            Ok(attrs) => mode_is_dir(&attrs),
            Err(_) => false,
        }
    }

    /// Closes the SFTP channel and disconnects the SSH session. Called on
    /// every exit path; failures here are only worth a log line.
    pub async fn close(self) {
        let Self { handle, sftp } = self;
        if let Err(err) = sftp.close().await {
            eprintln!("[wpmirror] sftp close failed: {err}");
        }
        if let Err(err) = handle
            .disconnect(russh::Disconnect::ByApplication, "", "English")
            .await
        {
            eprintln!("[wpmirror] ssh disconnect failed: {err}");
        }
    }
}

#[async_trait]
impl Transport for SftpTransport {
    async fn list(&mut self, path: &str) -> anyhow::Result<Vec<RemoteEntry>> {
        let dir = self.sftp.read_dir(path).await?;
        let mut entries = Vec::new();
        for item in dir {
            let attrs = item.metadata();
            entries.push(RemoteEntry {
                name: item.file_name(),
                kind: if mode_is_dir(&attrs) {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                },
                full_path: None,
                size: attrs.size,
            });
        }
        Ok(entries)
    }

    async fn fetch(&mut self, remote_path: &str, local_path: &Path) -> anyhow::Result<()> {
        let mut remote = self.sftp.open(remote_path).await?;
        let mut local = tokio::fs::File::create(local_path).await?;
        tokio::io::copy(&mut remote, &mut local).await?;
        local.flush().await?;
        Ok(())
    }
}

/// SFTP reports no `type` field; directoriness is the directory bit in the
/// POSIX file mode.
fn mode_is_dir(attrs: &FileAttributes) -> bool {
    attrs
        .permissions
        .is_some_and(|mode| mode & S_IFMT == S_IFDIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs_with_mode(mode: Option<u32>) -> FileAttributes {
        FileAttributes {
            permissions: mode,
            ..Default::default()
        }
    }

    #[test]
    fn directory_bit_marks_directories() {
        assert!(mode_is_dir(&attrs_with_mode(Some(0o040755))));
        assert!(!mode_is_dir(&attrs_with_mode(Some(0o100644))));
        assert!(!mode_is_dir(&attrs_with_mode(Some(0o120777)))); // symlink
    }

    #[test]
    fn missing_mode_is_treated_as_file() {
        assert!(!mode_is_dir(&attrs_with_mode(None)));
    }
}
