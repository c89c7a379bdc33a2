use std::io;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use suppaftp::list::File as ListEntry;
use suppaftp::{FtpError, FtpStream, Status};
use thiserror::Error;

use crate::config::FtpConfig;
use crate::mirror::{EntryKind, RemoteEntry, Transport};

#[derive(Debug, Error)]
pub enum FtpConnectError {
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

/// Walker adapter over plain FTP. The underlying client is synchronous; the
/// run is sequential with one operation in flight anyway, so its calls are
/// made inline rather than shuttled through a blocking pool.
pub struct FtpTransport {
    ftp: FtpStream,
}

impl FtpTransport {
    pub fn connect(
        config: &FtpConfig,
        user: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self, FtpConnectError> {
        let connection_error = |source: anyhow::Error| FtpConnectError::Connection {
            host: config.host.clone(),
            port: config.port,
            source,
        };

        let mut ftp = FtpStream::connect((config.host.as_str(), config.port))
            .map_err(|err| connection_error(err.into()))?;
        ftp.get_ref()
            .set_read_timeout(Some(timeout))
            .map_err(|err| connection_error(err.into()))?;
        match ftp.login(user, password) {
            Ok(()) => {}
            Err(FtpError::UnexpectedResponse(response))
                if response.status == Status::NotLoggedIn =>
            {
                return Err(FtpConnectError::Authentication {
                    user: user.to_string(),
                });
            }
            Err(err) => return Err(connection_error(err.into())),
        }
        Ok(Self { ftp })
    }

    pub fn working_directory(&mut self) -> Result<String, FtpError> {
        self.ftp.pwd()
    }

    /// Raw `LIST` lines for the current directory, as the server sent them.
    pub fn raw_root_listing(&mut self) -> Result<Vec<String>, FtpError> {
        self.ftp.list(None)
    }

    /// Sends `QUIT`; a server that hangs up first is not worth reporting.
    pub fn quit(mut self) {
        let _ = self.ftp.quit();
    }
}

#[async_trait]
impl Transport for FtpTransport {
    async fn list(&mut self, path: &str) -> anyhow::Result<Vec<RemoteEntry>> {
        let lines = self.ftp.list(Some(path))?;
        let mut entries = Vec::new();
        for line in lines {
            match ListEntry::try_from(line.as_str()) {
                Ok(parsed) => entries.push(RemoteEntry {
                    name: parsed.name().to_string(),
                    kind: if parsed.is_directory() {
                        EntryKind::Directory
                    } else {
                        EntryKind::File
                    },
                    full_path: None,
                    size: Some(parsed.size() as u64),
                }),
                Err(err) => {
                    eprintln!("[wpmirror] unparsable LIST line {line:?}: {err}");
                }
            }
        }
        Ok(entries)
    }

    async fn fetch(&mut self, remote_path: &str, local_path: &Path) -> anyhow::Result<()> {
        let mut body = self.ftp.retr_as_buffer(remote_path)?;
        let mut file = std::fs::File::create(local_path)?;
        io::copy(&mut body, &mut file)?;
        Ok(())
    }
}
