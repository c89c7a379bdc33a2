use std::path::Path;

use anyhow::anyhow;
use serde_json::Value;
use thiserror::Error;
use wpmirror_core::{CpanelClient, CpanelError, CpanelOptions, ErrorClass};

use crate::config::{Config, CpanelConfig, FtpConfig, SftpConfig};
use crate::mirror::{EntryKind, MirrorWalker, Transport, WalkJob, WalkStats};
use crate::paths::invocation_dir_name;
use crate::transports::cpanel::{self, CpanelTransport};
use crate::transports::ftp::{FtpConnectError, FtpTransport};
use crate::transports::sftp::{SftpError, SftpTransport};

const ROOT_PREVIEW_LIMIT: usize = 30;
const PROBE_PREVIEW_LIMIT: usize = 20;

/// A fatal error: only the initial connection or authentication step can
/// produce one. Everything after that point is recovered inside the walk and
/// never changes the exit code.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("connection failed: {0:#}")]
    Connection(anyhow::Error),
    #[error("authentication failed: {0:#}")]
    Authentication(anyhow::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RunError {
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::Authentication(_) => 2,
            RunError::Connection(_) | RunError::Other(_) => 1,
        }
    }
}

/// `wpmirror cpanel [remote_dir]`: preview the account root over the cPanel
/// API and, for a non-root target, mirror it under the backup root.
pub async fn cpanel(remote_dir: &str) -> Result<(), RunError> {
    let config = Config::from_env()?;
    let cpanel_config = CpanelConfig::from_env()?;
    let options = CpanelOptions {
        timeout: config.timeout,
        accept_invalid_certs: cpanel_config.accept_invalid_certs,
    };
    let client = CpanelClient::new(
        &cpanel_config.host,
        cpanel_config.port,
        &config.user,
        &cpanel_config.token,
        &options,
    )
    .map_err(|err| RunError::Other(err.into()))?;

    println!(
        "connecting to cPanel at {}:{} as {}",
        cpanel_config.host, cpanel_config.port, config.user
    );
    let rows = client.list_files("/").await.map_err(cpanel_fatal)?;
    println!("✓ connected");
    println!();
    println!("root listing ({} entries):", rows.len());
    preview_cpanel_rows(&rows, ROOT_PREVIEW_LIMIT);

    if remote_dir == "/" {
        println!();
        println!("pass a directory to download it, e.g.: wpmirror cpanel public_html");
        return Ok(());
    }

    let target = config.backup_root.join(invocation_dir_name(remote_dir));
    println!();
    println!("mirroring {} -> {}", remote_dir, target.display());
    let mut transport = CpanelTransport::new(client);
    let mut walker = MirrorWalker::new(config.max_depth);
    walker
        .walk(&mut transport, WalkJob::root(remote_dir, &target))
        .await;
    report(walker.stats(), &target);
    Ok(())
}

/// `wpmirror sftp <password> <remote_dir>`: mirror a directory over SFTP.
pub async fn sftp(password: &str, remote_dir: &str) -> Result<(), RunError> {
    let config = Config::from_env()?;
    let sftp_config = SftpConfig::from_env()?;

    println!(
        "connecting to {}:{} over SFTP as {}",
        sftp_config.host, sftp_config.port, config.user
    );
    let mut transport =
        SftpTransport::connect(&sftp_config, &config.user, password, config.timeout)
            .await
            .map_err(sftp_fatal)?;
    println!("✓ connected");

    match transport.list(".").await {
        Ok(entries) => {
            println!();
            println!("login directory ({} entries):", entries.len());
            for entry in entries.iter().take(PROBE_PREVIEW_LIMIT) {
                println!("  - {}", entry.name);
            }
        }
        Err(err) => eprintln!("[wpmirror] could not list login directory: {err:#}"),
    }

    if !transport.is_directory(remote_dir).await {
        transport.close().await;
        return Err(RunError::Other(anyhow!(
            "remote directory {remote_dir} does not exist or is not accessible"
        )));
    }

    let target = config.backup_root.join(invocation_dir_name(remote_dir));
    println!();
    println!("mirroring {} -> {}", remote_dir, target.display());
    let mut walker = MirrorWalker::new(config.max_depth);
    walker
        .walk(&mut transport, WalkJob::root(remote_dir, &target))
        .await;
    transport.close().await;
    report(walker.stats(), &target);
    Ok(())
}

/// `wpmirror ftp <password> <remote_dir>`: mirror a directory over plain FTP.
pub async fn ftp(password: &str, remote_dir: &str) -> Result<(), RunError> {
    let config = Config::from_env()?;
    let ftp_config = FtpConfig::from_env()?;

    println!(
        "connecting to {}:{} over FTP as {}",
        ftp_config.host, ftp_config.port, config.user
    );
    let mut transport = FtpTransport::connect(&ftp_config, &config.user, password, config.timeout)
        .map_err(ftp_fatal)?;
    println!("✓ logged in");

    let target = config.backup_root.join(invocation_dir_name(remote_dir));
    println!();
    println!("mirroring {} -> {}", remote_dir, target.display());
    let mut walker = MirrorWalker::new(config.max_depth);
    walker
        .walk(&mut transport, WalkJob::root(remote_dir, &target))
        .await;
    transport.quit();
    report(walker.stats(), &target);
    Ok(())
}

/// `wpmirror ftp-probe [password]`: connectivity check; prints the working
/// directory and the first raw `LIST` lines of the root.
pub async fn ftp_probe(password: Option<String>) -> Result<(), RunError> {
    let config = Config::from_env()?;
    let ftp_config = FtpConfig::from_env()?;

    if password.is_none() {
        println!("no password supplied; attempting login with an empty password");
    }
    println!("connecting to {}:{} over FTP...", ftp_config.host, ftp_config.port);
    let mut transport = FtpTransport::connect(
        &ftp_config,
        &config.user,
        password.as_deref().unwrap_or(""),
        config.timeout,
    )
    .map_err(ftp_fatal)?;
    println!("✓ logged in");

    match transport.working_directory() {
        Ok(cwd) => println!("working directory: {cwd}"),
        Err(err) => eprintln!("[wpmirror] PWD failed: {err}"),
    }
    let lines = transport
        .raw_root_listing()
        .map_err(|err| RunError::Other(err.into()))?;
    println!();
    println!("root listing:");
    for line in lines.iter().take(PROBE_PREVIEW_LIMIT) {
        println!("  {line}");
    }
    println!();
    println!("total items in root: {}", lines.len());
    transport.quit();
    println!("✓ connection successful");
    Ok(())
}

/// `wpmirror sftp-probe <password>`: connectivity check; prints the first
/// entries of the login directory.
pub async fn sftp_probe(password: &str) -> Result<(), RunError> {
    let config = Config::from_env()?;
    let sftp_config = SftpConfig::from_env()?;

    println!(
        "connecting to {}:{} over SFTP...",
        sftp_config.host, sftp_config.port
    );
    let mut transport =
        SftpTransport::connect(&sftp_config, &config.user, password, config.timeout)
            .await
            .map_err(sftp_fatal)?;
    println!("✓ connected");

    let result = transport.list(".").await;
    match &result {
        Ok(entries) => {
            println!();
            println!("login directory:");
            for entry in entries.iter().take(PROBE_PREVIEW_LIMIT) {
                println!("  - {}", entry.name);
            }
            println!();
            println!("total items: {}", entries.len());
        }
        Err(err) => eprintln!("[wpmirror] listing failed: {err:#}"),
    }
    transport.close().await;
    match result {
        Ok(_) => {
            println!("✓ connection test successful");
            Ok(())
        }
        Err(err) => Err(RunError::Other(err)),
    }
}

fn preview_cpanel_rows(rows: &[Value], limit: usize) {
    for row in rows.iter().take(limit) {
        match cpanel::normalize_row(row) {
            Some(entry) => {
                let kind = match entry.kind {
                    EntryKind::Directory => "dir ",
                    EntryKind::File => "file",
                };
                let size = cpanel::human_size(row)
                    .or_else(|| entry.size.map(|size| format!("{size} bytes")))
                    .unwrap_or_default();
                println!("  {kind} {}  {size}", entry.name);
            }
            None => println!("  (unrecognized row) {row}"),
        }
    }
}

fn report(stats: WalkStats, target: &Path) {
    println!();
    if stats.failures == 0 {
        println!("✓ download complete");
    } else {
        println!("download finished with {} recovered failures", stats.failures);
    }
    println!(
        "{} files across {} directories saved to {}",
        stats.files,
        stats.directories,
        target.display()
    );
}

fn cpanel_fatal(err: CpanelError) -> RunError {
    match err.classification() {
        ErrorClass::Auth => RunError::Authentication(err.into()),
        ErrorClass::Connection => RunError::Connection(err.into()),
        ErrorClass::Other => RunError::Other(err.into()),
    }
}

fn sftp_fatal(err: SftpError) -> RunError {
    match err {
        SftpError::Authentication { .. } => RunError::Authentication(err.into()),
        SftpError::Connection { .. } => RunError::Connection(err.into()),
    }
}

fn ftp_fatal(err: FtpConnectError) -> RunError {
    match err {
        FtpConnectError::Authentication { .. } => RunError::Authentication(err.into()),
        FtpConnectError::Connection { .. } => RunError::Connection(err.into()),
    }
}
