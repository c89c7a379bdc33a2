use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

use crate::mirror::DEFAULT_MAX_DEPTH;

const DEFAULT_BACKUP_DIR_NAME: &str = "wpmirror-backup";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CPANEL_PORT: u16 = 2083;
const DEFAULT_SFTP_PORT: u16 = 22;
const DEFAULT_FTP_PORT: u16 = 21;

/// Settings shared by every transport. Credentials and hostnames are never
/// compiled in; they come from the environment (or a `.env` file loaded at
/// startup) and are handed explicitly to the transport constructors.
#[derive(Clone, Debug)]
pub struct Config {
    pub backup_root: PathBuf,
    pub user: String,
    pub max_depth: u32,
    pub timeout: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let backup_root = match std::env::var("WPMIRROR_BACKUP_DIR") {
            Ok(value) => PathBuf::from(value),
            Err(_) => dirs::home_dir()
                .context("home directory is unavailable; set WPMIRROR_BACKUP_DIR")?
                .join(DEFAULT_BACKUP_DIR_NAME),
        };
        Ok(Self {
            backup_root,
            user: required_env("WPMIRROR_USER")?,
            max_depth: parse_or(env_value("WPMIRROR_MAX_DEPTH"), DEFAULT_MAX_DEPTH),
            timeout: Duration::from_secs(parse_or(
                env_value("WPMIRROR_TIMEOUT_SECS"),
                DEFAULT_TIMEOUT_SECS,
            )),
        })
    }
}

#[derive(Clone, Debug)]
pub struct CpanelConfig {
    pub host: String,
    pub port: u16,
    pub token: String,
    pub accept_invalid_certs: bool,
}

impl CpanelConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: required_env("WPMIRROR_CPANEL_HOST")?,
            port: parse_or(env_value("WPMIRROR_CPANEL_PORT"), DEFAULT_CPANEL_PORT),
            token: required_env("WPMIRROR_CPANEL_TOKEN")?,
            accept_invalid_certs: bool_or(env_value("WPMIRROR_CPANEL_INSECURE_TLS"), false),
        })
    }
}

#[derive(Clone, Debug)]
pub struct SftpConfig {
    pub host: String,
    pub port: u16,
}

impl SftpConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: required_env("WPMIRROR_SFTP_HOST")?,
            port: parse_or(env_value("WPMIRROR_SFTP_PORT"), DEFAULT_SFTP_PORT),
        })
    }
}

#[derive(Clone, Debug)]
pub struct FtpConfig {
    pub host: String,
    pub port: u16,
}

impl FtpConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: required_env("WPMIRROR_FTP_HOST")?,
            port: parse_or(env_value("WPMIRROR_FTP_PORT"), DEFAULT_FTP_PORT),
        })
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

fn required_env(name: &str) -> anyhow::Result<String> {
    env_value(name).with_context(|| format!("{name} is not set"))
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}

fn bool_or(value: Option<String>, default: bool) -> bool {
    match value.as_deref() {
        Some("1") | Some("true") | Some("yes") | Some("on") => true,
        Some("0") | Some("false") | Some("no") | Some("off") => false,
        _ => default,
    }
}
