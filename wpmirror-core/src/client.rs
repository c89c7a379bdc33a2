use std::io;
use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use url::Url;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum CpanelError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("api returned {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("api rejected the call: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Connection,
    Auth,
    Other,
}

#[derive(Debug, Clone)]
pub struct CpanelOptions {
    pub timeout: Duration,
    pub accept_invalid_certs: bool,
}

impl Default for CpanelOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            accept_invalid_certs: false,
        }
    }
}

#[derive(Clone)]
pub struct CpanelClient {
    http: Client,
    base_url: Url,
    user: String,
    token: String,
}

impl CpanelClient {
    pub fn new(
        host: &str,
        port: u16,
        user: impl Into<String>,
        token: impl Into<String>,
        options: &CpanelOptions,
    ) -> Result<Self, CpanelError> {
        Self::with_base_url(&format!("https://{host}:{port}"), user, token, options)
    }

    pub fn with_base_url(
        base_url: &str,
        user: impl Into<String>,
        token: impl Into<String>,
        options: &CpanelOptions,
    ) -> Result<Self, CpanelError> {
        let http = Client::builder()
            .timeout(options.timeout)
            .connect_timeout(options.timeout)
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .build()?;
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
            user: user.into(),
            token: token.into(),
        })
    }

    /// Lists a directory, preferring UAPI and falling back once to the API2
    /// form when UAPI fails or its payload carries errors. Rows come back as
    /// raw JSON objects; field names differ between panel versions, so
    /// normalization is left to the caller.
    pub async fn list_files(&self, dir: &str) -> Result<Vec<Value>, CpanelError> {
        match self.list_files_uapi(dir).await {
            Ok(rows) => Ok(rows),
            Err(first) => match self.list_files_api2(dir).await {
                Ok(rows) => Ok(rows),
                Err(_) => Err(first),
            },
        }
    }

    async fn list_files_uapi(&self, dir: &str) -> Result<Vec<Value>, CpanelError> {
        let mut url = self.endpoint("/execute/Fileman/list_files")?;
        url.query_pairs_mut().append_pair("dir", dir);
        let response = self
            .http
            .get(url)
            .header("Authorization", self.auth_header_value())
            .send()
            .await?;
        let payload: UapiResponse = Self::handle_response(response).await?;
        if let Some(errors) = payload.errors.filter(|errors| !errors.is_empty()) {
            return Err(CpanelError::Rejected(errors.join("; ")));
        }
        Ok(rows_from(payload.data))
    }

    async fn list_files_api2(&self, dir: &str) -> Result<Vec<Value>, CpanelError> {
        let mut url = self.endpoint("/api2/Fileman/list_files")?;
        url.query_pairs_mut().append_pair("dir", dir);
        let response = self
            .http
            .get(url)
            .header("Authorization", self.auth_header_value())
            .send()
            .await?;
        let payload: Value = Self::handle_response(response).await?;
        if let Some(error) = payload
            .pointer("/cpanelresult/error")
            .and_then(Value::as_str)
        {
            return Err(CpanelError::Rejected(error.to_string()));
        }
        let rows = payload
            .pointer("/cpanelresult/data")
            .or_else(|| payload.get("data"))
            .cloned();
        Ok(rows_from(rows))
    }

    /// Downloads one remote file to `target`, creating parent directories as
    /// needed. The response body is streamed to disk in chunks; an existing
    /// file at `target` is overwritten.
    pub async fn download_to_path(
        &self,
        remote_path: &str,
        target: &Path,
    ) -> Result<(), CpanelError> {
        let mut url = self.endpoint("/execute/FileManager/download_file")?;
        url.query_pairs_mut().append_pair("file", remote_path);
        let response = self
            .http
            .get(url)
            .header("Authorization", self.auth_header_value())
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CpanelError::Api { status, body });
        }

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(target).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;
        Ok(())
    }

    fn auth_header_value(&self) -> String {
        format!("cpanel {}:{}", self.user, self.token)
    }

    fn endpoint(&self, path: &str) -> Result<Url, CpanelError> {
        Ok(self.base_url.join(path)?)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, CpanelError> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(CpanelError::Api { status, body })
        }
    }
}

impl CpanelError {
    pub fn classification(&self) -> ErrorClass {
        match self {
            CpanelError::Request(err) if err.is_decode() => ErrorClass::Other,
            CpanelError::Request(_) => ErrorClass::Connection,
            CpanelError::Api { status, .. }
                if matches!(
                    *status,
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
                ) =>
            {
                ErrorClass::Auth
            }
            _ => ErrorClass::Other,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UapiResponse {
    #[serde(default)]
    errors: Option<Vec<String>>,
    #[serde(default)]
    data: Option<Value>,
}

fn rows_from(data: Option<Value>) -> Vec<Value> {
    match data {
        Some(Value::Array(rows)) => rows,
        _ => Vec::new(),
    }
}
