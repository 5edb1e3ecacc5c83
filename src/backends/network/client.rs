use super::models::{DeviceInfo, MediaList, VideoMetadata};
use crate::config::NetworkConfig;
use crate::error::ImportError;
use rand::Rng;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tracing::debug;

const MEDIA_PORT: u16 = 8080;

/// Base URLs of the camera's control API and of its media server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraEndpoints {
    pub control: String,
    pub media: String,
}

impl CameraEndpoints {
    /// A bare IPv4 address talks to the camera's usual ports; a `host:port` address serves
    /// both APIs from one base.
    pub fn from_input(input: &str) -> Result<Self, ImportError> {
        let input = input.trim();
        if let Ok(ip) = input.parse::<Ipv4Addr>() {
            return Ok(Self {
                control: format!("http://{ip}/"),
                media: format!("http://{ip}:{MEDIA_PORT}/"),
            });
        }
        if let Ok(addr) = input.parse::<SocketAddr>() {
            let base = format!("http://{addr}/");
            return Ok(Self {
                control: base.clone(),
                media: base,
            });
        }
        Err(ImportError::InvalidSuppliedData(format!(
            "{input} is not a camera IP address"
        )))
    }
}

/// Linear backoff with jitter for device API calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub min_wait: Duration,
    pub max_wait: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &NetworkConfig) -> Self {
        Self {
            max_retries: config.retry_max,
            min_wait: Duration::from_millis(config.retry_wait_min_ms),
            max_wait: Duration::from_millis(config.retry_wait_max_ms),
        }
    }

    /// Wait before retry number `attempt` (1-based).
    pub fn wait(&self, attempt: u32) -> Duration {
        let base = self.min_wait.saturating_mul(attempt).min(self.max_wait);
        let jitter_ms = self.min_wait.as_millis() as u64 / 2;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..=jitter_ms)
        };
        base + Duration::from_millis(jitter)
    }
}

fn is_transient(outcome: &Result<Response, reqwest::Error>) -> bool {
    match outcome {
        Ok(response) => response.status().is_server_error(),
        Err(err) => err.is_connect() || err.is_timeout() || err.is_request(),
    }
}

/// HTTP client for one camera. Cheap to share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct CameraClient {
    http: Client,
    endpoints: CameraEndpoints,
    timeout: Duration,
    retry: RetryPolicy,
}

impl CameraClient {
    pub fn new(http: Client, endpoints: CameraEndpoints, config: &NetworkConfig) -> Self {
        Self {
            http,
            endpoints,
            timeout: Duration::from_secs(config.timeout_secs),
            retry: RetryPolicy::from_config(config),
        }
    }

    /// Default HTTP client. File downloads can take minutes, so only connecting is bounded
    /// here; API calls carry their own timeout.
    pub fn default_http(config: &NetworkConfig) -> reqwest::Result<Client> {
        Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .build()
    }

    pub fn endpoints(&self) -> &CameraEndpoints {
        &self.endpoints
    }

    async fn send(&self, build: impl Fn() -> RequestBuilder) -> reqwest::Result<Response> {
        let mut attempt = 0;
        loop {
            let outcome = build().send().await;
            if attempt >= self.retry.max_retries || !is_transient(&outcome) {
                return outcome?.error_for_status();
            }
            attempt += 1;
            let wait = self.retry.wait(attempt);
            match &outcome {
                Ok(response) => debug!(status = %response.status(), attempt, ?wait, "Retrying"),
                Err(err) => debug!(error = %err, attempt, ?wait, "Retrying"),
            }
            tokio::time::sleep(wait).await;
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> reqwest::Result<T> {
        let url = format!("{}{path}", self.endpoints.control);
        self.send(|| self.http.get(&url).timeout(self.timeout))
            .await?
            .json()
            .await
    }

    pub async fn info(&self) -> reqwest::Result<DeviceInfo> {
        self.get_json("gp/gpControl/info").await
    }

    pub async fn set_turbo(&self, enabled: bool) -> reqwest::Result<()> {
        let url = format!(
            "{}gp/gpTurbo?p={}",
            self.endpoints.control,
            u8::from(enabled)
        );
        self.send(|| self.http.get(&url).timeout(self.timeout))
            .await?;
        Ok(())
    }

    pub async fn media_list(&self) -> reqwest::Result<MediaList> {
        self.get_json("gp/gpMediaList").await
    }

    pub async fn metadata(&self, folder: &str, name: &str) -> reqwest::Result<VideoMetadata> {
        self.get_json(&format!("gp/gpMediaMetadata?p={folder}/{name}&t=v4info"))
            .await
    }

    pub fn file_url(&self, folder: &str, name: &str) -> String {
        format!("{}videos/DCIM/{folder}/{name}", self.endpoints.media)
    }

    /// Starts downloading a file. The body is left for the caller to stream.
    pub async fn download(&self, folder: &str, name: &str) -> reqwest::Result<Response> {
        let url = self.file_url(folder, name);
        self.send(|| self.http.get(&url)).await
    }

    /// Size of a file as announced by the media server, when it answers a HEAD request.
    pub async fn content_length(&self, folder: &str, name: &str) -> Option<u64> {
        let url = self.file_url(folder, name);
        let response = self
            .send(|| self.http.head(&url).timeout(self.timeout))
            .await
            .ok()?;
        if response.status() != StatusCode::OK {
            return None;
        }
        response
            .headers()
            .get(reqwest::header::CONTENT_LENGTH)?
            .to_str()
            .ok()?
            .parse()
            .ok()
    }
}
