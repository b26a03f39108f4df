//! Network content source backed by GitHub-style endpoints

use super::{branch_candidates, path_variants, FileSource};
use crate::config::{FetchMode, FetchSettings, RepoTarget};
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::StatusCode;
use serde::Deserialize;

/// Remote endpoint kinds, tried in [`Endpoint::ORDER`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Unwrapped file bytes; cheap and unauthenticated
    Raw,
    /// JSON envelope with a base64 body; accepts a token
    ContentApi,
}

impl Endpoint {
    pub const ORDER: [Endpoint; 2] = [Endpoint::Raw, Endpoint::ContentApi];
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Raw => write!(f, "raw"),
            Endpoint::ContentApi => write!(f, "content API"),
        }
    }
}

/// Result of a single endpoint/branch/path attempt
#[derive(Debug)]
enum Attempt {
    Found(String),
    Missing,
    Failed(String),
}

/// Content API response envelope
#[derive(Debug, Deserialize)]
struct ContentEnvelope {
    #[serde(rename = "type")]
    kind: Option<String>,
    content: Option<String>,
}

/// Fetches files from a hosted repository over HTTP
pub struct GitHubSource {
    client: reqwest::Client,
    target: RepoTarget,
    raw_base_url: String,
    api_base_url: String,
}

impl GitHubSource {
    /// Create a source for `target` using the endpoints in `settings`
    pub fn new(target: RepoTarget, settings: &FetchSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            target,
            raw_base_url: settings.raw_base_url.trim_end_matches('/').to_string(),
            api_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn raw_url(&self, branch: &str, path: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.raw_base_url, self.target.repo, branch, path
        )
    }

    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.api_base_url, self.target.repo, path
        )
    }

    async fn attempt(&self, endpoint: Endpoint, branch: &str, path: &str) -> Attempt {
        let result = match endpoint {
            Endpoint::Raw => self.fetch_raw(branch, path).await,
            Endpoint::ContentApi => self.fetch_api(branch, path).await,
        };
        result.unwrap_or_else(|e| Attempt::Failed(format!("{:#}", e)))
    }

    async fn fetch_raw(&self, branch: &str, path: &str) -> Result<Attempt> {
        let url = self.raw_url(branch, path);
        tracing::debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if status.is_success() {
            let content = response.text().await?;
            return Ok(Attempt::Found(content));
        }

        Ok(status_attempt(status))
    }

    async fn fetch_api(&self, branch: &str, path: &str) -> Result<Attempt> {
        let url = self.api_url(path);
        tracing::debug!("GET {}?ref={}", url, branch);

        let mut request = self
            .client
            .get(&url)
            .query(&[("ref", branch)])
            .header("Accept", "application/vnd.github+json");

        if let Some(ref token) = self.target.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            return Ok(status_attempt(status));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse content API response")?;

        // Directories come back as an array of entries
        if body.is_array() {
            return Ok(Attempt::Missing);
        }

        let envelope: ContentEnvelope =
            serde_json::from_value(body).context("Unexpected content API response")?;

        match (envelope.kind.as_deref(), envelope.content) {
            (Some("file"), Some(content)) if !content.is_empty() => {
                Ok(Attempt::Found(decode_content(&content)?))
            }
            // Directories and symlinks are not file content
            _ => Ok(Attempt::Missing),
        }
    }
}

fn status_attempt(status: StatusCode) -> Attempt {
    if status == StatusCode::NOT_FOUND {
        Attempt::Missing
    } else {
        Attempt::Failed(format!("HTTP {}", status))
    }
}

/// Decode a content API body. The API wraps base64 at fixed line widths.
fn decode_content(encoded: &str) -> Result<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = BASE64
        .decode(compact.as_bytes())
        .context("Invalid base64 content")?;
    String::from_utf8(bytes).context("File content is not valid UTF-8")
}

#[async_trait]
impl FileSource for GitHubSource {
    async fn fetch(&self, file_path: &str) -> Option<String> {
        let branches = branch_candidates(&self.target.branch);
        let variants = path_variants(file_path);
        let mut failures = 0usize;

        for endpoint in Endpoint::ORDER {
            for branch in &branches {
                for variant in &variants {
                    match self.attempt(endpoint, branch, variant).await {
                        Attempt::Found(content) => {
                            tracing::info!(
                                "Fetched {} via {} ({}) as {}",
                                file_path,
                                endpoint,
                                branch,
                                variant
                            );
                            return Some(content);
                        }
                        Attempt::Missing => {}
                        Attempt::Failed(reason) => {
                            failures += 1;
                            tracing::warn!(
                                "{} error ({}) for {}: {}",
                                endpoint,
                                branch,
                                variant,
                                reason
                            );
                        }
                    }
                }
            }
        }

        if failures > 0 {
            tracing::warn!(
                "Could not fetch {}: {} attempt(s) failed with errors other than 404, \
                 the remote may be rate limiting or unavailable",
                file_path,
                failures
            );
        } else {
            tracing::warn!("{} not found on any branch or path variant", file_path);
        }

        None
    }

    fn mode(&self) -> FetchMode {
        FetchMode::Network
    }
}
