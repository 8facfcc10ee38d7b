//! [RemoteStore] on top of the GitHub repository contents API. The blob `sha` of a file serves as
//! its version token, GitHub answers a write carrying an outdated `sha` with `409 Conflict`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{
    config::SyncConfig,
    store::{RemoteDocument, RemoteStore, StoreError},
};

pub const GITHUB_API: &str = "https://api.github.com";

const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

#[derive(Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: String,
}

#[derive(Serialize)]
struct PutContentsRequest<'a> {
    message: String,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Deserialize)]
struct PutContentsResponse {
    content: CommittedContent,
}

#[derive(Deserialize)]
struct CommittedContent {
    sha: String,
}

pub struct GithubStore {
    http: reqwest::Client,
    base_url: String,
}

impl GithubStore {
    pub fn new() -> Result<Self, StoreError> {
        Self::with_base_url(GITHUB_API)
    }

    /// Points the store at another API root, e.g. a GitHub Enterprise instance.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    /// The path is encoded as a single component, slashes included.
    fn contents_url(&self, config: &SyncConfig, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(&config.owner),
            urlencoding::encode(&config.repo),
            urlencoding::encode(path),
        )
    }

    fn request(&self, method: Method, config: &SyncConfig, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.contents_url(config, path))
            .header(header::ACCEPT, GITHUB_MEDIA_TYPE)
            .bearer_auth(&config.token)
    }
}

#[async_trait]
impl RemoteStore for GithubStore {
    #[instrument(skip(self, config), fields(owner = %config.owner, repo = %config.repo))]
    async fn fetch(&self, config: &SyncConfig, path: &str) -> Result<RemoteDocument, StoreError> {
        let response = self.request(Method::GET, config, path).send().await?;
        let response = check_response(response).await?;
        let body: ContentsResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Parse(e.to_string()))?;
        debug!(sha = %body.sha, "Fetched document");
        Ok(RemoteDocument {
            content: body.content,
            version: body.sha,
        })
    }

    #[instrument(skip(self, config, content), fields(owner = %config.owner, repo = %config.repo))]
    async fn write(
        &self,
        config: &SyncConfig,
        path: &str,
        content: String,
        version: Option<String>,
    ) -> Result<String, StoreError> {
        let body = PutContentsRequest {
            message: format!("update {path}"),
            content: &content,
            sha: version.as_deref(),
        };
        let response = self
            .request(Method::PUT, config, path)
            .json(&body)
            .send()
            .await?;
        let response = check_response(response).await?;
        let body: PutContentsResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Parse(e.to_string()))?;
        debug!(sha = %body.content.sha, "Stored document");
        Ok(body.content.sha)
    }
}

/// Maps GitHub status codes onto [StoreError]. Returns the response unchanged on success.
async fn check_response(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match status {
        StatusCode::NOT_FOUND => Err(StoreError::NotFound),
        StatusCode::CONFLICT => Err(StoreError::Conflict),
        StatusCode::TOO_MANY_REQUESTS => Err(StoreError::RateLimited {
            retry_after_secs: parse_retry_after(&response),
        }),
        // GitHub reports an exhausted primary rate limit as 403.
        StatusCode::FORBIDDEN if rate_limit_exhausted(&response) => Err(StoreError::RateLimited {
            retry_after_secs: parse_retry_after(&response),
        }),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(StoreError::Unauthorized {
            status: status.as_u16(),
        }),
        _ => {
            let message = response.text().await.unwrap_or_default();
            // Creating a file that someone else created in the meantime.
            if status == StatusCode::UNPROCESSABLE_ENTITY && is_missing_sha(&message) {
                return Err(StoreError::Conflict);
            }
            Err(StoreError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

fn is_missing_sha(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("sha") && message.contains("supplied")
}

fn rate_limit_exhausted(response: &Response) -> bool {
    response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0")
}

fn parse_retry_after(response: &Response) -> u64 {
    response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}
