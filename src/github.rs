use crate::config::AppSettings;
use crate::models::{GithubCommitDetail, GithubCommitSummary, GithubContent, GithubRepository};
use reqwest::{header, Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, error, instrument};
use url::Url;
use urlencoding::encode;

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const USER_AGENT: &str = concat!("discord-gitbot/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum GithubError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("GitHub API error: {status} - {body}")]
    Api { status: StatusCode, body: String },
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("Failed to deserialize response: {0}")]
    Deserialization(reqwest::Error),
    #[error("'{path}' is not a file")]
    NotAFile { path: String },
    #[error("Failed to decode content of '{path}': {reason}")]
    Decode { path: String, reason: String },
}

/// Thin client over the GitHub REST endpoints used by the bot.
/// Every call is a live request; nothing is cached.
#[derive(Debug)]
pub struct GithubApiClient {
    client: Client,
    base_url: Url,
    token: String,
    owner: String,
    repo: String,
}

impl GithubApiClient {
    pub fn new(settings: &AppSettings) -> Result<Self, GithubError> {
        let base_url = parse_base_url(&settings.github_api_url)?;
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            base_url,
            token: settings.github_token.clone(),
            owner: settings.github_owner.clone(),
            repo: settings.github_repo.clone(),
        })
    }

    fn repo_url(&self, suffix: &str) -> Result<Url, GithubError> {
        let path = if suffix.is_empty() {
            format!("repos/{}/{}", self.owner, self.repo)
        } else {
            format!("repos/{}/{}/{}", self.owner, self.repo, suffix)
        };
        Ok(self.base_url.join(&path)?)
    }

    fn get(&self, url: Url) -> RequestBuilder {
        self.client
            .get(url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .header(header::ACCEPT, GITHUB_ACCEPT)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, GithubError> {
        let response = request.send().await.map_err(GithubError::Request)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("Failed to read error body: {}", e));
            error!("GitHub API Error: {} - {}", status, body);
            return Err(GithubError::Api { status, body });
        }

        response
            .json::<T>()
            .await
            .map_err(GithubError::Deserialization)
    }

    #[instrument(skip(self), fields(owner = %self.owner, repo = %self.repo))]
    pub async fn get_repository(&self) -> Result<GithubRepository, GithubError> {
        let url = self.repo_url("")?;
        debug!("Fetching repository metadata from {}", url);
        self.send_json(self.get(url)).await
    }

    /// Lists commits reachable from `branch`, most recent first
    #[instrument(skip(self), fields(owner = %self.owner, repo = %self.repo))]
    pub async fn list_commits(
        &self,
        branch: &str,
        per_page: u8,
    ) -> Result<Vec<GithubCommitSummary>, GithubError> {
        let url = self.repo_url("commits")?;
        let per_page = per_page.to_string();
        let request = self
            .get(url)
            .query(&[("sha", branch), ("per_page", per_page.as_str())]);
        let commits: Vec<GithubCommitSummary> = self.send_json(request).await?;
        debug!("Fetched {} commits from branch {}", commits.len(), branch);
        Ok(commits)
    }

    #[instrument(skip(self), fields(owner = %self.owner, repo = %self.repo))]
    pub async fn get_commit(&self, sha: &str) -> Result<GithubCommitDetail, GithubError> {
        let url = self.repo_url(&format!("commits/{}", encode(sha)))?;
        self.send_json(self.get(url)).await
    }

    /// Fetches a file at `git_ref` and decodes it as UTF-8 text
    #[instrument(skip(self), fields(owner = %self.owner, repo = %self.repo))]
    pub async fn get_file_content(&self, path: &str, git_ref: &str) -> Result<String, GithubError> {
        let url = self.repo_url(&format!("contents/{}", encode_path(path)))?;
        let request = self.get(url).query(&[("ref", git_ref)]);

        // Directories come back as a JSON array rather than an object
        let value: serde_json::Value = self.send_json(request).await?;
        if !value.is_object() {
            return Err(GithubError::NotAFile {
                path: path.to_string(),
            });
        }
        let file: GithubContent =
            serde_json::from_value(value).map_err(|e| GithubError::Decode {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        decode_content(path, &file)
    }
}

pub(crate) fn parse_base_url(raw: &str) -> Result<Url, url::ParseError> {
    // Url::join drops the last segment unless the base ends with '/'
    if raw.ends_with('/') {
        Url::parse(raw)
    } else {
        Url::parse(&format!("{}/", raw))
    }
}

fn encode_path(path: &str) -> String {
    path.trim_start_matches('/')
        .split('/')
        .map(|segment| encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn decode_content(path: &str, file: &GithubContent) -> Result<String, GithubError> {
    if file.content_type != "file" {
        return Err(GithubError::NotAFile {
            path: path.to_string(),
        });
    }
    let raw = file.content.as_deref().unwrap_or_default();
    match file.encoding.as_deref() {
        Some("base64") => {
            let bytes = base64::decode(raw.replace('\n', "")).map_err(|e| GithubError::Decode {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
            String::from_utf8(bytes).map_err(|_| GithubError::Decode {
                path: path.to_string(),
                reason: "content is not valid UTF-8 text".to_string(),
            })
        }
        // Files above 1 MB are returned with encoding "none" and no content
        other => Err(GithubError::Decode {
            path: path.to_string(),
            reason: format!("unsupported encoding {:?}", other.unwrap_or("missing")),
        }),
    }
}
