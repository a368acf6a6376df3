use crate::github::{GithubApiClient, GithubError};
use crate::models::{CommitRecord, RepositoryInfo};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Number of recent commits scanned by a message search.
/// Older commits cannot be found by message.
pub const COMMIT_SEARCH_WINDOW: u8 = 50;

/// Repository operations bound to one default branch.
///
/// Built per pipeline run from the current [`RepositoryInfo`] snapshot, so
/// every operation resolves an omitted branch the same way.
#[derive(Debug, Clone)]
pub struct RepositoryService {
    github: Arc<GithubApiClient>,
    default_branch: String,
}

impl RepositoryService {
    pub fn new(github: Arc<GithubApiClient>, default_branch: impl Into<String>) -> Self {
        Self {
            github,
            default_branch: default_branch.into(),
        }
    }

    pub fn resolve_branch<'a>(&'a self, branch: Option<&'a str>) -> &'a str {
        branch
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .unwrap_or(&self.default_branch)
    }

    pub async fn fetch_repository_info(&self) -> Result<RepositoryInfo, GithubError> {
        fetch_repository_info(&self.github).await
    }

    #[instrument(skip(self))]
    pub async fn latest_commit(
        &self,
        branch: Option<&str>,
    ) -> Result<Option<CommitRecord>, GithubError> {
        let branch = self.resolve_branch(branch);
        let commits = self.github.list_commits(branch, 1).await?;
        let Some(head) = commits.first() else {
            info!("No commits found on branch {}", branch);
            return Ok(None);
        };
        self.commit_details(&head.sha).await.map(Some)
    }

    #[instrument(skip(self))]
    pub async fn find_commit_by_substring(
        &self,
        query: &str,
        branch: Option<&str>,
    ) -> Result<Option<CommitRecord>, GithubError> {
        let branch = self.resolve_branch(branch);
        let commits = self.github.list_commits(branch, COMMIT_SEARCH_WINDOW).await?;
        let needle = query.to_lowercase();

        let Some(found) = commits
            .iter()
            .find(|c| c.commit.message.to_lowercase().contains(&needle))
        else {
            debug!(
                "No commit among the last {} of {} contains {:?}",
                commits.len(),
                branch,
                query
            );
            return Ok(None);
        };
        self.commit_details(&found.sha).await.map(Some)
    }

    pub async fn commit_details(&self, sha: &str) -> Result<CommitRecord, GithubError> {
        let detail = self.github.get_commit(sha).await?;
        Ok(CommitRecord::from(detail))
    }

    #[instrument(skip(self))]
    pub async fn file_content(&self, path: &str, branch: Option<&str>) -> Result<String, GithubError> {
        let branch = self.resolve_branch(branch);
        self.github.get_file_content(path, branch).await
    }
}

/// Loads a fresh repository snapshot. The caller decides where to store it.
pub async fn fetch_repository_info(github: &GithubApiClient) -> Result<RepositoryInfo, GithubError> {
    let repo = github.get_repository().await?;
    info!(
        "Loaded repository {} (default branch: {})",
        repo.full_name, repo.default_branch
    );
    Ok(RepositoryInfo {
        name: repo.name,
        description: repo.description.filter(|d| !d.trim().is_empty()),
        default_branch: repo.default_branch,
        last_refreshed: Utc::now(),
    })
}
