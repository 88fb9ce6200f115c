use crate::{Error, Result, Time};
use octocrate::{APIConfig, GitHubAPI, PersonalAccessToken};

/// The daemon's unit of new work: a commit to build and benchmark.
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
  pub id: String,
  pub timestamp: Time,
}

impl Commit {
  pub fn new(id: impl Into<String>, timestamp: Time) -> Self {
    Self {
      id: id.into(),
      timestamp,
    }
  }

  /// Synthetic commit for single-run batches, which benchmark whatever is
  /// in the workspace rather than a tracked revision.
  pub fn workspace() -> Self {
    Self::new("workspace", chrono::Utc::now())
  }
}

/// Polled by the daemon on its tick for the latest unit of work.
#[async_trait::async_trait]
pub trait CommitWatcher: Send + Sync {
  async fn latest(&self) -> Result<Option<Commit>>;
}

/// Watches a repository branch tip through the GitHub API.
pub struct GithubCommitWatcher {
  api: GitHubAPI,
  owner: String,
  repo: String,
  branch: String,
}

impl GithubCommitWatcher {
  pub fn new(
    owner: impl Into<String>,
    repo: impl Into<String>,
    branch: impl Into<String>,
    token: &str,
  ) -> Self {
    let config = APIConfig::with_token(PersonalAccessToken::new(token)).shared();

    Self {
      api: GitHubAPI::new(&config),
      owner: owner.into(),
      repo: repo.into(),
      branch: branch.into(),
    }
  }
}

#[async_trait::async_trait]
impl CommitWatcher for GithubCommitWatcher {
  async fn latest(&self) -> Result<Option<Commit>> {
    let commit = self
      .api
      .repos
      .get_commit(&self.owner, &self.repo, &self.branch)
      .send()
      .await
      .map_err(|err| Error::error(format!("Failed to fetch branch tip: {}", err)))?;

    let timestamp = commit
      .commit
      .committer
      .as_ref()
      .and_then(|committer| committer.date.as_ref())
      .and_then(|date| chrono::DateTime::parse_from_rfc3339(date).ok())
      .map(|date| date.with_timezone(&chrono::Utc))
      .unwrap_or_else(chrono::Utc::now);

    Ok(Some(Commit::new(commit.sha, timestamp)))
  }
}

/// Last commit that made it all the way through reporting. Owned by the
/// manager and advanced only after the reporter confirms delivery, so a
/// failed batch is retried from the same point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Checkpoint {
  last: Option<String>,
}

impl Checkpoint {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn last(&self) -> Option<&str> {
    self.last.as_deref()
  }

  pub fn is_new(&self, commit: &Commit) -> bool {
    self.last.as_deref() != Some(commit.id.as_str())
  }

  pub fn advance(&mut self, commit: &Commit) {
    self.last = Some(commit.id.clone());
  }
}
