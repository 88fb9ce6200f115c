use benchfleet::{Commit, Error, Result, ToolchainBuilder};
use std::path::PathBuf;
use tokio::process::Command;

/// Builds the SDK/toolchain for a commit by invoking the external build
/// script: `sh <script> <commit_id>`.
pub struct ScriptToolchainBuilder {
  script: PathBuf,
}

impl ScriptToolchainBuilder {
  pub fn new(script: impl Into<PathBuf>) -> Self {
    Self {
      script: script.into(),
    }
  }
}

#[benchfleet::async_trait]
impl ToolchainBuilder for ScriptToolchainBuilder {
  async fn build(&self, commit: &Commit) -> Result<()> {
    let output = Command::new("sh")
      .arg(&self.script)
      .arg(&commit.id)
      .output()
      .await
      .map_err(|err| Error::error(format!("Failed to spawn toolchain build: {}", err)))?;

    if output.status.success() {
      return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(Error::error(format!(
      "Toolchain build for {} failed: {}",
      commit.id,
      stderr.trim()
    )))
  }
}
