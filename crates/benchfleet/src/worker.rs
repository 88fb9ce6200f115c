use crate::{
  archive, utils, BenchmarkState, CompilerVariant, DispatchServer, Job, JobId, JobStatus, Result,
  RunnerResult, RunnerSet, WorkResult,
};
use std::{
  collections::HashMap,
  fs,
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

/// File name of the artifact entry point; runners load
/// `<base_url>/<job_id>/index.html`.
pub const HOST_PAGE_NAME: &str = "index.html";

/// The page drives the compiled module and publishes completion, failure
/// and the measured rate through `window.__benchfleet`, which the remote
/// runner polls.
const HOST_PAGE_TEMPLATE: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>{{module}}</title>
<script>
window.__benchfleet = { done: false, failed: false, runsPerSecond: 0 };
window.addEventListener("error", function () {
  window.__benchfleet.failed = true;
  window.__benchfleet.done = true;
});
</script>
</head>
<body>
<script src="{{module}}.js"></script>
</body>
</html>
"#;

/// Compiles one benchmark module into an output directory. Implemented by
/// the external toolchain wrapper; compile failures are deterministic for
/// the same inputs and are never retried.
#[async_trait::async_trait]
pub trait BenchmarkCompiler: Send + Sync {
  async fn compile(
    &self,
    module: &str,
    variant: &CompilerVariant,
    out_dir: &Path,
  ) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
  /// Root under which each invocation gets its own output directory.
  pub out_root: PathBuf,
  /// Interval between job status polls while waiting for the dispatched
  /// job to reach a terminal state.
  pub status_poll_interval: Duration,
}

impl Default for WorkerConfig {
  fn default() -> Self {
    Self {
      out_root: std::env::temp_dir().join("benchfleet-out"),
      status_poll_interval: Duration::from_secs(1),
    }
  }
}

/// Compiles one benchmark module, packages the artifact, drives its job
/// through the dispatch tier and maps the terminal job into a
/// `WorkResult`.
///
/// Every temporary resource (output directory, archive) is owned by this
/// worker until deleted, and is deleted exactly once on every path; a
/// long-running daemon must not accumulate working directories.
pub struct Worker {
  module: String,
  variant: CompilerVariant,
  runners: RunnerSet,
  compiler: Arc<dyn BenchmarkCompiler>,
  dispatch: DispatchServer,
  config: WorkerConfig,
}

impl Worker {
  pub fn new(
    module: impl Into<String>,
    variant: CompilerVariant,
    runners: RunnerSet,
    compiler: Arc<dyn BenchmarkCompiler>,
    dispatch: DispatchServer,
    config: WorkerConfig,
  ) -> Self {
    Self {
      module: module.into(),
      variant,
      runners,
      compiler,
      dispatch,
      config,
    }
  }

  /// Classification is total and mutually exclusive: exactly one of the
  /// terminal `BenchmarkState`s is produced per invocation.
  pub async fn work(self) -> WorkResult {
    let out_dir = utils::unique_child(&self.config.out_root, &self.module);

    if let Err(err) = fs::create_dir_all(&out_dir) {
      return self.failed(BenchmarkState::FailedToCreateDir, err.to_string());
    }

    if let Err(err) = self
      .compiler
      .compile(&self.module, &self.variant, &out_dir)
      .await
    {
      self.cleanup_dir(&out_dir);
      return self.failed(BenchmarkState::FailedCompile, err.to_string());
    }

    if let Err(err) = self.write_host_page(&out_dir) {
      self.cleanup_dir(&out_dir);
      return self.failed(BenchmarkState::FailedHostPageGeneration, err.to_string());
    }

    let archive_path = out_dir.with_extension("zip");
    let packaged = archive::zip_dir(&out_dir, &archive_path);

    // The output directory is spent once packaging has been attempted.
    self.cleanup_dir(&out_dir);

    if let Err(err) = packaged {
      self.cleanup_archive(&archive_path);
      return self.failed(BenchmarkState::FailedToZip, err.to_string());
    }

    let submitted = self.dispatch.submit_job(&archive_path, self.runners.clone());

    // The dispatch tier extracts on submission, so the archive is spent
    // whether or not submission succeeded.
    self.cleanup_archive(&archive_path);

    let job_id = match submitted {
      Ok(job_id) => job_id,
      Err(err) => return self.failed(BenchmarkState::FailedToRunOnRunner, err.to_string()),
    };

    match self.wait_for_completion(&job_id).await {
      Ok(job) => self.map_job(&job),
      Err(err) => self.failed(BenchmarkState::FailedToRunOnRunner, err.to_string()),
    }
  }

  /// Polls the dispatch tier on a fixed interval until the job is
  /// terminal. There is no timeout here: termination is guaranteed by the
  /// per-runner timeout inside the runner itself.
  async fn wait_for_completion(&self, job_id: &JobId) -> Result<Job> {
    loop {
      let job = self.dispatch.get_status(job_id)?;

      if job.status().is_terminal() {
        return Ok(job);
      }

      tokio::time::sleep(self.config.status_poll_interval).await;
    }
  }

  fn map_job(&self, job: &Job) -> WorkResult {
    let mut results = HashMap::new();

    for config in self.runners.iter() {
      let result = match job.result(config) {
        Some(result) if result.succeeded => {
          RunnerResult::succeeded(result.runs_per_second.unwrap_or(0.0))
        }
        Some(result) => RunnerResult::failed(
          result
            .error_message
            .clone()
            .unwrap_or_else(|| "Runner never reported".to_string()),
        ),
        None => RunnerResult::failed("Runner missing from job"),
      };

      results.insert(config.clone(), result);
    }

    let state = match job.status() {
      JobStatus::Finished => BenchmarkState::Done,
      _ => BenchmarkState::FailedToRunOnRunner,
    };

    WorkResult {
      module: self.module.clone(),
      variant: self.variant.clone(),
      state,
      error_message: None,
      results,
    }
  }

  fn write_host_page(&self, out_dir: &Path) -> Result<()> {
    let page = HOST_PAGE_TEMPLATE.replace("{{module}}", &self.module);

    fs::write(out_dir.join(HOST_PAGE_NAME), page).map_err(crate::Error::host_page_failed)
  }

  fn failed(&self, state: BenchmarkState, message: impl Into<String>) -> WorkResult {
    WorkResult::failed(
      self.module.clone(),
      self.variant.clone(),
      &self.runners,
      state,
      message,
    )
  }

  fn cleanup_dir(&self, dir: &Path) {
    if let Err(err) = utils::remove_dir_if_exists(dir) {
      log::warn!("Failed to remove output directory {:?}: {}", dir, err);
    }
  }

  fn cleanup_archive(&self, archive_path: &Path) {
    if let Err(err) = utils::remove_file_if_exists(archive_path) {
      log::warn!("Failed to remove archive {:?}: {}", archive_path, err);
    }
  }
}
