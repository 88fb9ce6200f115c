use crate::{
  archive, utils, Error, Job, JobId, Result, Runner, RunnerConfig, RunnerSet, ShutdownSignal,
};
use parking_lot::Mutex;
use std::{
  collections::HashMap,
  fs,
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};
use tokio::sync::Semaphore;

#[derive(Debug, Clone)]
pub struct DispatchConfig {
  /// Root under which each job gets its own working directory.
  pub work_root: PathBuf,
  /// Base URL under which the working directories are served to runners.
  pub base_url: String,
  /// Maximum number of runner executions in flight across all jobs.
  pub pool_size: usize,
  /// Terminal jobs older than this are swept away.
  pub retention: Duration,
  pub sweep_interval: Duration,
}

impl Default for DispatchConfig {
  fn default() -> Self {
    Self {
      work_root: std::env::temp_dir().join("benchfleet-jobs"),
      base_url: "http://localhost:8765/jobs".to_string(),
      pool_size: 4,
      retention: Duration::from_secs(600),
      sweep_interval: Duration::from_secs(60),
    }
  }
}

struct DispatchState {
  jobs: HashMap<JobId, Job>,
  directories: HashMap<JobId, PathBuf>,
}

/// Accepts packaged benchmarks, fans each one out to its runners on a
/// bounded pool, and answers status lookups until the job is swept.
///
/// The job map is the only state shared between runner tasks; each task
/// writes its own entry and the job recomputes its status from the full
/// map under the same lock, so sibling results are never torn.
#[derive(Clone)]
pub struct DispatchServer {
  config: Arc<DispatchConfig>,
  runner: Arc<dyn Runner>,
  pool: Arc<Semaphore>,
  state: Arc<Mutex<DispatchState>>,
}

impl DispatchServer {
  pub fn new(config: DispatchConfig, runner: Arc<dyn Runner>) -> Self {
    let pool = Arc::new(Semaphore::new(config.pool_size));

    Self {
      config: Arc::new(config),
      runner,
      pool,
      state: Arc::new(Mutex::new(DispatchState {
        jobs: HashMap::new(),
        directories: HashMap::new(),
      })),
    }
  }

  /// Extracts the artifact into a fresh working directory, creates the job
  /// with one pending result per runner, and enqueues one execution task
  /// per `(job, runner config)` pair. Returns as soon as the tasks are
  /// spawned; the artifact file is no longer needed once this returns.
  ///
  /// Must be called from within a tokio runtime.
  pub fn submit_job(&self, artifact: &Path, runners: RunnerSet) -> Result<JobId> {
    let job_id = JobId::generate();
    let directory = self.config.work_root.join(job_id.inner());

    fs::create_dir_all(&directory)?;
    if let Err(err) = archive::extract_zip(artifact, &directory) {
      let _ = utils::remove_dir_if_exists(&directory);
      return Err(err);
    }

    let job = Job::new(job_id.clone(), runners.clone());
    let url = self.host_page_url(&job_id);

    {
      let mut state = self.state.lock();
      state.jobs.insert(job_id.clone(), job);
      state.directories.insert(job_id.clone(), directory);
    }

    log::debug!(
      "Job {} submitted for runners [{}]",
      job_id,
      runners.to_tokens()
    );

    for config in runners.iter().cloned() {
      self.spawn_execution(job_id.clone(), config, url.clone());
    }

    Ok(job_id)
  }

  /// Fails with `JobNotFound` once the job has been swept (or never
  /// existed).
  pub fn get_status(&self, job_id: &JobId) -> Result<Job> {
    self
      .state
      .lock()
      .jobs
      .get(job_id)
      .cloned()
      .ok_or_else(|| Error::job_not_found(job_id))
  }

  fn host_page_url(&self, job_id: &JobId) -> String {
    format!(
      "{}/{}/{}",
      self.config.base_url.trim_end_matches('/'),
      job_id,
      crate::HOST_PAGE_NAME
    )
  }

  fn spawn_execution(&self, job_id: JobId, config: RunnerConfig, url: String) {
    let runner = Arc::clone(&self.runner);
    let pool = Arc::clone(&self.pool);
    let state = Arc::clone(&self.state);

    tokio::spawn(async move {
      let permit = match pool.acquire_owned().await {
        Ok(permit) => permit,
        // The pool only closes on process teardown; the result would be
        // discarded anyway.
        Err(_) => return,
      };

      let result = runner.run(config.clone(), &url).await;
      drop(permit);

      let mut state = state.lock();
      match state.jobs.get_mut(&job_id) {
        Some(job) => {
          if let Err(err) = job.write_result(result) {
            log::error!("Dropping result for job {}: {}", job_id, err);
          }
        }
        // Swept while the runner was still executing.
        None => log::trace!("Job {} is gone; discarding result for {}", job_id, config),
      }
    });
  }

  /// Deletes the record and working directory of every terminal job older
  /// than the retention window. Directory deletion is idempotent: a
  /// directory that is already gone is not an error.
  pub fn sweep(&self) {
    let now = chrono::Utc::now();
    let retention =
      chrono::Duration::from_std(self.config.retention).unwrap_or(chrono::Duration::max_value());

    let stale: Vec<(JobId, Option<PathBuf>)> = {
      let mut state = self.state.lock();

      let ids: Vec<JobId> = state
        .jobs
        .iter()
        .filter(|(_, job)| {
          job.status().is_terminal() && now.signed_duration_since(job.created_at()) > retention
        })
        .map(|(id, _)| id.clone())
        .collect();

      ids
        .into_iter()
        .map(|id| {
          state.jobs.remove(&id);
          let directory = state.directories.remove(&id);
          (id, directory)
        })
        .collect()
    };

    for (job_id, directory) in stale {
      log::debug!("Sweeping job {}", job_id);

      if let Some(directory) = directory {
        if let Err(err) = utils::remove_dir_if_exists(&directory) {
          log::warn!("Failed to remove working directory {:?}: {}", directory, err);
        }
      }
    }
  }

  /// Runs the periodic sweep until shutdown.
  pub fn start_sweeper(&self, signal: ShutdownSignal) -> tokio::task::JoinHandle<()> {
    let server = self.clone();
    let interval = self.config.sweep_interval;

    tokio::spawn(async move {
      loop {
        tokio::select! {
          _ = signal.recv() => return,
          _ = tokio::time::sleep(interval) => server.sweep(),
        }
      }
    })
  }
}
