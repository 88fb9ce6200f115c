use crate::{
  BenchmarkCompiler, BenchmarkReport, BenchmarkRun, BenchmarkState, Checkpoint, Commit,
  CommitWatcher, CompilerVariant, DispatchServer, Error, FleetConfig, LogNotifier, ManagerConfig,
  ModuleSource, OperatorNotifier, Progress, Reporter, ReportSink, Result, RunnerSet,
  ShutdownSignal, Worker, WorkerConfig, WorkResult,
};
use std::sync::Arc;

/// Builds the SDK/toolchain for a freshly observed commit before the
/// batch's modules are compiled against it.
#[async_trait::async_trait]
pub trait ToolchainBuilder: Send + Sync {
  async fn build(&self, commit: &Commit) -> Result<()>;
}

pub type ModuleFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// The top-level control loop.
///
/// Single-run mode builds the module list once, runs one batch and prints
/// a report. Daemon mode polls for new commits and runs a batch per
/// commit, failing closed: any non-success outcome notifies the operator
/// sink and halts rather than silently dropping data points.
pub struct Manager {
  config: ManagerConfig,
  worker_config: WorkerConfig,
  runners: RunnerSet,
  modules: Arc<dyn ModuleSource>,
  compiler: Arc<dyn BenchmarkCompiler>,
  dispatch: DispatchServer,
  filter: Option<ModuleFilter>,
  progress: Vec<Progress>,
  reporter: Reporter,
  notifier: Arc<dyn OperatorNotifier>,
  watcher: Option<Arc<dyn CommitWatcher>>,
  toolchain: Option<Arc<dyn ToolchainBuilder>>,
  sink: Option<Arc<dyn ReportSink>>,
  signal: ShutdownSignal,
  checkpoint: Checkpoint,
}

impl Manager {
  pub fn builder() -> ManagerBuilder {
    ManagerBuilder::new()
  }

  pub fn checkpoint(&self) -> &Checkpoint {
    &self.checkpoint
  }

  /// Runs one batch over the discovered modules with the default compiler
  /// variant, prints the formatted report and returns every outcome.
  /// Non-success outcomes are part of the report, not an error: this is a
  /// manual, inspect-the-output workflow.
  pub async fn run_once(&self) -> Result<Vec<BenchmarkRun>> {
    let commit = Commit::workspace();
    let variants = self.config.variants[..1].to_vec();

    let runs = self.run_batch(&commit, &variants).await?;

    println!("{}", render_report(&runs));

    Ok(runs)
  }

  /// Polls for new commits until shutdown. For each new commit: build the
  /// toolchain, run a batch over every (module, variant) pair, and either
  /// report-and-advance the checkpoint or notify the operator and halt.
  pub async fn run_daemon(&mut self) -> Result<()> {
    let watcher = self
      .watcher
      .clone()
      .ok_or_else(|| Error::init_error("Daemon mode requires a commit watcher"))?;
    let toolchain = self
      .toolchain
      .clone()
      .ok_or_else(|| Error::init_error("Daemon mode requires a toolchain builder"))?;
    let sink = self
      .sink
      .clone()
      .ok_or_else(|| Error::init_error("Daemon mode requires a report sink"))?;

    loop {
      if self.signal.is_shutdown() {
        return Ok(());
      }

      match watcher.latest().await {
        Ok(Some(commit)) if self.checkpoint.is_new(&commit) => {
          self
            .run_commit(&commit, toolchain.as_ref(), sink.as_ref())
            .await?;
        }
        Ok(_) => log::trace!("No new commit"),
        // A flaky watcher poll is retried on the next tick; only broken
        // batches halt the daemon.
        Err(err) => log::warn!("Commit watcher poll failed: {}", err),
      }

      tokio::select! {
        _ = self.signal.recv() => return Ok(()),
        _ = tokio::time::sleep(self.config.tick_interval) => {}
      }
    }
  }

  async fn run_commit(
    &mut self,
    commit: &Commit,
    toolchain: &dyn ToolchainBuilder,
    sink: &dyn ReportSink,
  ) -> Result<()> {
    log::info!("Benchmarking commit {}", commit.id);

    if let Err(err) = toolchain.build(commit).await {
      self
        .notify(
          "Toolchain build failed",
          &format!("{}: {}", commit.id, err),
        )
        .await;
      return Err(err);
    }

    let variants = self.config.variants.clone();
    let runs = self.run_batch(commit, &variants).await?;

    let failed = failed_pairs(&runs);
    if !failed.is_empty() {
      let body = failed.join("\n");
      self.notify("Benchmark batch failed", &body).await;

      return Err(Error::error(format!(
        "{} benchmark runs failed for commit {}",
        failed.len(),
        commit.id
      )));
    }

    let report = BenchmarkReport::from_runs(&runs);
    if self.reporter.report(sink, &report, &self.signal).await {
      self.checkpoint.advance(commit);
      log::info!("Checkpoint advanced to {}", commit.id);

      Ok(())
    } else {
      self
        .notify(
          "Report delivery failed",
          &format!("Results for commit {} were not delivered", commit.id),
        )
        .await;

      Err(Error::error(format!(
        "Failed to deliver report for commit {}",
        commit.id
      )))
    }
  }

  /// Submits one worker per (module, variant) pair and drains the
  /// outstanding futures on a fixed interval, merging each completed
  /// result into its pending `BenchmarkRun`.
  async fn run_batch(
    &self,
    commit: &Commit,
    variants: &[CompilerVariant],
  ) -> Result<Vec<BenchmarkRun>> {
    let mut modules = self.modules.discover()?;
    if let Some(filter) = &self.filter {
      modules.retain(|module| filter(module));
    }
    modules.sort();

    let mut runs = Vec::new();
    let mut outstanding = Vec::new();

    for module in &modules {
      for variant in variants {
        let run = BenchmarkRun::pending(
          module.clone(),
          variant.clone(),
          commit.id.clone(),
          commit.timestamp,
          &self.runners,
        );

        let worker = Worker::new(
          module.clone(),
          variant.clone(),
          self.runners.clone(),
          Arc::clone(&self.compiler),
          self.dispatch.clone(),
          self.worker_config.clone(),
        );

        for progress in &self.progress {
          progress.module_submitted(module, variant);
        }

        outstanding.push((runs.len(), tokio::spawn(worker.work())));
        runs.push(run);
      }
    }

    while !outstanding.is_empty() {
      tokio::time::sleep(self.config.drain_interval).await;

      let mut still_outstanding = Vec::with_capacity(outstanding.len());

      for (index, handle) in outstanding {
        if !handle.is_finished() {
          still_outstanding.push((index, handle));
          continue;
        }

        let result = match handle.await {
          Ok(result) => result,
          Err(err) => WorkResult::failed(
            runs[index].module.clone(),
            runs[index].variant.clone(),
            &self.runners,
            BenchmarkState::FailedToRunOnRunner,
            format!("Worker task failed: {}", err),
          ),
        };

        for progress in &self.progress {
          progress.module_completed(&result);
        }

        runs[index].merge(result);
      }

      outstanding = still_outstanding;
    }

    for progress in &self.progress {
      progress.batch_completed(&runs);
    }

    Ok(runs)
  }

  async fn notify(&self, subject: &str, body: &str) {
    if let Err(err) = self.notifier.notify(subject, body).await {
      log::error!("Operator notification failed: {}", err);
    }
  }
}

/// `module (variant): runner` lines for every failed per-runner entry,
/// ready for the operator notification body.
fn failed_pairs(runs: &[BenchmarkRun]) -> Vec<String> {
  let mut pairs = Vec::new();

  for run in runs {
    for config in run.failed_runners() {
      pairs.push(format!(
        "{} ({}): {}",
        run.module,
        run.variant.name(),
        config
      ));
    }
  }

  pairs
}

/// Plain-text table of a finished batch, one block per module.
pub fn render_report(runs: &[BenchmarkRun]) -> String {
  let mut out = String::new();

  for run in runs {
    out.push_str(&format!(
      "{} ({}) [{:?}]\n",
      run.module,
      run.variant.name(),
      run.state
    ));

    let mut entries: Vec<(&_, &_)> = run.results.iter().collect();
    entries.sort_by_key(|(config, _)| config.token());

    for (config, result) in entries {
      match result.runs_per_second {
        Some(runs_per_second) => {
          out.push_str(&format!("  {}: {:.2} runs/s\n", config, runs_per_second))
        }
        None => out.push_str(&format!(
          "  {}: {}\n",
          config,
          result.error_message.as_deref().unwrap_or("not run")
        )),
      }
    }
  }

  out
}

pub struct ManagerBuilder {
  config: ManagerConfig,
  worker_config: WorkerConfig,
  runners: Option<RunnerSet>,
  modules: Option<Arc<dyn ModuleSource>>,
  compiler: Option<Arc<dyn BenchmarkCompiler>>,
  dispatch: Option<DispatchServer>,
  filter: Option<ModuleFilter>,
  progress: Vec<Progress>,
  reporter: Reporter,
  notifier: Arc<dyn OperatorNotifier>,
  watcher: Option<Arc<dyn CommitWatcher>>,
  toolchain: Option<Arc<dyn ToolchainBuilder>>,
  sink: Option<Arc<dyn ReportSink>>,
  signal: ShutdownSignal,
}

impl ManagerBuilder {
  pub fn new() -> Self {
    Self {
      config: ManagerConfig::default(),
      worker_config: WorkerConfig::default(),
      runners: None,
      modules: None,
      compiler: None,
      dispatch: None,
      filter: None,
      progress: Vec::new(),
      reporter: Reporter::default(),
      notifier: Arc::new(LogNotifier),
      watcher: None,
      toolchain: None,
      sink: None,
      signal: ShutdownSignal::new(),
    }
  }

  pub fn config(mut self, config: ManagerConfig) -> Self {
    self.config = config;
    self
  }

  /// Applies the batch-level sections of a fleet config: manager, worker,
  /// runner set and reporter schedule. The dispatch section is consumed
  /// separately by `DispatchServer::new`.
  pub fn fleet_config(mut self, config: &FleetConfig) -> Self {
    self.config = config.manager.clone();
    self.worker_config = config.worker.clone();
    self.runners = Some(config.runners.clone());
    self.reporter = Reporter::new(config.wait_schedule.clone());
    self
  }

  pub fn worker_config(mut self, worker_config: WorkerConfig) -> Self {
    self.worker_config = worker_config;
    self
  }

  pub fn runners(mut self, runners: RunnerSet) -> Self {
    self.runners = Some(runners);
    self
  }

  pub fn modules<T: ModuleSource + 'static>(mut self, modules: T) -> Self {
    self.modules = Some(Arc::new(modules));
    self
  }

  pub fn compiler<T: BenchmarkCompiler + 'static>(mut self, compiler: T) -> Self {
    self.compiler = Some(Arc::new(compiler));
    self
  }

  pub fn dispatch(mut self, dispatch: DispatchServer) -> Self {
    self.dispatch = Some(dispatch);
    self
  }

  /// Modules for which the predicate returns `false` are excluded from
  /// every batch, before submission.
  pub fn filter<T>(mut self, filter: T) -> Self
  where
    T: Fn(&str) -> bool + Send + Sync + 'static,
  {
    self.filter = Some(Arc::new(filter));
    self
  }

  pub fn progress(mut self, progress: Progress) -> Self {
    self.progress.push(progress);
    self
  }

  pub fn reporter(mut self, reporter: Reporter) -> Self {
    self.reporter = reporter;
    self
  }

  pub fn notifier<T: OperatorNotifier + 'static>(mut self, notifier: T) -> Self {
    self.notifier = Arc::new(notifier);
    self
  }

  pub fn watcher<T: CommitWatcher + 'static>(mut self, watcher: T) -> Self {
    self.watcher = Some(Arc::new(watcher));
    self
  }

  pub fn toolchain<T: ToolchainBuilder + 'static>(mut self, toolchain: T) -> Self {
    self.toolchain = Some(Arc::new(toolchain));
    self
  }

  pub fn sink<T: ReportSink + 'static>(mut self, sink: T) -> Self {
    self.sink = Some(Arc::new(sink));
    self
  }

  pub fn signal(mut self, signal: ShutdownSignal) -> Self {
    self.signal = signal;
    self
  }

  pub fn build(self) -> Result<Manager> {
    if self.config.variants.is_empty() {
      return Err(Error::init_error("At least one compiler variant is required"));
    }

    Ok(Manager {
      config: self.config,
      worker_config: self.worker_config,
      runners: self
        .runners
        .ok_or_else(|| Error::init_error("Manager requires a runner set"))?,
      modules: self
        .modules
        .ok_or_else(|| Error::init_error("Manager requires a module source"))?,
      compiler: self
        .compiler
        .ok_or_else(|| Error::init_error("Manager requires a compiler"))?,
      dispatch: self
        .dispatch
        .ok_or_else(|| Error::init_error("Manager requires a dispatch server"))?,
      filter: self.filter,
      progress: self.progress,
      reporter: self.reporter,
      notifier: self.notifier,
      watcher: self.watcher,
      toolchain: self.toolchain,
      sink: self.sink,
      signal: self.signal,
      checkpoint: Checkpoint::new(),
    })
  }
}

impl Default for ManagerBuilder {
  fn default() -> Self {
    Self::new()
  }
}
