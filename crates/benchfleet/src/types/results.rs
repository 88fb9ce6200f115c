use crate::{RunnerConfig, RunnerSet, Time};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-runner outcome inside a dispatched job. Starts with `ran = false`;
/// exactly one terminal write (success or failure) is permitted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
  pub runner_config: RunnerConfig,
  pub ran: bool,
  pub succeeded: bool,
  #[serde(rename = "result")]
  pub runs_per_second: Option<f64>,
  pub error_message: Option<String>,
}

impl JobResult {
  pub fn pending(runner_config: RunnerConfig) -> Self {
    Self {
      runner_config,
      ran: false,
      succeeded: false,
      runs_per_second: None,
      error_message: None,
    }
  }

  pub fn success(runner_config: RunnerConfig, runs_per_second: f64) -> Self {
    Self {
      runner_config,
      ran: true,
      succeeded: true,
      runs_per_second: Some(runs_per_second),
      error_message: None,
    }
  }

  pub fn failure(runner_config: RunnerConfig, error_message: impl Into<String>) -> Self {
    Self {
      runner_config,
      ran: true,
      succeeded: false,
      runs_per_second: None,
      error_message: Some(error_message.into()),
    }
  }

  pub fn is_terminal(&self) -> bool {
    self.ran
  }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
  NotRun,
  FailedRun,
  SuccessfulRun,
}

/// Per-runner entry of a `BenchmarkRun`, after the job outcome has been
/// folded together with the compile/dispatch outcome.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunnerResult {
  pub state: RunState,
  pub runs_per_second: Option<f64>,
  pub error_message: Option<String>,
}

impl RunnerResult {
  pub fn not_run() -> Self {
    Self {
      state: RunState::NotRun,
      runs_per_second: None,
      error_message: None,
    }
  }

  pub fn succeeded(runs_per_second: f64) -> Self {
    Self {
      state: RunState::SuccessfulRun,
      runs_per_second: Some(runs_per_second),
      error_message: None,
    }
  }

  pub fn failed(error_message: impl Into<String>) -> Self {
    Self {
      state: RunState::FailedRun,
      runs_per_second: None,
      error_message: Some(error_message.into()),
    }
  }
}

/// Terminal classification of one compile+dispatch invocation. Exactly one
/// state is produced per worker invocation; `Done` is the only success.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkState {
  NotRun,
  FailedToCreateDir,
  FailedCompile,
  FailedHostPageGeneration,
  FailedToZip,
  FailedToRunOnRunner,
  Done,
}

impl BenchmarkState {
  pub fn is_terminal(&self) -> bool {
    !matches!(self, BenchmarkState::NotRun)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, BenchmarkState::Done)
  }
}

/// Named compiler configuration. Daemon batches compile every module once
/// per variant; single-run batches use the default variant only.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompilerVariant(String);

impl CompilerVariant {
  pub fn new(name: impl Into<String>) -> Self {
    CompilerVariant(name.into())
  }

  pub fn name(&self) -> &str {
    &self.0
  }
}

impl Default for CompilerVariant {
  fn default() -> Self {
    CompilerVariant("optimized".to_string())
  }
}

/// Outcome of one worker invocation: the terminal classification plus one
/// `RunnerResult` per requested runner.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkResult {
  pub module: String,
  pub variant: CompilerVariant,
  pub state: BenchmarkState,
  pub error_message: Option<String>,
  pub results: HashMap<RunnerConfig, RunnerResult>,
}

impl WorkResult {
  /// A compile/dispatch-class failure: no runner ever ran, so every entry
  /// is forced to `FailedRun` carrying the failure message.
  pub fn failed(
    module: impl Into<String>,
    variant: CompilerVariant,
    runners: &RunnerSet,
    state: BenchmarkState,
    error_message: impl Into<String>,
  ) -> Self {
    let error_message = error_message.into();
    let results = runners
      .iter()
      .map(|config| (config.clone(), RunnerResult::failed(error_message.clone())))
      .collect();

    Self {
      module: module.into(),
      variant,
      state,
      error_message: Some(error_message),
      results,
    }
  }

  pub fn is_success(&self) -> bool {
    self.state.is_success()
  }
}

/// One module's full outcome for one submission batch: compile, dispatch
/// and every per-runner result, stamped with the commit under test.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkRun {
  pub module: String,
  pub variant: CompilerVariant,
  pub commit_id: String,
  pub commit_timestamp: Time,
  pub state: BenchmarkState,
  pub results: HashMap<RunnerConfig, RunnerResult>,
}

impl BenchmarkRun {
  pub fn pending(
    module: impl Into<String>,
    variant: CompilerVariant,
    commit_id: impl Into<String>,
    commit_timestamp: Time,
    runners: &RunnerSet,
  ) -> Self {
    let results = runners
      .iter()
      .map(|config| (config.clone(), RunnerResult::not_run()))
      .collect();

    Self {
      module: module.into(),
      variant,
      commit_id: commit_id.into(),
      commit_timestamp,
      state: BenchmarkState::NotRun,
      results,
    }
  }

  /// Folds a completed worker outcome into this record. Called exactly once
  /// per run, from the manager's drain step.
  pub fn merge(&mut self, result: WorkResult) {
    self.state = result.state;
    self.results = result.results;
  }

  pub fn is_success(&self) -> bool {
    self.state.is_success()
  }

  /// Runner configs whose entry is `FailedRun`, in the daemon's
  /// operator-notification order.
  pub fn failed_runners(&self) -> Vec<&RunnerConfig> {
    let mut failed: Vec<&RunnerConfig> = self
      .results
      .iter()
      .filter(|(_, result)| result.state == RunState::FailedRun)
      .map(|(config, _)| config)
      .collect();

    failed.sort_by_key(|config| config.token());
    failed
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{Browser, Os};

  fn runners() -> RunnerSet {
    RunnerSet::new(vec![
      RunnerConfig::new(Os::Linux, Browser::Chrome),
      RunnerConfig::new(Os::Linux, Browser::Firefox),
    ])
    .unwrap()
  }

  #[test]
  fn test_job_result_terminal_flags() {
    let config = RunnerConfig::new(Os::Linux, Browser::Chrome);

    let pending = JobResult::pending(config.clone());
    assert!(!pending.is_terminal());
    assert!(!pending.succeeded);

    let success = JobResult::success(config.clone(), 2.0);
    assert!(success.is_terminal());
    assert!(success.succeeded);
    assert_eq!(success.runs_per_second, Some(2.0));

    let failure = JobResult::failure(config, "Timeout");
    assert!(failure.is_terminal());
    assert!(!failure.succeeded);
    assert_eq!(failure.error_message.as_deref(), Some("Timeout"));
  }

  #[test]
  fn test_failed_work_result_forces_all_runners() {
    let runners = runners();
    let result = WorkResult::failed(
      "richards",
      CompilerVariant::default(),
      &runners,
      BenchmarkState::FailedCompile,
      "bad syntax",
    );

    assert_eq!(result.state, BenchmarkState::FailedCompile);
    assert_eq!(result.results.len(), 2);
    for config in runners.iter() {
      let entry = &result.results[config];
      assert_eq!(entry.state, RunState::FailedRun);
      assert_eq!(entry.error_message.as_deref(), Some("bad syntax"));
    }
  }

  #[test]
  fn test_benchmark_run_merge() {
    let runners = runners();
    let mut run = BenchmarkRun::pending(
      "deltablue",
      CompilerVariant::default(),
      "abc123",
      chrono::Utc::now(),
      &runners,
    );

    assert_eq!(run.state, BenchmarkState::NotRun);
    assert!(run.results.values().all(|r| r.state == RunState::NotRun));

    let mut results = HashMap::new();
    for config in runners.iter() {
      results.insert(config.clone(), RunnerResult::succeeded(5.0));
    }

    run.merge(WorkResult {
      module: "deltablue".to_string(),
      variant: CompilerVariant::default(),
      state: BenchmarkState::Done,
      error_message: None,
      results,
    });

    assert!(run.is_success());
    assert!(run.failed_runners().is_empty());
  }
}
