use crate::{Error, JobId, JobResult, Result, RunnerConfig, RunnerSet, Time};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
  Created,
  Running,
  Finished,
  Failed,
}

impl JobStatus {
  pub fn is_terminal(&self) -> bool {
    matches!(self, JobStatus::Finished | JobStatus::Failed)
  }
}

/// The fan-out of one compiled artifact across all requested runners,
/// tracked as one aggregate unit.
///
/// The result map is total from creation on: one entry per expected runner,
/// pre-populated in the pending state. Each runner task performs exactly one
/// terminal write against its own entry, and the derived status is
/// recomputed from the full map after every write, so it is never computed
/// from a counter that could race.
#[derive(Debug, Clone)]
pub struct Job {
  id: JobId,
  expected: RunnerSet,
  results: HashMap<RunnerConfig, JobResult>,
  status: JobStatus,
  created_at: Time,
}

impl Job {
  pub fn new(id: JobId, expected: RunnerSet) -> Self {
    let results = expected
      .iter()
      .map(|config| (config.clone(), JobResult::pending(config.clone())))
      .collect();

    Self {
      id,
      expected,
      results,
      status: JobStatus::Created,
      created_at: chrono::Utc::now(),
    }
  }

  pub fn id(&self) -> &JobId {
    &self.id
  }

  pub fn status(&self) -> JobStatus {
    self.status
  }

  pub fn expected_runners(&self) -> &RunnerSet {
    &self.expected
  }

  pub fn results(&self) -> &HashMap<RunnerConfig, JobResult> {
    &self.results
  }

  pub fn result(&self, config: &RunnerConfig) -> Option<&JobResult> {
    self.results.get(config)
  }

  pub fn created_at(&self) -> Time {
    self.created_at
  }

  /// Writes one runner's terminal result and recomputes the job status.
  /// The runner must be one of the expected runners and must not have
  /// reported before.
  pub fn write_result(&mut self, result: JobResult) -> Result<()> {
    let entry = self
      .results
      .get_mut(&result.runner_config)
      .ok_or_else(|| {
        Error::error(format!(
          "Runner {} is not part of job {}",
          result.runner_config, self.id
        ))
      })?;

    if entry.is_terminal() {
      return Err(Error::error(format!(
        "Runner {} already reported for job {}",
        result.runner_config, self.id
      )));
    }

    *entry = result;
    self.recompute_status();

    Ok(())
  }

  fn recompute_status(&mut self) {
    let reported = self.results.values().filter(|r| r.is_terminal()).count();

    self.status = if reported == 0 {
      JobStatus::Created
    } else if reported < self.results.len() {
      JobStatus::Running
    } else if self.results.values().all(|r| r.succeeded) {
      JobStatus::Finished
    } else {
      JobStatus::Failed
    };
  }

  pub fn view(&self) -> JobView {
    let counter = self.results.values().filter(|r| r.is_terminal()).count();
    let failed_counter = self
      .results
      .values()
      .filter(|r| r.is_terminal() && !r.succeeded)
      .count();

    JobView {
      job_id: self.id.to_string(),
      status: self.status,
      counter,
      failed_counter,
      expected_results: self.expected.len(),
      job_results_by_runner_id: self
        .results
        .iter()
        .map(|(config, result)| (config.token(), result.clone()))
        .collect(),
      runner_configs: self.expected.configs().to_vec(),
      creation_time_in_ms_epoch: self.created_at.timestamp_millis(),
    }
  }
}

/// Serializable status snapshot in the wire shape the status endpoint
/// exposes; runner results are keyed by runner token.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
  pub job_id: String,
  pub status: JobStatus,
  pub counter: usize,
  pub failed_counter: usize,
  pub expected_results: usize,
  pub job_results_by_runner_id: BTreeMap<String, JobResult>,
  pub runner_configs: Vec<RunnerConfig>,
  pub creation_time_in_ms_epoch: i64,
}
