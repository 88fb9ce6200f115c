use crate::{BenchmarkRun, Result, RunState, ShutdownSignal};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, time::Duration};

/// Immutable snapshot handed to the reporting sink: one score per
/// successful (module, runner) pair, keyed by the commit under test. The
/// snapshot is built only after the batch has fully drained, so no live
/// map is ever shared with the sink.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkReport {
  pub commit_id: String,
  pub commit_timestamp: i64,
  pub results_by_module: BTreeMap<String, Vec<RunnerScore>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunnerScore {
  pub runner_id: String,
  pub runs_per_second: f64,
}

impl BenchmarkReport {
  pub fn from_runs(runs: &[BenchmarkRun]) -> Self {
    let commit_id = runs
      .first()
      .map(|run| run.commit_id.clone())
      .unwrap_or_default();
    let commit_timestamp = runs
      .first()
      .map(|run| run.commit_timestamp.timestamp_millis())
      .unwrap_or_default();

    let mut results_by_module: BTreeMap<String, Vec<RunnerScore>> = BTreeMap::new();

    for run in runs {
      let scores = results_by_module.entry(run.module.clone()).or_default();

      let mut entries: Vec<(&_, &_)> = run.results.iter().collect();
      entries.sort_by_key(|(config, _)| config.token());

      for (config, result) in entries {
        if result.state == RunState::SuccessfulRun {
          scores.push(RunnerScore {
            runner_id: config.token(),
            runs_per_second: result.runs_per_second.unwrap_or(0.0),
          });
        }
      }
    }

    Self {
      commit_id,
      commit_timestamp,
      results_by_module,
    }
  }
}

/// Durable destination for aggregated reports. Writes are keyed by commit
/// id and must be last-write-wins idempotent: transmission can partially
/// fail and be repeated with the same payload.
#[async_trait::async_trait]
pub trait ReportSink: Send + Sync {
  async fn publish(&self, report: &BenchmarkReport) -> Result<()>;
}

/// Notified when a daemon batch fails or report delivery is given up on.
#[async_trait::async_trait]
pub trait OperatorNotifier: Send + Sync {
  async fn notify(&self, subject: &str, body: &str) -> Result<()>;
}

/// Default operator sink: the process log. Mail/chat integrations live
/// outside this crate behind the same trait.
pub struct LogNotifier;

#[async_trait::async_trait]
impl OperatorNotifier for LogNotifier {
  async fn notify(&self, subject: &str, body: &str) -> Result<()> {
    log::error!("{}: {}", subject, body);
    Ok(())
  }
}

/// Default backoff schedule between transmission attempts, in seconds.
pub const DEFAULT_WAIT_SCHEDULE: [u64; 5] = [1, 10, 100, 1000, 1000];

/// Pushes a report to a sink, retrying on a fixed ascending schedule.
/// `schedule.len() + 1` attempts are made in total: one up front, then one
/// after each backoff sleep.
pub struct Reporter {
  schedule: Vec<Duration>,
}

impl Default for Reporter {
  fn default() -> Self {
    Self::new(
      DEFAULT_WAIT_SCHEDULE
        .iter()
        .map(|secs| Duration::from_secs(*secs))
        .collect(),
    )
  }
}

impl Reporter {
  pub fn new(schedule: Vec<Duration>) -> Self {
    Self { schedule }
  }

  /// Returns `true` once the sink accepted the report, `false` after the
  /// schedule is exhausted or a shutdown arrives during a backoff sleep.
  /// Permanent failure is reported exactly once, here, not per attempt.
  pub async fn report(
    &self,
    sink: &dyn ReportSink,
    report: &BenchmarkReport,
    signal: &ShutdownSignal,
  ) -> bool {
    for attempt in 0..=self.schedule.len() {
      match sink.publish(report).await {
        Ok(()) => {
          log::info!(
            "Report for commit {} delivered on attempt {}",
            report.commit_id,
            attempt + 1
          );
          return true;
        }
        Err(err) => {
          log::warn!(
            "Report attempt {} for commit {} failed: {}",
            attempt + 1,
            report.commit_id,
            err
          );

          if attempt == self.schedule.len() {
            break;
          }

          tokio::select! {
            _ = signal.recv() => {
              log::info!("Report retries interrupted by shutdown");
              return false;
            }
            _ = tokio::time::sleep(self.schedule[attempt]) => {}
          }
        }
      }
    }

    log::error!(
      "Report for commit {} permanently failed after {} attempts",
      report.commit_id,
      self.schedule.len() + 1
    );

    false
  }
}
