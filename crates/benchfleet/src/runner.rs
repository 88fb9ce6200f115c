use crate::{JobResult, RunnerConfig};

/// # Runner
///
/// Executes one compiled benchmark against one target and reports the
/// per-runner outcome. A runner's failure is data, not an error: `run`
/// always produces a terminal `JobResult`, so one runner timing out or
/// crashing never fails its siblings in the same job.
///
/// The dispatch server invokes `run` from a pooled task, one task per
/// `(job, runner config)` pair.
///
/// ## Example
///
/// ```rust
/// struct FixedRunner;
///
/// #[benchfleet::async_trait]
/// impl benchfleet::Runner for FixedRunner {
///   async fn run(&self, config: benchfleet::RunnerConfig, _url: &str) -> benchfleet::JobResult {
///     benchfleet::JobResult::success(config, 42.0)
///   }
/// }
/// ```
#[async_trait::async_trait]
pub trait Runner: Send + Sync {
  async fn run(&self, config: RunnerConfig, url: &str) -> JobResult;
}
