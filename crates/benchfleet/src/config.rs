use crate::{
  CompilerVariant, DispatchConfig, Error, Result, RunnerSet, WorkerConfig, DEFAULT_WAIT_SCHEDULE,
};
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

#[derive(Debug, Clone)]
pub struct ManagerConfig {
  /// Interval between passes over the outstanding worker futures.
  pub drain_interval: Duration,
  /// Daemon tick: interval between commit-watcher polls.
  pub tick_interval: Duration,
  /// Compiler variants a daemon batch fans out over. Single-run batches
  /// use the first entry only.
  pub variants: Vec<CompilerVariant>,
}

impl Default for ManagerConfig {
  fn default() -> Self {
    Self {
      drain_interval: Duration::from_millis(500),
      tick_interval: Duration::from_secs(60),
      variants: vec![CompilerVariant::default()],
    }
  }
}

/// Budgets for one remote runner execution, shared by the dispatch layer's
/// embedders and the runner implementation.
#[derive(Debug, Clone)]
pub struct RunnerTimeouts {
  /// Interval between readiness probes.
  pub poll_interval: Duration,
  /// Wall-clock budget from session start; the only bound on a runner's
  /// worst-case runtime.
  pub timeout: Duration,
}

impl Default for RunnerTimeouts {
  fn default() -> Self {
    Self {
      poll_interval: Duration::from_secs(1),
      timeout: Duration::from_secs(120),
    }
  }
}

/// Whole-fleet configuration, loadable from a YAML file. Every section has
/// a default, so a minimal file only names the runner fleet:
///
/// ```yaml
/// runners:
///   - linux chrome
///   - windows ie IE11
/// ```
#[derive(Debug, Clone)]
pub struct FleetConfig {
  pub runners: RunnerSet,
  pub dispatch: DispatchConfig,
  pub worker: WorkerConfig,
  pub manager: ManagerConfig,
  pub runner_timeouts: RunnerTimeouts,
  pub wait_schedule: Vec<Duration>,
}

impl FleetConfig {
  pub fn new(runners: RunnerSet) -> Self {
    Self {
      runners,
      dispatch: DispatchConfig::default(),
      worker: WorkerConfig::default(),
      manager: ManagerConfig::default(),
      runner_timeouts: RunnerTimeouts::default(),
      wait_schedule: DEFAULT_WAIT_SCHEDULE
        .iter()
        .map(|secs| Duration::from_secs(*secs))
        .collect(),
    }
  }

  pub fn from_yaml(source: &str) -> Result<Self> {
    let raw: RawFleetConfig = serde_yaml::from_str(source)
      .map_err(|err| Error::error(format!("Failed to parse fleet config: {}", err)))?;

    raw.try_into()
  }

  pub fn load(path: &std::path::Path) -> Result<Self> {
    let source = std::fs::read_to_string(path)?;

    Self::from_yaml(&source)
  }
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct RawFleetConfig {
  runners: Vec<String>,
  work_root: Option<PathBuf>,
  out_root: Option<PathBuf>,
  base_url: Option<String>,
  pool_size: Option<usize>,
  retention: Option<String>,
  sweep_interval: Option<String>,
  status_poll_interval: Option<String>,
  drain_interval: Option<String>,
  tick_interval: Option<String>,
  runner_poll_interval: Option<String>,
  runner_timeout: Option<String>,
  variants: Option<Vec<String>>,
  wait_schedule: Option<Vec<String>>,
}

impl TryFrom<RawFleetConfig> for FleetConfig {
  type Error = Error;

  fn try_from(raw: RawFleetConfig) -> Result<Self> {
    let runners = RunnerSet::parse(&raw.runners.join(","))?;
    let mut config = FleetConfig::new(runners);

    if let Some(work_root) = raw.work_root {
      config.dispatch.work_root = work_root;
    }
    if let Some(out_root) = raw.out_root {
      config.worker.out_root = out_root;
    }
    if let Some(base_url) = raw.base_url {
      config.dispatch.base_url = base_url;
    }
    if let Some(pool_size) = raw.pool_size {
      config.dispatch.pool_size = pool_size;
    }
    if let Some(retention) = raw.retention {
      config.dispatch.retention = parse_duration("retention", &retention)?;
    }
    if let Some(sweep_interval) = raw.sweep_interval {
      config.dispatch.sweep_interval = parse_duration("sweep_interval", &sweep_interval)?;
    }
    if let Some(status_poll_interval) = raw.status_poll_interval {
      config.worker.status_poll_interval =
        parse_duration("status_poll_interval", &status_poll_interval)?;
    }
    if let Some(drain_interval) = raw.drain_interval {
      config.manager.drain_interval = parse_duration("drain_interval", &drain_interval)?;
    }
    if let Some(tick_interval) = raw.tick_interval {
      config.manager.tick_interval = parse_duration("tick_interval", &tick_interval)?;
    }
    if let Some(runner_poll_interval) = raw.runner_poll_interval {
      config.runner_timeouts.poll_interval =
        parse_duration("runner_poll_interval", &runner_poll_interval)?;
    }
    if let Some(runner_timeout) = raw.runner_timeout {
      config.runner_timeouts.timeout = parse_duration("runner_timeout", &runner_timeout)?;
    }
    if let Some(variants) = raw.variants {
      if variants.is_empty() {
        return Err(Error::error("variants must not be empty"));
      }
      config.manager.variants = variants.into_iter().map(CompilerVariant::new).collect();
    }
    if let Some(wait_schedule) = raw.wait_schedule {
      config.wait_schedule = wait_schedule
        .iter()
        .map(|entry| parse_duration("wait_schedule", entry))
        .collect::<Result<Vec<_>>>()?;
    }

    Ok(config)
  }
}

fn parse_duration(field: &str, value: &str) -> Result<Duration> {
  humantime::parse_duration(value)
    .map_err(|err| Error::error(format!("Invalid {} {:?}: {}", field, value, err)))
}
