use crate::{RemoteSession, SessionFactory};
use benchfleet::{Error, JobResult, Result, Runner, RunnerConfig, RunnerTimeouts};
use std::{sync::Arc, time::Duration};

/// Scripts evaluated in the host page to observe the benchmark. The
/// defaults match the probe object the worker's host page template
/// publishes.
#[derive(Debug, Clone)]
pub struct ProbeScripts {
  pub done: String,
  pub failed: String,
  pub runs_per_second: String,
}

impl Default for ProbeScripts {
  fn default() -> Self {
    Self {
      done: "return !!(window.__benchfleet && window.__benchfleet.done);".to_string(),
      failed: "return !!window.__benchfleet.failed;".to_string(),
      runs_per_second: "return window.__benchfleet.runsPerSecond;".to_string(),
    }
  }
}

/// Runs one benchmark in a remote browser session: navigate to the host
/// page, poll the readiness probe at a fixed interval within a wall-clock
/// budget, then read the failure flag and the measured rate.
///
/// The session is released on every path; a timed-out or crashed execution
/// must not leak a browser.
pub struct RemoteRunner {
  factory: Arc<dyn SessionFactory>,
  poll_interval: Duration,
  timeout: Duration,
  probes: ProbeScripts,
}

impl RemoteRunner {
  pub fn new(factory: Arc<dyn SessionFactory>) -> Self {
    let timeouts = RunnerTimeouts::default();

    Self {
      factory,
      poll_interval: timeouts.poll_interval,
      timeout: timeouts.timeout,
      probes: ProbeScripts::default(),
    }
  }

  pub fn timeouts(mut self, timeouts: RunnerTimeouts) -> Self {
    self.poll_interval = timeouts.poll_interval;
    self.timeout = timeouts.timeout;
    self
  }

  pub fn probes(mut self, probes: ProbeScripts) -> Self {
    self.probes = probes;
    self
  }

  async fn drive(&self, session: &mut dyn RemoteSession, url: &str) -> Result<f64> {
    // The budget covers everything from session start, navigation
    // included.
    let started = tokio::time::Instant::now();

    session.navigate(url).await?;

    loop {
      if session.eval_bool(&self.probes.done).await? {
        break;
      }

      if started.elapsed() >= self.timeout {
        return Err(Error::Timeout);
      }

      tokio::time::sleep(self.poll_interval).await;
    }

    if session.eval_bool(&self.probes.failed).await? {
      return Err(Error::TargetReportedFailure);
    }

    session.eval_number(&self.probes.runs_per_second).await
  }
}

#[benchfleet::async_trait]
impl Runner for RemoteRunner {
  async fn run(&self, config: RunnerConfig, url: &str) -> JobResult {
    log::debug!("Opening remote session for {}", config);

    let mut session = match self.factory.open(&config).await {
      Ok(session) => session,
      Err(err) => {
        log::warn!("Failed to open remote session for {}: {}", config, err);
        return JobResult::failure(config, err.to_string());
      }
    };

    let outcome = self.drive(session.as_mut(), url).await;

    if let Err(err) = session.close().await {
      log::warn!("Failed to close remote session for {}: {}", config, err);
    }

    match outcome {
      Ok(runs_per_second) => {
        log::debug!("{} finished at {:.2} runs/s", config, runs_per_second);
        JobResult::success(config, runs_per_second)
      }
      Err(err) => {
        log::debug!("{} failed: {}", config, err);
        JobResult::failure(config, err.to_string())
      }
    }
  }
}
