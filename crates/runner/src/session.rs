use benchfleet::{Result, RunnerConfig};

/// One remote browser session. The remote-automation wire protocol lives
/// behind this seam; the runner only needs navigation and the two probe
/// evaluations.
///
/// Sessions are single-use: opened for one benchmark execution and closed
/// by the runner on every path.
#[benchfleet::async_trait]
pub trait RemoteSession: Send {
  async fn navigate(&mut self, url: &str) -> Result<()>;
  async fn eval_bool(&mut self, script: &str) -> Result<bool>;
  async fn eval_number(&mut self, script: &str) -> Result<f64>;
  async fn close(&mut self) -> Result<()>;
}

/// Opens sessions against the remote automation service for a given
/// execution target.
#[benchfleet::async_trait]
pub trait SessionFactory: Send + Sync {
  async fn open(&self, config: &RunnerConfig) -> Result<Box<dyn RemoteSession>>;
}
