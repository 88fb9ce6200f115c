#[derive(thiserror::Error, Debug)]
pub enum Error {
  #[error("Failed to create output directory: {0}")]
  CreateDirFailed(String),

  #[error("Compile failed: {0}")]
  CompileFailed(String),

  #[error("Failed to generate host page: {0}")]
  HostPageFailed(String),

  #[error("Failed to package artifact: {0}")]
  ZipFailed(String),

  #[error("Timeout")]
  Timeout,

  #[error("Benchmark reported failure")]
  TargetReportedFailure,

  #[error("Remote session error: {0}")]
  SessionError(String),

  #[error("Job {0} not found")]
  JobNotFound(String),

  #[error("A job must have at least one runner")]
  EmptyRunnerSet,

  #[error("Invalid runner token: {0}")]
  InvalidRunnerToken(String),

  #[error("Failed to initialize: {0}")]
  InitError(String),

  #[error("Error: {0}")]
  Error(String),

  #[error("IO error: {0}")]
  IOError(#[from] std::io::Error),
}

impl Error {
  pub fn create_dir_failed<T: ToString>(message: T) -> Self {
    Self::CreateDirFailed(message.to_string())
  }

  pub fn compile_failed<T: ToString>(message: T) -> Self {
    Self::CompileFailed(message.to_string())
  }

  pub fn host_page_failed<T: ToString>(message: T) -> Self {
    Self::HostPageFailed(message.to_string())
  }

  pub fn zip_failed<T: ToString>(message: T) -> Self {
    Self::ZipFailed(message.to_string())
  }

  pub fn session_error<T: ToString>(message: T) -> Self {
    Self::SessionError(message.to_string())
  }

  pub fn job_not_found<T: ToString>(job_id: T) -> Self {
    Self::JobNotFound(job_id.to_string())
  }

  pub fn invalid_runner_token<T: ToString>(token: T) -> Self {
    Self::InvalidRunnerToken(token.to_string())
  }

  pub fn init_error<T: ToString>(message: T) -> Self {
    Self::InitError(message.to_string())
  }

  pub fn error<T: ToString>(message: T) -> Self {
    Self::Error(message.to_string())
  }
}

// implement PartialEq for Error so that we can compare errors in tests
impl PartialEq for Error {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Self::CreateDirFailed(a), Self::CreateDirFailed(b)) => a == b,
      (Self::CompileFailed(a), Self::CompileFailed(b)) => a == b,
      (Self::HostPageFailed(a), Self::HostPageFailed(b)) => a == b,
      (Self::ZipFailed(a), Self::ZipFailed(b)) => a == b,
      (Self::Timeout, Self::Timeout) => true,
      (Self::TargetReportedFailure, Self::TargetReportedFailure) => true,
      (Self::SessionError(a), Self::SessionError(b)) => a == b,
      (Self::JobNotFound(a), Self::JobNotFound(b)) => a == b,
      (Self::EmptyRunnerSet, Self::EmptyRunnerSet) => true,
      (Self::InvalidRunnerToken(a), Self::InvalidRunnerToken(b)) => a == b,
      (Self::InitError(a), Self::InitError(b)) => a == b,
      (Self::Error(a), Self::Error(b)) => a == b,
      (Self::IOError(a), Self::IOError(b)) => a.kind() == b.kind(),
      _ => false,
    }
  }
}
