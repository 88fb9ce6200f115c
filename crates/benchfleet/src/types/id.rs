use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type Id = String;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Hash, Eq)]
pub struct JobId(Id);

impl JobId {
  pub fn generate() -> Self {
    JobId(uuid::Uuid::new_v4().to_string())
  }

  pub fn inner(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for JobId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl TryFrom<&str> for JobId {
  type Error = Error;

  fn try_from(value: &str) -> Result<Self, Self::Error> {
    if value.is_empty() {
      Err(Error::error("JobId cannot be empty"))
    } else {
      Ok(JobId(value.to_string()))
    }
  }
}
