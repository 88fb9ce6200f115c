mod error;
mod id;
mod results;
mod runner_config;

pub use error::*;
pub use id::*;
pub use results::*;
pub use runner_config::*;

pub type Time = chrono::DateTime<chrono::Utc>;
