mod archive;
mod config;
mod dispatch;
mod job;
mod manager;
mod modules;
mod progress;
mod reporter;
mod runner;
mod signal;
mod types;
mod utils;
mod watcher;
mod worker;

pub use archive::*;
pub use async_trait::async_trait;
pub use config::*;
pub use dispatch::*;
pub use job::*;
pub use manager::*;
pub use modules::*;
pub use progress::*;
pub use reporter::*;
pub use runner::*;
pub use signal::*;
pub use types::*;
pub use watcher::*;
pub use worker::*;

pub type Result<T> = std::result::Result<T, Error>;
