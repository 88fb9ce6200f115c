use colored::Colorize;
use log::Level;
use std::sync::OnceLock;

#[derive(Clone)]
pub struct Logger {
  max_level: Level,
}

impl log::Log for Logger {
  fn enabled(&self, metadata: &log::Metadata) -> bool {
    metadata.level() <= self.max_level
  }

  fn log(&self, record: &log::Record) {
    if !self.enabled(record.metadata()) {
      return;
    }

    let time = chrono::Local::now()
      .format("%Y-%m-%d %H:%M:%S")
      .to_string()
      .magenta();

    let level = match record.level() {
      Level::Error => "ERROR".red(),
      Level::Warn => "WARN".yellow(),
      Level::Info => "INFO".green(),
      Level::Debug => "DEBUG".green(),
      Level::Trace => "TRACE".green(),
    };

    let prefix = match (record.file(), record.line()) {
      (Some(file), Some(line)) => format!("{}:{} ", file, line).cyan(),
      _ => String::new().black(),
    };

    let log = format!("{}{} {} {}", prefix, time, level, record.args());
    println!("{}", log);
  }

  fn flush(&self) {}
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

pub fn init_logger() {
  init_logger_with_level(Level::Debug);
}

/// Idempotent: the first call wins, later calls (e.g. from every test in a
/// binary) are no-ops.
pub fn init_logger_with_level(max_level: Level) {
  let logger = LOGGER.get_or_init(|| Logger { max_level });

  if log::set_logger(logger).is_ok() {
    log::set_max_level(max_level.to_level_filter());
  }
}
