use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Browser {
  Chrome,
  Firefox,
  Safari,
  Edge,
  InternetExplorer,
}

impl Browser {
  pub fn token(&self) -> &'static str {
    match self {
      Browser::Chrome => "chrome",
      Browser::Firefox => "firefox",
      Browser::Safari => "safari",
      Browser::Edge => "edge",
      Browser::InternetExplorer => "ie",
    }
  }

  fn from_token(token: &str) -> Option<Self> {
    match token {
      "chrome" => Some(Browser::Chrome),
      "firefox" => Some(Browser::Firefox),
      "safari" => Some(Browser::Safari),
      "edge" => Some(Browser::Edge),
      "ie" => Some(Browser::InternetExplorer),
      _ => None,
    }
  }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Os {
  Linux,
  Windows,
  MacOs,
}

impl Os {
  pub fn token(&self) -> &'static str {
    match self {
      Os::Linux => "linux",
      Os::Windows => "windows",
      Os::MacOs => "macos",
    }
  }

  fn from_token(token: &str) -> Option<Self> {
    match token {
      "linux" => Some(Os::Linux),
      "windows" => Some(Os::Windows),
      "macos" => Some(Os::MacOs),
      _ => None,
    }
  }
}

/// One (browser, OS, version) execution target. Structural equality; used
/// as the key of every per-runner result map.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunnerConfig {
  pub os: Os,
  pub browser: Browser,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub version: Option<String>,
}

impl RunnerConfig {
  pub fn new(os: Os, browser: Browser) -> Self {
    Self {
      os,
      browser,
      version: None,
    }
  }

  pub fn with_version(os: Os, browser: Browser, version: impl Into<String>) -> Self {
    Self {
      os,
      browser,
      version: Some(version.into()),
    }
  }

  /// Token form: `os browser [version]`, e.g. `linux chrome` or
  /// `windows ie IE11`.
  pub fn token(&self) -> String {
    match &self.version {
      Some(version) => format!("{} {} {}", self.os.token(), self.browser.token(), version),
      None => format!("{} {}", self.os.token(), self.browser.token()),
    }
  }
}

impl fmt::Display for RunnerConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.token())
  }
}

impl TryFrom<&str> for RunnerConfig {
  type Error = Error;

  fn try_from(value: &str) -> Result<Self> {
    let parts: Vec<&str> = value.split_whitespace().collect();

    let (os, browser) = match parts.as_slice() {
      [os, browser] | [os, browser, _] => (*os, *browser),
      _ => return Err(Error::invalid_runner_token(value)),
    };

    let os = Os::from_token(os).ok_or_else(|| Error::invalid_runner_token(value))?;
    let browser = Browser::from_token(browser).ok_or_else(|| Error::invalid_runner_token(value))?;

    Ok(match parts.as_slice() {
      [_, _, version] => RunnerConfig::with_version(os, browser, *version),
      _ => RunnerConfig::new(os, browser),
    })
  }
}

/// Ordered, duplicate-free, non-empty set of runner configs. Submitting a
/// job with no runners is invalid, so emptiness is rejected here instead of
/// at every call site.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(try_from = "Vec<RunnerConfig>")]
pub struct RunnerSet(Vec<RunnerConfig>);

impl RunnerSet {
  pub fn new(configs: Vec<RunnerConfig>) -> Result<Self> {
    let mut unique = Vec::with_capacity(configs.len());

    for config in configs {
      if !unique.contains(&config) {
        unique.push(config);
      }
    }

    if unique.is_empty() {
      return Err(Error::EmptyRunnerSet);
    }

    Ok(RunnerSet(unique))
  }

  /// Parses the comma-joined token form, e.g.
  /// `"linux chrome,windows ie IE11"`.
  pub fn parse(tokens: &str) -> Result<Self> {
    let configs = tokens
      .split(',')
      .map(|token| RunnerConfig::try_from(token.trim()))
      .collect::<Result<Vec<_>>>()?;

    Self::new(configs)
  }

  pub fn to_tokens(&self) -> String {
    self
      .0
      .iter()
      .map(RunnerConfig::token)
      .collect::<Vec<_>>()
      .join(",")
  }

  pub fn configs(&self) -> &[RunnerConfig] {
    &self.0
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, RunnerConfig> {
    self.0.iter()
  }

  pub fn contains(&self, config: &RunnerConfig) -> bool {
    self.0.contains(config)
  }
}

impl TryFrom<Vec<RunnerConfig>> for RunnerSet {
  type Error = Error;

  fn try_from(configs: Vec<RunnerConfig>) -> Result<Self> {
    Self::new(configs)
  }
}
