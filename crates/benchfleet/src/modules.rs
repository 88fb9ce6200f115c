use crate::{Error, Result};
use std::path::PathBuf;

/// Source of benchmark module names for a batch.
pub trait ModuleSource: Send + Sync {
  fn discover(&self) -> Result<Vec<String>>;
}

/// A fixed module list works as a source, for config-driven setups and
/// tests.
impl ModuleSource for Vec<String> {
  fn discover(&self) -> Result<Vec<String>> {
    Ok(self.clone())
  }
}

/// Discovers benchmark modules by globbing a source tree; the module name
/// is the matched file's stem. E.g. pattern `benchmarks/*.bench.js` over a
/// checkout yields one module per benchmark script.
pub struct GlobModuleSource {
  root: PathBuf,
  pattern: String,
}

impl GlobModuleSource {
  pub fn new(root: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
    Self {
      root: root.into(),
      pattern: pattern.into(),
    }
  }
}

impl ModuleSource for GlobModuleSource {
  fn discover(&self) -> Result<Vec<String>> {
    let pattern = format!("{}/{}", self.root.display(), self.pattern);
    let paths = glob::glob(&pattern)
      .map_err(|err| Error::error(format!("Invalid module pattern {}: {}", pattern, err)))?;

    let mut modules = Vec::new();

    for path in paths {
      let path = path.map_err(|err| Error::error(format!("Failed to read module: {}", err)))?;

      if let Some(stem) = path.file_stem() {
        modules.push(stem.to_string_lossy().into_owned());
      }
    }

    modules.sort();
    modules.dedup();

    Ok(modules)
  }
}
