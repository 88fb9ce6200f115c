use benchfleet::{BenchmarkCompiler, CompilerVariant, Error, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Invokes the external compile script:
/// `sh <script> <module> <variant> <out_dir>`. A non-zero exit is a
/// compile failure carrying the script's stderr; compile failures are
/// deterministic for the same inputs and are never retried.
pub struct ScriptCompiler {
  script: PathBuf,
  toolchain_dir: Option<PathBuf>,
}

impl ScriptCompiler {
  pub fn new(script: impl Into<PathBuf>) -> Self {
    Self {
      script: script.into(),
      toolchain_dir: None,
    }
  }

  /// Exported to the script as `BENCHFLEET_TOOLCHAIN_DIR`.
  pub fn toolchain_dir(mut self, toolchain_dir: impl Into<PathBuf>) -> Self {
    self.toolchain_dir = Some(toolchain_dir.into());
    self
  }
}

#[benchfleet::async_trait]
impl BenchmarkCompiler for ScriptCompiler {
  async fn compile(
    &self,
    module: &str,
    variant: &CompilerVariant,
    out_dir: &Path,
  ) -> Result<()> {
    let mut command = Command::new("sh");
    command
      .arg(&self.script)
      .arg(module)
      .arg(variant.name())
      .arg(out_dir);

    if let Some(toolchain_dir) = &self.toolchain_dir {
      command.env("BENCHFLEET_TOOLCHAIN_DIR", toolchain_dir);
    }

    let output = command
      .output()
      .await
      .map_err(|err| Error::compile_failed(format!("Failed to spawn compiler: {}", err)))?;

    if output.status.success() {
      return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(Error::compile_failed(stderr.trim()))
  }
}
