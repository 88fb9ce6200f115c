use crate::{BenchmarkRun, CompilerVariant, WorkResult};

type OnModuleSubmitted = dyn Fn(&str, &CompilerVariant) + Send + Sync;
type OnModuleCompleted = dyn Fn(&WorkResult) + Send + Sync;
type OnBatchCompleted = dyn Fn(&[BenchmarkRun]) + Send + Sync;

/// Observer hooks for batch progress. Dashboards and tests register the
/// callbacks they care about; everything is optional.
pub struct Progress {
  pub name: &'static str,
  on_module_submitted: Option<Box<OnModuleSubmitted>>,
  on_module_completed: Option<Box<OnModuleCompleted>>,
  on_batch_completed: Option<Box<OnBatchCompleted>>,
}

impl Progress {
  pub fn builder(name: &'static str) -> ProgressBuilder {
    ProgressBuilder::new(name)
  }

  pub(crate) fn module_submitted(&self, module: &str, variant: &CompilerVariant) {
    if let Some(on_module_submitted) = &self.on_module_submitted {
      on_module_submitted(module, variant);
    }
  }

  pub(crate) fn module_completed(&self, result: &WorkResult) {
    if let Some(on_module_completed) = &self.on_module_completed {
      on_module_completed(result);
    }
  }

  pub(crate) fn batch_completed(&self, runs: &[BenchmarkRun]) {
    if let Some(on_batch_completed) = &self.on_batch_completed {
      on_batch_completed(runs);
    }
  }
}

pub struct ProgressBuilder {
  name: &'static str,
  on_module_submitted: Option<Box<OnModuleSubmitted>>,
  on_module_completed: Option<Box<OnModuleCompleted>>,
  on_batch_completed: Option<Box<OnBatchCompleted>>,
}

impl ProgressBuilder {
  fn new(name: &'static str) -> Self {
    Self {
      name,
      on_module_submitted: None,
      on_module_completed: None,
      on_batch_completed: None,
    }
  }

  pub fn on_module_submitted<T>(mut self, on_module_submitted: T) -> Self
  where
    T: Fn(&str, &CompilerVariant) + Send + Sync + 'static,
  {
    self.on_module_submitted = Some(Box::new(on_module_submitted));
    self
  }

  pub fn on_module_completed<T>(mut self, on_module_completed: T) -> Self
  where
    T: Fn(&WorkResult) + Send + Sync + 'static,
  {
    self.on_module_completed = Some(Box::new(on_module_completed));
    self
  }

  pub fn on_batch_completed<T>(mut self, on_batch_completed: T) -> Self
  where
    T: Fn(&[BenchmarkRun]) + Send + Sync + 'static,
  {
    self.on_batch_completed = Some(Box::new(on_batch_completed));
    self
  }

  pub fn build(self) -> Progress {
    Progress {
      name: self.name,
      on_module_submitted: self.on_module_submitted,
      on_module_completed: self.on_module_completed,
      on_batch_completed: self.on_batch_completed,
    }
  }
}
