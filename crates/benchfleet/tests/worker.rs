use benchfleet::{
  BenchmarkCompiler, BenchmarkState, Browser, CompilerVariant, DispatchConfig, DispatchServer,
  Error, JobResult, Os, Result, RunState, Runner, RunnerConfig, RunnerSet, Worker, WorkerConfig,
  HOST_PAGE_NAME,
};
use std::{
  collections::HashMap,
  fs,
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

fn temp_root(prefix: &str) -> PathBuf {
  use std::sync::atomic::{AtomicU64, Ordering};
  use std::time::{SystemTime, UNIX_EPOCH};

  static COUNTER: AtomicU64 = AtomicU64::new(0);

  let nanos = SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .unwrap()
    .as_nanos();

  std::env::temp_dir().join(format!(
    "{}-{}-{}",
    prefix,
    nanos,
    COUNTER.fetch_add(1, Ordering::Relaxed)
  ))
}

fn chrome() -> RunnerConfig {
  RunnerConfig::new(Os::Linux, Browser::Chrome)
}

fn firefox() -> RunnerConfig {
  RunnerConfig::new(Os::Linux, Browser::Firefox)
}

fn both() -> RunnerSet {
  RunnerSet::new(vec![chrome(), firefox()]).unwrap()
}

/// Writes one compiled script per module, like a real toolchain would.
struct FixedCompiler;

#[benchfleet::async_trait]
impl BenchmarkCompiler for FixedCompiler {
  async fn compile(
    &self,
    module: &str,
    _variant: &CompilerVariant,
    out_dir: &Path,
  ) -> Result<()> {
    fs::write(out_dir.join(format!("{}.js", module)), "var x = 1;")?;
    Ok(())
  }
}

struct FailingCompiler;

#[benchfleet::async_trait]
impl BenchmarkCompiler for FailingCompiler {
  async fn compile(
    &self,
    _module: &str,
    _variant: &CompilerVariant,
    _out_dir: &Path,
  ) -> Result<()> {
    Err(Error::compile_failed("bad syntax"))
  }
}

/// Succeeds, but leaves the output directory gone: the following host page
/// write is the step that fails.
struct DirStealingCompiler;

#[benchfleet::async_trait]
impl BenchmarkCompiler for DirStealingCompiler {
  async fn compile(
    &self,
    _module: &str,
    _variant: &CompilerVariant,
    out_dir: &Path,
  ) -> Result<()> {
    fs::remove_dir_all(out_dir)?;
    Ok(())
  }
}

struct ScriptedRunner {
  outcomes: HashMap<RunnerConfig, std::result::Result<f64, String>>,
}

#[benchfleet::async_trait]
impl Runner for ScriptedRunner {
  async fn run(&self, config: RunnerConfig, _url: &str) -> JobResult {
    match self.outcomes.get(&config) {
      Some(Ok(runs_per_second)) => JobResult::success(config, *runs_per_second),
      Some(Err(message)) => JobResult::failure(config, message.clone()),
      None => JobResult::failure(config, "No scripted outcome"),
    }
  }
}

struct Fixture {
  work_root: PathBuf,
  out_root: PathBuf,
  dispatch: DispatchServer,
}

impl Fixture {
  fn new(outcomes: HashMap<RunnerConfig, std::result::Result<f64, String>>) -> Self {
    let work_root = temp_root("benchfleet-worker-work");
    let out_root = temp_root("benchfleet-worker-out");

    let dispatch = DispatchServer::new(
      DispatchConfig {
        work_root: work_root.clone(),
        ..DispatchConfig::default()
      },
      Arc::new(ScriptedRunner { outcomes }),
    );

    Self {
      work_root,
      out_root,
      dispatch,
    }
  }

  fn worker<C: BenchmarkCompiler + 'static>(&self, module: &str, compiler: C) -> Worker {
    Worker::new(
      module,
      CompilerVariant::default(),
      both(),
      Arc::new(compiler),
      self.dispatch.clone(),
      WorkerConfig {
        out_root: self.out_root.clone(),
        status_poll_interval: Duration::from_millis(10),
      },
    )
  }

  /// The worker owns everything under its output root; nothing may be
  /// left behind on any path.
  fn assert_out_root_empty(&self) {
    let leftovers: Vec<_> = match fs::read_dir(&self.out_root) {
      Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
      Err(_) => return,
    };

    assert!(leftovers.is_empty(), "Leftover resources: {:?}", leftovers);
  }
}

#[benchfleet_test::test]
async fn test_successful_work() {
  let fixture = Fixture::new(HashMap::from([
    (chrome(), Ok(2.0)),
    (firefox(), Ok(5.0)),
  ]));

  let result = fixture.worker("richards", FixedCompiler).work().await;

  assert_eq!(result.state, BenchmarkState::Done);
  assert!(result.is_success());
  assert_eq!(result.results.len(), 2);
  assert_eq!(
    result.results[&chrome()].runs_per_second,
    Some(2.0)
  );
  assert_eq!(
    result.results[&firefox()].runs_per_second,
    Some(5.0)
  );

  fixture.assert_out_root_empty();

  // The dispatch tier received the compiled script and the generated host
  // page.
  let jobs: Vec<_> = fs::read_dir(&fixture.work_root)
    .unwrap()
    .map(|e| e.unwrap().path())
    .collect();
  assert_eq!(jobs.len(), 1);
  assert!(jobs[0].join(HOST_PAGE_NAME).exists());
  assert!(jobs[0].join("richards.js").exists());
}

#[benchfleet_test::test]
async fn test_compile_failure_classification() {
  let fixture = Fixture::new(HashMap::new());

  let result = fixture.worker("richards", FailingCompiler).work().await;

  assert_eq!(result.state, BenchmarkState::FailedCompile);
  assert!(result
    .error_message
    .as_deref()
    .unwrap()
    .contains("bad syntax"));

  // No runner ever ran: every entry is forced to a failed run.
  assert_eq!(result.results.len(), 2);
  for entry in result.results.values() {
    assert_eq!(entry.state, RunState::FailedRun);
    assert!(entry.error_message.as_deref().unwrap().contains("bad syntax"));
  }

  // No working directory remains anywhere.
  fixture.assert_out_root_empty();
  assert!(
    !fixture.work_root.exists()
      || fs::read_dir(&fixture.work_root).unwrap().next().is_none()
  );
}

#[benchfleet_test::test]
async fn test_create_dir_failure_classification() {
  let fixture = Fixture::new(HashMap::new());

  // Occupy the output root with a plain file so directory creation fails.
  fs::create_dir_all(fixture.out_root.parent().unwrap()).unwrap();
  fs::write(&fixture.out_root, "not a directory").unwrap();

  let result = fixture.worker("richards", FixedCompiler).work().await;

  assert_eq!(result.state, BenchmarkState::FailedToCreateDir);
  assert!(result.results.values().all(|r| r.state == RunState::FailedRun));

  fs::remove_file(&fixture.out_root).unwrap();
}

#[benchfleet_test::test]
async fn test_host_page_failure_classification() {
  let fixture = Fixture::new(HashMap::new());

  let result = fixture.worker("richards", DirStealingCompiler).work().await;

  assert_eq!(result.state, BenchmarkState::FailedHostPageGeneration);
  assert!(result.results.values().all(|r| r.state == RunState::FailedRun));

  fixture.assert_out_root_empty();
}

#[benchfleet_test::test]
async fn test_runner_failure_classification() {
  let fixture = Fixture::new(HashMap::from([
    (chrome(), Ok(2.0)),
    (firefox(), Err("Timeout".to_string())),
  ]));

  let result = fixture.worker("richards", FixedCompiler).work().await;

  assert_eq!(result.state, BenchmarkState::FailedToRunOnRunner);

  // The failing runner's message is preserved; the sibling's success is
  // kept alongside it.
  let failed = &result.results[&firefox()];
  assert_eq!(failed.state, RunState::FailedRun);
  assert_eq!(failed.error_message.as_deref(), Some("Timeout"));

  let succeeded = &result.results[&chrome()];
  assert_eq!(succeeded.state, RunState::SuccessfulRun);
  assert_eq!(succeeded.runs_per_second, Some(2.0));

  fixture.assert_out_root_empty();
}
