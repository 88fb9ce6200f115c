use benchfleet::{
  zip_dir, Browser, DispatchConfig, DispatchServer, Error, JobId, JobResult, JobStatus, Os,
  Runner, RunnerConfig, RunnerSet,
};
use std::{collections::HashMap, fs, path::PathBuf, sync::Arc, time::Duration};

enum Scripted {
  Success(f64),
  Failure(String),
  Delayed(Duration, f64),
}

struct ScriptedRunner {
  outcomes: HashMap<RunnerConfig, Scripted>,
}

#[benchfleet::async_trait]
impl Runner for ScriptedRunner {
  async fn run(&self, config: RunnerConfig, _url: &str) -> JobResult {
    match self.outcomes.get(&config) {
      Some(Scripted::Success(runs_per_second)) => JobResult::success(config, *runs_per_second),
      Some(Scripted::Failure(message)) => JobResult::failure(config, message.clone()),
      Some(Scripted::Delayed(delay, runs_per_second)) => {
        tokio::time::sleep(*delay).await;
        JobResult::success(config, *runs_per_second)
      }
      None => JobResult::failure(config, "No scripted outcome"),
    }
  }
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

/// A minimal packaged artifact: one compiled script plus a host page.
fn artifact() -> PathBuf {
  let root = temp_root("benchfleet-artifact");
  let src = root.join("src");

  fs::create_dir_all(&src).unwrap();
  fs::write(src.join("index.html"), "<html></html>").unwrap();
  fs::write(src.join("richards.js"), "var x = 1;").unwrap();

  let archive = root.join("artifact.zip");
  zip_dir(&src, &archive).unwrap();

  archive
}

fn server(outcomes: HashMap<RunnerConfig, Scripted>) -> DispatchServer {
  let config = DispatchConfig {
    work_root: temp_root("benchfleet-dispatch"),
    retention: Duration::from_millis(0),
    sweep_interval: Duration::from_millis(20),
    ..DispatchConfig::default()
  };

  DispatchServer::new(config, Arc::new(ScriptedRunner { outcomes }))
}

async fn wait_terminal(server: &DispatchServer, job_id: &JobId) -> benchfleet::Job {
  for _ in 0..500 {
    let job = server.get_status(job_id).unwrap();
    if job.status().is_terminal() {
      return job;
    }
    tokio::time::sleep(Duration::from_millis(5)).await;
  }

  panic!("Job {} never reached a terminal state", job_id);
}

#[benchfleet_test::test]
async fn test_all_runners_succeed() {
  let server = server(HashMap::from([
    (chrome(), Scripted::Success(2.0)),
    (firefox(), Scripted::Success(5.0)),
  ]));

  let job_id = server.submit_job(&artifact(), both()).unwrap();
  let job = wait_terminal(&server, &job_id).await;

  assert_eq!(job.status(), JobStatus::Finished);

  let chrome_result = job.result(&chrome()).unwrap();
  assert!(chrome_result.succeeded);
  assert_eq!(chrome_result.runs_per_second, Some(2.0));

  let firefox_result = job.result(&firefox()).unwrap();
  assert!(firefox_result.succeeded);
  assert_eq!(firefox_result.runs_per_second, Some(5.0));

  let view = job.view();
  assert_eq!(view.counter, 2);
  assert_eq!(view.failed_counter, 0);
  assert_eq!(view.expected_results, 2);
}

#[benchfleet_test::test]
async fn test_one_timeout_fails_the_job() {
  let server = server(HashMap::from([
    (chrome(), Scripted::Failure("Timeout".to_string())),
    (firefox(), Scripted::Success(5.0)),
  ]));

  let job_id = server.submit_job(&artifact(), both()).unwrap();
  let job = wait_terminal(&server, &job_id).await;

  // One success is not enough: all runners must succeed.
  assert_eq!(job.status(), JobStatus::Failed);

  let failed = job.result(&chrome()).unwrap();
  assert!(failed.ran);
  assert!(!failed.succeeded);
  assert_eq!(failed.error_message.as_deref(), Some("Timeout"));

  assert!(job.result(&firefox()).unwrap().succeeded);
}

#[benchfleet_test::test]
async fn test_result_map_is_total_while_running() {
  let server = server(HashMap::from([
    (chrome(), Scripted::Delayed(Duration::from_millis(200), 2.0)),
    (firefox(), Scripted::Delayed(Duration::from_millis(200), 5.0)),
  ]));

  let job_id = server.submit_job(&artifact(), both()).unwrap();

  let job = server.get_status(&job_id).unwrap();
  assert_eq!(job.results().len(), 2);
  assert!(job.results().values().all(|result| !result.ran));

  let job = wait_terminal(&server, &job_id).await;
  assert_eq!(job.results().len(), 2);
  assert!(job.results().values().all(|result| result.ran));
}

#[benchfleet_test::test]
async fn test_unknown_job_is_a_typed_error() {
  let server = server(HashMap::new());
  let job_id = JobId::try_from("no-such-job").unwrap();

  assert_eq!(
    server.get_status(&job_id).unwrap_err(),
    Error::job_not_found("no-such-job")
  );
}

#[benchfleet_test::test]
async fn test_artifact_is_extracted_into_working_directory() {
  let work_root = temp_root("benchfleet-dispatch");
  let config = DispatchConfig {
    work_root: work_root.clone(),
    ..DispatchConfig::default()
  };
  let server = DispatchServer::new(
    config,
    Arc::new(ScriptedRunner {
      outcomes: HashMap::from([(chrome(), Scripted::Success(1.0))]),
    }),
  );

  let job_id = server
    .submit_job(&artifact(), RunnerSet::new(vec![chrome()]).unwrap())
    .unwrap();

  let job_dir = work_root.join(job_id.inner());
  assert!(job_dir.join("index.html").exists());
  assert!(job_dir.join("richards.js").exists());
}

#[benchfleet_test::test]
async fn test_sweep_reclaims_terminal_jobs() {
  let work_root = temp_root("benchfleet-dispatch");
  let config = DispatchConfig {
    work_root: work_root.clone(),
    retention: Duration::from_millis(0),
    ..DispatchConfig::default()
  };
  let server = DispatchServer::new(
    config,
    Arc::new(ScriptedRunner {
      outcomes: HashMap::from([(chrome(), Scripted::Success(1.0))]),
    }),
  );

  let job_id = server
    .submit_job(&artifact(), RunnerSet::new(vec![chrome()]).unwrap())
    .unwrap();
  wait_terminal(&server, &job_id).await;

  tokio::time::sleep(Duration::from_millis(10)).await;
  server.sweep();

  assert_eq!(
    server.get_status(&job_id).unwrap_err(),
    Error::job_not_found(&job_id)
  );
  assert!(!work_root.join(job_id.inner()).exists());

  // Sweeping again (and sweeping a directory that is already gone) is not
  // an error.
  server.sweep();
}

#[benchfleet_test::test]
async fn test_running_jobs_are_not_swept() {
  let server = server(HashMap::from([(
    chrome(),
    Scripted::Delayed(Duration::from_millis(200), 1.0),
  )]));

  let job_id = server
    .submit_job(&artifact(), RunnerSet::new(vec![chrome()]).unwrap())
    .unwrap();

  tokio::time::sleep(Duration::from_millis(10)).await;
  server.sweep();

  // Still queryable: only terminal jobs are reclaimed.
  assert!(server.get_status(&job_id).is_ok());

  wait_terminal(&server, &job_id).await;
}

#[test]
fn test_empty_runner_set_is_rejected_at_construction() {
  assert_eq!(RunnerSet::new(vec![]), Err(Error::EmptyRunnerSet));
}
