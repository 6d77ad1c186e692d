use super::*;
use crate::error::TaskError;
use crate::storage::MemoryStorage;
use crate::task::TaskOutcome;
use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

// Task that replays a script of results, then repeats `fallback` forever
struct ScriptedTask {
    policy: TaskPolicy,
    script: Mutex<VecDeque<Result<TaskOutcome, TaskError>>>,
    fallback: Result<TaskOutcome, TaskError>,
    invoked_at: Mutex<Vec<Instant>>,
}

impl ScriptedTask {
    fn new(fallback: Result<TaskOutcome, TaskError>) -> Self {
        Self {
            policy: TaskPolicy::from_millis(10_000, 120_000),
            script: Mutex::new(VecDeque::new()),
            fallback,
            invoked_at: Mutex::new(Vec::new()),
        }
    }

    fn then(self, result: Result<TaskOutcome, TaskError>) -> Self {
        self.script.lock().unwrap().push_back(result);
        self
    }

    fn invocations(&self) -> Vec<Instant> {
        self.invoked_at.lock().unwrap().clone()
    }
}

#[async_trait]
impl RetryableTask for ScriptedTask {
    fn name(&self) -> &str {
        "scripted"
    }

    fn policy(&self) -> TaskPolicy {
        self.policy
    }

    async fn execute(&self, _stage: &StageExecution) -> Result<TaskOutcome, TaskError> {
        self.invoked_at.lock().unwrap().push(Instant::now());
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

fn stage(id: &str) -> StageExecution {
    StageExecution::from_json(id, "scripted", json!({"region": "us-east-1"})).unwrap()
}

fn scheduler() -> (Scheduler, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    (Scheduler::new("exec-1", storage.clone()), storage)
}

fn unavailable() -> TaskError {
    TaskError::submission(Some(503), "unavailable")
}

#[tokio::test(start_paused = true)]
async fn test_success_on_first_invocation() {
    let (scheduler, storage) = scheduler();
    let task = ScriptedTask::new(Ok(TaskOutcome::succeeded().with_output("kato.last.task.id", json!({"id": "t-1"}))));
    let mut stage = stage("s1");

    let report = scheduler.run_stage(&task, &mut stage).await.unwrap();

    assert_eq!(report.state, StageState::Succeeded);
    assert_eq!(report.attempts, 1);
    assert!(report.failure.is_none());
    assert_eq!(stage.context["kato.last.task.id"], json!({"id": "t-1"}));
    assert_eq!(stage.context["region"], json!("us-east-1"));
    assert_eq!(
        storage.get_stage_state("exec-1", "s1"),
        Some((StageState::Succeeded, 1))
    );
    assert_eq!(
        storage.get_update_calls(),
        vec![
            ("s1".to_string(), StageState::Running, 1),
            ("s1".to_string(), StageState::Succeeded, 1),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_running_is_reinvoked_after_backoff() {
    let (scheduler, _) = scheduler();
    let task = ScriptedTask::new(Ok(TaskOutcome::succeeded()))
        .then(Ok(TaskOutcome::running()))
        .then(Ok(TaskOutcome::running()));

    let report = scheduler.run_stage(&task, &mut stage("s1")).await.unwrap();

    assert_eq!(report.state, StageState::Succeeded);
    assert_eq!(report.attempts, 3);
    let invocations = task.invocations();
    for pair in invocations.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(10_000));
    }
}

#[tokio::test(start_paused = true)]
async fn test_timeout_after_twelve_invocations() {
    let (scheduler, storage) = scheduler();
    let task = ScriptedTask::new(Ok(TaskOutcome::running()));
    let started = Instant::now();

    let report = scheduler.run_stage(&task, &mut stage("s1")).await.unwrap();

    assert_eq!(report.state, StageState::Failed);
    assert_eq!(report.attempts, 12);
    assert!(report.is_timed_out());
    match report.failure {
        Some(FailureReason::TimeoutExceeded {
            timeout_ms,
            elapsed_ms,
            last_error,
        }) => {
            assert_eq!(timeout_ms, 120_000);
            assert!(elapsed_ms >= 120_000);
            assert!(last_error.is_none());
        }
        other => panic!("expected timeout, got {:?}", other),
    }

    let invocations = task.invocations();
    assert_eq!(invocations.len(), 12);
    assert!(invocations[11] - started < Duration::from_millis(120_000));
    assert_eq!(
        storage.get_stage_state("exec-1", "s1"),
        Some((StageState::Failed, 12))
    );
}

#[tokio::test(start_paused = true)]
async fn test_task_reported_failure_is_terminal() {
    let (scheduler, _) = scheduler();
    let task = ScriptedTask::new(Ok(TaskOutcome::failed().with_output("exception.message", "rejected")));

    let report = scheduler.run_stage(&task, &mut stage("s1")).await.unwrap();

    assert_eq!(report.attempts, 1);
    assert_eq!(
        report.failure,
        Some(FailureReason::TaskReported {
            message: Some("rejected".into())
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_mapping_error_is_not_retried() {
    let (scheduler, _) = scheduler();
    let task = ScriptedTask::new(Err(TaskError::mapping("missing field `credentials`")));

    let report = scheduler.run_stage(&task, &mut stage("s1")).await.unwrap();

    assert_eq!(report.state, StageState::Failed);
    assert_eq!(report.attempts, 1);
    match report.failure {
        Some(FailureReason::Error { kind, message }) => {
            assert_eq!(kind, "MappingError");
            assert!(message.contains("credentials"));
        }
        other => panic!("expected error, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_submission_error_is_retried_until_success() {
    let (scheduler, _) = scheduler();
    let task = ScriptedTask::new(Ok(TaskOutcome::succeeded()))
        .then(Err(unavailable()))
        .then(Err(unavailable()));

    let report = scheduler.run_stage(&task, &mut stage("s1")).await.unwrap();

    assert_eq!(report.state, StageState::Succeeded);
    assert_eq!(report.attempts, 3);
}

#[tokio::test(start_paused = true)]
async fn test_submission_error_until_timeout_keeps_last_error() {
    let (scheduler, _) = scheduler();
    let task = ScriptedTask::new(Err(unavailable()));

    let report = scheduler.run_stage(&task, &mut stage("s1")).await.unwrap();

    assert_eq!(report.attempts, 12);
    match report.failure {
        Some(FailureReason::TimeoutExceeded { last_error, .. }) => {
            assert!(last_error.unwrap().contains("unavailable"));
        }
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_max_attempts_cap() {
    let storage = Arc::new(MemoryStorage::new());
    let scheduler = Scheduler::new("exec-1", storage)
        .with_options(SchedulerOptions::new().with_max_attempts(3));
    let task = ScriptedTask::new(Ok(TaskOutcome::running()));

    let report = scheduler.run_stage(&task, &mut stage("s1")).await.unwrap();

    assert_eq!(report.attempts, 3);
    assert_eq!(
        report.failure,
        Some(FailureReason::AttemptsExhausted {
            attempts: 3,
            last_error: None
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_policy_override() {
    let storage = Arc::new(MemoryStorage::new());
    let scheduler = Scheduler::new("exec-1", storage).with_options(
        SchedulerOptions::new().with_policy_override(TaskPolicy::from_millis(1_000, 5_000)),
    );
    let task = ScriptedTask::new(Ok(TaskOutcome::running()));

    let report = scheduler.run_stage(&task, &mut stage("s1")).await.unwrap();

    assert_eq!(report.attempts, 5);
    assert!(report.is_timed_out());
}

#[tokio::test(start_paused = true)]
async fn test_run_stages_concurrently() {
    let (scheduler, storage) = scheduler();
    let slow: Arc<dyn RetryableTask> = Arc::new(
        ScriptedTask::new(Ok(TaskOutcome::succeeded())).then(Ok(TaskOutcome::running())),
    );
    let failing: Arc<dyn RetryableTask> =
        Arc::new(ScriptedTask::new(Err(TaskError::invalid_request("empty"))));
    let started = Instant::now();

    let results = scheduler
        .run_stages(vec![(slow, stage("a")), (failing, stage("b"))])
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0.id, "a");
    assert_eq!(results[0].1.state, StageState::Succeeded);
    assert_eq!(results[1].0.id, "b");
    assert_eq!(results[1].1.state, StageState::Failed);
    // Stages overlap: total time is one backoff, not one per stage.
    assert!(started.elapsed() < Duration::from_millis(20_000));

    let history = storage.get_execution_history("exec-1").await.unwrap();
    assert_eq!(history.len(), 2);
}

// Task whose invocation takes `delay` before returning `outcome`
struct DelayedTask {
    delay: Option<Duration>,
    outcome: TaskOutcome,
}

#[async_trait]
impl RetryableTask for DelayedTask {
    fn name(&self) -> &str {
        "delayed"
    }

    fn policy(&self) -> TaskPolicy {
        TaskPolicy::from_millis(10_000, 120_000)
    }

    async fn execute(&self, _stage: &StageExecution) -> Result<TaskOutcome, TaskError> {
        match self.delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => std::future::pending::<()>().await,
        }
        Ok(self.outcome.clone())
    }
}

#[tokio::test(start_paused = true)]
async fn test_invocation_that_never_returns_times_out() {
    let (scheduler, storage) = scheduler();
    let task = DelayedTask {
        delay: None,
        outcome: TaskOutcome::succeeded(),
    };
    let started = Instant::now();

    let report = tokio::time::timeout(
        Duration::from_secs(3_600),
        scheduler.run_stage(&task, &mut stage("s1")),
    )
    .await
    .expect("run_stage must return once the stage timeout passes")
    .unwrap();

    assert_eq!(report.state, StageState::Failed);
    assert_eq!(report.attempts, 1);
    assert!(report.is_timed_out());
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(120_000));
    assert!(elapsed < Duration::from_millis(121_000));
    assert_eq!(
        storage.get_stage_state("exec-1", "s1"),
        Some((StageState::Failed, 1))
    );
}

#[tokio::test(start_paused = true)]
async fn test_success_returned_after_timeout_is_not_recorded() {
    let (scheduler, _) = scheduler();
    let task = DelayedTask {
        delay: Some(Duration::from_secs(300)),
        outcome: TaskOutcome::succeeded().with_output("kato.last.task.id", json!({"id": "late"})),
    };
    let mut stage = stage("s1");
    let started = Instant::now();

    let report = scheduler.run_stage(&task, &mut stage).await.unwrap();

    assert_eq!(report.state, StageState::Failed);
    assert!(report.is_timed_out());
    assert!(started.elapsed() < Duration::from_secs(300));
    assert!(!stage.context.contains_key("kato.last.task.id"));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_declared_at_deadline_when_backoff_overshoots() {
    let storage = Arc::new(MemoryStorage::new());
    let scheduler = Scheduler::new("exec-1", storage).with_options(
        SchedulerOptions::new().with_policy_override(TaskPolicy::from_millis(60_000, 70_000)),
    );
    let task = ScriptedTask::new(Ok(TaskOutcome::running()));
    let started = Instant::now();

    let report = scheduler.run_stage(&task, &mut stage("s1")).await.unwrap();

    assert_eq!(report.attempts, 2);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(70_000));
    assert!(elapsed < Duration::from_millis(71_000));
    match report.failure {
        Some(FailureReason::TimeoutExceeded {
            timeout_ms,
            elapsed_ms,
            ..
        }) => {
            assert_eq!(timeout_ms, 70_000);
            assert!((70_000..71_000).contains(&elapsed_ms));
        }
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_failure_message_comes_from_failing_invocation() {
    let (scheduler, _) = scheduler();
    let task = ScriptedTask::new(Ok(TaskOutcome::failed()))
        .then(Ok(TaskOutcome::running().with_output("exception.message", "earlier hiccup")));
    let mut stage = stage("s1");

    let report = scheduler.run_stage(&task, &mut stage).await.unwrap();

    assert_eq!(report.attempts, 2);
    assert_eq!(
        report.failure,
        Some(FailureReason::TaskReported { message: None })
    );
    // The earlier diagnostic is still part of the stage context.
    assert_eq!(stage.context["exception.message"], json!("earlier hiccup"));
}

#[tokio::test(start_paused = true)]
async fn test_clean_running_invocation_clears_last_error() {
    let storage = Arc::new(MemoryStorage::new());
    let scheduler = Scheduler::new("exec-1", storage)
        .with_options(SchedulerOptions::new().with_max_attempts(2));
    let task = ScriptedTask::new(Ok(TaskOutcome::running())).then(Err(unavailable()));

    let report = scheduler.run_stage(&task, &mut stage("s1")).await.unwrap();

    assert_eq!(
        report.failure,
        Some(FailureReason::AttemptsExhausted {
            attempts: 2,
            last_error: None
        })
    );
}
