use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use stackup_core::{PlanError, StepFailure};
use stackup_exec::workflow::{action_fn, ActionError, Event, EventSink, NoOpEventSink, Step, StepWorkflow};
use uuid::Uuid;

type Log = Arc<Mutex<Vec<String>>>;

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn emit(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

fn workflow(timeout: Duration) -> StepWorkflow {
    StepWorkflow::new(Uuid::new_v4(), timeout, Arc::new(NoOpEventSink))
}

fn ok_step(name: &'static str, log: &Log) -> Step {
    let log = log.clone();
    Step::from_arc(
        name,
        action_fn(move || {
            let log = log.clone();
            async move {
                log.lock().unwrap().push(name.to_string());
                Ok(())
            }
        }),
    )
}

fn failing_step(name: &'static str, log: &Log) -> Step {
    let log = log.clone();
    Step::from_arc(
        name,
        action_fn(move || {
            let log = log.clone();
            async move {
                log.lock().unwrap().push(name.to_string());
                Err(ActionError::failed("disk full"))
            }
        }),
    )
}

#[tokio::test]
async fn completed_steps_are_the_prefix_before_the_failure() {
    let log = Log::default();
    let steps = vec![
        ok_step("a", &log),
        ok_step("b", &log),
        failing_step("c", &log),
        ok_step("d", &log),
    ];

    let outcome = workflow(Duration::from_secs(5)).run(&steps).await.unwrap();

    assert_eq!(outcome.completed_steps(), ["a", "b"]);
    assert_eq!(outcome.failed_step(), Some("c"));
    assert_eq!(outcome.error().as_deref(), Some("step `c` failed: disk full"));
    assert!(!outcome.succeeded());
    assert_eq!(*log.lock().unwrap(), ["a", "b", "c"]);
}

#[tokio::test]
async fn all_steps_succeed() {
    let log = Log::default();
    let steps = vec![ok_step("a", &log), ok_step("b", &log)];

    let outcome = workflow(Duration::from_secs(5)).run(&steps).await.unwrap();

    assert!(outcome.succeeded());
    assert_eq!(outcome.completed_steps(), ["a", "b"]);
    assert!(outcome.failure().is_none());
    assert!(outcome.finished_at().is_some());
}

#[tokio::test(start_paused = true)]
async fn timed_out_step_is_not_counted_as_completed() {
    let log = Log::default();
    let slow = Step::from_arc(
        "slow",
        action_fn(|| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }),
    );
    let steps = vec![ok_step("a", &log), slow, ok_step("after", &log)];

    let outcome = workflow(Duration::from_secs(2)).run(&steps).await.unwrap();

    assert_eq!(outcome.completed_steps(), ["a"]);
    match outcome.failure() {
        Some(StepFailure::TimedOut { step, timeout_ms }) => {
            assert_eq!(step, "slow");
            assert_eq!(*timeout_ms, 2000);
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(*log.lock().unwrap(), ["a"]);
}

#[tokio::test(start_paused = true)]
async fn per_step_timeout_overrides_the_workflow_default() {
    let steps = vec![Step::from_arc(
        "verify",
        action_fn(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }),
    )
    .with_timeout(Duration::from_secs(10))];

    let outcome = workflow(Duration::from_secs(1)).run(&steps).await.unwrap();

    assert!(outcome.succeeded());
}

#[tokio::test]
async fn panicking_action_becomes_a_step_failure() {
    let steps = vec![Step::from_arc(
        "boom",
        action_fn(|| async {
            let compose_file: Option<&str> = None;
            compose_file.expect("compose file missing");
            Ok(())
        }),
    )];

    let outcome = workflow(Duration::from_secs(1)).run(&steps).await.unwrap();

    assert_eq!(outcome.failed_step(), Some("boom"));
    let error = outcome.error().unwrap();
    assert!(error.contains("compose file missing"), "{error}");
}

#[tokio::test]
async fn duplicate_step_names_are_rejected_before_anything_runs() {
    let log = Log::default();
    let steps = vec![ok_step("a", &log), ok_step("a", &log)];

    let err = workflow(Duration::from_secs(1)).run(&steps).await.unwrap_err();

    assert_eq!(err, PlanError::DuplicateStep("a".to_string()));
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn empty_plan_is_rejected() {
    let err = workflow(Duration::from_secs(1)).run(&[]).await.unwrap_err();
    assert_eq!(err, PlanError::Empty);
}

#[tokio::test]
async fn dry_run_completes_every_step() {
    let log = Log::default();
    let steps: Vec<Step> = vec![
        failing_step("fetch", &log),
        failing_step("start", &log).with_compensation_arc(action_fn(|| async {
            Err(ActionError::failed("should not run"))
        })),
    ]
    .into_iter()
    .map(Step::into_dry_run)
    .collect();

    let outcome = workflow(Duration::from_secs(1)).run(&steps).await.unwrap();

    assert_eq!(outcome.completed_steps(), ["fetch", "start"]);
    assert_eq!(outcome.failed_step(), None);
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn progress_events_carry_index_and_total() {
    let log = Log::default();
    let sink = Arc::new(RecordingSink::default());
    let wf = StepWorkflow::new(Uuid::new_v4(), Duration::from_secs(1), sink.clone());
    let steps = vec![ok_step("a", &log), failing_step("b", &log)];

    wf.run(&steps).await.unwrap();

    let events = sink.events.lock().unwrap();
    let kinds: Vec<&str> = events.iter().map(Event::kind).collect();
    assert_eq!(
        kinds,
        [
            "run.started",
            "step.started",
            "step.succeeded",
            "step.started",
            "step.failed",
            "run.finished"
        ]
    );
    assert!(matches!(
        &events[3],
        Event::StepStarted { step, index: 2, total: 2, .. } if step == "b"
    ));
}
