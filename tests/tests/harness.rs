//! Harness behavior against the in-process scripted backend: result
//! accounting, the concurrency bound, failure isolation, and timing.

mod utils;
use utils::*;

use sentinel::prelude::*;
use sentinel::{ConfigurableStressTest, HarnessError, StressTest};
use sentinel_core::FailureReason;
use std::sync::atomic::Ordering;
use std::time::Duration;

const TASK_DELAY: Duration = Duration::from_secs(1);

#[tracing_test::traced_test]
#[tokio::test(start_paused = true)]
async fn every_dispatched_task_yields_one_result() {
    for (users, concurrency) in [(1, 1), (5, 2), (7, 3), (10, 10), (4, 9)] {
        let provider = ScriptedProvider::uniform(TASK_DELAY);
        let report = StressTest::new(provider, test_config(users, concurrency))
            .await
            .unwrap();

        assert_eq!(report.results.len(), users as usize);
        assert_eq!(report.aggregate.requested, u64::from(users));
        assert_eq!(
            report.aggregate.success_count + report.aggregate.failure_count,
            u64::from(users)
        );

        let mut ids: Vec<_> = report.results.iter().map(|r| r.task_id).collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..users).collect::<Vec<_>>());
    }
}

#[tokio::test(start_paused = true)]
async fn in_flight_sessions_never_exceed_the_cap() {
    let provider = ScriptedProvider::uniform(Duration::from_millis(100));
    let gauge = provider.gauge();

    let report = StressTest::new(provider, test_config(20, 3)).await.unwrap();

    assert_eq!(report.aggregate.success_count, 20);
    assert!(
        gauge.high_water() <= 3,
        "observed {} concurrent sessions",
        gauge.high_water()
    );
}

#[tokio::test(start_paused = true)]
async fn one_stalled_confirmation_leaves_other_tasks_untouched() {
    let provider = ScriptedProvider::with_scripts(
        TASK_DELAY,
        vec![Script::Succeed, Script::NeverConfirm, Script::Succeed],
    );
    let report = StressTest::new(provider, test_config(3, 3)).await.unwrap();

    assert_eq!(report.aggregate.success_count, 2);
    assert_eq!(report.aggregate.failure_count, 1);
    assert_eq!(report.aggregate.failures["confirmation_timeout"], 1);

    for result in &report.results {
        match &result.outcome {
            Outcome::Success => {
                // Unaffected tasks finish on the usual schedule.
                assert!(result.duration < TASK_DELAY + Duration::from_millis(500));
                assert!(result.patient_name.is_some());
            }
            Outcome::Failure(FailureReason::ConfirmationTimeout { .. }) => {
                // The stalled task rode out the full confirmation deadline.
                assert!(result.duration >= TASK_DELAY + Duration::from_secs(2));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn a_panicking_workflow_is_captured_not_propagated() {
    let provider =
        ScriptedProvider::with_scripts(TASK_DELAY, vec![Script::PanicOnSubmit]);
    let report = StressTest::new(provider, test_config(3, 2)).await.unwrap();

    assert_eq!(report.aggregate.success_count, 2);
    assert_eq!(report.aggregate.failures["unexpected"], 1);
    let failed = report
        .results
        .iter()
        .find(|r| !r.outcome.is_success())
        .unwrap();
    match &failed.outcome {
        Outcome::Failure(FailureReason::Unexpected(message)) => {
            assert!(message.contains("panicked"), "got {message:?}");
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn session_refusal_is_a_task_failure_not_a_crash() {
    let provider =
        ScriptedProvider::with_scripts(TASK_DELAY, vec![Script::RefuseSession]);
    let report = StressTest::new(provider, test_config(2, 1)).await.unwrap();

    assert_eq!(report.aggregate.success_count, 1);
    assert_eq!(report.aggregate.failures["session_unavailable"], 1);
}

#[tokio::test(start_paused = true)]
async fn rejected_login_is_a_task_failure() {
    let provider = ScriptedProvider::with_scripts(TASK_DELAY, vec![Script::RejectLogin]);
    let report = StressTest::new(provider, test_config(2, 2)).await.unwrap();

    assert_eq!(report.aggregate.failures["login_failed"], 1);
    assert_eq!(report.aggregate.success_count, 1);
}

#[tokio::test(start_paused = true)]
async fn every_acquired_session_is_handed_back() {
    let provider = ScriptedProvider::with_scripts(
        Duration::from_millis(50),
        vec![
            Script::Succeed,
            Script::NeverConfirm,
            Script::PanicOnSubmit,
            Script::RejectLogin,
            Script::RefuseSession,
        ],
    );
    let acquired = provider.acquired();
    let released = provider.released();

    let report = StressTest::new(provider, test_config(8, 4)).await.unwrap();

    assert_eq!(report.results.len(), 8);
    // One acquire was refused outright and never produced a session.
    let produced = acquired.load(Ordering::SeqCst) - 1;
    assert_eq!(released.load(Ordering::SeqCst), produced);
}

#[tokio::test(start_paused = true)]
async fn results_arrive_in_completion_order() {
    let provider = ScriptedProvider::with_scripts(
        TASK_DELAY,
        vec![
            Script::SucceedAfter(Duration::from_secs(3)),
            Script::SucceedAfter(Duration::from_secs(1)),
            Script::SucceedAfter(Duration::from_secs(2)),
        ],
    );
    let report = StressTest::new(provider, test_config(3, 3)).await.unwrap();

    let durations: Vec<_> = report.results.iter().map(|r| r.duration).collect();
    let mut sorted = durations.clone();
    sorted.sort();
    assert_eq!(durations, sorted, "results not in completion order");
}

#[tokio::test(start_paused = true)]
async fn full_parallelism_reaches_full_throughput() {
    // Ten unit-duration tasks with ten workers: about ten bookings per unit.
    let provider = ScriptedProvider::uniform(TASK_DELAY);
    let report = StressTest::new(provider, test_config(10, 10)).await.unwrap();

    assert_eq!(report.aggregate.success_count, 10);
    assert!(report.aggregate.wall_clock < Duration::from_millis(1500));
    assert!(
        (report.aggregate.throughput - 10.0).abs() < 2.0,
        "throughput {}",
        report.aggregate.throughput
    );
}

#[tokio::test(start_paused = true)]
async fn serial_execution_reaches_serial_throughput() {
    let provider = ScriptedProvider::uniform(TASK_DELAY);
    let report = StressTest::new(provider, test_config(10, 1)).await.unwrap();

    assert_eq!(report.aggregate.success_count, 10);
    assert!(report.aggregate.wall_clock >= Duration::from_secs(10));
    assert!(
        (report.aggregate.throughput - 1.0).abs() < 0.2,
        "throughput {}",
        report.aggregate.throughput
    );
}

#[tokio::test(start_paused = true)]
async fn batched_waves_bound_the_wall_clock() {
    // Five tasks, two at a time: three waves, so at least 3x the delay.
    let provider = ScriptedProvider::uniform(TASK_DELAY);
    let report = StressTest::new(provider, test_config(5, 2)).await.unwrap();

    assert_eq!(report.aggregate.success_count, 5);
    assert!((report.aggregate.success_rate() - 1.0).abs() < f64::EPSILON);
    assert!(report.aggregate.wall_clock >= 3 * TASK_DELAY);
}

#[tokio::test(start_paused = true)]
async fn the_report_serializes_for_export() {
    let provider = ScriptedProvider::with_scripts(TASK_DELAY, vec![Script::NeverConfirm]);
    let report = StressTest::new(provider, test_config(2, 2)).await.unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["aggregate"]["requested"], 2);
    assert_eq!(json["aggregate"]["failures"]["confirmation_timeout"], 1);
    assert_eq!(json["results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn zero_users_is_a_configuration_error() {
    let provider = ScriptedProvider::uniform(Duration::ZERO);

    let err = StressTest::new(provider, test_config(1, 1))
        .users(0)
        .await
        .unwrap_err();
    assert!(matches!(err, HarnessError::NoUsers));
}

#[tokio::test]
async fn unknown_environment_is_a_configuration_error() {
    let provider = ScriptedProvider::uniform(Duration::ZERO);
    let mut config = test_config(1, 1);
    config.active_environment = "production".into();

    let err = StressTest::new(provider, config).await.unwrap_err();
    assert!(matches!(err, HarnessError::UnknownEnvironment(name) if name == "production"));
}
