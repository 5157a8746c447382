//! Bounded worker pool: a fixed set of workers drains the task queue, runs
//! each workflow in its own spawned task, and reports results in completion
//! order.
//!
//! The in-flight bound holds structurally: each worker awaits its current
//! workflow before pulling the next task.

use crate::session::SessionProvider;
use crate::workflow::{run_workflow, WorkflowContext};
use sentinel_core::{FailureReason, Outcome, RunResult, WorkerTask};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, warn};

pub(crate) struct PoolOutput {
    /// Completion order, not submission order.
    pub results: Vec<RunResult>,
    pub wall_clock: Duration,
}

pub(crate) async fn run_pool<P>(
    provider: Arc<P>,
    ctx: Arc<WorkflowContext>,
    users: u32,
    workers: usize,
) -> PoolOutput
where
    P: SessionProvider + 'static,
    P::Session: Send,
{
    let started = Instant::now();

    let (task_tx, task_rx) = async_channel::bounded(users as usize);
    for id in 0..users {
        // The queue is sized for every task; this cannot block.
        let _ = task_tx.send(WorkerTask { id }).await;
    }
    task_tx.close();

    let (result_tx, mut result_rx) = mpsc::channel(users.max(1) as usize);

    let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(workers);
    for worker in 0..workers {
        let task_rx = task_rx.clone();
        let result_tx = result_tx.clone();
        let provider = provider.clone();
        let ctx = ctx.clone();

        handles.push(tokio::spawn(async move {
            while let Ok(task) = task_rx.recv().await {
                let task_started = Instant::now();
                // A workflow gets its own task so a panic is contained to
                // this user run.
                let workflow = tokio::spawn(run_workflow(provider.clone(), ctx.clone(), task.id));

                let result = match workflow.await {
                    Ok(result) => result,
                    Err(err) => {
                        warn!(task = task.id, "workflow did not run to completion");
                        RunResult {
                            task_id: task.id,
                            duration: task_started.elapsed(),
                            outcome: Outcome::Failure(join_failure(err)),
                            patient_name: None,
                        }
                    }
                };

                if result_tx.send(result).await.is_err() {
                    // Collector is gone; nothing left to report to.
                    break;
                }
            }
            debug!(worker, "worker drained");
        }));
    }
    drop(result_tx);
    drop(task_rx);

    let mut results = Vec::with_capacity(users as usize);
    while let Some(result) = result_rx.recv().await {
        debug!(
            task = result.task_id,
            ok = result.outcome.is_success(),
            "task finished ({}/{users})",
            results.len() + 1,
        );
        results.push(result);
    }

    for handle in handles {
        let _ = handle.await;
    }

    PoolOutput {
        results,
        wall_clock: started.elapsed(),
    }
}

fn join_failure(err: JoinError) -> FailureReason {
    if err.is_panic() {
        let panic = err.into_panic();
        let message = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "workflow panicked".to_string());
        FailureReason::Unexpected(format!("workflow panicked: {message}"))
    } else {
        FailureReason::Unexpected(format!("workflow aborted: {err}"))
    }
}
