//! The `StressTest` future and its builder configuration.

use crate::pool::{run_pool, PoolOutput};
use crate::session::{Credentials, SessionProvider};
use crate::workflow::WorkflowContext;
use sentinel_core::{AggregateReport, Deadlines, PatientGenerator, RunResult, StressConfig};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use thiserror::Error;
use tracing::{info, instrument};

/// Fatal, configuration-level failures. Per-task failures never surface
/// here; they are captured in each task's [`RunResult`].
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("no simulated users requested")]
    NoUsers,
    #[error("worker pool size must be at least 1")]
    NoWorkers,
    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),
}

/// Everything a completed stress run produced.
#[derive(Debug, serde::Serialize)]
pub struct StressReport {
    pub aggregate: AggregateReport,
    /// Completion order, not submission order. Sort by `task_id` for
    /// per-user sequencing.
    pub results: Vec<RunResult>,
}

/// Stress-run handle: configure with [`ConfigurableStressTest`] and `.await`
/// to execute.
///
/// # Example
/// ```no_run
/// use sentinel::prelude::*;
///
/// # async fn run(portal: HttpPortal, config: StressConfig) -> Result<(), sentinel::HarnessError> {
/// let report = StressTest::new(portal, config)
///     .users(25)
///     .concurrency(5)
///     .await?;
/// println!("{}", report.aggregate);
/// # Ok(())
/// # }
/// ```
#[pin_project::pin_project]
pub struct StressTest<P> {
    provider: Arc<P>,
    config: StressConfig,
    runner_fut: Option<Pin<Box<dyn Future<Output = Result<StressReport, HarnessError>> + Send>>>,
}

impl<P> StressTest<P>
where
    P: SessionProvider + 'static,
    P::Session: Send,
{
    pub fn new(provider: P, config: StressConfig) -> Self {
        Self {
            provider: Arc::new(provider),
            config,
            runner_fut: None,
        }
    }
}

impl<P> Future for StressTest<P>
where
    P: SessionProvider + 'static,
    P::Session: Send,
{
    type Output = Result<StressReport, HarnessError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.runner_fut.is_none() {
            let provider = self.provider.clone();
            let config = self.config.clone();
            self.runner_fut = Some(Box::pin(async move { run_stress(provider, config).await }));
        }

        if let Some(runner) = &mut self.runner_fut {
            runner.as_mut().poll(cx)
        } else {
            unreachable!()
        }
    }
}

/// Builder-style overrides on top of the explicit [`StressConfig`].
pub trait ConfigurableStressTest: Future + Sized {
    /// Total number of simulated users to run.
    fn users(self, users: u32) -> Self;

    /// Cap on concurrently open sessions. May be lower than `users`.
    fn concurrency(self, concurrency: u32) -> Self;

    /// Per-step deadlines for every task's workflow.
    fn deadlines(self, deadlines: Deadlines) -> Self;

    /// Seed the record generator for reproducible runs.
    fn seed(self, seed: u64) -> Self;
}

impl<P> ConfigurableStressTest for StressTest<P>
where
    P: SessionProvider + 'static,
    P::Session: Send,
{
    fn users(mut self, users: u32) -> Self {
        self.config.load.users = users;
        self
    }

    fn concurrency(mut self, concurrency: u32) -> Self {
        self.config.load.concurrency = concurrency;
        self
    }

    fn deadlines(mut self, deadlines: Deadlines) -> Self {
        self.config.deadlines = deadlines;
        self
    }

    fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }
}

#[instrument(name = "stress", skip_all, fields(env = %config.active_environment))]
async fn run_stress<P>(provider: Arc<P>, config: StressConfig) -> Result<StressReport, HarnessError>
where
    P: SessionProvider + 'static,
    P::Session: Send,
{
    if config.load.users == 0 {
        return Err(HarnessError::NoUsers);
    }
    if config.load.concurrency == 0 {
        return Err(HarnessError::NoWorkers);
    }
    let environment = config
        .environment()
        .map_err(|_| HarnessError::UnknownEnvironment(config.active_environment.clone()))?;

    let credentials = Credentials {
        username: environment.username.clone(),
        password: environment.password.clone(),
    };
    let generator = match config.seed {
        Some(seed) => PatientGenerator::seeded(seed),
        None => PatientGenerator::new(),
    };
    let ctx = Arc::new(WorkflowContext {
        credentials,
        deadlines: config.deadlines.clone(),
        generator: Mutex::new(generator),
    });

    let workers = config.load.worker_count();
    info!(
        "dispatching {} bookings across {} workers",
        config.load.users, workers
    );

    let PoolOutput {
        results,
        wall_clock,
    } = run_pool(provider, ctx, config.load.users, workers).await;

    let aggregate = AggregateReport::from_results(&results, wall_clock);
    info!(
        "run complete: {}/{} successful in {:.2}s",
        aggregate.success_count,
        aggregate.requested,
        wall_clock.as_secs_f64()
    );

    Ok(StressReport { aggregate, results })
}
