//! One task end-to-end: acquire a session, authenticate, generate a record,
//! submit the form, wait for the confirmation signal.
//!
//! Every exit path converts into an [`Outcome`]; nothing escapes the task
//! boundary.

use crate::session::{
    BookingRequest, BookingSession, Credentials, HealthcareProgram, SessionProvider,
};
use chrono::{Days, Local};
use sentinel_core::{
    Deadlines, FailureReason, Outcome, PatientGenerator, RunResult, TaskId, WorkflowStep,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::debug;

/// Shared, read-mostly state for all workers of one run.
pub(crate) struct WorkflowContext {
    pub credentials: Credentials,
    pub deadlines: Deadlines,
    pub generator: Mutex<PatientGenerator>,
}

/// Drives one task end-to-end and always produces a result.
pub(crate) async fn run_workflow<P>(
    provider: Arc<P>,
    ctx: Arc<WorkflowContext>,
    task_id: TaskId,
) -> RunResult
where
    P: SessionProvider,
{
    // The per-task clock covers session acquisition through verification.
    let started = Instant::now();
    let (outcome, patient_name) = execute(provider.as_ref(), &ctx, task_id).await;
    let duration = started.elapsed();

    record_outcome(&outcome, duration);

    RunResult {
        task_id,
        duration,
        outcome,
        patient_name,
    }
}

async fn execute<P>(
    provider: &P,
    ctx: &WorkflowContext,
    task_id: TaskId,
) -> (Outcome, Option<String>)
where
    P: SessionProvider,
{
    let mut session = match provider.acquire().await {
        Ok(session) => session,
        Err(err) => {
            return (
                Outcome::Failure(FailureReason::SessionUnavailable(err.to_string())),
                None,
            )
        }
    };

    let driven = drive(&mut session, ctx, task_id).await;
    session.release().await;

    match driven {
        Ok(patient_name) => (Outcome::Success, Some(patient_name)),
        Err(reason) => (Outcome::Failure(reason), None),
    }
}

async fn drive<S>(
    session: &mut S,
    ctx: &WorkflowContext,
    task_id: TaskId,
) -> Result<String, FailureReason>
where
    S: BookingSession,
{
    let deadlines = &ctx.deadlines;

    match timeout(deadlines.login, session.login(&ctx.credentials)).await {
        Ok(Ok(())) => debug!(task = task_id, "login accepted"),
        Ok(Err(err)) => return Err(FailureReason::LoginFailed(err.to_string())),
        Err(_) => {
            return Err(FailureReason::StepTimeout {
                step: WorkflowStep::Login,
                deadline: deadlines.login,
            })
        }
    }

    let patient = {
        // Recover the generator even if another worker panicked mid-generate.
        let mut generator = match ctx.generator.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        generator.generate()
    };

    let request = BookingRequest {
        visit_date: visit_date(task_id),
        comment: patient.medical_notes(),
        hospital_readmission: true,
        healthcare_program: HealthcareProgram::Medicaid,
    };

    match timeout(deadlines.submission, session.submit_booking(&request)).await {
        Ok(Ok(())) => debug!(task = task_id, "booking submitted"),
        Ok(Err(err)) => return Err(FailureReason::SubmissionFailed(err.to_string())),
        Err(_) => {
            return Err(FailureReason::StepTimeout {
                step: WorkflowStep::Submission,
                deadline: deadlines.submission,
            })
        }
    }

    await_confirmation(session, deadlines).await?;
    Ok(patient.full_name)
}

async fn await_confirmation<S>(session: &mut S, deadlines: &Deadlines) -> Result<(), FailureReason>
where
    S: BookingSession,
{
    let poll = async {
        loop {
            match session.confirmation_visible().await {
                Ok(true) => return,
                Ok(false) => {}
                // A failed probe is not terminal; the deadline decides.
                Err(err) => debug!("confirmation probe failed: {err}"),
            }
            sleep(deadlines.poll_interval).await;
        }
    };

    timeout(deadlines.confirmation, poll)
        .await
        .map_err(|_| FailureReason::ConfirmationTimeout {
            waited: deadlines.confirmation,
        })
}

/// A near-future visit date, spread across tasks so parallel bookings are
/// not byte-identical.
fn visit_date(task_id: TaskId) -> String {
    let offset = 7 + u64::from(task_id) % 53;
    let date = Local::now().date_naive() + Days::new(offset);
    date.format("%d/%m/%Y").to_string()
}

#[allow(unused_variables)]
fn record_outcome(outcome: &Outcome, duration: Duration) {
    #[cfg(feature = "metrics")]
    {
        match outcome {
            Outcome::Success => metrics::counter!("sentinel_booking_success").increment(1),
            Outcome::Failure(_) => metrics::counter!("sentinel_booking_error").increment(1),
        }
        metrics::histogram!("sentinel_booking_duration_seconds").record(duration.as_secs_f64());
    }
}
