//! Capability boundary between the harness core and the automation backend.
//!
//! The pool and workflow only ever see these traits, so the concurrency and
//! aggregation logic runs unchanged against the HTTP portal or an in-process
//! mock.

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by a session backend.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// The backend could not produce a session at all.
    #[error("session unavailable: {0}")]
    Unavailable(String),
    /// The target application rejected the operation.
    #[error("rejected by portal: {0}")]
    Rejected(String),
    /// Transport-level failure talking to the target.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Login credentials for one simulated user.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HealthcareProgram {
    Medicare,
    #[default]
    Medicaid,
    None,
}

impl HealthcareProgram {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthcareProgram::Medicare => "Medicare",
            HealthcareProgram::Medicaid => "Medicaid",
            HealthcareProgram::None => "None",
        }
    }
}

/// Appointment form contents for one booking.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingRequest {
    /// DD/MM/YYYY, as the portal's date field expects.
    pub visit_date: String,
    /// Free-text medical notes.
    pub comment: String,
    pub hospital_readmission: bool,
    pub healthcare_program: HealthcareProgram,
}

/// One simulated user's isolated portal identity.
///
/// A session is owned by exactly one worker end-to-end; the harness releases
/// it on every exit path before reporting the worker's result. A panicking
/// workflow unwinds inside its own task and drops the session instead, so
/// backends needing cleanup beyond drop semantics should also implement
/// `Drop`.
#[async_trait]
pub trait BookingSession: Send {
    async fn login(&mut self, credentials: &Credentials) -> Result<(), SessionError>;

    async fn submit_booking(&mut self, request: &BookingRequest) -> Result<(), SessionError>;

    /// One confirmation probe. The harness owns the polling loop and the
    /// deadline; a `false` just means "not visible yet".
    async fn confirmation_visible(&mut self) -> Result<bool, SessionError>;

    /// Idempotent; always safe to call.
    async fn release(&mut self);
}

/// Opens isolated sessions against the target application.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    type Session: BookingSession + 'static;

    async fn acquire(&self) -> Result<Self::Session, SessionError>;
}
