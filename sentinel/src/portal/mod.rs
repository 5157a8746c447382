//! reqwest-backed session provider for a real portal.
//!
//! Each acquired session carries its own cookie jar, so one session is one
//! isolated browser-like identity. The login and appointment surfaces live
//! in their own modules, mirroring the pages they drive.

mod appointment;
mod login;

use crate::session::{BookingRequest, BookingSession, Credentials, SessionError, SessionProvider};
use async_trait::async_trait;
use sentinel_core::EnvironmentConfig;
use std::time::Duration;

/// Hard cap on any single HTTP exchange; step-level deadlines are enforced
/// by the harness and are typically much shorter.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpPortal {
    base_url: String,
}

impl HttpPortal {
    pub fn new(environment: &EnvironmentConfig) -> Self {
        Self::from_base_url(&environment.base_url)
    }

    pub fn from_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SessionProvider for HttpPortal {
    type Session = PortalSession;

    async fn acquire(&self) -> Result<PortalSession, SessionError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(CLIENT_TIMEOUT)
            .build()
            .map_err(|err| SessionError::Unavailable(err.to_string()))?;

        Ok(PortalSession {
            client,
            base_url: self.base_url.clone(),
            released: false,
        })
    }
}

/// One user's authenticated HTTP identity against the portal.
pub struct PortalSession {
    client: reqwest::Client,
    base_url: String,
    released: bool,
}

#[async_trait]
impl BookingSession for PortalSession {
    async fn login(&mut self, credentials: &Credentials) -> Result<(), SessionError> {
        login::submit(self, credentials).await
    }

    async fn submit_booking(&mut self, request: &BookingRequest) -> Result<(), SessionError> {
        appointment::submit(self, request).await
    }

    async fn confirmation_visible(&mut self) -> Result<bool, SessionError> {
        appointment::confirmation_visible(self).await
    }

    async fn release(&mut self) {
        // Dropping the client tears down its connection pool; the flag keeps
        // release idempotent.
        if !self.released {
            self.released = true;
            tracing::debug!("portal session released");
        }
    }
}

fn transport(err: reqwest::Error) -> SessionError {
    SessionError::Transport(err.to_string())
}
