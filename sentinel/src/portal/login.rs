//! Login surface: credential submission and result detection.

use super::{transport, PortalSession};
use crate::session::{Credentials, SessionError};
use tracing::debug;

const LOCKED_MARKERS: [&str; 3] = [
    "account has been locked",
    "account locked",
    "too many failed attempts",
];

const INVALID_CREDENTIAL_MARKERS: [&str; 3] = [
    "invalid username or password",
    "invalid credentials",
    "login failed",
];

pub(super) async fn submit(
    session: &mut PortalSession,
    credentials: &Credentials,
) -> Result<(), SessionError> {
    let url = format!("{}/login", session.base_url);
    let form = [
        ("username", credentials.username.as_str()),
        ("password", credentials.password.as_str()),
    ];

    let response = session
        .client
        .post(&url)
        .form(&form)
        .send()
        .await
        .map_err(transport)?;
    let status = response.status();
    let body = response.text().await.map_err(transport)?.to_lowercase();

    if status.is_success() && body.contains("dashboard") {
        debug!("login accepted");
        return Ok(());
    }

    if LOCKED_MARKERS.iter().any(|marker| body.contains(marker)) {
        return Err(SessionError::Rejected("account locked".into()));
    }
    if INVALID_CREDENTIAL_MARKERS
        .iter()
        .any(|marker| body.contains(marker))
    {
        return Err(SessionError::Rejected("invalid credentials".into()));
    }

    Err(SessionError::Rejected(format!(
        "login not accepted (status {status})"
    )))
}
