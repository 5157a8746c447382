//! Appointment surface: form submission and the confirmation probe.

use super::{transport, PortalSession};
use crate::session::{BookingRequest, SessionError};
use reqwest::StatusCode;
use tracing::debug;

/// Text the confirmation page renders once the booking landed.
const CONFIRMATION_MARKER: &str = "appointment confirmation";

pub(super) async fn submit(
    session: &mut PortalSession,
    request: &BookingRequest,
) -> Result<(), SessionError> {
    let url = format!("{}/appointment", session.base_url);
    let form = [
        (
            "hospital_readmission",
            if request.hospital_readmission {
                "yes"
            } else {
                "no"
            },
        ),
        ("healthcare_program", request.healthcare_program.as_str()),
        ("visit_date", request.visit_date.as_str()),
        ("comment", request.comment.as_str()),
    ];

    let response = session
        .client
        .post(&url)
        .form(&form)
        .send()
        .await
        .map_err(transport)?;

    match response.status() {
        status if status.is_success() => {
            debug!("appointment form accepted");
            Ok(())
        }
        StatusCode::UNAUTHORIZED => Err(SessionError::Rejected("not authenticated".into())),
        status => Err(SessionError::Rejected(format!(
            "booking rejected (status {status})"
        ))),
    }
}

pub(super) async fn confirmation_visible(
    session: &mut PortalSession,
) -> Result<bool, SessionError> {
    let url = format!("{}/appointment/confirmation", session.base_url);
    let response = session.client.get(&url).send().await.map_err(transport)?;

    if !response.status().is_success() {
        return Ok(false);
    }
    let body = response.text().await.map_err(transport)?.to_lowercase();
    Ok(body.contains(CONFIRMATION_MARKER))
}
