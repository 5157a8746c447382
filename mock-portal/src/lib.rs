//! Mock healthcare portal: just enough login/booking/confirmation surface to
//! exercise the harness end-to-end, plus injection knobs for forcing
//! failures on specific attempt ordinals.

use axum::{
    extract::{Form, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tower_http::trace::TraceLayer;
use tracing::debug;
use uuid::Uuid;

/// Injection knobs. Ordinals are 1-based.
#[derive(Debug, Clone, Default)]
pub struct PortalBehavior {
    /// Confirmation becomes visible this long after booking.
    pub booking_delay: Duration,
    /// Reject every Nth login attempt regardless of credentials.
    pub fail_login_every: Option<u64>,
    /// Every Nth booking never confirms.
    pub stall_confirmation_every: Option<u64>,
}

pub struct PortalState {
    behavior: PortalBehavior,
    username: String,
    password: String,
    sessions: RwLock<HashMap<String, SessionState>>,
    logins: AtomicU64,
    bookings: AtomicU64,
}

#[derive(Debug, Clone, Default)]
struct SessionState {
    booking: Option<Booking>,
}

#[derive(Debug, Clone)]
struct Booking {
    visit_date: String,
    comment: String,
    program: String,
    readmission: String,
    /// `None` means the booking is stalled and never confirms.
    ready_at: Option<Instant>,
}

pub fn router(username: &str, password: &str, behavior: PortalBehavior) -> Router {
    let state = Arc::new(PortalState {
        behavior,
        username: username.to_string(),
        password: password.to_string(),
        sessions: RwLock::new(HashMap::new()),
        logins: AtomicU64::new(0),
        bookings: AtomicU64::new(0),
    });

    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/appointment", post(book))
        .route("/appointment/confirmation", get(confirmation))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(addr: SocketAddr, username: &str, password: &str, behavior: PortalBehavior) {
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    serve(listener, username, password, behavior).await;
}

/// Serve on an already-bound listener; tests bind port 0 and read the local
/// address back.
pub async fn serve(
    listener: tokio::net::TcpListener,
    username: &str,
    password: &str,
    behavior: PortalBehavior,
) {
    let app = router(username, password, behavior);
    axum::serve(listener, app).await.unwrap();
}

async fn login_page() -> Html<&'static str> {
    Html(
        "<form method=\"post\" action=\"/login\">\
         <input id=\"username\" name=\"username\">\
         <input id=\"password\" name=\"password\" type=\"password\">\
         <button type=\"submit\">Login</button></form>",
    )
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login(
    State(state): State<Arc<PortalState>>,
    Form(form): Form<LoginForm>,
) -> Response {
    let attempt = state.logins.fetch_add(1, Ordering::Relaxed) + 1;

    if let Some(every) = state.behavior.fail_login_every {
        if attempt % every == 0 {
            debug!(attempt, "injected login rejection");
            return error_page(
                StatusCode::UNAUTHORIZED,
                "Invalid username or password",
            );
        }
    }

    if form.username != state.username || form.password != state.password {
        return error_page(StatusCode::UNAUTHORIZED, "Invalid username or password");
    }

    let sid = Uuid::new_v4().to_string();
    state
        .sessions
        .write()
        .unwrap()
        .insert(sid.clone(), SessionState::default());
    debug!(attempt, "login accepted");

    (
        StatusCode::OK,
        [(header::SET_COOKIE, format!("sid={sid}; Path=/"))],
        Html("<h2 id=\"dashboard\">Dashboard</h2><a href=\"/appointment\">Make Appointment</a>"),
    )
        .into_response()
}

#[derive(Deserialize)]
struct AppointmentForm {
    #[serde(default)]
    hospital_readmission: Option<String>,
    #[serde(default)]
    healthcare_program: Option<String>,
    visit_date: String,
    comment: String,
}

async fn book(
    State(state): State<Arc<PortalState>>,
    headers: HeaderMap,
    Form(form): Form<AppointmentForm>,
) -> Response {
    let Some(sid) = session_id(&headers) else {
        return error_page(StatusCode::UNAUTHORIZED, "No active session");
    };

    let ordinal = state.bookings.fetch_add(1, Ordering::Relaxed) + 1;
    let stalled = state
        .behavior
        .stall_confirmation_every
        .map_or(false, |every| ordinal % every == 0);
    let ready_at = if stalled {
        debug!(ordinal, "injected confirmation stall");
        None
    } else {
        Some(Instant::now() + state.behavior.booking_delay)
    };

    let mut sessions = state.sessions.write().unwrap();
    let Some(session) = sessions.get_mut(&sid) else {
        return error_page(StatusCode::UNAUTHORIZED, "No active session");
    };
    session.booking = Some(Booking {
        visit_date: form.visit_date,
        comment: form.comment,
        program: form.healthcare_program.unwrap_or_else(|| "None".to_string()),
        readmission: form.hospital_readmission.unwrap_or_else(|| "no".to_string()),
        ready_at,
    });

    (StatusCode::OK, Html("<p>Booking received</p>")).into_response()
}

async fn confirmation(State(state): State<Arc<PortalState>>, headers: HeaderMap) -> Response {
    let Some(sid) = session_id(&headers) else {
        return error_page(StatusCode::UNAUTHORIZED, "No active session");
    };

    let sessions = state.sessions.read().unwrap();
    let Some(session) = sessions.get(&sid) else {
        return error_page(StatusCode::UNAUTHORIZED, "No active session");
    };

    match &session.booking {
        Some(booking) if booking.ready_at.map_or(false, |at| Instant::now() >= at) => Html(format!(
            "<h2>Appointment Confirmation</h2>\
             <p>Visit date: {}</p><p>Program: {}</p><p>Readmission: {}</p><p>{}</p>",
            booking.visit_date, booking.program, booking.readmission, booking.comment
        ))
        .into_response(),
        Some(_) => Html("<h2>Processing</h2>".to_string()).into_response(),
        None => error_page(StatusCode::NOT_FOUND, "No booking on record"),
    }
}

fn session_id(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies
        .split(';')
        .filter_map(|part| part.trim().strip_prefix("sid="))
        .next()
        .map(str::to_string)
}

fn error_page(status: StatusCode, message: &str) -> Response {
    (status, Html(format!("<p class=\"error\">{message}</p>"))).into_response()
}
