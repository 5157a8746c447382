//! Shared helpers: a scripted in-process session backend for exercising the
//! harness without any network, plus config fixtures.

// Each test binary compiles its own copy and uses a different subset.
#![allow(dead_code)]

use async_trait::async_trait;
use sentinel::{BookingRequest, BookingSession, Credentials, SessionError, SessionProvider};
use sentinel_core::{Deadlines, EnvironmentConfig, LoadProfile, StressConfig};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

pub const DEMO_USERNAME: &str = "dr.demo@clinic-sentinel.test";
pub const DEMO_PASSWORD: &str = "DemoPass123!";

pub fn init() {
    static ONCE: OnceLock<()> = OnceLock::new();
    ONCE.get_or_init(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

pub fn test_config(users: u32, concurrency: u32) -> StressConfig {
    StressConfig {
        active_environment: "demo".into(),
        environments: HashMap::from([(
            "demo".into(),
            EnvironmentConfig {
                base_url: "http://127.0.0.1:0".into(),
                username: DEMO_USERNAME.into(),
                password: DEMO_PASSWORD.into(),
            },
        )]),
        deadlines: Deadlines {
            login: Duration::from_secs(30),
            submission: Duration::from_secs(5),
            confirmation: Duration::from_secs(2),
            poll_interval: Duration::from_millis(100),
        },
        load: LoadProfile { users, concurrency },
        seed: Some(42),
    }
}

/// Per-session behavior, keyed by acquisition ordinal. Sessions beyond the
/// script list succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Succeed,
    /// Succeed after a fixed simulated login delay.
    SucceedAfter(Duration),
    RefuseSession,
    RejectLogin,
    NeverConfirm,
    PanicOnSubmit,
}

/// In-flight session gauge with a high-water mark.
#[derive(Debug, Default)]
pub struct Gauge {
    current: AtomicUsize,
    max: AtomicUsize,
}

impl Gauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn high_water(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

pub struct ScriptedProvider {
    delay: Duration,
    scripts: Vec<Script>,
    acquired: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
    gauge: Arc<Gauge>,
}

impl ScriptedProvider {
    /// Every session succeeds after `delay` of simulated work.
    pub fn uniform(delay: Duration) -> Self {
        Self::with_scripts(delay, vec![])
    }

    pub fn with_scripts(delay: Duration, scripts: Vec<Script>) -> Self {
        Self {
            delay,
            scripts,
            acquired: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicUsize::new(0)),
            gauge: Arc::new(Gauge::default()),
        }
    }

    pub fn gauge(&self) -> Arc<Gauge> {
        self.gauge.clone()
    }

    /// Counts `acquire` calls, refused ones included.
    pub fn acquired(&self) -> Arc<AtomicUsize> {
        self.acquired.clone()
    }

    /// Counts sessions handed back, whether via `release` or drop.
    pub fn released(&self) -> Arc<AtomicUsize> {
        self.released.clone()
    }
}

#[async_trait]
impl SessionProvider for ScriptedProvider {
    type Session = ScriptedSession;

    async fn acquire(&self) -> Result<ScriptedSession, SessionError> {
        let ordinal = self.acquired.fetch_add(1, Ordering::SeqCst);
        let script = self.scripts.get(ordinal).copied().unwrap_or(Script::Succeed);

        if script == Script::RefuseSession {
            return Err(SessionError::Unavailable("no browser slots".into()));
        }

        self.gauge.enter();
        Ok(ScriptedSession {
            script,
            delay: self.delay,
            gauge: self.gauge.clone(),
            released_counter: self.released.clone(),
            released: false,
        })
    }
}

pub struct ScriptedSession {
    script: Script,
    delay: Duration,
    gauge: Arc<Gauge>,
    released_counter: Arc<AtomicUsize>,
    released: bool,
}

impl ScriptedSession {
    fn hand_back(&mut self) {
        if !self.released {
            self.released = true;
            self.gauge.exit();
            self.released_counter.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl BookingSession for ScriptedSession {
    async fn login(&mut self, _credentials: &Credentials) -> Result<(), SessionError> {
        let delay = match self.script {
            Script::SucceedAfter(delay) => delay,
            _ => self.delay,
        };
        tokio::time::sleep(delay).await;
        if self.script == Script::RejectLogin {
            return Err(SessionError::Rejected("invalid credentials".into()));
        }
        Ok(())
    }

    async fn submit_booking(&mut self, _request: &BookingRequest) -> Result<(), SessionError> {
        if self.script == Script::PanicOnSubmit {
            panic!("form renderer crashed");
        }
        Ok(())
    }

    async fn confirmation_visible(&mut self) -> Result<bool, SessionError> {
        Ok(self.script != Script::NeverConfirm)
    }

    async fn release(&mut self) {
        self.hand_back();
    }
}

// A workflow that panics unwinds without reaching `release`; the drop
// backstop keeps the gauge and release accounting truthful.
impl Drop for ScriptedSession {
    fn drop(&mut self) {
        self.hand_back();
    }
}
