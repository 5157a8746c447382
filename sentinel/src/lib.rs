#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod portal;
pub mod runner;
pub mod session;

pub(crate) mod pool;
pub(crate) mod workflow;

pub use runner::{ConfigurableStressTest, HarnessError, StressReport, StressTest};
pub use session::{
    BookingRequest, BookingSession, Credentials, HealthcareProgram, SessionError, SessionProvider,
};

pub mod prelude {
    pub use crate::portal::HttpPortal;
    pub use crate::runner::{ConfigurableStressTest, StressReport, StressTest};
    pub use crate::session::{BookingSession, SessionProvider};
    pub use sentinel_core::{AggregateReport, Outcome, RunResult, StressConfig};
}
