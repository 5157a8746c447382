use std::time::Duration;

/// Default deadline for the login step.
pub const DEFAULT_LOGIN_DEADLINE: Duration = Duration::from_secs(10);

/// Default deadline for submitting the appointment form.
pub const DEFAULT_SUBMISSION_DEADLINE: Duration = Duration::from_secs(5);

/// Default deadline for the confirmation signal to appear.
pub const DEFAULT_CONFIRMATION_DEADLINE: Duration = Duration::from_secs(10);

/// Default interval between confirmation probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Default number of simulated users per run.
pub const DEFAULT_USERS: u32 = 10;

/// Default cap on concurrently open sessions.
pub const DEFAULT_CONCURRENCY: u32 = 10;
