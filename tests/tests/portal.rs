//! End-to-end runs over HTTP against the mock portal. These bind real
//! sockets, so they sit behind the `integration` feature like the rest of
//! the socket-bound suite.

mod utils;
#[allow(unused)]
use utils::*;

#[cfg(feature = "integration")]
mod tests {
    use super::*;

    use mock_portal::PortalBehavior;
    use sentinel::prelude::*;
    use sentinel_core::{Deadlines, FailureReason, StressConfig};
    use std::time::Duration;

    async fn spawn_portal(behavior: PortalBehavior) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            mock_portal::serve(listener, DEMO_USERNAME, DEMO_PASSWORD, behavior).await;
        });
        format!("http://{addr}")
    }

    fn portal_config(base_url: &str, users: u32, concurrency: u32) -> StressConfig {
        let mut config = test_config(users, concurrency);
        config.deadlines = Deadlines {
            login: Duration::from_secs(5),
            submission: Duration::from_secs(5),
            confirmation: Duration::from_secs(3),
            poll_interval: Duration::from_millis(50),
        };
        if let Some(environment) = config.environments.get_mut("demo") {
            environment.base_url = base_url.to_string();
        }
        config
    }

    #[tokio::test]
    async fn full_run_against_the_portal_succeeds() {
        init();
        let base_url = spawn_portal(PortalBehavior {
            booking_delay: Duration::from_millis(100),
            ..PortalBehavior::default()
        })
        .await;

        let config = portal_config(&base_url, 5, 2);
        let portal = HttpPortal::new(config.environment().unwrap());
        let report = StressTest::new(portal, config).await.unwrap();

        assert_eq!(report.aggregate.success_count, 5);
        assert!((report.aggregate.success_rate() - 1.0).abs() < f64::EPSILON);
        for result in &report.results {
            assert!(result.patient_name.is_some());
        }
    }

    #[tokio::test]
    async fn stalled_confirmation_times_out_for_exactly_one_user() {
        init();
        let base_url = spawn_portal(PortalBehavior {
            booking_delay: Duration::from_millis(50),
            stall_confirmation_every: Some(3),
            ..PortalBehavior::default()
        })
        .await;

        // Serial execution keeps the booking ordinals deterministic.
        let config = portal_config(&base_url, 3, 1);
        let portal = HttpPortal::new(config.environment().unwrap());
        let report = StressTest::new(portal, config).await.unwrap();

        assert_eq!(report.aggregate.success_count, 2);
        assert_eq!(report.aggregate.failures["confirmation_timeout"], 1);
    }

    #[tokio::test]
    async fn injected_login_rejection_is_captured() {
        init();
        let base_url = spawn_portal(PortalBehavior {
            fail_login_every: Some(2),
            ..PortalBehavior::default()
        })
        .await;

        let config = portal_config(&base_url, 2, 1);
        let portal = HttpPortal::new(config.environment().unwrap());
        let report = StressTest::new(portal, config).await.unwrap();

        assert_eq!(report.aggregate.success_count, 1);
        assert_eq!(report.aggregate.failures["login_failed"], 1);
    }

    #[tokio::test]
    async fn confirmation_requires_a_session() -> anyhow::Result<()> {
        init();
        let base_url = spawn_portal(PortalBehavior::default()).await;

        let client = reqwest::Client::new();
        let response = client
            .get(format!("{base_url}/appointment/confirmation"))
            .send()
            .await?;
        assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn wrong_credentials_fail_every_login() {
        init();
        let base_url = spawn_portal(PortalBehavior::default()).await;

        let mut config = portal_config(&base_url, 3, 3);
        if let Some(environment) = config.environments.get_mut("demo") {
            environment.password = "not-the-password".into();
        }
        let portal = HttpPortal::new(config.environment().unwrap());
        let report = StressTest::new(portal, config).await.unwrap();

        assert_eq!(report.aggregate.success_count, 0);
        assert_eq!(report.aggregate.failures["login_failed"], 3);
        for result in &report.results {
            assert!(matches!(
                &result.outcome,
                Outcome::Failure(FailureReason::LoginFailed(_))
            ));
        }
    }
}
