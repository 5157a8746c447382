use mock_portal::{run, PortalBehavior};
use std::net::SocketAddr;
use std::time::Duration;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    let addr: SocketAddr = "0.0.0.0:3002".parse().unwrap();
    let behavior = PortalBehavior {
        booking_delay: Duration::from_millis(500),
        ..PortalBehavior::default()
    };

    run(
        addr,
        "dr.demo@clinic-sentinel.test",
        "DemoPass123!",
        behavior,
    )
    .await;
}
