#![allow(dead_code)]

use secrecy::SecretString;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use tibero_exporter::collector::config::{PoolSettings, Settings};

/// Settings pointing at a database that is guaranteed unreachable (nothing
/// listens on port 1), so scrapes exercise the degraded paths without any
/// external service.
pub fn unreachable_settings(listen_port: u16) -> Settings {
    Settings {
        db_host: "127.0.0.1".to_string(),
        db_port: 1,
        db_password: SecretString::from("secret".to_string()),
        listen_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
        listen_port,
        pool: PoolSettings {
            connect_timeout: Duration::from_millis(500),
            ..PoolSettings::default()
        },
        ..Settings::default()
    }
}

/// Find an available port for testing (returns port > 1024)
pub fn get_available_port() -> u16 {
    use std::net::TcpListener;

    // Bind to port 0 lets the OS assign an available ephemeral port
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to random port");
    let port = listener
        .local_addr()
        .expect("Failed to get local addr")
        .port();

    assert!(port > 1024, "Assigned port {} should be > 1024", port);

    port
}

/// Wait for server to be ready on the given port
pub async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    use tokio::time::{Duration, sleep};

    for attempt in 1..=max_attempts {
        if tokio::net::TcpStream::connect(format!("127.0.0.1:{}", port))
            .await
            .is_ok()
        {
            return true;
        }

        if attempt % 10 == 0 {
            eprintln!(
                "Still waiting for server on port {} (attempt {}/{})",
                port, attempt, max_attempts
            );
        }

        sleep(Duration::from_millis(100)).await;
    }

    eprintln!(
        "Failed to connect to server on port {} after {} attempts",
        port, max_attempts
    );
    false
}

/// Get base URL for test server
pub fn get_test_url(port: u16) -> String {
    format!("http://127.0.0.1:{}", port)
}
