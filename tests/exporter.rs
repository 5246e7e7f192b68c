use anyhow::Result;

mod common;

#[tokio::test]
async fn test_metrics_endpoint_serves_degraded_result_without_database() -> Result<()> {
    let port = common::get_available_port();
    let settings = common::unreachable_settings(port);
    let specs = tibero_exporter::collector::loader::load_specs("default_metrics.yaml");
    assert!(!specs.is_empty());

    let handle =
        tokio::spawn(async move { tibero_exporter::exporter::new(settings, specs).await });

    assert!(common::wait_for_server(port, 50).await);

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/metrics", common::get_test_url(port)))
        .send()
        .await?;

    assert_eq!(response.status(), 200);

    let content_type = response
        .headers()
        .get("content-type")
        .expect("Content-Type header should be present");
    assert_eq!(content_type, "text/plain; charset=utf-8");

    // No database and no cache yet: the scrape degrades to the minimal
    // result instead of failing the endpoint.
    let body = response.text().await?;
    assert!(body.contains("# TYPE tibero_up gauge"));
    assert!(body.contains("tibero_up 0"));
    assert!(body.contains("tibero_scrape_duration_seconds"));
    assert!(!body.contains("tibero_sessions_count"));

    handle.abort();

    Ok(())
}

#[tokio::test]
async fn test_health_endpoint_reports_database_error() -> Result<()> {
    let port = common::get_available_port();
    let settings = common::unreachable_settings(port);

    let handle =
        tokio::spawn(async move { tibero_exporter::exporter::new(settings, Vec::new()).await });

    assert!(common::wait_for_server(port, 50).await);

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/health", common::get_test_url(port)))
        .send()
        .await?;

    assert_eq!(response.status(), 503);

    let x_app = response
        .headers()
        .get("X-App")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(x_app.starts_with("tibero_exporter"));

    let health: serde_json::Value = response.json().await?;
    assert_eq!(health["name"], "tibero_exporter");
    assert_eq!(health["database"], "error");

    handle.abort();

    Ok(())
}

#[tokio::test]
async fn test_responses_carry_a_request_id() -> Result<()> {
    let port = common::get_available_port();
    let settings = common::unreachable_settings(port);

    let handle =
        tokio::spawn(async move { tibero_exporter::exporter::new(settings, Vec::new()).await });

    assert!(common::wait_for_server(port, 50).await);

    let client = reqwest::Client::new();

    // A generated id is stamped when the caller sends none.
    let response = client
        .get(format!("{}/metrics", common::get_test_url(port)))
        .send()
        .await?;
    assert!(response.headers().contains_key("x-request-id"));

    // A caller-provided id is propagated untouched.
    let response = client
        .get(format!("{}/metrics", common::get_test_url(port)))
        .header("x-request-id", "test-id-12345")
        .send()
        .await?;
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("test-id-12345")
    );

    handle.abort();

    Ok(())
}

#[tokio::test]
async fn test_scrapes_remain_stable_across_repeated_requests() -> Result<()> {
    let port = common::get_available_port();
    let settings = common::unreachable_settings(port);

    let handle =
        tokio::spawn(async move { tibero_exporter::exporter::new(settings, Vec::new()).await });

    assert!(common::wait_for_server(port, 50).await);

    let client = reqwest::Client::new();
    for _ in 0..3 {
        let response = client
            .get(format!("{}/metrics", common::get_test_url(port)))
            .send()
            .await?;
        assert_eq!(response.status(), 200);
        assert!(response.text().await?.contains("tibero_up 0"));
    }

    handle.abort();

    Ok(())
}
