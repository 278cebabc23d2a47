use jobharvest_browser::{BrowserActions, BrowserEngine, ElementTarget, EngineOptions};
use std::time::Duration;

fn headless() -> EngineOptions {
    EngineOptions {
        headless: true,
        min_navigation_interval: Duration::from_millis(500),
        ..EngineOptions::default()
    }
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_browser_engine_creation() {
    let engine = BrowserEngine::launch(headless()).await;
    assert!(engine.is_ok(), "Failed to create browser engine");
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_navigation_and_content() {
    let engine = BrowserEngine::launch(headless()).await.unwrap();

    engine.navigate("https://example.com").await.unwrap();
    let html = engine.content().await.unwrap();
    assert!(html.contains("Example Domain"));
    assert!(engine.current_url().await.unwrap().starts_with("https://example.com"));
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_missing_target_is_reported() {
    let engine = BrowserEngine::launch(headless()).await.unwrap();
    engine.navigate("https://example.com").await.unwrap();

    let err = engine
        .click(&ElementTarget::nth("li.job-card", 4))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("li.job-card[4]"));
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_same_host_navigation_is_spaced() {
    let engine = BrowserEngine::launch(headless()).await.unwrap();

    let start = std::time::Instant::now();
    engine.navigate("https://example.com").await.unwrap();
    engine.navigate("https://example.com/?again").await.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(500));
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_page_is_unusable_after_close() {
    let engine = BrowserEngine::launch(headless()).await.unwrap();
    engine.navigate("https://example.com").await.unwrap();

    engine.close().await.unwrap();
    // The handler task has drained and the connection is gone
    assert!(engine.content().await.is_err());
}
