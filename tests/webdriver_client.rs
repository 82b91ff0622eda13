//! WebDriver client tests against a mock driver endpoint.

use std::path::Path;
use std::time::Duration;

use portal_mirror_core::{Browser, WebDriverBrowser};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mock_session(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": { "sessionId": "sess1", "capabilities": {} }
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/session/sess1/timeouts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
        .mount(server)
        .await;
}

async fn connect(server: &MockServer) -> WebDriverBrowser {
    WebDriverBrowser::connect(&server.uri(), Path::new("/tmp/dl"), true)
        .await
        .expect("session should be created")
}

#[tokio::test]
async fn test_connect_negotiates_a_session() {
    let server = MockServer::start().await;
    mock_session(&server).await;

    let _browser = connect(&server).await;

    let requests = server.received_requests().await.unwrap();
    let session_request = requests
        .iter()
        .find(|request| request.url.path() == "/session")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&session_request.body).unwrap();
    let prefs = &body["capabilities"]["alwaysMatch"]["moz:firefoxOptions"]["prefs"];
    // download auto-save is what makes correlation possible
    assert_eq!(prefs["browser.download.dir"], "/tmp/dl");
    assert_eq!(prefs["browser.download.folderList"], 2);
    assert_eq!(prefs["pdfjs.disabled"], true);
}

#[tokio::test]
async fn test_page_source_returns_rendered_content() {
    let server = MockServer::start().await;
    mock_session(&server).await;
    Mock::given(method("GET"))
        .and(path("/session/sess1/source"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": "<html><body>bonjour</body></html>"
        })))
        .mount(&server)
        .await;

    let browser = connect(&server).await;
    let source = browser.page_source().await.unwrap();
    assert_eq!(source, "<html><body>bonjour</body></html>");
}

#[tokio::test]
async fn test_click_first_falls_through_lookup_strategies() {
    let server = MockServer::start().await;
    mock_session(&server).await;
    // first strategy misses, second matches
    Mock::given(method("POST"))
        .and(path("/session/sess1/element"))
        .and(body_partial_json(json!({ "value": "[name='identifiant']" })))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "value": { "error": "no such element", "message": "not found" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/session/sess1/element"))
        .and(body_partial_json(json!({ "value": "#identifiant" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": { "element-6066-11e4-a52e-4f735466cecf": "elem-7" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/session/sess1/element/elem-7/click"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
        .mount(&server)
        .await;

    let browser = connect(&server).await;
    browser
        .click_first(&["[name='identifiant']", "#identifiant"])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_exhausted_lookup_strategies_surface_an_error() {
    let server = MockServer::start().await;
    mock_session(&server).await;
    Mock::given(method("POST"))
        .and(path("/session/sess1/element"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "value": { "error": "no such element", "message": "not found" }
        })))
        .mount(&server)
        .await;

    let browser = connect(&server).await;
    let error = browser
        .click_first(&["#missing", ".also-missing"])
        .await
        .unwrap_err();
    let rendered = error.to_string();
    assert!(rendered.contains("#missing"), "strategies listed in: {rendered}");
    assert!(rendered.contains(".also-missing"), "strategies listed in: {rendered}");
}

#[tokio::test]
async fn test_trigger_download_swallows_the_expected_timeout() {
    let server = MockServer::start().await;
    mock_session(&server).await;
    Mock::given(method("POST"))
        .and(path("/session/sess1/url"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "value": { "error": "timeout", "message": "page load timed out" }
        })))
        .mount(&server)
        .await;

    let browser = connect(&server).await;
    browser
        .trigger_download("https://cahier-de-prepa.fr/x/download?id=F1")
        .await
        .expect("page-load timeout is the expected trigger outcome");
}

#[tokio::test]
async fn test_trigger_download_reports_other_navigation_errors() {
    let server = MockServer::start().await;
    mock_session(&server).await;
    Mock::given(method("POST"))
        .and(path("/session/sess1/url"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "value": { "error": "unknown command", "message": "nope" }
        })))
        .mount(&server)
        .await;

    let browser = connect(&server).await;
    let result = browser
        .trigger_download("https://cahier-de-prepa.fr/x/download?id=F1")
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_wait_for_any_times_out_to_false() {
    let server = MockServer::start().await;
    mock_session(&server).await;
    Mock::given(method("POST"))
        .and(path("/session/sess1/elements"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": [] })))
        .mount(&server)
        .await;

    let browser = connect(&server).await;
    let found = browser
        .wait_for_any(&["section"], Duration::from_millis(50))
        .await
        .unwrap();
    assert!(!found);
}

#[tokio::test]
async fn test_wait_for_any_finds_a_present_marker() {
    let server = MockServer::start().await;
    mock_session(&server).await;
    Mock::given(method("POST"))
        .and(path("/session/sess1/elements"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [ { "element-6066-11e4-a52e-4f735466cecf": "elem-1" } ]
        })))
        .mount(&server)
        .await;

    let browser = connect(&server).await;
    let found = browser
        .wait_for_any(&[".icon-deconnexion"], Duration::from_secs(1))
        .await
        .unwrap();
    assert!(found);
}
