//! Wire-level tests for `WebDriverSession` against a mockito server.

mod common;

use base64::Engine;
use mockito::Matcher;
use serde_json::{json, Value};

use common::{init_tracing, reply};
use scrollhound_core::actions::{Origin, PointerKind, SequenceBuilder};
use scrollhound_core::geometry::Rectangle;
use scrollhound_core::locator::Locator;
use scrollhound_core::session::{ElementHandle, Platform, Session, SessionError};
use scrollhound_core::webdriver::WebDriverSession;

async fn json_mock(
    server: &mut mockito::ServerGuard,
    method: &str,
    path: &str,
    status: usize,
    value: Value,
) -> mockito::Mock {
    server
        .mock(method, path)
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(reply(value))
        .create_async()
        .await
}

#[tokio::test]
async fn test_attach_reads_platform_from_capabilities() {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let mock = json_mock(
        &mut server,
        "GET",
        "/session/s-1",
        200,
        json!({"capabilities": {"platformName": "Android", "automationName": "UiAutomator2"}}),
    )
    .await;

    let session = WebDriverSession::attach(&server.url(), "s-1").await.unwrap();

    assert_eq!(session.platform(), Platform::Android);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_find_elements_sends_strategy_and_parses_handles() {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/session/s-1/elements")
        .match_body(Matcher::Json(json!({"using": "css selector", "value": "li.row"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(reply(json!([
            {"element-6066-11e4-a52e-4f735466cecf": "e1"},
            {"ELEMENT": "e2"}
        ])))
        .create_async()
        .await;
    let session = WebDriverSession::new(&server.url(), "s-1", Platform::Web).unwrap();

    let handles = session.find_elements(&Locator::css("li.row")).await.unwrap();

    assert_eq!(handles, vec![ElementHandle::new("e1"), ElementHandle::new("e2")]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_error_reply_maps_to_no_such_element() {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let _mock = json_mock(
        &mut server,
        "GET",
        "/session/s-1/element/gone/rect",
        404,
        json!({"error": "no such element", "message": "stale", "stacktrace": ""}),
    )
    .await;
    let session = WebDriverSession::new(&server.url(), "s-1", Platform::Web).unwrap();

    let err = session
        .element_rect(&ElementHandle::new("gone"))
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::NoSuchElement(m) if m == "stale"));
}

#[tokio::test]
async fn test_unknown_mobile_command_is_unsupported() {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/session/s-1/execute/sync")
        .match_body(Matcher::Json(json!({
            "script": "mobile: scrollGesture",
            "args": [{"direction": "up"}]
        })))
        .with_status(404)
        .with_header("content-type", "application/json")
        .with_body(reply(json!({"error": "unknown method", "message": "mobile: scrollGesture"})))
        .create_async()
        .await;
    let session = WebDriverSession::new(&server.url(), "s-1", Platform::Ios).unwrap();

    let mut params = serde_json::Map::new();
    params.insert("direction".into(), "up".into());
    let err = session.execute_mobile("scrollGesture", params).await.unwrap_err();

    assert!(matches!(err, SessionError::UnsupportedCommand(_)));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_screenshot_is_base64_decoded() {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let encoded = base64::engine::general_purpose::STANDARD.encode(b"\x89PNG fake");
    let _mock = json_mock(&mut server, "GET", "/session/s-1/screenshot", 200, Value::String(encoded)).await;
    let session = WebDriverSession::new(&server.url(), "s-1", Platform::Web).unwrap();

    let png = session.screenshot().await.unwrap();

    assert_eq!(png, b"\x89PNG fake");
}

#[tokio::test]
async fn test_rects_and_window_size() {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let _window = json_mock(
        &mut server,
        "GET",
        "/session/s-1/window/rect",
        200,
        json!({"x": 0, "y": 0, "width": 1080, "height": 2340}),
    )
    .await;
    let _element = json_mock(
        &mut server,
        "GET",
        "/session/s-1/element/e1/rect",
        200,
        json!({"x": 12.0, "y": 300.4, "width": 200, "height": 48}),
    )
    .await;
    let session = WebDriverSession::new(&server.url(), "s-1", Platform::Android).unwrap();

    assert_eq!(session.window_size().await.unwrap(), Rectangle::new(0, 0, 1080, 2340));
    assert_eq!(
        session.element_rect(&ElementHandle::new("e1")).await.unwrap(),
        Rectangle::new(12, 300, 200, 48)
    );
}

#[tokio::test]
async fn test_perform_and_release_actions() {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let perform = server
        .mock("POST", "/session/s-1/actions")
        .match_body(Matcher::Json(json!({
            "actions": [{
                "type": "pointer",
                "id": "finger1",
                "parameters": {"pointerType": "touch"},
                "actions": [
                    {"type": "pointerMove", "duration": 0, "origin": "viewport", "x": 5, "y": 6},
                    {"type": "pointerDown", "button": 0},
                    {"type": "pointerUp", "button": 0}
                ]
            }]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(reply(Value::Null))
        .create_async()
        .await;
    let release = json_mock(&mut server, "DELETE", "/session/s-1/actions", 200, Value::Null).await;
    let session = WebDriverSession::new(&server.url(), "s-1", Platform::Android).unwrap();
    let tap = SequenceBuilder::pointer("finger1", PointerKind::Touch)
        .move_to(std::time::Duration::ZERO, Origin::Viewport, 5, 6)
        .down()
        .up()
        .build();

    session.perform_actions(&[tap]).await.unwrap();
    session.release_actions().await.unwrap();

    perform.assert_async().await;
    release.assert_async().await;
}

#[tokio::test]
async fn test_attribute_null_is_none() {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let _text = json_mock(
        &mut server,
        "GET",
        "/session/s-1/element/e1/attribute/text",
        200,
        json!("Settings"),
    )
    .await;
    let _checked = json_mock(
        &mut server,
        "GET",
        "/session/s-1/element/e1/attribute/checked",
        200,
        Value::Null,
    )
    .await;
    let session = WebDriverSession::new(&server.url(), "s-1", Platform::Android).unwrap();
    let el = ElementHandle::new("e1");

    assert_eq!(session.element_attribute(&el, "text").await.unwrap(), Some("Settings".into()));
    assert_eq!(session.element_attribute(&el, "checked").await.unwrap(), None);
}

#[tokio::test]
async fn test_click_posts_empty_object() {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/session/s-1/element/b1/click")
        .match_body(Matcher::Json(json!({})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(reply(Value::Null))
        .create_async()
        .await;
    let session = WebDriverSession::new(&server.url(), "s-1", Platform::Web).unwrap();

    session.click(&ElementHandle::new("b1")).await.unwrap();

    mock.assert_async().await;
}
