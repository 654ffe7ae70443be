mod support;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};
use support::{TestApp, GEMINI_KEY, GEMINI_MODEL};
use wiremock::matchers::{any, body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn generate_path() -> String {
    format!("/v1beta/models/{}:generateContent", GEMINI_MODEL)
}

fn candidate(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": { "parts": [{ "text": text }], "role": "model" },
            "finishReason": "STOP"
        }]
    })
}

/// Mock that fails the test if the upstream is contacted at all
async fn forbid_upstream(server: &MockServer) {
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate("unexpected")))
        .expect(0)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_unauthenticated_rejected_regardless_of_body() {
    let server = MockServer::start().await;
    forbid_upstream(&server).await;
    let app = TestApp::new(&server.uri());

    for body in [
        json!({ "title": "Summer Tech Conference 2024", "type": "conference" }),
        json!({ "title": "" }),
        json!({}),
    ] {
        let (status, response) = app
            .call(Method::POST, "/generate-description", None, Some(body))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(response, json!({ "error": "Unauthorized" }));
    }

    // A forged token is no better than none
    let (status, _) = app
        .call(
            Method::POST,
            "/generate-description",
            Some("not-a-real-token"),
            Some(json!({ "title": "Gala" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_title_rejected() {
    let server = MockServer::start().await;
    forbid_upstream(&server).await;
    let app = TestApp::new(&server.uri());
    let token = app.token("user-1", "ann@example.com");

    for body in [
        json!({}),
        json!({ "title": "" }),
        json!({ "title": "", "type": "workshop", "details": "Bring a laptop" }),
        json!({ "type": "conference" }),
        json!({ "title": null, "type": "conference" }),
        json!({ "title": 0 }),
        json!(["Summer Tech Conference 2024"]),
    ] {
        let (status, response) = app
            .call(Method::POST, "/generate-description", Some(&token), Some(body))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response, json!({ "error": "Title is required" }));
    }
}

#[tokio::test]
async fn test_generates_description() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(generate_path()))
        .and(query_param("key", GEMINI_KEY))
        .and(body_partial_json(json!({
            "generationConfig": { "maxOutputTokens": 500 }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(candidate("Join us for a day of talks.")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let app = TestApp::new(&server.uri());
    let token = app.token("user-1", "ann@example.com");

    let (status, response) = app
        .call(
            Method::POST,
            "/generate-description",
            Some(&token),
            Some(json!({
                "title": "Summer Tech Conference 2024",
                "type": "conference",
                "details": ""
            })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        response,
        json!({ "description": "Join us for a day of talks." })
    );

    let requests = server.received_requests().await.expect("recording is on");
    assert_eq!(requests.len(), 1);
    let sent: Value = requests[0].body_json().expect("upstream body is JSON");
    let prompt = sent["contents"][0]["parts"][0]["text"]
        .as_str()
        .expect("prompt text");

    assert!(prompt.contains("Summer Tech Conference 2024"));
    assert!(prompt.contains("This is a conference event."));
    assert!(!prompt.contains("key details"));
    assert!(prompt.ends_with(
        "The description should be engaging, informative, and between 100-200 words. Focus on the value attendees will get from the event."
    ));
    let temperature = sent["generationConfig"]["temperature"].as_f64().unwrap();
    assert!((temperature - 0.7).abs() < 1e-6);
}

#[tokio::test]
async fn test_upstream_error_is_generic_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(generate_path()))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = TestApp::new(&server.uri());
    let token = app.token("user-1", "ann@example.com");

    let (status, response) = app
        .call(
            Method::POST,
            "/generate-description",
            Some(&token),
            Some(json!({ "title": "Gala" })),
        )
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response, json!({ "error": "Failed to generate description" }));
    assert!(response.get("description").is_none());
}

#[tokio::test]
async fn test_unreadable_upstream_body_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(generate_path()))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let app = TestApp::new(&server.uri());
    let token = app.token("user-1", "ann@example.com");

    let (status, response) = app
        .call(
            Method::POST,
            "/generate-description",
            Some(&token),
            Some(json!({ "title": "Gala" })),
        )
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response, json!({ "error": "Failed to generate description" }));
}

#[tokio::test]
async fn test_unreachable_upstream_is_failure() {
    let app = TestApp::offline();
    let token = app.token("user-1", "ann@example.com");

    let (status, response) = app
        .call(
            Method::POST,
            "/generate-description",
            Some(&token),
            Some(json!({ "title": "Gala" })),
        )
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response, json!({ "error": "Failed to generate description" }));
}

#[tokio::test]
async fn test_missing_candidate_text_falls_back() {
    for upstream in [
        json!({}),
        json!({ "candidates": [] }),
        json!({ "candidates": [{ "finishReason": "SAFETY" }] }),
        json!({ "candidates": [{ "content": { "parts": [] } }] }),
    ] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(generate_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(upstream))
            .expect(1)
            .mount(&server)
            .await;

        let app = TestApp::new(&server.uri());
        let token = app.token("user-1", "ann@example.com");

        let (status, response) = app
            .call(
                Method::POST,
                "/generate-description",
                Some(&token),
                Some(json!({ "title": "Gala" })),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            response,
            json!({ "description": "Unable to generate description" })
        );
    }
}

#[tokio::test]
async fn test_unparseable_request_body_is_failure() {
    let server = MockServer::start().await;
    forbid_upstream(&server).await;
    let app = TestApp::new(&server.uri());
    let token = app.token("user-1", "ann@example.com");

    for raw in ["{not json", "null", ""] {
        let req = axum::http::Request::builder()
            .method(Method::POST)
            .uri("/generate-description")
            .header("authorization", format!("Bearer {}", token))
            .header("content-type", "application/json")
            .body(axum::body::Body::from(raw))
            .unwrap();

        let (status, response) = app.send(req).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "body {:?}", raw);
        assert_eq!(response, json!({ "error": "Failed to generate description" }));
    }
}

#[tokio::test]
async fn test_whitespace_and_numeric_titles_are_sent_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(generate_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate("A fine event.")))
        .expect(2)
        .mount(&server)
        .await;

    let app = TestApp::new(&server.uri());
    let token = app.token("user-1", "ann@example.com");

    for body in [json!({ "title": "   " }), json!({ "title": 2024 })] {
        let (status, response) = app
            .call(Method::POST, "/generate-description", Some(&token), Some(body))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response, json!({ "description": "A fine event." }));
    }

    let requests = server.received_requests().await.expect("recording is on");
    let prompts: Vec<String> = requests
        .iter()
        .map(|r| {
            let sent: Value = r.body_json().expect("upstream body is JSON");
            sent["contents"][0]["parts"][0]["text"]
                .as_str()
                .expect("prompt text")
                .to_string()
        })
        .collect();

    assert!(prompts[0].contains("for an event titled \"   \"."));
    assert!(prompts[1].contains("for an event titled \"2024\"."));
}
