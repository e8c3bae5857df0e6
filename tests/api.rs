//! API endpoint integration tests

use axum::{
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use base64::Engine;
use tower::ServiceExt;
use voice_assistant_gateway::ApiServerBuilder;
use voice_assistant_gateway::config::AudioTransport;

mod common;
use common::{
    Harness, STUB_AUDIO, StubGenerator, StubSynthesizer, StubTranscriber, lookup_table,
    silent_wav, silent_wav_base64,
};

const BOUNDARY: &str = "voice-assistant-test-boundary";

/// Router answering "hours" from the lookup table
fn build_test_router(harness: &Harness) -> axum::Router {
    let pipeline = harness
        .pipeline()
        .with_lookup(lookup_table(&[("hours", "We are open 9-5.")]));
    ApiServerBuilder::new(pipeline).build().router()
}

fn json_request(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn multipart_request(field: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"question.wav\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: audio/wav\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = build_test_router(&Harness::new("unused", "unused"));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_ready_endpoint_lists_providers() {
    let app = build_test_router(&Harness::new("unused", "unused"));

    let response = app
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["providers"]["transcriber"], "stub-stt");
    assert_eq!(json["providers"]["generator"], "stub-llm");
    assert_eq!(json["providers"]["synthesizer"], "stub-tts");
    assert_eq!(json["providers"]["lookup"], "table");
    assert_eq!(json["audioTransport"], "inline");
}

#[tokio::test]
async fn test_lookup_answer_with_inline_audio() {
    let harness = Harness::new("What are your hours?", "generated");
    let app = build_test_router(&harness);

    let response = app
        .oneshot(json_request(
            "/",
            &serde_json::json!({ "audio_base64": silent_wav_base64() }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["responseText"], "We are open 9-5.");
    assert_eq!(json["audioAvailable"], true);
    assert_eq!(json["source"], "lookup");
    assert_eq!(json["language"], "en");

    let audio = base64::engine::general_purpose::STANDARD
        .decode(json["audioBase64"].as_str().unwrap())
        .unwrap();
    assert_eq!(audio, STUB_AUDIO);
    assert_eq!(harness.generator.calls(), 0);
}

#[tokio::test]
async fn test_assist_alias_route() {
    let harness = Harness::new("Tell me a joke", "Knock knock.");
    let app = build_test_router(&harness);

    let response = app
        .oneshot(json_request(
            "/api/assist",
            &serde_json::json!({ "audioBase64": silent_wav_base64() }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["responseText"], "Knock knock.");
    assert_eq!(json["source"], "generated");
    assert_eq!(harness.generator.calls(), 1);
}

#[tokio::test]
async fn test_silent_audio_is_bad_request() {
    let harness = Harness::new("", "unused");
    let app = build_test_router(&harness);

    let response = app
        .oneshot(json_request(
            "/",
            &serde_json::json!({ "audio_base64": silent_wav_base64() }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json, serde_json::json!({ "error": "Could not transcribe audio." }));
    assert_eq!(harness.generator.calls(), 0);
    assert_eq!(harness.synthesizer.calls(), 0);
}

#[tokio::test]
async fn test_malformed_input_is_bad_request() {
    let harness = Harness::new("unused", "unused");

    let bodies = [
        serde_json::json!({ "audio_base64": "%%% not base64 %%%" }),
        serde_json::json!({ "audio_base64": "" }),
        serde_json::json!({ "something_else": true }),
    ];
    for body in bodies {
        let response = build_test_router(&harness)
            .oneshot(json_request("/", &body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        assert!(json_body(response).await["error"].is_string());
    }
    assert_eq!(harness.transcriber.calls(), 0);
}

#[tokio::test]
async fn test_provider_failure_is_server_error() {
    let harness = Harness::with(
        StubTranscriber::says("Tell me a joke"),
        StubGenerator::failing(),
        StubSynthesizer::working(),
    );
    let app = build_test_router(&harness);

    let response = app
        .oneshot(json_request(
            "/",
            &serde_json::json!({ "audio_base64": silent_wav_base64() }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert!(json["error"].as_str().unwrap().contains("quota exceeded"));
}

#[tokio::test]
async fn test_synthesis_failure_returns_text_only() {
    let harness = Harness::with(
        StubTranscriber::says("What are your hours?"),
        StubGenerator::replies("unused"),
        StubSynthesizer::failing(),
    );
    let app = build_test_router(&harness);

    let response = app
        .oneshot(json_request(
            "/",
            &serde_json::json!({ "audio_base64": silent_wav_base64() }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["responseText"], "We are open 9-5.");
    assert_eq!(json["audioAvailable"], false);
    assert!(json.get("audioBase64").is_none());
}

#[tokio::test]
async fn test_multipart_upload() {
    let harness = Harness::new("What are your hours?", "generated");

    for field in ["file", "audio"] {
        let response = build_test_router(&harness)
            .oneshot(multipart_request(field, &silent_wav()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["responseText"], "We are open 9-5.");
    }
    assert_eq!(harness.transcriber.calls(), 2);
}

#[tokio::test]
async fn test_multipart_without_audio_field() {
    let harness = Harness::new("unused", "unused");

    let response = build_test_router(&harness)
        .oneshot(multipart_request("attachment", &silent_wav()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(harness.transcriber.calls(), 0);
}

#[tokio::test]
async fn test_raw_audio_body() {
    let harness = Harness::new("What are your hours?", "generated");

    let response = build_test_router(&harness)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header(header::CONTENT_TYPE, "audio/wav")
                .body(Body::from(silent_wav()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["responseText"], "We are open 9-5.");
}

#[tokio::test]
async fn test_reference_transport_serves_audio() {
    let harness = Harness::new("What are your hours?", "generated");
    let pipeline = harness
        .pipeline()
        .with_lookup(lookup_table(&[("hours", "We are open 9-5.")]));
    let app = ApiServerBuilder::new(pipeline)
        .audio_transport(AudioTransport::Reference)
        .build()
        .router();

    let response = app
        .clone()
        .oneshot(json_request(
            "/",
            &serde_json::json!({ "audio_base64": silent_wav_base64() }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["audioAvailable"], true);
    assert!(json.get("audioBase64").is_none());
    let audio_url = json["audioUrl"].as_str().unwrap().to_string();
    assert!(audio_url.starts_with("/api/audio/"));

    let response = app
        .clone()
        .oneshot(Request::builder().uri(audio_url.as_str()).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], STUB_AUDIO);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/audio/00000000-0000-0000-0000-000000000000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_allow_list() {
    let harness = Harness::new("unused", "unused");
    let app = ApiServerBuilder::new(harness.pipeline())
        .cors_origins(vec!["https://kiosk.example".to_string()])
        .build()
        .router();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, "https://kiosk.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://kiosk.example"
    );

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, "https://elsewhere.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
}

#[tokio::test]
async fn test_cors_open_by_default() {
    let app = build_test_router(&Harness::new("unused", "unused"));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, "https://anywhere.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}
