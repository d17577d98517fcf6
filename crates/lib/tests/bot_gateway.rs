//! Integration test: run a mock bot backend (axum) on a free port and drive `BotClient` against it.
//! Covers endpoint routing, the retry budget, error normalization, speech and health.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use botchat::audio::{encode_audio, RecordedAudio};
use botchat::config::SpeechConfig;
use botchat::gateway::{BotBackend, BotClient, ChatRequest, GatewayError};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Hits {
    chat: AtomicUsize,
    faq: AtomicUsize,
    stt: AtomicUsize,
    tts: AtomicUsize,
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind free port");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
}

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    listener.local_addr().expect("local_addr").port()
}

fn request(bot_id: &str, message: &str) -> ChatRequest {
    ChatRequest {
        session_id: "session-test".to_string(),
        bot_id: bot_id.to_string(),
        message: message.to_string(),
    }
}

async fn echo_chat(State(hits): State<Arc<Hits>>, Json(body): Json<Value>) -> Json<Value> {
    hits.chat.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "sessionId": body["sessionId"],
        "botId": body["botId"],
        "response": format!("echo: {}", body["message"].as_str().unwrap_or_default()),
        "isComplete": false
    }))
}

async fn faq_chat(State(hits): State<Arc<Hits>>, Json(body): Json<Value>) -> Json<Value> {
    hits.faq.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "sessionId": body["sessionId"],
        "botId": "faq-bot",
        "response": "Coverage starts on day one.",
        "isComplete": false,
        "metadata": { "sources": ["policy.pdf", "terms.pdf"] }
    }))
}

fn routing_app(hits: Arc<Hits>) -> Router {
    Router::new()
        .route("/api/chat", post(echo_chat))
        .route("/faq/chat", post(faq_chat))
        .with_state(hits)
}

#[tokio::test]
async fn quote_bot_goes_to_general_service() {
    let hits = Arc::new(Hits::default());
    let base = serve(routing_app(hits.clone())).await;
    let client = BotClient::new(format!("{}/api", base), format!("{}/faq", base));

    let res = client
        .send_message(&request("quote-auto", "hola"))
        .await
        .unwrap();

    assert_eq!(res.response, "echo: hola");
    assert_eq!(res.session_id, "session-test");
    assert_eq!(hits.chat.load(Ordering::SeqCst), 1);
    assert_eq!(hits.faq.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn faq_bot_goes_to_faq_service() {
    let hits = Arc::new(Hits::default());
    let base = serve(routing_app(hits.clone())).await;
    let client = BotClient::new(format!("{}/api", base), format!("{}/faq", base));

    let res = client
        .send_message(&request("faq-bot", "when does coverage start?"))
        .await
        .unwrap();

    assert_eq!(res.sources().as_deref(), Some("policy.pdf, terms.pdf"));
    assert_eq!(hits.chat.load(Ordering::SeqCst), 0);
    assert_eq!(hits.faq.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let hits = Arc::new(Hits::default());
    let app = Router::new()
        .route(
            "/api/chat",
            post(|State(hits): State<Arc<Hits>>| async move {
                let n = hits.chat.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({})))
                } else {
                    (StatusCode::OK, Json(json!({ "response": "third time lucky" })))
                }
            }),
        )
        .with_state(hits.clone());
    let base = serve(app).await;
    let client = BotClient::new(format!("{}/api", base), format!("{}/faq", base));

    let res = client.send_message(&request("quote-auto", "hi")).await.unwrap();

    assert_eq!(res.response, "third time lucky");
    assert_eq!(hits.chat.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn gives_up_after_three_attempts_with_backend_message() {
    let hits = Arc::new(Hits::default());
    let app = Router::new()
        .route(
            "/api/chat",
            post(|State(hits): State<Arc<Hits>>| async move {
                hits.chat.fetch_add(1, Ordering::SeqCst);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({ "errorMessage": "bot unavailable" })),
                )
            }),
        )
        .with_state(hits.clone());
    let base = serve(app).await;
    let client = BotClient::new(format!("{}/api", base), format!("{}/faq", base));

    let err = client
        .send_message(&request("quote-auto", "hi"))
        .await
        .unwrap_err();

    assert_eq!(hits.chat.load(Ordering::SeqCst), 3);
    assert_eq!(err.status(), Some(503));
    assert_eq!(err.to_string(), "bot unavailable");
}

#[tokio::test]
async fn retry_budget_is_configurable() {
    let hits = Arc::new(Hits::default());
    let app = Router::new()
        .route(
            "/api/chat",
            post(|State(hits): State<Arc<Hits>>| async move {
                hits.chat.fetch_add(1, Ordering::SeqCst);
                StatusCode::BAD_GATEWAY
            }),
        )
        .with_state(hits.clone());
    let base = serve(app).await;
    let client =
        BotClient::new(format!("{}/api", base), format!("{}/faq", base)).with_chat_retries(0);

    let err = client
        .send_message(&request("quote-auto", "hi"))
        .await
        .unwrap_err();

    assert_eq!(hits.chat.load(Ordering::SeqCst), 1);
    let text = err.to_string();
    assert!(text.starts_with("Error code: 502"), "{}", text);
    assert!(text.contains("Http failure response for"), "{}", text);
    assert!(text.contains("/api/chat"), "{}", text);
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    let base = format!("http://127.0.0.1:{}", free_port());
    let client = BotClient::new(format!("{}/api", base), format!("{}/faq", base));

    let err = client
        .send_message(&request("quote-auto", "hi"))
        .await
        .unwrap_err();

    assert!(err.is_network(), "{:?}", err);
    assert!(err.to_string().starts_with("Error: "));
}

fn speech_app() -> Router {
    Router::new()
        .route(
            "/api/speech/stt",
            post(|Json(body): Json<Value>| async move {
                let ok = body["audioFormat"] == "webm" && body["language"] == "es-MX";
                let text = if ok { "quiero una cotización" } else { "" };
                Json(json!({
                    "text": text,
                    "success": ok,
                    "confidence": 0.93
                }))
            }),
        )
        .route(
            "/api/speech/tts",
            post(|Json(body): Json<Value>| async move {
                let text = body["text"].as_str().unwrap_or_default().to_string();
                Json(json!({
                    "audioBase64": encode_audio(text.as_bytes()),
                    "audioFormat": "audio/mpeg",
                    "success": true,
                    "audioSizeBytes": text.len()
                }))
            }),
        )
        .route("/api/health", get(|| async { Json(json!({ "status": "Healthy" })) }))
}

#[tokio::test]
async fn speech_round_trip() {
    let base = serve(speech_app()).await;
    let client = BotClient::new(format!("{}/api", base), format!("{}/faq", base));
    let speech = SpeechConfig::default();

    let clip = RecordedAudio {
        base64: encode_audio(b"fake-webm"),
        format: "webm".to_string(),
    };
    let text = client.transcribe(&clip, &speech).await.unwrap();
    assert_eq!(text, "quiero una cotización");

    let audio = client.synthesize("hola", &speech).await.unwrap();
    assert_eq!(audio.bytes, b"hola");
    assert_eq!(audio.format, "audio/mpeg");
}

#[tokio::test]
async fn low_confidence_transcript_is_rejected() {
    let base = serve(speech_app()).await;
    let client = BotClient::new(format!("{}/api", base), format!("{}/faq", base));
    let speech = SpeechConfig {
        min_confidence: Some(0.95),
        ..SpeechConfig::default()
    };
    let clip = RecordedAudio {
        base64: encode_audio(b"fake-webm"),
        format: "webm".to_string(),
    };

    let err = client.transcribe(&clip, &speech).await.unwrap_err();
    assert!(matches!(err, GatewayError::Recognition(_)));
}

#[tokio::test]
async fn health_reports_status() {
    let base = serve(speech_app()).await;
    let client = BotClient::new(format!("{}/api", base), format!("{}/faq", base));
    assert_eq!(client.health_check().await.unwrap(), "Healthy");
}

#[tokio::test]
async fn speech_failures_are_not_retried() {
    let hits = Arc::new(Hits::default());
    let app = Router::new()
        .route(
            "/api/speech/stt",
            post(|State(hits): State<Arc<Hits>>| async move {
                hits.stt.fetch_add(1, Ordering::SeqCst);
                StatusCode::SERVICE_UNAVAILABLE
            }),
        )
        .route(
            "/api/speech/tts",
            post(|State(hits): State<Arc<Hits>>| async move {
                hits.tts.fetch_add(1, Ordering::SeqCst);
                StatusCode::SERVICE_UNAVAILABLE
            }),
        )
        .with_state(hits.clone());
    let base = serve(app).await;
    let client = BotClient::new(format!("{}/api", base), format!("{}/faq", base));
    let speech = SpeechConfig::default();
    let clip = RecordedAudio {
        base64: encode_audio(b"fake-webm"),
        format: "webm".to_string(),
    };

    let err = client.transcribe(&clip, &speech).await.unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert_eq!(hits.stt.load(Ordering::SeqCst), 1);

    let err = client.synthesize("hola", &speech).await.unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert_eq!(hits.tts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unsuccessful_synthesis_is_a_synthesis_error() {
    let hits = Arc::new(Hits::default());
    let app = Router::new()
        .route(
            "/api/speech/tts",
            post(|State(hits): State<Arc<Hits>>| async move {
                hits.tts.fetch_add(1, Ordering::SeqCst);
                Json(json!({
                    "audioBase64": "",
                    "audioFormat": "",
                    "success": false,
                    "audioSizeBytes": 0,
                    "errorMessage": "voice not found"
                }))
            }),
        )
        .with_state(hits.clone());
    let base = serve(app).await;
    let client = BotClient::new(format!("{}/api", base), format!("{}/faq", base));

    let err = client
        .synthesize("hola", &SpeechConfig::default())
        .await
        .unwrap_err();

    assert_eq!(err, GatewayError::Synthesis("voice not found".to_string()));
    assert_eq!(hits.tts.load(Ordering::SeqCst), 1);
}
