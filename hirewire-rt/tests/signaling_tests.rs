//! Signaling and session lifecycle client tests against in-process endpoints

mod helpers;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use helpers::spawn_server;
use hirewire_rt::session::ScoreBreakdown;
use hirewire_rt::signaling::{
    Credential, SessionLifecycle, SessionLifecycleClient, SessionResult, Signaling,
    SignalingClient, SignalingSettings,
};
use hirewire_rt::Error;
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(Default)]
struct Seen {
    bodies: Vec<Value>,
    authorization: Option<String>,
    content_type: Option<String>,
    offer: Option<String>,
}

type Shared = Arc<Mutex<Seen>>;

fn settings(base: &str) -> SignalingSettings {
    SignalingSettings {
        token_endpoint: format!("{}/token", base),
        session_start_endpoint: format!("{}/session/start", base),
        session_end_endpoint: format!("{}/session/end", base),
        request_timeout: Duration::from_secs(5),
    }
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn issue_token(State(seen): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    seen.lock().unwrap().bodies.push(body);
    Json(json!({"token": "ephemeral-123", "sdpUrl": "http://unused/sdp"}))
}

async fn answer_offer(State(seen): State<Shared>, headers: HeaderMap, offer: String) -> String {
    let mut seen = seen.lock().unwrap();
    seen.authorization = header_value(&headers, header::AUTHORIZATION);
    seen.content_type = header_value(&headers, header::CONTENT_TYPE);
    seen.offer = Some(offer);
    "v=0\r\no=- answer\r\n".to_string()
}

/// **Given:** A token endpoint and an SDP endpoint
/// **When:** A credential is fetched and the offer exchanged
/// **Then:** The application id is posted, the offer goes out as
/// `application/sdp` with the bearer token, and the answer comes back verbatim
#[tokio::test]
async fn credential_and_sdp_exchange() {
    let seen: Shared = Arc::default();
    let router = Router::new()
        .route("/token", post(issue_token))
        .route("/sdp", post(answer_offer))
        .with_state(Arc::clone(&seen));
    let base = spawn_server(router).await;
    let client = SignalingClient::new(&settings(&base)).unwrap();

    let credential = client.fetch_credential("app-42").await.unwrap();
    assert_eq!(credential.token, "ephemeral-123");

    let credential = Credential {
        sdp_url: format!("{}/sdp", base),
        ..credential
    };
    let answer = client
        .exchange_sdp(&credential, "v=0\r\no=- offer\r\n")
        .await
        .unwrap();
    assert_eq!(answer, "v=0\r\no=- answer\r\n");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.bodies[0]["applicationId"], "app-42");
    assert_eq!(seen.authorization.as_deref(), Some("Bearer ephemeral-123"));
    assert_eq!(seen.content_type.as_deref(), Some("application/sdp"));
    assert_eq!(seen.offer.as_deref(), Some("v=0\r\no=- offer\r\n"));
}

/// **Given:** A token endpoint returning 500
/// **When:** A credential is requested
/// **Then:** The status and body are reported without retrying
#[tokio::test]
async fn credential_error_status_is_reported() {
    let calls = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&calls);
    let router = Router::new().route(
        "/token",
        post(move || {
            let counter = Arc::clone(&counter);
            async move {
                *counter.lock().unwrap() += 1;
                (StatusCode::INTERNAL_SERVER_ERROR, "token backend down")
            }
        }),
    );
    let base = spawn_server(router).await;
    let client = SignalingClient::new(&settings(&base)).unwrap();

    match client.fetch_credential("app-42").await {
        Err(Error::Signaling { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "token backend down");
        }
        other => panic!("unexpected result: {:?}", other.map(|c| c.token)),
    }
    assert_eq!(*calls.lock().unwrap(), 1);
}

/// **Given:** An SDP endpoint answering with an empty body
/// **When:** The offer is exchanged
/// **Then:** Negotiation fails
#[tokio::test]
async fn empty_answer_is_a_negotiation_error() {
    let router = Router::new().route("/sdp", post(|| async { "  " }));
    let base = spawn_server(router).await;
    let client = SignalingClient::new(&settings(&base)).unwrap();
    let credential = Credential {
        token: "t".to_string(),
        sdp_url: format!("{}/sdp", base),
        expires_at: None,
    };

    let err = client.exchange_sdp(&credential, "v=0").await.unwrap_err();
    assert!(matches!(err, Error::Negotiation(_)));
}

/// **Given:** Session start and end endpoints
/// **When:** A session is registered and later closed with its result
/// **Then:** The returned id is used and the result is posted as camelCase JSON
#[tokio::test]
async fn session_lifecycle_round_trip() {
    let seen: Shared = Arc::default();
    let session_id = Uuid::new_v4();
    let router = Router::new()
        .route(
            "/session/start",
            post(move |State(seen): State<Shared>, Json(body): Json<Value>| async move {
                seen.lock().unwrap().bodies.push(body);
                Json(json!({"sessionId": session_id}))
            }),
        )
        .route(
            "/session/end",
            post(|State(seen): State<Shared>, Json(body): Json<Value>| async move {
                seen.lock().unwrap().bodies.push(body);
                StatusCode::NO_CONTENT
            }),
        )
        .with_state(Arc::clone(&seen));
    let base = spawn_server(router).await;
    let client = SessionLifecycleClient::new(&settings(&base)).unwrap();

    assert_eq!(client.start_session("app-42").await.unwrap(), session_id);

    let result = SessionResult {
        session_id,
        final_score: Some(68.0),
        breakdown: Some(ScoreBreakdown::new(0.7, 0.6, 0.5).as_percentages()),
        fallback_score: true,
        questions_asked: 3,
    };
    client.end_session(&result).await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.bodies[0]["applicationId"], "app-42");
    let ended = &seen.bodies[1];
    assert_eq!(ended["sessionId"], session_id.to_string());
    assert_eq!(ended["finalScore"], 68.0);
    assert_eq!(ended["fallbackScore"], true);
    assert_eq!(ended["questionsAsked"], 3);
    assert_eq!(ended["breakdown"]["clarity"], 70.0);
}

/// **Given:** A session end endpoint that rejects the request
/// **When:** The result is posted
/// **Then:** A session API error carries the status
#[tokio::test]
async fn session_end_rejection_is_reported() {
    let router = Router::new().route(
        "/session/end",
        post(|| async { (StatusCode::UNPROCESSABLE_ENTITY, "unknown session") }),
    );
    let base = spawn_server(router).await;
    let client = SessionLifecycleClient::new(&settings(&base)).unwrap();

    let result = SessionResult {
        session_id: Uuid::new_v4(),
        final_score: None,
        breakdown: None,
        fallback_score: false,
        questions_asked: 0,
    };
    let err = client.end_session(&result).await.unwrap_err();
    assert!(matches!(err, Error::SessionApi { status: 422, .. }));
}
