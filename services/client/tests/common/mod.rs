//! In-process stub of the concierge backend and the voice provider.

#![allow(dead_code)]

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use reqwest::Url;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

pub const VALID_OTP: &str = "123456";
pub const PUBLIC_KEY: &str = "pk_test";

/// A chat request as the stub received it.
#[derive(Debug, Clone)]
pub struct SeenChat {
    pub body: Value,
    pub authorization: Option<String>,
}

#[derive(Clone)]
struct StubState {
    addr: SocketAddr,
    profiles: Arc<Mutex<HashMap<String, (String, String)>>>,
    chats: Arc<Mutex<Vec<SeenChat>>>,
    saw_close: Arc<AtomicBool>,
}

pub struct Stub {
    pub base_url: Url,
    chats: Arc<Mutex<Vec<SeenChat>>>,
    saw_close: Arc<AtomicBool>,
}

impl Stub {
    pub fn chats(&self) -> Vec<SeenChat> {
        self.chats.lock().unwrap().clone()
    }

    /// Whether a held call received a close frame from the client.
    pub fn saw_close(&self) -> bool {
        self.saw_close.load(Ordering::SeqCst)
    }
}

pub async fn spawn_stub() -> Stub {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = StubState {
        addr,
        profiles: Arc::default(),
        chats: Arc::default(),
        saw_close: Arc::default(),
    };
    let chats = state.chats.clone();
    let saw_close = state.saw_close.clone();

    let app = Router::new()
        .route("/api/auth/send-otp", post(send_otp))
        .route("/api/auth/verify-otp", post(verify_otp))
        .route("/api/auth/profile", post(update_profile))
        .route("/api/auth/me", get(me))
        .route("/api/chat", post(chat))
        .route("/api/vapi/assistant-config", get(assistant_config))
        .route("/call", post(create_call))
        .route("/call-socket", get(call_socket))
        .route("/call-socket-hold", get(hold_socket))
        .with_state(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Stub {
        base_url: Url::parse(&format!("http://{addr}")).unwrap(),
        chats,
        saw_close,
    }
}

fn detail(status: StatusCode, detail: &str) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Tokens are `token-<phone>`.
fn phone_for(headers: &HeaderMap) -> Option<String> {
    bearer(headers)?.strip_prefix("token-").map(str::to_string)
}

fn account(state: &StubState, phone: &str) -> Value {
    let profiles = state.profiles.lock().unwrap();
    let (name, email) = match profiles.get(phone) {
        Some((name, email)) => (json!(name), json!(email)),
        None => (Value::Null, Value::Null),
    };
    json!({ "id": 1, "phone": phone, "name": name, "email": email, "is_verified": true })
}

async fn send_otp(Json(body): Json<Value>) -> Response {
    let phone = body["phone"].as_str().unwrap_or_default();
    if phone.len() < 10 {
        return detail(StatusCode::BAD_REQUEST, "Phone number required");
    }
    Json(json!({ "message": "OTP sent" })).into_response()
}

async fn verify_otp(State(state): State<StubState>, Json(body): Json<Value>) -> Response {
    let phone = body["phone"].as_str().unwrap_or_default();
    if body["otp"] != VALID_OTP {
        return detail(StatusCode::BAD_REQUEST, "Invalid OTP");
    }
    Json(json!({ "token": format!("token-{phone}"), "user": account(&state, phone) })).into_response()
}

async fn update_profile(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let Some(phone) = phone_for(&headers) else {
        return detail(StatusCode::UNAUTHORIZED, "Invalid token");
    };
    let name = body["name"].as_str().unwrap_or_default().to_string();
    let email = body["email"].as_str().unwrap_or_default().to_string();
    state
        .profiles
        .lock()
        .unwrap()
        .insert(phone.clone(), (name, email));
    Json(account(&state, &phone)).into_response()
}

async fn me(State(state): State<StubState>, headers: HeaderMap) -> Response {
    match phone_for(&headers) {
        Some(phone) => Json(account(&state, &phone)).into_response(),
        None => detail(StatusCode::UNAUTHORIZED, "Invalid token"),
    }
}

async fn chat(State(state): State<StubState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.chats.lock().unwrap().push(SeenChat {
        body: body.clone(),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    });
    if body["message"] == "explode" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
    }
    Json(json!({
        "message": "I found one match in Thane.",
        "properties": [{
            "id": 4,
            "title": "Lakeview Residency",
            "description": "",
            "property_type": "apartment",
            "bhk": 2,
            "price": 7800000.0,
            "location": "Ghodbunder Road",
            "city": "Thane",
            "area_sqft": 950.0,
            "amenities": "[\"gym\", \"pool\"]",
            "status": "available",
            "image_url": null
        }],
        "booking": null
    }))
    .into_response()
}

async fn assistant_config() -> Json<Value> {
    Json(json!({
        "publicKey": PUBLIC_KEY,
        "assistantConfig": { "name": "PropertyAI", "firstMessage": "Hi! Looking for a home?" }
    }))
}

async fn create_call(State(state): State<StubState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if bearer(&headers).as_deref() != Some(PUBLIC_KEY) {
        return detail(StatusCode::UNAUTHORIZED, "Invalid public key");
    }
    if body["transport"]["provider"] != "vapi.websocket" || body["assistant"]["name"] != "PropertyAI" {
        return detail(StatusCode::BAD_REQUEST, "Unexpected call body");
    }
    // `hold` asks for a call that stays silent until the client hangs up.
    let socket = if body["assistant"]["hold"] == true { "call-socket-hold" } else { "call-socket" };
    Json(json!({
        "id": "call-1",
        "transport": { "websocketCallUrl": format!("ws://{}/{socket}", state.addr) }
    }))
    .into_response()
}

async fn call_socket(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(play_call)
}

/// A short scripted call: connect, one exchange, hang up.
async fn play_call(mut socket: WebSocket) {
    let frames = [
        json!({ "type": "status-update", "status": "in-progress" }),
        json!({ "type": "speech-update", "status": "started", "role": "user" }),
        json!({ "type": "transcript", "role": "user", "transcriptType": "partial", "transcript": "Show me flats" }),
        json!({ "type": "transcript", "role": "user", "transcriptType": "final", "transcript": "Show me flats in Thane" }),
        json!({ "type": "transcript", "role": "assistant", "transcriptType": "final", "transcript": "Here is one in Ghodbunder Road." }),
        json!({ "type": "status-update", "status": "ended", "endedReason": "assistant-ended-call" }),
    ];
    let _ = socket.send(Message::Binary(vec![0u8; 32].into())).await;
    for frame in frames {
        if socket.send(Message::Text(frame.to_string().into())).await.is_err() {
            return;
        }
    }
    let _ = socket.send(Message::Close(None)).await;
}

async fn hold_socket(State(state): State<StubState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| hold_call(socket, state.saw_close))
}

/// Sends nothing and waits for the client to hang up.
async fn hold_call(mut socket: WebSocket, saw_close: Arc<AtomicBool>) {
    while let Some(Ok(message)) = socket.recv().await {
        if let Message::Close(_) = message {
            saw_close.store(true, Ordering::SeqCst);
            return;
        }
    }
}
