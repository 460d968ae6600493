use std::net::SocketAddr;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use spdlog::prelude::*;
use subtle::ConstantTimeEq;
use tokio::{net::TcpListener, sync::mpsc};

use crate::platform::MessageEvent;

const SECRET_HEADER: &str = "x-event-secret";

/// Receives message events from the external gateway connector. The realtime
/// platform connection lives outside this process; whatever owns it POSTs
/// each new message here.
pub async fn serve(
    addr: SocketAddr,
    events: mpsc::Sender<MessageEvent>,
    secret: Option<String>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router(IntakeState { events, secret })).await?;
    Ok(())
}

#[derive(Clone)]
struct IntakeState {
    events: mpsc::Sender<MessageEvent>,
    secret: Option<String>,
}

fn router(state: IntakeState) -> Router {
    Router::new().route("/events", post(ingest)).with_state(state)
}

async fn ingest(
    State(state): State<IntakeState>,
    headers: HeaderMap,
    Json(event): Json<MessageEvent>,
) -> StatusCode {
    if let Some(secret) = &state.secret {
        let presented = headers
            .get(SECRET_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        if !constant_time_eq(presented, secret) {
            return StatusCode::UNAUTHORIZED;
        }
    }

    match state.events.send(event).await {
        Ok(()) => StatusCode::ACCEPTED,
        Err(_) => {
            error!("event channel closed, rejecting event");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.len() == b.len() && a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_comparison() {
        assert!(constant_time_eq("s3cr3t", "s3cr3t"));
        assert!(!constant_time_eq("s3cr3t", "s3cr4t"));
        assert!(!constant_time_eq("s3cr3t", "s3cr3"));
        assert!(!constant_time_eq("", "s3cr3t"));
    }

    async fn spawn_server(secret: Option<String>) -> (SocketAddr, mpsc::Receiver<MessageEvent>) {
        let (tx, rx) = mpsc::channel(4);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(
                listener,
                router(IntakeState {
                    events: tx,
                    secret,
                }),
            )
            .await
            .unwrap();
        });
        (addr, rx)
    }

    fn payload() -> serde_json::Value {
        serde_json::json!({
            "authorId": "7",
            "channelId": "c1",
            "messageId": "m1",
            "content": "hello",
            "authorDisplayName": "Alice"
        })
    }

    #[tokio::test]
    async fn forwards_events_into_the_channel() {
        let (addr, mut rx) = spawn_server(None).await;

        let status = reqwest::Client::new()
            .post(format!("http://{addr}/events"))
            .json(&payload())
            .send()
            .await
            .unwrap()
            .status();
        assert_eq!(status.as_u16(), 202);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.content, "hello");
        assert_eq!(event.author_id, "7");
    }

    #[tokio::test]
    async fn rejects_wrong_or_missing_secret() {
        let (addr, mut rx) = spawn_server(Some("s3cr3t".into())).await;
        let client = reqwest::Client::new();
        let url = format!("http://{addr}/events");

        let status = client.post(&url).json(&payload()).send().await.unwrap().status();
        assert_eq!(status.as_u16(), 401);

        let status = client
            .post(&url)
            .header(SECRET_HEADER, "nope")
            .json(&payload())
            .send()
            .await
            .unwrap()
            .status();
        assert_eq!(status.as_u16(), 401);

        let status = client
            .post(&url)
            .header(SECRET_HEADER, "s3cr3t")
            .json(&payload())
            .send()
            .await
            .unwrap()
            .status();
        assert_eq!(status.as_u16(), 202);

        assert_eq!(rx.recv().await.unwrap().message_id, "m1");
    }
}
