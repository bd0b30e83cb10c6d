//! The live interview channel: one websocket connection drives one
//! `InterviewSession`.
//!
//! Turns are processed strictly sequentially per connection: the next frame
//! is not read until the previous reply went out, which is exactly the
//! single-writer guarantee the session and store rely on.

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;

use interviewer_core::session::{InterviewSession, OutboundMessage, SessionError};

use crate::state::AppState;

// Close codes distinguish the three terminal open-failure reasons.
const CLOSE_NORMAL: u16 = 1000;
const CLOSE_POLICY_VIOLATION: u16 = 1008;
const CLOSE_INTERNAL_ERROR: u16 = 1011;

/// Handles WebSocket upgrade requests for `/interview/{interview_id}`.
pub async fn interview_ws(
    ws: WebSocketUpgrade,
    Path(interview_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    tracing::info!("WebSocket upgrade request for interview {interview_id}");
    ws.on_upgrade(move |socket| handle_interview(socket, interview_id, state))
}

async fn handle_interview(mut socket: WebSocket, interview_id: String, state: AppState) {
    let mut session = InterviewSession::new(
        interview_id.clone(),
        state.store.clone(),
        state.oracle.clone(),
        state.speech.clone(),
        state.insights.clone(),
    );

    // Emit the current question before reading anything from the client.
    let first = match session.open().await {
        Ok(first) => first,
        Err(SessionError::NotFound(_)) => {
            tracing::error!("Invalid interview ID: {interview_id}");
            close_with(&mut socket, CLOSE_POLICY_VIOLATION, "Invalid interview ID").await;
            return;
        }
        Err(SessionError::AlreadyComplete(_)) => {
            tracing::warn!("Interview {interview_id} already completed");
            close_with(&mut socket, CLOSE_NORMAL, "Interview already completed").await;
            return;
        }
        Err(SessionError::Internal(e)) => {
            tracing::error!("Failed to open interview {interview_id}: {e:?}");
            close_with(&mut socket, CLOSE_INTERNAL_ERROR, "Internal error").await;
            return;
        }
    };

    if !send(&mut socket, &first).await {
        return;
    }

    while let Some(frame) = socket.recv().await {
        match frame {
            Ok(Message::Text(raw)) => {
                let reply = session.submit_turn(raw.as_str()).await;
                let complete = reply.is_complete();
                if !send(&mut socket, &reply).await {
                    break;
                }
                if complete {
                    close_with(&mut socket, CLOSE_NORMAL, "").await;
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                tracing::info!("Client closed interview channel {interview_id}");
                break;
            }
            // Binary frames and pings carry no turns.
            Ok(_) => {}
            Err(e) => {
                tracing::info!("WebSocket error on {interview_id}: {e}");
                break;
            }
        }
    }

    tracing::info!("Interview channel {interview_id} closed");
}

/// Serialize and send one outbound message. Returns false once the client is
/// gone.
async fn send(socket: &mut WebSocket, message: &OutboundMessage) -> bool {
    let payload = match serde_json::to_string(message) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!("Failed to serialize outbound message: {e}");
            return false;
        }
    };
    socket.send(Message::Text(payload.into())).await.is_ok()
}

async fn close_with(socket: &mut WebSocket, code: u16, reason: &'static str) {
    let frame = CloseFrame {
        code,
        reason: reason.into(),
    };
    if let Err(e) = socket.send(Message::Close(Some(frame))).await {
        tracing::debug!("Close frame not delivered: {e}");
    }
}
