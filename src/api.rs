//! Action-tagged control surface.
//!
//! The transport layer (HTTP, IPC, whatever hosts the engine) decodes
//! nothing itself: it hands the request body here and sends back the
//! response body. Violation kinds are a closed enum, so a
//! non-violation observation cannot even be expressed as a
//! `storeEvent`.

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};

use crate::db::models::{ProctoringEvent, ProctoringSession, Severity, ViolationKind};
use crate::metrics::ProctoringMetrics;
use crate::session::SessionService;

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ProctoringRequest {
    #[serde(rename_all = "camelCase")]
    Initialize { interview_id: String },
    #[serde(rename_all = "camelCase")]
    StoreSnapshot {
        session_id: String,
        seconds_elapsed: u64,
        metrics: ProctoringMetrics,
    },
    #[serde(rename_all = "camelCase")]
    StoreEvent {
        session_id: String,
        event: EventPayload,
        #[serde(default)]
        question_index: Option<u32>,
    },
    #[serde(rename_all = "camelCase")]
    MarkQuestion {
        session_id: String,
        question_index: u32,
    },
    #[serde(rename_all = "camelCase")]
    Finalize { session_id: String },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub kind: ViolationKind,
    pub timestamp: DateTime<Utc>,
    pub confidence: f64,
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ProctoringResponse {
    Session(ProctoringSession),
    Ack { ok: bool },
}

pub async fn handle_request(
    service: &SessionService,
    request: ProctoringRequest,
) -> Result<ProctoringResponse> {
    match request {
        ProctoringRequest::Initialize { interview_id } => {
            let session = service.initialize(&interview_id).await?;
            Ok(ProctoringResponse::Session(session))
        }
        ProctoringRequest::StoreSnapshot {
            session_id,
            seconds_elapsed,
            metrics,
        } => {
            service
                .store_snapshot(&session_id, seconds_elapsed, &metrics)
                .await?;
            Ok(ProctoringResponse::Ack { ok: true })
        }
        ProctoringRequest::StoreEvent {
            session_id,
            event,
            question_index,
        } => {
            let event = ProctoringEvent::new(
                &session_id,
                event.kind,
                event.timestamp,
                event.confidence,
                event.severity,
                event.message,
                event.metadata,
                question_index,
            );
            service.store_event(event).await?;
            Ok(ProctoringResponse::Ack { ok: true })
        }
        ProctoringRequest::MarkQuestion {
            session_id,
            question_index,
        } => {
            service.mark_question(&session_id, question_index).await?;
            Ok(ProctoringResponse::Ack { ok: true })
        }
        ProctoringRequest::Finalize { session_id } => {
            let session = service.finalize(&session_id).await?;
            Ok(ProctoringResponse::Session(session))
        }
    }
}

/// JSON-in/JSON-out convenience for the transport layer. Failures are
/// logged and reported in the body; nothing here can take the host
/// down.
pub async fn handle_request_json(service: &SessionService, body: &str) -> String {
    let request: ProctoringRequest = match serde_json::from_str(body) {
        Ok(request) => request,
        Err(err) => return error_body(&format!("invalid request: {err}")),
    };

    match handle_request(service, request).await {
        Ok(response) => serde_json::to_string(&response)
            .unwrap_or_else(|err| error_body(&format!("failed to encode response: {err}"))),
        Err(err) => {
            error!("proctoring request failed: {err:?}");
            error_body(&err.to_string())
        }
    }
}

fn error_body(message: &str) -> String {
    serde_json::json!({ "ok": false, "error": message }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_parse_from_action_tagged_json() {
        let request: ProctoringRequest =
            serde_json::from_str(r#"{"action":"initialize","interviewId":"iv-1"}"#).unwrap();
        assert!(matches!(
            request,
            ProctoringRequest::Initialize { ref interview_id } if interview_id == "iv-1"
        ));

        let request: ProctoringRequest = serde_json::from_str(
            r#"{
                "action": "storeEvent",
                "sessionId": "s-1",
                "event": {
                    "kind": "looking_away",
                    "timestamp": "2025-06-01T12:00:00Z",
                    "confidence": 0.75,
                    "severity": "MEDIUM",
                    "message": "Candidate looking left"
                },
                "questionIndex": 3
            }"#,
        )
        .unwrap();
        match request {
            ProctoringRequest::StoreEvent {
                event,
                question_index,
                ..
            } => {
                assert_eq!(event.kind, ViolationKind::LookingAway);
                assert_eq!(event.severity, Severity::Medium);
                assert_eq!(question_index, Some(3));
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn non_violation_kinds_are_rejected() {
        let result: Result<ProctoringRequest, _> = serde_json::from_str(
            r#"{
                "action": "storeEvent",
                "sessionId": "s-1",
                "event": {
                    "kind": "face_detected",
                    "timestamp": "2025-06-01T12:00:00Z",
                    "confidence": 1.0,
                    "severity": "LOW",
                    "message": "face present"
                }
            }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn unknown_actions_are_rejected() {
        let result: Result<ProctoringRequest, _> =
            serde_json::from_str(r#"{"action":"selfDestruct"}"#);
        assert!(result.is_err());
    }
}
