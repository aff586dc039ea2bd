//! Events a voice transport delivers to the `VoiceChannel`, and the decoder
//! for the provider's JSON control frames.

use concierge_core::Speaker;
use serde::Deserialize;

/// Whether a transcript fragment is still being revised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptKind {
    Partial,
    Final,
}

/// An asynchronous event from the call engine, applied in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The provider accepted the call and audio is flowing.
    CallStart,
    /// The call is over, for whatever reason.
    CallEnd,
    Transcript {
        role: Speaker,
        text: String,
        kind: TranscriptKind,
    },
    /// Reported by the transport mid-call. Informational; a `CallEnd` follows
    /// if the call cannot continue.
    Error(String),
}

/// Control frames sent by the provider over the call socket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum ServerFrame {
    Transcript {
        role: Speaker,
        #[serde(rename = "transcriptType")]
        transcript_type: TranscriptKind,
        transcript: String,
    },
    StatusUpdate {
        status: String,
        #[serde(default, rename = "endedReason")]
        ended_reason: Option<String>,
    },
    /// The assistant stopped responding.
    Hang,
    Error {
        #[serde(default)]
        error: Option<serde_json::Value>,
    },
    #[serde(other)]
    Unknown,
}

impl ServerFrame {
    fn into_event(self) -> Option<TransportEvent> {
        match self {
            ServerFrame::Transcript {
                role,
                transcript_type,
                transcript,
            } => Some(TransportEvent::Transcript {
                role,
                text: transcript,
                kind: transcript_type,
            }),
            ServerFrame::StatusUpdate { status, ended_reason } => match status.as_str() {
                "in-progress" => Some(TransportEvent::CallStart),
                "ended" => {
                    if let Some(reason) = ended_reason {
                        tracing::debug!(reason = %reason, "Provider ended the call");
                    }
                    Some(TransportEvent::CallEnd)
                }
                _ => None,
            },
            ServerFrame::Hang => Some(TransportEvent::Error(
                "assistant stopped responding".to_string(),
            )),
            ServerFrame::Error { error } => Some(TransportEvent::Error(match error {
                Some(serde_json::Value::String(message)) => message,
                Some(other) => other.to_string(),
                None => "unknown transport error".to_string(),
            })),
            ServerFrame::Unknown => None,
        }
    }
}

/// Decodes one text frame. Frames that carry nothing the channel cares about
/// (speech updates, model output, queued statuses) decode to `None`.
pub fn decode_frame(text: &str) -> Result<Option<TransportEvent>, serde_json::Error> {
    Ok(serde_json::from_str::<ServerFrame>(text)?.into_event())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_transcript_frames() {
        let partial = decode_frame(
            r#"{"type":"transcript","role":"user","transcriptType":"partial","transcript":"two bhk in"}"#,
        )
        .unwrap();
        assert_eq!(
            partial,
            Some(TransportEvent::Transcript {
                role: Speaker::User,
                text: "two bhk in".to_string(),
                kind: TranscriptKind::Partial,
            })
        );

        let final_frame = decode_frame(
            r#"{"type":"transcript","role":"assistant","transcriptType":"final","transcript":"Sure."}"#,
        )
        .unwrap();
        assert!(matches!(
            final_frame,
            Some(TransportEvent::Transcript {
                role: Speaker::Assistant,
                kind: TranscriptKind::Final,
                ..
            })
        ));
    }

    #[test]
    fn test_decode_status_updates() {
        assert_eq!(
            decode_frame(r#"{"type":"status-update","status":"in-progress"}"#).unwrap(),
            Some(TransportEvent::CallStart)
        );
        assert_eq!(
            decode_frame(
                r#"{"type":"status-update","status":"ended","endedReason":"customer-ended-call"}"#
            )
            .unwrap(),
            Some(TransportEvent::CallEnd)
        );
        assert_eq!(
            decode_frame(r#"{"type":"status-update","status":"queued"}"#).unwrap(),
            None
        );
    }

    #[test]
    fn test_decode_errors_and_unknown_frames() {
        assert_eq!(
            decode_frame(r#"{"type":"error","error":"rate limited"}"#).unwrap(),
            Some(TransportEvent::Error("rate limited".to_string()))
        );
        assert!(matches!(
            decode_frame(r#"{"type":"hang"}"#).unwrap(),
            Some(TransportEvent::Error(_))
        ));
        assert_eq!(
            decode_frame(r#"{"type":"speech-update","status":"started"}"#).unwrap(),
            None
        );
        assert!(decode_frame("not json").is_err());
    }
}
