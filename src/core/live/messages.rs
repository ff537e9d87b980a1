//! Wire messages for the bidirectional live-session protocol.
//!
//! Frames are JSON objects with exactly one top-level field set
//! (protobuf oneof style). Outbound frames are built through the
//! [`ClientFrame`] constructors; inbound frames parse into
//! [`ServerFrame`] and flatten into pipeline [`LiveEvent`]s.

use base64::prelude::*;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::config::LiveConfig;
use crate::core::payload::{LiveEvent, ResponseItem};

// =============================================================================
// Client -> Server
// =============================================================================

/// One outbound wire frame. Exactly one field is set.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientFrame {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup: Option<Setup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_content: Option<ClientContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realtime_input: Option<RealtimeInput>,
}

/// Session setup, sent once immediately after the socket opens.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_search: Option<serde_json::Value>,
}

/// A turn of conversation content with an explicit completion flag.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContent {
    pub turns: Vec<Content>,
    pub turn_complete: bool,
}

/// Streaming media chunks (mic audio, video frames), base64-encoded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<Blob>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

impl ClientFrame {
    fn empty() -> Self {
        Self {
            setup: None,
            client_content: None,
            realtime_input: None,
        }
    }

    /// The setup frame for a new session.
    pub fn setup(config: &LiveConfig) -> Self {
        let mut frame = Self::empty();
        frame.setup = Some(Setup {
            model: config.model.clone(),
            generation_config: GenerationConfig {
                response_modalities: config.response_modalities.clone(),
            },
            system_instruction: config.system_instruction.as_ref().map(|text| Content {
                role: None,
                parts: vec![Part {
                    text: Some(text.clone()),
                }],
            }),
            tools: config.search_tool.then(|| {
                vec![Tool {
                    google_search: Some(serde_json::json!({})),
                }]
            }),
        });
        frame
    }

    /// A user text turn, optionally marking the turn complete.
    pub fn text_turn(text: &str, turn_complete: bool) -> Self {
        let mut frame = Self::empty();
        frame.client_content = Some(ClientContent {
            turns: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(text.to_string()),
                }],
            }],
            turn_complete,
        });
        frame
    }

    /// An explicit turn boundary with no content, used to close a turn
    /// whose media was already streamed.
    pub fn turn_boundary() -> Self {
        let mut frame = Self::empty();
        frame.client_content = Some(ClientContent {
            turns: Vec::new(),
            turn_complete: true,
        });
        frame
    }

    /// One streaming media chunk.
    pub fn media_chunk(mime_type: impl Into<String>, data: &[u8]) -> Self {
        let mut frame = Self::empty();
        frame.realtime_input = Some(RealtimeInput {
            media_chunks: vec![Blob {
                mime_type: mime_type.into(),
                data: BASE64_STANDARD.encode(data),
            }],
        });
        frame
    }
}

// =============================================================================
// Server -> Client
// =============================================================================

/// One inbound wire frame.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerFrame {
    #[serde(default)]
    pub setup_complete: Option<serde_json::Value>,
    #[serde(default)]
    pub server_content: Option<ServerContent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default)]
    pub model_turn: Option<ModelTurn>,
    #[serde(default)]
    pub turn_complete: bool,
    #[serde(default)]
    pub interrupted: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelTurn {
    #[serde(default)]
    pub parts: Vec<ServerPart>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerPart {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub inline_data: Option<ServerBlob>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerBlob {
    #[serde(default)]
    pub mime_type: String,
    pub data: String,
}

impl ServerFrame {
    /// Whether this frame acknowledges session setup.
    pub fn is_setup_complete(&self) -> bool {
        self.setup_complete.is_some()
    }

    /// Flatten the frame into pipeline events, in wire order.
    ///
    /// Model-turn parts become items; a turn-complete or interrupted
    /// marker becomes [`LiveEvent::TurnComplete`] after the parts
    /// (interruption discards pending audio exactly like completion).
    pub fn into_events(self) -> Vec<LiveEvent> {
        let mut events = Vec::new();
        let Some(content) = self.server_content else {
            return events;
        };

        if let Some(turn) = content.model_turn {
            for part in turn.parts {
                if let Some(blob) = part.inline_data {
                    match BASE64_STANDARD.decode(&blob.data) {
                        Ok(audio) if !audio.is_empty() => {
                            events.push(LiveEvent::Item(ResponseItem {
                                audio: Some(Bytes::from(audio)),
                                text: None,
                            }));
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::error!("failed to decode inline audio: {e}");
                        }
                    }
                } else if let Some(text) = part.text {
                    events.push(LiveEvent::Item(ResponseItem {
                        audio: None,
                        text: Some(text),
                    }));
                }
            }
        }

        if content.turn_complete || content.interrupted {
            events.push(LiveEvent::TurnComplete);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_frame_shape() {
        let config = LiveConfig::new("k");
        let json = serde_json::to_value(ClientFrame::setup(&config)).unwrap();
        assert_eq!(json["setup"]["model"], "models/gemini-2.0-flash-exp");
        assert_eq!(
            json["setup"]["generationConfig"]["responseModalities"][0],
            "AUDIO"
        );
        assert!(json["setup"]["tools"][0]["googleSearch"].is_object());
        assert!(json.get("clientContent").is_none());
    }

    #[test]
    fn test_text_turn_frame_shape() {
        let json = serde_json::to_value(ClientFrame::text_turn("hello", true)).unwrap();
        let content = &json["clientContent"];
        assert_eq!(content["turnComplete"], true);
        assert_eq!(content["turns"][0]["role"], "user");
        assert_eq!(content["turns"][0]["parts"][0]["text"], "hello");
    }

    #[test]
    fn test_media_chunk_is_base64() {
        let json = serde_json::to_value(ClientFrame::media_chunk("audio/pcm;rate=16000", b"\x01\x02")).unwrap();
        let chunk = &json["realtimeInput"]["mediaChunks"][0];
        assert_eq!(chunk["mimeType"], "audio/pcm;rate=16000");
        assert_eq!(chunk["data"], BASE64_STANDARD.encode(b"\x01\x02"));
    }

    #[test]
    fn test_parse_audio_and_turn_complete() {
        let raw = serde_json::json!({
            "serverContent": {
                "modelTurn": {
                    "parts": [
                        {"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": BASE64_STANDARD.encode(b"pcm")}},
                        {"text": "spoken words"}
                    ]
                },
                "turnComplete": true
            }
        });
        let frame: ServerFrame = serde_json::from_value(raw).unwrap();
        let events = frame.into_events();
        assert_eq!(events.len(), 3);
        assert!(matches!(
            &events[0],
            LiveEvent::Item(item) if item.audio.as_deref() == Some(b"pcm".as_ref())
        ));
        assert!(matches!(
            &events[1],
            LiveEvent::Item(item) if item.text.as_deref() == Some("spoken words")
        ));
        assert_eq!(events[2], LiveEvent::TurnComplete);
    }

    #[test]
    fn test_interrupted_counts_as_turn_complete() {
        let raw = serde_json::json!({"serverContent": {"interrupted": true}});
        let frame: ServerFrame = serde_json::from_value(raw).unwrap();
        assert_eq!(frame.into_events(), vec![LiveEvent::TurnComplete]);
    }

    #[test]
    fn test_heartbeat_frame_yields_nothing() {
        let frame: ServerFrame = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(!frame.is_setup_complete());
        assert!(frame.into_events().is_empty());
    }

    #[test]
    fn test_setup_complete_frame() {
        let frame: ServerFrame =
            serde_json::from_value(serde_json::json!({"setupComplete": {}})).unwrap();
        assert!(frame.is_setup_complete());
    }

    #[test]
    fn test_empty_inline_audio_is_dropped() {
        let raw = serde_json::json!({
            "serverContent": {
                "modelTurn": {"parts": [{"inlineData": {"mimeType": "audio/pcm", "data": ""}}]}
            }
        });
        let frame: ServerFrame = serde_json::from_value(raw).unwrap();
        assert!(frame.into_events().is_empty());
    }
}
