//! Ticket payload codec.
//!
//! The payload is the text embedded in the QR symbol. It carries the token,
//! which is the only authority, plus event and participant fields so the
//! operator can see who is at the door without a second lookup.
//!
//! # Wire format
//!
//! ```json
//! {"token":"<64 hex>","event_id":"evt-1","event_name":"RustConf","participant":{"name":"Ada"}}
//! ```
//!
//! Field order is fixed by the struct and `participant` is an ordered map, so
//! encoding the same ticket twice yields the same bytes. Scanners may also
//! hand over a bare token (legacy plain-text tickets); see
//! [`PayloadCodec::decode`].

use crate::constants::MAX_BARE_TOKEN_LEN;
use crate::error::Result;
use gatepass_core::{EventId, ParticipantMetadata, Ticket, TicketToken};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Structured content of a ticket QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketPayload {
    /// Redemption token.
    pub token: TicketToken,

    /// Event the ticket admits to (display only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,

    /// Event display name (display only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,

    /// Participant display fields.
    #[serde(default)]
    pub participant: ParticipantMetadata,
}

impl TicketPayload {
    /// Payload for a persisted ticket.
    #[must_use]
    pub fn for_ticket(ticket: &Ticket) -> Self {
        Self {
            token: ticket.token.clone(),
            event_id: Some(ticket.event_id.clone()),
            event_name: Some(ticket.event_name.clone()),
            participant: ticket.participant.clone(),
        }
    }
}

/// Result of decoding scanner text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScannedPayload {
    /// A JSON payload produced by [`PayloadCodec::encode`].
    Structured(TicketPayload),
    /// A legacy plain-text ticket holding only the token.
    BareToken(TicketToken),
}

impl ScannedPayload {
    /// The token to look up, whatever the shape.
    #[must_use]
    pub const fn token(&self) -> &TicketToken {
        match self {
            Self::Structured(payload) => &payload.token,
            Self::BareToken(token) => token,
        }
    }
}

/// Why scanner text could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Not a payload and not a plausible bare token.
    #[error("Malformed QR payload: {0}")]
    Malformed(String),

    /// Well-formed, but no usable token in it.
    #[error("QR payload carries no token")]
    MissingToken,
}

/// Encoder and decoder for [`TicketPayload`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadCodec;

impl PayloadCodec {
    /// Serialize a payload to its canonical JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::Serialization`](crate::TicketError::Serialization)
    /// if JSON serialization fails.
    pub fn encode(payload: &TicketPayload) -> Result<String> {
        Ok(serde_json::to_string(payload)?)
    }

    /// Parse text produced by a scanner.
    ///
    /// 1. Surrounding whitespace is trimmed (scanners append newlines).
    /// 2. Empty text has no token.
    /// 3. Text opening with `{` or `[` must be a JSON object with a non-blank
    ///    string `token` that is itself a plausible token (see 4). Display
    ///    fields of the wrong type are dropped rather than failing the scan.
    /// 4. Anything else is a bare token if it is 1 to 256 visible ASCII
    ///    characters without whitespace.
    ///
    /// # Errors
    ///
    /// [`DecodeError::MissingToken`] for empty text or a JSON object without
    /// a usable token, [`DecodeError::Malformed`] otherwise.
    pub fn decode(text: &str) -> std::result::Result<ScannedPayload, DecodeError> {
        let text = text.trim();

        if text.is_empty() {
            return Err(DecodeError::MissingToken);
        }

        if text.starts_with('{') || text.starts_with('[') {
            return Self::decode_structured(text).map(ScannedPayload::Structured);
        }

        if is_plausible_token(text) {
            Ok(ScannedPayload::BareToken(TicketToken::new(text)))
        } else {
            Err(DecodeError::Malformed(
                "neither a JSON payload nor a bare token".to_string(),
            ))
        }
    }

    fn decode_structured(text: &str) -> std::result::Result<TicketPayload, DecodeError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| DecodeError::Malformed(e.to_string()))?;

        let Value::Object(object) = value else {
            return Err(DecodeError::Malformed("payload is not a JSON object".to_string()));
        };

        let token = match object.get("token") {
            Some(Value::String(token)) if !token.trim().is_empty() => token,
            _ => return Err(DecodeError::MissingToken),
        };

        // The token becomes a store key; hold it to the same shape as a bare one.
        if !is_plausible_token(token) {
            return Err(DecodeError::Malformed(
                "token is not 1 to 256 visible ASCII characters".to_string(),
            ));
        }
        let token = TicketToken::new(token.clone());

        Ok(TicketPayload {
            token,
            event_id: string_field(&object, "event_id").map(EventId::new),
            event_name: string_field(&object, "event_name"),
            participant: object
                .get("participant")
                .and_then(Value::as_object)
                .map(participant_fields)
                .unwrap_or_default(),
        })
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Keeps string fields verbatim and renders numbers and booleans as text.
fn participant_fields(object: &Map<String, Value>) -> ParticipantMetadata {
    object
        .iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null | Value::Array(_) | Value::Object(_) => return None,
            };
            Some((key.clone(), text))
        })
        .collect()
}

fn is_plausible_token(text: &str) -> bool {
    (1..=MAX_BARE_TOKEN_LEN).contains(&text.len()) && text.bytes().all(|b| b.is_ascii_graphic())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use gatepass_testing::properties;
    use proptest::prelude::*;

    fn payload() -> TicketPayload {
        TicketPayload {
            token: TicketToken::new("ab".repeat(32)),
            event_id: Some(EventId::new("evt-1")),
            event_name: Some("RustConf".to_string()),
            participant: ParticipantMetadata::new().with("name", "Ada").with("email", "ada@example.com"),
        }
    }

    #[test]
    fn test_encoding_is_canonical() {
        let json = PayloadCodec::encode(&payload()).unwrap();
        assert_eq!(
            json,
            format!(
                r#"{{"token":"{}","event_id":"evt-1","event_name":"RustConf","participant":{{"email":"ada@example.com","name":"Ada"}}}}"#,
                "ab".repeat(32)
            )
        );
        assert_eq!(json, PayloadCodec::encode(&payload()).unwrap());
    }

    #[test]
    fn test_absent_optional_fields_are_omitted() {
        let minimal = TicketPayload {
            token: TicketToken::new("t0k3n"),
            event_id: None,
            event_name: None,
            participant: ParticipantMetadata::new(),
        };
        assert_eq!(
            PayloadCodec::encode(&minimal).unwrap(),
            r#"{"token":"t0k3n","participant":{}}"#
        );
    }

    #[test]
    fn test_empty_and_whitespace_are_missing_token() {
        assert_eq!(PayloadCodec::decode(""), Err(DecodeError::MissingToken));
        assert_eq!(PayloadCodec::decode(" \n\t"), Err(DecodeError::MissingToken));
    }

    #[test]
    fn test_json_without_usable_token() {
        for text in [
            r#"{"event_id":"evt-1"}"#,
            r#"{"token":""}"#,
            r#"{"token":"   "}"#,
            r#"{"token":42}"#,
            r#"{"token":null}"#,
        ] {
            assert_eq!(PayloadCodec::decode(text), Err(DecodeError::MissingToken), "{text}");
        }
    }

    #[test]
    fn test_broken_json_is_malformed() {
        for text in [r#"{"token":"abc""#, "[1,2,3]", "{not json}", r#"["token"]"#] {
            assert!(
                matches!(PayloadCodec::decode(text), Err(DecodeError::Malformed(_))),
                "{text}"
            );
        }
    }

    #[test]
    fn test_garbage_text_is_malformed() {
        assert!(matches!(
            PayloadCodec::decode("not json and not hex garbage !!"),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(
            PayloadCodec::decode(&"x".repeat(MAX_BARE_TOKEN_LEN + 1)),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(
            PayloadCodec::decode("jeton-é"),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_structured_token_obeys_bare_token_limits() {
        let oversized = format!(r#"{{"token":"{}"}}"#, "a".repeat(MAX_BARE_TOKEN_LEN + 1));
        let longest = format!(r#"{{"token":"{}"}}"#, "a".repeat(MAX_BARE_TOKEN_LEN));

        for text in [
            r#"{"token":"a\u0000b"}"#,
            r#"{"token":"tab\tinside"}"#,
            r#"{"token":"jeton-é"}"#,
            r#"{"token":" padded "}"#,
            oversized.as_str(),
        ] {
            assert!(
                matches!(PayloadCodec::decode(text), Err(DecodeError::Malformed(_))),
                "{text}"
            );
        }
        assert!(PayloadCodec::decode(&longest).is_ok());
    }

    #[test]
    fn test_bare_token_with_trailing_newline() {
        let token = "cd".repeat(32);
        assert_eq!(
            PayloadCodec::decode(&format!("{token}\r\n")),
            Ok(ScannedPayload::BareToken(TicketToken::new(token)))
        );
    }

    #[test]
    fn test_wrongly_typed_display_fields_are_tolerated() {
        let decoded = PayloadCodec::decode(
            r#"{"token":"abc","event_id":7,"participant":{"name":"Ada","age":36,"vip":true,"tags":["a"]}}"#,
        )
        .unwrap();
        let ScannedPayload::Structured(payload) = decoded else {
            panic!("expected structured payload");
        };
        assert_eq!(payload.token.as_str(), "abc");
        assert_eq!(payload.event_id, None);
        assert_eq!(payload.participant.get("age"), Some("36"));
        assert_eq!(payload.participant.get("vip"), Some("true"));
        assert_eq!(payload.participant.get("tags"), None);
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(
            token in properties::hex_token(),
            event_id in proptest::option::of("[a-z0-9-]{1,16}"),
            event_name in proptest::option::of("\\PC{0,32}"),
            participant in properties::participant_metadata(),
        ) {
            let payload = TicketPayload {
                token,
                event_id: event_id.map(EventId::new),
                event_name,
                participant,
            };
            let text = PayloadCodec::encode(&payload).unwrap();
            prop_assert_eq!(PayloadCodec::decode(&text), Ok(ScannedPayload::Structured(payload)));
        }

        #[test]
        fn prop_decode_never_panics(text in properties::scanned_text()) {
            let _ = PayloadCodec::decode(&text);
        }
    }
}
