//! Selection protocol
//!
//! The only message the isolated frame may send outward:
//!
//! ```json
//! { "type": "BOX_SELECTED", "id": 3 }
//! ```
//!
//! Anything else arriving on the channel is a [`ProtocolViolation`] and is
//! dropped by the host.

use serde_json::{json, Map, Value};
use vibe_document::BoxId;

/// Envelope type tag for selection events
pub const BOX_SELECTED: &str = "BOX_SELECTED";

/// A validated selection event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxSelection {
    /// Selected box
    pub id: BoxId,
}

impl BoxSelection {
    /// Create a selection event
    #[inline]
    #[must_use]
    pub fn new(id: BoxId) -> Self {
        Self { id }
    }

    /// Wire form of the event
    #[must_use]
    pub fn to_envelope(self) -> Value {
        json!({ "type": BOX_SELECTED, "id": self.id.get() })
    }
}

/// A message from the frame that does not match the selection envelope
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolViolation {
    /// Raw text was not JSON
    #[error("message is not valid JSON")]
    Malformed,

    /// Top level is not an object
    #[error("message is not an object")]
    NotAnObject,

    /// `type` missing or not `BOX_SELECTED`
    #[error("unexpected message type: {0:?}")]
    UnexpectedType(Option<String>),

    /// `id` missing
    #[error("selection carries no id")]
    MissingId,

    /// `id` present but not a positive integer
    #[error("invalid box id: {0}")]
    InvalidId(String),

    /// Keys beyond `type` and `id`
    #[error("unexpected field: {0}")]
    UnexpectedField(String),
}

/// Validate a message received from the frame
///
/// The id may be a positive integer or a string of decimal digits (the
/// attribute value as read from the DOM). Any other shape is rejected.
///
/// # Errors
/// Returns the first mismatch found.
pub fn validate_message(message: &Value) -> Result<BoxSelection, ProtocolViolation> {
    let object = message.as_object().ok_or(ProtocolViolation::NotAnObject)?;

    match object.get("type") {
        Some(Value::String(kind)) if kind == BOX_SELECTED => {}
        Some(Value::String(kind)) => return Err(ProtocolViolation::UnexpectedType(Some(kind.clone()))),
        _ => return Err(ProtocolViolation::UnexpectedType(None)),
    }

    if let Some(extra) = object.keys().find(|k| *k != "type" && *k != "id") {
        return Err(ProtocolViolation::UnexpectedField(extra.clone()));
    }

    let id = parse_id(object)?;
    Ok(BoxSelection::new(id))
}

/// Validate a raw text message
///
/// # Errors
/// [`ProtocolViolation::Malformed`] when the text is not JSON, otherwise as
/// [`validate_message`].
pub fn validate_raw(raw: &str) -> Result<BoxSelection, ProtocolViolation> {
    let value: Value = serde_json::from_str(raw).map_err(|_| ProtocolViolation::Malformed)?;
    validate_message(&value)
}

fn parse_id(object: &Map<String, Value>) -> Result<BoxId, ProtocolViolation> {
    let raw = object.get("id").ok_or(ProtocolViolation::MissingId)?;
    let value = match raw {
        Value::Number(n) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| ProtocolViolation::InvalidId(n.to_string()))?,
        Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => s
            .parse::<u32>()
            .map_err(|_| ProtocolViolation::InvalidId(s.clone()))?,
        other => return Err(ProtocolViolation::InvalidId(other.to_string())),
    };
    BoxId::new(value).ok_or_else(|| ProtocolViolation::InvalidId(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> BoxId {
        BoxId::new(n).unwrap()
    }

    #[test]
    fn accepts_numeric_and_digit_string_ids() {
        let sel = validate_message(&json!({"type": "BOX_SELECTED", "id": 4})).unwrap();
        assert_eq!(sel.id, id(4));

        let sel = validate_message(&json!({"type": "BOX_SELECTED", "id": "12"})).unwrap();
        assert_eq!(sel.id, id(12));
    }

    #[test]
    fn envelope_validates_against_itself() {
        let sel = BoxSelection::new(id(9));
        assert_eq!(validate_message(&sel.to_envelope()), Ok(sel));
    }

    #[test]
    fn rejects_spoofed_shapes() {
        let cases = [
            (json!("BOX_SELECTED"), ProtocolViolation::NotAnObject),
            (json!({"id": 1}), ProtocolViolation::UnexpectedType(None)),
            (
                json!({"type": "NAVIGATE", "id": 1}),
                ProtocolViolation::UnexpectedType(Some("NAVIGATE".into())),
            ),
            (json!({"type": "BOX_SELECTED"}), ProtocolViolation::MissingId),
            (
                json!({"type": "BOX_SELECTED", "id": 1, "href": "x"}),
                ProtocolViolation::UnexpectedField("href".into()),
            ),
        ];
        for (message, expected) in cases {
            assert_eq!(validate_message(&message), Err(expected));
        }
    }

    #[test]
    fn rejects_non_positive_or_fractional_ids() {
        for bad in [json!(0), json!(-3), json!(1.5), json!("0"), json!("2a"), json!(""), json!(null)] {
            let result = validate_message(&json!({"type": "BOX_SELECTED", "id": bad}));
            assert!(matches!(result, Err(ProtocolViolation::InvalidId(_))), "{result:?}");
        }
    }

    #[test]
    fn raw_text_must_be_json() {
        assert_eq!(validate_raw("{not json"), Err(ProtocolViolation::Malformed));
        assert!(validate_raw(r#"{"type":"BOX_SELECTED","id":2}"#).is_ok());
    }
}
