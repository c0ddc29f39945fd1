use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// The single wire type every message is carried in. `message` is a string
/// containing further JSON, not an inline object — an empty string means
/// `{}` for handler purposes (see [`Envelope::payload`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub identifier: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub target: String,
}

impl Envelope {
    pub fn new(kind: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            identifier: identifier.into(),
            message: String::new(),
            target: String::new(),
        }
    }

    pub fn with_payload<P: Serialize>(mut self, payload: &P) -> Result<Self, SessionError> {
        self.message =
            serde_json::to_string(payload).map_err(|e| SessionError::MalformedMessage(e.to_string()))?;
        Ok(self)
    }

    pub fn targeted(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Decode `message` into `P`. An empty string decodes as `P::default()`
    /// via `{}`, matching the envelope schema's "empty message means `{}`".
    pub fn payload<P: serde::de::DeserializeOwned>(&self) -> Result<P, SessionError> {
        let raw = if self.message.is_empty() { "{}" } else { &self.message };
        serde_json::from_str(raw).map_err(|e| SessionError::MalformedMessage(e.to_string()))
    }

    /// `true` if this envelope should be dropped because of a non-matching
    /// `target`. Broadcasts (`target == ""`) are never misaddressed.
    pub fn is_misaddressed_for(&self, local_identifier: &str) -> bool {
        !self.target.is_empty() && self.target != local_identifier
    }

    pub fn encode(&self) -> Result<Vec<u8>, SessionError> {
        serde_json::to_vec(self).map_err(|e| SessionError::MalformedMessage(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, SessionError> {
        serde_json::from_slice(bytes).map_err(|e| SessionError::MalformedMessage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, Default, PartialEq, Debug)]
    struct Height {
        height: u64,
    }

    #[test]
    fn round_trips_through_bytes() {
        let env = Envelope::new("version", "a:1")
            .with_payload(&Height { height: 3 })
            .unwrap();
        let bytes = env.encode().unwrap();
        let decoded = Envelope::decode(&bytes).unwrap();
        assert_eq!(decoded.kind, "version");
        assert_eq!(decoded.payload::<Height>().unwrap(), Height { height: 3 });
    }

    #[test]
    fn empty_message_decodes_as_default_payload() {
        let env = Envelope::new("heartbeat", "a:1");
        let payload: Height = env.payload().unwrap();
        assert_eq!(payload, Height { height: 0 });
    }

    #[test]
    fn broadcast_is_never_misaddressed() {
        let env = Envelope::new("heartbeat", "a:1");
        assert!(!env.is_misaddressed_for("b:2"));
    }

    #[test]
    fn targeted_message_for_someone_else_is_misaddressed() {
        let env = Envelope::new("verack", "a:1").targeted("c:3");
        assert!(env.is_misaddressed_for("b:2"));
        assert!(!env.is_misaddressed_for("c:3"));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(Envelope::decode(b"not json").is_err());
    }
}
