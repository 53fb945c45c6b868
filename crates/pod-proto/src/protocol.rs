//! Player control-channel framing.
//!
//! The channel speaks newline-delimited JSON. Commands are fire-and-forget:
//!
//! ```text
//! {"command": ["seek", 10]}
//! ```
//!
//! A property query gets exactly one response line on the same connection:
//!
//! ```text
//! {"command": ["get_property", "time-pos"]}   →   {"data": 42.1, "error": "success"}
//! ```
//!
//! Frames carry no request id, so a connection holds at most one request.

use serde_json::{json, Value};

/// Serialise a command frame, newline included.
pub fn command_frame(command: &[Value]) -> String {
    let mut raw = json!({ "command": command }).to_string();
    raw.push('\n');
    raw
}

/// Serialise a `get_property` query frame, newline included.
pub fn property_query_frame(name: &str) -> String {
    command_frame(&[json!("get_property"), json!(name)])
}

/// Extract `data` from one response line. A missing or null `data` field, or
/// a line that is not JSON, means the value is unknown.
pub fn parse_property_response(line: &str) -> Option<Value> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let val: Value = serde_json::from_str(trimmed).ok()?;
    match val.get("data") {
        Some(Value::Null) | None => None,
        Some(data) => Some(data.clone()),
    }
}

/// Commands the UI can send to the player.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    TogglePause,
    SeekRelative(f64),
    Stop,
}

impl PlayerCommand {
    pub fn to_args(&self) -> Vec<Value> {
        match self {
            Self::TogglePause => vec![json!("cycle"), json!("pause")],
            Self::SeekRelative(secs) => vec![json!("seek"), json!(secs)],
            Self::Stop => vec![json!("stop")],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_frame_layout() {
        let frame = property_query_frame("time-pos");
        assert!(frame.ends_with('\n'));
        let val: Value = serde_json::from_str(frame.trim()).unwrap();
        assert_eq!(val["command"], json!(["get_property", "time-pos"]));
    }

    #[test]
    fn response_without_data_is_unknown() {
        assert_eq!(
            parse_property_response(r#"{"data": 12.5, "error": "success"}"#),
            Some(json!(12.5))
        );
        assert_eq!(
            parse_property_response(r#"{"error": "property unavailable"}"#),
            None
        );
        assert_eq!(parse_property_response(r#"{"data": null}"#), None);
        assert_eq!(parse_property_response("garbage"), None);
    }

    #[test]
    fn seek_args() {
        assert_eq!(
            PlayerCommand::SeekRelative(-10.0).to_args(),
            vec![json!("seek"), json!(-10.0)]
        );
    }
}
