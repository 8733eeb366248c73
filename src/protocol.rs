//! Wire protocol between the controller and a remote actor.
//!
//! Messages are newline-delimited JSON over TCP: one request line out, one
//! response line back. Requests carry a `type` tag, responses a `status` tag.
//! The protocol has no request ids, so a reply can only be matched to the
//! single request that is currently in flight.

use serde::{Deserialize, Serialize};

/// Number of discrete actions a remote actor understands.
pub const ACTION_COUNT: usize = 5;

/// Discrete command set for a remote actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveForward,
    TurnLeft,
    TurnRight,
    Jump,
    Harvest,
}

impl Action {
    /// Map a policy action index to an action, `None` when out of range.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Action::MoveForward),
            1 => Some(Action::TurnLeft),
            2 => Some(Action::TurnRight),
            3 => Some(Action::Jump),
            4 => Some(Action::Harvest),
            _ => None,
        }
    }

    /// Wire index of this action.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// Request sent to the remote actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    GetState,
    TakeAction { action: u32 },
    Reset,
    Close,
}

/// Reply status tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    Error,
}

/// Reply from the remote actor.
///
/// Each request type fills in a different subset of the payload fields, so
/// they are all optional here; the bridge validates the subset it needs and
/// treats a missing field as a protocol fault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<RemoteState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_state: Option<RemoteState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
}

impl Response {
    /// Successful state reply, as sent for `get_state` and `reset`.
    pub fn ok_state(state: RemoteState) -> Self {
        Self {
            status: Status::Ok,
            message: None,
            state: Some(state),
            reward: None,
            next_state: None,
            done: None,
        }
    }

    /// Successful step reply, as sent for `take_action`.
    pub fn ok_step(reward: f32, next_state: RemoteState, done: bool) -> Self {
        Self {
            status: Status::Ok,
            message: None,
            state: None,
            reward: Some(reward),
            next_state: Some(next_state),
            done: Some(done),
        }
    }

    /// Error reply with a human-readable message.
    pub fn error(message: &str) -> Self {
        Self {
            status: Status::Error,
            message: Some(message.to_string()),
            state: None,
            reward: None,
            next_state: None,
            done: None,
        }
    }
}

/// Position in the actor's world.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Nearest harvest target as reported by the actor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetInfo {
    pub distance: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Raw actor state, reported on every query/step/reset response.
///
/// The `Default` value doubles as the documented safe fallback: origin
/// position, zero orientation, empty inventory, nothing visible, no target.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RemoteState {
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub yaw: f32,
    #[serde(default)]
    pub pitch: f32,
    #[serde(default)]
    pub inventory: u32,
    #[serde(default)]
    pub target_visible: bool,
    #[serde(default)]
    pub nearest_target: Option<TargetInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_from_index() {
        assert_eq!(Action::from_index(0), Some(Action::MoveForward));
        assert_eq!(Action::from_index(4), Some(Action::Harvest));
        assert_eq!(Action::from_index(5), None);
        assert_eq!(Action::from_index(usize::MAX), None);
    }

    #[test]
    fn test_action_index_round_trip() {
        for index in 0..ACTION_COUNT {
            let action = Action::from_index(index).unwrap();
            assert_eq!(action.index(), index);
        }
    }

    #[test]
    fn test_request_wire_shape() {
        let json = serde_json::to_string(&Request::GetState).unwrap();
        assert_eq!(json, r#"{"type":"get_state"}"#);

        let json = serde_json::to_string(&Request::TakeAction { action: 3 }).unwrap();
        assert_eq!(json, r#"{"type":"take_action","action":3}"#);

        let json = serde_json::to_string(&Request::Close).unwrap();
        assert_eq!(json, r#"{"type":"close"}"#);
    }

    #[test]
    fn test_response_with_missing_payload_fields() {
        let response: Response = serde_json::from_str(r#"{"status":"ok"}"#).unwrap();
        assert_eq!(response.status, Status::Ok);
        assert!(response.state.is_none());
        assert!(response.reward.is_none());
        assert!(response.done.is_none());
    }

    #[test]
    fn test_error_response_parses() {
        let response: Response =
            serde_json::from_str(r#"{"status":"error","message":"actor offline"}"#).unwrap();
        assert_eq!(response.status, Status::Error);
        assert_eq!(response.message.as_deref(), Some("actor offline"));
    }

    #[test]
    fn test_state_reply_round_trip() {
        let state = RemoteState {
            position: Position::new(12.0, 64.0, -3.5),
            yaw: 1.25,
            pitch: -0.3,
            inventory: 4,
            target_visible: true,
            nearest_target: Some(TargetInfo {
                distance: 6.0,
                x: 15.0,
                y: 64.0,
                z: -1.0,
            }),
        };

        let json = serde_json::to_string(&Response::ok_state(state.clone())).unwrap();
        let parsed: Response = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.state, Some(state));
    }

    #[test]
    fn test_state_with_absent_target_parses() {
        let json = r#"{"status":"ok","state":{"position":{"x":0.0,"y":0.0,"z":0.0},"yaw":0.0,"pitch":0.0,"inventory":0,"target_visible":false,"nearest_target":null}}"#;
        let response: Response = serde_json::from_str(json).unwrap();
        let state = response.state.unwrap();
        assert!(state.nearest_target.is_none());
        assert_eq!(state, RemoteState::default());
    }
}
