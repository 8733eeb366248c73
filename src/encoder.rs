//! Fixed-size observation encoding of raw actor state.

use std::f32::consts::PI;
use std::ops::Index;

use crate::protocol::RemoteState;

/// Length of the encoded observation vector.
pub const OBSERVATION_DIM: usize = 11;

/// World units mapped onto one unit of normalized position.
pub const POSITION_SCALE: f32 = 100.0;
/// Items mapped onto one unit of normalized inventory. Intentionally not
/// clamped, so an overfull inventory still shows up as growth.
pub const INVENTORY_SCALE: f32 = 10.0;
/// World units mapped onto one unit of normalized target distance; the
/// result is clamped to 1.0.
pub const TARGET_DISTANCE_SCALE: f32 = 10.0;

/// Target features reported when the actor sees no target: maximum distance
/// and a zero direction.
const NO_TARGET: [f32; 3] = [1.0, 0.0, 0.0];

/// Fixed-length numeric observation handed to the learning agent.
///
/// Layout: `[x, y, z, sin_yaw, cos_yaw, pitch, target_visible, inventory,
/// target_distance, target_dir_x, target_dir_z]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation([f32; OBSERVATION_DIM]);

impl Observation {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_array(self) -> [f32; OBSERVATION_DIM] {
        self.0
    }

    pub const fn len(&self) -> usize {
        OBSERVATION_DIM
    }

    pub const fn is_empty(&self) -> bool {
        false
    }
}

impl Index<usize> for Observation {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        &self.0[index]
    }
}

/// Encode a raw state into the fixed observation layout.
///
/// The encoding is a pure function of the input, recomputed from scratch on
/// every transition: two identical states always produce identical vectors.
pub fn encode_state(state: &RemoteState) -> Observation {
    let mut features = [0.0f32; OBSERVATION_DIM];

    features[0] = state.position.x / POSITION_SCALE;
    features[1] = state.position.y / POSITION_SCALE;
    features[2] = state.position.z / POSITION_SCALE;

    features[3] = state.yaw.sin();
    features[4] = state.yaw.cos();
    features[5] = state.pitch / PI;

    features[6] = if state.target_visible { 1.0 } else { 0.0 };
    features[7] = state.inventory as f32 / INVENTORY_SCALE;

    match state.nearest_target {
        Some(target) => {
            features[8] = (target.distance / TARGET_DISTANCE_SCALE).min(1.0);

            let dx = target.x - state.position.x;
            let dz = target.z - state.position.z;
            let length = (dx * dx + dz * dz).sqrt();
            // A target at the actor's own column has no direction; leave the
            // unit vector at zero instead of dividing by zero.
            if length > 0.0 {
                features[9] = dx / length;
                features[10] = dz / length;
            }
        }
        None => features[8..11].copy_from_slice(&NO_TARGET),
    }

    Observation(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Position, TargetInfo};

    fn state_with_target(distance: f32, x: f32, z: f32) -> RemoteState {
        RemoteState {
            position: Position::new(0.0, 64.0, 0.0),
            yaw: 0.0,
            pitch: 0.0,
            inventory: 0,
            target_visible: true,
            nearest_target: Some(TargetInfo {
                distance,
                x,
                y: 64.0,
                z,
            }),
        }
    }

    #[test]
    fn test_default_state_encodes_to_sentinel() {
        let observation = encode_state(&RemoteState::default());

        assert_eq!(observation[0], 0.0);
        assert_eq!(observation[1], 0.0);
        assert_eq!(observation[2], 0.0);
        assert_eq!(observation[3], 0.0); // sin(0)
        assert_eq!(observation[4], 1.0); // cos(0)
        assert_eq!(observation[5], 0.0);
        assert_eq!(observation[6], 0.0);
        assert_eq!(observation[7], 0.0);
        // No target: maximum distance, zero direction.
        assert_eq!(&observation.as_slice()[8..11], &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_known_state_encodes_exactly() {
        let state = RemoteState {
            position: Position::new(50.0, -25.0, 100.0),
            yaw: PI / 2.0,
            pitch: PI / 4.0,
            inventory: 7,
            target_visible: true,
            nearest_target: None,
        };
        let observation = encode_state(&state);

        assert!((observation[0] - 0.5).abs() < 1e-6);
        assert!((observation[1] + 0.25).abs() < 1e-6);
        assert!((observation[2] - 1.0).abs() < 1e-6);
        assert!((observation[3] - 1.0).abs() < 1e-6);
        assert!(observation[4].abs() < 1e-6);
        assert!((observation[5] - 0.25).abs() < 1e-6);
        assert_eq!(observation[6], 1.0);
        assert!((observation[7] - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_target_direction_is_unit_length() {
        let observation = encode_state(&state_with_target(5.0, 3.0, 4.0));

        assert!((observation[8] - 0.5).abs() < 1e-6);
        assert!((observation[9] - 0.6).abs() < 1e-6);
        assert!((observation[10] - 0.8).abs() < 1e-6);

        let length = (observation[9] * observation[9] + observation[10] * observation[10]).sqrt();
        assert!((length - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_offset_target_keeps_zero_direction() {
        // Target directly above or below the actor: zero planar offset.
        let observation = encode_state(&state_with_target(2.0, 0.0, 0.0));

        assert!((observation[8] - 0.2).abs() < 1e-6);
        assert_eq!(observation[9], 0.0);
        assert_eq!(observation[10], 0.0);
        assert!(!observation[9].is_nan());
        assert!(!observation[10].is_nan());
    }

    #[test]
    fn test_far_target_distance_clamps_to_one() {
        let observation = encode_state(&state_with_target(250.0, 200.0, 150.0));
        assert_eq!(observation[8], 1.0);
    }

    #[test]
    fn test_components_stay_in_documented_ranges() {
        let state = RemoteState {
            position: Position::new(-80.0, 30.0, 99.0),
            yaw: 5.5,
            pitch: -1.2,
            inventory: 9,
            target_visible: true,
            nearest_target: Some(TargetInfo {
                distance: 8.0,
                x: -75.0,
                y: 30.0,
                z: 97.0,
            }),
        };
        let observation = encode_state(&state);

        for component in &observation.as_slice()[..6] {
            assert!((-1.0..=1.0).contains(component));
        }
        assert!((0.0..=1.0).contains(&observation[6]));
        assert!((0.0..=1.0).contains(&observation[7]));
        assert!((0.0..=1.0).contains(&observation[8]));
        for component in &observation.as_slice()[9..] {
            assert!((-1.0..=1.0).contains(component));
        }
    }

    #[test]
    fn test_encoding_is_reproducible() {
        let state = state_with_target(6.5, -2.0, 7.0);
        assert_eq!(encode_state(&state), encode_state(&state));
    }
}
