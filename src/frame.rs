//! Immutable per-capture frame snapshots.
//!
//! A frame is created once per capture cycle, never mutated after
//! publication, and destroyed only by eviction from the history cache.
//! Lookups return invalid sentinels instead of absent values.

use crate::entity::{Hand, Pointable};
use crate::error::{Error, Result};
use crate::gestures::Gesture;
use crate::math::{Matrix, Vector};
use crate::motion::MotionEstimate;
use serde::{Deserialize, Serialize};

/// Raw per-capture input from the (external) capture layer: entity IDs are
/// provisional until the history cache's identity matcher assigns them.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameData {
    pub timestamp: i64,
    pub frames_per_second: f32,
    pub hands: Vec<Hand>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Monotonically increasing capture ID; -1 marks the invalid sentinel.
    pub id: i64,
    /// Capture instant, microseconds.
    pub timestamp: i64,
    pub current_frames_per_second: f32,
    pub hands: Vec<Hand>,
    pub gestures: Vec<Gesture>,
}

/// Shared invalid sentinels; every miss hands out a reference to the same
/// instance. Hand and Gesture need static homes of their own: they hold
/// `Vec`s, so a reference to the const would point at a temporary.
static INVALID_FRAME: Frame = Frame {
    id: -1,
    timestamp: 0,
    current_frames_per_second: 0.0,
    hands: Vec::new(),
    gestures: Vec::new(),
};
static INVALID_HAND: Hand = Hand::INVALID;
static INVALID_GESTURE: Gesture = Gesture::INVALID;

impl Frame {
    pub fn invalid() -> &'static Frame {
        &INVALID_FRAME
    }

    pub fn is_valid(&self) -> bool {
        self.id >= 0
    }

    pub fn hand(&self, id: i32) -> &Hand {
        self.hands
            .iter()
            .find(|h| h.id == id)
            .unwrap_or(&INVALID_HAND)
    }

    pub fn pointables(&self) -> impl Iterator<Item = &Pointable> {
        self.hands.iter().flat_map(|h| h.pointables.iter())
    }

    pub fn fingers(&self) -> impl Iterator<Item = &Pointable> {
        self.pointables().filter(|p| p.is_finger())
    }

    pub fn tools(&self) -> impl Iterator<Item = &Pointable> {
        self.pointables().filter(|p| p.is_tool())
    }

    pub fn pointable(&self, id: i32) -> &Pointable {
        self.pointables()
            .find(|p| p.id == id)
            .unwrap_or(&Pointable::INVALID)
    }

    pub fn finger(&self, id: i32) -> &Pointable {
        self.fingers()
            .find(|p| p.id == id)
            .unwrap_or(&Pointable::INVALID)
    }

    pub fn tool(&self, id: i32) -> &Pointable {
        self.tools()
            .find(|p| p.id == id)
            .unwrap_or(&Pointable::INVALID)
    }

    pub fn gesture(&self, id: i32) -> &Gesture {
        self.gestures
            .iter()
            .find(|g| g.id == id)
            .unwrap_or(&INVALID_GESTURE)
    }

    // --- aggregate motion since an older frame (pull, per call) ---

    pub fn motion(&self, since: &Frame) -> MotionEstimate {
        MotionEstimate::between(since, self)
    }

    pub fn translation(&self, since: &Frame) -> Vector {
        self.motion(since).translation
    }

    pub fn translation_probability(&self, since: &Frame) -> f32 {
        self.motion(since).translation_probability
    }

    pub fn rotation_axis(&self, since: &Frame) -> Vector {
        self.motion(since).rotation_axis
    }

    /// Unsigned rotation angle in [0, pi].
    pub fn rotation_angle(&self, since: &Frame) -> f32 {
        self.motion(since).rotation_angle
    }

    /// Signed rotation angle around `axis`, in [-pi, pi].
    pub fn rotation_angle_around(&self, since: &Frame, axis: Vector) -> f32 {
        self.motion(since).rotation_angle_around(axis)
    }

    pub fn rotation_matrix(&self, since: &Frame) -> Matrix {
        let m = self.motion(since);
        Matrix::from_axis_angle(m.rotation_axis, m.rotation_angle)
    }

    pub fn rotation_probability(&self, since: &Frame) -> f32 {
        self.motion(since).rotation_probability
    }

    pub fn scale_factor(&self, since: &Frame) -> f32 {
        self.motion(since).scale_factor
    }

    pub fn scale_probability(&self, since: &Frame) -> f32 {
        self.motion(since).scale_probability
    }

    // --- binary exchange (opaque length-prefixed blob) ---

    /// Serialize the full entity graph as a length-prefixed byte blob.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let payload = serde_json::to_vec(self).map_err(Error::Encode)?;
        let mut blob = Vec::with_capacity(4 + payload.len());
        blob.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        blob.extend_from_slice(&payload);
        Ok(blob)
    }

    /// Replace this frame's contents with a previously serialized blob.
    ///
    /// Relating a deserialized frame to live frames (motion queries,
    /// gestures-since) is best-effort: IDs in the blob belong to the
    /// session that produced it.
    pub fn deserialize(&mut self, blob: &[u8]) -> Result<()> {
        if blob.len() < 4 {
            return Err(Error::TruncatedBlob {
                expected: 4,
                actual: blob.len(),
            });
        }
        let expected = u32::from_le_bytes([blob[0], blob[1], blob[2], blob[3]]) as usize;
        let payload = &blob[4..];
        if payload.len() < expected {
            return Err(Error::TruncatedBlob {
                expected,
                actual: payload.len(),
            });
        }
        *self = serde_json::from_slice(&payload[..expected]).map_err(Error::Decode)?;
        Ok(())
    }
}

impl Default for Frame {
    fn default() -> Self {
        INVALID_FRAME.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth;

    #[test]
    fn lookups_return_sentinels_on_miss() {
        let frame = synth::static_frames(1).pop().unwrap();
        assert!(!frame.hand(9999).is_valid());
        assert!(!frame.pointable(9999).is_valid());
        assert!(!frame.gesture(9999).is_valid());
        assert!(!Frame::invalid().is_valid());
    }

    #[test]
    fn misses_share_one_sentinel_instance() {
        let a = synth::static_frames(1).pop().unwrap();
        let b = synth::two_hand_frame();
        // the references outlive the call and all point at the same statics
        let missing_hand = a.hand(9999);
        let missing_gesture = a.gesture(9999);
        assert!(std::ptr::eq(missing_hand, b.hand(-42)));
        assert!(std::ptr::eq(missing_gesture, b.gesture(-42)));
        assert!(!missing_hand.is_valid());
        assert!(!missing_gesture.is_valid());
    }

    #[test]
    fn serialize_round_trips_entity_graph_exactly() {
        let frame = synth::two_hand_frame();
        let hands = frame.hands.len();
        let fingers = frame.fingers().count();

        let blob = frame.serialize().unwrap();
        let mut restored = Frame::default();
        restored.deserialize(&blob).unwrap();

        assert_eq!(restored.hands.len(), hands);
        assert_eq!(restored.fingers().count(), fingers);
        assert_eq!(restored, frame); // bit-for-bit, floats included
    }

    #[test]
    fn deserialize_rejects_truncated_blobs() {
        let frame = synth::two_hand_frame();
        let blob = frame.serialize().unwrap();
        let mut target = Frame::default();
        assert!(target.deserialize(&blob[..2]).is_err());
        assert!(target.deserialize(&blob[..blob.len() - 3]).is_err());
    }
}
