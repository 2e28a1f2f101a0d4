//! Continuous swipe recognizer.
//!
//! A track opens when a pointable's tip speed crosses the configured
//! minimum. Start is emitted once the straight-line displacement from the
//! track origin reaches the minimum length while speed is sustained;
//! Update follows every frame the motion continues; Stop fires when the
//! speed collapses or the pointable disappears.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use super::{Gesture, GestureConfig, GestureIds, GestureKind, GestureState, GestureType, Recognize};
use crate::frame::Frame;
use crate::math::Vector;

/// Fraction of the start velocity that still counts as sustained.
const SUSTAIN: f32 = 0.5;

#[derive(Debug, Clone)]
struct Track {
    hand_id: i32,
    gesture_id: i32, // -1 until Start was emitted
    start_timestamp: i64,
    start_position: Vector,
    last_position: Vector,
    last_speed: f32,
}

impl Track {
    fn started(&self) -> bool {
        self.gesture_id >= 0
    }

    fn direction(&self) -> Vector {
        let d = self.last_position - self.start_position;
        if d.magnitude_squared() > 0.0 {
            d.normalized()
        } else {
            Vector::ZERO
        }
    }

    fn snapshot(&self, pointable_id: i32, state: GestureState, timestamp: i64) -> Gesture {
        Gesture {
            id: self.gesture_id,
            state,
            duration_us: timestamp - self.start_timestamp,
            hand_ids: vec![self.hand_id],
            pointable_ids: vec![pointable_id],
            kind: GestureKind::Swipe {
                start_position: self.start_position,
                position: self.last_position,
                direction: self.direction(),
                speed: self.last_speed,
                pointable_id,
            },
        }
    }
}

#[derive(Default)]
pub struct SwipeMachine {
    tracks: HashMap<i32, Track>,
}

impl Recognize for SwipeMachine {
    fn gesture_type(&self) -> GestureType {
        GestureType::Swipe
    }

    fn ingest(
        &mut self,
        frame: &Frame,
        cfg: &GestureConfig,
        ids: &mut GestureIds,
        out: &mut Vec<Gesture>,
    ) {
        let mut seen: Vec<i32> = Vec::new();
        for hand in &frame.hands {
            for p in hand.pointables.iter().filter(|p| p.is_extended) {
                seen.push(p.id);
                let speed = p.tip_velocity.magnitude();

                match self.tracks.entry(p.id) {
                    Entry::Vacant(slot) => {
                        if speed >= cfg.swipe_min_velocity {
                            slot.insert(Track {
                                hand_id: hand.id,
                                gesture_id: -1,
                                start_timestamp: frame.timestamp,
                                start_position: p.tip_position,
                                last_position: p.tip_position,
                                last_speed: speed,
                            });
                        }
                    }
                    Entry::Occupied(mut slot) => {
                        let track = slot.get_mut();
                        track.hand_id = hand.id;
                        track.last_position = p.tip_position;
                        track.last_speed = speed;
                        if speed < cfg.swipe_min_velocity * SUSTAIN {
                            // motion ceased
                            if track.started() {
                                out.push(track.snapshot(p.id, GestureState::Stop, frame.timestamp));
                            }
                            slot.remove();
                            continue;
                        }
                        let length = track.start_position.distance_to(p.tip_position);
                        if track.started() {
                            out.push(track.snapshot(p.id, GestureState::Update, frame.timestamp));
                        } else if length >= cfg.swipe_min_length {
                            track.gesture_id = ids.next();
                            out.push(track.snapshot(p.id, GestureState::Start, frame.timestamp));
                        }
                    }
                }
            }
        }

        self.tracks.retain(|id, track| {
            if seen.contains(id) {
                true
            } else {
                if track.started() {
                    out.push(track.snapshot(*id, GestureState::Stop, frame.timestamp));
                }
                false
            }
        });
    }

    fn reset(&mut self) {
        self.tracks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth;

    #[test]
    fn swipe_lifecycle_and_attributes() {
        let cfg = GestureConfig {
            swipe_min_length: 40.0,
            swipe_min_velocity: 500.0,
            ..GestureConfig::default()
        };
        let mut machine = SwipeMachine::default();
        let mut ids = GestureIds::default();
        let mut snapshots = Vec::new();
        for f in synth::swipe_frames(30) {
            machine.ingest(&f, &cfg, &mut ids, &mut snapshots);
        }

        let starts = snapshots.iter().filter(|g| g.state == GestureState::Start).count();
        let stops = snapshots.iter().filter(|g| g.state == GestureState::Stop).count();
        assert_eq!(starts, 1);
        assert_eq!(stops, 1);
        assert!(snapshots.len() > 2, "expected Updates between Start and Stop");
        let id = snapshots[0].id;
        assert!(snapshots.iter().all(|g| g.id == id));

        // synth swipe travels along +x
        let GestureKind::Swipe { direction, start_position, position, .. } =
            snapshots.last().unwrap().kind.clone()
        else {
            panic!("non-swipe snapshot");
        };
        assert!(direction.x > 0.99);
        assert!(position.x > start_position.x);
    }

    #[test]
    fn slow_motion_never_qualifies() {
        let cfg = GestureConfig::default(); // 1000 mm/s minimum
        let mut machine = SwipeMachine::default();
        let mut ids = GestureIds::default();
        let mut snapshots = Vec::new();
        for f in synth::circle_frames(60) {
            // circling tip moves well below swipe speed
            machine.ingest(&f, &cfg, &mut ids, &mut snapshots);
        }
        assert!(snapshots.is_empty());
    }
}
