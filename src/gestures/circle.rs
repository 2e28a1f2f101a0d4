//! Continuous circle recognizer.
//!
//! Tracks every extended pointable independently. The swept angle is
//! accumulated from the frame-to-frame turn of the tip's travel direction;
//! radius comes from the chord-length relation `chord = 2r sin(turn/2)` and
//! the center from the inward radial of the fitted plane. The motion
//! pattern breaks on a stall, a straightening, or a reversal of the turn
//! direction.

use std::collections::HashMap;

use super::{Gesture, GestureConfig, GestureIds, GestureKind, GestureState, GestureType, Recognize};
use crate::frame::Frame;
use crate::math::Vector;

/// Below this per-frame tip travel the motion counts as stalled (mm).
const MIN_STEP: f32 = 0.2;
/// Below this per-frame direction turn the path counts as straight (rad).
const MIN_TURN: f32 = 0.01;

#[derive(Debug, Clone)]
struct Track {
    hand_id: i32,
    gesture_id: i32, // -1 until Start was emitted
    start_timestamp: i64,
    last_position: Vector,
    last_dir: Vector, // zero until a travel direction is known
    normal_acc: Vector,
    swept: f32,
    radius_acc: f32,
    samples: u32,
    center_acc: Vector,
}

impl Track {
    fn new(hand_id: i32, timestamp: i64, position: Vector, velocity: Vector) -> Self {
        let last_dir = if velocity.magnitude_squared() > 0.0 {
            velocity.normalized()
        } else {
            Vector::ZERO
        };
        Self {
            hand_id,
            gesture_id: -1,
            start_timestamp: timestamp,
            last_position: position,
            last_dir,
            normal_acc: Vector::ZERO,
            swept: 0.0,
            radius_acc: 0.0,
            samples: 0,
            center_acc: Vector::ZERO,
        }
    }

    fn started(&self) -> bool {
        self.gesture_id >= 0
    }

    fn progress(&self) -> f32 {
        self.swept / std::f32::consts::TAU
    }

    fn radius(&self) -> f32 {
        if self.samples == 0 {
            0.0
        } else {
            self.radius_acc / self.samples as f32
        }
    }

    fn center(&self) -> Vector {
        if self.samples == 0 {
            Vector::ZERO
        } else {
            self.center_acc / self.samples as f32
        }
    }

    fn normal(&self) -> Vector {
        if self.normal_acc.magnitude_squared() > 0.0 {
            self.normal_acc.normalized()
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
            kind: GestureKind::Circle {
                center: self.center(),
                normal: self.normal(),
                radius: self.radius(),
                progress: self.progress(),
                pointable_id,
            },
        }
    }
}

#[derive(Default)]
pub struct CircleMachine {
    tracks: HashMap<i32, Track>,
}

impl CircleMachine {
    fn advance(
        track: &mut Track,
        position: Vector,
        cfg: &GestureConfig,
    ) -> Step {
        let d = position - track.last_position;
        let dist = d.magnitude();
        if dist < MIN_STEP {
            return if track.started() { Step::Break } else { Step::Idle };
        }
        let dir = d / dist;
        if track.last_dir == Vector::ZERO {
            track.last_position = position;
            track.last_dir = dir;
            return Step::Idle;
        }

        let turn = track.last_dir.angle_to(dir);
        if turn < MIN_TURN {
            // straight travel
            track.last_position = position;
            track.last_dir = dir;
            return if track.started() { Step::Break } else { Step::Idle };
        }
        let axis = track.last_dir.cross(dir);
        if track.normal_acc.magnitude_squared() > 0.0 && axis.dot(track.normal_acc) < 0.0 {
            // turn direction reversed
            return Step::Break;
        }

        track.normal_acc = track.normal_acc + axis.normalized();
        track.swept += turn;
        let radius = dist / (2.0 * (turn / 2.0).sin());
        track.radius_acc += radius;
        track.samples += 1;
        // inward radial: dir x normal points from the path toward the center
        let center = position - dir.cross(track.normal()) * radius;
        track.center_acc = track.center_acc + center;

        track.last_position = position;
        track.last_dir = dir;

        if track.started() {
            Step::Update
        } else if track.swept >= cfg.circle_min_arc && track.radius() >= cfg.circle_min_radius {
            Step::Start
        } else {
            Step::Idle
        }
    }
}

enum Step {
    Idle,
    Start,
    Update,
    Break,
}

impl Recognize for CircleMachine {
    fn gesture_type(&self) -> GestureType {
        GestureType::Circle
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
                let track = self
                    .tracks
                    .entry(p.id)
                    .or_insert_with(|| {
                        Track::new(hand.id, frame.timestamp, p.tip_position, p.tip_velocity)
                    });
                track.hand_id = hand.id;
                match Self::advance(track, p.tip_position, cfg) {
                    Step::Idle => {}
                    Step::Start => {
                        track.gesture_id = ids.next();
                        out.push(track.snapshot(p.id, GestureState::Start, frame.timestamp));
                    }
                    Step::Update => {
                        out.push(track.snapshot(p.id, GestureState::Update, frame.timestamp));
                    }
                    Step::Break => {
                        if track.started() {
                            out.push(track.snapshot(p.id, GestureState::Stop, frame.timestamp));
                        }
                        // restart from the current sample
                        *track = Track::new(hand.id, frame.timestamp, p.tip_position, p.tip_velocity);
                    }
                }
            }
        }

        // pointables that vanished terminate their in-progress circles
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

    fn lenient() -> GestureConfig {
        GestureConfig {
            circle_min_arc: 0.05,
            circle_min_radius: 5.0,
            ..GestureConfig::default()
        }
    }

    #[test]
    fn circle_lifecycle_start_updates_stop() {
        let n = 48;
        let frames = synth::circle_frames(n); // n on-circle frames + one halt frame
        let mut machine = CircleMachine::default();
        let cfg = lenient();
        let mut ids = GestureIds::default();

        let mut snapshots = Vec::new();
        for f in &frames {
            machine.ingest(f, &cfg, &mut ids, &mut snapshots);
        }

        let starts = snapshots.iter().filter(|g| g.state == GestureState::Start).count();
        let updates = snapshots.iter().filter(|g| g.state == GestureState::Update).count();
        let stops = snapshots.iter().filter(|g| g.state == GestureState::Stop).count();
        assert_eq!(starts, 1);
        assert_eq!(updates, n - 2);
        assert_eq!(stops, 1);

        let id = snapshots[0].id;
        assert!(snapshots.iter().all(|g| g.id == id));

        let mut last = -1.0f32;
        for g in &snapshots {
            let GestureKind::Circle { progress, .. } = &g.kind else {
                panic!("non-circle snapshot");
            };
            assert!(*progress >= last);
            last = *progress;
        }
    }

    #[test]
    fn fitted_geometry_approximates_the_trajectory() {
        let frames = synth::circle_frames(64);
        let mut machine = CircleMachine::default();
        let cfg = lenient();
        let mut ids = GestureIds::default();
        let mut snapshots = Vec::new();
        for f in &frames {
            machine.ingest(f, &cfg, &mut ids, &mut snapshots);
        }
        let GestureKind::Circle { radius, center, progress, .. } =
            snapshots.last().unwrap().kind.clone()
        else {
            panic!("non-circle snapshot");
        };
        // synth circle: radius 20mm centered on (0, 150, -50)
        assert!((radius - 20.0).abs() < 2.0, "radius {radius}");
        assert!(center.distance_to(crate::math::Vector::new(0.0, 150.0, -50.0)) < 5.0);
        assert!(progress > 0.8);
    }

    #[test]
    fn straight_motion_never_starts_a_circle() {
        let mut machine = CircleMachine::default();
        let cfg = lenient();
        let mut ids = GestureIds::default();
        let mut snapshots = Vec::new();
        for f in synth::swipe_frames(40) {
            machine.ingest(&f, &cfg, &mut ids, &mut snapshots);
        }
        assert!(snapshots.is_empty());
    }
}
