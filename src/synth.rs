//! Synthetic frame streams: deterministic trajectories standing in for the
//! (out-of-scope) sensor capture layer. Used by the `simulate`/`run` CLI
//! commands and the test suite.
//!
//! All streams run at 100 fps (10 ms per frame), positions in mm.

use crate::entity::{Arm, FingerType, Hand, Pointable, PointableKind, TouchZone};
use crate::frame::Frame;
use crate::math::{Matrix, Vector};

pub const FRAME_INTERVAL_US: i64 = 10_000;
const BASE_TIMESTAMP: i64 = 1_000_000;
const FPS: f32 = 100.0;

pub fn make_finger(id: i32, kind: FingerType, tip: Vector, velocity: Vector) -> Pointable {
    Pointable {
        id,
        kind: PointableKind::Finger(kind),
        tip_position: tip,
        stabilized_tip_position: tip,
        tip_velocity: velocity,
        direction: Vector::FORWARD,
        length: 50.0,
        width: 15.0,
        is_extended: true,
        time_visible: 0.0,
        touch_zone: TouchZone::None,
        touch_distance: 1.0,
    }
}

pub fn make_hand(id: i32, palm: Vector, velocity: Vector, pointables: Vec<Pointable>) -> Hand {
    Hand {
        id,
        palm_position: palm,
        stabilized_palm_position: palm,
        palm_velocity: velocity,
        palm_normal: Vector::DOWN,
        palm_width: 85.0,
        direction: Vector::FORWARD,
        basis: Matrix::IDENTITY,
        arm: Arm {
            elbow_position: palm + Vector::new(0.0, -50.0, 250.0),
            wrist_position: palm + Vector::new(0.0, -10.0, 60.0),
            width: 60.0,
            basis: Matrix::IDENTITY,
        },
        pointables,
        confidence: 1.0,
        grab_strength: 0.0,
        pinch_strength: 0.0,
        is_left: false,
        time_visible: 0.0,
    }
}

fn frame_at(index: usize, hands: Vec<Hand>) -> Frame {
    Frame {
        id: index as i64,
        timestamp: BASE_TIMESTAMP + index as i64 * FRAME_INTERVAL_US,
        current_frames_per_second: FPS,
        hands,
        gestures: Vec::new(),
    }
}

/// Strip a synthetic frame down to the raw capture input a sensor
/// delivers (IDs in it are provisional).
pub fn data_from(frame: &Frame) -> crate::frame::FrameData {
    crate::frame::FrameData {
        timestamp: frame.timestamp,
        frames_per_second: frame.current_frames_per_second,
        hands: frame.hands.clone(),
    }
}

/// `n` frames of a motionless single-finger hand.
pub fn static_frames(n: usize) -> Vec<Frame> {
    (0..n)
        .map(|i| {
            let tip = Vector::new(0.0, 180.0, -80.0);
            let finger = make_finger(10, FingerType::Index, tip, Vector::ZERO);
            frame_at(i, vec![make_hand(1, Vector::new(0.0, 150.0, 0.0), Vector::ZERO, vec![finger])])
        })
        .collect()
}

/// One frame with two five-fingered hands, tips spread in all three axes.
/// Entity IDs: hands 1 and 2, fingers 10.. and 20...
pub fn two_hand_frame() -> Frame {
    let finger_kinds = [
        FingerType::Thumb,
        FingerType::Index,
        FingerType::Middle,
        FingerType::Ring,
        FingerType::Pinky,
    ];
    let mut hands = Vec::new();
    for (hand_id, base_id, palm_x) in [(1, 10, -100.0f32), (2, 20, 100.0f32)] {
        let palm = Vector::new(palm_x, 180.0, -20.0);
        let fingers = finger_kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| {
                let spread = (i as f32 - 2.0) * 18.0;
                let tip = palm + Vector::new(spread, 25.0 + 6.0 * i as f32, -70.0 + 4.0 * spread);
                make_finger(base_id + i as i32, *kind, tip, Vector::ZERO)
            })
            .collect();
        hands.push(make_hand(hand_id, palm, Vector::ZERO, fingers));
    }
    frame_at(0, hands)
}

fn all_points(frame: &Frame) -> Vec<Vector> {
    let mut pts = Vec::new();
    for h in &frame.hands {
        pts.push(h.palm_position);
        for p in &h.pointables {
            pts.push(p.tip_position);
        }
    }
    pts
}

fn centroid(frame: &Frame) -> Vector {
    let pts = all_points(frame);
    let n = pts.len().max(1) as f32;
    pts.into_iter().fold(Vector::ZERO, |a, b| a + b) / n
}

fn map_positions(frame: &Frame, f: impl Fn(Vector) -> Vector) -> Frame {
    let mut out = frame.clone();
    out.id += 1;
    out.timestamp += FRAME_INTERVAL_US;
    for h in &mut out.hands {
        h.palm_position = f(h.palm_position);
        h.stabilized_palm_position = f(h.stabilized_palm_position);
        h.arm.elbow_position = f(h.arm.elbow_position);
        h.arm.wrist_position = f(h.arm.wrist_position);
        for p in &mut h.pointables {
            p.tip_position = f(p.tip_position);
            p.stabilized_tip_position = f(p.stabilized_tip_position);
        }
    }
    out
}

/// The same frame one interval later, rigidly shifted by `offset`.
pub fn translated(frame: &Frame, offset: Vector) -> Frame {
    map_positions(frame, |p| p + offset)
}

/// The same frame one interval later, rotated about its own centroid.
pub fn rotated(frame: &Frame, axis: Vector, angle: f32) -> Frame {
    let c = centroid(frame);
    let rot = Matrix::from_axis_angle(axis, angle);
    map_positions(frame, |p| rot.transform_point(p - c) + c)
}

/// The same frame one interval later, uniformly scaled about its centroid.
pub fn scaled(frame: &Frame, factor: f32) -> Frame {
    let c = centroid(frame);
    map_positions(frame, |p| (p - c) * factor + c)
}

/// `n` frames of an index fingertip tracing a full circle (radius 20 mm,
/// centered on (0, 150, -50), in the x-y plane, counterclockwise around
/// +z), followed by one halting frame. The halt lets continuous
/// recognizers observe the motion ceasing.
pub fn circle_frames(n: usize) -> Vec<Frame> {
    const RADIUS: f32 = 20.0;
    let center = Vector::new(0.0, 150.0, -50.0);
    let step = std::f32::consts::TAU / n as f32;
    let dt = FRAME_INTERVAL_US as f32 / 1_000_000.0;

    let mut frames = Vec::with_capacity(n + 1);
    for i in 0..n {
        let theta = step * i as f32;
        let tip = center + Vector::new(theta.cos(), theta.sin(), 0.0) * RADIUS;
        // analytic tangent velocity of the circular path
        let speed = RADIUS * step / dt;
        let vel = Vector::new(-theta.sin(), theta.cos(), 0.0) * speed;
        let finger = make_finger(10, FingerType::Index, tip, vel);
        let palm = tip + Vector::new(0.0, -40.0, 60.0);
        frames.push(frame_at(i, vec![make_hand(1, palm, vel, vec![finger])]));
    }
    // halt: hold the final sample's position with zero velocity
    let theta = step * (n - 1) as f32;
    let last_tip = center + Vector::new(theta.cos(), theta.sin(), 0.0) * RADIUS;
    let finger = make_finger(10, FingerType::Index, last_tip, Vector::ZERO);
    let palm = last_tip + Vector::new(0.0, -40.0, 60.0);
    frames.push(frame_at(n, vec![make_hand(1, palm, Vector::ZERO, vec![finger])]));
    frames
}

/// `n` frames of a fingertip sweeping along +x at 800 mm/s, followed by
/// one halting frame.
pub fn swipe_frames(n: usize) -> Vec<Frame> {
    const SPEED: f32 = 800.0;
    let step = SPEED * (FRAME_INTERVAL_US as f32 / 1_000_000.0);
    let x0 = -(n as f32) * step / 2.0;

    let mut frames = Vec::with_capacity(n + 1);
    for i in 0..n {
        let tip = Vector::new(x0 + step * i as f32, 180.0, -80.0);
        let vel = Vector::new(SPEED, 0.0, 0.0);
        let finger = make_finger(10, FingerType::Index, tip, vel);
        frames.push(frame_at(i, vec![make_hand(1, tip + Vector::new(0.0, -40.0, 60.0), vel, vec![finger])]));
    }
    let tip = Vector::new(x0 + step * n as f32, 180.0, -80.0);
    let finger = make_finger(10, FingerType::Index, tip, Vector::ZERO);
    frames.push(frame_at(n, vec![make_hand(1, tip + Vector::new(0.0, -40.0, 60.0), Vector::ZERO, vec![finger])]));
    frames
}

fn tap_frames(thrust_dir: Vector, thrust_speed: f32) -> Vec<Frame> {
    let dt = FRAME_INTERVAL_US as f32 / 1_000_000.0;
    let start = Vector::new(0.0, 180.0, -80.0);
    let mut frames = Vec::new();
    let mut tip = start;
    let mut idx = 0usize;

    // settle, thrust, retreat
    for _ in 0..5 {
        frames.push(frame_at(idx, vec![make_hand(1, start + Vector::new(0.0, -40.0, 60.0), Vector::ZERO, vec![make_finger(10, FingerType::Index, tip, Vector::ZERO)])]));
        idx += 1;
    }
    for _ in 0..5 {
        tip = tip + thrust_dir * (thrust_speed * dt);
        let vel = thrust_dir * thrust_speed;
        frames.push(frame_at(idx, vec![make_hand(1, start + Vector::new(0.0, -40.0, 60.0), Vector::ZERO, vec![make_finger(10, FingerType::Index, tip, vel)])]));
        idx += 1;
    }
    for _ in 0..6 {
        tip = tip - thrust_dir * (thrust_speed * dt);
        let vel = thrust_dir * -thrust_speed;
        frames.push(frame_at(idx, vec![make_hand(1, start + Vector::new(0.0, -40.0, 60.0), Vector::ZERO, vec![make_finger(10, FingerType::Index, tip, vel)])]));
        idx += 1;
    }
    frames
}

/// A single key-tap: press straight down ~7.5 mm at 150 mm/s, then retreat.
pub fn key_tap_frames() -> Vec<Frame> {
    tap_frames(Vector::DOWN, 150.0)
}

/// A single screen-tap: poke forward ~10 mm at 200 mm/s, then retreat.
pub fn screen_tap_frames() -> Vec<Frame> {
    tap_frames(Vector::FORWARD, 200.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trajectories_are_well_formed() {
        let circle = circle_frames(32);
        assert_eq!(circle.len(), 33);
        assert!(circle.windows(2).all(|w| w[1].timestamp > w[0].timestamp));
        assert!(circle.iter().all(|f| f.hands[0].pointables[0].is_extended));

        let frame = two_hand_frame();
        assert_eq!(frame.hands.len(), 2);
        assert_eq!(frame.fingers().count(), 10);
    }

    #[test]
    fn circle_halt_frame_freezes_the_tip() {
        let frames = circle_frames(32);
        let held = &frames[32].hands[0].pointables[0];
        let last_moving = &frames[31].hands[0].pointables[0];
        // recognizers see the motion cease, not one more chord step
        assert_eq!(held.tip_position, last_moving.tip_position);
        assert_eq!(held.tip_velocity, Vector::ZERO);
    }

    #[test]
    fn transformed_copies_preserve_ids() {
        let base = two_hand_frame();
        let moved = translated(&base, Vector::new(1.0, 2.0, 3.0));
        assert_eq!(moved.hands[0].id, base.hands[0].id);
        assert_eq!(moved.id, base.id + 1);
        let spun = rotated(&base, Vector::Y_AXIS, 0.3);
        assert_eq!(spun.hands.len(), 2);
    }
}
