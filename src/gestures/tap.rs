//! Discrete tap recognizers: screen tap (forward-then-retreat) and key tap
//! (down-then-retreat). One machine parameterized by its thrust axis.
//!
//! Each pointable keeps a rolling window of recent samples spanning the
//! configured HistorySeconds. A tap fires on the first frame where, within
//! the window, the thrust speed peaked above the minimum, the tip
//! penetrated at least the minimum distance along the axis, and the motion
//! has turned back. A fired detector re-arms only after the window holds
//! nothing but calm samples, so one physical tap cannot double-fire.

use std::collections::{HashMap, VecDeque};

use super::{Gesture, GestureConfig, GestureIds, GestureKind, GestureState, GestureType, Recognize};
use crate::frame::Frame;
use crate::math::Vector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapAxis {
    /// Toward the screen (-z): screen tap.
    Forward,
    /// Toward the floor (-y): key tap.
    Down,
}

impl TapAxis {
    fn direction(self) -> Vector {
        match self {
            TapAxis::Forward => Vector::FORWARD,
            TapAxis::Down => Vector::DOWN,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    timestamp: i64,
    position: Vector,
    /// Velocity component along the thrust axis (positive = thrusting).
    thrust: f32,
    /// Position component along the thrust axis (higher = deeper).
    depth: f32,
}

#[derive(Debug, Clone)]
struct Track {
    hand_id: i32,
    window: VecDeque<Sample>,
    armed: bool,
}

pub struct TapMachine {
    axis: TapAxis,
    tracks: HashMap<i32, Track>,
}

impl TapMachine {
    pub fn new(axis: TapAxis) -> Self {
        Self {
            axis,
            tracks: HashMap::new(),
        }
    }

    fn params(&self, cfg: &GestureConfig) -> (f32, f32, f32) {
        match self.axis {
            TapAxis::Forward => (
                cfg.screen_tap_min_forward_velocity,
                cfg.screen_tap_min_distance,
                cfg.screen_tap_history_seconds,
            ),
            TapAxis::Down => (
                cfg.key_tap_min_down_velocity,
                cfg.key_tap_min_distance,
                cfg.key_tap_history_seconds,
            ),
        }
    }
}

impl Recognize for TapMachine {
    fn gesture_type(&self) -> GestureType {
        match self.axis {
            TapAxis::Forward => GestureType::ScreenTap,
            TapAxis::Down => GestureType::KeyTap,
        }
    }

    fn ingest(
        &mut self,
        frame: &Frame,
        cfg: &GestureConfig,
        ids: &mut GestureIds,
        out: &mut Vec<Gesture>,
    ) {
        let (min_velocity, min_distance, history_seconds) = self.params(cfg);
        let window_us = (history_seconds * 1_000_000.0) as i64;
        let axis_dir = self.axis.direction();
        let gesture_type = self.gesture_type();

        let mut seen: Vec<i32> = Vec::new();
        for hand in &frame.hands {
            for p in hand.pointables.iter().filter(|p| p.is_extended) {
                seen.push(p.id);
                let track = self.tracks.entry(p.id).or_insert_with(|| Track {
                    hand_id: hand.id,
                    window: VecDeque::new(),
                    armed: true,
                });
                track.hand_id = hand.id;

                track.window.push_back(Sample {
                    timestamp: frame.timestamp,
                    position: p.tip_position,
                    thrust: p.tip_velocity.dot(axis_dir),
                    depth: p.tip_position.dot(axis_dir),
                });
                while track
                    .window
                    .front()
                    .is_some_and(|s| frame.timestamp - s.timestamp > window_us)
                {
                    track.window.pop_front();
                }

                if !track.armed {
                    // re-arm once the whole window is calm
                    if track.window.iter().all(|s| s.thrust.abs() < min_velocity * 0.5) {
                        track.armed = true;
                    }
                    continue;
                }

                let Some(first) = track.window.front().copied() else {
                    continue;
                };
                let Some(peak) = track
                    .window
                    .iter()
                    .copied()
                    .max_by(|a, b| a.depth.total_cmp(&b.depth))
                else {
                    continue;
                };
                let thrust_peak = track.window.iter().map(|s| s.thrust).fold(f32::MIN, f32::max);
                let retreating = p.tip_velocity.dot(axis_dir) <= 0.0;

                if retreating
                    && thrust_peak >= min_velocity
                    && peak.depth - first.depth >= min_distance
                {
                    let kind = match gesture_type {
                        GestureType::ScreenTap => GestureKind::ScreenTap {
                            position: peak.position,
                            direction: axis_dir,
                            progress: 1.0,
                            pointable_id: p.id,
                        },
                        _ => GestureKind::KeyTap {
                            position: peak.position,
                            direction: axis_dir,
                            progress: 1.0,
                            pointable_id: p.id,
                        },
                    };
                    out.push(Gesture {
                        id: ids.next(),
                        state: GestureState::Stop,
                        duration_us: frame.timestamp - first.timestamp,
                        hand_ids: vec![hand.id],
                        pointable_ids: vec![p.id],
                        kind,
                    });
                    track.armed = false;
                }
            }
        }

        self.tracks.retain(|id, _| seen.contains(id));
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
    fn single_key_tap_fires_exactly_once() {
        let mut machine = TapMachine::new(TapAxis::Down);
        let cfg = GestureConfig::default();
        let mut ids = GestureIds::default();
        let mut snapshots = Vec::new();
        for f in synth::key_tap_frames() {
            machine.ingest(&f, &cfg, &mut ids, &mut snapshots);
        }
        assert_eq!(snapshots.len(), 1);
        let g = &snapshots[0];
        assert_eq!(g.state, GestureState::Stop);
        let GestureKind::KeyTap { progress, direction, .. } = &g.kind else {
            panic!("expected key tap");
        };
        assert_eq!(*progress, 1.0);
        assert_eq!(*direction, Vector::DOWN);
    }

    #[test]
    fn single_screen_tap_fires_exactly_once() {
        let mut machine = TapMachine::new(TapAxis::Forward);
        let cfg = GestureConfig::default();
        let mut ids = GestureIds::default();
        let mut snapshots = Vec::new();
        for f in synth::screen_tap_frames() {
            machine.ingest(&f, &cfg, &mut ids, &mut snapshots);
        }
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].state, GestureState::Stop);
        let GestureKind::ScreenTap { progress, .. } = &snapshots[0].kind else {
            panic!("expected screen tap");
        };
        assert_eq!(*progress, 1.0);
    }

    #[test]
    fn shallow_prod_stays_silent() {
        let mut machine = TapMachine::new(TapAxis::Down);
        // demand a much deeper press than the synthetic tap delivers
        let cfg = GestureConfig {
            key_tap_min_distance: 50.0,
            ..GestureConfig::default()
        };
        let mut ids = GestureIds::default();
        let mut snapshots = Vec::new();
        for f in synth::key_tap_frames() {
            machine.ingest(&f, &cfg, &mut ids, &mut snapshots);
        }
        assert!(snapshots.is_empty());
    }
}
