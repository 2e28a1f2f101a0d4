//! Gesture model and the per-type recognizer bank.
//!
//! One independent state machine per gesture type, driven in a fixed order
//! over the frame stream. A disabled type is skipped entirely, not filtered
//! after the fact.

mod circle;
mod swipe;
mod tap;

pub use circle::CircleMachine;
pub use swipe::SwipeMachine;
pub use tap::{TapAxis, TapMachine};

use crate::frame::Frame;
use crate::math::Vector;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GestureType {
    Circle,
    Swipe,
    ScreenTap,
    KeyTap,
}

/// Fixed dispatch order of the recognizer bank.
pub const GESTURE_TYPES: [GestureType; 4] = [
    GestureType::Circle,
    GestureType::Swipe,
    GestureType::ScreenTap,
    GestureType::KeyTap,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GestureState {
    Start,
    Update,
    Stop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GestureKind {
    Invalid,
    Circle {
        center: Vector,
        normal: Vector,
        radius: f32,
        /// Accumulated revolutions; exceeds 1.0 after a full turn.
        progress: f32,
        pointable_id: i32,
    },
    Swipe {
        start_position: Vector,
        position: Vector,
        direction: Vector,
        speed: f32,
        pointable_id: i32,
    },
    ScreenTap {
        position: Vector,
        direction: Vector,
        progress: f32,
        pointable_id: i32,
    },
    KeyTap {
        position: Vector,
        direction: Vector,
        progress: f32,
        pointable_id: i32,
    },
}

impl GestureKind {
    pub fn gesture_type(&self) -> Option<GestureType> {
        match self {
            GestureKind::Invalid => None,
            GestureKind::Circle { .. } => Some(GestureType::Circle),
            GestureKind::Swipe { .. } => Some(GestureType::Swipe),
            GestureKind::ScreenTap { .. } => Some(GestureType::ScreenTap),
            GestureKind::KeyTap { .. } => Some(GestureType::KeyTap),
        }
    }
}

/// One snapshot of a recognized movement. All snapshots of the same
/// physical movement share an `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gesture {
    pub id: i32,
    pub state: GestureState,
    /// Elapsed time since the movement began, microseconds.
    pub duration_us: i64,
    pub hand_ids: Vec<i32>,
    pub pointable_ids: Vec<i32>,
    pub kind: GestureKind,
}

impl Gesture {
    pub const INVALID: Gesture = Gesture {
        id: -1,
        state: GestureState::Stop,
        duration_us: 0,
        hand_ids: Vec::new(),
        pointable_ids: Vec::new(),
        kind: GestureKind::Invalid,
    };

    pub fn is_valid(&self) -> bool {
        self.id >= 0
    }

    pub fn duration_seconds(&self) -> f32 {
        self.duration_us as f32 / 1_000_000.0
    }
}

/// Recognition thresholds, externally injected (config keys in
/// [`crate::config::keys`]). Defaults match the sensor's documented values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureConfig {
    pub circle_min_radius: f32,
    pub circle_min_arc: f32,
    pub swipe_min_length: f32,
    pub swipe_min_velocity: f32,
    pub key_tap_min_down_velocity: f32,
    pub key_tap_min_distance: f32,
    pub key_tap_history_seconds: f32,
    pub screen_tap_min_forward_velocity: f32,
    pub screen_tap_min_distance: f32,
    pub screen_tap_history_seconds: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            circle_min_radius: 5.0,
            circle_min_arc: 1.5 * std::f32::consts::PI,
            swipe_min_length: 150.0,
            swipe_min_velocity: 1000.0,
            key_tap_min_down_velocity: 50.0,
            key_tap_min_distance: 3.0,
            key_tap_history_seconds: 0.1,
            screen_tap_min_forward_velocity: 50.0,
            screen_tap_min_distance: 5.0,
            screen_tap_history_seconds: 0.1,
        }
    }
}

/// Session-wide gesture ID source. An ID is handed out once and never
/// reused for an unrelated movement.
#[derive(Debug, Default)]
pub struct GestureIds {
    next: i32,
}

impl GestureIds {
    pub fn next(&mut self) -> i32 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// One gesture-type state machine consuming the ordered frame stream.
pub trait Recognize {
    fn gesture_type(&self) -> GestureType;

    /// Consume one frame, appending any snapshots produced for it.
    fn ingest(
        &mut self,
        frame: &Frame,
        cfg: &GestureConfig,
        ids: &mut GestureIds,
        out: &mut Vec<Gesture>,
    );

    /// Drop all in-progress hidden state (no Stop snapshots are emitted).
    fn reset(&mut self);
}

struct Slot {
    enabled: bool,
    machine: Box<dyn Recognize + Send>,
}

/// The bank of four machines plus shared config and the ID source.
pub struct RecognizerBank {
    slots: Vec<Slot>,
    cfg: GestureConfig,
    ids: GestureIds,
}

impl RecognizerBank {
    pub fn new(cfg: GestureConfig) -> Self {
        let machines: Vec<Box<dyn Recognize + Send>> = vec![
            Box::new(CircleMachine::default()),
            Box::new(SwipeMachine::default()),
            Box::new(TapMachine::new(TapAxis::Forward)),
            Box::new(TapMachine::new(TapAxis::Down)),
        ];
        Self {
            slots: machines
                .into_iter()
                .map(|machine| Slot {
                    enabled: false,
                    machine,
                })
                .collect(),
            cfg,
            ids: GestureIds::default(),
        }
    }

    pub fn set_config(&mut self, cfg: GestureConfig) {
        self.cfg = cfg;
    }

    pub fn config(&self) -> &GestureConfig {
        &self.cfg
    }

    /// Disabling a type drops its hidden state so a later re-enable
    /// starts clean.
    pub fn set_enabled(&mut self, ty: GestureType, enabled: bool) {
        for slot in &mut self.slots {
            if slot.machine.gesture_type() == ty {
                if slot.enabled && !enabled {
                    slot.machine.reset();
                }
                slot.enabled = enabled;
            }
        }
    }

    pub fn is_enabled(&self, ty: GestureType) -> bool {
        self.slots
            .iter()
            .any(|s| s.enabled && s.machine.gesture_type() == ty)
    }

    /// Run every enabled machine over `frame`, in fixed order, returning
    /// the snapshots to attach to that frame.
    pub fn ingest(&mut self, frame: &Frame) -> Vec<Gesture> {
        let mut out = Vec::new();
        for slot in &mut self.slots {
            if slot.enabled {
                slot.machine
                    .ingest(frame, &self.cfg, &mut self.ids, &mut out);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth;

    #[test]
    fn disabled_type_emits_nothing() {
        let mut bank = RecognizerBank::new(GestureConfig::default());
        // swipe stays disabled; feed it an unmistakable swipe
        for frame in synth::swipe_frames(40) {
            assert!(bank.ingest(&frame).is_empty());
        }
    }

    #[test]
    fn gesture_ids_are_never_reused() {
        let mut ids = GestureIds::default();
        let a = ids.next();
        let b = ids.next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn enable_toggle_resets_hidden_state() {
        let cfg = GestureConfig {
            swipe_min_length: 20.0,
            swipe_min_velocity: 500.0,
            ..GestureConfig::default()
        };
        let mut bank = RecognizerBank::new(cfg);
        bank.set_enabled(GestureType::Swipe, true);

        let frames = synth::swipe_frames(40);
        let half = frames.len() / 2;
        let mut before = Vec::new();
        for f in &frames[..half] {
            before.extend(bank.ingest(f));
        }
        assert!(!before.is_empty());

        // toggling off mid-gesture drops the in-progress track
        bank.set_enabled(GestureType::Swipe, false);
        bank.set_enabled(GestureType::Swipe, true);
        let mut after = Vec::new();
        for f in &frames[half..] {
            after.extend(bank.ingest(f));
        }
        // the continued motion reads as a brand-new movement
        assert_eq!(after[0].state, GestureState::Start);
        assert!(after.iter().all(|g| before.iter().all(|b| b.id != g.id)));
    }
}
