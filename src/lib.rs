//! palmtrack: skeletal hand-tracking core.
//!
//! Ingests completed 3D tracking frames from a capture producer and
//! exposes them as a queryable, identity-stable object graph: a bounded
//! frame history with cross-frame ID continuity, an on-demand rigid
//! motion estimator, and a bank of gesture state machines (circle, swipe,
//! screen tap, key tap).

pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod frame;
pub mod gestures;
pub mod history;
pub mod logging;
pub mod math;
pub mod motion;
pub mod session;
pub mod synth;

pub use config::{ConfigStore, ValueType};
pub use entity::{Arm, Bone, BoneType, FingerType, Hand, Pointable, PointableKind, TouchZone};
pub use error::{Error, Result};
pub use frame::{Frame, FrameData};
pub use gestures::{
    Gesture, GestureConfig, GestureKind, GestureState, GestureType, RecognizerBank,
};
pub use history::{FrameHistory, HISTORY_DEPTH, IdentityMatcher, NearestNeighborMatcher};
pub use math::{Matrix, Vector};
pub use motion::MotionEstimate;
pub use session::{PolicyFlags, Session, SessionEvent};
