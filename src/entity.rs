//! Tracked-entity snapshots: hands, pointables (fingers/tools), bones, arms.
//!
//! Every type carries a shared `INVALID` sentinel with neutral attributes;
//! lookups that miss return the sentinel instead of an Option so call sites
//! can always read attributes safely.

use crate::math::{Matrix, Vector};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FingerType {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointableKind {
    Finger(FingerType),
    Tool,
}

/// Hover/touch classification relative to the virtual touch plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TouchZone {
    None,
    Hovering,
    Touching,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pointable {
    pub id: i32,
    pub kind: PointableKind,
    pub tip_position: Vector,
    pub stabilized_tip_position: Vector,
    pub tip_velocity: Vector,
    pub direction: Vector,
    pub length: f32,
    pub width: f32,
    pub is_extended: bool,
    pub time_visible: f32,
    pub touch_zone: TouchZone,
    pub touch_distance: f32,
}

impl Pointable {
    pub const INVALID: Pointable = Pointable {
        id: -1,
        kind: PointableKind::Tool,
        tip_position: Vector::ZERO,
        stabilized_tip_position: Vector::ZERO,
        tip_velocity: Vector::ZERO,
        direction: Vector::ZERO,
        length: 0.0,
        width: 0.0,
        is_extended: false,
        time_visible: 0.0,
        touch_zone: TouchZone::None,
        touch_distance: 1.0,
    };

    pub fn is_valid(&self) -> bool {
        self.id >= 0
    }

    pub fn is_finger(&self) -> bool {
        matches!(self.kind, PointableKind::Finger(_))
    }

    pub fn is_tool(&self) -> bool {
        self.kind == PointableKind::Tool
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoneType {
    Metacarpal,
    Proximal,
    Intermediate,
    Distal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bone {
    pub kind: BoneType,
    pub prev_joint: Vector,
    pub next_joint: Vector,
    pub width: f32,
    pub basis: Matrix,
}

impl Bone {
    pub const INVALID: Bone = Bone {
        kind: BoneType::Metacarpal,
        prev_joint: Vector::ZERO,
        next_joint: Vector::ZERO,
        width: 0.0,
        basis: Matrix::IDENTITY,
    };

    pub fn center(&self) -> Vector {
        (self.prev_joint + self.next_joint) / 2.0
    }

    pub fn length(&self) -> f32 {
        self.prev_joint.distance_to(self.next_joint)
    }

    /// Unit vector from the base joint toward the tip joint; zero for a
    /// degenerate (zero-length) bone.
    pub fn direction(&self) -> Vector {
        let d = self.next_joint - self.prev_joint;
        if d.magnitude_squared() <= 0.0 {
            Vector::ZERO
        } else {
            d.normalized()
        }
    }

    pub fn is_valid(&self) -> bool {
        self.length() > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arm {
    pub elbow_position: Vector,
    pub wrist_position: Vector,
    pub width: f32,
    pub basis: Matrix,
}

impl Arm {
    pub const INVALID: Arm = Arm {
        elbow_position: Vector::ZERO,
        wrist_position: Vector::ZERO,
        width: 0.0,
        basis: Matrix::IDENTITY,
    };

    pub fn center(&self) -> Vector {
        (self.elbow_position + self.wrist_position) / 2.0
    }

    pub fn direction(&self) -> Vector {
        let d = self.wrist_position - self.elbow_position;
        if d.magnitude_squared() <= 0.0 {
            Vector::ZERO
        } else {
            d.normalized()
        }
    }

    pub fn is_valid(&self) -> bool {
        self.elbow_position.distance_to(self.wrist_position) > 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hand {
    pub id: i32,
    pub palm_position: Vector,
    pub stabilized_palm_position: Vector,
    pub palm_velocity: Vector,
    pub palm_normal: Vector,
    pub palm_width: f32,
    pub direction: Vector,
    pub basis: Matrix,
    pub arm: Arm,
    pub pointables: Vec<Pointable>,
    pub confidence: f32,
    pub grab_strength: f32,
    pub pinch_strength: f32,
    pub is_left: bool,
    pub time_visible: f32,
}

impl Hand {
    pub const INVALID: Hand = Hand {
        id: -1,
        palm_position: Vector::ZERO,
        stabilized_palm_position: Vector::ZERO,
        palm_velocity: Vector::ZERO,
        palm_normal: Vector::ZERO,
        palm_width: 0.0,
        direction: Vector::ZERO,
        basis: Matrix::IDENTITY,
        arm: Arm::INVALID,
        pointables: Vec::new(),
        confidence: 0.0,
        grab_strength: 0.0,
        pinch_strength: 0.0,
        is_left: false,
        time_visible: 0.0,
    };

    pub fn is_valid(&self) -> bool {
        self.id >= 0
    }

    pub fn is_right(&self) -> bool {
        !self.is_left
    }

    pub fn wrist_position(&self) -> Vector {
        self.arm.wrist_position
    }

    pub fn pointable(&self, id: i32) -> &Pointable {
        self.pointables
            .iter()
            .find(|p| p.id == id)
            .unwrap_or(&Pointable::INVALID)
    }

    pub fn fingers(&self) -> impl Iterator<Item = &Pointable> {
        self.pointables.iter().filter(|p| p.is_finger())
    }

    pub fn tools(&self) -> impl Iterator<Item = &Pointable> {
        self.pointables.iter().filter(|p| p.is_tool())
    }

    /// The extended pointable reaching furthest toward the screen
    /// (most negative z); recognizers treat it as the pointing finger.
    pub fn frontmost_pointable(&self) -> &Pointable {
        self.pointables
            .iter()
            .filter(|p| p.is_extended)
            .min_by(|a, b| {
                a.tip_position
                    .z
                    .partial_cmp(&b.tip_position.z)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(&Pointable::INVALID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_sentinels_read_safely() {
        assert!(!Hand::INVALID.is_valid());
        assert!(!Pointable::INVALID.is_valid());
        assert!(!Bone::INVALID.is_valid());
        assert_eq!(Hand::INVALID.palm_position, Vector::ZERO);
        assert_eq!(Hand::INVALID.pointable(7).id, -1);
    }

    #[test]
    fn bone_geometry_derives_from_joints() {
        let b = Bone {
            kind: BoneType::Proximal,
            prev_joint: Vector::new(0.0, 0.0, 0.0),
            next_joint: Vector::new(0.0, 30.0, 0.0),
            width: 12.0,
            basis: Matrix::IDENTITY,
        };
        assert_eq!(b.length(), 30.0);
        assert_eq!(b.center(), Vector::new(0.0, 15.0, 0.0));
        assert_eq!(b.direction(), Vector::Y_AXIS);
        assert_eq!(Bone::INVALID.direction(), Vector::ZERO);
    }

    #[test]
    fn frontmost_pointable_prefers_extended_lowest_z() {
        let mut h = Hand::INVALID.clone();
        h.id = 1;
        let mut near = Pointable::INVALID;
        near.id = 10;
        near.is_extended = true;
        near.tip_position = Vector::new(0.0, 0.0, -50.0);
        let mut far = near;
        far.id = 11;
        far.tip_position = Vector::new(0.0, 0.0, -20.0);
        let mut folded = near;
        folded.id = 12;
        folded.is_extended = false;
        folded.tip_position = Vector::new(0.0, 0.0, -90.0);
        h.pointables = vec![far, near, folded];
        assert_eq!(h.frontmost_pointable().id, 10);
    }
}
