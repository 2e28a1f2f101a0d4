//! Rigid-motion estimator: decomposes the net change between two frame
//! snapshots into translation, axis-angle rotation and uniform scale, with
//! an independent confidence per category.
//!
//! Correspondences are tracked points matched by entity ID (palm position
//! plus every pointable tip present in both frames). Translation is the
//! centroid shift; scale the RMS-deviation ratio; rotation is recovered in
//! closed form from the mean cross/dot products of the unit deviations,
//! avoiding a linear-algebra dependency. Each confidence is the clamped
//! fraction of raw displacement variance that its category explains on its
//! own.

use crate::entity::Hand;
use crate::frame::Frame;
use crate::math::{Matrix, Vector};

/// Variance floor (mm^2) below which motion counts as absent.
const EPS: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionEstimate {
    pub translation: Vector,
    /// Normalized rotation axis; zero when no rotation was observed.
    pub rotation_axis: Vector,
    /// Unsigned angle in [0, pi].
    pub rotation_angle: f32,
    /// Uniform scale factor, always > 0.
    pub scale_factor: f32,
    pub translation_probability: f32,
    pub rotation_probability: f32,
    pub scale_probability: f32,
}

impl MotionEstimate {
    /// Output for degenerate input: no correspondences, or either frame
    /// invalid.
    pub const NEUTRAL: MotionEstimate = MotionEstimate {
        translation: Vector::ZERO,
        rotation_axis: Vector::ZERO,
        rotation_angle: 0.0,
        scale_factor: 1.0,
        translation_probability: 0.0,
        rotation_probability: 0.0,
        scale_probability: 0.0,
    };

    /// Aggregate motion mapping tracked points of `older` onto `newer`.
    pub fn between(older: &Frame, newer: &Frame) -> MotionEstimate {
        if !older.is_valid() || !newer.is_valid() {
            return MotionEstimate::NEUTRAL;
        }
        let mut pairs = Vec::new();
        for new_hand in &newer.hands {
            let old_hand = older.hand(new_hand.id);
            if old_hand.is_valid() {
                collect_hand_pairs(old_hand, new_hand, &mut pairs);
            }
        }
        Self::from_pairs(&pairs)
    }

    /// Motion of a single hand between two of its snapshots.
    pub fn between_hands(older: &Hand, newer: &Hand) -> MotionEstimate {
        if !older.is_valid() || !newer.is_valid() {
            return MotionEstimate::NEUTRAL;
        }
        let mut pairs = Vec::new();
        collect_hand_pairs(older, newer, &mut pairs);
        Self::from_pairs(&pairs)
    }

    /// Signed angle around `axis` in [-pi, pi]: the unsigned angle, negated
    /// when the fitted axis points away from `axis`.
    pub fn rotation_angle_around(&self, axis: Vector) -> f32 {
        if self.rotation_axis.dot(axis) < 0.0 {
            -self.rotation_angle
        } else {
            self.rotation_angle
        }
    }

    fn from_pairs(pairs: &[(Vector, Vector)]) -> MotionEstimate {
        if pairs.is_empty() {
            return MotionEstimate::NEUTRAL;
        }
        let n = pairs.len() as f32;

        let mut c_old = Vector::ZERO;
        let mut c_new = Vector::ZERO;
        for (p, q) in pairs {
            c_old = c_old + *p;
            c_new = c_new + *q;
        }
        c_old = c_old / n;
        c_new = c_new / n;
        let translation = c_new - c_old;

        // uniform scale from the RMS deviation ratio
        let mut dev_old_sq = 0.0;
        let mut dev_new_sq = 0.0;
        for (p, q) in pairs {
            dev_old_sq += (*p - c_old).magnitude_squared();
            dev_new_sq += (*q - c_new).magnitude_squared();
        }
        let scale_factor = if dev_old_sq > EPS && dev_new_sq > EPS {
            (dev_new_sq / dev_old_sq).sqrt()
        } else {
            1.0
        };

        // rotation, two passes: axis from the accumulated cross products of
        // the unit deviations, then the angle from deviations projected into
        // the plane perpendicular to that axis (unbiased for points with a
        // component along the axis)
        let mut axis_acc = Vector::ZERO;
        for (p, q) in pairs {
            let u = *p - c_old;
            let v = *q - c_new;
            if u.magnitude_squared() > EPS && v.magnitude_squared() > EPS {
                axis_acc = axis_acc + u.normalized().cross(v.normalized());
            }
        }
        let (rotation_axis, rotation_angle) = if axis_acc.magnitude_squared() <= EPS * EPS {
            (Vector::ZERO, 0.0)
        } else {
            let axis = axis_acc.normalized();
            let mut sin_acc = 0.0;
            let mut cos_acc = 0.0;
            let mut samples = 0u32;
            for (p, q) in pairs {
                let u = *p - c_old;
                let v = *q - c_new;
                let u_perp = u - axis * u.dot(axis);
                let v_perp = v - axis * v.dot(axis);
                if u_perp.magnitude_squared() > EPS && v_perp.magnitude_squared() > EPS {
                    let u_perp = u_perp.normalized();
                    let v_perp = v_perp.normalized();
                    sin_acc += axis.dot(u_perp.cross(v_perp));
                    cos_acc += u_perp.dot(v_perp);
                    samples += 1;
                }
            }
            if samples == 0 {
                (Vector::ZERO, 0.0)
            } else {
                let m = samples as f32;
                (axis, (sin_acc / m).atan2(cos_acc / m).abs())
            }
        };

        // confidence: explained share of the raw displacement variance
        let raw: f32 = pairs
            .iter()
            .map(|(p, q)| (*q - *p).magnitude_squared())
            .sum::<f32>()
            / n;
        if raw < EPS {
            // no net motion: every category fully explains it
            return MotionEstimate {
                translation,
                rotation_axis,
                rotation_angle,
                scale_factor,
                translation_probability: 1.0,
                rotation_probability: 1.0,
                scale_probability: 1.0,
            };
        }

        let rot = Matrix::from_axis_angle(rotation_axis, rotation_angle);
        let mut res_translation = 0.0;
        let mut centered = 0.0;
        let mut res_rotation = 0.0;
        let mut res_scale = 0.0;
        for (p, q) in pairs {
            let u = *p - c_old;
            let v = *q - c_new;
            res_translation += (*q - *p - translation).magnitude_squared();
            centered += (v - u).magnitude_squared();
            res_rotation += (v - rot.transform_direction(u)).magnitude_squared();
            res_scale += (v - u * scale_factor).magnitude_squared();
        }
        res_translation /= n;
        centered /= n;
        res_rotation /= n;
        res_scale /= n;

        MotionEstimate {
            translation,
            rotation_axis,
            rotation_angle,
            scale_factor,
            translation_probability: ((raw - res_translation) / raw).clamp(0.0, 1.0),
            rotation_probability: ((centered - res_rotation) / raw).clamp(0.0, 1.0),
            scale_probability: ((centered - res_scale) / raw).clamp(0.0, 1.0),
        }
    }
}

fn collect_hand_pairs(older: &Hand, newer: &Hand, pairs: &mut Vec<(Vector, Vector)>) {
    pairs.push((older.palm_position, newer.palm_position));
    for p in &newer.pointables {
        let old_p = older.pointable(p.id);
        if old_p.is_valid() {
            pairs.push((old_p.tip_position, p.tip_position));
        }
    }
}
