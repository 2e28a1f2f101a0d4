//! Geometric kernel: 3-vector and affine basis matrix.
//!
//! Units follow the sensor convention: millimeters for positions,
//! mm/s for velocities, radians for angles.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Neg, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector {
    pub const ZERO: Vector = Vector::new(0.0, 0.0, 0.0);
    pub const X_AXIS: Vector = Vector::new(1.0, 0.0, 0.0);
    pub const Y_AXIS: Vector = Vector::new(0.0, 1.0, 0.0);
    pub const Z_AXIS: Vector = Vector::new(0.0, 0.0, 1.0);
    pub const LEFT: Vector = Vector::new(-1.0, 0.0, 0.0);
    pub const RIGHT: Vector = Vector::X_AXIS;
    pub const DOWN: Vector = Vector::new(0.0, -1.0, 0.0);
    pub const UP: Vector = Vector::Y_AXIS;
    /// Toward the screen, away from the user.
    pub const FORWARD: Vector = Vector::new(0.0, 0.0, -1.0);
    pub const BACKWARD: Vector = Vector::Z_AXIS;

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(&self) -> f32 {
        self.magnitude_squared().sqrt()
    }

    pub fn magnitude_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    pub fn distance_to(&self, other: Vector) -> f32 {
        (*self - other).magnitude()
    }

    /// Unsigned angle to `other` in [0, pi]. Zero if either vector has
    /// zero length.
    pub fn angle_to(&self, other: Vector) -> f32 {
        let denom_sq = self.magnitude_squared() * other.magnitude_squared();
        if denom_sq <= 0.0 {
            return 0.0;
        }
        let cos = self.dot(other) / denom_sq.sqrt();
        cos.clamp(-1.0, 1.0).acos()
    }

    /// Angle above the x-z plane, rotation around the x-axis.
    pub fn pitch(&self) -> f32 {
        self.y.atan2(-self.z)
    }

    pub fn yaw(&self) -> f32 {
        self.x.atan2(-self.z)
    }

    pub fn roll(&self) -> f32 {
        self.x.atan2(-self.y)
    }

    pub fn dot(&self, other: Vector) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Right-hand rule: `a.cross(b) == -(b.cross(a))`.
    pub fn cross(&self, other: Vector) -> Vector {
        Vector::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Unit vector in the same direction. Produces NaN components for a
    /// zero-length input; guard with [`magnitude_squared`](Self::magnitude_squared)
    /// when the input is not known to be nonzero.
    pub fn normalized(&self) -> Vector {
        *self / self.magnitude()
    }

    pub fn opposite(&self) -> Vector {
        -*self
    }

    /// All components finite. Entity attributes read off an invalid
    /// sentinel fail this check instead of carrying a separate flag.
    pub fn is_valid(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn to_array(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

impl Add for Vector {
    type Output = Vector;
    fn add(self, rhs: Vector) -> Vector {
        Vector::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector {
    type Output = Vector;
    fn sub(self, rhs: Vector) -> Vector {
        Vector::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vector {
    type Output = Vector;
    fn mul(self, s: f32) -> Vector {
        Vector::new(self.x * s, self.y * s, self.z * s)
    }
}

impl Div<f32> for Vector {
    type Output = Vector;
    fn div(self, s: f32) -> Vector {
        Vector::new(self.x / s, self.y / s, self.z / s)
    }
}

impl Neg for Vector {
    type Output = Vector;
    fn neg(self) -> Vector {
        Vector::new(-self.x, -self.y, -self.z)
    }
}

impl Default for Vector {
    fn default() -> Self {
        Vector::ZERO
    }
}

/// Affine transform as three basis vectors plus an origin. Matrices
/// produced from sensor data carry an orthonormal (rigid) basis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub x_basis: Vector,
    pub y_basis: Vector,
    pub z_basis: Vector,
    pub origin: Vector,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        x_basis: Vector::X_AXIS,
        y_basis: Vector::Y_AXIS,
        z_basis: Vector::Z_AXIS,
        origin: Vector::ZERO,
    };

    pub const fn new(x_basis: Vector, y_basis: Vector, z_basis: Vector, origin: Vector) -> Self {
        Self {
            x_basis,
            y_basis,
            z_basis,
            origin,
        }
    }

    /// Rotation of `angle` radians about `axis` (Rodrigues form).
    /// `axis` need not be unit length; a zero axis yields the identity.
    pub fn from_axis_angle(axis: Vector, angle: f32) -> Matrix {
        if axis.magnitude_squared() <= 0.0 {
            return Matrix::IDENTITY;
        }
        let n = axis.normalized();
        let (s, c) = angle.sin_cos();
        let c1 = 1.0 - c;
        Matrix::new(
            Vector::new(
                c + n.x * n.x * c1,
                n.x * n.y * c1 + n.z * s,
                n.x * n.z * c1 - n.y * s,
            ),
            Vector::new(
                n.y * n.x * c1 - n.z * s,
                c + n.y * n.y * c1,
                n.y * n.z * c1 + n.x * s,
            ),
            Vector::new(
                n.z * n.x * c1 + n.y * s,
                n.z * n.y * c1 - n.x * s,
                c + n.z * n.z * c1,
            ),
            Vector::ZERO,
        )
    }

    pub fn from_axis_angle_translation(axis: Vector, angle: f32, translation: Vector) -> Matrix {
        let mut m = Matrix::from_axis_angle(axis, angle);
        m.origin = translation;
        m
    }

    /// Rotation/scale then translation.
    pub fn transform_point(&self, p: Vector) -> Vector {
        self.transform_direction(p) + self.origin
    }

    /// Rotation/scale only, no translation.
    pub fn transform_direction(&self, d: Vector) -> Vector {
        self.x_basis * d.x + self.y_basis * d.y + self.z_basis * d.z
    }

    /// Inverse under the rigid invariant: valid only when the basis is
    /// orthonormal (basis transpose, origin reversed through it).
    pub fn rigid_inverse(&self) -> Matrix {
        let x = Vector::new(self.x_basis.x, self.y_basis.x, self.z_basis.x);
        let y = Vector::new(self.x_basis.y, self.y_basis.y, self.z_basis.y);
        let z = Vector::new(self.x_basis.z, self.y_basis.z, self.z_basis.z);
        let inv = Matrix::new(x, y, z, Vector::ZERO);
        Matrix::new(x, y, z, inv.transform_direction(-self.origin))
    }

    /// Composition: `a.times(b)` applies `b` first, then `a`.
    pub fn times(&self, other: Matrix) -> Matrix {
        Matrix::new(
            self.transform_direction(other.x_basis),
            self.transform_direction(other.y_basis),
            self.transform_direction(other.z_basis),
            self.transform_point(other.origin),
        )
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    const EPS: f32 = 1e-5;

    fn close(a: Vector, b: Vector) -> bool {
        (a - b).magnitude() < 1e-4
    }

    #[test]
    fn angle_to_is_symmetric_and_bounded() {
        let a = Vector::new(1.0, 0.0, 0.0);
        let b = Vector::new(-1.0, 1.0, 0.5);
        assert!((a.angle_to(b) - b.angle_to(a)).abs() < EPS);
        assert!(a.angle_to(b) >= 0.0 && a.angle_to(b) <= PI);
        assert!((a.angle_to(a.opposite()) - PI).abs() < EPS);
    }

    #[test]
    fn angle_to_zero_vector_is_zero() {
        let a = Vector::new(3.0, 4.0, 0.0);
        assert_eq!(a.angle_to(Vector::ZERO), 0.0);
        assert_eq!(Vector::ZERO.angle_to(a), 0.0);
        assert_eq!(Vector::ZERO.angle_to(Vector::ZERO), 0.0);
    }

    #[test]
    fn cross_is_anticommutative() {
        let a = Vector::new(1.0, 2.0, 3.0);
        let b = Vector::new(-4.0, 0.5, 2.0);
        assert!(close(a.cross(b), b.cross(a).opposite()));
        assert!(close(Vector::X_AXIS.cross(Vector::Y_AXIS), Vector::Z_AXIS));
    }

    #[test]
    fn normalized_zero_is_invalid_not_a_panic() {
        let n = Vector::ZERO.normalized();
        assert!(!n.is_valid());
    }

    #[test]
    fn rotation_matrix_rotates_and_inverts() {
        let m = Matrix::from_axis_angle(Vector::Y_AXIS, FRAC_PI_2);
        assert!(close(m.transform_direction(Vector::X_AXIS), Vector::new(0.0, 0.0, -1.0)));

        let rt = Matrix::from_axis_angle_translation(
            Vector::Z_AXIS,
            FRAC_PI_2,
            Vector::new(10.0, 0.0, 0.0),
        );
        let p = Vector::new(1.0, 2.0, 3.0);
        assert!(close(rt.rigid_inverse().transform_point(rt.transform_point(p)), p));
    }

    #[test]
    fn times_applies_right_operand_first() {
        let rot = Matrix::from_axis_angle(Vector::Z_AXIS, FRAC_PI_2);
        let shift = Matrix::new(
            Vector::X_AXIS,
            Vector::Y_AXIS,
            Vector::Z_AXIS,
            Vector::new(1.0, 0.0, 0.0),
        );
        // shift then rotate: (0,0,0) -> (1,0,0) -> (0,1,0)
        let p = rot.times(shift).transform_point(Vector::ZERO);
        assert!(close(p, Vector::new(0.0, 1.0, 0.0)));
    }
}
