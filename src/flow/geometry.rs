// src/flow/geometry.rs
//! Points, rectangles and projective 2D transforms.

use std::ops::Mul;

/// Distance of the virtual camera from the view plane used by out-of-plane rotations.
const CAMERA_DISTANCE: f32 = 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointF {
    pub x: f32,
    pub y: f32,
}

impl PointF {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Linear interpolation towards `other`.
    pub fn lerp(self, other: PointF, t: f32) -> PointF {
        PointF::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RectF {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl RectF {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> PointF {
        PointF::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn contains(&self, p: PointF) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }

    pub fn translated(&self, dx: f32, dy: f32) -> RectF {
        RectF::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Rectangle of `size` placed inside `self`, bottom aligned and horizontally centred.
    pub fn align_bottom_center(&self, width: f32, height: f32) -> RectF {
        RectF::new(
            self.x + (self.width - width) / 2.0,
            self.bottom() - height,
            width,
            height,
        )
    }

    /// Rectangle of `size` placed inside `self`, top aligned and horizontally centred.
    pub fn align_top_center(&self, width: f32, height: f32) -> RectF {
        RectF::new(self.x + (self.width - width) / 2.0, self.y, width, height)
    }
}

/// Rotation axis for [`Transform::rotate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// A 3x3 projective transform acting on column vectors `(x, y, 1)`.
///
/// Builder calls compose the way a painter's transform does: every call is
/// applied to points *before* the ones already recorded, so
/// `Transform::IDENTITY.translate(..).rotate(..)` rotates first and
/// translates second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    m: [[f32; 3]; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    pub fn translation(dx: f32, dy: f32) -> Self {
        Transform {
            m: [[1.0, 0.0, dx], [0.0, 1.0, dy], [0.0, 0.0, 1.0]],
        }
    }

    pub fn scaling(sx: f32, sy: f32) -> Self {
        Transform {
            m: [[sx, 0.0, 0.0], [0.0, sy, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// Rotation by `degrees` out of the view plane, projected with a fixed camera distance.
    pub fn rotation(degrees: f32, axis: Axis) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        let persp = -sin / CAMERA_DISTANCE;
        match axis {
            Axis::Y => Transform {
                m: [[cos, 0.0, 0.0], [0.0, 1.0, 0.0], [persp, 0.0, 1.0]],
            },
            Axis::X => Transform {
                m: [[1.0, 0.0, 0.0], [0.0, cos, 0.0], [0.0, persp, 1.0]],
            },
        }
    }

    pub fn translate(self, dx: f32, dy: f32) -> Self {
        self * Transform::translation(dx, dy)
    }

    pub fn scale(self, sx: f32, sy: f32) -> Self {
        self * Transform::scaling(sx, sy)
    }

    pub fn rotate(self, degrees: f32, axis: Axis) -> Self {
        self * Transform::rotation(degrees, axis)
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// True when the transform does more than translate, i.e. pixels are resampled.
    pub fn is_scaling(&self) -> bool {
        let m = &self.m;
        m[0][0] != 1.0
            || m[1][1] != 1.0
            || m[0][1] != 0.0
            || m[1][0] != 0.0
            || m[2][0] != 0.0
            || m[2][1] != 0.0
            || m[2][2] != 1.0
    }

    /// Map a point, dividing by the homogeneous coordinate.
    pub fn map(&self, p: PointF) -> PointF {
        let m = &self.m;
        let x = m[0][0] * p.x + m[0][1] * p.y + m[0][2];
        let y = m[1][0] * p.x + m[1][1] * p.y + m[1][2];
        let mut w = m[2][0] * p.x + m[2][1] * p.y + m[2][2];
        if w.abs() < f32::EPSILON {
            w = f32::EPSILON.copysign(w);
        }
        PointF::new(x / w, y / w)
    }

    /// Bounding rectangle of the mapped corners of `rect`.
    pub fn map_rect(&self, rect: &RectF) -> RectF {
        let corners = [
            self.map(PointF::new(rect.x, rect.y)),
            self.map(PointF::new(rect.right(), rect.y)),
            self.map(PointF::new(rect.x, rect.bottom())),
            self.map(PointF::new(rect.right(), rect.bottom())),
        ];
        let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
        let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
        for c in corners {
            min_x = min_x.min(c.x);
            min_y = min_y.min(c.y);
            max_x = max_x.max(c.x);
            max_y = max_y.max(c.y);
        }
        RectF::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    pub fn inverted(&self) -> Option<Transform> {
        let m = &self.m;
        let c00 = m[1][1] * m[2][2] - m[1][2] * m[2][1];
        let c01 = m[1][2] * m[2][0] - m[1][0] * m[2][2];
        let c02 = m[1][0] * m[2][1] - m[1][1] * m[2][0];
        let det = m[0][0] * c00 + m[0][1] * c01 + m[0][2] * c02;
        if det.abs() < 1e-12 {
            return None;
        }
        let inv = 1.0 / det;
        Some(Transform {
            m: [
                [
                    c00 * inv,
                    (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv,
                    (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv,
                ],
                [
                    c01 * inv,
                    (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv,
                    (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv,
                ],
                [
                    c02 * inv,
                    (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv,
                    (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv,
                ],
            ],
        })
    }
}

impl Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Transform {
        let mut m = [[0.0f32; 3]; 3];
        for (r, row) in m.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self.m[r][k] * rhs.m[k][c]).sum();
            }
        }
        Transform { m }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: PointF, b: PointF) -> bool {
        (a.x - b.x).abs() < 1e-3 && (a.y - b.y).abs() < 1e-3
    }

    #[test]
    fn later_calls_apply_first() {
        // scale first, then translate
        let t = Transform::IDENTITY.translate(10.0, 0.0).scale(2.0, 2.0);
        assert!(close(t.map(PointF::new(1.0, 1.0)), PointF::new(12.0, 2.0)));
    }

    #[test]
    fn rotation_about_y_keeps_pivot_column_fixed() {
        let t = Transform::IDENTITY
            .translate(129.0, 0.0)
            .rotate(66.0, Axis::Y)
            .translate(-129.0, 0.0);
        let p = t.map(PointF::new(129.0, 40.0));
        assert!(close(p, PointF::new(129.0, 40.0)));
        // the far edge is foreshortened towards the pivot
        let edge = t.map(PointF::new(258.0, 40.0));
        assert!(edge.x < 258.0 && edge.x > 129.0);
    }

    #[test]
    fn inverse_round_trips_projective_points() {
        let t = Transform::IDENTITY
            .translate(300.0, 20.0)
            .rotate(-40.0, Axis::Y)
            .scale(0.8, 0.8);
        let inv = t.inverted().unwrap();
        let p = PointF::new(57.0, 91.0);
        assert!(close(inv.map(t.map(p)), p));
    }

    #[test]
    fn translation_is_not_scaling() {
        assert!(!Transform::translation(4.0, 5.0).is_scaling());
        assert!(Transform::scaling(0.8, 0.8).is_scaling());
        assert!(Transform::rotation(10.0, Axis::Y).is_scaling());
    }

    #[test]
    fn singular_transform_has_no_inverse() {
        assert!(Transform::scaling(0.0, 1.0).inverted().is_none());
    }
}
