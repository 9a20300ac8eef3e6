//! 3D vector math and segment-distance queries for blade collision checks

use serde::{Deserialize, Serialize};

/// A point or direction in 3D space. Also the wire format for positions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn scale(self, k: f32) -> Self {
        Self::new(self.x * k, self.y * k, self.z * k)
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn distance(self, other: Self) -> f32 {
        self.sub(other).length()
    }

    /// Unit vector in the same direction; zero vector stays zero.
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len > f32::EPSILON {
            self.scale(1.0 / len)
        } else {
            Self::ZERO
        }
    }

    pub fn lerp(self, other: Self, t: f32) -> Self {
        self.add(other.sub(self).scale(t))
    }

    /// Rotate about the Y axis (yaw).
    pub fn rotate_y(self, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(
            self.x * cos + self.z * sin,
            self.y,
            -self.x * sin + self.z * cos,
        )
    }

    /// Rotate about the X axis (tilt).
    pub fn rotate_x(self, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(
            self.x,
            self.y * cos - self.z * sin,
            self.y * sin + self.z * cos,
        )
    }

    /// Rotate about the Z axis (swing).
    pub fn rotate_z(self, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(
            self.x * cos - self.y * sin,
            self.x * sin + self.y * cos,
            self.z,
        )
    }
}

/// Result of a closest-approach query between two segments.
#[derive(Debug, Clone, Copy)]
pub struct SegmentClosest {
    /// Minimum distance between the segments.
    pub distance: f32,
    /// Closest point on the first segment.
    pub on_first: Vec3,
    /// Closest point on the second segment.
    pub on_second: Vec3,
}

/// Closest approach between the finite segments [p1,p2] and [p3,p4].
///
/// Clamped-parametric form; zero-length segments collapse to point queries
/// via the guarded divisions.
pub fn closest_segment_distance(p1: Vec3, p2: Vec3, p3: Vec3, p4: Vec3) -> SegmentClosest {
    let d1 = p2.sub(p1);
    let d2 = p4.sub(p3);
    let r = p1.sub(p3);

    let a = d1.dot(d1);
    let e = d2.dot(d2);
    let f = d2.dot(r);
    let b = d1.dot(d2);
    let c = d1.dot(r);

    let denom = a * e - b * b;
    let mut s = if denom != 0.0 {
        ((b * f - c * e) / denom).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let mut t = if e != 0.0 { (b * s + f) / e } else { 0.0 };

    if t < 0.0 {
        t = 0.0;
        s = if a != 0.0 { (-c / a).clamp(0.0, 1.0) } else { 0.0 };
    } else if t > 1.0 {
        t = 1.0;
        s = if a != 0.0 {
            ((b - c) / a).clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    let on_first = p1.add(d1.scale(s));
    let on_second = p3.add(d2.scale(t));

    SegmentClosest {
        distance: on_first.distance(on_second),
        on_first,
        on_second,
    }
}

/// Distance from `pt` to the finite segment [a,b].
pub fn point_to_segment_distance(pt: Vec3, a: Vec3, b: Vec3) -> f32 {
    let seg = b.sub(a);
    let len = seg.length();
    if len <= f32::EPSILON {
        return pt.distance(a);
    }
    let dir = seg.scale(1.0 / len);
    let along = pt.sub(a).dot(dir).clamp(0.0, len);
    pt.distance(a.add(dir.scale(along)))
}
