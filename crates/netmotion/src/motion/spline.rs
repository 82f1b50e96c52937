use glam::{BVec3, Vec3};
use serde::{Deserialize, Serialize};

use crate::codec::NetworkMovementMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SplineType {
    Linear,
    Hermite,
    #[default]
    MonotoneYHermite,
    FullMonotonicHermite,
    Bezier,
    VelocityBlending,
    PositionBlending,
}

impl SplineType {
    pub const ALL: [SplineType; 7] = [
        Self::Linear,
        Self::Hermite,
        Self::MonotoneYHermite,
        Self::FullMonotonicHermite,
        Self::Bezier,
        Self::VelocityBlending,
        Self::PositionBlending,
    ];

    /// Position on the curve from `start` to `end` after `t` of
    /// `total_duration` seconds.
    pub fn evaluate(
        self,
        start: &NetworkMovementMessage,
        end: &NetworkMovementMessage,
        t: f32,
        total_duration: f32,
    ) -> Vec3 {
        let (p0, v0) = (start.position, start.velocity);
        let (p1, v1) = (end.position, end.velocity);

        match self {
            Self::Linear => linear(p0, p1, t, total_duration),
            Self::Hermite => hermite(p0, v0, p1, v1, t, total_duration),
            Self::MonotoneYHermite => {
                monotone_hermite(p0, v0, p1, v1, t, total_duration, BVec3::new(false, true, false))
            }
            Self::FullMonotonicHermite => {
                monotone_hermite(p0, v0, p1, v1, t, total_duration, BVec3::TRUE)
            }
            Self::Bezier => bezier(p0, v0, p1, v1, t, total_duration),
            Self::VelocityBlending => velocity_blending(p0, v0, p1, v1, t, total_duration),
            Self::PositionBlending => position_blending(p0, v0, p1, v1, t, total_duration),
        }
    }
}

#[inline]
fn progress(t: f32, total_duration: f32) -> f32 {
    if total_duration > 0.0 {
        (t / total_duration).clamp(0.0, 1.0)
    } else {
        1.0
    }
}

pub fn linear(p0: Vec3, p1: Vec3, t: f32, total_duration: f32) -> Vec3 {
    p0.lerp(p1, progress(t, total_duration))
}

/// Cubic Hermite with velocities as tangents. The basis weights are exactly
/// 0 or 1 at both ends, so the endpoints are reproduced bit for bit.
pub fn hermite(p0: Vec3, v0: Vec3, p1: Vec3, v1: Vec3, t: f32, total_duration: f32) -> Vec3 {
    let s = progress(t, total_duration);
    let s2 = s * s;
    let s3 = s2 * s;

    let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
    let h10 = s3 - 2.0 * s2 + s;
    let h01 = -2.0 * s3 + 3.0 * s2;
    let h11 = s3 - s2;

    let m0 = v0 * total_duration;
    let m1 = v1 * total_duration;

    p0 * h00 + m0 * h10 + p1 * h01 + m1 * h11
}

/// Restricts each masked velocity axis so the Hermite segment cannot leave
/// the range spanned by its endpoints on that axis.
pub fn clamp_monotone_velocity(
    velocity: Vec3,
    p0: Vec3,
    p1: Vec3,
    total_duration: f32,
    axes: BVec3,
) -> Vec3 {
    if total_duration <= 0.0 {
        return Vec3::select(axes, Vec3::ZERO, velocity);
    }

    let slope = (p1 - p0) / total_duration;
    let mut clamped = velocity;

    for axis in 0..3 {
        if !axes.test(axis) {
            continue;
        }
        let limit = slope[axis];
        let v = velocity[axis];
        clamped[axis] = if limit == 0.0 || v * limit <= 0.0 {
            0.0
        } else if limit > 0.0 {
            v.min(limit)
        } else {
            v.max(limit)
        };
    }

    clamped
}

fn monotone_hermite(
    p0: Vec3,
    v0: Vec3,
    p1: Vec3,
    v1: Vec3,
    t: f32,
    total_duration: f32,
    axes: BVec3,
) -> Vec3 {
    let v0 = clamp_monotone_velocity(v0, p0, p1, total_duration, axes);
    let v1 = clamp_monotone_velocity(v1, p0, p1, total_duration, axes);
    let position = hermite(p0, v0, p1, v1, t, total_duration);

    // Rounding in the basis sum can land one ulp outside the endpoints.
    let bounded = position.clamp(p0.min(p1), p0.max(p1));
    Vec3::select(axes, bounded, position)
}

pub fn bezier(p0: Vec3, v0: Vec3, p1: Vec3, v1: Vec3, t: f32, total_duration: f32) -> Vec3 {
    let s = progress(t, total_duration);
    let u = 1.0 - s;

    let c0 = p0 + v0 * (total_duration / 3.0);
    let c1 = p1 - v1 * (total_duration / 3.0);

    p0 * (u * u * u) + c0 * (3.0 * u * u * s) + c1 * (3.0 * u * s * s) + p1 * (s * s * s)
}

/// Projective velocity blending: a forward projection from `p0` with a
/// velocity that morphs from `v0` into `v1`, lerped into a backward
/// projection from `p1`.
pub fn velocity_blending(
    p0: Vec3,
    v0: Vec3,
    p1: Vec3,
    v1: Vec3,
    t: f32,
    total_duration: f32,
) -> Vec3 {
    let s = progress(t, total_duration);
    let t = s * total_duration;
    let blended = v0.lerp(v1, s);

    let from_start = p0 + blended * t;
    let from_end = p1 - v1 * (total_duration - t);

    from_start.lerp(from_end, s)
}

/// Like [`velocity_blending`], but the forward projection keeps `v0`.
pub fn position_blending(
    p0: Vec3,
    v0: Vec3,
    p1: Vec3,
    v1: Vec3,
    t: f32,
    total_duration: f32,
) -> Vec3 {
    let s = progress(t, total_duration);
    let t = s * total_duration;

    let from_start = p0 + v0 * t;
    let from_end = p1 - v1 * (total_duration - t);

    from_start.lerp(from_end, s)
}
