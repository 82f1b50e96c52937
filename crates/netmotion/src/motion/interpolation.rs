use super::spline::SplineType;
use super::transform::CharacterTransform;
use crate::codec::NetworkMovementMessage;

/// One interpolation window between two snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterpolationComponent {
    pub enabled: bool,
    pub start: NetworkMovementMessage,
    pub end: NetworkMovementMessage,
    pub time: f32,
    pub total_duration: f32,
    pub spline_type: SplineType,
}

impl InterpolationComponent {
    pub fn restart(
        &mut self,
        start: NetworkMovementMessage,
        end: NetworkMovementMessage,
        spline_type: SplineType,
    ) {
        self.enabled = true;
        self.time = 0.0;
        self.total_duration = end.timestamp - start.timestamp;
        self.start = start;
        self.end = end;
        self.spline_type = spline_type;
    }

    pub fn stop(&mut self) {
        self.enabled = false;
    }

    pub fn is_finished(&self) -> bool {
        self.time >= self.total_duration
    }

    /// Fraction of the window already played, in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        if self.total_duration > 0.0 {
            (self.time / self.total_duration).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }
}

pub struct Interpolation;

impl Interpolation {
    /// Advances `component` by `dt` and writes the pose into `transform`.
    ///
    /// Returns the part of `dt` left over after the window ended, or zero
    /// while the window is still running. A disabled component consumes
    /// nothing and hands all of `dt` back.
    pub fn execute(
        dt: f32,
        transform: &mut CharacterTransform,
        component: &mut InterpolationComponent,
        look_at_time_delta: f32,
    ) -> f32 {
        if !component.enabled {
            return dt;
        }

        component.time += dt;

        let total = component.total_duration.max(0.0);
        if component.time >= total {
            let remainder = component.time - total;
            component.time = total;
            transform.position = component.end.position;
            transform.look_along(component.end.velocity);
            return remainder;
        }

        let (start, end) = (&component.start, &component.end);
        let spline = component.spline_type;

        let position = spline.evaluate(start, end, component.time, total);
        let look_time = (component.time + look_at_time_delta).min(total);
        let look_point = spline.evaluate(start, end, look_time, total);

        transform.position = position;
        transform.look_along(look_point - position);

        0.0
    }
}
