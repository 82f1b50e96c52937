use glam::Vec3;

use super::transform::CharacterTransform;
use crate::codec::NetworkMovementMessage;
use crate::settings::ExtrapolationSettings;

/// Dead-reckoning state started from the last applied snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtrapolationComponent {
    pub enabled: bool,
    pub start: NetworkMovementMessage,
    pub time: f32,
    pub velocity: Vec3,
    pub total_move_duration: f32,
}

impl ExtrapolationComponent {
    pub fn restart(&mut self, from: NetworkMovementMessage, total_move_duration: f32) {
        self.enabled = true;
        self.start = from;
        self.time = 0.0;
        self.velocity = from.velocity;
        self.total_move_duration = total_move_duration;
    }

    pub fn stop(&mut self) {
        self.enabled = false;
    }
}

/// Velocity `time` seconds after `start`: unchanged for `linear_time`, then
/// falling linearly to zero over `damped_steps * linear_time`.
pub fn damp_velocity(
    time: f32,
    start: &NetworkMovementMessage,
    settings: &ExtrapolationSettings,
) -> Vec3 {
    if time <= settings.linear_time {
        return start.velocity;
    }

    let damped_time = settings.damped_time();
    if damped_time <= 0.0 {
        return Vec3::ZERO;
    }

    let factor = 1.0 - (time - settings.linear_time) / damped_time;
    if factor <= 0.0 {
        Vec3::ZERO
    } else {
        start.velocity * factor
    }
}

pub struct Extrapolation;

impl Extrapolation {
    pub fn execute(
        dt: f32,
        transform: &mut CharacterTransform,
        component: &mut ExtrapolationComponent,
        settings: &ExtrapolationSettings,
    ) {
        if !component.enabled {
            return;
        }

        component.time += dt;
        component.velocity = damp_velocity(component.time, &component.start, settings);

        if component.velocity.length_squared() > settings.min_speed * settings.min_speed {
            transform.position += component.velocity * dt;
            transform.look_along(component.velocity);
        }
    }
}
