use std::collections::VecDeque;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::codec::NetworkMovementMessage;
use crate::motion::damp_velocity;
use crate::settings::{ExtrapolationSettings, MovementSettings, SendSettings};

const RATE_WINDOW: f32 = 1.0;

/// Coarse speed class of the local avatar.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum VelocityTier {
    #[default]
    Idle = 0,
    Walk = 1,
    Run = 2,
    Sprint = 3,
}

impl VelocityTier {
    pub fn from_sqr_speed(sqr_speed: f32, settings: &SendSettings) -> Self {
        if sqr_speed > settings.sprint_sqr_speed {
            Self::Sprint
        } else if sqr_speed > settings.run_sqr_speed {
            Self::Run
        } else if sqr_speed > settings.walk_sqr_speed {
            Self::Walk
        } else {
            Self::Idle
        }
    }

    /// Squared speed that must be exceeded and the send interval for the
    /// tier.
    fn limits(self, settings: &SendSettings) -> Option<(f32, f32)> {
        match self {
            Self::Idle => None,
            Self::Walk => Some((settings.walk_sqr_speed, settings.walk_sent_rate)),
            Self::Run => Some((settings.run_sqr_speed, settings.run_sent_rate)),
            Self::Sprint => Some((settings.sprint_sqr_speed, settings.sprint_sent_rate)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationChange {
    Stunned,
    Jumping,
    Grounded,
    Falling,
    LongFall,
    LongJump,
    MovementBlend { from: u8, to: u8 },
    SlideBlend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendReason {
    First,
    MaxDelay,
    Animation(AnimationChange),
    ProjectedVelocity,
    ProjectedPosition,
    Velocity,
    Position,
    VelocityAngle,
    Tier(VelocityTier),
}

impl SendReason {
    pub fn label(&self) -> &'static str {
        match self {
            Self::First => "first",
            Self::MaxDelay => "max-delay",
            Self::Animation(_) => "animation",
            Self::ProjectedVelocity => "projected-velocity",
            Self::ProjectedPosition => "projected-position",
            Self::Velocity => "velocity",
            Self::Position => "position",
            Self::VelocityAngle => "velocity-angle",
            Self::Tier(_) => "tier",
        }
    }
}

// idle < 1 <= walk < 2 <= jog < 3 <= run
fn movement_blend_tier(value: f32) -> u8 {
    if value < 1.0 {
        0
    } else if value < 2.0 {
        1
    } else if value < 3.0 {
        2
    } else {
        3
    }
}

/// Decides which local movement samples go on the wire.
#[derive(Debug, Clone)]
pub struct MovementSender {
    settings: SendSettings,
    extrapolation: ExtrapolationSettings,
    last_sent: Option<NetworkMovementMessage>,
    recent_sends: VecDeque<f32>,
    sent_count: u64,
}

impl MovementSender {
    pub fn new(settings: SendSettings, extrapolation: ExtrapolationSettings) -> Self {
        Self {
            settings,
            extrapolation,
            last_sent: None,
            recent_sends: VecDeque::new(),
            sent_count: 0,
        }
    }

    pub fn from_settings(settings: &MovementSettings) -> Self {
        Self::new(settings.send.clone(), settings.extrapolation.clone())
    }

    /// The most recently sent sample, stamped with its send time and tier.
    pub fn last_sent(&self) -> Option<&NetworkMovementMessage> {
        self.last_sent.as_ref()
    }

    pub fn sent_count(&self) -> u64 {
        self.sent_count
    }

    /// Checks `sample` taken at `now` against the last sent one. On `Some`,
    /// the sample is recorded and available through [`Self::last_sent`].
    pub fn poll(&mut self, now: f32, sample: NetworkMovementMessage) -> Option<SendReason> {
        let reason = self.evaluate(now, &sample)?;
        self.record(now, sample, reason);
        Some(reason)
    }

    fn evaluate(&mut self, now: f32, sample: &NetworkMovementMessage) -> Option<SendReason> {
        let Some(last) = self.last_sent else {
            return Some(SendReason::First);
        };

        while self
            .recent_sends
            .front()
            .is_some_and(|&sent| now - sent >= RATE_WINDOW)
        {
            self.recent_sends.pop_front();
        }
        if self.recent_sends.len() >= self.settings.max_messages_per_second as usize {
            return None;
        }

        let s = &self.settings;
        let elapsed = now - last.timestamp;

        if elapsed > s.max_sent_delay {
            return Some(SendReason::MaxDelay);
        }

        if elapsed > s.min_anim_package_time {
            if let Some(change) = self.animation_change(&last, sample) {
                return Some(SendReason::Animation(change));
            }
        }

        if elapsed < s.min_position_package_time {
            return None;
        }

        let projected_velocity = damp_velocity(elapsed, &last, &self.extrapolation);
        let projected_position = last.position + projected_velocity * elapsed;

        if projected_velocity.distance_squared(sample.velocity) > s.proj_velocity_change_threshold {
            return Some(SendReason::ProjectedVelocity);
        }
        if projected_position.distance_squared(sample.position) > s.proj_position_change_threshold {
            return Some(SendReason::ProjectedPosition);
        }

        if last.velocity.distance_squared(sample.velocity) > s.velocity_change_threshold {
            return Some(SendReason::Velocity);
        }
        if last.position.distance_squared(sample.position) > s.position_change_threshold {
            return Some(SendReason::Position);
        }

        if last.velocity != Vec3::ZERO
            && sample.velocity != Vec3::ZERO
            && last.velocity.normalize().dot(sample.velocity.normalize())
                < s.velocity_cos_angle_change_threshold
        {
            return Some(SendReason::VelocityAngle);
        }

        // Faster avatars also qualify for every slower tier's interval.
        let sqr_speed = sample.velocity.length_squared();
        [VelocityTier::Sprint, VelocityTier::Run, VelocityTier::Walk]
            .into_iter()
            .find(|tier| {
                tier.limits(s)
                    .is_some_and(|(min_sqr_speed, rate)| sqr_speed > min_sqr_speed && elapsed > rate)
            })
            .map(SendReason::Tier)
    }

    fn animation_change(
        &self,
        last: &NetworkMovementMessage,
        sample: &NetworkMovementMessage,
    ) -> Option<AnimationChange> {
        let (before, after) = (&last.anim_state, &sample.anim_state);

        if last.is_stunned != sample.is_stunned {
            return Some(AnimationChange::Stunned);
        }
        if before.is_jumping != after.is_jumping {
            return Some(AnimationChange::Jumping);
        }
        if before.is_grounded != after.is_grounded {
            return Some(AnimationChange::Grounded);
        }
        if before.is_falling != after.is_falling {
            return Some(AnimationChange::Falling);
        }
        if before.is_long_fall != after.is_long_fall {
            return Some(AnimationChange::LongFall);
        }
        if before.is_long_jump != after.is_long_jump {
            return Some(AnimationChange::LongJump);
        }

        let from = movement_blend_tier(before.movement_blend_value);
        let to = movement_blend_tier(after.movement_blend_value);
        if from as i32 - to as i32 >= self.settings.move_blend_tiers_diff {
            return Some(AnimationChange::MovementBlend { from, to });
        }

        let slide_diff = (before.slide_blend_value - after.slide_blend_value).abs();
        if slide_diff > self.settings.min_slide_blend_diff {
            return Some(AnimationChange::SlideBlend);
        }

        None
    }

    fn record(&mut self, now: f32, sample: NetworkMovementMessage, reason: SendReason) {
        let mut message = sample.with_velocity(sample.velocity);
        message.timestamp = now;
        message.velocity_tier =
            VelocityTier::from_sqr_speed(message.velocity_sqr_magnitude, &self.settings) as u8;

        if let Some(last) = &self.last_sent {
            log::trace!(
                "sending movement ({}) after {:.2}s",
                reason.label(),
                now - last.timestamp
            );
        }

        self.last_sent = Some(message);
        self.recent_sends.push_back(now);
        self.sent_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(position: Vec3, velocity: Vec3) -> NetworkMovementMessage {
        NetworkMovementMessage::new(0.0, position, velocity)
    }

    fn started(first: NetworkMovementMessage) -> MovementSender {
        let mut sender = MovementSender::from_settings(&MovementSettings::default());
        assert_eq!(sender.poll(0.0, first), Some(SendReason::First));
        sender
    }

    #[test]
    fn first_sample_is_always_sent() {
        let mut sender = MovementSender::from_settings(&MovementSettings::default());
        assert_eq!(sender.poll(3.0, sample(Vec3::ONE, Vec3::ZERO)), Some(SendReason::First));
        assert_eq!(sender.last_sent().map(|m| m.timestamp), Some(3.0));
        assert_eq!(sender.sent_count(), 1);
    }

    #[test]
    fn idle_avatar_only_sends_after_max_delay() {
        let idle = sample(Vec3::ZERO, Vec3::ZERO);
        let mut sender = started(idle);

        assert_eq!(sender.poll(0.5, idle), None);
        assert_eq!(sender.poll(0.99, idle), None);
        assert_eq!(sender.poll(1.01, idle), Some(SendReason::MaxDelay));
        assert_eq!(sender.poll(1.5, idle), None);
    }

    #[test]
    fn animation_change_waits_for_min_package_time() {
        let idle = sample(Vec3::ZERO, Vec3::ZERO);
        let mut sender = started(idle);

        let mut jumping = idle;
        jumping.anim_state.is_jumping = true;

        assert_eq!(sender.poll(0.05, jumping), None);
        assert_eq!(
            sender.poll(0.15, jumping),
            Some(SendReason::Animation(AnimationChange::Jumping))
        );
    }

    #[test]
    fn stun_outranks_other_animation_changes() {
        let idle = sample(Vec3::ZERO, Vec3::ZERO);
        let mut sender = started(idle);

        let mut changed = idle;
        changed.is_stunned = true;
        changed.anim_state.is_falling = true;

        assert_eq!(
            sender.poll(0.2, changed),
            Some(SendReason::Animation(AnimationChange::Stunned))
        );
    }

    #[test]
    fn only_blend_tier_drops_count() {
        let mut running = sample(Vec3::ZERO, Vec3::ZERO);
        running.anim_state.movement_blend_value = 3.0;
        let mut sender = started(running);

        let mut stopped = running;
        stopped.anim_state.movement_blend_value = 0.5;
        assert_eq!(
            sender.poll(0.2, stopped),
            Some(SendReason::Animation(AnimationChange::MovementBlend { from: 3, to: 0 }))
        );

        let mut running_again = stopped;
        running_again.anim_state.movement_blend_value = 3.0;
        assert_eq!(sender.poll(0.4, running_again), None);
    }

    #[test]
    fn movement_waits_for_min_position_time() {
        let mut sender = started(sample(Vec3::ZERO, Vec3::ZERO));
        assert_eq!(sender.poll(0.05, sample(Vec3::X * 5.0, Vec3::ZERO)), None);
        assert_eq!(
            sender.poll(0.1, sample(Vec3::X * 5.0, Vec3::ZERO)),
            Some(SendReason::ProjectedPosition)
        );
    }

    #[test]
    fn decayed_projection_triggers_velocity_send() {
        let mut sender = started(sample(Vec3::ZERO, Vec3::X * 5.0));
        assert_eq!(
            sender.poll(0.5, sample(Vec3::X * 2.5, Vec3::X * 5.0)),
            Some(SendReason::ProjectedVelocity)
        );
    }

    #[test]
    fn position_off_projection_is_sent() {
        let mut sender = started(sample(Vec3::ZERO, Vec3::X));
        assert_eq!(
            sender.poll(0.2, sample(Vec3::X, Vec3::X)),
            Some(SendReason::ProjectedPosition)
        );
    }

    #[test]
    fn raw_velocity_change_is_sent() {
        let first = sample(Vec3::ZERO, Vec3::X * 5.0);
        let mut sender = started(first);

        let projected = damp_velocity(0.5, &first, &ExtrapolationSettings::default());
        let current = sample(projected * 0.5, projected);
        assert_eq!(sender.poll(0.5, current), Some(SendReason::Velocity));
    }

    #[test]
    fn raw_position_change_is_sent() {
        let mut sender = started(sample(Vec3::ZERO, Vec3::X * 5.0));
        assert_eq!(
            sender.poll(0.3, sample(Vec3::X * 1.5, Vec3::X * 5.0)),
            Some(SendReason::Position)
        );
    }

    #[test]
    fn turning_is_sent() {
        let mut sender = started(sample(Vec3::ZERO, Vec3::X * 0.5));
        assert_eq!(
            sender.poll(0.2, sample(Vec3::X * 0.1, Vec3::Z * 0.5)),
            Some(SendReason::VelocityAngle)
        );
    }

    #[test]
    fn walking_tier_has_its_own_rate() {
        let mut sender = started(sample(Vec3::ZERO, Vec3::X * 1.2));
        assert_eq!(sender.poll(0.45, sample(Vec3::X * 0.54, Vec3::X * 1.2)), None);
        assert_eq!(
            sender.poll(0.55, sample(Vec3::X * 0.66, Vec3::X * 1.2)),
            Some(SendReason::Tier(VelocityTier::Walk))
        );
        assert_eq!(
            sender.last_sent().map(|m| m.velocity_tier),
            Some(VelocityTier::Walk as u8)
        );
    }

    #[test]
    fn sprinter_falls_back_to_run_rate() {
        let settings = MovementSettings {
            send: SendSettings {
                sprint_sent_rate: 0.5,
                run_sent_rate: 0.2,
                position_change_threshold: 100.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut sender = MovementSender::from_settings(&settings);
        let velocity = Vec3::X * 8.0;
        assert_eq!(sender.poll(0.0, sample(Vec3::ZERO, velocity)), Some(SendReason::First));

        assert_eq!(sender.poll(0.15, sample(velocity * 0.15, velocity)), None);
        assert_eq!(
            sender.poll(0.25, sample(velocity * 0.25, velocity)),
            Some(SendReason::Tier(VelocityTier::Run))
        );
        assert_eq!(
            sender.last_sent().map(|m| m.velocity_tier),
            Some(VelocityTier::Sprint as u8)
        );
    }

    #[test]
    fn rate_cap_uses_rolling_window() {
        let settings = MovementSettings {
            send: SendSettings {
                max_messages_per_second: 3,
                max_sent_delay: 0.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut sender = MovementSender::from_settings(&settings);
        let idle = sample(Vec3::ZERO, Vec3::ZERO);

        assert_eq!(sender.poll(0.0, idle), Some(SendReason::First));
        assert_eq!(sender.poll(0.1, idle), Some(SendReason::MaxDelay));
        assert_eq!(sender.poll(0.2, idle), Some(SendReason::MaxDelay));
        assert_eq!(sender.poll(0.3, idle), None);
        assert_eq!(sender.poll(1.05, idle), Some(SendReason::MaxDelay));
        assert_eq!(sender.sent_count(), 4);
    }

    #[test]
    fn tiers_follow_squared_speed() {
        let settings = SendSettings::default();
        assert_eq!(VelocityTier::from_sqr_speed(0.5, &settings), VelocityTier::Idle);
        assert_eq!(VelocityTier::from_sqr_speed(4.0, &settings), VelocityTier::Walk);
        assert_eq!(VelocityTier::from_sqr_speed(25.0, &settings), VelocityTier::Run);
        assert_eq!(VelocityTier::from_sqr_speed(64.0, &settings), VelocityTier::Sprint);
    }
}
