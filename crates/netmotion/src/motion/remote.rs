use std::collections::{HashMap, VecDeque};

use super::extrapolation::{Extrapolation, ExtrapolationComponent};
use super::interpolation::{Interpolation, InterpolationComponent};
use super::transform::CharacterTransform;
use crate::codec::{
    AnimationStates, CompressedNetworkMovementMessage, NetworkMessageEncoder,
    NetworkMovementMessage,
};
use crate::settings::{MovementSettings, ReceiverSettings};

/// Stale messages dropped per tick.
pub const OLD_MESSAGES_BATCH: usize = 10;
/// Messages older than the extrapolated time dropped per tick.
pub const BEHIND_EXTRAPOLATION_BATCH: usize = 10;
/// Same-position messages skipped after a teleport.
pub const SAME_POSITION_BATCH: usize = 10;

/// Received snapshots waiting to be played, oldest first.
#[derive(Debug, Clone)]
pub struct MovementInbox {
    messages: VecDeque<NetworkMovementMessage>,
    capacity: usize,
}

impl MovementInbox {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Inserts by timestamp. Equal timestamps keep arrival order. When full,
    /// the oldest message is dropped.
    pub fn push(&mut self, message: NetworkMovementMessage) {
        let index = self
            .messages
            .partition_point(|queued| queued.timestamp <= message.timestamp);
        self.messages.insert(index, message);

        while self.messages.len() > self.capacity {
            if let Some(dropped) = self.messages.pop_front() {
                log::trace!("inbox full, dropping message at {:.2}", dropped.timestamp);
            }
        }
    }

    pub fn pop(&mut self) -> Option<NetworkMovementMessage> {
        self.messages.pop_front()
    }

    pub fn first(&self) -> Option<&NetworkMovementMessage> {
        self.messages.front()
    }

    pub fn newest(&self) -> Option<&NetworkMovementMessage> {
        self.messages.back()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Per-avatar receive state: buffers snapshots and turns them into a
/// continuous pose by interpolating between them, or extrapolating past the
/// newest one when the inbox runs dry.
#[derive(Debug, Clone)]
pub struct RemotePlayerMovement {
    inbox: MovementInbox,
    passed: VecDeque<NetworkMovementMessage>,
    passed_capacity: usize,

    initialized: bool,
    was_teleported: bool,

    anim_state: AnimationStates,
    is_stunned: bool,

    interpolation: InterpolationComponent,
    extrapolation: ExtrapolationComponent,
}

impl Default for RemotePlayerMovement {
    fn default() -> Self {
        Self::new(&ReceiverSettings::default())
    }
}

impl RemotePlayerMovement {
    pub fn new(settings: &ReceiverSettings) -> Self {
        let passed_capacity = settings.passed_capacity.max(1);
        Self {
            inbox: MovementInbox::new(settings.inbox_capacity),
            passed: VecDeque::with_capacity(passed_capacity),
            passed_capacity,
            initialized: false,
            was_teleported: false,
            anim_state: AnimationStates::default(),
            is_stunned: false,
            interpolation: InterpolationComponent::default(),
            extrapolation: ExtrapolationComponent::default(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn was_teleported(&self) -> bool {
        self.was_teleported
    }

    pub fn is_interpolating(&self) -> bool {
        self.interpolation.enabled
    }

    pub fn is_extrapolating(&self) -> bool {
        self.extrapolation.enabled
    }

    pub fn anim_state(&self) -> &AnimationStates {
        &self.anim_state
    }

    pub fn is_stunned(&self) -> bool {
        self.is_stunned
    }

    pub fn inbox(&self) -> &MovementInbox {
        &self.inbox
    }

    pub fn interpolation(&self) -> &InterpolationComponent {
        &self.interpolation
    }

    pub fn extrapolation(&self) -> &ExtrapolationComponent {
        &self.extrapolation
    }

    pub fn last_passed(&self) -> Option<&NetworkMovementMessage> {
        self.passed.back()
    }

    /// Applied messages, oldest first.
    pub fn passed(&self) -> impl Iterator<Item = &NetworkMovementMessage> {
        self.passed.iter()
    }

    /// Newest timestamp seen so far, queued or applied.
    pub fn newest_timestamp(&self) -> Option<f32> {
        let queued = self.inbox.newest().map(|m| m.timestamp);
        let passed = self.passed.back().map(|m| m.timestamp);
        match (queued, passed) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }

    /// Decodes a packet payload and queues it. The ring timestamp is lifted
    /// next to the newest known timestamp so ordering survives wraparound.
    pub fn receive(
        &mut self,
        encoder: &NetworkMessageEncoder,
        compressed: &CompressedNetworkMovementMessage,
    ) -> NetworkMovementMessage {
        let mut message = encoder.decompress(compressed);
        if let Some(reference) = self.newest_timestamp() {
            message.timestamp = encoder
                .timestamp_ring()
                .unwrap_near(message.timestamp, reference);
        }
        self.enqueue(message);
        message
    }

    pub fn enqueue(&mut self, message: NetworkMovementMessage) {
        self.inbox.push(message);
    }

    /// Advances the avatar by `dt` seconds.
    pub fn update(
        &mut self,
        dt: f32,
        transform: &mut CharacterTransform,
        settings: &MovementSettings,
    ) {
        if !self.initialized {
            let Some(first) = self.inbox.pop() else {
                return;
            };
            self.handle_first_message(first, transform);
            if self.inbox.is_empty() {
                return;
            }
        }

        let frame_dt = dt;
        let mut dt = dt;
        let mut budget = self.inbox.len() + 1;

        loop {
            if self.interpolation.enabled {
                dt = self.interpolate(dt, transform, settings);
                if dt <= 0.0 {
                    return;
                }
            }

            self.drop_stale_messages();

            if self.inbox.is_empty() {
                if settings.receiver.use_extrapolation && !self.was_teleported {
                    self.extrapolate(dt, transform, settings);
                }
                return;
            }

            if budget == 0 {
                return;
            }
            budget -= 1;

            match self.handle_new_message(dt, frame_dt, transform, settings) {
                Some(remainder) if remainder > 0.0 => dt = remainder,
                _ => return,
            }
        }
    }

    fn handle_first_message(
        &mut self,
        first: NetworkMovementMessage,
        transform: &mut CharacterTransform,
    ) {
        transform.position = first.position;
        self.add_passed(first, true);
        self.initialized = true;
        log::debug!(
            "first movement message at {:.2}, placed at {}",
            first.timestamp,
            first.position
        );
    }

    fn drop_stale_messages(&mut self) {
        let Some(last) = self.passed.back().map(|m| m.timestamp) else {
            return;
        };
        for _ in 0..OLD_MESSAGES_BATCH {
            match self.inbox.first() {
                Some(first) if first.timestamp <= last => {
                    log::trace!("dropping stale message at {:.2}", first.timestamp);
                    self.inbox.pop();
                }
                _ => break,
            }
        }
    }

    fn extrapolate(
        &mut self,
        dt: f32,
        transform: &mut CharacterTransform,
        settings: &MovementSettings,
    ) {
        if !self.extrapolation.enabled {
            let Some(from) = self.passed.back().copied() else {
                return;
            };
            self.extrapolation
                .restart(from, settings.extrapolation.total_move_duration());
            log::debug!("inbox empty, extrapolating from {:.2}", from.timestamp);
        }
        Extrapolation::execute(dt, transform, &mut self.extrapolation, &settings.extrapolation);
    }

    /// Returns the interpolation remainder, or `None` when the tick is over.
    fn handle_new_message(
        &mut self,
        dt: f32,
        frame_dt: f32,
        transform: &mut CharacterTransform,
        settings: &MovementSettings,
    ) -> Option<f32> {
        let mut remote = self.inbox.pop()?;
        let mut is_blend = false;

        if self.extrapolation.enabled {
            match self.stop_extrapolation_if_can(remote, transform) {
                Some(next) => {
                    remote = next;
                    is_blend = true;
                }
                None => {
                    Extrapolation::execute(
                        dt,
                        transform,
                        &mut self.extrapolation,
                        &settings.extrapolation,
                    );
                    return None;
                }
            }
        }

        let last = *self.passed.back()?;
        if self.can_teleport(&last, &remote, settings) {
            self.teleport_filtered(remote, transform, settings);
            remote = self.inbox.pop()?;
            is_blend = false;
        }

        Some(self.start_interpolation(dt, frame_dt, transform, settings, remote, is_blend))
    }

    /// Ends extrapolation at the first queued message that lies ahead of the
    /// extrapolated time. The current pose becomes the start of a blend.
    fn stop_extrapolation_if_can(
        &mut self,
        mut remote: NetworkMovementMessage,
        transform: &CharacterTransform,
    ) -> Option<NetworkMovementMessage> {
        let start = self.extrapolation.start;
        let min_timestamp = start.timestamp
            + self
                .extrapolation
                .time
                .min(self.extrapolation.total_move_duration);

        for _ in 0..BEHIND_EXTRAPOLATION_BATCH {
            if remote.timestamp > min_timestamp {
                break;
            }
            match self.inbox.pop() {
                Some(next) => remote = next,
                None => break,
            }
        }

        if remote.timestamp <= min_timestamp {
            return None;
        }

        self.extrapolation.stop();

        let mut local = NetworkMovementMessage::new(min_timestamp, transform.position, start.velocity);
        local.movement_kind = start.movement_kind;
        local.anim_state = start.anim_state;
        local.is_stunned = start.is_stunned;
        self.add_passed(local, false);

        log::debug!(
            "stopped extrapolating at {:.2}, blending towards {:.2}",
            min_timestamp,
            remote.timestamp
        );

        Some(remote)
    }

    fn can_teleport(
        &self,
        last: &NetworkMovementMessage,
        remote: &NetworkMovementMessage,
        settings: &MovementSettings,
    ) -> bool {
        let distance_sq = last.position.distance_squared(remote.position);
        let teleport_distance = settings.receiver.min_teleport_distance;

        distance_sq > teleport_distance * teleport_distance
            || (settings.interpolation.use_speed_up
                && distance_sq < settings.receiver.min_position_sqr_delta)
    }

    fn teleport_filtered(
        &mut self,
        mut remote: NetworkMovementMessage,
        transform: &mut CharacterTransform,
        settings: &MovementSettings,
    ) {
        if settings.interpolation.use_speed_up {
            let min_delta = settings.receiver.min_position_sqr_delta;
            for _ in 0..SAME_POSITION_BATCH {
                match self.inbox.first() {
                    Some(next) if next.position.distance_squared(remote.position) < min_delta => {
                        remote = *next;
                        self.inbox.pop();
                    }
                    _ => break,
                }
            }
        }

        let moved_sq = transform.position.distance_squared(remote.position);
        if moved_sq >= settings.receiver.min_position_sqr_delta {
            log::debug!("teleported to {} at {:.2}", remote.position, remote.timestamp);
        }

        transform.position = remote.position;
        self.add_passed(remote, true);
    }

    fn start_interpolation(
        &mut self,
        dt: f32,
        frame_dt: f32,
        transform: &mut CharacterTransform,
        settings: &MovementSettings,
        remote: NetworkMovementMessage,
        is_blend: bool,
    ) -> f32 {
        let Some(from) = self.passed.back().copied() else {
            return 0.0;
        };

        let interpolation = &settings.interpolation;
        let blend = interpolation.use_blend && is_blend;
        let spline_type = if blend {
            interpolation.blend_type
        } else {
            interpolation.interpolation_type
        };

        self.interpolation.restart(from, remote, spline_type);

        if blend {
            self.slow_down_blend(interpolation.max_blend_speed);
        } else if interpolation.use_speed_up {
            self.speed_up_for_catching_up(frame_dt, settings);
        }

        transform.position = self.interpolation.start.position;

        self.interpolate(dt, transform, settings)
    }

    fn slow_down_blend(&mut self, max_blend_speed: f32) {
        let component = &mut self.interpolation;
        let distance = component.start.position.distance(component.end.position);

        if component.total_duration <= 0.0 || distance / component.total_duration > max_blend_speed {
            component.total_duration = distance / max_blend_speed;
        }
    }

    fn speed_up_for_catching_up(&mut self, frame_dt: f32, settings: &MovementSettings) {
        let queued = self.inbox.len();
        let interpolation = &settings.interpolation;

        if queued > interpolation.catch_up_messages_min {
            let component = &mut self.interpolation;
            let correction = queued as f32 * frame_dt;
            component.total_duration = (component.total_duration - correction)
                .max(component.total_duration / interpolation.max_speed_up_time_divider);
        }
    }

    /// Runs the active window. Returns the remainder once it completes, or
    /// zero while it is still running.
    fn interpolate(
        &mut self,
        dt: f32,
        transform: &mut CharacterTransform,
        settings: &MovementSettings,
    ) -> f32 {
        let remainder = Interpolation::execute(
            dt,
            transform,
            &mut self.interpolation,
            settings.interpolation.look_at_time_delta,
        );
        self.blend_animations();

        if !self.interpolation.is_finished() {
            return 0.0;
        }

        self.interpolation.stop();
        self.add_passed(self.interpolation.end, false);

        remainder
    }

    fn blend_animations(&mut self) {
        let progress = self.interpolation.progress();
        let start = &self.interpolation.start.anim_state;
        let end = &self.interpolation.end.anim_state;

        self.anim_state.movement_blend_value =
            lerp(start.movement_blend_value, end.movement_blend_value, progress);
        self.anim_state.slide_blend_value =
            lerp(start.slide_blend_value, end.slide_blend_value, progress);
    }

    fn add_passed(&mut self, message: NetworkMovementMessage, was_teleported: bool) {
        self.passed.push_back(message);
        while self.passed.len() > self.passed_capacity {
            self.passed.pop_front();
        }

        self.was_teleported = was_teleported;
        self.anim_state = message.anim_state;
        self.is_stunned = message.is_stunned;
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub type PlayerId = u32;

#[derive(Debug, Clone, Default)]
pub struct RemoteAvatar {
    pub movement: RemotePlayerMovement,
    pub transform: CharacterTransform,
}

impl RemoteAvatar {
    pub fn new(settings: &ReceiverSettings) -> Self {
        Self {
            movement: RemotePlayerMovement::new(settings),
            transform: CharacterTransform::default(),
        }
    }
}

/// All remote avatars known to this client.
#[derive(Debug, Clone, Default)]
pub struct RemotePlayers {
    avatars: HashMap<PlayerId, RemoteAvatar>,
    receiver: ReceiverSettings,
}

impl RemotePlayers {
    pub fn new(receiver: ReceiverSettings) -> Self {
        Self {
            avatars: HashMap::new(),
            receiver,
        }
    }

    pub fn receive(
        &mut self,
        id: PlayerId,
        encoder: &NetworkMessageEncoder,
        compressed: &CompressedNetworkMovementMessage,
    ) {
        let receiver = &self.receiver;
        self.avatars
            .entry(id)
            .or_insert_with(|| {
                log::debug!("new remote player {id}");
                RemoteAvatar::new(receiver)
            })
            .movement
            .receive(encoder, compressed);
    }

    pub fn update(&mut self, dt: f32, settings: &MovementSettings) {
        for avatar in self.avatars.values_mut() {
            avatar.movement.update(dt, &mut avatar.transform, settings);
        }
    }

    pub fn remove(&mut self, id: PlayerId) -> Option<RemoteAvatar> {
        let removed = self.avatars.remove(&id);
        if removed.is_some() {
            log::debug!("remote player {id} removed");
        }
        removed
    }

    pub fn get(&self, id: PlayerId) -> Option<&RemoteAvatar> {
        self.avatars.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PlayerId, &RemoteAvatar)> {
        self.avatars.iter()
    }

    pub fn len(&self) -> usize {
        self.avatars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.avatars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use glam::Vec3;

    use super::*;
    use crate::motion::SplineType;

    fn message(timestamp: f32, position: Vec3, velocity: Vec3) -> NetworkMovementMessage {
        NetworkMovementMessage::new(timestamp, position, velocity)
    }

    fn settings() -> MovementSettings {
        let mut settings = MovementSettings::default();
        settings.interpolation.interpolation_type = SplineType::Linear;
        settings.interpolation.use_speed_up = false;
        settings
    }

    #[test]
    fn inbox_orders_by_timestamp() {
        let mut inbox = MovementInbox::new(8);
        for t in [0.3, 0.1, 0.2] {
            inbox.push(message(t, Vec3::ZERO, Vec3::ZERO));
        }
        assert_eq!(inbox.pop().map(|m| m.timestamp), Some(0.1));
        assert_eq!(inbox.pop().map(|m| m.timestamp), Some(0.2));
        assert_eq!(inbox.pop().map(|m| m.timestamp), Some(0.3));
        assert!(inbox.pop().is_none());
    }

    #[test]
    fn full_inbox_drops_oldest() {
        let mut inbox = MovementInbox::new(2);
        for t in [0.1, 0.2, 0.3] {
            inbox.push(message(t, Vec3::ZERO, Vec3::ZERO));
        }
        assert_eq!(inbox.len(), 2);
        assert_eq!(inbox.first().map(|m| m.timestamp), Some(0.2));
    }

    #[test]
    fn first_message_places_avatar() {
        let settings = settings();
        let mut movement = RemotePlayerMovement::default();
        let mut transform = CharacterTransform::default();

        movement.enqueue(message(1.0, Vec3::new(4.0, 1.0, 2.0), Vec3::ZERO));
        movement.update(0.016, &mut transform, &settings);

        assert!(movement.is_initialized());
        assert!(movement.was_teleported());
        assert_eq!(transform.position, Vec3::new(4.0, 1.0, 2.0));
        assert!(!movement.is_extrapolating());
    }

    #[test]
    fn interpolates_between_messages() {
        let settings = settings();
        let mut movement = RemotePlayerMovement::default();
        let mut transform = CharacterTransform::default();

        movement.enqueue(message(0.0, Vec3::ZERO, Vec3::X * 2.0));
        movement.enqueue(message(0.5, Vec3::X, Vec3::X * 2.0));

        movement.update(0.25, &mut transform, &settings);
        assert!(movement.is_interpolating());
        assert_abs_diff_eq!(transform.position.x, 0.5, epsilon = 1e-5);

        movement.update(0.25, &mut transform, &settings);
        assert!(!movement.is_interpolating());
        assert_abs_diff_eq!(transform.position.x, 1.0, epsilon = 1e-5);
        assert_eq!(movement.last_passed().map(|m| m.timestamp), Some(0.5));
    }

    #[test]
    fn remainder_carries_into_next_message() {
        let settings = settings();
        let mut movement = RemotePlayerMovement::default();
        let mut transform = CharacterTransform::default();

        movement.enqueue(message(0.0, Vec3::ZERO, Vec3::X));
        movement.update(0.0, &mut transform, &settings);

        movement.enqueue(message(0.1, Vec3::X * 0.1, Vec3::X));
        movement.enqueue(message(0.2, Vec3::X * 0.2, Vec3::X));
        movement.update(0.15, &mut transform, &settings);

        assert!(movement.is_interpolating());
        assert_eq!(movement.interpolation().end.timestamp, 0.2);
        assert_abs_diff_eq!(transform.position.x, 0.15, epsilon = 1e-5);
    }

    #[test]
    fn stale_messages_are_dropped() {
        let settings = settings();
        let mut movement = RemotePlayerMovement::default();
        let mut transform = CharacterTransform::default();

        movement.enqueue(message(1.0, Vec3::ZERO, Vec3::ZERO));
        movement.update(0.0, &mut transform, &settings);

        movement.enqueue(message(0.5, Vec3::X * 3.0, Vec3::ZERO));
        movement.enqueue(message(1.0, Vec3::X * 3.0, Vec3::ZERO));
        movement.update(0.016, &mut transform, &settings);

        assert!(movement.inbox().is_empty());
        assert_eq!(transform.position, Vec3::ZERO);
    }

    #[test]
    fn stale_backlog_drains_one_batch_per_pass() {
        let settings = settings();
        let mut movement = RemotePlayerMovement::default();
        let mut transform = CharacterTransform::default();

        movement.enqueue(message(2.0, Vec3::ZERO, Vec3::ZERO));
        movement.update(0.0, &mut transform, &settings);

        for step in 0..OLD_MESSAGES_BATCH + 2 {
            movement.enqueue(message(step as f32 * 0.1, Vec3::ZERO, Vec3::ZERO));
        }

        movement.drop_stale_messages();
        assert_eq!(movement.inbox().len(), 2);

        movement.drop_stale_messages();
        assert!(movement.inbox().is_empty());
    }

    #[test]
    fn same_position_run_collapses_into_one_teleport() {
        let mut settings = settings();
        settings.interpolation.use_speed_up = true;
        let mut movement = RemotePlayerMovement::default();
        let mut transform = CharacterTransform::default();

        movement.enqueue(message(0.0, Vec3::ZERO, Vec3::ZERO));
        movement.update(0.0, &mut transform, &settings);

        for t in [0.1, 0.2, 0.3] {
            movement.enqueue(message(t, Vec3::ZERO, Vec3::ZERO));
        }
        movement.enqueue(message(0.4, Vec3::X, Vec3::X * 10.0));
        movement.update(0.05, &mut transform, &settings);

        assert!(movement.inbox().is_empty());
        assert!(movement.is_interpolating());
        let component = movement.interpolation();
        assert_abs_diff_eq!(component.start.timestamp, 0.3);
        assert_abs_diff_eq!(component.end.timestamp, 0.4);
        assert_abs_diff_eq!(transform.position.x, 0.5, epsilon = 1e-4);
    }

    #[test]
    fn long_backlog_behind_extrapolation_keeps_extrapolating() {
        let settings = settings();
        let mut movement = RemotePlayerMovement::default();
        let mut transform = CharacterTransform::default();

        movement.enqueue(message(0.0, Vec3::ZERO, Vec3::X * 2.0));
        movement.enqueue(message(0.1, Vec3::X * 0.2, Vec3::X * 2.0));
        movement.update(0.1, &mut transform, &settings);
        movement.update(0.2, &mut transform, &settings);
        assert!(movement.is_extrapolating());

        // All of these lie before the extrapolated time of 0.3.
        for step in 0..BEHIND_EXTRAPOLATION_BATCH + 2 {
            let t = 0.11 + step as f32 * 0.01;
            movement.enqueue(message(t, Vec3::X * 0.3, Vec3::X * 2.0));
        }

        movement.update(0.05, &mut transform, &settings);
        assert!(movement.is_extrapolating());
        assert_eq!(movement.inbox().len(), 1);
        assert_abs_diff_eq!(transform.position.x, 0.7, epsilon = 1e-4);

        movement.update(0.05, &mut transform, &settings);
        assert!(movement.is_extrapolating());
        assert!(movement.inbox().is_empty());
        assert_abs_diff_eq!(transform.position.x, 0.8, epsilon = 1e-4);
    }

    #[test]
    fn extrapolates_when_inbox_runs_dry() {
        let settings = settings();
        let mut movement = RemotePlayerMovement::default();
        let mut transform = CharacterTransform::default();

        movement.enqueue(message(0.0, Vec3::ZERO, Vec3::X * 2.0));
        movement.enqueue(message(0.1, Vec3::X * 0.2, Vec3::X * 2.0));
        movement.update(0.1, &mut transform, &settings);
        assert_abs_diff_eq!(transform.position.x, 0.2, epsilon = 1e-5);

        movement.update(0.1, &mut transform, &settings);
        assert!(movement.is_extrapolating());
        assert_abs_diff_eq!(transform.position.x, 0.4, epsilon = 1e-5);
    }

    #[test]
    fn teleport_blocks_extrapolation() {
        let settings = settings();
        let mut movement = RemotePlayerMovement::default();
        let mut transform = CharacterTransform::default();

        movement.enqueue(message(0.0, Vec3::ZERO, Vec3::X * 2.0));
        movement.update(0.1, &mut transform, &settings);
        movement.update(0.1, &mut transform, &settings);

        assert!(!movement.is_extrapolating());
        assert_eq!(transform.position, Vec3::ZERO);
    }

    #[test]
    fn extrapolation_disabled_holds_position() {
        let mut settings = settings();
        settings.receiver.use_extrapolation = false;
        let mut movement = RemotePlayerMovement::default();
        let mut transform = CharacterTransform::default();

        movement.enqueue(message(0.0, Vec3::ZERO, Vec3::X));
        movement.enqueue(message(0.1, Vec3::X * 0.1, Vec3::X));
        movement.update(0.1, &mut transform, &settings);
        movement.update(0.5, &mut transform, &settings);

        assert!(!movement.is_extrapolating());
        assert_abs_diff_eq!(transform.position.x, 0.1, epsilon = 1e-5);
    }

    #[test]
    fn late_message_ends_extrapolation_with_blend() {
        let settings = settings();
        let mut movement = RemotePlayerMovement::default();
        let mut transform = CharacterTransform::default();

        movement.enqueue(message(0.0, Vec3::ZERO, Vec3::X * 2.0));
        movement.enqueue(message(0.1, Vec3::X * 0.2, Vec3::X * 2.0));
        movement.update(0.1, &mut transform, &settings);
        movement.update(0.1, &mut transform, &settings);
        assert!(movement.is_extrapolating());

        movement.enqueue(message(0.5, Vec3::X, Vec3::X * 2.0));
        movement.update(0.05, &mut transform, &settings);

        assert!(!movement.is_extrapolating());
        assert!(movement.is_interpolating());
        let component = movement.interpolation();
        assert_eq!(component.spline_type, settings.interpolation.blend_type);
        assert_abs_diff_eq!(component.start.timestamp, 0.2, epsilon = 1e-5);
        assert_abs_diff_eq!(component.start.position.x, 0.4, epsilon = 1e-5);
    }

    #[test]
    fn behind_message_keeps_extrapolating() {
        let settings = settings();
        let mut movement = RemotePlayerMovement::default();
        let mut transform = CharacterTransform::default();

        movement.enqueue(message(0.0, Vec3::ZERO, Vec3::X * 2.0));
        movement.enqueue(message(0.1, Vec3::X * 0.2, Vec3::X * 2.0));
        movement.update(0.1, &mut transform, &settings);
        movement.update(0.2, &mut transform, &settings);

        movement.enqueue(message(0.15, Vec3::X * 0.3, Vec3::X * 2.0));
        movement.update(0.05, &mut transform, &settings);

        assert!(movement.is_extrapolating());
        assert!(movement.inbox().is_empty());
        assert_abs_diff_eq!(transform.position.x, 0.7, epsilon = 1e-4);
    }

    #[test]
    fn far_message_teleports() {
        let settings = settings();
        let mut movement = RemotePlayerMovement::default();
        let mut transform = CharacterTransform::default();

        movement.enqueue(message(0.0, Vec3::ZERO, Vec3::ZERO));
        movement.update(0.0, &mut transform, &settings);

        let far = Vec3::new(200.0, 0.0, 0.0);
        movement.enqueue(message(0.1, far, Vec3::ZERO));
        movement.update(0.016, &mut transform, &settings);

        assert_eq!(transform.position, far);
        assert!(movement.was_teleported());
        assert!(!movement.is_interpolating());
    }

    #[test]
    fn fast_blend_is_slowed_down() {
        let mut settings = settings();
        settings.interpolation.max_blend_speed = 5.0;
        let mut movement = RemotePlayerMovement::default();
        let mut transform = CharacterTransform::default();

        movement.enqueue(message(0.0, Vec3::ZERO, Vec3::X * 2.0));
        movement.enqueue(message(0.1, Vec3::X * 0.2, Vec3::X * 2.0));
        movement.update(0.1, &mut transform, &settings);
        movement.update(0.1, &mut transform, &settings);

        // 10 units in 0.3 s is far above the 5 units per second cap.
        movement.enqueue(message(0.5, Vec3::X * 10.4, Vec3::ZERO));
        movement.update(0.0, &mut transform, &settings);

        assert_abs_diff_eq!(movement.interpolation().total_duration, 2.0, epsilon = 1e-4);
    }

    #[test]
    fn queued_backlog_speeds_up_interpolation() {
        let mut settings = settings();
        settings.interpolation.use_speed_up = true;
        let mut movement = RemotePlayerMovement::default();
        let mut transform = CharacterTransform::default();

        movement.enqueue(message(0.0, Vec3::ZERO, Vec3::X));
        movement.update(0.0, &mut transform, &settings);

        for step in 1..=5 {
            let t = step as f32 * 0.1;
            movement.enqueue(message(t, Vec3::X * t, Vec3::X));
        }
        movement.update(0.01, &mut transform, &settings);

        // Four messages remain queued, above the catch-up minimum of two.
        assert_abs_diff_eq!(movement.interpolation().total_duration, 0.06, epsilon = 1e-5);
    }

    #[test]
    fn passing_copies_animation_state() {
        let settings = settings();
        let mut movement = RemotePlayerMovement::default();
        let mut transform = CharacterTransform::default();

        let mut stunned = message(0.0, Vec3::ZERO, Vec3::ZERO);
        stunned.is_stunned = true;
        stunned.anim_state.is_grounded = true;
        movement.enqueue(stunned);
        movement.update(0.0, &mut transform, &settings);

        assert!(movement.is_stunned());
        assert!(movement.anim_state().is_grounded);
    }

    #[test]
    fn blend_values_follow_window_progress() {
        let settings = settings();
        let mut movement = RemotePlayerMovement::default();
        let mut transform = CharacterTransform::default();

        let start = message(0.0, Vec3::ZERO, Vec3::X);
        let mut end = message(1.0, Vec3::X, Vec3::X);
        end.anim_state.movement_blend_value = 2.0;
        movement.enqueue(start);
        movement.enqueue(end);

        movement.update(0.25, &mut transform, &settings);
        assert_abs_diff_eq!(movement.anim_state().movement_blend_value, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn passed_history_is_capped() {
        let settings = settings();
        let mut movement = RemotePlayerMovement::new(&ReceiverSettings {
            passed_capacity: 2,
            ..Default::default()
        });
        let mut transform = CharacterTransform::default();

        for step in 0..5 {
            let t = step as f32 * 0.1;
            movement.enqueue(message(t, Vec3::X * t, Vec3::X));
        }
        movement.update(1.0, &mut transform, &settings);

        assert_eq!(movement.passed().count(), 2);
    }

    #[test]
    fn players_are_tracked_by_id() {
        let encoder = NetworkMessageEncoder::new(Default::default()).unwrap();
        let settings = settings();
        let mut players = RemotePlayers::new(ReceiverSettings::default());

        let compressed = encoder.compress(&message(1.0, Vec3::new(8.0, 0.0, 8.0), Vec3::ZERO));
        players.receive(7, &encoder, &compressed);
        players.receive(9, &encoder, &compressed);
        players.update(0.016, &settings);

        assert_eq!(players.len(), 2);
        let avatar = players.get(7).unwrap();
        assert!(avatar.transform.position.abs_diff_eq(Vec3::new(8.0, 0.0, 8.0), 0.05));

        assert!(players.remove(7).is_some());
        assert!(players.remove(7).is_none());
        assert_eq!(players.len(), 1);
    }
}
