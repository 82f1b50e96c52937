use bitflags::bitflags;
use glam::Vec3;
use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum MovementKind {
    #[default]
    Idle = 0,
    Walk = 1,
    Jog = 2,
    Run = 3,
}

impl From<u8> for MovementKind {
    fn from(value: u8) -> Self {
        match value & 0x3 {
            0 => Self::Idle,
            1 => Self::Walk,
            2 => Self::Jog,
            _ => Self::Run,
        }
    }
}

bitflags! {
    /// Boolean state packed right after the movement kind, lowest bit first.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MovementFlags: u8 {
        const SLIDING = 1 << 0;
        const STUNNED = 1 << 1;
        const GROUNDED = 1 << 2;
        const JUMPING = 1 << 3;
        const LONG_JUMP = 1 << 4;
        const FALLING = 1 << 5;
        const LONG_FALL = 1 << 6;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AnimationStates {
    pub is_grounded: bool,
    pub is_jumping: bool,
    pub is_long_jump: bool,
    pub is_falling: bool,
    pub is_long_fall: bool,

    // Not transmitted.
    pub movement_blend_value: f32,
    pub slide_blend_value: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NetworkMovementMessage {
    pub timestamp: f32,
    pub position: Vec3,
    pub velocity: Vec3,
    pub velocity_sqr_magnitude: f32,
    pub rotation_y: f32,
    pub movement_kind: MovementKind,
    pub is_sliding: bool,
    pub is_stunned: bool,
    pub is_instant: bool,
    pub is_emoting: bool,
    pub anim_state: AnimationStates,
    pub velocity_tier: u8,
}

impl NetworkMovementMessage {
    pub fn new(timestamp: f32, position: Vec3, velocity: Vec3) -> Self {
        Self {
            timestamp,
            position,
            velocity,
            velocity_sqr_magnitude: velocity.length_squared(),
            ..Default::default()
        }
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self.velocity_sqr_magnitude = velocity.length_squared();
        self
    }

    pub fn flags(&self) -> MovementFlags {
        let mut flags = MovementFlags::empty();
        flags.set(MovementFlags::SLIDING, self.is_sliding);
        flags.set(MovementFlags::STUNNED, self.is_stunned);
        flags.set(MovementFlags::GROUNDED, self.anim_state.is_grounded);
        flags.set(MovementFlags::JUMPING, self.anim_state.is_jumping);
        flags.set(MovementFlags::LONG_JUMP, self.anim_state.is_long_jump);
        flags.set(MovementFlags::FALLING, self.anim_state.is_falling);
        flags.set(MovementFlags::LONG_FALL, self.anim_state.is_long_fall);
        flags
    }

    pub fn set_flags(&mut self, flags: MovementFlags) {
        self.is_sliding = flags.contains(MovementFlags::SLIDING);
        self.is_stunned = flags.contains(MovementFlags::STUNNED);
        self.anim_state.is_grounded = flags.contains(MovementFlags::GROUNDED);
        self.anim_state.is_jumping = flags.contains(MovementFlags::JUMPING);
        self.anim_state.is_long_jump = flags.contains(MovementFlags::LONG_JUMP);
        self.anim_state.is_falling = flags.contains(MovementFlags::FALLING);
        self.anim_state.is_long_fall = flags.contains(MovementFlags::LONG_FALL);
    }
}

/// Wire form of a [`NetworkMovementMessage`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[rkyv(compare(PartialEq), derive(Debug))]
pub struct CompressedNetworkMovementMessage {
    pub temporal_data: u32,
    pub movement_data: u64,
}
