use glam::Vec3;
use netmotion::{MovementKind, NetworkMovementMessage};

const GRAVITY: f32 = 9.8;
const JUMP_SPEED: f32 = 4.9;
const SPAWN: Vec3 = Vec3::new(8.0, 0.0, 8.0);

#[derive(Debug, Clone, Copy)]
struct Segment {
    duration: f32,
    velocity: Vec3,
    kind: MovementKind,
    blend: f32,
    jump: bool,
}

impl Segment {
    const fn new(duration: f32, velocity: Vec3, kind: MovementKind, blend: f32) -> Self {
        Self {
            duration,
            velocity,
            kind,
            blend,
            jump: false,
        }
    }

    const fn jumping(self) -> Self {
        Self { jump: true, ..self }
    }
}

const PATH: [Segment; 7] = [
    Segment::new(1.0, Vec3::ZERO, MovementKind::Idle, 0.0),
    Segment::new(3.0, Vec3::new(2.0, 0.0, 0.0), MovementKind::Walk, 1.0),
    Segment::new(2.0, Vec3::new(0.0, 0.0, 4.0), MovementKind::Jog, 2.0),
    Segment::new(1.0, Vec3::new(6.0, 0.0, 0.0), MovementKind::Run, 3.0).jumping(),
    Segment::new(2.0, Vec3::new(-4.2, 0.0, 4.2), MovementKind::Run, 3.0),
    Segment::new(3.0, Vec3::new(-2.0, 0.0, -1.0), MovementKind::Walk, 1.0),
    Segment::new(1.0, Vec3::ZERO, MovementKind::Idle, 0.0),
];

/// Local avatar following a fixed looping route that idles, walks, jogs,
/// runs and jumps.
#[derive(Debug, Clone)]
pub struct ScriptedAvatar {
    starts: Vec<(f32, Vec3)>,
    loop_duration: f32,
    loop_displacement: Vec3,
}

impl Default for ScriptedAvatar {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedAvatar {
    pub fn new() -> Self {
        let mut starts = Vec::with_capacity(PATH.len());
        let mut time = 0.0;
        let mut offset = Vec3::ZERO;
        for segment in &PATH {
            starts.push((time, offset));
            time += segment.duration;
            offset += segment.velocity * segment.duration;
        }

        Self {
            starts,
            loop_duration: time,
            loop_displacement: offset,
        }
    }

    pub fn sample(&self, now: f32) -> NetworkMovementMessage {
        let laps = (now / self.loop_duration).floor();
        let local = now - laps * self.loop_duration;

        let index = self
            .starts
            .iter()
            .rposition(|(start, _)| *start <= local)
            .unwrap_or(0);
        let segment = PATH[index];
        let (start, offset) = self.starts[index];
        let t = (local - start).min(segment.duration);

        let mut position = SPAWN + self.loop_displacement * laps + offset + segment.velocity * t;
        let mut velocity = segment.velocity;

        let mut airborne = false;
        if segment.jump {
            let height = JUMP_SPEED * t - 0.5 * GRAVITY * t * t;
            if height > 0.0 {
                airborne = true;
                position.y += height;
                velocity.y = JUMP_SPEED - GRAVITY * t;
            }
        }

        let mut sample = NetworkMovementMessage::new(now, position, velocity);
        sample.movement_kind = segment.kind;
        sample.anim_state.is_grounded = !airborne;
        sample.anim_state.is_jumping = airborne && velocity.y > 0.0;
        sample.anim_state.is_falling = airborne && velocity.y <= 0.0;
        sample.anim_state.movement_blend_value = segment.blend;
        sample
    }
}
