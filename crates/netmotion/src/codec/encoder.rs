use glam::{Vec2, Vec3};

use super::layout::WireLayout;
use super::message::{
    AnimationStates, CompressedNetworkMovementMessage, MovementFlags, MovementKind,
    NetworkMovementMessage,
};
use super::parcel::ParcelGrid;
use super::quantize::{
    compress_scaled_integer, compress_velocity, decompress_scaled_integer, decompress_velocity,
};
use super::timestamp::TimestampRing;
use crate::settings::{EncodingSettings, SettingsError};

/// Packs movement snapshots into two fixed-width integers and back.
///
/// Both directions are total. A corrupted packet decodes to a deterministic
/// but meaningless snapshot.
#[derive(Debug, Clone)]
pub struct NetworkMessageEncoder {
    settings: EncodingSettings,
    layout: WireLayout,
    grid: ParcelGrid,
    ring: TimestampRing,
}

impl NetworkMessageEncoder {
    pub fn new(settings: EncodingSettings) -> Result<Self, SettingsError> {
        let layout = WireLayout::new(&settings)?;
        Ok(Self {
            grid: ParcelGrid::from_settings(&settings),
            ring: TimestampRing::from_settings(&settings),
            layout,
            settings,
        })
    }

    pub fn settings(&self) -> &EncodingSettings {
        &self.settings
    }

    pub fn layout(&self) -> &WireLayout {
        &self.layout
    }

    pub fn grid(&self) -> &ParcelGrid {
        &self.grid
    }

    pub fn timestamp_ring(&self) -> &TimestampRing {
        &self.ring
    }

    pub fn compress(&self, message: &NetworkMovementMessage) -> CompressedNetworkMovementMessage {
        CompressedNetworkMovementMessage {
            temporal_data: self.compress_temporal_data(message),
            movement_data: self.compress_movement_data(message.position, message.velocity),
        }
    }

    fn compress_temporal_data(&self, message: &NetworkMovementMessage) -> u32 {
        let layout = &self.layout.temporal;

        let packed = layout.timestamp.pack(self.ring.compress(message.timestamp) as u64)
            | layout.movement_kind.pack(message.movement_kind as u64)
            | layout.flags.pack(message.flags().bits() as u64);

        packed as u32
    }

    fn compress_movement_data(&self, position: Vec3, velocity: Vec3) -> u64 {
        let layout = &self.layout.movement;
        let s = &self.settings;

        let (parcel, offset) = self.grid.split(position);
        let parcel_index = self.grid.encode_parcel(parcel);

        let x = compress_scaled_integer(offset.x, s.parcel_size, s.xz_bits);
        let z = compress_scaled_integer(offset.y, s.parcel_size, s.xz_bits);
        let y = compress_scaled_integer(position.y, s.y_max, s.y_bits);

        let velocity_x = compress_velocity(velocity.x, s.max_velocity, s.velocity_bits);
        let velocity_y = compress_velocity(velocity.y, s.max_velocity, s.velocity_bits);
        let velocity_z = compress_velocity(velocity.z, s.max_velocity, s.velocity_bits);

        layout.parcel.pack(parcel_index as u64)
            | layout.local_x.pack(x as u64)
            | layout.local_z.pack(z as u64)
            | layout.y.pack(y as u64)
            | layout.velocity_x.pack(velocity_x as u64)
            | layout.velocity_y.pack(velocity_y as u64)
            | layout.velocity_z.pack(velocity_z as u64)
    }

    pub fn decompress(&self, compressed: &CompressedNetworkMovementMessage) -> NetworkMovementMessage {
        let temporal = &self.layout.temporal;
        let temporal_data = compressed.temporal_data as u64;

        let timestamp = self
            .ring
            .decompress(temporal.timestamp.unpack(temporal_data) as u32);
        let movement_kind = MovementKind::from(temporal.movement_kind.unpack(temporal_data) as u8);
        let flags = MovementFlags::from_bits_truncate(temporal.flags.unpack(temporal_data) as u8);

        let (position, velocity) = self.decompress_movement_data(compressed.movement_data);

        let mut message = NetworkMovementMessage {
            timestamp,
            position,
            velocity,
            velocity_sqr_magnitude: velocity.length_squared(),
            movement_kind,
            anim_state: AnimationStates::default(),
            ..Default::default()
        };
        message.set_flags(flags);
        message
    }

    fn decompress_movement_data(&self, movement_data: u64) -> (Vec3, Vec3) {
        let layout = &self.layout.movement;
        let s = &self.settings;

        let parcel = self.grid.decode_parcel(layout.parcel.unpack(movement_data) as u32);

        let x = decompress_scaled_integer(
            layout.local_x.unpack(movement_data) as u32,
            s.parcel_size,
            s.xz_bits,
        );
        let z = decompress_scaled_integer(
            layout.local_z.unpack(movement_data) as u32,
            s.parcel_size,
            s.xz_bits,
        );
        let y = decompress_scaled_integer(layout.y.unpack(movement_data) as u32, s.y_max, s.y_bits);

        let origin: Vec2 = self.grid.parcel_origin(parcel);
        let position = Vec3::new(origin.x + x, y, origin.y + z);

        let velocity = Vec3::new(
            decompress_velocity(
                layout.velocity_x.unpack(movement_data) as u32,
                s.max_velocity,
                s.velocity_bits,
            ),
            decompress_velocity(
                layout.velocity_y.unpack(movement_data) as u32,
                s.max_velocity,
                s.velocity_bits,
            ),
            decompress_velocity(
                layout.velocity_z.unpack(movement_data) as u32,
                s.max_velocity,
                s.velocity_bits,
            ),
        );

        (position, velocity)
    }
}
