use crate::settings::{
    EncodingSettings, FLAG_BITS, MOVEMENT_CONTAINER_BITS, MOVEMENT_KIND_BITS, SettingsError,
    TEMPORAL_CONTAINER_BITS,
};

/// One field of a packed integer: `width` bits starting at bit `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    pub offset: u32,
    pub width: u32,
}

impl BitField {
    pub const fn new(offset: u32, width: u32) -> Self {
        Self { offset, width }
    }

    /// The field directly above this one.
    pub const fn next(self, width: u32) -> Self {
        Self::new(self.end(), width)
    }

    pub const fn end(self) -> u32 {
        self.offset + self.width
    }

    #[inline]
    pub const fn mask(self) -> u64 {
        if self.width >= 64 {
            u64::MAX
        } else {
            (1u64 << self.width) - 1
        }
    }

    #[inline]
    pub const fn pack(self, value: u64) -> u64 {
        (value & self.mask()) << self.offset
    }

    #[inline]
    pub const fn unpack(self, container: u64) -> u64 {
        (container >> self.offset) & self.mask()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporalLayout {
    pub timestamp: BitField,
    pub movement_kind: BitField,
    pub flags: BitField,
}

impl TemporalLayout {
    pub const fn new(timestamp_bits: u32) -> Self {
        let timestamp = BitField::new(0, timestamp_bits);
        let movement_kind = timestamp.next(MOVEMENT_KIND_BITS);
        let flags = movement_kind.next(FLAG_BITS);
        Self {
            timestamp,
            movement_kind,
            flags,
        }
    }

    pub const fn total_bits(&self) -> u32 {
        self.flags.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovementLayout {
    pub parcel: BitField,
    pub local_x: BitField,
    pub local_z: BitField,
    pub y: BitField,
    pub velocity_x: BitField,
    pub velocity_y: BitField,
    pub velocity_z: BitField,
}

impl MovementLayout {
    pub const fn new(parcel_bits: u32, xz_bits: u32, y_bits: u32, velocity_bits: u32) -> Self {
        let parcel = BitField::new(0, parcel_bits);
        let local_x = parcel.next(xz_bits);
        let local_z = local_x.next(xz_bits);
        let y = local_z.next(y_bits);
        let velocity_x = y.next(velocity_bits);
        let velocity_y = velocity_x.next(velocity_bits);
        let velocity_z = velocity_y.next(velocity_bits);
        Self {
            parcel,
            local_x,
            local_z,
            y,
            velocity_x,
            velocity_y,
            velocity_z,
        }
    }

    pub const fn total_bits(&self) -> u32 {
        self.velocity_z.end()
    }
}

/// Field table of both containers. Changing any width or the order of the
/// fields is a breaking protocol change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireLayout {
    pub temporal: TemporalLayout,
    pub movement: MovementLayout,
}

impl WireLayout {
    pub const DEFAULT: WireLayout = WireLayout {
        temporal: TemporalLayout::new(crate::settings::TIMESTAMP_BITS),
        movement: MovementLayout::new(
            crate::settings::PARCEL_BITS,
            crate::settings::XZ_BITS,
            crate::settings::Y_BITS,
            crate::settings::VELOCITY_BITS,
        ),
    };

    pub fn new(settings: &EncodingSettings) -> Result<Self, SettingsError> {
        settings.validate()?;

        let layout = Self {
            temporal: TemporalLayout::new(settings.timestamp_bits),
            movement: MovementLayout::new(
                settings.parcel_bits,
                settings.xz_bits,
                settings.y_bits,
                settings.velocity_bits,
            ),
        };

        debug_assert!(layout.temporal.total_bits() <= TEMPORAL_CONTAINER_BITS);
        debug_assert!(layout.movement.total_bits() <= MOVEMENT_CONTAINER_BITS);

        Ok(layout)
    }
}
