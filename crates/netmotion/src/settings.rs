use serde::{Deserialize, Serialize};

use crate::motion::SplineType;

pub const PARCEL_SIZE: f32 = 16.0;

pub const Y_MAX: f32 = 150.0;
pub const MAX_VELOCITY: f32 = 10.0;

pub const TIMESTAMP_QUANTUM: f32 = 0.01;
pub const TIMESTAMP_BITS: u32 = 22;

pub const MOVEMENT_KIND_BITS: u32 = 2;
pub const FLAG_BITS: u32 = 7;

// 22 + 2 + 7 = 31
pub const TEMPORAL_CONTAINER_BITS: u32 = 32;

// 17 + 8 + 8 + 13 + 6 + 6 + 6 = 64
pub const MOVEMENT_CONTAINER_BITS: u32 = 64;
pub const PARCEL_BITS: u32 = 17;
pub const XZ_BITS: u32 = 8;
pub const Y_BITS: u32 = 13;
pub const VELOCITY_BITS: u32 = 6;

pub const GRID_MIN_X: i32 = -152;
pub const GRID_MAX_X: i32 = 164;
pub const GRID_MIN_Y: i32 = -152;
pub const GRID_MAX_Y: i32 = 160;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SettingsError {
    #[error("{field} must use between 1 and 32 bits, got {bits}")]
    InvalidBitWidth { field: &'static str, bits: u32 },
    #[error("{container} needs {used} bits but only {available} are available")]
    BitBudgetExceeded {
        container: &'static str,
        used: u32,
        available: u32,
    },
    #[error("{field} must be positive and finite, got {value}")]
    NonPositive { field: &'static str, value: f32 },
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f32 },
    #[error("grid bounds are inverted: x {min_x}..={max_x}, y {min_y}..={max_y}")]
    InvertedGrid {
        min_x: i32,
        max_x: i32,
        min_y: i32,
        max_y: i32,
    },
    #[error("grid holds {cells} parcels but the parcel field only addresses {capacity}")]
    GridTooLarge { cells: u64, capacity: u64 },
}

/// Wire-format constants. Encoder and decoder must agree on every value here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingSettings {
    pub parcel_size: f32,
    pub y_max: f32,
    pub max_velocity: f32,

    pub timestamp_quantum: f32,
    pub timestamp_bits: u32,

    pub parcel_bits: u32,
    pub xz_bits: u32,
    pub y_bits: u32,
    pub velocity_bits: u32,

    pub grid_min_x: i32,
    pub grid_max_x: i32,
    pub grid_min_y: i32,
    pub grid_max_y: i32,
}

impl Default for EncodingSettings {
    fn default() -> Self {
        Self {
            parcel_size: PARCEL_SIZE,
            y_max: Y_MAX,
            max_velocity: MAX_VELOCITY,

            timestamp_quantum: TIMESTAMP_QUANTUM,
            timestamp_bits: TIMESTAMP_BITS,

            parcel_bits: PARCEL_BITS,
            xz_bits: XZ_BITS,
            y_bits: Y_BITS,
            velocity_bits: VELOCITY_BITS,

            grid_min_x: GRID_MIN_X,
            grid_max_x: GRID_MAX_X,
            grid_min_y: GRID_MIN_Y,
            grid_max_y: GRID_MAX_Y,
        }
    }
}

impl EncodingSettings {
    pub fn temporal_bits(&self) -> u32 {
        self.timestamp_bits + MOVEMENT_KIND_BITS + FLAG_BITS
    }

    pub fn movement_bits(&self) -> u32 {
        self.parcel_bits + 2 * self.xz_bits + self.y_bits + 3 * self.velocity_bits
    }

    pub fn grid_cells(&self) -> u64 {
        let width = (self.grid_max_x as i64 - self.grid_min_x as i64 + 1).max(0) as u64;
        let height = (self.grid_max_y as i64 - self.grid_min_y as i64 + 1).max(0) as u64;
        width * height
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        for (field, bits) in [
            ("timestamp_bits", self.timestamp_bits),
            ("parcel_bits", self.parcel_bits),
            ("xz_bits", self.xz_bits),
            ("y_bits", self.y_bits),
            ("velocity_bits", self.velocity_bits),
        ] {
            if bits == 0 || bits > 32 {
                return Err(SettingsError::InvalidBitWidth { field, bits });
            }
        }

        let used = self.temporal_bits();
        if used > TEMPORAL_CONTAINER_BITS {
            return Err(SettingsError::BitBudgetExceeded {
                container: "temporal_data",
                used,
                available: TEMPORAL_CONTAINER_BITS,
            });
        }

        let used = self.movement_bits();
        if used > MOVEMENT_CONTAINER_BITS {
            return Err(SettingsError::BitBudgetExceeded {
                container: "movement_data",
                used,
                available: MOVEMENT_CONTAINER_BITS,
            });
        }

        for (field, value) in [
            ("parcel_size", self.parcel_size),
            ("y_max", self.y_max),
            ("max_velocity", self.max_velocity),
            ("timestamp_quantum", self.timestamp_quantum),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(SettingsError::NonPositive { field, value });
            }
        }

        if self.grid_max_x < self.grid_min_x || self.grid_max_y < self.grid_min_y {
            return Err(SettingsError::InvertedGrid {
                min_x: self.grid_min_x,
                max_x: self.grid_max_x,
                min_y: self.grid_min_y,
                max_y: self.grid_max_y,
            });
        }

        let capacity = 1u64 << self.parcel_bits;
        let cells = self.grid_cells();
        if cells > capacity {
            return Err(SettingsError::GridTooLarge { cells, capacity });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtrapolationSettings {
    /// Seconds of undamped motion after the last snapshot.
    pub linear_time: f32,
    /// Damping phase length, in multiples of `linear_time`.
    pub damped_steps: u32,
    pub min_speed: f32,
}

impl Default for ExtrapolationSettings {
    fn default() -> Self {
        Self {
            linear_time: 0.33,
            damped_steps: 1,
            min_speed: 0.01,
        }
    }
}

impl ExtrapolationSettings {
    pub fn damped_time(&self) -> f32 {
        self.linear_time * self.damped_steps as f32
    }

    pub fn total_move_duration(&self) -> f32 {
        self.linear_time + self.damped_time()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationSettings {
    pub interpolation_type: SplineType,
    pub blend_type: SplineType,
    pub use_blend: bool,
    pub max_blend_speed: f32,

    pub look_at_time_delta: f32,

    pub use_speed_up: bool,
    pub catch_up_messages_min: usize,
    pub max_speed_up_time_divider: f32,
}

impl Default for InterpolationSettings {
    fn default() -> Self {
        Self {
            interpolation_type: SplineType::MonotoneYHermite,
            blend_type: SplineType::VelocityBlending,
            use_blend: true,
            max_blend_speed: 30.0,

            look_at_time_delta: 0.1,

            use_speed_up: true,
            catch_up_messages_min: 2,
            max_speed_up_time_divider: 4.0,
        }
    }
}

/// Thresholds used by the sender to decide when a snapshot is worth sending.
/// Every `*_threshold` is compared against a squared magnitude.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendSettings {
    pub max_messages_per_second: u32,
    pub max_sent_delay: f32,

    pub min_anim_package_time: f32,
    pub move_blend_tiers_diff: i32,
    pub min_slide_blend_diff: f32,

    pub min_position_package_time: f32,
    pub proj_velocity_change_threshold: f32,
    pub proj_position_change_threshold: f32,
    pub velocity_change_threshold: f32,
    pub position_change_threshold: f32,
    pub velocity_cos_angle_change_threshold: f32,

    pub walk_sqr_speed: f32,
    pub walk_sent_rate: f32,
    pub run_sqr_speed: f32,
    pub run_sent_rate: f32,
    pub sprint_sqr_speed: f32,
    pub sprint_sent_rate: f32,
}

impl Default for SendSettings {
    fn default() -> Self {
        Self {
            max_messages_per_second: 10,
            max_sent_delay: 1.0,

            min_anim_package_time: 0.1,
            move_blend_tiers_diff: 2,
            min_slide_blend_diff: 0.5,

            min_position_package_time: 0.1,
            proj_velocity_change_threshold: 1.0,
            proj_position_change_threshold: 0.25,
            velocity_change_threshold: 4.0,
            position_change_threshold: 1.0,
            velocity_cos_angle_change_threshold: 0.9,

            walk_sqr_speed: 1.0,
            walk_sent_rate: 0.5,
            run_sqr_speed: 16.0,
            run_sent_rate: 0.3,
            sprint_sqr_speed: 49.0,
            sprint_sent_rate: 0.2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementSettings {
    pub encoding: EncodingSettings,
    pub extrapolation: ExtrapolationSettings,
    pub interpolation: InterpolationSettings,
    pub send: SendSettings,
    pub receiver: ReceiverSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverSettings {
    pub use_extrapolation: bool,
    /// Squared distance below which two snapshots count as the same position.
    pub min_position_sqr_delta: f32,
    pub min_teleport_distance: f32,
    pub inbox_capacity: usize,
    pub passed_capacity: usize,
}

impl Default for ReceiverSettings {
    fn default() -> Self {
        Self {
            use_extrapolation: true,
            min_position_sqr_delta: 0.0001,
            min_teleport_distance: 50.0,
            inbox_capacity: 64,
            passed_capacity: 16,
        }
    }
}

impl MovementSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.encoding.validate()?;

        for (field, value) in [
            ("linear_time", self.extrapolation.linear_time),
            ("min_speed", self.extrapolation.min_speed),
            ("look_at_time_delta", self.interpolation.look_at_time_delta),
            ("min_position_sqr_delta", self.receiver.min_position_sqr_delta),
            ("min_teleport_distance", self.receiver.min_teleport_distance),
        ] {
            if value.is_nan() || value < 0.0 {
                return Err(SettingsError::Negative { field, value });
            }
        }

        for (field, value) in [
            ("max_blend_speed", self.interpolation.max_blend_speed),
            (
                "max_speed_up_time_divider",
                self.interpolation.max_speed_up_time_divider,
            ),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(SettingsError::NonPositive { field, value });
            }
        }

        Ok(())
    }
}
