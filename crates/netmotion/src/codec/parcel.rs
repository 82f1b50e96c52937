use glam::{IVec2, Vec2, Vec3};

use crate::settings::EncodingSettings;

/// Flattens 2D parcel coordinates inside a fixed rectangle into a single
/// non-negative index, row by row.
///
/// Built only from validated [`EncodingSettings`], so the grid is never
/// empty and `parcel_size` is positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParcelGrid {
    min: IVec2,
    max: IVec2,
    parcel_size: f32,
}

impl ParcelGrid {
    pub(crate) fn from_settings(settings: &EncodingSettings) -> Self {
        Self {
            min: IVec2::new(settings.grid_min_x, settings.grid_min_y),
            max: IVec2::new(settings.grid_max_x, settings.grid_max_y),
            parcel_size: settings.parcel_size,
        }
    }

    pub fn min(&self) -> IVec2 {
        self.min
    }

    pub fn max(&self) -> IVec2 {
        self.max
    }

    pub fn parcel_size(&self) -> f32 {
        self.parcel_size
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.max.x - self.min.x + 1
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.max.y - self.min.y + 1
    }

    pub fn contains(&self, parcel: IVec2) -> bool {
        parcel.cmpge(self.min).all() && parcel.cmple(self.max).all()
    }

    pub fn clamp(&self, parcel: IVec2) -> IVec2 {
        parcel.clamp(self.min, self.max)
    }

    #[inline]
    pub fn encode_parcel(&self, parcel: IVec2) -> u32 {
        ((parcel.x - self.min.x) + (parcel.y - self.min.y) * self.width()) as u32
    }

    #[inline]
    pub fn decode_parcel(&self, index: u32) -> IVec2 {
        let width = self.width() as u32;
        IVec2::new(
            (index % width) as i32 + self.min.x,
            (index / width) as i32 + self.min.y,
        )
    }

    /// Parcel containing the horizontal (x, z) components of `position`.
    pub fn to_parcel(&self, position: Vec3) -> IVec2 {
        IVec2::new(
            (position.x / self.parcel_size).floor() as i32,
            (position.z / self.parcel_size).floor() as i32,
        )
    }

    /// World-space (x, z) corner of `parcel`.
    pub fn parcel_origin(&self, parcel: IVec2) -> Vec2 {
        parcel.as_vec2() * self.parcel_size
    }

    /// Splits the horizontal part of `position` into a parcel inside the grid
    /// and an offset relative to that parcel's corner. Positions outside the
    /// grid are attached to the nearest border parcel, so their offset falls
    /// outside `[0, parcel_size)`.
    pub fn split(&self, position: Vec3) -> (IVec2, Vec2) {
        let parcel = self.to_parcel(position);
        let clamped = self.clamp(parcel);
        if !self.contains(parcel) {
            log::trace!("position {position} outside parcel grid, clamped to {clamped}");
        }
        let offset = Vec2::new(position.x, position.z) - self.parcel_origin(clamped);
        (clamped, offset)
    }
}
