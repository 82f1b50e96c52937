mod extrapolation;
mod interpolation;
mod remote;
mod spline;
mod transform;

pub use extrapolation::{Extrapolation, ExtrapolationComponent, damp_velocity};
pub use interpolation::{Interpolation, InterpolationComponent};
pub use remote::{
    BEHIND_EXTRAPOLATION_BATCH, MovementInbox, OLD_MESSAGES_BATCH, PlayerId, RemoteAvatar,
    RemotePlayerMovement, RemotePlayers, SAME_POSITION_BATCH,
};
pub use spline::{
    SplineType, bezier, clamp_monotone_velocity, hermite, linear, position_blending,
    velocity_blending,
};
pub use transform::CharacterTransform;
