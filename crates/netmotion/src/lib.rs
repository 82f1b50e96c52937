pub mod codec;
pub mod motion;
pub mod sender;
pub mod settings;

pub use codec::{
    AnimationStates, CompressedNetworkMovementMessage, MovementFlags, MovementKind,
    MovementPacket, NetworkMessageEncoder, NetworkMovementMessage, PacketError, PacketHeader,
    ParcelGrid, TimestampRing, WireLayout, sequence_greater_than,
};
pub use motion::{
    CharacterTransform, Extrapolation, ExtrapolationComponent, Interpolation,
    InterpolationComponent, MovementInbox, PlayerId, RemoteAvatar, RemotePlayerMovement,
    RemotePlayers, SplineType, damp_velocity,
};
pub use sender::{AnimationChange, MovementSender, SendReason, VelocityTier};
pub use settings::{
    EncodingSettings, ExtrapolationSettings, InterpolationSettings, MovementSettings,
    ReceiverSettings, SendSettings, SettingsError,
};
