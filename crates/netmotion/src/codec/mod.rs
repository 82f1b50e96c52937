mod encoder;
mod layout;
mod message;
mod packet;
mod parcel;
pub mod quantize;
mod timestamp;

pub use encoder::NetworkMessageEncoder;
pub use layout::{BitField, MovementLayout, TemporalLayout, WireLayout};
pub use message::{
    AnimationStates, CompressedNetworkMovementMessage, MovementFlags, MovementKind,
    NetworkMovementMessage,
};
pub use packet::{
    MovementPacket, PROTOCOL_MAGIC, PROTOCOL_VERSION, PacketError, PacketHeader,
    sequence_greater_than,
};
pub use parcel::ParcelGrid;
pub use timestamp::TimestampRing;
