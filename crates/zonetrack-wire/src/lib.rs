// zonetrack-wire: TCP links to zone readers and the frame decoder they feed.

pub mod decode;
pub mod error;
pub mod link;

pub use decode::{Decoded, FrameKind, decode, decode_frame};
pub use error::Error;
pub use link::{LinkEvent, LinkEventKind, LinkState, ReconnectPolicy, ZoneEndpoint, ZoneLink};
