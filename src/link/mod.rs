pub mod tm_link;

pub use tm_link::{TmLink, TmPacket, TmPacketSink};
