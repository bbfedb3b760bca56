pub mod connector;
pub mod flv;
pub mod http;

pub use connector::{ConnectorState, MediaConnect, PacketSource, StreamConnector};
pub use flv::{AudioCodec, AudioPacket, FlvDemuxer};
pub use http::HttpFlvConnect;
