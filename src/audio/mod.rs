pub mod chunk;
pub mod normalize;

pub use chunk::{AudioChunk, ChunkAssembler, ChunkConfig};
pub use normalize::FrameNormalizer;
