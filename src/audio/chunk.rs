//! Fixed-duration chunk assembly.
//!
//! Normalized PCM bytes accumulate in memory; a chunk closes only once both
//! the wall-clock duration and the frame-count floor are reached, then it is
//! finalized as a WAV blob for transcription.

use crate::error::ChunkError;
use std::io::Cursor;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

const BYTES_PER_FRAME: usize = 2; // 16-bit mono

/// Chunk assembly settings for one session.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    pub session_key: String,
    /// Target duration of each chunk.
    pub chunk_duration: Duration,
    pub sample_rate: u32,
}

/// A finished chunk: one duration's worth of normalized audio encoded as a
/// WAV blob. Produced once, consumed once by transcription, then discarded.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub session_key: String,
    /// 1-based, strictly increasing without gaps.
    pub chunk_index: u32,
    pub pcm_byte_length: usize,
    pub frame_count: u64,
    pub wav_bytes: Vec<u8>,
}

impl AudioChunk {
    /// Deterministic label used for the transcription upload.
    pub fn label(&self) -> String {
        format!("{}_chunk{}", self.session_key, self.chunk_index)
    }
}

/// Buffers PCM bytes into consecutive chunks.
pub struct ChunkAssembler {
    config: ChunkConfig,
    current: Option<ChunkBuffer>,
    next_index: u32,
}

struct ChunkBuffer {
    pcm: Vec<u8>,
    opened_at: Instant,
}

impl ChunkAssembler {
    pub fn new(config: ChunkConfig) -> Self {
        Self {
            config,
            current: None,
            next_index: 1,
        }
    }

    /// Index the next finished chunk will carry.
    pub fn next_index(&self) -> u32 {
        self.next_index
    }

    fn frames_per_chunk(&self) -> u64 {
        (f64::from(self.config.sample_rate) * self.config.chunk_duration.as_secs_f64()).ceil()
            as u64
    }

    /// Appends one block of normalized PCM bytes. Returns the finished chunk
    /// once BOTH the elapsed wall-clock time and the accumulated frame count
    /// reach the configured duration. Time alone bounds latency; the frame
    /// floor stops bursty delivery from closing a chunk early.
    pub fn push(&mut self, pcm: &[u8]) -> Result<Option<AudioChunk>, ChunkError> {
        let buffer = self.current.get_or_insert_with(|| ChunkBuffer {
            pcm: Vec::new(),
            opened_at: Instant::now(),
        });
        buffer.pcm.extend_from_slice(pcm);

        let frames = (buffer.pcm.len() / BYTES_PER_FRAME) as u64;
        if buffer.opened_at.elapsed() >= self.config.chunk_duration
            && frames >= self.frames_per_chunk()
        {
            if let Some(full) = self.current.take() {
                return Ok(Some(self.encode(full)?));
            }
        }
        Ok(None)
    }

    /// Finalizes whatever is buffered when the stream ends. A shorter-than-
    /// duration partial chunk is still forwarded as the session's terminal
    /// chunk; an empty buffer yields nothing.
    pub fn finish(&mut self) -> Result<Option<AudioChunk>, ChunkError> {
        match self.current.take() {
            Some(buffer) if !buffer.pcm.is_empty() => Ok(Some(self.encode(buffer)?)),
            _ => Ok(None),
        }
    }

    fn encode(&mut self, buffer: ChunkBuffer) -> Result<AudioChunk, ChunkError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.config.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
            for pair in buffer.pcm.chunks_exact(BYTES_PER_FRAME) {
                writer.write_sample(i16::from_le_bytes([pair[0], pair[1]]))?;
            }
            writer.finalize()?;
        }

        let chunk_index = self.next_index;
        self.next_index += 1;
        let frame_count = (buffer.pcm.len() / BYTES_PER_FRAME) as u64;
        info!(
            session_key = %self.config.session_key,
            chunk_index,
            frame_count,
            "chunk finalized"
        );

        Ok(AudioChunk {
            session_key: self.config.session_key.clone(),
            chunk_index,
            pcm_byte_length: buffer.pcm.len(),
            frame_count,
            wav_bytes: cursor.into_inner(),
        })
    }
}
