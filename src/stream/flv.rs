//! Minimal incremental FLV container demuxer for the audio path.
//!
//! Only audio tags are surfaced; video and script tags are skipped. Tag
//! timestamps are milliseconds of stream time and serve as the packet PTS.

use crate::error::SourceError;

const TAG_HEADER_LEN: usize = 11;
const FILE_HEADER_LEN: usize = 9;
const PREV_TAG_SIZE_LEN: usize = 4;
const TAG_TYPE_AUDIO: u8 = 8;

/// Codec of an FLV audio tag payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCodec {
    /// AAC; a `config` packet carries the AudioSpecificConfig, raw packets
    /// carry frames.
    Aac,
    Mp3,
    /// Uncompressed little-endian signed 16-bit PCM.
    PcmS16le,
}

/// One demultiplexed encoded audio packet.
#[derive(Debug, Clone)]
pub struct AudioPacket {
    /// Presentation timestamp in milliseconds of stream time.
    pub pts: i64,
    pub codec: AudioCodec,
    /// Rate from the tag header. For AAC this is a container placeholder;
    /// the decoder config carries the real rate.
    pub sample_rate: u32,
    pub channels: u16,
    /// AAC sequence header (decoder config), not audio data.
    pub is_config: bool,
    pub data: Vec<u8>,
}

/// Incremental demuxer: feed bytes as they arrive, pull complete packets.
pub struct FlvDemuxer {
    buf: Vec<u8>,
    header_parsed: bool,
    has_audio: Option<bool>,
}

impl FlvDemuxer {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            header_parsed: false,
            has_audio: None,
        }
    }

    /// Appends network bytes and parses the container header as soon as it
    /// is complete.
    pub fn extend(&mut self, bytes: &[u8]) -> Result<(), SourceError> {
        self.buf.extend_from_slice(bytes);
        self.try_parse_header()
    }

    /// Audio-present flag from the container header; `None` until the header
    /// has been seen.
    pub fn has_audio(&self) -> Option<bool> {
        self.has_audio
    }

    fn try_parse_header(&mut self) -> Result<(), SourceError> {
        if self.header_parsed || self.buf.len() < FILE_HEADER_LEN {
            return Ok(());
        }
        if &self.buf[0..3] != b"FLV" {
            return Err(SourceError::Container("missing FLV signature".into()));
        }
        let flags = self.buf[4];
        let data_offset = u32::from_be_bytes([self.buf[5], self.buf[6], self.buf[7], self.buf[8]]) as usize;
        if data_offset < FILE_HEADER_LEN {
            return Err(SourceError::Container(format!(
                "invalid header data offset {data_offset}"
            )));
        }
        // The header is followed by PreviousTagSize0.
        if self.buf.len() < data_offset + PREV_TAG_SIZE_LEN {
            return Ok(());
        }
        self.buf.drain(..data_offset + PREV_TAG_SIZE_LEN);
        self.has_audio = Some(flags & 0x04 != 0);
        self.header_parsed = true;
        Ok(())
    }

    /// Next complete audio packet, or `None` when more bytes are needed.
    pub fn next_packet(&mut self) -> Result<Option<AudioPacket>, SourceError> {
        self.try_parse_header()?;
        if !self.header_parsed {
            return Ok(None);
        }
        loop {
            if self.buf.len() < TAG_HEADER_LEN {
                return Ok(None);
            }
            let tag_type = self.buf[0] & 0x1f;
            let data_size = be24(&self.buf[1..4]) as usize;
            let total = TAG_HEADER_LEN + data_size + PREV_TAG_SIZE_LEN;
            if self.buf.len() < total {
                return Ok(None);
            }
            // Timestamp is 24 bits plus an extension byte for bits 24..32.
            let pts = (be24(&self.buf[4..7]) | (u32::from(self.buf[7]) << 24)) as i64;
            let payload = self.buf[TAG_HEADER_LEN..TAG_HEADER_LEN + data_size].to_vec();
            self.buf.drain(..total);

            if tag_type != TAG_TYPE_AUDIO {
                continue;
            }
            if let Some(packet) = Self::parse_audio_tag(pts, &payload)? {
                return Ok(Some(packet));
            }
        }
    }

    fn parse_audio_tag(pts: i64, payload: &[u8]) -> Result<Option<AudioPacket>, SourceError> {
        let Some((&header, rest)) = payload.split_first() else {
            return Ok(None);
        };
        let format = header >> 4;
        let sample_rate = match (header >> 2) & 0x03 {
            0 => 5512,
            1 => 11025,
            2 => 22050,
            _ => 44100,
        };
        let channels = if header & 0x01 == 0 { 1 } else { 2 };

        match format {
            10 => {
                let Some((&packet_type, body)) = rest.split_first() else {
                    return Ok(None);
                };
                Ok(Some(AudioPacket {
                    pts,
                    codec: AudioCodec::Aac,
                    sample_rate,
                    channels,
                    is_config: packet_type == 0,
                    data: body.to_vec(),
                }))
            }
            2 => Ok(Some(AudioPacket {
                pts,
                codec: AudioCodec::Mp3,
                sample_rate,
                channels,
                is_config: false,
                data: rest.to_vec(),
            })),
            3 => Ok(Some(AudioPacket {
                pts,
                codec: AudioCodec::PcmS16le,
                sample_rate,
                channels,
                is_config: false,
                data: rest.to_vec(),
            })),
            other => Err(SourceError::Container(format!(
                "unsupported sound format {other}"
            ))),
        }
    }
}

impl Default for FlvDemuxer {
    fn default() -> Self {
        Self::new()
    }
}

fn be24(bytes: &[u8]) -> u32 {
    (u32::from(bytes[0]) << 16) | (u32::from(bytes[1]) << 8) | u32::from(bytes[2])
}
