//! Normalizes encoded packets into a canonical PCM byte stream: mono,
//! 16-bit signed, at the pipeline sample rate.

use crate::error::NormalizeError;
use crate::stream::{AudioCodec, AudioPacket};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{
    CodecParameters, CodecType, Decoder, DecoderOptions, CODEC_TYPE_AAC, CODEC_TYPE_MP3,
};
use symphonia::core::formats::Packet;
use tracing::debug;

/// Pure decode/downmix/resample transform. No retry logic lives here: a
/// failure means the stream itself is corrupt and the session must end.
pub struct FrameNormalizer {
    decoder: Option<Box<dyn Decoder>>,
    resampler: LinearResampler,
}

impl FrameNormalizer {
    pub fn new(target_rate: u32) -> Self {
        Self {
            decoder: None,
            resampler: LinearResampler::new(target_rate),
        }
    }

    /// Normalizes one encoded packet into zero or more s16le mono byte
    /// blocks at the target rate. The resampler buffers fractional positions
    /// internally, so output does not map one-to-one onto input packets.
    pub fn push(&mut self, packet: &AudioPacket) -> Result<Vec<Vec<u8>>, NormalizeError> {
        if packet.is_config {
            // AAC sequence header: (re)build the decoder around the new
            // AudioSpecificConfig.
            debug!("received AAC decoder config");
            self.decoder = Some(make_decoder(CODEC_TYPE_AAC, Some(&packet.data), None)?);
            return Ok(Vec::new());
        }

        let (samples, source_rate) = match packet.codec {
            AudioCodec::PcmS16le => {
                let interleaved: Vec<i16> = packet
                    .data
                    .chunks_exact(2)
                    .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                (
                    downmix_to_mono(&interleaved, packet.channels as usize),
                    packet.sample_rate,
                )
            }
            AudioCodec::Aac | AudioCodec::Mp3 => {
                if self.decoder.is_none() {
                    if packet.codec == AudioCodec::Aac {
                        return Err(NormalizeError::Malformed(
                            "AAC frame before decoder config".into(),
                        ));
                    }
                    self.decoder = Some(make_decoder(
                        CODEC_TYPE_MP3,
                        None,
                        Some(packet.sample_rate),
                    )?);
                }
                let decoder = self
                    .decoder
                    .as_mut()
                    .ok_or_else(|| NormalizeError::Malformed("decoder unavailable".into()))?;

                let encoded = Packet::new_from_slice(0, packet.pts.max(0) as u64, 0, &packet.data);
                let decoded = decoder.decode(&encoded)?;
                let spec = *decoded.spec();
                let mut buffer = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                (
                    downmix_to_mono(buffer.samples(), spec.channels.count()),
                    spec.rate,
                )
            }
        };

        let resampled = self.resampler.process(&samples, source_rate);
        if resampled.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![pcm_to_bytes(&resampled)])
    }
}

fn make_decoder(
    codec: CodecType,
    extra_data: Option<&[u8]>,
    sample_rate: Option<u32>,
) -> Result<Box<dyn Decoder>, NormalizeError> {
    let mut params = CodecParameters::new();
    params.for_codec(codec);
    if let Some(extra) = extra_data {
        params.with_extra_data(extra.to_vec().into_boxed_slice());
    }
    if let Some(rate) = sample_rate {
        params.with_sample_rate(rate);
    }
    Ok(symphonia::default::get_codecs().make(&params, &DecoderOptions::default())?)
}

/// Interleaved-to-mono by summing channels with clamping, which preserves
/// perceived volume for speech better than averaging.
fn downmix_to_mono(samples: &[i16], channels: usize) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| i32::from(s)).sum();
            sum.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
        })
        .collect()
}

pub(crate) fn pcm_to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Linear-interpolation resampler with fractional-position carry across
/// packets, so packet boundaries introduce no discontinuities.
struct LinearResampler {
    target_rate: u32,
    /// Read position relative to the start of the next input block; values
    /// in (-1, 0) interpolate from the tail of the previous block.
    position: f64,
    last_sample: Option<i16>,
}

impl LinearResampler {
    fn new(target_rate: u32) -> Self {
        Self {
            target_rate,
            position: 0.0,
            last_sample: None,
        }
    }

    fn process(&mut self, input: &[i16], source_rate: u32) -> Vec<i16> {
        if input.is_empty() {
            return Vec::new();
        }
        if source_rate == self.target_rate {
            self.last_sample = input.last().copied();
            return input.to_vec();
        }

        let step = f64::from(source_rate) / f64::from(self.target_rate);
        let mut output = Vec::with_capacity((input.len() as f64 / step) as usize + 1);
        let mut position = self.position;
        let limit = (input.len() - 1) as f64;

        while position < limit {
            let interpolated = if position < 0.0 {
                match self.last_sample {
                    Some(prev) => lerp(prev, input[0], position + 1.0),
                    None => {
                        position = 0.0;
                        continue;
                    }
                }
            } else {
                let index = position as usize;
                lerp(input[index], input[index + 1], position - index as f64)
            };
            output.push(interpolated);
            position += step;
        }

        // Carry the fractional position into the next block's coordinates.
        self.position = position - input.len() as f64;
        self.last_sample = input.last().copied();
        output
    }
}

fn lerp(a: i16, b: i16, fraction: f64) -> i16 {
    (f64::from(a) + (f64::from(b) - f64::from(a)) * fraction).round() as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_at_target_rate() {
        let mut resampler = LinearResampler::new(16000);
        let input = vec![1i16, 2, 3, 4];
        assert_eq!(resampler.process(&input, 16000), input);
    }

    #[test]
    fn halves_sample_count_at_double_rate() {
        let mut resampler = LinearResampler::new(16000);
        let input: Vec<i16> = (0..3200).collect();
        let output = resampler.process(&input, 32000);
        // 3200 source samples at 2:1 land on 1600 output samples.
        assert_eq!(output.len(), 1600);
        assert_eq!(output[0], 0);
        assert_eq!(output[1], 2);
    }

    #[test]
    fn carries_position_across_blocks() {
        let mut whole = LinearResampler::new(16000);
        let input: Vec<i16> = (0..1000).map(|n| (n % 311) as i16).collect();
        let expected = whole.process(&input, 44100);

        let mut split = LinearResampler::new(16000);
        let mut output = split.process(&input[..333], 44100);
        output.extend(split.process(&input[333..700], 44100));
        output.extend(split.process(&input[700..], 44100));

        assert_eq!(output, expected);
    }

    #[test]
    fn downmix_sums_and_clamps() {
        assert_eq!(downmix_to_mono(&[100, 200, -50, 50], 2), vec![300, 0]);
        assert_eq!(downmix_to_mono(&[i16::MAX, i16::MAX], 2), vec![i16::MAX]);
        assert_eq!(downmix_to_mono(&[1, 2, 3], 1), vec![1, 2, 3]);
    }

    #[test]
    fn pcm_packet_normalizes_to_mono_bytes() {
        let mut normalizer = FrameNormalizer::new(16000);
        let packet = AudioPacket {
            pts: 0,
            codec: AudioCodec::PcmS16le,
            sample_rate: 16000,
            channels: 2,
            is_config: false,
            data: pcm_to_bytes(&[10, 20, 30, 40]),
        };
        let blocks = normalizer.push(&packet).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0], pcm_to_bytes(&[30, 70]));
    }

    #[test]
    fn aac_frame_without_config_is_malformed() {
        let mut normalizer = FrameNormalizer::new(16000);
        let packet = AudioPacket {
            pts: 0,
            codec: AudioCodec::Aac,
            sample_rate: 44100,
            channels: 2,
            is_config: false,
            data: vec![0xde, 0xad],
        };
        assert!(matches!(
            normalizer.push(&packet),
            Err(NormalizeError::Malformed(_))
        ));
    }
}
