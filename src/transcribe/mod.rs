//! Dispatch of finished chunks to the external speech-recognition endpoint.

use crate::audio::AudioChunk;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

/// Speech recognition for one chunk.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Recognized text for the chunk, or `None` when the endpoint is
    /// unreachable, the response is malformed, or no speech was found.
    /// Failures here never stop the session; the chunk simply contributes
    /// no text. Retry is the connector's concern, not this layer's.
    async fn transcribe(&self, chunk: &AudioChunk) -> Option<String>;
}

/// Expected response shape. Only `prediction[0].segments[0].text` is
/// consumed; anything else the endpoint returns is ignored.
#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    prediction: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(default)]
    segments: Vec<Segment>,
}

#[derive(Debug, Deserialize)]
struct Segment {
    text: Option<String>,
}

fn extract_text(response: TranscriptionResponse) -> Option<String> {
    response
        .prediction
        .into_iter()
        .next()?
        .segments
        .into_iter()
        .next()?
        .text
        .filter(|text| !text.is_empty())
}

/// Posts chunk WAV blobs to the inference endpoint as multipart uploads.
pub struct HttpTranscriber {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpTranscriber {
    pub fn new(endpoint: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }

    async fn request(&self, chunk: &AudioChunk) -> Result<TranscriptionResponse, reqwest::Error> {
        let part = reqwest::multipart::Part::bytes(chunk.wav_bytes.clone())
            .file_name(format!("{}.wav", chunk.label()))
            .mime_str("audio/wav")?;
        let form = reqwest::multipart::Form::new().part("f1", part);

        let response = self
            .http
            .post(format!("{}/transcribe/infer", self.endpoint))
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;
        response.json::<TranscriptionResponse>().await
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, chunk: &AudioChunk) -> Option<String> {
        let label = chunk.label();
        info!(chunk = %label, bytes = chunk.wav_bytes.len(), "sending chunk for transcription");
        match self.request(chunk).await {
            Ok(response) => extract_text(response),
            Err(err) => {
                warn!(chunk = %label, error = %err, "transcription request failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Option<String> {
        extract_text(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn extracts_first_segment_text() {
        let text = parse(r#"{"prediction":[{"segments":[{"text":"hello"},{"text":"ignored"}]}]}"#);
        assert_eq!(text.as_deref(), Some("hello"));
    }

    #[test]
    fn missing_segments_yield_no_text() {
        assert_eq!(parse(r#"{"prediction":[{}]}"#), None);
        assert_eq!(parse(r#"{"prediction":[{"segments":[]}]}"#), None);
        assert_eq!(parse(r#"{"prediction":[]}"#), None);
        assert_eq!(parse(r#"{}"#), None);
    }

    #[test]
    fn empty_text_counts_as_no_text() {
        assert_eq!(parse(r#"{"prediction":[{"segments":[{"text":""}]}]}"#), None);
        assert_eq!(
            parse(r#"{"prediction":[{"segments":[{"text":null}]}]}"#),
            None
        );
    }
}
