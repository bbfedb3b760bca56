//! HTTP-FLV media source.
//!
//! The stream is a long-lived HTTP response body carrying an FLV container.
//! A read timeout on the client surfaces stalled connections as i/o errors,
//! which the connector treats as transient.

use super::connector::{MediaConnect, PacketSource};
use super::flv::{AudioPacket, FlvDemuxer};
use crate::error::SourceError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

pub struct HttpFlvConnect {
    http: reqwest::Client,
}

impl HttpFlvConnect {
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .build()
            .map_err(|err| SourceError::Connect(err.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl MediaConnect for HttpFlvConnect {
    async fn open(&self, url: &str) -> Result<Box<dyn PacketSource>, SourceError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| SourceError::Connect(err.to_string()))?;
        if !response.status().is_success() {
            return Err(SourceError::Connect(format!(
                "{url}: http status {}",
                response.status()
            )));
        }

        let mut source = HttpFlvSource {
            response,
            demuxer: FlvDemuxer::new(),
        };

        // Read until the container header announces its track layout.
        loop {
            match source.demuxer.has_audio() {
                Some(true) => {
                    info!(url, "media source opened");
                    return Ok(Box::new(source));
                }
                Some(false) => return Err(SourceError::NoAudioTrack),
                None => {
                    if !source.fill().await? {
                        return Err(SourceError::Io(
                            "stream ended before container header".into(),
                        ));
                    }
                }
            }
        }
    }
}

pub struct HttpFlvSource {
    response: reqwest::Response,
    demuxer: FlvDemuxer,
}

impl HttpFlvSource {
    /// Reads one network buffer into the demuxer; false on end of stream.
    async fn fill(&mut self) -> Result<bool, SourceError> {
        match self.response.chunk().await {
            Ok(Some(bytes)) => {
                self.demuxer.extend(&bytes)?;
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(err) => Err(SourceError::Io(err.to_string())),
        }
    }
}

#[async_trait]
impl PacketSource for HttpFlvSource {
    async fn next_packet(&mut self) -> Result<Option<AudioPacket>, SourceError> {
        loop {
            if let Some(packet) = self.demuxer.next_packet()? {
                return Ok(Some(packet));
            }
            if !self.fill().await? {
                return Ok(None);
            }
        }
    }
}
