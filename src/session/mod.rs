//! Session lifecycle management.
//!
//! A [`StreamSession`] drives one full ingestion-transcription-delivery
//! cycle: connect, normalize, assemble chunks, transcribe, deliver, and
//! leave stage markers, ending in a terminal `Stopped` state.

mod config;
mod session;

pub use config::SessionConfig;
pub use session::{SessionOutcome, SessionState, StreamSession};
