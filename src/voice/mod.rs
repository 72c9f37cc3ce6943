//! Voice processing module
//!
//! Defines the speech collaborator seams (`SpeechOutput`, `SpeechInput`) and
//! the audio plumbing behind their hardware-backed implementations: capture,
//! playback, utterance endpointing, and the HTTP STT/TTS providers.

mod capture;
mod endpoint;
mod playback;
mod stt;
mod tts;

pub use capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
pub use endpoint::{EndpointState, UtteranceDetector};
pub use playback::AudioPlayback;
pub use stt::{MicrophoneInput, Transcriber};
pub use tts::{SpeakerOutput, Synthesizer};

use async_trait::async_trait;

use crate::Result;

/// One unit of synthesized speech output
///
/// Created per speak request and consumed by [`SpeechOutput::speak`].
#[derive(Debug, Clone)]
pub struct Utterance {
    /// Text to synthesize
    pub content: String,

    /// BCP-47 locale tag (e.g. "en-US")
    pub locale: String,
}

impl Utterance {
    /// Create an utterance for the given text and locale
    #[must_use]
    pub fn new(content: &str, locale: &str) -> Self {
        Self {
            content: content.to_string(),
            locale: locale.to_string(),
        }
    }
}

/// Outcome of one recognition pass
///
/// Produced once per listen, consumed immediately by classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptResult {
    /// Recognized text (possibly empty when nothing usable was heard)
    pub text: String,

    /// Whether this is a final result (interim results are never emitted)
    pub is_final: bool,
}

impl TranscriptResult {
    /// Create a final transcript result
    #[must_use]
    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }
}

/// Speaks one utterance at a time, resolving on playback completion
///
/// Futures are not `Send`: hardware-backed implementations hold cpal streams,
/// so sessions run on the thread that created them (see `session.rs`).
#[async_trait(?Send)]
pub trait SpeechOutput {
    /// Synthesize and play the utterance, returning once playback finished
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    async fn speak(&mut self, utterance: &Utterance) -> Result<()>;
}

/// Listens for one spoken utterance and delivers exactly one final transcript
#[async_trait(?Send)]
pub trait SpeechInput {
    /// Capture one utterance and transcribe it
    ///
    /// Resolves when a complete utterance was heard, with interim results off
    /// and a single alternative. The caller bounds this with a timeout and
    /// invokes [`SpeechInput::halt`] if the window elapses.
    ///
    /// # Errors
    ///
    /// Returns error if capture or transcription fails
    async fn listen(&mut self, locale: &str) -> Result<TranscriptResult>;

    /// Force-stop any in-flight or lingering capture
    fn halt(&mut self);
}
