//! Speech-to-text (STT) processing
//!
//! `Transcriber` talks to a hosted recognition API; `MicrophoneInput` wires
//! capture and endpointing in front of it to implement [`SpeechInput`].

use std::time::Duration;

use async_trait::async_trait;

use crate::voice::{
    AudioCapture, SAMPLE_RATE, SpeechInput, TranscriptResult, UtteranceDetector, samples_to_wav,
};
use crate::{Config, Error, Result};

/// Capture poll interval (matches a 100ms chunk at 16kHz)
const CHUNK_INTERVAL: Duration = Duration::from_millis(100);

/// Response from OpenAI Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Response from Deepgram transcription API
#[derive(serde::Deserialize)]
struct DeepgramResponse {
    results: DeepgramResults,
}

#[derive(serde::Deserialize)]
struct DeepgramResults {
    channels: Vec<DeepgramChannel>,
}

#[derive(serde::Deserialize)]
struct DeepgramChannel {
    alternatives: Vec<DeepgramAlternative>,
}

#[derive(serde::Deserialize)]
struct DeepgramAlternative {
    transcript: String,
}

/// STT provider backend
#[derive(Clone, Copy, Debug)]
enum SttProvider {
    Whisper,
    Deepgram,
}

/// Transcribes WAV audio to text through a hosted recognition API
pub struct Transcriber {
    client: reqwest::Client,
    api_key: String,
    model: String,
    provider: SttProvider,
}

impl Transcriber {
    /// Create a transcriber backed by `OpenAI` Whisper
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_whisper(api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for Whisper".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            provider: SttProvider::Whisper,
        })
    }

    /// Create a transcriber backed by Deepgram
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_deepgram(api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("Deepgram API key required".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            provider: SttProvider::Deepgram,
        })
    }

    /// Create a transcriber from the configured provider and keys
    ///
    /// # Errors
    ///
    /// Returns error for an unknown provider or a missing API key
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.voice.stt_provider.as_str() {
            "whisper" => Self::new_whisper(
                config.api_keys.openai.clone().unwrap_or_default(),
                config.voice.stt_model.clone(),
            ),
            "deepgram" => Self::new_deepgram(
                config.api_keys.deepgram.clone().unwrap_or_default(),
                config.voice.stt_model.clone(),
            ),
            other => Err(Error::Config(format!("unknown STT provider: {other}"))),
        }
    }

    /// Transcribe WAV audio to text
    ///
    /// `locale` is a BCP-47 tag; only its language part reaches the API.
    ///
    /// # Errors
    ///
    /// Returns error if the recognition request fails
    pub async fn transcribe(&self, audio: &[u8], locale: &str) -> Result<String> {
        match self.provider {
            SttProvider::Whisper => self.transcribe_whisper(audio, locale).await,
            SttProvider::Deepgram => self.transcribe_deepgram(audio, locale).await,
        }
    }

    /// Transcribe using OpenAI Whisper
    async fn transcribe_whisper(&self, audio: &[u8], locale: &str) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting Whisper transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone())
            .text("language", language_of(locale).to_string());

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/transcriptions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Whisper request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Stt(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse Whisper response");
            e
        })?;

        tracing::info!(transcript = %result.text, "transcription complete");
        Ok(result.text)
    }

    /// Transcribe using Deepgram
    async fn transcribe_deepgram(&self, audio: &[u8], locale: &str) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting Deepgram transcription");

        let url = format!(
            "https://api.deepgram.com/v1/listen?model={}&language={}&punctuate=true",
            self.model,
            language_of(locale)
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", "audio/wav")
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Deepgram request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Deepgram API error");
            return Err(Error::Stt(format!("Deepgram API error {status}: {body}")));
        }

        let result: DeepgramResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse Deepgram response");
            e
        })?;

        let transcript = result
            .results
            .channels
            .first()
            .and_then(|c| c.alternatives.first())
            .map(|a| a.transcript.clone())
            .unwrap_or_default();

        tracing::info!(transcript = %transcript, "transcription complete");
        Ok(transcript)
    }
}

/// Language part of a BCP-47 tag ("en-US" -> "en")
fn language_of(locale: &str) -> &str {
    locale.split('-').next().unwrap_or(locale)
}

/// Microphone-backed speech input: capture, endpoint, transcribe
pub struct MicrophoneInput {
    capture: AudioCapture,
    detector: UtteranceDetector,
    transcriber: Transcriber,
}

impl MicrophoneInput {
    /// Create a microphone input in front of the given transcriber
    ///
    /// # Errors
    ///
    /// Returns error if the capture device cannot be opened
    pub fn new(transcriber: Transcriber) -> Result<Self> {
        Ok(Self {
            capture: AudioCapture::new()?,
            detector: UtteranceDetector::new(),
            transcriber,
        })
    }

    /// Create a microphone input from the configuration
    ///
    /// # Errors
    ///
    /// Returns error if the transcriber or capture device cannot be built
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(Transcriber::from_config(config)?)
    }
}

#[async_trait(?Send)]
impl SpeechInput for MicrophoneInput {
    async fn listen(&mut self, locale: &str) -> Result<TranscriptResult> {
        self.detector.reset();
        self.capture.start()?;
        self.capture.clear_buffer();

        loop {
            tokio::time::sleep(CHUNK_INTERVAL).await;

            let samples = self.capture.take_buffer();
            if samples.is_empty() {
                continue;
            }
            if self.detector.feed(&samples) {
                break;
            }
        }

        let utterance = self.detector.take_utterance();
        self.capture.stop();

        let wav = samples_to_wav(&utterance, SAMPLE_RATE)?;
        let text = self.transcriber.transcribe(&wav, locale).await?;

        Ok(TranscriptResult::final_text(text))
    }

    fn halt(&mut self) {
        self.capture.stop();
        self.detector.reset();
    }
}
