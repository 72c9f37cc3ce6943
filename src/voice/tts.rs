//! Text-to-speech (TTS) processing
//!
//! `Synthesizer` renders text to MP3 through a hosted voice API;
//! `SpeakerOutput` plays the result to implement [`SpeechOutput`].

use async_trait::async_trait;

use crate::voice::{AudioPlayback, SpeechOutput, Utterance};
use crate::{Config, Error, Result};

/// TTS provider backend
#[derive(Clone, Copy, Debug)]
enum TtsProvider {
    OpenAI,
    ElevenLabs,
}

/// Synthesizes speech from text through a hosted voice API
pub struct Synthesizer {
    client: reqwest::Client,
    api_key: String,
    voice: String,
    speed: f32,
    model: String,
    provider: TtsProvider,
}

impl Synthesizer {
    /// Create a synthesizer backed by `OpenAI` TTS
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_openai(api_key: String, voice: String, speed: f32, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            voice,
            speed,
            model,
            provider: TtsProvider::OpenAI,
        })
    }

    /// Create a synthesizer backed by ElevenLabs
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_elevenlabs(api_key: String, voice_id: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "ElevenLabs API key required for TTS".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            voice: voice_id,
            speed: 1.0, // ElevenLabs has no speed parameter
            model,
            provider: TtsProvider::ElevenLabs,
        })
    }

    /// Create a synthesizer from the configured provider and keys
    ///
    /// # Errors
    ///
    /// Returns error for an unknown provider or a missing API key
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.voice.tts_provider.as_str() {
            "openai" => Self::new_openai(
                config.api_keys.openai.clone().unwrap_or_default(),
                config.voice.tts_voice.clone(),
                config.voice.tts_speed,
                config.voice.tts_model.clone(),
            ),
            "elevenlabs" => Self::new_elevenlabs(
                config.api_keys.elevenlabs.clone().unwrap_or_default(),
                config.voice.tts_voice.clone(),
                config.voice.tts_model.clone(),
            ),
            other => Err(Error::Config(format!("unknown TTS provider: {other}"))),
        }
    }

    /// Synthesize text to MP3 bytes
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        match self.provider {
            TtsProvider::OpenAI => self.synthesize_openai(text).await,
            TtsProvider::ElevenLabs => self.synthesize_elevenlabs(text).await,
        }
    }

    /// Synthesize using OpenAI TTS
    async fn synthesize_openai(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: self.speed,
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/speech")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("OpenAI TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }

    /// Synthesize using ElevenLabs TTS
    async fn synthesize_elevenlabs(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct ElevenLabsRequest<'a> {
            text: &'a str,
            model_id: &'a str,
        }

        let url = format!("https://api.elevenlabs.io/v1/text-to-speech/{}", self.voice);

        let request = ElevenLabsRequest {
            text,
            model_id: &self.model,
        };

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("ElevenLabs TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }
}

/// Speaker-backed speech output: synthesize, then play to completion
pub struct SpeakerOutput {
    synthesizer: Synthesizer,
    playback: AudioPlayback,
}

impl SpeakerOutput {
    /// Create a speaker output in front of the given synthesizer
    ///
    /// # Errors
    ///
    /// Returns error if the playback device cannot be opened
    pub fn new(synthesizer: Synthesizer) -> Result<Self> {
        Ok(Self {
            synthesizer,
            playback: AudioPlayback::new()?,
        })
    }

    /// Create a speaker output from the configuration
    ///
    /// # Errors
    ///
    /// Returns error if the synthesizer or playback device cannot be built
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(Synthesizer::from_config(config)?)
    }
}

#[async_trait(?Send)]
impl SpeechOutput for SpeakerOutput {
    async fn speak(&mut self, utterance: &Utterance) -> Result<()> {
        tracing::debug!(
            chars = utterance.content.len(),
            locale = %utterance.locale,
            "speaking utterance"
        );

        let mp3 = self.synthesizer.synthesize(&utterance.content).await?;
        self.playback.play_mp3(&mp3).await
    }
}
