//! Configuration management for the Sonique gateway
//!
//! Resolution order for every setting: environment variable, then the TOML
//! config file, then the built-in default.

pub mod file;

use std::time::Duration;

use crate::session::SessionConfig;
use crate::Result;

/// Default backend base URL
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5004";

/// Sonique gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the Sonique backend
    pub backend_url: String,

    /// Voice configuration
    pub voice: VoiceConfig,

    /// API keys
    pub api_keys: ApiKeys,
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// BCP-47 locale for synthesis and recognition
    pub locale: String,

    /// Seconds to wait for a transcript before re-prompting
    pub listen_timeout_secs: u64,

    /// STT provider ("whisper" or "deepgram")
    pub stt_provider: String,

    /// STT model
    pub stt_model: String,

    /// TTS provider ("openai" or "elevenlabs")
    pub tts_provider: String,

    /// TTS model
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier
    pub tts_speed: f32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            locale: "en-US".to_string(),
            listen_timeout_secs: 10,
            stt_provider: "whisper".to_string(),
            stt_model: "whisper-1".to_string(),
            tts_provider: "openai".to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            tts_speed: 1.0,
        }
    }
}

/// API keys for the speech providers
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (Whisper STT and TTS)
    pub openai: Option<String>,

    /// `ElevenLabs` API key (optional TTS)
    pub elevenlabs: Option<String>,

    /// `Deepgram` API key (optional STT)
    pub deepgram: Option<String>,
}

impl Config {
    /// Load configuration (env > toml > default)
    ///
    /// `backend_override` wins over every other source; it carries the CLI
    /// `--backend` flag.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration cannot be resolved.
    pub fn load(backend_override: Option<&str>) -> Result<Self> {
        let fc = file::load_config_file();

        let backend_url = backend_override
            .map(ToString::to_string)
            .or_else(|| std::env::var("SONIQUE_BACKEND_URL").ok())
            .or(fc.backend.url)
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

        let api_keys = ApiKeys {
            openai: std::env::var("OPENAI_API_KEY").ok().or(fc.api_keys.openai),
            elevenlabs: std::env::var("ELEVENLABS_API_KEY")
                .ok()
                .or(fc.api_keys.elevenlabs),
            deepgram: std::env::var("DEEPGRAM_API_KEY")
                .ok()
                .or(fc.api_keys.deepgram),
        };

        let defaults = VoiceConfig::default();
        let voice = VoiceConfig {
            locale: std::env::var("SONIQUE_LOCALE")
                .ok()
                .or(fc.voice.locale)
                .unwrap_or(defaults.locale),
            listen_timeout_secs: std::env::var("SONIQUE_LISTEN_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.voice.listen_timeout_secs)
                .unwrap_or(defaults.listen_timeout_secs),
            stt_provider: std::env::var("SONIQUE_STT_PROVIDER")
                .ok()
                .or(fc.voice.stt_provider)
                .unwrap_or(defaults.stt_provider),
            stt_model: std::env::var("SONIQUE_STT_MODEL")
                .ok()
                .or(fc.voice.stt_model)
                .unwrap_or(defaults.stt_model),
            tts_provider: std::env::var("SONIQUE_TTS_PROVIDER")
                .ok()
                .or(fc.voice.tts_provider)
                .unwrap_or(defaults.tts_provider),
            tts_model: std::env::var("SONIQUE_TTS_MODEL")
                .ok()
                .or(fc.voice.tts_model)
                .unwrap_or(defaults.tts_model),
            tts_voice: std::env::var("SONIQUE_TTS_VOICE")
                .ok()
                .or(fc.voice.tts_voice)
                .unwrap_or(defaults.tts_voice),
            tts_speed: std::env::var("SONIQUE_TTS_SPEED")
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.voice.tts_speed)
                .unwrap_or(defaults.tts_speed),
        };

        Ok(Self {
            backend_url,
            voice,
            api_keys,
        })
    }

    /// Derive the per-session tunables from this configuration
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            locale: self.voice.locale.clone(),
            listen_timeout: Duration::from_secs(self.voice.listen_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_defaults() {
        let voice = VoiceConfig::default();
        assert_eq!(voice.locale, "en-US");
        assert_eq!(voice.listen_timeout_secs, 10);
        assert_eq!(voice.stt_provider, "whisper");
        assert_eq!(voice.tts_provider, "openai");
    }

    #[test]
    fn session_config_carries_timeout() {
        let config = Config {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            voice: VoiceConfig {
                listen_timeout_secs: 7,
                ..VoiceConfig::default()
            },
            api_keys: ApiKeys::default(),
        };

        let session = config.session_config();
        assert_eq!(session.listen_timeout, Duration::from_secs(7));
        assert_eq!(session.locale, "en-US");
    }
}
