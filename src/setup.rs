//! Interactive first-run setup wizard (`sonique setup`)

use std::path::PathBuf;

use dialoguer::{Input, Select};

use crate::config::file::{
    ApiKeysFileConfig, BackendFileConfig, SoniqueConfigFile, VoiceFileConfig,
};

/// Run the interactive setup wizard
///
/// # Errors
///
/// Returns error if user input fails or config cannot be written
pub fn run_setup() -> anyhow::Result<()> {
    println!("Sonique Setup\n");

    // Load existing config if present
    let existing = crate::config::file::load_config_file();
    let config_path = crate::config::file::config_file_path()
        .unwrap_or_else(|| PathBuf::from("~/.config/sonique/config.toml"));

    if config_path.exists() {
        println!("Existing config found at {}\n", config_path.display());
    }

    // 1. Backend URL
    let backend_url: String = Input::new()
        .with_prompt("Sonique backend URL")
        .default(
            existing
                .backend
                .url
                .unwrap_or_else(|| crate::config::DEFAULT_BACKEND_URL.to_string()),
        )
        .interact_text()?;

    // 2. STT provider + key
    let stt_providers = ["Whisper (OpenAI)", "Deepgram"];
    let default_stt = existing
        .voice
        .stt_provider
        .as_deref()
        .and_then(|p| match p {
            "deepgram" => Some(1),
            _ => Some(0),
        })
        .unwrap_or(0);

    let stt_idx = Select::new()
        .with_prompt("Select a speech recognition provider")
        .items(&stt_providers)
        .default(default_stt)
        .interact()?;
    let stt_provider = if stt_idx == 1 { "deepgram" } else { "whisper" };

    // 3. TTS provider
    let tts_providers = ["OpenAI", "ElevenLabs"];
    let default_tts = existing
        .voice
        .tts_provider
        .as_deref()
        .and_then(|p| match p {
            "elevenlabs" => Some(1),
            _ => Some(0),
        })
        .unwrap_or(0);

    let tts_idx = Select::new()
        .with_prompt("Select a speech synthesis provider")
        .items(&tts_providers)
        .default(default_tts)
        .interact()?;
    let tts_provider = if tts_idx == 1 { "elevenlabs" } else { "openai" };

    // 4. API keys for the chosen providers
    let mut api_keys = ApiKeysFileConfig::default();

    if stt_provider == "whisper" || tts_provider == "openai" {
        api_keys.openai = prompt_key("OpenAI", "OPENAI_API_KEY", existing.api_keys.openai)?;
    }
    if stt_provider == "deepgram" {
        api_keys.deepgram = prompt_key("Deepgram", "DEEPGRAM_API_KEY", existing.api_keys.deepgram)?;
    }
    if tts_provider == "elevenlabs" {
        api_keys.elevenlabs = prompt_key(
            "ElevenLabs",
            "ELEVENLABS_API_KEY",
            existing.api_keys.elevenlabs,
        )?;
    }

    // 5. Voice tuning
    let tts_voice: String = Input::new()
        .with_prompt("TTS voice")
        .default(
            existing
                .voice
                .tts_voice
                .unwrap_or_else(|| "alloy".to_string()),
        )
        .interact_text()?;

    let voice = VoiceFileConfig {
        locale: existing.voice.locale.or(Some("en-US".to_string())),
        listen_timeout_secs: existing.voice.listen_timeout_secs.or(Some(10)),
        stt_provider: Some(stt_provider.to_string()),
        stt_model: existing.voice.stt_model.or_else(|| {
            Some(match stt_provider {
                "deepgram" => "nova-2".to_string(),
                _ => "whisper-1".to_string(),
            })
        }),
        tts_provider: Some(tts_provider.to_string()),
        tts_model: existing.voice.tts_model.or_else(|| {
            Some(match tts_provider {
                "elevenlabs" => "eleven_monolingual_v1".to_string(),
                _ => "tts-1".to_string(),
            })
        }),
        tts_voice: Some(tts_voice),
        tts_speed: existing.voice.tts_speed.or(Some(1.0)),
    };

    // 6. Build and write config
    let config_file = SoniqueConfigFile {
        backend: BackendFileConfig {
            url: Some(backend_url),
        },
        voice,
        api_keys,
    };

    write_config(&config_path, &config_file)?;
    println!("\nConfig written to {}", config_path.display());
    println!("\nSetup complete! Run `sonique -v` to start a voice session.");

    Ok(())
}

/// Prompt for an API key, keeping the existing one when input is blank
fn prompt_key(
    provider: &str,
    env_hint: &str,
    existing: Option<String>,
) -> anyhow::Result<Option<String>> {
    let masked = existing.as_deref().map(|k| {
        if k.len() > 8 {
            format!("{}...{}", &k[..4], &k[k.len() - 4..])
        } else {
            "****".to_string()
        }
    });

    let prompt = masked.as_ref().map_or_else(
        || format!("{provider} API key ({env_hint})"),
        |m| format!("{provider} API key (current: {m}, leave blank to keep)"),
    );

    let input: String = Input::new()
        .with_prompt(&prompt)
        .allow_empty(true)
        .interact_text()?;

    Ok(if input.is_empty() { existing } else { Some(input) })
}

/// Serialize and write the config file
fn write_config(path: &PathBuf, config: &SoniqueConfigFile) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, serialize_config(config))?;

    Ok(())
}

/// Serialize config to a readable TOML string
fn serialize_config(config: &SoniqueConfigFile) -> String {
    let mut out = String::new();

    // [backend]
    if let Some(ref url) = config.backend.url {
        out.push_str("[backend]\n");
        out.push_str(&format!("url = \"{url}\"\n\n"));
    }

    // [voice]
    let v = &config.voice;
    out.push_str("[voice]\n");
    if let Some(ref locale) = v.locale {
        out.push_str(&format!("locale = \"{locale}\"\n"));
    }
    if let Some(secs) = v.listen_timeout_secs {
        out.push_str(&format!("listen_timeout_secs = {secs}\n"));
    }
    for (key, val) in [
        ("stt_provider", &v.stt_provider),
        ("stt_model", &v.stt_model),
        ("tts_provider", &v.tts_provider),
        ("tts_model", &v.tts_model),
        ("tts_voice", &v.tts_voice),
    ] {
        if let Some(val) = val {
            out.push_str(&format!("{key} = \"{val}\"\n"));
        }
    }
    if let Some(speed) = v.tts_speed {
        out.push_str(&format!("tts_speed = {speed}\n"));
    }
    out.push('\n');

    // [api_keys]
    let ak = &config.api_keys;
    if ak.openai.is_some() || ak.elevenlabs.is_some() || ak.deepgram.is_some() {
        out.push_str("[api_keys]\n");
        for (key, val) in [
            ("openai", &ak.openai),
            ("elevenlabs", &ak.elevenlabs),
            ("deepgram", &ak.deepgram),
        ] {
            if let Some(v) = val {
                out.push_str(&format!("{key} = \"{v}\"\n"));
            }
        }
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_config_round_trips() {
        let config = SoniqueConfigFile {
            backend: BackendFileConfig {
                url: Some("http://localhost:5004".to_string()),
            },
            voice: VoiceFileConfig {
                locale: Some("en-US".to_string()),
                listen_timeout_secs: Some(10),
                stt_provider: Some("whisper".to_string()),
                stt_model: Some("whisper-1".to_string()),
                tts_provider: Some("openai".to_string()),
                tts_model: Some("tts-1".to_string()),
                tts_voice: Some("alloy".to_string()),
                tts_speed: Some(1.0),
            },
            api_keys: ApiKeysFileConfig {
                openai: Some("sk-test".to_string()),
                elevenlabs: None,
                deepgram: None,
            },
        };

        let toml = serialize_config(&config);
        let parsed: SoniqueConfigFile = toml::from_str(&toml).unwrap();

        assert_eq!(parsed.backend.url.as_deref(), Some("http://localhost:5004"));
        assert_eq!(parsed.voice.stt_provider.as_deref(), Some("whisper"));
        assert_eq!(parsed.api_keys.openai.as_deref(), Some("sk-test"));
    }
}
