use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sonique::voice::{AudioCapture, AudioPlayback, MicrophoneInput, SpeakerOutput, Synthesizer};
use sonique::{Config, InterpreterClient, LibraryClient, SessionOutcome, VoiceSession};

/// Sonique - voice-interaction gateway for the Sonique learning companion
#[derive(Parser)]
#[command(name = "sonique", version, about)]
struct Cli {
    /// Backend base URL (e.g. http://localhost:5004)
    #[arg(short, long, env = "SONIQUE_BACKEND_URL")]
    backend: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a PDF as course material (Parent Mode)
    Upload {
        /// Path to the PDF file
        file: PathBuf,
    },
    /// List uploaded books
    Books,
    /// Print the extracted content of one book
    Book {
        /// Book id
        id: u64,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
    /// Interactive first-run setup
    Setup,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,sonique=info",
        1 => "info,sonique=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.backend.as_deref())?;

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Upload { file } => upload_book(&config, &file).await,
            Command::Books => list_books(&config).await,
            Command::Book { id } => show_book(&config, id).await,
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker().await,
            Command::TestTts { text } => test_tts(&config, &text).await,
            Command::Setup => sonique::setup::run_setup(),
        };
    }

    run_voice_session(&config).await
}

/// Run a Kid-Mode voice session until "stop" or Ctrl-C
#[allow(clippy::future_not_send)]
async fn run_voice_session(config: &Config) -> anyhow::Result<()> {
    tracing::info!(backend = %config.backend_url, "starting voice session");

    // Missing keys or audio hardware surface here, before the loop starts
    let output = SpeakerOutput::from_config(config)
        .map_err(|e| anyhow::anyhow!("speech output unavailable: {e}"))?;
    let input = MicrophoneInput::from_config(config)
        .map_err(|e| anyhow::anyhow!("speech input unavailable: {e}"))?;
    let interpreter = InterpreterClient::new(config.backend_url.clone());

    let session = VoiceSession::new(output, input, interpreter, config.session_config());
    let handle = session.handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping session");
            handle.stop();
        }
    });

    println!("Voice session running - say \"stop\" (or press Ctrl-C) to end.");

    match session.run().await {
        SessionOutcome::Stopped => {
            println!("Session ended.");
            Ok(())
        }
        outcome @ (SessionOutcome::SpeechFailed
        | SessionOutcome::RecognitionFailed
        | SessionOutcome::InterpreterFailed) => {
            println!("Session ended early: {outcome}.");
            Ok(())
        }
    }
}

/// Upload a PDF to the backend
async fn upload_book(config: &Config, file: &std::path::Path) -> anyhow::Result<()> {
    let client = LibraryClient::new(config.backend_url.clone());
    let receipt = client.upload_book(file).await?;

    println!("{} (id {})", receipt.message, receipt.id);
    Ok(())
}

/// List uploaded books
async fn list_books(config: &Config) -> anyhow::Result<()> {
    let client = LibraryClient::new(config.backend_url.clone());
    let names = client.book_names().await?;

    if names.is_empty() {
        println!("No books uploaded yet.");
        return Ok(());
    }

    for book in names {
        println!("{:4}  {}", book.id, book.name);
    }
    Ok(())
}

/// Print the extracted content of one book
async fn show_book(config: &Config, id: u64) -> anyhow::Result<()> {
    let client = LibraryClient::new(config.backend_url.clone());
    let content = client.book_content(id).await?;

    println!("{content}");
    Ok(())
}

/// Test microphone input
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    let sample_rate = capture.sample_rate();
    println!("Sample rate: {sample_rate} Hz");
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.peek_buffer();
        let energy = calculate_rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );

        capture.clear_buffer();
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");

    Ok(())
}

/// Calculate RMS energy
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let mut playback = AudioPlayback::new()?;

    // 2 seconds of 440Hz sine at the 24kHz playback rate
    let sample_rate = 24000_i32;
    let frequency = 440.0_f32;
    let duration_secs = 2.0_f32;
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let num_samples = (sample_rate as f32 * duration_secs) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    println!("Playing {} samples at {} Hz...", samples.len(), sample_rate);

    playback.play(samples).await?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");

    Ok(())
}

/// Test TTS output
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let synthesizer = Synthesizer::from_config(config)?;

    println!("Synthesizing speech...");
    let mp3_data = synthesizer.synthesize(text).await?;
    println!("Got {} bytes of audio data", mp3_data.len());

    println!("Playing audio...");
    let mut playback = AudioPlayback::new()?;
    playback.play_mp3(&mp3_data).await?;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}
